use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rentwatch_core::{CycleHub, SearchConfig, SearchId};
use rentwatch_engine::{
    drain_queue, load_hub_directory, ApiSearchSource, ChatSummarizer, DiscoveryStage,
    DistanceMatrixClient, EnrichmentStage, FileSearchStore, ReqwestFetcher,
    ScrapingListingSource, SearchStore, SpoolQueue, WatchSettings, WebhookSink, WorkerReport,
};
use rentwatch_logging::{watch_error, watch_info, watch_warn};

/// Every adapter the two stages need, built once from settings.
pub struct Services {
    settings: WatchSettings,
    store: FileSearchStore,
    queue: SpoolQueue,
    search: ApiSearchSource,
    listings: ScrapingListingSource,
    commute: DistanceMatrixClient,
    summarizer: ChatSummarizer,
    sink: WebhookSink,
    hubs: Vec<CycleHub>,
}

impl Services {
    pub fn open(settings: WatchSettings) -> Result<Self> {
        let fetcher = Arc::new(ReqwestFetcher::new(settings.fetch.clone()));
        let store = FileSearchStore::open(settings.paths.store_dir.clone())
            .context("failed to open search store")?;
        let queue = SpoolQueue::open(&settings.paths.spool_dir)
            .context("failed to open event queue")?;
        let search = ApiSearchSource::new(fetcher.clone(), &settings.search)
            .context("invalid search API endpoint")?;
        let listings = ScrapingListingSource::new(fetcher.clone(), &settings.listing, &settings.fetch);
        let commute = DistanceMatrixClient::new(fetcher.clone(), &settings.maps);
        let summarizer = ChatSummarizer::new(fetcher.clone(), &settings.summary);
        let sink = WebhookSink::new(fetcher);
        let hubs = load_hubs(settings.paths.hubs_path.as_deref());

        if settings.maps.api_key.is_none() {
            watch_warn!("No maps API key configured; every listing will fail the commute check");
        }

        Ok(Self {
            settings,
            store,
            queue,
            search,
            listings,
            commute,
            summarizer,
            sink,
            hubs,
        })
    }

    /// Runs discovery for each search in turn. One failing search does not
    /// stop the others; the call fails if any of them failed.
    pub async fn discover(&self, search_ids: &[SearchId]) -> Result<()> {
        let stage = DiscoveryStage::new(&self.store, &self.search, &self.queue, &self.settings.search);
        let mut failed = Vec::new();
        for &search_id in search_ids {
            if let Err(err) = stage.run(search_id).await {
                watch_error!("Discovery for search {} failed: {}", search_id, err);
                failed.push(search_id);
            }
        }
        if !failed.is_empty() {
            bail!("discovery failed for search(es) {:?}", failed);
        }
        Ok(())
    }

    /// Drains the queue once, handling at most `limit` events.
    pub async fn drain(&self, limit: Option<usize>) -> Result<WorkerReport> {
        let stage = EnrichmentStage::new(
            &self.store,
            &self.listings,
            &self.commute,
            &self.summarizer,
            &self.sink,
            &self.hubs,
        );
        drain_queue(&self.queue, &stage, limit)
            .await
            .context("event queue failure")
    }

    /// Drains repeatedly, sleeping `interval` whenever the queue is empty.
    pub async fn work_forever(&self, interval: Duration) -> Result<()> {
        loop {
            let report = self.drain(None).await?;
            if report.processed == 0 {
                tokio::time::sleep(interval).await;
            }
        }
    }

    pub fn all_search_ids(&self) -> Result<Vec<SearchId>> {
        self.store.ids().context("failed to list searches")
    }

    pub async fn show(&self, search_id: SearchId) -> Result<String> {
        let Some(config) = self.store.get(search_id).await? else {
            bail!("search {search_id} not found");
        };
        ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new())
            .context("failed to render search")
    }

    /// Registers a new search from a RON file. The stored revision starts at 0.
    pub fn add(&self, path: &Path) -> Result<SearchId> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config: SearchConfig =
            ron::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;
        config.revision = 0;
        self.store.insert(&config)?;
        watch_info!("Added search {}", config.id);
        Ok(config.id)
    }
}

fn load_hubs(path: Option<&Path>) -> Vec<CycleHub> {
    let Some(path) = path else {
        return Vec::new();
    };
    match load_hub_directory(path) {
        Ok(hubs) => {
            watch_info!("Loaded {} cycle hubs from {}", hubs.len(), path.display());
            hubs
        }
        Err(err) => {
            watch_warn!(
                "Cycle hubs unavailable ({}): {}; notifications will omit the hub line",
                path.display(),
                err
            );
            Vec::new()
        }
    }
}
