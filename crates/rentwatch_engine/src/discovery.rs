use rentwatch_core::{
    collect_current, diff_against_known, DiscoveryEvent, ListingId, SearchId, SearchQuery,
};
use rentwatch_logging::{watch_debug, watch_error, watch_info, watch_warn};

use crate::error::{PipelineError, SourceFailure};
use crate::queue::EventQueue;
use crate::search::{paginate, SearchSource};
use crate::settings::SearchApiSettings;
use crate::store::SearchStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueFailure {
    pub listing_id: ListingId,
    pub error: String,
}

/// What one discovery run found and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub search_id: SearchId,
    /// Size of the known set as persisted by this run.
    pub current_count: usize,
    pub new_listing_ids: Vec<ListingId>,
    /// Sources skipped this run. Non-empty means the known set is partial.
    pub source_failures: Vec<SourceFailure>,
    pub enqueue_failures: Vec<EnqueueFailure>,
    pub revision: u64,
}

impl DiscoveryReport {
    pub fn is_partial(&self) -> bool {
        !self.source_failures.is_empty()
    }
}

/// Finds listings that appeared since the previous run of a search.
pub struct DiscoveryStage<'a> {
    store: &'a dyn SearchStore,
    source: &'a dyn SearchSource,
    queue: &'a dyn EventQueue,
    max_pages_per_source: usize,
}

impl<'a> DiscoveryStage<'a> {
    pub fn new(
        store: &'a dyn SearchStore,
        source: &'a dyn SearchSource,
        queue: &'a dyn EventQueue,
        settings: &SearchApiSettings,
    ) -> Self {
        Self {
            store,
            source,
            queue,
            max_pages_per_source: settings.max_pages_per_source,
        }
    }

    /// Scrapes every source of the search, replaces its known ids with the
    /// current scrape and enqueues one event per id not known before.
    ///
    /// A failing source is skipped and reported. When every source fails the
    /// run stops before persisting, so an outage never wipes the known set.
    pub async fn run(&self, search_id: SearchId) -> Result<DiscoveryReport, PipelineError> {
        let Some(mut search) = self.store.get(search_id).await? else {
            watch_error!("Search {} not found; discovery aborted", search_id);
            return Err(PipelineError::ConfigNotFound(search_id));
        };
        watch_info!(
            "Discovery for search {} over {} source(s), {} known listing(s)",
            search_id,
            search.source_urls.len(),
            search.known_listing_ids.len()
        );

        let mut scraped = Vec::new();
        let mut source_failures = Vec::new();
        for source_url in &search.source_urls {
            let query = match SearchQuery::from_source_url(source_url) {
                Ok(query) => query,
                Err(err) => {
                    watch_warn!("Skipping unparseable source {}: {}", source_url, err);
                    source_failures.push(SourceFailure::new(source_url, err));
                    continue;
                }
            };
            match paginate(self.source, &query, self.max_pages_per_source).await {
                Ok(listings) => {
                    watch_info!("Source {} returned {} listing(s)", source_url, listings.len());
                    scraped.extend(listings);
                }
                Err(err) => {
                    watch_warn!("Source {} failed, ignoring its results: {}", source_url, err);
                    source_failures.push(SourceFailure::new(source_url, err));
                }
            }
        }

        if !search.source_urls.is_empty() && source_failures.len() == search.source_urls.len() {
            watch_error!(
                "Every source of search {} failed; known listings left unchanged",
                search_id
            );
            return Err(PipelineError::AllSourcesFailed {
                search_id,
                failures: source_failures,
            });
        }
        if !source_failures.is_empty() {
            watch_warn!(
                "Search {} scraped partially: {} of {} source(s) failed",
                search_id,
                source_failures.len(),
                search.source_urls.len()
            );
        }

        let current = collect_current(scraped);
        let diff = diff_against_known(&current, &search.known_listing_ids);
        search.known_listing_ids = diff.current_ids.clone();
        let stored = self.store.replace(&search).await?;

        let mut enqueue_failures = Vec::new();
        for listing in &diff.new_listings {
            watch_info!("New listing {} for search {}", listing.listing_id, search_id);
            let event = DiscoveryEvent {
                search_id,
                listing: *listing,
            };
            match self.queue.send(&event).await {
                Ok(()) => watch_debug!("Enqueued listing {}", listing.listing_id),
                Err(err) => {
                    watch_error!("Failed to enqueue listing {}: {}", listing.listing_id, err);
                    enqueue_failures.push(EnqueueFailure {
                        listing_id: listing.listing_id,
                        error: err.to_string(),
                    });
                }
            }
        }

        let report = DiscoveryReport {
            search_id,
            current_count: diff.current_ids.len(),
            new_listing_ids: diff.new_ids(),
            source_failures,
            enqueue_failures,
            revision: stored.revision,
        };
        watch_info!(
            "Discovery for search {} done: {} current, {} new, {} enqueue failure(s){}",
            search_id,
            report.current_count,
            report.new_listing_ids.len(),
            report.enqueue_failures.len(),
            if report.is_partial() { " (partial)" } else { "" }
        );
        Ok(report)
    }
}
