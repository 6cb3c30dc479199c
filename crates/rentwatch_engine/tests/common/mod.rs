#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rentwatch_core::{
    Coordinate, DiscoveryEvent, ListingDetail, ListingId, ListingRef, Notification, SearchConfig,
    SearchId, SearchQuery,
};
use rentwatch_engine::{
    CommuteError, CommuteService, DeliveryError, EventQueue, FailureKind, FetchError,
    ListingSource, NotificationSink, QueueError, ScrapeError, SearchPage, SearchSource,
    SearchStore, StoreError, Summarizer, SummaryError, TravelMode,
};

pub fn listing(id: ListingId) -> ListingRef {
    ListingRef::new(id, 51.50 + id as f64 * 0.001, -0.12)
}

pub fn search(id: SearchId, sources: &[&str], known: &[ListingId]) -> SearchConfig {
    let mut config = SearchConfig::new(id, "https://hooks.test/webhook");
    config.source_urls = sources.iter().map(|s| s.to_string()).collect();
    config.known_listing_ids = known.iter().copied().collect();
    config.destinations = vec!["Office".to_string()];
    config.max_commute_seconds = 1800;
    config
}

// ---------------------------------------------------------------------------
// Store

#[derive(Default)]
pub struct MemoryStore {
    searches: Mutex<BTreeMap<SearchId, SearchConfig>>,
    /// Simulates a concurrent writer landing between our read and our write.
    pub interfere_on_replace: bool,
}

impl MemoryStore {
    pub fn with(configs: Vec<SearchConfig>) -> Self {
        Self {
            searches: Mutex::new(configs.into_iter().map(|c| (c.id, c)).collect()),
            interfere_on_replace: false,
        }
    }

    pub fn snapshot(&self, id: SearchId) -> Option<SearchConfig> {
        self.searches.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait::async_trait]
impl SearchStore for MemoryStore {
    async fn get(&self, search_id: SearchId) -> Result<Option<SearchConfig>, StoreError> {
        Ok(self.snapshot(search_id))
    }

    async fn replace(&self, config: &SearchConfig) -> Result<SearchConfig, StoreError> {
        let mut searches = self.searches.lock().unwrap();
        let stored = searches
            .get_mut(&config.id)
            .ok_or(StoreError::NotFound(config.id))?;
        if self.interfere_on_replace {
            stored.revision += 1;
        }
        if stored.revision != config.revision {
            return Err(StoreError::Conflict {
                search_id: config.id,
                expected: config.revision,
                found: stored.revision,
            });
        }
        let mut next = config.clone();
        next.revision += 1;
        *stored = next.clone();
        Ok(next)
    }
}

/// Fails reads with an IO error until `failures_left` runs out.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failures_left: AtomicUsize,
}

impl FlakyStore {
    pub fn failing(inner: MemoryStore, failures: usize) -> Self {
        Self {
            inner,
            failures_left: AtomicUsize::new(failures),
        }
    }
}

#[async_trait::async_trait]
impl SearchStore for FlakyStore {
    async fn get(&self, search_id: SearchId) -> Result<Option<SearchConfig>, StoreError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Io(std::io::Error::other("disk unavailable")));
        }
        self.inner.get(search_id).await
    }

    async fn replace(&self, config: &SearchConfig) -> Result<SearchConfig, StoreError> {
        self.inner.replace(config).await
    }
}

// ---------------------------------------------------------------------------
// Search source

#[derive(Default)]
pub struct ScriptedSource {
    pages: Mutex<HashMap<(String, String), Result<SearchPage, FetchError>>>,
    pub requests: Mutex<Vec<(String, String)>>,
}

impl ScriptedSource {
    pub fn page(self, source: &str, offset: &str, ids: &[ListingId], next: Option<&str>) -> Self {
        let page = SearchPage {
            listings: ids.iter().map(|id| listing(*id)).collect(),
            next_offset: next.map(str::to_string),
        };
        self.pages
            .lock()
            .unwrap()
            .insert((source.to_string(), offset.to_string()), Ok(page));
        self
    }

    pub fn fail(self, source: &str, offset: &str, kind: FailureKind) -> Self {
        self.pages.lock().unwrap().insert(
            (source.to_string(), offset.to_string()),
            Err(FetchError::new(kind, "scripted failure")),
        );
        self
    }
}

#[async_trait::async_trait]
impl SearchSource for ScriptedSource {
    async fn fetch_page(&self, query: &SearchQuery, offset: &str) -> Result<SearchPage, FetchError> {
        let key = (query.source_url().to_string(), offset.to_string());
        self.requests.lock().unwrap().push(key.clone());
        self.pages
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::new(FailureKind::Network, "unscripted page")))
    }
}

// ---------------------------------------------------------------------------
// Queue

#[derive(Default)]
pub struct RecordingQueue {
    pub events: Mutex<Vec<DiscoveryEvent>>,
    pub reject_listing: Option<ListingId>,
}

impl RecordingQueue {
    pub fn listing_ids(&self) -> Vec<ListingId> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.listing.listing_id)
            .collect()
    }
}

#[async_trait::async_trait]
impl EventQueue for RecordingQueue {
    async fn send(&self, event: &DiscoveryEvent) -> Result<(), QueueError> {
        if self.reject_listing == Some(event.listing.listing_id) {
            return Err(QueueError::Io(std::io::Error::other("queue unavailable")));
        }
        self.events.lock().unwrap().push(*event);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Listing pages

#[derive(Default)]
pub struct FakeListings {
    details: HashMap<ListingId, ListingDetail>,
    pub fetched: Mutex<Vec<ListingId>>,
}

impl FakeListings {
    pub fn with(mut self, id: ListingId, rent: &str, description: &str) -> Self {
        self.details.insert(
            id,
            ListingDetail {
                title: format!("Flat {id}"),
                url: Self::url(id),
                rent_text: rent.to_string(),
                description: description.to_string(),
                image_url: format!("https://img.test/{id}.jpg"),
            },
        );
        self
    }

    pub fn url(id: ListingId) -> String {
        format!("https://listings.test/properties/{id}")
    }
}

#[async_trait::async_trait]
impl ListingSource for FakeListings {
    fn listing_url(&self, listing_id: ListingId) -> String {
        Self::url(listing_id)
    }

    async fn fetch_detail(&self, listing_id: ListingId) -> Result<ListingDetail, ScrapeError> {
        self.fetched.lock().unwrap().push(listing_id);
        self.details
            .get(&listing_id)
            .cloned()
            .ok_or(ScrapeError::UnrecognizedPage { missing: "title" })
    }
}

// ---------------------------------------------------------------------------
// Commute

#[derive(Default)]
pub struct FakeCommute {
    pub transit: HashMap<String, u64>,
    pub cycling: HashMap<String, u64>,
    pub walking_seconds: Option<u64>,
    pub fail: bool,
    pub calls: Mutex<Vec<TravelMode>>,
}

impl FakeCommute {
    pub fn route(mut self, destination: &str, transit: u64, cycling: u64) -> Self {
        self.transit.insert(destination.to_string(), transit);
        self.cycling.insert(destination.to_string(), cycling);
        self
    }

    /// A destination reachable by transit only; cycling lookups for it fail.
    pub fn transit_route(mut self, destination: &str, transit: u64) -> Self {
        self.transit.insert(destination.to_string(), transit);
        self
    }

    pub fn modes(&self) -> Vec<TravelMode> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CommuteService for FakeCommute {
    async fn durations(
        &self,
        _origin: Coordinate,
        destinations: &[String],
        mode: TravelMode,
    ) -> Result<Vec<u64>, CommuteError> {
        self.calls.lock().unwrap().push(mode);
        if self.fail {
            return Err(CommuteError::Api("OVER_QUERY_LIMIT".to_string()));
        }
        if mode == TravelMode::Walking {
            return self
                .walking_seconds
                .map(|s| vec![s])
                .ok_or_else(|| CommuteError::Malformed("no walking route".to_string()));
        }
        let table = if mode == TravelMode::Transit {
            &self.transit
        } else {
            &self.cycling
        };
        destinations
            .iter()
            .map(|d| {
                table.get(d).copied().ok_or_else(|| CommuteError::NoRoute {
                    destination: d.clone(),
                    mode,
                    status: "ZERO_RESULTS".to_string(),
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Summarizer

pub struct FakeSummarizer {
    reply: Option<String>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl FakeSummarizer {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, text: &str, instruction: &str) -> Result<String, SummaryError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), instruction.to_string()));
        self.reply.clone().ok_or(SummaryError::Empty)
    }
}

// ---------------------------------------------------------------------------
// Sink

#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<(String, Notification)>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn notifications(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(_, n)| n.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, target: &str, notification: &Notification) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Fetch(FetchError::new(
                FailureKind::HttpStatus(500),
                "webhook down",
            )));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((target.to_string(), notification.clone()));
        Ok(())
    }
}
