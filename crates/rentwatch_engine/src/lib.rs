//! Rentwatch engine: IO adapters and the discovery / enrichment stages.
mod commute;
mod decode;
mod discovery;
mod enrichment;
mod error;
mod fetch;
mod hubs;
mod listing;
mod notify;
mod persist;
mod queue;
mod search;
mod settings;
mod store;
mod summary;
mod types;
mod worker;

pub use commute::{
    commute_results, next_weekday_at, walking_minutes, CommuteError, CommuteService,
    DistanceMatrixClient, TravelMode,
};
pub use decode::{decode_page, DecodeError, DecodedPage};
pub use discovery::{DiscoveryReport, DiscoveryStage, EnqueueFailure};
pub use enrichment::{EnrichmentOutcome, EnrichmentStage};
pub use error::{PipelineError, SourceFailure};
pub use fetch::{FetchSettings, Fetcher, HttpMethod, HttpRequest, ReqwestFetcher};
pub use hubs::{load_hub_directory, parse_hub_directory, HubDirectoryError};
pub use listing::{extract_listing, ListingSelectors, ListingSource, ScrapeError, ScrapingListingSource};
pub use notify::{DeliveryError, NotificationSink, WebhookSink};
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError};
pub use queue::{ClaimedEvent, EventQueue, QueueError, SpoolQueue};
pub use search::{paginate, ApiSearchSource, SearchPage, SearchSource, FIRST_OFFSET};
pub use settings::{
    ListingSettings, MapsSettings, SearchApiSettings, StatePaths, SummarySettings, WatchSettings,
};
pub use store::{FileSearchStore, SearchStore, StoreError};
pub use summary::{ChatSummarizer, Summarizer, SummaryError};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
pub use worker::{drain_queue, WorkerReport};
