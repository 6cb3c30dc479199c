//! Rentwatch core: pure domain model and decision logic for the listing pipeline.
mod admission;
mod compose;
mod discovery;
mod hub;
mod model;
mod query;

pub use admission::{admit, Admission, CommuteViolation};
pub use compose::{compose_notification, scraping_error_notification, HubWalk, SCRAPING_ERROR_TITLE};
pub use discovery::{collect_current, diff_against_known, DiscoveryDiff};
pub use hub::{nearest_hub, CycleHub};
pub use model::{
    CommuteResult, Coordinate, DiscoveryEvent, ListingDetail, ListingId, ListingRef, Notification,
    SearchConfig, SearchId,
};
pub use query::{SearchQuery, DISALLOWED_FILTERS, OFFSET_PARAM};
