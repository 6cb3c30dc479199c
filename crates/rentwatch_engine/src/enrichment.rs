use rentwatch_core::{
    admit, compose_notification, nearest_hub, scraping_error_notification, Admission,
    CommuteViolation, Coordinate, CycleHub, DiscoveryEvent, HubWalk, ListingDetail, Notification,
    SearchConfig,
};
use rentwatch_logging::{watch_debug, watch_error, watch_info, watch_warn};

use crate::commute::{commute_results, walking_minutes, CommuteService};
use crate::error::PipelineError;
use crate::listing::ListingSource;
use crate::notify::NotificationSink;
use crate::store::SearchStore;
use crate::summary::Summarizer;

/// Terminal state of one discovery event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    /// The event names a search that no longer exists; dropped.
    SearchMissing,
    /// The listing page could not be scraped; an error notification was attempted.
    ScrapeFailed { error_notified: bool },
    /// Commute times could not be computed, so the listing was not admitted.
    CommuteUnavailable,
    /// Filtered out by the commute-time gate.
    Rejected { violations: Vec<CommuteViolation> },
    Delivered,
    DeliveryFailed,
}

impl EnrichmentOutcome {
    /// Whether a listing notification (not an error notification) went out.
    pub fn notified(&self) -> bool {
        matches!(self, EnrichmentOutcome::Delivered)
    }
}

/// Enriches a newly discovered listing and notifies unless it is filtered out.
pub struct EnrichmentStage<'a> {
    store: &'a dyn SearchStore,
    listings: &'a dyn ListingSource,
    commute: &'a dyn CommuteService,
    summarizer: &'a dyn Summarizer,
    sink: &'a dyn NotificationSink,
    hubs: &'a [CycleHub],
}

impl<'a> EnrichmentStage<'a> {
    pub fn new(
        store: &'a dyn SearchStore,
        listings: &'a dyn ListingSource,
        commute: &'a dyn CommuteService,
        summarizer: &'a dyn Summarizer,
        sink: &'a dyn NotificationSink,
        hubs: &'a [CycleHub],
    ) -> Self {
        Self {
            store,
            listings,
            commute,
            summarizer,
            sink,
            hubs,
        }
    }

    /// Runs one event to a terminal state. Only store failures are returned as
    /// errors; they leave the event on the queue for redelivery.
    pub async fn process(&self, event: &DiscoveryEvent) -> Result<EnrichmentOutcome, PipelineError> {
        let listing_id = event.listing.listing_id;
        let Some(search) = self.store.get(event.search_id).await? else {
            watch_warn!(
                "Search {} not found; dropping listing {}",
                event.search_id,
                listing_id
            );
            return Ok(EnrichmentOutcome::SearchMissing);
        };
        watch_info!("Checking listing {} for search {}", listing_id, search.id);

        let detail = match self.listings.fetch_detail(listing_id).await {
            Ok(detail) => detail,
            Err(err) => {
                watch_warn!("Failed to scrape listing {}: {}", listing_id, err);
                let notification = scraping_error_notification(&self.listings.listing_url(listing_id));
                let error_notified = self.deliver(&search, &notification).await;
                return Ok(EnrichmentOutcome::ScrapeFailed { error_notified });
            }
        };

        let summary = self.summarize(&search, &detail).await;

        let origin = event.listing.coordinate();
        let commutes = match commute_results(self.commute, origin, &search.destinations).await {
            Ok(commutes) => commutes,
            Err(err) => {
                watch_error!(
                    "Commute lookup failed for listing {}, not notifying: {}",
                    listing_id,
                    err
                );
                return Ok(EnrichmentOutcome::CommuteUnavailable);
            }
        };

        if let Admission::Rejected { violations } = admit(&commutes, search.max_commute_seconds) {
            for violation in &violations {
                watch_info!(
                    "Listing {}: transit to {} takes {}s, over the {}s limit",
                    listing_id,
                    violation.destination,
                    violation.transit_seconds,
                    search.max_commute_seconds
                );
            }
            watch_info!("Commute too long, skipping listing {}", listing_id);
            return Ok(EnrichmentOutcome::Rejected { violations });
        }

        let hub = self.nearest_hub_walk(origin).await;
        let notification = compose_notification(&detail, &summary, &commutes, hub.as_ref());
        if self.deliver(&search, &notification).await {
            Ok(EnrichmentOutcome::Delivered)
        } else {
            Ok(EnrichmentOutcome::DeliveryFailed)
        }
    }

    async fn summarize(&self, search: &SearchConfig, detail: &ListingDetail) -> String {
        if !search.wants_summary() {
            return String::new();
        }
        match self
            .summarizer
            .summarize(&detail.description, &search.summary_prompt)
            .await
        {
            Ok(summary) => summary,
            Err(err) => {
                watch_warn!("Summary unavailable for {}: {}", detail.url, err);
                String::new()
            }
        }
    }

    async fn nearest_hub_walk(&self, origin: Coordinate) -> Option<HubWalk> {
        let hub = nearest_hub(self.hubs, origin)?;
        match walking_minutes(self.commute, origin, hub.coordinate()).await {
            Ok(minutes) => Some(HubWalk {
                name: hub.name.clone(),
                walking_minutes: minutes,
            }),
            Err(err) => {
                watch_debug!("No walking time to hub {}: {}", hub.name, err);
                None
            }
        }
    }

    async fn deliver(&self, search: &SearchConfig, notification: &Notification) -> bool {
        match self
            .sink
            .deliver(&search.notification_target, notification)
            .await
        {
            Ok(()) => {
                watch_info!(
                    "Delivered \"{}\" for search {}",
                    notification.title,
                    search.id
                );
                true
            }
            Err(err) => {
                watch_warn!(
                    "Failed to deliver \"{}\" for search {}: {}",
                    notification.title,
                    search.id,
                    err
                );
                false
            }
        }
    }
}
