use rentwatch_logging::{watch_error, watch_info};

use crate::enrichment::{EnrichmentOutcome, EnrichmentStage};
use crate::queue::{QueueError, SpoolQueue};

/// Tally of one queue drain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub processed: usize,
    pub delivered: usize,
    pub rejected: usize,
    pub scrape_failures: usize,
    pub commute_failures: usize,
    pub delivery_failures: usize,
    pub dropped: usize,
    /// Events left in flight after a store error; redelivered on next start.
    pub deferred: usize,
}

impl WorkerReport {
    fn record(&mut self, outcome: &EnrichmentOutcome) {
        self.processed += 1;
        match outcome {
            EnrichmentOutcome::Delivered => self.delivered += 1,
            EnrichmentOutcome::Rejected { .. } => self.rejected += 1,
            EnrichmentOutcome::ScrapeFailed { .. } => self.scrape_failures += 1,
            EnrichmentOutcome::CommuteUnavailable => self.commute_failures += 1,
            EnrichmentOutcome::DeliveryFailed => self.delivery_failures += 1,
            EnrichmentOutcome::SearchMissing => self.dropped += 1,
        }
    }
}

/// Processes queued events one at a time until the queue is empty or `limit`
/// events have been handled.
pub async fn drain_queue(
    queue: &SpoolQueue,
    stage: &EnrichmentStage<'_>,
    limit: Option<usize>,
) -> Result<WorkerReport, QueueError> {
    queue.recover_in_flight()?;

    let mut report = WorkerReport::default();
    while limit.map_or(true, |limit| report.processed + report.deferred < limit) {
        let Some(claimed) = queue.claim()? else {
            break;
        };
        match stage.process(&claimed.event).await {
            Ok(outcome) => {
                report.record(&outcome);
                queue.ack(claimed)?;
            }
            Err(err) => {
                watch_error!(
                    "Listing {} for search {} deferred: {}",
                    claimed.event.listing.listing_id,
                    claimed.event.search_id,
                    err
                );
                report.deferred += 1;
            }
        }
    }

    watch_info!(
        "Worker drained {} event(s): {} delivered, {} rejected, {} deferred",
        report.processed,
        report.delivered,
        report.rejected,
        report.deferred
    );
    Ok(report)
}
