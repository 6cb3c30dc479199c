use std::fmt::Write;

use crate::{CommuteResult, ListingDetail, Notification};

pub const SCRAPING_ERROR_TITLE: &str = "Scraping Error";

/// Walking estimate from a listing to its nearest cycle hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubWalk {
    pub name: String,
    pub walking_minutes: u64,
}

/// Builds the notification for an admitted listing.
///
/// Body layout: bold rent line, the summary (when non-empty) set off by blank
/// lines, one line per destination (cycling minutes only when known), then the
/// hub line when known.
pub fn compose_notification(
    detail: &ListingDetail,
    summary: &str,
    commutes: &[CommuteResult],
    hub: Option<&HubWalk>,
) -> Notification {
    let mut body = format!("**Rent: {}**\n", detail.rent_text.trim());

    let summary = summary.trim();
    if !summary.is_empty() {
        body.push('\n');
        body.push_str(summary);
        body.push('\n');
    }

    for commute in commutes {
        let _ = write!(
            body,
            "\n{}: 🚇 {}m",
            commute.destination,
            commute.transit_minutes()
        );
        if let Some(minutes) = commute.cycling_minutes() {
            let _ = write!(body, "   🚴 {minutes}m");
        }
    }

    if let Some(hub) = hub {
        let _ = write!(body, "\n🚴 Hub ({}): {}m", hub.name, hub.walking_minutes);
    }

    let image_url = Some(detail.image_url.trim())
        .filter(|url| !url.is_empty())
        .map(str::to_string);

    Notification {
        title: detail.title.trim().to_string(),
        url: detail.url.clone(),
        body,
        image_url,
    }
}

/// Degraded notification sent when a listing page could not be scraped.
pub fn scraping_error_notification(listing_url: &str) -> Notification {
    Notification {
        title: SCRAPING_ERROR_TITLE.to_string(),
        url: listing_url.to_string(),
        body: format!(
            "Failed to get property details, it may be invalid. Please check manually: {listing_url}"
        ),
        image_url: None,
    }
}
