use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub type SearchId = u64;
pub type ListingId = u64;

/// A monitored search, persisted between discovery runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub id: SearchId,
    pub source_urls: Vec<String>,
    #[serde(default)]
    pub known_listing_ids: BTreeSet<ListingId>,
    #[serde(default)]
    pub destinations: Vec<String>,
    pub max_commute_seconds: u64,
    #[serde(default)]
    pub summary_prompt: String,
    pub notification_target: String,
    /// Write counter for conditional replacement. Bumped by the store on every write.
    #[serde(default)]
    pub revision: u64,
}

impl SearchConfig {
    pub fn new(id: SearchId, notification_target: impl Into<String>) -> Self {
        Self {
            id,
            source_urls: Vec::new(),
            known_listing_ids: BTreeSet::new(),
            destinations: Vec::new(),
            max_commute_seconds: u64::MAX,
            summary_prompt: String::new(),
            notification_target: notification_target.into(),
            revision: 0,
        }
    }

    /// Whether a semantic summary should be requested for each listing.
    pub fn wants_summary(&self) -> bool {
        !self.summary_prompt.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// `lat,lng` with fixed precision, the form place-based APIs accept.
    pub fn to_query_value(self) -> String {
        format!("{:.6},{:.6}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ListingRef {
    pub listing_id: ListingId,
    pub latitude: f64,
    pub longitude: f64,
}

impl ListingRef {
    pub fn new(listing_id: ListingId, latitude: f64, longitude: f64) -> Self {
        Self {
            listing_id,
            latitude,
            longitude,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Queue message handed from discovery to enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryEvent {
    pub search_id: SearchId,
    pub listing: ListingRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingDetail {
    pub title: String,
    pub url: String,
    pub rent_text: String,
    pub description: String,
    pub image_url: String,
}

/// Travel durations from one listing to one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommuteResult {
    pub destination: String,
    pub transit_seconds: u64,
    /// Missing when the cycling lookup failed; informational only.
    pub cycling_seconds: Option<u64>,
}

impl CommuteResult {
    pub fn new(destination: impl Into<String>, transit_seconds: u64, cycling_seconds: u64) -> Self {
        Self {
            destination: destination.into(),
            transit_seconds,
            cycling_seconds: Some(cycling_seconds),
        }
    }

    pub fn transit_only(destination: impl Into<String>, transit_seconds: u64) -> Self {
        Self {
            destination: destination.into(),
            transit_seconds,
            cycling_seconds: None,
        }
    }

    /// Whole minutes, truncated.
    pub fn transit_minutes(&self) -> u64 {
        self.transit_seconds / 60
    }

    pub fn cycling_minutes(&self) -> Option<u64> {
        self.cycling_seconds.map(|seconds| seconds / 60)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub url: String,
    pub body: String,
    pub image_url: Option<String>,
}
