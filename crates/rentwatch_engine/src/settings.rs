use std::path::PathBuf;

use crate::fetch::FetchSettings;
use crate::listing::ListingSelectors;

/// Process-wide configuration, built once at startup and passed by reference.
#[derive(Debug, Clone, Default)]
pub struct WatchSettings {
    pub fetch: FetchSettings,
    pub search: SearchApiSettings,
    pub listing: ListingSettings,
    pub maps: MapsSettings,
    pub summary: SummarySettings,
    pub paths: StatePaths,
}

#[derive(Debug, Clone)]
pub struct SearchApiSettings {
    /// Search results endpoint; the normalized query is appended per page.
    pub endpoint: String,
    /// Upper bound on pages requested per source URL in one run.
    pub max_pages_per_source: usize,
}

impl Default for SearchApiSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://www.rightmove.co.uk/api/_search".to_string(),
            max_pages_per_source: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingSettings {
    /// Listing pages live at `{base_url}/properties/{id}`.
    pub base_url: String,
    pub selectors: ListingSelectors,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.rightmove.co.uk".to_string(),
            selectors: ListingSelectors::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapsSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Local hour of the weekday arrival used for every commute query.
    pub arrival_hour: u32,
    /// Offset of the local clock from UTC, in hours.
    pub utc_offset_hours: i32,
}

impl Default for MapsSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://maps.googleapis.com/maps/api/distancematrix/json".to_string(),
            api_key: None,
            arrival_hour: 9,
            utc_offset_hours: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SummarySettings {
    /// Base URL of an OpenAI-compatible API (`/chat/completions` is appended).
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 185,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatePaths {
    pub store_dir: PathBuf,
    pub spool_dir: PathBuf,
    pub hubs_path: Option<PathBuf>,
}

impl Default for StatePaths {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("state/searches"),
            spool_dir: PathBuf::from("state/queue"),
            hubs_path: None,
        }
    }
}
