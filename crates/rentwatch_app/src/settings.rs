//! Builds `WatchSettings` from the process environment.
//!
//! A `.env` file in the working directory is loaded first when present;
//! variables already set in the environment take precedence over it.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rentwatch_engine::WatchSettings;

pub const STORE_DIR: &str = "RENTWATCH_STORE_DIR";
pub const SPOOL_DIR: &str = "RENTWATCH_SPOOL_DIR";
pub const HUBS_PATH: &str = "RENTWATCH_HUBS_PATH";
pub const MAPS_API_KEY: &str = "GOOGLE_MAPS_API_KEY";
pub const SUMMARY_API_KEY: &str = "OPENAI_API_KEY";
pub const SEARCH_API: &str = "RENTWATCH_SEARCH_API";
pub const LISTING_BASE: &str = "RENTWATCH_LISTING_BASE";
pub const MAPS_API: &str = "RENTWATCH_MAPS_API";
pub const SUMMARY_API: &str = "RENTWATCH_SUMMARY_API";
pub const SUMMARY_MODEL: &str = "RENTWATCH_SUMMARY_MODEL";
pub const MAX_PAGES: &str = "RENTWATCH_MAX_PAGES";
pub const UTC_OFFSET_HOURS: &str = "RENTWATCH_UTC_OFFSET_HOURS";

pub fn load() -> Result<WatchSettings> {
    // Missing .env is fine.
    let _ = dotenvy::dotenv();
    from_lookup(|name| std::env::var(name).ok())
}

/// Overlays every variable that `lookup` returns onto the defaults.
/// Blank values count as unset.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<WatchSettings> {
    let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
    let mut settings = WatchSettings::default();

    if let Some(dir) = get(STORE_DIR) {
        settings.paths.store_dir = PathBuf::from(dir);
    }
    if let Some(dir) = get(SPOOL_DIR) {
        settings.paths.spool_dir = PathBuf::from(dir);
    }
    if let Some(path) = get(HUBS_PATH) {
        settings.paths.hubs_path = Some(PathBuf::from(path));
    }

    if let Some(endpoint) = get(SEARCH_API) {
        settings.search.endpoint = endpoint;
    }
    if let Some(raw) = get(MAX_PAGES) {
        let pages: NonZeroUsize = raw
            .trim()
            .parse()
            .with_context(|| format!("{MAX_PAGES} must be a positive integer, got {raw:?}"))?;
        settings.search.max_pages_per_source = pages.get();
    }
    if let Some(base) = get(LISTING_BASE) {
        settings.listing.base_url = base;
    }

    if let Some(endpoint) = get(MAPS_API) {
        settings.maps.endpoint = endpoint;
    }
    settings.maps.api_key = get(MAPS_API_KEY);
    if let Some(raw) = get(UTC_OFFSET_HOURS) {
        settings.maps.utc_offset_hours = raw
            .trim()
            .parse()
            .with_context(|| format!("{UTC_OFFSET_HOURS} must be an integer, got {raw:?}"))?;
    }

    if let Some(base) = get(SUMMARY_API) {
        settings.summary.base_url = base;
    }
    if let Some(model) = get(SUMMARY_MODEL) {
        settings.summary.model = model;
    }
    settings.summary.api_key = get(SUMMARY_API_KEY);

    Ok(settings)
}
