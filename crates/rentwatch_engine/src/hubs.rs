use std::fs;
use std::io;
use std::path::Path;

use rentwatch_core::CycleHub;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum HubDirectoryError {
    #[error("failed to read hub directory: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse hub directory: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Loads the cycle-hub directory from a station-feed export:
/// `{"data":{"supply":{"stations":[{"stationName":..,"location":{"lat":..,"lng":..}}]}}}`.
pub fn load_hub_directory(path: &Path) -> Result<Vec<CycleHub>, HubDirectoryError> {
    let raw = fs::read(path)?;
    parse_hub_directory(&raw)
}

pub fn parse_hub_directory(raw: &[u8]) -> Result<Vec<CycleHub>, HubDirectoryError> {
    let feed: StationFeed = serde_json::from_slice(raw)?;
    Ok(feed
        .data
        .supply
        .stations
        .into_iter()
        .map(|station| CycleHub {
            name: station.station_name,
            latitude: station.location.lat,
            longitude: station.location.lng,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct StationFeed {
    data: FeedData,
}

#[derive(Debug, Deserialize)]
struct FeedData {
    supply: Supply,
}

#[derive(Debug, Deserialize)]
struct Supply {
    #[serde(default)]
    stations: Vec<Station>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Station {
    station_name: String,
    location: StationLocation,
}

#[derive(Debug, Deserialize)]
struct StationLocation {
    lat: f64,
    lng: f64,
}
