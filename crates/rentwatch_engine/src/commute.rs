use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Utc, Weekday};
use rentwatch_core::{CommuteResult, Coordinate};
use rentwatch_logging::{watch_debug, watch_warn};
use serde::Deserialize;
use url::Url;

use crate::fetch::{Fetcher, HttpRequest};
use crate::settings::MapsSettings;
use crate::{FailureKind, FetchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelMode {
    Transit,
    Cycling,
    Walking,
}

impl TravelMode {
    fn api_value(self) -> &'static str {
        match self {
            TravelMode::Transit => "transit",
            TravelMode::Cycling => "bicycling",
            TravelMode::Walking => "walking",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommuteError {
    #[error("commute lookup failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("maps API key not configured")]
    NotConfigured,
    #[error("maps API rejected the request: {0}")]
    Api(String),
    #[error("malformed maps response: {0}")]
    Malformed(String),
    #[error("no {mode:?} route to {destination} ({status})")]
    NoRoute {
        destination: String,
        mode: TravelMode,
        status: String,
    },
    #[error("cannot pin arrival time: {0}")]
    InvalidArrival(String),
}

#[async_trait::async_trait]
pub trait CommuteService: Send + Sync {
    /// Travel time in seconds from `origin` to each destination, in input order.
    async fn durations(
        &self,
        origin: Coordinate,
        destinations: &[String],
        mode: TravelMode,
    ) -> Result<Vec<u64>, CommuteError>;
}

/// Transit and cycling times to every destination.
///
/// A failed transit lookup fails the whole computation; the admission filter
/// cannot be evaluated without it. A failed cycling lookup only leaves the
/// cycling times unknown.
pub async fn commute_results(
    service: &dyn CommuteService,
    origin: Coordinate,
    destinations: &[String],
) -> Result<Vec<CommuteResult>, CommuteError> {
    if destinations.is_empty() {
        return Ok(Vec::new());
    }
    let transit = service
        .durations(origin, destinations, TravelMode::Transit)
        .await?;
    if transit.len() != destinations.len() {
        return Err(CommuteError::Malformed(format!(
            "expected {} transit durations, got {}",
            destinations.len(),
            transit.len()
        )));
    }

    let cycling = match service
        .durations(origin, destinations, TravelMode::Cycling)
        .await
    {
        Ok(cycling) if cycling.len() == destinations.len() => Some(cycling),
        Ok(cycling) => {
            watch_warn!(
                "Cycling lookup returned {} durations for {} destinations; omitting cycling times",
                cycling.len(),
                destinations.len()
            );
            None
        }
        Err(err) => {
            watch_warn!("Cycling lookup failed, omitting cycling times: {}", err);
            None
        }
    };

    Ok(destinations
        .iter()
        .zip(transit)
        .enumerate()
        .map(|(index, (destination, transit))| {
            match cycling.as_ref().and_then(|cycling| cycling.get(index).copied()) {
                Some(seconds) => CommuteResult::new(destination.clone(), transit, seconds),
                None => CommuteResult::transit_only(destination.clone(), transit),
            }
        })
        .collect())
}

/// Walking time from `origin` to `target`, in whole minutes.
pub async fn walking_minutes(
    service: &dyn CommuteService,
    origin: Coordinate,
    target: Coordinate,
) -> Result<u64, CommuteError> {
    let destinations = [target.to_query_value()];
    let durations = service
        .durations(origin, &destinations, TravelMode::Walking)
        .await?;
    durations
        .first()
        .map(|seconds| seconds / 60)
        .ok_or_else(|| CommuteError::Malformed("no walking duration returned".into()))
}

/// The next Monday-to-Friday `hour`:00 strictly after `now`, in `now`'s zone.
///
/// Commute queries are pinned to this instant so results reflect a normal
/// weekday morning regardless of when the listing was found.
pub fn next_weekday_at<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let mut date = now.date_naive();
    // At most two weekend days plus today can be skipped.
    for _ in 0..4 {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            let local = date.and_hms_opt(hour, 0, 0)?;
            let candidate = tz.from_local_datetime(&local).earliest()?;
            if candidate > *now {
                return Some(candidate);
            }
        }
        date = date.succ_opt()?;
    }
    None
}

/// Distance Matrix client (Google Maps web service API).
pub struct DistanceMatrixClient {
    fetcher: Arc<dyn Fetcher>,
    endpoint: String,
    api_key: Option<String>,
    arrival_hour: u32,
    utc_offset_hours: i32,
}

impl DistanceMatrixClient {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: &MapsSettings) -> Self {
        Self {
            fetcher,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            arrival_hour: settings.arrival_hour,
            utc_offset_hours: settings.utc_offset_hours,
        }
    }

    fn arrival_timestamp(&self) -> Result<i64, CommuteError> {
        let offset = FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            CommuteError::InvalidArrival(format!("utc offset {}h", self.utc_offset_hours))
        })?;
        let now = Utc::now().with_timezone(&offset);
        next_weekday_at(&now, self.arrival_hour)
            .map(|arrival| arrival.timestamp())
            .ok_or_else(|| CommuteError::InvalidArrival(format!("hour {}", self.arrival_hour)))
    }
}

#[async_trait::async_trait]
impl CommuteService for DistanceMatrixClient {
    async fn durations(
        &self,
        origin: Coordinate,
        destinations: &[String],
        mode: TravelMode,
    ) -> Result<Vec<u64>, CommuteError> {
        if destinations.is_empty() {
            return Ok(Vec::new());
        }
        let key = self.api_key.as_deref().ok_or(CommuteError::NotConfigured)?;

        let mut params = vec![
            ("origins", origin.to_query_value()),
            ("destinations", destinations.join("|")),
            ("mode", mode.api_value().to_string()),
            ("arrival_time", self.arrival_timestamp()?.to_string()),
        ];
        if mode == TravelMode::Transit {
            params.push(("transit_mode", "rail".to_string()));
        }
        params.push(("key", key.to_string()));

        let url = Url::parse_with_params(&self.endpoint, &params)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let output = self.fetcher.send(HttpRequest::get(url.as_str())).await?;
        let matrix: RawMatrix = output.json()?;

        if matrix.status != "OK" {
            return Err(CommuteError::Api(match matrix.error_message {
                Some(message) => format!("{}: {}", matrix.status, message),
                None => matrix.status,
            }));
        }
        let row = matrix
            .rows
            .into_iter()
            .next()
            .ok_or_else(|| CommuteError::Malformed("no rows".into()))?;
        if row.elements.len() != destinations.len() {
            return Err(CommuteError::Malformed(format!(
                "{} elements for {} destinations",
                row.elements.len(),
                destinations.len()
            )));
        }

        let mut seconds = Vec::with_capacity(destinations.len());
        for (destination, element) in destinations.iter().zip(row.elements) {
            match (element.status.as_str(), element.duration) {
                ("OK", Some(duration)) => seconds.push(duration.value),
                (status, _) => {
                    return Err(CommuteError::NoRoute {
                        destination: destination.clone(),
                        mode,
                        status: status.to_string(),
                    });
                }
            }
        }
        watch_debug!(
            "Commute {:?} from {} -> {:?} seconds",
            mode,
            origin.to_query_value(),
            seconds
        );
        Ok(seconds)
    }
}

#[derive(Debug, Deserialize)]
struct RawMatrix {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default)]
    elements: Vec<RawElement>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    status: String,
    #[serde(default)]
    duration: Option<RawDuration>,
}

#[derive(Debug, Deserialize)]
struct RawDuration {
    value: u64,
}
