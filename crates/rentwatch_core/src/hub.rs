use serde::{Deserialize, Serialize};

use crate::Coordinate;

/// A shared-cycle docking station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleHub {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl CycleHub {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Nearest hub by squared planar distance in lat/long degrees.
///
/// Only meaningful at city scale, where degrees of latitude and longitude are
/// close enough to a flat grid. Ties keep the earliest hub in `hubs`.
pub fn nearest_hub(hubs: &[CycleHub], origin: Coordinate) -> Option<&CycleHub> {
    let mut best: Option<(&CycleHub, f64)> = None;
    for hub in hubs {
        let d_lat = hub.latitude - origin.latitude;
        let d_lng = hub.longitude - origin.longitude;
        let distance = d_lat * d_lat + d_lng * d_lng;
        match best {
            Some((_, closest)) if distance >= closest => {}
            _ => best = Some((hub, distance)),
        }
    }
    best.map(|(hub, _)| hub)
}
