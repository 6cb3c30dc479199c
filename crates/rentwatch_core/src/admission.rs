use crate::CommuteResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommuteViolation {
    pub destination: String,
    pub transit_seconds: u64,
}

/// Outcome of the commute-time gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// At least one destination is over the limit. Every offending destination
    /// is listed in configuration order.
    Rejected { violations: Vec<CommuteViolation> },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Rejects when any destination's transit time exceeds `max_commute_seconds`.
///
/// Cycling times are informational only. An empty commute list is admitted.
pub fn admit(commutes: &[CommuteResult], max_commute_seconds: u64) -> Admission {
    let violations: Vec<CommuteViolation> = commutes
        .iter()
        .filter(|c| c.transit_seconds > max_commute_seconds)
        .map(|c| CommuteViolation {
            destination: c.destination.clone(),
            transit_seconds: c.transit_seconds,
        })
        .collect();

    if violations.is_empty() {
        Admission::Admitted
    } else {
        Admission::Rejected { violations }
    }
}
