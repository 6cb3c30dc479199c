use std::collections::{BTreeMap, BTreeSet};

use crate::{ListingId, ListingRef};

/// Result of comparing the current scrape with the previously known ids.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiscoveryDiff {
    /// Every id seen in this scrape. Replaces the known set wholesale.
    pub current_ids: BTreeSet<ListingId>,
    /// Listings in `current_ids` but not in the known set, ascending by id.
    pub new_listings: Vec<ListingRef>,
}

impl DiscoveryDiff {
    pub fn new_ids(&self) -> Vec<ListingId> {
        self.new_listings.iter().map(|l| l.listing_id).collect()
    }
}

/// Unions listing pages into a map keyed by id. The first occurrence of an id wins.
pub fn collect_current<I>(listings: I) -> BTreeMap<ListingId, ListingRef>
where
    I: IntoIterator<Item = ListingRef>,
{
    let mut current = BTreeMap::new();
    for listing in listings {
        current.entry(listing.listing_id).or_insert(listing);
    }
    current
}

/// `current − known`, keyed by listing id.
pub fn diff_against_known(
    current: &BTreeMap<ListingId, ListingRef>,
    known: &BTreeSet<ListingId>,
) -> DiscoveryDiff {
    let new_listings = current
        .iter()
        .filter(|(id, _)| !known.contains(id))
        .map(|(_, listing)| *listing)
        .collect();

    DiscoveryDiff {
        current_ids: current.keys().copied().collect(),
        new_listings,
    }
}
