use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label used for transitions whose origin country is unknown
pub const UNDEFINED_COUNTRY: &str = "Undefined Country";

/// Raw counters computed by the storage layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub total_transitions: i64,
    pub transitions_by_country: BTreeMap<String, i64>,
    /// Counted across every link in the store, not only this one
    pub transitions_from_referrer: i64,
}

/// Statistics response returned for an access key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkStatistics {
    pub original_link: String,
    pub short_link: String,
    pub number_of_transitions: i64,
    pub number_of_transitions_by_country: BTreeMap<String, i64>,
    pub number_of_transitions_from_sites: i64,
}

impl LinkStatistics {
    pub fn new(original_link: String, short_link: String, stats: LinkStats) -> Self {
        Self {
            original_link,
            short_link,
            number_of_transitions: stats.total_transitions,
            number_of_transitions_by_country: stats.transitions_by_country,
            number_of_transitions_from_sites: stats.transitions_from_referrer,
        }
    }
}
