use serde::{Deserialize, Serialize};

/// Derived ranking figures for one item. Never stored, always rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PopularityInfo {
    pub average: f64,
    pub count: usize,
    pub quality_count: usize,
    pub stddev: f64,
    pub score: f64,
}
