use serde::{Deserialize, Serialize};

/// Outcome of one full paginated scan: records seen and wall-clock milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub count: usize,
    pub time: u64,
}

/// Outcome of one bulk load against a single backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub chunks: usize,
    pub records: usize,
}
