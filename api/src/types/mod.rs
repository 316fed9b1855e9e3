use serde::Serialize;

/// Body of a successful scan: records fetched and elapsed milliseconds.
#[derive(Serialize)]
pub struct ScanResponse {
    pub count: usize,
    pub time: u64,
}

impl From<ub_core::types::ScanReport> for ScanResponse {
    fn from(report: ub_core::types::ScanReport) -> Self {
        Self {
            count: report.count,
            time: report.time,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
