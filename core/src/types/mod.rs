//! Data types shared by the seeder and the benchmark server.

mod report;
mod user;

pub use report::{LoadSummary, ScanReport};
pub use user::UserRecord;
