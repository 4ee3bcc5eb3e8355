pub mod report;
pub mod synchronizer;

pub use report::SyncReport;
pub use synchronizer::{generate_filename, ModSynchronizer};
