mod correlator;
mod detector;
mod error;
mod indexer;

pub use correlator::correlate_passes;
pub use detector::detect_passes;
pub use indexer::assign_daily_ids;
