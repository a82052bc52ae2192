pub mod thresholds;
pub mod types;

pub use thresholds::Thresholds;
pub use types::{DerivedMetrics, Detection, DetectionId};
