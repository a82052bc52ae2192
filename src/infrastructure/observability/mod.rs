//! Push-based observability for Resonance
//!
//! Metrics are only ever sent out, as periodic JSON lines on stdout.
//! There is no HTTP server and no inbound request handling.

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::MetricsReporter;
