// Detection events and gating thresholds
pub mod detection;

// Ticks, intervals and lane keys
pub mod market;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
