// Indicator math and per-key rolling state
pub mod indicators;
pub mod rolling_store;

// Detection pipeline stages
pub mod deduplicator;
pub mod evaluator;
pub mod sink_registry;

// Ingestion loop and worker lanes
pub mod engine;
