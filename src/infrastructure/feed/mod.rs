//! Upstream tick sources

pub mod jsonl_feed;

pub use jsonl_feed::{JsonlTickFeed, TickSource};
