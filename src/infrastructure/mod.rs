pub mod core;
pub mod feed;
pub mod mock;
pub mod observability;
pub mod persistence;
pub mod settings_persistence;
pub mod sinks;

pub use settings_persistence::SettingsPersistence;
