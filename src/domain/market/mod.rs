pub mod interval;
pub mod tick;
pub mod universe;

pub use interval::Interval;
pub use tick::{PairKey, Tick};
pub use universe::UniverseMap;
