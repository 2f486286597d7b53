//! Recency signals and how they combine into one ranking timestamp.

mod focus_log;
mod merge;
mod store;
mod usage;

pub use self::focus_log::{FocusLog, FocusLogEntry};
pub use self::merge::{merge, RecencyMap};
pub use self::store::{FileStore, KeyValueStore, MemoryStore};
pub use self::usage::{UsageClock, USAGE_KEY};
