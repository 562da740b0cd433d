pub mod history;
pub mod store;

pub use history::{PoseSummary, SessionEntry, SessionHistory, DEFAULT_MIN_ACCURACY, SESSION_KEY};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
