// TaskMaster - Task list management with filtering, search and local persistence

pub mod autosave;
pub mod backend;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod export;
pub mod filter;
pub mod humanize;
pub mod models;
pub mod store;

// Re-export main types for convenience
pub use backend::{ByteStore, FileByteStore, MemoryByteStore, SqliteByteStore};
pub use config::Config;
pub use error::{StoreError, ValidationError};
pub use events::{StoreEvent, StoreObserver};
pub use filter::TaskFilter;
pub use models::{MAX_TEXT_LEN, Priority, Stats, Task, TaskId, now};
pub use store::{LoadOutcome, StoreOptions, TaskStore};
