pub mod coordinator;
pub mod events;
pub mod store;

pub use coordinator::FetchCoordinator;
pub use events::{DatasetEvent, InitStats};
pub use store::{DatasetStore, EntryStatus, DEFAULT_CACHE_TTL};
