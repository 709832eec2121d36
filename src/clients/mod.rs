/// Data entities for trending entries and stored songs
pub mod entities;
/// Error types and result aliases
pub mod errors;
/// Embedded song store using `DuckDB`
pub mod local_storage;
/// Chart and download API client
pub mod source;

pub use local_storage::LocalStorage;
pub use source::{SongSource, SourceClient};
