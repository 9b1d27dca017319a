mod db;
mod types;

pub use db::Database;
pub use types::{Entry, StorageError, StoredEntry};
