#![forbid(unsafe_code)]

mod store;

pub use store::{DB_FILE_NAME, SqliteStore, StoreError};
