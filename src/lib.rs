// Lynxky - Dynamic Table Engine
// User-editable typed tables persisted through pluggable schema and row stores

#![warn(rust_2018_idioms)]

pub mod coerce;
pub mod config;
pub mod controller;
pub mod events;
pub mod i18n;
pub mod metrics;
pub mod model;
pub mod storage;

// Re-exports for convenience
pub use config::EngineConfig;
pub use controller::{ControllerContext, Placement, SortDirection, Status, TableController};
pub use events::{EventBus, Notice, NoticeLevel, TableEvent};
pub use i18n::{Catalog, Translator};
pub use model::{CellValue, Column, ColumnId, ColumnType, Row, RowId, SelectOption, Table, Values};
pub use storage::{FileStore, MemoryStore, RowStore, SchemaStore};

/// Lynxky error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Storage error: {0}")]
        Storage(String),

        #[error("Not found: {0}")]
        NotFound(String),

        #[error("Already exists: {0}")]
        AlreadyExists(String),

        #[error("Invalid argument: {0}")]
        InvalidArgument(String),

        /// A mutation refused locally before any store call was made.
        #[error("Rejected: {0}")]
        Rejected(String),

        #[error("Serialization error: {0}")]
        Serialization(String),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("Internal error: {0}")]
        Internal(String),
    }

    impl From<serde_json::Error> for Error {
        fn from(err: serde_json::Error) -> Self {
            Error::Serialization(err.to_string())
        }
    }

    impl From<std::io::Error> for Error {
        fn from(err: std::io::Error) -> Self {
            Error::Storage(err.to_string())
        }
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_format() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_display() {
        let err = error::Error::Rejected("last column".to_string());
        assert_eq!(err.to_string(), "Rejected: last column");
    }
}
