//! Storage layer
//!
//! # Architecture
//!
//! Two persistence boundaries, both reachable by table name:
//!
//! ```text
//! SchemaStore: Tables (name → TableHandle)
//!                └─→ Columns (ordered, replaced as a whole)
//! RowStore:    Rows (RowId → Values document, tagged with table name)
//! ```
//!
//! ## Implementations
//!
//! - [`MemoryStore`]: process-local, with failure injection for tests
//! - [`FileStore`]: one JSON document on disk, atomic rename per write
//!
//! A database-backed implementation should override
//! [`RowStore::update_many`] with a single statement and prefer
//! [`RowStore::patch_row`] where only some keys change.

pub mod engine;
pub mod file;
pub mod memory;

pub use engine::{validate_name, RowStore, SchemaStore, TableSchema};
pub use file::FileStore;
pub use memory::{MemoryStore, StoreOp};
