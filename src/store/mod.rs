//! Shared indexed store — contract, key layout, and backends.

pub mod keys;
pub mod libsql_backend;
pub mod memory;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use memory::MemoryStore;
pub use traits::IndexedStore;
