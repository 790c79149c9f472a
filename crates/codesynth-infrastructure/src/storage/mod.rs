//! `KeyValueStore` implementations.

pub mod atomic_json;
pub mod memory_store;

pub use atomic_json::JsonFileStore;
pub use memory_store::MemoryStore;
