//! Filesystem-facing adapters: configuration, session persistence, file
//! ingestion and script export.

pub mod config_service;
pub mod export;
pub mod ingest;
pub mod paths;
pub mod session_state_repository;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::export::write_script;
pub use crate::ingest::FileIngestor;
pub use crate::paths::SynthPaths;
pub use crate::session_state_repository::KvSessionStateRepository;
pub use crate::storage::{JsonFileStore, MemoryStore};
