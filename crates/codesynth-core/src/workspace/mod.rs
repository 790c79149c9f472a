//! Uploaded source documents.
//!
//! The document set is the only input the analysis turn reads from the
//! workspace; it is owned by the caller and handed to the engine by reference.

pub mod model;

pub use model::{Document, DocumentSet};
