//! Domain layer of the Code Synthesizer.
//!
//! Holds the value types and pure logic (prompt construction, response
//! extraction, transcript search) plus the traits implemented by the
//! infrastructure and interaction crates.

pub mod agent;
pub mod config;
pub mod error;
pub mod prompt;
pub mod review;
pub mod search;
pub mod session;
pub mod storage;
pub mod workspace;

pub use error::{Result, SynthError};
