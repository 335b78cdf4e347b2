//! Core types and utilities

pub mod types;
pub mod error;
pub mod config;
pub mod job;
pub mod logging;
pub mod time;

pub use types::*;
pub use error::Error;
pub use config::ChunkConfig;
pub use job::JobHandle;
