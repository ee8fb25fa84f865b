// src/utils/mod.rs
pub mod config;
pub mod error;
pub mod logging;

pub use config::LoaderConfig;
pub use error::{AppError, AuditError, Diagnostics, ExtractError, ExtractionWarning, RejectReason, StorageError}; // Re-export error types for convenience
