// src/lib.rs
//! Parses narrative audit reports (markdown) into validated, fully derived
//! `AuditData` records, and serves them through a revalidating cache.

pub mod aggregate;
pub mod audit;
pub mod cache;
pub mod extractors;
pub mod normalize;
pub mod repository;
pub mod storage;
pub mod utils;

pub use audit::*;
pub use cache::{AuditCache, CacheStats};
pub use normalize::{parse_document, parse_with_report, ParseReport, Validation};
pub use repository::AuditRepository;
pub use storage::DocumentLoader;
pub use utils::config::LoaderConfig;
pub use utils::error::{AuditError, ExtractError, ExtractionWarning, RejectReason, StorageError};
