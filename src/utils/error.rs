// src/utils/error.rs
use std::fmt;
use thiserror::Error;

use crate::extractors::splitter::SectionKind;

// Section-level extraction failure. Only raised when a mandatory field of a
// section stays unset; malformed lines are reported as warnings instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("missing mandatory field '{field}' in {section}")]
    MissingField { section: SectionKind, field: &'static str },

    #[error("{0} contains no usable records")]
    NoRecords(SectionKind),

    /// The mandatory field was authored, but never in a readable form.
    #[error("invalid value for '{field}' in {section}: {value}")]
    InvalidValue {
        section: SectionKind,
        field: &'static str,
        value: String,
    },
}

/// Why the normalizer refused to assemble an `AuditData`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RejectReason {
    #[error("mandatory section missing: {0}")]
    MissingSection(SectionKind),

    #[error("mandatory section {section} could not be parsed: {source}")]
    Unparsable {
        section: SectionKind,
        #[source]
        source: ExtractError,
    },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Audit directory does not exist: {0}")]
    DirectoryMissing(String),
}

// io::Error is not Clone; the copy keeps its kind and message.
impl Clone for StorageError {
    fn clone(&self) -> Self {
        match self {
            StorageError::IoError(e) => StorageError::IoError(std::io::Error::new(e.kind(), e.to_string())),
            StorageError::DirectoryMissing(dir) => StorageError::DirectoryMissing(dir.clone()),
        }
    }
}

/// Cloned so one failed load can be handed to every caller waiting on it.
#[derive(Error, Debug, Clone)]
pub enum AuditError {
    #[error("No audit document for slug '{0}'")]
    DocumentNotFound(String),

    #[error("Malformed audit document '{slug}': {reason}")]
    MalformedDocument { slug: String, reason: RejectReason },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No valid audit documents in {0}")]
    NoAudits(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit loading failed: {0}")]
    Audit(#[from] AuditError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A line the extractor could not interpret. Never fatal; collected and logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionWarning {
    pub section: SectionKind,
    /// 1-based line number within the section block (0 when not tied to a line).
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "[{}] {}", self.section, self.message)
        } else {
            write!(f, "[{} line {}] {}", self.section, self.line, self.message)
        }
    }
}

/// Sink for non-fatal extraction warnings.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<ExtractionWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, section: SectionKind, line: usize, message: impl Into<String>) {
        let warning = ExtractionWarning {
            section,
            line,
            message: message.into(),
        };
        tracing::warn!("Extraction warning: {}", warning);
        self.warnings.push(warning);
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<ExtractionWarning> {
        self.warnings
    }
}
