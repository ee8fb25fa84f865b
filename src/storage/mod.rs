// src/storage/mod.rs
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::audit::{AuditData, AuditSummary};
use crate::extractors::metadata::base_slug;
use crate::extractors::read_metadata;
use crate::normalize::parse_document;
use crate::utils::config::LoaderConfig;
use crate::utils::error::{AuditError, StorageError};

/// Lists and loads audit documents from one flat directory.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    config: LoaderConfig,
}

impl DocumentLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Candidate files in file-name order. Not recursive.
    async fn candidate_paths(&self) -> Result<Vec<PathBuf>, StorageError> {
        let dir = &self.config.audits_dir;
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::DirectoryMissing(dir.display().to_string()));
            }
            Err(e) => return Err(StorageError::IoError(e)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let matches_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| ext.eq_ignore_ascii_case(&self.config.extension));
            if matches_extension {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }

    async fn read(path: &Path) -> Result<String, StorageError> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    /// Every document with readable metadata, newest first (ties by slug).
    /// A missing directory is an empty set.
    pub async fn list_all(&self) -> Result<Vec<AuditSummary>, StorageError> {
        let paths = match self.candidate_paths().await {
            Ok(paths) => paths,
            Err(StorageError::DirectoryMissing(dir)) => {
                tracing::warn!("Audit directory {} does not exist, no audits available", dir);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut used: HashSet<String> = HashSet::new();
        let mut summaries = Vec::with_capacity(paths.len());

        for path in paths {
            let text = match Self::read(&path).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Skipping unreadable audit {}: {}", path.display(), e);
                    continue;
                }
            };
            let mut metadata = match read_metadata(&text) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!("Skipping {} from listing: {}", path.display(), e);
                    continue;
                }
            };

            let base = base_slug(&metadata.brand, metadata.date);
            let mut slug = base.clone();
            let mut suffix = 2;
            while used.contains(&slug) {
                slug = format!("{}-{}", base, suffix);
                suffix += 1;
            }
            if slug != base {
                tracing::warn!("Slug '{}' already taken, {} listed as '{}'", base, path.display(), slug);
            }
            used.insert(slug.clone());
            metadata.slug = slug;

            tracing::trace!("Listed {} as {}", path.display(), metadata.slug);
            summaries.push(AuditSummary { metadata, path });
        }

        summaries.sort_by(|a, b| {
            b.metadata
                .date
                .cmp(&a.metadata.date)
                .then_with(|| a.metadata.slug.cmp(&b.metadata.slug))
        });
        tracing::debug!("Listed {} audits in {}", summaries.len(), self.config.audits_dir.display());
        Ok(summaries)
    }

    pub async fn has_any(&self) -> Result<bool, StorageError> {
        Ok(!self.list_all().await?.is_empty())
    }

    /// Full parse of a listed document, carrying the listing's slug.
    pub async fn load_summary(&self, summary: &AuditSummary) -> Result<AuditData, AuditError> {
        let slug = summary.metadata.slug.clone();
        let text = Self::read(&summary.path).await?;
        let data = parse_document(&text)
            .into_result()
            .map_err(|reason| AuditError::MalformedDocument {
                slug: slug.clone(),
                reason,
            })?;
        tracing::info!("Parsed audit {} from {}", slug, summary.path.display());
        Ok(data.with_slug(&slug))
    }

    pub async fn load_by_slug(&self, slug: &str) -> Result<AuditData, AuditError> {
        let summaries = self.list_all().await?;
        let summary = summaries
            .iter()
            .find(|s| s.metadata.slug == slug)
            .ok_or_else(|| AuditError::DocumentNotFound(slug.to_string()))?;
        self.load_summary(summary).await
    }

    /// Newest document by date, ties broken by slug. `None` for an empty set.
    pub async fn latest_summary(&self) -> Result<Option<AuditSummary>, StorageError> {
        Ok(self.list_all().await?.into_iter().next())
    }

    pub async fn load_latest(&self) -> Result<Option<AuditData>, AuditError> {
        match self.latest_summary().await? {
            Some(summary) => self.load_summary(&summary).await.map(Some),
            None => Ok(None),
        }
    }
}
