// src/repository.rs
use std::sync::Arc;

use crate::audit::{AuditData, AuditSummary};
use crate::cache::{AuditCache, CacheStats};
use crate::storage::DocumentLoader;
use crate::utils::config::LoaderConfig;
use crate::utils::error::AuditError;

/// The four read operations the rendering layer calls. None of them fail:
/// every error is logged and reported as `false`, an empty list or `None`.
pub struct AuditRepository {
    cache: AuditCache,
}

impl AuditRepository {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            cache: AuditCache::new(DocumentLoader::new(config)),
        }
    }

    pub fn from_env() -> Self {
        Self::new(LoaderConfig::from_env())
    }

    fn loader(&self) -> &DocumentLoader {
        self.cache.loader()
    }

    pub async fn has_audits(&self) -> bool {
        match self.loader().has_any().await {
            Ok(any) => any,
            Err(e) => {
                tracing::warn!("Could not check for audits: {}", e);
                false
            }
        }
    }

    /// Metadata of every listed audit, newest first.
    pub async fn load_all_audits(&self) -> Vec<AuditSummary> {
        self.loader().list_all().await.unwrap_or_else(|e| {
            tracing::warn!("Could not list audits: {}", e);
            Vec::new()
        })
    }

    pub async fn load_audit_by_slug(&self, slug: &str) -> Option<Arc<AuditData>> {
        match self.cache.get(slug).await {
            Ok(data) => Some(data),
            Err(AuditError::DocumentNotFound(slug)) => {
                tracing::info!("No audit for slug '{}'", slug);
                None
            }
            Err(e) => {
                tracing::warn!("Audit '{}' unavailable: {}", slug, e);
                None
            }
        }
    }

    pub async fn load_latest_audit(&self) -> Option<Arc<AuditData>> {
        let latest = match self.loader().latest_summary().await {
            Ok(latest) => latest?,
            Err(e) => {
                tracing::warn!("Could not resolve latest audit: {}", e);
                return None;
            }
        };
        self.load_audit_by_slug(&latest.metadata.slug).await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = include_str!("../tests/fixtures/sample_audit.md");

    #[tokio::test]
    async fn entry_points_never_fail() {
        let repository = AuditRepository::new(LoaderConfig::default().with_audits_dir("/no/such/audits"));
        assert!(!repository.has_audits().await);
        assert!(repository.load_all_audits().await.is_empty());
        assert!(repository.load_audit_by_slug("acme-2025-01-15").await.is_none());
        assert!(repository.load_latest_audit().await.is_none());
    }

    #[tokio::test]
    async fn serves_listed_and_latest_audits() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("jan.md"), SAMPLE).unwrap();
        std::fs::write(
            dir.path().join("mar.md"),
            SAMPLE.replace("**Date:** 2025-01-15", "**Date:** March 3, 2025"),
        )
        .unwrap();
        let repository = AuditRepository::new(LoaderConfig::default().with_audits_dir(dir.path()));

        assert!(repository.has_audits().await);
        let listed = repository.load_all_audits().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].metadata.slug, "acme-coffee-co-2025-03-03");

        let latest = repository.load_latest_audit().await.unwrap();
        assert_eq!(latest.metadata.slug, "acme-coffee-co-2025-03-03");
        let older = repository.load_audit_by_slug("acme-coffee-co-2025-01-15").await.unwrap();
        assert_eq!(older.headline.ai_citation_rate, 67);

        // Second lookup is served from the cache.
        repository.load_audit_by_slug("acme-coffee-co-2025-01-15").await.unwrap();
        assert_eq!(repository.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn malformed_audit_is_absent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("bad.md"),
            SAMPLE.replace("## LLM Rankings", "## Platform Notes"),
        )
        .unwrap();
        let repository = AuditRepository::new(LoaderConfig::default().with_audits_dir(dir.path()));
        assert!(repository.has_audits().await);
        assert!(repository.load_latest_audit().await.is_none());
    }
}
