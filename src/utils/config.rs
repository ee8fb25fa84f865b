// src/utils/config.rs
use std::path::PathBuf;
use std::time::Duration;

pub const AUDITS_DIR_VAR: &str = "AUDITS_DIR";
pub const EXTENSION_VAR: &str = "AUDIT_EXTENSION";
pub const REVALIDATE_VAR: &str = "AUDIT_REVALIDATE_SECS";

/// Where audit documents live and how long a parsed audit stays fresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub audits_dir: PathBuf,
    /// File extension without the dot.
    pub extension: String,
    pub revalidate: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            audits_dir: PathBuf::from("./audits"),
            extension: "md".to_string(),
            revalidate: Duration::from_secs(60),
        }
    }
}

impl LoaderConfig {
    /// Reads `AUDITS_DIR`, `AUDIT_EXTENSION` and `AUDIT_REVALIDATE_SECS`.
    /// Invalid values fall back to the defaults with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup(AUDITS_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            config.audits_dir = PathBuf::from(dir.trim());
        }

        if let Some(ext) = lookup(EXTENSION_VAR) {
            let ext = ext.trim().trim_start_matches('.');
            if ext.is_empty() {
                tracing::warn!("{} is empty, using '{}'", EXTENSION_VAR, config.extension);
            } else {
                config.extension = ext.to_string();
            }
        }

        if let Some(secs) = lookup(REVALIDATE_VAR) {
            match secs.trim().parse::<u64>() {
                Ok(secs) => config.revalidate = Duration::from_secs(secs),
                Err(e) => tracing::warn!(
                    "Invalid {}='{}' ({}), using {}s",
                    REVALIDATE_VAR,
                    secs,
                    e,
                    config.revalidate.as_secs()
                ),
            }
        }

        tracing::debug!("Loader config: {:?}", config);
        config
    }

    pub fn with_audits_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.audits_dir = dir.into();
        self
    }

    pub fn with_revalidate(mut self, revalidate: Duration) -> Self {
        self.revalidate = revalidate;
        self
    }
}
