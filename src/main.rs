// src/main.rs
use std::path::PathBuf;
use std::time::Duration;

use audit_extractor::utils::logging::setup_logging;
use audit_extractor::utils::AppError;
use audit_extractor::{parse_with_report, AuditError, AuditRepository, LoaderConfig, Validation};
use clap::Parser;
use serde::Serialize;

/// Command Line Interface for inspecting parsed AI-visibility audits
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the audit documents (overrides AUDITS_DIR)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Print the audit with this slug
    #[arg(short, long, conflicts_with_all = ["latest", "file"])]
    slug: Option<String>,

    /// List every audit's metadata, newest first (default)
    #[arg(short, long)]
    list: bool,

    /// Print the newest audit
    #[arg(long, conflicts_with = "file")]
    latest: bool,

    /// Parse a single document and print its validation and warnings
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Seconds a parsed audit stays fresh (overrides AUDIT_REVALIDATE_SECS)
    #[arg(long)]
    revalidate_secs: Option<u64>,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pretty: bool,
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<(), AppError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileReport<'a> {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejected: Option<String>,
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audit: Option<&'a audit_extractor::AuditData>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting with args: {:?}", args);

    // 3. Single-file inspection bypasses the directory entirely
    if let Some(path) = &args.file {
        let text = tokio::fs::read_to_string(path).await?;
        let report = parse_with_report(&text);
        let (audit, rejected) = match &report.validation {
            Validation::Valid(data) => (Some(data), None),
            Validation::Rejected(reason) => (None, Some(reason.to_string())),
        };
        return print_json(
            &FileReport {
                valid: audit.is_some(),
                rejected,
                warnings: report.warnings.iter().map(ToString::to_string).collect(),
                audit,
            },
            args.pretty,
        );
    }

    // 4. Build config: environment first, CLI flags on top
    let mut config = LoaderConfig::from_env();
    if let Some(dir) = args.dir.clone() {
        config = config.with_audits_dir(dir);
    }
    if let Some(secs) = args.revalidate_secs {
        config = config.with_revalidate(Duration::from_secs(secs));
    }
    let audits_dir = config.audits_dir.display().to_string();
    tracing::debug!("Using audit directory {}", audits_dir);
    let repository = AuditRepository::new(config);

    // 5. Dispatch
    if let Some(slug) = &args.slug {
        let audit = repository
            .load_audit_by_slug(slug)
            .await
            .ok_or_else(|| AuditError::DocumentNotFound(slug.clone()))?;
        print_json(audit.as_ref(), args.pretty)?;
    } else if args.latest {
        let audit = repository
            .load_latest_audit()
            .await
            .ok_or(AppError::NoAudits(audits_dir))?;
        print_json(audit.as_ref(), args.pretty)?;
    } else {
        if !args.list {
            tracing::debug!("No mode selected, listing audits");
        }
        let audits = repository.load_all_audits().await;
        tracing::info!("Found {} audits", audits.len());
        print_json(&audits, args.pretty)?;
    }

    tracing::debug!("Cache stats: {:?}", repository.cache_stats());
    Ok(())
}
