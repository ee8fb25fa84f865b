// src/extractors/metadata.rs
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::markdown::{labeled, strip_emphasis, unwrap_link};
use super::splitter::{parse_heading, SectionKind};
use crate::audit::AuditMetadata;
use crate::utils::error::{Diagnostics, ExtractError};

// "# AI Visibility Audit: Acme Coffee", "# Citation Audit — Acme"
static TITLE_BRAND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)audit(?: report)?\s*(?:[:|]|\s[-–—]\s|\sfor\s)\s*(.+?)\s*$")
        .expect("Failed to compile TITLE_BRAND_RE")
});

static ORDINAL_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d)(?:st|nd|rd|th)\b").expect("Failed to compile ORDINAL_SUFFIX_RE")
});

const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y/%m/%d",
];

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = strip_emphasis(raw);
    // Drop ordinal suffixes: "January 5th, 2025".
    let cleaned = ORDINAL_SUFFIX_RE.replace_all(&cleaned, "$1").into_owned();
    let cleaned = cleaned.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(cleaned, format).ok())
        .or_else(|| {
            // "2025-01-15T10:00:00Z" and similar: keep the date part.
            cleaned
                .get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}

/// URL- and filesystem-safe identifier: lowercase ASCII alphanumerics
/// joined by single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_ascii() {
            pending_dash = true;
        }
        // Non-ASCII characters are dropped without splitting the word.
    }
    slug
}

pub fn base_slug(brand: &str, date: NaiveDate) -> String {
    let brand_slug = slugify(brand);
    if brand_slug.is_empty() {
        format!("audit-{}", date.format("%Y-%m-%d"))
    } else {
        format!("{}-{}", brand_slug, date.format("%Y-%m-%d"))
    }
}

/// Extracts metadata from the Metadata section, falling back to the
/// preamble (labeled lines and title) when the section is not authored.
pub fn extract_metadata(
    block: &str,
    preamble: &str,
    diagnostics: &mut Diagnostics,
) -> Result<AuditMetadata, ExtractError> {
    let section = SectionKind::Metadata;
    let mut brand: Option<String> = None;
    let mut category: Option<String> = None;
    let mut date: Option<NaiveDate> = None;
    let mut unreadable_date: Option<String> = None;
    let mut website: Option<String> = None;

    let source = if block.trim().is_empty() {
        tracing::debug!("No Metadata section, scanning document preamble");
        preamble
    } else {
        block
    };

    for (index, line) in source.lines().enumerate() {
        if let Some(heading) = parse_heading(line) {
            if brand.is_none() {
                if let Some(caps) = TITLE_BRAND_RE.captures(&heading.text) {
                    brand = Some(strip_emphasis(&caps[1]));
                }
            }
            continue;
        }
        let Some(label) = labeled(line) else {
            continue;
        };
        match label.key.as_str() {
            "brand" | "brand name" | "company" | "company name" => {
                brand = Some(label.value);
            }
            "category" | "industry category" | "market" | "vertical" => {
                category = Some(label.value);
            }
            "date" | "audit date" | "report date" | "generated" => match parse_date(&label.value) {
                Some(parsed) => date = Some(parsed),
                None => {
                    diagnostics.warn(
                        section,
                        index + 1,
                        format!("unrecognized date '{}'", label.value),
                    );
                    unreadable_date.get_or_insert(label.value);
                }
            },
            "website" | "url" | "domain" | "site" => {
                let url = unwrap_link(&label.value);
                if !url.is_empty() {
                    website = Some(url);
                }
            }
            other => tracing::trace!("Ignoring metadata label '{}'", other),
        }
    }

    let brand = brand
        .filter(|b| !b.is_empty())
        .ok_or(ExtractError::MissingField { section, field: "brand" })?;
    let category = category
        .filter(|c| !c.is_empty())
        .ok_or(ExtractError::MissingField { section, field: "category" })?;
    let date = match (date, unreadable_date) {
        (Some(date), _) => date,
        (None, Some(value)) => {
            return Err(ExtractError::InvalidValue {
                section,
                field: "date",
                value,
            })
        }
        (None, None) => return Err(ExtractError::MissingField { section, field: "date" }),
    };

    Ok(AuditMetadata {
        slug: base_slug(&brand, date),
        brand,
        category,
        date,
        website,
    })
}
