// src/extractors/summary.rs
use super::markdown::{is_prose, labeled, list_item, parse_number, strip_emphasis};
use super::splitter::{parse_heading, SectionKind};
use crate::utils::error::{Diagnostics, ExtractError};

/// Executive summary as written; the grade is derived later.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub overall_score: f64,
    pub bottom_line: String,
    pub key_findings: Vec<String>,
}

const SCORE_KEYS: [&str; 5] = [
    "overall score",
    "overall ai visibility score",
    "ai visibility score",
    "visibility score",
    "score",
];

pub fn extract_summary(block: &str, diagnostics: &mut Diagnostics) -> Result<SummaryRecord, ExtractError> {
    let section = SectionKind::ExecutiveSummary;
    let mut overall_score: Option<f64> = None;
    let mut bottom_line: Option<String> = None;
    let mut first_paragraph: Vec<String> = Vec::new();
    let mut paragraph_closed = false;
    let mut in_findings = false;
    let mut findings: Vec<String> = Vec::new();
    let mut all_items: Vec<String> = Vec::new();

    for (index, line) in block.lines().enumerate() {
        let number = index + 1;

        if let Some(heading) = parse_heading(line) {
            in_findings = heading.text.to_lowercase().contains("key findings");
            if !first_paragraph.is_empty() {
                paragraph_closed = true;
            }
            continue;
        }

        if let Some(label) = labeled(line) {
            if label.is(&SCORE_KEYS) {
                match parse_number(&label.value) {
                    Some(score) if (0.0..=10.0).contains(&score) => overall_score = Some(score),
                    Some(score) => {
                        diagnostics.warn(section, number, format!("overall score {} clamped to 0-10", score));
                        overall_score = Some(score.clamp(0.0, 10.0));
                    }
                    None => diagnostics.warn(
                        section,
                        number,
                        format!("unreadable overall score '{}'", label.value),
                    ),
                }
                continue;
            }
            if label.is(&["bottom line", "tl;dr", "tldr"]) {
                bottom_line = Some(label.value);
                continue;
            }
            if label.is(&["key findings"]) {
                in_findings = true;
                continue;
            }
        }

        if let Some(item) = list_item(line) {
            let text = strip_emphasis(item.text);
            if text.is_empty() {
                continue;
            }
            if in_findings {
                findings.push(text.clone());
            }
            if item.indent == 0 {
                all_items.push(text);
            }
            continue;
        }

        if is_prose(line) {
            if !paragraph_closed {
                first_paragraph.push(line.trim().to_string());
            }
        } else if line.trim().is_empty() && !first_paragraph.is_empty() {
            paragraph_closed = true;
        }
    }

    let overall_score = overall_score.ok_or(ExtractError::MissingField {
        section,
        field: "overall score",
    })?;

    let bottom_line = bottom_line
        .or_else(|| (!first_paragraph.is_empty()).then(|| first_paragraph.join(" ")))
        .unwrap_or_default();
    if bottom_line.is_empty() {
        diagnostics.warn(section, 0, "no bottom line found");
    }

    let key_findings = if findings.is_empty() { all_items } else { findings };

    Ok(SummaryRecord {
        overall_score,
        bottom_line,
        key_findings,
    })
}
