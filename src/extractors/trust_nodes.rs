// src/extractors/trust_nodes.rs
use super::markdown::{parse_flag, parse_number, strip_emphasis, subsections, unwrap_link, Table};
use super::splitter::SectionKind;
use crate::audit::{Tristate, TrustNode};
use crate::utils::error::{Diagnostics, ExtractError};

const NAME_COLUMNS: [&str; 4] = ["trust node", "node", "name", "signal"];
const PRESENT_COLUMNS: [&str; 5] = ["present", "status", "exists", "found", "present?"];

fn is_node_table(table: &Table) -> bool {
    table.column(&NAME_COLUMNS).is_some() && table.column(&PRESENT_COLUMNS).is_some()
}

fn optional_text(cell: &str) -> Option<String> {
    let cleaned = strip_emphasis(cell);
    match cleaned.to_lowercase().as_str() {
        "" | "-" | "—" | "n/a" | "none" => None,
        _ => Some(cleaned),
    }
}

/// Reads every trust-node table in the section. Tables without a category
/// column take their category from the enclosing sub-heading.
pub fn extract_trust_nodes(block: &str, diagnostics: &mut Diagnostics) -> Result<Vec<TrustNode>, ExtractError> {
    let section = SectionKind::TrustNodeCoverage;
    let mut nodes = Vec::new();

    for part in subsections(block) {
        let heading_category = part.heading.clone();

        for table in part.tables().into_iter().filter(is_node_table) {
            let category_col = table.column(&["category", "node category", "group"]);
            let name_col = table.column(&NAME_COLUMNS);
            let present_col = table.column(&PRESENT_COLUMNS);
            let quality_col = table.column(&["quality", "quality score", "score"]);
            let url_col = table.column(&["url", "source", "link", "source url"]);
            let notes_col = table.column(&["notes", "details", "comments", "note"]);
            let impact_col = table.column(&["impact", "gap impact"]);

            let mut last_category: Option<String> = None;

            for row in &table.rows {
                let name = strip_emphasis(row.cell(name_col));
                if name.is_empty() {
                    diagnostics.warn(section, row.line, "trust node row without a name skipped");
                    continue;
                }

                let category = optional_text(row.cell(category_col))
                    .or_else(|| last_category.clone())
                    .or_else(|| heading_category.clone());
                let Some(category) = category else {
                    diagnostics.warn(section, row.line, format!("no category for trust node '{}'", name));
                    continue;
                };
                last_category = Some(category.clone());

                let Some(present) = parse_flag(row.cell(present_col)) else {
                    diagnostics.warn(
                        section,
                        row.line,
                        format!("unreadable presence '{}' for '{}'", row.cell(present_col), name),
                    );
                    continue;
                };

                let quality_score = match quality_col {
                    None => Tristate::Absent,
                    Some(_) => match optional_text(row.cell(quality_col)) {
                        None => Tristate::Null,
                        Some(text) => match parse_number(&text) {
                            Some(score) if (0.0..=10.0).contains(&score) => Tristate::Present(score),
                            Some(score) => {
                                diagnostics.warn(section, row.line, format!("quality {} clamped to 0-10", score));
                                Tristate::Present(score.clamp(0.0, 10.0))
                            }
                            None => {
                                diagnostics.warn(section, row.line, format!("unreadable quality '{}'", text));
                                Tristate::Null
                            }
                        },
                    },
                };
                let quality_score = if present {
                    quality_score
                } else {
                    if quality_score.is_present() {
                        diagnostics.warn(
                            section,
                            row.line,
                            format!("quality score dropped for absent node '{}'", name),
                        );
                    }
                    Tristate::Absent
                };

                nodes.push(TrustNode {
                    category,
                    name,
                    present,
                    quality_score,
                    url: optional_text(row.cell(url_col)).map(|url| unwrap_link(&url)),
                    notes: optional_text(row.cell(notes_col)).unwrap_or_default(),
                    impact: optional_text(row.cell(impact_col)),
                });
            }
        }
    }

    if nodes.is_empty() {
        return Err(ExtractError::NoRecords(section));
    }
    tracing::debug!("Extracted {} trust nodes", nodes.len());
    Ok(nodes)
}
