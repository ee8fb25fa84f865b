// src/extractors/rankings.rs
use super::markdown::{is_bold, parse_count, parse_flag, parse_position, strip_emphasis, tables, Table, TableRow};
use super::splitter::SectionKind;
use crate::audit::{Platform, PlatformPositions, PlatformResult, Tristate};
use crate::utils::error::{Diagnostics, ExtractError};

const PLATFORM_COLUMNS: [&str; 4] = ["platform", "ai platform", "llm", "engine"];
const COMPETITOR_COLUMNS: [&str; 5] = ["competitor", "brand", "company", "name", "business"];

/// Competitor table row before its average position is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitorRecord {
    pub name: String,
    pub positions: PlatformPositions,
    pub is_brand_row: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RankingsRecord {
    /// Platform rows in document order, one per platform at most.
    pub platforms: Vec<PlatformResult>,
    pub competitors: Vec<CompetitorRecord>,
}

fn read_position(cell: &str, line: usize, diagnostics: &mut Diagnostics) -> Tristate<u32> {
    parse_position(cell).unwrap_or_else(|message| {
        diagnostics.warn(SectionKind::LlmRankings, line, message);
        Tristate::Null
    })
}

/// "#3", the cell text when explicitly unranked, or "Not tracked".
pub fn position_text(position: Tristate<u32>, raw: &str) -> String {
    match position {
        Tristate::Present(rank) => format!("#{}", rank),
        Tristate::Null => {
            let cleaned = strip_emphasis(raw);
            if cleaned.is_empty() || cleaned.chars().all(|c| matches!(c, '-' | '—' | '–')) {
                "Not ranked".to_string()
            } else {
                cleaned
            }
        }
        Tristate::Absent => "Not tracked".to_string(),
    }
}

fn platform_row(table: &Table, row: &TableRow, platform_col: usize, diagnostics: &mut Diagnostics) -> Option<PlatformResult> {
    let section = SectionKind::LlmRankings;
    let raw_name = row.cell(Some(platform_col));
    let Some(platform) = Platform::from_name(raw_name) else {
        diagnostics.warn(section, row.line, format!("unknown platform '{}'", strip_emphasis(raw_name)));
        return None;
    };

    let cited_col = table.column(&["cited", "brand cited", "cited?", "mentioned"]);
    let position_col = table.column(&["position", "rank", "brand position", "ranking"]);
    let citations_col = table.column(&["citations", "citations found", "sources"]);
    let context_col = table.column(&["context", "notes", "details"]);

    let raw_position = row.cell(position_col);
    let position = read_position(raw_position, row.line, diagnostics);

    let cited = match parse_flag(row.cell(cited_col)) {
        Some(cited) => cited,
        None => {
            let derived = position.is_present();
            diagnostics.warn(
                section,
                row.line,
                format!("cited flag for {} missing, derived '{}' from position", platform, derived),
            );
            derived
        }
    };

    let context = strip_emphasis(row.cell(context_col));

    Some(PlatformResult {
        platform,
        cited,
        position,
        position_text: position_text(position, raw_position),
        citations_found: parse_count(row.cell(citations_col)).unwrap_or(0),
        context: (!context.is_empty() && context != "-").then_some(context),
    })
}

fn competitor_table(table: &Table, name_col: usize, diagnostics: &mut Diagnostics) -> Vec<CompetitorRecord> {
    let platform_cols: Vec<(Platform, usize)> = table
        .headers
        .iter()
        .enumerate()
        .filter_map(|(index, header)| Platform::from_name(header).map(|platform| (platform, index)))
        .collect();

    let mut rows = Vec::new();
    for row in &table.rows {
        let raw_name = row.cell(Some(name_col));
        let name = strip_emphasis(raw_name);
        if name.is_empty() {
            diagnostics.warn(SectionKind::LlmRankings, row.line, "competitor row without a name skipped");
            continue;
        }
        let mut positions = PlatformPositions::default();
        for &(platform, column) in &platform_cols {
            positions.set(platform, read_position(row.cell(Some(column)), row.line, diagnostics));
        }
        rows.push(CompetitorRecord {
            name,
            positions,
            is_brand_row: is_bold(raw_name),
        });
    }
    rows
}

/// Platform table plus the optional competitor comparison table.
pub fn extract_rankings(block: &str, diagnostics: &mut Diagnostics) -> Result<RankingsRecord, ExtractError> {
    let section = SectionKind::LlmRankings;
    let mut record = RankingsRecord::default();

    for table in tables(block) {
        if let Some(platform_col) = table.column(&PLATFORM_COLUMNS) {
            for row in &table.rows {
                let Some(result) = platform_row(&table, row, platform_col, diagnostics) else {
                    continue;
                };
                if record.platforms.iter().any(|seen| seen.platform == result.platform) {
                    diagnostics.warn(section, row.line, format!("duplicate {} row ignored", result.platform));
                    continue;
                }
                record.platforms.push(result);
            }
        } else if let Some(name_col) = table.column(&COMPETITOR_COLUMNS) {
            if table.headers.iter().any(|header| Platform::from_name(header).is_some()) {
                record.competitors.extend(competitor_table(&table, name_col, diagnostics));
            }
        } else {
            tracing::trace!("Ignoring table with headers {:?}", table.headers);
        }
    }

    if record.platforms.is_empty() {
        return Err(ExtractError::NoRecords(section));
    }
    if !record.competitors.is_empty() && !record.competitors.iter().any(|row| row.is_brand_row) {
        diagnostics.warn(section, 0, "no bold brand row in competitor table");
    }
    tracing::debug!(
        "Extracted {} platform rows and {} competitor rows",
        record.platforms.len(),
        record.competitors.len()
    );
    Ok(record)
}
