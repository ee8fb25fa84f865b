// src/extractors/citations.rs
use once_cell::sync::Lazy;
use regex::Regex;

use super::markdown::{
    domain_of, labeled, list_item, parse_number, split_inline_list, strip_emphasis, subsections, unwrap_link,
    Labeled,
};
use super::splitter::SectionKind;
use crate::audit::{CitedBy, DimensionScores, Platform, QualityDimension};
use crate::utils::error::{Diagnostics, ExtractError};

static DIMENSION_SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(authority|data[\s-]*structure|brand[\s-]*alignment|freshness|cross[\s-]*links?)\s*[:=]?\s*(\d+(?:\.\d+)?)")
        .expect("Failed to compile DIMENSION_SCORE_RE")
});

// "Citation 3: Wikipedia", "Source #2 - Yelp", "1. Forbes"
static CITATION_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:citation|source)\s*#?\s*\d*\s*[:.\-–—]?\s*|\d+[.)]\s+)")
        .expect("Failed to compile CITATION_PREFIX_RE")
});

/// A citation as written, before its composite score is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct CitationRecord {
    pub source_url: String,
    pub source_name: String,
    pub source_domain: String,
    pub source_type: String,
    pub scores: DimensionScores,
    pub cited_by: CitedBy,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub notes: String,
    /// Composite stated by the document, kept only for cross-checking.
    pub stated_composite: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CitationQualityRecord {
    pub dimensions: Vec<QualityDimension>,
    pub citations: Vec<CitationRecord>,
    pub stated_average: Option<f64>,
}

/// Index into `DimensionScores::as_array()` order.
fn dimension_index(name: &str) -> Option<usize> {
    let key: String = name.to_lowercase().chars().filter(|c| c.is_ascii_alphabetic()).collect();
    match key.as_str() {
        "authority" | "authorityscore" => Some(0),
        "datastructure" | "structure" | "datastructurescore" => Some(1),
        "brandalignment" | "alignment" | "brandalignmentscore" => Some(2),
        "freshness" | "freshnessscore" | "recency" => Some(3),
        "crosslinks" | "crosslink" | "crosslinkscore" | "crosslinksscore" => Some(4),
        _ => None,
    }
}

fn clamp_score(score: f64, diagnostics: &mut Diagnostics, line: usize) -> f64 {
    if (0.0..=10.0).contains(&score) {
        score
    } else {
        diagnostics.warn(SectionKind::CitationQuality, line, format!("score {} clamped to 0-10", score));
        score.clamp(0.0, 10.0)
    }
}

#[derive(Default)]
struct CitationDraft {
    name: String,
    url: Option<String>,
    domain: Option<String>,
    source_type: Option<String>,
    scores: [Option<f64>; 5],
    cited_by: CitedBy,
    strengths: Vec<String>,
    weaknesses: Vec<String>,
    notes: Vec<String>,
    stated_composite: Option<f64>,
    first_line: usize,
}

#[derive(Clone, Copy, PartialEq)]
enum ListTarget {
    None,
    Strengths,
    Weaknesses,
}

impl CitationDraft {
    fn looks_like_citation(&self) -> bool {
        self.url.is_some() || self.scores.iter().any(Option::is_some)
    }

    fn finish(self, diagnostics: &mut Diagnostics) -> Option<CitationRecord> {
        let section = SectionKind::CitationQuality;
        let missing: Vec<&str> = self
            .scores
            .iter()
            .zip(DimensionScores::NAMES)
            .filter(|(score, _)| score.is_none())
            .map(|(_, name)| name)
            .collect();
        if !missing.is_empty() {
            diagnostics.warn(
                section,
                self.first_line,
                format!("citation '{}' dropped, missing scores: {}", self.name, missing.join(", ")),
            );
            return None;
        }
        let [authority, data_structure, brand_alignment, freshness, cross_links] =
            self.scores.map(|score| score.unwrap_or_default());
        let source_url = self.url.unwrap_or_default();
        let source_domain = self
            .domain
            .filter(|domain| !domain.is_empty())
            .unwrap_or_else(|| domain_of(&source_url));
        let source_name = if self.name.is_empty() { source_domain.clone() } else { self.name };

        Some(CitationRecord {
            source_url,
            source_name,
            source_domain,
            source_type: self.source_type.unwrap_or_default(),
            scores: DimensionScores {
                authority,
                data_structure,
                brand_alignment,
                freshness,
                cross_links,
            },
            cited_by: self.cited_by,
            strengths: self.strengths,
            weaknesses: self.weaknesses,
            notes: self.notes.join(" "),
            stated_composite: self.stated_composite,
        })
    }

    fn apply_label(&mut self, label: Labeled, line: usize, diagnostics: &mut Diagnostics) -> ListTarget {
        let section = SectionKind::CitationQuality;
        match label.key.as_str() {
            "url" | "source url" | "link" | "source" => self.url = Some(unwrap_link(&label.value)),
            "domain" | "source domain" => self.domain = Some(label.value),
            "type" | "source type" => self.source_type = Some(label.value),
            "scores" | "dimension scores" => {
                let mut found = 0;
                for caps in DIMENSION_SCORE_RE.captures_iter(&label.value) {
                    if let (Some(index), Ok(score)) = (dimension_index(&caps[1]), caps[2].parse::<f64>()) {
                        self.scores[index] = Some(clamp_score(score, diagnostics, line));
                        found += 1;
                    }
                }
                if found == 0 {
                    diagnostics.warn(section, line, format!("no dimension scores in '{}'", label.value));
                }
            }
            "composite" | "composite score" | "overall" => self.stated_composite = parse_number(&label.value),
            "cited by" | "cited on" | "platforms" => {
                for name in split_inline_list(&label.value) {
                    match Platform::from_name(&name) {
                        Some(platform) => self.cited_by.set(platform),
                        None => diagnostics.warn(section, line, format!("unknown platform '{}'", name)),
                    }
                }
            }
            "strengths" | "strength" => {
                self.strengths.extend(split_inline_list(&label.value));
                return ListTarget::Strengths;
            }
            "weaknesses" | "weakness" => {
                self.weaknesses.extend(split_inline_list(&label.value));
                return ListTarget::Weaknesses;
            }
            "notes" | "note" => self.notes.push(label.value),
            key => match dimension_index(key) {
                Some(index) => match parse_number(&label.value) {
                    Some(score) => self.scores[index] = Some(clamp_score(score, diagnostics, line)),
                    None => diagnostics.warn(section, line, format!("unreadable {} score '{}'", key, label.value)),
                },
                None => tracing::trace!("Ignoring citation label '{}'", key),
            },
        }
        ListTarget::None
    }
}

/// Dimension table plus one labeled block per citation.
pub fn extract_citation_quality(
    block: &str,
    diagnostics: &mut Diagnostics,
) -> Result<CitationQualityRecord, ExtractError> {
    let section = SectionKind::CitationQuality;
    let mut record = CitationQualityRecord::default();

    for part in subsections(block) {
        // Dimension table, wherever it appears.
        for table in part.tables() {
            let Some(name_col) = table.column(&["dimension", "quality dimension"]) else {
                continue;
            };
            let score_col = table.column(&["score", "average score", "avg score"]);
            let assessment_col = table.column(&["assessment", "notes", "analysis"]);
            for row in &table.rows {
                let name = strip_emphasis(row.cell(Some(name_col)));
                match parse_number(row.cell(score_col)) {
                    Some(score) if !name.is_empty() => record.dimensions.push(QualityDimension {
                        name,
                        score: clamp_score(score, diagnostics, row.line),
                        assessment: strip_emphasis(row.cell(assessment_col)),
                    }),
                    _ => diagnostics.warn(section, row.line, "dimension row without name or score skipped"),
                }
            }
        }

        let mut draft = CitationDraft {
            name: part
                .heading
                .as_deref()
                .map(|heading| CITATION_PREFIX_RE.replace(heading, "").trim().to_string())
                .unwrap_or_default(),
            first_line: part.lines.first().map_or(0, |(number, _)| *number),
            ..CitationDraft::default()
        };
        let mut target = ListTarget::None;

        for &(number, line) in &part.lines {
            if line.trim_start().starts_with('|') {
                continue;
            }
            if let Some(label) = labeled(line) {
                if label.is(&["average", "average score", "overall average"]) {
                    record.stated_average = parse_number(&label.value);
                    continue;
                }
                let label_target = draft.apply_label(label, number, diagnostics);
                target = label_target;
                continue;
            }
            if let Some(item) = list_item(line) {
                let text = strip_emphasis(item.text);
                match target {
                    ListTarget::Strengths => draft.strengths.push(text),
                    ListTarget::Weaknesses => draft.weaknesses.push(text),
                    ListTarget::None => {}
                }
            }
        }

        if draft.looks_like_citation() {
            if let Some(citation) = draft.finish(diagnostics) {
                record.citations.push(citation);
            }
        }
    }

    if record.dimensions.is_empty() && record.citations.is_empty() {
        return Err(ExtractError::NoRecords(section));
    }
    tracing::debug!(
        "Extracted {} quality dimensions and {} citations",
        record.dimensions.len(),
        record.citations.len()
    );
    Ok(record)
}
