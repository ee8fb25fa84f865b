// src/normalize/mod.rs
//! Assembles an `AuditData` from extracted sections. A document either
//! validates completely or is rejected with a reason; nothing partial leaks.

use crate::aggregate;
use crate::audit::{
    AuditData, AuditMetadata, CausalChain, CompanyInfo, Gaps, LlmResponse, Priorities, ReauditSchedule, TrustNode,
};
use crate::extractors::{
    extract_all, split_sections, CitationQualityRecord, Extraction, RankingsRecord, Section, SectionKind,
    SummaryRecord,
};
use crate::utils::error::{Diagnostics, ExtractionWarning, RejectReason};

/// Terminal state of a parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid(AuditData),
    Rejected(RejectReason),
}

impl Validation {
    pub fn into_result(self) -> Result<AuditData, RejectReason> {
        match self {
            Validation::Valid(data) => Ok(data),
            Validation::Rejected(reason) => Err(reason),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }
}

/// A validation together with the non-fatal warnings raised on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseReport {
    pub validation: Validation,
    pub warnings: Vec<ExtractionWarning>,
}

impl ParseReport {
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

/// Collects sections until every mandatory kind has been seen.
#[derive(Default)]
struct AuditBuilder {
    metadata: Option<AuditMetadata>,
    summary: Option<SummaryRecord>,
    trust_nodes: Option<Vec<TrustNode>>,
    citation_quality: Option<CitationQualityRecord>,
    rankings: Option<RankingsRecord>,
    priorities: Option<Priorities>,
    causal_chain: Option<CausalChain>,
    company_info: Option<CompanyInfo>,
    reaudit_schedule: Option<ReauditSchedule>,
    gaps: Option<Gaps>,
    llm_responses: Option<Vec<LlmResponse>>,
}

pub fn is_mandatory(kind: SectionKind) -> bool {
    matches!(
        kind,
        SectionKind::Metadata
            | SectionKind::ExecutiveSummary
            | SectionKind::TrustNodeCoverage
            | SectionKind::CitationQuality
            | SectionKind::LlmRankings
            | SectionKind::Priorities
    )
}

impl AuditBuilder {
    fn accept(&mut self, extraction: Extraction, diagnostics: &mut Diagnostics) -> Result<(), RejectReason> {
        match extraction {
            Extraction::Extracted(section) => {
                self.store(section);
                Ok(())
            }
            Extraction::NotPresent(kind) if is_mandatory(kind) => Err(RejectReason::MissingSection(kind)),
            Extraction::NotPresent(kind) => {
                tracing::debug!("Optional section {} not authored", kind);
                Ok(())
            }
            Extraction::Failed(kind, source) if is_mandatory(kind) => {
                Err(RejectReason::Unparsable { section: kind, source })
            }
            Extraction::Failed(kind, source) => {
                diagnostics.warn(kind, 0, format!("optional section dropped: {}", source));
                Ok(())
            }
        }
    }

    fn store(&mut self, section: Section) {
        tracing::trace!("Storing section {}", section.kind());
        match section {
            Section::Metadata(meta) => self.metadata = Some(meta),
            Section::ExecutiveSummary(summary) => self.summary = Some(summary),
            Section::TrustNodes(nodes) => self.trust_nodes = Some(nodes),
            Section::CitationQuality(record) => self.citation_quality = Some(record),
            Section::LlmRankings(record) => self.rankings = Some(record),
            Section::Priorities(priorities) => self.priorities = Some(priorities),
            Section::CausalChain(chain) => self.causal_chain = Some(chain),
            Section::CompanyInfo(info) => self.company_info = Some(info),
            Section::ReauditSchedule(schedule) => self.reaudit_schedule = Some(schedule),
            Section::Gaps(gaps) => self.gaps = Some(gaps),
            Section::LlmResponses(responses) => self.llm_responses = Some(responses),
        }
    }

    fn finish(self, diagnostics: &mut Diagnostics) -> Result<AuditData, RejectReason> {
        let missing = |kind| RejectReason::MissingSection(kind);
        let metadata = self.metadata.ok_or_else(|| missing(SectionKind::Metadata))?;
        let summary = self.summary.ok_or_else(|| missing(SectionKind::ExecutiveSummary))?;
        let nodes = self.trust_nodes.ok_or_else(|| missing(SectionKind::TrustNodeCoverage))?;
        let quality = self.citation_quality.ok_or_else(|| missing(SectionKind::CitationQuality))?;
        let rankings = self.rankings.ok_or_else(|| missing(SectionKind::LlmRankings))?;
        let priorities = self.priorities.ok_or_else(|| missing(SectionKind::Priorities))?;

        cross_check(&quality, diagnostics);

        let executive_summary = aggregate::executive_summary(summary);
        let trust_node_coverage = aggregate::trust_node_coverage(nodes);
        let citation_quality = aggregate::citation_quality(quality);
        let llm_rankings = aggregate::llm_rankings(rankings);
        let headline =
            aggregate::headline_metrics(&executive_summary, &trust_node_coverage, &citation_quality, &llm_rankings);

        Ok(AuditData {
            metadata,
            headline,
            executive_summary,
            trust_node_coverage,
            citation_quality,
            llm_rankings,
            priorities,
            causal_chain: self.causal_chain,
            company_info: self.company_info,
            reaudit_schedule: self.reaudit_schedule,
            gaps: self.gaps,
            llm_responses: self.llm_responses,
        })
    }
}

/// Stated averages and composites that disagree with the derived ones are
/// reported; the derived values always win.
fn cross_check(record: &CitationQualityRecord, diagnostics: &mut Diagnostics) {
    let section = SectionKind::CitationQuality;
    for citation in &record.citations {
        if let Some(stated) = citation.stated_composite {
            let derived = aggregate::composite_score(&citation.scores);
            if (stated - derived).abs() > 0.05 {
                diagnostics.warn(
                    section,
                    0,
                    format!("'{}' states composite {} but scores give {}", citation.source_name, stated, derived),
                );
            }
        }
    }
    if let Some(stated) = record.stated_average {
        if !record.dimensions.is_empty() {
            let derived = crate::extractors::markdown::round1(
                record.dimensions.iter().map(|d| d.score).sum::<f64>() / record.dimensions.len() as f64,
            );
            if (stated - derived).abs() > 0.05 {
                diagnostics.warn(section, 0, format!("stated average {} differs from derived {}", stated, derived));
            }
        }
    }
}

/// Full parse with its warnings.
pub fn parse_with_report(text: &str) -> ParseReport {
    let document = split_sections(text);
    let mut diagnostics = Diagnostics::new();
    for kind in &document.duplicates {
        diagnostics.warn(*kind, 0, "repeated section heading ignored");
    }

    let mut builder = AuditBuilder::default();
    let mut rejection = None;
    for extraction in extract_all(&document, &mut diagnostics) {
        if let Err(reason) = builder.accept(extraction, &mut diagnostics) {
            // First rejection in canonical section order wins.
            rejection.get_or_insert(reason);
        }
    }

    let validation = match rejection {
        Some(reason) => Validation::Rejected(reason),
        None => match builder.finish(&mut diagnostics) {
            Ok(data) => Validation::Valid(data),
            Err(reason) => Validation::Rejected(reason),
        },
    };
    if let Validation::Rejected(reason) = &validation {
        tracing::warn!("Audit document rejected: {}", reason);
    }
    ParseReport {
        validation,
        warnings: diagnostics.into_warnings(),
    }
}

/// Parses one raw audit document. Pure: no I/O, no clock.
pub fn parse_document(text: &str) -> Validation {
    parse_with_report(text).validation
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{BestPosition, CoverageStatus, CoverageStrength, Grade, Platform, QualityBucket, Sentiment, Tristate};
    use crate::utils::error::ExtractError;

    const SAMPLE: &str = include_str!("../../tests/fixtures/sample_audit.md");

    fn valid(text: &str) -> AuditData {
        match parse_document(text) {
            Validation::Valid(data) => data,
            Validation::Rejected(reason) => panic!("fixture rejected: {}", reason),
        }
    }

    #[test]
    fn fixture_parses_into_consistent_audit() {
        let audit = valid(SAMPLE);

        assert_eq!(audit.metadata.brand, "Acme Coffee Co.");
        assert_eq!(audit.metadata.slug, "acme-coffee-co-2025-01-15");
        assert_eq!(audit.executive_summary.grade, Grade::B);
        assert_eq!(audit.executive_summary.key_findings.len(), 3);

        let coverage = &audit.trust_node_coverage;
        assert_eq!(coverage.nodes.len(), 13);
        let directories = &coverage.categories[1];
        assert_eq!(directories.name, "Directories");
        assert_eq!((directories.coverage, directories.total, directories.percentage), (7, 10, 70));
        assert_eq!(directories.status, CoverageStatus::Good);
        assert_eq!(directories.strength, CoverageStrength::Strong);
        assert_eq!(coverage.categories[0].status, CoverageStatus::Critical);
        assert_eq!(coverage.categories[0].strength, CoverageStrength::Weak);
        assert_eq!(coverage.overall.percentage, 62);
        assert_eq!(coverage.overall.status, CoverageStatus::Weak);
        assert_eq!(coverage.overall.strength, CoverageStrength::Moderate);
        let gaps: Vec<&str> = coverage.critical_gaps.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(gaps, vec!["Wikipedia", "Wikidata"]);

        let quality = &audit.citation_quality;
        assert_eq!(quality.average, 7.0);
        assert_eq!(quality.strongest, "Brand Alignment");
        assert_eq!(quality.weakest, "Freshness");
        let buckets: Vec<QualityBucket> = quality.citations.iter().map(|c| c.bucket).collect();
        assert_eq!(buckets, vec![QualityBucket::High, QualityBucket::Medium, QualityBucket::Low]);
        assert_eq!(quality.distribution.total() as usize, quality.citations.len());

        let rankings = &audit.llm_rankings;
        assert_eq!(rankings.ai_citation_rate, 67);
        assert_eq!(
            rankings.best_position,
            BestPosition::Ranked {
                platform: Platform::ChatGpt,
                position: 3
            }
        );
        let brand_rows: Vec<&str> = rankings
            .competitors
            .iter()
            .filter(|row| row.is_brand_row)
            .map(|row| row.name.as_str())
            .collect();
        assert_eq!(brand_rows, vec!["Acme Coffee Co."]);
        assert_eq!(rankings.competitors[0].avg_position, Some(1.3));

        assert_eq!(audit.priorities.immediate.len(), 2);
        assert_eq!(audit.priorities.immediate[0].title, "Create Wikidata entry");
        assert_eq!(audit.priorities.long_term.len(), 1);

        assert_eq!(audit.causal_chain.as_ref().map(|c| c.chains.len()), Some(2));
        assert_eq!(audit.company_info, None, "Company Info was not authored");
        assert_eq!(audit.reaudit_schedule.as_ref().map(|s| s.milestones.len()), Some(2));
        assert_eq!(audit.gaps.as_ref().map(|g| g.critical.len()), Some(2));

        let responses = audit.llm_responses.as_ref().unwrap();
        assert_eq!(responses[0].sentiment, Sentiment::NotMentioned);
        assert_eq!(responses[1].brand_position, Tristate::Present(3));

        assert_eq!(audit.headline.platforms_cited, 2);
        assert_eq!(audit.headline.trust_node_coverage, 8);
        assert_eq!(audit.headline.citation_quality, 7.0);
    }

    #[test]
    fn parsing_is_idempotent() {
        let first = serde_json::to_string(&valid(SAMPLE)).unwrap();
        let second = serde_json::to_string(&valid(SAMPLE)).unwrap();
        assert_eq!(first, second);
        assert!(first.contains(r#""status":"Good","strength":"Strong""#));
    }

    #[test]
    fn one_present_node_less_flips_the_band() {
        let edited = SAMPLE.replacen("| | Yellow Pages | ✅ Yes | 5/10 |", "| | Yellow Pages | ❌ No | - |", 1);
        let audit = valid(&edited);
        let directories = &audit.trust_node_coverage.categories[1];
        assert_eq!(directories.percentage, 60);
        assert_eq!(directories.status, CoverageStatus::Weak);
    }

    #[test]
    fn missing_executive_summary_is_rejected() {
        let start = SAMPLE.find("## Executive Summary").unwrap();
        let end = SAMPLE.find("## Trust Node Coverage").unwrap();
        let mut edited = SAMPLE.to_string();
        edited.replace_range(start..end, "");
        assert_eq!(
            parse_document(&edited),
            Validation::Rejected(RejectReason::MissingSection(SectionKind::ExecutiveSummary))
        );
    }

    #[test]
    fn unusable_mandatory_section_is_unparsable() {
        let edited = SAMPLE.replace("**Overall Score:** 6.5/10", "Score pending review.");
        assert_eq!(
            parse_document(&edited),
            Validation::Rejected(RejectReason::Unparsable {
                section: SectionKind::ExecutiveSummary,
                source: ExtractError::MissingField {
                    section: SectionKind::ExecutiveSummary,
                    field: "overall score"
                },
            })
        );
    }

    #[test]
    fn broken_optional_section_becomes_absent_with_warning() {
        let edited = SAMPLE.replace("## Gaps\n", "## Company Info\nTBD\n\n## Gaps\n");
        let report = parse_with_report(&edited);
        let audit = report.validation.clone().into_result().unwrap();
        assert_eq!(audit.company_info, None);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.section == SectionKind::CompanyInfo && w.message.contains("optional section dropped")));
    }

    #[test]
    fn stated_average_mismatch_is_a_warning_not_a_failure() {
        let edited = SAMPLE.replace("**Average Score:** 7.0/10", "**Average Score:** 8.4/10");
        let report = parse_with_report(&edited);
        assert!(report.validation.is_valid());
        assert!(report.warning_count() >= 1);
    }
}
