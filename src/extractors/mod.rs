// src/extractors/mod.rs
pub mod causal_chain;
pub mod citations;
pub mod details;
pub mod markdown;
pub mod metadata;
pub mod priorities;
pub mod rankings;
pub mod responses;
pub mod splitter;
pub mod summary;
pub mod trust_nodes;

use crate::audit::{AuditMetadata, CausalChain, CompanyInfo, Gaps, LlmResponse, Priorities, ReauditSchedule, TrustNode};
use crate::utils::error::{Diagnostics, ExtractError};

// Re-export key extraction types for convenience
pub use citations::{CitationQualityRecord, CitationRecord};
pub use rankings::{CompetitorRecord, RankingsRecord};
pub use splitter::{split_sections, SectionKind, SplitDocument};
pub use summary::SummaryRecord;

/// One extracted section, before aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Metadata(AuditMetadata),
    ExecutiveSummary(SummaryRecord),
    TrustNodes(Vec<TrustNode>),
    CitationQuality(CitationQualityRecord),
    LlmRankings(RankingsRecord),
    Priorities(Priorities),
    CausalChain(CausalChain),
    CompanyInfo(CompanyInfo),
    ReauditSchedule(ReauditSchedule),
    Gaps(Gaps),
    LlmResponses(Vec<LlmResponse>),
}

impl Section {
    pub fn kind(&self) -> SectionKind {
        match self {
            Section::Metadata(_) => SectionKind::Metadata,
            Section::ExecutiveSummary(_) => SectionKind::ExecutiveSummary,
            Section::TrustNodes(_) => SectionKind::TrustNodeCoverage,
            Section::CitationQuality(_) => SectionKind::CitationQuality,
            Section::LlmRankings(_) => SectionKind::LlmRankings,
            Section::Priorities(_) => SectionKind::Priorities,
            Section::CausalChain(_) => SectionKind::CausalChain,
            Section::CompanyInfo(_) => SectionKind::CompanyInfo,
            Section::ReauditSchedule(_) => SectionKind::ReauditSchedule,
            Section::Gaps(_) => SectionKind::Gaps,
            Section::LlmResponses(_) => SectionKind::LlmResponses,
        }
    }
}

/// Outcome of running one extractor over its span.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Extracted(Section),
    /// The heading never appeared (empty span).
    NotPresent(SectionKind),
    Failed(SectionKind, ExtractError),
}

/// Runs the extractor for `kind` over its span of the split document.
pub fn extract_section(kind: SectionKind, document: &SplitDocument, diagnostics: &mut Diagnostics) -> Extraction {
    let block = document.section(kind);

    // Metadata may live in the preamble instead of its own section.
    if kind != SectionKind::Metadata && block.trim().is_empty() {
        return Extraction::NotPresent(kind);
    }

    let result = match kind {
        SectionKind::Metadata => match metadata::extract_metadata(block, &document.preamble, diagnostics) {
            Err(_) if !document.has_section(kind) => return Extraction::NotPresent(kind),
            other => other.map(Section::Metadata),
        },
        SectionKind::ExecutiveSummary => summary::extract_summary(block, diagnostics).map(Section::ExecutiveSummary),
        SectionKind::TrustNodeCoverage => trust_nodes::extract_trust_nodes(block, diagnostics).map(Section::TrustNodes),
        SectionKind::CitationQuality => {
            citations::extract_citation_quality(block, diagnostics).map(Section::CitationQuality)
        }
        SectionKind::LlmRankings => rankings::extract_rankings(block, diagnostics).map(Section::LlmRankings),
        SectionKind::Priorities => priorities::extract_priorities(block, diagnostics).map(Section::Priorities),
        SectionKind::CausalChain => causal_chain::extract_causal_chain(block, diagnostics).map(Section::CausalChain),
        SectionKind::CompanyInfo => details::extract_company_info(block, diagnostics).map(Section::CompanyInfo),
        SectionKind::ReauditSchedule => {
            details::extract_reaudit_schedule(block, diagnostics).map(Section::ReauditSchedule)
        }
        SectionKind::Gaps => details::extract_gaps(block, diagnostics).map(Section::Gaps),
        SectionKind::LlmResponses => responses::extract_responses(block, diagnostics).map(Section::LlmResponses),
    };

    match result {
        Ok(section) => Extraction::Extracted(section),
        Err(e) => {
            tracing::debug!("Extraction of {} failed: {}", kind, e);
            Extraction::Failed(kind, e)
        }
    }
}

/// Every section kind, in canonical order.
pub fn extract_all(document: &SplitDocument, diagnostics: &mut Diagnostics) -> Vec<Extraction> {
    SectionKind::ALL
        .into_iter()
        .map(|kind| extract_section(kind, document, diagnostics))
        .collect()
}

/// Identity-only parse used for listing: split plus metadata.
pub fn read_metadata(text: &str) -> Result<AuditMetadata, ExtractError> {
    let document = split_sections(text);
    let mut diagnostics = Diagnostics::new();
    metadata::extract_metadata(document.section(SectionKind::Metadata), &document.preamble, &mut diagnostics)
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_span_is_not_present() {
        let document = split_sections("# Audit: Acme\n\n## Executive Summary\nOverall Score: 7\n");
        let mut diagnostics = Diagnostics::new();
        assert_eq!(
            extract_section(SectionKind::CompanyInfo, &document, &mut diagnostics),
            Extraction::NotPresent(SectionKind::CompanyInfo)
        );
        assert!(matches!(
            extract_section(SectionKind::ExecutiveSummary, &document, &mut diagnostics),
            Extraction::Extracted(Section::ExecutiveSummary(_))
        ));
        assert_eq!(
            extract_section(SectionKind::Metadata, &document, &mut diagnostics),
            Extraction::NotPresent(SectionKind::Metadata)
        );
    }

    #[test]
    fn present_but_unusable_span_fails() {
        let document = split_sections("## Trust Node Coverage\nTo be completed.\n");
        let mut diagnostics = Diagnostics::new();
        assert_eq!(
            extract_section(SectionKind::TrustNodeCoverage, &document, &mut diagnostics),
            Extraction::Failed(SectionKind::TrustNodeCoverage, ExtractError::NoRecords(SectionKind::TrustNodeCoverage))
        );
    }
}
