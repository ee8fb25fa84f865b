// src/extractors/splitter.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

// --- Regex Patterns (Lazy Static) ---
// ATX heading: hashes, text, optional closing hashes.
static HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s{0,3}(#{1,6})\s+(.*?)\s*#*\s*$").expect("Failed to compile HEADING_RE")
});

// Leading numbering on a heading: "1.", "2)", "Section 3:", "Part IV -".
static HEADING_NUMBERING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:section|part)\s+)?(?:\d+|[ivx]+)[\.\):\-]?\s+")
        .expect("Failed to compile HEADING_NUMBERING_RE")
});

// Trailing "(8/13)" or "[draft]".
static HEADING_PAREN_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*(?:\([^()]*\)|\[[^\[\]]*\])\s*$").expect("Failed to compile HEADING_PAREN_SUFFIX_RE")
});

// " — Acme Coffee", " - 2025". Spaced dashes only, so "Re-audit" survives.
static HEADING_DASH_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+[—–-]+\s+.*$").expect("Failed to compile HEADING_DASH_SUFFIX_RE")
});

// ": Acme Coffee", "| Q1". Not inside a parenthetical.
static HEADING_COLON_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*[:|]\s+[^()]*$").expect("Failed to compile HEADING_COLON_SUFFIX_RE")
});

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s{0,3}(```|~~~)").expect("Failed to compile FENCE_RE"));

/// Recognized section kinds, in canonical document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    Metadata,
    ExecutiveSummary,
    TrustNodeCoverage,
    CitationQuality,
    LlmRankings,
    Priorities,
    CausalChain,
    CompanyInfo,
    ReauditSchedule,
    Gaps,
    LlmResponses,
}

impl SectionKind {
    pub const ALL: [SectionKind; 11] = [
        SectionKind::Metadata,
        SectionKind::ExecutiveSummary,
        SectionKind::TrustNodeCoverage,
        SectionKind::CitationQuality,
        SectionKind::LlmRankings,
        SectionKind::Priorities,
        SectionKind::CausalChain,
        SectionKind::CompanyInfo,
        SectionKind::ReauditSchedule,
        SectionKind::Gaps,
        SectionKind::LlmResponses,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Metadata => "Metadata",
            SectionKind::ExecutiveSummary => "Executive Summary",
            SectionKind::TrustNodeCoverage => "Trust Node Coverage",
            SectionKind::CitationQuality => "Citation Quality",
            SectionKind::LlmRankings => "LLM Rankings",
            SectionKind::Priorities => "Priorities",
            SectionKind::CausalChain => "Causal Chain",
            SectionKind::CompanyInfo => "Company Info",
            SectionKind::ReauditSchedule => "Re-audit Schedule",
            SectionKind::Gaps => "Gaps",
            SectionKind::LlmResponses => "LLM Responses",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            SectionKind::Metadata => &["metadata", "audit metadata", "audit details"],
            SectionKind::ExecutiveSummary => &["executive summary", "summary"],
            SectionKind::TrustNodeCoverage => {
                &["trust node coverage", "trust nodes", "trust node analysis"]
            }
            SectionKind::CitationQuality => &["citation quality", "citation quality analysis"],
            SectionKind::LlmRankings => {
                &["llm rankings", "ai platform rankings", "llm platform rankings"]
            }
            SectionKind::Priorities => &["priorities", "recommendations", "priority actions"],
            SectionKind::CausalChain => &["causal chain", "causal chain analysis"],
            SectionKind::CompanyInfo => &["company info", "company information"],
            SectionKind::ReauditSchedule => {
                &["re-audit schedule", "reaudit schedule", "re-audit plan"]
            }
            SectionKind::Gaps => &["gaps", "critical gaps"],
            SectionKind::LlmResponses => &["llm responses", "platform responses"],
        }
    }

    /// Matches a heading's text against the vocabulary. Decorations such as
    /// "(8/13)" or " — Acme" are peeled off one at a time until a match.
    pub fn from_heading(text: &str) -> Option<Self> {
        let mut candidate = text.trim().to_string();
        if let Some(kind) = Self::from_normalized(&candidate) {
            return Some(kind);
        }
        let suffixes: [&Regex; 4] = [
            &HEADING_PAREN_SUFFIX_RE,
            &HEADING_DASH_SUFFIX_RE,
            &HEADING_COLON_SUFFIX_RE,
            &HEADING_PAREN_SUFFIX_RE,
        ];
        for suffix in suffixes {
            let stripped = suffix.replace(&candidate, "").trim().to_string();
            if stripped.is_empty() || stripped == candidate {
                continue;
            }
            candidate = stripped;
            if let Some(kind) = Self::from_normalized(&candidate) {
                tracing::trace!("Heading '{}' matched as {}", text, kind);
                return Some(kind);
            }
        }
        None
    }

    fn from_normalized(text: &str) -> Option<Self> {
        let normalized = normalize_heading(text);
        SectionKind::ALL
            .into_iter()
            .find(|kind| kind.aliases().iter().any(|alias| *alias == normalized))
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Lowercases, strips numbering, emphasis, emoji and trailing punctuation.
fn normalize_heading(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '.' | ')' | ':' | '&'))
        .collect();
    let stripped = stripped.trim();
    let without_number = HEADING_NUMBERING_RE.replace(stripped, "");
    without_number
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ':' | '-' | ')'))
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A parsed heading line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: usize,
    pub text: String,
}

/// Returns the heading on this line, if any. Does not know about fences.
pub fn parse_heading(line: &str) -> Option<Heading> {
    HEADING_RE.captures(line).map(|caps| Heading {
        level: caps[1].len(),
        text: caps[2].trim().to_string(),
    })
}

// --- Data Structures ---

/// One document partitioned by recognized headings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitDocument {
    /// Text before the first recognized heading, title line included.
    pub preamble: String,
    sections: BTreeMap<SectionKind, String>,
    /// Recognized headings seen more than once (first occurrence kept).
    pub duplicates: Vec<SectionKind>,
}

impl SplitDocument {
    /// The section body; empty when the section is not present.
    pub fn section(&self, kind: SectionKind) -> &str {
        self.sections.get(&kind).map(String::as_str).unwrap_or("")
    }

    pub fn has_section(&self, kind: SectionKind) -> bool {
        self.sections.contains_key(&kind)
    }
}

enum Target {
    Preamble,
    Section(SectionKind, usize),
    Discard(usize),
}

/// Heading-driven partitioning.
///
/// A recognized heading at level L opens a section unless a section at a
/// shallower level is open (then it is content). The section runs until the
/// next heading of level <= L. Unrecognized headings at level <= L close it
/// and their text is dropped.
pub fn split_sections(text: &str) -> SplitDocument {
    let mut document = SplitDocument::default();
    let mut target = Target::Preamble;
    let mut in_fence = false;
    let mut buffer = String::new();

    for line in text.lines() {
        if FENCE_RE.is_match(line) {
            in_fence = !in_fence;
        }
        let heading = if in_fence { None } else { parse_heading(line) };

        if let Some(heading) = heading {
            let open_level = match target {
                Target::Section(_, level) | Target::Discard(level) => Some(level),
                Target::Preamble => None,
            };
            let closes_open = open_level.map_or(true, |level| heading.level <= level);

            if closes_open {
                flush(&mut document, &target, &mut buffer);
                target = match SectionKind::from_heading(&heading.text) {
                    Some(kind) if document.sections.contains_key(&kind) => {
                        tracing::warn!("Duplicate section heading '{}' ignored", heading.text);
                        document.duplicates.push(kind);
                        Target::Discard(heading.level)
                    }
                    Some(kind) => {
                        tracing::debug!("Opening section {} at level {}", kind, heading.level);
                        // Reserve the slot so an empty section still counts as present.
                        document.sections.insert(kind, String::new());
                        Target::Section(kind, heading.level)
                    }
                    None if matches!(target, Target::Preamble) && document.sections.is_empty() => {
                        // Title or other headings before the first section stay in the preamble.
                        buffer.push_str(line);
                        buffer.push('\n');
                        Target::Preamble
                    }
                    None => {
                        tracing::trace!("Ignoring unrecognized heading '{}'", heading.text);
                        Target::Discard(heading.level)
                    }
                };
                continue;
            }
        }

        buffer.push_str(line);
        buffer.push('\n');
    }
    flush(&mut document, &target, &mut buffer);

    document
}

fn flush(document: &mut SplitDocument, target: &Target, buffer: &mut String) {
    let content = std::mem::take(buffer);
    match target {
        Target::Preamble => document.preamble.push_str(&content),
        Target::Section(kind, _) => {
            if let Some(slot) = document.sections.get_mut(kind) {
                slot.push_str(content.trim_matches('\n'));
            }
        }
        Target::Discard(_) => {}
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_heading_variants() {
        assert_eq!(SectionKind::from_heading("Executive Summary"), Some(SectionKind::ExecutiveSummary));
        assert_eq!(SectionKind::from_heading("2. Trust Node Coverage"), Some(SectionKind::TrustNodeCoverage));
        assert_eq!(SectionKind::from_heading("**LLM Rankings**"), Some(SectionKind::LlmRankings));
        assert_eq!(SectionKind::from_heading("Section 5: Priorities"), Some(SectionKind::Priorities));
        assert_eq!(SectionKind::from_heading("🔗 Causal Chain Analysis"), Some(SectionKind::CausalChain));
        assert_eq!(SectionKind::from_heading("Re-Audit Schedule"), Some(SectionKind::ReauditSchedule));
        assert_eq!(SectionKind::from_heading("Appendix"), None);
    }

    #[test]
    fn decorated_headings_still_match() {
        let cases = [
            ("Trust Node Coverage (8/13)", SectionKind::TrustNodeCoverage),
            ("Executive Summary — Acme Coffee Co.", SectionKind::ExecutiveSummary),
            ("**Executive Summary** - Acme", SectionKind::ExecutiveSummary),
            ("Citation Quality: 7.0/10", SectionKind::CitationQuality),
            ("3. LLM Rankings (Perplexity, ChatGPT, Gemini)", SectionKind::LlmRankings),
            ("Trust Node Coverage (score: 8/13)", SectionKind::TrustNodeCoverage),
            ("Priorities (Q1) — Acme", SectionKind::Priorities),
            ("Gaps [draft]", SectionKind::Gaps),
        ];
        for (heading, kind) in cases {
            assert_eq!(SectionKind::from_heading(heading), Some(kind), "{}", heading);
        }
        assert_eq!(SectionKind::from_heading("Appendix — Raw Data"), None);
        assert_eq!(SectionKind::from_heading("(8/13)"), None);
    }

    #[test]
    fn decorated_headings_split_the_document() {
        let text = "## Executive Summary — Acme\nBody\n## Trust Node Coverage (8/13)\n| a |\n";
        let doc = split_sections(text);
        assert_eq!(doc.section(SectionKind::ExecutiveSummary), "Body");
        assert_eq!(doc.section(SectionKind::TrustNodeCoverage), "| a |");
    }

    #[test]
    fn splits_by_recognized_headings() {
        let text = "# AI Visibility Audit: Acme\n\nintro\n\n## Metadata\n- **Brand:** Acme\n\n## Executive Summary\nBody\n### Key Findings\n1. One\n\n## Appendix\nignored\n\n## Gaps\n- gap\n";
        let doc = split_sections(text);

        assert!(doc.preamble.contains("# AI Visibility Audit: Acme"));
        assert!(doc.preamble.contains("intro"));
        assert_eq!(doc.section(SectionKind::Metadata), "- **Brand:** Acme");
        let summary = doc.section(SectionKind::ExecutiveSummary);
        assert!(summary.contains("### Key Findings"), "sub-headings stay inside the section");
        assert!(!summary.contains("ignored"), "unrecognized sibling heading closes the section");
        assert_eq!(doc.section(SectionKind::Gaps), "- gap");
        assert_eq!(doc.section(SectionKind::CompanyInfo), "");
        assert!(!doc.has_section(SectionKind::CompanyInfo));
    }

    #[test]
    fn nested_recognized_heading_is_content() {
        let text = "## Trust Node Coverage\n| a |\n### Critical Gaps\n- Wikipedia missing\n## Citation Quality\nx\n";
        let doc = split_sections(text);
        assert!(doc.section(SectionKind::TrustNodeCoverage).contains("Wikipedia missing"));
        assert!(!doc.has_section(SectionKind::Gaps));
        assert_eq!(doc.section(SectionKind::CitationQuality), "x");
    }

    #[test]
    fn headings_inside_fences_are_ignored() {
        let text = "## Executive Summary\n```\n## Gaps\n```\nafter\n";
        let doc = split_sections(text);
        assert!(!doc.has_section(SectionKind::Gaps));
        assert!(doc.section(SectionKind::ExecutiveSummary).contains("after"));
    }

    #[test]
    fn duplicate_heading_keeps_first() {
        let text = "## Gaps\nfirst\n## Gaps\nsecond\n";
        let doc = split_sections(text);
        assert_eq!(doc.section(SectionKind::Gaps), "first");
        assert_eq!(doc.duplicates, vec![SectionKind::Gaps]);
    }
}
