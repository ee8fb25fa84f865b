// src/audit/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::tristate::Tristate;

// --- Platforms ---

/// The three tracked answer engines, in document enumeration order.
/// The declaration order doubles as the tie-break priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Platform {
    Perplexity,
    #[serde(rename = "ChatGPT")]
    ChatGpt,
    Gemini,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Perplexity, Platform::ChatGpt, Platform::Gemini];

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Perplexity => "Perplexity",
            Platform::ChatGpt => "ChatGPT",
            Platform::Gemini => "Gemini",
        }
    }

    /// Loose name matching: "chatgpt", "ChatGPT (GPT-4o)", "Google Gemini", ...
    pub fn from_name(raw: &str) -> Option<Self> {
        let lowered = raw.to_lowercase();
        if lowered.contains("perplexity") {
            Some(Platform::Perplexity)
        } else if lowered.contains("chatgpt") || lowered.contains("openai") || lowered.contains("gpt") {
            Some(Platform::ChatGpt)
        } else if lowered.contains("gemini") || lowered.contains("bard") {
            Some(Platform::Gemini)
        } else {
            None
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// --- Metadata ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMetadata {
    pub brand: String,
    pub category: String,
    pub date: NaiveDate,
    /// URL path segment, `<brand>-<YYYY-MM-DD>`, unique across the document set.
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

// --- Executive summary ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub overall_score: f64,
    pub grade: Grade,
    pub bottom_line: String,
    /// Ranked; order is significant.
    pub key_findings: Vec<String>,
}

// --- Trust nodes ---

/// Coverage band over a 0-100 percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageStatus {
    Good,
    Weak,
    Critical,
}

/// The coverage band in the vocabulary the radar chart labels use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageStrength {
    Strong,
    Moderate,
    Weak,
}

impl CoverageStatus {
    pub fn strength(&self) -> CoverageStrength {
        match self {
            CoverageStatus::Good => CoverageStrength::Strong,
            CoverageStatus::Weak => CoverageStrength::Moderate,
            CoverageStatus::Critical => CoverageStrength::Weak,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustNode {
    pub category: String,
    pub name: String,
    pub present: bool,
    /// Only ever `Present` when `present` is true.
    #[serde(default, skip_serializing_if = "Tristate::is_absent")]
    pub quality_score: Tristate<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCoverage {
    pub name: String,
    pub coverage: u32,
    pub total: u32,
    pub percentage: u32,
    pub status: CoverageStatus,
    pub strength: CoverageStrength,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageTotals {
    pub coverage: u32,
    pub total: u32,
    pub percentage: u32,
    pub status: CoverageStatus,
    pub strength: CoverageStrength,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalGap {
    pub name: String,
    pub category: String,
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustNodeCoverage {
    pub categories: Vec<CategoryCoverage>,
    pub overall: CoverageTotals,
    /// Highest impact first.
    pub critical_gaps: Vec<CriticalGap>,
    pub nodes: Vec<TrustNode>,
}

// --- Citation quality ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityDimension {
    pub name: String,
    pub score: f64,
    pub assessment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityBucket {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketShare {
    pub count: u32,
    pub percentage: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityDistribution {
    pub high_quality: BucketShare,
    pub medium_quality: BucketShare,
    pub low_quality: BucketShare,
}

impl QualityDistribution {
    pub fn total(&self) -> u32 {
        self.high_quality.count + self.medium_quality.count + self.low_quality.count
    }
}

/// The five per-citation quality dimensions, 0-10 each.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScores {
    pub authority: f64,
    pub data_structure: f64,
    pub brand_alignment: f64,
    pub freshness: f64,
    pub cross_links: f64,
}

impl DimensionScores {
    pub const NAMES: [&'static str; 5] = [
        "Authority",
        "Data Structure",
        "Brand Alignment",
        "Freshness",
        "Cross-Links",
    ];

    pub fn as_array(&self) -> [f64; 5] {
        [
            self.authority,
            self.data_structure,
            self.brand_alignment,
            self.freshness,
            self.cross_links,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitedBy {
    pub perplexity: bool,
    #[serde(rename = "chatgpt")]
    pub chat_gpt: bool,
    pub gemini: bool,
}

impl CitedBy {
    pub fn set(&mut self, platform: Platform) {
        match platform {
            Platform::Perplexity => self.perplexity = true,
            Platform::ChatGpt => self.chat_gpt = true,
            Platform::Gemini => self.gemini = true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub source_url: String,
    pub source_name: String,
    pub source_domain: String,
    pub source_type: String,
    pub scores: DimensionScores,
    /// Mean of the five scores, one decimal.
    pub composite_score: f64,
    pub bucket: QualityBucket,
    pub cited_by: CitedBy,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationQuality {
    pub dimensions: Vec<QualityDimension>,
    pub average: f64,
    pub distribution: QualityDistribution,
    pub strongest: String,
    pub weakest: String,
    pub citations: Vec<Citation>,
}

// --- LLM rankings ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformResult {
    pub platform: Platform,
    pub cited: bool,
    #[serde(default, skip_serializing_if = "Tristate::is_absent")]
    pub position: Tristate<u32>,
    /// Label shown when there is no numeric position.
    pub position_text: String,
    pub citations_found: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformPositions {
    #[serde(default, skip_serializing_if = "Tristate::is_absent")]
    pub perplexity: Tristate<u32>,
    #[serde(default, skip_serializing_if = "Tristate::is_absent", rename = "chatgpt")]
    pub chat_gpt: Tristate<u32>,
    #[serde(default, skip_serializing_if = "Tristate::is_absent")]
    pub gemini: Tristate<u32>,
}

impl PlatformPositions {
    pub fn get(&self, platform: Platform) -> Tristate<u32> {
        match platform {
            Platform::Perplexity => self.perplexity,
            Platform::ChatGpt => self.chat_gpt,
            Platform::Gemini => self.gemini,
        }
    }

    pub fn set(&mut self, platform: Platform, position: Tristate<u32>) {
        match platform {
            Platform::Perplexity => self.perplexity = position,
            Platform::ChatGpt => self.chat_gpt = position,
            Platform::Gemini => self.gemini = position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorRow {
    /// Emphasis markers already stripped.
    pub name: String,
    pub positions: PlatformPositions,
    pub avg_position: Option<f64>,
    pub is_brand_row: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BestPosition {
    Ranked { platform: Platform, position: u32 },
    NotRanked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmRankings {
    /// Exactly one entry per tracked platform, in `Platform::ALL` order.
    pub platforms: Vec<PlatformResult>,
    pub competitors: Vec<CompetitorRow>,
    pub ai_citation_rate: u32,
    pub best_position: BestPosition,
}

// --- LLM responses ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    NotMentioned,
}

impl Sentiment {
    pub fn from_label(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase().replace(['_', '-'], " ");
        match lowered.as_str() {
            "positive" => Some(Sentiment::Positive),
            "neutral" | "mixed" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            "not mentioned" | "none" | "n/a" => Some(Sentiment::NotMentioned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmResponse {
    pub platform: Platform,
    pub query_type: String,
    pub query_text: String,
    pub brand_mentioned: bool,
    #[serde(default, skip_serializing_if = "Tristate::is_absent")]
    pub brand_position: Tristate<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_description: Option<String>,
    pub competitors_mentioned: Vec<String>,
    pub citations_found: Vec<String>,
    pub response_summary: String,
    pub sentiment: Sentiment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_note: Option<String>,
}

// --- Priorities ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_metric: Option<String>,
}

/// Buckets keep recommended execution order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Priorities {
    pub immediate: Vec<PriorityItem>,
    pub strategic: Vec<PriorityItem>,
    pub long_term: Vec<PriorityItem>,
}

impl Priorities {
    pub fn total(&self) -> usize {
        self.immediate.len() + self.strategic.len() + self.long_term.len()
    }
}

// --- Causal chain ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CausalLink {
    pub step1: String,
    pub step2: String,
    pub step3: String,
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CausalChain {
    pub explanation: String,
    pub chains: Vec<CausalLink>,
}

// --- Optional detail sections ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub founded: Option<String>,
    pub founder: Option<String>,
    pub headquarters: Option<String>,
    pub additional_offices: Vec<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReauditSchedule {
    pub next_audit_date: Option<String>,
    pub frequency: Option<String>,
    pub milestones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gaps {
    pub critical: Vec<String>,
    pub impact: Option<String>,
}

// --- Root ---

/// Dashboard headline numbers, all taken from the aggregated sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlineMetrics {
    pub overall_score: f64,
    pub grade: Grade,
    pub trust_node_coverage: u32,
    pub trust_node_total: u32,
    pub trust_node_percentage: u32,
    pub citation_quality: f64,
    pub ai_citation_rate: u32,
    pub platforms_cited: u32,
    pub best_position: BestPosition,
}

/// One fully parsed and validated audit. Never mutated after assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditData {
    pub metadata: AuditMetadata,
    pub headline: HeadlineMetrics,
    pub executive_summary: ExecutiveSummary,
    pub trust_node_coverage: TrustNodeCoverage,
    pub citation_quality: CitationQuality,
    pub llm_rankings: LlmRankings,
    pub priorities: Priorities,
    // Optional sections: None means the section was not authored.
    pub causal_chain: Option<CausalChain>,
    pub company_info: Option<CompanyInfo>,
    pub reaudit_schedule: Option<ReauditSchedule>,
    pub gaps: Option<Gaps>,
    pub llm_responses: Option<Vec<LlmResponse>>,
}

impl AuditData {
    /// Returns a copy carrying the slug assigned by the loader.
    pub fn with_slug(self, slug: &str) -> Self {
        let mut data = self;
        data.metadata.slug = slug.to_string();
        data
    }
}

/// Listing entry for the document set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub metadata: AuditMetadata,
    #[serde(skip)]
    pub path: std::path::PathBuf,
}
