// src/aggregate/mod.rs
//! Derived fields. Every function here is pure and deterministic: the same
//! raw records always produce the same numbers.

use crate::audit::{
    BestPosition, BucketShare, CategoryCoverage, Citation, CitationQuality, CoverageStatus, CoverageStrength, CoverageTotals,
    CriticalGap, DimensionScores, ExecutiveSummary, Grade, HeadlineMetrics, LlmRankings, Platform,
    CompetitorRow, PlatformPositions, PlatformResult, QualityBucket, QualityDimension, QualityDistribution,
    Tristate, TrustNode, TrustNodeCoverage,
};
use crate::extractors::markdown::round1;
use crate::extractors::{CitationQualityRecord, CitationRecord, RankingsRecord, SummaryRecord};

// --- Banding ---

/// `round(100 * count / total)`, half away from zero. Zero total gives 0.
pub fn percentage(count: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * f64::from(count) / f64::from(total)).round() as u32
}

/// Boundary values belong to the higher band.
pub fn coverage_status(percentage: u32) -> CoverageStatus {
    if percentage >= 70 {
        CoverageStatus::Good
    } else if percentage >= 40 {
        CoverageStatus::Weak
    } else {
        CoverageStatus::Critical
    }
}

pub fn grade_for(score: f64) -> Grade {
    if score >= 8.0 {
        Grade::A
    } else if score >= 6.0 {
        Grade::B
    } else if score >= 4.0 {
        Grade::C
    } else {
        Grade::D
    }
}

pub fn quality_bucket(composite: f64) -> QualityBucket {
    if composite >= 8.0 {
        QualityBucket::High
    } else if composite >= 6.0 {
        QualityBucket::Medium
    } else {
        QualityBucket::Low
    }
}

pub fn executive_summary(record: SummaryRecord) -> ExecutiveSummary {
    ExecutiveSummary {
        grade: grade_for(record.overall_score),
        overall_score: record.overall_score,
        bottom_line: record.bottom_line,
        key_findings: record.key_findings,
    }
}

// --- Trust nodes ---

fn totals(coverage: u32, total: u32) -> (u32, CoverageStatus) {
    let pct = percentage(coverage, total);
    (pct, coverage_status(pct))
}

/// Per-category coverage in first-appearance order.
pub fn category_coverage(nodes: &[TrustNode]) -> Vec<CategoryCoverage> {
    let mut categories: Vec<CategoryCoverage> = Vec::new();
    for node in nodes {
        let index = match categories.iter().position(|c| c.name == node.category) {
            Some(index) => index,
            None => {
                categories.push(CategoryCoverage {
                    name: node.category.clone(),
                    coverage: 0,
                    total: 0,
                    percentage: 0,
                    status: CoverageStatus::Critical,
                    strength: CoverageStrength::Weak,
                });
                categories.len() - 1
            }
        };
        let category = &mut categories[index];
        category.total += 1;
        if node.present {
            category.coverage += 1;
        }
    }
    for category in &mut categories {
        (category.percentage, category.status) = totals(category.coverage, category.total);
        category.strength = category.status.strength();
    }
    categories
}

/// Absent nodes in Weak or Critical categories. Lowest category coverage
/// first, then the most detailed impact text, then document order.
pub fn critical_gaps(nodes: &[TrustNode], categories: &[CategoryCoverage]) -> Vec<CriticalGap> {
    let mut ranked: Vec<(u32, usize, usize, CriticalGap)> = nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| !node.present)
        .filter_map(|(order, node)| {
            let category = categories.iter().find(|c| c.name == node.category)?;
            if category.status == CoverageStatus::Good {
                return None;
            }
            let impact = node
                .impact
                .clone()
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| node.notes.clone());
            Some((
                category.percentage,
                impact.chars().count(),
                order,
                CriticalGap {
                    name: node.name.clone(),
                    category: node.category.clone(),
                    impact,
                },
            ))
        })
        .collect();
    ranked.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));
    ranked.into_iter().map(|(_, _, _, gap)| gap).collect()
}

pub fn trust_node_coverage(nodes: Vec<TrustNode>) -> TrustNodeCoverage {
    let categories = category_coverage(&nodes);
    let coverage = categories.iter().map(|c| c.coverage).sum();
    let total = categories.iter().map(|c| c.total).sum();
    let (pct, status) = totals(coverage, total);
    let critical_gaps = critical_gaps(&nodes, &categories);
    TrustNodeCoverage {
        categories,
        overall: CoverageTotals {
            coverage,
            total,
            percentage: pct,
            status,
            strength: status.strength(),
        },
        critical_gaps,
        nodes,
    }
}

// --- Citation quality ---

/// Mean of the five dimension scores, one decimal.
pub fn composite_score(scores: &DimensionScores) -> f64 {
    let values = scores.as_array();
    round1(values.iter().sum::<f64>() / values.len() as f64)
}

fn citation(record: CitationRecord) -> Citation {
    let composite = composite_score(&record.scores);
    Citation {
        source_url: record.source_url,
        source_name: record.source_name,
        source_domain: record.source_domain,
        source_type: record.source_type,
        scores: record.scores,
        composite_score: composite,
        bucket: quality_bucket(composite),
        cited_by: record.cited_by,
        strengths: record.strengths,
        weaknesses: record.weaknesses,
        notes: record.notes,
    }
}

pub fn distribution(citations: &[Citation]) -> QualityDistribution {
    let total = citations.len() as u32;
    let count = |bucket: QualityBucket| citations.iter().filter(|c| c.bucket == bucket).count() as u32;
    let share = |bucket: QualityBucket| {
        let n = count(bucket);
        BucketShare {
            count: n,
            percentage: percentage(n, total),
        }
    };
    QualityDistribution {
        high_quality: share(QualityBucket::High),
        medium_quality: share(QualityBucket::Medium),
        low_quality: share(QualityBucket::Low),
    }
}

/// Per-dimension means over the citations, used when no dimension table
/// was authored.
pub fn dimensions_from_citations(citations: &[Citation]) -> Vec<QualityDimension> {
    if citations.is_empty() {
        return Vec::new();
    }
    let count = citations.len() as f64;
    DimensionScores::NAMES
        .iter()
        .enumerate()
        .map(|(index, name)| QualityDimension {
            name: name.to_string(),
            score: round1(citations.iter().map(|c| c.scores.as_array()[index]).sum::<f64>() / count),
            assessment: String::new(),
        })
        .collect()
}

/// First max and first min by score.
fn strongest_and_weakest(dimensions: &[QualityDimension]) -> (String, String) {
    let mut strongest: Option<&QualityDimension> = None;
    let mut weakest: Option<&QualityDimension> = None;
    for dimension in dimensions {
        if strongest.map_or(true, |best| dimension.score > best.score) {
            strongest = Some(dimension);
        }
        if weakest.map_or(true, |worst| dimension.score < worst.score) {
            weakest = Some(dimension);
        }
    }
    (
        strongest.map(|d| d.name.clone()).unwrap_or_default(),
        weakest.map(|d| d.name.clone()).unwrap_or_default(),
    )
}

pub fn citation_quality(record: CitationQualityRecord) -> CitationQuality {
    let citations: Vec<Citation> = record.citations.into_iter().map(citation).collect();
    let dimensions = if record.dimensions.is_empty() {
        dimensions_from_citations(&citations)
    } else {
        record.dimensions
    };
    let average = if dimensions.is_empty() {
        0.0
    } else {
        round1(dimensions.iter().map(|d| d.score).sum::<f64>() / dimensions.len() as f64)
    };
    let (strongest, weakest) = strongest_and_weakest(&dimensions);
    CitationQuality {
        distribution: distribution(&citations),
        dimensions,
        average,
        strongest,
        weakest,
        citations,
    }
}

// --- Rankings ---

pub fn avg_position(positions: &PlatformPositions) -> Option<f64> {
    let ranked: Vec<u32> = Platform::ALL
        .iter()
        .filter_map(|platform| positions.get(*platform).value())
        .collect();
    if ranked.is_empty() {
        return None;
    }
    Some(round1(ranked.iter().map(|p| f64::from(*p)).sum::<f64>() / ranked.len() as f64))
}

/// Share of the three tracked platforms that cite the brand.
pub fn ai_citation_rate(platforms: &[PlatformResult]) -> u32 {
    let cited = Platform::ALL
        .iter()
        .filter(|platform| platforms.iter().any(|p| p.platform == **platform && p.cited))
        .count() as u32;
    percentage(cited, Platform::ALL.len() as u32)
}

/// Lowest rank wins; ties go to the earlier platform in `Platform::ALL`.
pub fn best_position(platforms: &[PlatformResult]) -> BestPosition {
    let mut best: Option<(u32, Platform)> = None;
    for platform in Platform::ALL {
        let Some(position) = platforms
            .iter()
            .find(|p| p.platform == platform)
            .and_then(|p| p.position.value())
        else {
            continue;
        };
        if best.map_or(true, |(current, _)| position < current) {
            best = Some((position, platform));
        }
    }
    match best {
        Some((position, platform)) => BestPosition::Ranked { platform, position },
        None => BestPosition::NotRanked,
    }
}

/// One row per tracked platform, in `Platform::ALL` order. Platforms the
/// document never listed are reported as not cited and not tracked.
pub fn complete_platforms(found: Vec<PlatformResult>) -> Vec<PlatformResult> {
    Platform::ALL
        .iter()
        .map(|platform| {
            found
                .iter()
                .find(|p| p.platform == *platform)
                .cloned()
                .unwrap_or_else(|| PlatformResult {
                    platform: *platform,
                    cited: false,
                    position: Tristate::Absent,
                    position_text: "Not tracked".to_string(),
                    citations_found: 0,
                    context: None,
                })
        })
        .collect()
}

pub fn llm_rankings(record: RankingsRecord) -> LlmRankings {
    let platforms = complete_platforms(record.platforms);
    let competitors = record
        .competitors
        .into_iter()
        .map(|row| CompetitorRow {
            avg_position: avg_position(&row.positions),
            name: row.name,
            positions: row.positions,
            is_brand_row: row.is_brand_row,
        })
        .collect();
    LlmRankings {
        ai_citation_rate: ai_citation_rate(&platforms),
        best_position: best_position(&platforms),
        platforms,
        competitors,
    }
}

// --- Headline ---

pub fn headline_metrics(
    summary: &ExecutiveSummary,
    coverage: &TrustNodeCoverage,
    quality: &CitationQuality,
    rankings: &LlmRankings,
) -> HeadlineMetrics {
    HeadlineMetrics {
        overall_score: summary.overall_score,
        grade: summary.grade,
        trust_node_coverage: coverage.overall.coverage,
        trust_node_total: coverage.overall.total,
        trust_node_percentage: coverage.overall.percentage,
        citation_quality: quality.average,
        ai_citation_rate: rankings.ai_citation_rate,
        platforms_cited: rankings.platforms.iter().filter(|p| p.cited).count() as u32,
        best_position: rankings.best_position,
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::CitedBy;
    use crate::extractors::CompetitorRecord;

    fn node(category: &str, name: &str, present: bool) -> TrustNode {
        TrustNode {
            category: category.to_string(),
            name: name.to_string(),
            present,
            quality_score: Tristate::Absent,
            url: None,
            notes: String::new(),
            impact: None,
        }
    }

    fn platform(platform: Platform, cited: bool, position: Tristate<u32>) -> PlatformResult {
        PlatformResult {
            platform,
            cited,
            position,
            position_text: String::new(),
            citations_found: 0,
            context: None,
        }
    }

    fn scored(scores: [f64; 5]) -> CitationRecord {
        let [authority, data_structure, brand_alignment, freshness, cross_links] = scores;
        CitationRecord {
            source_url: String::new(),
            source_name: "src".to_string(),
            source_domain: String::new(),
            source_type: String::new(),
            scores: DimensionScores {
                authority,
                data_structure,
                brand_alignment,
                freshness,
                cross_links,
            },
            cited_by: CitedBy::default(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            notes: String::new(),
            stated_composite: None,
        }
    }

    #[test]
    fn bands_are_exhaustive_with_boundaries_going_up() {
        assert_eq!(coverage_status(100), CoverageStatus::Good);
        assert_eq!(coverage_status(70), CoverageStatus::Good);
        assert_eq!(coverage_status(69), CoverageStatus::Weak);
        assert_eq!(coverage_status(40), CoverageStatus::Weak);
        assert_eq!(coverage_status(39), CoverageStatus::Critical);
        assert_eq!(grade_for(8.0), Grade::A);
        assert_eq!(grade_for(7.9), Grade::B);
        assert_eq!(grade_for(4.0), Grade::C);
        assert_eq!(grade_for(3.99), Grade::D);
        assert_eq!(quality_bucket(8.0), QualityBucket::High);
        assert_eq!(quality_bucket(6.0), QualityBucket::Medium);
        assert_eq!(quality_bucket(5.9), QualityBucket::Low);
    }

    #[test]
    fn seven_of_ten_is_good_six_of_ten_is_weak() {
        let mut nodes: Vec<TrustNode> = (0..10).map(|i| node("Directories", &format!("n{}", i), i < 7)).collect();
        let coverage = trust_node_coverage(nodes.clone());
        let category = &coverage.categories[0];
        assert_eq!((category.coverage, category.total, category.percentage), (7, 10, 70));
        assert_eq!(category.status, CoverageStatus::Good);
        assert!(coverage.critical_gaps.is_empty(), "Good categories surface no gaps");

        nodes[0].present = false;
        let coverage = trust_node_coverage(nodes);
        assert_eq!(coverage.categories[0].percentage, 60);
        assert_eq!(coverage.categories[0].status, CoverageStatus::Weak);
        assert_eq!(coverage.overall.percentage, 60);
        assert_eq!(coverage.critical_gaps.len(), 4);
    }

    #[test]
    fn critical_gaps_order() {
        let mut wiki = node("Knowledge", "Wikipedia", false);
        wiki.impact = Some("No entity page at all".to_string());
        let mut wikidata = node("Knowledge", "Wikidata", false);
        wikidata.notes = "Missing".to_string();
        let nodes = vec![
            node("Reviews", "Google", true),
            node("Reviews", "Yelp", false),
            wikidata,
            wiki,
        ];
        let coverage = trust_node_coverage(nodes);
        let names: Vec<&str> = coverage.critical_gaps.iter().map(|g| g.name.as_str()).collect();
        // Knowledge is 0%, Reviews 50%; within Knowledge the longer impact leads.
        assert_eq!(names, vec!["Wikipedia", "Wikidata", "Yelp"]);
        assert_eq!(coverage.critical_gaps[1].impact, "Missing");
    }

    #[test]
    fn distribution_counts_sum_to_total() {
        let record = CitationQualityRecord {
            dimensions: Vec::new(),
            citations: vec![
                scored([9.0, 8.0, 7.0, 6.0, 9.0]),
                scored([8.0, 8.0, 8.0, 8.0, 8.0]),
                scored([4.0, 5.0, 6.0, 7.0, 3.0]),
            ],
            stated_average: None,
        };
        let quality = citation_quality(record);
        assert_eq!(quality.citations[0].composite_score, 7.8);
        assert_eq!(quality.citations[0].bucket, QualityBucket::Medium);
        assert_eq!(quality.distribution.total(), 3);
        assert_eq!(quality.distribution.high_quality.percentage, 33);
        assert_eq!(quality.distribution.low_quality.count, 1);
        // Derived dimensions: four means of 7.0, cross-links (9+8+3)/3 = 6.7
        assert_eq!(quality.dimensions.len(), 5);
        assert_eq!(quality.dimensions[0].score, 7.0);
        assert_eq!(quality.dimensions[4].score, 6.7);
        assert_eq!(quality.average, 6.9);
        assert_eq!(quality.strongest, "Authority", "first of the tied maxima");
        assert_eq!(quality.weakest, "Cross-Links");
    }

    #[test]
    fn best_position_ties_follow_platform_order() {
        let platforms = vec![
            platform(Platform::Gemini, true, Tristate::Present(3)),
            platform(Platform::Perplexity, false, Tristate::Null),
            platform(Platform::ChatGpt, true, Tristate::Present(3)),
        ];
        assert_eq!(
            best_position(&platforms),
            BestPosition::Ranked {
                platform: Platform::ChatGpt,
                position: 3
            }
        );
        assert_eq!(
            best_position(&[platform(Platform::Gemini, false, Tristate::Null)]),
            BestPosition::NotRanked
        );
    }

    #[test]
    fn ai_citation_rate_values() {
        let rate = |flags: [bool; 3]| {
            let platforms: Vec<PlatformResult> = Platform::ALL
                .iter()
                .zip(flags)
                .map(|(p, cited)| platform(*p, cited, Tristate::Absent))
                .collect();
            ai_citation_rate(&platforms)
        };
        assert_eq!(rate([false, false, false]), 0);
        assert_eq!(rate([true, false, false]), 33);
        assert_eq!(rate([true, false, true]), 67);
        assert_eq!(rate([true, true, true]), 100);
        assert_eq!(ai_citation_rate(&[]), 0);
    }

    #[test]
    fn rankings_fill_missing_platforms_and_average_positions() {
        let mut positions = PlatformPositions::default();
        positions.set(Platform::Perplexity, Tristate::Present(1));
        positions.set(Platform::ChatGpt, Tristate::Present(2));
        positions.set(Platform::Gemini, Tristate::Null);
        let record = RankingsRecord {
            platforms: vec![platform(Platform::Gemini, true, Tristate::Present(5))],
            competitors: vec![
                CompetitorRecord {
                    name: "Rival".to_string(),
                    positions,
                    is_brand_row: false,
                },
                CompetitorRecord {
                    name: "Unranked".to_string(),
                    positions: PlatformPositions::default(),
                    is_brand_row: true,
                },
            ],
        };
        let rankings = llm_rankings(record);
        assert_eq!(rankings.platforms.len(), 3);
        assert_eq!(rankings.platforms[0].platform, Platform::Perplexity);
        assert_eq!(rankings.platforms[0].position_text, "Not tracked");
        assert_eq!(rankings.ai_citation_rate, 33);
        assert_eq!(rankings.competitors[0].avg_position, Some(1.5));
        assert_eq!(rankings.competitors[1].avg_position, None);
    }
}
