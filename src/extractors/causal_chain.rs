// src/extractors/causal_chain.rs
use super::markdown::{is_prose, is_table_line, labeled, list_item, strip_emphasis, tables};
use super::splitter::{parse_heading, SectionKind};
use crate::audit::{CausalChain, CausalLink};
use crate::utils::error::{Diagnostics, ExtractError};

const ARROWS: [&str; 4] = ["→", "->", "⟶", "=>"];

/// Splits "A → B → C" into three steps. Longer chains fold their middle
/// steps into step 2.
fn split_arrow_chain(text: &str) -> Option<[String; 3]> {
    let mut normalized = text.to_string();
    for arrow in &ARROWS[1..] {
        normalized = normalized.replace(arrow, ARROWS[0]);
    }
    let steps: Vec<String> = normalized
        .split(ARROWS[0])
        .map(strip_emphasis)
        .filter(|step| !step.is_empty())
        .collect();
    match steps.as_slice() {
        [] | [_] | [_, _] => None,
        [first, middle @ .., last] => Some([first.clone(), middle.join(" → "), last.clone()]),
    }
}

pub fn extract_causal_chain(block: &str, diagnostics: &mut Diagnostics) -> Result<CausalChain, ExtractError> {
    let section = SectionKind::CausalChain;
    let mut explanation: Vec<String> = Vec::new();
    let mut explanation_closed = false;
    let mut chains: Vec<CausalLink> = Vec::new();

    for table in tables(block) {
        let (Some(step1), Some(step2), Some(step3)) = (
            table.column(&["step 1", "step1", "root cause", "cause"]),
            table.column(&["step 2", "step2", "effect", "mechanism"]),
            table.column(&["step 3", "step3", "outcome", "result"]),
        ) else {
            continue;
        };
        let insight_col = table.column(&["insight", "key insight"]);
        for row in &table.rows {
            let link = CausalLink {
                step1: strip_emphasis(row.cell(Some(step1))),
                step2: strip_emphasis(row.cell(Some(step2))),
                step3: strip_emphasis(row.cell(Some(step3))),
                insight: strip_emphasis(row.cell(insight_col)),
            };
            if link.step1.is_empty() || link.step3.is_empty() {
                diagnostics.warn(section, row.line, "causal chain row with empty steps skipped");
                continue;
            }
            chains.push(link);
        }
    }
    let from_table = !chains.is_empty();

    for (index, line) in block.lines().enumerate() {
        let number = index + 1;
        if parse_heading(line).is_some() || is_table_line(line) {
            if !explanation.is_empty() {
                explanation_closed = true;
            }
            continue;
        }
        if let Some(label) = labeled(line) {
            if label.is(&["insight", "key insight"]) {
                match chains.last_mut() {
                    Some(link) if !from_table && link.insight.is_empty() => link.insight = label.value,
                    _ => diagnostics.warn(section, number, "insight without a preceding chain"),
                }
                continue;
            }
            if label.is(&["explanation", "summary", "overview"]) && !explanation_closed {
                explanation.push(label.value);
                continue;
            }
        }
        if let Some(item) = list_item(line) {
            explanation_closed = true;
            if from_table {
                continue;
            }
            let text = strip_emphasis(item.text);
            if !ARROWS.iter().any(|arrow| text.contains(arrow)) {
                continue;
            }
            match split_arrow_chain(&text) {
                Some([step1, step2, step3]) => chains.push(CausalLink {
                    step1,
                    step2,
                    step3,
                    insight: String::new(),
                }),
                None => diagnostics.warn(section, number, format!("chain '{}' has fewer than three steps", text)),
            }
            continue;
        }
        if is_prose(line) && !explanation_closed {
            explanation.push(line.trim().to_string());
        } else if line.trim().is_empty() && !explanation.is_empty() && !chains.is_empty() {
            explanation_closed = true;
        }
    }

    if explanation.is_empty() && chains.is_empty() {
        return Err(ExtractError::NoRecords(section));
    }
    tracing::debug!("Extracted {} causal chains", chains.len());
    Ok(CausalChain {
        explanation: explanation.join(" "),
        chains,
    })
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_chains_with_insights() {
        let block = "\
Low directory presence feeds directly into weak AI recall.

1. **No Wikipedia page** → No knowledge graph entity → AI engines skip the brand
   - **Insight:** Entity data is the entry ticket
2. Few reviews -> Low trust signals -> Competitors cited instead
3. Broken chain → only two steps
";
        let mut diagnostics = Diagnostics::new();
        let chain = extract_causal_chain(block, &mut diagnostics).unwrap();
        assert_eq!(chain.explanation, "Low directory presence feeds directly into weak AI recall.");
        assert_eq!(chain.chains.len(), 2);
        assert_eq!(chain.chains[0].step1, "No Wikipedia page");
        assert_eq!(chain.chains[0].step3, "AI engines skip the brand");
        assert_eq!(chain.chains[0].insight, "Entity data is the entry ticket");
        assert_eq!(chain.chains[1].step2, "Low trust signals");
        assert_eq!(chain.chains[1].insight, "");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn table_chains() {
        let block = "Why visibility lags.\n\n| Step 1 | Step 2 | Step 3 | Insight |\n|---|---|---|---|\n| Thin press | Few citations | Low rank | PR matters |\n";
        let mut diagnostics = Diagnostics::new();
        let chain = extract_causal_chain(block, &mut diagnostics).unwrap();
        assert_eq!(chain.explanation, "Why visibility lags.");
        assert_eq!(chain.chains[0].insight, "PR matters");
    }

    #[test]
    fn long_chains_fold_the_middle() {
        let steps = split_arrow_chain("A → B → C → D").unwrap();
        assert_eq!(steps, ["A".to_string(), "B → C".to_string(), "D".to_string()]);
        assert_eq!(split_arrow_chain("A → B"), None);
    }
}
