// src/extractors/responses.rs
use super::markdown::{labeled, list_item, parse_flag, parse_position, split_inline_list, strip_emphasis, subsections, unwrap_link};
use super::splitter::SectionKind;
use crate::audit::{LlmResponse, Platform, Sentiment, Tristate};
use crate::utils::error::{Diagnostics, ExtractError};

const HEADING_SEPARATORS: [&str; 5] = [" — ", " – ", " - ", ":", "|"];

/// "Perplexity — Category Query" into platform and query type.
fn split_heading(heading: &str) -> (Option<Platform>, String) {
    let split = HEADING_SEPARATORS
        .iter()
        .filter_map(|separator| heading.split_once(separator))
        .min_by_key(|(head, _)| head.len());
    match split {
        Some((head, rest)) => (Platform::from_name(head), strip_emphasis(rest)),
        None => (Platform::from_name(heading), String::new()),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum ListTarget {
    None,
    Competitors,
    Citations,
}

#[derive(Default)]
struct ResponseDraft {
    query_text: String,
    brand_mentioned: Option<bool>,
    brand_position: Tristate<u32>,
    brand_description: Option<String>,
    competitors: Vec<String>,
    citations: Vec<String>,
    summary: Vec<String>,
    sentiment: Option<Sentiment>,
    special_note: Option<String>,
}

pub fn extract_responses(block: &str, diagnostics: &mut Diagnostics) -> Result<Vec<LlmResponse>, ExtractError> {
    let section = SectionKind::LlmResponses;
    let mut responses = Vec::new();

    for part in subsections(block) {
        let Some(heading) = part.heading.as_deref() else {
            continue;
        };
        let first_line = part.lines.first().map_or(0, |(number, _)| *number);
        let (platform, query_type) = split_heading(heading);
        let Some(platform) = platform else {
            diagnostics.warn(section, first_line, format!("response block '{}' names no known platform", heading));
            continue;
        };

        let mut draft = ResponseDraft::default();
        let mut target = ListTarget::None;

        for &(number, line) in &part.lines {
            if let Some(label) = labeled(line) {
                target = ListTarget::None;
                match label.key.as_str() {
                    "query" | "query text" | "prompt" => draft.query_text = label.value.trim_matches('"').to_string(),
                    "brand mentioned" | "mentioned" => {
                        draft.brand_mentioned = parse_flag(&label.value);
                        if draft.brand_mentioned.is_none() {
                            diagnostics.warn(section, number, format!("unreadable mention flag '{}'", label.value));
                        }
                    }
                    "position" | "brand position" | "rank" => {
                        draft.brand_position = parse_position(&label.value).unwrap_or_else(|message| {
                            diagnostics.warn(section, number, message);
                            Tristate::Null
                        })
                    }
                    "description" | "brand description" => {
                        draft.brand_description = Some(label.value).filter(|text| !text.is_empty())
                    }
                    "competitors" | "competitors mentioned" => {
                        draft.competitors.extend(split_inline_list(&label.value));
                        target = ListTarget::Competitors;
                    }
                    "citations" | "citations found" | "sources" => {
                        draft
                            .citations
                            .extend(split_inline_list(&label.value).iter().map(|link| unwrap_link(link)));
                        target = ListTarget::Citations;
                    }
                    "summary" | "response summary" => draft.summary.push(label.value),
                    "sentiment" => {
                        draft.sentiment = Sentiment::from_label(&label.value);
                        if draft.sentiment.is_none() {
                            diagnostics.warn(section, number, format!("unknown sentiment '{}'", label.value));
                        }
                    }
                    "note" | "special note" => draft.special_note = Some(label.value).filter(|text| !text.is_empty()),
                    other => tracing::trace!("Ignoring response label '{}'", other),
                }
                continue;
            }
            if let Some(item) = list_item(line) {
                let text = strip_emphasis(item.text);
                match target {
                    ListTarget::Competitors => draft.competitors.push(text),
                    ListTarget::Citations => draft.citations.push(unwrap_link(&text)),
                    ListTarget::None => {}
                }
            }
        }

        let brand_mentioned = draft.brand_mentioned.unwrap_or_else(|| {
            let derived = draft.brand_position.is_present();
            diagnostics.warn(section, first_line, format!("mention flag missing, derived '{}' from position", derived));
            derived
        });

        let sentiment = match (brand_mentioned, draft.sentiment) {
            (false, Some(sentiment)) if sentiment != Sentiment::NotMentioned => {
                diagnostics.warn(section, first_line, "sentiment on an unmentioned brand replaced by not_mentioned");
                Sentiment::NotMentioned
            }
            (false, _) => Sentiment::NotMentioned,
            (true, Some(Sentiment::NotMentioned)) => {
                diagnostics.warn(section, first_line, "not_mentioned sentiment on a mentioned brand replaced by neutral");
                Sentiment::Neutral
            }
            (true, Some(sentiment)) => sentiment,
            (true, None) => Sentiment::Neutral,
        };

        responses.push(LlmResponse {
            platform,
            query_type,
            query_text: draft.query_text,
            brand_mentioned,
            brand_position: draft.brand_position,
            brand_description: draft.brand_description,
            competitors_mentioned: draft.competitors,
            citations_found: draft.citations,
            response_summary: draft.summary.join(" "),
            sentiment,
            special_note: draft.special_note,
        });
    }

    if responses.is_empty() {
        return Err(ExtractError::NoRecords(section));
    }
    tracing::debug!("Extracted {} LLM responses", responses.len());
    Ok(responses)
}
