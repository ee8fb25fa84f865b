// src/extractors/priorities.rs
use once_cell::sync::Lazy;
use regex::Regex;

use super::markdown::{is_bold, is_prose, labeled, list_item, strip_emphasis};
use super::splitter::{parse_heading, SectionKind};
use crate::audit::{Priorities, PriorityItem};
use crate::utils::error::{Diagnostics, ExtractError};

static ITEM_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:priority\s*)?#?\d+[.):]?\s+").expect("Failed to compile ITEM_NUMBER_RE")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Immediate,
    Strategic,
    LongTerm,
}

impl Bucket {
    fn from_heading(text: &str) -> Option<Self> {
        let lowered = text.to_lowercase();
        if lowered.contains("immediate") {
            Some(Bucket::Immediate)
        } else if lowered.contains("strategic") {
            Some(Bucket::Strategic)
        } else if lowered.contains("long") {
            Some(Bucket::LongTerm)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    CurrentStatus,
    Action,
    Impact,
    Timeline,
    SuccessMetric,
}

fn field_for(key: &str) -> Option<Field> {
    match key {
        "current" | "current status" | "status" | "current state" => Some(Field::CurrentStatus),
        "action" | "actions" | "action items" | "what to do" | "recommendation" => Some(Field::Action),
        "impact" | "expected impact" | "impact level" => Some(Field::Impact),
        "timeline" | "timeframe" | "time frame" | "deadline" => Some(Field::Timeline),
        "success metric" | "success metrics" | "metric" | "kpi" => Some(Field::SuccessMetric),
        _ => None,
    }
}

fn clean_title(text: &str) -> String {
    let stripped = strip_emphasis(text);
    let stripped = ITEM_NUMBER_RE.replace(&stripped, "");
    stripped.trim().trim_end_matches(':').trim().to_string()
}

struct ItemDraft {
    title: String,
    line: usize,
    current_status: Option<String>,
    action: Option<String>,
    impact: Option<String>,
    timeline: Option<String>,
    success_metric: Option<String>,
    continuation: Option<String>,
}

impl ItemDraft {
    fn new(title: String, line: usize) -> Self {
        ItemDraft {
            title,
            line,
            current_status: None,
            action: None,
            impact: None,
            timeline: None,
            success_metric: None,
            continuation: None,
        }
    }

    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::CurrentStatus => &mut self.current_status,
            Field::Action => &mut self.action,
            Field::Impact => &mut self.impact,
            Field::Timeline => &mut self.timeline,
            Field::SuccessMetric => &mut self.success_metric,
        };
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value);
        }
    }

    fn finish(self, diagnostics: &mut Diagnostics) -> Option<PriorityItem> {
        let Some(action) = self.action.or(self.continuation) else {
            diagnostics.warn(
                SectionKind::Priorities,
                self.line,
                format!("priority '{}' has no action and was dropped", self.title),
            );
            return None;
        };
        Some(PriorityItem {
            title: self.title,
            current_status: self.current_status,
            action,
            impact: self.impact,
            timeline: self.timeline,
            success_metric: self.success_metric,
        })
    }
}

struct PriorityBuilder<'d> {
    priorities: Priorities,
    bucket: Option<Bucket>,
    bucket_level: usize,
    /// Items in the current bucket are introduced by sub-headings or bold
    /// lines, so top-level bullets are their content.
    heading_items: bool,
    current: Option<ItemDraft>,
    diagnostics: &'d mut Diagnostics,
}

impl<'d> PriorityBuilder<'d> {
    fn flush(&mut self) {
        let Some(draft) = self.current.take() else {
            return;
        };
        let Some(item) = draft.finish(self.diagnostics) else {
            return;
        };
        let bucket = match self.bucket {
            Some(bucket) => bucket,
            None => {
                self.diagnostics.warn(
                    SectionKind::Priorities,
                    0,
                    format!("priority '{}' outside any bucket, filed as immediate", item.title),
                );
                Bucket::Immediate
            }
        };
        match bucket {
            Bucket::Immediate => self.priorities.immediate.push(item),
            Bucket::Strategic => self.priorities.strategic.push(item),
            Bucket::LongTerm => self.priorities.long_term.push(item),
        }
    }

    fn open(&mut self, title: String, line: usize) {
        self.flush();
        if title.is_empty() {
            self.diagnostics.warn(SectionKind::Priorities, line, "priority item without a title skipped");
            return;
        }
        self.current = Some(ItemDraft::new(title, line));
    }

    fn continue_with(&mut self, text: String) {
        if let Some(draft) = self.current.as_mut() {
            if draft.continuation.is_none() && !text.is_empty() {
                draft.continuation = Some(text);
            }
        }
    }
}

/// Ordered items per bucket. Order within a bucket is the document order.
pub fn extract_priorities(block: &str, diagnostics: &mut Diagnostics) -> Result<Priorities, ExtractError> {
    let mut builder = PriorityBuilder {
        priorities: Priorities::default(),
        bucket: None,
        bucket_level: 0,
        heading_items: false,
        current: None,
        diagnostics,
    };

    for (index, line) in block.lines().enumerate() {
        let number = index + 1;

        if let Some(heading) = parse_heading(line) {
            match Bucket::from_heading(&heading.text) {
                Some(bucket) if builder.bucket.is_none() || heading.level <= builder.bucket_level => {
                    builder.flush();
                    builder.bucket = Some(bucket);
                    builder.bucket_level = heading.level;
                    builder.heading_items = false;
                }
                _ => {
                    builder.heading_items = true;
                    builder.open(clean_title(&heading.text), number);
                }
            }
            continue;
        }

        if let Some(label) = labeled(line) {
            if let Some(field) = field_for(&label.key) {
                match builder.current.as_mut() {
                    Some(draft) => draft.set(field, label.value),
                    None => builder
                        .diagnostics
                        .warn(SectionKind::Priorities, number, format!("'{}' outside any item", label.key)),
                }
                continue;
            }
        }

        if let Some(item) = list_item(line) {
            let opens_item = item.indent == 0 && !builder.heading_items;
            if opens_item {
                // "1. **Claim profile**: verify the listing" carries its action inline.
                let (title, inline_action) = match item.text.split_once(':') {
                    Some((head, rest)) if is_bold(head) || head.trim_start().starts_with("**") => {
                        (clean_title(head), strip_emphasis(rest))
                    }
                    _ => (clean_title(item.text), String::new()),
                };
                builder.open(title, number);
                builder.continue_with(inline_action);
            } else {
                builder.continue_with(strip_emphasis(item.text));
            }
            continue;
        }

        let trimmed = line.trim();
        if is_bold(trimmed) && labeled(trimmed).is_none() {
            builder.heading_items = true;
            builder.open(clean_title(trimmed), number);
            continue;
        }

        if is_prose(line) {
            builder.continue_with(trimmed.to_string());
        }
    }
    builder.flush();

    let priorities = builder.priorities;
    if priorities.total() == 0 {
        return Err(ExtractError::NoRecords(SectionKind::Priorities));
    }
    tracing::debug!(
        "Extracted priorities: {} immediate, {} strategic, {} long-term",
        priorities.immediate.len(),
        priorities.strategic.len(),
        priorities.long_term.len()
    );
    Ok(priorities)
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_items_with_labeled_fields() {
        let block = "\
### Immediate (0-30 days)
1. **Create a Wikipedia draft**
   - **Current Status:** No article
   - **Action:** Draft and submit via Articles for Creation
   - **Impact:** High
   - **Timeline:** 2 weeks
2. Claim Google Business Profile
   - Verify ownership and add photos
3. Vague idea

### Strategic (1-3 months)
- **Earn press coverage**: Pitch three regional outlets
  - **Success Metric:** 2 articles published

### Long-term (3-12 months)
1. Build review volume
   - **Action:** Ask every customer for a review
";
        let mut diagnostics = Diagnostics::new();
        let priorities = extract_priorities(block, &mut diagnostics).unwrap();

        assert_eq!(priorities.immediate.len(), 2);
        let first = &priorities.immediate[0];
        assert_eq!(first.title, "Create a Wikipedia draft");
        assert_eq!(first.current_status.as_deref(), Some("No article"));
        assert_eq!(first.action, "Draft and submit via Articles for Creation");
        assert_eq!(first.impact.as_deref(), Some("High"));
        assert_eq!(first.timeline.as_deref(), Some("2 weeks"));
        assert_eq!(priorities.immediate[1].action, "Verify ownership and add photos");

        assert_eq!(priorities.strategic[0].title, "Earn press coverage");
        assert_eq!(priorities.strategic[0].action, "Pitch three regional outlets");
        assert_eq!(priorities.strategic[0].success_metric.as_deref(), Some("2 articles published"));

        assert_eq!(priorities.long_term[0].action, "Ask every customer for a review");
        assert_eq!(diagnostics.len(), 1, "'Vague idea' has no action");
    }

    #[test]
    fn sub_heading_items() {
        let block = "\
## Immediate Priorities
### 1. Fix schema markup
- Add Organization JSON-LD to the homepage
- **Impact:** Medium
### 2. Update NAP data
**Action:** Align address across directories
";
        let mut diagnostics = Diagnostics::new();
        let priorities = extract_priorities(block, &mut diagnostics).unwrap();
        assert_eq!(priorities.immediate.len(), 2);
        assert_eq!(priorities.immediate[0].title, "Fix schema markup");
        assert_eq!(priorities.immediate[0].action, "Add Organization JSON-LD to the homepage");
        assert_eq!(priorities.immediate[0].impact.as_deref(), Some("Medium"));
        assert_eq!(priorities.immediate[1].title, "Update NAP data");
        assert!(priorities.strategic.is_empty());
    }

    #[test]
    fn no_items_is_an_error() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(
            extract_priorities("### Immediate\nNothing yet.\n", &mut diagnostics),
            Err(ExtractError::NoRecords(SectionKind::Priorities))
        );
    }
}
