// src/extractors/markdown.rs
//! Line-level conventions shared by every section extractor: labeled
//! key/value lines, list items, pipe tables, scores, flags and positions.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::audit::Tristate;

// --- Regex Patterns (Lazy Static) ---
static LIST_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)(?:[-*+]|(\d+)[\.\)])\s+(.*)$").expect("Failed to compile LIST_ITEM_RE")
});

// "**Key:** value", "**Key**: value", "__Key:__ value"
static BOLD_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\*\*|__)([^*_:]{1,60}?)(?::(?:\*\*|__)|(?:\*\*|__)\s*:)\s*(.*)$")
        .expect("Failed to compile BOLD_LABEL_RE")
});

// "Key: value" with a short, word-like key.
static PLAIN_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9 /&()'\-]{0,40}?)\s*:\s+(.*)$")
        .expect("Failed to compile PLAIN_LABEL_RE")
});

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("Failed to compile NUMBER_RE"));

static SEPARATOR_ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\|?\s*:?-{2,}:?\s*(?:\|\s*:?-{2,}:?\s*)*\|?\s*$")
        .expect("Failed to compile SEPARATOR_ROW_RE")
});

static POSITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:#|no\.\s*|position\s*|rank\s*)?(\d+)(?:st|nd|rd|th)?\b")
        .expect("Failed to compile POSITION_RE")
});

/// A list item on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem<'a> {
    pub indent: usize,
    pub ordinal: Option<u32>,
    pub text: &'a str,
}

pub fn list_item(line: &str) -> Option<ListItem<'_>> {
    let caps = LIST_ITEM_RE.captures(line)?;
    let text = caps.get(3)?.as_str().trim();
    // A horizontal rule ("---", "***") is not a list item.
    if text.chars().all(|c| matches!(c, '-' | '*' | '_' | ' ')) {
        return None;
    }
    Some(ListItem {
        indent: caps.get(1).map_or(0, |m| m.as_str().len()),
        ordinal: caps.get(2).and_then(|m| m.as_str().parse().ok()),
        text,
    })
}

/// Removes markdown emphasis and inline code markers from both ends and inside.
pub fn strip_emphasis(text: &str) -> String {
    text.replace("**", "")
        .replace("__", "")
        .replace('`', "")
        .trim()
        .trim_matches(|c: char| c == '*' || c == '_')
        .trim()
        .to_string()
}

/// True when the cell is wrapped in bold markers.
pub fn is_bold(text: &str) -> bool {
    let trimmed = text.trim();
    (trimmed.starts_with("**") && trimmed.ends_with("**") && trimmed.len() > 4)
        || (trimmed.starts_with("__") && trimmed.ends_with("__") && trimmed.len() > 4)
}

/// A `Key: value` line, with the key lowercased and emphasis removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labeled {
    pub key: String,
    pub value: String,
}

impl Labeled {
    pub fn is(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.key == *name)
    }
}

/// Parses labeled lines, tolerating a leading list marker.
pub fn labeled(line: &str) -> Option<Labeled> {
    let body = match list_item(line) {
        Some(item) => item.text,
        None => line.trim(),
    };
    if body.starts_with('|') {
        return None;
    }
    if let Some(caps) = BOLD_LABEL_RE.captures(body) {
        return Some(Labeled {
            key: normalize_key(&caps[1]),
            value: strip_emphasis(&caps[2]),
        });
    }
    // "**Overall Score: 6.5/10**" has the colon inside the emphasis.
    let plain = if body.starts_with("**") || body.starts_with("__") {
        strip_emphasis(body)
    } else {
        body.to_string()
    };
    let caps = PLAIN_LABEL_RE.captures(&plain)?;
    // Prose with a colon mid-sentence is not a label.
    if caps[1].contains("http") || caps[1].split_whitespace().count() > 4 {
        return None;
    }
    Some(Labeled {
        key: normalize_key(&caps[1]),
        value: strip_emphasis(&caps[2]),
    })
}

pub fn normalize_key(key: &str) -> String {
    strip_emphasis(key)
        .trim_end_matches(':')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// First decimal number in the text.
pub fn parse_number(text: &str) -> Option<f64> {
    NUMBER_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

/// First non-negative integer in the text.
pub fn parse_count(text: &str) -> Option<u32> {
    parse_number(text).filter(|n| *n >= 0.0).map(|n| n.round() as u32)
}

pub fn parse_flag(text: &str) -> Option<bool> {
    let cleaned = strip_emphasis(text).to_lowercase();
    let cleaned = cleaned.trim();
    match cleaned {
        "yes" | "y" | "true" | "✓" | "✔" | "✅" | "present" | "cited" | "found" => Some(true),
        "no" | "n" | "false" | "✗" | "✘" | "❌" | "missing" | "absent" | "not cited"
        | "not found" => Some(false),
        _ if cleaned.starts_with("✅") || cleaned.starts_with("yes") => Some(true),
        _ if cleaned.starts_with("❌") || cleaned.starts_with("no ") || cleaned.starts_with("no,") => {
            Some(false)
        }
        _ => None,
    }
}

/// Ranking cell. Empty means the document said nothing (Absent); an
/// explicit "not ranked" style marker means Null.
pub fn parse_position(text: &str) -> Result<Tristate<u32>, String> {
    let cleaned = strip_emphasis(text);
    if cleaned.is_empty() {
        return Ok(Tristate::Absent);
    }
    let lowered = cleaned.to_lowercase();
    if matches!(lowered.as_str(), "-" | "—" | "–" | "n/a" | "na" | "none" | "null")
        || lowered.starts_with("not ")
        || lowered.starts_with("unranked")
        || lowered.starts_with("no mention")
    {
        return Ok(Tristate::Null);
    }
    match POSITION_RE.captures(&cleaned).and_then(|caps| caps[1].parse::<u32>().ok()) {
        Some(0) => Err(format!("position 0 is not a rank: '{}'", cleaned)),
        Some(position) => Ok(Tristate::Present(position)),
        None => Err(format!("unrecognized position '{}'", cleaned)),
    }
}

/// Splits a `;`- or `,`-separated inline list. Semicolons win when present.
pub fn split_inline_list(text: &str) -> Vec<String> {
    let separator = if text.contains(';') { ';' } else { ',' };
    text.split(separator)
        .map(strip_emphasis)
        .filter(|item| !item.is_empty() && !matches!(item.to_lowercase().as_str(), "none" | "n/a" | "-"))
        .collect()
}

/// Host part of a URL, without `www.`.
pub fn domain_of(url: &str) -> String {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    let host = without_scheme
        .split(|c: char| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or("")
        .to_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

/// Unwraps `[text](url)` or `<url>` to the URL.
pub fn unwrap_link(text: &str) -> String {
    let trimmed = text.trim();
    if let (Some(open), Some(close)) = (trimmed.find("]("), trimmed.rfind(')')) {
        if open + 2 < close {
            return trimmed[open + 2..close].trim().to_string();
        }
    }
    trimmed.trim_start_matches('<').trim_end_matches('>').to_string()
}

// --- Tables ---

/// A pipe table. `line` is the 1-based line of each row within the block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRow {
    pub line: usize,
    pub cells: Vec<String>,
}

impl TableRow {
    pub fn cell(&self, column: Option<usize>) -> &str {
        column
            .and_then(|index| self.cells.get(index))
            .map(String::as_str)
            .unwrap_or("")
    }
}

impl Table {
    /// Index of the first header matching any alias (exact, then prefix).
    pub fn column(&self, aliases: &[&str]) -> Option<usize> {
        let normalized: Vec<String> = self.headers.iter().map(|h| normalize_key(h)).collect();
        aliases
            .iter()
            .find_map(|alias| normalized.iter().position(|header| header == alias))
            .or_else(|| {
                aliases
                    .iter()
                    .find_map(|alias| normalized.iter().position(|header| header.starts_with(alias)))
            })
    }
}

pub fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

pub fn is_table_line(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

/// Every pipe table in the block, in order.
pub fn tables(block: &str) -> Vec<Table> {
    tables_in(block.lines().enumerate().map(|(index, line)| (index + 1, line)))
}

/// Tables over pre-numbered lines (1-based).
pub fn tables_in<'a>(lines: impl IntoIterator<Item = (usize, &'a str)>) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut current: Option<Table> = None;

    for (number, line) in lines {
        if !is_table_line(line) {
            if let Some(table) = current.take() {
                tables.push(table);
            }
            continue;
        }
        match current.as_mut() {
            None => {
                current = Some(Table {
                    headers: split_row(line),
                    rows: Vec::new(),
                });
            }
            Some(table) => {
                if SEPARATOR_ROW_RE.is_match(line.trim()) {
                    continue;
                }
                let cells = split_row(line);
                if cells.iter().all(|cell| cell.is_empty()) {
                    continue;
                }
                table.rows.push(TableRow {
                    line: number,
                    cells,
                });
            }
        }
    }
    if let Some(table) = current {
        tables.push(table);
    }
    tables
}

// --- Sub-sections ---

/// Lines under one heading inside a section block. Lines before the first
/// heading form a sub-section with `heading: None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subsection<'a> {
    pub heading: Option<String>,
    pub level: usize,
    /// (1-based line number within the block, line)
    pub lines: Vec<(usize, &'a str)>,
}

impl<'a> Subsection<'a> {
    pub fn tables(&self) -> Vec<Table> {
        tables_in(self.lines.iter().copied())
    }

    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|(_, line)| line.trim().is_empty())
    }
}

/// Splits a section block at every heading line, whatever its level.
pub fn subsections(block: &str) -> Vec<Subsection<'_>> {
    let mut result = vec![Subsection {
        heading: None,
        level: 0,
        lines: Vec::new(),
    }];
    for (index, line) in block.lines().enumerate() {
        if let Some(heading) = super::splitter::parse_heading(line) {
            result.push(Subsection {
                heading: Some(strip_emphasis(&heading.text)),
                level: heading.level,
                lines: Vec::new(),
            });
        } else if let Some(current) = result.last_mut() {
            current.lines.push((index + 1, line));
        }
    }
    if result.first().map_or(false, |first| first.is_blank()) {
        result.remove(0);
    }
    result
}

/// Paragraph text: non-empty lines that are not tables, lists, labels or headings.
pub fn is_prose(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && !trimmed.starts_with('#')
        && !trimmed.starts_with('>')
        && !is_table_line(trimmed)
        && list_item(line).is_none()
        && labeled(line).is_none()
        && !trimmed.chars().all(|c| matches!(c, '-' | '*' | '_' | '='))
}

/// Rounds half away from zero to one decimal.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_line_variants() {
        let cases = [
            "- **Brand:** Acme Coffee",
            "**Brand**: Acme Coffee",
            "Brand: Acme Coffee",
            "* __Brand:__ Acme Coffee",
        ];
        for case in cases {
            let parsed = labeled(case).unwrap_or_else(|| panic!("no label in {case}"));
            assert_eq!(parsed.key, "brand");
            assert_eq!(parsed.value, "Acme Coffee");
        }
        assert!(labeled("https://example.com/path").is_none());
        assert!(labeled("| Brand: x | y |").is_none());
    }

    #[test]
    fn list_items_and_rules() {
        let item = list_item("  2. Second finding").unwrap();
        assert_eq!(item.ordinal, Some(2));
        assert_eq!(item.indent, 2);
        assert_eq!(item.text, "Second finding");
        assert!(list_item("---").is_none());
        assert!(list_item("plain text").is_none());
    }

    #[test]
    fn positions_are_tristate() {
        assert_eq!(parse_position("#2"), Ok(Tristate::Present(2)));
        assert_eq!(parse_position("**3rd**"), Ok(Tristate::Present(3)));
        assert_eq!(parse_position("Position 4"), Ok(Tristate::Present(4)));
        assert_eq!(parse_position("Not ranked"), Ok(Tristate::Null));
        assert_eq!(parse_position("-"), Ok(Tristate::Null));
        assert_eq!(parse_position(""), Ok(Tristate::Absent));
        assert!(parse_position("0").is_err());
        assert!(parse_position("top tier").is_err());
    }

    #[test]
    fn flags_and_numbers() {
        assert_eq!(parse_flag("✅ Yes"), Some(true));
        assert_eq!(parse_flag("**No**"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
        assert_eq!(parse_number("7.5/10"), Some(7.5));
        assert_eq!(parse_count("3 citations"), Some(3));
    }

    #[test]
    fn tables_skip_separator_rows() {
        let block = "intro\n| Platform | Cited |\n|---|:---:|\n| Perplexity | Yes |\n\n| A |\n| B |\n";
        let parsed = tables(block);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].headers, vec!["Platform", "Cited"]);
        assert_eq!(parsed[0].rows.len(), 1);
        assert_eq!(parsed[0].rows[0].line, 4);
        assert_eq!(parsed[0].column(&["cited"]), Some(1));
        assert_eq!(parsed[1].rows[0].cells, vec!["B"]);
    }

    #[test]
    fn bold_wrapped_label() {
        let parsed = labeled("**Overall Score: 6.5/10**").unwrap();
        assert_eq!(parsed.key, "overall score");
        assert_eq!(parsed.value, "6.5/10");
        assert!(labeled("Acme has strong press coverage across regional outlets: notably the Tribune").is_none());
    }

    #[test]
    fn subsections_split_at_headings() {
        let block = "lead\n### Citation 1: Wikipedia\n- **URL:** https://w.org\n### Citation 2: Yelp\nx\n";
        let parts = subsections(block);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].heading, None);
        assert_eq!(parts[1].heading.as_deref(), Some("Citation 1: Wikipedia"));
        assert_eq!(parts[1].lines, vec![(3, "- **URL:** https://w.org")]);
        assert_eq!(parts[2].level, 3);
    }

    #[test]
    fn domains_and_links() {
        assert_eq!(domain_of("https://www.Example.com/a?b"), "example.com");
        assert_eq!(domain_of("en.wikipedia.org/wiki/X"), "en.wikipedia.org");
        assert_eq!(unwrap_link("[Site](https://site.io)"), "https://site.io");
        assert_eq!(unwrap_link("<https://site.io>"), "https://site.io");
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round1(7.25), 7.3);
        assert_eq!(round1(6.04), 6.0);
    }
}
