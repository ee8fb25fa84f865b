// src/extractors/details.rs
//! Flat detail sections. Each is optional at the document level.

use super::markdown::{labeled, list_item, split_inline_list, strip_emphasis};
use super::splitter::SectionKind;
use crate::audit::{CompanyInfo, Gaps, ReauditSchedule};
use crate::utils::error::{Diagnostics, ExtractError};

fn non_empty(value: String) -> Option<String> {
    match value.to_lowercase().as_str() {
        "" | "-" | "n/a" | "unknown" => None,
        _ => Some(value),
    }
}

pub fn extract_company_info(block: &str, diagnostics: &mut Diagnostics) -> Result<CompanyInfo, ExtractError> {
    let section = SectionKind::CompanyInfo;
    let mut info = CompanyInfo::default();
    let mut recognized = 0;

    for (index, line) in block.lines().enumerate() {
        let Some(label) = labeled(line) else {
            continue;
        };
        let slot = match label.key.as_str() {
            "founded" | "year founded" | "established" => &mut info.founded,
            "founder" | "founders" | "founded by" => &mut info.founder,
            "headquarters" | "hq" | "location" => &mut info.headquarters,
            "company size" | "size" | "employees" | "team size" => &mut info.company_size,
            "industry" | "sector" => &mut info.industry,
            "specialization" | "specialty" | "focus" => &mut info.specialization,
            "additional offices" | "offices" | "other locations" => {
                info.additional_offices.extend(split_inline_list(&label.value));
                recognized += 1;
                continue;
            }
            other => {
                diagnostics.warn(section, index + 1, format!("unknown company field '{}'", other));
                continue;
            }
        };
        *slot = non_empty(label.value);
        recognized += 1;
    }

    if recognized == 0 {
        return Err(ExtractError::NoRecords(section));
    }
    Ok(info)
}

pub fn extract_reaudit_schedule(
    block: &str,
    diagnostics: &mut Diagnostics,
) -> Result<ReauditSchedule, ExtractError> {
    let section = SectionKind::ReauditSchedule;
    let mut schedule = ReauditSchedule::default();

    for (index, line) in block.lines().enumerate() {
        if let Some(label) = labeled(line) {
            match label.key.as_str() {
                "next audit" | "next audit date" | "next review" | "recommended date" => {
                    schedule.next_audit_date = non_empty(label.value);
                    continue;
                }
                "frequency" | "cadence" | "audit frequency" => {
                    schedule.frequency = non_empty(label.value);
                    continue;
                }
                "milestones" | "milestone" => {
                    schedule.milestones.extend(split_inline_list(&label.value));
                    continue;
                }
                _ => {}
            }
        }
        if let Some(item) = list_item(line) {
            let text = strip_emphasis(item.text);
            if !text.is_empty() {
                schedule.milestones.push(text);
            }
        } else if !line.trim().is_empty() {
            tracing::trace!("Ignoring re-audit line {}: {}", index + 1, line);
        }
    }

    if schedule.next_audit_date.is_none() && schedule.frequency.is_none() && schedule.milestones.is_empty() {
        diagnostics.warn(section, 0, "re-audit schedule has no date, frequency or milestones");
        return Err(ExtractError::NoRecords(section));
    }
    Ok(schedule)
}

pub fn extract_gaps(block: &str, diagnostics: &mut Diagnostics) -> Result<Gaps, ExtractError> {
    let section = SectionKind::Gaps;
    let mut gaps = Gaps::default();

    for line in block.lines() {
        if let Some(label) = labeled(line) {
            if label.is(&["impact", "overall impact", "business impact"]) {
                gaps.impact = non_empty(label.value);
                continue;
            }
        }
        if let Some(item) = list_item(line) {
            let text = strip_emphasis(item.text);
            if !text.is_empty() {
                gaps.critical.push(text);
            }
        }
    }

    if gaps.critical.is_empty() && gaps.impact.is_none() {
        diagnostics.warn(section, 0, "gaps section has no items");
        return Err(ExtractError::NoRecords(section));
    }
    Ok(gaps)
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_info_fields() {
        let block = "- **Founded:** 2012\n- **Founder:** Jane Roe\n- **Headquarters:** Portland, OR\n- **Additional Offices:** Seattle; Boise\n- **Size:** 11-50\n- **Industry:** N/A\n- **Mascot:** Owl\n";
        let mut diagnostics = Diagnostics::new();
        let info = extract_company_info(block, &mut diagnostics).unwrap();
        assert_eq!(info.founded.as_deref(), Some("2012"));
        assert_eq!(info.headquarters.as_deref(), Some("Portland, OR"));
        assert_eq!(info.additional_offices, vec!["Seattle", "Boise"]);
        assert_eq!(info.company_size.as_deref(), Some("11-50"));
        assert_eq!(info.industry, None);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn schedule_and_gaps() {
        let mut diagnostics = Diagnostics::new();
        let schedule = extract_reaudit_schedule(
            "**Next Audit:** 2025-04-15\n**Frequency:** Quarterly\n\n- Wikipedia draft live\n- 25 new reviews\n",
            &mut diagnostics,
        )
        .unwrap();
        assert_eq!(schedule.next_audit_date.as_deref(), Some("2025-04-15"));
        assert_eq!(schedule.milestones.len(), 2);

        let gaps = extract_gaps("- No Wikipedia page\n- Missing schema\n\n**Impact:** Invisible in 2 of 3 engines\n", &mut diagnostics)
            .unwrap();
        assert_eq!(gaps.critical, vec!["No Wikipedia page", "Missing schema"]);
        assert_eq!(gaps.impact.as_deref(), Some("Invisible in 2 of 3 engines"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn empty_optional_sections_fail() {
        let mut diagnostics = Diagnostics::new();
        assert!(extract_company_info("Nothing known.", &mut diagnostics).is_err());
        assert!(extract_gaps("", &mut diagnostics).is_err());
    }
}
