use crate::text::{html_lines, render, strip_tags};
use crate::ucid::{CaseNumber, find_case_ids, normalize_case_id};
use regex::Regex;
use std::sync::LazyLock;

static DOCKET_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(criminal|civil|bankruptcy)\s+)?docket\s+for\s+case\s*#\s*:?\s*(.*)$")
        .expect("docket title regex must compile")
});

static LABEL_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z .()/'-]{0,48}?)\s*:\s*(.*)$").expect("label line regex must compile")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,2}/\d{1,2}/\d{4}\b").expect("header date regex must compile")
});

static HONORIFIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:the\s+)?(?:honorable|hon\.?)\s+").expect("honorific regex must compile")
});

static FLAG_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w./()\-]+(?:\s*,\s*[\w./()\-]+)*$").expect("flag line regex must compile")
});

static LEAD_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)Lead\s+case\s*:\s*(?:<[^>]*>\s*)*?<a\b[^>]*?href\s*=\s*["'][^"']*?\?(\d+)"#)
        .expect("lead case link regex must compile")
});

static MEMBER_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Member\s+cases?\s*:(.*?)</td>").expect("member block regex must compile")
});

static MEMBER_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?href\s*=\s*["'][^"']*?\?(\d+)[^"']*["'][^>]*>(.*?)</a>"#)
        .expect("member link regex must compile")
});

static DATE_FILED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Date\s+Filed\s*:").expect("date filed label regex must compile")
});

const MENU_WORDS: &[&str] = &["query", "reports", "utilities", "help", "log out", "logout"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub case_id: String,
    pub pacer_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseHeader {
    pub case_number: Option<CaseNumber>,
    pub criminal_title: bool,
    pub case_name: Option<String>,
    pub filing_date: Option<String>,
    pub terminating_date: Option<String>,
    pub judge: Option<String>,
    pub referred_judges: Vec<String>,
    pub nature_suit_raw: Option<String>,
    pub jury_demand: Option<String>,
    pub cause: Option<String>,
    pub jurisdiction: Option<String>,
    pub monetary_demand: Option<String>,
    pub lead_case_id: Option<String>,
    pub lead_case_pacer_id: Option<String>,
    pub related_cases: Vec<String>,
    pub other_courts: Vec<String>,
    pub magistrate_case_ids: Vec<String>,
    pub appeals_case_ids: Vec<String>,
    pub case_flags: Vec<String>,
    pub member_cases: Vec<MemberRef>,
}

pub fn extract_header(html: &str) -> CaseHeader {
    let lines = html_lines(html);
    let mut header = CaseHeader::default();

    let title_idx = lines.iter().position(|line| DOCKET_TITLE_RE.is_match(line));
    if let Some(idx) = title_idx
        && let Some(caps) = DOCKET_TITLE_RE.captures(&lines[idx])
    {
        header.criminal_title = caps
            .get(1)
            .is_some_and(|m| m.as_str().eq_ignore_ascii_case("criminal"));
        header.case_number = caps.get(2).and_then(|m| CaseNumber::parse(m.as_str()));
        header.case_flags = flags_before(&lines[..idx]);
    }

    let body_start = title_idx.map(|idx| idx + 1).unwrap_or(0);
    for line in &lines[body_start..] {
        let Some(caps) = LABEL_LINE_RE.captures(line) else {
            if title_idx.is_some() && header.case_name.is_none() {
                header.case_name = Some(line.clone());
            }
            continue;
        };
        let label = caps[1].trim().to_lowercase();
        let value = caps[2].trim();
        apply_label(&mut header, &label, value, line);
    }

    header.lead_case_pacer_id = header
        .lead_case_id
        .as_ref()
        .and_then(|_| LEAD_LINK_RE.captures(html))
        .map(|caps| caps[1].to_string());
    header.member_cases = member_cases(html);
    header
}

fn apply_label(header: &mut CaseHeader, label: &str, value: &str, line: &str) {
    let value_opt = (!value.is_empty()).then(|| value.to_string());
    match label {
        "case title" => header.case_name = value_opt.or(header.case_name.take()),
        "date filed" => header.filing_date = first_date(value),
        "date terminated" => header.terminating_date = first_date(value),
        "assigned to" => header.judge = value_opt.map(|v| clean_judge(&v)),
        "referred to" => {
            if !value.is_empty() {
                let judge = clean_judge(value);
                if !header.referred_judges.contains(&judge) {
                    header.referred_judges.push(judge);
                }
            }
        }
        "nature of suit" => header.nature_suit_raw = value_opt,
        "jury demand" => header.jury_demand = value_opt,
        "cause" => header.cause = value_opt,
        "jurisdiction" => header.jurisdiction = value_opt,
        "demand" => header.monetary_demand = value_opt,
        "lead case" => header.lead_case_id = normalize_case_id(value),
        "related case" | "related cases" => extend_unique(&mut header.related_cases, find_case_ids(value)),
        "case in other court" | "cases in other court" | "case in other courts" => {
            if let Some(value) = value_opt
                && !header.other_courts.contains(&value)
            {
                header.other_courts.push(value);
            }
        }
        "magistrate judge case number" | "magistrate judge case numbers" => {
            extend_unique(&mut header.magistrate_case_ids, find_case_ids(value))
        }
        "appeals court case number" | "appeals court case numbers" | "usca case number" => {
            extend_unique(&mut header.appeals_case_ids, split_list(value))
        }
        _ if header.case_name.is_none() && label.starts_with("in re") => {
            header.case_name = Some(line.to_string());
        }
        _ => {}
    }
}

fn first_date(value: &str) -> Option<String> {
    DATE_RE.find(value).map(|m| m.as_str().to_string())
}

/// Strips honorifics; `Honorable Jane Doe` → `Jane Doe`.
pub fn clean_judge(value: &str) -> String {
    HONORIFIC_RE.replace(value.trim(), "").trim().to_string()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', ';'])
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn extend_unique(target: &mut Vec<String>, values: Vec<String>) {
    for value in values {
        if !target.contains(&value) {
            target.push(value);
        }
    }
}

fn flags_before(lines: &[String]) -> Vec<String> {
    let mut flags = Vec::new();
    for line in lines {
        let lowered = line.to_lowercase();
        if MENU_WORDS.contains(&lowered.as_str())
            || lowered.contains("district court")
            || lowered.contains("cm/ecf")
            || !FLAG_LINE_RE.is_match(line)
        {
            continue;
        }
        for flag in line.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            if !flags.iter().any(|f: &String| f == flag) {
                flags.push(flag.to_string());
            }
        }
    }
    flags
}

fn member_cases(html: &str) -> Vec<MemberRef> {
    let Some(block) = MEMBER_BLOCK_RE.captures(html).and_then(|caps| caps.get(1)) else {
        return Vec::new();
    };
    let block = block.as_str();

    let mut out: Vec<MemberRef> = Vec::new();
    for caps in MEMBER_LINK_RE.captures_iter(block) {
        let Some(case_id) = render(&caps[2]).and_then(|label| normalize_case_id(&label)) else {
            continue;
        };
        if !out.iter().any(|m| m.case_id == case_id) {
            out.push(MemberRef {
                case_id,
                pacer_id: Some(caps[1].to_string()),
            });
        }
    }
    for case_id in find_case_ids(&strip_tags(block)) {
        if !out.iter().any(|m| m.case_id == case_id) {
            out.push(MemberRef {
                case_id,
                pacer_id: None,
            });
        }
    }
    out
}

/// Byte offset where the header table ends: the first `</table>` after the
/// `Date Filed:` label. Zero when the label is missing.
pub fn header_end(page_html: &str) -> usize {
    let Some(label) = DATE_FILED_RE.find(page_html) else {
        return 0;
    };
    let rest = &page_html[label.end()..];
    match rest.find("</table>") {
        Some(pos) => label.end() + pos + "</table>".len(),
        None => page_html.len(),
    }
}
