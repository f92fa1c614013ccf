use crate::header::clean_judge;
use crate::model::{CountRecord, DefendantDetail};
use crate::text::{html_lines, render};
use regex::Regex;
use std::sync::LazyLock;

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<(?:b|u)\b[^>]*>\s*<(?:b|u)\b[^>]*>\s*(pending\s+counts|terminated\s+counts|highest\s+offense\s+level\s*\(\s*(?:opening|terminated)\s*\)|complaints)\s*</(?:b|u)>\s*</(?:b|u)>",
    )
    .expect("count section regex must compile")
});

static ROW_CELLS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").expect("td regex must compile"));

static COUNT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*(\d+[a-z]*(?:\s*[-,]\s*\d+[a-z]*)*)\s*\)\s*$").expect("count id regex must compile")
});

pub static COUNTS_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:b|u)\b[^>]*>\s*<(?:b|u)\b[^>]*>\s*(?:pending\s+counts|terminated\s+counts|highest\s+offense|complaints)")
        .expect("counts start regex must compile")
});

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(assigned\s+to|referred\s+to|appeals\s+court\s+case\s+numbers?)\s*:\s*(.*)$")
        .expect("defendant header label regex must compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Pending,
    Terminated,
    OffenseOpening,
    OffenseTerminated,
    Complaints,
}

impl Section {
    fn from_heading(heading: &str) -> Option<Self> {
        let heading = heading.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match heading.as_str() {
            "pending counts" => Some(Section::Pending),
            "terminated counts" => Some(Section::Terminated),
            "complaints" => Some(Section::Complaints),
            h if h.starts_with("highest offense level") && h.contains("opening") => {
                Some(Section::OffenseOpening)
            }
            h if h.starts_with("highest offense level") => Some(Section::OffenseTerminated),
            _ => None,
        }
    }
}

pub fn parse_defendant_detail(chunk_html: &str, preceding_html: &str) -> DefendantDetail {
    let mut detail = DefendantDetail::default();

    let sections = SECTION_RE
        .captures_iter(chunk_html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), whole.end(), Section::from_heading(&caps[1])?))
        })
        .collect::<Vec<_>>();

    for (idx, (_, end, section)) in sections.iter().enumerate() {
        let stop = sections
            .get(idx + 1)
            .map(|(start, _, _)| *start)
            .unwrap_or(chunk_html.len());
        let rows = section_rows(&chunk_html[*end..stop]);
        match section {
            Section::Pending => detail.pending_counts.extend(rows.into_iter().map(count_record)),
            Section::Terminated => detail.terminated_counts.extend(rows.into_iter().map(count_record)),
            Section::OffenseOpening => {
                detail.highest_offense_level_opening = rows.into_iter().next().map(|(text, _)| text)
            }
            Section::OffenseTerminated => {
                detail.highest_offense_level_terminated =
                    rows.into_iter().next().map(|(text, _)| text)
            }
            Section::Complaints => {
                if let Some((text, disposition)) = rows.into_iter().next() {
                    detail.complaints_text = Some(text);
                    detail.complaints_disposition = disposition;
                }
            }
        }
    }

    let assignment = parse_defendant_header(preceding_html);
    detail.judge = assignment.judge;
    detail.referred_judges = assignment.referred_judges;
    detail.appeals_case_ids = assignment.appeals_case_ids;
    detail
}

/// `(text, disposition)` for each data row after a section heading. The
/// remainder of the heading row and `None` placeholders are skipped.
fn section_rows(html: &str) -> Vec<(String, Option<String>)> {
    let mut out = Vec::new();
    for row in html.split("<tr").skip(1) {
        let mut filled = ROW_CELLS_RE
            .captures_iter(row)
            .filter_map(|caps| render(&caps[1]));
        let Some(text) = filled.next() else {
            continue;
        };
        // The next defendant's assignment block ends the section.
        if LABEL_RE.is_match(&text) {
            break;
        }
        if text.eq_ignore_ascii_case("none") || text.eq_ignore_ascii_case("disposition") {
            continue;
        }
        out.push((text, filled.last()));
    }
    out
}

fn count_record((text, disposition): (String, Option<String>)) -> CountRecord {
    match COUNT_ID_RE.captures(&text) {
        Some(caps) => {
            let pacer_id = caps[1].split_whitespace().collect::<String>();
            let start = caps.get(0).map(|m| m.start()).unwrap_or(text.len());
            CountRecord {
                pacer_id: Some(pacer_id),
                text: text[..start].trim().to_string(),
                disposition,
            }
        }
        None => CountRecord {
            pacer_id: None,
            text,
            disposition,
        },
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefendantAssignment {
    pub judge: Option<String>,
    pub referred_judges: Vec<String>,
    pub appeals_case_ids: Vec<String>,
}

pub fn parse_defendant_header(html: &str) -> DefendantAssignment {
    let lines = html_lines(html);
    let start = lines
        .iter()
        .rposition(|line| line.to_lowercase().starts_with("assigned to"))
        .unwrap_or(0);

    let mut out = DefendantAssignment::default();
    for line in &lines[start..] {
        let Some(caps) = LABEL_RE.captures(line) else {
            continue;
        };
        let value = caps[2].trim();
        if value.is_empty() {
            continue;
        }
        let label = caps[1].to_lowercase();
        if label.starts_with("assigned") {
            out.judge = Some(clean_judge(value));
        } else if label.starts_with("referred") {
            let judge = clean_judge(value);
            if !out.referred_judges.contains(&judge) {
                out.referred_judges.push(judge);
            }
        } else {
            for id in value.split([',', ';']).map(str::trim).filter(|v| !v.is_empty()) {
                if !out.appeals_case_ids.iter().any(|existing| existing == id) {
                    out.appeals_case_ids.push(id.to_string());
                }
            }
        }
    }
    out
}
