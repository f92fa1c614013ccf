use crate::model::{Counsel, EntityInfo};
use crate::text::{html_lines, is_address_like, render};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<b\b[^>]*>(.*?)</b>").expect("bold regex must compile"));

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\(\d{3}\)|\b\d{3})[\s.\-/]*\d{3}[\s.\-]\d{4}\b(?:\s*(?:x|ext\.?)\s*\d+)?")
        .expect("phone regex must compile")
});

static FAX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^fax\s*:?\s*(.*)$").expect("fax regex must compile"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^e-?mail\s*:?\s*(.*)$").expect("email regex must compile"));

static TERMINATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^terminated\s*:\s*(\d{1,2}/\d{1,2}/\d{4})").expect("terminated regex must compile")
});

static DESIGNATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^designation\s*:\s*(.+)$").expect("designation regex must compile")
});

static BAR_STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(trial\s+)?bar\s+status\s*:\s*(.+)$").expect("bar status regex must compile")
});

static SEE_ABOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\(?\s*see\s+above\s+for\s+address\s*\)?$").expect("see above regex must compile")
});

pub fn parse_counsel_block(html: &str) -> Vec<Counsel> {
    let names = BOLD_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = render(&caps[1])?;
            Some((whole.start(), whole.end(), name))
        })
        .collect::<Vec<_>>();

    names
        .iter()
        .enumerate()
        .filter_map(|(idx, (_, end, name))| {
            let stop = names.get(idx + 1).map(|(start, _, _)| *start).unwrap_or(html.len());
            let counsel = parse_counsel(name, &html[*end..stop]);
            if counsel.is_none() {
                debug!(name, "bold text in counsel block is not a lawyer");
            }
            counsel
        })
        .collect()
}

fn parse_counsel(name: &str, block_html: &str) -> Option<Counsel> {
    if is_designation(name) {
        return None;
    }

    let mut counsel = Counsel {
        name: name.to_string(),
        ..Counsel::default()
    };

    let mut rest = Vec::new();
    for line in html_lines(block_html) {
        let upper = line.to_uppercase();
        match upper.as_str() {
            "LEAD ATTORNEY" => counsel.is_lead_attorney = true,
            "ATTORNEY TO BE NOTICED" => counsel.is_notice_attorney = true,
            "PRO HAC VICE" => counsel.is_pro_hac_vice = true,
            "PRO SE" => counsel.is_pro_se = true,
            _ if SEE_ABOVE_RE.is_match(&line) => counsel.has_see_above = true,
            _ => {
                if let Some(caps) = DESIGNATION_RE.captures(&line) {
                    counsel.designation = Some(caps[1].trim().to_string());
                    match caps[1].trim().to_uppercase().as_str() {
                        "PRO HAC VICE" => counsel.is_pro_hac_vice = true,
                        "PRO SE" => counsel.is_pro_se = true,
                        _ => {}
                    }
                } else if let Some(caps) = BAR_STATUS_RE.captures(&line) {
                    let value = Some(caps[2].trim().to_string());
                    if caps.get(1).is_some() {
                        counsel.trial_bar_status = value;
                    } else {
                        counsel.bar_status = value;
                    }
                } else {
                    rest.push(line);
                }
            }
        }
    }

    counsel.entity_info = parse_entity_info(&rest);
    Some(counsel)
}

fn is_designation(text: &str) -> bool {
    matches!(
        text.to_uppercase().as_str(),
        "LEAD ATTORNEY" | "ATTORNEY TO BE NOTICED" | "PRO HAC VICE" | "PRO SE"
    )
}

/// The address is the run of address-like lines directly above the earliest
/// contact field; everything above it is the office name.
pub fn parse_entity_info(lines: &[String]) -> EntityInfo {
    let mut info = EntityInfo::default();
    let mut body = Vec::with_capacity(lines.len());
    for line in lines {
        if let Some(caps) = TERMINATED_RE.captures(line) {
            info.terminating_date = Some(caps[1].to_string());
        } else {
            body.push(line.as_str());
        }
    }
    if body.is_empty() {
        return info;
    }
    info.raw_info = Some(body.join("\n"));

    let mut contact_idx = body.len();

    if let Some((idx, caps)) = last_match(&body, &FAX_RE) {
        info.fax = non_empty(&caps);
        contact_idx = contact_idx.min(idx);
    }
    if let Some((idx, caps)) = last_match(&body, &EMAIL_RE) {
        info.email = non_empty(&caps);
        contact_idx = contact_idx.min(idx);
    }
    let phone = body.iter().enumerate().rev().find_map(|(idx, line)| {
        if FAX_RE.is_match(line) || EMAIL_RE.is_match(line) {
            return None;
        }
        PHONE_RE.find(line).map(|m| (idx, m.as_str().to_string()))
    });
    if let Some((idx, phone)) = phone {
        info.phone = Some(phone);
        contact_idx = contact_idx.min(idx);
    }

    let mut address_start = contact_idx;
    while address_start > 0 && is_address_like(body[address_start - 1]) {
        address_start -= 1;
    }

    if address_start < contact_idx {
        info.address = Some(body[address_start..contact_idx].join("\n"));
    }
    if address_start > 0 {
        info.office_name = Some(body[..address_start].join("\n"));
    }
    info
}

fn last_match(lines: &[&str], re: &Regex) -> Option<(usize, String)> {
    lines.iter().enumerate().rev().find_map(|(idx, line)| {
        re.captures(line)
            .map(|caps| (idx, caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default()))
    })
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
