use crate::counsel::{parse_counsel_block, parse_entity_info};
use crate::criminal::{COUNTS_START_RE, parse_defendant_detail};
use crate::model::{CaseType, Counsel, EntityInfo, Party, PartyType};
use crate::roles::{ResolvedRole, RoleRegistry, role_number};
use crate::text::{html_lines, render, strip_tags};
use html_escape::decode_html_entities;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

static ROLE_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<b\b[^>]*>\s*<u\b[^>]*>(.*?)</u>\s*</b>|<u\b[^>]*>\s*<b\b[^>]*>(.*?)</b>\s*</u>")
        .expect("role heading regex must compile")
});

static REPRESENTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\brepresented\b(?:(?:\s|&nbsp;|&#160;|<[^>]*>)*by\b)?")
        .expect("represented regex must compile")
});

static ROLELESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:service\s+list|notice\s+list|copies\s+to|correspondence\s+to|(?:served|noticed|mailed|sent)\s+by|by)\s*:",
    )
    .expect("roleless marker regex must compile")
});

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<b\b[^>]*>(.*?)</b>").expect("bold regex must compile"));

/// Bold+underlined text that is section vocabulary rather than a role.
const EXCLUDED_HEADINGS: &[&str] = &[
    "pending counts",
    "terminated counts",
    "disposition",
    "highest offense level",
    "complaints",
];

const SEPARATOR_HEADINGS: &[&str] = &["v.", "v", "vs", "vs.", "versus"];

const ROLELESS_ROLE: &str = "roleless party";

const MAX_ROLE_CHARS: usize = 80;

#[derive(Debug, Clone, Default)]
pub struct PartyParse {
    pub parties: Vec<Party>,
    /// Roles missing from the registry; each was filed as misc.
    pub unknown_roles: Vec<String>,
    pub skipped_chunks: usize,
}

struct Heading {
    start: usize,
    end: usize,
    role: String,
}

fn role_headings(html: &str) -> Vec<Heading> {
    ROLE_HEADING_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1).or_else(|| caps.get(2))?;
            let role = render(inner.as_str())?;
            let lowered = role.to_lowercase();
            if role.chars().count() > MAX_ROLE_CHARS
                || SEPARATOR_HEADINGS.contains(&lowered.as_str())
                || EXCLUDED_HEADINGS.iter().any(|h| lowered.starts_with(h))
            {
                debug!(heading = %role, "skipping non-role heading");
                return None;
            }
            Some(Heading {
                start: whole.start(),
                end: whole.end(),
                role,
            })
        })
        .collect()
}

/// Byte offsets of roleless-party markers. A marker directly after the word
/// `represented` is the counsel label, not a marker.
fn roleless_markers(chunk: &str) -> Vec<(usize, usize)> {
    ROLELESS_RE
        .find_iter(chunk)
        .filter(|m| {
            let before = decode_html_entities(&strip_tags(&chunk[..m.start()])).to_lowercase();
            !before.trim_end().ends_with("represented")
        })
        .map(|m| (m.start(), m.end()))
        .collect()
}

fn split_roleless(chunk: &str) -> Vec<(bool, &str)> {
    let markers = roleless_markers(chunk);
    let mut out = Vec::with_capacity(markers.len() + 1);
    let first_stop = markers.first().map(|(start, _)| *start).unwrap_or(chunk.len());
    out.push((false, &chunk[..first_stop]));
    for (idx, (_, end)) in markers.iter().enumerate() {
        let stop = markers.get(idx + 1).map(|(start, _)| *start).unwrap_or(chunk.len());
        out.push((true, &chunk[*end..stop]));
    }
    out
}

pub fn parse_parties(html: &str, registry: &RoleRegistry, case_type: CaseType) -> PartyParse {
    let headings = role_headings(html);
    let mut out = PartyParse::default();

    for (idx, heading) in headings.iter().enumerate() {
        let stop = headings.get(idx + 1).map(|h| h.start).unwrap_or(html.len());
        let chunk = &html[heading.end..stop];
        let preceding = match idx {
            0 => &html[..heading.start],
            _ => &html[headings[idx - 1].end..heading.start],
        };

        let resolved = registry.resolve(&heading.role);
        if resolved.synthesized {
            warn!(role = %heading.role, "unknown party role; filed as misc");
            if !out.unknown_roles.contains(&heading.role) {
                out.unknown_roles.push(heading.role.clone());
            }
        }

        for (roleless, segment) in split_roleless(chunk) {
            let role = if roleless {
                registry.resolve(ROLELESS_ROLE)
            } else {
                resolved.clone()
            };
            let is_defendant =
                !roleless && case_type == CaseType::Criminal && role.party_type == PartyType::Defendant;
            let entity_html = if is_defendant {
                COUNTS_START_RE
                    .find(segment)
                    .map(|m| &segment[..m.start()])
                    .unwrap_or(segment)
            } else {
                segment
            };

            let Some(mut party) = parse_entity(entity_html, &role) else {
                if roleless || render(segment).is_some() {
                    warn!(role = %heading.role, roleless, "could not find a party name; skipping chunk");
                    out.skipped_chunks += 1;
                }
                continue;
            };

            if is_defendant {
                let mut detail = parse_defendant_detail(segment, preceding);
                detail.pacer_id = role_number(&heading.role);
                party.criminal = Some(detail);
            }
            out.parties.push(party);
        }
    }

    out
}

fn parse_entity(html: &str, role: &ResolvedRole) -> Option<Party> {
    let (name, info, counsel) = match REPRESENTED_RE.find(html) {
        Some(m) => {
            let before = &html[..m.start()];
            let (name, info) = match BOLD_RE.captures(before) {
                Some(caps) => {
                    let end = caps.get(0).map(|w| w.end()).unwrap_or(before.len());
                    (render(&caps[1])?, parse_entity_info(&html_lines(&before[end..])))
                }
                None => {
                    let mut lines = html_lines(before).into_iter();
                    let name = lines.next()?;
                    (name, parse_entity_info(&lines.collect::<Vec<_>>()))
                }
            };
            (name, info, parse_counsel_block(&html[m.end()..]))
        }
        None => {
            let caps = BOLD_RE.captures(html)?;
            let end = caps.get(0).map(|w| w.end()).unwrap_or(html.len());
            let name = render(&caps[1])?;
            (name, parse_entity_info(&html_lines(&html[end..])), Vec::new())
        }
    };

    Some(Party {
        name,
        entity_info: info,
        role: role.title.clone(),
        party_type: role.party_type,
        counsel,
        criminal: None,
    })
}

/// Fills the contact fields of `See above for address` counsel from the
/// nearest earlier counsel of the same name. Returns how many were filled.
pub fn resolve_see_above(parties: &mut [Party]) -> usize {
    let mut known: HashMap<String, EntityInfo> = HashMap::new();
    let mut resolved = 0usize;
    for counsel in parties.iter_mut().flat_map(|p| p.counsel.iter_mut()) {
        let key = counsel.name.to_lowercase();
        if counsel.has_see_above {
            if let Some(info) = known.get(&key) {
                backfill(counsel, info);
                resolved += 1;
            }
        } else if !counsel.entity_info.is_empty() {
            known.insert(key, counsel.entity_info.clone());
        }
    }
    resolved
}

fn backfill(counsel: &mut Counsel, info: &EntityInfo) {
    let own = &mut counsel.entity_info;
    if own.office_name.is_none() {
        own.office_name.clone_from(&info.office_name);
    }
    if own.address.is_none() {
        own.address.clone_from(&info.address);
    }
    if own.phone.is_none() {
        own.phone.clone_from(&info.phone);
    }
    if own.fax.is_none() {
        own.fax.clone_from(&info.fax);
    }
    if own.email.is_none() {
        own.email.clone_from(&info.email);
    }
}
