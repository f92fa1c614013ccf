use crate::docket::{base_url_for, extract_docket, find_docket_table};
use crate::header::{CaseHeader, extract_header, header_end};
use crate::members::MemberCaseLog;
use crate::merge::{HtmlSnapshot, insert_extra_docketlines, merge_snapshots, read_supplement};
use crate::model::{CaseRecord, CaseStatus, CaseType, MemberCaseLink, RecordSource};
use crate::nos::NosTable;
use crate::page::{PageKind, TransactionReceipt, classify_page, read_receipt};
use crate::parties::{parse_parties, resolve_see_above};
use crate::roles::RoleRegistry;
use crate::stamp::{BACKWARDS_DOCKET_LABEL, DownloadStamp, PRIVATE_LABEL, read_stamp};
use crate::summary::parse_summary;
use crate::ucid::{CaseNumber, normalize_case_id, ucid};
use anyhow::{Context, Result, bail};
use regex::Regex;
use scraper::Html;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static MDL_FLAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^mdl(?:\s*[-#]?\s*(\d+))?$").expect("mdl flag regex must compile")
});

#[derive(Debug, Clone)]
pub struct CaseFiles {
    pub court: String,
    pub case_number: CaseNumber,
    pub html: Vec<PathBuf>,
    pub summary: Option<PathBuf>,
    pub supplement: Option<PathBuf>,
}

impl CaseFiles {
    pub fn ucid(&self) -> String {
        ucid(&self.court, &self.case_number.case_id())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AssembleContext<'a> {
    pub roles: &'a RoleRegistry,
    pub nos: &'a NosTable,
    pub members: Option<&'a MemberCaseLog>,
    pub backwards_courts: &'a BTreeSet<String>,
    pub resolve_see_above: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MdlStatus {
    pub is_mdl: bool,
    pub mdl_code: Option<u32>,
}

/// Lead case of type `md` (or this case itself), then an `MDL` flag.
pub fn detect_mdl(own: &CaseNumber, lead_case_id: Option<&str>, flags: &[String]) -> MdlStatus {
    let lead = lead_case_id.and_then(CaseNumber::parse);
    for candidate in [lead.as_ref(), Some(own)].into_iter().flatten() {
        if candidate.is_mdl() {
            return MdlStatus {
                is_mdl: true,
                mdl_code: candidate.number_value(),
            };
        }
    }

    for flag in flags {
        if let Some(caps) = MDL_FLAG_RE.captures(flag.trim()) {
            return MdlStatus {
                is_mdl: true,
                mdl_code: caps.get(1).and_then(|m| m.as_str().parse().ok()),
            };
        }
    }

    MdlStatus::default()
}

struct LoadedPages {
    snapshots: Vec<HtmlSnapshot>,
    stamp: DownloadStamp,
    receipt: TransactionReceipt,
    sealed: bool,
}

fn load_pages(ctx: &AssembleContext<'_>, files: &CaseFiles) -> Result<LoadedPages> {
    let court_reversed = ctx.backwards_courts.contains(&files.court.to_lowercase());
    let mut pages = LoadedPages {
        snapshots: Vec::with_capacity(files.html.len()),
        stamp: DownloadStamp::default(),
        receipt: TransactionReceipt::default(),
        sealed: false,
    };

    for path in &files.html {
        let html = read_page(path)?;

        let kind = classify_page(&html);
        if !kind.is_parseable() {
            warn!(path = %path.display(), kind = kind.as_str(), "dropping snapshot without case content");
            continue;
        }
        match kind {
            PageKind::SealedCase => pages.sealed = true,
            PageKind::Unknown => warn!(path = %path.display(), "unrecognised page; parsing anyway"),
            _ => {}
        }

        let stamp = read_stamp(&html).unwrap_or_default();
        let reversed = court_reversed || stamp.has_label(BACKWARDS_DOCKET_LABEL);
        merge_stamp(&mut pages.stamp, stamp);
        pages.receipt = pages.receipt.combine(read_receipt(&html));
        pages.snapshots.push(HtmlSnapshot {
            path: path.clone(),
            html,
            reversed,
        });
    }

    Ok(pages)
}

fn read_page(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read snapshot {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn merge_stamp(into: &mut DownloadStamp, stamp: DownloadStamp) {
    if stamp.user_hash.is_some() {
        into.user_hash = stamp.user_hash;
    }
    if stamp.download_timestamp.is_some() {
        into.download_timestamp = stamp.download_timestamp;
    }
    if stamp.download_url.is_some() {
        into.download_url = stamp.download_url;
    }
    if stamp.pacer_id.is_some() {
        into.pacer_id = stamp.pacer_id;
    }
    for label in stamp.labels {
        if !into.has_label(&label) {
            into.labels.push(label);
        }
    }
}

fn page_regions(page_html: &str) -> (String, String) {
    let doc = Html::parse_document(page_html);
    let serialized = doc.root_element().html();
    let docket_start = find_docket_table(&doc)
        .and_then(|table| serialized.rfind(&table.html()))
        .unwrap_or(serialized.len());
    let header_stop = header_end(&serialized).min(docket_start);

    let parties = serialized[header_stop..docket_start].to_string();
    // Without a header table both extractors see everything above the docket.
    let header = match header_stop {
        0 => &serialized[..docket_start],
        stop => &serialized[..stop],
    };
    (header.to_string(), parties)
}

pub fn assemble_case(ctx: &AssembleContext<'_>, files: &CaseFiles) -> Result<CaseRecord> {
    let case_ucid = files.ucid();
    let pages = load_pages(ctx, files)?;

    let merged = merge_snapshots(&pages.snapshots);
    let supplement = match &files.supplement {
        Some(path) => read_supplement(path)?,
        None => Vec::new(),
    };
    if merged.is_none() && supplement.is_empty() {
        bail!("no parseable snapshot or supplemental record for {case_ucid}");
    }

    let (header, party_html) = match &merged {
        Some(doc) => {
            let (header_html, party_html) = page_regions(&doc.page_html);
            (extract_header(&header_html), party_html)
        }
        None => (CaseHeader::default(), String::new()),
    };

    if let Some(number) = &header.case_number
        && number.case_id() != files.case_number.case_id()
    {
        debug!(ucid = %case_ucid, page = %number.case_id(), "page case number differs from file name");
    }

    let case_type = if header.criminal_title {
        CaseType::Criminal
    } else {
        files.case_number.case_type()
    };

    let mut party_parse = parse_parties(&party_html, ctx.roles, case_type);
    if ctx.resolve_see_above {
        let filled = resolve_see_above(&mut party_parse.parties);
        debug!(ucid = %case_ucid, filled, "see-above counsel resolved");
    }
    let parties = party_parse.parties;

    let base_url = base_url_for(&files.court, pages.stamp.download_url.as_deref());
    let docket_rows = merged.as_ref().and_then(|doc| doc.rows.as_ref());
    let docket_available = docket_rows.is_some();
    let base_docket = docket_rows
        .map(|rows| extract_docket(rows, base_url.as_ref()))
        .unwrap_or_default();
    let had_supplement = !supplement.is_empty();
    let docket = insert_extra_docketlines(base_docket, supplement);

    let nature_suit = header
        .nature_suit_raw
        .as_deref()
        .map(|raw| ctx.nos.resolve(raw).display());

    let mdl = detect_mdl(
        &files.case_number,
        header.lead_case_id.as_deref(),
        &header.case_flags,
    );

    let (member_case_key, in_member_group) = member_links(ctx, files, &header, &case_ucid);

    let judge = match (case_type, header.judge.clone()) {
        (CaseType::Criminal, None) => parties
            .iter()
            .filter_map(|p| p.criminal.as_ref())
            .find_map(|c| c.judge.clone()),
        (_, judge) => judge,
    };

    let summary = match &files.summary {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read summary page {}", path.display()))?;
            Some(parse_summary(&String::from_utf8_lossy(&bytes)))
        }
        None => None,
    };

    let source = match (merged.is_some(), had_supplement) {
        (true, true) => RecordSource::PacerRecap,
        (false, _) => RecordSource::Recap,
        (true, false) => RecordSource::Pacer,
    };

    let is_multi = mdl.is_mdl
        || header.lead_case_id.is_some()
        || in_member_group
        || !header.other_courts.is_empty();
    let is_stub = !docket_available && parties.is_empty();

    let mut record = CaseRecord {
        ucid: case_ucid.clone(),
        case_id: files.case_number.case_id(),
        court: files.court.to_lowercase(),
        case_type,
        case_name: header.case_name,
        filing_date: header.filing_date,
        terminating_date: None,
        case_status: CaseStatus::Open,
        judge,
        referred_judges: header.referred_judges,
        nature_suit,
        cause: header.cause,
        jurisdiction: header.jurisdiction,
        jury_demand: header.jury_demand,
        monetary_demand: header.monetary_demand,
        case_flags: header.case_flags,
        lead_case_id: header.lead_case_id,
        lead_case_pacer_id: header.lead_case_pacer_id,
        member_case_key,
        related_cases: header.related_cases,
        other_courts: header.other_courts,
        magistrate_case_ids: header.magistrate_case_ids,
        appeals_case_ids: header.appeals_case_ids,
        is_multi,
        is_mdl: mdl.is_mdl,
        mdl_code: mdl.mdl_code,
        parties,
        docket,
        docket_available,
        summary,
        source,
        pacer_id: pages.stamp.pacer_id.clone(),
        download_url: pages.stamp.download_url.clone(),
        download_timestamp: pages.stamp.download_timestamp.clone(),
        n_docket_reports: pages.snapshots.len(),
        billable_pages: pages.receipt.billable_pages,
        cost: pages.receipt.cost,
        is_stub,
        is_private: pages.sealed || pages.stamp.has_label(PRIVATE_LABEL),
    };
    record.set_terminating_date(header.terminating_date);

    info!(
        ucid = %record.ucid,
        parties = record.parties.len(),
        entries = record.docket.len(),
        snapshots = record.n_docket_reports,
        unknown_roles = party_parse.unknown_roles.len(),
        skipped_chunks = party_parse.skipped_chunks,
        "case assembled"
    );
    Ok(record)
}

/// Only the header of the last parseable page is read.
pub fn read_member_block(files: &CaseFiles) -> Result<Vec<MemberCaseLink>> {
    let mut last_page = None;
    for path in &files.html {
        let html = read_page(path)?;
        if classify_page(&html).is_parseable() {
            last_page = Some(html);
        }
    }
    let Some(page) = last_page else {
        return Ok(Vec::new());
    };
    let (header_html, _) = page_regions(&page);
    Ok(member_block_links(files, &extract_header(&header_html)))
}

fn member_block_links(files: &CaseFiles, header: &CaseHeader) -> Vec<MemberCaseLink> {
    let own_id = files.case_number.case_id();
    let lead = files.ucid();
    header
        .member_cases
        .iter()
        .filter(|m| m.case_id != own_id)
        .map(|m| MemberCaseLink {
            member: ucid(&files.court, &m.case_id),
            lead: lead.clone(),
            lead_case_id: own_id.clone(),
            member_id: m.pacer_id.clone(),
            court: files.court.to_lowercase(),
        })
        .collect()
}

/// `(member_case_key, part_of_a_group)`. The log must already hold every
/// member block of the run.
fn member_links(
    ctx: &AssembleContext<'_>,
    files: &CaseFiles,
    header: &CaseHeader,
    case_ucid: &str,
) -> (Option<String>, bool) {
    if !member_block_links(files, header).is_empty() {
        return (Some(case_ucid.to_string()), true);
    }

    if let Some(lead) = ctx.members.and_then(|log| log.lead_for(case_ucid)) {
        return (Some(lead), true);
    }

    let lead_is_self = header
        .lead_case_id
        .as_deref()
        .and_then(normalize_case_id)
        .is_some_and(|lead| lead == files.case_number.case_id());
    (lead_is_self.then(|| case_ucid.to_string()), false)
}
