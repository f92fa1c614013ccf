use crate::docket::{RawDocketRow, read_docket_rows};
use crate::model::DocketEntry;
use crate::text::{clean_text, render};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const PLACEMENT_THRESHOLD: f64 = 0.8;

const HASH_TEXT_CHARS: usize = 20;

#[derive(Debug, Clone)]
pub struct HtmlSnapshot {
    pub path: PathBuf,
    pub html: String,
    pub reversed: bool,
}

#[derive(Debug, Clone)]
pub struct MergedDocument {
    pub page_html: String,
    pub rows: Option<Vec<RawDocketRow>>,
    pub snapshots: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

/// Stable content key of a row: date, index label and the first characters
/// of its cleaned text.
pub fn row_hash(row: &RawDocketRow) -> String {
    let text = render(&row.text_html).unwrap_or_default();
    let head = text.chars().take(HASH_TEXT_CHARS).collect::<String>();
    let material = format!(
        "{}|{}|{}",
        row.date.as_deref().unwrap_or(""),
        row.ind,
        head
    );
    hex::encode(Sha256::digest(material.as_bytes()))
}

/// Concatenates per-snapshot rows in snapshot order, each snapshot turned
/// oldest-first when flagged, and keeps the first occurrence of every row.
pub fn consolidate_rows(snapshots: Vec<(Vec<RawDocketRow>, bool)>) -> Vec<RawDocketRow> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (mut rows, reversed) in snapshots {
        if reversed {
            rows.reverse();
        }
        for row in rows {
            if seen.insert(row_hash(&row)) {
                out.push(row);
            } else {
                debug!(ind = %row.ind, "dropping duplicate docket row");
            }
        }
    }
    out
}

pub fn merge_snapshots(snapshots: &[HtmlSnapshot]) -> Option<MergedDocument> {
    let last = snapshots.last()?;

    let mut found_table = false;
    let mut per_file = Vec::with_capacity(snapshots.len());
    for snapshot in snapshots {
        let doc = Html::parse_document(&snapshot.html);
        match read_docket_rows(&doc) {
            Some(rows) => {
                found_table = true;
                per_file.push((rows, snapshot.reversed));
            }
            None => debug!(path = %snapshot.path.display(), "snapshot has no docket table"),
        }
    }

    Some(MergedDocument {
        page_html: last.html.clone(),
        rows: found_table.then(|| consolidate_rows(per_file)),
        snapshots: snapshots.len(),
    })
}

#[derive(Debug, Deserialize)]
struct SupplementFile {
    #[serde(default, alias = "docket")]
    docket_entries: Vec<SupplementEntry>,
}

#[derive(Debug, Deserialize)]
struct SupplementEntry {
    #[serde(default)]
    date_filed: Option<String>,
    #[serde(default, alias = "ind")]
    entry_number: Option<Value>,
    #[serde(default, alias = "docket_text")]
    description: Option<String>,
}

pub fn parse_supplement(text: &str) -> Result<Vec<DocketEntry>> {
    let file: SupplementFile = serde_json::from_str(text)?;
    Ok(file
        .docket_entries
        .into_iter()
        .map(|entry| DocketEntry {
            date_filed: entry.date_filed.as_deref().map(normalize_date),
            ind: match entry.entry_number {
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Number(n)) => n.to_string(),
                _ => String::new(),
            },
            docket_text: entry.description.as_deref().and_then(clean_text),
            ..DocketEntry::default()
        })
        .collect())
}

pub fn read_supplement(path: &Path) -> Result<Vec<DocketEntry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read supplemental record {}", path.display()))?;
    parse_supplement(&text)
        .with_context(|| format!("failed to parse supplemental record {}", path.display()))
}

pub fn parse_docket_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let value = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(value, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .ok()
}

fn normalize_date(value: &str) -> String {
    match parse_docket_date(value) {
        Some(date) => date.format("%m/%d/%Y").to_string(),
        None => value.trim().to_string(),
    }
}

fn placement_by<T: PartialOrd + Copy>(base: &[T], extra: &[T]) -> Option<Placement> {
    if base.is_empty() || extra.is_empty() {
        return None;
    }
    let mut min = base[0];
    let mut max = base[0];
    for value in base {
        if *value < min {
            min = *value;
        }
        if *value > max {
            max = *value;
        }
    }

    let total = extra.len() as f64;
    let before = extra.iter().filter(|v| **v <= min).count() as f64;
    let after = extra.iter().filter(|v| **v >= max).count() as f64;
    if before / total >= PLACEMENT_THRESHOLD {
        Some(Placement::Before)
    } else if after / total >= PLACEMENT_THRESHOLD {
        Some(Placement::After)
    } else {
        None
    }
}

pub fn placement_by_dates(base: &[DocketEntry], extra: &[DocketEntry]) -> Option<Placement> {
    let dates = |entries: &[DocketEntry]| {
        entries
            .iter()
            .filter_map(|e| e.date_filed.as_deref().and_then(parse_docket_date))
            .collect::<Vec<_>>()
    };
    placement_by(&dates(base), &dates(extra))
}

pub fn placement_by_index(base: &[DocketEntry], extra: &[DocketEntry]) -> Option<Placement> {
    let indices = |entries: &[DocketEntry]| {
        entries
            .iter()
            .filter_map(|e| e.ind.trim().parse::<u32>().ok())
            .collect::<Vec<_>>()
    };
    placement_by(&indices(base), &indices(extra))
}

/// Dates first, then index labels, then before.
pub fn decide_placement(base: &[DocketEntry], extra: &[DocketEntry]) -> Placement {
    if let Some(placement) = placement_by_dates(base, extra) {
        return placement;
    }
    if let Some(placement) = placement_by_index(base, extra) {
        debug!(?placement, "supplement placed by index labels");
        return placement;
    }
    warn!(
        base = base.len(),
        extra = extra.len(),
        "supplement placement inconclusive; placing before"
    );
    Placement::Before
}

/// Splices supplemental entries into the base docket. Extra entries already
/// present in the base (same date and non-blank index) are dropped; edge
/// indices are shifted to follow the entries they belong to.
pub fn insert_extra_docketlines(
    base: Vec<DocketEntry>,
    extra: Vec<DocketEntry>,
) -> Vec<DocketEntry> {
    let known = base
        .iter()
        .filter(|e| !e.ind.trim().is_empty())
        .map(|e| (e.date_filed.clone(), e.ind.trim().to_string()))
        .collect::<HashSet<_>>();
    let extra = extra
        .into_iter()
        .filter(|e| {
            e.ind.trim().is_empty() || !known.contains(&(e.date_filed.clone(), e.ind.trim().to_string()))
        })
        .collect::<Vec<_>>();

    if extra.is_empty() {
        return base;
    }
    if base.is_empty() {
        return extra;
    }

    let (first, second) = match decide_placement(&base, &extra) {
        Placement::Before => (extra, base),
        Placement::After => (base, extra),
    };
    let offset = first.len();
    first
        .into_iter()
        .chain(second.into_iter().map(|mut entry| {
            entry.edges = entry.edges.iter().map(|edge| edge.shifted(offset)).collect();
            entry
        }))
        .collect()
}
