use crate::model::{DocketEntry, DocumentRef, Edge};
use crate::text::{clean_text, decode_links, encode_links, render, strip_tags};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static NO_PROCEEDINGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)there\s+are\s+no\s+proceedings|no\s+proceedings\s+(?:were\s+)?(?:found|entered|for\s+this\s+case)")
        .expect("no proceedings regex must compile")
});

static DOC_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/doc1/(\d+)").expect("document id regex must compile"));

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,2}/\d{1,2}/\d{4}\b").expect("docket date regex must compile")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocketRow {
    pub date: Option<String>,
    pub ind: String,
    pub ind_href: Option<String>,
    pub text_html: String,
}

pub fn has_no_proceedings(html: &str) -> bool {
    NO_PROCEEDINGS_RE.is_match(html)
}

/// The last table in the page whose first cell reads "Date Filed".
pub fn find_docket_table(doc: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("table").ok()?;
    let tables = doc.select(&selector).collect::<Vec<_>>();
    tables.into_iter().rev().find(|table| {
        table_rows(*table)
            .first()
            .and_then(|row| row_cells(*row).into_iter().next())
            .and_then(|cell| render(&cell.inner_html()))
            .is_some_and(|text| text.eq_ignore_ascii_case("date filed"))
    })
}

/// Rows of the docket table, or `None` when the page has no docket table.
/// The no-proceedings notice only counts outside the table.
pub fn read_docket_rows(doc: &Html) -> Option<Vec<RawDocketRow>> {
    let table = find_docket_table(doc)?;
    let outside = doc.root_element().html().replacen(&table.html(), "", 1);
    if has_no_proceedings(&outside) {
        debug!("page reports no proceedings");
        return None;
    }
    Some(docket_rows(table))
}

pub fn docket_rows(table: ElementRef<'_>) -> Vec<RawDocketRow> {
    table_rows(table)
        .into_iter()
        .filter_map(raw_row)
        .collect()
}

fn raw_row(row: ElementRef<'_>) -> Option<RawDocketRow> {
    let cells = row_cells(row);
    if cells.len() < 3 || cells.iter().any(|cell| cell.value().name() == "th") {
        return None;
    }

    let date_text = render(&cells[0].inner_html());
    if date_text
        .as_deref()
        .is_some_and(|text| text.eq_ignore_ascii_case("date filed"))
    {
        return None;
    }
    let date = date_text.map(|text| match DATE_RE.find(&text) {
        Some(found) => found.as_str().to_string(),
        None => text,
    });

    let ind = render(&cells[1].inner_html()).unwrap_or_default();
    let ind_href = first_href(cells[1]);
    let text_html = cells[cells.len() - 1].inner_html();

    if date.is_none() && ind.is_empty() && render(&text_html).is_none() {
        return None;
    }

    Some(RawDocketRow {
        date,
        ind,
        ind_href,
        text_html,
    })
}

fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| el.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .collect()
}

fn first_href(cell: ElementRef<'_>) -> Option<String> {
    let selector = Selector::parse("a[href]").ok()?;
    cell.select(&selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(ToString::to_string)
}

pub fn document_id(href: &str) -> Option<&str> {
    DOC_ID_RE
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Base for relative document links: the download URL when known, else the
/// court's CM/ECF host.
pub fn base_url_for(court: &str, download_url: Option<&str>) -> Option<Url> {
    download_url
        .and_then(|u| Url::parse(u).ok())
        .or_else(|| Url::parse(&format!("https://ecf.{}.uscourts.gov/", court.to_lowercase())).ok())
}

fn absolutize_url(base_url: Option<&Url>, value: &str) -> String {
    if value.starts_with("http://") || value.starts_with("https://") {
        return value.to_string();
    }

    if let Some(base) = base_url
        && let Ok(joined) = base.join(value)
    {
        return joined.to_string();
    }

    value.to_string()
}

/// A numeral link whose document id belongs to another row's index link
/// becomes an edge to that row; every other one is kept as a document.
pub fn extract_docket(rows: &[RawDocketRow], base_url: Option<&Url>) -> Vec<DocketEntry> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        if let Some(doc_id) = row.ind_href.as_deref().and_then(document_id) {
            positions.entry(doc_id).or_insert(idx);
        }
    }

    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            let mut entry = DocketEntry {
                date_filed: row.date.clone(),
                ind: row.ind.clone(),
                ..DocketEntry::default()
            };

            if let Some(href) = &row.ind_href {
                entry.documents.insert(
                    "0".to_string(),
                    DocumentRef {
                        url: absolutize_url(base_url, href),
                        span: None,
                    },
                );
            }

            let (encoded, links) = encode_links(&row.text_html);
            let Some(cleaned) = clean_text(&strip_tags(&encoded)) else {
                return entry;
            };
            let (docket_text, placed) = decode_links(&cleaned, &links);

            for link in placed {
                let target = document_id(&link.href).and_then(|id| positions.get(id).copied());
                match target {
                    Some(target) if target != idx => {
                        entry.edges.push(Edge(idx, target, link.span));
                    }
                    _ if link.label == "0" => {
                        debug!(row = idx, "ignoring text link labelled 0");
                    }
                    _ => {
                        entry
                            .documents
                            .entry(link.label.clone())
                            .or_insert(DocumentRef {
                                url: absolutize_url(base_url, &link.href),
                                span: Some(link.span),
                            });
                    }
                }
            }

            entry.docket_text = (!docket_text.is_empty()).then_some(docket_text);
            entry
        })
        .collect()
}
