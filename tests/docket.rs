use anyhow::Result;
use docket::docket::{base_url_for, document_id, extract_docket, read_docket_rows};
use docket::text::char_slice;
use scraper::Html;

const DOCKET_PAGE: &str = r#"<html><body>
<table><tr><td>Date Filed: 03/01/2019</td></tr></table>
<table border="1">
<tr><th>Date Filed</th><th>#</th><th>Docket Text</th></tr>
<tr><td>03/01/2019</td><td><a href="/doc1/0401">1</a></td><td>COMPLAINT against Widget Co (Attachments: # <a href="/doc1/0499">1</a> Exhibit A)</td></tr>
<tr><td>03/15/2019</td><td><a href="/doc1/0402">2</a></td><td>MOTION to Dismiss <a href="/doc1/0401">1</a> Complaint by Widget Co</td></tr>
<tr><td>04/02/2019</td><td><a href="https://ecf.ilnd.uscourts.gov/doc1/0403">3</a></td><td>ORDER granting <a href="/doc1/0402">2</a> motion; see <a href="/doc1/0401">1</a>. Signed by Judge Café</td></tr>
<tr><td>04/03/2019</td><td>&nbsp;</td><td>Case reassigned.</td></tr>
</table>
</body></html>"#;

#[test]
fn header_rows_are_skipped() -> Result<()> {
    let doc = Html::parse_document(DOCKET_PAGE);
    let rows = read_docket_rows(&doc).unwrap_or_default();

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].date.as_deref(), Some("03/01/2019"));
    assert_eq!(rows[0].ind, "1");
    assert_eq!(rows[0].ind_href.as_deref(), Some("/doc1/0401"));
    assert_eq!(rows[3].ind, "");
    assert_eq!(rows[3].ind_href, None);
    Ok(())
}

#[test]
fn internal_links_become_edges_with_valid_spans() -> Result<()> {
    let doc = Html::parse_document(DOCKET_PAGE);
    let rows = read_docket_rows(&doc).unwrap_or_default();
    let base = base_url_for("ilnd", None);
    let entries = extract_docket(&rows, base.as_ref());

    assert_eq!(entries.len(), 4);

    for (idx, entry) in entries.iter().enumerate() {
        let text = entry.docket_text.clone().unwrap_or_default();
        for edge in &entry.edges {
            assert_eq!(edge.source(), idx);
            assert!(edge.target() < entries.len());
            assert_ne!(edge.target(), idx);
            let span = edge.span();
            assert!(span.start < span.end && span.end <= text.chars().count());
            assert_eq!(char_slice(&text, span), entries[edge.target()].ind);
        }
        for (label, doc_ref) in &entry.documents {
            if let Some(span) = doc_ref.span {
                assert_eq!(&char_slice(&text, span), label);
            }
        }
    }

    let order = &entries[2];
    let targets = order.edges.iter().map(|e| e.target()).collect::<Vec<_>>();
    assert_eq!(targets, vec![1, 0]);
    assert_eq!(
        order.docket_text.as_deref(),
        Some("ORDER granting 2 motion; see 1. Signed by Judge Café")
    );

    // An attachment link that targets no row stays a document.
    let complaint = &entries[0];
    assert!(complaint.edges.is_empty());
    assert_eq!(
        complaint.documents.get("1").map(|d| d.url.as_str()),
        Some("https://ecf.ilnd.uscourts.gov/doc1/0499")
    );
    assert_eq!(
        complaint.documents.get("0").map(|d| d.url.as_str()),
        Some("https://ecf.ilnd.uscourts.gov/doc1/0401")
    );
    assert_eq!(complaint.documents.get("0").and_then(|d| d.span), None);

    assert_eq!(
        entries[2].documents.get("0").map(|d| d.url.as_str()),
        Some("https://ecf.ilnd.uscourts.gov/doc1/0403")
    );
    assert!(!entries[3].documents.contains_key("0"));
    Ok(())
}

#[test]
fn page_without_proceedings_has_no_docket() {
    let doc = Html::parse_document(
        "<html><body><h3>CIVIL DOCKET FOR CASE #: 1:19-cv-00002</h3>\
         <p>There are no proceedings for case 1:19-cv-00002.</p></body></html>",
    );
    assert!(read_docket_rows(&doc).is_none());
}

#[test]
fn entry_quoting_no_proceedings_keeps_the_docket() {
    let doc = Html::parse_document(
        "<html><body><h3>CIVIL DOCKET FOR CASE #: 1:19-cv-00003</h3>\
         <table><tr><td>Date Filed</td><td>#</td><td>Docket Text</td></tr>\
         <tr><td>05/01/2019</td><td>1</td><td>STATUS REPORT: there are no proceedings pending in state court.</td></tr>\
         <tr><td>05/09/2019</td><td>2</td><td>MINUTE entry.</td></tr></table>\
         </body></html>",
    );
    let rows = read_docket_rows(&doc).unwrap_or_default();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].ind, "1");
}

#[test]
fn document_ids_and_base_urls() {
    assert_eq!(document_id("/doc1/06712345601?caseid=1"), Some("06712345601"));
    assert_eq!(document_id("/cgi-bin/show_doc.pl?x=1"), None);

    let from_download = base_url_for(
        "ilnd",
        Some("https://ecf.ilnd.uscourts.gov/cgi-bin/DktRpt.pl?324567"),
    );
    assert_eq!(
        from_download.map(|u| u.to_string()),
        Some("https://ecf.ilnd.uscourts.gov/cgi-bin/DktRpt.pl?324567".to_string())
    );
    assert_eq!(
        base_url_for("NYSD", None).map(|u| u.to_string()),
        Some("https://ecf.nysd.uscourts.gov/".to_string())
    );
}
