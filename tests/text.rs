use docket::model::Span;
use docket::text::{
    char_slice, clean_text, decode_links, encode_links, html_lines, is_address_like, render,
    strip_tags,
};

#[test]
fn strip_tags_leaves_no_angle_brackets() {
    let samples = [
        "<b>MOTION</b> to dismiss <a href=\"/doc1/1\">4</a>",
        "<td>broken <i>markup</td><",
        "***<b>SEALED</b> <i>DOCUMENT</i>*** filed",
        "a > b and c < d",
        "<<script>>x<</script>>",
    ];
    for sample in samples {
        let stripped = strip_tags(sample);
        assert!(
            !stripped.contains('<') && !stripped.contains('>'),
            "{sample:?} -> {stripped:?}"
        );
    }
}

#[test]
fn strip_tags_keeps_redacted_marker_words() {
    let stripped = strip_tags("Order ***<b>SEALED</b> <br>DOCUMENT*** entered");
    assert_eq!(clean_text(&stripped).as_deref(), Some("Order ***SEALED DOCUMENT*** entered"));
}

#[test]
fn clean_text_is_none_only_for_blank_results() {
    assert_eq!(clean_text("   \n\t "), None);
    assert_eq!(clean_text("&nbsp;"), None);
    assert_eq!(clean_text("\\n\\t"), None);
    assert_eq!(
        clean_text("  Roe &amp; Associates\\n LLC ").as_deref(),
        Some("Roe & Associates LLC")
    );
    assert_eq!(clean_text(") ("), None);
}

#[test]
fn render_splits_cells_with_spaces() {
    assert_eq!(
        render("<td>18:1343 WIRE FRAUD<br>(1)</td>").as_deref(),
        Some("18:1343 WIRE FRAUD (1)")
    );
}

#[test]
fn html_lines_breaks_on_br_and_cells() {
    let lines = html_lines("<td><b>Jane Roe</b><br>123 Main Street<br><i>LEAD ATTORNEY</i></td><td>x</td>");
    assert_eq!(lines, vec!["Jane Roe", "123 Main Street", "LEAD ATTORNEY", "x"]);
}

#[test]
fn address_heuristics_are_conservative() {
    assert!(is_address_like("123 Main Street"));
    assert!(is_address_like("500 West Madison Avenue"));
    assert!(is_address_like("Suite 400"));
    assert!(is_address_like("Chicago, IL 60601"));
    assert!(is_address_like("Washington, DC 20530-0001"));
    assert!(is_address_like("P.O. Box 1200"));
    assert!(is_address_like("12th Floor"));

    assert!(!is_address_like("Roe & Associates LLC"));
    assert!(!is_address_like("Federal Defender Program"));
    assert!(!is_address_like("Sears Tower"));
    assert!(!is_address_like("jroe@roelaw.com"));
    assert!(!is_address_like("Suiteless Partners"));
    assert!(!is_address_like(""));
}

#[test]
fn link_markers_round_trip_with_char_spans() {
    let html = "Order re <a href=\"/doc1/9\">12</a> and <a href='/doc1/10'>13</a> – done";
    let (encoded, links) = encode_links(html);
    assert_eq!(links.len(), 2);

    let cleaned = clean_text(&strip_tags(&encoded)).unwrap_or_default();
    let (text, placed) = decode_links(&cleaned, &links);
    assert_eq!(text, "Order re 12 and 13 – done");
    assert_eq!(placed.len(), 2);
    assert_eq!(placed[0].span, Span { start: 9, end: 11 });
    for link in &placed {
        assert_eq!(char_slice(&text, link.span), link.label);
    }
    assert_eq!(placed[1].href, "/doc1/10");
}

#[test]
fn spans_count_characters_not_bytes() {
    let html = "Société Générale – <a href=\"/doc1/5\">7</a>";
    let (encoded, links) = encode_links(html);
    let cleaned = clean_text(&strip_tags(&encoded)).unwrap_or_default();
    let (text, placed) = decode_links(&cleaned, &links);
    assert_eq!(placed[0].span, Span { start: 19, end: 20 });
    assert_eq!(char_slice(&text, placed[0].span), "7");
}
