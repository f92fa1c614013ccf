use crate::model::Span;
use html_escape::decode_html_entities;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex must compile"));

static BREAKING_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(?:br|/?p|/?div|/?td|/?th|/?tr|/?li|/?table|/?center)\b[^>]*>")
        .expect("breaking tag regex must compile")
});

static LINE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*br\s*/?\s*>|</\s*(?:p|div|td|th|tr|li|table|center|h[1-6])\s*>")
        .expect("line break regex must compile")
});

static REDACTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\*\*\*(.*?)\*\*\*").expect("redacted marker regex must compile")
});

static INNER_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:a|b|i|u|em|strong|font|span|br|p|sup|sub)\b[^>]*>")
        .expect("inner tag regex must compile")
});

static NUMERAL_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']?([^"'\s>]+)["']?[^>]*>\s*(\d+)\s*</a>"#)
        .expect("numeral link regex must compile")
});

static CITY_STATE_ZIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z]{2}\.?,?\s+\d{5}(?:-\d{4})?\s*$").expect("city/state/zip regex must compile")
});

static PO_BOX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:p\.?\s*o\.?\s*box|post\s+office\s+box|drawer)\b")
        .expect("po box regex must compile")
});

static UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:suite|ste|floor|fl|room|rm|unit|apt|building|bldg|mail\s+stop)\b\.?\s*#?\s*\w+|\b\d+(?:st|nd|rd|th)\s+floor\b",
    )
    .expect("unit regex must compile")
});

static STREET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\d+[a-z]?(?:-\d+)?\s+.*\b(?:street|st|avenue|ave|boulevard|blvd|road|rd|drive|dr|lane|ln|way|place|pl|plaza|court|ct|parkway|pkwy|highway|hwy|square|sq|circle|cir|terrace|center|centre|broadway|turnpike|pike|trail|row)\b\.?",
    )
    .expect("street regex must compile")
});

const MARK_OPEN: char = '\u{E000}';
const MARK_CLOSE: char = '\u{E001}';

/// Removes all markup. Text between `***` redaction markers is collapsed first:
/// tags nested inside the marker are dropped and any stray angle brackets
/// are removed so the marker's words survive.
pub fn strip_tags(text: &str) -> String {
    let collapsed = REDACTED_RE.replace_all(text, |caps: &Captures<'_>| {
        let inner = INNER_TAG_RE.replace_all(&caps[1], " ");
        let inner = inner
            .chars()
            .filter(|c| *c != '<' && *c != '>')
            .collect::<String>();
        format!("***{}***", inner.split_whitespace().collect::<Vec<_>>().join(" "))
    });

    let spaced = BREAKING_TAG_RE.replace_all(&collapsed, " ");
    TAG_RE
        .replace_all(&spaced, "")
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .collect()
}

/// Entity-unescapes, removes serialization escapes, collapses whitespace and
/// trims split artifacts. Empty results come back as `None`.
pub fn clean_text(text: &str) -> Option<String> {
    let decoded = decode_html_entities(text);
    let unescaped = decoded
        .replace("\\n", " ")
        .replace("\\r", " ")
        .replace("\\t", " ")
        .replace("\\\"", "\"")
        .replace("\\'", "'")
        .replace("\\/", "/");

    let collapsed = unescaped.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut trimmed = collapsed.as_str();
    loop {
        let next = trimmed
            .strip_prefix(')')
            .or_else(|| trimmed.strip_suffix('('))
            .map(str::trim);
        match next {
            Some(rest) => trimmed = rest,
            None => break,
        }
    }

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn render(html: &str) -> Option<String> {
    clean_text(&strip_tags(html))
}

pub fn html_lines(html: &str) -> Vec<String> {
    let broken = LINE_BREAK_RE.replace_all(html, "\n");
    let stripped = TAG_RE.replace_all(&broken, "");
    stripped.lines().filter_map(clean_text).collect()
}

pub fn is_address_like(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() || line.contains('@') {
        return false;
    }
    CITY_STATE_ZIP_RE.is_match(line)
        || PO_BOX_RE.is_match(line)
        || UNIT_RE.is_match(line)
        || STREET_RE.is_match(line)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub href: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedLink {
    pub href: String,
    pub label: String,
    pub span: Span,
}

pub fn encode_links(html: &str) -> (String, Vec<LinkRef>) {
    let mut links = Vec::new();
    let encoded = NUMERAL_LINK_RE.replace_all(html, |caps: &Captures<'_>| {
        let idx = links.len();
        links.push(LinkRef {
            href: decode_html_entities(&caps[1]).into_owned(),
            label: caps[2].to_string(),
        });
        format!("{MARK_OPEN}{idx}{MARK_CLOSE}")
    });
    (encoded.into_owned(), links)
}

pub fn decode_links(text: &str, links: &[LinkRef]) -> (String, Vec<PlacedLink>) {
    let mut out = String::with_capacity(text.len());
    let mut placed = Vec::new();
    let mut out_chars = 0usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != MARK_OPEN {
            out.push(c);
            out_chars += 1;
            continue;
        }

        let mut digits = String::new();
        let mut closed = false;
        for next in chars.by_ref() {
            if next == MARK_CLOSE {
                closed = true;
                break;
            }
            digits.push(next);
        }

        let Some(link) = closed
            .then(|| digits.parse::<usize>().ok())
            .flatten()
            .and_then(|idx| links.get(idx))
        else {
            continue;
        };

        let start = out_chars;
        out.push_str(&link.label);
        out_chars += link.label.chars().count();
        placed.push(PlacedLink {
            href: link.href.clone(),
            label: link.label.clone(),
            span: Span {
                start,
                end: out_chars,
            },
        });
    }

    (out, placed)
}

pub fn char_slice(text: &str, span: Span) -> String {
    text.chars()
        .skip(span.start)
        .take(span.end.saturating_sub(span.start))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_trims_split_artifacts() {
        assert_eq!(clean_text(") Acme Corp (").as_deref(), Some("Acme Corp"));
        assert_eq!(clean_text(" ) ( "), None);
    }

    #[test]
    fn decode_skips_unterminated_marker() {
        let text = format!("a {MARK_OPEN}0 b");
        let (out, placed) = decode_links(&text, &[]);
        assert_eq!(out, "a ");
        assert!(placed.is_empty());
    }
}
