use crate::text::{html_lines, render};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;

pub fn parse_summary(html: &str) -> BTreeMap<String, Value> {
    let doc = Html::parse_document(html);
    let mut out = BTreeMap::new();

    if let Ok(selector) = Selector::parse("tr") {
        for row in doc.select(&selector) {
            let cells = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|el| matches!(el.value().name(), "td" | "th"))
                .filter_map(|cell| render(&cell.inner_html()))
                .collect::<Vec<_>>();
            let mut iter = cells.iter();
            while let Some(cell) = iter.next() {
                match cell.split_once(':') {
                    Some((label, value)) if !value.trim().is_empty() => {
                        insert(&mut out, label, value.trim());
                    }
                    Some((label, _)) => {
                        if let Some(value) = iter.next() {
                            insert(&mut out, label, value);
                        }
                    }
                    None => {}
                }
            }
        }
    }

    if out.is_empty() {
        for line in html_lines(html) {
            if let Some((label, value)) = line.split_once(':')
                && !value.trim().is_empty()
            {
                insert(&mut out, label, value.trim());
            }
        }
    }

    out
}

fn insert(out: &mut BTreeMap<String, Value>, label: &str, value: &str) {
    let key = summary_key(label);
    if key.is_empty() {
        return;
    }
    let value = Value::String(value.to_string());
    match out.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            out.insert(key, value);
        }
    }
}

fn summary_key(label: &str) -> String {
    label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_label_cells_and_repeats() {
        let html = "<table><tr><td>Office:</td><td>Chicago</td></tr>\
                    <tr><td>Presiding Judge: Jane Doe</td></tr>\
                    <tr><td>Office: Rockford</td></tr></table>";
        let map = parse_summary(html);
        assert_eq!(map["presiding_judge"], Value::String("Jane Doe".into()));
        assert_eq!(
            map["office"],
            Value::Array(vec![Value::String("Chicago".into()), Value::String("Rockford".into())])
        );
    }
}
