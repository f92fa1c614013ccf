use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub const BACKWARDS_DOCKET_LABEL: &str = "backwards_docket";
pub const PRIVATE_LABEL: &str = "private";

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DownloadStamp {
    pub user_hash: Option<String>,
    pub download_timestamp: Option<String>,
    pub download_url: Option<String>,
    pub pacer_id: Option<String>,
    pub labels: Vec<String>,
}

impl DownloadStamp {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }

    fn is_empty(&self) -> bool {
        self == &DownloadStamp::default()
    }

    fn set(&mut self, key: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match key.trim().to_ascii_lowercase().as_str() {
            "user_hash" | "user" => self.user_hash = Some(value.to_string()),
            "download_datetime" | "download_timestamp" | "timestamp" => {
                self.download_timestamp = Some(value.to_string())
            }
            "download_url" | "url" => self.download_url = Some(value.to_string()),
            "case_id" | "pacer_id" => self.pacer_id = Some(value.to_string()),
            "labels" | "scrape_labels" | "label" => self.labels.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(ToString::to_string),
            ),
            other => debug!(key = other, "ignoring unknown stamp key"),
        }
    }
}

pub fn read_stamp(html: &str) -> Option<DownloadStamp> {
    let trimmed = html.trim_end();
    let body = trimmed.strip_suffix("-->")?;
    let start = body.rfind("<!--")?;
    parse_stamp_body(&body[start + 4..])
}

pub fn parse_stamp_body(body: &str) -> Option<DownloadStamp> {
    let body = body.trim();
    let stamp = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            let mut stamp = DownloadStamp::default();
            for (key, value) in &map {
                match value {
                    Value::String(s) => stamp.set(key, s),
                    Value::Number(n) => stamp.set(key, &n.to_string()),
                    Value::Array(items) => {
                        for item in items {
                            if let Some(s) = item.as_str() {
                                stamp.set(key, s);
                            }
                        }
                    }
                    _ => {}
                }
            }
            stamp
        }
        _ => {
            let mut stamp = DownloadStamp::default();
            for pair in body.split(';') {
                if let Some((key, value)) = pair.split_once(':') {
                    stamp.set(key, value);
                }
            }
            stamp
        }
    };

    if stamp.is_empty() { None } else { Some(stamp) }
}
