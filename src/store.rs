use crate::model::CaseRecord;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::Path;

pub fn load_record(path: &Path) -> Result<CaseRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read case record {}", path.display()))?;
    let record = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse case record {}", path.display()))?;
    Ok(record)
}

pub fn save_record(path: &Path, record: &CaseRecord) -> Result<()> {
    ensure_parent(path)?;
    let serialized = serde_json::to_string_pretty(record)?;
    std::fs::write(path, serialized)
        .with_context(|| format!("failed to write case record {}", path.display()))?;
    Ok(())
}

pub fn read_ndjson<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("bad json on line {} of {}", idx + 1, path.display()))
        })
        .collect()
}

pub fn append_ndjson<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    ensure_parent(path)?;
    let buf = ndjson_bytes(items)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {} for append", path.display()))?;
    file.write_all(&buf)
        .with_context(|| format!("failed to append to {}", path.display()))?;
    Ok(())
}

/// Replaces the file through a sibling temp file and a rename.
pub fn write_ndjson<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let buf = ndjson_bytes(items)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, buf).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

fn ndjson_bytes<T: Serialize>(items: &[T]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for item in items {
        serde_json::to_writer(&mut buf, item)?;
        buf.push(b'\n');
    }
    Ok(buf)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}
