use crate::config::ParserConfig;
use crate::pipeline::{ParseOptions, discover_cases, parse_cases};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub config: ParserConfig,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub cases: usize,
    pub first_run_parsed: usize,
    pub first_run_failed: usize,
    pub second_run_parsed: usize,
    pub identical_outputs: usize,
    pub changed_outputs: Vec<String>,
    pub third_run_parsed: usize,
    pub third_run_skipped: usize,
    pub json_files: usize,
}

impl HarnessReport {
    pub fn is_stable(&self) -> bool {
        self.changed_outputs.is_empty()
            && self.third_run_parsed == 0
            && self.third_run_skipped + self.first_run_failed == self.cases
    }
}

/// Parses the input twice with force and compares every output byte for
/// byte, then once more without force to check that everything is skipped.
pub fn run_harness(options: &HarnessOptions) -> Result<HarnessReport> {
    if options.output_dir.exists() {
        std::fs::remove_dir_all(&options.output_dir).with_context(|| {
            format!("failed to clear output dir {}", options.output_dir.display())
        })?;
    }

    let cases = discover_cases(&options.input_dir, None)?.len();
    let run = |force: bool| {
        parse_cases(&ParseOptions {
            input_dir: options.input_dir.clone(),
            output_dir: options.output_dir.clone(),
            config: options.config.clone(),
            force,
            workers: options.workers,
            court: None,
        })
    };

    let first = run(true)?;
    let first_outputs = snapshot_outputs(&options.output_dir)?;
    let second = run(true)?;
    let second_outputs = snapshot_outputs(&options.output_dir)?;

    let mut identical_outputs = 0usize;
    let mut changed_outputs = Vec::new();
    for (path, bytes) in &first_outputs {
        if second_outputs.get(path) == Some(bytes) {
            identical_outputs += 1;
        } else {
            changed_outputs.push(path.clone());
        }
    }
    for path in second_outputs.keys() {
        if !first_outputs.contains_key(path) {
            changed_outputs.push(path.clone());
        }
    }

    let third = run(false)?;

    Ok(HarnessReport {
        cases,
        first_run_parsed: first.parsed(),
        first_run_failed: first.failed(),
        second_run_parsed: second.parsed(),
        identical_outputs,
        changed_outputs,
        third_run_parsed: third.parsed(),
        third_run_skipped: third.skipped(),
        json_files: first_outputs.len(),
    })
}

fn snapshot_outputs(dir: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut out = BTreeMap::new();
    if !dir.exists() {
        return Ok(out);
    }
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("json")
        {
            let bytes = std::fs::read(entry.path())
                .with_context(|| format!("failed to read output {}", entry.path().display()))?;
            let key = entry
                .path()
                .strip_prefix(dir)
                .unwrap_or(entry.path())
                .display()
                .to_string();
            out.insert(key, bytes);
        }
    }
    Ok(out)
}
