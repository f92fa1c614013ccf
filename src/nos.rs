use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

const BUILTIN_NOS_TABLE: &str = include_str!("../data/nature_of_suit.json");

static LEADING_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{3})\b\s*(.*)$").expect("nature of suit code regex must compile")
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NosEntry {
    pub number: u32,
    pub name: String,
    pub major_type: String,
}

impl NosEntry {
    pub fn display(&self) -> String {
        format!("{} {}", self.number, self.name)
    }

    fn composite_label(&self) -> String {
        format!("{} {}", self.name, self.major_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NatureOfSuit<'a> {
    Matched(&'a NosEntry),
    Raw(String),
}

impl NatureOfSuit<'_> {
    pub fn display(&self) -> String {
        match self {
            NatureOfSuit::Matched(entry) => entry.display(),
            NatureOfSuit::Raw(raw) => raw.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NosTable {
    entries: Vec<NosEntry>,
    label_tokens: Vec<HashSet<String>>,
}

impl NosTable {
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_NOS_TABLE).context("failed to parse built-in nature of suit table")
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let entries: Vec<NosEntry> = serde_json::from_str(text)?;
        Ok(Self::new(entries))
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Self::builtin();
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read nature of suit table {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("failed to parse nature of suit table {}", path.display()))
    }

    pub fn new(entries: Vec<NosEntry>) -> Self {
        let label_tokens = entries
            .iter()
            .map(|entry| tokens(&entry.composite_label()).into_iter().collect())
            .collect();
        Self {
            entries,
            label_tokens,
        }
    }

    pub fn entries(&self) -> &[NosEntry] {
        &self.entries
    }

    pub fn by_number(&self, number: u32) -> Option<&NosEntry> {
        self.entries.iter().find(|entry| entry.number == number)
    }

    /// Numeric code first; otherwise token overlap against every entry.
    pub fn match_text(&self, raw: &str) -> Option<&NosEntry> {
        if let Some(caps) = LEADING_CODE_RE.captures(raw) {
            let number = caps[1].parse::<u32>().ok();
            if let Some(entry) = number.and_then(|n| self.by_number(n)) {
                return Some(entry);
            }
            debug!(raw, "nature of suit code not in taxonomy; trying label match");
            return self.fuzzy_match(&caps[2]);
        }
        self.fuzzy_match(raw)
    }

    pub fn resolve(&self, raw: &str) -> NatureOfSuit<'_> {
        match self.match_text(raw) {
            Some(entry) => NatureOfSuit::Matched(entry),
            None => {
                warn!(raw, "nature of suit did not match taxonomy; keeping raw text");
                NatureOfSuit::Raw(raw.trim().to_string())
            }
        }
    }

    fn fuzzy_match(&self, raw: &str) -> Option<&NosEntry> {
        let raw_tokens = tokens(raw);
        if raw_tokens.is_empty() {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        for (idx, label) in self.label_tokens.iter().enumerate() {
            let hits = raw_tokens.iter().filter(|t| label.contains(*t)).count();
            let score = hits as f64 / raw_tokens.len() as f64;
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((idx, score));
            }
            if score >= 1.0 {
                break;
            }
        }

        let (idx, score) = best?;
        // A 1-of-2 token overlap sits exactly on 0.5 and is not enough on its own.
        if score >= 0.5 && (raw_tokens.len() > 2 || score > 0.5) {
            self.entries.get(idx)
        } else {
            None
        }
    }
}

pub fn tokens(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
