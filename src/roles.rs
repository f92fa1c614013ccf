use crate::model::PartyType;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

const BUILTIN_ROLE_MAP: &str = include_str!("../data/role_map.json");

static ROLE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*(\d+)\s*\)").expect("role number regex must compile"));

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleEntry {
    pub title: String,
    #[serde(rename = "type")]
    pub party_type: PartyType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRole {
    pub title: String,
    pub party_type: PartyType,
    pub synthesized: bool,
}

/// Read-only role → (title, type) lookup. Unknown roles are resolved to a
/// synthesized misc entry returned to the caller; the registry never changes.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    entries: BTreeMap<String, RoleEntry>,
}

impl RoleRegistry {
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_ROLE_MAP).context("failed to parse built-in role map")
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let raw: BTreeMap<String, RoleEntry> = serde_json::from_str(text)?;
        let entries = raw
            .into_iter()
            .map(|(key, entry)| (normalize_role_key(&key), entry))
            .collect();
        Ok(Self { entries })
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Self::builtin();
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read role map {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("failed to parse role map {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, role: &str) -> Option<&RoleEntry> {
        self.entries.get(&normalize_role_key(role))
    }

    pub fn resolve(&self, role: &str) -> ResolvedRole {
        match self.get(role) {
            Some(entry) => ResolvedRole {
                title: entry.title.clone(),
                party_type: entry.party_type,
                synthesized: false,
            },
            None => ResolvedRole {
                title: display_role(role),
                party_type: PartyType::Misc,
                synthesized: true,
            },
        }
    }
}

pub fn normalize_role_key(role: &str) -> String {
    let stripped = ROLE_NUMBER_RE.replace_all(role, " ");
    stripped
        .replace(['-', '_'], " ")
        .trim()
        .trim_end_matches(':')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `Defendant (2)` → `Some("2")`.
pub fn role_number(role: &str) -> Option<String> {
    ROLE_NUMBER_RE
        .captures(role)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn display_role(role: &str) -> String {
    let stripped = ROLE_NUMBER_RE.replace_all(role, " ");
    stripped
        .trim()
        .trim_end_matches(':')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
