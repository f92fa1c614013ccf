use crate::model::MemberCaseLink;
use crate::store::{append_ndjson, read_ndjson, write_ndjson};
use anyhow::Result;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Default)]
struct MemberIndex {
    by_lead: BTreeMap<String, BTreeSet<String>>,
    lead_of: BTreeMap<String, String>,
}

impl MemberIndex {
    fn contains(&self, link: &MemberCaseLink) -> bool {
        self.by_lead
            .get(&link.lead)
            .is_some_and(|members| members.contains(&link.member))
    }

    fn insert(&mut self, link: &MemberCaseLink) {
        self.by_lead
            .entry(link.lead.clone())
            .or_default()
            .insert(link.member.clone());
        self.lead_of
            .entry(link.member.clone())
            .or_insert_with(|| link.lead.clone());
    }
}

#[derive(Debug)]
pub struct MemberCaseLog {
    path: PathBuf,
    index: Mutex<MemberIndex>,
}

impl MemberCaseLog {
    pub fn open(path: &Path) -> Result<Self> {
        let links: Vec<MemberCaseLink> = read_ndjson(path)?;
        let mut index = MemberIndex::default();
        for link in &links {
            index.insert(link);
        }
        Ok(Self {
            path: path.to_path_buf(),
            index: Mutex::new(index),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.index.lock().by_lead.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lead_for(&self, member_ucid: &str) -> Option<String> {
        self.index.lock().lead_of.get(member_ucid).cloned()
    }

    /// Appends the links not yet known, in one write. Returns how many were new.
    pub fn record_block(&self, links: &[MemberCaseLink]) -> Result<usize> {
        let mut index = self.index.lock();
        let fresh = links
            .iter()
            .filter(|link| !index.contains(link))
            .cloned()
            .collect::<Vec<_>>();
        if fresh.is_empty() {
            return Ok(0);
        }
        append_ndjson(&self.path, &fresh)?;
        for link in &fresh {
            index.insert(link);
        }
        Ok(fresh.len())
    }
}

/// Rewrites the log without repeated lines, keeping first occurrences.
/// Run only when no worker holds the log.
pub fn dedup_log(path: &Path) -> Result<(usize, usize)> {
    let links: Vec<MemberCaseLink> = read_ndjson(path)?;
    let total = links.len();
    let mut seen = HashSet::new();
    let kept = links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect::<Vec<_>>();
    let removed = total - kept.len();
    if removed > 0 {
        write_ndjson(path, &kept)?;
    }
    info!(path = %path.display(), kept = kept.len(), removed, "member log deduplicated");
    Ok((kept.len(), removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn link(member: &str) -> MemberCaseLink {
        MemberCaseLink {
            member: format!("ilnd;;{member}"),
            lead: "ilnd;;1:17-cv-04001".to_string(),
            lead_case_id: "1:17-cv-04001".to_string(),
            member_id: None,
            court: "ilnd".to_string(),
        }
    }

    #[test]
    fn record_block_appends_only_new_links() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("member_cases.jsonl");

        let log = MemberCaseLog::open(&path)?;
        assert!(log.is_empty());
        assert_eq!(log.record_block(&[link("1:17-cv-04003"), link("1:17-cv-04004")])?, 2);
        assert_eq!(log.record_block(&[link("1:17-cv-04003")])?, 0);
        assert_eq!(log.lead_for("ilnd;;1:17-cv-04004").as_deref(), Some("ilnd;;1:17-cv-04001"));
        assert_eq!(log.len(), 2);

        let reopened = MemberCaseLog::open(&path)?;
        assert_eq!(reopened.len(), 2);
        Ok(())
    }

    #[test]
    fn dedup_keeps_first_occurrences() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("member_cases.jsonl");
        append_ndjson(&path, &[link("1:17-cv-04003"), link("1:17-cv-04004")])?;
        append_ndjson(&path, &[link("1:17-cv-04003")])?;

        assert_eq!(dedup_log(&path)?, (2, 1));
        let links: Vec<MemberCaseLink> = read_ndjson(&path)?;
        assert_eq!(links, vec![link("1:17-cv-04003"), link("1:17-cv-04004")]);
        assert_eq!(dedup_log(&path)?, (2, 0));
        Ok(())
    }
}
