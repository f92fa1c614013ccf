use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CaseType {
    Civil,
    Criminal,
}

impl CaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseType::Civil => "civil",
            CaseType::Criminal => "criminal",
        }
    }

    pub fn from_type_code(code: &str) -> Self {
        if code.eq_ignore_ascii_case("cr") {
            CaseType::Criminal
        } else {
            CaseType::Civil
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    Closed,
}

impl CaseStatus {
    pub fn from_terminating_date(terminating_date: Option<&str>) -> Self {
        if terminating_date.is_some_and(|d| !d.trim().is_empty()) {
            CaseStatus::Closed
        } else {
            CaseStatus::Open
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PartyType {
    Plaintiff,
    Defendant,
    BkParty,
    OtherParty,
    Misc,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecordSource {
    #[serde(rename = "pacer")]
    Pacer,
    #[serde(rename = "recap")]
    Recap,
    #[serde(rename = "pacer,recap")]
    PacerRecap,
}

/// Character offsets (Unicode scalar values) into `docket_text`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

/// `[source_index, target_index, span]`, indices are positions in the case's docket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge(pub usize, pub usize, pub Span);

impl Edge {
    pub fn source(&self) -> usize {
        self.0
    }

    pub fn target(&self) -> usize {
        self.1
    }

    pub fn span(&self) -> Span {
        self.2
    }

    pub fn shifted(&self, offset: usize) -> Self {
        Edge(self.0 + offset, self.1 + offset, self.2)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DocketEntry {
    pub date_filed: Option<String>,
    pub ind: String,
    pub docket_text: Option<String>,
    pub documents: BTreeMap<String, DocumentRef>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EntityInfo {
    pub office_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub terminating_date: Option<String>,
    pub raw_info: Option<String>,
}

impl EntityInfo {
    pub fn is_empty(&self) -> bool {
        self == &EntityInfo::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Counsel {
    pub name: String,
    pub entity_info: EntityInfo,
    pub is_pro_se: bool,
    pub is_lead_attorney: bool,
    pub is_notice_attorney: bool,
    pub is_pro_hac_vice: bool,
    pub has_see_above: bool,
    pub designation: Option<String>,
    pub bar_status: Option<String>,
    pub trial_bar_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountRecord {
    pub pacer_id: Option<String>,
    pub text: String,
    pub disposition: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DefendantDetail {
    pub pacer_id: Option<String>,
    pub pending_counts: Vec<CountRecord>,
    pub terminated_counts: Vec<CountRecord>,
    pub complaints_text: Option<String>,
    pub complaints_disposition: Option<String>,
    pub highest_offense_level_opening: Option<String>,
    pub highest_offense_level_terminated: Option<String>,
    pub judge: Option<String>,
    pub referred_judges: Vec<String>,
    pub appeals_case_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Party {
    pub name: String,
    pub entity_info: EntityInfo,
    pub role: String,
    pub party_type: PartyType,
    pub counsel: Vec<Counsel>,
    #[serde(flatten)]
    pub criminal: Option<DefendantDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MemberCaseLink {
    pub member: String,
    pub lead: String,
    pub lead_case_id: String,
    pub member_id: Option<String>,
    pub court: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    pub ucid: String,
    pub case_id: String,
    pub court: String,
    pub case_type: CaseType,
    pub case_name: Option<String>,
    pub filing_date: Option<String>,
    pub terminating_date: Option<String>,
    pub case_status: CaseStatus,
    pub judge: Option<String>,
    pub referred_judges: Vec<String>,
    pub nature_suit: Option<String>,
    pub cause: Option<String>,
    pub jurisdiction: Option<String>,
    pub jury_demand: Option<String>,
    pub monetary_demand: Option<String>,
    pub case_flags: Vec<String>,
    pub lead_case_id: Option<String>,
    pub lead_case_pacer_id: Option<String>,
    pub member_case_key: Option<String>,
    pub related_cases: Vec<String>,
    pub other_courts: Vec<String>,
    pub magistrate_case_ids: Vec<String>,
    pub appeals_case_ids: Vec<String>,
    pub is_multi: bool,
    pub is_mdl: bool,
    pub mdl_code: Option<u32>,
    pub parties: Vec<Party>,
    pub docket: Vec<DocketEntry>,
    pub docket_available: bool,
    pub summary: Option<BTreeMap<String, serde_json::Value>>,
    pub source: RecordSource,
    pub pacer_id: Option<String>,
    pub download_url: Option<String>,
    pub download_timestamp: Option<String>,
    pub n_docket_reports: usize,
    pub billable_pages: Option<u32>,
    pub cost: Option<f64>,
    pub is_stub: bool,
    pub is_private: bool,
}

impl CaseRecord {
    /// The only way `case_status` changes: it follows `terminating_date`.
    pub fn set_terminating_date(&mut self, terminating_date: Option<String>) {
        self.case_status = CaseStatus::from_terminating_date(terminating_date.as_deref());
        self.terminating_date = terminating_date;
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct Tally {
    pub parsed: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedOutput {
    pub ucid: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub civil: Tally,
    pub criminal: Tally,
    pub outputs: Vec<ParsedOutput>,
    pub member_links_added: usize,
}

impl RunReport {
    pub fn tally_mut(&mut self, case_type: CaseType) -> &mut Tally {
        match case_type {
            CaseType::Civil => &mut self.civil,
            CaseType::Criminal => &mut self.criminal,
        }
    }

    pub fn parsed(&self) -> usize {
        self.civil.parsed + self.criminal.parsed
    }

    pub fn skipped(&self) -> usize {
        self.civil.skipped + self.criminal.skipped
    }

    pub fn failed(&self) -> usize {
        self.civil.failed + self.criminal.failed
    }
}
