use regex::Regex;
use std::sync::LazyLock;

static DOCKET_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:civil|criminal)?\s*docket\s+for\s+case\s*#")
        .expect("docket title regex must compile")
});

static INVALID_CASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)cannot\s+find\s+case|case\s+number\s+not\s+found|invalid\s+case\s+number|no\s+case\s+found")
        .expect("invalid case regex must compile")
});

static SEALED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)this\s+case\s+is\s+sealed|sealed\s+case|case\s+is\s+under\s+seal")
        .expect("sealed case regex must compile")
});

static LONG_RUNNING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)may\s+take\s+a\s+long\s+time\s+to\s+(?:run|complete)|this\s+report\s+could\s+take\s+a\s+long\s+time")
        .expect("long running regex must compile")
});

static BILLABLE_PAGES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Billable\s+Pages:\s*(?:<[^>]*>|\s|&nbsp;)*(\d+)")
        .expect("billable pages regex must compile")
});

static COST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Cost:\s*(?:<[^>]*>|\s|&nbsp;)*\$?\s*(\d+(?:\.\d+)?)")
        .expect("cost regex must compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    DocketReport,
    InvalidCase,
    SealedCase,
    LongRunningWarning,
    Unknown,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::DocketReport => "docket_report",
            PageKind::InvalidCase => "invalid_case",
            PageKind::SealedCase => "sealed_case",
            PageKind::LongRunningWarning => "long_running_warning",
            PageKind::Unknown => "unknown",
        }
    }

    pub fn is_parseable(&self) -> bool {
        matches!(
            self,
            PageKind::DocketReport | PageKind::SealedCase | PageKind::Unknown
        )
    }
}

/// Decides the page kind in one pass. A docket title wins over any notice
/// text, since docket entries can quote it.
pub fn classify_page(html: &str) -> PageKind {
    if DOCKET_TITLE_RE.is_match(html) {
        PageKind::DocketReport
    } else if SEALED_RE.is_match(html) {
        PageKind::SealedCase
    } else if INVALID_CASE_RE.is_match(html) {
        PageKind::InvalidCase
    } else if LONG_RUNNING_RE.is_match(html) {
        PageKind::LongRunningWarning
    } else {
        PageKind::Unknown
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransactionReceipt {
    pub billable_pages: Option<u32>,
    pub cost: Option<f64>,
}

pub fn read_receipt(html: &str) -> TransactionReceipt {
    let Some(start) = html.rfind("Transaction Receipt") else {
        return TransactionReceipt::default();
    };
    let tail = &html[start..];
    TransactionReceipt {
        billable_pages: BILLABLE_PAGES_RE
            .captures(tail)
            .and_then(|caps| caps[1].parse().ok()),
        cost: COST_RE.captures(tail).and_then(|caps| caps[1].parse().ok()),
    }
}

impl TransactionReceipt {
    pub fn combine(self, other: TransactionReceipt) -> TransactionReceipt {
        TransactionReceipt {
            billable_pages: add_opt(self.billable_pages, other.billable_pages),
            cost: match (self.cost, other.cost) {
                (Some(a), Some(b)) => Some(((a + b) * 100.0).round() / 100.0),
                (a, b) => a.or(b),
            },
        }
    }
}

fn add_opt(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (a, b) => a.or(b),
    }
}
