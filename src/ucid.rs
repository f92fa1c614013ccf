use crate::model::CaseType;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const UCID_SEP: &str = ";;";

static CASE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*:\s*(\d{2})\s*-\s*([a-z]{2,4})\s*-\s*(\d{1,6})")
        .expect("case number regex must compile")
});

static FILE_STEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})-(\d{2})-([a-z]{2,4})-(\d{1,6})").expect("file stem regex must compile")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseNumber {
    pub office: String,
    pub year: String,
    pub case_type: String,
    pub number: String,
}

impl CaseNumber {
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = CASE_NUMBER_RE.captures(raw)?;
        Some(Self::from_parts(&caps[1], &caps[2], &caps[3], &caps[4]))
    }

    /// `1-16-cv-00001` (and `1-16-cv-00001_2`, `1-16-cv-00001_summary`).
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        let caps = FILE_STEM_RE.captures(stem)?;
        Some(Self::from_parts(&caps[1], &caps[2], &caps[3], &caps[4]))
    }

    fn from_parts(office: &str, year: &str, case_type: &str, number: &str) -> Self {
        let office = office.trim_start_matches('0');
        let number = number.trim_start_matches('0');
        Self {
            office: if office.is_empty() { "0" } else { office }.to_string(),
            year: year.to_string(),
            case_type: case_type.to_lowercase(),
            number: format!("{:0>5}", if number.is_empty() { "0" } else { number }),
        }
    }

    pub fn case_id(&self) -> String {
        format!("{}:{}-{}-{}", self.office, self.year, self.case_type, self.number)
    }

    pub fn file_stem(&self) -> String {
        format!("{}-{}-{}-{}", self.office, self.year, self.case_type, self.number)
    }

    pub fn full_year(&self) -> i32 {
        let yy = self.year.parse::<i32>().unwrap_or(0);
        if yy > 50 { 1900 + yy } else { 2000 + yy }
    }

    pub fn case_type(&self) -> CaseType {
        CaseType::from_type_code(&self.case_type)
    }

    pub fn is_mdl(&self) -> bool {
        self.case_type == "md"
    }

    pub fn number_value(&self) -> Option<u32> {
        self.number.parse().ok()
    }
}

pub fn normalize_case_id(raw: &str) -> Option<String> {
    CaseNumber::parse(raw).map(|c| c.case_id())
}

pub fn find_case_ids(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in CASE_NUMBER_RE.captures_iter(text) {
        let id = CaseNumber::from_parts(&caps[1], &caps[2], &caps[3], &caps[4]).case_id();
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

pub fn ucid(court: &str, case_id: &str) -> String {
    format!("{}{UCID_SEP}{}", court.to_lowercase(), case_id)
}

/// `<out>/<court>/json/<yyyy>/<stem>.json`
pub fn output_path(out_dir: &Path, court: &str, case_number: &CaseNumber) -> PathBuf {
    out_dir
        .join(court.to_lowercase())
        .join("json")
        .join(case_number.full_year().to_string())
        .join(format!("{}.json", case_number.file_stem()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_numbers_normalise() {
        let number = CaseNumber::parse("Case #: 1:16-cv-1-JZL").unwrap_or_else(|| panic!("must parse"));
        assert_eq!(number.case_id(), "1:16-cv-00001");
        assert_eq!(number.case_type(), CaseType::Civil);
        assert_eq!(ucid("ILND", &number.case_id()), "ilnd;;1:16-cv-00001");
        assert_eq!(normalize_case_id("no case here"), None);
        assert_eq!(
            find_case_ids("1:15-mj-321, 1:15-mj-00321 and 2:15-cr-4"),
            vec!["1:15-mj-00321", "2:15-cr-00004"]
        );
    }

    #[test]
    fn output_path_uses_four_digit_year() {
        let number = CaseNumber::from_file_stem("1-99-cv-00042_summary").unwrap_or_else(|| panic!("must parse"));
        assert_eq!(
            output_path(Path::new("out"), "NYSD", &number),
            PathBuf::from("out/nysd/json/1999/1-99-cv-00042.json")
        );
    }
}
