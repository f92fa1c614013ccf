use anyhow::Result;
use docket::config::ParserConfig;
use docket::model::{CaseStatus, CaseType, Edge, ParsedOutput, PartyType, RecordSource, Span};
use docket::pipeline::{ParseOptions, discover_cases, parse_cases};
use docket::store::{load_record, read_ndjson};
use docket::text::char_slice;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

#[test]
fn civil_case_is_parsed_end_to_end() -> Result<()> {
    let env = setup_fixture_env()?;
    let report = parse_cases(&env.options(false))?;

    assert_eq!(report.civil.parsed, 1);
    assert_eq!(report.criminal.parsed, 1);
    assert_eq!(report.failed(), 0);

    let record = load_record(&env.out_dir.join("ilnd/json/2016/1-16-cv-00001.json"))?;
    assert_eq!(record.ucid, "ilnd;;1:16-cv-00001");
    assert_eq!(record.case_type, CaseType::Civil);
    assert_eq!(record.case_name.as_deref(), Some("Doe v. Acme Corporation"));
    assert_eq!(record.filing_date.as_deref(), Some("01/04/2016"));
    assert_eq!(record.terminating_date.as_deref(), Some("06/30/2016"));
    assert_eq!(record.case_status, CaseStatus::Closed);
    assert_eq!(record.judge.as_deref(), Some("Sara L. Ellis"));
    assert_eq!(record.referred_judges, vec!["Jeffrey Cole"]);
    assert_eq!(record.nature_suit.as_deref(), Some("442 Employment"));
    assert_eq!(record.jury_demand.as_deref(), Some("Plaintiff"));
    assert_eq!(record.jurisdiction.as_deref(), Some("Federal Question"));
    assert_eq!(
        record.cause.as_deref(),
        Some("42:2000e Job Discrimination (Employment)")
    );
    assert_eq!(record.case_flags, vec!["CLOSED", "JURY"]);
    assert!(!record.is_multi);
    assert!(!record.is_mdl);

    assert_eq!(record.parties.len(), 2);
    let plaintiff = &record.parties[0];
    assert_eq!(plaintiff.name, "John Doe");
    assert_eq!(plaintiff.party_type, PartyType::Plaintiff);
    assert!(plaintiff.criminal.is_none());
    let lawyer = &plaintiff.counsel[0];
    assert_eq!(lawyer.name, "Jane Roe");
    assert!(lawyer.is_lead_attorney && lawyer.is_notice_attorney);
    assert_eq!(lawyer.entity_info.office_name.as_deref(), Some("Roe & Associates LLC"));
    assert_eq!(
        lawyer.entity_info.address.as_deref(),
        Some("123 Main Street\nSuite 400\nChicago, IL 60601")
    );
    assert_eq!(lawyer.entity_info.phone.as_deref(), Some("(312) 555-1212"));
    assert_eq!(lawyer.entity_info.fax.as_deref(), Some("(312) 555-1213"));
    assert_eq!(lawyer.entity_info.email.as_deref(), Some("jroe@roelaw.com"));

    let defendant = &record.parties[1];
    assert_eq!(defendant.name, "Acme Corporation");
    assert_eq!(defendant.party_type, PartyType::Defendant);
    assert_eq!(defendant.counsel[0].entity_info.phone.as_deref(), Some("312-555-9876"));
    assert!(!defendant.counsel[0].is_notice_attorney);

    assert!(record.docket_available);
    assert_eq!(record.docket.len(), 3);
    let complaint = &record.docket[0];
    assert_eq!(complaint.ind, "1");
    assert_eq!(
        complaint.documents.get("0").map(|d| d.url.as_str()),
        Some("https://ecf.ilnd.uscourts.gov/doc1/06712345601")
    );
    assert_eq!(
        complaint.documents.get("1").map(|d| d.url.as_str()),
        Some("https://ecf.ilnd.uscourts.gov/doc1/06712345699")
    );
    let answer = &record.docket[1];
    assert_eq!(answer.edges, vec![Edge(1, 0, Span { start: 20, end: 21 })]);
    let answer_text = answer.docket_text.clone().unwrap_or_default();
    assert_eq!(char_slice(&answer_text, Span { start: 20, end: 21 }), "1");
    assert!(!record.docket[2].documents.contains_key("0"));

    assert_eq!(record.source, RecordSource::Pacer);
    assert_eq!(record.pacer_id.as_deref(), Some("324567"));
    assert_eq!(record.download_timestamp.as_deref(), Some("2016-07-01T10:00:00"));
    assert_eq!(record.n_docket_reports, 1);
    assert_eq!(record.billable_pages, Some(2));
    assert_eq!(record.cost, Some(0.2));
    assert!(!record.is_stub);
    assert!(!record.is_private);

    Ok(())
}

#[test]
fn criminal_defendants_carry_counts_and_assignments() -> Result<()> {
    let env = setup_fixture_env()?;
    parse_cases(&env.options(false))?;

    let record = load_record(&env.out_dir.join("ilnd/json/2016/1-16-cr-00005.json"))?;
    assert_eq!(record.case_type, CaseType::Criminal);
    assert_eq!(record.case_name.as_deref(), Some("USA v. Smith et al"));
    assert_eq!(record.magistrate_case_ids, vec!["1:15-mj-00321"]);
    assert_eq!(record.case_status, CaseStatus::Closed);
    assert_eq!(record.judge.as_deref(), Some("John Z. Lee"));
    assert_eq!(record.case_flags, vec!["CLOSED"]);
    assert_eq!(record.pacer_id.as_deref(), Some("325001"));
    assert_eq!(record.cost, None);
    assert_eq!(record.docket.len(), 2);

    let names = record.parties.iter().map(|p| p.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Alan Smith", "Betty Jones", "USA"]);

    let smith = &record.parties[0];
    assert_eq!(smith.entity_info.terminating_date.as_deref(), Some("11/01/2016"));
    assert_eq!(
        smith.counsel[0].designation.as_deref(),
        Some("Public Defender or Community Defender Appointment")
    );
    assert_eq!(smith.counsel[0].entity_info.office_name.as_deref(), Some("Federal Defender Program"));
    let detail = smith
        .criminal
        .clone()
        .unwrap_or_else(|| panic!("defendant must carry criminal detail"));
    assert_eq!(detail.pacer_id.as_deref(), Some("1"));
    assert!(detail.pending_counts.is_empty());
    assert_eq!(detail.terminated_counts.len(), 2);
    assert_eq!(detail.terminated_counts[0].pacer_id.as_deref(), Some("1"));
    assert_eq!(detail.terminated_counts[0].text, "18:1343 WIRE FRAUD");
    assert_eq!(
        detail.terminated_counts[0].disposition.as_deref(),
        Some("Imprisonment: 24 months; supervised release 3 years")
    );
    assert_eq!(detail.terminated_counts[1].pacer_id.as_deref(), Some("2-3"));
    assert_eq!(detail.highest_offense_level_opening.as_deref(), Some("Felony"));
    assert_eq!(detail.highest_offense_level_terminated.as_deref(), Some("Felony"));
    assert_eq!(detail.complaints_text, None);
    assert_eq!(detail.judge.as_deref(), Some("John Z. Lee"));
    assert_eq!(detail.referred_judges, vec!["Maria Valdez"]);
    assert_eq!(detail.appeals_case_ids, vec!["16-3512"]);

    let jones = record.parties[1]
        .criminal
        .clone()
        .unwrap_or_else(|| panic!("defendant must carry criminal detail"));
    assert_eq!(jones.pacer_id.as_deref(), Some("2"));
    assert_eq!(jones.referred_judges, vec!["Sheila Finnegan"]);
    assert!(jones.appeals_case_ids.is_empty());
    assert_eq!(jones.pending_counts.len(), 1);
    assert_eq!(jones.pending_counts[0].pacer_id.as_deref(), Some("1s"));
    assert_eq!(jones.pending_counts[0].disposition, None);
    assert_eq!(
        record.parties[1].counsel[0].entity_info.address.as_deref(),
        Some("PO Box 1200\nEvanston, IL 60204")
    );

    let usa = &record.parties[2];
    assert_eq!(usa.party_type, PartyType::Plaintiff);
    assert!(usa.criminal.is_none());

    Ok(())
}

#[test]
fn existing_outputs_are_skipped_unless_forced() -> Result<()> {
    let env = setup_fixture_env()?;
    let first = parse_cases(&env.options(false))?;
    assert_eq!(first.parsed(), 2);

    fs::remove_file(env.out_dir.join("ilnd/json/2016/1-16-cv-00001.json"))?;
    let second = parse_cases(&env.options(false))?;
    assert_eq!(second.parsed(), 1);
    assert_eq!(second.skipped(), 1);
    assert_eq!(second.civil.parsed, 1);
    assert_eq!(second.criminal.skipped, 1);

    let forced = parse_cases(&env.options(true))?;
    assert_eq!(forced.parsed(), 2);
    assert_eq!(forced.skipped(), 0);

    let logged: Vec<ParsedOutput> = read_ndjson(&env.out_dir.join("parsed_paths.jsonl"))?;
    let ucids = logged.iter().map(|o| o.ucid.as_str()).collect::<Vec<_>>();
    assert_eq!(ucids, vec!["ilnd;;1:16-cr-00005", "ilnd;;1:16-cv-00001"]);

    Ok(())
}

#[test]
fn second_unforced_run_skips_the_case() -> Result<()> {
    let env = setup_fixture_env()?;
    fs::remove_file(env.input_dir.join("ilnd/html/1-16-cr-00005.html"))?;

    let first = parse_cases(&env.options(false))?;
    let second = parse_cases(&env.options(false))?;

    assert_eq!((first.parsed(), first.skipped()), (1, 0));
    assert_eq!((second.parsed(), second.skipped()), (0, 1));
    assert_eq!(second.civil.skipped, 1);
    Ok(())
}

#[test]
fn member_cases_are_linked_to_their_lead() -> Result<()> {
    let env = setup_fixture_env()?;
    let html_dir = env.input_dir.join("ilnd/html");
    fs::write(html_dir.join("1-17-cv-04001.html"), lead_page())?;
    fs::write(html_dir.join("1-17-cv-04003.html"), member_page())?;

    let first = parse_cases(&env.options(false))?;
    assert_eq!(first.failed(), 0);
    assert_eq!(first.member_links_added, 2);

    let lead = load_record(&env.out_dir.join("ilnd/json/2017/1-17-cv-04001.json"))?;
    assert_eq!(lead.member_case_key.as_deref(), Some("ilnd;;1:17-cv-04001"));
    assert!(lead.is_multi);

    let member = load_record(&env.out_dir.join("ilnd/json/2017/1-17-cv-04003.json"))?;
    assert_eq!(member.member_case_key.as_deref(), Some("ilnd;;1:17-cv-04001"));
    assert_eq!(member.lead_case_id.as_deref(), Some("1:17-cv-04001"));
    assert_eq!(member.lead_case_pacer_id.as_deref(), Some("340001"));
    assert!(member.is_multi);

    let second = parse_cases(&env.options(true))?;
    assert_eq!(second.member_links_added, 0);

    let links: Vec<docket::model::MemberCaseLink> =
        read_ndjson(&env.out_dir.join("member_cases.jsonl"))?;
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].member, "ilnd;;1:17-cv-04003");
    assert_eq!(links[0].member_id.as_deref(), Some("340003"));
    assert_eq!(links[1].lead, "ilnd;;1:17-cv-04001");

    Ok(())
}

#[test]
fn supplement_only_case_is_a_stub_from_recap() -> Result<()> {
    let env = setup_fixture_env()?;
    let json_dir = env.input_dir.join("ilnd/json");
    fs::create_dir_all(&json_dir)?;
    fs::write(
        json_dir.join("1-18-cv-00077.json"),
        r#"{"docket_entries": [
            {"date_filed": "2018-01-09", "entry_number": 1, "description": "COMPLAINT"},
            {"date_filed": "2018-02-01", "entry_number": 2, "description": "ANSWER"}
        ]}"#,
    )?;

    parse_cases(&env.options(false))?;
    let record = load_record(&env.out_dir.join("ilnd/json/2018/1-18-cv-00077.json"))?;

    assert_eq!(record.source, RecordSource::Recap);
    assert!(!record.docket_available);
    assert!(record.is_stub);
    assert_eq!(record.n_docket_reports, 0);
    assert_eq!(record.docket.len(), 2);
    assert_eq!(record.docket[0].date_filed.as_deref(), Some("01/09/2018"));
    assert_eq!(record.case_status, CaseStatus::Open);

    Ok(())
}

#[test]
fn snapshot_files_are_grouped_by_case() -> Result<()> {
    let env = setup_fixture_env()?;
    let html_dir = env.input_dir.join("ilnd/html");
    fs::write(html_dir.join("1-16-cv-00001_2.html"), "<html></html>")?;
    fs::write(html_dir.join("1-16-cv-00001_1.html"), "<html></html>")?;
    fs::write(html_dir.join("1-16-cv-00001_summary.html"), "<html></html>")?;
    fs::write(html_dir.join("1-19-cv-00500_summary.html"), "<html></html>")?;
    fs::write(html_dir.join("notes.html"), "<html></html>")?;

    let cases = discover_cases(&env.input_dir, None)?;
    assert_eq!(cases.len(), 2);

    let civil = cases
        .iter()
        .find(|c| c.case_number.case_id() == "1:16-cv-00001")
        .unwrap_or_else(|| panic!("civil case must be discovered"));
    let names = civil
        .html
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec!["1-16-cv-00001.html", "1-16-cv-00001_1.html", "1-16-cv-00001_2.html"]
    );
    assert!(civil.summary.is_some());
    assert_eq!(civil.court, "ilnd");

    assert!(discover_cases(&env.input_dir, Some("nysd"))?.is_empty());
    Ok(())
}

fn lead_page() -> &'static str {
    r#"<html><body>
<table><tr><td align="right">LEAD</td></tr></table>
<h3>CIVIL DOCKET FOR CASE #: 1:17-cv-04001</h3>
<table><tr>
<td><br>In re: Widget Products Liability Litigation<br>Lead case: <a href="/cgi-bin/DktRpt.pl?340001">1:17-cv-04001</a><br>Member case: <a href="/cgi-bin/DktRpt.pl?340003">1:17-cv-04003</a>, <a href="/cgi-bin/DktRpt.pl?340004">1:17-cv-04004</a></td>
<td><br>Date Filed: 06/01/2017</td>
</tr></table>
<table><tr><td><b><u>Plaintiff</u></b></td></tr><tr><td><b>Widget Owners</b></td></tr></table>
</body></html>"#
}

fn member_page() -> &'static str {
    r#"<html><body>
<h3>CIVIL DOCKET FOR CASE #: 1:17-cv-04003</h3>
<table><tr>
<td><br>Smith v. Widget Co<br>Lead case: <a href="/cgi-bin/DktRpt.pl?340001">1:17-cv-04001</a></td>
<td><br>Date Filed: 06/05/2017</td>
</tr></table>
<table><tr><td><b><u>Plaintiff</u></b></td></tr><tr><td><b>Pat Smith</b></td></tr></table>
</body></html>"#
}

struct FixtureEnv {
    input_dir: PathBuf,
    out_dir: PathBuf,
}

impl FixtureEnv {
    fn options(&self, force: bool) -> ParseOptions {
        let mut config = ParserConfig::default();
        config.run.path_log = Some(PathBuf::from("parsed_paths.jsonl"));
        ParseOptions {
            input_dir: self.input_dir.clone(),
            output_dir: self.out_dir.clone(),
            config,
            force,
            workers: Some(2),
            court: None,
        }
    }
}

fn setup_fixture_env() -> Result<FixtureEnv> {
    let temp = tempdir()?;
    let root = temp.keep();

    let fixture_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let input_dir = root.join("input");
    copy_dir(&fixture_root.join("civil"), &input_dir)?;
    copy_dir(&fixture_root.join("criminal"), &input_dir)?;

    Ok(FixtureEnv {
        input_dir,
        out_dir: root.join("out"),
    })
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&src_path, &dst_path)?;
        } else {
            if let Some(parent) = dst_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(src_path, dst_path)?;
        }
    }

    Ok(())
}
