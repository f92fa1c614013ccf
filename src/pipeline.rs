use crate::assemble::{AssembleContext, CaseFiles, assemble_case, read_member_block};
use crate::config::{LoadedConfig, ParserConfig, load_config};
use crate::members::{MemberCaseLog, dedup_log};
use crate::model::{CaseType, ParsedOutput, RunReport};
use crate::nos::NosTable;
use crate::roles::RoleRegistry;
use crate::store::{save_record, write_ndjson};
use crate::ucid::{CaseNumber, output_path};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const SUMMARY_SUFFIX: &str = "summary";

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub config: ParserConfig,
    pub force: bool,
    pub workers: Option<usize>,
    pub court: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DedupOptions {
    pub output_dir: PathBuf,
    pub config: ParserConfig,
}

#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub config_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CaseOutcome {
    Parsed {
        case_type: CaseType,
        output: ParsedOutput,
    },
    Skipped {
        case_type: CaseType,
    },
    Failed {
        case_type: CaseType,
    },
}

/// Groups `<input>/<court>/[html/]<stem>[_n|_summary].html` and
/// `<stem>.json` files by case, in a stable order.
pub fn discover_cases(input_dir: &Path, court_filter: Option<&str>) -> Result<Vec<CaseFiles>> {
    let mut groups: BTreeMap<(String, CaseNumber), CaseGroup> = BTreeMap::new();

    for entry in WalkDir::new(input_dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", input_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        if ext != "html" && ext != "json" {
            continue;
        }
        let Some(court) = court_of(path) else {
            continue;
        };
        if court_filter.is_some_and(|filter| !filter.eq_ignore_ascii_case(&court)) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let (base, suffix) = stem.split_once('_').unwrap_or((stem, ""));
        let Some(case_number) = CaseNumber::from_file_stem(base) else {
            debug!(path = %path.display(), "file name is not a case number; ignoring");
            continue;
        };

        let group = groups.entry((court, case_number)).or_default();
        match (ext, suffix) {
            ("json", "") => group.supplement = Some(path.to_path_buf()),
            ("html", "") => group.updates.push((0, path.to_path_buf())),
            ("html", SUMMARY_SUFFIX) => group.summary = Some(path.to_path_buf()),
            ("html", n) => match n.parse::<u32>() {
                Ok(n) => group.updates.push((n, path.to_path_buf())),
                Err(_) => debug!(path = %path.display(), "unknown snapshot suffix; ignoring"),
            },
            _ => debug!(path = %path.display(), "unexpected json file; ignoring"),
        }
    }

    let mut cases = Vec::with_capacity(groups.len());
    for ((court, case_number), mut group) in groups {
        if group.updates.is_empty() && group.supplement.is_none() {
            warn!(court = %court, case = %case_number.case_id(), "summary page without docket; skipping");
            continue;
        }
        group.updates.sort();
        cases.push(CaseFiles {
            court,
            case_number,
            html: group.updates.into_iter().map(|(_, path)| path).collect(),
            summary: group.summary,
            supplement: group.supplement,
        });
    }
    Ok(cases)
}

#[derive(Debug, Default)]
struct CaseGroup {
    updates: Vec<(u32, PathBuf)>,
    summary: Option<PathBuf>,
    supplement: Option<PathBuf>,
}

fn court_of(path: &Path) -> Option<String> {
    let parent = path.parent()?;
    let name = parent.file_name()?.to_str()?;
    let court_dir = if name == "html" || name == "json" {
        parent.parent()?.file_name()?.to_str()?
    } else {
        name
    };
    Some(court_dir.to_lowercase())
}

fn member_log_path(config: &ParserConfig, output_dir: &Path) -> PathBuf {
    if config.paths.member_log.is_absolute() {
        config.paths.member_log.clone()
    } else {
        output_dir.join(&config.paths.member_log)
    }
}

pub fn parse_cases(options: &ParseOptions) -> Result<RunReport> {
    let config = &options.config;
    let roles = RoleRegistry::load(config.paths.role_map.as_deref())?;
    let nos = NosTable::load(config.paths.nos_table.as_deref())?;
    let members = MemberCaseLog::open(&member_log_path(config, &options.output_dir))?;
    let backwards_courts = config.backwards_courts();
    let links_before = members.len();

    let cases = discover_cases(&options.input_dir, options.court.as_deref())?;
    let workers = options.workers.unwrap_or(config.run.workers).max(1);
    let force = options.force || config.run.force_rerun;
    info!(cases = cases.len(), workers, force, "parse start");

    let ctx = AssembleContext {
        roles: &roles,
        nos: &nos,
        members: Some(&members),
        backwards_courts: &backwards_courts,
        resolve_see_above: config.run.resolve_see_above,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("failed to build worker pool")?;
    record_member_blocks(&pool, &cases, &members);

    let outcomes = pool.install(|| {
        cases
            .par_iter()
            .map(|case| process_case(&ctx, case, &options.output_dir, force))
            .collect::<Vec<_>>()
    });

    let mut report = RunReport::default();
    for outcome in outcomes {
        match outcome {
            CaseOutcome::Parsed { case_type, output } => {
                report.tally_mut(case_type).parsed += 1;
                report.outputs.push(output);
            }
            CaseOutcome::Skipped { case_type } => report.tally_mut(case_type).skipped += 1,
            CaseOutcome::Failed { case_type } => report.tally_mut(case_type).failed += 1,
        }
    }
    report.member_links_added = members.len().saturating_sub(links_before);

    if members.path().exists() {
        dedup_log(members.path())?;
    }

    if let Some(path_log) = &config.run.path_log {
        let path_log = if path_log.is_absolute() {
            path_log.clone()
        } else {
            options.output_dir.join(path_log)
        };
        write_ndjson(&path_log, &report.outputs)?;
        info!(path = %path_log.display(), entries = report.outputs.len(), "path log written");
    }

    for (case_type, tally) in [(CaseType::Civil, report.civil), (CaseType::Criminal, report.criminal)] {
        info!(
            case_type = case_type.as_str(),
            parsed = tally.parsed,
            skipped = tally.skipped,
            failed = tally.failed,
            "parse summary"
        );
    }

    Ok(report)
}

/// Reads every case header before any case is assembled, so member lookups
/// do not depend on scheduling. Blocks are recorded in discovery order.
fn record_member_blocks(pool: &rayon::ThreadPool, cases: &[CaseFiles], members: &MemberCaseLog) {
    let blocks = pool.install(|| {
        cases
            .par_iter()
            .map(|case| (case, read_member_block(case)))
            .collect::<Vec<_>>()
    });

    for (case, block) in blocks {
        let recorded = block.and_then(|links| members.record_block(&links));
        match recorded {
            Ok(0) => {}
            Ok(added) => info!(ucid = %case.ucid(), added, "member cases recorded"),
            Err(err) => warn!(
                ucid = %case.ucid(),
                error = %format!("{err:#}"),
                "member block not recorded"
            ),
        }
    }
}

fn process_case(
    ctx: &AssembleContext<'_>,
    case: &CaseFiles,
    output_dir: &Path,
    force: bool,
) -> CaseOutcome {
    let case_type = case.case_number.case_type();
    let case_ucid = case.ucid();
    let out_path = output_path(output_dir, &case.court, &case.case_number);

    if out_path.exists() && !force {
        debug!(ucid = %case_ucid, path = %out_path.display(), "output exists; skipping");
        return CaseOutcome::Skipped { case_type };
    }

    let attempt = catch_unwind(AssertUnwindSafe(|| -> Result<CaseType> {
        let record = assemble_case(ctx, case)?;
        save_record(&out_path, &record)?;
        Ok(record.case_type)
    }));

    match attempt {
        Ok(Ok(case_type)) => CaseOutcome::Parsed {
            case_type,
            output: ParsedOutput {
                ucid: case_ucid,
                path: out_path.display().to_string(),
            },
        },
        Ok(Err(err)) => {
            warn!(
                ucid = %case_ucid,
                path = %case.html.first().map(|p| p.display().to_string()).unwrap_or_default(),
                error = %format!("{err:#}"),
                "case failed; skipping"
            );
            CaseOutcome::Failed { case_type }
        }
        Err(_) => {
            warn!(ucid = %case_ucid, "case parser panicked; skipping");
            CaseOutcome::Failed { case_type }
        }
    }
}

pub fn dedup_members(options: &DedupOptions) -> Result<(usize, usize)> {
    dedup_log(&member_log_path(&options.config, &options.output_dir))
}

pub fn validate_config(options: &ValidateOptions) -> Result<Vec<String>> {
    let LoadedConfig { path, config } = load_config(&options.config_path)?;
    let mut messages = vec![match path {
        Some(path) => format!("OK: config ({})", path.display()),
        None => format!(
            "OK: defaults ({} not found)",
            options.config_path.display()
        ),
    }];

    let roles = RoleRegistry::load(config.paths.role_map.as_deref())?;
    messages.push(format!("OK: role map ({} roles)", roles.len()));
    let nos = NosTable::load(config.paths.nos_table.as_deref())?;
    messages.push(format!("OK: nature of suit table ({} entries)", nos.entries().len()));
    Ok(messages)
}
