use anyhow::Result;
use clap::{Parser, Subcommand};
use docket::config::load_config;
use docket::harness::{HarnessOptions, run_harness};
use docket::pipeline::{
    DedupOptions, ParseOptions, ValidateOptions, dedup_members, parse_cases, validate_config,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "docket", about = "PACER docket report parser")]
struct Cli {
    #[arg(long, default_value = "configs/parser.toml")]
    config: PathBuf,

    #[arg(long, default_value = "data/html")]
    input: PathBuf,

    #[arg(long, default_value = "data/out")]
    output: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Parse {
        #[arg(long, default_value_t = false)]
        force: bool,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long)]
        court: Option<String>,
    },
    DedupMembers,
    Validate,
    Harness {
        #[arg(long)]
        workers: Option<usize>,
    },
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            force,
            workers,
            court,
        } => {
            let loaded = load_config(&cli.config)?;
            let report = parse_cases(&ParseOptions {
                input_dir: cli.input,
                output_dir: cli.output,
                config: loaded.config,
                force,
                workers,
                court,
            })?;

            info!(
                parsed = report.parsed(),
                skipped = report.skipped(),
                failed = report.failed(),
                member_links_added = report.member_links_added,
                "run complete"
            );
        }
        Commands::DedupMembers => {
            let loaded = load_config(&cli.config)?;
            let (kept, removed) = dedup_members(&DedupOptions {
                output_dir: cli.output,
                config: loaded.config,
            })?;
            println!("kept {kept}, removed {removed}");
        }
        Commands::Validate => {
            let messages = validate_config(&ValidateOptions {
                config_path: cli.config,
            })?;
            for line in messages {
                println!("{line}");
            }
        }
        Commands::Harness { workers } => {
            let loaded = load_config(&cli.config)?;
            let report = run_harness(&HarnessOptions {
                input_dir: cli.input,
                output_dir: cli.output,
                config: loaded.config,
                workers,
            })?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}
