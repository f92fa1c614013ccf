use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// `None` when no file existed and defaults were used.
    pub path: Option<PathBuf>,
    pub config: ParserConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParserConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub courts: CourtsConfig,
}

impl ParserConfig {
    pub fn validate(&self) -> Result<()> {
        if self.run.workers == 0 {
            bail!("run.workers must be at least 1");
        }
        if self.paths.member_log.as_os_str().is_empty() {
            bail!("paths.member_log must not be empty");
        }
        for court in &self.courts.backwards_docket {
            if court.trim().is_empty() || court.chars().any(|c| !c.is_ascii_alphanumeric()) {
                bail!("courts.backwards_docket has an invalid court code: {court:?}");
            }
        }
        Ok(())
    }

    pub fn backwards_courts(&self) -> BTreeSet<String> {
        self.courts
            .backwards_docket
            .iter()
            .map(|c| c.trim().to_lowercase())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default)]
    pub role_map: Option<PathBuf>,
    #[serde(default)]
    pub nos_table: Option<PathBuf>,
    /// Relative paths land under the output directory.
    #[serde(default = "default_member_log")]
    pub member_log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            role_map: None,
            nos_table: None,
            member_log: default_member_log(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub force_rerun: bool,
    #[serde(default)]
    pub resolve_see_above: bool,
    #[serde(default)]
    pub path_log: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            force_rerun: false,
            resolve_see_above: false,
            path_log: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CourtsConfig {
    #[serde(default)]
    pub backwards_docket: Vec<String>,
}

pub fn load_config(config_path: &Path) -> Result<LoadedConfig> {
    if !config_path.exists() {
        return Ok(LoadedConfig {
            path: None,
            config: ParserConfig::default(),
        });
    }

    let text = std::fs::read_to_string(config_path)
        .with_context(|| format!("failed to read parser config: {}", config_path.display()))?;
    let mut config: ParserConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse toml in {}", config_path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid parser config {}", config_path.display()))?;

    if let Some(role_map) = config.paths.role_map.take() {
        config.paths.role_map = Some(resolve_path(config_path, &role_map)?);
    }
    if let Some(nos_table) = config.paths.nos_table.take() {
        config.paths.nos_table = Some(resolve_path(config_path, &nos_table)?);
    }

    Ok(LoadedConfig {
        path: Some(config_path.to_path_buf()),
        config,
    })
}

pub fn resolve_path(base_config_path: &Path, maybe_relative: &Path) -> Result<PathBuf> {
    if maybe_relative.is_absolute() {
        return Ok(maybe_relative.to_path_buf());
    }

    let parent = base_config_path.parent().ok_or_else(|| {
        anyhow!(
            "parser config has no parent directory: {}",
            base_config_path.display()
        )
    })?;

    Ok(parent.join(maybe_relative))
}

fn default_member_log() -> PathBuf {
    PathBuf::from("member_cases.jsonl")
}

fn default_workers() -> usize {
    16
}
