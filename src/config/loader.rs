//! Multi-source configuration loading.
//!
//! Priority, lowest to highest:
//! 1. built-in defaults
//! 2. user config (`<config dir>/tasksearch/config.yaml`)
//! 3. project config (`.tasksearch.yaml` in the project root)
//! 4. an explicit file passed with `--config`
//! 5. `TASKSEARCH_*` environment variables
//!
//! YAML layers are deep-merged key by key, so a project file that only sets
//! `fuzzy.min_score` keeps every other value from the layers below it.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde_yaml::Value;

use super::schema::{SearchConfig, SemanticBackendKind};
use crate::error::{Result, TaskSearchError};

/// Project-level config file name.
pub const PROJECT_CONFIG_FILE: &str = ".tasksearch.yaml";

/// User-level config file name inside the platform config directory.
const USER_CONFIG_FILE: &str = "config.yaml";

pub const ENV_MIN_SCORE: &str = "TASKSEARCH_MIN_SCORE";
pub const ENV_MAX_VARIANTS: &str = "TASKSEARCH_MAX_VARIANTS";
pub const ENV_SEMANTIC_TIMEOUT_MS: &str = "TASKSEARCH_SEMANTIC_TIMEOUT_MS";
pub const ENV_SEMANTIC_ENDPOINT: &str = "TASKSEARCH_SEMANTIC_ENDPOINT";
pub const ENV_SEMANTIC_BACKEND: &str = "TASKSEARCH_SEMANTIC_BACKEND";

/// Load the effective configuration.
///
/// Missing files are skipped; unreadable or malformed files are errors.
pub fn load_config(explicit: Option<&Path>, project_root: Option<&Path>) -> Result<SearchConfig> {
    let mut layers: Vec<PathBuf> = Vec::new();
    if let Some(user) = user_config_path() {
        layers.push(user);
    }
    if let Some(root) = project_root {
        layers.push(root.join(PROJECT_CONFIG_FILE));
    }

    let mut merged = Value::Mapping(Default::default());
    for path in &layers {
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading config layer");
            merge_values(&mut merged, read_yaml(path)?);
        }
    }
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(TaskSearchError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        merge_values(&mut merged, read_yaml(path)?);
    }

    let mut config: SearchConfig = serde_yaml::from_value(merged)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Path of the per-user config file, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tasksearch").map(|dirs| dirs.config_dir().join(USER_CONFIG_FILE))
}

fn read_yaml(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Value::Mapping(Default::default()));
    }
    serde_yaml::from_str(&contents).map_err(|e| {
        TaskSearchError::Config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Deep-merge `overlay` into `base`. Mappings merge recursively; any other
/// value in `overlay` replaces the one in `base`.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Apply `TASKSEARCH_*` overrides read through `lookup`.
///
/// Takes a lookup function rather than reading the process environment so
/// tests can supply values without mutating global state.
pub fn apply_env_overrides<F>(config: &mut SearchConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ENV_MIN_SCORE) {
        config.fuzzy.min_score = parse_env(ENV_MIN_SCORE, &raw)?;
    }
    if let Some(raw) = lookup(ENV_MAX_VARIANTS) {
        config.expansion.max_variants = parse_env(ENV_MAX_VARIANTS, &raw)?;
    }
    if let Some(raw) = lookup(ENV_SEMANTIC_TIMEOUT_MS) {
        config.escalation.timeout_ms = parse_env(ENV_SEMANTIC_TIMEOUT_MS, &raw)?;
    }
    if let Some(raw) = lookup(ENV_SEMANTIC_ENDPOINT) {
        if !raw.trim().is_empty() {
            config.semantic.endpoint = Some(raw.trim().to_string());
        }
    }
    if let Some(raw) = lookup(ENV_SEMANTIC_BACKEND) {
        config.semantic.backend = SemanticBackendKind::from_str_loose(&raw).ok_or_else(|| {
            TaskSearchError::Config(format!("{ENV_SEMANTIC_BACKEND}: unknown backend '{raw}'"))
        })?;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| TaskSearchError::Config(format!("{key}: cannot parse '{raw}'")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
