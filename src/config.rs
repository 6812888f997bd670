use crate::app::DEFAULT_EXEC_CHAR_LIMIT;
use crate::input::KeyOverrides;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub source: Option<String>,
    pub keys: KeyOverrides,
    pub exec_char_limit: usize,
    pub log_tail_lines: Option<i64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            source: None,
            keys: KeyOverrides::default(),
            exec_char_limit: DEFAULT_EXEC_CHAR_LIMIT,
            log_tail_lines: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct KubenavConfigFile {
    #[serde(default)]
    keys: KeysSpec,
    #[serde(default)]
    exec: ExecSpec,
    #[serde(default)]
    logs: LogsSpec,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct KeysSpec {
    #[serde(default)]
    select: Option<Vec<String>>,
    #[serde(default)]
    back: Option<Vec<String>>,
    #[serde(default)]
    exec: Option<Vec<String>>,
    #[serde(default)]
    quit: Option<Vec<String>>,
    #[serde(default)]
    filter: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ExecSpec {
    #[serde(default, alias = "limit")]
    char_limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct LogsSpec {
    #[serde(default, alias = "tail")]
    tail_lines: Option<i64>,
}

/// Loads the explicit file if given, else the first discovered one, else defaults.
pub fn load_runtime_config(explicit: Option<&Path>) -> Result<RuntimeConfig> {
    let Some(path) = explicit
        .map(Path::to_path_buf)
        .or_else(discover_config_path)
    else {
        return Ok(RuntimeConfig::default());
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read runtime config {}", path.display()))?;
    let config = parse_runtime_config(&raw, Some(path.display().to_string()))
        .with_context(|| format!("failed to parse runtime config {}", path.display()))?;
    info!(source = %path.display(), "runtime config loaded");
    Ok(config)
}

fn parse_runtime_config(raw: &str, source: Option<String>) -> Result<RuntimeConfig> {
    let parsed = if raw.trim().is_empty() {
        KubenavConfigFile::default()
    } else {
        serde_yaml::from_str::<KubenavConfigFile>(raw)?
    };

    let exec_char_limit = match parsed.exec.char_limit {
        Some(0) => {
            warn!("exec.char_limit must be positive, using {DEFAULT_EXEC_CHAR_LIMIT}");
            DEFAULT_EXEC_CHAR_LIMIT
        }
        Some(limit) => limit,
        None => DEFAULT_EXEC_CHAR_LIMIT,
    };
    let log_tail_lines = match parsed.logs.tail_lines {
        Some(lines) if lines <= 0 => {
            warn!("logs.tail_lines must be positive, reading the full log");
            None
        }
        lines => lines,
    };

    Ok(RuntimeConfig {
        source,
        keys: KeyOverrides {
            select: parsed.keys.select,
            back: parsed.keys.back,
            exec: parsed.keys.exec,
            quit: parsed.keys.quit,
            filter: parsed.keys.filter,
        },
        exec_char_limit,
        log_tail_lines,
    })
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("KUBENAV_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("kubenav.yaml"),
        PathBuf::from("kubenav.yml"),
        PathBuf::from(".kubenav.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/kubenav/config.yaml"),
            PathBuf::from(&home).join(".config/kubenav/config.yml"),
            PathBuf::from(&home).join(".kubenav.yaml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}
