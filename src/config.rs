#![forbid(unsafe_code)]

use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use log::warn;

use crate::error::ConfigError;

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const API_KEY_VAR: &str = "YOUTUBE_API_KEY";
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_REGION_CODE: &str = "IN";
pub const DEFAULT_MAX_RESULTS: usize = 500;
/// Largest page/batch the remote service accepts per call.
pub const API_PAGE_LIMIT: usize = 50;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 100;
pub const DEFAULT_FAILURE_BACKOFF_MS: u64 = 5_000;
pub const DEFAULT_CSV_PATH: &str = "youtube_sample.csv";
pub const DEFAULT_DB_PATH: &str = "youtube_videos.db";
pub const DEFAULT_TABLE: &str = "videos";
pub const DEFAULT_QUERIES: [&str; 9] = [
    "technology",
    "education",
    "music",
    "gaming",
    "sports",
    "comedy",
    "news",
    "cooking",
    "travel",
];

/// Fully resolved settings for one collection run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub api_base_url: String,
    pub collect: CollectOptions,
    pub queries: Vec<String>,
    pub output: OutputPaths,
}

/// Knobs for the search and detail stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectOptions {
    pub region_code: String,
    pub max_results: usize,
    pub page_size: usize,
    pub batch_size: usize,
    pub request_delay: Duration,
    pub failure_backoff: Duration,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            region_code: DEFAULT_REGION_CODE.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            page_size: API_PAGE_LIMIT,
            batch_size: API_PAGE_LIMIT,
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            failure_backoff: Duration::from_millis(DEFAULT_FAILURE_BACKOFF_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub table: String,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

/// Values supplied on the command line; they win over env and `.env`.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub env_path: Option<PathBuf>,
    pub region_code: Option<String>,
    pub max_results: Option<usize>,
    pub queries: Vec<String>,
    pub csv_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub table: Option<String>,
}

pub fn resolve_settings(overrides: SettingsOverrides) -> Result<Settings, ConfigError> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(env_path)?;
    build_settings(&file_vars, env_var_string, overrides)
}

fn build_settings(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: SettingsOverrides,
) -> Result<Settings, ConfigError> {
    let lookup = |key: &str| lookup_value(key, file_vars, &env_lookup);

    let api_key = lookup(API_KEY_VAR).ok_or(ConfigError::MissingApiKey(API_KEY_VAR))?;
    let api_base_url = lookup("YOUTUBE_API_BASE_URL")
        .map(|value| value.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

    let region_code = non_blank(overrides.region_code)
        .or_else(|| lookup("YOUTUBE_REGION_CODE"))
        .unwrap_or_else(|| DEFAULT_REGION_CODE.to_string());
    let max_results = overrides
        .max_results
        .unwrap_or_else(|| parse_or("COLLECT_MAX_RESULTS", &lookup, DEFAULT_MAX_RESULTS));
    let batch_size =
        parse_or("COLLECT_BATCH_SIZE", &lookup, API_PAGE_LIMIT).clamp(1, API_PAGE_LIMIT);
    let request_delay = Duration::from_millis(parse_or(
        "COLLECT_REQUEST_DELAY_MS",
        &lookup,
        DEFAULT_REQUEST_DELAY_MS,
    ));
    let failure_backoff = Duration::from_millis(parse_or(
        "COLLECT_FAILURE_BACKOFF_MS",
        &lookup,
        DEFAULT_FAILURE_BACKOFF_MS,
    ));

    let queries = if overrides.queries.is_empty() {
        DEFAULT_QUERIES.iter().map(|query| query.to_string()).collect()
    } else {
        overrides.queries
    };

    let csv_path = overrides
        .csv_path
        .or_else(|| lookup("COLLECT_CSV_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_PATH));
    let db_path = overrides
        .db_path
        .or_else(|| lookup("COLLECT_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
    let table = non_blank(overrides.table)
        .or_else(|| lookup("COLLECT_TABLE"))
        .unwrap_or_else(|| DEFAULT_TABLE.to_string());

    Ok(Settings {
        api_key,
        api_base_url,
        collect: CollectOptions {
            region_code,
            max_results,
            page_size: API_PAGE_LIMIT,
            batch_size,
            request_delay,
            failure_backoff,
        },
        queries,
        output: OutputPaths {
            csv_path,
            db_path,
            table,
        },
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            warn!("ignoring invalid {key}={raw:?}; using {default}");
            default
        }),
        None => default,
    }
}

fn env_var_string(key: &str) -> Option<String> {
    non_blank(env::var(key).ok())
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| non_blank(file_vars.get(key).cloned()))
}

/// Parses a dotenv-style file. A missing file yields no variables.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    })?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
