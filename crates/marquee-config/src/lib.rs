use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_STATS_LIMIT: usize = 5;

const MAX_PAGE_SIZE: u32 = 100;
const MAX_STATS_LIMIT: usize = 50;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MySqlConfig {
    #[serde(default = "default_mysql_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_seconds")]
    pub acquire_timeout_seconds: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClickHouseConfig {
    #[serde(default = "default_ch_url")]
    pub url: String,
    #[serde(default = "default_ch_database")]
    pub database: String,
    #[serde(default = "default_ch_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,
    #[serde(default = "default_true")]
    pub async_insert: bool,
    #[serde(default = "default_true")]
    pub wait_for_async_insert: bool,
    #[serde(default = "default_log_table")]
    pub log_table: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_stats_limit")]
    pub stats_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub mysql: MySqlConfig,
    #[serde(default)]
    pub clickhouse: ClickHouseConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub web: WebConfig,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            url: default_mysql_url(),
            max_connections: default_max_connections(),
            acquire_timeout_seconds: default_acquire_timeout_seconds(),
        }
    }
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: default_ch_url(),
            database: default_ch_database(),
            username: default_ch_username(),
            password: String::new(),
            timeout_seconds: default_timeout_seconds(),
            async_insert: true,
            wait_for_async_insert: true,
            log_table: default_log_table(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            stats_limit: default_stats_limit(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

fn default_mysql_url() -> String {
    "mysql://root@127.0.0.1:3306/sakila".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_seconds() -> f64 {
    10.0
}

fn default_ch_url() -> String {
    "http://127.0.0.1:8123".to_string()
}

fn default_ch_database() -> String {
    "marquee".to_string()
}

fn default_ch_username() -> String {
    "default".to_string()
}

fn default_timeout_seconds() -> f64 {
    30.0
}

fn default_log_table() -> String {
    "search_log".to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_stats_limit() -> usize {
    DEFAULT_STATS_LIMIT
}

fn default_web_host() -> String {
    "127.0.0.1".to_string()
}

fn default_web_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

pub fn expand_path(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{}", home.to_string_lossy(), stripped);
        }
    }
    path.to_string()
}

fn home_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".marquee").join("config.toml"))
}

fn repo_default_config_path() -> PathBuf {
    PathBuf::from("config/marquee.toml")
}

fn resolve_config_path_with_overrides(
    raw_path: Option<PathBuf>,
    env_keys: &[&str],
    home_path: Option<PathBuf>,
    repo_default: PathBuf,
) -> PathBuf {
    if let Some(path) = raw_path {
        return path;
    }

    for key in env_keys {
        if let Ok(value) = std::env::var(key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(expand_path(trimmed));
            }
        }
    }

    if let Some(path) = home_path {
        if path.exists() {
            return path;
        }
    }

    repo_default
}

pub fn resolve_config_path(raw_path: Option<PathBuf>) -> PathBuf {
    resolve_config_path_with_overrides(
        raw_path,
        &["MARQUEE_CONFIG"],
        home_config_path(),
        repo_default_config_path(),
    )
}

pub fn resolve_web_config_path(raw_path: Option<PathBuf>) -> PathBuf {
    resolve_config_path_with_overrides(
        raw_path,
        &["MARQUEE_WEB_CONFIG", "MARQUEE_CONFIG"],
        home_config_path(),
        repo_default_config_path(),
    )
}

fn normalize_config(mut cfg: AppConfig) -> AppConfig {
    cfg.search.page_size = cfg.search.page_size.clamp(1, MAX_PAGE_SIZE);
    cfg.search.stats_limit = cfg.search.stats_limit.clamp(1, MAX_STATS_LIMIT);
    cfg.mysql.max_connections = cfg.mysql.max_connections.max(1);
    cfg
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read config {}", path.as_ref().display()))?;
    let cfg: AppConfig = toml::from_str(&content).context("failed to parse TOML config")?;
    Ok(normalize_config(cfg))
}
