use crate::report::span::parse_weekday;
use crate::tempo::http::MIN_TIMEOUT_SECONDS;
use crate::tempo::payload::DEFAULT_COMMENT_DELIMITER;
use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use url::Url;

const APP_DIR: &str = ".hamster-briefs";
const CONFIG_FILE: &str = "config.json";
pub const TEMPO_PASSWORD_ENV: &str = "HAMSTER_BRIEFS_TEMPO_PASSWORD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hamster_db_path: PathBuf,
    pub week_starts: u32,
    pub first_sprint_week_num: i64,
    pub tempo_url: Option<String>,
    pub tempo_user: Option<String>,
    pub tempo_password: Option<String>,
    pub request_timeout_seconds: u64,
    pub comment_delimiter: String,
    pub confirm_threshold: usize,
    pub workflow_command: Option<String>,
    pub reopen_closed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hamster_db_path: default_hamster_db_path(),
            week_starts: 0,
            first_sprint_week_num: 0,
            tempo_url: None,
            tempo_user: None,
            tempo_password: None,
            request_timeout_seconds: 30,
            comment_delimiter: DEFAULT_COMMENT_DELIMITER.to_string(),
            confirm_threshold: 20,
            workflow_command: None,
            reopen_closed: false,
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        default_root_dir().join(CONFIG_FILE)
    }

    /// Reads the config file, falling back to defaults when it does not exist.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        set_mode_600(path)?;

        Ok(())
    }

    /// The environment variable wins over the stored password.
    pub fn resolved_tempo_password(&self) -> Option<String> {
        std::env::var(TEMPO_PASSWORD_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| {
                self.tempo_password
                    .clone()
                    .filter(|value| !value.trim().is_empty())
            })
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "hamster_db_path" => {
                self.hamster_db_path = expand_home(value.trim());
            }
            "week_starts" => {
                self.week_starts = parse_weekday(value)?;
            }
            "first_sprint_week_num" => {
                self.first_sprint_week_num = value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| anyhow!("first_sprint_week_num must be a number"))?;
            }
            "tempo_url" => {
                self.tempo_url = optional(value).map(|url| normalize_tempo_url(&url)).transpose()?;
            }
            "tempo_user" => {
                self.tempo_user = optional(value);
            }
            "tempo_password" => {
                self.tempo_password = optional(value);
            }
            "request_timeout_seconds" => {
                self.request_timeout_seconds = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| anyhow!("request_timeout_seconds must be a number"))?
                    .max(MIN_TIMEOUT_SECONDS);
            }
            "comment_delimiter" => {
                self.comment_delimiter = value.to_string();
            }
            "confirm_threshold" => {
                self.confirm_threshold = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| anyhow!("confirm_threshold must be a number"))?;
            }
            "workflow_command" => {
                self.workflow_command = optional(value);
            }
            "reopen_closed" => {
                self.reopen_closed = value
                    .trim()
                    .parse::<bool>()
                    .map_err(|_| anyhow!("reopen_closed must be true/false"))?;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: hamster_db_path|hamster.db_path, week_starts|report.week_starts, first_sprint_week_num|report.first_sprint_week_num, tempo_url|tempo.url, tempo_user|tempo.user, tempo_password|tempo.password, request_timeout_seconds|tempo.timeout_seconds, comment_delimiter|tempo.comment_delimiter, confirm_threshold|upload.confirm_threshold, workflow_command|tempo.workflow_command, reopen_closed|tempo.reopen_closed"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        let unset = || "not_set".to_string();

        match normalize_config_key(key) {
            "hamster_db_path" => Some(self.hamster_db_path.display().to_string()),
            "week_starts" => Some(self.week_starts.to_string()),
            "first_sprint_week_num" => Some(self.first_sprint_week_num.to_string()),
            "tempo_url" => Some(self.tempo_url.clone().unwrap_or_else(unset)),
            "tempo_user" => Some(self.tempo_user.clone().unwrap_or_else(unset)),
            "tempo_password" => Some(
                self.resolved_tempo_password()
                    .map(|_| "***set***".to_string())
                    .unwrap_or_else(unset),
            ),
            "request_timeout_seconds" => Some(self.request_timeout_seconds.to_string()),
            "comment_delimiter" => Some(format!("{:?}", self.comment_delimiter)),
            "confirm_threshold" => Some(self.confirm_threshold.to_string()),
            "workflow_command" => Some(self.workflow_command.clone().unwrap_or_else(unset)),
            "reopen_closed" => Some(self.reopen_closed.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "hamster_db_path" | "hamster.db_path" => "hamster_db_path",
        "week_starts" | "report.week_starts" => "week_starts",
        "first_sprint_week_num" | "report.first_sprint_week_num" => "first_sprint_week_num",
        "tempo_url" | "tempo.url" => "tempo_url",
        "tempo_user" | "tempo.user" => "tempo_user",
        "tempo_password" | "tempo.password" => "tempo_password",
        "request_timeout_seconds" | "tempo.timeout_seconds" => "request_timeout_seconds",
        "comment_delimiter" | "tempo.comment_delimiter" => "comment_delimiter",
        "confirm_threshold" | "upload.confirm_threshold" => "confirm_threshold",
        "workflow_command" | "tempo.workflow_command" => "workflow_command",
        "reopen_closed" | "tempo.reopen_closed" => "reopen_closed",
        _ => key,
    }
}

pub fn is_secret_key(key: &str) -> bool {
    normalize_config_key(key) == "tempo_password"
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Accepts an absolute http(s) URL and returns it without a trailing slash.
pub fn normalize_tempo_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw.trim()).with_context(|| format!("Invalid Tempo URL: {raw}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Tempo URL must use http or https: {raw}");
    }
    if parsed.host_str().is_none() {
        bail!("Tempo URL has no host: {raw}");
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

pub fn default_hamster_db_path() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("share")
        .join("hamster-applet")
        .join("hamster.db")
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}
