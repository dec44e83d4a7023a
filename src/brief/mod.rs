pub mod line;
pub mod normalize;

use crate::tempo::payload::WorklogPayload;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// One timesheet line item, as produced by the line parser or recovered from
/// a JSON batch. The resolved fields stay `None` until the uploader fills them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    #[serde(rename = "year_month_day")]
    pub date: NaiveDate,
    #[serde(rename = "time_spent")]
    pub duration_hours: f64,
    pub category: String,
    pub activity_name: String,
    pub activity_id: String,
    pub fact_ids: String,
    pub tags: String,
    #[serde(rename = "desctimes")]
    pub descriptions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<WorklogPayload>,
}

impl Entry {
    pub fn new(date: NaiveDate, duration_hours: f64, descriptions: Vec<String>) -> Self {
        Self {
            date,
            duration_hours: round3(duration_hours),
            category: String::new(),
            activity_name: String::new(),
            activity_id: String::new(),
            fact_ids: String::new(),
            tags: String::new(),
            descriptions,
            project_key: None,
            project_id: None,
            issue_key: None,
            issue_id: None,
            issue_resolution: None,
            payload: None,
        }
    }

    /// Individual tag tokens; the datastore joins multiple tags with commas.
    pub fn tag_tokens(&self) -> impl Iterator<Item = &str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// Decoded form of one batch element before normalization. Every field is
/// optional so that structurally incomplete entries surface as entry errors
/// instead of failing the whole decode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntry {
    pub year_month_day: Option<String>,
    pub time_spent: Option<Value>,
    pub desctimes: Option<Vec<String>>,
    pub activity_name: Option<String>,
    pub tags: Option<String>,
    pub fact_ids: Option<String>,
    pub category: Option<String>,
    pub activity_id: Option<Value>,
    pub project_key: Option<Value>,
    pub project_id: Option<Value>,
    pub issue_key: Option<Value>,
    pub issue_id: Option<Value>,
    pub issue_resolution: Option<Value>,
    pub payload: Option<Value>,
}

pub fn load_batch(path: &Path) -> Result<Vec<RawEntry>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to decode batch file: {}", path.display()))
}

/// Serializes entries with alphabetized keys, the layout curated batch files
/// are kept in.
pub fn batch_to_json(entries: &[Entry]) -> Result<String> {
    let value = serde_json::to_value(entries).context("Failed to serialize batch")?;
    serde_json::to_string_pretty(&value).context("Failed to render batch JSON")
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Renders hours rounded to 3 places in shortest form, keeping one decimal:
/// `1.0`, `0.5`, `1.25`.
pub fn format_hours(hours: f64) -> String {
    let fixed = format!("{:.3}", round3(hours));
    let trimmed = fixed.trim_end_matches('0');

    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}
