use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::time::Duration;

const BODY_EXCERPT_CHARS: usize = 300;
pub const MIN_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

/// Blocking client shared by the issue lookups and worklog submissions of one
/// run. Every request is bounded by `timeout_seconds`.
pub fn build_client(timeout_seconds: u64) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/xml"));

    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds.max(MIN_TIMEOUT_SECONDS)))
        .default_headers(headers)
        .build()
        .context("Failed to create HTTP client")
}

pub fn body_excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_CHARS {
        return trimmed.to_string();
    }

    let excerpt = trimmed.chars().take(BODY_EXCERPT_CHARS).collect::<String>();
    format!("{excerpt}...")
}
