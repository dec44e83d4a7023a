use crate::tempo::keys::KeySource;
use std::fmt;
use thiserror::Error;

/// Why one entry cannot be submitted. Collected per entry during the
/// validation pass; any of these blocks the whole batch.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("invalid value for `{field}`: {value}")]
    InvalidField { field: &'static str, value: String },
    #[error("too many JIRA keys in {origin}: {}", .candidates.join(", "))]
    TooManyKeys {
        origin: KeySource,
        candidates: Vec<String>,
    },
    #[error("conflicting JIRA keys in activity name and tags: {}", .candidates.join(", "))]
    ConflictingKeys { candidates: Vec<String> },
    #[error("JIRA identifiers not found in activity name or tags")]
    KeysNotFound,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("issue {issue_key} is {status}; worklogs cannot be logged against it")]
    IssueClosed { issue_key: String, status: String },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("item not found: {issue}")]
    NotFound { issue: String },
    #[error("issue fetch failed: {endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("issue fetch failed: {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("issue fetch failed: malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },
}

/// An entry error together with enough context to find the source record.
#[derive(Debug)]
pub struct ValidationError {
    pub index: usize,
    pub label: String,
    pub error: EntryError,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ERROR: entry #{} ({}): {}",
            self.index + 1,
            self.label,
            self.error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::FetchError;

    #[test]
    fn fetch_transport_error_names_endpoint_and_cause() {
        let source = reqwest::blocking::Client::new()
            .get("not a url")
            .build()
            .expect_err("invalid url");
        let detail = source.to_string();

        let error = FetchError::Transport {
            endpoint: "https://jira.example.com/si/x.xml".to_string(),
            source,
        };
        assert_eq!(
            error.to_string(),
            format!("issue fetch failed: https://jira.example.com/si/x.xml: {detail}")
        );
    }
}
