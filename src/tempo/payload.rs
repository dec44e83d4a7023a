use crate::brief::Entry;
use crate::tempo::jira::IssueDetails;
use serde::{Deserialize, Serialize};

pub const DEFAULT_COMMENT_DELIMITER: &str = " / ";

/// Request body of `POST /rest/tempo-timesheets/3/worklogs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorklogPayload {
    pub date_started: String,
    pub time_spent_seconds: String,
    pub comment: String,
    pub issue: IssueTarget,
    pub author: Author,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTarget {
    pub project_id: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
}

impl WorklogPayload {
    pub fn seconds(&self) -> u64 {
        self.time_spent_seconds.parse().unwrap_or_default()
    }
}

pub fn build_payload(
    entry: &Entry,
    issue: &IssueDetails,
    author: &str,
    comment_delimiter: &str,
) -> WorklogPayload {
    WorklogPayload {
        date_started: format!("{}T00:00:00.000+0000", entry.date.format("%Y-%m-%d")),
        time_spent_seconds: hours_to_seconds(entry.duration_hours).to_string(),
        comment: entry.descriptions.join(comment_delimiter),
        issue: IssueTarget {
            project_id: issue.project_id.clone(),
            key: issue.issue_key.clone(),
        },
        author: Author {
            name: author.to_string(),
        },
    }
}

pub fn hours_to_seconds(hours: f64) -> u64 {
    (hours.max(0.0) * 3600.0).round() as u64
}

/// Expands `\n` and `\t` escapes in a delimiter given on the command line.
pub fn unescape_delimiter(raw: &str) -> String {
    raw.replace("\\n", "\n").replace("\\t", "\t")
}
