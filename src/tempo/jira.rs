use crate::error::FetchError;
use crate::tempo::http::{Credentials, body_excerpt};
use crate::tempo::keys::IssueRef;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use roxmltree::Node;
use std::collections::HashMap;
use tracing::debug;

/// Authoritative identifiers for one issue, as reported by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDetails {
    pub project_key: String,
    pub project_id: String,
    pub issue_key: String,
    pub issue_id: String,
    pub status: String,
}

impl IssueDetails {
    pub fn is_closed(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("closed")
    }
}

pub trait IssueDirectory {
    fn lookup(&mut self, issue: &IssueRef) -> Result<IssueDetails, FetchError>;
}

/// Per-run memo of successful lookups, keyed by the key as extracted from the
/// entry. Failures are not cached.
#[derive(Debug, Default)]
pub struct IssueCache {
    entries: HashMap<IssueRef, IssueDetails>,
}

impl IssueCache {
    pub fn get_or_fetch(
        &mut self,
        issue: &IssueRef,
        directory: &mut dyn IssueDirectory,
    ) -> Result<IssueDetails, FetchError> {
        if let Some(details) = self.entries.get(issue) {
            return Ok(details.clone());
        }

        let details = directory.lookup(issue)?;
        self.entries.insert(issue.clone(), details.clone());
        Ok(details)
    }

    pub fn cached_issues(&self) -> usize {
        self.entries.len()
    }
}

/// Reads issue metadata from Jira's XML issue view.
pub struct JiraXmlDirectory {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl JiraXmlDirectory {
    pub fn new(client: Client, base_url: &str, credentials: Credentials) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn endpoint(&self, key: &str) -> String {
        format!(
            "{}/si/jira.issueviews:issue-xml/{key}/{key}.xml",
            self.base_url
        )
    }
}

impl IssueDirectory for JiraXmlDirectory {
    fn lookup(&mut self, issue: &IssueRef) -> Result<IssueDetails, FetchError> {
        let key = issue.to_string();
        let endpoint = self.endpoint(&key);

        debug!(issue = %key, endpoint = %endpoint, "fetching issue metadata");

        let response = self
            .client
            .get(&endpoint)
            .basic_auth(&self.credentials.user, Some(&self.credentials.password))
            .send()
            .map_err(|source| FetchError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound { issue: key });
        }

        let body = response.text().map_err(|source| FetchError::Transport {
            endpoint: endpoint.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint,
                status: status.as_u16(),
                body: body_excerpt(&body),
            });
        }

        let details =
            parse_issue_xml(&body).map_err(|reason| FetchError::Malformed {
                endpoint: endpoint.clone(),
                reason,
            })?;

        if details.issue_key != key {
            debug!(requested = %key, found = %details.issue_key, "issue was moved");
        }

        Ok(details)
    }
}

/// Extracts identifiers from `rss/channel/item` of an issue view document.
pub fn parse_issue_xml(xml: &str) -> Result<IssueDetails, String> {
    let document = roxmltree::Document::parse(xml).map_err(|error| error.to_string())?;

    let item = document
        .descendants()
        .find(|node| node.has_tag_name("channel"))
        .and_then(|channel| channel.children().find(|node| node.has_tag_name("item")))
        .ok_or_else(|| "missing channel/item".to_string())?;
    let project = child(item, "project")?;
    let key = child(item, "key")?;
    let status = child(item, "status")?;

    let project_id = attribute(project, "id")?;
    if !project_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("project id is not numeric: {project_id}"));
    }

    let issue_key = key
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| "missing item/key text".to_string())?
        .to_string();

    Ok(IssueDetails {
        project_key: attribute(project, "key")?,
        project_id,
        issue_key,
        issue_id: attribute(key, "id")?,
        status: status.text().map(str::trim).unwrap_or_default().to_string(),
    })
}

fn child<'a, 'input>(item: Node<'a, 'input>, name: &str) -> Result<Node<'a, 'input>, String> {
    item.children()
        .find(|node| node.has_tag_name(name))
        .ok_or_else(|| format!("missing item/{name}"))
}

fn attribute(node: Node<'_, '_>, name: &str) -> Result<String, String> {
    node.attribute(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| format!("missing {}@{name}", node.tag_name().name()))
}
