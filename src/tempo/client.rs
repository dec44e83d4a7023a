use crate::tempo::http::{Credentials, body_excerpt};
use crate::tempo::payload::WorklogPayload;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;

const WORKLOGS_PATH: &str = "/rest/tempo-timesheets/3/worklogs";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("worklog rejected with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("worklog request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to encode worklog")]
    Encode(#[from] serde_json::Error),
}

/// Destination for built worklogs.
pub trait WorklogSink {
    fn post(&mut self, payload: &WorklogPayload) -> Result<(), SubmitError>;
}

pub struct TempoClient {
    client: Client,
    endpoint: String,
    credentials: Credentials,
}

impl TempoClient {
    pub fn new(client: Client, base_url: &str, credentials: Credentials) -> Self {
        Self {
            client,
            endpoint: format!("{}{WORKLOGS_PATH}", base_url.trim_end_matches('/')),
            credentials,
        }
    }
}

impl WorklogSink for TempoClient {
    fn post(&mut self, payload: &WorklogPayload) -> Result<(), SubmitError> {
        let body = serde_json::to_vec(payload)?;

        debug!(endpoint = %self.endpoint, bytes = body.len(), "posting worklog");

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.credentials.user, Some(&self.credentials.password))
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .body(body)
            .send()?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().unwrap_or_default();
        Err(SubmitError::Status {
            status: status.as_u16(),
            body: body_excerpt(&body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{SubmitError, TempoClient};
    use crate::tempo::http::{Credentials, build_client};

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let credentials = Credentials {
            user: "jdoe".to_string(),
            password: "secret".to_string(),
        };
        let client = TempoClient::new(
            build_client(30).expect("client"),
            "https://jira.example.com/",
            credentials,
        );

        assert_eq!(
            client.endpoint,
            "https://jira.example.com/rest/tempo-timesheets/3/worklogs"
        );
    }

    #[test]
    fn status_error_names_code_and_body() {
        let error = SubmitError::Status {
            status: 400,
            body: "bad author".to_string(),
        };
        assert_eq!(error.to_string(), "worklog rejected with 400: bad author");
    }

    #[test]
    fn transport_error_keeps_the_cause() {
        let source = reqwest::blocking::Client::new()
            .get("not a url")
            .build()
            .expect_err("invalid url");
        let detail = source.to_string();

        let error = SubmitError::from(source);
        assert_eq!(error.to_string(), format!("worklog request failed: {detail}"));
    }
}
