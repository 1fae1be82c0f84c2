//! HTTP classification service backend
//!
//! Talks to a service exposing `POST /classify` with body
//! `{"lines": [...]}` and a JSON array of `{"line", "label"}` in response.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::LabelBackend;
use crate::types::Label;

/// Label the reference service emits when its model failed on a line
const ERROR_LABEL: &str = "error";

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    lines: &'a [String],
}

/// One entry of the service response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledLine {
    pub line: String,
    pub label: String,
}

/// Remote classification service client
pub struct RemoteBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteBackend {
    /// Create a backend for the service at `base_url` (e.g. `http://localhost:5000`)
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a backend reusing an existing HTTP client
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: classify_url(base_url),
        }
    }

    /// Full URL of the classify endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Classify several lines with a single request.
    pub async fn classify_lines(&self, lines: &[String]) -> Result<Vec<LabeledLine>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ClassifyRequest { lines })
            .send()
            .await
            .context("Failed to reach classification service")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Classification service returned {}: {}", status, body);
        }

        let body = response
            .text()
            .await
            .context("Failed to read classification response")?;
        parse_response(&body)
    }
}

#[async_trait]
impl LabelBackend for RemoteBackend {
    async fn classify_one(&self, line: &str) -> Result<Label> {
        let lines = [line.to_string()];
        let labeled = self.classify_lines(&lines).await?;
        label_for(&labeled, line)
    }

    fn backend_name(&self) -> &'static str {
        "remote"
    }
}

fn classify_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/classify") {
        base.to_string()
    } else {
        format!("{}/classify", base)
    }
}

/// Parse the service response body.
pub fn parse_response(body: &str) -> Result<Vec<LabeledLine>> {
    serde_json::from_str(body).context("Malformed classification response")
}

/// Pick the label for `line` out of a response.
fn label_for(labeled: &[LabeledLine], line: &str) -> Result<Label> {
    let entry = labeled
        .iter()
        .find(|entry| entry.line == line)
        .or_else(|| match labeled {
            [only] => Some(only),
            _ => None,
        })
        .context("Classification response has no entry for the line")?;

    if entry.label.trim().eq_ignore_ascii_case(ERROR_LABEL) {
        bail!("Classification service failed on the line");
    }
    Ok(Label::parse(&entry.label))
}
