//! Tracker development-information client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::error::JiraApiError;
use super::jwt;
use crate::domain::errors::SyncResult;
use crate::domain::models::{DevInfoPayload, TrackerConfig};
use crate::domain::ports::DevInfoClient;

pub const BULK_PATH: &str = "/rest/devinfo/0.10/bulk";

/// [`DevInfoClient`] posting to the tracker's bulk endpoint.
#[derive(Clone)]
pub struct JiraDevInfoClient {
    http: Client,
    app_key: String,
    shared_secret: Option<String>,
}

impl JiraDevInfoClient {
    pub fn new(app_key: impl Into<String>, shared_secret: Option<String>, timeout: Duration) -> Result<Self, JiraApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("devsync/", env!("CARGO_PKG_VERSION"))),
        );
        let http = Client::builder().default_headers(headers).timeout(timeout).build()?;
        Ok(Self {
            http,
            app_key: app_key.into(),
            shared_secret: shared_secret.filter(|s| !s.is_empty()),
        })
    }

    pub fn from_config(config: &TrackerConfig) -> Result<Self, JiraApiError> {
        Self::new(
            config.app_key.clone(),
            config.shared_secret.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn post(&self, jira_host: &str, payload: &DevInfoPayload) -> Result<(), JiraApiError> {
        let url = format!("{}{BULK_PATH}", jira_host.trim_end_matches('/'));
        let mut request = self.http.post(&url).json(payload);
        if let Some(secret) = &self.shared_secret {
            let token = jwt::sign(&self.app_key, secret, "POST", BULK_PATH, chrono::Utc::now().timestamp())?;
            request = request.header(AUTHORIZATION, format!("JWT {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(JiraApiError::from_status(status, &headers, &body));
        }
        debug!(commits = payload.commit_count(), status = status.as_u16(), "devinfo chunk accepted");
        Ok(())
    }
}

#[async_trait]
impl DevInfoClient for JiraDevInfoClient {
    async fn upload(&self, jira_host: &str, payload: &DevInfoPayload) -> SyncResult<()> {
        self.post(jira_host, payload).await?;
        Ok(())
    }
}
