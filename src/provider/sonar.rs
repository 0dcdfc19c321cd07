//! HTTP client for the external token-issuing API.
//!
//! Wraps reqwest with retry-on-transient-failure, a request timeout and
//! bearer-token authentication. The rest of the system only depends on the
//! [`AnalysisTokenProvider`] capability this client implements.

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;

use crate::services::AnalysisTokenProvider;

pub const USER_TOKEN_TYPE: &str = "USER_TOKEN";
pub const GLOBAL_ANALYSIS_TOKEN_TYPE: &str = "GLOBAL_ANALYSIS_TOKEN";
pub const PROJECT_ANALYSIS_TOKEN_TYPE: &str = "PROJECT_ANALYSIS_TOKEN";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct SonarConfig {
    pub base_url: String,
    pub auth_token: String,
    /// Per-request timeout, including internal retries. Defaults to 10s.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct TokenGenerationParams {
    pub name: String,
    pub expiration_date: Option<String>,
    pub login: Option<String>,
    pub project_key: Option<String>,
    pub token_type: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

pub struct SonarClient {
    client: ClientWithMiddleware,
    base_url: String,
    auth_token: String,
}

impl SonarClient {
    pub fn new(config: SonarConfig) -> Self {
        let reqwest_client = reqwest::Client::builder()
            .timeout(config.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .expect("failed to build provider HTTP client");

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES);
        let client = ClientBuilder::new(reqwest_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token,
        }
    }

    /// `POST /api/user_tokens/generate` with form-encoded parameters.
    /// Any non-200 status is an error carrying the status and response body.
    pub async fn generate_token(&self, params: TokenGenerationParams) -> anyhow::Result<String> {
        let url = format!("{}/api/user_tokens/generate", self.base_url);

        let mut form: Vec<(&str, &str)> = vec![("name", params.name.as_str())];
        if let Some(ref expiration_date) = params.expiration_date {
            form.push(("expirationDate", expiration_date));
        }
        if let Some(ref login) = params.login {
            form.push(("login", login));
        }
        if let Some(ref project_key) = params.project_key {
            form.push(("projectKey", project_key));
        }
        if let Some(ref token_type) = params.token_type {
            form.push(("type", token_type));
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.auth_token)
            .form(&form)
            .send()
            .await
            .context("executing request")?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            bail!("unexpected status code: {status}, response: {body}");
        }

        let body: TokenResponse = response.json().await.context("decoding response body")?;
        Ok(body.token)
    }
}

#[async_trait]
impl AnalysisTokenProvider for SonarClient {
    async fn generate_project_analysis_token(
        &self,
        project_id: &str,
        token_name: &str,
    ) -> anyhow::Result<String> {
        self.generate_token(TokenGenerationParams {
            name: token_name.to_string(),
            project_key: Some(project_id.to_string()),
            token_type: Some(PROJECT_ANALYSIS_TOKEN_TYPE.to_string()),
            ..TokenGenerationParams::default()
        })
        .await
    }
}
