//! HTTP client for the profile generator endpoint.

use reqwest::StatusCode;
use serde::Deserialize;

use super::wire::RandomUserResponse;
use super::{RemoteSource, NO_PROFILES_RECEIVED};
use crate::config::ClientConfig;
use crate::error::{Error, Result, SyncError, SyncResult};
use crate::models::Profile;
use crate::util::{compact_text, is_http_url, next_timestamp_millis};

const API_PATH: &str = "/api/";

/// `GET {base}/api/?results=N[&page=P]`
#[derive(Clone)]
pub struct RandomUserClient {
    endpoint: String,
    client: reqwest::Client,
}

impl RandomUserClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let endpoint = build_endpoint(&config.api_base_url)?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| Error::InvalidInput(format!("HTTP client setup failed: {error}")))?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch one raw page of generated profiles.
    pub async fn fetch_page(
        &self,
        count: usize,
        page: Option<u32>,
    ) -> SyncResult<RandomUserResponse> {
        let mut query = vec![("results", count.to_string())];
        if let Some(page) = page {
            query.push(("page", page.to_string()));
        }

        tracing::debug!("Requesting {count} profiles from {}", self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| SyncError::Network(compact_text(&error.to_string())))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Api(parse_api_error(status, &body)));
        }

        Ok(response.json::<RandomUserResponse>().await?)
    }

    /// Like [`RemoteSource::fetch_many`], for an explicit page.
    pub async fn fetch_profiles(
        &self,
        count: usize,
        page: Option<u32>,
    ) -> SyncResult<Vec<Profile>> {
        let response = self.fetch_page(count, page).await?;
        into_profiles(response)
    }
}

impl RemoteSource for RandomUserClient {
    async fn fetch_many(&self, count: usize) -> SyncResult<Vec<Profile>> {
        self.fetch_profiles(count, None).await
    }
}

/// Map a response into profiles with strictly increasing creation timestamps.
fn into_profiles(response: RandomUserResponse) -> SyncResult<Vec<Profile>> {
    if response.results.is_empty() {
        return Err(SyncError::Api(NO_PROFILES_RECEIVED.to_string()));
    }

    response
        .results
        .into_iter()
        .map(|user| {
            user.into_profile(next_timestamp_millis())
                .map_err(|error| SyncError::Api(format!("Invalid profile payload: {error}")))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.error.or(payload.message) {
            return format!("{} ({})", compact_text(&message), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}

fn build_endpoint(base_url: &str) -> Result<String> {
    let base_url = base_url.trim();
    if !is_http_url(base_url) {
        return Err(Error::InvalidInput(
            "api_base_url must include http:// or https://".to_string(),
        ));
    }
    Ok(format!("{}{API_PATH}", base_url.trim_end_matches('/')))
}
