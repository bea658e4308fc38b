//! Graph API client.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::media::types::{GraphErrorBody, GraphList, GraphMedia, GraphPage};

/// Timeout for `/me/accounts`.
const ACCOUNTS_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for `/{id}/media`.
const MEDIA_TIMEOUT: Duration = Duration::from_secs(8);

const MEDIA_FIELDS: &str = "id,caption,media_url,permalink,thumbnail_url,media_type,timestamp";
const ACCOUNT_FIELDS: &str = "id,name,instagram_business_account";

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx answer. `message` is the API's own error message, if any.
    #[error("graph api returned {status}")]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    /// 2xx answer whose body is not the expected JSON.
    #[error("unexpected graph api response body: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("invalid graph api url: {0}")]
    Url(#[from] url::ParseError),
}

/// Thin wrapper over the two Graph API calls the feed needs.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: Client,
    base_url: String,
}

impl GraphClient {
    /// Build a client. `system_proxy = false` ignores HTTP(S)_PROXY.
    pub fn new(base_url: impl Into<String>, system_proxy: bool) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if !system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder.build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// First Instagram business account linked to any page of the token's
    /// user, or `None` when no page has one.
    pub async fn resolve_account_id(&self, token: &str) -> Result<Option<String>, GraphError> {
        let url = self.endpoint(
            &["me", "accounts"],
            &[("fields", ACCOUNT_FIELDS), ("limit", "50"), ("access_token", token)],
        )?;
        let pages: GraphList<GraphPage> = self.get_json(url, ACCOUNTS_TIMEOUT).await?;

        Ok(pages
            .data
            .into_iter()
            .filter_map(|page| page.instagram_business_account?.id)
            .find(|id| !id.is_empty()))
    }

    /// Up to `limit` raw media entries for `account_id`.
    pub async fn list_media(
        &self,
        account_id: &str,
        token: &str,
        limit: usize,
    ) -> Result<Vec<GraphMedia>, GraphError> {
        let limit = limit.to_string();
        let url = self.endpoint(
            &[account_id, "media"],
            &[("fields", MEDIA_FIELDS), ("access_token", token), ("limit", &limit)],
        )?;
        let list: GraphList<GraphMedia> = self.get_json(url, MEDIA_TIMEOUT).await?;
        Ok(list.data)
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<url::Url, GraphError> {
        let mut url = url::Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: url::Url,
        timeout: Duration,
    ) -> Result<T, GraphError> {
        let response = self.http.get(url).timeout(timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<GraphErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .filter(|m| !m.is_empty());
            return Err(GraphError::Status { status, message });
        }
        response.json::<T>().await.map_err(GraphError::Decode)
    }
}
