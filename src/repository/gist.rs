//! GitHub Gist document store

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderValue, ACCEPT, AUTHORIZATION},
    Client, RequestBuilder,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::GistConfig,
    error::{AppError, AppResult, Upstream},
};

use super::DocumentStore;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Deserialize)]
struct Gist {
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    /// Set by GitHub when `content` was cut at 1 MB
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

#[derive(Serialize)]
struct GistUpdate<'a> {
    files: HashMap<&'a str, GistFileUpdate<'a>>,
}

#[derive(Serialize)]
struct GistFileUpdate<'a> {
    content: &'a str,
}

/// One file of one gist, used as the counter document
#[derive(Clone)]
pub struct GistRepository {
    client: Client,
    base_url: String,
    gist_id: String,
    filename: String,
    token: Option<String>,
}

impl GistRepository {
    pub fn new(config: &GistConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            gist_id: config.gist_id.clone(),
            filename: config.filename.clone(),
            token: config.token.clone(),
        }
    }

    fn url(&self) -> String {
        format!("{}/gists/{}", self.base_url, self.gist_id)
    }

    /// Authenticated request; fails before any network traffic when no token is set
    fn request(&self, builder: RequestBuilder) -> AppResult<RequestBuilder> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AppError::Configuration("GitHub token not configured".to_string()))?;

        let mut auth = HeaderValue::from_str(&format!("token {}", token)).map_err(|_| {
            AppError::Configuration("GitHub token contains invalid characters".to_string())
        })?;
        auth.set_sensitive(true);

        Ok(builder.header(AUTHORIZATION, auth).header(ACCEPT, GITHUB_ACCEPT))
    }

    async fn fetch_raw(&self, raw_url: &str) -> AppResult<String> {
        tracing::debug!("Gist file truncated, fetching raw content");

        let response = self
            .request(self.client.get(raw_url))?
            .send()
            .await
            .map_err(|e| AppError::upstream_transport(Upstream::StoreRead, e))?;

        if !response.status().is_success() {
            return Err(AppError::upstream_status(Upstream::StoreRead, response.status()));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::upstream_transport(Upstream::StoreRead, e))
    }
}

#[async_trait]
impl DocumentStore for GistRepository {
    async fn fetch(&self) -> AppResult<Option<String>> {
        tracing::debug!(gist_id = %self.gist_id, "Fetching counter gist");

        let response = self
            .request(self.client.get(self.url()))?
            .send()
            .await
            .map_err(|e| AppError::upstream_transport(Upstream::StoreRead, e))?;

        if !response.status().is_success() {
            return Err(AppError::upstream_status(Upstream::StoreRead, response.status()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::upstream_transport(Upstream::StoreRead, e))?;
        let mut gist: Gist = serde_json::from_slice(&body)
            .map_err(|e| AppError::MalformedData(format!("Unexpected gist response: {}", e)))?;

        let Some(file) = gist.files.remove(&self.filename) else {
            tracing::debug!(filename = %self.filename, "Counter file not present in gist");
            return Ok(None);
        };

        let content = match (file.truncated, file.raw_url) {
            (true, Some(raw_url)) => Some(self.fetch_raw(&raw_url).await?),
            _ => file.content,
        };

        Ok(content.filter(|c| !c.trim().is_empty()))
    }

    async fn replace(&self, content: &str) -> AppResult<()> {
        tracing::debug!(gist_id = %self.gist_id, bytes = content.len(), "Updating counter gist");

        let update = GistUpdate {
            files: HashMap::from([(self.filename.as_str(), GistFileUpdate { content })]),
        };

        let response = self
            .request(self.client.patch(self.url()))?
            .json(&update)
            .send()
            .await
            .map_err(|e| AppError::upstream_transport(Upstream::StoreWrite, e))?;

        if !response.status().is_success() {
            return Err(AppError::upstream_status(Upstream::StoreWrite, response.status()));
        }

        Ok(())
    }
}
