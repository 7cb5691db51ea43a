//! Google Analytics Data API client
//!
//! Authenticates with a service-account key through the OAuth 2.0 JWT bearer
//! grant and runs `runReport` queries for a GA4 property.

use std::{fmt, path::Path};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr};

use crate::{
    config::AnalyticsConfig,
    error::{AppError, AppResult, Upstream},
    models::{DateRange, MetricCounts},
    services::analytics::AnalyticsSource,
};

pub const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Fields a usable service-account key must carry
pub const REQUIRED_KEY_FIELDS: [&str; 4] = ["type", "project_id", "private_key", "client_email"];

/// Service-account key as downloaded from the Google Cloud console
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> AppResult<Self> {
        let value: Value = serde_json::from_str(raw).map_err(|e| {
            AppError::Configuration(format!("Analytics credentials are not valid JSON: {}", e))
        })?;

        let missing: Vec<&str> = REQUIRED_KEY_FIELDS
            .iter()
            .copied()
            .filter(|field| value.get(field).and_then(Value::as_str).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Configuration(format!(
                "Analytics credentials are missing fields: {}",
                missing.join(", ")
            )));
        }

        let key: Self = serde_json::from_value(value).map_err(|e| {
            AppError::Configuration(format!("Invalid analytics credentials: {}", e))
        })?;

        if key.key_type != "service_account" {
            return Err(AppError::Configuration(format!(
                "Analytics credentials must be a service account key, got '{}'",
                key.key_type
            )));
        }

        Ok(key)
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!(
                "Cannot read analytics credentials {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw)
    }

    /// Signed assertion for the JWT bearer grant
    fn assertion(&self, scope: &str) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            AppError::Configuration(format!("Invalid service account private key: {}", e))
        })?;

        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token request: {}", e)))
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchange the key for a short-lived read-only access token
pub async fn fetch_access_token(client: &Client, key: &ServiceAccountKey) -> AppResult<String> {
    let assertion = key.assertion(ANALYTICS_READONLY_SCOPE)?;

    tracing::debug!(client_email = %key.client_email, "Requesting analytics access token");

    let response = client
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| AppError::upstream_transport(Upstream::Analytics, e))?;

    if !response.status().is_success() {
        return Err(failure(response, "Token exchange failed").await);
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| AppError::MalformedData(format!("Unexpected token response: {}", e)))?;

    Ok(token.access_token)
}

/// Turn a non-success Google response into an error, keeping Google's explanation
async fn failure(response: Response, context: &str) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let detail = serde_json::from_str::<Value>(&body).ok().and_then(|v| {
        // OAuth errors: {"error": "...", "error_description": "..."}
        // API errors:   {"error": {"code": 403, "message": "...", "status": "..."}}
        v.get("error_description")
            .and_then(Value::as_str)
            .or_else(|| v.pointer("/error/message").and_then(Value::as_str))
            .or_else(|| v.get("error").and_then(Value::as_str))
            .map(str::to_string)
    });

    let message = match detail {
        Some(detail) => format!("{} ({}): {}", context, status.as_u16(), detail),
        None => format!("{} ({})", context, status.as_u16()),
    };

    AppError::Upstream {
        upstream: Upstream::Analytics,
        status: Some(status),
        message,
    }
}

/// `properties/{id}` for either `123` or `properties/123`
pub fn property_resource(property_id: &str) -> String {
    let id = property_id.trim();
    if id.starts_with("properties/") {
        id.to_string()
    } else {
        format!("properties/{}", id)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReportRequest<'a> {
    date_ranges: [ReportDateRange; 1],
    metrics: [ReportMetric<'a>; 2],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportDateRange {
    start_date: String,
    end_date: String,
}

#[derive(Serialize)]
struct ReportMetric<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct RunReportResponse {
    #[serde(default)]
    rows: Vec<ReportRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRow {
    #[serde(default)]
    metric_values: Vec<MetricValue>,
}

/// Metric values arrive as decimal strings
#[serde_as]
#[derive(Debug, Deserialize)]
struct MetricValue {
    #[serde_as(as = "DisplayFromStr")]
    value: u64,
}

/// Report runner bound to one property and one access token
pub struct AnalyticsDataClient {
    client: Client,
    report_url: String,
    access_token: String,
    users_metric: String,
    views_metric: String,
}

impl AnalyticsDataClient {
    pub fn new(
        client: Client,
        config: &AnalyticsConfig,
        property_id: &str,
        access_token: String,
    ) -> Self {
        Self {
            client,
            report_url: format!(
                "{}/v1beta/{}:runReport",
                config.api_base_url.trim_end_matches('/'),
                property_resource(property_id)
            ),
            access_token,
            users_metric: config.users_metric.clone(),
            views_metric: config.views_metric.clone(),
        }
    }
}

#[async_trait]
impl AnalyticsSource for AnalyticsDataClient {
    async fn run_report(&self, range: DateRange) -> AppResult<Option<MetricCounts>> {
        let request = RunReportRequest {
            date_ranges: [ReportDateRange {
                start_date: range.start.format("%Y-%m-%d").to_string(),
                end_date: range.end.format("%Y-%m-%d").to_string(),
            }],
            metrics: [
                ReportMetric { name: &self.users_metric },
                ReportMetric { name: &self.views_metric },
            ],
        };

        tracing::debug!(start = %range.start, end = %range.end, "Running analytics report");

        let response = self
            .client
            .post(&self.report_url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::upstream_transport(Upstream::Analytics, e))?;

        if !response.status().is_success() {
            return Err(failure(response, "Analytics report failed").await);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::upstream_transport(Upstream::Analytics, e))?;
        let report: RunReportResponse = serde_json::from_slice(&body)
            .map_err(|e| AppError::MalformedData(format!("Unexpected report response: {}", e)))?;

        let Some(row) = report.rows.into_iter().next() else {
            return Ok(None);
        };

        match row.metric_values.as_slice() {
            [users, views, ..] => Ok(Some(MetricCounts {
                users: users.value,
                views: views.value,
            })),
            _ => Err(AppError::MalformedData(format!(
                "Report row has {} metric values, expected 2",
                row.metric_values.len()
            ))),
        }
    }
}
