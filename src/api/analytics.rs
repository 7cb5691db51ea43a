//! Analytics snapshot endpoint

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{last_value, query_pairs},
    error::AppError,
    models::AnalyticsSnapshot,
};

pub const METRIC_TYPE: &str = "users_and_pageviews";

/// Query parameters for the snapshot
#[derive(Debug, Default, IntoParams, ToSchema)]
pub struct SnapshotQuery {
    /// Reference day (YYYY-MM-DD), defaults to today
    pub date: Option<String>,
}

impl SnapshotQuery {
    /// Build from raw pairs; a repeated key keeps its last value
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            date: last_value(pairs, "date"),
        }
    }
}

/// Users and page views per reporting window
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStats {
    pub today_users: u64,
    pub today_page_views: u64,
    pub total_users: u64,
    pub total_page_views: u64,
    /// Trailing 30 days, today included
    #[serde(rename = "last30DaysUsers")]
    pub last_30_days_users: u64,
    #[serde(rename = "last30DaysPageViews")]
    pub last_30_days_page_views: u64,
}

impl From<AnalyticsSnapshot> for SnapshotStats {
    fn from(snapshot: AnalyticsSnapshot) -> Self {
        Self {
            today_users: snapshot.today.users,
            today_page_views: snapshot.today.views,
            total_users: snapshot.all_time.users,
            total_page_views: snapshot.all_time.views,
            last_30_days_users: snapshot.last_30_days.users,
            last_30_days_page_views: snapshot.last_30_days.views,
        }
    }
}

/// Snapshot response
#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotResponse {
    pub success: bool,
    pub stats: SnapshotStats,
    /// Time the snapshot was taken (YYYY-MM-DD HH:MM:SS, server-local)
    pub last_updated: String,
    pub metric_type: String,
}

/// Failure envelope of the snapshot endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Error reported in the snapshot envelope
#[derive(Debug)]
pub struct SnapshotError(pub AppError);

impl From<AppError> for SnapshotError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for SnapshotError {
    fn into_response(self) -> Response {
        self.0.log();

        let error = match &self.0 {
            AppError::Configuration(msg) | AppError::Validation(msg) => msg.clone(),
            other => format!("Failed to fetch GA data: {}", other),
        };

        let body = Json(SnapshotErrorResponse {
            success: false,
            error,
        });

        (StatusCode::OK, body).into_response()
    }
}

/// Traffic snapshot for today, the last 30 days and all time
#[utoipa::path(
    get,
    path = "/ga-stats",
    tag = "analytics",
    params(SnapshotQuery),
    responses(
        (status = 200, description = "Snapshot, or a SnapshotErrorResponse envelope on failure", body = SnapshotResponse)
    )
)]
pub async fn get_snapshot(
    State(state): State<crate::AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<SnapshotResponse>, SnapshotError> {
    let query = SnapshotQuery::from_pairs(&query_pairs(query)?);
    let as_of = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
            AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
        })?,
        None => Local::now().date_naive(),
    };

    let snapshot = state.services.analytics.snapshot(as_of).await?;

    Ok(Json(SnapshotResponse {
        success: true,
        stats: snapshot.into(),
        last_updated: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        metric_type: METRIC_TYPE.to_string(),
    }))
}
