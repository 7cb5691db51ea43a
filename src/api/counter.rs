//! Visit counter endpoints

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Serialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{last_value, query_pairs},
    error::AppResult,
    models::VisitRecord,
    services::counter::CounterOutcome,
};

/// Query parameters for the counter
#[derive(Debug, Default, IntoParams, ToSchema)]
pub struct CounterQuery {
    /// `true` to record a visit before answering (default: `false`)
    pub increment: Option<String>,
    /// `POST` records a visit; used by iframe clients, which can only GET
    pub method: Option<String>,
}

impl CounterQuery {
    /// Build from raw pairs; a repeated key keeps its last value
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            increment: last_value(pairs, "increment"),
            method: last_value(pairs, "method"),
        }
    }

    /// Only `increment=true` or `method=POST` (any case) count a visit
    pub fn wants_increment(&self) -> bool {
        let increment = self
            .increment
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        let iframe_post = self
            .method
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("POST"));

        increment || iframe_post
    }
}

/// Counter response
#[derive(Debug, Serialize, ToSchema)]
pub struct CounterResponse {
    pub success: bool,
    /// Counter document as stored
    pub data: VisitRecord,
    /// Whether this request recorded a visit
    pub updated: bool,
}

impl From<CounterOutcome> for CounterResponse {
    fn from(outcome: CounterOutcome) -> Self {
        Self {
            success: true,
            data: outcome.record,
            updated: outcome.updated,
        }
    }
}

/// Read the visit counter, optionally recording a visit
#[utoipa::path(
    get,
    path = "/gist-proxy",
    tag = "counter",
    params(CounterQuery),
    responses(
        (status = 200, description = "Counter document, or an ErrorResponse envelope on failure", body = CounterResponse)
    )
)]
pub async fn get_counter(
    State(state): State<crate::AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> AppResult<Json<CounterResponse>> {
    let query = CounterQuery::from_pairs(&query_pairs(query)?);
    let outcome = state.services.counter.handle(query.wants_increment()).await?;
    Ok(Json(outcome.into()))
}

/// Record a visit (beacon/iframe clients)
#[utoipa::path(
    post,
    path = "/gist-proxy",
    tag = "counter",
    responses(
        (status = 200, description = "Updated counter document, or an ErrorResponse envelope on failure", body = CounterResponse)
    )
)]
pub async fn record_visit(State(state): State<crate::AppState>) -> AppResult<Json<CounterResponse>> {
    let outcome = state.services.counter.handle(true).await?;
    Ok(Json(outcome.into()))
}
