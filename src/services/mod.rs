//! Business logic services

pub mod analytics;
pub mod counter;
pub mod credentials;
pub mod google;

use std::time::Duration;

use reqwest::Client;

use crate::{
    config::{AnalyticsConfig, HttpConfig},
    error::{AppError, AppResult},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub counter: counter::CounterService,
    pub analytics: analytics::AnalyticsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, analytics_config: AnalyticsConfig, client: Client) -> Self {
        Self {
            counter: counter::CounterService::new(repository),
            analytics: analytics::AnalyticsService::new(analytics_config, client),
        }
    }
}

/// Outbound HTTP client shared by the Gist store and the Google client
pub fn http_client(config: &HttpConfig) -> AppResult<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))
}
