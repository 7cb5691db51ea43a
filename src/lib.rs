//! SitePulse
//!
//! Backend for a personal home page: a Google Analytics traffic snapshot and
//! a visit counter persisted in a GitHub Gist, both served as JSON.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Wire the repository and services for `config`
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let client = services::http_client(&config.http)?;
        let repository = repository::Repository::new(&config.gist, client.clone());
        let services = services::Services::new(repository, config.analytics.clone(), client);

        Ok(Self {
            config: Arc::new(config),
            services: Arc::new(services),
        })
    }
}
