//! Repository layer for the persisted counter document

pub mod gist;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{config::GistConfig, error::AppResult};

/// Remote store holding one JSON document, fetched and replaced wholesale.
///
/// The store offers no conditional writes: concurrent replacements are
/// last-writer-wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Current content of the document, `None` when it is absent or empty
    async fn fetch(&self) -> AppResult<Option<String>>;

    /// Replace the content of the document
    async fn replace(&self, content: &str) -> AppResult<()>;
}

/// Main repository struct holding the stores used by the services
#[derive(Clone)]
pub struct Repository {
    pub counter: Arc<dyn DocumentStore>,
}

impl Repository {
    /// Create a repository backed by the configured gist
    pub fn new(config: &GistConfig, client: reqwest::Client) -> Self {
        Self {
            counter: Arc::new(gist::GistRepository::new(config, client)),
        }
    }
}
