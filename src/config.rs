//! Configuration management for SitePulse server

use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::{env, fmt};

/// Gist holding the visit counter when none is configured
pub const DEFAULT_GIST_ID: &str = "f43cb9d745fd37f6403fdc480ffcdff8";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served for local development of the home page
    pub static_dir: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    /// When set, logs are also written to a daily rolling file in this directory
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Service-account key as a JSON blob (GA_CREDENTIALS)
    pub credentials_json: Option<String>,
    /// Path to an existing service-account key file (GOOGLE_APPLICATION_CREDENTIALS)
    pub credentials_file: Option<String>,
    /// Directory for the per-request copy of the key (system temp dir when unset)
    pub staging_dir: Option<String>,
    /// GA4 property, either `123456` or `properties/123456`
    pub property_id: Option<String>,
    pub users_metric: String,
    pub views_metric: String,
    /// First day of the "all time" range
    pub epoch_floor: NaiveDate,
    pub api_base_url: String,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct GistConfig {
    pub token: Option<String>,
    pub gist_id: String,
    /// File inside the gist holding the counter document
    pub filename: String,
    pub api_base_url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub gist: GistConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (e.g. SITEPULSE_GIST__FILENAME)
            .add_source(
                Environment::with_prefix("SITEPULSE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            // Variables shared with the serverless deployment
            .set_override_option("analytics.credentials_json", non_empty_var("GA_CREDENTIALS"))?
            .set_override_option(
                "analytics.credentials_file",
                non_empty_var("GOOGLE_APPLICATION_CREDENTIALS"),
            )?
            .set_override_option("analytics.property_id", non_empty_var("GA_PROPERTY_ID"))?
            .set_override_option("gist.token", non_empty_var("GIST_TOKEN"))?
            .set_override_option("gist.gist_id", non_empty_var("GIST_ID"))?
            .set_override_option(
                "server.port",
                non_empty_var("PORT").and_then(|p| p.parse::<i64>().ok()),
            )?
            .build()?;

        config.try_deserialize()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 15,
            user_agent: format!("sitepulse-server/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            credentials_json: None,
            credentials_file: None,
            staging_dir: None,
            property_id: None,
            users_metric: "activeUsers".to_string(),
            views_metric: "screenPageViews".to_string(),
            epoch_floor: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            api_base_url: "https://analyticsdata.googleapis.com".to_string(),
        }
    }
}

impl Default for GistConfig {
    fn default() -> Self {
        Self {
            token: None,
            gist_id: DEFAULT_GIST_ID.to_string(),
            filename: "visitor-count.json".to_string(),
            api_base_url: "https://api.github.com".to_string(),
        }
    }
}

fn redacted(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for AnalyticsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsConfig")
            .field("credentials_json", &redacted(&self.credentials_json))
            .field("credentials_file", &self.credentials_file)
            .field("staging_dir", &self.staging_dir)
            .field("property_id", &self.property_id)
            .field("users_metric", &self.users_metric)
            .field("views_metric", &self.views_metric)
            .field("epoch_floor", &self.epoch_floor)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl fmt::Debug for GistConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GistConfig")
            .field("token", &redacted(&self.token))
            .field("gist_id", &self.gist_id)
            .field("filename", &self.filename)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}
