//! Analytics snapshot service

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;

use crate::{
    config::AnalyticsConfig,
    error::{AppError, AppResult},
    models::{
        analytics::TRAILING_WINDOW_DAYS, AnalyticsSnapshot, DateRange, MetricCounts,
    },
    services::{
        credentials::StagedCredentials,
        google::{self, AnalyticsDataClient, ServiceAccountKey},
    },
};

/// Source of aggregate users/views counts for a date range
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    /// First report row for `range`; `None` when the range has no data
    async fn run_report(&self, range: DateRange) -> AppResult<Option<MetricCounts>>;
}

/// Query today, the trailing window and all time, concurrently.
///
/// A range without rows counts as zero traffic. The first failing query
/// fails the whole snapshot.
pub async fn collect_snapshot<S>(
    source: &S,
    as_of: NaiveDate,
    epoch_floor: NaiveDate,
) -> AppResult<AnalyticsSnapshot>
where
    S: AnalyticsSource + ?Sized,
{
    let (today, last_30_days, all_time) = tokio::try_join!(
        source.run_report(DateRange::single_day(as_of)),
        source.run_report(DateRange::trailing(as_of, TRAILING_WINDOW_DAYS)),
        source.run_report(DateRange::since(epoch_floor, as_of)),
    )?;

    Ok(AnalyticsSnapshot {
        today: today.unwrap_or_default(),
        last_30_days: last_30_days.unwrap_or_default(),
        all_time: all_time.unwrap_or_default(),
    })
}

#[derive(Clone)]
pub struct AnalyticsService {
    config: AnalyticsConfig,
    client: Client,
}

impl AnalyticsService {
    pub fn new(config: AnalyticsConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Fetch the users/views snapshot as of `as_of`
    pub async fn snapshot(&self, as_of: NaiveDate) -> AppResult<AnalyticsSnapshot> {
        let property_id = self
            .config
            .property_id
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                AppError::Configuration("GA_PROPERTY_ID environment variable not set".to_string())
            })?;

        // The staged file only lives for this block
        let key = {
            let credentials = StagedCredentials::acquire(&self.config)?;
            ServiceAccountKey::from_file(credentials.path())?
        };

        let access_token = google::fetch_access_token(&self.client, &key).await?;
        let source =
            AnalyticsDataClient::new(self.client.clone(), &self.config, property_id, access_token);

        let snapshot = collect_snapshot(&source, as_of, self.config.epoch_floor).await?;

        tracing::info!(
            %as_of,
            today_users = snapshot.today.users,
            total_users = snapshot.all_time.users,
            "Analytics snapshot fetched"
        );

        Ok(snapshot)
    }
}
