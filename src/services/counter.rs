//! Visit counter service

use chrono::{Local, NaiveDate};

use crate::{
    error::{AppError, AppResult},
    models::VisitRecord,
    repository::Repository,
};

/// Result of one counter request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterOutcome {
    pub record: VisitRecord,
    pub updated: bool,
}

#[derive(Clone)]
pub struct CounterService {
    repository: Repository,
}

impl CounterService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Read the counter, recording a visit first when `increment` is set.
    /// Dates are server-local.
    pub async fn handle(&self, increment: bool) -> AppResult<CounterOutcome> {
        self.handle_on(increment, Local::now().date_naive()).await
    }

    /// Same as [`handle`](Self::handle) with an explicit current date.
    ///
    /// Read-modify-write without a precondition: two concurrent increments
    /// may both read the same document and one of them is lost.
    pub async fn handle_on(&self, increment: bool, today: NaiveDate) -> AppResult<CounterOutcome> {
        let store = &self.repository.counter;

        let mut record = match store.fetch().await? {
            Some(content) => VisitRecord::from_document(&content).map_err(|e| {
                AppError::MalformedData(format!("Invalid counter document: {}", e))
            })?,
            None => {
                tracing::info!("No counter document yet, starting from zero");
                VisitRecord::empty(today)
            }
        };

        if !increment {
            return Ok(CounterOutcome {
                record,
                updated: false,
            });
        }

        record.record_visit(today);

        let document = record
            .to_document()
            .map_err(|e| AppError::Internal(format!("Failed to serialize counter: {}", e)))?;
        store.replace(&document).await?;

        tracing::info!(
            total_visits = record.total_visits,
            today_visits = record.today_visits,
            "Visit recorded"
        );

        Ok(CounterOutcome {
            record,
            updated: true,
        })
    }
}
