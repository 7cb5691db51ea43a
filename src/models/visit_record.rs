//! Visit record model
//!
//! The whole counter lives in a single JSON document; it is read, changed in
//! memory and written back wholesale.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Persisted visit counter document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VisitRecord {
    /// Visits since the counter was created
    #[serde(default)]
    pub total_visits: u64,
    /// Visits counted against `last_updated`
    #[serde(default)]
    pub today_visits: u64,
    /// Day `today_visits` belongs to (YYYY-MM-DD)
    #[schema(value_type = String, format = Date, example = "2024-01-02")]
    pub last_updated: NaiveDate,
    /// Visits per day, keyed by YYYY-MM-DD
    #[serde(default)]
    #[schema(value_type = Object, example = json!({"2024-01-01": 3, "2024-01-02": 1}))]
    pub daily_stats: IndexMap<NaiveDate, u64>,
}

impl VisitRecord {
    /// Zero record used when the store holds no document yet
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            total_visits: 0,
            today_visits: 0,
            last_updated: today,
            daily_stats: IndexMap::new(),
        }
    }

    /// Count one visit on `today`.
    ///
    /// The day boundary is taken from the stored `last_updated`, so a new day
    /// resets `today_visits` no matter how long the process has been running.
    /// Counters saturate at `u64::MAX`.
    pub fn record_visit(&mut self, today: NaiveDate) {
        self.total_visits = self.total_visits.saturating_add(1);

        if self.last_updated == today {
            self.today_visits = self.today_visits.saturating_add(1);
        } else {
            self.today_visits = 1;
            self.last_updated = today;
        }

        let day = self.daily_stats.entry(today).or_insert(0);
        *day = day.saturating_add(1);
    }

    /// Parse a stored document
    pub fn from_document(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Render the document the way it is stored (pretty-printed, two-space indent)
    pub fn to_document(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
