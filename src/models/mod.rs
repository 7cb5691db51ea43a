//! Data models for SitePulse

pub mod analytics;
pub mod visit_record;

pub use analytics::{AnalyticsSnapshot, DateRange, MetricCounts};
pub use visit_record::VisitRecord;
