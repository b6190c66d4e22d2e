//! Catalog data model: sources, sites, jobs and scan settings

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extraction::AdapterKind;
use crate::utils::DEFAULT_SCAN_INTERVAL_SECS;

pub type SourceId = i64;
pub type SiteId = i64;

/// A saved job-board search ("link") that the scanner revisits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub user_id: String,
    pub site_id: SiteId,
    pub title: String,
    pub url: String,
    pub enabled: bool,
    pub last_scanned_at: Option<DateTime<Utc>>,
}

/// A job board and the adapter that knows how to read it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    pub logo_url: Option<String>,
    pub adapter: AdapterKind,
}

/// Deduplication key: a posting's id is only unique within its site
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobKey {
    pub site_id: SiteId,
    pub external_id: String,
}

impl JobKey {
    #[must_use]
    pub fn new(site_id: SiteId, external_id: impl Into<String>) -> Self {
        Self {
            site_id,
            external_id: external_id.into(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.site_id, self.external_id)
    }
}

/// User-facing lifecycle of a job. Only the user moves a job between states;
/// the scanner creates jobs as `New` and never touches the status afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    New,
    Applied,
    Archived,
    ExcludedByAdvancedMatching,
    Processing,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub link_id: SourceId,
    pub site_id: SiteId,
    pub external_id: String,
    pub external_url: String,
    pub title: String,
    pub company_name: Option<String>,
    pub company_logo: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub job_type: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub labels: Vec<String>,
    pub listed_at: Option<DateTime<Utc>>,
    /// Last-modified timestamp published by the job board, if any
    pub source_updated_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    #[must_use]
    pub fn key(&self) -> JobKey {
        JobKey::new(self.site_id, self.external_id.clone())
    }
}

/// Recurring scan settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSettings {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl ScanSettings {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&JobStatus::ExcludedByAdvancedMatching).unwrap();
        assert_eq!(json, "\"excluded_by_advanced_matching\"");
        let parsed: JobStatus = serde_json::from_str("\"applied\"").unwrap();
        assert_eq!(parsed, JobStatus::Applied);
    }

    #[test]
    fn test_job_key_display() {
        assert_eq!(JobKey::new(3, "abc-123").to_string(), "3:abc-123");
    }
}
