use serde::{Deserialize, Serialize};

use crate::utils::format_date;

/// Number of activities shown in the recent-activity list
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Company-wide counters for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DashboardStats {
    #[serde(rename = "totalDocuments", default)]
    pub total_documents: i64,
    #[serde(rename = "pendingReports", default)]
    pub pending_reports: i64,
    #[serde(rename = "totalProduction", default)]
    pub total_production: i64,
    #[serde(rename = "activeJobs", default)]
    pub active_jobs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Activity {
    pub action: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl Activity {
    pub fn date_display(&self) -> String {
        format_date(&self.created_at)
    }
}

/// Stats and activity feed, fetched together.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub activities: Vec<Activity>,
}

impl Dashboard {
    pub fn recent_activities(&self) -> &[Activity] {
        let end = self.activities.len().min(RECENT_ACTIVITY_LIMIT);
        &self.activities[..end]
    }
}
