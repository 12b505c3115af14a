use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::Dashboard;

/// What the refresher has published so far. A failed refresh records its
/// error but leaves `dashboard` untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub dashboard: Option<Dashboard>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub refreshes: u64,
    pub failures: u64,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, dashboard: Dashboard, at: DateTime<Utc>) {
        self.dashboard = Some(dashboard);
        self.refreshed_at = Some(at);
        self.last_error = None;
        self.refreshes += 1;
    }

    pub fn record_failure(&mut self, error: String) {
        self.last_error = Some(error);
        self.failures += 1;
    }

    /// True when the published dashboard is older than the latest attempt.
    pub fn is_stale(&self) -> bool {
        self.last_error.is_some()
    }
}
