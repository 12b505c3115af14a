use std::future::Future;

use chrono::{DateTime, Utc};

use crate::db::Reading;

use super::error::StoreError;

/// Read-only access to stored readings, injected into the dashboard pipeline.
pub trait ReadingSource {
    /// The `limit` most recent readings, newest first.
    fn latest(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Reading>, StoreError>> + Send;

    /// Readings with `start <= timestamp < end`, oldest first.
    fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Reading>, StoreError>> + Send;
}
