use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use tokio::{sync::RwLock, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::analysis::{build_dashboard, AnalysisConfig, Dashboard, ReadingSource};

use super::DashboardState;

/// Rebuilds the dashboard on a fixed period and publishes the result.
pub struct DashboardController<S> {
    source: Arc<S>,
    config: Arc<AnalysisConfig>,
    state: Arc<RwLock<DashboardState>>,
    output: Option<Arc<PathBuf>>,
    ticker: Arc<tokio::sync::Mutex<Option<(JoinHandle<()>, CancellationToken)>>>,
}

impl<S> Clone for DashboardController<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            config: Arc::clone(&self.config),
            state: Arc::clone(&self.state),
            output: self.output.clone(),
            ticker: Arc::clone(&self.ticker),
        }
    }
}

impl<S> DashboardController<S>
where
    S: ReadingSource + Send + Sync + 'static,
{
    pub fn new(source: S, config: AnalysisConfig) -> Self {
        Self {
            source: Arc::new(source),
            config: Arc::new(config),
            state: Arc::new(RwLock::new(DashboardState::new())),
            output: None,
            ticker: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Also write each successful dashboard as JSON to `path`.
    pub fn with_output(mut self, path: PathBuf) -> Self {
        self.output = Some(Arc::new(path));
        self
    }

    pub async fn get_state(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    /// Run the pipeline once for the current local day.
    pub async fn refresh(&self) -> Result<()> {
        let today = Utc::now().with_timezone(&self.config.utc_offset()).date_naive();
        self.refresh_for(today).await
    }

    /// Run the pipeline once with a fixed `today`. On failure the previous
    /// dashboard stays published and the error is recorded. A dashboard that
    /// could not be written to the output file is still published.
    pub async fn refresh_for(&self, today: NaiveDate) -> Result<()> {
        match build_dashboard(self.source.as_ref(), &self.config, today).await {
            Ok(dashboard) => {
                let written = match &self.output {
                    Some(path) => write_output(path, &dashboard).await,
                    None => Ok(()),
                };
                debug!("dashboard refreshed for {today}");
                let mut state = self.state.write().await;
                state.record_success(dashboard, Utc::now());
                if let Err(err) = &written {
                    state.record_failure(format!("{err:#}"));
                }
                written
            }
            Err(err) => {
                let message = format!("{err:#}");
                self.state.write().await.record_failure(message);
                Err(anyhow::Error::new(err).context("dashboard refresh failed"))
            }
        }
    }

    pub async fn start(&self, period: Duration) -> Result<()> {
        let mut ticker_guard = self.ticker.lock().await;
        if ticker_guard.is_some() {
            bail!("dashboard refresher already running");
        }
        if period.is_zero() {
            bail!("refresh interval must be positive");
        }

        info!("refreshing dashboard every {period:?}");

        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let controller = self.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(err) = controller.refresh().await {
                            warn!("{err:#}; keeping the previous dashboard");
                        }
                    }
                    _ = token.cancelled() => break,
                }
            }
        });

        *ticker_guard = Some((handle, cancel_token));
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let running = self.ticker.lock().await.take();
        if let Some((handle, token)) = running {
            token.cancel();
            handle
                .await
                .context("dashboard refresher task failed to join")?;
            info!("dashboard refresher stopped");
        }
        Ok(())
    }
}

async fn write_output(path: &Path, dashboard: &Dashboard) -> Result<()> {
    let json = serde_json::to_vec_pretty(dashboard)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write dashboard to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Panel, StoreError};
    use crate::db::{Acceleration, Database, Reading, Rgb};
    use chrono::{DateTime, TimeZone};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Serves from an in-memory store until told to go down.
    struct FlakySource {
        db: Database,
        down: AtomicBool,
    }

    impl ReadingSource for FlakySource {
        async fn latest(&self, limit: usize) -> Result<Vec<Reading>, StoreError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("store went away".into()));
            }
            self.db.latest(limit).await
        }

        async fn between(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<Reading>, StoreError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("store went away".into()));
            }
            self.db.between(start, end).await
        }
    }

    async fn seeded_db() -> Database {
        let db = Database::in_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2019, 8, 14, 12, 0, 0).unwrap();
        let rows: Vec<Reading> = (0..60)
            .map(|i| Reading {
                id: None,
                timestamp: start + chrono::Duration::minutes(i),
                light: 200.0,
                rgb: Rgb::new(100, 120, 140),
                accelerometer: Acceleration::new(0.0, 0.0, 1.0),
                ambient_temp: 30.0,
                pressure: 101_000.0,
                cpu_temp: 45.0,
            })
            .collect();
        db.insert_readings(&rows).await.unwrap();
        db
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 8, 16).unwrap()
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_dashboard() {
        let source = FlakySource {
            db: seeded_db().await,
            down: AtomicBool::new(false),
        };
        let controller = DashboardController::new(source, AnalysisConfig::default());

        controller.refresh_for(today()).await.unwrap();
        let first = controller.get_state().await;
        assert!(first.dashboard.as_ref().unwrap().current.is_ready());
        assert!(!first.is_stale());

        controller.source.down.store(true, Ordering::SeqCst);
        assert!(controller.refresh_for(today()).await.is_err());

        let second = controller.get_state().await;
        assert_eq!(second.dashboard, first.dashboard);
        assert!(second.is_stale());
        assert_eq!(second.refreshes, 1);
        assert_eq!(second.failures, 1);
        assert!(second.last_error.unwrap().contains("store went away"));
    }

    #[tokio::test]
    async fn successful_refresh_writes_output_file() {
        let path = std::env::temp_dir().join(format!("enviro-dashboard-{}.json", std::process::id()));
        let controller = DashboardController::new(seeded_db().await, AnalysisConfig::default())
            .with_output(path.clone());

        controller.refresh_for(today()).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["today"], "2019-08-16");
        assert_eq!(written["current"]["status"], "ready");
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn unwritable_output_still_publishes() {
        let path = std::env::temp_dir()
            .join(format!("enviro-missing-dir-{}", std::process::id()))
            .join("dashboard.json");
        let controller = DashboardController::new(seeded_db().await, AnalysisConfig::default())
            .with_output(path);

        assert!(controller.refresh_for(today()).await.is_err());

        let state = controller.get_state().await;
        assert!(state.dashboard.is_some());
        assert_eq!(state.refreshes, 1);
        assert_eq!(state.failures, 1);
        assert!(state.last_error.unwrap().contains("failed to write dashboard"));
    }

    #[tokio::test]
    async fn empty_store_publishes_no_data() {
        let controller =
            DashboardController::new(Database::in_memory().unwrap(), AnalysisConfig::default());
        controller.refresh_for(today()).await.unwrap();

        let dashboard = controller.get_state().await.dashboard.unwrap();
        assert_eq!(dashboard.current, Panel::NoData);
        assert_eq!(dashboard.lighting, Panel::NoData);
    }

    #[tokio::test]
    async fn periodic_task_refreshes_and_stops() {
        let controller = DashboardController::new(seeded_db().await, AnalysisConfig::default());
        controller.start(Duration::from_millis(10)).await.unwrap();
        assert!(controller.start(Duration::from_millis(10)).await.is_err());

        time::sleep(Duration::from_millis(60)).await;
        controller.stop().await.unwrap();

        let state = controller.get_state().await;
        assert!(state.refreshes >= 1);
        assert!(state.dashboard.is_some());
    }
}
