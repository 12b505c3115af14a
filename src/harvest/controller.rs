use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::db::Database;

use super::board::{Probe, SensorBoard};
use super::led::{LedSignal, StatusLed};
use super::loop_worker::harvest_loop;

/// Owns the running harvest task, if any.
pub struct HarvestController {
    handle: Option<JoinHandle<u64>>,
    cancel_token: Option<CancellationToken>,
}

impl HarvestController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start<B, L>(
        &mut self,
        probe: Probe<B>,
        signal: LedSignal<L>,
        db: Database,
        interval: Duration,
    ) -> Result<()>
    where
        B: SensorBoard,
        L: StatusLed,
    {
        if self.handle.is_some() {
            bail!("harvest already active");
        }
        if interval.is_zero() {
            bail!("capture interval must be positive");
        }

        info!(
            "starting harvest every {:?} into {}",
            interval,
            db.path().display()
        );

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(harvest_loop(probe, signal, db, interval, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancel the loop and wait for its shutdown signal to finish. Returns how
    /// many readings the run stored.
    pub async fn stop(&mut self) -> Result<u64> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle.await.context("harvest loop task failed to join")
        } else {
            Ok(0)
        }
    }
}

impl Default for HarvestController {
    fn default() -> Self {
        Self::new()
    }
}
