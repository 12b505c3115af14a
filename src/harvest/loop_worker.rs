use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::db::Database;

use super::board::{Probe, SensorBoard};
use super::led::{LedSignal, StatusLed};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const CAPTURE_TIMEOUT_SECS: u64 = 10;

/// The blocking half of the harvester: board, thermometer and LED. Only one
/// blocking job touches it at a time.
struct Rig<B: SensorBoard, L: StatusLed> {
    probe: Probe<B>,
    signal: LedSignal<L>,
}

type SharedRig<B, L> = Arc<Mutex<Rig<B, L>>>;

/// Sample every `interval`, store each reading and acknowledge it with a long
/// blink. On cancellation the LED blinks three times and is left off.
///
/// Returns the number of readings stored.
pub async fn harvest_loop<B, L>(
    probe: Probe<B>,
    signal: LedSignal<L>,
    db: Database,
    interval: Duration,
    cancel_token: CancellationToken,
) -> u64
where
    B: SensorBoard,
    L: StatusLed,
{
    let rig: SharedRig<B, L> = Arc::new(Mutex::new(Rig { probe, signal }));

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut stored = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let fut = perform_capture(&rig, &db);
                match tokio::time::timeout(Duration::from_secs(CAPTURE_TIMEOUT_SECS), fut).await {
                    Ok(Ok(())) => stored += 1,
                    Ok(Err(err)) => log_error!("harvest capture failed: {err:?}"),
                    Err(_) => log_warn!("harvest capture timeout (> {}s)", CAPTURE_TIMEOUT_SECS),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("harvest loop shutting down after {} readings", stored);
                break;
            }
        }
    }

    let farewell = tokio::task::spawn_blocking({
        let rig = Arc::clone(&rig);
        move || lock(&rig).signal.blink_three_times()
    })
    .await;
    match farewell {
        Ok(Ok(())) => {}
        Ok(Err(err)) => log_warn!("shutdown blink failed: {err:#}"),
        Err(err) => log_warn!("shutdown blink worker join failed: {err}"),
    }

    stored
}

async fn perform_capture<B, L>(rig: &SharedRig<B, L>, db: &Database) -> Result<()>
where
    B: SensorBoard,
    L: StatusLed,
{
    let capture_start = Instant::now();
    let timestamp = Utc::now();

    let reading = tokio::task::spawn_blocking({
        let rig = Arc::clone(rig);
        move || lock(&rig).probe.read(timestamp)
    })
    .await
    .context("sensor worker join failed")??;

    let id = db
        .insert_reading(&reading)
        .await
        .context("failed to persist reading")?;

    log_debug!(
        "stored reading {id}: light={:.1} rgb={} temp={:.2} pressure={:.1} cpu={:.1} ({}ms)",
        reading.light,
        reading.rgb,
        reading.ambient_temp,
        reading.pressure,
        reading.cpu_temp,
        capture_start.elapsed().as_millis()
    );

    tokio::task::spawn_blocking({
        let rig = Arc::clone(rig);
        move || lock(&rig).signal.blink_long()
    })
    .await
    .context("LED worker join failed")?
    .context("acknowledge blink failed")
}

fn lock<B, L>(rig: &SharedRig<B, L>) -> MutexGuard<'_, Rig<B, L>>
where
    B: SensorBoard,
    L: StatusLed,
{
    rig.lock().unwrap_or_else(PoisonError::into_inner)
}
