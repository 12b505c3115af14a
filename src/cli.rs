use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use log::info;

use crate::analysis::{
    build_dashboard, classify_lighting, red_to_blue, snapshot::Snapshot, ReadingSource,
};
use crate::dashboard::DashboardController;
use crate::db::Database;
use crate::harvest::{self, CpuThermometer, HarvestController, Probe, SimulatedBoard};
use crate::settings::SettingsStore;

#[derive(Parser)]
#[command(name = "enviro-monitor")]
#[command(about = "Harvest Enviro pHAT readings into SQLite and compute dashboard data")]
pub(crate) struct Args {
    /// Database file path
    #[arg(short, long, global = true, default_value = "enviro.sqlite3")]
    database: PathBuf,

    /// Settings file path (created with defaults by `harvest` and `watch`)
    #[arg(short, long, global = true, default_value = "enviro-settings.json")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample the board until Ctrl-C, storing every reading
    Harvest {
        /// Use the synthetic board instead of hardware
        #[arg(long)]
        simulate: bool,
    },
    /// Build the dashboard once and print it as JSON
    Report {
        /// Day the lighting history ends on (defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Rebuild the dashboard periodically until Ctrl-C
    Watch {
        /// Write each refreshed dashboard to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the latest calibrated reading
    Snapshot,
}

pub(crate) async fn dispatch(args: Args) -> Result<()> {
    let settings = SettingsStore::new(args.settings.clone())?;

    match args.command {
        Command::Harvest { simulate } => {
            if !simulate {
                bail!("no hardware board driver is built in; run `harvest --simulate`");
            }
            settings.ensure_file()?;
            let db = Database::new(args.database)?;
            harvest_until_interrupted(&settings, db).await
        }
        Command::Report { today } => {
            let db = Database::new(args.database)?;
            let config = settings.analysis();
            let today = today
                .unwrap_or_else(|| Utc::now().with_timezone(&config.utc_offset()).date_naive());
            let dashboard = build_dashboard(&db, &config, today).await?;
            println!("{}", serde_json::to_string_pretty(&dashboard)?);
            Ok(())
        }
        Command::Watch { output } => {
            settings.ensure_file()?;
            let db = Database::new(args.database)?;
            watch_until_interrupted(&settings, db, output).await
        }
        Command::Snapshot => {
            let db = Database::new(args.database)?;
            let config = settings.analysis();
            match db.latest(1).await?.first() {
                Some(reading) => {
                    let snapshot = Snapshot::from_reading(reading, &config.calibration);
                    let condition =
                        classify_lighting(reading.light, red_to_blue(&reading.rgb), &config.lighting);
                    let labels = snapshot.labels();
                    println!("Time:        {}", snapshot.timestamp);
                    println!("Temperature: {}", labels.ambient_temperature);
                    println!("CPU:         {}", labels.cpu_temperature);
                    println!("Light:       {}", labels.light);
                    println!("Pressure:    {}", labels.pressure);
                    println!("RGB:         {}", labels.rgb);
                    println!("Lighting:    {}", condition.as_str());
                }
                None => println!("No readings yet"),
            }
            Ok(())
        }
    }
}

async fn harvest_until_interrupted(settings: &SettingsStore, db: Database) -> Result<()> {
    let harvest_settings = settings.harvest();
    let interval = harvest::capture_interval(&settings.analysis())?;
    let probe = Probe::new(
        SimulatedBoard::new(),
        CpuThermometer::new(harvest_settings.thermal_zone_path.clone()),
    );

    let mut controller = HarvestController::new();
    controller.start(
        probe,
        harvest::status_signal(&harvest_settings),
        db,
        interval,
    )?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    let stored = controller.stop().await?;
    info!("harvest stopped; {stored} readings stored");
    Ok(())
}

async fn watch_until_interrupted(
    settings: &SettingsStore,
    db: Database,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut controller = DashboardController::new(db, settings.analysis());
    if let Some(path) = output {
        controller = controller.with_output(path);
    }

    let period = std::time::Duration::from_millis(settings.dashboard().refresh_interval_ms);
    controller.start(period).await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    controller.stop().await?;
    let state = controller.get_state().await;
    info!(
        "watch stopped after {} refreshes ({} failed)",
        state.refreshes, state.failures
    );
    Ok(())
}
