pub mod analysis;
mod cli;
pub mod dashboard;
pub mod db;
pub mod harvest;
pub mod settings;
mod utils;

pub use analysis::{build_dashboard, AnalysisConfig, Dashboard, ReadingSource};
pub use db::Database;
pub use settings::SettingsStore;

use clap::Parser;

/// Entry point for the `enviro-monitor` binary.
pub fn run() -> anyhow::Result<()> {
    let debug_mode = std::env::var("ENVIRO_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // RUST_LOG still overrides the default level.
    env_logger::Builder::new()
        .filter_level(if debug_mode {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let args = cli::Args::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(cli::dispatch(args))
}
