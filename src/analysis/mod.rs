pub mod anomaly;
pub mod config;
pub mod daily;
pub mod error;
pub mod lighting;
pub mod pipeline;
pub mod rolling;
pub mod snapshot;
pub mod source;

pub use anomaly::{classify, detect_anomalies, AnomalyLabel, AnomalySeries};
pub use config::{AnalysisConfig, AnomalyConfig, CalibrationConfig, LightingThresholds, Signal};
pub use daily::{aggregate_daily, DailyBucket};
pub use error::{ConfigError, StoreError};
pub use lighting::{classify_lighting, red_to_blue, LightingCondition};
pub use pipeline::{build_dashboard, Dashboard, Panel};
pub use rolling::{rolling_baseline, Baseline};
pub use snapshot::{sensor_series, Snapshot};
pub use source::ReadingSource;
