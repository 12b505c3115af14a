use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Reading;

use super::config::{AnomalyConfig, Signal};
use super::rolling::{rolling_baseline, Baseline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnomalyLabel {
    Normal,
    Anomalous,
}

impl AnomalyLabel {
    pub fn is_anomalous(&self) -> bool {
        matches!(self, AnomalyLabel::Anomalous)
    }
}

/// Flags `value` when it falls strictly outside the baseline bounds.
///
/// Without a baseline (the window has not filled yet, or it held missing data)
/// the reading is `Normal`: warm-up never produces an alert. A missing value is
/// also `Normal`.
pub fn classify(value: f64, baseline: Option<&Baseline>) -> AnomalyLabel {
    match baseline {
        Some(b) if value > b.upper_bound || value < b.lower_bound => AnomalyLabel::Anomalous,
        _ => AnomalyLabel::Normal,
    }
}

/// [`classify`] from a raw mean, standard deviation and multiplier.
pub fn classify_value(
    value: f64,
    mean: Option<f64>,
    std_dev: Option<f64>,
    threshold: f64,
) -> AnomalyLabel {
    let baseline = mean
        .zip(std_dev)
        .map(|(mean, std)| Baseline::new(mean, std, threshold));
    classify(value, baseline.as_ref())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Absent during warm-up.
    pub baseline: Option<Baseline>,
    pub label: AnomalyLabel,
}

/// One signal of a reading window with its rolling baseline and labels, in
/// ascending timestamp order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalySeries {
    pub signal: Signal,
    pub lag: usize,
    pub threshold: f64,
    pub points: Vec<AnomalyPoint>,
}

impl AnomalySeries {
    pub fn anomalies(&self) -> impl Iterator<Item = &AnomalyPoint> {
        self.points.iter().filter(|p| p.label.is_anomalous())
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies().count()
    }
}

/// Sort the window by timestamp, compute the trailing baseline of the
/// configured signal and label every reading.
pub fn detect_anomalies(readings: &[Reading], config: &AnomalyConfig) -> AnomalySeries {
    let mut ordered: Vec<&Reading> = readings.iter().collect();
    ordered.sort_by_key(|r| r.timestamp);

    let values: Vec<f64> = ordered.iter().map(|r| config.signal.extract(r)).collect();
    let baselines = rolling_baseline(&values, config.lag, config.threshold);

    let points = ordered
        .iter()
        .zip(values)
        .zip(baselines)
        .map(|((reading, value), baseline)| AnomalyPoint {
            timestamp: reading.timestamp,
            value,
            label: classify(value, baseline.as_ref()),
            baseline,
        })
        .collect();

    AnomalySeries {
        signal: config.signal,
        lag: config.lag,
        threshold: config.threshold,
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Acceleration, Rgb};
    use chrono::{Duration, TimeZone};

    fn cpu_series(values: &[f64]) -> Vec<Reading> {
        let start = Utc.with_ymd_and_hms(2019, 8, 12, 8, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &cpu_temp)| Reading {
                id: Some(i as i64),
                timestamp: start + Duration::seconds(i as i64 * 5),
                light: 80.0,
                rgb: Rgb::new(100, 80, 60),
                accelerometer: Acceleration::new(0.0, 0.0, 1.0),
                ambient_temp: 28.0,
                pressure: 101_000.0,
                cpu_temp,
            })
            .collect()
    }

    #[test]
    fn outside_bounds_is_anomalous() {
        let baseline = Baseline::new(10.0, 1.0, 2.0);
        assert_eq!(classify(12.5, Some(&baseline)), AnomalyLabel::Anomalous);
        assert_eq!(classify(7.5, Some(&baseline)), AnomalyLabel::Anomalous);
        assert_eq!(classify(11.0, Some(&baseline)), AnomalyLabel::Normal);
    }

    #[test]
    fn bounds_are_inclusive() {
        let baseline = Baseline::new(10.0, 1.0, 2.0);
        assert_eq!(classify(12.0, Some(&baseline)), AnomalyLabel::Normal);
        assert_eq!(classify(8.0, Some(&baseline)), AnomalyLabel::Normal);
    }

    #[test]
    fn warm_up_is_always_normal() {
        assert_eq!(classify(1e9, None), AnomalyLabel::Normal);
        assert_eq!(
            classify_value(1e9, None, Some(1.0), 3.5),
            AnomalyLabel::Normal
        );
        assert_eq!(
            classify_value(1e9, Some(0.0), None, 3.5),
            AnomalyLabel::Normal
        );
    }

    #[test]
    fn missing_value_is_normal() {
        let baseline = Baseline::new(10.0, 1.0, 2.0);
        assert_eq!(classify(f64::NAN, Some(&baseline)), AnomalyLabel::Normal);
    }

    #[test]
    fn constant_series_has_no_anomalies() {
        let readings = cpu_series(&[48.0; 120]);
        let series = detect_anomalies(&readings, &AnomalyConfig::default());

        assert_eq!(series.points.len(), 120);
        assert_eq!(series.anomaly_count(), 0);
        assert!(series.points[..49].iter().all(|p| p.baseline.is_none()));
        assert!(series.points[49..]
            .iter()
            .all(|p| p.baseline.map(|b| b.std_dev) == Some(0.0)));
    }

    #[test]
    fn single_outlier_is_flagged_only_at_its_index() {
        let mut values = vec![45.0; 150];
        values[80] = 95.0;
        let series = detect_anomalies(&cpu_series(&values), &AnomalyConfig::default());

        let flagged: Vec<usize> = series
            .points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.label.is_anomalous())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(flagged, vec![80]);
    }

    #[test]
    fn outlier_during_warm_up_is_not_flagged() {
        let mut values = vec![45.0; 100];
        values[10] = 95.0;
        let series = detect_anomalies(&cpu_series(&values), &AnomalyConfig::default());
        assert_eq!(series.anomaly_count(), 0);
    }

    #[test]
    fn input_is_sorted_before_rolling() {
        let mut values = vec![45.0; 60];
        values[55] = 90.0;
        let mut readings = cpu_series(&values);
        readings.reverse();

        let series = detect_anomalies(&readings, &AnomalyConfig::default());
        assert!(series
            .points
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
        let flagged: Vec<f64> = series.anomalies().map(|p| p.value).collect();
        assert_eq!(flagged, vec![90.0]);
    }

    #[test]
    fn bounds_hold_for_every_defined_point() {
        let values: Vec<f64> = (0..300)
            .map(|i| 50.0 + ((i * 17) % 13) as f64 * 0.4)
            .collect();
        let series = detect_anomalies(&cpu_series(&values), &AnomalyConfig::default());

        for baseline in series.points.iter().filter_map(|p| p.baseline) {
            assert!(baseline.lower_bound <= baseline.moving_average);
            assert!(baseline.moving_average <= baseline.upper_bound);
        }
    }

    #[test]
    fn selected_signal_drives_detection() {
        let mut readings = cpu_series(&[45.0; 60]);
        readings[59].rgb.red = Some(250);
        let config = AnomalyConfig {
            signal: Signal::Red,
            ..AnomalyConfig::default()
        };

        let series = detect_anomalies(&readings, &config);
        assert_eq!(series.signal, Signal::Red);
        assert_eq!(series.anomaly_count(), 1);
        assert_eq!(series.points[59].value, 250.0);
    }
}
