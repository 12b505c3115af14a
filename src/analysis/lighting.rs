use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Reading, Rgb};

use super::config::LightingThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightingCondition {
    HighNaturalLight,
    LedLight,
    LowNaturalLight,
    NoLight,
}

impl LightingCondition {
    /// Every condition, in chart legend order.
    pub const ALL: [LightingCondition; 4] = [
        LightingCondition::HighNaturalLight,
        LightingCondition::LedLight,
        LightingCondition::LowNaturalLight,
        LightingCondition::NoLight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LightingCondition::HighNaturalLight => "high_natural_light",
            LightingCondition::LedLight => "led_light",
            LightingCondition::LowNaturalLight => "low_natural_light",
            LightingCondition::NoLight => "no_light",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            LightingCondition::HighNaturalLight => 0,
            LightingCondition::LedLight => 1,
            LightingCondition::LowNaturalLight => 2,
            LightingCondition::NoLight => 3,
        }
    }
}

/// `red / blue`, or 0 when either channel is missing, blue is zero, or the
/// quotient is otherwise not finite.
pub fn red_to_blue(rgb: &Rgb) -> f64 {
    match (rgb.red, rgb.blue) {
        (Some(red), Some(blue)) if blue != 0 => {
            let ratio = red as f64 / blue as f64;
            if ratio.is_finite() {
                ratio
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Label a reading from its lux level and red/blue ratio.
///
/// Rules run as an ordered list and a later match overwrites an earlier one:
/// first the lux bands, then the colour overrides. Warm light above the LED
/// band is still LED; cool light inside the band is dim daylight. The second
/// override uses a strict upper bound, so a reading exactly at `bright_lux`
/// keeps its LED label.
pub fn classify_lighting(
    light: f64,
    red_to_blue: f64,
    thresholds: &LightingThresholds,
) -> LightingCondition {
    let LightingThresholds {
        dark_lux,
        dim_lux,
        bright_lux,
        red_blue_ratio,
    } = *thresholds;

    // Negative or missing lux has no band of its own.
    let mut condition = LightingCondition::NoLight;

    if light > dark_lux && light <= dim_lux {
        condition = LightingCondition::LowNaturalLight;
    }
    if light > dim_lux && light <= bright_lux {
        condition = LightingCondition::LedLight;
    }
    if light > bright_lux {
        condition = LightingCondition::HighNaturalLight;
    }

    if red_to_blue > red_blue_ratio && light > bright_lux {
        condition = LightingCondition::LedLight;
    }
    if red_to_blue < red_blue_ratio && light > dim_lux && light < bright_lux {
        condition = LightingCondition::LowNaturalLight;
    }

    condition
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabeledReading {
    pub timestamp: DateTime<Utc>,
    pub light: f64,
    pub red_to_blue: f64,
    pub condition: LightingCondition,
}

/// Classify every reading, in ascending timestamp order.
pub fn label_readings(readings: &[Reading], thresholds: &LightingThresholds) -> Vec<LabeledReading> {
    let mut labeled: Vec<LabeledReading> = readings
        .iter()
        .map(|reading| {
            let ratio = red_to_blue(&reading.rgb);
            LabeledReading {
                timestamp: reading.timestamp,
                light: reading.light,
                red_to_blue: ratio,
                condition: classify_lighting(reading.light, ratio, thresholds),
            }
        })
        .collect();
    labeled.sort_by_key(|l| l.timestamp);
    labeled
}

#[cfg(test)]
mod tests {
    use super::*;
    use LightingCondition::*;

    fn classify(light: f64, ratio: f64) -> LightingCondition {
        classify_lighting(light, ratio, &LightingThresholds::default())
    }

    #[test]
    fn names_match_serialized_form() {
        for condition in LightingCondition::ALL {
            let json = serde_json::to_string(&condition).unwrap();
            assert_eq!(json, format!("\"{}\"", condition.as_str()));
        }
    }

    #[test]
    fn base_bands() {
        assert_eq!(classify(0.0, 0.0), NoLight);
        assert_eq!(classify(50.0, 1.7), LowNaturalLight);
        assert_eq!(classify(100.0, 1.7), LowNaturalLight);
        assert_eq!(classify(115.0, 1.7), LedLight);
        assert_eq!(classify(200.0, 1.7), HighNaturalLight);
    }

    #[test]
    fn warm_bright_light_is_led() {
        assert_eq!(classify(200.0, 2.0), LedLight);
        assert_eq!(classify(115.0, 2.0), LedLight);
    }

    #[test]
    fn cool_light_in_led_band_is_natural() {
        assert_eq!(classify(115.0, 1.0), LowNaturalLight);
    }

    #[test]
    fn cool_bright_light_stays_natural() {
        assert_eq!(classify(200.0, 0.5), HighNaturalLight);
    }

    #[test]
    fn band_edges_follow_rule_order() {
        // Exactly at the top of the LED band the cool override does not fire.
        assert_eq!(classify(130.0, 1.0), LedLight);
        // And the warm override needs strictly more than the band top.
        assert_eq!(classify(130.0, 3.0), LedLight);
        assert_eq!(classify(130.5, 3.0), LedLight);
        assert_eq!(classify(130.5, 1.0), HighNaturalLight);
    }

    #[test]
    fn unusable_lux_is_no_light() {
        assert_eq!(classify(-3.0, 2.0), NoLight);
        assert_eq!(classify(f64::NAN, 2.0), NoLight);
    }

    #[test]
    fn ratio_falls_back_to_zero() {
        assert_eq!(red_to_blue(&Rgb::new(120, 40, 60)), 2.0);
        assert_eq!(red_to_blue(&Rgb::new(120, 40, 0)), 0.0);
        assert_eq!(red_to_blue(&Rgb::parse("120,40,")), 0.0);
        assert_eq!(red_to_blue(&Rgb::parse(",40,60")), 0.0);
    }

    #[test]
    fn zero_blue_never_counts_as_warm() {
        // A ratio of 0 keeps bright light natural rather than forcing LED.
        assert_eq!(classify(500.0, red_to_blue(&Rgb::new(255, 10, 0))), HighNaturalLight);
    }
}
