//! Informational labels for a consumption profile.
//!
//! The band edges are policy constants rather than statistics of the data, so
//! they live in [`ClassificationBands`] and can be overridden from the
//! `[classification]` configuration table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Band edges for both classifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassificationBands {
    /// Upper edges (exclusive) of the very-stable, moderately-stable and
    /// unstable bands, as coefficients of variation.
    pub stability: [f64; 3],
    /// Upper edges (exclusive, kWh/month) of the rural, residential,
    /// small-commercial and small-industrial bands.
    pub consumer_kwh: [f64; 4],
}

impl Default for ClassificationBands {
    fn default() -> Self {
        Self {
            stability: [0.10, 0.20, 0.30],
            consumer_kwh: [50.0, 120.0, 800.0, 5000.0],
        }
    }
}

impl ClassificationBands {
    /// Returns `true` if both edge lists are finite and strictly increasing.
    pub fn is_ascending(&self) -> bool {
        strictly_ascending(&self.stability) && strictly_ascending(&self.consumer_kwh)
    }

    /// Classifies month-to-month variability from `stddev / mean`.
    pub fn stability(&self, coefficient_of_variation: f64) -> StabilityLabel {
        let [very, moderate, unstable] = self.stability;
        let cv = coefficient_of_variation;
        if cv < very {
            StabilityLabel::VeryStable
        } else if cv < moderate {
            StabilityLabel::ModeratelyStable
        } else if cv < unstable {
            StabilityLabel::Unstable
        } else {
            StabilityLabel::HighlyUnstable
        }
    }

    /// Classifies the consumer from mean monthly consumption (kWh).
    pub fn consumer_class(&self, mean_kwh: f64) -> ConsumerClass {
        let [rural, residential, commercial, industrial] = self.consumer_kwh;
        if mean_kwh < rural {
            ConsumerClass::RuralOffGrid
        } else if mean_kwh < residential {
            ConsumerClass::Residential
        } else if mean_kwh < commercial {
            ConsumerClass::SmallCommercial
        } else if mean_kwh < industrial {
            ConsumerClass::SmallIndustrial
        } else {
            ConsumerClass::OutOfRange
        }
    }
}

fn strictly_ascending(edges: &[f64]) -> bool {
    edges.iter().all(|e| e.is_finite()) && edges.windows(2).all(|w| w[0] < w[1])
}

/// Month-to-month consumption variability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityLabel {
    VeryStable,
    ModeratelyStable,
    Unstable,
    HighlyUnstable,
}

impl StabilityLabel {
    pub fn description(self) -> &'static str {
        match self {
            Self::VeryStable => "very stable, constant monthly consumption",
            Self::ModeratelyStable => "moderately stable, small fluctuations expected",
            Self::Unstable => "unstable, noticeable monthly changes",
            Self::HighlyUnstable => "highly unstable, review consumption habits",
        }
    }
}

impl fmt::Display for StabilityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Consumer category by mean monthly consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerClass {
    RuralOffGrid,
    Residential,
    SmallCommercial,
    SmallIndustrial,
    OutOfRange,
}

impl ConsumerClass {
    pub fn description(self) -> &'static str {
        match self {
            Self::RuralOffGrid => "rural/off-grid, energy autonomy preferred",
            Self::Residential => "urban residential, zero export recommended",
            Self::SmallCommercial => "small commercial, net billing possible",
            Self::SmallIndustrial => "small industrial, detailed technical report required",
            Self::OutOfRange => "outside the small-consumer range",
        }
    }
}

impl fmt::Display for ConsumerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
