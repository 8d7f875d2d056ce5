//! Demo price series for the dashboard and min/max scaling.
//!
//! Values are on a 0-100 scale. The series are placeholders until the
//! backend serves real prices.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const SPOT: &[u32] = &[41, 47, 55, 62, 58, 70, 66, 73, 79, 68, 64, 59];
const DAY: &[u32] = &[
    32, 44, 38, 61, 57, 52, 49, 65, 71, 69, 63, 60, 58, 55, 53, 51, 47, 42, 39, 36, 34, 33, 31, 30,
];
const WEEK: &[u32] = &[64, 61, 59, 63, 67, 72, 78];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Range {
    #[default]
    Spot,
    Day,
    Week,
}

impl Range {
    pub const ALL: [Range; 3] = [Range::Spot, Range::Day, Range::Week];

    pub fn demo_series(self) -> &'static [u32] {
        match self {
            Range::Spot => SPOT,
            Range::Day => DAY,
            Range::Week => WEEK,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Range::Spot => "spot",
            Range::Day => "day",
            Range::Week => "week",
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Range {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Range::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown range '{}' (expected spot, day or week)", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SeriesStats {
    pub min: u32,
    pub max: u32,
}

impl SeriesStats {
    /// `None` for an empty series.
    pub fn of(series: &[u32]) -> Option<Self> {
        let min = *series.iter().min()?;
        let max = *series.iter().max()?;
        Some(Self { min, max })
    }

    /// Position of `value` within `[min, max]` as `0.0..=1.0`.
    /// A flat series sits in the middle.
    pub fn scale(&self, value: u32) -> f64 {
        if self.max == self.min {
            return 0.5;
        }
        let clamped = value.clamp(self.min, self.max);
        f64::from(clamped - self.min) / f64::from(self.max - self.min)
    }
}

pub fn scaled(series: &[u32]) -> Vec<f64> {
    match SeriesStats::of(series) {
        Some(stats) => series.iter().map(|&v| stats.scale(v)).collect(),
        None => Vec::new(),
    }
}

/// Bar heights for a chart `height` units tall.
pub fn bar_heights(series: &[u32], height: f64) -> Vec<f64> {
    scaled(series).into_iter().map(|s| s * height).collect()
}
