//! Derived-metric calculators shared by the timeseries scorer and the risk
//! engine: ratios, percentages, and the linear trend fit.

use serde::{Deserialize, Serialize};

/// Direction classification for a fitted series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub fn label(self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        }
    }
}

/// Ordinary-least-squares fit of a series against its index.
#[derive(Debug, Clone, PartialEq)]
pub struct Trend {
    pub slope: f64,
    pub direction: TrendDirection,
    pub pct_change: Option<f64>,
}

/// Fit `values` against 0..n and classify the direction. Returns `None` for
/// fewer than two points. The direction threshold is 1% of the series mean,
/// which keeps noise on near-flat series from flipping the classification; a
/// zero mean falls back to an absolute threshold of 0.01.
pub fn linear_trend(values: &[f64]) -> Option<Trend> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;

    let numerator: f64 = values
        .iter()
        .enumerate()
        .map(|(i, y)| (i as f64 - x_mean) * (y - y_mean))
        .sum();
    let denominator: f64 = (0..values.len())
        .map(|i| (i as f64 - x_mean).powi(2))
        .sum();

    let slope = if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    };

    let pct_change = if values[0] != 0.0 {
        Some(round1((values[values.len() - 1] - values[0]) / values[0] * 100.0))
    } else {
        None
    };

    let threshold = if y_mean != 0.0 { 0.01 * y_mean.abs() } else { 0.01 };
    let direction = if slope > threshold {
        TrendDirection::Increasing
    } else if slope < -threshold {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    Some(Trend {
        slope,
        direction,
        pct_change,
    })
}

/// Student-staff ratio. `None` when there are no staff to divide by.
pub fn student_staff_ratio(total_students: f64, total_academic_staff: f64) -> Option<f64> {
    if total_academic_staff == 0.0 {
        return None;
    }
    Some(round1(total_students / total_academic_staff))
}

/// Share of academic staff holding doctoral qualifications, in percent.
pub fn phd_percentage(phd_staff: f64, total_academic_staff: f64) -> Option<f64> {
    if total_academic_staff == 0.0 {
        return None;
    }
    Some(round1(phd_staff / total_academic_staff * 100.0))
}

/// Flying faculty as a share of total academic staff, in percent.
pub fn flying_faculty_percentage(flying_faculty: f64, total_academic_staff: f64) -> Option<f64> {
    if total_academic_staff == 0.0 {
        return None;
    }
    Some(round1(flying_faculty / total_academic_staff * 100.0))
}

/// Completion rate of an enrolled cohort, in percent.
pub fn retention_rate(enrolled: f64, completed: f64) -> Option<f64> {
    if enrolled == 0.0 {
        return None;
    }
    Some(round1(completed / enrolled * 100.0))
}

/// Graduate employment rate, in percent.
pub fn employment_rate(graduates: f64, employed_within_period: f64) -> Option<f64> {
    if graduates == 0.0 {
        return None;
    }
    Some(round1(employed_within_period / graduates * 100.0))
}

/// Gender split derived from absolute counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderSplit {
    pub male_pct: Option<f64>,
    pub female_pct: Option<f64>,
    pub total: f64,
}

pub fn gender_split(male: f64, female: f64) -> GenderSplit {
    let total = male + female;
    if total == 0.0 {
        return GenderSplit {
            male_pct: None,
            female_pct: None,
            total: 0.0,
        };
    }
    GenderSplit {
        male_pct: Some(round1(male / total * 100.0)),
        female_pct: Some(round1(female / total * 100.0)),
        total,
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
