use std::collections::BTreeMap;

use serde_json::Value;

use super::{Rubric, ScoreOutcome};
use crate::calc::{linear_trend, round1, TrendDirection};

const BASE_SCORE: f64 = 60.0;
const TREND_BONUS: f64 = 20.0;

/// Score a multi-year series by fitting a linear trend and comparing its
/// direction against the rubric's ideal. Fewer than two usable data points
/// yields a neutral 50 rather than a computed trend.
pub(crate) fn score(value: &Value, rubric: Option<&Rubric>) -> ScoreOutcome {
    let Some(Rubric::TimeseriesTrend { ideal_direction }) = rubric else {
        return ScoreOutcome::unscored("No timeseries trend rubric is configured for this item.");
    };

    let totals = yearly_totals(value);
    if totals.len() < 2 {
        return ScoreOutcome::scored(50.0, "Insufficient data points for trend analysis.");
    }

    // Two or more points, so the fit always succeeds.
    let Some(trend) = linear_trend(&totals) else {
        return ScoreOutcome::scored(50.0, "Insufficient data points for trend analysis.");
    };

    let bonus = if trend.direction == *ideal_direction {
        TREND_BONUS
    } else if trend.direction == TrendDirection::Stable {
        0.0
    } else {
        -TREND_BONUS
    };

    let score = round1((BASE_SCORE + bonus).clamp(0.0, 100.0));

    let pct = match trend.pct_change {
        Some(pct) => format!("{pct}%"),
        None => "N/A".to_string(),
    };
    let assessment_note = if trend.direction == *ideal_direction {
        "Positive trend aligns with expectations."
    } else {
        "Trend direction is concerning."
    };

    ScoreOutcome::scored(
        score,
        format!(
            "Trend: {} ({pct} change). {assessment_note}",
            trend.direction.label()
        ),
    )
}

/// Collapse the `years` payload into ordered totals. Each year's value may be
/// a bare number or a map of sub-category counts (e.g. gendered enrollment)
/// that are summed; anything else is ignored.
pub(crate) fn yearly_totals(value: &Value) -> Vec<f64> {
    let Some(years) = value.as_object().and_then(|map| map.get("years")).and_then(Value::as_object)
    else {
        return Vec::new();
    };

    let ordered: BTreeMap<&String, &Value> = years.iter().collect();
    let mut totals = Vec::with_capacity(ordered.len());
    for year_value in ordered.values() {
        match year_value {
            Value::Number(number) => {
                if let Some(total) = number.as_f64() {
                    totals.push(total);
                }
            }
            Value::Object(categories) => {
                let total: f64 = categories
                    .values()
                    .filter_map(|entry| entry.as_f64())
                    .sum();
                totals.push(total);
            }
            _ => {}
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rubric(ideal: TrendDirection) -> Rubric {
        Rubric::TimeseriesTrend {
            ideal_direction: ideal,
        }
    }

    #[test]
    fn growth_matching_ideal_earns_the_bonus() {
        let value = json!({"years": {"2021": 500, "2022": 540, "2023": 600}});
        let outcome = score(&value, Some(&rubric(TrendDirection::Increasing)));
        assert_eq!(outcome.score, Some(80.0));
        assert!(outcome.feedback.contains("increasing"));
    }

    #[test]
    fn wrong_direction_is_penalised() {
        let value = json!({"years": {"2021": 600, "2022": 540, "2023": 500}});
        let outcome = score(&value, Some(&rubric(TrendDirection::Increasing)));
        assert_eq!(outcome.score, Some(40.0));
        assert!(outcome.feedback.contains("concerning"));
    }

    #[test]
    fn stable_series_keeps_the_base_score() {
        let value = json!({"years": {"2021": 1000, "2022": 1001, "2023": 999}});
        let outcome = score(&value, Some(&rubric(TrendDirection::Increasing)));
        assert_eq!(outcome.score, Some(60.0));
    }

    #[test]
    fn gendered_sub_counts_are_summed_per_year() {
        let value = json!({"years": {
            "2021": {"male": 100, "female": 120},
            "2022": {"male": 130, "female": 150},
            "2023": {"male": 160, "female": 180},
        }});
        let outcome = score(&value, Some(&rubric(TrendDirection::Increasing)));
        assert_eq!(outcome.score, Some(80.0));
    }

    #[test]
    fn single_data_point_is_neutral() {
        let value = json!({"years": {"2023": 500}});
        let outcome = score(&value, Some(&rubric(TrendDirection::Increasing)));
        assert_eq!(outcome.score, Some(50.0));
        assert!(outcome.feedback.contains("Insufficient data"));
    }

    #[test]
    fn malformed_payload_is_neutral_insufficient_data() {
        let outcome = score(&json!({"no_years": true}), Some(&rubric(TrendDirection::Increasing)));
        assert_eq!(outcome.score, Some(50.0));
    }

    #[test]
    fn missing_rubric_is_unscored() {
        let value = json!({"years": {"2021": 1, "2022": 2}});
        assert_eq!(score(&value, None).score, None);
    }

    #[test]
    fn scaling_the_series_never_changes_the_classification() {
        let base = json!({"years": {"2021": 50, "2022": 60, "2023": 72}});
        let scaled = json!({"years": {"2021": 50000, "2022": 60000, "2023": 72000}});
        let a = score(&base, Some(&rubric(TrendDirection::Increasing)));
        let b = score(&scaled, Some(&rubric(TrendDirection::Increasing)));
        assert_eq!(a.score, b.score);
    }
}
