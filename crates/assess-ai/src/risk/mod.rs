//! Rule-based institutional risk scoring.
//!
//! A fixed battery of expert-defined threshold rules turns assessment metrics
//! into a 0-1 risk score with named contributing factors. Rules whose inputs
//! are missing contribute nothing; absence of evidence is never risk.

use serde::{Deserialize, Serialize};

use crate::assessment::{AssessmentSnapshot, ItemCode, ThemeId, ThemeScore};
use crate::calc::{self, round3, TrendDirection};
use crate::scoring::yearly_totals;

/// Input metrics for one prediction. Every field is optional; callers supply
/// whatever they can derive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskMetrics {
    pub financial: Option<f64>,
    pub governance: Option<f64>,
    pub retention_rate: Option<f64>,
    pub ssr: Option<f64>,
    pub phd_pct: Option<f64>,
    pub enrollment_trend: Option<TrendDirection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// One active rule's contribution to the final score.
#[derive(Debug, Clone, Serialize)]
pub struct ContributingFactor {
    pub rule_id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub raw_score: f64,
    pub weighted_contribution: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskPrediction {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub contributing_factors: Vec<ContributingFactor>,
    pub rules_evaluated: usize,
}

struct RiskRule {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    weight: f64,
    evaluate: fn(&RiskMetrics) -> f64,
}

/// Linear ramp from 0 at `threshold` to 1 at `floor`, for metrics where lower
/// is worse.
fn shortfall(value: Option<f64>, threshold: f64) -> f64 {
    match value {
        Some(value) if value < threshold => ((threshold - value) / threshold).max(0.0),
        _ => 0.0,
    }
}

const RISK_RULES: &[RiskRule] = &[
    RiskRule {
        id: "low_financial_score",
        name: "Low Financial Sustainability Score",
        description: "Financial theme score below 40 indicates high financial risk",
        weight: 0.25,
        evaluate: |metrics| shortfall(metrics.financial, 40.0),
    },
    RiskRule {
        id: "declining_enrollment",
        name: "Declining Student Enrollment",
        description: "Decreasing enrollment trend over 4 years",
        weight: 0.20,
        evaluate: |metrics| {
            if metrics.enrollment_trend == Some(TrendDirection::Decreasing) {
                0.8
            } else {
                0.0
            }
        },
    },
    RiskRule {
        id: "low_retention",
        name: "Low Student Retention Rate",
        description: "Retention rate below 70%",
        weight: 0.15,
        evaluate: |metrics| shortfall(metrics.retention_rate, 70.0),
    },
    RiskRule {
        id: "high_ssr",
        name: "High Student-Staff Ratio",
        description: "SSR above 35 indicates understaffing risk",
        weight: 0.15,
        evaluate: |metrics| match metrics.ssr {
            Some(ssr) if ssr > 35.0 => ((ssr - 35.0) / 30.0).clamp(0.0, 1.0),
            _ => 0.0,
        },
    },
    RiskRule {
        id: "low_governance",
        name: "Weak Governance Score",
        description: "Governance theme score below 50 indicates governance risk",
        weight: 0.15,
        evaluate: |metrics| shortfall(metrics.governance, 50.0),
    },
    RiskRule {
        id: "low_staff_qualifications",
        name: "Low Staff Qualifications",
        description: "PhD percentage below 20% is concerning",
        weight: 0.10,
        evaluate: |metrics| shortfall(metrics.phd_pct, 20.0),
    },
];

/// Run the full rule battery over the supplied metrics.
pub fn predict(metrics: &RiskMetrics) -> RiskPrediction {
    let mut contributing_factors = Vec::new();
    let mut total_risk = 0.0;

    for rule in RISK_RULES {
        let raw_score = (rule.evaluate)(metrics);
        let weighted = raw_score * rule.weight;
        total_risk += weighted;

        if raw_score > 0.0 {
            contributing_factors.push(ContributingFactor {
                rule_id: rule.id,
                name: rule.name,
                description: rule.description,
                raw_score: round3(raw_score),
                weighted_contribution: round3(weighted),
            });
        }
    }

    let risk_score = round3(total_risk.clamp(0.0, 1.0));
    let risk_level = if risk_score >= 0.6 {
        RiskLevel::High
    } else if risk_score >= 0.3 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    contributing_factors.sort_by(|a, b| {
        b.weighted_contribution
            .partial_cmp(&a.weighted_contribution)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    RiskPrediction {
        risk_score,
        risk_level,
        contributing_factors,
        rules_evaluated: RISK_RULES.len(),
    }
}

/// Derive risk metrics from a scored assessment: theme scores feed the
/// financial and governance rules, staffing and cohort items feed the
/// derived ratios, and the enrollment series feeds the trend rule.
pub fn metrics_from_snapshot(
    snapshot: &AssessmentSnapshot,
    theme_scores: &[ThemeScore],
) -> RiskMetrics {
    let theme_score = |slug: &str| {
        theme_scores
            .iter()
            .find(|score| score.theme_id == ThemeId(slug.to_string()))
            .and_then(|score| score.normalised_score)
    };
    let numeric_answer = |code: &str| {
        snapshot
            .answer(&ItemCode::new(code))
            .and_then(|answer| crate::scoring::numeric_value(&answer.value))
    };

    let total_students = numeric_answer("TL03");
    let total_staff = numeric_answer("TL06");
    let phd_staff = numeric_answer("TL07");

    let ssr = match (total_students, total_staff) {
        (Some(students), Some(staff)) => calc::student_staff_ratio(students, staff),
        _ => None,
    };
    let phd_pct = match (phd_staff, total_staff) {
        (Some(phd), Some(staff)) => calc::phd_percentage(phd, staff),
        _ => None,
    };

    let enrollment_trend = snapshot
        .answer(&ItemCode::new("SE01"))
        .map(|answer| yearly_totals(&answer.value))
        .filter(|totals| totals.len() >= 2)
        .and_then(|totals| calc::linear_trend(&totals))
        .map(|trend| trend.direction);

    RiskMetrics {
        financial: theme_score("financial"),
        governance: theme_score("governance"),
        retention_rate: numeric_answer("TL04"),
        ssr,
        phd_pct,
        enrollment_trend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{Answer, Assessment, AssessmentId, AssessmentStatus};
    use serde_json::json;

    #[test]
    fn low_financial_score_alone() {
        let metrics = RiskMetrics {
            financial: Some(30.0),
            ..RiskMetrics::default()
        };

        let prediction = predict(&metrics);

        // 0.25 * (40 - 30) / 40
        assert_eq!(prediction.risk_score, 0.063);
        assert_eq!(prediction.risk_level, RiskLevel::Low);
        assert_eq!(prediction.contributing_factors.len(), 1);
        assert_eq!(prediction.contributing_factors[0].rule_id, "low_financial_score");
        assert_eq!(prediction.contributing_factors[0].raw_score, 0.25);
        assert_eq!(prediction.rules_evaluated, 6);
    }

    #[test]
    fn empty_metrics_score_zero() {
        let prediction = predict(&RiskMetrics::default());
        assert_eq!(prediction.risk_score, 0.0);
        assert_eq!(prediction.risk_level, RiskLevel::Low);
        assert!(prediction.contributing_factors.is_empty());
    }

    #[test]
    fn healthy_metrics_trigger_no_rules() {
        let metrics = RiskMetrics {
            financial: Some(75.0),
            governance: Some(80.0),
            retention_rate: Some(90.0),
            ssr: Some(18.0),
            phd_pct: Some(45.0),
            enrollment_trend: Some(TrendDirection::Increasing),
        };
        let prediction = predict(&metrics);
        assert_eq!(prediction.risk_score, 0.0);
        assert!(prediction.contributing_factors.is_empty());
    }

    #[test]
    fn compounding_factors_reach_high_risk() {
        let metrics = RiskMetrics {
            financial: Some(0.0),
            governance: Some(0.0),
            retention_rate: Some(0.0),
            ssr: Some(70.0),
            phd_pct: Some(0.0),
            enrollment_trend: Some(TrendDirection::Decreasing),
        };

        let prediction = predict(&metrics);

        // 0.25 + 0.8*0.20 + 0.15 + 0.15 + 0.15 + 0.10
        assert_eq!(prediction.risk_score, 0.96);
        assert_eq!(prediction.risk_level, RiskLevel::High);
        assert_eq!(prediction.contributing_factors.len(), 6);
    }

    #[test]
    fn factors_are_sorted_by_weighted_contribution() {
        let metrics = RiskMetrics {
            governance: Some(25.0),
            enrollment_trend: Some(TrendDirection::Decreasing),
            ..RiskMetrics::default()
        };

        let prediction = predict(&metrics);

        // declining_enrollment contributes 0.16, low_governance 0.075.
        assert_eq!(prediction.contributing_factors[0].rule_id, "declining_enrollment");
        assert_eq!(prediction.contributing_factors[1].rule_id, "low_governance");
        assert_eq!(prediction.risk_level, RiskLevel::Low);
    }

    #[test]
    fn medium_band_starts_at_point_three() {
        let metrics = RiskMetrics {
            financial: Some(0.0),
            governance: Some(25.0),
            ..RiskMetrics::default()
        };
        // 0.25 + 0.15 * 0.5 = 0.325
        let prediction = predict(&metrics);
        assert_eq!(prediction.risk_score, 0.325);
        assert_eq!(prediction.risk_level, RiskLevel::Medium);
    }

    fn snapshot_with(answers: Vec<Answer>) -> AssessmentSnapshot {
        AssessmentSnapshot {
            assessment: Assessment {
                id: AssessmentId("a-1".to_string()),
                status: AssessmentStatus::Scored,
                overall_score: None,
            },
            themes: Vec::new(),
            items: Vec::new(),
            answers,
        }
    }

    #[test]
    fn metrics_derive_from_answers_and_theme_scores() {
        let snapshot = snapshot_with(vec![
            Answer::new(ItemCode::new("TL03"), json!({"value": 900})),
            Answer::new(ItemCode::new("TL06"), json!({"value": 20})),
            Answer::new(ItemCode::new("TL07"), json!({"value": 5})),
            Answer::new(ItemCode::new("TL04"), json!({"value": 65})),
            Answer::new(
                ItemCode::new("SE01"),
                json!({"years": {"2021": 800, "2022": 700, "2023": 600}}),
            ),
        ]);
        let theme_scores = vec![
            ThemeScore {
                theme_id: ThemeId("financial".to_string()),
                normalised_score: Some(35.0),
                weighted_score: Some(5.25),
            },
            ThemeScore {
                theme_id: ThemeId("governance".to_string()),
                normalised_score: None,
                weighted_score: None,
            },
        ];

        let metrics = metrics_from_snapshot(&snapshot, &theme_scores);

        assert_eq!(metrics.financial, Some(35.0));
        assert_eq!(metrics.governance, None);
        assert_eq!(metrics.retention_rate, Some(65.0));
        assert_eq!(metrics.ssr, Some(45.0));
        assert_eq!(metrics.phd_pct, Some(25.0));
        assert_eq!(metrics.enrollment_trend, Some(TrendDirection::Decreasing));
    }

    #[test]
    fn missing_answers_leave_metrics_unset() {
        let metrics = metrics_from_snapshot(&snapshot_with(Vec::new()), &[]);
        assert!(metrics.financial.is_none());
        assert!(metrics.ssr.is_none());
        assert!(metrics.enrollment_trend.is_none());
    }
}
