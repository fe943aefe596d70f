//! Two-level weighted aggregation: item scores into theme scores, theme
//! scores into the overall score.

use std::collections::HashMap;

use crate::assessment::{AssessmentSnapshot, ItemCode, ScoredAnswer, ThemeScore};
use crate::calc::round2;

/// Recompute every theme score from scratch for one run. Only answers with a
/// non-null score participate; a theme where nothing scored gets a null
/// ThemeScore so missing data never silently biases the weighted mean.
///
/// The overall score is the plain sum of non-null weighted theme scores and
/// is `None` only when every theme is null. It is not renormalised against
/// the subset of themes that scored; callers treat a partial overall score as
/// provisional.
pub fn aggregate_theme_scores(
    snapshot: &AssessmentSnapshot,
    scored: &[ScoredAnswer],
) -> (Vec<ThemeScore>, Option<f64>) {
    let score_by_code: HashMap<&ItemCode, f64> = scored
        .iter()
        .filter_map(|answer| answer.score.map(|score| (&answer.item_code, score)))
        .collect();

    let mut theme_scores = Vec::with_capacity(snapshot.themes.len());
    for theme in &snapshot.themes {
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;

        for item in snapshot.items.iter().filter(|item| item.theme_id == theme.id) {
            if let Some(score) = score_by_code.get(&item.code) {
                weighted_sum += score * item.weight;
                total_weight += item.weight;
            }
        }

        let normalised_score = if total_weight > 0.0 {
            Some(round2(weighted_sum / total_weight))
        } else {
            None
        };
        let weighted_score = normalised_score.map(|score| round2(score * theme.weight));

        theme_scores.push(ThemeScore {
            theme_id: theme.id.clone(),
            normalised_score,
            weighted_score,
        });
    }

    let mut any_scored = false;
    let mut overall = 0.0;
    for theme_score in &theme_scores {
        if let Some(weighted) = theme_score.weighted_score {
            any_scored = true;
            overall += weighted;
        }
    }
    let overall_score = any_scored.then(|| round2(overall));

    (theme_scores, overall_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{
        Assessment, AssessmentId, AssessmentStatus, FieldType, Item, Theme, ThemeId,
    };

    fn item(code: &str, theme: &str, weight: f64) -> Item {
        Item {
            code: ItemCode::new(code),
            theme_id: ThemeId(theme.to_string()),
            label: code.to_string(),
            field_type: FieldType::Numeric,
            scoring_rubric: None,
            weight,
            is_required: false,
        }
    }

    fn scored(code: &str, score: Option<f64>) -> ScoredAnswer {
        ScoredAnswer {
            item_code: ItemCode::new(code),
            score,
            feedback: String::new(),
        }
    }

    fn snapshot(themes: Vec<Theme>, items: Vec<Item>) -> AssessmentSnapshot {
        AssessmentSnapshot {
            assessment: Assessment {
                id: AssessmentId("a-1".to_string()),
                status: AssessmentStatus::Submitted,
                overall_score: None,
            },
            themes,
            items,
            answers: Vec::new(),
        }
    }

    #[test]
    fn unscored_items_do_not_dilute_the_weighted_mean() {
        let snapshot = snapshot(
            vec![Theme {
                id: ThemeId("financial".to_string()),
                name: "Financial".to_string(),
                weight: 0.15,
            }],
            vec![
                item("FN01", "financial", 1.0),
                item("FN02", "financial", 1.0),
                item("FN03", "financial", 2.0),
            ],
        );
        let scored_answers = vec![
            scored("FN01", Some(100.0)),
            scored("FN02", Some(50.0)),
            scored("FN03", None),
        ];

        let (theme_scores, overall) = aggregate_theme_scores(&snapshot, &scored_answers);

        // (100*1 + 50*1) / (1+1), the weight-2 unscored item is excluded.
        assert_eq!(theme_scores[0].normalised_score, Some(75.0));
        assert_eq!(theme_scores[0].weighted_score, Some(round2(75.0 * 0.15)));
        assert_eq!(overall, Some(round2(75.0 * 0.15)));
    }

    #[test]
    fn theme_with_no_scored_answers_is_null() {
        let snapshot = snapshot(
            vec![
                Theme {
                    id: ThemeId("governance".to_string()),
                    name: "Governance".to_string(),
                    weight: 0.2,
                },
                Theme {
                    id: ThemeId("impact".to_string()),
                    name: "Impact".to_string(),
                    weight: 0.15,
                },
            ],
            vec![item("GV01", "governance", 1.0), item("IM01", "impact", 1.0)],
        );
        let scored_answers = vec![scored("GV01", Some(80.0)), scored("IM01", None)];

        let (theme_scores, overall) = aggregate_theme_scores(&snapshot, &scored_answers);

        assert_eq!(theme_scores[0].normalised_score, Some(80.0));
        assert_eq!(theme_scores[1].normalised_score, None);
        assert_eq!(theme_scores[1].weighted_score, None);
        // Missing theme contributes zero, not an invalidated result.
        assert_eq!(overall, Some(16.0));
    }

    #[test]
    fn overall_is_null_only_when_every_theme_is_null() {
        let snapshot = snapshot(
            vec![Theme {
                id: ThemeId("impact".to_string()),
                name: "Impact".to_string(),
                weight: 0.15,
            }],
            vec![item("IM01", "impact", 1.0)],
        );

        let (theme_scores, overall) = aggregate_theme_scores(&snapshot, &[scored("IM01", None)]);

        assert_eq!(theme_scores[0].normalised_score, None);
        assert_eq!(overall, None);
    }

    #[test]
    fn overall_sums_weighted_theme_scores() {
        let snapshot = snapshot(
            vec![
                Theme {
                    id: ThemeId("teaching-learning".to_string()),
                    name: "Teaching".to_string(),
                    weight: 0.25,
                },
                Theme {
                    id: ThemeId("financial".to_string()),
                    name: "Financial".to_string(),
                    weight: 0.15,
                },
            ],
            vec![
                item("TL01", "teaching-learning", 1.0),
                item("FN01", "financial", 1.0),
            ],
        );
        let scored_answers = vec![scored("TL01", Some(80.0)), scored("FN01", Some(60.0))];

        let (_, overall) = aggregate_theme_scores(&snapshot, &scored_answers);

        // 80*0.25 + 60*0.15
        assert_eq!(overall, Some(29.0));
    }
}
