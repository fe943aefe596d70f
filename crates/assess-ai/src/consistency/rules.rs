use std::collections::BTreeMap;

use serde_json::Value;

use super::{ConsistencyIssue, Severity};
use crate::scoring::numeric_value;

type ResponseMap = BTreeMap<String, Value>;

/// One cross-item invariant. `check` returns `None` when an operand is
/// missing, which skips the rule rather than flagging it.
struct ConsistencyRule {
    id: &'static str,
    description: &'static str,
    items: &'static [&'static str],
    check: fn(&ResponseMap) -> Option<bool>,
}

fn operand(responses: &ResponseMap, code: &str) -> Option<f64> {
    responses.get(code).and_then(numeric_value)
}

const RULES: &[ConsistencyRule] = &[
    ConsistencyRule {
        id: "staff_count_vs_phd",
        description: "PhD staff cannot exceed total academic staff",
        items: &["TL07", "TL06"],
        check: |responses| {
            let phd = operand(responses, "TL07")?;
            let total = operand(responses, "TL06")?;
            Some(phd <= total)
        },
    },
    ConsistencyRule {
        id: "flying_faculty_vs_staff",
        description: "Flying faculty cannot exceed total academic staff",
        items: &["TL09", "TL06"],
        check: |responses| {
            let flying = operand(responses, "TL09")?;
            let total = operand(responses, "TL06")?;
            Some(flying <= total)
        },
    },
    ConsistencyRule {
        id: "retention_plausibility",
        description: "Retention rate should be between 0-100%",
        items: &["TL04"],
        check: |responses| {
            let rate = operand(responses, "TL04")?;
            Some((0.0..=100.0).contains(&rate))
        },
    },
    ConsistencyRule {
        id: "employment_rate_plausibility",
        description: "Employment rate should be between 0-100%",
        items: &["SE04"],
        check: |responses| {
            let rate = operand(responses, "SE04")?;
            Some((0.0..=100.0).contains(&rate))
        },
    },
];

/// Evaluate the fixed rule battery. Rules with missing operands are skipped,
/// never reported as violations.
pub(crate) fn run_rule_checks(responses: &ResponseMap) -> Vec<ConsistencyIssue> {
    let mut issues = Vec::new();
    for rule in RULES {
        match (rule.check)(responses) {
            Some(true) | None => {}
            Some(false) => issues.push(ConsistencyIssue {
                severity: Severity::High,
                items_involved: rule.items.iter().map(|code| code.to_string()).collect(),
                description: rule.description.to_string(),
                recommendation: None,
                rule_id: Some(rule.id.to_string()),
            }),
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn responses(pairs: &[(&str, Value)]) -> ResponseMap {
        pairs
            .iter()
            .map(|(code, value)| (code.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn qualified_staff_exceeding_total_is_flagged_once() {
        let issues = run_rule_checks(&responses(&[
            ("TL07", json!({"value": 50})),
            ("TL06", json!({"value": 40})),
        ]));

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule_id.as_deref(), Some("staff_count_vs_phd"));
        assert_eq!(issues[0].severity, Severity::High);
        assert!(issues[0].items_involved.contains(&"TL07".to_string()));
    }

    #[test]
    fn consistent_counts_pass() {
        let issues = run_rule_checks(&responses(&[
            ("TL07", json!({"value": 20})),
            ("TL06", json!({"value": 40})),
            ("TL09", json!({"value": 5})),
        ]));
        assert!(issues.is_empty());
    }

    #[test]
    fn missing_operand_skips_the_rule() {
        // TL06 absent: neither staff rule can be evaluated.
        let issues = run_rule_checks(&responses(&[("TL07", json!({"value": 50}))]));
        assert!(issues.is_empty());
    }

    #[test]
    fn out_of_range_percentages_are_flagged() {
        let issues = run_rule_checks(&responses(&[
            ("TL04", json!({"value": 130})),
            ("SE04", json!({"value": -5})),
        ]));

        assert_eq!(issues.len(), 2);
        let ids: Vec<_> = issues.iter().filter_map(|i| i.rule_id.as_deref()).collect();
        assert!(ids.contains(&"retention_plausibility"));
        assert!(ids.contains(&"employment_rate_plausibility"));
    }

    #[test]
    fn unreadable_operand_skips_the_rule() {
        let issues = run_rule_checks(&responses(&[
            ("TL04", json!({"value": "not a number"})),
        ]));
        assert!(issues.is_empty());
    }
}
