//! Demo template and assessment seeded into the in-memory repository so the
//! service is exercisable out of the box.

use assess_ai::assessment::{
    Answer, Assessment, AssessmentId, AssessmentSnapshot, AssessmentStatus, FieldType, Item,
    ItemCode, Theme, ThemeId,
};
use assess_ai::calc::TrendDirection;
use assess_ai::scoring::{Rubric, ScoreRange};
use serde_json::json;

fn theme(id: &str, name: &str, weight: f64) -> Theme {
    Theme {
        id: ThemeId(id.to_string()),
        name: name.to_string(),
        weight,
    }
}

fn item(
    code: &str,
    theme_id: &str,
    label: &str,
    field_type: FieldType,
    rubric: Option<Rubric>,
) -> Item {
    Item {
        code: ItemCode::new(code),
        theme_id: ThemeId(theme_id.to_string()),
        label: label.to_string(),
        field_type,
        scoring_rubric: rubric,
        weight: 1.0,
        is_required: true,
    }
}

fn range(min: Option<f64>, max: Option<f64>, score: f64) -> ScoreRange {
    ScoreRange { min, max, score }
}

/// A submitted assessment for a mid-sized institution, covering every scorer
/// and both analysis engines.
pub(crate) fn demo_assessment() -> AssessmentSnapshot {
    let themes = vec![
        theme("teaching-learning", "Teaching & Learning", 0.25),
        theme("student-experience", "Student Experience", 0.25),
        theme("governance", "Governance", 0.20),
        theme("impact", "Impact", 0.15),
        theme("financial", "Financial Sustainability", 0.15),
    ];

    let ssr_rubric = Rubric::NumericRange {
        ranges: vec![
            range(None, Some(15.0), 100.0),
            range(Some(15.0), Some(25.0), 75.0),
            range(Some(25.0), Some(35.0), 50.0),
            range(Some(35.0), None, 25.0),
        ],
    };
    let retention_rubric = Rubric::NumericRange {
        ranges: vec![
            range(Some(90.0), None, 100.0),
            range(Some(80.0), Some(90.0), 80.0),
            range(Some(70.0), Some(80.0), 60.0),
            range(None, Some(70.0), 30.0),
        ],
    };
    let employment_rubric = Rubric::NumericRange {
        ranges: vec![
            range(Some(80.0), None, 100.0),
            range(Some(60.0), Some(80.0), 70.0),
            range(None, Some(60.0), 40.0),
        ],
    };

    let items = vec![
        item(
            "TL03",
            "teaching-learning",
            "Total enrolled students",
            FieldType::Numeric,
            None,
        ),
        item(
            "TL04",
            "teaching-learning",
            "Student retention rate (%)",
            FieldType::Percentage,
            Some(retention_rubric),
        ),
        item(
            "TL05",
            "teaching-learning",
            "Student-staff ratio",
            FieldType::AutoCalculated,
            Some(ssr_rubric),
        ),
        item(
            "TL06",
            "teaching-learning",
            "Total academic staff",
            FieldType::Numeric,
            None,
        ),
        item(
            "TL07",
            "teaching-learning",
            "Academic staff holding a PhD",
            FieldType::Numeric,
            None,
        ),
        item(
            "TL09",
            "teaching-learning",
            "Flying faculty count",
            FieldType::Numeric,
            None,
        ),
        item(
            "SE01",
            "student-experience",
            "Student enrollment by year",
            FieldType::MultiYearSeries,
            Some(Rubric::TimeseriesTrend {
                ideal_direction: TrendDirection::Increasing,
            }),
        ),
        item(
            "SE03",
            "student-experience",
            "Do you run a structured student feedback programme?",
            FieldType::YesNoConditional,
            Some(Rubric::BinaryWithEvidence),
        ),
        item(
            "SE04",
            "student-experience",
            "Graduate employment rate (%)",
            FieldType::Percentage,
            Some(employment_rubric),
        ),
        item(
            "GV02",
            "governance",
            "Describe your quality assurance processes",
            FieldType::LongText,
            Some(Rubric::TextRubric {
                dimensions: vec![
                    "relevance".to_string(),
                    "specificity".to_string(),
                    "evidence".to_string(),
                    "comprehensiveness".to_string(),
                ],
            }),
        ),
        item(
            "IM01",
            "impact",
            "Describe your community engagement initiatives",
            FieldType::LongText,
            Some(Rubric::TextRubric { dimensions: Vec::new() }),
        ),
        item(
            "FN02",
            "financial",
            "Annual audited accounts",
            FieldType::FileUpload,
            None,
        ),
    ];

    let answers = vec![
        Answer::new(ItemCode::new("TL03"), json!({"value": 1850})),
        Answer::new(ItemCode::new("TL04"), json!({"value": 84})),
        Answer::new(ItemCode::new("TL05"), json!({"value": 23.1})),
        Answer::new(ItemCode::new("TL06"), json!({"value": 80})),
        Answer::new(ItemCode::new("TL07"), json!({"value": 28})),
        Answer::new(ItemCode::new("TL09"), json!({"value": 6})),
        Answer::new(
            ItemCode::new("SE01"),
            json!({"years": {"2021": 1520, "2022": 1640, "2023": 1780, "2024": 1850}}),
        ),
        Answer::new(
            ItemCode::new("SE03"),
            json!({
                "answer": true,
                "evidence": "Termly module evaluation surveys feed a published action log. \
                             Course representatives sit on every programme committee and the \
                             students' union co-chairs the annual learning and teaching review, \
                             with response rates and closure times tracked on a public dashboard."
            }),
        ),
        Answer::new(ItemCode::new("SE04"), json!({"value": 78})),
        Answer::new(
            ItemCode::new("GV02"),
            json!({
                "text": "Quality assurance is anchored in an annual programme review cycle \
                         overseen by the Academic Board. External examiners report on every \
                         award; their recommendations are tracked to closure within one term. \
                         A standing Quality Committee audits a third of all modules each year \
                         and publishes its findings internally."
            }),
        ),
        Answer::new(
            ItemCode::new("IM01"),
            json!({
                "text": "We operate a legal advice clinic staffed by final-year students, \
                         partner with four local schools on a mentoring scheme reaching 300 \
                         pupils a year, and host an annual open research festival."
            }),
        ),
        Answer::new(ItemCode::new("FN02"), json!({"file_id": "doc-4821"})),
    ];

    AssessmentSnapshot {
        assessment: Assessment {
            id: AssessmentId("demo-001".to_string()),
            status: AssessmentStatus::Submitted,
            overall_score: None,
        },
        themes,
        items,
        answers,
    }
}
