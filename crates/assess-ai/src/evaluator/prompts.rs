//! Prompt templates for rubric text scoring and the consistency model pass.
//! Both demand strict JSON so the callers can parse defensively.

pub const SCORE_TEXT_SYSTEM: &str = "You are an expert institutional quality assessor. \
You evaluate institutional responses against specific rubric dimensions. \
You must be fair, consistent, and evidence-based in your scoring. \
Always provide constructive feedback that helps institutions improve.";

pub const CONSISTENCY_SYSTEM: &str = "You are an expert institutional quality assessor \
performing a consistency check. Identify contradictions, implausible claims, and \
inconsistencies across assessment responses.";

/// Four-dimension rubric evaluation prompt. Each dimension is scored 0-25 for
/// a 0-100 total.
pub fn score_text_prompt(
    item_label: &str,
    item_code: &str,
    theme_name: &str,
    response_text: &str,
) -> String {
    format!(
        r#"Evaluate the following institutional response for the assessment item.

**Item**: {item_label}
**Item Code**: {item_code}
**Theme**: {theme_name}

**Institution's Response**:
{response_text}

**Scoring Rubric** - Score each dimension from 0-25:

1. **Relevance** (0-25): How relevant is the response to the specific question asked?
   - 25: Directly and comprehensively addresses all aspects
   - 18: Addresses most aspects with some detail
   - 10: Partially addresses but misses key aspects
   - 5: Barely addresses the question

2. **Specificity** (0-25): How specific and detailed is the response?
   - 25: Specific examples, numbers, names, concrete details
   - 18: Some specific details with occasional generalities
   - 10: Mostly generic statements
   - 5: Entirely vague

3. **Evidence of Quality** (0-25): Quality of evidence provided?
   - 25: Strong evidence: data, documented processes, external validation
   - 18: Reasonable evidence with some supporting data
   - 10: Limited evidence, mostly self-reported
   - 5: No evidence

4. **Comprehensiveness** (0-25): How complete is the response?
   - 25: Covers all expected aspects thoroughly
   - 18: Covers most expected aspects
   - 10: Covers some aspects but significant gaps
   - 5: Major gaps

Respond in exactly this JSON format:
{{
  "relevance": <0-25>,
  "specificity": <0-25>,
  "evidence": <0-25>,
  "comprehensiveness": <0-25>,
  "total_score": <0-100>,
  "strengths": ["<strength 1>", "<strength 2>"],
  "weaknesses": ["<weakness 1>", "<weakness 2>"],
  "feedback": "<2-3 sentences of constructive feedback>"
}}"#
    )
}

/// Cross-item contradiction detection over a JSON snapshot of answers.
pub fn consistency_prompt(assessment_data_json: &str) -> String {
    format!(
        r#"Review the following assessment responses for internal consistency.
Flag any contradictions, implausible claims, or inconsistencies.

**Assessment Data**:
{assessment_data_json}

Respond in JSON format:
{{
  "consistent": <true/false>,
  "issues": [
    {{
      "severity": "<high/medium/low>",
      "items_involved": ["<item_code_1>", "<item_code_2>"],
      "description": "<description of the inconsistency>",
      "recommendation": "<suggested resolution>"
    }}
  ],
  "overall_assessment": "<brief summary>"
}}"#
    )
}
