//! Prompt Builder: pure functions that fill the templates in
//! `projection::prompts`. No I/O, no state.

use crate::llm_client::prompts::{
    HTML_WRAP_INSTRUCTION, JSON_NUMBERS_INSTRUCTION, JSON_ONLY_INSTRUCTION,
    PLAIN_NUMBERS_INSTRUCTION,
};
use crate::projection::models::{PathChoice, PlanFormat, RevisionFormat, Selections};
use crate::projection::preferences::PreferenceResponse;
use crate::projection::prompts::{
    CHART_PROMPT_TEMPLATE, EXPLANATION_PROMPT_TEMPLATE, PLAN_PROMPT_TEMPLATE,
    REVISION_PROMPT_TEMPLATE, SECTIONED_REVISION_PROMPT_TEMPLATE, TRANSITION_PROMPT_TEMPLATE,
};

/// Fills `{name}` slots in one left-to-right pass. Inserted values are never
/// rescanned, so braces inside user answers or prior responses stay literal.
/// Unknown `{...}` runs (JSON examples in the templates) are copied as is.
fn fill_template(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let slot = slots.iter().find(|(name, _)| {
            tail.starts_with(name) && tail[name.len()..].starts_with('}')
        });
        match slot {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn build_explanation_prompt(selections: &Selections) -> String {
    let bedrooms = selections.bedrooms.to_string();
    fill_template(
        EXPLANATION_PROMPT_TEMPLATE,
        &[
            ("institution", selections.institution.as_str()),
            ("field", selections.field.as_str()),
            ("zipcode", selections.zipcode.as_str()),
            ("occupation", selections.occupation.as_str()),
            ("area", selections.area.as_str()),
            ("bedrooms", bedrooms.as_str()),
            ("plain_numbers_instruction", PLAIN_NUMBERS_INSTRUCTION),
        ],
    )
}

/// Embeds the explanation response verbatim.
pub fn build_chart_prompt(explanation: &str) -> String {
    fill_template(
        CHART_PROMPT_TEMPLATE,
        &[
            ("numbers_instruction", JSON_NUMBERS_INSTRUCTION),
            ("json_only_instruction", JSON_ONLY_INSTRUCTION),
            ("explanation", explanation),
        ],
    )
}

/// Embeds both prior responses verbatim.
pub fn build_plan_prompt(explanation: &str, chart: &str, format: PlanFormat) -> String {
    let format_instruction = match format {
        PlanFormat::Text => "",
        PlanFormat::Html => HTML_WRAP_INSTRUCTION,
    };
    fill_template(
        PLAN_PROMPT_TEMPLATE,
        &[
            ("format_instruction", format_instruction),
            ("chart", chart),
            ("explanation", explanation),
        ],
    )
}

/// Renders the cumulative preference log as a bullet list, oldest first.
pub fn preference_context(history: &[PreferenceResponse]) -> String {
    history
        .iter()
        .map(|r| format!("- {}: {}", r.question, r.answer))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_revision_prompt(
    history: &[PreferenceResponse],
    explanation: &str,
    format: RevisionFormat,
) -> String {
    let template = match format {
        RevisionFormat::Chart => REVISION_PROMPT_TEMPLATE,
        RevisionFormat::Sectioned => SECTIONED_REVISION_PROMPT_TEMPLATE,
    };
    let preferences = preference_context(history);
    fill_template(
        template,
        &[
            ("preferences", preferences.as_str()),
            ("json_only_instruction", JSON_ONLY_INSTRUCTION),
            ("explanation", explanation),
        ],
    )
}

/// `transition_year` must already be validated to `1..=15`.
pub fn build_transition_prompt(
    original: &PathChoice,
    new_path: &PathChoice,
    transition_year: u32,
    original_chart: &str,
) -> String {
    let original_years = if transition_year > 1 {
        format!("Years 1-{}", transition_year - 1)
    } else {
        "no years before the change".to_string()
    };

    let transition_year = transition_year.to_string();
    fill_template(
        TRANSITION_PROMPT_TEMPLATE,
        &[
            ("original_years", original_years.as_str()),
            ("transition_year", transition_year.as_str()),
            ("original_institution", original.institution.as_str()),
            ("original_field", original.field.as_str()),
            ("original_area", original.area.as_str()),
            ("original_occupation", original.occupation.as_str()),
            ("new_institution", new_path.institution.as_str()),
            ("new_field", new_path.field.as_str()),
            ("new_area", new_path.area.as_str()),
            ("new_occupation", new_path.occupation.as_str()),
            ("json_only_instruction", JSON_ONLY_INSTRUCTION),
            ("original_chart", original_chart),
        ],
    )
}
