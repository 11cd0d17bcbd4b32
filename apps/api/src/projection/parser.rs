//! Response Validator/Parser: turns raw completion text into validated data.
//!
//! Two independent paths:
//! - strict JSON: fences stripped, parsed, then checked against the projection
//!   schema (`MalformedJson` / `SchemaMismatch`);
//! - embedded fragment: the first `<html>`…`</html>` span, or a sentinel.
//!
//! Nothing here touches session state. A failed parse yields no partial result.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::llm_client::strip_json_fences;
use crate::projection::models::{
    ImpactNote, ImpactPairing, Projection, ProjectionSeries, ProjectionSummary, PROJECTION_YEARS,
};

pub const NO_HTML_SENTINEL: &str = "No HTML content found.";

const HTML_OPEN: &str = "<html>";
const HTML_CLOSE: &str = "</html>";

pub const REVISED_EXPLANATION_KEY: &str = "revisedExplanation";
pub const COMPARISON_KEY: &str = "comparison";
pub const SECTION_LABELS: [&str; 4] = [
    "1. EDUCATION COSTS",
    "2. FINANCIAL AID",
    "3. CAREER PROJECTION",
    "4. YEARLY BREAKDOWN",
];
pub const COMPARISON_KEYS: [&str; 2] = ["mainChanges", "financialImpact"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("response does not match the expected schema: {0}")]
    SchemaMismatch(String),

    #[error("no <html> content found in response")]
    NoEmbeddedContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Raw wire shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawProjection {
    data: RawData,
    summary: RawSummary,
    #[serde(default)]
    impact: Option<RawImpact>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawData {
    years: Vec<i64>,
    net_worth: Vec<f64>,
    income: Vec<f64>,
    expenses: Vec<f64>,
    #[serde(default)]
    loans: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSummary {
    total_net_worth: f64,
    peak_net_worth: f64,
    #[serde(default)]
    average_growth: Option<f64>,
    #[serde(default)]
    transition_cost: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawImpact {
    #[serde(default)]
    changes: Vec<Value>,
    #[serde(default)]
    financial_effect: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawYearlyBreakdown {
    net_worth_progression: Vec<f64>,
    income_progression: Vec<f64>,
    expense_progression: Vec<f64>,
    total_net_worth: f64,
    peak_net_worth: f64,
    #[serde(default)]
    average_growth: Option<f64>,
}

// ────────────────────────────────────────────────────────────────────────────
// Strict JSON path
// ────────────────────────────────────────────────────────────────────────────

/// Parses completion text as JSON, tolerating markdown code fences.
pub fn parse_json_value(text: &str) -> Result<Value, ParseError> {
    serde_json::from_str(strip_json_fences(text)).map_err(|e| ParseError::MalformedJson(e.to_string()))
}

/// Parses and validates a chart-schema projection.
pub fn parse_projection(text: &str, pairing: ImpactPairing) -> Result<Projection, ParseError> {
    let value = parse_json_value(text)?;
    projection_from_value(value, pairing)
}

pub fn projection_from_value(value: Value, pairing: ImpactPairing) -> Result<Projection, ParseError> {
    let raw: RawProjection =
        serde_json::from_value(value).map_err(|e| ParseError::SchemaMismatch(e.to_string()))?;

    let series = ProjectionSeries::from_columns(
        &raw.data.years,
        &raw.data.net_worth,
        &raw.data.income,
        &raw.data.expenses,
        raw.data.loans.as_deref(),
    )
    .map_err(ParseError::SchemaMismatch)?;

    let impact = match raw.impact {
        Some(impact) => pair_impact(impact.changes, impact.financial_effect, pairing)?,
        None => Vec::new(),
    };

    Ok(Projection {
        series,
        summary: ProjectionSummary {
            total_net_worth: raw.summary.total_net_worth,
            peak_net_worth: raw.summary.peak_net_worth,
            average_growth: raw.summary.average_growth,
            transition_cost: raw.summary.transition_cost,
        },
        impact,
    })
}

fn pair_impact(
    changes: Vec<Value>,
    effects: Vec<Value>,
    pairing: ImpactPairing,
) -> Result<Vec<ImpactNote>, ParseError> {
    if changes.len() != effects.len() {
        match pairing {
            ImpactPairing::Reject => {
                return Err(ParseError::SchemaMismatch(format!(
                    "impact.changes has {} entries but impact.financialEffect has {}",
                    changes.len(),
                    effects.len()
                )));
            }
            ImpactPairing::Truncate => debug!(
                "Truncating impact notes: {} changes vs {} effects",
                changes.len(),
                effects.len()
            ),
        }
    }

    Ok(changes
        .iter()
        .zip(effects.iter())
        .map(|(change, effect)| ImpactNote {
            change: value_to_text(change),
            financial_effect: value_to_text(effect),
        })
        .collect())
}

/// Strings pass through; anything else is rendered as compact JSON.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Revision payloads
// ────────────────────────────────────────────────────────────────────────────

/// The `revisedExplanation` + `comparison` shape, checked by key presence only.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionedRevision {
    pub revised_explanation: Value,
    pub main_changes: Vec<String>,
    pub financial_impact: Vec<String>,
    /// Present when `4. YEARLY BREAKDOWN` carries usable progressions.
    pub projection: Option<Projection>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RevisionPayload {
    Projection(Projection),
    Sectioned(SectionedRevision),
}

impl RevisionPayload {
    pub fn projection(&self) -> Option<&Projection> {
        match self {
            RevisionPayload::Projection(p) => Some(p),
            RevisionPayload::Sectioned(s) => s.projection.as_ref(),
        }
    }
}

/// Parses a revision response. Payloads carrying `revisedExplanation` are
/// validated as the sectioned shape; everything else as a chart projection.
pub fn parse_revision(text: &str, pairing: ImpactPairing) -> Result<RevisionPayload, ParseError> {
    let value = parse_json_value(text)?;
    if value.get(REVISED_EXPLANATION_KEY).is_some() {
        sectioned_from_value(value).map(RevisionPayload::Sectioned)
    } else {
        projection_from_value(value, pairing).map(RevisionPayload::Projection)
    }
}

fn require_keys(parent: &Value, parent_name: &str, keys: &[&str]) -> Result<(), ParseError> {
    let object = parent.as_object().ok_or_else(|| {
        ParseError::SchemaMismatch(format!("`{parent_name}` must be a JSON object"))
    })?;
    match keys.iter().find(|k| !object.contains_key(**k)) {
        Some(missing) => Err(ParseError::SchemaMismatch(format!(
            "missing key `{missing}` in `{parent_name}`"
        ))),
        None => Ok(()),
    }
}

pub fn sectioned_from_value(value: Value) -> Result<SectionedRevision, ParseError> {
    require_keys(&value, "response", &[REVISED_EXPLANATION_KEY, COMPARISON_KEY])?;
    let revised = &value[REVISED_EXPLANATION_KEY];
    let comparison = &value[COMPARISON_KEY];
    require_keys(revised, REVISED_EXPLANATION_KEY, &SECTION_LABELS)?;
    require_keys(comparison, COMPARISON_KEY, &COMPARISON_KEYS)?;

    let projection = yearly_breakdown_projection(&revised[SECTION_LABELS[3]]);

    Ok(SectionedRevision {
        revised_explanation: revised.clone(),
        main_changes: text_list(&comparison[COMPARISON_KEYS[0]]),
        financial_impact: text_list(&comparison[COMPARISON_KEYS[1]]),
        projection,
    })
}

/// Accepts a list or a single value; a lone string becomes a one-item list.
fn text_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(value_to_text).collect(),
        Value::Null => Vec::new(),
        other => vec![value_to_text(other)],
    }
}

/// Best-effort conversion of the yearly breakdown section. Never fails.
fn yearly_breakdown_projection(section: &Value) -> Option<Projection> {
    let raw: RawYearlyBreakdown = match serde_json::from_value(section.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("Yearly breakdown has no usable progressions: {e}");
            return None;
        }
    };
    let years: Vec<i64> = (1..=PROJECTION_YEARS as i64).collect();
    let series = ProjectionSeries::from_columns(
        &years,
        &raw.net_worth_progression,
        &raw.income_progression,
        &raw.expense_progression,
        None,
    )
    .map_err(|e| debug!("Yearly breakdown rejected: {e}"))
    .ok()?;

    Some(Projection {
        series,
        summary: ProjectionSummary {
            total_net_worth: raw.total_net_worth,
            peak_net_worth: raw.peak_net_worth,
            average_growth: raw.average_growth,
            transition_cost: None,
        },
        impact: Vec::new(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Transition consistency
// ────────────────────────────────────────────────────────────────────────────

const CONSISTENCY_TOLERANCE: f64 = 0.005;

/// True when every year before `transition_year` has the same net worth and
/// income in both projections.
pub fn pre_transition_matches(
    original: &ProjectionSeries,
    transitioned: &ProjectionSeries,
    transition_year: u32,
) -> bool {
    original
        .points()
        .iter()
        .zip(transitioned.points())
        .take_while(|(o, _)| o.year < transition_year)
        .all(|(o, t)| {
            (o.net_worth - t.net_worth).abs() <= CONSISTENCY_TOLERANCE
                && (o.income - t.income).abs() <= CONSISTENCY_TOLERANCE
        })
}

// ────────────────────────────────────────────────────────────────────────────
// Embedded-fragment path
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddedFragment {
    Found(String),
    Missing,
}

impl EmbeddedFragment {
    /// The fragment, or the fixed sentinel when none was found.
    pub fn display(&self) -> &str {
        match self {
            EmbeddedFragment::Found(html) => html,
            EmbeddedFragment::Missing => NO_HTML_SENTINEL,
        }
    }

    pub fn into_result(self) -> Result<String, ParseError> {
        match self {
            EmbeddedFragment::Found(html) => Ok(html),
            EmbeddedFragment::Missing => Err(ParseError::NoEmbeddedContent),
        }
    }
}

/// Extracts the span from the first `<html>` to the earliest `</html>` after
/// it, markers included. The text is treated as opaque; no JSON parsing.
pub fn extract_html_fragment(text: &str) -> EmbeddedFragment {
    let Some(start) = text.find(HTML_OPEN) else {
        return EmbeddedFragment::Missing;
    };
    let body_start = start + HTML_OPEN.len();
    match text[body_start..].find(HTML_CLOSE) {
        Some(offset) => {
            let end = body_start + offset + HTML_CLOSE.len();
            EmbeddedFragment::Found(text[start..end].to_string())
        }
        None => EmbeddedFragment::Missing,
    }
}
