//! Projection pipeline: one function per user action.
//!
//! Flow: explanation → chart → plan / (preferences → revision) / transition.
//!
//! Every stage reads the current `SessionState` and returns the next one inside
//! a `StageOutcome`. Nothing is written back here: on any error the caller
//! drops the outcome and the session stays exactly as it was.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::CompletionClient;
use crate::lookup::LookupTables;
use crate::output_log::OutputLog;
use crate::projection::builder::{
    build_chart_prompt, build_explanation_prompt, build_plan_prompt, build_revision_prompt,
    build_transition_prompt,
};
use crate::projection::models::{
    ImpactPairing, PathChoice, PlanFormat, Projection, RevisionFormat, Selections,
    TransitionYear,
};
use crate::projection::parser::{
    extract_html_fragment, parse_projection, parse_revision, pre_transition_matches,
    EmbeddedFragment, RevisionPayload,
};
use crate::projection::preferences::{
    question_for_step, PreferenceAnswer, PreferenceQuestion, PreferenceResponse,
    PREFERENCE_QUESTIONS,
};
use crate::projection::render::{
    render_comparison, render_projection, render_transition, RenderedProjection,
};
use crate::session::SessionState;

// ────────────────────────────────────────────────────────────────────────────
// Stage plumbing
// ────────────────────────────────────────────────────────────────────────────

/// Everything a stage needs besides the session itself.
pub struct StageContext<'a> {
    pub client: &'a dyn CompletionClient,
    /// Upstream model id, already resolved from the catalog.
    pub model: &'a str,
    pub lookup: &'a LookupTables,
    pub output_log: &'a OutputLog,
    pub pairing: ImpactPairing,
}

impl StageContext<'_> {
    /// One completion call. The response is appended to the output log
    /// before it is parsed, so rejected responses are kept too.
    async fn complete(&self, stage: &str, prompt: &str) -> Result<String, AppError> {
        let response = self.client.complete(prompt, self.model).await?;
        self.output_log.append(&response).await;
        info!(stage, model = self.model, "Completion received ({} chars)", response.len());
        Ok(response)
    }
}

/// The state to commit and what to send back.
#[derive(Debug)]
pub struct StageOutcome<T> {
    pub next: SessionState,
    pub output: T,
}

impl<T> StageOutcome<T> {
    fn new(mut next: SessionState, output: T) -> Self {
        next.touch();
        Self { next, output }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ExplanationOutput {
    pub explanation: String,
    /// Mean wage for the selected area and occupation, or "N/A".
    pub salary: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct ChartOutput {
    pub projection: Projection,
    pub rendered: RenderedProjection,
}

#[derive(Debug, Serialize)]
pub struct PlanOutput {
    pub plan: String,
    pub format: PlanFormat,
    /// Only meaningful for the HTML format.
    pub fragment_found: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct QuestionOutput {
    pub step: usize,
    pub total: usize,
    /// `None` once every question has been asked.
    pub question: Option<PreferenceQuestion>,
}

#[derive(Debug, Serialize)]
pub struct RevisionOutput {
    pub answered: PreferenceResponse,
    pub responses_history: Vec<PreferenceResponse>,
    pub format: RevisionFormat,
    /// Original vs revised, when the response carried a usable projection.
    pub rendered: Option<RenderedProjection>,
    pub revised_explanation: Option<Value>,
    pub main_changes: Vec<String>,
    pub financial_impact: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TransitionOutput {
    pub transition_year: TransitionYear,
    pub new_path: PathChoice,
    pub projection: Projection,
    pub rendered: RenderedProjection,
    /// Whether years before the change match the original projection.
    pub pre_transition_consistent: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

fn validate_path(lookup: &LookupTables, path: &PathChoice) -> Result<(), AppError> {
    if !lookup.has_institution(&path.institution) {
        return Err(AppError::Validation(format!(
            "Unknown institution '{}'",
            path.institution
        )));
    }
    if !lookup
        .fields_for(&path.institution)
        .contains(path.field.trim())
    {
        return Err(AppError::Validation(format!(
            "'{}' is not offered by '{}'",
            path.field, path.institution
        )));
    }
    if !lookup.has_area(&path.area) {
        return Err(AppError::Validation(format!("Unknown area '{}'", path.area)));
    }
    if !lookup.occupations_for(&path.area).contains(path.occupation.trim()) {
        return Err(AppError::Validation(format!(
            "'{}' is not listed for '{}'",
            path.occupation, path.area
        )));
    }
    Ok(())
}

fn validate_selections(lookup: &LookupTables, selections: &Selections) -> Result<(), AppError> {
    validate_path(lookup, &PathChoice::from(selections))?;
    if selections.bedrooms < 1 {
        return Err(AppError::Validation(
            "bedrooms must be at least 1".to_string(),
        ));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Stages
// ────────────────────────────────────────────────────────────────────────────

/// Validates the selections and asks for the four-section explanation.
/// A new explanation invalidates the chart and everything built on it; the
/// preference log survives.
pub async fn run_explanation(
    ctx: &StageContext<'_>,
    state: &SessionState,
    selections: Selections,
) -> Result<StageOutcome<ExplanationOutput>, AppError> {
    validate_selections(ctx.lookup, &selections)?;

    let salary = ctx
        .lookup
        .display_wage(&selections.area, &selections.occupation);
    let prompt = build_explanation_prompt(&selections);
    let explanation = ctx.complete("explanation", &prompt).await?;

    let mut next = state.clone();
    next.selections = Some(selections);
    next.explanation = Some(explanation.clone());
    next.clear_downstream_of_explanation();

    Ok(StageOutcome::new(
        next,
        ExplanationOutput {
            explanation,
            salary,
            model: ctx.model.to_string(),
        },
    ))
}

/// Converts the explanation into the strict chart JSON. The raw text is kept
/// only if it validates.
pub async fn run_chart(
    ctx: &StageContext<'_>,
    state: &SessionState,
) -> Result<StageOutcome<ChartOutput>, AppError> {
    let explanation = state.require_explanation()?;

    let prompt = build_chart_prompt(explanation);
    let response = ctx.complete("chart", &prompt).await?;
    let projection = parse_projection(&response, ctx.pairing)?;
    let rendered = render_projection(&projection);

    let mut next = state.clone();
    next.chart_response = Some(response);
    next.projection = Some(projection.clone());
    next.clear_downstream_of_chart();

    Ok(StageOutcome::new(next, ChartOutput { projection, rendered }))
}

/// Three alternative paths. With `PlanFormat::Html` the fragment is extracted;
/// when none is present the fixed sentinel is returned, or `NoEmbeddedContent`
/// if `require_fragment` is set.
pub async fn run_plan(
    ctx: &StageContext<'_>,
    state: &SessionState,
    format: PlanFormat,
    require_fragment: bool,
) -> Result<StageOutcome<PlanOutput>, AppError> {
    let explanation = state.require_explanation()?;
    let (chart, _) = state.require_chart()?;

    let prompt = build_plan_prompt(explanation, chart, format);
    let response = ctx.complete("plan", &prompt).await?;

    let (plan, fragment_found) = match format {
        PlanFormat::Text => (response.trim().to_string(), None),
        PlanFormat::Html => {
            let fragment = extract_html_fragment(&response);
            let found = matches!(fragment, EmbeddedFragment::Found(_));
            if !found {
                warn!("Plan response carried no HTML fragment");
            }
            let plan = if require_fragment {
                fragment.into_result()?
            } else {
                fragment.display().to_string()
            };
            (plan, Some(found))
        }
    };

    let mut next = state.clone();
    next.plan = Some(plan.clone());

    Ok(StageOutcome::new(
        next,
        PlanOutput {
            plan,
            format,
            fragment_found,
        },
    ))
}

/// Moves to the next preference question. The step stops one past the last
/// question, where no question is active.
pub fn advance_preferences(state: &SessionState) -> StageOutcome<QuestionOutput> {
    let total = PREFERENCE_QUESTIONS.len();
    let step = (state.step + 1).min(total + 1);

    let mut next = state.clone();
    next.step = step;

    StageOutcome::new(
        next,
        QuestionOutput {
            step,
            total,
            question: question_for_step(step).copied(),
        },
    )
}

/// Answers the active question and asks for a revised projection using the
/// whole preference log. The answer joins the log only if the revision
/// succeeds.
pub async fn run_revision(
    ctx: &StageContext<'_>,
    state: &SessionState,
    answer: &PreferenceAnswer,
    format: RevisionFormat,
) -> Result<StageOutcome<RevisionOutput>, AppError> {
    let explanation = state.require_explanation()?;
    let (_, original) = state.require_chart()?;
    let question = question_for_step(state.step).ok_or_else(|| {
        AppError::StageNotReady(format!(
            "No active preference question at step {}",
            state.step
        ))
    })?;
    let rendered_answer = answer.render_for(question).map_err(AppError::Validation)?;
    if rendered_answer.is_empty() {
        return Err(AppError::Validation("Answer cannot be empty".to_string()));
    }

    let answered = PreferenceResponse {
        question: question.prompt.to_string(),
        answer: rendered_answer,
    };
    let mut history = state.responses_history.clone();
    history.push(answered.clone());

    let prompt = build_revision_prompt(&history, explanation, format);
    ctx.output_log.append(&prompt).await;
    let response = ctx.complete("revision", &prompt).await?;
    let payload = parse_revision(&response, ctx.pairing)?;

    let rendered = payload
        .projection()
        .map(|revised| render_comparison(original, revised));
    let revised_projection = payload.projection().cloned();
    let (revised_explanation, main_changes, financial_impact) = match payload {
        RevisionPayload::Projection(_) => (None, Vec::new(), Vec::new()),
        RevisionPayload::Sectioned(s) => (
            Some(s.revised_explanation),
            s.main_changes,
            s.financial_impact,
        ),
    };

    let mut next = state.clone();
    next.responses_history = history.clone();
    next.revised_projection = revised_projection;

    Ok(StageOutcome::new(
        next,
        RevisionOutput {
            answered,
            responses_history: history,
            format,
            rendered,
            revised_explanation,
            main_changes,
            financial_impact,
        },
    ))
}

/// Projects switching to `new_path` at `year`. ZIP code and housing carry over
/// from the original selections.
pub async fn run_transition(
    ctx: &StageContext<'_>,
    state: &SessionState,
    new_path: PathChoice,
    year: u32,
) -> Result<StageOutcome<TransitionOutput>, AppError> {
    let (chart, original) = state.require_chart()?;
    let selections = state.selections.as_ref().ok_or_else(|| {
        AppError::StageNotReady("Get an explanation before this step".to_string())
    })?;
    let transition_year = TransitionYear::try_from(year).map_err(AppError::Validation)?;
    validate_path(ctx.lookup, &new_path)?;

    let prompt = build_transition_prompt(
        &PathChoice::from(selections),
        &new_path,
        transition_year.get(),
        chart,
    );
    let response = ctx.complete("transition", &prompt).await?;
    let projection = parse_projection(&response, ctx.pairing)?;

    let pre_transition_consistent =
        pre_transition_matches(&original.series, &projection.series, transition_year.get());
    if !pre_transition_consistent {
        warn!(
            "Transition projection diverges from the original before year {}",
            transition_year.get()
        );
    }
    let rendered = render_transition(original, &projection, transition_year);

    let mut next = state.clone();
    next.transition_projection = Some(projection.clone());

    Ok(StageOutcome::new(
        next,
        TransitionOutput {
            transition_year,
            new_path,
            projection,
            rendered,
            pre_transition_consistent,
        },
    ))
}
