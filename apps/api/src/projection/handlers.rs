//! Axum route handlers for the projection stages.
//!
//! Each handler locks its session for the whole action, runs one stage
//! against a snapshot of the state and commits the returned state only when
//! the stage succeeded.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::{AppError, AppJson};
use crate::llm_client::ModelChoice;
use crate::projection::models::{PathChoice, PlanFormat, RevisionFormat, Selections};
use crate::projection::pipeline::{
    advance_preferences, run_chart, run_explanation, run_plan, run_revision, run_transition,
    ChartOutput, ExplanationOutput, PlanOutput, QuestionOutput, RevisionOutput, StageContext,
    TransitionOutput,
};
use crate::projection::preferences::PreferenceAnswer;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExplanationRequest {
    #[serde(flatten)]
    pub selections: Selections,
    /// Display name or id from `GET /api/v1/models`. Defaults to the configured model.
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChartRequest {
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub format: PlanFormat,
    /// With the HTML format, fail instead of returning the sentinel text.
    #[serde(default)]
    pub require_fragment: bool,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RevisionRequest {
    pub answer: PreferenceAnswer,
    #[serde(default)]
    pub format: RevisionFormat,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub new_path: PathChoice,
    pub transition_year: u32,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub default_model: String,
    pub choices: &'static [ModelChoice],
}

fn resolve_model(state: &AppState, requested: Option<&str>) -> Result<String, AppError> {
    state.models.resolve(requested).ok_or_else(|| {
        AppError::Validation(format!(
            "Unknown model '{}'",
            requested.unwrap_or_default()
        ))
    })
}

fn stage_context<'a>(state: &'a AppState, model: &'a str) -> StageContext<'a> {
    StageContext {
        client: state.completion.as_ref(),
        model,
        lookup: &state.lookup,
        output_log: &state.output_log,
        pairing: state.config.impact_pairing,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/models
pub async fn handle_list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        default_model: state.models.default_model.clone(),
        choices: state.models.choices,
    })
}

/// POST /api/v1/sessions/:id/explanation
pub async fn handle_explanation(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    AppJson(request): AppJson<ExplanationRequest>,
) -> Result<Json<ExplanationOutput>, AppError> {
    let model = resolve_model(&state, request.model.as_deref())?;
    let session = state.sessions.get(session_id)?;
    let mut guard = session.lock().await;

    let outcome =
        run_explanation(&stage_context(&state, &model), &guard, request.selections).await?;
    *guard = outcome.next;

    info!(%session_id, "Explanation generated");
    Ok(Json(outcome.output))
}

/// POST /api/v1/sessions/:id/chart
pub async fn handle_chart(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    AppJson(request): AppJson<ChartRequest>,
) -> Result<Json<ChartOutput>, AppError> {
    let model = resolve_model(&state, request.model.as_deref())?;
    let session = state.sessions.get(session_id)?;
    let mut guard = session.lock().await;

    let outcome = run_chart(&stage_context(&state, &model), &guard).await?;
    *guard = outcome.next;

    info!(
        %session_id,
        total_net_worth = outcome.output.projection.summary.total_net_worth,
        "Chart generated"
    );
    Ok(Json(outcome.output))
}

/// POST /api/v1/sessions/:id/plans
pub async fn handle_plans(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    AppJson(request): AppJson<PlanRequest>,
) -> Result<Json<PlanOutput>, AppError> {
    let model = resolve_model(&state, request.model.as_deref())?;
    let session = state.sessions.get(session_id)?;
    let mut guard = session.lock().await;

    let outcome = run_plan(
        &stage_context(&state, &model),
        &guard,
        request.format,
        request.require_fragment,
    )
    .await?;
    *guard = outcome.next;

    info!(%session_id, format = ?request.format, "Plans generated");
    Ok(Json(outcome.output))
}

/// POST /api/v1/sessions/:id/preferences/next
pub async fn handle_next_question(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<QuestionOutput>, AppError> {
    let session = state.sessions.get(session_id)?;
    let mut guard = session.lock().await;

    let outcome = advance_preferences(&guard);
    *guard = outcome.next;

    Ok(Json(outcome.output))
}

/// POST /api/v1/sessions/:id/revision
pub async fn handle_revision(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    AppJson(request): AppJson<RevisionRequest>,
) -> Result<Json<RevisionOutput>, AppError> {
    let model = resolve_model(&state, request.model.as_deref())?;
    let session = state.sessions.get(session_id)?;
    let mut guard = session.lock().await;

    let outcome = run_revision(
        &stage_context(&state, &model),
        &guard,
        &request.answer,
        request.format,
    )
    .await?;
    *guard = outcome.next;

    info!(
        %session_id,
        answers = outcome.output.responses_history.len(),
        "Revision generated"
    );
    Ok(Json(outcome.output))
}

/// POST /api/v1/sessions/:id/transition
pub async fn handle_transition(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    AppJson(request): AppJson<TransitionRequest>,
) -> Result<Json<TransitionOutput>, AppError> {
    let model = resolve_model(&state, request.model.as_deref())?;
    let session = state.sessions.get(session_id)?;
    let mut guard = session.lock().await;

    let outcome = run_transition(
        &stage_context(&state, &model),
        &guard,
        request.new_path,
        request.transition_year,
    )
    .await?;
    *guard = outcome.next;

    info!(
        %session_id,
        year = request.transition_year,
        consistent = outcome.output.pre_transition_consistent,
        "Transition generated"
    );
    Ok(Json(outcome.output))
}
