//! Axum route handlers for the selection widgets.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::lookup::LookupError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InstitutionQuery {
    pub institution: String,
}

#[derive(Debug, Deserialize)]
pub struct AreaQuery {
    pub area: String,
}

#[derive(Debug, Deserialize)]
pub struct WageQuery {
    pub area: String,
    pub occupation: String,
}

#[derive(Debug, Serialize)]
pub struct ChoicesResponse {
    pub choices: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct WageResponse {
    pub area: String,
    pub occupation: String,
    pub mean_wage: Option<f64>,
    /// Two-decimal currency, or "N/A" when no wage is available.
    pub formatted: String,
    pub miss_reason: Option<String>,
}

/// GET /api/v1/lookup/institutions
pub async fn handle_institutions(State(state): State<AppState>) -> Json<ChoicesResponse> {
    Json(ChoicesResponse {
        choices: state.lookup.institutions().into_iter().collect(),
    })
}

/// GET /api/v1/lookup/fields?institution=
pub async fn handle_fields(
    State(state): State<AppState>,
    Query(query): Query<InstitutionQuery>,
) -> Result<Json<ChoicesResponse>, AppError> {
    if !state.lookup.has_institution(&query.institution) {
        return Err(AppError::NotFound(format!(
            "Institution '{}' not found",
            query.institution.trim()
        )));
    }
    Ok(Json(ChoicesResponse {
        choices: state
            .lookup
            .fields_for(&query.institution)
            .into_iter()
            .collect(),
    }))
}

/// GET /api/v1/lookup/areas
pub async fn handle_areas(State(state): State<AppState>) -> Json<ChoicesResponse> {
    Json(ChoicesResponse {
        choices: state.lookup.areas().into_iter().collect(),
    })
}

/// GET /api/v1/lookup/occupations?area=
pub async fn handle_occupations(
    State(state): State<AppState>,
    Query(query): Query<AreaQuery>,
) -> Result<Json<ChoicesResponse>, AppError> {
    if !state.lookup.has_area(&query.area) {
        return Err(AppError::NotFound(format!(
            "Area '{}' not found",
            query.area.trim()
        )));
    }
    Ok(Json(ChoicesResponse {
        choices: state
            .lookup
            .occupations_for(&query.area)
            .into_iter()
            .collect(),
    }))
}

/// GET /api/v1/lookup/wage?area=&occupation=
///
/// A miss is not an error: the response carries `"N/A"` and the reason.
pub async fn handle_wage(
    State(state): State<AppState>,
    Query(query): Query<WageQuery>,
) -> Json<WageResponse> {
    let (mean_wage, miss_reason) = match state.lookup.mean_wage(&query.area, &query.occupation) {
        Ok(wage) => (Some(wage), None),
        Err(e) => {
            log_miss(&e);
            (None, Some(e.to_string()))
        }
    };

    Json(WageResponse {
        area: query.area.trim().to_string(),
        occupation: query.occupation.trim().to_string(),
        mean_wage,
        formatted: state.lookup.display_wage(&query.area, &query.occupation),
        miss_reason,
    })
}

fn log_miss(error: &LookupError) {
    match error {
        LookupError::NotFound { .. } => tracing::debug!("Wage lookup miss: {error}"),
        LookupError::NotReported { .. } => tracing::debug!("Wage not reported: {error}"),
    }
}
