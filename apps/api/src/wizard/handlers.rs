use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::CompletionRequest;
use crate::report::lead::{Interest, Role};
use crate::state::AppState;
use crate::wizard::models::{
    AnalysisResult, AnalysisType, AssetForm, AssetType, GeoPoint, MapsReference,
};
use crate::wizard::parser::parse_response;
use crate::wizard::prompts::{build_analysis_prompt, PromptVariant};
use crate::wizard::risk::{indicators, RiskIndicator};
use crate::wizard::session::{Activity, Session};
use crate::wizard::state_machine::{ConfigurationUpdate, Step};

// ────────────────────────────────────────────────────────────────────────────
// Views
// ────────────────────────────────────────────────────────────────────────────

/// What the front end renders for a session. `result` is only present at step 3.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub step: Step,
    pub step_index: u8,
    pub loading: bool,
    pub exporting: bool,
    /// False while an analysis is pending and on the result step.
    pub editable: bool,
    pub form: AssetForm,
    pub location_recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub analysis_text: String,
    pub risks: Vec<RiskIndicator>,
    pub verified_location: Option<MapsReference>,
    pub sources: Vec<MapsReference>,
    pub call_to_action: CallToAction,
}

#[derive(Debug, Serialize)]
pub struct CallToAction {
    pub label: &'static str,
    pub target: &'static str,
}

const CALL_TO_ACTION: CallToAction = CallToAction {
    label: "Agendar Sesión Estratégica",
    target: "contact",
};

impl SessionView {
    pub fn build(id: Uuid, session: &Session) -> Self {
        let step = session.wizard.step();
        Self {
            id,
            step,
            step_index: step.index(),
            loading: session.analysis_in_flight,
            exporting: session.export_in_flight,
            editable: !session.analysis_in_flight && step != Step::ShowResult,
            form: session.wizard.form().clone(),
            location_recorded: session.location.is_some(),
            result: session.wizard.result().map(ResultView::build),
        }
    }
}

impl ResultView {
    fn build(result: &AnalysisResult) -> Self {
        Self {
            analysis_text: result.analysis_text.clone(),
            risks: indicators(&result.risks),
            verified_location: result.verified_location().cloned(),
            sources: result.map_references().cloned().collect(),
            call_to_action: CALL_TO_ACTION,
        }
    }
}

/// Choice lists for every select on the page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsResponse {
    pub asset_types: Vec<&'static str>,
    pub analysis_types: Vec<&'static str>,
    pub roles: Vec<&'static str>,
    pub interests: Vec<&'static str>,
    pub prompt_variants: Vec<PromptVariant>,
    pub active_prompt_variant: PromptVariant,
    pub defaults: AssetForm,
}

// ────────────────────────────────────────────────────────────────────────────
// Requests
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIdentification {
    pub address: String,
    pub postal_code: String,
    pub asset_type: AssetType,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub recorded: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/analysis/options
pub async fn handle_options(State(state): State<AppState>) -> Json<OptionsResponse> {
    Json(OptionsResponse {
        asset_types: AssetType::ALL.iter().map(|t| t.label()).collect(),
        analysis_types: AnalysisType::ALL.iter().map(|t| t.label()).collect(),
        roles: Role::ALL.iter().map(|r| r.label()).collect(),
        interests: Interest::ALL.iter().map(|i| i.label()).collect(),
        prompt_variants: PromptVariant::ALL.to_vec(),
        active_prompt_variant: state.config.prompt_variant,
        defaults: AssetForm::default(),
    })
}

/// POST /api/v1/analysis/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionView>) {
    let (id, session) = state.sessions.create();
    info!(%id, "Wizard session started");
    (StatusCode::CREATED, Json(SessionView::build(id, &session)))
}

/// GET /api/v1/analysis/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(id)?;
    Ok(Json(SessionView::build(id, &session)))
}

/// DELETE /api/v1/analysis/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id) {
        info!(%id, "Wizard session discarded");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// PUT /api/v1/analysis/sessions/:id/asset
pub async fn handle_update_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssetIdentification>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.update(id, |s| {
        s.ensure_idle()?;
        s.wizard
            .edit_identification(req.address, req.postal_code, req.asset_type)?;
        Ok(s.clone())
    })?;
    Ok(Json(SessionView::build(id, &session)))
}

/// PUT /api/v1/analysis/sessions/:id/configuration
pub async fn handle_update_configuration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ConfigurationUpdate>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.update(id, |s| {
        s.ensure_idle()?;
        s.wizard.edit_configuration(req)?;
        Ok(s.clone())
    })?;
    Ok(Json(SessionView::build(id, &session)))
}

/// POST /api/v1/analysis/sessions/:id/advance
pub async fn handle_advance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.update(id, |s| {
        s.ensure_idle()?;
        s.wizard.advance()?;
        Ok(s.clone())
    })?;
    Ok(Json(SessionView::build(id, &session)))
}

/// POST /api/v1/analysis/sessions/:id/back
pub async fn handle_back(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.update(id, |s| {
        s.ensure_idle()?;
        s.wizard.back()?;
        Ok(s.clone())
    })?;
    Ok(Json(SessionView::build(id, &session)))
}

/// POST /api/v1/analysis/sessions/:id/location
///
/// Best effort: an invalid or repeated location is ignored, never an error.
pub async fn handle_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(point): Json<GeoPoint>,
) -> Result<Json<LocationResponse>, AppError> {
    let recorded = state
        .sessions
        .update(id, |s| Ok(s.record_location(point)))?;
    if !recorded {
        warn!(%id, ?point, "Geolocation ignored");
    }
    Ok(Json(LocationResponse { recorded }))
}

/// POST /api/v1/analysis/sessions/:id/analyze
///
/// Calls the model once (no retries). On failure the session stays on step 2 so the
/// user can try again; on success it moves to step 3 with the parsed result.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let in_flight = state.sessions.begin(id, Activity::Analysis)?;

    let (form, location) = state.sessions.update(id, |s| {
        s.wizard.ensure_can_submit()?;
        Ok((s.wizard.form().clone(), s.location))
    })?;

    let prompt = build_analysis_prompt(&form, state.config.prompt_variant);
    let completion = state
        .model
        .complete(CompletionRequest { prompt, location })
        .await?;

    let parsed = parse_response(&completion.text);
    info!(
        %id,
        risks = parsed.risks.len(),
        sources = completion.sources.len(),
        "Analysis completed"
    );
    let result = AnalysisResult {
        analysis_text: parsed.narrative,
        risks: parsed.risks,
        sources: completion.sources,
    };

    state.sessions.update(id, |s| s.wizard.complete(result))?;
    drop(in_flight);

    let session = state.sessions.get(id)?;
    Ok(Json(SessionView::build(id, &session)))
}

/// POST /api/v1/analysis/sessions/:id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.update(id, |s| {
        s.ensure_idle()?;
        s.wizard.reset()?;
        Ok(s.clone())
    })?;
    Ok(Json(SessionView::build(id, &session)))
}
