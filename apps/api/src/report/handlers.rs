use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::report::document::{build_report, report_filename, ReportInput};
use crate::report::lead::{build_relay_message, LeadData};
use crate::state::AppState;
use crate::wizard::session::Activity;

/// POST /api/v1/analysis/sessions/:id/report
///
/// 1. Lead validation (consent first). Nothing else runs without consent.
/// 2. Best-effort relay of the lead; failures are logged and swallowed.
/// 3. PDF build on a blocking worker, streamed back as an attachment.
pub async fn handle_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(lead): Json<LeadData>,
) -> Result<Response, AppError> {
    lead.validate()?;

    let in_flight = state.sessions.begin(id, Activity::Export)?;

    let (form, result) = state.sessions.update(id, |s| {
        let result = s.wizard.result().cloned().ok_or_else(|| {
            AppError::Conflict(format!(
                "cannot export a report from step {}",
                s.wizard.step().index()
            ))
        })?;
        Ok((s.wizard.form().clone(), result))
    })?;

    let now = Utc::now();
    let message = build_relay_message(&lead, &form, &result, now);
    match state.relay.send(&message).await {
        Ok(()) => info!(%id, "Lead relayed"),
        Err(e) => warn!(%id, error = %e, "Lead relay failed; continuing with the report"),
    }

    let filename = report_filename(&form);
    let input = ReportInput {
        form,
        result,
        prepared_for: lead.display_name(),
        generated_at: now,
    };

    // CPU-bound PDF layout and serialisation off the async executor.
    let bytes = tokio::task::spawn_blocking(move || build_report(&input))
        .await
        .map_err(|e| {
            AppError::Internal(anyhow::anyhow!("spawn_blocking failed in report build: {e}"))
        })??;
    drop(in_flight);

    info!(%id, %filename, size = bytes.len(), "Report generated");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
