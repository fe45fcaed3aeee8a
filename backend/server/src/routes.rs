use std::sync::Arc;

use axum::{
    Json, extract,
    extract::{Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use registry::{Nupcan, Progression, Stage};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::AppError,
    notifier::Confirmation,
    state::State,
    utils::{RegistrationPayload, parse_nupcan, parse_stage, validate_registration},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub nupcan: Nupcan,
    pub progress: Progression,
    pub notified: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub progress: Progression,
    pub completion_percentage: u8,
}

impl From<Progression> for ProgressResponse {
    fn from(progress: Progression) -> Self {
        Self {
            completion_percentage: progress.completion_percentage(),
            progress,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub stage: Stage,
    pub allowed: bool,
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn registration_handler(
    extract::State(state): extract::State<Arc<State>>,
    payload: Result<Json<RegistrationPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<RegistrationResponse>), AppError> {
    let Json(payload) = payload.map_err(|_| AppError::MalformedPayload)?;
    let registration = validate_registration(payload)?;

    let nupcan = state.allocator.allocate().await?;
    let id = nupcan.to_string();

    let progress = state.tracker.initialize_after_registration(&id).await;

    let confirmation = Confirmation {
        name: registration.name,
        email: registration.email,
        nupcan: nupcan.clone(),
        exam_name: registration.exam_name,
    };
    let notified = match state.notifier.notify(&confirmation).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Confirmation for {id} not sent: {e}");
            false
        }
    };

    info!("Registered {id} for {}", confirmation.exam_name);

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            nupcan,
            progress,
            notified,
        }),
    ))
}

pub async fn progress_handler(
    extract::State(state): extract::State<Arc<State>>,
    Path(raw_nupcan): Path<String>,
) -> Result<Json<ProgressResponse>, AppError> {
    let id = parse_nupcan(&raw_nupcan)?.to_string();

    match state.tracker.get_progress(&id).await {
        Some(progress) => Ok(Json(progress.into())),
        None => Err(AppError::ProgressionAbsent(id)),
    }
}

pub async fn complete_stage_handler(
    extract::State(state): extract::State<Arc<State>>,
    Path((raw_nupcan, raw_stage)): Path<(String, String)>,
) -> Result<Json<ProgressResponse>, AppError> {
    let id = parse_nupcan(&raw_nupcan)?.to_string();
    let stage = parse_stage(&raw_stage)?;

    if stage == Stage::Done {
        return Err(AppError::StageNotCompletable(raw_stage));
    }

    let progress = state.tracker.mark_complete(&id, stage).await;

    Ok(Json(progress.into()))
}

pub async fn access_handler(
    extract::State(state): extract::State<Arc<State>>,
    Path((raw_nupcan, raw_stage)): Path<(String, String)>,
) -> Result<Json<AccessResponse>, AppError> {
    let id = parse_nupcan(&raw_nupcan)?.to_string();
    let stage = parse_stage(&raw_stage)?;

    let allowed = state.tracker.can_access_stage(&id, stage).await;

    Ok(Json(AccessResponse { stage, allowed }))
}
