use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{AssignmentResponse, RotationPreview};
use crate::router::RotationState;
use crate::services::{DoctorAssigner, SupabaseDoctorDirectory};

const FRONT_DESK_ROLES: &[&str] = &["receptionist", "admin"];

fn assigner_for(state: &RotationState, token: &str) -> DoctorAssigner {
    let directory = SupabaseDoctorDirectory::new(&state.config, Some(token));
    DoctorAssigner::new(Arc::new(directory), state.cursor.clone())
}

#[axum::debug_handler]
pub async fn assign_doctor(
    State(state): State<RotationState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<AssignmentResponse>, AppError> {
    require_role(&user, FRONT_DESK_ROLES)?;

    let doctor_id = assigner_for(&state, auth.token()).assign_doctor().await?;

    Ok(Json(AssignmentResponse { doctor_id }))
}

#[axum::debug_handler]
pub async fn get_sequence(
    State(state): State<RotationState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<RotationPreview>, AppError> {
    require_role(&user, FRONT_DESK_ROLES)?;

    let preview = assigner_for(&state, auth.token()).preview().await?;

    Ok(Json(preview))
}

#[axum::debug_handler]
pub async fn reset_cursor(
    State(state): State<RotationState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    assigner_for(&state, auth.token()).reset_cursor().await?;
    tracing::info!("Rotation cursor reset by {}", user.id);

    Ok(Json(json!({ "cursor": 0 })))
}
