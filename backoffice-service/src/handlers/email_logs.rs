use super::require_feature;
use crate::middleware::TenantContext;
use crate::models::{CreateEmailLog, Feature};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

/// Send attempts for one document, newest first.
pub async fn list_email_logs(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(document_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::EmailLog).await?;
    let entries = state
        .db
        .list_email_logs(ctx.company_id, Some(&document_name))
        .await?;
    Ok(Json(entries))
}

/// Record one send attempt. The log is append-only.
pub async fn create_email_log(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(input): Json<CreateEmailLog>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::EmailLog).await?;
    input.validate()?;
    let entry = state.db.create_email_log(ctx.company_id, &input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
