use super::require_subscription;
use crate::middleware::TenantContext;
use crate::models::{CreateUser, UpdateCompany, UpdateUser};
use crate::startup::AppState;
use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

/// The requesting tenant's own company record. Readable even when the
/// subscription has lapsed, so the frontend can show why access is gone.
pub async fn get_company(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let company = state
        .db
        .get_company(ctx.company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Unternehmen nicht gefunden.")))?;
    Ok(Json(company))
}

pub async fn update_company(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(input): Json<UpdateCompany>,
) -> Result<impl IntoResponse, AppError> {
    require_subscription(&state.db, &ctx).await?;
    let company = state
        .db
        .update_company(ctx.company_id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Unternehmen nicht gefunden.")))?;
    Ok(Json(company))
}

pub async fn list_users(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    require_subscription(&state.db, &ctx).await?;
    let users = state.db.list_users(ctx.company_id).await?;
    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(input): Json<CreateUser>,
) -> Result<impl IntoResponse, AppError> {
    require_subscription(&state.db, &ctx).await?;
    let user = state.db.create_user(ctx.company_id, &input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_subscription(&state.db, &ctx).await?;
    let user = state
        .db
        .get_user(ctx.company_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Benutzer nicht gefunden.")))?;
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUser>,
) -> Result<impl IntoResponse, AppError> {
    require_subscription(&state.db, &ctx).await?;
    let user = state
        .db
        .update_user(ctx.company_id, user_id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Benutzer nicht gefunden.")))?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_subscription(&state.db, &ctx).await?;
    if ctx.user_id == user_id {
        return Err(AppError::BadRequest(anyhow!(
            "Der eigene Benutzer kann nicht gelöscht werden."
        )));
    }
    if !state.db.delete_user(ctx.company_id, user_id).await? {
        return Err(AppError::NotFound(anyhow!("Benutzer nicht gefunden.")));
    }
    Ok(StatusCode::NO_CONTENT)
}
