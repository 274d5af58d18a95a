use super::require_feature;
use crate::middleware::TenantContext;
use crate::models::{
    CreatePlaceholderInstance, CreateTemplate, Feature, UpdatePlaceholderInstance, UpdateTemplate,
};
use crate::startup::AppState;
use anyhow::anyhow;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct TemplateListParams {
    pub kategorie: Option<String>,
}

pub async fn list_templates(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(params): Query<TemplateListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Documents).await?;
    let templates = state
        .db
        .list_templates(ctx.company_id, params.kategorie.as_deref())
        .await?;
    Ok(Json(templates))
}

pub async fn create_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(input): Json<CreateTemplate>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Documents).await?;
    let template = state.db.create_template(ctx.company_id, &input).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn get_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(template_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Documents).await?;
    let template = state
        .db
        .get_template(ctx.company_id, template_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Vorlage nicht gefunden.")))?;
    Ok(Json(template))
}

pub async fn update_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(template_id): Path<Uuid>,
    Json(input): Json<UpdateTemplate>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Documents).await?;
    let template = state
        .db
        .update_template(ctx.company_id, template_id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Vorlage nicht gefunden.")))?;
    Ok(Json(template))
}

pub async fn delete_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(template_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Documents).await?;
    if !state.db.delete_template(ctx.company_id, template_id).await? {
        return Err(AppError::NotFound(anyhow!("Vorlage nicht gefunden.")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PlaceholderListParams {
    pub vorlage_id: Option<Uuid>,
}

pub async fn list_placeholders(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(params): Query<PlaceholderListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Documents).await?;
    let instances = state
        .db
        .list_placeholders(ctx.company_id, params.vorlage_id)
        .await?;
    Ok(Json(instances))
}

pub async fn create_placeholder(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(input): Json<CreatePlaceholderInstance>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Documents).await?;
    let instance = state.db.create_placeholder(ctx.company_id, &input).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

pub async fn get_placeholder(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(instance_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Documents).await?;
    let instance = state
        .db
        .get_placeholder(ctx.company_id, instance_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Platzhalter nicht gefunden.")))?;
    Ok(Json(instance))
}

pub async fn update_placeholder(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(instance_id): Path<Uuid>,
    Json(input): Json<UpdatePlaceholderInstance>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Documents).await?;
    let instance = state
        .db
        .update_placeholder(ctx.company_id, instance_id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Platzhalter nicht gefunden.")))?;
    Ok(Json(instance))
}

pub async fn delete_placeholder(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(instance_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Documents).await?;
    if !state
        .db
        .delete_placeholder(ctx.company_id, instance_id)
        .await?
    {
        return Err(AppError::NotFound(anyhow!("Platzhalter nicht gefunden.")));
    }
    Ok(StatusCode::NO_CONTENT)
}
