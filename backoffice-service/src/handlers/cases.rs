use super::{require_feature, require_subscription};
use crate::middleware::TenantContext;
use crate::models::{CaseListParams, CreateCase, Feature, UpdateCase};
use crate::startup::AppState;
use anyhow::anyhow;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use service_core::error::AppError;
use uuid::Uuid;

pub async fn list_cases(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(params): Query<CaseListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_subscription(&state.db, &ctx).await?;
    let response = state.db.list_cases(ctx.company_id, &params).await?;
    Ok(Json(response))
}

pub async fn create_case(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(input): Json<CreateCase>,
) -> Result<impl IntoResponse, AppError> {
    require_subscription(&state.db, &ctx).await?;
    let case = state
        .db
        .create_case(ctx.company_id, Some(&ctx.actor()), &input)
        .await?;
    Ok((StatusCode::CREATED, Json(case)))
}

pub async fn get_case(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(case_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_subscription(&state.db, &ctx).await?;
    let case = state
        .db
        .get_case(ctx.company_id, case_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Sterbefall nicht gefunden.")))?;
    Ok(Json(case))
}

pub async fn update_case(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(case_id): Path<Uuid>,
    Json(input): Json<UpdateCase>,
) -> Result<impl IntoResponse, AppError> {
    require_subscription(&state.db, &ctx).await?;
    let case = state
        .db
        .update_case(ctx.company_id, case_id, Some(&ctx.actor()), &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Sterbefall nicht gefunden.")))?;
    Ok(Json(case))
}

pub async fn delete_case(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(case_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_subscription(&state.db, &ctx).await?;
    if !state.db.delete_case(ctx.company_id, case_id).await? {
        return Err(AppError::NotFound(anyhow!("Sterbefall nicht gefunden.")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    pub year: Option<i32>,
}

pub async fn dashboard_data(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(params): Query<DashboardParams>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Dashboard).await?;
    let data = state.db.dashboard_data(ctx.company_id, params.year).await?;
    Ok(Json(data))
}

/// Invoices attached to one case.
pub async fn case_invoices(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(case_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    state
        .db
        .get_case(ctx.company_id, case_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Sterbefall nicht gefunden.")))?;
    let invoices = state.db.invoices_for_case(ctx.company_id, case_id).await?;
    Ok(Json(invoices))
}

/// PDF templates available for filling against this case.
pub async fn case_pdfs(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(case_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Documents).await?;
    state
        .db
        .get_case(ctx.company_id, case_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Sterbefall nicht gefunden.")))?;

    let templates: Vec<_> = state
        .db
        .list_templates(ctx.company_id, None)
        .await?
        .into_iter()
        .filter(|t| t.is_vorlage && t.is_pdf())
        .collect();
    Ok(Json(templates))
}

/// One PDF template with its placeholder instances, resolved for a case.
pub async fn case_pdf_detail(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((case_id, template_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Documents).await?;
    let case = state
        .db
        .get_case(ctx.company_id, case_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Sterbefall nicht gefunden.")))?;
    let template = state
        .db
        .get_template(ctx.company_id, template_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Vorlage nicht gefunden.")))?;

    if template.datei.is_none() {
        return Err(AppError::NotFound(anyhow!("Datei nicht gefunden.")));
    }
    if !template.is_pdf() {
        return Err(AppError::BadRequest(anyhow!(
            "Die Datei ist keine PDF-Datei."
        )));
    }

    let platzhalter = state
        .db
        .list_placeholders(ctx.company_id, Some(template.id))
        .await?;

    Ok(Json(json!({
        "vorlage": template,
        "platzhalter": platzhalter,
        "sterbefall": case,
    })))
}
