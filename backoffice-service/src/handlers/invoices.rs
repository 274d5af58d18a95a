use super::require_feature;
use crate::middleware::TenantContext;
use crate::models::{CreateInvoice, CreateLineItem, Feature, UpdateInvoice, UpdateLineItem};
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
pub struct InvoiceListParams {
    pub is_standard: Option<bool>,
}

pub async fn list_invoices(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(params): Query<InvoiceListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    let invoices = state
        .db
        .list_invoices(ctx.company_id, params.is_standard)
        .await?;
    Ok(Json(invoices))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(input): Json<CreateInvoice>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    let invoice = state
        .db
        .create_invoice(ctx.company_id, Some(&ctx.actor()), &input)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    let invoice = state
        .db
        .get_invoice(ctx.company_id, invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Rechnung nicht gefunden.")))?;
    Ok(Json(invoice))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(invoice_id): Path<Uuid>,
    Json(input): Json<UpdateInvoice>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    let invoice = state
        .db
        .update_invoice(ctx.company_id, invoice_id, Some(&ctx.actor()), &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Rechnung nicht gefunden.")))?;
    Ok(Json(invoice))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    state
        .db
        .delete_invoice(ctx.company_id, invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Rechnung nicht gefunden.")))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusBody {
    pub status: String,
}

pub async fn change_status(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(invoice_id): Path<Uuid>,
    Json(body): Json<ChangeStatusBody>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    let invoice = state
        .db
        .change_status(ctx.company_id, invoice_id, Some(&ctx.actor()), &body.status)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Rechnung nicht gefunden.")))?;
    Ok(Json(invoice))
}

pub async fn create_korrektur(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    let korrektur = state
        .db
        .create_korrektur(ctx.company_id, invoice_id, Some(&ctx.actor()))
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Rechnung nicht gefunden.")))?;
    Ok((StatusCode::CREATED, Json(korrektur)))
}

pub async fn herunterladen(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    let invoice = state
        .db
        .log_download(ctx.company_id, invoice_id, Some(&ctx.actor()))
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Rechnung nicht gefunden.")))?;
    Ok(Json(invoice))
}

/// Copy a standard invoice's line items onto this invoice. 204 when the
/// standard has no items.
pub async fn add_standard_positions(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(invoice_id): Path<Uuid>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    let standard_rechnung_id = body
        .get("standard_rechnung_id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| AppError::BadRequest(anyhow!("standard_rechnung_id ist erforderlich.")))?;
    let copied = state
        .db
        .add_standard_positions(ctx.company_id, invoice_id, standard_rechnung_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Rechnung nicht gefunden.")))?;

    if copied.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok((StatusCode::CREATED, Json(copied)).into_response())
}

pub async fn list_positions(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    let items = state
        .db
        .list_line_items(ctx.company_id, invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Rechnung nicht gefunden.")))?;
    Ok(Json(items))
}

pub async fn create_position(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(invoice_id): Path<Uuid>,
    Json(input): Json<CreateLineItem>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    let item = state
        .db
        .add_line_item(ctx.company_id, invoice_id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Rechnung nicht gefunden.")))?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_position(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((invoice_id, position_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    let item = state
        .db
        .get_line_item(ctx.company_id, position_id)
        .await?
        .filter(|item| item.rechnung_id == invoice_id)
        .ok_or_else(|| AppError::NotFound(anyhow!("Rechnungsposition nicht gefunden.")))?;
    Ok(Json(item))
}

pub async fn update_position(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((invoice_id, position_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateLineItem>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    state
        .db
        .get_line_item(ctx.company_id, position_id)
        .await?
        .filter(|item| item.rechnung_id == invoice_id)
        .ok_or_else(|| AppError::NotFound(anyhow!("Rechnungsposition nicht gefunden.")))?;
    let item = state
        .db
        .update_line_item(ctx.company_id, position_id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Rechnungsposition nicht gefunden.")))?;
    Ok(Json(item))
}

pub async fn delete_position(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((invoice_id, position_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    state
        .db
        .get_line_item(ctx.company_id, position_id)
        .await?
        .filter(|item| item.rechnung_id == invoice_id)
        .ok_or_else(|| AppError::NotFound(anyhow!("Rechnungsposition nicht gefunden.")))?;
    if !state.db.delete_line_item(ctx.company_id, position_id).await? {
        return Err(AppError::NotFound(anyhow!(
            "Rechnungsposition nicht gefunden."
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Per-category line item totals for one year.
pub async fn category_summary(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(year): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    require_feature(&state.db, &ctx, Feature::Invoicing).await?;
    let summary = state.db.category_summary(ctx.company_id, Some(year)).await?;
    Ok(Json(summary))
}
