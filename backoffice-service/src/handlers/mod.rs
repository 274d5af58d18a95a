//! HTTP handlers. Every business handler extracts a [`TenantContext`] and
//! passes through the subscription/feature gate before touching data.

pub mod cases;
pub mod company;
pub mod email_logs;
pub mod health;
pub mod invoices;
pub mod templates;

use crate::middleware::TenantContext;
use crate::models::{Company, Feature, PlanTier};
use crate::services::Database;
use anyhow::anyhow;
use service_core::error::AppError;

/// Resolve the tenant's plan, rejecting lapsed subscriptions.
pub(crate) async fn require_subscription(
    db: &Database,
    ctx: &TenantContext,
) -> Result<(Company, PlanTier), AppError> {
    let company = db
        .get_company(ctx.company_id)
        .await?
        .ok_or_else(|| AppError::Forbidden(anyhow!("Unbekannter Mandant.")))?;

    if !company.subscription_active_now() {
        return Err(AppError::Forbidden(anyhow!(
            "Das Abonnement ist abgelaufen."
        )));
    }
    let plan = company.plan().ok_or_else(|| {
        AppError::InternalError(anyhow!("Unbekannter Tarif: {}", company.plan_tier))
    })?;
    Ok((company, plan))
}

/// Subscription gate plus a plan feature check.
pub(crate) async fn require_feature(
    db: &Database,
    ctx: &TenantContext,
    feature: Feature,
) -> Result<Company, AppError> {
    let (company, plan) = require_subscription(db, ctx).await?;
    if !plan.allows(feature) {
        return Err(AppError::Forbidden(anyhow!(
            "Diese Funktion ist im aktuellen Tarif nicht enthalten."
        )));
    }
    Ok(company)
}
