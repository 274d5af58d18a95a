//! Database service: the single persistence path for all business rules.

mod cases;
mod documents;
mod invoices;
mod tenancy;

use crate::models::Invoice;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "backoffice-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool (used by tests).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

/// Guard shared by every invoice persistence path: a paid invoice that has
/// been written out rejects any further mutation.
pub(crate) fn ensure_mutable(invoice: &Invoice) -> Result<(), AppError> {
    if invoice.is_finalized() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Eine bezahlte Rechnung kann nicht mehr bearbeitet werden."
        )));
    }
    Ok(())
}

/// Sentinel identity used for protocol entries when no user is authenticated.
pub(crate) fn actor_name(actor: Option<&str>) -> &str {
    actor.unwrap_or("System")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn invoice(status: &str, is_geschrieben: bool) -> Invoice {
        Invoice {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            sterbefall_id: None,
            status: status.to_string(),
            rechnung_typ: "RECHNUNG".to_string(),
            rechnungsstufe: 1,
            original_rechnung_id: None,
            is_standard: false,
            standard_name: None,
            rechnungsnummer: None,
            rechnungsdatum: None,
            zahlungsziel: None,
            betrag_summe: Decimal::ZERO,
            anrede: None,
            titel: None,
            auftraggeber_vorname: None,
            auftraggeber_nachname: None,
            strasse: None,
            plz: None,
            stadt: None,
            land: None,
            verstorbenen_vorname: None,
            verstorbenen_nachname: None,
            textblock: None,
            is_geschrieben,
            protokoll: serde_json::json!([]),
            created_utc: Utc::now(),
        }
    }

    // Every persistence path runs this guard, the download log included.
    #[test]
    fn a_paid_and_written_invoice_rejects_any_write() {
        assert!(ensure_mutable(&invoice("BEZAHLT", true)).is_err());
    }

    #[test]
    fn unwritten_or_unpaid_invoices_stay_mutable() {
        assert!(ensure_mutable(&invoice("BEZAHLT", false)).is_ok());
        assert!(ensure_mutable(&invoice("OFFEN", true)).is_ok());
        assert!(ensure_mutable(&invoice("ENTWURF", false)).is_ok());
    }

    #[test]
    fn the_system_actor_covers_anonymous_protocol_entries() {
        assert_eq!(actor_name(None), "System");
        assert_eq!(actor_name(Some("emustermann")), "emustermann");
    }
}
