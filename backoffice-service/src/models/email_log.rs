//! Email dispatch log. Append-only: rows are created, never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// One row per send attempt. A failed external send is recorded with
/// `success = false`, not retried.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailLog {
    pub id: Uuid,
    pub company_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub recipient: String,
    pub document_name: String,
    pub sterbefall_id: Option<Uuid>,
    pub vorlage_id: Option<Uuid>,
    pub success: bool,
}

/// Input for recording a send attempt.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEmailLog {
    #[validate(email)]
    pub recipient: String,
    #[validate(length(min = 1))]
    pub document_name: String,
    pub sterbefall_id: Option<Uuid>,
    pub vorlage_id: Option<Uuid>,
    #[serde(default = "default_success")]
    pub success: bool,
}

fn default_success() -> bool {
    true
}
