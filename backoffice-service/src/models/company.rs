//! Company (tenant) and user models, plan tiers and feature gating.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Gated application features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Invoicing,
    Documents,
    EmailLog,
    Dashboard,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::Invoicing,
        Feature::Documents,
        Feature::EmailLog,
        Feature::Dashboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Invoicing => "invoicing",
            Feature::Documents => "documents",
            Feature::EmailLog => "email_log",
            Feature::Dashboard => "dashboard",
        }
    }
}

/// Subscription plan tier. A closed set: every tier answers for every
/// feature, so a missing flag is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanTier {
    Trial,
    Basic,
    Premium,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Trial => "TRIAL",
            PlanTier::Basic => "BASIC",
            PlanTier::Premium => "PREMIUM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TRIAL" => Some(PlanTier::Trial),
            "BASIC" => Some(PlanTier::Basic),
            "PREMIUM" => Some(PlanTier::Premium),
            _ => None,
        }
    }

    pub fn allows(&self, feature: Feature) -> bool {
        match self {
            PlanTier::Trial => matches!(feature, Feature::Invoicing | Feature::Documents),
            PlanTier::Basic => matches!(
                feature,
                Feature::Invoicing | Feature::Documents | Feature::EmailLog
            ),
            PlanTier::Premium => true,
        }
    }
}

/// User role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Geschaeftsfuehrer,
    Mitarbeiter,
    Kunde,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Geschaeftsfuehrer => "GESCHAEFTSFUEHRER",
            Role::Mitarbeiter => "MITARBEITER",
            Role::Kunde => "KUNDE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GESCHAEFTSFUEHRER" => Some(Role::Geschaeftsfuehrer),
            "MITARBEITER" => Some(Role::Mitarbeiter),
            "KUNDE" => Some(Role::Kunde),
            _ => None,
        }
    }
}

/// Company (tenant) row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub inhaber_vorname: Option<String>,
    pub inhaber_nachname: Option<String>,
    pub unternehmensname: Option<String>,
    pub unternehmensform: Option<String>,
    pub ust_id_nr: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub strasse: Option<String>,
    pub plz: Option<String>,
    pub ort: Option<String>,
    pub plan_tier: String,
    pub paid_until: Option<NaiveDate>,
    pub on_trial: bool,
    pub header_text: Option<String>,
    pub footer_text: Option<String>,
    pub created_on: NaiveDate,
    pub updated_on: NaiveDate,
}

impl Company {
    pub fn plan(&self) -> Option<PlanTier> {
        PlanTier::parse(&self.plan_tier)
    }

    /// A subscription is active while on trial or paid through today.
    pub fn subscription_active(&self, today: NaiveDate) -> bool {
        self.on_trial || self.paid_until.map(|d| d >= today).unwrap_or(false)
    }

    pub fn subscription_active_now(&self) -> bool {
        self.subscription_active(Utc::now().date_naive())
    }
}

/// Partial company update (tenant self-service).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCompany {
    pub name: Option<String>,
    pub inhaber_vorname: Option<String>,
    pub inhaber_nachname: Option<String>,
    pub unternehmensname: Option<String>,
    pub unternehmensform: Option<String>,
    pub ust_id_nr: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub strasse: Option<String>,
    pub plz: Option<String>,
    pub ort: Option<String>,
    pub header_text: Option<String>,
    pub footer_text: Option<String>,
}

/// User row. The password hash never serializes outward.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub company_id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub status: String,
    pub mitarbeiter_kuerzel: Option<String>,
}

/// Input for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub mitarbeiter_kuerzel: Option<String>,
}

/// Partial user update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub mitarbeiter_kuerzel: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tier_answers_every_feature() {
        // The plan table is closed: allows() is total over tiers x features.
        for tier in [PlanTier::Trial, PlanTier::Basic, PlanTier::Premium] {
            for feature in Feature::ALL {
                let _ = tier.allows(feature);
            }
        }
    }

    #[test]
    fn premium_allows_everything() {
        for feature in Feature::ALL {
            assert!(PlanTier::Premium.allows(feature));
        }
    }

    #[test]
    fn trial_excludes_email_log_and_dashboard() {
        assert!(PlanTier::Trial.allows(Feature::Invoicing));
        assert!(!PlanTier::Trial.allows(Feature::EmailLog));
        assert!(!PlanTier::Trial.allows(Feature::Dashboard));
        assert!(PlanTier::Basic.allows(Feature::EmailLog));
        assert!(!PlanTier::Basic.allows(Feature::Dashboard));
    }

    #[test]
    fn subscription_activity() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let mut company = sample_company();

        company.on_trial = true;
        assert!(company.subscription_active(today));

        company.on_trial = false;
        company.paid_until = None;
        assert!(!company.subscription_active(today));

        company.paid_until = Some(today);
        assert!(company.subscription_active(today));

        company.paid_until = today.pred_opt();
        assert!(!company.subscription_active(today));
    }

    fn sample_company() -> Company {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        Company {
            id: Uuid::new_v4(),
            name: "bestatter".to_string(),
            inhaber_vorname: None,
            inhaber_nachname: None,
            unternehmensname: None,
            unternehmensform: None,
            ust_id_nr: None,
            email: None,
            phone: None,
            strasse: None,
            plz: None,
            ort: None,
            plan_tier: "TRIAL".to_string(),
            paid_until: None,
            on_trial: true,
            header_text: None,
            footer_text: None,
            created_on: today,
            updated_on: today,
        }
    }
}
