//! Invoice (Rechnung) model and status workflow.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invoice status. Wire values match the upstream German API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Entwurf,
    Offen,
    Bezahlt,
    Storniert,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Entwurf => "ENTWURF",
            InvoiceStatus::Offen => "OFFEN",
            InvoiceStatus::Bezahlt => "BEZAHLT",
            InvoiceStatus::Storniert => "STORNIERT",
        }
    }

    /// Strict parse. Unknown values are a request error, never a default.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ENTWURF" => Some(InvoiceStatus::Entwurf),
            "OFFEN" => Some(InvoiceStatus::Offen),
            "BEZAHLT" => Some(InvoiceStatus::Bezahlt),
            "STORNIERT" => Some(InvoiceStatus::Storniert),
            _ => None,
        }
    }

    /// The complete transition table. Bezahlt and Storniert are terminal.
    pub fn can_transition_to(&self, target: InvoiceStatus) -> bool {
        matches!(
            (self, target),
            (InvoiceStatus::Entwurf, InvoiceStatus::Offen)
                | (InvoiceStatus::Entwurf, InvoiceStatus::Storniert)
                | (InvoiceStatus::Offen, InvoiceStatus::Bezahlt)
                | (InvoiceStatus::Offen, InvoiceStatus::Storniert)
        )
    }
}

/// Invoice type. Determines the invoice number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceType {
    Rechnung,
    Angebot,
}

impl InvoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Rechnung => "RECHNUNG",
            InvoiceType::Angebot => "ANGEBOT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RECHNUNG" => Some(InvoiceType::Rechnung),
            "ANGEBOT" => Some(InvoiceType::Angebot),
            _ => None,
        }
    }

    pub fn number_prefix(&self) -> &'static str {
        match self {
            InvoiceType::Rechnung => "R",
            InvoiceType::Angebot => "A",
        }
    }
}

/// Number of days between invoice date and payment due date.
pub const ZAHLUNGSZIEL_DAYS: i64 = 21;

/// Derive the invoice number from the case order number, the type prefix and
/// the count of invoices of the same type already on the case:
/// `R24001` for the first, `R24001/2` for the second, offers counted apart.
pub fn build_invoice_number(typ: InvoiceType, auftragsnummer: i32, existing_of_type: i64) -> String {
    if existing_of_type == 0 {
        format!("{}{}", typ.number_prefix(), auftragsnummer)
    } else {
        format!(
            "{}{}/{}",
            typ.number_prefix(),
            auftragsnummer,
            existing_of_type + 1
        )
    }
}

/// One entry in the append-only invoice protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub user: String,
}

/// Invoice row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub company_id: Uuid,
    pub sterbefall_id: Option<Uuid>,
    pub status: String,
    pub rechnung_typ: String,
    pub rechnungsstufe: i32,
    pub original_rechnung_id: Option<Uuid>,
    pub is_standard: bool,
    pub standard_name: Option<String>,
    pub rechnungsnummer: Option<String>,
    pub rechnungsdatum: Option<NaiveDate>,
    pub zahlungsziel: Option<NaiveDate>,
    pub betrag_summe: Decimal,
    pub anrede: Option<String>,
    pub titel: Option<String>,
    pub auftraggeber_vorname: Option<String>,
    pub auftraggeber_nachname: Option<String>,
    pub strasse: Option<String>,
    pub plz: Option<String>,
    pub stadt: Option<String>,
    pub land: Option<String>,
    pub verstorbenen_vorname: Option<String>,
    pub verstorbenen_nachname: Option<String>,
    pub textblock: Option<String>,
    pub is_geschrieben: bool,
    pub protokoll: serde_json::Value,
    pub created_utc: DateTime<Utc>,
}

impl Invoice {
    pub fn status(&self) -> Option<InvoiceStatus> {
        InvoiceStatus::parse(&self.status)
    }

    pub fn typ(&self) -> Option<InvoiceType> {
        InvoiceType::parse(&self.rechnung_typ)
    }

    /// A paid invoice that has been written out is frozen: no further saves,
    /// no deletion. Checked on every persistence path.
    pub fn is_finalized(&self) -> bool {
        self.status == "BEZAHLT" && self.is_geschrieben
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateInvoice {
    pub sterbefall_id: Option<Uuid>,
    #[serde(default)]
    pub rechnung_typ: Option<String>,
    #[serde(default)]
    pub is_standard: bool,
    pub standard_name: Option<String>,
    pub rechnungsdatum: Option<NaiveDate>,
    pub zahlungsziel: Option<NaiveDate>,
    pub betrag_summe: Option<Decimal>,
    pub anrede: Option<String>,
    pub titel: Option<String>,
    pub auftraggeber_vorname: Option<String>,
    pub auftraggeber_nachname: Option<String>,
    pub strasse: Option<String>,
    pub plz: Option<String>,
    pub stadt: Option<String>,
    pub land: Option<String>,
    pub verstorbenen_vorname: Option<String>,
    pub verstorbenen_nachname: Option<String>,
    pub textblock: Option<String>,
}

/// Input for a partial invoice update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInvoice {
    pub status: Option<String>,
    pub standard_name: Option<String>,
    pub rechnungsdatum: Option<NaiveDate>,
    pub zahlungsziel: Option<NaiveDate>,
    pub betrag_summe: Option<Decimal>,
    pub anrede: Option<String>,
    pub titel: Option<String>,
    pub auftraggeber_vorname: Option<String>,
    pub auftraggeber_nachname: Option<String>,
    pub strasse: Option<String>,
    pub plz: Option<String>,
    pub stadt: Option<String>,
    pub land: Option<String>,
    pub verstorbenen_vorname: Option<String>,
    pub verstorbenen_nachname: Option<String>,
    pub textblock: Option<String>,
    pub is_geschrieben: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_is_exhaustive() {
        use InvoiceStatus::*;

        let allowed = [
            (Entwurf, Offen),
            (Entwurf, Storniert),
            (Offen, Bezahlt),
            (Offen, Storniert),
        ];

        for from in [Entwurf, Offen, Bezahlt, Storniert] {
            for to in [Entwurf, Offen, Bezahlt, Storniert] {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{} -> {}",
                    from.as_str(),
                    to.as_str()
                );
            }
        }
    }

    #[test]
    fn terminal_states_reject_everything() {
        for target in [
            InvoiceStatus::Entwurf,
            InvoiceStatus::Offen,
            InvoiceStatus::Bezahlt,
            InvoiceStatus::Storniert,
        ] {
            assert!(!InvoiceStatus::Bezahlt.can_transition_to(target));
            assert!(!InvoiceStatus::Storniert.can_transition_to(target));
        }
    }

    #[test]
    fn draft_cannot_jump_to_paid() {
        assert!(!InvoiceStatus::Entwurf.can_transition_to(InvoiceStatus::Bezahlt));
        assert!(!InvoiceStatus::Offen.can_transition_to(InvoiceStatus::Entwurf));
    }

    #[test]
    fn status_parse_is_strict() {
        assert_eq!(InvoiceStatus::parse("OFFEN"), Some(InvoiceStatus::Offen));
        assert_eq!(InvoiceStatus::parse("offen"), None);
        assert_eq!(InvoiceStatus::parse("PAID"), None);
    }

    #[test]
    fn invoice_numbers_count_per_type() {
        assert_eq!(
            build_invoice_number(InvoiceType::Rechnung, 24001, 0),
            "R24001"
        );
        assert_eq!(
            build_invoice_number(InvoiceType::Rechnung, 24001, 1),
            "R24001/2"
        );
        assert_eq!(
            build_invoice_number(InvoiceType::Angebot, 24001, 0),
            "A24001"
        );
        assert_eq!(
            build_invoice_number(InvoiceType::Angebot, 24001, 2),
            "A24001/3"
        );
    }

    #[test]
    fn finalized_means_paid_and_written() {
        let mut invoice = sample_invoice();
        assert!(!invoice.is_finalized());

        invoice.status = "BEZAHLT".to_string();
        assert!(!invoice.is_finalized());

        invoice.is_geschrieben = true;
        assert!(invoice.is_finalized());

        invoice.status = "OFFEN".to_string();
        assert!(!invoice.is_finalized());
    }

    fn sample_invoice() -> Invoice {
        Invoice {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            sterbefall_id: None,
            status: "ENTWURF".to_string(),
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
            is_geschrieben: false,
            protokoll: serde_json::json!([]),
            created_utc: Utc::now(),
        }
    }
}
