//! Invoice line item (Rechnungsposition) model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Line item category. Wire values match the upstream three-letter codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    /// Auslagen
    Exp,
    /// Fremdleistung
    Ext,
    /// Eigenleistung
    Own,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Exp => "EXP",
            Category::Ext => "EXT",
            Category::Own => "OWN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EXP" => Some(Category::Exp),
            "EXT" => Some(Category::Ext),
            "OWN" => Some(Category::Own),
            _ => None,
        }
    }
}

/// Line item row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LineItem {
    pub id: Uuid,
    pub company_id: Uuid,
    pub rechnung_id: Uuid,
    pub category: Option<String>,
    pub produkt: Option<String>,
    pub menge: Option<Decimal>,
    pub preis: Option<Decimal>,
    pub mwst: Option<Decimal>,
    pub betrag: Option<Decimal>,
}

/// Input for creating a line item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLineItem {
    pub category: Option<String>,
    pub produkt: Option<String>,
    pub menge: Option<Decimal>,
    pub preis: Option<Decimal>,
    pub mwst: Option<Decimal>,
    pub betrag: Option<Decimal>,
}

/// Input for a partial line item update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLineItem {
    pub category: Option<String>,
    pub produkt: Option<String>,
    pub menge: Option<Decimal>,
    pub preis: Option<Decimal>,
    pub mwst: Option<Decimal>,
    pub betrag: Option<Decimal>,
}

/// Per-category amount totals for one year, missing amounts as zero.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTotal {
    pub category: &'static str,
    pub total_betrag: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_codes_round_trip() {
        for c in [Category::Exp, Category::Ext, Category::Own] {
            assert_eq!(Category::parse(c.as_str()), Some(c));
        }
        assert_eq!(Category::parse("FOO"), None);
    }
}
