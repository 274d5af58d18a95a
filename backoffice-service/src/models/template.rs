//! Document template (Vorlage) and placeholder instance models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Horizontal gap inserted between chained placeholders.
pub const CHAIN_GAP: f64 = 10.0;

/// Document template row. `datei` is the stored file name; only PDF files
/// are servable for placeholder overlay.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Template {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub kategorie: Option<String>,
    pub datei: Option<String>,
    pub is_vorlage: bool,
}

impl Template {
    pub fn is_pdf(&self) -> bool {
        self.datei
            .as_deref()
            .map(|d| d.to_ascii_lowercase().ends_with(".pdf"))
            .unwrap_or(false)
    }
}

/// Input for creating a template.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    pub kategorie: Option<String>,
    pub datei: Option<String>,
    #[serde(default)]
    pub is_vorlage: bool,
}

/// Partial template update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTemplate {
    pub name: Option<String>,
    pub kategorie: Option<String>,
    pub datei: Option<String>,
    pub is_vorlage: Option<bool>,
}

/// A placeholder bound to a page/position/style on a template. Instances
/// sharing a `chain_id` form an ordered chain that lays out left to right.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlaceholderInstance {
    pub id: Uuid,
    pub company_id: Uuid,
    pub vorlage_id: Uuid,
    pub platzhalter_key: String,
    pub name: Option<String>,
    pub page_number: i32,
    pub x_position: f64,
    pub y_position: f64,
    pub width: f64,
    pub font_size: i32,
    pub font_color: String,
    pub bold: bool,
    pub chain_id: Option<String>,
    pub chain_position: Option<i32>,
}

/// Input for creating a placeholder instance.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlaceholderInstance {
    pub vorlage_id: Uuid,
    pub platzhalter_key: String,
    pub name: Option<String>,
    pub page_number: i32,
    pub x_position: f64,
    pub y_position: f64,
    #[serde(default)]
    pub width: f64,
    pub font_size: Option<i32>,
    pub font_color: Option<String>,
    #[serde(default)]
    pub bold: bool,
    pub chain_id: Option<String>,
    pub chain_position: Option<i32>,
}

/// Partial placeholder instance update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlaceholderInstance {
    pub platzhalter_key: Option<String>,
    pub name: Option<String>,
    pub page_number: Option<i32>,
    pub x_position: Option<f64>,
    pub y_position: Option<f64>,
    pub width: Option<f64>,
    pub font_size: Option<i32>,
    pub font_color: Option<String>,
    pub bold: Option<bool>,
    pub chain_id: Option<String>,
    pub chain_position: Option<i32>,
}

/// Recompute x positions for a chain ordered by chain position. The first
/// instance keeps its position; each subsequent one is placed at
/// `previous.x + previous.width + CHAIN_GAP`. Returns the ids whose position
/// changed so only those rows need persisting.
pub fn relayout_chain(instances: &mut [PlaceholderInstance]) -> Vec<Uuid> {
    let mut changed = Vec::new();
    for i in 1..instances.len() {
        let new_x = instances[i - 1].x_position + instances[i - 1].width + CHAIN_GAP;
        if (instances[i].x_position - new_x).abs() > f64::EPSILON {
            instances[i].x_position = new_x;
            changed.push(instances[i].id);
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(x: f64, width: f64, chain_position: i32) -> PlaceholderInstance {
        PlaceholderInstance {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            vorlage_id: Uuid::new_v4(),
            platzhalter_key: "vorname".to_string(),
            name: None,
            page_number: 1,
            x_position: x,
            y_position: 100.0,
            width,
            font_size: 11,
            font_color: "black".to_string(),
            bold: false,
            chain_id: Some("anschrift".to_string()),
            chain_position: Some(chain_position),
        }
    }

    #[test]
    fn chain_lays_out_left_to_right() {
        let mut chain = vec![
            instance(0.0, 40.0, 0),
            instance(999.0, 25.0, 1),
            instance(1.0, 30.0, 2),
        ];

        let changed = relayout_chain(&mut chain);

        assert_eq!(chain[0].x_position, 0.0);
        assert_eq!(chain[1].x_position, 50.0);
        assert_eq!(chain[2].x_position, 85.0);
        assert_eq!(changed.len(), 2);
    }

    #[test]
    fn aligned_chain_reports_no_changes() {
        let mut chain = vec![instance(0.0, 40.0, 0), instance(50.0, 25.0, 1)];
        assert!(relayout_chain(&mut chain).is_empty());
    }

    #[test]
    fn single_instance_chain_is_untouched() {
        let mut chain = vec![instance(12.0, 40.0, 0)];
        assert!(relayout_chain(&mut chain).is_empty());
        assert_eq!(chain[0].x_position, 12.0);
    }

    #[test]
    fn only_pdf_templates_are_servable() {
        let mut t = Template {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "Sterbeurkunde".to_string(),
            kategorie: None,
            datei: Some("sterbeurkunde.PDF".to_string()),
            is_vorlage: true,
        };
        assert!(t.is_pdf());

        t.datei = Some("sterbeurkunde.docx".to_string());
        assert!(!t.is_pdf());

        t.datei = None;
        assert!(!t.is_pdf());
    }
}
