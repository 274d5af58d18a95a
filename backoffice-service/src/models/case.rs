//! Case record (Sterbefall) model.
//!
//! One row per funeral case: orderer (Auftraggeber), deceased (Verstorbener),
//! death data, burial site and an optional spouse/partner record embedded as
//! flat fields, matching the upstream wire format.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

/// Compute the next order number for a year.
///
/// Order numbers have the form YYNNN: two-digit year followed by a zero-padded
/// running count that restarts at 1 with the first case of each calendar year.
/// `last_for_year` is the highest existing number starting with `year2`.
pub fn next_auftragsnummer(year2: i32, last_for_year: Option<i32>) -> i32 {
    let running = match last_for_year {
        Some(last) => (last % 1000) + 1,
        None => 1,
    };
    year2 * 1000 + running
}

/// Case row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Case {
    pub uuid: Uuid,
    pub company_id: Uuid,
    pub auftragsnummer: i32,
    pub auftrags_datum: NaiveDate,
    pub aufnahme_von: Option<String>,
    pub anlage_von: Option<String>,
    pub zuletzt_bearbeitet_von: Option<String>,
    pub info: Option<String>,

    // Auftraggeber (orderer)
    pub auftraggeber_anrede: Option<String>,
    pub auftraggeber_titel: Option<String>,
    pub auftraggeber_vorname: Option<String>,
    pub auftraggeber_nachname: Option<String>,
    pub auftraggeber_beziehung: Option<String>,
    pub auftraggeber_geburtsdatum: Option<NaiveDate>,
    pub auftraggeber_strasse: Option<String>,
    pub auftraggeber_plz: Option<String>,
    pub auftraggeber_stadt: Option<String>,
    pub auftraggeber_land: Option<String>,
    pub auftraggeber_telefon: Option<String>,
    pub auftraggeber_mobil: Option<String>,
    pub auftraggeber_email: Option<String>,

    // Verstorbener (deceased)
    pub verstorbener_anrede: Option<String>,
    pub verstorbener_titel: Option<String>,
    pub verstorbener_vorname: Option<String>,
    pub verstorbener_nachname: Option<String>,
    pub verstorbener_geburtsname: Option<String>,
    pub verstorbener_familienstand: Option<String>,
    pub verstorbener_konfession: Option<String>,
    pub verstorbener_geburtsdatum: Option<NaiveDate>,
    pub verstorbener_geschlecht: Option<String>,
    pub verstorbener_geburtsort: Option<String>,
    pub verstorbener_staatsangehoerigkeit: Option<String>,
    pub verstorbener_strasse: Option<String>,
    pub verstorbener_plz: Option<String>,
    pub verstorbener_stadt: Option<String>,
    pub verstorbener_land: Option<String>,
    pub verstorbener_krankenkasse: Option<String>,
    pub verstorbener_versicherungsnummer: Option<String>,

    // Sterbedaten (death data)
    pub sterbedaten_institution: Option<String>,
    pub sterbedaten_strasse: Option<String>,
    pub sterbedaten_plz: Option<String>,
    pub sterbedaten_ort: Option<String>,
    pub sterbedaten_standesamt: Option<String>,
    pub sterbedaten_todeszeitpunkt: Option<NaiveDate>,
    pub sterbedaten_todesart: Option<String>,
    pub sterbedaten_arzt: Option<String>,

    // Bestattung (burial site and grave)
    pub bestattung_institution: Option<String>,
    pub bestattungsort_strasse: Option<String>,
    pub bestattungsort_plz: Option<String>,
    pub bestattungsort_ort: Option<String>,
    pub bestattungsort_grabart: Option<String>,
    pub bestattungsart: Option<String>,
    pub ruhestaette: Option<String>,
    pub grabbezeichnung1: Option<String>,
    pub grabbezeichnung2: Option<String>,
    pub grablage1: Option<String>,
    pub grablage2: Option<String>,

    // Partner (embedded spouse record)
    pub partner_anrede: Option<String>,
    pub partner_titel: Option<String>,
    pub partner_vorname: Option<String>,
    pub partner_nachname: Option<String>,
    pub partner_geburtsname: Option<String>,
    pub partner_strasse: Option<String>,
    pub partner_plz: Option<String>,
    pub partner_ort: Option<String>,
    pub partner_land: Option<String>,
    pub partner_geburtsdatum: Option<NaiveDate>,
    pub partner_heiratsdatum: Option<NaiveDate>,
    pub partner_sterbedatum: Option<NaiveDate>,

    pub synchronize_addresses: bool,
    pub synchronize_adresse: bool,
    pub created_utc: DateTime<Utc>,
}

impl Case {
    /// Apply the address synchronization flags before persisting, in the same
    /// order as the upstream save hook: deceased address onto the orderer
    /// first, then orderer address onto the partner.
    pub fn apply_address_sync(&mut self) {
        if self.synchronize_adresse {
            self.auftraggeber_strasse = self.verstorbener_strasse.clone();
            self.auftraggeber_plz = self.verstorbener_plz.clone();
            self.auftraggeber_stadt = self.verstorbener_stadt.clone();
            self.auftraggeber_land = self.verstorbener_land.clone();
        }
        if self.synchronize_addresses {
            self.partner_strasse = self.auftraggeber_strasse.clone();
            self.partner_plz = self.auftraggeber_plz.clone();
            self.partner_ort = self.auftraggeber_stadt.clone();
            self.partner_land = self.auftraggeber_land.clone();
        }
    }
}

/// Input for creating a case. The order number is never client-supplied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateCase {
    pub aufnahme_von: Option<String>,
    pub anlage_von: Option<String>,
    pub zuletzt_bearbeitet_von: Option<String>,
    pub info: Option<String>,
    pub auftraggeber_anrede: Option<String>,
    pub auftraggeber_titel: Option<String>,
    pub auftraggeber_vorname: Option<String>,
    pub auftraggeber_nachname: Option<String>,
    pub auftraggeber_beziehung: Option<String>,
    pub auftraggeber_geburtsdatum: Option<NaiveDate>,
    pub auftraggeber_strasse: Option<String>,
    pub auftraggeber_plz: Option<String>,
    pub auftraggeber_stadt: Option<String>,
    pub auftraggeber_land: Option<String>,
    pub auftraggeber_telefon: Option<String>,
    pub auftraggeber_mobil: Option<String>,
    pub auftraggeber_email: Option<String>,
    pub verstorbener_anrede: Option<String>,
    pub verstorbener_titel: Option<String>,
    pub verstorbener_vorname: Option<String>,
    pub verstorbener_nachname: Option<String>,
    pub verstorbener_geburtsname: Option<String>,
    pub verstorbener_familienstand: Option<String>,
    pub verstorbener_konfession: Option<String>,
    pub verstorbener_geburtsdatum: Option<NaiveDate>,
    pub verstorbener_geschlecht: Option<String>,
    pub verstorbener_geburtsort: Option<String>,
    pub verstorbener_staatsangehoerigkeit: Option<String>,
    pub verstorbener_strasse: Option<String>,
    pub verstorbener_plz: Option<String>,
    pub verstorbener_stadt: Option<String>,
    pub verstorbener_land: Option<String>,
    pub verstorbener_krankenkasse: Option<String>,
    pub verstorbener_versicherungsnummer: Option<String>,
    pub sterbedaten_institution: Option<String>,
    pub sterbedaten_strasse: Option<String>,
    pub sterbedaten_plz: Option<String>,
    pub sterbedaten_ort: Option<String>,
    pub sterbedaten_standesamt: Option<String>,
    pub sterbedaten_todeszeitpunkt: Option<NaiveDate>,
    pub sterbedaten_todesart: Option<String>,
    pub sterbedaten_arzt: Option<String>,
    pub bestattung_institution: Option<String>,
    pub bestattungsort_strasse: Option<String>,
    pub bestattungsort_plz: Option<String>,
    pub bestattungsort_ort: Option<String>,
    pub bestattungsort_grabart: Option<String>,
    pub bestattungsart: Option<String>,
    pub ruhestaette: Option<String>,
    pub grabbezeichnung1: Option<String>,
    pub grabbezeichnung2: Option<String>,
    pub grablage1: Option<String>,
    pub grablage2: Option<String>,
    pub partner_anrede: Option<String>,
    pub partner_titel: Option<String>,
    pub partner_vorname: Option<String>,
    pub partner_nachname: Option<String>,
    pub partner_geburtsname: Option<String>,
    pub partner_strasse: Option<String>,
    pub partner_plz: Option<String>,
    pub partner_ort: Option<String>,
    pub partner_land: Option<String>,
    pub partner_geburtsdatum: Option<NaiveDate>,
    pub partner_heiratsdatum: Option<NaiveDate>,
    pub partner_sterbedatum: Option<NaiveDate>,
    pub synchronize_addresses: bool,
    pub synchronize_adresse: bool,
}

impl CreateCase {
    /// Same synchronization as [`Case::apply_address_sync`], applied to the
    /// incoming payload before the row exists.
    pub fn apply_address_sync(&mut self) {
        if self.synchronize_adresse {
            self.auftraggeber_strasse = self.verstorbener_strasse.clone();
            self.auftraggeber_plz = self.verstorbener_plz.clone();
            self.auftraggeber_stadt = self.verstorbener_stadt.clone();
            self.auftraggeber_land = self.verstorbener_land.clone();
        }
        if self.synchronize_addresses {
            self.partner_strasse = self.auftraggeber_strasse.clone();
            self.partner_plz = self.auftraggeber_plz.clone();
            self.partner_ort = self.auftraggeber_stadt.clone();
            self.partner_land = self.auftraggeber_land.clone();
        }
    }
}

/// Partial case update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCase {
    pub aufnahme_von: Option<String>,
    pub anlage_von: Option<String>,
    pub zuletzt_bearbeitet_von: Option<String>,
    pub info: Option<String>,
    pub auftraggeber_anrede: Option<String>,
    pub auftraggeber_titel: Option<String>,
    pub auftraggeber_vorname: Option<String>,
    pub auftraggeber_nachname: Option<String>,
    pub auftraggeber_beziehung: Option<String>,
    pub auftraggeber_geburtsdatum: Option<NaiveDate>,
    pub auftraggeber_strasse: Option<String>,
    pub auftraggeber_plz: Option<String>,
    pub auftraggeber_stadt: Option<String>,
    pub auftraggeber_land: Option<String>,
    pub auftraggeber_telefon: Option<String>,
    pub auftraggeber_mobil: Option<String>,
    pub auftraggeber_email: Option<String>,
    pub verstorbener_anrede: Option<String>,
    pub verstorbener_titel: Option<String>,
    pub verstorbener_vorname: Option<String>,
    pub verstorbener_nachname: Option<String>,
    pub verstorbener_geburtsname: Option<String>,
    pub verstorbener_familienstand: Option<String>,
    pub verstorbener_konfession: Option<String>,
    pub verstorbener_geburtsdatum: Option<NaiveDate>,
    pub verstorbener_geschlecht: Option<String>,
    pub verstorbener_geburtsort: Option<String>,
    pub verstorbener_staatsangehoerigkeit: Option<String>,
    pub verstorbener_strasse: Option<String>,
    pub verstorbener_plz: Option<String>,
    pub verstorbener_stadt: Option<String>,
    pub verstorbener_land: Option<String>,
    pub verstorbener_krankenkasse: Option<String>,
    pub verstorbener_versicherungsnummer: Option<String>,
    pub sterbedaten_institution: Option<String>,
    pub sterbedaten_strasse: Option<String>,
    pub sterbedaten_plz: Option<String>,
    pub sterbedaten_ort: Option<String>,
    pub sterbedaten_standesamt: Option<String>,
    pub sterbedaten_todeszeitpunkt: Option<NaiveDate>,
    pub sterbedaten_todesart: Option<String>,
    pub sterbedaten_arzt: Option<String>,
    pub bestattung_institution: Option<String>,
    pub bestattungsort_strasse: Option<String>,
    pub bestattungsort_plz: Option<String>,
    pub bestattungsort_ort: Option<String>,
    pub bestattungsort_grabart: Option<String>,
    pub bestattungsart: Option<String>,
    pub ruhestaette: Option<String>,
    pub grabbezeichnung1: Option<String>,
    pub grabbezeichnung2: Option<String>,
    pub grablage1: Option<String>,
    pub grablage2: Option<String>,
    pub partner_anrede: Option<String>,
    pub partner_titel: Option<String>,
    pub partner_vorname: Option<String>,
    pub partner_nachname: Option<String>,
    pub partner_geburtsname: Option<String>,
    pub partner_strasse: Option<String>,
    pub partner_plz: Option<String>,
    pub partner_ort: Option<String>,
    pub partner_land: Option<String>,
    pub partner_geburtsdatum: Option<NaiveDate>,
    pub partner_heiratsdatum: Option<NaiveDate>,
    pub partner_sterbedatum: Option<NaiveDate>,
    pub synchronize_addresses: Option<bool>,
    pub synchronize_adresse: Option<bool>,
}

/// Filter parameters for listing cases.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseListParams {
    pub search: Option<String>,
    pub year: Option<i32>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Paginated case listing.
#[derive(Debug, Serialize)]
pub struct CaseListResponse {
    pub count: i64,
    pub page: u32,
    pub page_size: u32,
    pub results: Vec<Case>,
}

/// Aggregate dashboard figures for one year (or all years).
#[derive(Debug, Default, Serialize)]
pub struct DashboardData {
    pub average_age: Option<f64>,
    pub gender_distribution: HashMap<String, i64>,
    pub konfession_distribution: HashMap<String, i64>,
    pub burial_type_distribution: HashMap<String, i64>,
}

/// Bucket a nullable/blank distribution value the way the upstream dashboard
/// does: trimmed, empty and missing both counted as "Nicht angegeben".
pub fn distribution_key(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "Nicht angegeben".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_case_of_a_year_starts_at_one() {
        assert_eq!(next_auftragsnummer(24, None), 24001);
        assert_eq!(next_auftragsnummer(25, None), 25001);
    }

    #[test]
    fn numbers_increment_within_a_year() {
        assert_eq!(next_auftragsnummer(24, Some(24001)), 24002);
        assert_eq!(next_auftragsnummer(24, Some(24099)), 24100);
        assert_eq!(next_auftragsnummer(24, Some(24999)), 25000);
    }

    #[test]
    fn sync_copies_deceased_address_to_orderer() {
        let mut case = blank_case();
        case.verstorbener_strasse = Some("Hauptstr. 1".to_string());
        case.verstorbener_plz = Some("50667".to_string());
        case.verstorbener_stadt = Some("Köln".to_string());
        case.verstorbener_land = Some("Deutschland".to_string());
        case.synchronize_adresse = true;

        case.apply_address_sync();

        assert_eq!(case.auftraggeber_strasse.as_deref(), Some("Hauptstr. 1"));
        assert_eq!(case.auftraggeber_stadt.as_deref(), Some("Köln"));
        assert!(case.partner_strasse.is_none());
    }

    #[test]
    fn sync_chains_through_to_partner() {
        let mut case = blank_case();
        case.verstorbener_strasse = Some("Hauptstr. 1".to_string());
        case.synchronize_adresse = true;
        case.synchronize_addresses = true;

        case.apply_address_sync();

        assert_eq!(case.partner_strasse.as_deref(), Some("Hauptstr. 1"));
    }

    #[test]
    fn blank_distribution_values_are_bucketed() {
        assert_eq!(distribution_key(None), "Nicht angegeben");
        assert_eq!(distribution_key(Some("  ")), "Nicht angegeben");
        assert_eq!(distribution_key(Some(" römisch-katholisch ")), "römisch-katholisch");
    }

    fn blank_case() -> Case {
        Case {
            uuid: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            auftragsnummer: 24001,
            auftrags_datum: chrono::Utc::now().date_naive(),
            aufnahme_von: None,
            anlage_von: None,
            zuletzt_bearbeitet_von: None,
            info: None,
            auftraggeber_anrede: None,
            auftraggeber_titel: None,
            auftraggeber_vorname: None,
            auftraggeber_nachname: None,
            auftraggeber_beziehung: None,
            auftraggeber_geburtsdatum: None,
            auftraggeber_strasse: None,
            auftraggeber_plz: None,
            auftraggeber_stadt: None,
            auftraggeber_land: None,
            auftraggeber_telefon: None,
            auftraggeber_mobil: None,
            auftraggeber_email: None,
            verstorbener_anrede: None,
            verstorbener_titel: None,
            verstorbener_vorname: None,
            verstorbener_nachname: None,
            verstorbener_geburtsname: None,
            verstorbener_familienstand: None,
            verstorbener_konfession: None,
            verstorbener_geburtsdatum: None,
            verstorbener_geschlecht: None,
            verstorbener_geburtsort: None,
            verstorbener_staatsangehoerigkeit: None,
            verstorbener_strasse: None,
            verstorbener_plz: None,
            verstorbener_stadt: None,
            verstorbener_land: None,
            verstorbener_krankenkasse: None,
            verstorbener_versicherungsnummer: None,
            sterbedaten_institution: None,
            sterbedaten_strasse: None,
            sterbedaten_plz: None,
            sterbedaten_ort: None,
            sterbedaten_standesamt: None,
            sterbedaten_todeszeitpunkt: None,
            sterbedaten_todesart: None,
            sterbedaten_arzt: None,
            bestattung_institution: None,
            bestattungsort_strasse: None,
            bestattungsort_plz: None,
            bestattungsort_ort: None,
            bestattungsort_grabart: None,
            bestattungsart: None,
            ruhestaette: None,
            grabbezeichnung1: None,
            grabbezeichnung2: None,
            grablage1: None,
            grablage2: None,
            partner_anrede: None,
            partner_titel: None,
            partner_vorname: None,
            partner_nachname: None,
            partner_geburtsname: None,
            partner_strasse: None,
            partner_plz: None,
            partner_ort: None,
            partner_land: None,
            partner_geburtsdatum: None,
            partner_heiratsdatum: None,
            partner_sterbedatum: None,
            synchronize_addresses: false,
            synchronize_adresse: false,
            created_utc: Utc::now(),
        }
    }
}
