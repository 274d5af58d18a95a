//! Case persistence: yearly order numbering, search, dashboard aggregates.

use super::Database;
use crate::models::{
    distribution_key, next_auftragsnummer, Case, CaseListParams, CaseListResponse, CreateCase,
    DashboardData, UpdateCase,
};
use crate::services::metrics::{CASES_TOTAL, DB_QUERY_DURATION};
use chrono::{Datelike, NaiveDate, Utc};
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: u32 = 100;
const MAX_PAGE_SIZE: u32 = 1000;

/// Escape LIKE metacharacters so a search term matches literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn age_in_years(birth: NaiveDate, death: NaiveDate) -> Option<i64> {
    let mut age = i64::from(death.year() - birth.year());
    if (death.month(), death.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    (age >= 0).then_some(age)
}

impl Database {
    /// Create a case, minting the next order number for the current year.
    ///
    /// The per-tenant, per-year advisory lock serializes concurrent creates
    /// so two requests can never mint the same number.
    #[instrument(skip(self, input), fields(company_id = %company_id))]
    pub async fn create_case(
        &self,
        company_id: Uuid,
        actor: Option<&str>,
        input: &CreateCase,
    ) -> Result<Case, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_case"])
            .start_timer();

        let mut input = input.clone();
        input.apply_address_sync();

        let anlage_von = input
            .anlage_von
            .clone()
            .or_else(|| actor.map(String::from));
        let zuletzt_bearbeitet_von = input
            .zuletzt_bearbeitet_von
            .clone()
            .or_else(|| actor.map(String::from));

        let mut tx = self.pool().begin().await?;

        let year2 = Utc::now().year() % 100;
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1), $2)")
            .bind(company_id.to_string())
            .bind(year2)
            .execute(&mut *tx)
            .await?;

        let last: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(auftragsnummer) FROM cases
             WHERE company_id = $1 AND auftragsnummer >= $2 AND auftragsnummer < $3",
        )
        .bind(company_id)
        .bind(year2 * 1000)
        .bind((year2 + 1) * 1000)
        .fetch_one(&mut *tx)
        .await?;

        let auftragsnummer = next_auftragsnummer(year2, last);

        let case = sqlx::query_as::<_, Case>(
            r#"
            INSERT INTO cases (
                uuid, company_id, auftragsnummer,
                aufnahme_von, anlage_von, zuletzt_bearbeitet_von, info,
                auftraggeber_anrede, auftraggeber_titel, auftraggeber_vorname,
                auftraggeber_nachname, auftraggeber_beziehung, auftraggeber_geburtsdatum,
                auftraggeber_strasse, auftraggeber_plz, auftraggeber_stadt,
                auftraggeber_land, auftraggeber_telefon, auftraggeber_mobil,
                auftraggeber_email,
                verstorbener_anrede, verstorbener_titel, verstorbener_vorname,
                verstorbener_nachname, verstorbener_geburtsname, verstorbener_familienstand,
                verstorbener_konfession, verstorbener_geburtsdatum, verstorbener_geschlecht,
                verstorbener_geburtsort, verstorbener_staatsangehoerigkeit,
                verstorbener_strasse, verstorbener_plz, verstorbener_stadt,
                verstorbener_land, verstorbener_krankenkasse, verstorbener_versicherungsnummer,
                sterbedaten_institution, sterbedaten_strasse, sterbedaten_plz,
                sterbedaten_ort, sterbedaten_standesamt, sterbedaten_todeszeitpunkt,
                sterbedaten_todesart, sterbedaten_arzt,
                bestattung_institution, bestattungsort_strasse, bestattungsort_plz,
                bestattungsort_ort, bestattungsort_grabart, bestattungsart,
                ruhestaette, grabbezeichnung1, grabbezeichnung2, grablage1, grablage2,
                partner_anrede, partner_titel, partner_vorname, partner_nachname,
                partner_geburtsname, partner_strasse, partner_plz, partner_ort,
                partner_land, partner_geburtsdatum, partner_heiratsdatum, partner_sterbedatum,
                synchronize_addresses, synchronize_adresse
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                $21, $22, $23, $24, $25, $26, $27, $28, $29, $30,
                $31, $32, $33, $34, $35, $36, $37, $38, $39, $40,
                $41, $42, $43, $44, $45, $46, $47, $48, $49, $50,
                $51, $52, $53, $54, $55, $56, $57, $58, $59, $60,
                $61, $62, $63, $64, $65, $66, $67, $68, $69, $70
            )
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(auftragsnummer)
        .bind(&input.aufnahme_von)
        .bind(&anlage_von)
        .bind(&zuletzt_bearbeitet_von)
        .bind(&input.info)
        .bind(&input.auftraggeber_anrede)
        .bind(&input.auftraggeber_titel)
        .bind(&input.auftraggeber_vorname)
        .bind(&input.auftraggeber_nachname)
        .bind(&input.auftraggeber_beziehung)
        .bind(input.auftraggeber_geburtsdatum)
        .bind(&input.auftraggeber_strasse)
        .bind(&input.auftraggeber_plz)
        .bind(&input.auftraggeber_stadt)
        .bind(&input.auftraggeber_land)
        .bind(&input.auftraggeber_telefon)
        .bind(&input.auftraggeber_mobil)
        .bind(&input.auftraggeber_email)
        .bind(&input.verstorbener_anrede)
        .bind(&input.verstorbener_titel)
        .bind(&input.verstorbener_vorname)
        .bind(&input.verstorbener_nachname)
        .bind(&input.verstorbener_geburtsname)
        .bind(&input.verstorbener_familienstand)
        .bind(&input.verstorbener_konfession)
        .bind(input.verstorbener_geburtsdatum)
        .bind(&input.verstorbener_geschlecht)
        .bind(&input.verstorbener_geburtsort)
        .bind(&input.verstorbener_staatsangehoerigkeit)
        .bind(&input.verstorbener_strasse)
        .bind(&input.verstorbener_plz)
        .bind(&input.verstorbener_stadt)
        .bind(&input.verstorbener_land)
        .bind(&input.verstorbener_krankenkasse)
        .bind(&input.verstorbener_versicherungsnummer)
        .bind(&input.sterbedaten_institution)
        .bind(&input.sterbedaten_strasse)
        .bind(&input.sterbedaten_plz)
        .bind(&input.sterbedaten_ort)
        .bind(&input.sterbedaten_standesamt)
        .bind(input.sterbedaten_todeszeitpunkt)
        .bind(&input.sterbedaten_todesart)
        .bind(&input.sterbedaten_arzt)
        .bind(&input.bestattung_institution)
        .bind(&input.bestattungsort_strasse)
        .bind(&input.bestattungsort_plz)
        .bind(&input.bestattungsort_ort)
        .bind(&input.bestattungsort_grabart)
        .bind(&input.bestattungsart)
        .bind(&input.ruhestaette)
        .bind(&input.grabbezeichnung1)
        .bind(&input.grabbezeichnung2)
        .bind(&input.grablage1)
        .bind(&input.grablage2)
        .bind(&input.partner_anrede)
        .bind(&input.partner_titel)
        .bind(&input.partner_vorname)
        .bind(&input.partner_nachname)
        .bind(&input.partner_geburtsname)
        .bind(&input.partner_strasse)
        .bind(&input.partner_plz)
        .bind(&input.partner_ort)
        .bind(&input.partner_land)
        .bind(input.partner_geburtsdatum)
        .bind(input.partner_heiratsdatum)
        .bind(input.partner_sterbedatum)
        .bind(input.synchronize_addresses)
        .bind(input.synchronize_adresse)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.observe_duration();

        let year_label = year2.to_string();
        CASES_TOTAL.with_label_values(&[year_label.as_str()]).inc();
        info!(
            case_id = %case.uuid,
            auftragsnummer = case.auftragsnummer,
            "Case created"
        );

        Ok(case)
    }

    /// Fetch a single case scoped to the tenant.
    #[instrument(skip(self))]
    pub async fn get_case(
        &self,
        company_id: Uuid,
        case_id: Uuid,
    ) -> Result<Option<Case>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_case"])
            .start_timer();

        let case = sqlx::query_as::<_, Case>(
            "SELECT * FROM cases WHERE uuid = $1 AND company_id = $2",
        )
        .bind(case_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;

        timer.observe_duration();
        Ok(case)
    }

    /// List cases with search, year filter and pagination, newest first.
    ///
    /// A multi-word search additionally matches first word against first
    /// names and last word against last names, so "Max Mustermann" finds the
    /// person even though neither column contains the full string.
    #[instrument(skip(self, params))]
    pub async fn list_cases(
        &self,
        company_id: Uuid,
        params: &CaseListParams,
    ) -> Result<CaseListResponse, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_cases"])
            .start_timer();

        let page = params.page.unwrap_or(1).max(1);
        let page_size = params
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1) as i64 * page_size as i64;

        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let (first_token, last_token) = match search {
            Some(s) => {
                let tokens: Vec<&str> = s.split_whitespace().collect();
                (
                    tokens.first().map(|t| escape_like(t)),
                    tokens.last().map(|t| escape_like(t)),
                )
            }
            None => (None, None),
        };
        let search = search.map(escape_like);
        const FILTER: &str = r#"
            company_id = $1
            AND ($2::int IS NULL OR EXTRACT(YEAR FROM sterbedaten_todeszeitpunkt) = $2)
            AND (
                $3::text IS NULL
                OR auftraggeber_vorname ILIKE '%' || $3 || '%'
                OR auftraggeber_nachname ILIKE '%' || $3 || '%'
                OR verstorbener_vorname ILIKE '%' || $3 || '%'
                OR verstorbener_nachname ILIKE '%' || $3 || '%'
                OR CAST(auftragsnummer AS TEXT) ILIKE '%' || $3 || '%'
                OR (auftraggeber_vorname ILIKE '%' || $4 || '%'
                    AND auftraggeber_nachname ILIKE '%' || $5 || '%')
                OR (verstorbener_vorname ILIKE '%' || $4 || '%'
                    AND verstorbener_nachname ILIKE '%' || $5 || '%')
            )
        "#;

        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM cases WHERE {}",
            FILTER
        ))
        .bind(company_id)
        .bind(params.year)
        .bind(&search)
        .bind(&first_token)
        .bind(&last_token)
        .fetch_one(self.pool())
        .await?;

        let results = sqlx::query_as::<_, Case>(&format!(
            "SELECT * FROM cases WHERE {} ORDER BY auftragsnummer DESC LIMIT $6 OFFSET $7",
            FILTER
        ))
        .bind(company_id)
        .bind(params.year)
        .bind(&search)
        .bind(&first_token)
        .bind(&last_token)
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        timer.observe_duration();

        Ok(CaseListResponse {
            count,
            page,
            page_size,
            results,
        })
    }

    /// Partial update. The order number and creation data are immutable.
    #[instrument(skip(self, input))]
    pub async fn update_case(
        &self,
        company_id: Uuid,
        case_id: Uuid,
        actor: Option<&str>,
        input: &UpdateCase,
    ) -> Result<Option<Case>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_case"])
            .start_timer();

        let Some(mut existing) = self.get_case(company_id, case_id).await? else {
            return Ok(None);
        };

        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(
                    if input.$field.is_some() {
                        existing.$field = input.$field.clone();
                    }
                )*
            };
        }

        merge!(
            aufnahme_von,
            anlage_von,
            zuletzt_bearbeitet_von,
            info,
            auftraggeber_anrede,
            auftraggeber_titel,
            auftraggeber_vorname,
            auftraggeber_nachname,
            auftraggeber_beziehung,
            auftraggeber_geburtsdatum,
            auftraggeber_strasse,
            auftraggeber_plz,
            auftraggeber_stadt,
            auftraggeber_land,
            auftraggeber_telefon,
            auftraggeber_mobil,
            auftraggeber_email,
            verstorbener_anrede,
            verstorbener_titel,
            verstorbener_vorname,
            verstorbener_nachname,
            verstorbener_geburtsname,
            verstorbener_familienstand,
            verstorbener_konfession,
            verstorbener_geburtsdatum,
            verstorbener_geschlecht,
            verstorbener_geburtsort,
            verstorbener_staatsangehoerigkeit,
            verstorbener_strasse,
            verstorbener_plz,
            verstorbener_stadt,
            verstorbener_land,
            verstorbener_krankenkasse,
            verstorbener_versicherungsnummer,
            sterbedaten_institution,
            sterbedaten_strasse,
            sterbedaten_plz,
            sterbedaten_ort,
            sterbedaten_standesamt,
            sterbedaten_todeszeitpunkt,
            sterbedaten_todesart,
            sterbedaten_arzt,
            bestattung_institution,
            bestattungsort_strasse,
            bestattungsort_plz,
            bestattungsort_ort,
            bestattungsort_grabart,
            bestattungsart,
            ruhestaette,
            grabbezeichnung1,
            grabbezeichnung2,
            grablage1,
            grablage2,
            partner_anrede,
            partner_titel,
            partner_vorname,
            partner_nachname,
            partner_geburtsname,
            partner_strasse,
            partner_plz,
            partner_ort,
            partner_land,
            partner_geburtsdatum,
            partner_heiratsdatum,
            partner_sterbedatum,
        );

        if let Some(v) = input.synchronize_addresses {
            existing.synchronize_addresses = v;
        }
        if let Some(v) = input.synchronize_adresse {
            existing.synchronize_adresse = v;
        }
        if let Some(actor) = actor {
            existing.zuletzt_bearbeitet_von = Some(actor.to_string());
        }

        existing.apply_address_sync();

        let case = sqlx::query_as::<_, Case>(
            r#"
            UPDATE cases SET
                aufnahme_von = $1, anlage_von = $2, zuletzt_bearbeitet_von = $3, info = $4,
                auftraggeber_anrede = $5, auftraggeber_titel = $6, auftraggeber_vorname = $7,
                auftraggeber_nachname = $8, auftraggeber_beziehung = $9,
                auftraggeber_geburtsdatum = $10, auftraggeber_strasse = $11,
                auftraggeber_plz = $12, auftraggeber_stadt = $13, auftraggeber_land = $14,
                auftraggeber_telefon = $15, auftraggeber_mobil = $16, auftraggeber_email = $17,
                verstorbener_anrede = $18, verstorbener_titel = $19, verstorbener_vorname = $20,
                verstorbener_nachname = $21, verstorbener_geburtsname = $22,
                verstorbener_familienstand = $23, verstorbener_konfession = $24,
                verstorbener_geburtsdatum = $25, verstorbener_geschlecht = $26,
                verstorbener_geburtsort = $27, verstorbener_staatsangehoerigkeit = $28,
                verstorbener_strasse = $29, verstorbener_plz = $30, verstorbener_stadt = $31,
                verstorbener_land = $32, verstorbener_krankenkasse = $33,
                verstorbener_versicherungsnummer = $34,
                sterbedaten_institution = $35, sterbedaten_strasse = $36,
                sterbedaten_plz = $37, sterbedaten_ort = $38, sterbedaten_standesamt = $39,
                sterbedaten_todeszeitpunkt = $40, sterbedaten_todesart = $41,
                sterbedaten_arzt = $42,
                bestattung_institution = $43, bestattungsort_strasse = $44,
                bestattungsort_plz = $45, bestattungsort_ort = $46,
                bestattungsort_grabart = $47, bestattungsart = $48, ruhestaette = $49,
                grabbezeichnung1 = $50, grabbezeichnung2 = $51, grablage1 = $52,
                grablage2 = $53,
                partner_anrede = $54, partner_titel = $55, partner_vorname = $56,
                partner_nachname = $57, partner_geburtsname = $58, partner_strasse = $59,
                partner_plz = $60, partner_ort = $61, partner_land = $62,
                partner_geburtsdatum = $63, partner_heiratsdatum = $64,
                partner_sterbedatum = $65,
                synchronize_addresses = $66, synchronize_adresse = $67
            WHERE uuid = $68 AND company_id = $69
            RETURNING *
            "#,
        )
        .bind(&existing.aufnahme_von)
        .bind(&existing.anlage_von)
        .bind(&existing.zuletzt_bearbeitet_von)
        .bind(&existing.info)
        .bind(&existing.auftraggeber_anrede)
        .bind(&existing.auftraggeber_titel)
        .bind(&existing.auftraggeber_vorname)
        .bind(&existing.auftraggeber_nachname)
        .bind(&existing.auftraggeber_beziehung)
        .bind(existing.auftraggeber_geburtsdatum)
        .bind(&existing.auftraggeber_strasse)
        .bind(&existing.auftraggeber_plz)
        .bind(&existing.auftraggeber_stadt)
        .bind(&existing.auftraggeber_land)
        .bind(&existing.auftraggeber_telefon)
        .bind(&existing.auftraggeber_mobil)
        .bind(&existing.auftraggeber_email)
        .bind(&existing.verstorbener_anrede)
        .bind(&existing.verstorbener_titel)
        .bind(&existing.verstorbener_vorname)
        .bind(&existing.verstorbener_nachname)
        .bind(&existing.verstorbener_geburtsname)
        .bind(&existing.verstorbener_familienstand)
        .bind(&existing.verstorbener_konfession)
        .bind(existing.verstorbener_geburtsdatum)
        .bind(&existing.verstorbener_geschlecht)
        .bind(&existing.verstorbener_geburtsort)
        .bind(&existing.verstorbener_staatsangehoerigkeit)
        .bind(&existing.verstorbener_strasse)
        .bind(&existing.verstorbener_plz)
        .bind(&existing.verstorbener_stadt)
        .bind(&existing.verstorbener_land)
        .bind(&existing.verstorbener_krankenkasse)
        .bind(&existing.verstorbener_versicherungsnummer)
        .bind(&existing.sterbedaten_institution)
        .bind(&existing.sterbedaten_strasse)
        .bind(&existing.sterbedaten_plz)
        .bind(&existing.sterbedaten_ort)
        .bind(&existing.sterbedaten_standesamt)
        .bind(existing.sterbedaten_todeszeitpunkt)
        .bind(&existing.sterbedaten_todesart)
        .bind(&existing.sterbedaten_arzt)
        .bind(&existing.bestattung_institution)
        .bind(&existing.bestattungsort_strasse)
        .bind(&existing.bestattungsort_plz)
        .bind(&existing.bestattungsort_ort)
        .bind(&existing.bestattungsort_grabart)
        .bind(&existing.bestattungsart)
        .bind(&existing.ruhestaette)
        .bind(&existing.grabbezeichnung1)
        .bind(&existing.grabbezeichnung2)
        .bind(&existing.grablage1)
        .bind(&existing.grablage2)
        .bind(&existing.partner_anrede)
        .bind(&existing.partner_titel)
        .bind(&existing.partner_vorname)
        .bind(&existing.partner_nachname)
        .bind(&existing.partner_geburtsname)
        .bind(&existing.partner_strasse)
        .bind(&existing.partner_plz)
        .bind(&existing.partner_ort)
        .bind(&existing.partner_land)
        .bind(existing.partner_geburtsdatum)
        .bind(existing.partner_heiratsdatum)
        .bind(existing.partner_sterbedatum)
        .bind(existing.synchronize_addresses)
        .bind(existing.synchronize_adresse)
        .bind(case_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;

        timer.observe_duration();
        Ok(case)
    }

    /// Delete a case. Invoices referencing it keep their snapshot data; the
    /// foreign key nulls out on delete.
    #[instrument(skip(self))]
    pub async fn delete_case(&self, company_id: Uuid, case_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_case"])
            .start_timer();

        let result = sqlx::query("DELETE FROM cases WHERE uuid = $1 AND company_id = $2")
            .bind(case_id)
            .bind(company_id)
            .execute(self.pool())
            .await?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(case_id = %case_id, "Case deleted");
        }
        Ok(deleted)
    }

    /// Aggregate dashboard figures, optionally restricted to one year's cases.
    #[instrument(skip(self))]
    pub async fn dashboard_data(
        &self,
        company_id: Uuid,
        year: Option<i32>,
    ) -> Result<DashboardData, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["dashboard_data"])
            .start_timer();

        #[derive(sqlx::FromRow)]
        struct DashboardRow {
            verstorbener_geburtsdatum: Option<NaiveDate>,
            sterbedaten_todeszeitpunkt: Option<NaiveDate>,
            verstorbener_geschlecht: Option<String>,
            verstorbener_konfession: Option<String>,
            bestattungsart: Option<String>,
        }

        let rows = sqlx::query_as::<_, DashboardRow>(
            r#"
            SELECT verstorbener_geburtsdatum, sterbedaten_todeszeitpunkt,
                   verstorbener_geschlecht, verstorbener_konfession, bestattungsart
            FROM cases
            WHERE company_id = $1
              AND ($2::int IS NULL OR EXTRACT(YEAR FROM sterbedaten_todeszeitpunkt) = $2)
            "#,
        )
        .bind(company_id)
        .bind(year)
        .fetch_all(self.pool())
        .await?;

        let mut data = DashboardData::default();
        let mut age_sum = 0i64;
        let mut age_count = 0i64;

        for row in &rows {
            if let (Some(birth), Some(death)) =
                (row.verstorbener_geburtsdatum, row.sterbedaten_todeszeitpunkt)
            {
                if let Some(age) = age_in_years(birth, death) {
                    age_sum += age;
                    age_count += 1;
                }
            }

            *data
                .gender_distribution
                .entry(distribution_key(row.verstorbener_geschlecht.as_deref()))
                .or_insert(0) += 1;
            *data
                .konfession_distribution
                .entry(distribution_key(row.verstorbener_konfession.as_deref()))
                .or_insert(0) += 1;
            *data
                .burial_type_distribution
                .entry(distribution_key(row.bestattungsart.as_deref()))
                .or_insert(0) += 1;
        }

        if age_count > 0 {
            data.average_age = Some(age_sum as f64 / age_count as f64);
        }

        timer.observe_duration();
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_counts_completed_years() {
        let birth = NaiveDate::from_ymd_opt(1950, 6, 15).unwrap();
        assert_eq!(
            age_in_years(birth, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()),
            Some(73)
        );
        assert_eq!(
            age_in_years(birth, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()),
            Some(74)
        );
    }

    #[test]
    fn age_rejects_death_before_birth() {
        let birth = NaiveDate::from_ymd_opt(1950, 6, 15).unwrap();
        let death = NaiveDate::from_ymd_opt(1949, 1, 1).unwrap();
        assert_eq!(age_in_years(birth, death), None);
    }

    #[test]
    fn search_terms_match_like_metacharacters_literally() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("Meyer_Sohn"), "Meyer\\_Sohn");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("Müller"), "Müller");
    }
}
