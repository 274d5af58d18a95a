//! Invoice persistence: numbering, status workflow, corrective re-issuance,
//! line items and the yearly category summary.

use super::{actor_name, ensure_mutable, Database};
use crate::models::{
    build_invoice_number, Case, CategoryTotal, Category, CreateInvoice, CreateLineItem, Invoice,
    InvoiceStatus, InvoiceType, LineItem, ProtocolEvent, UpdateInvoice, UpdateLineItem,
    ZAHLUNGSZIEL_DAYS,
};
use crate::services::metrics::{DB_QUERY_DURATION, INVOICE_TRANSITIONS_TOTAL};
use anyhow::anyhow;
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

fn protocol_event(event_type: &str, actor: Option<&str>) -> ProtocolEvent {
    ProtocolEvent {
        timestamp: Utc::now(),
        event_type: event_type.to_string(),
        user: actor_name(actor).to_string(),
    }
}

/// Dates stamped on the draft -> open transition: the invoice date becomes
/// today and the payment due date follows 21 days later. Every other
/// transition leaves both dates untouched.
fn stamp_dates(
    current: InvoiceStatus,
    target: InvoiceStatus,
    today: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    (current == InvoiceStatus::Entwurf && target == InvoiceStatus::Offen)
        .then(|| (today, today + Duration::days(ZAHLUNGSZIEL_DAYS)))
}

/// A korrektur needs an issued source: drafts have nothing to correct and
/// cancelled invoices are closed. Returns the rejection message.
fn korrektur_blocker(status: InvoiceStatus) -> Option<&'static str> {
    match status {
        InvoiceStatus::Entwurf => Some("Eine Korrektur ist erst ab Status OFFEN möglich."),
        InvoiceStatus::Storniert => {
            Some("Eine stornierte Rechnung kann nicht korrigiert werden.")
        }
        InvoiceStatus::Offen | InvoiceStatus::Bezahlt => None,
    }
}

/// Line total from quantity, unit price and VAT percentage. `None` while
/// quantity or price are missing.
fn line_total(
    menge: Option<Decimal>,
    preis: Option<Decimal>,
    mwst: Option<Decimal>,
) -> Option<Decimal> {
    let menge = menge?;
    let preis = preis?;
    let vat = mwst.unwrap_or(Decimal::ZERO);
    Some(menge * preis * (Decimal::ONE + vat / Decimal::from(100)))
}

fn parse_status(s: &str) -> Result<InvoiceStatus, AppError> {
    InvoiceStatus::parse(s).ok_or_else(|| AppError::BadRequest(anyhow!("Ungültiger Status.")))
}

fn stored_status(invoice: &Invoice) -> Result<InvoiceStatus, AppError> {
    invoice
        .status()
        .ok_or_else(|| AppError::InternalError(anyhow!("Unbekannter Status: {}", invoice.status)))
}

impl Database {
    /// Create an invoice as a draft. When the invoice is attached to a case
    /// the number is derived from the case's order number, and empty address
    /// fields are snapshotted from the case.
    #[instrument(skip(self, input), fields(company_id = %company_id))]
    pub async fn create_invoice(
        &self,
        company_id: Uuid,
        actor: Option<&str>,
        input: &CreateInvoice,
    ) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let typ = match input.rechnung_typ.as_deref() {
            None => InvoiceType::Rechnung,
            Some(s) => InvoiceType::parse(s)
                .ok_or_else(|| AppError::BadRequest(anyhow!("Ungültiger Rechnungstyp.")))?,
        };

        let mut tx = self.pool().begin().await?;

        let mut input = input.clone();
        let mut rechnungsnummer: Option<String> = None;

        if let Some(case_id) = input.sterbefall_id {
            let case = sqlx::query_as::<_, Case>(
                "SELECT * FROM cases WHERE uuid = $1 AND company_id = $2",
            )
            .bind(case_id)
            .bind(company_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Sterbefall nicht gefunden.")))?;

            // Serialize numbering per case and type.
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(format!("rechnungsnummer:{}:{}", case_id, typ.as_str()))
                .execute(&mut *tx)
                .await?;

            let existing: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM invoices
                 WHERE company_id = $1 AND sterbefall_id = $2 AND rechnung_typ = $3",
            )
            .bind(company_id)
            .bind(case_id)
            .bind(typ.as_str())
            .fetch_one(&mut *tx)
            .await?;

            rechnungsnummer = Some(build_invoice_number(typ, case.auftragsnummer, existing));

            // Address and name fields default from the case snapshot.
            input.anrede = input.anrede.or(case.auftraggeber_anrede);
            input.titel = input.titel.or(case.auftraggeber_titel);
            input.auftraggeber_vorname =
                input.auftraggeber_vorname.or(case.auftraggeber_vorname);
            input.auftraggeber_nachname =
                input.auftraggeber_nachname.or(case.auftraggeber_nachname);
            input.strasse = input.strasse.or(case.auftraggeber_strasse);
            input.plz = input.plz.or(case.auftraggeber_plz);
            input.stadt = input.stadt.or(case.auftraggeber_stadt);
            input.land = input.land.or(case.auftraggeber_land);
            input.verstorbenen_vorname =
                input.verstorbenen_vorname.or(case.verstorbener_vorname);
            input.verstorbenen_nachname =
                input.verstorbenen_nachname.or(case.verstorbener_nachname);
        }

        let protokoll = serde_json::json!([protocol_event("ERSTELLT", actor)]);

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                id, company_id, sterbefall_id, status, rechnung_typ, rechnungsstufe,
                original_rechnung_id, is_standard, standard_name, rechnungsnummer,
                rechnungsdatum, zahlungsziel, betrag_summe, anrede, titel,
                auftraggeber_vorname, auftraggeber_nachname, strasse, plz, stadt, land,
                verstorbenen_vorname, verstorbenen_nachname, textblock, protokoll
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24, $25
            )
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(input.sterbefall_id)
        .bind(InvoiceStatus::Entwurf.as_str())
        .bind(typ.as_str())
        .bind(1i32)
        .bind(Option::<Uuid>::None)
        .bind(input.is_standard)
        .bind(&input.standard_name)
        .bind(&rechnungsnummer)
        .bind(input.rechnungsdatum)
        .bind(input.zahlungsziel)
        .bind(input.betrag_summe.unwrap_or(Decimal::ZERO))
        .bind(&input.anrede)
        .bind(&input.titel)
        .bind(&input.auftraggeber_vorname)
        .bind(&input.auftraggeber_nachname)
        .bind(&input.strasse)
        .bind(&input.plz)
        .bind(&input.stadt)
        .bind(&input.land)
        .bind(&input.verstorbenen_vorname)
        .bind(&input.verstorbenen_nachname)
        .bind(&input.textblock)
        .bind(&protokoll)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.observe_duration();

        info!(
            invoice_id = %invoice.id,
            rechnungsnummer = ?invoice.rechnungsnummer,
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Fetch a single invoice scoped to the tenant.
    #[instrument(skip(self))]
    pub async fn get_invoice(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE id = $1 AND company_id = $2",
        )
        .bind(invoice_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;

        timer.observe_duration();
        Ok(invoice)
    }

    /// List invoices, optionally only standard templates or only real ones.
    #[instrument(skip(self))]
    pub async fn list_invoices(
        &self,
        company_id: Uuid,
        is_standard: Option<bool>,
    ) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE company_id = $1 AND ($2::boolean IS NULL OR is_standard = $2)
            ORDER BY created_utc DESC
            "#,
        )
        .bind(company_id)
        .bind(is_standard)
        .fetch_all(self.pool())
        .await?;

        timer.observe_duration();
        Ok(invoices)
    }

    /// All invoices attached to one case, oldest first.
    #[instrument(skip(self))]
    pub async fn invoices_for_case(
        &self,
        company_id: Uuid,
        case_id: Uuid,
    ) -> Result<Vec<Invoice>, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE company_id = $1 AND sterbefall_id = $2
            ORDER BY created_utc ASC
            "#,
        )
        .bind(company_id)
        .bind(case_id)
        .fetch_all(self.pool())
        .await?;
        Ok(invoices)
    }

    /// Partial update. Status changes through this path honor the same
    /// transition table and date stamping as `change_status`, and a finalized
    /// invoice rejects the save outright.
    #[instrument(skip(self, input))]
    pub async fn update_invoice(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        actor: Option<&str>,
        input: &UpdateInvoice,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice"])
            .start_timer();

        let Some(mut existing) = self.get_invoice(company_id, invoice_id).await? else {
            return Ok(None);
        };
        ensure_mutable(&existing)?;

        let mut transition: Option<(InvoiceStatus, InvoiceStatus)> = None;
        if let Some(requested) = &input.status {
            let target = parse_status(requested)?;
            let current = stored_status(&existing)?;
            if target != current {
                if !current.can_transition_to(target) {
                    return Err(AppError::BadRequest(anyhow!(
                        "Statusänderung von {} zu {} ist nicht erlaubt.",
                        current.as_str(),
                        target.as_str()
                    )));
                }
                if let Some((datum, ziel)) =
                    stamp_dates(current, target, Utc::now().date_naive())
                {
                    existing.rechnungsdatum = Some(datum);
                    existing.zahlungsziel = Some(ziel);
                }
                existing.status = target.as_str().to_string();
                transition = Some((current, target));
            }
        }

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
            standard_name,
            anrede,
            titel,
            auftraggeber_vorname,
            auftraggeber_nachname,
            strasse,
            plz,
            stadt,
            land,
            verstorbenen_vorname,
            verstorbenen_nachname,
            textblock,
        );
        if let Some(d) = input.rechnungsdatum {
            existing.rechnungsdatum = Some(d);
        }
        if let Some(d) = input.zahlungsziel {
            existing.zahlungsziel = Some(d);
        }
        if let Some(b) = input.betrag_summe {
            existing.betrag_summe = b;
        }
        if let Some(g) = input.is_geschrieben {
            existing.is_geschrieben = g;
        }

        // The WHERE clause re-checks the frozen state so a concurrent
        // finalize cannot be overwritten.
        let updated = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices SET
                status = $1, standard_name = $2, rechnungsdatum = $3, zahlungsziel = $4,
                betrag_summe = $5, anrede = $6, titel = $7, auftraggeber_vorname = $8,
                auftraggeber_nachname = $9, strasse = $10, plz = $11, stadt = $12,
                land = $13, verstorbenen_vorname = $14, verstorbenen_nachname = $15,
                textblock = $16, is_geschrieben = $17
            WHERE id = $18 AND company_id = $19
              AND NOT (status = 'BEZAHLT' AND is_geschrieben)
            RETURNING *
            "#,
        )
        .bind(&existing.status)
        .bind(&existing.standard_name)
        .bind(existing.rechnungsdatum)
        .bind(existing.zahlungsziel)
        .bind(existing.betrag_summe)
        .bind(&existing.anrede)
        .bind(&existing.titel)
        .bind(&existing.auftraggeber_vorname)
        .bind(&existing.auftraggeber_nachname)
        .bind(&existing.strasse)
        .bind(&existing.plz)
        .bind(&existing.stadt)
        .bind(&existing.land)
        .bind(&existing.verstorbenen_vorname)
        .bind(&existing.verstorbenen_nachname)
        .bind(&existing.textblock)
        .bind(existing.is_geschrieben)
        .bind(invoice_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(anyhow!(
                "Eine bezahlte Rechnung kann nicht mehr bearbeitet werden."
            ))
        })?;

        let invoice = match transition {
            Some((from, to)) => {
                INVOICE_TRANSITIONS_TOTAL
                    .with_label_values(&[from.as_str(), to.as_str()])
                    .inc();
                self.append_protocol_event(
                    company_id,
                    invoice_id,
                    &format!("STATUS GEÄNDERT ZU {}", to.as_str()),
                    actor,
                )
                .await?
                .unwrap_or(updated)
            }
            None => updated,
        };

        timer.observe_duration();
        Ok(Some(invoice))
    }

    /// Explicit status transition endpoint.
    ///
    /// Leaving the draft state stamps the invoice date and the payment due
    /// date (invoice date + 21 days), overwriting any dates set on the draft.
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        actor: Option<&str>,
        requested: &str,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["change_status"])
            .start_timer();

        let target = parse_status(requested)?;

        let Some(existing) = self.get_invoice(company_id, invoice_id).await? else {
            return Ok(None);
        };
        let current = stored_status(&existing)?;

        if !current.can_transition_to(target) {
            return Err(AppError::BadRequest(anyhow!(
                "Statusänderung von {} zu {} ist nicht erlaubt.",
                current.as_str(),
                target.as_str()
            )));
        }

        let (rechnungsdatum, zahlungsziel) =
            match stamp_dates(current, target, Utc::now().date_naive()) {
                Some((datum, ziel)) => (Some(datum), Some(ziel)),
                None => (existing.rechnungsdatum, existing.zahlungsziel),
            };

        // Optimistic guard on the status read above.
        let updated = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET status = $1, rechnungsdatum = $2, zahlungsziel = $3
            WHERE id = $4 AND company_id = $5 AND status = $6
            RETURNING *
            "#,
        )
        .bind(target.as_str())
        .bind(rechnungsdatum)
        .bind(zahlungsziel)
        .bind(invoice_id)
        .bind(company_id)
        .bind(current.as_str())
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| {
            AppError::Conflict(anyhow!(
                "Die Rechnung wurde zwischenzeitlich geändert."
            ))
        })?;

        INVOICE_TRANSITIONS_TOTAL
            .with_label_values(&[current.as_str(), target.as_str()])
            .inc();
        info!(
            invoice_id = %invoice_id,
            from = current.as_str(),
            to = target.as_str(),
            "Invoice status changed"
        );

        let invoice = self
            .append_protocol_event(
                company_id,
                invoice_id,
                &format!("STATUS GEÄNDERT ZU {}", target.as_str()),
                actor,
            )
            .await?
            .unwrap_or(updated);

        timer.observe_duration();
        Ok(Some(invoice))
    }

    /// Record a download of the rendered invoice in the protocol. The frozen
    /// state covers the protocol too: a paid and written invoice takes no
    /// further entries.
    #[instrument(skip(self))]
    pub async fn log_download(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        actor: Option<&str>,
    ) -> Result<Option<Invoice>, AppError> {
        let Some(existing) = self.get_invoice(company_id, invoice_id).await? else {
            return Ok(None);
        };
        ensure_mutable(&existing)?;

        self.append_protocol_event(company_id, invoice_id, "HERUNTERGELADEN", actor)
            .await
    }

    /// Delete an invoice. Once written out the document exists in the world
    /// and the row must stay.
    #[instrument(skip(self))]
    pub async fn delete_invoice(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<()>, AppError> {
        let Some(existing) = self.get_invoice(company_id, invoice_id).await? else {
            return Ok(None);
        };
        if existing.is_geschrieben {
            return Err(AppError::BadRequest(anyhow!(
                "Eine geschriebene Rechnung kann nicht gelöscht werden."
            )));
        }

        sqlx::query("DELETE FROM invoices WHERE id = $1 AND company_id = $2")
            .bind(invoice_id)
            .bind(company_id)
            .execute(self.pool())
            .await?;

        info!(invoice_id = %invoice_id, "Invoice deleted");
        Ok(Some(()))
    }

    /// Create a corrective invoice: a fresh draft one level above the source,
    /// same number sequence, line items copied.
    #[instrument(skip(self))]
    pub async fn create_korrektur(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        actor: Option<&str>,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_korrektur"])
            .start_timer();

        let Some(source) = self.get_invoice(company_id, invoice_id).await? else {
            return Ok(None);
        };
        if let Some(message) = korrektur_blocker(stored_status(&source)?) {
            return Err(AppError::BadRequest(anyhow!(message)));
        }
        let typ = source
            .typ()
            .ok_or_else(|| AppError::InternalError(anyhow!("Unbekannter Rechnungstyp.")))?;

        let mut tx = self.pool().begin().await?;

        let mut rechnungsnummer: Option<String> = None;
        if let Some(case_id) = source.sterbefall_id {
            let auftragsnummer: Option<i32> = sqlx::query_scalar(
                "SELECT auftragsnummer FROM cases WHERE uuid = $1 AND company_id = $2",
            )
            .bind(case_id)
            .bind(company_id)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(auftragsnummer) = auftragsnummer {
                sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                    .bind(format!("rechnungsnummer:{}:{}", case_id, typ.as_str()))
                    .execute(&mut *tx)
                    .await?;

                let existing: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM invoices
                     WHERE company_id = $1 AND sterbefall_id = $2 AND rechnung_typ = $3",
                )
                .bind(company_id)
                .bind(case_id)
                .bind(typ.as_str())
                .fetch_one(&mut *tx)
                .await?;

                rechnungsnummer = Some(build_invoice_number(typ, auftragsnummer, existing));
            }
        }

        let protokoll = serde_json::json!([protocol_event("KORREKTUR ERSTELLT", actor)]);

        let korrektur = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                id, company_id, sterbefall_id, status, rechnung_typ, rechnungsstufe,
                original_rechnung_id, is_standard, standard_name, rechnungsnummer,
                rechnungsdatum, zahlungsziel, betrag_summe, anrede, titel,
                auftraggeber_vorname, auftraggeber_nachname, strasse, plz, stadt, land,
                verstorbenen_vorname, verstorbenen_nachname, textblock, protokoll
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24, $25
            )
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(source.sterbefall_id)
        .bind(InvoiceStatus::Entwurf.as_str())
        .bind(typ.as_str())
        .bind(source.rechnungsstufe + 1)
        .bind(source.id)
        .bind(false)
        .bind(Option::<String>::None)
        .bind(&rechnungsnummer)
        .bind(source.rechnungsdatum)
        .bind(source.zahlungsziel)
        .bind(source.betrag_summe)
        .bind(&source.anrede)
        .bind(&source.titel)
        .bind(&source.auftraggeber_vorname)
        .bind(&source.auftraggeber_nachname)
        .bind(&source.strasse)
        .bind(&source.plz)
        .bind(&source.stadt)
        .bind(&source.land)
        .bind(&source.verstorbenen_vorname)
        .bind(&source.verstorbenen_nachname)
        .bind(&source.textblock)
        .bind(&protokoll)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO rechnungspositionen
                (id, company_id, rechnung_id, category, produkt, menge, preis, mwst, betrag)
            SELECT gen_random_uuid(), company_id, $1, category, produkt, menge, preis, mwst, betrag
            FROM rechnungspositionen
            WHERE rechnung_id = $2 AND company_id = $3
            "#,
        )
        .bind(korrektur.id)
        .bind(source.id)
        .bind(company_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.observe_duration();

        info!(
            source_id = %source.id,
            korrektur_id = %korrektur.id,
            rechnungsstufe = korrektur.rechnungsstufe,
            "Corrective invoice created"
        );
        Ok(Some(korrektur))
    }

    /// Copy all line items of a standard invoice onto a target invoice.
    /// Returns the copied items; an empty vec means the standard was empty.
    #[instrument(skip(self))]
    pub async fn add_standard_positions(
        &self,
        company_id: Uuid,
        target_id: Uuid,
        standard_id: Uuid,
    ) -> Result<Option<Vec<LineItem>>, AppError> {
        let Some(target) = self.get_invoice(company_id, target_id).await? else {
            return Ok(None);
        };
        ensure_mutable(&target)?;

        let standard = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE id = $1 AND company_id = $2 AND is_standard",
        )
        .bind(standard_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;
        if standard.is_none() {
            return Err(AppError::NotFound(anyhow!(
                "Standardrechnung nicht gefunden."
            )));
        }

        let copied = sqlx::query_as::<_, LineItem>(
            r#"
            INSERT INTO rechnungspositionen
                (id, company_id, rechnung_id, category, produkt, menge, preis, mwst, betrag)
            SELECT gen_random_uuid(), company_id, $1, category, produkt, menge, preis, mwst, betrag
            FROM rechnungspositionen
            WHERE rechnung_id = $2 AND company_id = $3
            RETURNING *
            "#,
        )
        .bind(target_id)
        .bind(standard_id)
        .bind(company_id)
        .fetch_all(self.pool())
        .await?;

        Ok(Some(copied))
    }

    /// Line items of one invoice. `None` when the invoice does not exist.
    #[instrument(skip(self))]
    pub async fn list_line_items(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<Vec<LineItem>>, AppError> {
        if self.get_invoice(company_id, invoice_id).await?.is_none() {
            return Ok(None);
        }

        let items = sqlx::query_as::<_, LineItem>(
            "SELECT * FROM rechnungspositionen
             WHERE rechnung_id = $1 AND company_id = $2 ORDER BY id",
        )
        .bind(invoice_id)
        .bind(company_id)
        .fetch_all(self.pool())
        .await?;
        Ok(Some(items))
    }

    /// Fetch a single line item scoped to the tenant.
    #[instrument(skip(self))]
    pub async fn get_line_item(
        &self,
        company_id: Uuid,
        item_id: Uuid,
    ) -> Result<Option<LineItem>, AppError> {
        let item = sqlx::query_as::<_, LineItem>(
            "SELECT * FROM rechnungspositionen WHERE id = $1 AND company_id = $2",
        )
        .bind(item_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(item)
    }

    /// Add a line item. The total falls back to quantity x price plus VAT
    /// when the client does not supply one.
    #[instrument(skip(self, input))]
    pub async fn add_line_item(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        input: &CreateLineItem,
    ) -> Result<Option<LineItem>, AppError> {
        let Some(invoice) = self.get_invoice(company_id, invoice_id).await? else {
            return Ok(None);
        };
        ensure_mutable(&invoice)?;

        if let Some(category) = &input.category {
            if Category::parse(category).is_none() {
                return Err(AppError::BadRequest(anyhow!("Ungültige Kategorie.")));
            }
        }
        let betrag = input
            .betrag
            .or_else(|| line_total(input.menge, input.preis, input.mwst));

        let item = sqlx::query_as::<_, LineItem>(
            r#"
            INSERT INTO rechnungspositionen
                (id, company_id, rechnung_id, category, produkt, menge, preis, mwst, betrag)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(invoice_id)
        .bind(&input.category)
        .bind(&input.produkt)
        .bind(input.menge)
        .bind(input.preis)
        .bind(input.mwst)
        .bind(betrag)
        .fetch_one(self.pool())
        .await?;
        Ok(Some(item))
    }

    /// Partial line item update. Touching quantity, price or VAT without an
    /// explicit total recomputes it.
    #[instrument(skip(self, input))]
    pub async fn update_line_item(
        &self,
        company_id: Uuid,
        item_id: Uuid,
        input: &UpdateLineItem,
    ) -> Result<Option<LineItem>, AppError> {
        let Some(mut existing) = sqlx::query_as::<_, LineItem>(
            "SELECT * FROM rechnungspositionen WHERE id = $1 AND company_id = $2",
        )
        .bind(item_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?
        else {
            return Ok(None);
        };

        let invoice = self
            .get_invoice(company_id, existing.rechnung_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Rechnung nicht gefunden.")))?;
        ensure_mutable(&invoice)?;

        if let Some(category) = &input.category {
            if Category::parse(category).is_none() {
                return Err(AppError::BadRequest(anyhow!("Ungültige Kategorie.")));
            }
            existing.category = Some(category.clone());
        }
        if input.produkt.is_some() {
            existing.produkt = input.produkt.clone();
        }
        let amounts_touched =
            input.menge.is_some() || input.preis.is_some() || input.mwst.is_some();
        if input.menge.is_some() {
            existing.menge = input.menge;
        }
        if input.preis.is_some() {
            existing.preis = input.preis;
        }
        if input.mwst.is_some() {
            existing.mwst = input.mwst;
        }
        if input.betrag.is_some() {
            existing.betrag = input.betrag;
        } else if amounts_touched {
            existing.betrag = line_total(existing.menge, existing.preis, existing.mwst);
        }

        let item = sqlx::query_as::<_, LineItem>(
            r#"
            UPDATE rechnungspositionen
            SET category = $1, produkt = $2, menge = $3, preis = $4, mwst = $5, betrag = $6
            WHERE id = $7 AND company_id = $8
            RETURNING *
            "#,
        )
        .bind(&existing.category)
        .bind(&existing.produkt)
        .bind(existing.menge)
        .bind(existing.preis)
        .bind(existing.mwst)
        .bind(existing.betrag)
        .bind(item_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(item)
    }

    /// Delete a line item, subject to the invoice's frozen state.
    #[instrument(skip(self))]
    pub async fn delete_line_item(
        &self,
        company_id: Uuid,
        item_id: Uuid,
    ) -> Result<bool, AppError> {
        let Some(existing) = sqlx::query_as::<_, LineItem>(
            "SELECT * FROM rechnungspositionen WHERE id = $1 AND company_id = $2",
        )
        .bind(item_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?
        else {
            return Ok(false);
        };

        let invoice = self
            .get_invoice(company_id, existing.rechnung_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Rechnung nicht gefunden.")))?;
        ensure_mutable(&invoice)?;

        let result = sqlx::query(
            "DELETE FROM rechnungspositionen WHERE id = $1 AND company_id = $2",
        )
        .bind(item_id)
        .bind(company_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Per-category line item totals over dated invoices of one year.
    /// Categories without items report zero.
    #[instrument(skip(self))]
    pub async fn category_summary(
        &self,
        company_id: Uuid,
        year: Option<i32>,
    ) -> Result<Vec<CategoryTotal>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["category_summary"])
            .start_timer();

        #[derive(sqlx::FromRow)]
        struct SummaryRow {
            exp_total: Decimal,
            ext_total: Decimal,
            own_total: Decimal,
        }

        let row = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT
                COALESCE(SUM(p.betrag) FILTER (WHERE p.category = 'EXP'), 0) AS exp_total,
                COALESCE(SUM(p.betrag) FILTER (WHERE p.category = 'EXT'), 0) AS ext_total,
                COALESCE(SUM(p.betrag) FILTER (WHERE p.category = 'OWN'), 0) AS own_total
            FROM rechnungspositionen p
            JOIN invoices r ON r.id = p.rechnung_id
            WHERE p.company_id = $1
              AND r.rechnungsdatum IS NOT NULL
              AND ($2::int IS NULL OR EXTRACT(YEAR FROM r.rechnungsdatum) = $2)
            "#,
        )
        .bind(company_id)
        .bind(year)
        .fetch_one(self.pool())
        .await?;

        timer.observe_duration();
        Ok(vec![
            CategoryTotal {
                category: Category::Exp.as_str(),
                total_betrag: row.exp_total,
            },
            CategoryTotal {
                category: Category::Ext.as_str(),
                total_betrag: row.ext_total,
            },
            CategoryTotal {
                category: Category::Own.as_str(),
                total_betrag: row.own_total,
            },
        ])
    }

    /// Append one event to the invoice protocol. The protocol is append-only;
    /// no path rewrites or removes entries. Callers check the frozen state
    /// against the pre-change row: the transition appends run right after the
    /// status update, when the row may already read as paid.
    async fn append_protocol_event(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        event_type: &str,
        actor: Option<&str>,
    ) -> Result<Option<Invoice>, AppError> {
        let event = protocol_event(event_type, actor);
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices SET protokoll = protokoll || $1::jsonb
            WHERE id = $2 AND company_id = $3
            RETURNING *
            "#,
        )
        .bind(sqlx::types::Json(&event))
        .bind(invoice_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_needs_quantity_and_price() {
        assert_eq!(line_total(None, Some(Decimal::from(100)), None), None);
        assert_eq!(line_total(Some(Decimal::from(2)), None, None), None);
    }

    #[test]
    fn line_total_applies_vat() {
        let total = line_total(
            Some(Decimal::from(2)),
            Some(Decimal::from(100)),
            Some(Decimal::from(19)),
        )
        .unwrap();
        assert_eq!(total, Decimal::from(238));
    }

    #[test]
    fn line_total_without_vat_is_net() {
        let total = line_total(Some(Decimal::from(3)), Some(Decimal::from(50)), None).unwrap();
        assert_eq!(total, Decimal::from(150));
    }

    #[test]
    fn protocol_events_carry_the_system_fallback_actor() {
        let event = protocol_event("ERSTELLT", None);
        assert_eq!(event.user, "System");
        assert_eq!(event.event_type, "ERSTELLT");

        let event = protocol_event("HERUNTERGELADEN", Some("emustermann"));
        assert_eq!(event.user, "emustermann");
    }

    #[test]
    fn leaving_draft_stamps_invoice_and_due_dates() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let (datum, ziel) =
            stamp_dates(InvoiceStatus::Entwurf, InvoiceStatus::Offen, today).unwrap();
        assert_eq!(datum, today);
        assert_eq!(ziel, NaiveDate::from_ymd_opt(2026, 9, 20).unwrap());
    }

    #[test]
    fn other_transitions_leave_the_dates_alone() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert!(stamp_dates(InvoiceStatus::Entwurf, InvoiceStatus::Storniert, today).is_none());
        assert!(stamp_dates(InvoiceStatus::Offen, InvoiceStatus::Bezahlt, today).is_none());
        assert!(stamp_dates(InvoiceStatus::Offen, InvoiceStatus::Storniert, today).is_none());
    }

    #[test]
    fn a_korrektur_needs_an_issued_source() {
        assert!(korrektur_blocker(InvoiceStatus::Offen).is_none());
        assert!(korrektur_blocker(InvoiceStatus::Bezahlt).is_none());
        assert!(korrektur_blocker(InvoiceStatus::Entwurf)
            .unwrap()
            .contains("OFFEN"));
        assert!(korrektur_blocker(InvoiceStatus::Storniert)
            .unwrap()
            .contains("stornierte"));
    }
}
