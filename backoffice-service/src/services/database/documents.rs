//! Document templates, placeholder instances and the email dispatch log.

use super::Database;
use crate::models::{
    relayout_chain, CreateEmailLog, CreatePlaceholderInstance, CreateTemplate, EmailLog,
    PlaceholderInstance, Template, UpdatePlaceholderInstance, UpdateTemplate,
};
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

impl Database {
    #[instrument(skip(self, input), fields(company_id = %company_id))]
    pub async fn create_template(
        &self,
        company_id: Uuid,
        input: &CreateTemplate,
    ) -> Result<Template, AppError> {
        let template = sqlx::query_as::<_, Template>(
            r#"
            INSERT INTO vorlagen (id, company_id, name, kategorie, datei, is_vorlage)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(&input.name)
        .bind(&input.kategorie)
        .bind(&input.datei)
        .bind(input.is_vorlage)
        .fetch_one(self.pool())
        .await?;

        info!(template_id = %template.id, name = %template.name, "Template created");
        Ok(template)
    }

    #[instrument(skip(self))]
    pub async fn get_template(
        &self,
        company_id: Uuid,
        template_id: Uuid,
    ) -> Result<Option<Template>, AppError> {
        let template = sqlx::query_as::<_, Template>(
            "SELECT * FROM vorlagen WHERE id = $1 AND company_id = $2",
        )
        .bind(template_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(template)
    }

    /// List templates, optionally restricted to one category.
    #[instrument(skip(self))]
    pub async fn list_templates(
        &self,
        company_id: Uuid,
        kategorie: Option<&str>,
    ) -> Result<Vec<Template>, AppError> {
        let templates = sqlx::query_as::<_, Template>(
            r#"
            SELECT * FROM vorlagen
            WHERE company_id = $1 AND ($2::text IS NULL OR kategorie = $2)
            ORDER BY name
            "#,
        )
        .bind(company_id)
        .bind(kategorie)
        .fetch_all(self.pool())
        .await?;
        Ok(templates)
    }

    #[instrument(skip(self, input))]
    pub async fn update_template(
        &self,
        company_id: Uuid,
        template_id: Uuid,
        input: &UpdateTemplate,
    ) -> Result<Option<Template>, AppError> {
        let template = sqlx::query_as::<_, Template>(
            r#"
            UPDATE vorlagen SET
                name = COALESCE($1, name),
                kategorie = COALESCE($2, kategorie),
                datei = COALESCE($3, datei),
                is_vorlage = COALESCE($4, is_vorlage)
            WHERE id = $5 AND company_id = $6
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.kategorie)
        .bind(&input.datei)
        .bind(input.is_vorlage)
        .bind(template_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(template)
    }

    /// Delete a template and, via cascade, its placeholder instances.
    #[instrument(skip(self))]
    pub async fn delete_template(
        &self,
        company_id: Uuid,
        template_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM vorlagen WHERE id = $1 AND company_id = $2")
            .bind(template_id)
            .bind(company_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Placeholder instances, optionally restricted to one template, chain
    /// members in layout order.
    #[instrument(skip(self))]
    pub async fn list_placeholders(
        &self,
        company_id: Uuid,
        template_id: Option<Uuid>,
    ) -> Result<Vec<PlaceholderInstance>, AppError> {
        let instances = sqlx::query_as::<_, PlaceholderInstance>(
            r#"
            SELECT * FROM platzhalter_instanzen
            WHERE company_id = $1 AND ($2::uuid IS NULL OR vorlage_id = $2)
            ORDER BY page_number, chain_id NULLS FIRST, chain_position NULLS FIRST, id
            "#,
        )
        .bind(company_id)
        .bind(template_id)
        .fetch_all(self.pool())
        .await?;
        Ok(instances)
    }

    /// Create a placeholder instance. Joining a chain re-lays the chain out
    /// immediately so positions on disk are never stale.
    #[instrument(skip(self, input), fields(company_id = %company_id))]
    pub async fn create_placeholder(
        &self,
        company_id: Uuid,
        input: &CreatePlaceholderInstance,
    ) -> Result<PlaceholderInstance, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_placeholder"])
            .start_timer();

        let template = self
            .get_template(company_id, input.vorlage_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Vorlage nicht gefunden."))
            })?;

        let mut tx = self.pool().begin().await?;

        let instance = sqlx::query_as::<_, PlaceholderInstance>(
            r#"
            INSERT INTO platzhalter_instanzen (
                id, company_id, vorlage_id, platzhalter_key, name, page_number,
                x_position, y_position, width, font_size, font_color, bold,
                chain_id, chain_position
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(template.id)
        .bind(&input.platzhalter_key)
        .bind(&input.name)
        .bind(input.page_number)
        .bind(input.x_position)
        .bind(input.y_position)
        .bind(input.width)
        .bind(input.font_size.unwrap_or(11))
        .bind(input.font_color.as_deref().unwrap_or("black"))
        .bind(input.bold)
        .bind(&input.chain_id)
        .bind(input.chain_position)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(chain_id) = &instance.chain_id {
            self.relayout_chain_tx(&mut tx, company_id, instance.vorlage_id, chain_id)
                .await?;
        }

        tx.commit().await?;
        timer.observe_duration();

        // Re-read: the relayout may have moved this instance.
        let instance = self
            .get_placeholder(company_id, instance.id)
            .await?
            .unwrap_or(instance);
        Ok(instance)
    }

    #[instrument(skip(self))]
    pub async fn get_placeholder(
        &self,
        company_id: Uuid,
        instance_id: Uuid,
    ) -> Result<Option<PlaceholderInstance>, AppError> {
        let instance = sqlx::query_as::<_, PlaceholderInstance>(
            "SELECT * FROM platzhalter_instanzen WHERE id = $1 AND company_id = $2",
        )
        .bind(instance_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(instance)
    }

    /// Partial placeholder update. Both the chain left and the chain joined
    /// (when they differ) are re-laid out.
    #[instrument(skip(self, input))]
    pub async fn update_placeholder(
        &self,
        company_id: Uuid,
        instance_id: Uuid,
        input: &UpdatePlaceholderInstance,
    ) -> Result<Option<PlaceholderInstance>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_placeholder"])
            .start_timer();

        let Some(existing) = self.get_placeholder(company_id, instance_id).await? else {
            return Ok(None);
        };
        let old_chain = existing.chain_id.clone();

        let mut tx = self.pool().begin().await?;

        let updated = sqlx::query_as::<_, PlaceholderInstance>(
            r#"
            UPDATE platzhalter_instanzen SET
                platzhalter_key = COALESCE($1, platzhalter_key),
                name = COALESCE($2, name),
                page_number = COALESCE($3, page_number),
                x_position = COALESCE($4, x_position),
                y_position = COALESCE($5, y_position),
                width = COALESCE($6, width),
                font_size = COALESCE($7, font_size),
                font_color = COALESCE($8, font_color),
                bold = COALESCE($9, bold),
                chain_id = COALESCE($10, chain_id),
                chain_position = COALESCE($11, chain_position)
            WHERE id = $12 AND company_id = $13
            RETURNING *
            "#,
        )
        .bind(&input.platzhalter_key)
        .bind(&input.name)
        .bind(input.page_number)
        .bind(input.x_position)
        .bind(input.y_position)
        .bind(input.width)
        .bind(input.font_size)
        .bind(&input.font_color)
        .bind(input.bold)
        .bind(&input.chain_id)
        .bind(input.chain_position)
        .bind(instance_id)
        .bind(company_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(chain_id) = &old_chain {
            self.relayout_chain_tx(&mut tx, company_id, updated.vorlage_id, chain_id)
                .await?;
        }
        if let Some(chain_id) = &updated.chain_id {
            if old_chain.as_deref() != Some(chain_id) {
                self.relayout_chain_tx(&mut tx, company_id, updated.vorlage_id, chain_id)
                    .await?;
            }
        }

        tx.commit().await?;
        timer.observe_duration();

        self.get_placeholder(company_id, instance_id).await
    }

    /// Delete a placeholder instance and close the gap in its chain.
    #[instrument(skip(self))]
    pub async fn delete_placeholder(
        &self,
        company_id: Uuid,
        instance_id: Uuid,
    ) -> Result<bool, AppError> {
        let Some(existing) = self.get_placeholder(company_id, instance_id).await? else {
            return Ok(false);
        };

        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM platzhalter_instanzen WHERE id = $1 AND company_id = $2")
            .bind(instance_id)
            .bind(company_id)
            .execute(&mut *tx)
            .await?;

        if let Some(chain_id) = &existing.chain_id {
            self.relayout_chain_tx(&mut tx, company_id, existing.vorlage_id, chain_id)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn relayout_chain_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company_id: Uuid,
        vorlage_id: Uuid,
        chain_id: &str,
    ) -> Result<(), AppError> {
        let mut instances = sqlx::query_as::<_, PlaceholderInstance>(
            r#"
            SELECT * FROM platzhalter_instanzen
            WHERE company_id = $1 AND vorlage_id = $2 AND chain_id = $3
            ORDER BY chain_position NULLS LAST, id
            "#,
        )
        .bind(company_id)
        .bind(vorlage_id)
        .bind(chain_id)
        .fetch_all(&mut **tx)
        .await?;

        let changed = relayout_chain(&mut instances);
        for instance in instances.iter().filter(|i| changed.contains(&i.id)) {
            sqlx::query(
                "UPDATE platzhalter_instanzen SET x_position = $1 WHERE id = $2 AND company_id = $3",
            )
            .bind(instance.x_position)
            .bind(instance.id)
            .bind(company_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Record one email send attempt. Rows are never updated afterwards.
    #[instrument(skip(self, input), fields(company_id = %company_id))]
    pub async fn create_email_log(
        &self,
        company_id: Uuid,
        input: &CreateEmailLog,
    ) -> Result<EmailLog, AppError> {
        let entry = sqlx::query_as::<_, EmailLog>(
            r#"
            INSERT INTO email_logs
                (id, company_id, recipient, document_name, sterbefall_id, vorlage_id, success)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(&input.recipient)
        .bind(&input.document_name)
        .bind(input.sterbefall_id)
        .bind(input.vorlage_id)
        .bind(input.success)
        .fetch_one(self.pool())
        .await?;

        info!(
            email_log_id = %entry.id,
            recipient = %entry.recipient,
            success = entry.success,
            "Email send recorded"
        );
        Ok(entry)
    }

    /// Email log entries, newest first, optionally filtered by document name.
    #[instrument(skip(self))]
    pub async fn list_email_logs(
        &self,
        company_id: Uuid,
        document_name: Option<&str>,
    ) -> Result<Vec<EmailLog>, AppError> {
        let entries = sqlx::query_as::<_, EmailLog>(
            r#"
            SELECT * FROM email_logs
            WHERE company_id = $1 AND ($2::text IS NULL OR document_name = $2)
            ORDER BY timestamp DESC
            "#,
        )
        .bind(company_id)
        .bind(document_name)
        .fetch_all(self.pool())
        .await?;
        Ok(entries)
    }
}
