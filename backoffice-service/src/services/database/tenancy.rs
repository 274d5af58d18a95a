//! Tenant (company) and user persistence.

use super::Database;
use crate::models::{Company, CreateUser, Role, UpdateCompany, UpdateUser, User};
use anyhow::anyhow;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

fn validate_role(role: Option<&str>) -> Result<(), AppError> {
    if let Some(role) = role {
        if Role::parse(role).is_none() {
            return Err(AppError::BadRequest(anyhow!("Ungültige Rolle.")));
        }
    }
    Ok(())
}

impl Database {
    #[instrument(skip(self))]
    pub async fn get_company(&self, company_id: Uuid) -> Result<Option<Company>, AppError> {
        let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(company_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(company)
    }

    /// Tenant self-service update. Plan and subscription fields are managed
    /// by billing, never through this path.
    #[instrument(skip(self, input))]
    pub async fn update_company(
        &self,
        company_id: Uuid,
        input: &UpdateCompany,
    ) -> Result<Option<Company>, AppError> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies SET
                name = COALESCE($1, name),
                inhaber_vorname = COALESCE($2, inhaber_vorname),
                inhaber_nachname = COALESCE($3, inhaber_nachname),
                unternehmensname = COALESCE($4, unternehmensname),
                unternehmensform = COALESCE($5, unternehmensform),
                ust_id_nr = COALESCE($6, ust_id_nr),
                email = COALESCE($7, email),
                phone = COALESCE($8, phone),
                strasse = COALESCE($9, strasse),
                plz = COALESCE($10, plz),
                ort = COALESCE($11, ort),
                header_text = COALESCE($12, header_text),
                footer_text = COALESCE($13, footer_text),
                updated_on = CURRENT_DATE
            WHERE id = $14
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.inhaber_vorname)
        .bind(&input.inhaber_nachname)
        .bind(&input.unternehmensname)
        .bind(&input.unternehmensform)
        .bind(&input.ust_id_nr)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.strasse)
        .bind(&input.plz)
        .bind(&input.ort)
        .bind(&input.header_text)
        .bind(&input.footer_text)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(company)
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self, company_id: Uuid) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE company_id = $1 ORDER BY username",
        )
        .bind(company_id)
        .fetch_all(self.pool())
        .await?;
        Ok(users)
    }

    #[instrument(skip(self))]
    pub async fn get_user(
        &self,
        company_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND company_id = $2",
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    /// Create a user within the tenant. Usernames are globally unique.
    #[instrument(skip(self, input), fields(company_id = %company_id))]
    pub async fn create_user(
        &self,
        company_id: Uuid,
        input: &CreateUser,
    ) -> Result<User, AppError> {
        validate_role(input.role.as_deref())?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, company_id, username, email, password_hash,
                first_name, last_name, role, status, mitarbeiter_kuerzel
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'ACTIVE', $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.role)
        .bind(&input.mitarbeiter_kuerzel)
        .fetch_one(self.pool())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(anyhow!("Benutzername oder E-Mail bereits vergeben."))
            }
            _ => AppError::from(e),
        })?;

        info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    #[instrument(skip(self, input))]
    pub async fn update_user(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        input: &UpdateUser,
    ) -> Result<Option<User>, AppError> {
        validate_role(input.role.as_deref())?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                username = COALESCE($1, username),
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                role = COALESCE($6, role),
                status = COALESCE($7, status),
                mitarbeiter_kuerzel = COALESCE($8, mitarbeiter_kuerzel)
            WHERE id = $9 AND company_id = $10
            RETURNING *
            "#,
        )
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.role)
        .bind(&input.status)
        .bind(&input.mitarbeiter_kuerzel)
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, company_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND company_id = $2")
            .bind(user_id)
            .bind(company_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
