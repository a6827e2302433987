use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;

use hireflow_core::domain::user::{Role, User, UserId};

use super::rows::{decimal, parsed, text, timestamp};
use super::{RepositoryError, UserRepository};
use crate::DbPool;

const USER_COLUMNS: &str =
    "id, name, email, role, business_unit, team_cost, created_at, updated_at";

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn row_to_user(row: &SqliteRow) -> Result<User, RepositoryError> {
    Ok(User {
        id: UserId(text(row, "id")?),
        name: text(row, "name")?,
        email: text(row, "email")?,
        role: parsed::<Role>(row, "role")?,
        business_unit: text(row, "business_unit")?,
        team_cost: decimal(row, "team_cost")?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn create(&self, user: User) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO app_user (id, name, email, role, business_unit, team_cost,
                                   created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id.0)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.business_unit)
        .bind(user.team_cost.to_string())
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "user", "email", &user.email))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM app_user WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM app_user ORDER BY name, id"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_user).collect()
    }

    async fn list_by_business_unit(
        &self,
        business_unit: &str,
    ) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM app_user WHERE business_unit = ? ORDER BY name, id"
        ))
        .bind(business_unit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_user).collect()
    }

    async fn set_team_cost(
        &self,
        id: &UserId,
        team_cost: Decimal,
        updated_at: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let result = sqlx::query("UPDATE app_user SET team_cost = ?, updated_at = ? WHERE id = ?")
            .bind(team_cost.to_string())
            .bind(updated_at.to_rfc3339())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "user", id: id.0.clone() });
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound { entity: "user", id: id.0.clone() })
    }
}
