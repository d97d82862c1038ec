//! Database repository for accounts.

use crate::types::{abbrev_uuid, AccountId};
use crate::{
    api::models::accounts::PlanTier,
    db::{
        errors::Result,
        models::accounts::{AccountCreateDBRequest, AccountDBResponse},
    },
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Account {
    pub id: AccountId,
    pub email: String,
    pub display_name: Option<String>,
    pub plan: PlanTier,
    pub credits: i32,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub password_hash: String,
}

impl From<Account> for AccountDBResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            display_name: account.display_name,
            plan: account.plan,
            credits: account.credits,
            email_confirmed: account.email_confirmed,
            created_at: account.created_at,
            updated_at: account.updated_at,
            password_hash: account.password_hash,
        }
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, display_name, plan, credits, email_confirmed, created_at, updated_at, password_hash";

pub struct Accounts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Accounts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    pub async fn create(&mut self, request: &AccountCreateDBRequest) -> Result<AccountDBResponse> {
        // Always generate a new ID for accounts
        let account_id = Uuid::new_v4();

        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (id, email, display_name, password_hash, plan, credits, email_confirmed)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(account_id)
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(&request.password_hash)
        .bind(request.plan)
        .bind(request.credits)
        .bind(request.email_confirmed)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(AccountDBResponse::from(account))
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: AccountId) -> Result<Option<AccountDBResponse>> {
        let account = sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(account.map(AccountDBResponse::from))
    }

    #[instrument(skip(self, email), err)]
    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<AccountDBResponse>> {
        let account = sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"))
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(account.map(AccountDBResponse::from))
    }

    /// Atomically consume one credit. Returns false when no credit was
    /// available; the balance can never go below zero.
    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    pub async fn consume_credit(&mut self, id: AccountId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET credits = credits - 1, updated_at = NOW()
            WHERE id = $1 AND credits > 0
            "#,
        )
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id), amount), err)]
    pub async fn grant_credits(&mut self, id: AccountId, amount: i32) -> Result<AccountDBResponse> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
            SET credits = credits + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(amount)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(AccountDBResponse::from(account))
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id), plan = ?plan), err)]
    pub async fn set_plan(&mut self, id: AccountId, plan: PlanTier) -> Result<AccountDBResponse> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
            SET plan = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(plan)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(AccountDBResponse::from(account))
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    pub async fn set_email_confirmed(&mut self, id: AccountId, confirmed: bool) -> Result<AccountDBResponse> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
            SET email_confirmed = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(confirmed)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(AccountDBResponse::from(account))
    }
}
