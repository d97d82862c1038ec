//! API request/response models for accounts.

use crate::db::models::accounts::AccountDBResponse;
use crate::types::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Subscription tier an account belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "plan_tier", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AccountId,
    pub email: String,
    pub display_name: Option<String>,
    pub plan: PlanTier,
    pub credits: i32,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccountDBResponse> for AccountResponse {
    fn from(db: AccountDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            display_name: db.display_name,
            plan: db.plan,
            credits: db.credits,
            email_confirmed: db.email_confirmed,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// The authenticated account attached to a request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentAccount {
    #[schema(value_type = String, format = "uuid")]
    pub id: AccountId,
    pub email: String,
    pub display_name: Option<String>,
    pub plan: PlanTier,
}

impl From<AccountDBResponse> for CurrentAccount {
    fn from(db: AccountDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            display_name: db.display_name,
            plan: db.plan,
        }
    }
}
