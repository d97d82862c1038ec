//! Database records for the accounts table.

use crate::api::models::accounts::PlanTier;
use crate::types::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to create a new account row.
#[derive(Debug, Clone)]
pub struct AccountCreateDBRequest {
    pub email: String,
    pub display_name: Option<String>,
    pub password_hash: String,
    pub plan: PlanTier,
    pub credits: i32,
    pub email_confirmed: bool,
}

/// Full account record as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDBResponse {
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
