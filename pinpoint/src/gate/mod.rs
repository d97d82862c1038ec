//! Access gate for analysis requests.
//!
//! Every analysis request passes through two checks: an admission check
//! before any work happens (`can_analyze`), and a settlement step after the
//! analysis completes (`settle_after_analysis`). Both read authoritative
//! state from the database rather than trusting session claims, so a plan
//! downgrade or an exhausted balance takes effect immediately.

use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    api::models::accounts::PlanTier,
    config::Config,
    db::{
        handlers::{Accounts, Trials},
        models::accounts::AccountDBResponse,
    },
    errors::{Error, Result},
    types::AccountId,
};

/// Who is asking for an analysis.
#[derive(Debug, Clone)]
pub enum Requester {
    Account(AccountId),
    Anonymous { origin: String },
}

/// Outcome of the admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    NoCredits,
    TrialUsed,
    TrialDisabled,
}

impl AccessDecision {
    pub fn allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }

    /// Convert a refusal into the error surfaced to the client.
    pub fn into_result(self) -> Result<()> {
        match self {
            AccessDecision::Allowed => Ok(()),
            AccessDecision::NoCredits => Err(Error::AccessDenied {
                message: "You have no credits remaining. Upgrade your plan to continue.".to_string(),
            }),
            AccessDecision::TrialUsed => Err(Error::AccessDenied {
                message: "Your free trial has been used. Create an account to continue.".to_string(),
            }),
            AccessDecision::TrialDisabled => Err(Error::Unauthenticated {
                message: Some("Create an account to analyze photos.".to_string()),
            }),
        }
    }
}

/// How usage was recorded after an analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    CreditConsumed,
    PlanCovered,
    TrialRecorded,
    /// The trial row already existed; nothing new was written but the usage
    /// is accounted for.
    AlreadyUsed,
    /// No credit was available at settlement time.
    NotRecorded,
}

impl Settlement {
    pub fn recorded(&self) -> bool {
        !matches!(self, Settlement::NotRecorded)
    }
}

/// Load the account behind a session, rejecting sessions whose account no
/// longer exists.
#[instrument(skip(db), err)]
pub async fn fetch_account(db: &mut PgConnection, id: AccountId) -> Result<AccountDBResponse> {
    let account = Accounts::new(db).get_by_id(id).await?;
    account.ok_or(Error::Unauthenticated { message: None })
}

/// Admission check, run before the uploaded photo is touched.
#[instrument(skip(db, config), err)]
pub async fn can_analyze(db: &mut PgConnection, requester: &Requester, config: &Config) -> Result<AccessDecision> {
    match requester {
        Requester::Account(id) => {
            let account = fetch_account(db, *id).await?;
            if account.plan == PlanTier::Paid || account.credits > 0 {
                Ok(AccessDecision::Allowed)
            } else {
                Ok(AccessDecision::NoCredits)
            }
        }
        Requester::Anonymous { origin } => {
            if !config.trial.enabled {
                return Ok(AccessDecision::TrialDisabled);
            }
            if Trials::new(db).has_used(origin).await? {
                Ok(AccessDecision::TrialUsed)
            } else {
                Ok(AccessDecision::Allowed)
            }
        }
    }
}

/// Settle usage after an analysis attempt. State is re-read here, never
/// carried over from the admission check, so concurrent requests cannot
/// spend the same credit twice.
#[instrument(skip(db), err)]
pub async fn settle_after_analysis(db: &mut PgConnection, requester: &Requester) -> Result<Settlement> {
    match requester {
        Requester::Account(id) => {
            let account = fetch_account(db, *id).await?;
            if account.plan == PlanTier::Paid {
                return Ok(Settlement::PlanCovered);
            }
            if Accounts::new(db).consume_credit(*id).await? {
                Ok(Settlement::CreditConsumed)
            } else {
                Ok(Settlement::NotRecorded)
            }
        }
        Requester::Anonymous { origin } => {
            if Trials::new(db).record(origin).await? {
                Ok(Settlement::TrialRecorded)
            } else {
                Ok(Settlement::AlreadyUsed)
            }
        }
    }
}
