//! API models for the pricing catalog.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::models::accounts::PlanTier;
use crate::config::PlanConfig;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanResponse {
    /// Display name of the plan
    pub name: String,
    pub tier: PlanTier,
    /// Monthly price in cents
    pub price_cents: u32,
    /// Analyses included per month, absent means unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_analyses: Option<u32>,
    pub description: String,
}

impl From<&PlanConfig> for PlanResponse {
    fn from(plan: &PlanConfig) -> Self {
        Self {
            name: plan.name.clone(),
            tier: plan.tier,
            price_cents: plan.price_cents,
            monthly_analyses: plan.monthly_analyses,
            description: plan.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlansResponse {
    pub plans: Vec<PlanResponse>,
}
