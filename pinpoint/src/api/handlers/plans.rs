//! Pricing catalog handler.

use axum::{extract::State, Json};

use crate::{
    api::models::plans::{PlanResponse, PlansResponse},
    errors::Error,
    AppState,
};

/// List available plans.
///
/// The catalog comes straight from configuration; no authentication needed.
#[utoipa::path(
    get,
    path = "/api/v1/plans",
    tag = "plans",
    responses(
        (status = 200, description = "Available plans", body = PlansResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_plans(State(state): State<AppState>) -> Result<Json<PlansResponse>, Error> {
    Ok(Json(PlansResponse {
        plans: state.config.plans.iter().map(PlanResponse::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::models::{accounts::PlanTier, plans::PlansResponse};
    use crate::test_utils::create_test_app;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_plans_catalog_is_public(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server.get("/api/v1/plans").await;
        response.assert_status_ok();

        let body: PlansResponse = response.json();
        assert_eq!(body.plans.len(), 4);
        assert_eq!(body.plans[0].tier, PlanTier::Free);
        assert_eq!(body.plans[0].price_cents, 0);
        // Paid tiers sorted ascending by price in the default catalog
        let prices: Vec<u32> = body.plans.iter().map(|p| p.price_cents).collect();
        assert!(prices.windows(2).all(|w| w[0] <= w[1]));
    }
}
