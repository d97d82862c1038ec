//! Handlers for the authenticated account resource.

use axum::{extract::State, Json};

use crate::{
    api::models::accounts::{AccountResponse, CurrentAccount},
    errors::Error,
    gate,
    AppState,
};

/// Get the authenticated account.
///
/// Credits and plan are read from the database on every call so the client
/// always sees the post-settlement balance, not the state captured in the
/// session token.
#[utoipa::path(
    get,
    path = "/api/v1/account",
    tag = "accounts",
    responses(
        (status = 200, description = "Current account", body = AccountResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all, fields(account_id = %current_account.id))]
pub async fn get_account(State(state): State<AppState>, current_account: CurrentAccount) -> Result<Json<AccountResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let account = gate::fetch_account(&mut conn, current_account.id).await?;
    Ok(Json(AccountResponse::from(account)))
}

#[cfg(test)]
mod tests {
    use crate::api::models::accounts::AccountResponse;
    use crate::test_utils::{create_test_account, create_test_app, login};
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_get_account_requires_session(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server.get("/api/v1/account").await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_get_account_returns_fresh_state(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let account = create_test_account(&pool, "me@example.com", "a-strong-password").await;
        let cookie = login(&server, "me@example.com", "a-strong-password").await;

        let response = server.get("/api/v1/account").add_header("cookie", &cookie).await;
        response.assert_status_ok();

        let body: AccountResponse = response.json();
        assert_eq!(body.id, account.id);
        assert_eq!(body.email, "me@example.com");
        assert_eq!(body.credits, account.credits);
    }
}
