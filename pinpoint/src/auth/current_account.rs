use crate::{
    api::models::accounts::CurrentAccount,
    auth::session,
    errors::{Error, Result},
    AppState,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, trace};

/// Extract the account from a JWT session cookie if present and valid
/// Returns:
/// - None: No JWT cookie present
/// - Some(Ok(account)): Valid JWT found and verified
/// - Some(Err(error)): JWT cookie present but invalid/malformed
#[instrument(skip(parts, config))]
fn try_jwt_session_auth(parts: &Parts, config: &crate::config::Config) -> Option<Result<CurrentAccount>> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }))
        }
    };
    let cookie_name = &config.auth.native.session.cookie_name;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            if name == cookie_name {
                match session::verify_session_token(value, config) {
                    Ok(account) => return Some(Ok(account)),
                    Err(_) => {
                        // Invalid/expired token, continue checking other cookies or return None
                        // We don't propagate JWT verification errors as they're expected for expired tokens
                        continue;
                    }
                }
            }
        }
    }
    None
}

impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        if !state.config.auth.native.enabled {
            trace!("Native authentication is disabled");
            return Err(Error::Unauthenticated { message: None });
        }

        match try_jwt_session_auth(parts, &state.config) {
            Some(Ok(account)) => {
                debug!("Found JWT session authenticated account: {}", account.id);
                Ok(account)
            }
            Some(Err(e)) => {
                trace!("JWT session authentication failed: {:?}", e);
                Err(Error::Unauthenticated { message: None })
            }
            None => {
                trace!("No session credentials found in request");
                Err(Error::Unauthenticated { message: None })
            }
        }
    }
}

/// Optional authentication: resolves to `None` instead of rejecting when no
/// valid session is attached. Used by endpoints that also serve anonymous
/// trial requests.
#[derive(Debug, Clone)]
pub struct MaybeAccount(pub Option<CurrentAccount>);

impl FromRequestParts<AppState> for MaybeAccount {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        Ok(MaybeAccount(CurrentAccount::from_request_parts(parts, state).await.ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::models::accounts::PlanTier, auth::session::create_session_token, test_utils::create_test_config};
    use axum::extract::FromRequestParts as _;
    use sqlx::PgPool;
    use uuid::Uuid;

    fn create_test_parts_with_header(header_name: &str, header_value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(header_name, header_value)
            .body(())
            .unwrap();

        let (parts, _body) = request.into_parts();
        parts
    }

    fn test_account() -> CurrentAccount {
        CurrentAccount {
            id: Uuid::new_v4(),
            email: "cookie@example.com".to_string(),
            display_name: None,
            plan: PlanTier::Free,
        }
    }

    #[sqlx::test]
    async fn test_session_cookie_extraction(pool: PgPool) {
        let config = create_test_config();
        let token = create_session_token(&test_account(), &config).unwrap();
        let state = AppState::builder()
            .db(pool)
            .analyzer(crate::analysis::AnalysisInvoker::from_config(&config.inference).unwrap())
            .config(config)
            .build();

        let cookie_name = &state.config.auth.native.session.cookie_name;
        let mut parts = create_test_parts_with_header("cookie", &format!("other=1; {cookie_name}={token}"));

        let result = CurrentAccount::from_request_parts(&mut parts, &state).await;
        assert!(result.is_ok());
        assert_eq!(result.unwrap().email, "cookie@example.com");
    }

    #[sqlx::test]
    async fn test_missing_cookie_rejected(pool: PgPool) {
        let config = create_test_config();
        let state = AppState::builder()
            .db(pool)
            .analyzer(crate::analysis::AnalysisInvoker::from_config(&config.inference).unwrap())
            .config(config)
            .build();

        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();

        let result = CurrentAccount::from_request_parts(&mut parts, &state).await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().status_code(), axum::http::StatusCode::UNAUTHORIZED);

        // The optional extractor degrades to None instead of rejecting
        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();
        let maybe = MaybeAccount::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(maybe.0.is_none());
    }

    #[sqlx::test]
    async fn test_garbage_cookie_rejected(pool: PgPool) {
        let config = create_test_config();
        let state = AppState::builder()
            .db(pool)
            .analyzer(crate::analysis::AnalysisInvoker::from_config(&config.inference).unwrap())
            .config(config)
            .build();

        let cookie_name = state.config.auth.native.session.cookie_name.clone();
        let mut parts = create_test_parts_with_header("cookie", &format!("{cookie_name}=not.a.real.token"));

        let result = CurrentAccount::from_request_parts(&mut parts, &state).await;
        assert!(result.is_err());
    }
}
