use axum::{extract::State, Json};

use crate::{
    api::models::{
        accounts::{AccountResponse, CurrentAccount, PlanTier},
        auth::{
            AuthResponse, AuthSuccessResponse, LoginInfo, LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, RegisterResponse,
            RegistrationInfo,
        },
    },
    auth::{password, session},
    db::{handlers::Accounts, models::accounts::AccountCreateDBRequest},
    errors::Error,
    AppState,
};

/// Get registration information
#[utoipa::path(
    get,
    path = "/authentication/register",
    tag = "authentication",
    responses(
        (status = 200, description = "Registration info", body = RegistrationInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_registration_info(State(state): State<AppState>) -> Result<Json<RegistrationInfo>, Error> {
    Ok(Json(RegistrationInfo {
        enabled: state.config.auth.native.enabled && state.config.auth.native.allow_registration,
        message: if state.config.auth.native.enabled && state.config.auth.native.allow_registration {
            "Registration is enabled".to_string()
        } else {
            "Registration is disabled".to_string()
        },
    }))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/authentication/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "Account registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<RegisterResponse, Error> {
    // Check if native auth is enabled
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    // Check if registration is allowed
    if !state.config.auth.native.allow_registration {
        return Err(Error::BadRequest {
            message: "Account registration is disabled".to_string(),
        });
    }

    // Validate password length
    let password_config = &state.config.auth.native.password;
    if request.password.len() < password_config.min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", password_config.min_length),
        });
    }
    if request.password.len() > password_config.max_length {
        return Err(Error::BadRequest {
            message: format!("Password must be no more than {} characters", password_config.max_length),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    // Check if an account with this email already exists
    let mut account_repo = Accounts::new(&mut tx);
    if account_repo.get_by_email(&request.email).await?.is_some() {
        return Err(Error::BadRequest {
            message: "An account with this email address already exists".to_string(),
        });
    }

    // Hash the password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let argon2_params = password::Argon2Params {
        memory_kib: password_config.argon2_memory_kib,
        iterations: password_config.argon2_iterations,
        parallelism: password_config.argon2_parallelism,
    };
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string_with_params(&password, Some(argon2_params)))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let create_request = AccountCreateDBRequest {
        email: request.email,
        display_name: request.display_name,
        password_hash,
        plan: PlanTier::Free,
        credits: state.config.credits.initial_credits_for_new_accounts,
        email_confirmed: !state.config.auth.native.require_email_confirmation,
    };

    let created_account = account_repo.create(&create_request).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    let account_response = AccountResponse::from(created_account);

    // Create session token
    let current_account = CurrentAccount {
        id: account_response.id,
        email: account_response.email.clone(),
        display_name: account_response.display_name.clone(),
        plan: account_response.plan,
    };
    let token = session::create_session_token(&current_account, &state.config)?;

    // Set session cookie
    let cookie = create_session_cookie(&token, &state.config);

    let auth_response = AuthResponse {
        account: account_response,
        message: "Registration successful".to_string(),
    };

    Ok(RegisterResponse { auth_response, cookie })
}

/// Get login information
#[utoipa::path(
    get,
    path = "/authentication/login",
    tag = "authentication",
    responses(
        (status = 200, description = "Login info", body = LoginInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_login_info(State(state): State<AppState>) -> Result<Json<LoginInfo>, Error> {
    Ok(Json(LoginInfo {
        enabled: state.config.auth.native.enabled,
        message: if state.config.auth.native.enabled {
            "Native login is enabled".to_string()
        } else {
            "Native login is disabled".to_string()
        },
    }))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    // Check if native auth is enabled
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let mut account_repo = Accounts::new(&mut pool_conn);

    // Find account by email
    let account = account_repo
        .get_by_email(&request.email)
        .await?
        .ok_or_else(|| Error::Unauthenticated {
            message: Some("Invalid email or password".to_string()),
        })?;

    // Verify password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let hash = account.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::Unauthenticated {
            message: Some("Invalid email or password".to_string()),
        });
    }

    if state.config.auth.native.require_email_confirmation && !account.email_confirmed {
        return Err(Error::Unauthenticated {
            message: Some("Please confirm your email address before signing in".to_string()),
        });
    }

    let account_response = AccountResponse::from(account);

    // Create session token
    let current_account = CurrentAccount {
        id: account_response.id,
        email: account_response.email.clone(),
        display_name: account_response.display_name.clone(),
        plan: account_response.plan,
    };
    let token = session::create_session_token(&current_account, &state.config)?;

    // Set session cookie
    let cookie = create_session_cookie(&token, &state.config);

    let auth_response = AuthResponse {
        account: account_response,
        message: "Login successful".to_string(),
    };

    Ok(LoginResponse { auth_response, cookie })
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<LogoutResponse, Error> {
    // Create expired cookie to clear session
    let cookie = format!(
        "{}=; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age=0",
        state.config.auth.native.session.cookie_name
    );

    let auth_response = AuthSuccessResponse {
        message: "Logout successful".to_string(),
    };

    Ok(LogoutResponse { auth_response, cookie })
}

/// Helper function to create a session cookie
fn create_session_cookie(token: &str, config: &crate::config::Config) -> String {
    let session_config = &config.auth.native.session;
    let max_age = config.auth.security.jwt_expiry.as_secs();

    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        session_config.cookie_name, token, session_config.cookie_same_site, max_age
    );
    if session_config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}
