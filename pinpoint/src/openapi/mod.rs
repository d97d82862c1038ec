//! OpenAPI documentation configuration.
//!
//! The generated spec is served through RapiDoc at `/docs`.

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::api;

/// Session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "session_token".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "pinpoint_session",
                    "JWT session cookie issued by the login and registration endpoints.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pinpoint API",
        description = "Photo forensics and geolocation analysis service. Upload a photo, \
            get back a structured investigation report. Anonymous clients get one free \
            analysis; accounts are metered by credits or covered by a paid plan.",
    ),
    paths(
        api::handlers::auth::get_registration_info,
        api::handlers::auth::register,
        api::handlers::auth::get_login_info,
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::accounts::get_account,
        api::handlers::analyses::create_analysis,
        api::handlers::plans::list_plans,
    ),
    components(schemas(
        api::models::accounts::AccountResponse,
        api::models::accounts::PlanTier,
        api::models::analyses::AnalysisResponse,
        api::models::analyses::AnalysisStatus,
        api::models::auth::AuthResponse,
        api::models::auth::AuthSuccessResponse,
        api::models::auth::LoginInfo,
        api::models::auth::LoginRequest,
        api::models::auth::RegisterRequest,
        api::models::auth::RegistrationInfo,
        api::models::plans::PlanResponse,
        api::models::plans::PlansResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "authentication", description = "Registration, login and logout"),
        (name = "accounts", description = "The authenticated account"),
        (name = "analyses", description = "Photo analysis"),
        (name = "plans", description = "Pricing catalog"),
    )
)]
pub struct ApiDoc;
