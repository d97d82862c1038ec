//! Photo analysis handler: the gate, the invoker and the settlement glued
//! together.

use axum::{
    extract::{ConnectInfo, FromRequestParts, Multipart, State},
    http::request::Parts,
    Json,
};
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::{
    analysis::AnalysisOutcome,
    api::models::analyses::AnalysisResponse,
    auth::current_account::MaybeAccount,
    errors::{Error, Result},
    gate::{self, Requester},
    AppState,
};

/// The client address an anonymous trial is keyed on.
///
/// Prefers the first entry of the configured forwarded-for header, falling
/// back to the socket peer address.
#[derive(Debug, Clone)]
pub struct ClientOrigin(pub String);

impl FromRequestParts<AppState> for ClientOrigin {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let header_name = &state.config.trial.forwarded_for_header;
        if let Some(value) = parts.headers.get(header_name.as_str()).and_then(|h| h.to_str().ok()) {
            if let Some(first) = value.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return Ok(ClientOrigin(first.to_string()));
                }
            }
        }

        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            return Ok(ClientOrigin(addr.ip().to_string()));
        }

        Err(Error::BadRequest {
            message: "Unable to determine client origin".to_string(),
        })
    }
}

/// Pull the uploaded photo out of the multipart body.
///
/// Takes the field named `photo`, or the first field carrying a filename.
/// A missing field is not an error here: the invoker reports it as a
/// no-evidence outcome without charging anyone.
async fn extract_photo(mut multipart: Multipart) -> Result<Vec<u8>> {
    while let Some(field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Invalid multipart body: {e}"),
    })? {
        if field.name() == Some("photo") || field.file_name().is_some() {
            let bytes = field.bytes().await.map_err(|e| Error::BadRequest {
                message: format!("Failed to read uploaded photo: {e}"),
            })?;
            return Ok(bytes.to_vec());
        }
    }
    Ok(Vec::new())
}

/// Analyze an uploaded photo
#[utoipa::path(
    post,
    path = "/api/v1/analyses",
    tag = "analyses",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Analysis outcome", body = AnalysisResponse),
        (status = 401, description = "Not authenticated and anonymous trials disabled"),
        (status = 403, description = "No credits or trial already used"),
    ),
    security(
        (),
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_analysis(
    State(state): State<AppState>,
    MaybeAccount(account): MaybeAccount,
    origin: ClientOrigin,
    multipart: Multipart,
) -> Result<Json<AnalysisResponse>> {
    let requester = match account {
        Some(account) => Requester::Account(account.id),
        None => Requester::Anonymous { origin: origin.0 },
    };

    // Admission check before touching the upload
    {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        gate::can_analyze(&mut conn, &requester, &state.config).await?.into_result()?;
    }

    let photo = extract_photo(multipart).await?;
    let outcome = state.analyzer.analyze(&photo).await;

    // A no-evidence outcome never reached the backend, so nothing is owed.
    // Settlement failure is deliberately non-fatal: the caller already has
    // their report, so surface a warning instead of discarding it.
    let mut warning = None;
    let settlement = if matches!(outcome, AnalysisOutcome::NoEvidence) {
        None
    } else {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        match gate::settle_after_analysis(&mut conn, &requester).await {
            Ok(settlement) => {
                info!(?settlement, "Analysis settled");
                Some(settlement)
            }
            Err(e) => {
                warn!("Failed to settle analysis usage: {e}");
                warning = Some("Usage could not be recorded for this analysis".to_string());
                None
            }
        }
    };

    let mut response = AnalysisResponse::from_outcome(outcome, settlement);
    if let Some(warning) = warning {
        response = response.with_warning(warning);
    }
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use crate::api::models::analyses::{AnalysisResponse, AnalysisStatus};
    use crate::test_utils::{create_test_account, create_test_app_with_inference, inference_mocks, login, test_photo};
    use axum_test::multipart::{MultipartForm, Part};
    use sqlx::PgPool;

    fn photo_form(bytes: Vec<u8>) -> MultipartForm {
        MultipartForm::new().add_part("photo", Part::bytes(bytes).file_name("photo.jpg").mime_type("image/jpeg"))
    }

    #[sqlx::test]
    async fn test_anonymous_trial_once_per_origin(pool: PgPool) {
        let inference = inference_mocks("A harbor in Lisbon.").await;
        let server = create_test_app_with_inference(pool, &inference.uri()).await;

        let response = server
            .post("/api/v1/analyses")
            .add_header("x-forwarded-for", "203.0.113.50")
            .multipart(photo_form(test_photo()))
            .await;
        response.assert_status_ok();

        let body: AnalysisResponse = response.json();
        assert_eq!(body.status, AnalysisStatus::Report);
        assert!(body.report.as_deref().unwrap().contains("A harbor in Lisbon."));
        assert!(body.usage_recorded);

        // Second attempt from the same origin is refused before any work
        let response = server
            .post("/api/v1/analyses")
            .add_header("x-forwarded-for", "203.0.113.50")
            .multipart(photo_form(test_photo()))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);

        // A different origin still gets its trial
        let response = server
            .post("/api/v1/analyses")
            .add_header("x-forwarded-for", "203.0.113.51")
            .multipart(photo_form(test_photo()))
            .await;
        response.assert_status_ok();
    }

    #[sqlx::test]
    async fn test_account_credit_consumed(pool: PgPool) {
        let inference = inference_mocks("Report text.").await;
        let server = create_test_app_with_inference(pool.clone(), &inference.uri()).await;

        // New accounts carry a single credit
        create_test_account(&pool, "analyst@example.com", "a-strong-password").await;
        let cookie = login(&server, "analyst@example.com", "a-strong-password").await;

        let response = server
            .post("/api/v1/analyses")
            .add_header("cookie", &cookie)
            .multipart(photo_form(test_photo()))
            .await;
        response.assert_status_ok();
        let body: AnalysisResponse = response.json();
        assert!(body.usage_recorded);

        // The credit is gone now
        let response = server
            .post("/api/v1/analyses")
            .add_header("cookie", &cookie)
            .multipart(photo_form(test_photo()))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    async fn test_undecodable_upload_costs_nothing(pool: PgPool) {
        let inference = inference_mocks("unused").await;
        let server = create_test_app_with_inference(pool, &inference.uri()).await;

        let response = server
            .post("/api/v1/analyses")
            .add_header("x-forwarded-for", "203.0.113.60")
            .multipart(photo_form(b"not an image at all".to_vec()))
            .await;
        response.assert_status_ok();

        let body: AnalysisResponse = response.json();
        assert_eq!(body.status, AnalysisStatus::NoEvidence);
        assert!(!body.usage_recorded);

        // The trial was not burned; a real photo still goes through
        let response = server
            .post("/api/v1/analyses")
            .add_header("x-forwarded-for", "203.0.113.60")
            .multipart(photo_form(test_photo()))
            .await;
        response.assert_status_ok();
        let body: AnalysisResponse = response.json();
        assert_eq!(body.status, AnalysisStatus::Report);
        assert!(body.usage_recorded);
    }

    #[sqlx::test]
    async fn test_missing_photo_field_is_no_evidence(pool: PgPool) {
        let inference = inference_mocks("unused").await;
        let server = create_test_app_with_inference(pool, &inference.uri()).await;

        let response = server
            .post("/api/v1/analyses")
            .add_header("x-forwarded-for", "203.0.113.61")
            .multipart(MultipartForm::new().add_text("note", "no file here"))
            .await;
        response.assert_status_ok();

        let body: AnalysisResponse = response.json();
        assert_eq!(body.status, AnalysisStatus::NoEvidence);
        assert!(!body.usage_recorded);
    }

    #[sqlx::test]
    async fn test_three_credits_then_refused(pool: PgPool) {
        let inference = inference_mocks("Report.").await;
        let server = create_test_app_with_inference(pool.clone(), &inference.uri()).await;

        let account = create_test_account(&pool, "bulk@example.com", "a-strong-password").await;
        {
            let mut conn = pool.acquire().await.unwrap();
            crate::db::handlers::Accounts::new(&mut conn)
                .grant_credits(account.id, 2)
                .await
                .unwrap();
        }
        let cookie = login(&server, "bulk@example.com", "a-strong-password").await;

        for _ in 0..3 {
            let response = server
                .post("/api/v1/analyses")
                .add_header("cookie", &cookie)
                .multipart(photo_form(test_photo()))
                .await;
            response.assert_status_ok();
        }

        let response = server
            .post("/api/v1/analyses")
            .add_header("cookie", &cookie)
            .multipart(photo_form(test_photo()))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    async fn test_paid_plan_not_metered(pool: PgPool) {
        let inference = inference_mocks("Report.").await;
        let server = create_test_app_with_inference(pool.clone(), &inference.uri()).await;

        let account = create_test_account(&pool, "pro@example.com", "a-strong-password").await;
        {
            let mut conn = pool.acquire().await.unwrap();
            crate::db::handlers::Accounts::new(&mut conn)
                .set_plan(account.id, crate::api::models::accounts::PlanTier::Paid)
                .await
                .unwrap();
        }
        let cookie = login(&server, "pro@example.com", "a-strong-password").await;

        // Repeated analyses all pass despite zero credits being consumed
        for _ in 0..3 {
            let response = server
                .post("/api/v1/analyses")
                .add_header("cookie", &cookie)
                .multipart(photo_form(test_photo()))
                .await;
            response.assert_status_ok();
            let body: AnalysisResponse = response.json();
            assert!(body.usage_recorded);
        }
    }

    #[sqlx::test]
    async fn test_backend_failure_still_settles(pool: PgPool) {
        // A failing backend means the attempt was made; the trial is spent
        let inference = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/v1beta/models"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
            .mount(&inference)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&inference)
            .await;

        let server = create_test_app_with_inference(pool, &inference.uri()).await;

        let response = server
            .post("/api/v1/analyses")
            .add_header("x-forwarded-for", "203.0.113.70")
            .multipart(photo_form(test_photo()))
            .await;
        response.assert_status_ok();

        let body: AnalysisResponse = response.json();
        assert_eq!(body.status, AnalysisStatus::Failed);
        assert!(body.usage_recorded);

        let response = server
            .post("/api/v1/analyses")
            .add_header("x-forwarded-for", "203.0.113.70")
            .multipart(photo_form(test_photo()))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);
    }
}
