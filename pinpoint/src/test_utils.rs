//! Shared helpers for integration-style tests.

use axum_test::TestServer;
use serde_json::json;
use sqlx::PgPool;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{
    api::models::accounts::PlanTier,
    auth::password::{hash_string_with_params, Argon2Params},
    db::{
        handlers::Accounts,
        models::accounts::{AccountCreateDBRequest, AccountDBResponse},
    },
    Application, Config,
};

/// Cheap hashing parameters so password tests stay fast.
fn test_argon2_params() -> Argon2Params {
    Argon2Params {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}

/// A config suitable for tests: secret key set, plaintext cookies, fast
/// password hashing.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.secret_key = Some("test-secret-key".to_string());
    config.auth.native.session.cookie_secure = false;
    config.auth.native.password.argon2_memory_kib = 1024;
    config.auth.native.password.argon2_iterations = 1;
    config
}

pub async fn create_test_app(pool: PgPool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> TestServer {
    let app = Application::new_with_pool(config, pool).await.expect("Failed to build application");
    app.into_test_server()
}

/// Test app whose analysis invoker points at a mock inference backend.
pub async fn create_test_app_with_inference(pool: PgPool, inference_url: &str) -> TestServer {
    let mut config = create_test_config();
    config.inference.base_url = Url::parse(inference_url).expect("Invalid inference URL");
    config.inference.api_key = Some("test-key".to_string());
    create_test_app_with_config(pool, config).await
}

/// Mock inference backend: a catalog with the preferred model and a generate
/// endpoint answering with the given report text.
pub async fn inference_mocks(report_text: &str) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "models/gemini-1.5-pro", "supportedGenerationMethods": ["generateContent"]},
                {"name": "models/gemini-1.5-flash", "supportedGenerationMethods": ["generateContent"]},
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": report_text}]}}]
        })))
        .mount(&server)
        .await;

    server
}

/// Insert an account directly, bypassing the registration endpoint. Starts
/// with one credit on the free plan, like a fresh registration.
pub async fn create_test_account(pool: &PgPool, email: &str, password: &str) -> AccountDBResponse {
    let password_hash = hash_string_with_params(password, Some(test_argon2_params())).expect("Failed to hash test password");

    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Accounts::new(&mut conn)
        .create(&AccountCreateDBRequest {
            email: email.to_string(),
            display_name: None,
            password_hash,
            plan: PlanTier::Free,
            credits: 1,
            email_confirmed: true,
        })
        .await
        .expect("Failed to create test account")
}

/// Log in through the API and return the session cookie pair
/// (`name=token`) ready for a `cookie` header.
pub async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/authentication/login")
        .json(&json!({"email": email, "password": password}))
        .await;
    response.assert_status_ok();

    let set_cookie = response
        .headers()
        .get("set-cookie")
        .expect("Login did not set a session cookie")
        .to_str()
        .expect("Invalid cookie header")
        .to_string();

    set_cookie.split(';').next().expect("Empty cookie header").to_string()
}

/// A small valid JPEG for upload tests.
pub fn test_photo() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(48, 32, image::Rgb([80, 120, 200])));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Jpeg).expect("Failed to encode test photo");
    out.into_inner()
}
