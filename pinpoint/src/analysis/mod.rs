//! Photo analysis against a Gemini-style inference backend.
//!
//! The invoker is deliberately forgiving: every failure path is folded into
//! an [`AnalysisOutcome`] value so the request handler can settle usage and
//! answer the client without unwinding. Discovery degrading, the remote
//! erroring or the catalog being empty all still produce a definite outcome.

pub mod image;
pub mod models;

use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::{config::InferenceConfig, errors::Error};
use models::{Content, GenerateContentRequest, GenerateContentResponse, ListModelsResponse, Part};

const API_KEY_HEADER: &str = "x-goog-api-key";

const INVESTIGATION_PROMPT: &str = "\
You are a professional research assistant. Analyze this image with technical rigor:
1. LOCATION: Identify the country, city and neighborhood from architecture, signage and vegetation.
2. VALIDATION: Cross-check the names of businesses and local brands visible in the frame.
3. SENSITIVE DETAILS: Examine reflections, street signs, license plates and security equipment.
4. CONCLUSION: Present a structured report listing the evidence behind each finding.";

/// Result of one analysis attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// The remote model produced a report.
    Report(String),
    /// The upload was missing or not a decodable image; no remote call was
    /// made.
    NoEvidence,
    /// The remote call was attempted and failed.
    Failed(String),
}

/// Client for the inference backend.
#[derive(Debug, Clone)]
pub struct AnalysisInvoker {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    preferred_models: Vec<String>,
    default_model: String,
    max_image_dimension: u32,
    list_timeout: Duration,
    generate_timeout: Duration,
}

/// Makes sure a url has a trailing slash.
///
/// This fixes a weird idiosyncracy in rusts 'join' method on urls, where joining URLs like
/// '/hello', 'world' gives you '/world', but '/hello/', 'world' gives you '/hello/world'.
/// Basically, call this before calling .join
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

impl AnalysisInvoker {
    pub fn from_config(config: &InferenceConfig) -> Result<Self, Error> {
        let client = Client::builder().build().map_err(|e| Error::Internal {
            operation: format!("create HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            preferred_models: config.preferred_models.clone(),
            default_model: config.default_model.clone(),
            max_image_dimension: config.max_image_dimension,
            list_timeout: config.list_timeout,
            generate_timeout: config.generate_timeout,
        })
    }

    /// Run one analysis. Never returns an error: failures become outcomes.
    #[instrument(skip(self, image_bytes), fields(size = image_bytes.len()))]
    pub async fn analyze(&self, image_bytes: &[u8]) -> AnalysisOutcome {
        if image_bytes.is_empty() {
            return AnalysisOutcome::NoEvidence;
        }

        // Normalize before any remote traffic so undecodable uploads cost
        // nothing.
        let jpeg = match image::normalize(image_bytes, self.max_image_dimension) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                debug!("Uploaded bytes did not decode as an image: {e:#}");
                return AnalysisOutcome::NoEvidence;
            }
        };

        let model = self.pick_model().await;

        match self.generate(&model, &jpeg).await {
            Ok(text) => AnalysisOutcome::Report(format!("{text}\n\n(Processed with {model})")),
            Err(e) => {
                warn!("Analysis request failed: {e:#}");
                AnalysisOutcome::Failed(format!("{e:#}"))
            }
        }
    }

    /// Pick the model to use: highest-priority preferred model present in
    /// the remote catalog, else the first generation-capable entry, else the
    /// configured default. Discovery failures degrade to the default rather
    /// than aborting the analysis.
    #[instrument(skip(self))]
    async fn pick_model(&self) -> String {
        let available = match self.list_models().await {
            Ok(models) => models,
            Err(e) => {
                warn!("Model discovery failed, using default model: {e:#}");
                return self.default_model.clone();
            }
        };

        if let Some(preferred) = self.preferred_models.iter().find(|p| available.iter().any(|a| a == *p)) {
            return preferred.clone();
        }

        available.first().cloned().unwrap_or_else(|| self.default_model.clone())
    }

    async fn list_models(&self) -> anyhow::Result<Vec<String>> {
        let url = ensure_slash(&self.base_url)
            .join("v1beta/models")
            .map_err(|e| anyhow::anyhow!("Failed to construct models URL: {}", e))?;

        debug!("Fetching model catalog from URL: {}", url);

        let mut request = self.client.get(url.clone());
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        let response = request.timeout(self.list_timeout).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Failed to fetch model catalog from {url}");
            return Err(anyhow::anyhow!("model catalog error: {} - {}", status, body));
        }

        // Get the response body as text first for logging
        let body_text = response.text().await?;
        tracing::debug!("Model catalog response body: {}", body_text);

        match serde_json::from_str::<ListModelsResponse>(&body_text) {
            Ok(parsed) => Ok(parsed
                .models
                .into_iter()
                .filter(|m| m.supports_generation())
                .map(|m| m.name)
                .collect()),
            Err(e) => {
                tracing::error!("Failed to parse model catalog as JSON. Error: {}", e);
                tracing::error!("Response body was: {}", body_text);
                Err(anyhow::anyhow!("error decoding response body: {}", e))
            }
        }
    }

    async fn generate(&self, model: &str, jpeg: &[u8]) -> anyhow::Result<String> {
        let url = ensure_slash(&self.base_url)
            .join(&format!("v1beta/{model}:generateContent"))
            .map_err(|e| anyhow::anyhow!("Failed to construct generation URL: {}", e))?;

        debug!("Submitting analysis to URL: {}", url);

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::text(INVESTIGATION_PROMPT),
                    Part::inline_jpeg(general_purpose::STANDARD.encode(jpeg)),
                ],
            }],
        };

        let mut request = self.client.post(url.clone()).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        let response = request.timeout(self.generate_timeout).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Generation request to {url} failed");
            return Err(anyhow::anyhow!("inference backend error: {} - {}", status, body));
        }

        let body_text = response.text().await?;
        let parsed = match serde_json::from_str::<GenerateContentResponse>(&body_text) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!("Failed to parse generation response as JSON. Error: {}", e);
                tracing::error!("Response body was: {}", body_text);
                return Err(anyhow::anyhow!("error decoding response body: {}", e));
            }
        };

        parsed.text().ok_or_else(|| anyhow::anyhow!("model returned no content"))
    }
}
