//! Vision model client.
//!
//! The model is an opaque collaborator: it gets a prompt plus the image and
//! answers with text that should contain one nutrition JSON object. Any
//! failure on that path, transport or parsing, degrades to
//! [`NutritionInfo::fallback`] so uploads never fail because of it.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use super::extract::extract_nutrition;
use super::model::NutritionInfo;
use super::prompt::NUTRITION_PROMPT;
use crate::config::GeminiConfig;

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("vision model is not configured")]
    NotConfigured,
    #[error("vision model request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("vision model returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("vision model reply had no text")]
    EmptyReply,
}

#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Returns the raw reply text for `prompt` about `image`.
    async fn describe(
        &self,
        prompt: &str,
        image: &[u8],
        content_type: &str,
    ) -> Result<String, AnalyzerError>;
}

/// Asks the model about `image` and always comes back with nutrition facts.
#[instrument(skip(model, image), fields(bytes = image.len()))]
pub async fn analyze_meal_image(
    model: &dyn VisionModel,
    image: &[u8],
    content_type: &str,
) -> NutritionInfo {
    let reply = match model.describe(NUTRITION_PROMPT, image, content_type).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "vision model call failed; using fallback nutrition");
            return NutritionInfo::fallback();
        }
    };

    match extract_nutrition(&reply) {
        Ok(info) => {
            debug!(food = %info.food_name, calories = info.calories, "nutrition extracted");
            info
        }
        Err(e) => {
            warn!(error = %e, reply_len = reply.len(), "unusable model reply; using fallback nutrition");
            NutritionInfo::fallback()
        }
    }
}

// ---- Gemini ----

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    Image { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ReplyContent>,
}

#[derive(Debug, Deserialize)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct GeminiVision {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl GeminiVision {
    pub fn new(config: &GeminiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn url(&self, api_key: &str) -> String {
        format!(
            "{API_BASE_URL}/models/{}:generateContent?key={api_key}",
            self.model
        )
    }
}

#[async_trait]
impl VisionModel for GeminiVision {
    #[instrument(skip(self, prompt, image), fields(model = %self.model))]
    async fn describe(
        &self,
        prompt: &str,
        image: &[u8],
        content_type: &str,
    ) -> Result<String, AnalyzerError> {
        let api_key = self.api_key.as_deref().ok_or(AnalyzerError::NotConfigured)?;

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    RequestPart::Text { text: prompt },
                    RequestPart::Image {
                        inline_data: InlineData {
                            mime_type: content_type,
                            data: STANDARD.encode(image),
                        },
                    },
                ],
            }],
        };

        let response = self.client.post(self.url(api_key)).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<GenerateResponse>(&text)
                .ok()
                .and_then(|r| r.error)
                .map_or(text, |e| e.message);
            error!(%status, "gemini api error");
            return Err(AnalyzerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&text).map_err(|e| {
            error!(error = %e, "gemini response is not the expected envelope");
            AnalyzerError::EmptyReply
        })?;

        parsed
            .candidates
            .into_iter()
            .flatten()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or(AnalyzerError::EmptyReply)
    }
}
