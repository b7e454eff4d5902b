//! Gemini `generateContent` REST client

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use super::LanguageModel;
use crate::config::AiConfig;
use crate::models::{ChatRole, ChatTurn};
use crate::{OnTymError, Result};

const SLOW_CALL: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

fn content_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

/// Client for the Gemini generative language API
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    generation: GenerationConfig,
}

impl GeminiClient {
    /// Create a new client. A missing API key is only reported when a call is made.
    pub fn new(config: &AiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("ontym/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OnTymError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            generation: GenerationConfig {
                max_output_tokens: config.max_output_tokens,
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
            },
        })
    }

    #[instrument(name = "gemini_generate_content", skip_all, fields(turns = request.contents.len()))]
    async fn send(&self, request: &GenerateRequest<'_>) -> Result<GenerateResponse> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            OnTymError::config("AI API key is not configured. Set ai.api_key or ONTYM__AI__API_KEY.")
        })?;

        let start_time = Instant::now();
        debug!("Sending generateContent request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("AI request failed: {}", e);
                if e.is_timeout() {
                    OnTymError::upstream("AI request timed out")
                } else {
                    OnTymError::upstream(format!("AI request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OnTymError::upstream(format!("Failed to read AI response: {e}")))?;

        let elapsed = start_time.elapsed();
        if elapsed > SLOW_CALL {
            warn!("Slow AI response: {:.3}s", elapsed.as_secs_f64());
        }

        if status.is_success() {
            info!("AI response received in {:.3}s", elapsed.as_secs_f64());
        }
        decode_response(status, &body)
    }
}

/// Map an HTTP status and body to a decoded response
fn decode_response(status: StatusCode, body: &str) -> Result<GenerateResponse> {
    if !status.is_success() {
        let detail = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| status.to_string());
        error!(%status, "AI provider returned an error: {}", detail);
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OnTymError::upstream(format!(
                "AI provider rejected the API key: {detail}"
            )),
            _ => OnTymError::upstream(format!("AI provider error ({status}): {detail}")),
        });
    }

    serde_json::from_str(body)
        .map_err(|e| OnTymError::response_format(format!("Undecodable AI response: {e}"), body))
}

/// The first candidate's text; a blank answer is a format error
fn required_text(response: &GenerateResponse) -> Result<String> {
    let text = response.text();
    if text.trim().is_empty() {
        return Err(OnTymError::response_format("AI response contained no text", text));
    }
    Ok(text)
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: None,
            generation_config: self.generation.clone(),
        };

        required_text(&self.send(&request).await?)
    }

    async fn converse(&self, system: &str, history: &[ChatTurn], message: &str) -> Result<String> {
        let mut contents: Vec<Content<'_>> = history
            .iter()
            .map(|turn| Content {
                role: content_role(turn.role),
                parts: vec![Part {
                    text: &turn.content,
                }],
            })
            .collect();
        contents.push(Content {
            role: "user",
            parts: vec![Part { text: message }],
        });

        let request = GenerateRequest {
            contents,
            system_instruction: Some(SystemInstruction {
                parts: vec![Part { text: system }],
            }),
            generation_config: self.generation.clone(),
        };

        Ok(self.send(&request).await?.text())
    }
}
