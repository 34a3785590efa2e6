use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::services::read_json;

pub const NAME: &str = "Gemini";
pub const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Sampling knobs per call. Chat uses the defaults; the budget planner asks
/// for low-temperature JSON.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Generation {
    pub temperature: f32,
    pub json: bool,
}

impl Default for Generation {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            json: false,
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model(&self) -> &str;

    async fn generate(&self, api_key: &str, prompt: &str, generation: Generation) -> Result<String, ProviderError>;
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str, generation: Generation) -> Self {
        let safety_settings = [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ]
        .into_iter()
        .map(|category| SafetySetting {
            category,
            threshold: "BLOCK_MEDIUM_AND_ABOVE",
        })
        .collect();

        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: generation.temperature,
                top_k: 40,
                top_p: 0.9,
                max_output_tokens: 2048,
                response_mime_type: if generation.json { "application/json" } else { "text/plain" },
            },
            safety_settings,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, model: String) -> Self {
        Self {
            http,
            model,
            base_url: BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, api_key: &str, prompt: &str, generation: Generation) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(format!("{}/{}:generateContent", self.base_url, self.model))
            .query(&[("key", api_key)])
            .json(&GenerateRequest::new(prompt, generation))
            .send()
            .await?;

        let parsed: GenerateResponse = read_json(NAME, response).await?;
        parsed
            .first_text()
            .ok_or_else(|| ProviderError::Decode("Invalid response from Gemini API".to_string()))
    }
}

/// Rejects blanks and the placeholders shipped in env templates; accepts
/// anything shaped like a Google API key or at least 25 characters long.
pub fn is_valid_key(key: &str) -> bool {
    let key = key.trim();
    if key.is_empty() {
        return false;
    }

    let placeholder = Regex::new(r"(?i)your_.*_here|placeholder|changeme")
        .map(|re| re.is_match(key))
        .unwrap_or(false);
    if placeholder {
        return false;
    }

    let google_shaped = Regex::new(r"^AIza[0-9A-Za-z_\-]{10,}$")
        .map(|re| re.is_match(key))
        .unwrap_or(false);
    google_shaped || key.chars().count() >= 25
}
