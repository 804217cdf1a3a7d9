//! OpenAI Content Provider
//!
//! Implementation of `ContentProvider` over an OpenAI-compatible
//! chat-completions API. One request per generation, JSON response
//! format, client-level timeout.

use std::time::Duration;

use async_trait::async_trait;
use genie_core::{
    error::{GenieError, Result},
    generation::{ContentBundle, GenerationInput, HASHTAG_COUNT, POST_COUNT, SCHEDULE_SLOTS},
    provider::ContentProvider,
};
use serde::{Deserialize, Serialize};

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API key (bearer auth)
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// API base URL (any OpenAI-compatible endpoint)
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com/v1".into(),
            timeout_secs: 60,
        }
    }

    /// Create from environment variables. `OPENAI_API_KEY` is
    /// required; model, base URL, and timeout have defaults.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| GenieError::Config("OPENAI_API_KEY not set".into()))?;

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.model = model;
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(timeout) = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
        {
            config.timeout_secs = timeout;
        }

        Ok(config)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible content provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create from configuration. The HTTP client carries the bounded
    /// timeout; a timed-out generation surfaces as a provider error.
    pub fn from_config(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenieError::Config(format!("HTTP client build failed: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OpenAiConfig::from_env()?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Build the user prompt asking for the exact bundle shape as JSON
    fn build_prompt(input: &GenerationInput) -> String {
        format!(
            r##"You are an expert social media content creator. Generate content for a {niche} brand focused on {topic} with a {tone} tone.

Please create exactly:
1. {posts} social media posts (Instagram/TikTok style, 50-100 words each)
2. {hashtags} relevant hashtags
3. A {slots}-day posting schedule with specific days and times

Return the response as JSON with this exact structure:
{{
    "posts": ["Post 1 text...", "Post 2 text..."],
    "hashtags": ["#hashtag1", "#hashtag2"],
    "schedule": [
        {{"day": "Monday", "time": "8:00 PM", "post": "Post 1"}}
    ]
}}

Make the posts engaging, relevant to the {niche} niche, focused on {topic}, and written in a {tone} tone."##,
            niche = input.niche,
            topic = input.topic,
            tone = input.tone,
            posts = POST_COUNT,
            hashtags = HASHTAG_COUNT,
            slots = SCHEDULE_SLOTS,
        )
    }

    /// Parse the model's JSON reply into a bundle and validate its
    /// shape against the provider contract
    fn parse_bundle(content: &str) -> Result<ContentBundle> {
        let bundle: ContentBundle = serde_json::from_str(content)
            .map_err(|e| GenieError::Provider(format!("malformed content JSON: {e}")))?;
        bundle.check_shape().map_err(GenieError::Provider)?;
        Ok(bundle)
    }
}

#[async_trait]
impl ContentProvider for OpenAiProvider {
    async fn generate(&self, input: &GenerationInput) -> Result<ContentBundle> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are an expert social media content creator. \
                              Always respond with valid JSON."
                        .into(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::build_prompt(input),
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenieError::Provider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenieError::Provider(format!("API returned {status}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenieError::Provider(format!("malformed API response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenieError::Provider("no content generated".into()))?;

        Self::parse_bundle(&content)
    }

    async fn health_check(&self) -> Result<bool> {
        let probe = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await;

        match probe {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }
}
