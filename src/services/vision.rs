//! Upstream vision API client
//!
//! Sends one image plus a prompt to an OpenAI-compatible chat-completion
//! endpoint (OpenRouter by default) and returns the first choice's text.
//! No timeout or retry is configured.

use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::Args;
use crate::types::{RelayError, Result};

/// Model used when the caller does not pick one
pub const DEFAULT_MODEL: &str = "qwen/qwen2.5-vl-72b-instruct:free";

/// System prompt used when the caller does not supply one
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are analyzing an image containing a problem. Provide a complete solution.";

/// Fixed instruction sent alongside the image
pub const SOLVE_INSTRUCTION: &str =
    "Please solve the problem in this image. Provide a detailed step-by-step solution.";

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 800;

/// Caller-supplied part of a vision request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Image as a data URI
    #[serde(default)]
    pub image: Option<String>,
}

impl VisionRequest {
    fn model(&self) -> &str {
        non_empty(self.model.as_deref()).unwrap_or(DEFAULT_MODEL)
    }

    fn system_prompt(&self) -> &str {
        non_empty(self.system_prompt.as_deref()).unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

/// Client for the upstream vision API
pub struct VisionClient {
    client: Client,
    url: String,
    api_key: Option<String>,
    referer: String,
    title: String,
}

impl VisionClient {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .user_agent(concat!("snapsolve-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            url: url.into(),
            api_key,
            referer: String::new(),
            title: String::new(),
        }
    }

    /// Build a client from CLI/env configuration
    pub fn from_args(args: &Args) -> Self {
        Self::new(
            args.openrouter_url.clone(),
            args.vision_api_key().map(str::to_string),
        )
        .with_attribution(args.openrouter_referer.clone(), args.openrouter_title.clone())
    }

    /// Set the HTTP-Referer and X-Title headers sent upstream
    pub fn with_attribution(mut self, referer: impl Into<String>, title: impl Into<String>) -> Self {
        self.referer = referer.into();
        self.title = title.into();
        self
    }

    /// Whether an API key is available
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Ask the upstream model to solve the pictured problem
    ///
    /// Returns the first choice's message content, which the upstream may
    /// leave null.
    pub async fn solve(&self, request: &VisionRequest, image: &str) -> Result<Option<String>> {
        let api_key = self.api_key.as_deref().ok_or(RelayError::ServerMisconfigured)?;

        let body = chat_request(request, image);

        debug!(model = %body.model, url = %self.url, "Calling vision API");

        let mut builder = self
            .client
            .post(&self.url)
            .header(header::AUTHORIZATION, format!("Bearer {}", api_key))
            .header(header::CONTENT_TYPE, "application/json");
        if !self.referer.is_empty() {
            builder = builder.header(header::REFERER, &self.referer);
        }
        if !self.title.is_empty() {
            builder = builder.header("X-Title", &self.title);
        }

        let response = builder.json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, text);
            return Err(RelayError::Upstream {
                status: mirror_status(status),
                body: text,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(RelayError::EmptyCompletion)
    }
}

/// Build the chat-completion body for one image
fn chat_request<'a>(request: &'a VisionRequest, image: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model: request.model(),
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(request.system_prompt()),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: SOLVE_INSTRUCTION,
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: image },
                    },
                ]),
            },
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
        stream: false,
    }
}

/// Carry the upstream status over to the server side unchanged
fn mirror_status(status: StatusCode) -> hyper::StatusCode {
    hyper::StatusCode::from_u16(status.as_u16()).unwrap_or(hyper::StatusCode::BAD_GATEWAY)
}
