use crate::config::Config;
use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const API_KEY_ENV: &str = "DAYLOG_AI_API_KEY";

/// Text-in, text-out collaborator that writes the mood narrative.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completions client.
#[derive(Debug, Clone)]
pub struct ChatSummarizer {
    enabled: bool,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_seconds: u64,
}

impl ChatSummarizer {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enabled: config.ai_enabled,
            api_key: resolve_api_key(config),
            base_url: config.ai_api_base_url.clone(),
            model: config.ai_model.clone(),
            temperature: config.ai_temperature,
            max_tokens: config.ai_max_tokens,
            timeout_seconds: config.ai_timeout_seconds.max(5),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }
}

impl Summarizer for ChatSummarizer {
    fn summarize(&self, system: &str, user: &str) -> Result<String> {
        if !self.enabled {
            bail!("AI summarizer is disabled. Enable it with `DayLog config set ai.enabled true`");
        }

        let api_key = self.api_key.clone().with_context(|| {
            format!("AI API key is missing. Set `DayLog config set ai.api_key <KEY>` or `{API_KEY_ENV}`")
        })?;
        let client = self.clone();
        let system = system.to_string();
        let user = user.to_string();

        // reqwest's blocking client must not run on an async runtime thread.
        std::thread::spawn(move || client.chat_completion_blocking(&api_key, &system, &user))
            .join()
            .map_err(|_| anyhow!("AI worker thread panicked"))?
    }
}

impl ChatSummarizer {
    fn chat_completion_blocking(&self, api_key: &str, system: &str, user: &str) -> Result<String> {
        if api_key.trim().is_empty() {
            bail!("AI API key is empty");
        }

        let endpoint = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .context("Failed to build Authorization header")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .default_headers(headers)
            .build()
            .context("Failed to create AI HTTP client")?;

        let request_body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ]
        });

        let response = client
            .post(endpoint)
            .json(&request_body)
            .send()
            .context("AI API request failed")?;

        let status = response.status();
        let body = response.text().context("Failed to read AI response body")?;

        if !status.is_success() {
            bail!("AI API error {}: {}", status, body);
        }

        extract_message_content(&body)
    }
}

/// Connectivity check against the configured endpoint.
pub fn test_connection(config: &Config) -> Result<String> {
    let summarizer = ChatSummarizer {
        enabled: true,
        ..ChatSummarizer::from_config(config)
    };

    summarizer.summarize(
        "Reply with exactly one short sentence confirming the API is reachable.",
        "Health check for DayLog.",
    )
}

pub fn has_api_key(config: &Config) -> bool {
    resolve_api_key(config).is_some()
}

fn resolve_api_key(config: &Config) -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| {
            config
                .ai_api_key
                .clone()
                .filter(|value| !value.trim().is_empty())
        })
}

fn extract_message_content(body: &str) -> Result<String> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .with_context(|| format!("Failed to parse AI response: {body}"))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| anyhow!("AI response did not include message.content"))
}
