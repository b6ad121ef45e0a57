use std::time::Duration;

use anyhow::Context;
use cricket_timeline::prompt::{COMMENTATOR_SYSTEM_PROMPT, EDITOR_SYSTEM_PROMPT};
use cricket_timeline::{compile_summary_prompt, NarrationError, Summarizer};
use log::{debug, info};
use reqwest::blocking::Client;
use serde_json::{json, Value};

use crate::config::{present, LlmArgs};

pub const GENERATE_TEMPERATURE: f32 = 0.9;
pub const SUMMARIZE_TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 4000;
// Deep-research models can think for minutes before answering
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);
// Cloudflare "origin timed out"
const GATEWAY_TIMEOUT: u16 = 524;

/// Writes commentary for a compiled prompt. Every failure is reported as a
/// typed error, never as text.
pub trait Narrator {
    fn generate(&self, prompt: &str) -> Result<String, NarrationError>;
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl ChatClient {
    pub fn new(args: &LlmArgs) -> anyhow::Result<ChatClient> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build LLM HTTP client")?;
        Ok(ChatClient {
            client,
            api_key: present(&args.llm_api_key).map(str::to_string),
            base_url: args.llm_base_url.trim_end_matches('/').to_string(),
            model: args.llm_model.clone(),
        })
    }

    pub fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, NarrationError> {
        let api_key = self.api_key.as_deref().ok_or(NarrationError::MissingApiKey)?;

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": temperature,
            "max_tokens": MAX_TOKENS,
            "stream": false
        });

        let endpoint = format!("{}/chat/completions", self.base_url);
        debug!("Calling {} with a {} character prompt", endpoint, user.chars().count());

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .map_err(request_error)?;

        let status = response.status();
        if status.as_u16() == GATEWAY_TIMEOUT {
            return Err(NarrationError::Timeout);
        }
        if !status.is_success() {
            return Err(NarrationError::Http {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let body: Value = response
            .json()
            .map_err(|e| NarrationError::InvalidResponse(e.to_string()))?;
        message_content(&body)
    }
}

fn request_error(e: reqwest::Error) -> NarrationError {
    if e.is_timeout() {
        NarrationError::Timeout
    } else {
        NarrationError::Network(e.to_string())
    }
}

/// Text of `choices[0].message.content`.
fn message_content(body: &Value) -> Result<String, NarrationError> {
    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| NarrationError::InvalidResponse("no choices in response".to_string()))?;
    let content = choice["message"]["content"].as_str().unwrap_or_default().trim();
    if content.is_empty() {
        return Err(NarrationError::EmptyResponse);
    }
    Ok(content.to_string())
}

impl Narrator for ChatClient {
    fn generate(&self, prompt: &str) -> Result<String, NarrationError> {
        let text = self.complete(COMMENTATOR_SYSTEM_PROMPT, prompt, GENERATE_TEMPERATURE)?;
        info!("Generated {} characters of commentary", text.chars().count());
        Ok(text)
    }
}

impl Summarizer for ChatClient {
    fn summarize(&self, text: &str, max_chars: usize) -> Result<String, NarrationError> {
        let prompt = compile_summary_prompt(text, max_chars);
        self.complete(EDITOR_SYSTEM_PROMPT, &prompt, SUMMARIZE_TEMPERATURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(key: Option<&str>) -> LlmArgs {
        LlmArgs {
            llm_api_key: key.map(str::to_string),
            llm_base_url: "http://127.0.0.1:9/v1/".to_string(),
            llm_model: "jina-deepsearch-v1".to_string(),
        }
    }

    #[test]
    fn test_message_content() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "  FOUR! Driven through the covers!\n"}}]});
        assert_eq!(
            message_content(&body).unwrap(),
            "FOUR! Driven through the covers!"
        );

        let blank = json!({"choices": [{"message": {"content": "   "}}]});
        assert_eq!(message_content(&blank), Err(NarrationError::EmptyResponse));

        let null_content = json!({"choices": [{"message": {"content": null}}]});
        assert_eq!(message_content(&null_content), Err(NarrationError::EmptyResponse));

        assert!(matches!(
            message_content(&json!({"error": "overloaded"})),
            Err(NarrationError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_missing_key_fails_before_any_request() {
        let client = ChatClient::new(&args(Some("  "))).unwrap();
        assert_eq!(client.generate("prompt"), Err(NarrationError::MissingApiKey));
        assert_eq!(
            client.summarize("long text", 9000),
            Err(NarrationError::MissingApiKey)
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ChatClient::new(&args(Some("key"))).unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:9/v1");
    }
}
