//! HTTP client for the hosted summarization model

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{SummarizerBackend, SummarizerConfig};
use crate::error::{DigestError, DigestResult};

use super::prompts::SUMMARY_SYSTEM;

/// Calls either a Hugging Face inference endpoint or an
/// OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct ModelClient {
    client: Client,
    backend: SummarizerBackend,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    min_length: u32,
    max_length: u32,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
    options: InferenceOptions,
}

#[derive(Serialize)]
struct InferenceParameters {
    max_length: u32,
    min_length: u32,
    do_sample: bool,
}

#[derive(Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

#[derive(Deserialize)]
struct InferenceOutput {
    summary_text: String,
}

#[derive(Deserialize)]
struct InferenceError {
    error: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ModelClient {
    pub fn new(config: &SummarizerConfig) -> Self {
        Self {
            client: Client::new(),
            backend: config.backend,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.resolved_api_key(),
            min_length: config.min_length,
            max_length: config.max_length,
        }
    }

    /// Endpoint the request goes to.
    pub fn request_url(&self) -> String {
        match self.backend {
            SummarizerBackend::HuggingFace => format!("{}/{}", self.endpoint, self.model),
            SummarizerBackend::Chat if self.endpoint.ends_with("/chat/completions") => {
                self.endpoint.clone()
            }
            SummarizerBackend::Chat => format!("{}/chat/completions", self.endpoint),
        }
    }

    /// Send one summarization request and return the raw model output.
    pub async fn generate(&self, input: &str) -> DigestResult<String> {
        let url = self.request_url();
        let request = match self.backend {
            SummarizerBackend::HuggingFace => self.client.post(&url).json(&InferenceRequest {
                inputs: input,
                parameters: InferenceParameters {
                    max_length: self.max_length,
                    min_length: self.min_length,
                    do_sample: false,
                },
                options: InferenceOptions {
                    wait_for_model: true,
                },
            }),
            SummarizerBackend::Chat => self.client.post(&url).json(&ChatRequest {
                model: &self.model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: SUMMARY_SYSTEM,
                    },
                    ChatMessage {
                        role: "user",
                        content: input,
                    },
                ],
                max_tokens: self.max_length,
            }),
        };

        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        tracing::debug!("Summarizing {} chars via {}", input.len(), url);

        let response = request
            .send()
            .await
            .map_err(|e| DigestError::ModelUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DigestError::ModelUnavailable(format!("reading response failed: {}", e)))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<InferenceError>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            return Err(DigestError::ModelUnavailable(format!(
                "model returned {}: {}",
                status, detail
            )));
        }

        match self.backend {
            SummarizerBackend::HuggingFace => parse_inference_response(&body),
            SummarizerBackend::Chat => parse_chat_response(&body),
        }
    }
}

pub(crate) fn parse_inference_response(body: &str) -> DigestResult<String> {
    if let Ok(err) = serde_json::from_str::<InferenceError>(body) {
        return Err(DigestError::ModelUnavailable(err.error));
    }

    let outputs: Vec<InferenceOutput> = serde_json::from_str(body)
        .map_err(|e| DigestError::ModelUnavailable(format!("malformed response: {}", e)))?;

    outputs
        .into_iter()
        .map(|o| o.summary_text.trim().to_string())
        .find(|s| !s.is_empty())
        .ok_or_else(|| DigestError::ModelUnavailable("empty summary".into()))
}

pub(crate) fn parse_chat_response(body: &str) -> DigestResult<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| DigestError::ModelUnavailable(format!("malformed response: {}", e)))?;

    response
        .choices
        .into_iter()
        .filter_map(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .ok_or_else(|| DigestError::ModelUnavailable("no response content".into()))
}
