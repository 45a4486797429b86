//! OpenAI-compatible chat-completions phrase source.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{PhraseError, PhraseRequest, PhraseSource, parse_phrase_list};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const SYSTEM_PROMPT: &str = "Extract key phrases from academic papers for highlighting.";

/// Connection and generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiConfig {
    /// Base URL; `/chat/completions` is appended.
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    /// Request `response_format: json_object`. Some compatible servers
    /// reject the field; turn it off for those.
    pub json_mode: bool,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 800,
            temperature: 0.2,
            timeout: Duration::from_secs(60),
            json_mode: true,
        }
    }
}

pub struct OpenAiPhraseSource {
    api_key: String,
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiPhraseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiPhraseSource")
            .field("api_key", &"***")
            .field("config", &self.config)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
    error: Option<ChatError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    message: String,
}

impl OpenAiPhraseSource {
    pub fn new(api_key: impl Into<String>, config: OpenAiConfig) -> Self {
        Self {
            api_key: api_key.into(),
            config,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    fn build_request<'a>(&'a self, request: &PhraseRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(request),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: self.config.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }

    async fn request_phrases(&self, request: &PhraseRequest) -> Result<Vec<String>, PhraseError> {
        let body = self.build_request(request);
        tracing::debug!(model = %self.config.model, sample_chars = request.sample.chars().count(), "requesting phrases");

        let resp = self
            .client
            .post(self.url())
            .bearer_auth(&self.api_key)
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(PhraseError::RateLimited);
        }
        if !status.is_success() {
            let message = resp
                .json::<ChatResponse>()
                .await
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or_else(|| status.to_string());
            return Err(PhraseError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let data: ChatResponse = resp.json().await?;
        extract_content(data).and_then(|content| parse_phrase_list(&content))
    }
}

fn user_prompt(request: &PhraseRequest) -> String {
    format!(
        "Extract {}-{} important phrases from this academic paper. \
         Each phrase must appear verbatim in the text. \
         Return JSON of the form {{\"phrases\": [\"...\"]}} and nothing else.\n\n{}",
        request.min_count, request.max_count, request.sample
    )
}

fn extract_content(data: ChatResponse) -> Result<String, PhraseError> {
    if let Some(err) = data.error {
        return Err(PhraseError::MalformedResponse(err.message));
    }
    data.choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(PhraseError::EmptyReply)
}

impl PhraseSource for OpenAiPhraseSource {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn extract_phrases<'a>(
        &'a self,
        request: &'a PhraseRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, PhraseError>> + Send + 'a>> {
        Box::pin(self.request_phrases(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let source = OpenAiPhraseSource::new("sk-test", OpenAiConfig::default());
        let req = PhraseRequest::new("Attention is all you need.", 8000);
        let body = serde_json::to_value(source.build_request(&req)).unwrap();

        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["max_tokens"], 800);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["response_format"]["type"], "json_object");
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("15-25"));
        assert!(user.ends_with("Attention is all you need."));
    }

    #[test]
    fn json_mode_can_be_disabled() {
        let config = OpenAiConfig {
            json_mode: false,
            ..OpenAiConfig::default()
        };
        let source = OpenAiPhraseSource::new("sk-test", config);
        let req = PhraseRequest::new("t", 10);
        let body = serde_json::to_value(source.build_request(&req)).unwrap();
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn url_joins_cleanly() {
        let config = OpenAiConfig {
            endpoint: "http://localhost:8080/v1/".into(),
            ..OpenAiConfig::default()
        };
        let source = OpenAiPhraseSource::new("k", config);
        assert_eq!(source.url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn content_is_extracted_from_first_choice() {
        let data: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "{\"phrases\": [\"x\"]}"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_content(data).unwrap(), r#"{"phrases": ["x"]}"#);
    }

    #[test]
    fn missing_choices_is_empty_reply() {
        let data: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(extract_content(data), Err(PhraseError::EmptyReply)));
    }

    #[test]
    fn api_error_body_is_reported() {
        let data: ChatResponse =
            serde_json::from_str(r#"{"error": {"message": "invalid key"}}"#).unwrap();
        match extract_content(data) {
            Err(PhraseError::MalformedResponse(m)) => assert_eq!(m, "invalid key"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn debug_hides_key() {
        let source = OpenAiPhraseSource::new("sk-secret", OpenAiConfig::default());
        assert!(!format!("{:?}", source).contains("sk-secret"));
    }
}
