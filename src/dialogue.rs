//! Dialogue generation via chat completions
//!
//! The model is asked for a JSON object `{"messages": [...]}` of at most
//! three reply fragments. Its output crosses a trust boundary, so it is
//! parsed leniently (code fences stripped, bare arrays accepted) and then
//! validated strictly against the fragment schema.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{LlmConfig, ProviderConfig};
use crate::fragment::ReplyFragment;
use crate::{Error, Result};

/// Maximum number of fragments in one reply
pub const MAX_FRAGMENTS: usize = 3;

const TEMPERATURE: f32 = 0.6;
const MAX_TOKENS: u32 = 1000;

/// Built-in persona and output-shape instructions
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a friendly virtual companion who speaks through an animated 3D avatar.
You will always reply with a JSON object of the form {\"messages\": [...]}.
The array holds at most 3 messages.
Each message has a text, facialExpression, and animation property.
The available facial expressions are: smile, serious, thoughtful, surprised and default.
The available animations are: Talking_0, Talking_1, Idle, Agreeing_0 and Agreeing_1.
Keep every text short enough to be spoken in a few seconds.";

/// Generates avatar replies for a user message
pub struct DialogueGenerator {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: Url,
    model: String,
    system_prompt: String,
}

impl DialogueGenerator {
    /// Create a generator backed by the `OpenAI` chat completions endpoint
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing or the HTTP client cannot be built
    pub fn new_openai(provider: &ProviderConfig, llm: &LlmConfig) -> Result<Self> {
        let api_key = provider
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("OpenAI API key required for chat".to_string()))?;

        let endpoint = provider
            .base_url
            .join("chat/completions")
            .map_err(|e| Error::Config(format!("invalid chat endpoint: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(provider.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint,
            model: llm.model.clone(),
            system_prompt: llm
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        })
    }

    /// Ask the model for up to three reply fragments
    ///
    /// # Errors
    ///
    /// Returns `Error::Dialogue` if the request fails or the output violates the schema
    pub async fn generate_replies(&self, user_message: &str) -> Result<Vec<ReplyFragment>> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat completion request failed");
                Error::Dialogue("chat completion request failed".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat completion API error");
            return Err(Error::Dialogue(format!("chat completion API returned {status}")));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse chat completion response");
            Error::Dialogue("malformed chat completion response".to_string())
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Dialogue("chat completion had no content".to_string()))?;

        let replies = parse_replies(&content).inspect_err(|e| {
            tracing::warn!(error = %e, content = %content, "model output rejected");
        })?;

        tracing::info!(fragments = replies.len(), "generated replies");
        Ok(replies)
    }
}

/// Parse and validate raw model output into reply fragments
///
/// # Errors
///
/// Returns `Error::Dialogue` for invalid JSON, unknown expressions or
/// animations, missing fields, or more than three fragments
pub fn parse_replies(raw: &str) -> Result<Vec<ReplyFragment>> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| Error::Dialogue(format!("model output is not valid JSON: {e}")))?;

    let value = match value {
        serde_json::Value::Object(mut map) if map.contains_key("messages") => {
            map.remove("messages").unwrap_or_default()
        }
        other => other,
    };

    let replies: Vec<ReplyFragment> = serde_json::from_value(value)
        .map_err(|e| Error::Dialogue(format!("model output violates reply schema: {e}")))?;

    if replies.len() > MAX_FRAGMENTS {
        return Err(Error::Dialogue(format!(
            "model returned {} messages, at most {MAX_FRAGMENTS} allowed",
            replies.len()
        )));
    }

    Ok(replies)
}

/// Remove a surrounding Markdown code fence (```` ``` ```` or ```` ```json ````)
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. "json") on the opening line
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
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

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::fragment::{Animation, FacialExpression};

    const ONE_REPLY: &str =
        r#"{"messages":[{"text":"Hello","facialExpression":"default","animation":"Idle"}]}"#;

    #[test]
    fn parses_wrapped_object() {
        let replies = parse_replies(ONE_REPLY).unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text, "Hello");
        assert_eq!(replies[0].facial_expression, FacialExpression::Default);
        assert_eq!(replies[0].animation, Animation::Idle);
    }

    #[test]
    fn parses_bare_array() {
        let replies = parse_replies(
            r#"[{"text":"A","facialExpression":"smile","animation":"Talking_0"},
                {"text":"B","facialExpression":"thoughtful","animation":"Agreeing_1"}]"#,
        )
        .unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1].animation, Animation::Agreeing1);
    }

    #[test]
    fn strips_code_fences() {
        let fenced = format!("```json\n{ONE_REPLY}\n```");
        assert_eq!(parse_replies(&fenced).unwrap().len(), 1);

        let bare_fence = format!("```\n{ONE_REPLY}\n```\n");
        assert_eq!(parse_replies(&bare_fence).unwrap().len(), 1);
    }

    #[test]
    fn strip_code_fence_leaves_plain_text() {
        assert_eq!(strip_code_fence("  [1, 2]  "), "[1, 2]");
    }

    #[test]
    fn invalid_json_is_dialogue_error() {
        let err = parse_replies("Sure! Here is your answer").unwrap_err();
        assert!(matches!(err, Error::Dialogue(_)));
    }

    #[test]
    fn unknown_expression_is_dialogue_error() {
        let err = parse_replies(
            r#"[{"text":"Hi","facialExpression":"funnyFace","animation":"Idle"}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Dialogue(_)));
    }

    #[test]
    fn missing_field_is_dialogue_error() {
        let err = parse_replies(r#"[{"text":"Hi","animation":"Idle"}]"#).unwrap_err();
        assert!(matches!(err, Error::Dialogue(_)));
    }

    #[test]
    fn too_many_fragments_is_dialogue_error() {
        let fragment = r#"{"text":"x","facialExpression":"smile","animation":"Idle"}"#;
        let raw = format!("[{fragment},{fragment},{fragment},{fragment}]");
        let err = parse_replies(&raw).unwrap_err();
        assert!(matches!(err, Error::Dialogue(_)));
    }

    #[test]
    fn empty_reply_is_accepted() {
        assert_eq!(parse_replies(r#"{"messages":[]}"#).unwrap(), Vec::new());
        assert_eq!(parse_replies("[]").unwrap(), Vec::new());
    }

    #[test]
    fn object_without_messages_is_dialogue_error() {
        let err = parse_replies(r#"{"reply":"hi"}"#).unwrap_err();
        assert!(matches!(err, Error::Dialogue(_)));
    }

    fn test_generator(server: &MockServer) -> DialogueGenerator {
        let provider = ProviderConfig {
            api_key: Some(SecretString::from("test-key".to_owned())),
            base_url: Url::parse(&format!("{}/v1/", server.uri())).unwrap(),
            ..ProviderConfig::default()
        };
        DialogueGenerator::new_openai(&provider, &LlmConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn generate_replies_sends_sampling_parameters() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "temperature": 0.6,
                "max_tokens": 1000,
                "response_format": { "type": "json_object" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": ONE_REPLY } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let replies = test_generator(&server).generate_replies("Hi").await.unwrap();
        assert_eq!(replies.len(), 1);

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hi");
    }

    #[tokio::test]
    async fn api_error_is_dialogue_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = test_generator(&server).generate_replies("Hi").await.unwrap_err();
        assert!(matches!(err, Error::Dialogue(_)));
    }
}
