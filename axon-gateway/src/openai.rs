//! OpenAI-compatible gateway implementation.
//!
//! Speaks the `/chat/completions` wire format, including function-calling
//! (`tools`, `tool_choice`, assistant `tool_calls`, tool-role
//! `tool_call_id`). Works against any endpoint implementing the same API.

use crate::gateway::{Completion, Gateway, ToolChoice};
use async_trait::async_trait;
use axon_common::{Error, LlmSettings, Message, Result, ToolCall};
use axon_tools::ToolSpec;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

/// Gateway binding to an OpenAI-compatible completion API.
pub struct OpenAiGateway {
    client: reqwest::Client,
    settings: LlmSettings,
}

impl OpenAiGateway {
    /// Create a gateway from explicit LLM settings.
    pub fn new(settings: LlmSettings) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
                .unwrap_or_else(|_| HeaderValue::from_static("")),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, settings }
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn build_messages(&self, messages: &[Message], system: Option<&str>) -> Vec<Message> {
        let mut all = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = system {
            if !system.is_empty() {
                all.push(Message::system(system));
            }
        }
        all.extend(messages.iter().cloned());
        all
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<ChoiceMessage> {
        let response = self
            .client
            .post(self.endpoint())
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Gateway(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Gateway(format!("API error ({status}): {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Gateway(format!("failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| Error::Gateway("empty response from model".into()))
    }
}

#[async_trait]
impl Gateway for OpenAiGateway {
    fn name(&self) -> &str {
        "openai"
    }

    async fn ask(&self, messages: &[Message], system: Option<&str>) -> Result<String> {
        let all = self.build_messages(messages, system);
        let request = ChatRequest {
            model: &self.settings.model,
            messages: all,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            tools: None,
            tool_choice: None,
        };

        let message = self.complete(&request).await?;
        match message.content {
            Some(content) if !content.is_empty() => Ok(content),
            _ => Err(Error::Gateway("empty response from model".into())),
        }
    }

    async fn ask_with_tools(
        &self,
        messages: &[Message],
        system: Option<&str>,
        tools: &[ToolSpec],
        tool_choice: ToolChoice,
    ) -> Result<Completion> {
        let all = self.build_messages(messages, system);
        let wire_tools: Vec<WireTool<'_>> = tools
            .iter()
            .map(|spec| WireTool {
                kind: "function",
                function: spec,
            })
            .collect();

        let request = ChatRequest {
            model: &self.settings.model,
            messages: all,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            tools: Some(wire_tools),
            tool_choice: Some(tool_choice.as_str()),
        };

        let message = self.complete(&request).await?;

        let tool_calls = message
            .tool_calls
            .into_iter()
            .map(|call| {
                // Providers occasionally send calls with no argument payload.
                let arguments = if call.function.arguments.is_empty() {
                    "{}".to_string()
                } else {
                    call.function.arguments
                };
                ToolCall::function(call.id, call.function.name, arguments)
            })
            .collect();

        Ok(Completion {
            content: message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolSpec,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_tools_and_choice() {
        let spec = ToolSpec {
            name: "terminate".into(),
            description: "End the run".into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        };
        let request = ChatRequest {
            model: "gpt-4o",
            messages: vec![Message::user("hi")],
            max_tokens: 128,
            temperature: 0.0,
            tools: Some(vec![WireTool {
                kind: "function",
                function: &spec,
            }]),
            tool_choice: Some("auto"),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "terminate");
        assert_eq!(json["tool_choice"], "auto");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn request_omits_tools_when_absent() {
        let request = ChatRequest {
            model: "gpt-4o",
            messages: vec![Message::user("hi")],
            max_tokens: 128,
            temperature: 0.0,
            tools: None,
            tool_choice: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("tools"));
        assert!(!json.contains("tool_choice"));
    }

    #[test]
    fn response_parses_tool_calls() {
        let body = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "terminate", "arguments": ""}
                    }]
                }
            }]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let message = &parsed.choices[0].message;
        assert!(message.content.is_none());
        assert_eq!(message.tool_calls[0].function.name, "terminate");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let mut settings = LlmSettings::default();
        settings.base_url = "http://localhost:8080/v1/".into();
        let gateway = OpenAiGateway::new(settings);
        assert_eq!(gateway.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
