//! Wire-level tests for the OpenAI-compatible gateway against a mock server.

use axon_common::{LlmSettings, Message};
use axon_gateway::{Gateway, OpenAiGateway, ToolChoice};
use axon_tools::ToolSpec;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_for(server: &MockServer) -> LlmSettings {
    LlmSettings {
        model: "gpt-4o".into(),
        base_url: server.uri(),
        api_key: "test-key".into(),
        max_tokens: 512,
        temperature: 0.0,
    }
}

fn terminate_spec() -> ToolSpec {
    ToolSpec {
        name: "terminate".into(),
        description: "End the run".into(),
        parameters: json!({"type": "object", "properties": {}}),
    }
}

#[tokio::test]
async fn ask_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "hello there"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = OpenAiGateway::new(settings_for(&server));
    let content = gateway.ask(&[Message::user("hi")], Some("be brief")).await.unwrap();
    assert_eq!(content, "hello there");
}

#[tokio::test]
async fn ask_with_tools_sends_schemas_and_parses_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "tool_choice": "required",
            "tools": [{"type": "function", "function": {"name": "terminate"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "terminate", "arguments": "{\"status\": \"success\"}"}
                }]
            }}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = OpenAiGateway::new(settings_for(&server));
    let completion = gateway
        .ask_with_tools(
            &[Message::user("finish up")],
            None,
            &[terminate_spec()],
            ToolChoice::Required,
        )
        .await
        .unwrap();

    assert!(completion.content.is_empty());
    assert_eq!(completion.tool_calls.len(), 1);
    assert_eq!(completion.tool_calls[0].id, "call_1");
    assert_eq!(completion.tool_calls[0].function.name, "terminate");
    assert_eq!(
        completion.tool_calls[0].function.arguments,
        "{\"status\": \"success\"}"
    );
}

#[tokio::test]
async fn empty_call_arguments_normalize_to_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "terminate"}
                }]
            }}]
        })))
        .mount(&server)
        .await;

    let gateway = OpenAiGateway::new(settings_for(&server));
    let completion = gateway
        .ask_with_tools(&[Message::user("x")], None, &[terminate_spec()], ToolChoice::Auto)
        .await
        .unwrap();
    assert_eq!(completion.tool_calls[0].function.arguments, "{}");
}

#[tokio::test]
async fn api_error_surfaces_as_gateway_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let gateway = OpenAiGateway::new(settings_for(&server));
    let err = gateway.ask(&[Message::user("hi")], None).await.unwrap_err();
    assert!(err.is_gateway());
    assert!(err.to_string().contains("rate limited"));
}

#[tokio::test]
async fn empty_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let gateway = OpenAiGateway::new(settings_for(&server));
    let err = gateway.ask(&[Message::user("hi")], None).await.unwrap_err();
    assert!(err.to_string().contains("empty response from model"));
}

#[tokio::test]
async fn tool_role_messages_round_trip_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "terminate", "arguments": "{}"}
                }]},
                {"role": "tool", "content": "done", "name": "terminate", "tool_call_id": "call_1"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "all wrapped up"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let messages = vec![
        Message::user("hi"),
        Message::from_tool_calls(
            "",
            vec![axon_common::ToolCall::function("call_1", "terminate", "{}")],
        ),
        Message::tool("done", "terminate", "call_1"),
    ];

    let gateway = OpenAiGateway::new(settings_for(&server));
    let completion = gateway
        .ask_with_tools(&messages, None, &[terminate_spec()], ToolChoice::Auto)
        .await
        .unwrap();
    assert_eq!(completion.content, "all wrapped up");
}
