//! OpenAI-compatible chat and embeddings provider with SSE streaming

use crate::provider::{Embedder, LanguageModel, LlmError, LlmResult, LlmStream};
use crate::types::{AssistantTurn, ChatRequest, StreamDelta};
use futures::StreamExt;
use ragline_core::{Message, Role, ToolCall};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    /// Point at any OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_body(&self, request: &ChatRequest, stream: bool) -> WireRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
                tool_calls: None,
                tool_call_id: None,
            });
        }
        messages.extend(request.messages.iter().map(to_wire_message));

        WireRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(
                    request
                        .tools
                        .iter()
                        .map(|t| WireTool {
                            kind: "function".to_string(),
                            function: WireFunctionDef {
                                name: t.name.clone(),
                                description: t.description.clone(),
                                parameters: t.input_schema.clone(),
                            },
                        })
                        .collect(),
                )
            },
        }
    }

    async fn post_completions(&self, body: &WireRequest) -> LlmResult<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI error {}: {}", status, error_text);
            return Err(match status.as_u16() {
                401 => LlmError::AuthFailed(error_text),
                429 => LlmError::RateLimited {
                    retry_after_ms: 60_000,
                },
                _ => LlmError::RequestFailed(format!("{}: {}", status, error_text)),
            });
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl LanguageModel for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: ChatRequest) -> LlmResult<AssistantTurn> {
        let body = self.build_body(&request, false);
        debug!("OpenAI request: model={}", body.model);
        let response = self.post_completions(&body).await?;

        let completion: WireCompletion = response.json().await?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no choices in completion".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(serde_json::json!({})),
            })
            .collect();

        Ok(AssistantTurn {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }

    async fn stream(&self, request: ChatRequest) -> LlmResult<LlmStream> {
        let body = self.build_body(&request, true);
        debug!("OpenAI stream request: model={}", body.model);
        let response = self.post_completions(&body).await?;
        Ok(Box::pin(parse_sse_stream(response.bytes_stream())))
    }
}

fn to_wire_message(msg: &Message) -> WireMessage {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    WireMessage {
        role: role.to_string(),
        content: Some(msg.content.clone()),
        tool_calls: msg.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|tc| WireToolCall {
                    id: tc.id.clone(),
                    kind: "function".to_string(),
                    function: WireFunctionCall {
                        name: tc.name.clone(),
                        arguments: tc.arguments.to_string(),
                    },
                })
                .collect()
        }),
        tool_call_id: msg.tool_call_id.clone(),
    }
}

/// Parse an OpenAI SSE byte stream into typed deltas.
///
/// Tool-call argument fragments arrive keyed by choice-local index; ids and
/// names appear only on the first fragment, so open calls are tracked by
/// index and closed when the stream finishes.
fn parse_sse_stream(
    bytes_stream: impl futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
) -> impl futures::Stream<Item = LlmResult<StreamDelta>> + Send {
    async_stream::stream! {
        let mut buffer = String::new();
        // index -> tool call id, in start order
        let mut open_calls: Vec<(u32, String)> = Vec::new();
        let mut finish_reason: Option<String> = None;

        tokio::pin!(bytes_stream);

        while let Some(chunk_result) = bytes_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(LlmError::StreamError(e.to_string()));
                    continue;
                }
            };

            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(line_end) = buffer.find('\n') {
                let line = buffer[..line_end].trim().to_string();
                buffer = buffer[line_end + 1..].to_string();

                let data = match line.strip_prefix("data: ") {
                    Some(d) => d,
                    None => continue,
                };

                if data == "[DONE]" {
                    for (_, id) in open_calls.drain(..) {
                        yield Ok(StreamDelta::ToolCallEnd { id });
                    }
                    yield Ok(StreamDelta::Done { stop_reason: finish_reason.take() });
                    return;
                }

                let parsed: WireStreamChunk = match serde_json::from_str(data) {
                    Ok(p) => p,
                    Err(e) => {
                        yield Err(LlmError::StreamError(format!("bad SSE chunk: {}", e)));
                        continue;
                    }
                };

                let choice = match parsed.choices.into_iter().next() {
                    Some(c) => c,
                    None => continue,
                };

                if let Some(reason) = choice.finish_reason {
                    finish_reason = Some(reason);
                }

                if let Some(text) = choice.delta.content {
                    if !text.is_empty() {
                        yield Ok(StreamDelta::Text(text));
                    }
                }

                for fragment in choice.delta.tool_calls.unwrap_or_default() {
                    if let (Some(id), Some(function)) = (&fragment.id, &fragment.function) {
                        if let Some(name) = &function.name {
                            open_calls.push((fragment.index, id.clone()));
                            yield Ok(StreamDelta::ToolCallStart {
                                id: id.clone(),
                                name: name.clone(),
                            });
                        }
                    }
                    if let Some(function) = &fragment.function {
                        if let Some(arguments) = &function.arguments {
                            if !arguments.is_empty() {
                                let id = open_calls
                                    .iter()
                                    .find(|(idx, _)| *idx == fragment.index)
                                    .map(|(_, id)| id.clone());
                                if let Some(id) = id {
                                    yield Ok(StreamDelta::ToolCallDelta {
                                        id,
                                        arguments: arguments.clone(),
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }

        // Stream ended without a [DONE] marker
        for (_, id) in open_calls.drain(..) {
            yield Ok(StreamDelta::ToolCallEnd { id });
        }
        yield Ok(StreamDelta::Done { stop_reason: finish_reason });
    }
}

/// Embeddings client for the `/embeddings` endpoint
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_API_URL.to_string(),
            model: model.into(),
            dimension,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait::async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "input": text,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed(format!("{}: {}", status, error_text)));
        }

        let parsed: WireEmbeddingResponse = response.json().await?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::InvalidResponse("no embedding in response".to_string()))
    }
}

// --- wire types ---

#[derive(Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionDef,
}

#[derive(Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct WireCompletion {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireCompletionMessage,
}

#[derive(Deserialize)]
struct WireCompletionMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireStreamChunk {
    choices: Vec<WireStreamChoice>,
}

#[derive(Deserialize)]
struct WireStreamChoice {
    delta: WireDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireDelta {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCallFragment>>,
}

#[derive(Deserialize)]
struct WireToolCallFragment {
    index: u32,
    id: Option<String>,
    function: Option<WireFunctionFragment>,
}

#[derive(Deserialize)]
struct WireFunctionFragment {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct WireEmbeddingResponse {
    data: Vec<WireEmbedding>,
}

#[derive(Deserialize)]
struct WireEmbedding {
    embedding: Vec<f32>,
}
