//! Mapping between parley step requests and the Chat Completions format.

use parley_types::{
    CompletedStep, Message, ModelError, ModelStep, Role, StepRequest, ToolCallRequest,
    ToolDescriptor,
};

use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, ChatTool, ChatToolCall, FunctionCall,
    FunctionDefinition,
};

/// Build the request body for one generation step.
///
/// Message order: the system instruction, the caller's history, then for
/// every step already run this turn an assistant message carrying its
/// `tool_calls` followed by one `tool` message per result.
#[must_use]
pub fn to_api_request(request: &StepRequest, model: &str, stream: bool) -> ChatRequest {
    let mut messages = Vec::with_capacity(1 + request.history.len() + request.steps.len() * 2);
    if !request.system.is_empty() {
        messages.push(ChatMessage::text("system", &request.system));
    }
    messages.extend(request.history.iter().map(map_message));
    for (index, step) in request.steps.iter().enumerate() {
        map_completed_step(index, step, &mut messages);
    }

    ChatRequest {
        model: model.to_string(),
        messages,
        tools: request.tools.iter().map(map_tool).collect(),
        stream,
    }
}

fn map_message(message: &Message) -> ChatMessage {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
    };
    ChatMessage::text(role, &message.content)
}

fn map_completed_step(step_index: usize, step: &CompletedStep, out: &mut Vec<ChatMessage>) {
    let ids: Vec<String> = step
        .calls
        .iter()
        .enumerate()
        .map(|(i, call)| call_id(step_index, i, call))
        .collect();

    out.push(ChatMessage {
        role: "assistant".into(),
        content: (!step.text.is_empty()).then(|| step.text.clone()),
        tool_calls: Some(
            step.calls
                .iter()
                .zip(&ids)
                .map(|(call, id)| ChatToolCall {
                    id: id.clone(),
                    call_type: "function".into(),
                    function: FunctionCall {
                        name: call.name.clone(),
                        arguments: call.args_serialized(),
                    },
                })
                .collect(),
        ),
        tool_call_id: None,
    });

    for (id, result) in ids.into_iter().zip(&step.results) {
        let content = serde_json::to_string(result).unwrap_or_else(|_| result.message.clone());
        out.push(ChatMessage {
            role: "tool".into(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: Some(id),
        });
    }
}

/// The model-assigned id, or a stable synthetic one when the model gave none.
fn call_id(step_index: usize, call_index: usize, call: &ToolCallRequest) -> String {
    if call.id.is_empty() {
        format!("call_{step_index}_{call_index}")
    } else {
        call.id.clone()
    }
}

fn map_tool(tool: &ToolDescriptor) -> ChatTool {
    ChatTool {
        tool_type: "function".into(),
        function: FunctionDefinition {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters_schema.clone(),
        },
    }
}

/// Parse a non-streaming response into a materialised step.
///
/// # Errors
///
/// [`ModelError::MalformedResponse`] when the body has no choices or is not
/// a Chat Completions response.
pub fn from_api_response(body: &str) -> Result<ModelStep, ModelError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ModelError::MalformedResponse(format!("invalid response body: {e}")))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::MalformedResponse("response has no choices".into()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| tool_call(tc.id, tc.function.name, &tc.function.arguments))
        .collect();

    Ok(ModelStep {
        text: choice.message.content.unwrap_or_default(),
        tool_calls,
    })
}

/// Build a tool-call request from the API's JSON-text arguments.
///
/// Unparseable argument text is kept as a JSON string so the registry
/// rejects it as a non-object instead of the turn failing.
pub(crate) fn tool_call(id: String, name: String, arguments: &str) -> ToolCallRequest {
    let args = if arguments.trim().is_empty() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(arguments).unwrap_or_else(|e| {
            tracing::warn!(
                event = "parley.openai.bad_arguments",
                tool = %name,
                error = %e,
            );
            serde_json::Value::String(arguments.to_string())
        })
    };
    ToolCallRequest::new(name, args).with_id(id)
}
