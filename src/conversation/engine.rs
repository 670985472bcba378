use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatModel, ChatRequest, ModelConfig, ToolCallRequest, ToolDefinition};
use crate::tools::ToolRegistry;

/// Progress of a single turn. A turn never goes back to `AwaitingModel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingModel,
    ToolsRequested,
    AwaitingModelFollowUp,
    Done,
}

/// One executed tool call, serialized as `{function_name: arguments}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: Value,
}

impl Serialize for ToolCallRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.arguments)?;
        map.end()
    }
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub final_message: ChatMessage,
    pub history: Vec<ChatMessage>,
    pub tool_calls: Vec<ToolCallRecord>,
}

impl TurnOutcome {
    /// Text of the final assistant message; empty when the model sent none.
    pub fn answer(&self) -> String {
        self.final_message.content().unwrap_or_default().to_string()
    }
}

/// Drives one user turn: model call, at most one round of tool calls, and
/// a follow-up model call without tools.
#[derive(Clone)]
pub struct ConversationEngine {
    model: Arc<dyn ChatModel>,
    registry: ToolRegistry,
}

impl ConversationEngine {
    pub fn new(model: Arc<dyn ChatModel>, registry: ToolRegistry) -> Self {
        Self { model, registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn run_turn(
        &self,
        user_message: &str,
        mut history: Vec<ChatMessage>,
        catalog: &[ToolDefinition],
        model_config: &ModelConfig,
    ) -> Result<TurnOutcome, ApiError> {
        let mut state = TurnState::AwaitingModel;
        tracing::debug!(
            ?state,
            provider = self.model.name(),
            model = %model_config.model,
            history_len = history.len(),
            "Starting turn"
        );

        history.push(ChatMessage::user(user_message));
        let request = ChatRequest::new(history.clone())
            .with_tools(catalog)
            .with_config(model_config);
        let response = self.model.chat(request, &model_config.model).await?;
        history.push(response.clone());

        let requested: Vec<ToolCallRequest> = response.tool_calls().to_vec();
        if requested.is_empty() {
            state = TurnState::Done;
            tracing::debug!(?state, "Model answered without tools");
            return Ok(TurnOutcome {
                final_message: response,
                history,
                tool_calls: Vec::new(),
            });
        }

        state = TurnState::ToolsRequested;
        tracing::debug!(?state, count = requested.len(), "Model requested tools");

        let mut trace = Vec::with_capacity(requested.len());
        for call in &requested {
            let (arguments, result) = self.execute_tool_call(call).await?;
            history.push(ChatMessage::tool_result(
                call.id.clone(),
                call.function.name.clone(),
                result,
            ));
            trace.push(ToolCallRecord {
                name: call.function.name.clone(),
                arguments,
            });
        }

        state = TurnState::AwaitingModelFollowUp;
        tracing::debug!(?state, "Sending tool results back to model");

        let request = ChatRequest::new(history.clone()).with_config(model_config);
        let final_message = self.model.chat(request, &model_config.model).await?;
        history.push(final_message.clone());

        state = TurnState::Done;
        tracing::debug!(?state, history_len = history.len(), "Turn complete");

        Ok(TurnOutcome {
            final_message,
            history,
            tool_calls: trace,
        })
    }

    async fn execute_tool_call(&self, call: &ToolCallRequest) -> Result<(Value, String), ApiError> {
        let name = call.function.name.as_str();
        let handler = self.registry.resolve(name)?;

        let arguments: Value = serde_json::from_str(&call.function.arguments)
            .map_err(|e| ApiError::tool(name, format!("arguments are not valid JSON: {}", e)))?;

        tracing::info!(tool = name, arguments = %arguments, "Invoking tool");
        let result = handler.invoke(&arguments).await?;
        Ok((arguments, result))
    }
}
