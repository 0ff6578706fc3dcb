//! Agent — drives one user turn through the two-phase protocol.
//!
//! ```text
//! AwaitingInitialResponse ──(no tool calls)──────────────────────────────▶ Done
//!          │
//!          └─(tool calls)─▶ DispatchingTools ─▶ AwaitingFollowupResponse ─▶ Done
//! ```
//!
//! Exactly one tool round is run. A model error at either call ends the turn
//! with an error-bearing assistant message appended to the history.

use std::sync::Arc;

use uuid::Uuid;

use super::conversation::ConversationAssembler;
use super::dispatcher::ToolDispatcher;
use super::errors::AgentError;
use super::types::{
    Attachment, ConversationMessage, ToolInvocationResult, TurnOutcome, TurnState,
};
use crate::config::AppConfig;
use crate::enablement::{filter_enabled, EnablementStore};
use crate::inference::types::{ChatMessage, ToolDefinition};
use crate::inference::{InferenceClient, InferenceError};
use crate::registry::{RegistryAggregator, ToolDescriptor, ToolRegistry};

// ─── Session ────────────────────────────────────────────────────────────────

/// One conversation's history. Grows until [`Session::reset`].
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    history: Vec<ConversationMessage>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn history(&self) -> &[ConversationMessage] {
        &self.history
    }

    pub fn reset(&mut self) {
        tracing::info!(session_id = %self.id, cleared = self.history.len(), "session reset");
        self.history.clear();
    }

    fn push(&mut self, message: ConversationMessage) {
        self.history.push(message);
    }
}

// ─── Agent ──────────────────────────────────────────────────────────────────

pub struct Agent {
    client: InferenceClient,
    aggregator: RegistryAggregator,
    registry: ToolRegistry,
    enablement: Arc<EnablementStore>,
    assembler: ConversationAssembler,
    dispatcher: ToolDispatcher,
}

impl Agent {
    /// Assemble an agent from its parts. The registry starts empty; call
    /// [`Agent::refresh`] to discover tools.
    pub fn new(
        client: InferenceClient,
        aggregator: RegistryAggregator,
        enablement: Arc<EnablementStore>,
        assembler: ConversationAssembler,
        dispatcher: ToolDispatcher,
    ) -> Self {
        Self {
            client,
            aggregator,
            registry: ToolRegistry::new(),
            enablement,
            assembler,
            dispatcher,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        enablement: Arc<EnablementStore>,
    ) -> Result<Self, AgentError> {
        Ok(Self::new(
            InferenceClient::from_config(config.model.clone())?,
            RegistryAggregator::from_config(config)?,
            enablement,
            ConversationAssembler::from_config(&config.conversation),
            ToolDispatcher::new(&config.dispatch)?,
        ))
    }

    /// Rebuild the registry from scratch and seed the enablement map on
    /// first discovery.
    pub async fn refresh(&mut self) -> Result<(), AgentError> {
        self.registry = self.aggregator.aggregate().await;
        self.enablement.initialize(&self.registry.groups())?;
        Ok(())
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn enablement(&self) -> &EnablementStore {
        &self.enablement
    }

    /// Descriptors offered to the model this turn.
    pub fn enabled_tools(&self) -> Vec<&ToolDescriptor> {
        filter_enabled(self.registry.all(), &self.enablement.snapshot())
    }

    /// Run one user turn against `session`.
    ///
    /// Never fails: model errors are reported through the returned outcome
    /// and recorded in the history.
    pub async fn run_turn(
        &self,
        session: &mut Session,
        text: &str,
        attachments: &[Attachment],
    ) -> TurnOutcome {
        let mut states = vec![TurnState::AwaitingInitialResponse];

        let enabled = self.enabled_tools();
        let tool_defs = ToolRegistry::to_tool_definitions(enabled.iter().copied());

        let messages = self.assembler.assemble(session.history(), text, attachments);
        let mut wire: Vec<ChatMessage> = messages.iter().map(|m| m.to_chat_message()).collect();
        if let Some(user) = messages.last() {
            session.push(user.clone());
        }

        tracing::info!(
            session_id = %session.id(),
            model = %self.client.model_name(),
            history_len = session.history().len(),
            enabled_tools = tool_defs.len(),
            attachments = attachments.len(),
            "turn started"
        );

        let reply = match self.client.invoke(&wire, &tool_defs).await {
            Ok(reply) => ConversationMessage::from(reply),
            Err(e) => return finish_with_error(session, states, Vec::new(), &e),
        };

        if reply.requested_calls().is_empty() {
            states.push(TurnState::Done);
            session.push(reply.clone());
            tracing::info!(session_id = %session.id(), "turn finished without tools");
            return TurnOutcome {
                message: reply,
                states,
                tool_results: Vec::new(),
                is_error: false,
            };
        }

        states.push(TurnState::DispatchingTools);
        tracing::info!(
            session_id = %session.id(),
            calls = reply.requested_calls().len(),
            tools = ?reply.requested_calls().iter().map(|c| c.tool_name.as_str()).collect::<Vec<_>>(),
            "dispatching tool calls"
        );
        let results = self.dispatcher.dispatch(reply.requested_calls(), &enabled).await;

        self.finalize_turn(session, &mut wire, states, reply, results, &tool_defs)
            .await
    }

    /// Turn Finalizer: record the assistant's tool request and every result,
    /// then ask the model for the final answer.
    ///
    /// The follow-up reply is final even if it requests more tools; such
    /// requests are dropped.
    async fn finalize_turn(
        &self,
        session: &mut Session,
        wire: &mut Vec<ChatMessage>,
        mut states: Vec<TurnState>,
        reply: ConversationMessage,
        results: Vec<ToolInvocationResult>,
        tool_defs: &[ToolDefinition],
    ) -> TurnOutcome {
        wire.push(reply.to_chat_message());
        session.push(reply);
        for result in &results {
            let message = ConversationMessage::tool_result(&result.tool_call_id, &result.content);
            wire.push(message.to_chat_message());
            session.push(message);
        }

        states.push(TurnState::AwaitingFollowupResponse);
        let followup = match self.client.invoke(wire, tool_defs).await {
            Ok(followup) => ConversationMessage::from(followup),
            Err(e) => return finish_with_error(session, states, results, &e),
        };

        if !followup.requested_calls().is_empty() {
            tracing::warn!(
                session_id = %session.id(),
                dropped = followup.requested_calls().len(),
                "follow-up requested more tools; only one round is run"
            );
        }
        let message = ConversationMessage::assistant(followup.content.unwrap_or_default());

        states.push(TurnState::Done);
        session.push(message.clone());
        tracing::info!(
            session_id = %session.id(),
            tool_results = results.len(),
            failed = results.iter().filter(|r| !r.success).count(),
            "turn finished"
        );

        TurnOutcome {
            message,
            states,
            tool_results: results,
            is_error: false,
        }
    }
}

fn finish_with_error(
    session: &mut Session,
    mut states: Vec<TurnState>,
    tool_results: Vec<ToolInvocationResult>,
    error: &InferenceError,
) -> TurnOutcome {
    tracing::error!(
        session_id = %session.id(),
        state = ?states.last(),
        error = %error,
        "model call failed, ending turn"
    );
    let message = ConversationMessage::assistant(error.user_message());
    states.push(TurnState::Done);
    session.push(message.clone());
    TurnOutcome {
        message,
        states,
        tool_results,
        is_error: true,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
