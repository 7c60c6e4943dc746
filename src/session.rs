// LTM Gateway - Session Lifecycle Controller
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Owns the awake/asleep state and the current-conversation pointer.
// Enforces lifecycle preconditions before delegating to the engine.
// State and engine share one lock: every operation, including the
// check-then-start-then-append of record_message, runs as a single writer.

use crate::engine::MemoryEngine;
use crate::error::{GatewayError, GatewayResult, Precondition};
use crate::model::{
    AwakenOptions, AwakeningContext, EngineStatus, Memory, Persona, SearchOptions, SleepOptions,
    Update,
};
use parking_lot::Mutex;
use std::time::Duration;

/// Two-party roster for auto-started conversations
pub const DEFAULT_PARTICIPANTS: [&str; 2] = ["user", "claude"];

/// Lifecycle state. A conversation can only exist while awake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Awake,
    ConversationActive { conversation_id: String },
}

impl SessionState {
    pub fn is_awake(&self) -> bool {
        matches!(self, SessionState::Awake | SessionState::ConversationActive { .. })
    }

    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            SessionState::ConversationActive { conversation_id } => Some(conversation_id),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initialized => "initialized",
            SessionState::Awake => "awake",
            SessionState::ConversationActive { .. } => "conversation_active",
        }
    }
}

/// Result of recording one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    pub conversation_id: String,
    pub message_count: usize,
    /// A conversation was auto-started for this message
    pub conversation_started: bool,
}

struct Inner {
    state: SessionState,
    engine: Box<dyn MemoryEngine>,
}

impl Inner {
    fn require_awake(&self) -> GatewayResult<()> {
        if self.state.is_awake() {
            Ok(())
        } else {
            Err(GatewayError::PreconditionFailed(Precondition::Awake))
        }
    }

    /// A failed engine call may have consumed the conversation (sleep folds
    /// it into a memory before evolving). Drop the pointer if so.
    fn resync_conversation(&mut self) {
        let Some(id) = self.state.conversation_id() else { return };
        match self.engine.get_status() {
            Ok(status) if status.current_conversation_id.as_deref() == Some(id) => {}
            Ok(_) => {
                log::warn!("Conversation {} no longer held by engine", id);
                self.state = SessionState::Awake;
            }
            Err(e) => log::error!("Could not resync conversation state: {}", e),
        }
    }
}

/// Session lifecycle controller, shared by handle across the dispatcher,
/// resource resolver and shutdown coordinator
pub struct Session {
    inner: Mutex<Inner>,
}

impl Session {
    pub fn new(engine: Box<dyn MemoryEngine>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SessionState::Uninitialized,
                engine,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    pub fn is_awake(&self) -> bool {
        self.inner.lock().state.is_awake()
    }

    // ========================================================================
    // LIFECYCLE TRANSITIONS
    // ========================================================================

    /// Always legal. (Re-)creates engine state and leaves the session asleep.
    pub fn initialize(&self) -> GatewayResult<Persona> {
        let mut inner = self.inner.lock();
        let persona = inner.engine.initialize()?;
        if let Some(id) = inner.state.conversation_id() {
            log::warn!("initialize dropped active conversation {}", id);
        }
        inner.state = SessionState::Initialized;
        log::info!("Initialized with persona {}", persona.persona_id);
        Ok(persona)
    }

    /// Load persona and memories, transition to awake. An active
    /// conversation survives a repeated awaken.
    pub fn awaken(&self, options: AwakenOptions) -> GatewayResult<AwakeningContext> {
        let mut inner = self.inner.lock();
        let context = inner.engine.awaken(options)?;
        if !inner.state.is_awake() {
            inner.state = SessionState::Awake;
        }
        log::info!(
            "Awake: {} recent, {} important memories loaded",
            context.recent_memories.len(),
            context.important_memories.len()
        );
        Ok(context)
    }

    /// Append a message, auto-starting a conversation when none is active
    pub fn record_message(&self, role: &str, content: &str) -> GatewayResult<RecordedMessage> {
        let mut inner = self.inner.lock();
        inner.require_awake()?;

        let mut conversation_started = false;
        if inner.state.conversation_id().is_none() {
            let conversation = inner.engine.start_conversation(&DEFAULT_PARTICIPANTS)?;
            log::info!("Created new conversation {} automatically", conversation.conversation_id);
            inner.state = SessionState::ConversationActive {
                conversation_id: conversation.conversation_id,
            };
            conversation_started = true;
        }

        let conversation = inner.engine.add_message(role, content)?;
        if inner.state.conversation_id() != Some(conversation.conversation_id.as_str()) {
            inner.state = SessionState::ConversationActive {
                conversation_id: conversation.conversation_id.clone(),
            };
        }

        Ok(RecordedMessage {
            conversation_id: conversation.conversation_id,
            message_count: conversation.messages.len(),
            conversation_started,
        })
    }

    /// Convert the active conversation into exactly one memory
    pub fn end_conversation(&self) -> GatewayResult<Memory> {
        let mut inner = self.inner.lock();
        inner.require_awake()?;
        if inner.state.conversation_id().is_none() {
            return Err(GatewayError::PreconditionFailed(Precondition::ActiveConversation));
        }

        let memory = inner.engine.end_conversation()?;
        inner.state = SessionState::Awake;
        log::info!("Conversation ended as memory {} (importance {})", memory.memory_id, memory.importance);
        Ok(memory)
    }

    /// Dreamstate pass, then asleep
    pub fn sleep(&self, options: SleepOptions) -> GatewayResult<Update> {
        let mut inner = self.inner.lock();
        Self::sleep_locked(&mut inner, options)
    }

    fn sleep_locked(inner: &mut Inner, options: SleepOptions) -> GatewayResult<Update> {
        inner.require_awake()?;
        let update = match inner.engine.sleep(options) {
            Ok(update) => update,
            Err(e) => {
                inner.resync_conversation();
                return Err(e.into());
            }
        };
        inner.state = SessionState::Initialized;
        log::info!("Asleep after dreamstate update {}", update.update_id);
        Ok(update)
    }

    /// Final flush for shutdown. Waits at most `timeout` for the lock.
    ///
    /// `None` when the lock could not be taken in time, `Some(Ok(None))`
    /// when there was nothing to flush.
    pub fn sleep_if_awake(&self, timeout: Duration) -> Option<GatewayResult<Option<Update>>> {
        let mut inner = self.inner.try_lock_for(timeout)?;
        if !inner.state.is_awake() {
            return Some(Ok(None));
        }
        Some(Self::sleep_locked(&mut inner, SleepOptions::default()).map(Some))
    }

    // ========================================================================
    // READ PATHS
    // ========================================================================

    /// Legal in any state
    pub fn search_memories(&self, query: &str, tags: &[String], options: SearchOptions) -> GatewayResult<Vec<Memory>> {
        let inner = self.inner.lock();
        Ok(inner.engine.search_memories(query, tags, options)?)
    }

    pub fn awakening_prompt(&self) -> GatewayResult<String> {
        let inner = self.inner.lock();
        inner.require_awake()?;
        Ok(inner.engine.get_awakening_prompt()?)
    }

    pub fn persona(&self) -> GatewayResult<Option<Persona>> {
        Ok(self.inner.lock().engine.get_persona()?)
    }

    /// Engine status with lifecycle fields taken from this controller
    pub fn status(&self) -> GatewayResult<EngineStatus> {
        let inner = self.inner.lock();
        let mut status = inner.engine.get_status()?;
        status.awake = inner.state.is_awake();
        status.conversation_active = inner.state.conversation_id().is_some();
        if !status.conversation_active {
            status.current_conversation_id = None;
            status.message_count = 0;
        }
        Ok(status)
    }

    pub fn recent_memories(&self, limit: usize) -> GatewayResult<Vec<Memory>> {
        Ok(self.inner.lock().engine.get_recent_memories(limit)?)
    }

    pub fn important_memories(&self, threshold: u32, limit: usize) -> GatewayResult<Vec<Memory>> {
        Ok(self.inner.lock().engine.get_important_memories(threshold, limit)?)
    }

    pub fn recent_updates(&self, limit: usize) -> GatewayResult<Vec<Update>> {
        Ok(self.inner.lock().engine.get_recent_updates(limit)?)
    }
}

// ============================================================================
// TESTS
// ============================================================================
