// LTM Gateway - Engine Value Types
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Persona, Memory, Update and Conversation are owned by the memory engine.
// The gateway only reads them and projects them into responses.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Evolving trait/value/preference profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub persona_id: String,
    /// Trait name -> strength (0.0 - 1.0)
    pub traits: BTreeMap<String, f64>,
    pub values: Vec<String>,
    pub preferences: BTreeMap<String, String>,
    pub biography: String,
    pub last_updated: DateTime<Utc>,
}

/// Durable record derived from an ended conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub memory_id: String,
    pub summary: String,
    /// Ordinal 1-10
    pub importance: u8,
    pub timestamp: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// One field of a persona diff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub before: Value,
    pub after: Value,
}

/// Persona evolution record produced by a dreamstate pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: String,
    pub description: String,
    pub justification: String,
    pub timestamp: DateTime<Utc>,
    /// Dotted persona field path (e.g. "traits.curiosity") -> change
    pub changes: BTreeMap<String, FieldChange>,
}

impl Update {
    /// Structured diff of persona fields
    pub fn diff(&self) -> &BTreeMap<String, FieldChange> {
        &self.changes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// In-progress, not yet durable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: String,
    pub participants: Vec<String>,
    pub messages: Vec<Message>,
    pub started_at: DateTime<Utc>,
}

/// Options for `awaken`. Unset fields take engine defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwakenOptions {
    #[serde(default, deserialize_with = "whole_number")]
    pub recent_memories_limit: Option<usize>,
    #[serde(default, deserialize_with = "whole_number")]
    pub important_memories_threshold: Option<u32>,
    #[serde(default, deserialize_with = "whole_number")]
    pub important_memories_limit: Option<usize>,
}

/// Options for `sleep`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepOptions {
    #[serde(default, deserialize_with = "whole_number")]
    pub recent_memories_limit: Option<usize>,
}

/// Optional count from a JSON number. Integral floats (`3.0`) are accepted;
/// fractions and negatives are not.
pub fn whole_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let Some(n) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let whole = match (n.as_u64(), n.as_f64()) {
        (Some(u), _) => u,
        (None, Some(f)) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => f as u64,
        _ => return Err(D::Error::custom(format!("expected a non-negative whole number, got {}", n))),
    };
    T::try_from(whole)
        .map(Some)
        .map_err(|_| D::Error::custom(format!("number {} out of range", whole)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { limit: 5 }
    }
}

/// What `awaken` loaded
#[derive(Debug, Clone, PartialEq)]
pub struct AwakeningContext {
    pub persona: Persona,
    pub recent_memories: Vec<Memory>,
    pub important_memories: Vec<Memory>,
    pub awakening_time: DateTime<Utc>,
}

/// Engine status snapshot (status://current)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub awake: bool,
    pub persona_id: Option<String>,
    pub conversation_active: bool,
    pub current_conversation_id: Option<String>,
    pub message_count: usize,
    pub memory_count: u64,
    pub update_count: u64,
    pub last_awakened: Option<DateTime<Utc>>,
}
