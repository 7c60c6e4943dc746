// LTM Gateway - Memory Engine Seam
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// The gateway never stores, ranks or summarizes anything itself. Everything
// durable goes through these two traits. The bundled LMDB engine lives in
// store.rs; tests use the scripted engine in `testing`.

use crate::model::{
    AwakenOptions, AwakeningContext, Conversation, EngineStatus, Memory, Persona, SearchOptions,
    SleepOptions, Update,
};
use anyhow::Result;

/// Main engine facade. Mutating calls take `&mut self`: the session
/// controller is the only writer.
pub trait MemoryEngine: Send {
    /// Load or (re-)create persona and engine state
    fn initialize(&mut self) -> Result<Persona>;

    fn awaken(&mut self, options: AwakenOptions) -> Result<AwakeningContext>;

    fn get_persona(&self) -> Result<Option<Persona>>;

    fn get_status(&self) -> Result<EngineStatus>;

    fn get_recent_memories(&self, limit: usize) -> Result<Vec<Memory>>;

    fn get_important_memories(&self, threshold: u32, limit: usize) -> Result<Vec<Memory>>;

    /// Combined text + tag search
    fn search_memories(&self, query: &str, tags: &[String], options: SearchOptions) -> Result<Vec<Memory>>;

    fn start_conversation(&mut self, participants: &[&str]) -> Result<Conversation>;

    fn add_message(&mut self, role: &str, content: &str) -> Result<Conversation>;

    /// Convert the active conversation into exactly one memory
    fn end_conversation(&mut self) -> Result<Memory>;

    /// Dreamstate pass over recent memories, yielding exactly one update
    fn sleep(&mut self, options: SleepOptions) -> Result<Update>;

    fn get_recent_updates(&self, limit: usize) -> Result<Vec<Update>>;

    fn get_awakening_prompt(&self) -> Result<String>;
}

/// Tag lookup, independent of the engine facade (memories://tag/...)
pub trait TagSearch: Send + Sync {
    fn search_by_tags(&self, tags: &[String], limit: usize) -> Result<Vec<Memory>>;
}

// ============================================================================
// SCRIPTED ENGINE (tests only)
// ============================================================================

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::model::{FieldChange, Message};
    use anyhow::anyhow;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    /// Call counters and scripted data, shared with the test through `Arc`
    #[derive(Debug, Default)]
    pub struct FakeState {
        pub persona: Option<Persona>,
        pub memories: Vec<Memory>,
        pub updates: Vec<Update>,
        pub awake: bool,
        pub conversation: Option<Conversation>,
        pub initialize_calls: usize,
        pub awaken_calls: usize,
        pub start_calls: usize,
        pub end_calls: usize,
        pub sleep_calls: usize,
        pub fail_sleep: bool,
        /// With `fail_sleep`: drop the conversation before failing
        pub fold_before_failing: bool,
        /// Block inside search_memories, holding the session lock
        pub stall_search: Option<std::time::Duration>,
        pub last_awaken: Option<AwakenOptions>,
        pub last_sleep: Option<SleepOptions>,
        pub last_important: Option<(u32, usize)>,
        pub last_recent: Option<usize>,
        pub last_search: Option<(String, Vec<String>, usize)>,
    }

    pub struct FakeEngine {
        pub state: Arc<Mutex<FakeState>>,
    }

    pub fn memory(id: &str, importance: u8, tags: &[&str]) -> Memory {
        Memory {
            memory_id: id.to_string(),
            summary: format!("summary of {}", id),
            importance,
            timestamp: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_else(Utc::now),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn persona() -> Persona {
        let mut traits = BTreeMap::new();
        traits.insert("curiosity".to_string(), 0.7);
        Persona {
            persona_id: "persona_test".to_string(),
            traits,
            values: vec!["honesty".to_string()],
            preferences: BTreeMap::new(),
            biography: "A test persona".to_string(),
            last_updated: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_else(Utc::now),
        }
    }

    impl FakeEngine {
        /// Engine with a persona and no memories; returns the shared state handle
        pub fn new() -> (Self, Arc<Mutex<FakeState>>) {
            let state = Arc::new(Mutex::new(FakeState {
                persona: Some(persona()),
                ..Default::default()
            }));
            (Self { state: state.clone() }, state)
        }
    }

    impl MemoryEngine for FakeEngine {
        fn initialize(&mut self) -> Result<Persona> {
            let mut s = self.state.lock();
            s.initialize_calls += 1;
            s.awake = false;
            s.conversation = None;
            Ok(s.persona.clone().unwrap_or_else(persona))
        }

        fn awaken(&mut self, options: AwakenOptions) -> Result<AwakeningContext> {
            let mut s = self.state.lock();
            s.awaken_calls += 1;
            s.awake = true;
            s.last_awaken = Some(options);
            let recent_limit = options.recent_memories_limit.unwrap_or(10);
            let threshold = options.important_memories_threshold.unwrap_or(7);
            let important_limit = options.important_memories_limit.unwrap_or(5);
            Ok(AwakeningContext {
                persona: s.persona.clone().unwrap_or_else(persona),
                recent_memories: s.memories.iter().rev().take(recent_limit).cloned().collect(),
                important_memories: s
                    .memories
                    .iter()
                    .filter(|m| u32::from(m.importance) >= threshold)
                    .take(important_limit)
                    .cloned()
                    .collect(),
                awakening_time: Utc::now(),
            })
        }

        fn get_persona(&self) -> Result<Option<Persona>> {
            Ok(self.state.lock().persona.clone())
        }

        fn get_status(&self) -> Result<EngineStatus> {
            let s = self.state.lock();
            Ok(EngineStatus {
                awake: s.awake,
                persona_id: s.persona.as_ref().map(|p| p.persona_id.clone()),
                conversation_active: s.conversation.is_some(),
                current_conversation_id: s.conversation.as_ref().map(|c| c.conversation_id.clone()),
                message_count: s.conversation.as_ref().map(|c| c.messages.len()).unwrap_or(0),
                memory_count: s.memories.len() as u64,
                update_count: s.updates.len() as u64,
                last_awakened: None,
            })
        }

        fn get_recent_memories(&self, limit: usize) -> Result<Vec<Memory>> {
            let mut s = self.state.lock();
            s.last_recent = Some(limit);
            Ok(s.memories.iter().rev().take(limit).cloned().collect())
        }

        fn get_important_memories(&self, threshold: u32, limit: usize) -> Result<Vec<Memory>> {
            let mut s = self.state.lock();
            s.last_important = Some((threshold, limit));
            Ok(s.memories
                .iter()
                .filter(|m| u32::from(m.importance) >= threshold)
                .take(limit)
                .cloned()
                .collect())
        }

        fn search_memories(&self, query: &str, tags: &[String], options: SearchOptions) -> Result<Vec<Memory>> {
            let mut s = self.state.lock();
            if let Some(stall) = s.stall_search {
                std::thread::sleep(stall);
            }
            s.last_search = Some((query.to_string(), tags.to_vec(), options.limit));
            Ok(s.memories
                .iter()
                .filter(|m| {
                    (!query.is_empty() && m.summary.contains(query))
                        || m.tags.iter().any(|t| tags.contains(t))
                })
                .take(options.limit)
                .cloned()
                .collect())
        }

        fn start_conversation(&mut self, participants: &[&str]) -> Result<Conversation> {
            let mut s = self.state.lock();
            s.start_calls += 1;
            let conversation = Conversation {
                conversation_id: format!("conv_{}", s.start_calls),
                participants: participants.iter().map(|p| p.to_string()).collect(),
                messages: Vec::new(),
                started_at: Utc::now(),
            };
            s.conversation = Some(conversation.clone());
            Ok(conversation)
        }

        fn add_message(&mut self, role: &str, content: &str) -> Result<Conversation> {
            let mut s = self.state.lock();
            let conversation = s.conversation.as_mut().ok_or_else(|| anyhow!("No active conversation"))?;
            conversation.messages.push(Message {
                role: role.to_string(),
                content: content.to_string(),
                timestamp: Utc::now(),
            });
            Ok(conversation.clone())
        }

        fn end_conversation(&mut self) -> Result<Memory> {
            let mut s = self.state.lock();
            let conversation = s.conversation.take().ok_or_else(|| anyhow!("No active conversation"))?;
            s.end_calls += 1;
            let mut mem = memory(&format!("mem_{}", s.end_calls), 6, &["chat"]);
            mem.summary = format!("{} messages", conversation.messages.len());
            s.memories.push(mem.clone());
            Ok(mem)
        }

        fn sleep(&mut self, options: SleepOptions) -> Result<Update> {
            let mut s = self.state.lock();
            s.sleep_calls += 1;
            s.last_sleep = Some(options);
            if s.fail_sleep {
                if s.fold_before_failing {
                    s.conversation = None;
                }
                return Err(anyhow!("dreamstate exploded"));
            }
            s.awake = false;
            s.conversation = None;
            let mut changes = BTreeMap::new();
            changes.insert(
                "traits.curiosity".to_string(),
                FieldChange { before: serde_json::json!(0.7), after: serde_json::json!(0.8) },
            );
            let update = Update {
                update_id: format!("upd_{}", s.sleep_calls),
                description: "Dreamstate evolution".to_string(),
                justification: "Recent memories".to_string(),
                timestamp: Utc::now(),
                changes,
            };
            s.updates.push(update.clone());
            Ok(update)
        }

        fn get_recent_updates(&self, limit: usize) -> Result<Vec<Update>> {
            Ok(self.state.lock().updates.iter().rev().take(limit).cloned().collect())
        }

        fn get_awakening_prompt(&self) -> Result<String> {
            let s = self.state.lock();
            let p = s.persona.as_ref().ok_or_else(|| anyhow!("No persona"))?;
            Ok(format!("You are {}. {}", p.persona_id, p.biography))
        }
    }

    /// Tag index returning a fixed list regardless of the limit it is given
    pub struct FakeTags {
        pub results: Vec<Memory>,
        pub calls: Mutex<Vec<(Vec<String>, usize)>>,
    }

    impl FakeTags {
        pub fn new(results: Vec<Memory>) -> Self {
            Self { results, calls: Mutex::new(Vec::new()) }
        }
    }

    impl TagSearch for FakeTags {
        fn search_by_tags(&self, tags: &[String], limit: usize) -> Result<Vec<Memory>> {
            self.calls.lock().push((tags.to_vec(), limit));
            Ok(self.results.clone())
        }
    }
}
