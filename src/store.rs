// LTM Gateway - LMDB Memory Engine
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Bundled reference engine so the gateway runs standalone. Persona, memories
// and persona updates persist to LMDB; the in-progress conversation and the
// awake flag live in RAM. Summaries, importance and dreamstate evolution are
// simple heuristics.
//
// Database: LTM
// Storage: <data_dir>/STORE/LTM.DB/

use crate::config::AwakenDefaults;
use crate::engine::{MemoryEngine, TagSearch};
use crate::model::{
    AwakenOptions, AwakeningContext, Conversation, EngineStatus, FieldChange, Memory, Message,
    Persona, SearchOptions, SleepOptions, Update,
};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use heed::types::*;
use heed::{Database, Env, EnvOpenOptions};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const PERSONA_KEY: &str = "current";
const SUMMARY_MAX_CHARS: usize = 120;
const MAX_TAGS: usize = 3;

const SALIENT_WORDS: &[&str] = &[
    "important", "remember", "critical", "urgent", "never", "always",
    "decided", "promise", "deadline", "love", "hate",
];

const STOPWORDS: &[&str] = &[
    "about", "after", "again", "being", "could", "every", "first", "their",
    "there", "these", "thing", "think", "those", "where", "which", "while",
    "would", "should", "really", "because", "before", "other", "still",
];

/// LMDB storage for persona, memories and updates
#[derive(Clone)]
pub struct LtmStore {
    env: Env,
    /// "current" -> Persona
    persona: Database<Str, SerdeJson<Persona>>,
    /// memory_id -> Memory
    memories: Database<Str, SerdeJson<Memory>>,
    /// update_id -> Update
    updates: Database<Str, SerdeJson<Update>>,
    /// tag -> list of memory IDs (JSON array)
    tags: Database<Str, Str>,
    /// "seq:<kind>" -> last issued sequence number
    meta: Database<Str, Str>,
}

impl LtmStore {
    /// Open or create LMDB at the given path
    pub fn open(path: &Path, map_size: usize) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(8)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let persona = env.create_database(&mut wtxn, Some("persona"))?;
        let memories = env.create_database(&mut wtxn, Some("memories"))?;
        let updates = env.create_database(&mut wtxn, Some("updates"))?;
        let tags = env.create_database(&mut wtxn, Some("tags"))?;
        let meta = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        log::info!("LTM LMDB opened at {:?}", path);
        Ok(Self { env, persona, memories, updates, tags, meta })
    }

    // ========================================================================
    // PERSONA
    // ========================================================================

    pub fn load_persona(&self) -> Result<Option<Persona>> {
        let rtxn = self.env.read_txn()?;
        Ok(self.persona.get(&rtxn, PERSONA_KEY)?)
    }

    pub fn save_persona(&self, persona: &Persona) -> Result<()> {
        let mut wtxn = self.env.write_txn()?;
        self.persona.put(&mut wtxn, PERSONA_KEY, persona)?;
        wtxn.commit()?;
        Ok(())
    }

    // ========================================================================
    // IDS
    // ========================================================================

    /// Issue the next persistent ID for a record kind ("mem", "upd", "conv")
    pub fn next_id(&self, kind: &str) -> Result<String> {
        let key = format!("seq:{}", kind);
        let mut wtxn = self.env.write_txn()?;
        let last: u64 = match self.meta.get(&wtxn, &key)? {
            Some(v) => v.parse()?,
            None => 0,
        };
        let next = last + 1;
        self.meta.put(&mut wtxn, &key, &next.to_string())?;
        wtxn.commit()?;
        Ok(format!("{}_{:08}", kind, next))
    }

    // ========================================================================
    // MEMORIES + TAG INDEX
    // ========================================================================

    /// Store a memory and index its tags in one transaction
    pub fn put_memory(&self, memory: &Memory) -> Result<()> {
        let mut wtxn = self.env.write_txn()?;
        self.memories.put(&mut wtxn, &memory.memory_id, memory)?;

        for tag in &memory.tags {
            let key = tag.to_lowercase();
            let mut ids: Vec<String> = match self.tags.get(&wtxn, &key)? {
                Some(json) => serde_json::from_str(json)?,
                None => Vec::new(),
            };
            if !ids.contains(&memory.memory_id) {
                ids.push(memory.memory_id.clone());
                let json = serde_json::to_string(&ids)?;
                self.tags.put(&mut wtxn, &key, &json)?;
            }
        }

        wtxn.commit()?;
        Ok(())
    }

    pub fn get_memory(&self, id: &str) -> Result<Option<Memory>> {
        let rtxn = self.env.read_txn()?;
        Ok(self.memories.get(&rtxn, id)?)
    }

    /// All memories, newest first
    pub fn memories_newest_first(&self) -> Result<Vec<Memory>> {
        let rtxn = self.env.read_txn()?;
        let mut all = Vec::new();
        for result in self.memories.iter(&rtxn)? {
            let (_, memory) = result?;
            all.push(memory);
        }
        all.sort_by(|a, b| {
            b.timestamp.cmp(&a.timestamp).then_with(|| b.memory_id.cmp(&a.memory_id))
        });
        Ok(all)
    }

    pub fn memory_count(&self) -> Result<u64> {
        let rtxn = self.env.read_txn()?;
        Ok(self.memories.len(&rtxn)?)
    }

    /// Memories carrying any of `tags`, most important first
    pub fn memories_by_tags(&self, tags: &[String], limit: usize) -> Result<Vec<Memory>> {
        let rtxn = self.env.read_txn()?;
        let mut seen = Vec::new();
        let mut found = Vec::new();

        for tag in tags {
            let ids: Vec<String> = match self.tags.get(&rtxn, &tag.to_lowercase())? {
                Some(json) => serde_json::from_str(json)?,
                None => continue,
            };
            for id in ids {
                if seen.contains(&id) {
                    continue;
                }
                if let Some(memory) = self.memories.get(&rtxn, &id)? {
                    found.push(memory);
                }
                seen.push(id);
            }
        }

        rank_by_importance(&mut found);
        found.truncate(limit);
        Ok(found)
    }

    // ========================================================================
    // UPDATES
    // ========================================================================

    pub fn put_update(&self, update: &Update) -> Result<()> {
        let mut wtxn = self.env.write_txn()?;
        self.updates.put(&mut wtxn, &update.update_id, update)?;
        wtxn.commit()?;
        Ok(())
    }

    /// All updates, newest first
    pub fn updates_newest_first(&self) -> Result<Vec<Update>> {
        let rtxn = self.env.read_txn()?;
        let mut all = Vec::new();
        for result in self.updates.iter(&rtxn)? {
            let (_, update) = result?;
            all.push(update);
        }
        all.sort_by(|a, b| {
            b.timestamp.cmp(&a.timestamp).then_with(|| b.update_id.cmp(&a.update_id))
        });
        Ok(all)
    }

    pub fn update_count(&self) -> Result<u64> {
        let rtxn = self.env.read_txn()?;
        Ok(self.updates.len(&rtxn)?)
    }
}

impl TagSearch for LtmStore {
    fn search_by_tags(&self, tags: &[String], limit: usize) -> Result<Vec<Memory>> {
        self.memories_by_tags(tags, limit)
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// LMDB-backed memory engine
pub struct LtmEngine {
    store: LtmStore,
    defaults: AwakenDefaults,
    sleep_recent_limit: usize,
    awake: bool,
    last_awakened: Option<DateTime<Utc>>,
    conversation: Option<Conversation>,
}

impl LtmEngine {
    pub fn new(store: LtmStore, defaults: AwakenDefaults, sleep_recent_limit: usize) -> Self {
        Self {
            store,
            defaults,
            sleep_recent_limit,
            awake: false,
            last_awakened: None,
            conversation: None,
        }
    }

    /// Shared handle for tag lookups
    pub fn store(&self) -> &LtmStore {
        &self.store
    }

    fn persona_or_seed(&self) -> Result<Persona> {
        match self.store.load_persona()? {
            Some(p) => Ok(p),
            None => {
                let persona = default_persona();
                self.store.save_persona(&persona)?;
                log::info!("Seeded default persona {}", persona.persona_id);
                Ok(persona)
            }
        }
    }
}

impl MemoryEngine for LtmEngine {
    fn initialize(&mut self) -> Result<Persona> {
        if let Some(conv) = self.conversation.take() {
            log::warn!(
                "initialize discarded conversation {} ({} messages)",
                conv.conversation_id,
                conv.messages.len()
            );
        }
        self.awake = false;
        self.persona_or_seed()
    }

    fn awaken(&mut self, options: AwakenOptions) -> Result<AwakeningContext> {
        let persona = self.persona_or_seed()?;
        let recent_limit = options.recent_memories_limit.unwrap_or(self.defaults.recent_memories_limit);
        let threshold = options
            .important_memories_threshold
            .unwrap_or(self.defaults.important_memories_threshold);
        let important_limit = options
            .important_memories_limit
            .unwrap_or(self.defaults.important_memories_limit);

        let recent_memories = self.get_recent_memories(recent_limit)?;
        let important_memories = self.get_important_memories(threshold, important_limit)?;
        let now = Utc::now();

        self.awake = true;
        self.last_awakened = Some(now);

        Ok(AwakeningContext {
            persona,
            recent_memories,
            important_memories,
            awakening_time: now,
        })
    }

    fn get_persona(&self) -> Result<Option<Persona>> {
        self.store.load_persona()
    }

    fn get_status(&self) -> Result<EngineStatus> {
        Ok(EngineStatus {
            awake: self.awake,
            persona_id: self.store.load_persona()?.map(|p| p.persona_id),
            conversation_active: self.conversation.is_some(),
            current_conversation_id: self.conversation.as_ref().map(|c| c.conversation_id.clone()),
            message_count: self.conversation.as_ref().map(|c| c.messages.len()).unwrap_or(0),
            memory_count: self.store.memory_count()?,
            update_count: self.store.update_count()?,
            last_awakened: self.last_awakened,
        })
    }

    fn get_recent_memories(&self, limit: usize) -> Result<Vec<Memory>> {
        let mut all = self.store.memories_newest_first()?;
        all.truncate(limit);
        Ok(all)
    }

    fn get_important_memories(&self, threshold: u32, limit: usize) -> Result<Vec<Memory>> {
        let mut important: Vec<Memory> = self
            .store
            .memories_newest_first()?
            .into_iter()
            .filter(|m| u32::from(m.importance) >= threshold)
            .collect();
        rank_by_importance(&mut important);
        important.truncate(limit);
        Ok(important)
    }

    fn search_memories(&self, query: &str, tags: &[String], options: SearchOptions) -> Result<Vec<Memory>> {
        let needle = query.trim().to_lowercase();
        let wanted: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();

        let mut matches: Vec<Memory> = self
            .store
            .memories_newest_first()?
            .into_iter()
            .filter(|m| {
                if needle.is_empty() && wanted.is_empty() {
                    return true;
                }
                let text_hit = !needle.is_empty() && m.summary.to_lowercase().contains(&needle);
                let tag_hit = m.tags.iter().any(|t| wanted.contains(&t.to_lowercase()));
                text_hit || tag_hit
            })
            .collect();

        rank_by_importance(&mut matches);
        matches.truncate(options.limit);
        Ok(matches)
    }

    fn start_conversation(&mut self, participants: &[&str]) -> Result<Conversation> {
        if let Some(prev) = &self.conversation {
            log::warn!("start_conversation replaced active conversation {}", prev.conversation_id);
        }
        let conversation = Conversation {
            conversation_id: self.store.next_id("conv")?,
            participants: participants.iter().map(|p| p.to_string()).collect(),
            messages: Vec::new(),
            started_at: Utc::now(),
        };
        self.conversation = Some(conversation.clone());
        Ok(conversation)
    }

    fn add_message(&mut self, role: &str, content: &str) -> Result<Conversation> {
        let conversation = self
            .conversation
            .as_mut()
            .ok_or_else(|| anyhow!("No active conversation"))?;
        conversation.messages.push(Message {
            role: role.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        });
        Ok(conversation.clone())
    }

    fn end_conversation(&mut self) -> Result<Memory> {
        let conversation = self
            .conversation
            .as_ref()
            .ok_or_else(|| anyhow!("No active conversation to end"))?;

        let memory = Memory {
            memory_id: self.store.next_id("mem")?,
            summary: summarize(conversation),
            importance: score_importance(conversation),
            timestamp: Utc::now(),
            tags: extract_tags(conversation),
        };
        self.store.put_memory(&memory)?;
        self.conversation = None;
        Ok(memory)
    }

    fn sleep(&mut self, options: SleepOptions) -> Result<Update> {
        if self.conversation.is_some() {
            let folded = self.end_conversation()?;
            log::info!("sleep folded active conversation into {}", folded.memory_id);
        }

        let limit = options.recent_memories_limit.unwrap_or(self.sleep_recent_limit);
        let recent = self.get_recent_memories(limit)?;
        let mut persona = self.persona_or_seed()?;
        let now = Utc::now();

        let (changes, justification) = evolve(&mut persona, &recent);
        persona.last_updated = now;
        self.store.save_persona(&persona)?;

        let update = Update {
            update_id: self.store.next_id("upd")?,
            description: format!("Dreamstate evolution over {} recent memories", recent.len()),
            justification,
            timestamp: now,
            changes,
        };
        self.store.put_update(&update)?;

        self.awake = false;
        Ok(update)
    }

    fn get_recent_updates(&self, limit: usize) -> Result<Vec<Update>> {
        let mut all = self.store.updates_newest_first()?;
        all.truncate(limit);
        Ok(all)
    }

    fn get_awakening_prompt(&self) -> Result<String> {
        let persona = self.persona_or_seed()?;
        let recent = self.get_recent_memories(self.defaults.recent_memories_limit)?;
        let important = self.get_important_memories(
            self.defaults.important_memories_threshold,
            self.defaults.important_memories_limit,
        )?;
        Ok(render_prompt(&persona, &recent, &important))
    }
}

// ============================================================================
// HEURISTICS
// ============================================================================

fn default_persona() -> Persona {
    let mut traits = BTreeMap::new();
    traits.insert("curiosity".to_string(), 0.7);
    traits.insert("empathy".to_string(), 0.6);
    traits.insert("precision".to_string(), 0.6);
    let mut preferences = BTreeMap::new();
    preferences.insert("communication".to_string(), "clear and direct".to_string());
    Persona {
        persona_id: "persona_default".to_string(),
        traits,
        values: vec!["honesty".to_string(), "helpfulness".to_string(), "growth".to_string()],
        preferences,
        biography: "An assistant with persistent long-term memory.".to_string(),
        last_updated: Utc::now(),
    }
}

/// Importance desc, then newest first
fn rank_by_importance(memories: &mut [Memory]) {
    memories.sort_by(|a, b| {
        b.importance
            .cmp(&a.importance)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });
}

fn summarize(conversation: &Conversation) -> String {
    let opening = conversation
        .messages
        .iter()
        .find(|m| m.role == "user")
        .or_else(|| conversation.messages.first());

    match opening {
        None => "Empty conversation".to_string(),
        Some(m) => {
            let text: String = m.content.split_whitespace().collect::<Vec<_>>().join(" ");
            let clipped: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
            let ellipsis = if text.chars().count() > SUMMARY_MAX_CHARS { "…" } else { "" };
            format!("{} messages: {}{}", conversation.messages.len(), clipped, ellipsis)
        }
    }
}

fn score_importance(conversation: &Conversation) -> u8 {
    let length_score = (conversation.messages.len() / 2).min(3);
    let salience = conversation
        .messages
        .iter()
        .flat_map(|m| words(&m.content))
        .filter(|w| SALIENT_WORDS.contains(&w.as_str()))
        .count()
        .min(4);
    (3 + length_score + salience).clamp(1, 10) as u8
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn extract_tags(conversation: &Conversation) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for w in conversation.messages.iter().flat_map(|m| words(&m.content)) {
        if w.chars().count() >= 5 && !STOPWORDS.contains(&w.as_str()) {
            *counts.entry(w).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let tags: Vec<String> = ranked.into_iter().take(MAX_TAGS).map(|(w, _)| w).collect();
    if tags.is_empty() {
        vec!["conversation".to_string()]
    } else {
        tags
    }
}

/// Dreamstate: recurring tags in recent memories strengthen matching traits
fn evolve(persona: &mut Persona, recent: &[Memory]) -> (BTreeMap<String, FieldChange>, String) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for memory in recent {
        for tag in &memory.tags {
            *counts.entry(tag.as_str()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(MAX_TAGS);

    let mut changes = BTreeMap::new();
    for (tag, count) in &ranked {
        let before = persona.traits.get(*tag).copied();
        let base = before.unwrap_or(0.5);
        let after = round2((base + 0.05 * *count as f64).min(1.0));
        if before != Some(after) {
            persona.traits.insert(tag.to_string(), after);
            changes.insert(
                format!("traits.{}", tag),
                FieldChange { before: json!(before), after: json!(after) },
            );
        }
    }

    let justification = if ranked.is_empty() {
        "No recent memories to reflect on; persona unchanged".to_string()
    } else {
        let themes: Vec<String> = ranked.iter().map(|(t, c)| format!("{} (x{})", t, c)).collect();
        format!("Recurring themes in recent memories: {}", themes.join(", "))
    };

    (changes, justification)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn render_prompt(persona: &Persona, recent: &[Memory], important: &[Memory]) -> String {
    let mut out = String::new();
    out.push_str("You are awakening with persistent long-term memory.\n\n");
    out.push_str(&format!("Persona: {}\n", persona.persona_id));
    out.push_str(&format!("Biography: {}\n", persona.biography));

    let traits: Vec<String> = persona
        .traits
        .iter()
        .map(|(k, v)| format!("{} ({:.2})", k, v))
        .collect();
    out.push_str(&format!("Traits: {}\n", traits.join(", ")));
    out.push_str(&format!("Values: {}\n", persona.values.join(", ")));
    for (k, v) in &persona.preferences {
        out.push_str(&format!("Preference {}: {}\n", k, v));
    }

    for (title, memories) in [("Recent memories", recent), ("Important memories", important)] {
        out.push_str(&format!("\n{}:\n", title));
        if memories.is_empty() {
            out.push_str("- (none)\n");
        }
        for m in memories {
            out.push_str(&format!(
                "- [{}] {} (importance {}; tags: {})\n",
                m.timestamp.format("%Y-%m-%d %H:%M UTC"),
                m.summary,
                m.importance,
                m.tags.join(", ")
            ));
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MAP_SIZE: usize = 10 * 1024 * 1024;

    fn engine(dir: &Path) -> Result<LtmEngine> {
        let store = LtmStore::open(dir, MAP_SIZE)?;
        Ok(LtmEngine::new(store, AwakenDefaults::default(), 10))
    }

    fn conversation(messages: &[(&str, &str)]) -> Conversation {
        Conversation {
            conversation_id: "conv_test".to_string(),
            participants: vec!["user".to_string(), "claude".to_string()],
            messages: messages
                .iter()
                .map(|(r, c)| Message {
                    role: r.to_string(),
                    content: c.to_string(),
                    timestamp: Utc::now(),
                })
                .collect(),
            started_at: Utc::now(),
        }
    }

    #[test]
    fn summary_uses_opening_user_message() {
        let conv = conversation(&[("claude", "hello"), ("user", "Plan the   garden layout")]);
        assert_eq!(summarize(&conv), "2 messages: Plan the garden layout");
        assert_eq!(summarize(&conversation(&[])), "Empty conversation");
    }

    #[test]
    fn importance_bounds() {
        let plain = conversation(&[("user", "hi")]);
        assert_eq!(score_importance(&plain), 3);
        let salient = conversation(&[
            ("user", "This is important, remember it, it is critical and urgent"),
            ("claude", "I will always remember"),
            ("user", "a"), ("user", "b"), ("user", "c"), ("user", "d"), ("user", "e"),
        ]);
        assert_eq!(score_importance(&salient), 10);
    }

    #[test]
    fn tags_from_frequent_words() {
        let conv = conversation(&[
            ("user", "garden garden tomato"),
            ("claude", "tomato garden compost"),
        ]);
        assert_eq!(extract_tags(&conv), vec!["garden", "tomato", "compost"]);
        assert_eq!(extract_tags(&conversation(&[("user", "hi")])), vec!["conversation"]);
    }

    #[test]
    fn evolve_strengthens_traits() {
        let mut persona = default_persona();
        let mem = Memory {
            memory_id: "mem_1".into(),
            summary: "s".into(),
            importance: 5,
            timestamp: Utc::now(),
            tags: vec!["curiosity".into(), "garden".into()],
        };
        let (changes, justification) = evolve(&mut persona, &[mem.clone(), mem]);
        assert_eq!(persona.traits.get("curiosity"), Some(&0.8));
        assert_eq!(persona.traits.get("garden"), Some(&0.6));
        assert_eq!(changes["traits.garden"].before, serde_json::Value::Null);
        assert!(justification.contains("curiosity (x2)"));

        let (none, why) = evolve(&mut persona, &[]);
        assert!(none.is_empty());
        assert!(why.contains("unchanged"));
    }

    #[test]
    fn ids_are_sequential() -> Result<()> {
        let dir = tempdir()?;
        let store = LtmStore::open(dir.path(), MAP_SIZE)?;
        assert_eq!(store.next_id("mem")?, "mem_00000001");
        assert_eq!(store.next_id("mem")?, "mem_00000002");
        assert_eq!(store.next_id("upd")?, "upd_00000001");
        Ok(())
    }

    #[test]
    fn full_lifecycle() -> Result<()> {
        let dir = tempdir()?;
        let mut engine = engine(dir.path())?;

        let persona = engine.initialize()?;
        assert_eq!(persona.persona_id, "persona_default");
        assert!(!engine.get_status()?.awake);

        let ctx = engine.awaken(AwakenOptions::default())?;
        assert!(ctx.recent_memories.is_empty());
        assert!(engine.get_status()?.awake);

        engine.start_conversation(&["user", "claude"])?;
        engine.add_message("user", "Remember the garden deadline, it is important")?;
        let conv = engine.add_message("claude", "Noted the garden deadline")?;
        assert_eq!(conv.messages.len(), 2);

        let memory = engine.end_conversation()?;
        assert!(memory.tags.contains(&"garden".to_string()));
        assert!(memory.importance >= 5);
        assert!(engine.end_conversation().is_err());

        let found = engine.search_memories("GARDEN", &[], SearchOptions { limit: 5 })?;
        assert_eq!(found.len(), 1);
        let by_tag = engine.store().search_by_tags(&["Garden".to_string()], 5)?;
        assert_eq!(by_tag[0].memory_id, memory.memory_id);

        let prompt = engine.get_awakening_prompt()?;
        assert!(prompt.contains("persona_default"));
        assert!(prompt.contains(&memory.summary));

        let update = engine.sleep(SleepOptions::default())?;
        assert!(update.changes.contains_key("traits.garden"));
        let status = engine.get_status()?;
        assert!(!status.awake);
        assert_eq!(status.memory_count, 1);
        assert_eq!(status.update_count, 1);
        assert_eq!(engine.get_recent_updates(3)?[0].update_id, update.update_id);
        Ok(())
    }

    #[test]
    fn sleep_folds_active_conversation() -> Result<()> {
        let dir = tempdir()?;
        let mut engine = engine(dir.path())?;
        engine.initialize()?;
        engine.awaken(AwakenOptions::default())?;
        engine.start_conversation(&["user", "claude"])?;
        engine.add_message("user", "unfinished thought")?;
        engine.sleep(SleepOptions { recent_memories_limit: Some(5) })?;
        assert_eq!(engine.get_status()?.memory_count, 1);
        assert!(!engine.get_status()?.conversation_active);
        Ok(())
    }

    #[test]
    fn important_threshold_and_ranking() -> Result<()> {
        let dir = tempdir()?;
        let engine = engine(dir.path())?;
        for (i, importance) in [4u8, 9, 7].iter().enumerate() {
            engine.store().put_memory(&Memory {
                memory_id: format!("mem_{}", i),
                summary: format!("m{}", i),
                importance: *importance,
                timestamp: Utc::now(),
                tags: vec!["x".into()],
            })?;
        }
        let important = engine.get_important_memories(7, 5)?;
        let ids: Vec<&str> = important.iter().map(|m| m.memory_id.as_str()).collect();
        assert_eq!(ids, vec!["mem_1", "mem_2"]);
        assert_eq!(engine.get_important_memories(7, 1)?.len(), 1);
        assert_eq!(engine.get_recent_memories(2)?.len(), 2);
        Ok(())
    }

    #[test]
    fn persona_survives_reopen() -> Result<()> {
        let dir = tempdir()?;
        {
            let mut engine = engine(dir.path())?;
            engine.initialize()?;
            engine.awaken(AwakenOptions::default())?;
            engine.start_conversation(&["user", "claude"])?;
            engine.add_message("user", "tomato tomato tomato")?;
            engine.end_conversation()?;
            engine.sleep(SleepOptions::default())?;
        }
        let engine = engine(dir.path())?;
        let persona = engine.get_persona()?.ok_or_else(|| anyhow!("persona missing"))?;
        assert!(persona.traits.contains_key("tomato"));
        assert_eq!(engine.get_status()?.memory_count, 1);
        Ok(())
    }
}
