// LTM Gateway - Tool Dispatcher
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// tools/call lands here. Unknown tool names are the only protocol-level
// failure. Everything else (missing arguments, lifecycle preconditions,
// engine errors) is logged and returned as a success:false envelope.

use crate::envelope::Envelope;
use crate::error::{GatewayError, GatewayResult, ProtocolError};
use crate::model::{whole_number, AwakenOptions, SearchOptions, SleepOptions};
use crate::resources::project_memory;
use crate::session::Session;
use crate::tools::ToolName;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct RecordMessageArgs {
    role: String,
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct SearchArgs {
    #[serde(default)]
    query: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default, deserialize_with = "whole_number")]
    limit: Option<usize>,
}

/// Route one tool call. Never lets a domain error escape.
pub fn dispatch(session: &Session, name: &str, args: &Value) -> Result<Envelope, ProtocolError> {
    let tool = ToolName::from_name(name)
        .ok_or_else(|| ProtocolError::MethodNotFound(format!("Unknown tool: {}", name)))?;

    Ok(match execute(session, tool, args) {
        Ok(payload) => Envelope::ok(payload),
        Err(err) => {
            log::warn!("Error executing tool {}: [{}] {}", name, err.kind(), err);
            Envelope::failure(err.to_string())
        }
    })
}

fn parse_args<T: DeserializeOwned>(args: &Value) -> GatewayResult<T> {
    let args = if args.is_null() { json!({}) } else { args.clone() };
    serde_json::from_value(args)
        .map_err(|e| GatewayError::InvalidArgument(format!("Invalid arguments: {}", e)))
}

fn execute(session: &Session, tool: ToolName, args: &Value) -> GatewayResult<Value> {
    let missing = tool.spec().missing_required(args);
    if !missing.is_empty() {
        return Err(GatewayError::InvalidArgument(format!(
            "Missing required argument(s): {}",
            missing.join(", ")
        )));
    }

    match tool {
        ToolName::Initialize => {
            let persona = session.initialize()?;
            Ok(json!({
                "message": "LTM system initialized successfully",
                "personaId": persona.persona_id,
            }))
        }

        ToolName::Awaken => {
            let options: AwakenOptions = parse_args(args)?;
            let context = session.awaken(options)?;
            Ok(json!({
                "message": "System awakened successfully",
                "context": {
                    "personaId": context.persona.persona_id,
                    "recentMemoriesCount": context.recent_memories.len(),
                    "importantMemoriesCount": context.important_memories.len(),
                    "awakeningTime": context.awakening_time,
                },
            }))
        }

        ToolName::RecordMessage => {
            let RecordMessageArgs { role, content } = parse_args(args)?;
            let recorded = session.record_message(&role, &content)?;
            Ok(json!({
                "message": "Message recorded successfully",
                "conversationId": recorded.conversation_id,
                "messageCount": recorded.message_count,
                "conversationStarted": recorded.conversation_started,
            }))
        }

        ToolName::EndConversation => {
            let memory = session.end_conversation()?;
            Ok(json!({
                "message": "Conversation ended and processed into memory",
                "memoryId": memory.memory_id,
                "summary": memory.summary,
                "importance": memory.importance,
                "tags": memory.tags,
            }))
        }

        ToolName::Sleep => {
            let options: SleepOptions = parse_args(args)?;
            let update = session.sleep(options)?;
            Ok(json!({
                "message": "System entered sleep state with dreamstate processing",
                "updateId": update.update_id,
                "description": update.description,
                "justification": update.justification,
            }))
        }

        ToolName::SearchMemories => {
            let search: SearchArgs = parse_args(args)?;
            let options = search.limit.map(|limit| SearchOptions { limit }).unwrap_or_default();
            let memories = session.search_memories(&search.query, &search.tags, options)?;
            let projected: Vec<Value> = memories.iter().take(options.limit).map(project_memory).collect();
            Ok(json!({
                "count": projected.len(),
                "memories": projected,
            }))
        }

        ToolName::GetAwakeningPrompt => {
            let prompt = session.awakening_prompt()?;
            Ok(json!({ "prompt": prompt }))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
