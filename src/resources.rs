// LTM Gateway - Resource URI Resolver
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Read-only, URI-addressable queries. Each scheme has a small explicit
// parser (split on '/', check segment shapes). Resource reads return raw
// JSON text with no success envelope; failures are protocol errors.
//
//   persona://current
//   status://current
//   memories://recent[/{limit}]                     limit=5
//   memories://important[/{threshold}][/{limit}]    threshold=7 limit=5
//   memories://tag/{tag}[/{limit}]                  limit=5
//   updates://recent[/{limit}]                      limit=3
//
// A numeric segment that is not a non-negative integer counts as "not
// provided" and takes its default.

use crate::engine::TagSearch;
use crate::error::{GatewayError, ProtocolError};
use crate::model::{Memory, Persona, Update};
use crate::session::Session;
use serde_json::{json, Value};

pub const MIME_JSON: &str = "application/json";

pub const DEFAULT_RECENT_LIMIT: usize = 5;
pub const DEFAULT_IMPORTANT_THRESHOLD: u32 = 7;
pub const DEFAULT_IMPORTANT_LIMIT: usize = 5;
pub const DEFAULT_TAG_LIMIT: usize = 5;
pub const DEFAULT_UPDATES_LIMIT: usize = 3;

/// Parametrized routes; any URI starting with one of these is held to its grammar
const ROUTED_PREFIXES: [&str; 4] = [
    "memories://recent",
    "memories://important",
    "memories://tag",
    "updates://recent",
];

/// A parsed resource URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRoute {
    Persona,
    Status,
    RecentMemories { limit: usize },
    ImportantMemories { threshold: u32, limit: usize },
    TaggedMemories { tag: String, limit: usize },
    RecentUpdates { limit: usize },
}

// ============================================================================
// CATALOGS
// ============================================================================

/// resources/list payload
pub fn static_resources() -> Vec<Value> {
    vec![
        json!({
            "uri": "persona://current",
            "name": "Current persona",
            "mimeType": MIME_JSON,
            "description": "Current persona with traits, values, and preferences",
        }),
        json!({
            "uri": "status://current",
            "name": "Current LTM status",
            "mimeType": MIME_JSON,
            "description": "Current status of the LTM system",
        }),
    ]
}

/// resources/templates/list payload
pub fn resource_templates() -> Vec<Value> {
    vec![
        json!({
            "uriTemplate": "memories://recent/{limit}",
            "name": "Recent memories",
            "mimeType": MIME_JSON,
            "description": "Most recent memories, optionally limited (default 5)",
        }),
        json!({
            "uriTemplate": "memories://important/{threshold}/{limit}",
            "name": "Important memories",
            "mimeType": MIME_JSON,
            "description": "Important memories with threshold (default 7) and limit (default 5)",
        }),
        json!({
            "uriTemplate": "memories://tag/{tag}/{limit}",
            "name": "Memories by tag",
            "mimeType": MIME_JSON,
            "description": "Memories with specific tag (URL-encoded), optionally limited (default 5)",
        }),
        json!({
            "uriTemplate": "updates://recent/{limit}",
            "name": "Recent persona updates",
            "mimeType": MIME_JSON,
            "description": "Most recent persona updates (default 3)",
        }),
    ]
}

// ============================================================================
// PARSING
// ============================================================================

/// Match a URI against the known grammar
pub fn parse_uri(uri: &str) -> Result<ResourceRoute, ProtocolError> {
    let not_found = || ProtocolError::NotFound(format!("Resource not found: {}", uri));
    let invalid = || ProtocolError::InvalidRequest(format!("Invalid URI format: {}", uri));

    let (scheme, path) = uri.split_once("://").ok_or_else(not_found)?;
    let mut segments = path.split('/');
    let head = segments.next().unwrap_or("");
    let params: Vec<&str> = segments.collect();

    match (scheme, head) {
        ("persona", "current") if params.is_empty() => Ok(ResourceRoute::Persona),
        ("status", "current") if params.is_empty() => Ok(ResourceRoute::Status),

        ("memories", "recent") => {
            let [limit] = optional_params::<1>(&params).ok_or_else(invalid)?;
            Ok(ResourceRoute::RecentMemories {
                limit: numeric_or(limit, DEFAULT_RECENT_LIMIT, uri),
            })
        }
        ("memories", "important") => {
            let [threshold, limit] = optional_params::<2>(&params).ok_or_else(invalid)?;
            Ok(ResourceRoute::ImportantMemories {
                threshold: numeric_or(threshold, DEFAULT_IMPORTANT_THRESHOLD, uri),
                limit: numeric_or(limit, DEFAULT_IMPORTANT_LIMIT, uri),
            })
        }
        ("memories", "tag") => {
            let (raw_tag, rest) = params.split_first().ok_or_else(invalid)?;
            if raw_tag.is_empty() {
                return Err(invalid());
            }
            let tag = percent_decode(raw_tag).ok_or_else(invalid)?;
            let [limit] = optional_params::<1>(rest).ok_or_else(invalid)?;
            Ok(ResourceRoute::TaggedMemories {
                tag,
                limit: numeric_or(limit, DEFAULT_TAG_LIMIT, uri),
            })
        }
        ("updates", "recent") => {
            let [limit] = optional_params::<1>(&params).ok_or_else(invalid)?;
            Ok(ResourceRoute::RecentUpdates {
                limit: numeric_or(limit, DEFAULT_UPDATES_LIMIT, uri),
            })
        }

        // Known route with trailing garbage in the head segment
        _ if ROUTED_PREFIXES.iter().any(|p| uri.starts_with(p)) => Err(invalid()),
        _ => Err(not_found()),
    }
}

/// Up to N optional trailing segments; more than N is a grammar violation
fn optional_params<'a, const N: usize>(params: &[&'a str]) -> Option<[Option<&'a str>; N]> {
    if params.len() > N {
        return None;
    }
    let mut out = [None; N];
    for (slot, p) in out.iter_mut().zip(params) {
        *slot = Some(*p);
    }
    Some(out)
}

/// Digits-only segment, else the default
fn numeric_or<T: std::str::FromStr + Copy>(segment: Option<&str>, default: T, uri: &str) -> T {
    let Some(seg) = segment else {
        return default;
    };
    if !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(v) = seg.parse::<T>() {
            return v;
        }
    }
    log::debug!("Ignoring non-numeric segment {:?} in {}, using default", seg, uri);
    default
}

/// decodeURIComponent-style percent decoding. None on malformed escapes or
/// invalid UTF-8.
pub fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

// ============================================================================
// PROJECTIONS
// ============================================================================

pub fn project_memory(m: &Memory) -> Value {
    json!({
        "id": m.memory_id,
        "summary": m.summary,
        "importance": m.importance,
        "when": m.timestamp,
        "tags": m.tags,
    })
}

fn project_persona(p: &Persona) -> Value {
    json!({
        "id": p.persona_id,
        "traits": p.traits,
        "values": p.values,
        "preferences": p.preferences,
        "biography": p.biography,
        "lastUpdated": p.last_updated,
    })
}

fn project_update(u: &Update) -> Value {
    json!({
        "id": u.update_id,
        "description": u.description,
        "justification": u.justification,
        "timestamp": u.timestamp,
        "changes": u.diff(),
    })
}

// ============================================================================
// RESOLUTION
// ============================================================================

fn engine_failure(err: GatewayError) -> ProtocolError {
    log::error!("Resource engine call failed: {}", err);
    ProtocolError::Internal(err.to_string())
}

fn memories_json(memories: Vec<Memory>, limit: usize) -> Value {
    Value::Array(memories.iter().take(limit).map(project_memory).collect())
}

/// Resolve a resource URI to JSON text
pub fn resolve(uri: &str, session: &Session, tags: &dyn TagSearch) -> Result<String, ProtocolError> {
    let route = parse_uri(uri)?;
    log::debug!("resources/read {} -> {:?}", uri, route);

    let value = match route {
        ResourceRoute::Persona => {
            let persona = session
                .persona()
                .map_err(engine_failure)?
                .ok_or_else(|| ProtocolError::NotFound("No persona found".to_string()))?;
            project_persona(&persona)
        }
        ResourceRoute::Status => {
            let status = session.status().map_err(engine_failure)?;
            serde_json::to_value(status).map_err(|e| ProtocolError::Internal(e.to_string()))?
        }
        ResourceRoute::RecentMemories { limit } => {
            memories_json(session.recent_memories(limit).map_err(engine_failure)?, limit)
        }
        ResourceRoute::ImportantMemories { threshold, limit } => memories_json(
            session.important_memories(threshold, limit).map_err(engine_failure)?,
            limit,
        ),
        ResourceRoute::TaggedMemories { tag, limit } => {
            let found = tags
                .search_by_tags(&[tag], limit)
                .map_err(|e| engine_failure(e.into()))?;
            memories_json(found, limit)
        }
        ResourceRoute::RecentUpdates { limit } => {
            let updates = session.recent_updates(limit).map_err(engine_failure)?;
            Value::Array(updates.iter().take(limit).map(project_update).collect())
        }
    };

    serde_json::to_string_pretty(&value).map_err(|e| ProtocolError::Internal(e.to_string()))
}

/// resources/read result
pub fn read_result(uri: &str, text: String) -> Value {
    json!({
        "contents": [{
            "uri": uri,
            "mimeType": MIME_JSON,
            "text": text,
        }]
    })
}

// ============================================================================
// TESTS
// ============================================================================
