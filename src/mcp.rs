// LTM Gateway - MCP Server (JSON-RPC 2.0 over stdio)
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Every request routes through this gateway.
// Resources: persona://current, status://current, memories://..., updates://...
// Tools:     ltm_initialize, ltm_awaken, ltm_record_message,
//            ltm_end_conversation, ltm_sleep, ltm_search_memories,
//            ltm_get_awakening_prompt

use crate::dispatch;
use crate::engine::TagSearch;
use crate::error::ProtocolError;
use crate::resources;
use crate::session::Session;
use crate::shutdown::ShutdownCoordinator;
use crate::tools;
use chrono::Local;
use serde_json::{json, Value};
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "ltm-gateway";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Request router shared by the stdio loop and the one-shot CLI commands
pub struct McpServer {
    session: Arc<Session>,
    tags: Arc<dyn TagSearch>,
    call_log: Option<PathBuf>,
}

impl McpServer {
    pub fn new(session: Arc<Session>, tags: Arc<dyn TagSearch>, call_log: Option<PathBuf>) -> Self {
        Self { session, tags, call_log }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// One raw input line. Blank lines and notifications produce nothing.
    pub fn handle_line(&self, line: &str) -> Option<Value> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(msg) => self.handle_request(&msg),
            Err(e) => {
                log::warn!("JSON parse error: {}", e);
                Some(error_response(&Value::Null, &ProtocolError::Parse(format!("Parse error: {}", e))))
            }
        }
    }

    /// One parsed JSON-RPC message
    pub fn handle_request(&self, msg: &Value) -> Option<Value> {
        let id = msg.get("id").cloned().unwrap_or(Value::Null);
        let method = match msg.get("method").and_then(Value::as_str) {
            Some(m) => m,
            None => {
                return Some(error_response(
                    &id,
                    &ProtocolError::InvalidRequest("Missing method".to_string()),
                ))
            }
        };
        let params = msg.get("params").cloned().unwrap_or(Value::Null);

        log::debug!("Received: {}", method);

        if method.starts_with("notifications/") {
            return None;
        }

        let result = match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "resources": {}, "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION,
                }
            })),
            "ping" => Ok(json!({})),
            "resources/list" => Ok(json!({ "resources": resources::static_resources() })),
            "resources/templates/list" => {
                Ok(json!({ "resourceTemplates": resources::resource_templates() }))
            }
            "resources/read" => self.read_resource(&params),
            "tools/list" => Ok(json!({ "tools": tools::tool_definitions() })),
            "tools/call" => self.call_tool(&params),
            _ => {
                if id.is_null() {
                    return None;
                }
                Err(ProtocolError::MethodNotFound(format!("Unknown method: {}", method)))
            }
        };

        Some(match result {
            Ok(result) => success_response(&id, result),
            Err(err) => error_response(&id, &err),
        })
    }

    /// resources/read
    pub fn read_resource(&self, params: &Value) -> Result<Value, ProtocolError> {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::InvalidParams("Missing resource uri".to_string()))?;
        let text = resources::resolve(uri, &self.session, self.tags.as_ref())?;
        Ok(resources::read_result(uri, text))
    }

    /// tools/call
    pub fn call_tool(&self, params: &Value) -> Result<Value, ProtocolError> {
        let name = params.get("name").and_then(Value::as_str).unwrap_or("");
        let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        self.cmd_log(&format!("CALL {} | {}", name, param_summary(name, &args)));

        let envelope = match dispatch::dispatch(&self.session, name, &args) {
            Ok(envelope) => envelope,
            Err(err) => {
                self.cmd_log(&format!("FAIL {} | {}", name, err));
                return Err(err);
            }
        };

        if let Some(error) = envelope.to_json().get("error").and_then(Value::as_str) {
            let snippet: String = error.chars().take(200).collect();
            self.cmd_log(&format!("FAIL {} | {}", name, snippet));
        }

        Ok(envelope.into_call_result())
    }

    /// Persistent call log, best effort
    fn cmd_log(&self, msg: &str) {
        let Some(path) = &self.call_log else { return };
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
            let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
            let _ = writeln!(f, "[{}] {}", ts, msg);
        }
    }
}

/// Summarize tool params for logging (truncate large values)
fn param_summary(name: &str, args: &Value) -> String {
    fn clip(s: &str, max: usize) -> String {
        if s.chars().count() > max {
            format!("{}…", s.chars().take(max).collect::<String>())
        } else {
            s.to_string()
        }
    }

    match name {
        "ltm_record_message" => {
            let role = args.get("role").and_then(Value::as_str).unwrap_or("?");
            let content = args.get("content").and_then(Value::as_str).unwrap_or("");
            format!("role={} content={}", role, clip(content, 150))
        }
        "ltm_search_memories" => {
            let query = args.get("query").and_then(Value::as_str).unwrap_or("");
            let tags = args.get("tags").map(Value::to_string).unwrap_or_else(|| "[]".to_string());
            format!("q={} tags={}", clip(query, 150), clip(&tags, 150))
        }
        _ => clip(&args.to_string(), 300),
    }
}

fn success_response(id: &Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

fn error_response(id: &Value, err: &ProtocolError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": err.code(), "message": err.to_string() },
    })
}

/// Write one JSON-RPC message line to stdout
fn send(response: &Value) {
    let msg = match serde_json::to_string(response) {
        Ok(m) => m,
        Err(e) => {
            log::error!("Failed to serialize response: {}", e);
            return;
        }
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let _ = out.write_all(msg.as_bytes());
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

/// Serve stdin until EOF, then run the final flush
pub fn run(server: &McpServer, shutdown: &ShutdownCoordinator) {
    log::info!("Starting {} v{}", SERVER_NAME, SERVER_VERSION);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::warn!("stdin read error: {}", e);
                continue;
            }
        };

        if let Some(response) = server.handle_line(&line) {
            send(&response);
        }
    }

    log::info!("stdin closed, shutting down");
    shutdown.flush();
}

// ============================================================================
// TESTS
// ============================================================================
