// LTM Gateway - Response Envelope
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Every tool outcome leaves as {success:true, ...payload} or
// {success:false, error}. Failures also set isError on the call result so
// the caller can tell a domain failure from a protocol error.

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success(Map<String, Value>),
    Failure { error: String },
}

impl Envelope {
    /// Wrap an object payload. Non-object payloads land under "result".
    pub fn ok(payload: Value) -> Self {
        match payload {
            Value::Object(map) => Envelope::Success(map),
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                Envelope::Success(map)
            }
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Envelope::Failure { error: error.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Envelope::Failure { .. })
    }

    /// Body JSON
    pub fn to_json(&self) -> Value {
        match self {
            Envelope::Success(payload) => {
                let mut body = Map::new();
                body.insert("success".to_string(), Value::Bool(true));
                for (k, v) in payload {
                    if k != "success" {
                        body.insert(k.clone(), v.clone());
                    }
                }
                Value::Object(body)
            }
            Envelope::Failure { error } => json!({
                "success": false,
                "error": error,
            }),
        }
    }

    /// MCP tools/call result
    pub fn into_call_result(self) -> Value {
        let text = serde_json::to_string_pretty(&self.to_json()).unwrap_or_else(|_| "{}".to_string());
        let mut result = json!({
            "content": [{ "type": "text", "text": text }],
        });
        if self.is_error() {
            result["isError"] = Value::Bool(true);
        }
        result
    }
}
