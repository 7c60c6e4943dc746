// LTM Gateway - Tool Schema Registry
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Static declarative table of every invokable tool. tools/list is rendered
// from it and the dispatcher validates required arguments against it, so
// the advertised contract and the enforced contract are the same table.

use serde_json::{json, Map, Value};

/// Closed set of tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    Initialize,
    Awaken,
    RecordMessage,
    EndConversation,
    Sleep,
    SearchMemories,
    GetAwakeningPrompt,
}

/// Primitive input field types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    StringArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

pub struct ToolSpec {
    pub name: ToolName,
    pub description: &'static str,
    pub fields: &'static [FieldSpec],
}

const fn field(name: &'static str, kind: FieldKind, required: bool, description: &'static str) -> FieldSpec {
    FieldSpec { name, kind, required, description }
}

/// The registry. Order is the tools/list order and matches `ToolName::ALL`.
pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: ToolName::Initialize,
        description: "Initialize the LTM system",
        fields: &[],
    },
    ToolSpec {
        name: ToolName::Awaken,
        description: "Awaken the system and load persona and memories",
        fields: &[
            field("recentMemoriesLimit", FieldKind::Number, false, "Maximum number of recent memories to load"),
            field("importantMemoriesThreshold", FieldKind::Number, false, "Importance threshold for important memories (1-10)"),
            field("importantMemoriesLimit", FieldKind::Number, false, "Maximum number of important memories to load"),
        ],
    },
    ToolSpec {
        name: ToolName::RecordMessage,
        description: "Record a message in the current conversation",
        fields: &[
            field("role", FieldKind::String, true, "Role of the message sender (user or claude)"),
            field("content", FieldKind::String, true, "Content of the message"),
        ],
    },
    ToolSpec {
        name: ToolName::EndConversation,
        description: "End the current conversation and process it into a memory",
        fields: &[],
    },
    ToolSpec {
        name: ToolName::Sleep,
        description: "Put the system to sleep, triggering persona evolution",
        fields: &[
            field("recentMemoriesLimit", FieldKind::Number, false, "Number of recent memories to process for evolution"),
        ],
    },
    ToolSpec {
        name: ToolName::SearchMemories,
        description: "Search for memories based on a query or tags",
        fields: &[
            field("query", FieldKind::String, false, "Search query"),
            field("tags", FieldKind::StringArray, false, "Array of tags to search for"),
            field("limit", FieldKind::Number, false, "Maximum number of results to return"),
        ],
    },
    ToolSpec {
        name: ToolName::GetAwakeningPrompt,
        description: "Generate an awakening prompt from the current persona and memories",
        fields: &[],
    },
];

impl ToolName {
    pub const ALL: [ToolName; 7] = [
        ToolName::Initialize,
        ToolName::Awaken,
        ToolName::RecordMessage,
        ToolName::EndConversation,
        ToolName::Sleep,
        ToolName::SearchMemories,
        ToolName::GetAwakeningPrompt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::Initialize => "ltm_initialize",
            ToolName::Awaken => "ltm_awaken",
            ToolName::RecordMessage => "ltm_record_message",
            ToolName::EndConversation => "ltm_end_conversation",
            ToolName::Sleep => "ltm_sleep",
            ToolName::SearchMemories => "ltm_search_memories",
            ToolName::GetAwakeningPrompt => "ltm_get_awakening_prompt",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn spec(self) -> &'static ToolSpec {
        // TOOLS rows follow ALL order
        &TOOLS[self as usize]
    }
}

impl FieldKind {
    fn schema(self) -> Value {
        match self {
            FieldKind::String => json!({"type": "string"}),
            FieldKind::Number => json!({"type": "number"}),
            FieldKind::StringArray => json!({"type": "array", "items": {"type": "string"}}),
        }
    }
}

impl ToolSpec {
    pub fn required(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    /// MCP tool definition
    pub fn definition(&self) -> Value {
        let mut properties = Map::new();
        for f in self.fields {
            let mut schema = f.kind.schema();
            schema["description"] = Value::String(f.description.to_string());
            properties.insert(f.name.to_string(), schema);
        }
        let required: Vec<&str> = self.required().map(|f| f.name).collect();
        tool_def(self.name.as_str(), self.description, Value::Object(properties), required)
    }

    /// Names of required fields that are absent, null, or empty strings
    pub fn missing_required(&self, args: &Value) -> Vec<&'static str> {
        self.required()
            .filter(|f| match args.get(f.name) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            })
            .map(|f| f.name)
            .collect()
    }
}

/// MCP tool definition helper
fn tool_def(name: &str, description: &str, properties: Value, required: Vec<&str>) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": properties,
            "required": required,
        }
    })
}

/// tools/list payload
pub fn tool_definitions() -> Vec<Value> {
    TOOLS.iter().map(ToolSpec::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_every_tool_once() {
        assert_eq!(TOOLS.len(), ToolName::ALL.len());
        for tool in ToolName::ALL {
            assert_eq!(TOOLS.iter().filter(|s| s.name == tool).count(), 1, "{:?}", tool);
            assert_eq!(tool.spec().name, tool);
            assert_eq!(ToolName::from_name(tool.as_str()), Some(tool));
        }
        assert_eq!(ToolName::from_name("ltm_fly"), None);
    }

    #[test]
    fn definitions_match_advertised_names() {
        let names: Vec<String> = tool_definitions()
            .iter()
            .map(|d| d["name"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "ltm_initialize", "ltm_awaken", "ltm_record_message", "ltm_end_conversation",
                "ltm_sleep", "ltm_search_memories", "ltm_get_awakening_prompt",
            ]
        );
    }

    #[test]
    fn record_message_schema() {
        let def = ToolName::RecordMessage.spec().definition();
        assert_eq!(def["inputSchema"]["required"], json!(["role", "content"]));
        assert_eq!(def["inputSchema"]["properties"]["role"]["type"], "string");
        let tags = ToolName::SearchMemories.spec().definition();
        assert_eq!(tags["inputSchema"]["properties"]["tags"]["items"]["type"], "string");
        assert_eq!(tags["inputSchema"]["required"], json!([]));
    }

    #[test]
    fn missing_required_detects_absent_null_and_empty() {
        let spec = ToolName::RecordMessage.spec();
        assert_eq!(spec.missing_required(&json!({})), vec!["role", "content"]);
        assert_eq!(spec.missing_required(&json!({"role": "user", "content": null})), vec!["content"]);
        assert_eq!(spec.missing_required(&json!({"role": "", "content": "x"})), vec!["role"]);
        assert!(spec.missing_required(&json!({"role": "user", "content": "x"})).is_empty());
        assert!(ToolName::Sleep.spec().missing_required(&json!({})).is_empty());
    }
}
