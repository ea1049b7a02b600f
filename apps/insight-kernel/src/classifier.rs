// [[RARO]]/apps/insight-kernel/src/classifier.rs
// Purpose: Projects raw run events onto UI-ready cards.
// Architecture: Domain Logic Layer
// Dependencies: Serde

use serde::Serialize;
use serde_json::{Map, Value};

use crate::events::{EventPayload, RunEvent, Severity};

const UNKNOWN_TOOL: &str = "Unknown Tool";
const PENDING: &str = "pending";
const DEFAULT_ACTIVITY: &str = "thinking";
const UNKNOWN_LLM: &str = "unknown";

/// The classified projection of one [`RunEvent`].
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MappedEvent {
    pub id: String,
    #[serde(flatten)]
    pub card: Card,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum Card {
    Activity(ActivityCard),
    ToolCall(ToolCallCard),
    ToolResult(ToolResultCard),
    LlmCall(LlmCallCard),
    TaskOutput(TaskOutputCard),
    TaskState(TaskStateCard),
    System(SystemCard),
}

impl Card {
    pub fn card_type(&self) -> &'static str {
        match self {
            Card::Activity(_) => "activity",
            Card::ToolCall(_) => "tool_call",
            Card::ToolResult(_) => "tool_result",
            Card::LlmCall(_) => "llm_call",
            Card::TaskOutput(_) => "task_output",
            Card::TaskState(_) => "task_state",
            Card::System(_) => "system",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCard {
    pub activity_type: String,
    pub message: String,
    pub details: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallCard {
    pub tool_name: String,
    pub status: String,
    pub input_data: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultCard {
    pub tool_name: String,
    pub status: String,
    pub output_data: Value,
    pub duration_ms: Option<u64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LlmCallCard {
    pub provider: String,
    pub model: String,
    pub status: String,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    pub duration_ms: Option<u64>,
    pub prompt_preview: Option<String>,
    pub response_preview: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutputCard {
    pub raw_preview: String,
    pub validation_passed: Option<bool>,
    pub pydantic_dump: Option<Value>,
    pub diagnostics: OutputDiagnostics,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutputDiagnostics {
    pub output_mode: Option<String>,
    pub schema_key: Option<String>,
    pub citation_count: u64,
    pub degraded: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStateCard {
    pub status: String,
    pub error: Option<String>,
    pub total_duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemCard {
    pub message: String,
    pub details: Value,
}

/// Classifies a single event. Returns `None` for event kinds this engine
/// does not recognise; never fails on malformed payloads.
pub fn classify_event(event: &RunEvent) -> Option<MappedEvent> {
    let card = match event.payload_view() {
        EventPayload::Activity(a) => Card::Activity(ActivityCard {
            activity_type: a.activity_type.unwrap_or(DEFAULT_ACTIVITY).to_string(),
            message: owned_or_empty(a.message),
            details: a.details.cloned().unwrap_or_else(empty_object),
        }),
        EventPayload::ToolCall(t) => Card::ToolCall(ToolCallCard {
            tool_name: t.tool_name.unwrap_or(UNKNOWN_TOOL).to_string(),
            status: t.status.unwrap_or(PENDING).to_string(),
            input_data: t.input_data.cloned().unwrap_or_else(empty_object),
        }),
        EventPayload::ToolResult(t) => Card::ToolResult(ToolResultCard {
            tool_name: t.tool_name.unwrap_or(UNKNOWN_TOOL).to_string(),
            status: t.status.unwrap_or(PENDING).to_string(),
            output_data: t.output_data.cloned().unwrap_or(Value::Null),
            duration_ms: t.duration_ms,
            error_message: t.error_message.map(str::to_string),
        }),
        EventPayload::LlmCall(l) => Card::LlmCall(LlmCallCard {
            provider: l.llm_provider.unwrap_or(UNKNOWN_LLM).to_string(),
            model: l.model_name.unwrap_or(UNKNOWN_LLM).to_string(),
            status: l.status.unwrap_or(PENDING).to_string(),
            prompt_tokens: l.prompt_tokens,
            completion_tokens: l.completion_tokens,
            total_tokens: l.total_tokens,
            duration_ms: l.duration_ms,
            prompt_preview: l.prompt_preview.map(str::to_string),
            response_preview: l.response_preview.map(str::to_string),
            error_message: l.error_message.map(str::to_string),
        }),
        EventPayload::TaskOutput(o) => Card::TaskOutput(TaskOutputCard {
            raw_preview: owned_or_empty(o.raw_preview),
            validation_passed: o.validation_passed,
            pydantic_dump: o.pydantic_dump.cloned(),
            diagnostics: OutputDiagnostics {
                output_mode: o.output_mode.map(str::to_string),
                schema_key: o.schema_key.map(str::to_string),
                citation_count: o.citation_count.unwrap_or(0),
                degraded: o.degraded.unwrap_or(false),
                warnings: o.warnings.into_iter().map(str::to_string).collect(),
            },
        }),
        EventPayload::TaskState(s) => Card::TaskState(TaskStateCard {
            status: s.status.unwrap_or(PENDING).to_string(),
            error: s.error.map(str::to_string),
            total_duration_ms: s.total_duration_ms,
        }),
        EventPayload::System(s) => Card::System(SystemCard {
            message: owned_or_empty(s.message),
            details: s.details.cloned().unwrap_or_else(empty_object),
        }),
        EventPayload::Unrecognized(_) => {
            tracing::trace!(
                "Skipping event {} with unrecognized type '{}'",
                event.event_id,
                event.event_type.as_str()
            );
            return None;
        }
    };

    Some(MappedEvent {
        id: event.event_id.clone(),
        card,
        timestamp: event.timestamp.clone(),
        agent_name: event.agent().map(str::to_string),
        severity: event.severity,
    })
}

/// Classifies a sequence in order, dropping unrecognised events.
pub fn classify_events<'a, I>(events: I) -> Vec<MappedEvent>
where
    I: IntoIterator<Item = &'a RunEvent>,
{
    events.into_iter().filter_map(classify_event).collect()
}

fn owned_or_empty(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}
