//! Streaming event tagged union (spec §9 design note: "Streaming events
//! with mixed payload shapes"). Every stream exposed by the Pool Facade,
//! the Orchestrator, and the Agent loop yields this type so consumers
//! switch on `Event::kind` rather than juggling ad-hoc payload shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{AgentState, ToolCall, ToolResult};
use crate::error::{Error, ErrorKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A chunk of the final, user-visible response.
    Chunk { text: String },
    /// A chunk of reasoning content captured inside a thinking marker.
    Thinking { text: String },
    /// Precedes a stream, announcing the mode/model about to run.
    Metadata { info: Value },
    ToolCall { call: ToolCall },
    ToolResult { result: ToolResult },
    /// An agent-loop state transition.
    StateChange { state: AgentState, step_number: u32 },
    /// A terminal error event; no further events follow.
    Error { kind: ErrorKind, message: String },
    /// Marks successful, normal completion of the stream.
    Done,
}

impl Event {
    #[must_use]
    pub fn error(err: &Error) -> Self {
        Event::Error {
            kind: err.kind(),
            message: err.context.message.clone(),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Error { .. } | Event::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_event_is_terminal() {
        let err = Error::transport("x");
        let ev = Event::error(&err);
        assert!(ev.is_terminal());
    }

    #[test]
    fn chunk_event_is_not_terminal() {
        let ev = Event::Chunk { text: "hi".into() };
        assert!(!ev.is_terminal());
    }
}
