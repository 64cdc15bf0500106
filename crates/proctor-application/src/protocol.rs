//! Wire protocol.
//!
//! Every frame is a JSON text message `{"event": "<name>", "data": {...}}`.
//! Inbound frames are decoded through a name-to-payload table so that an
//! unknown event and a malformed payload are both reported as validation
//! errors without touching any session.

use proctor_core::error::{ProctorError, Result};
use proctor_core::execution::ExecutionResult;
use proctor_core::proctoring::{ProctoringKind, ProctoringRecord, Severity};
use proctor_core::session::{ChatMessage, SessionSnapshot, SessionStatus};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JoinSessionPayload {
    pub session_id: String,
    #[serde(default)]
    pub candidate_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodeUpdatePayload {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunCodePayload {
    /// Falls back to the last committed code when absent.
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessagePayload {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProctoringEventPayload {
    #[serde(rename = "type")]
    pub kind: ProctoringKind,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Decoded client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    JoinSession(JoinSessionPayload),
    CodeUpdate(CodeUpdatePayload),
    RunCode(RunCodePayload),
    ChatMessage(ChatMessagePayload),
    ProctoringEvent(ProctoringEventPayload),
    StartSession,
    EndSession,
}

#[derive(Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl InboundEvent {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns `ProctorError::Validation` for malformed JSON, an unknown
    /// event name, or a payload that does not match the event.
    pub fn parse(text: &str) -> Result<Self> {
        let frame: RawFrame = serde_json::from_str(text)
            .map_err(|e| ProctorError::validation(format!("Malformed frame: {}", e)))?;
        let data = match frame.data {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };

        let event = match frame.event.as_str() {
            "join_session" => Self::JoinSession(payload(&frame.event, data)?),
            "code_update" => Self::CodeUpdate(payload(&frame.event, data)?),
            "run_code" => Self::RunCode(payload(&frame.event, data)?),
            "chat_message" => Self::ChatMessage(payload(&frame.event, data)?),
            "proctoring_event" => Self::ProctoringEvent(payload(&frame.event, data)?),
            "start_session" => Self::StartSession,
            "end_session" => Self::EndSession,
            other => {
                return Err(ProctorError::validation(format!("Unknown event '{}'", other)));
            }
        };
        Ok(event)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinSession(_) => "join_session",
            Self::CodeUpdate(_) => "code_update",
            Self::RunCode(_) => "run_code",
            Self::ChatMessage(_) => "chat_message",
            Self::ProctoringEvent(_) => "proctoring_event",
            Self::StartSession => "start_session",
            Self::EndSession => "end_session",
        }
    }
}

fn payload<T: DeserializeOwned>(event: &str, data: serde_json::Value) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| ProctorError::validation(format!("Invalid '{}' payload: {}", event, e)))
}

/// `{}` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponsePayload {
    #[serde(flatten)]
    pub message: ChatMessage,
    /// Whether the client should read the message aloud.
    #[serde(default)]
    pub speak: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatusPayload {
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProctoringAckPayload {
    #[serde(rename = "type")]
    pub kind: ProctoringKind,
    pub count: u64,
    pub severity: Severity,
}

impl From<ProctoringRecord> for ProctoringAckPayload {
    fn from(record: ProctoringRecord) -> Self {
        Self {
            kind: record.kind,
            count: record.count,
            severity: record.severity,
        }
    }
}

/// Server frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    SessionJoined(SessionSnapshot),
    ExecutionStarted(Empty),
    ExecutionComplete(ExecutionResult),
    ExecutionError(ErrorPayload),
    ChatResponse(ChatResponsePayload),
    ChatError(ErrorPayload),
    SessionStatus(SessionStatusPayload),
    ProctoringAck(ProctoringAckPayload),
    Error(ErrorPayload),
}

impl OutboundEvent {
    pub fn execution_error(error: &ProctorError) -> Self {
        Self::ExecutionError(ErrorPayload {
            error: error.to_string(),
        })
    }

    pub fn chat_error(error: &ProctorError) -> Self {
        Self::ChatError(ErrorPayload {
            error: error.to_string(),
        })
    }

    pub fn error(error: &ProctorError) -> Self {
        Self::Error(ErrorPayload {
            error: error.to_string(),
        })
    }

    pub fn chat_response(message: ChatMessage, speak: bool) -> Self {
        Self::ChatResponse(ChatResponsePayload { message, speak })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_parse_join_session() {
        let event =
            InboundEvent::parse(r#"{"event":"join_session","data":{"session_id":"abc"}}"#).unwrap();
        assert_eq!(
            event,
            InboundEvent::JoinSession(JoinSessionPayload {
                session_id: "abc".into(),
                candidate_name: None,
            })
        );
    }

    #[test]
    fn test_parse_events_without_data() {
        assert_eq!(
            InboundEvent::parse(r#"{"event":"start_session"}"#).unwrap(),
            InboundEvent::StartSession
        );
        assert_eq!(
            InboundEvent::parse(r#"{"event":"end_session","data":{}}"#).unwrap(),
            InboundEvent::EndSession
        );
        assert_eq!(
            InboundEvent::parse(r#"{"event":"run_code"}"#).unwrap(),
            InboundEvent::RunCode(RunCodePayload { code: None })
        );
    }

    #[test]
    fn test_parse_proctoring_event() {
        let event = InboundEvent::parse(
            r#"{"event":"proctoring_event","data":{"type":"paste_detected","metadata":{"length":420}}}"#,
        )
        .unwrap();
        match event {
            InboundEvent::ProctoringEvent(payload) => {
                assert_eq!(payload.kind, ProctoringKind::PasteDetected);
                assert_eq!(payload.metadata["length"], 420);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_frames() {
        for text in [
            "not json",
            r#"{"data":{}}"#,
            r#"{"event":"teleport","data":{}}"#,
            r#"{"event":"code_update","data":{}}"#,
            r#"{"event":"code_update","data":{"code":42}}"#,
            r#"{"event":"proctoring_event","data":{"type":"screenshot"}}"#,
        ] {
            let err = InboundEvent::parse(text).unwrap_err();
            assert!(err.is_validation(), "{text}: {err}");
        }
    }

    #[test]
    fn test_outbound_framing() {
        let started = serde_json::to_value(OutboundEvent::ExecutionStarted(Empty {})).unwrap();
        assert_eq!(started, json!({"event": "execution_started", "data": {}}));

        let ack = serde_json::to_value(OutboundEvent::ProctoringAck(ProctoringAckPayload {
            kind: ProctoringKind::TabSwitch,
            count: 3,
            severity: Severity::FinalWarning,
        }))
        .unwrap();
        assert_eq!(
            ack,
            json!({"event": "proctoring_ack", "data": {"type": "tab_switch", "count": 3, "severity": "final_warning"}})
        );
    }

    #[test]
    fn test_chat_response_flattens_message() {
        let event = OutboundEvent::chat_response(ChatMessage::hint("💡 **Hint:** x", Utc::now()), true);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "chat_response");
        assert_eq!(value["data"]["role"], "assistant");
        assert_eq!(value["data"]["is_hint"], true);
        assert_eq!(value["data"]["speak"], true);

        let decoded: OutboundEvent = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, event);
    }
}
