use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::dto::session::{CreateSessionInput, JoinSessionInput, SettingsInput};

/// Messages accepted from participant WebSocket clients.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a new session hosted by the sender.
    CreateSession(CreateSessionInput),
    /// Join an existing session.
    JoinSession(JoinSessionInput),
    /// Leave the current session (ends it when sent by the host).
    LeaveSession,
    /// Host-only: replace the session settings.
    UpdateSettings(SettingsInput),
    /// Host-only: remove the participant with the given display name.
    KickParticipant {
        /// Display name of the participant to remove.
        name: String,
    },
    /// Host-only: provision questions and start a match.
    StartVoting,
    /// Answer the current question.
    SubmitAnswer {
        /// Raw answer; its expected shape depends on the question kind.
        answer: Value,
    },
}

/// Failure to decode an inbound frame.
#[derive(Debug, Error)]
pub enum InboundError {
    /// The frame is not a known JSON message.
    #[error("unreadable message: {0}")]
    Parse(#[from] serde_json::Error),
    /// The message payload violates a constraint.
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl ClientMessage {
    /// Parse a text frame and validate its payload.
    pub fn from_json_str(text: &str) -> Result<Self, InboundError> {
        let message: Self = serde_json::from_str(text)?;
        match &message {
            ClientMessage::CreateSession(input) => input.validate()?,
            ClientMessage::JoinSession(input) => input.validate()?,
            ClientMessage::UpdateSettings(input) => input.validate()?,
            ClientMessage::LeaveSession
            | ClientMessage::KickParticipant { .. }
            | ClientMessage::StartVoting
            | ClientMessage::SubmitAnswer { .. } => {}
        }
        Ok(message)
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            ClientMessage::CreateSession(_) => "create_session",
            ClientMessage::JoinSession(_) => "join_session",
            ClientMessage::LeaveSession => "leave_session",
            ClientMessage::UpdateSettings(_) => "update_settings",
            ClientMessage::KickParticipant { .. } => "kick_participant",
            ClientMessage::StartVoting => "start_voting",
            ClientMessage::SubmitAnswer { .. } => "submit_answer",
        }
    }
}
