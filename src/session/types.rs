use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversational policy for a session, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionRole {
    /// Visitor with an appointment: greet and guide to the bell.
    #[serde(rename = "visitor")]
    Visitor,
    /// Unscheduled sales visit: decline politely and firmly.
    #[serde(rename = "sales_rejection")]
    Rejection,
}

impl SessionRole {
    /// Human-readable label used in the end-of-session notification.
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionRole::Visitor => "✅ アポイント有り",
            SessionRole::Rejection => "🚫 アポイント無し",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Ended,
}

/// Who produced a turn. Wire names follow the remote protocol's roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    #[serde(rename = "user")]
    Visitor,
    #[serde(rename = "assistant")]
    Agent,
}

/// One finalized utterance in the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    /// Set when the turn is finalized, not when raw audio began.
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub role: SessionRole,
    /// Policy prompt resolved from the role at creation, never mutated.
    pub instructions: String,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
    /// Append-only, in conversational order.
    pub transcript: Vec<Turn>,
}

impl Session {
    pub fn new(id: impl Into<String>, role: SessionRole) -> Self {
        Self {
            id: id.into(),
            role,
            instructions: super::prompts::system_prompt(role).to_string(),
            created_at: Utc::now(),
            status: SessionStatus::Active,
            transcript: Vec::new(),
        }
    }

    /// Session duration so far, formatted as the notification expects.
    pub fn duration_text(&self, until: DateTime<Utc>) -> String {
        let diff = until.signed_duration_since(self.created_at);
        let total_secs = diff.num_seconds().max(0);
        format!("{}分{}秒", total_secs / 60, total_secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn role_wire_names() {
        assert_eq!(
            serde_json::to_string(&SessionRole::Rejection).unwrap(),
            "\"sales_rejection\""
        );
        assert_eq!(
            serde_json::to_string(&Speaker::Visitor).unwrap(),
            "\"user\""
        );
        assert_eq!(serde_json::to_string(&Speaker::Agent).unwrap(), "\"assistant\"");
    }

    #[test]
    fn new_session_is_active_with_empty_transcript() {
        let session = Session::new("s1", SessionRole::Visitor);
        assert_eq!(session.status, SessionStatus::Active);
        assert!(session.transcript.is_empty());
        assert!(!session.instructions.is_empty());
    }

    #[test]
    fn duration_formatting() {
        let session = Session::new("s1", SessionRole::Visitor);
        let later = session.created_at + Duration::seconds(95);
        assert_eq!(session.duration_text(later), "1分35秒");
    }
}
