use crate::session::{Session, Speaker};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Webhook message body, block-structured.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotificationMessage {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum Block {
    #[serde(rename = "header")]
    Header { text: Text },
    #[serde(rename = "section")]
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<Text>>,
    },
    #[serde(rename = "divider")]
    Divider,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum Text {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

fn field(label: &str, value: &str) -> Text {
    Text::Mrkdwn {
        text: format!("*{}:*\n{}", label, value),
    }
}

/// Format the end-of-session summary: session metadata fields followed by
/// the transcript as a code block.
pub fn session_summary(session: &Session, ended_at: DateTime<Utc>) -> NotificationMessage {
    let fields = vec![
        field("セッションID", &session.id),
        field("タイプ", session.role.display_name()),
        field(
            "開始時刻",
            &session.created_at.format("%Y/%m/%d %H:%M:%S").to_string(),
        ),
        field("所要時間", &session.duration_text(ended_at)),
    ];

    let transcript_text = if session.transcript.is_empty() {
        "会話履歴がありません".to_string()
    } else {
        session
            .transcript
            .iter()
            .map(|turn| {
                let speaker = match turn.speaker {
                    Speaker::Visitor => "👤 来訪者",
                    Speaker::Agent => "🤖 AI",
                };
                format!(
                    "[{}] {}: {}",
                    turn.timestamp.format("%H:%M:%S"),
                    speaker,
                    turn.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    NotificationMessage {
        blocks: vec![
            Block::Header {
                text: Text::Plain {
                    text: "🔔 受付セッション終了".to_string(),
                },
            },
            Block::Section {
                text: None,
                fields: Some(fields),
            },
            Block::Divider,
            Block::Section {
                text: Some(Text::Mrkdwn {
                    text: "*会話履歴:*".to_string(),
                }),
                fields: None,
            },
            Block::Section {
                text: Some(Text::Mrkdwn {
                    text: format!("```{}```", transcript_text),
                }),
                fields: None,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionRole, Turn};

    #[test]
    fn summary_carries_fields_and_transcript() {
        let mut session = Session::new("s1", SessionRole::Visitor);
        session
            .transcript
            .push(Turn::new(Speaker::Visitor, "こんにちは"));
        session
            .transcript
            .push(Turn::new(Speaker::Agent, "いらっしゃいませ"));

        let message = session_summary(&session, Utc::now());
        let json = serde_json::to_string(&message).unwrap();

        assert!(json.contains("受付セッション終了"));
        assert!(json.contains("✅ アポイント有り"));
        assert!(json.contains("👤 来訪者: こんにちは"));
        assert!(json.contains("🤖 AI: いらっしゃいませ"));
        assert!(json.contains("\"type\":\"divider\""));
    }

    #[test]
    fn empty_transcript_gets_placeholder() {
        let session = Session::new("s2", SessionRole::Rejection);
        let message = session_summary(&session, Utc::now());
        let json = serde_json::to_string(&message).unwrap();

        assert!(json.contains("会話履歴がありません"));
        assert!(json.contains("🚫 アポイント無し"));
    }

    #[test]
    fn block_wire_shapes() {
        let header = Block::Header {
            text: Text::Plain {
                text: "t".to_string(),
            },
        };
        let json = serde_json::to_value(&header).unwrap();
        assert_eq!(json["type"], "header");
        assert_eq!(json["text"]["type"], "plain_text");
    }
}
