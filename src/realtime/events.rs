use crate::config::{RealtimeConfig, TurnDetectionConfig};
use serde::{Deserialize, Serialize};

/// One inbound event plus the byte length of the frame that carried it.
/// The length feeds the event-identity key, distinguishing two logically
/// different events that happen to share type and id.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub event: RealtimeEvent,
    pub payload_len: usize,
}

impl Envelope {
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        Ok(Self {
            event: serde_json::from_str(raw)?,
            payload_len: raw.len(),
        })
    }
}

/// Inbound event kinds from the speech endpoint.
///
/// Only the fields the handler reads are modeled; everything else in the
/// payload is ignored. Kinds this enum does not know about deserialize as
/// `Unknown` so new protocol revisions never crash the channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum RealtimeEvent {
    #[serde(rename = "conversation.item.created")]
    ItemCreated {
        item: ConversationItem,
        #[serde(default)]
        event_id: Option<String>,
    },

    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        #[serde(default)]
        response_id: Option<String>,
        #[serde(default)]
        event_id: Option<String>,
    },

    #[serde(rename = "response.audio.done")]
    AudioDone {
        #[serde(default)]
        response_id: Option<String>,
        #[serde(default)]
        event_id: Option<String>,
    },

    #[serde(rename = "response.audio_transcript.delta")]
    TranscriptDelta {
        #[serde(default)]
        delta: Option<String>,
        #[serde(default)]
        response_id: Option<String>,
        #[serde(default)]
        event_id: Option<String>,
    },

    #[serde(rename = "response.audio_transcript.done")]
    TranscriptDone {
        #[serde(default)]
        transcript: Option<String>,
        #[serde(default)]
        response_id: Option<String>,
        #[serde(default)]
        event_id: Option<String>,
    },

    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        #[serde(default)]
        item: Option<ConversationItem>,
        #[serde(default)]
        event_id: Option<String>,
    },

    #[serde(rename = "response.done")]
    ResponseDone {
        #[serde(default)]
        response_id: Option<String>,
        #[serde(default)]
        event_id: Option<String>,
    },

    #[serde(rename = "error")]
    Error {
        error: RealtimeErrorDetail,
        #[serde(default)]
        event_id: Option<String>,
    },

    #[serde(other)]
    Unknown,
}

impl RealtimeEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            RealtimeEvent::ItemCreated { .. } => "conversation.item.created",
            RealtimeEvent::AudioDelta { .. } => "response.audio.delta",
            RealtimeEvent::AudioDone { .. } => "response.audio.done",
            RealtimeEvent::TranscriptDelta { .. } => "response.audio_transcript.delta",
            RealtimeEvent::TranscriptDone { .. } => "response.audio_transcript.done",
            RealtimeEvent::OutputItemAdded { .. } => "response.output_item.added",
            RealtimeEvent::ResponseDone { .. } => "response.done",
            RealtimeEvent::Error { .. } => "error",
            RealtimeEvent::Unknown => "unknown",
        }
    }

    /// The item/response/event identifier used for replay detection.
    /// Events carrying no identifier at all cannot be deduplicated and are
    /// always processed.
    pub fn identity(&self) -> Option<&str> {
        match self {
            RealtimeEvent::ItemCreated { item, event_id } => {
                item.id.as_deref().or(event_id.as_deref())
            }
            RealtimeEvent::AudioDelta {
                response_id,
                event_id,
            }
            | RealtimeEvent::AudioDone {
                response_id,
                event_id,
            }
            | RealtimeEvent::TranscriptDelta {
                response_id,
                event_id,
                ..
            }
            | RealtimeEvent::TranscriptDone {
                response_id,
                event_id,
                ..
            }
            | RealtimeEvent::ResponseDone {
                response_id,
                event_id,
            } => response_id.as_deref().or(event_id.as_deref()),
            RealtimeEvent::OutputItemAdded { item, event_id } => item
                .as_ref()
                .and_then(|i| i.id.as_deref())
                .or(event_id.as_deref()),
            RealtimeEvent::Error { event_id, .. } => event_id.as_deref(),
            RealtimeEvent::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

impl ConversationItem {
    /// First text or transcribed utterance carried by the item.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find_map(|part| part.text.as_deref().or(part.transcript.as_deref()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentPart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Commands sent toward the speech endpoint over the channel's outbound
/// direction.
#[derive(Debug, Clone)]
pub enum OutboundCommand {
    SessionUpdate(SessionUpdate),
    Close,
}

/// The one-time configuration message sent when the channel becomes ready.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUpdate {
    pub model: String,
    pub voice: String,
    pub input_audio_format: String,
    pub output_audio_format: String,
    pub instructions: String,
    pub turn_detection: TurnDetection,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl SessionUpdate {
    pub fn new(config: &RealtimeConfig, instructions: &str) -> Self {
        let TurnDetectionConfig {
            threshold,
            prefix_padding_ms,
            silence_duration_ms,
        } = config.turn_detection;

        Self {
            model: config.model.clone(),
            voice: config.voice.clone(),
            input_audio_format: "pcm16".to_string(),
            output_audio_format: "pcm16".to_string(),
            instructions: instructions.to_string(),
            turn_detection: TurnDetection {
                kind: "server_vad".to_string(),
                threshold,
                prefix_padding_ms,
                silence_duration_ms,
            },
        }
    }

    /// Wire form: `{"type": "session.update", "session": {..}}`.
    pub fn to_wire(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "session.update",
            "session": self,
        })
    }
}
