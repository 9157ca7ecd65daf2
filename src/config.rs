use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

// Every field carries its own default so a config file may specify any
// subset of a section; the rest fills in.

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "defaults::service_name")]
    pub name: String,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: defaults::service_name(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "defaults::bind")]
    pub bind: String,
    #[serde(default = "defaults::port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: defaults::bind(),
            port: defaults::port(),
        }
    }
}

/// Speech-endpoint settings, including the turn-detection parameters sent
/// in the initial session configuration message.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "defaults::api_base")]
    pub api_base: String,
    #[serde(default = "defaults::model")]
    pub model: String,
    #[serde(default = "defaults::voice")]
    pub voice: String,
    #[serde(default)]
    pub turn_detection: TurnDetectionConfig,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            model: defaults::model(),
            voice: defaults::voice(),
            turn_detection: TurnDetectionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TurnDetectionConfig {
    #[serde(default = "defaults::vad_threshold")]
    pub threshold: f32,
    #[serde(default = "defaults::prefix_padding_ms")]
    pub prefix_padding_ms: u32,
    #[serde(default = "defaults::silence_duration_ms")]
    pub silence_duration_ms: u32,
}

impl Default for TurnDetectionConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::vad_threshold(),
            prefix_padding_ms: defaults::prefix_padding_ms(),
            silence_duration_ms: defaults::silence_duration_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "defaults::sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "defaults::channels")]
    pub channels: u16,
    #[serde(default = "defaults::buffer_duration_ms")]
    pub buffer_duration_ms: u64,
    /// Normalized RMS level above which input counts as speech.
    #[serde(default = "defaults::speech_threshold")]
    pub speech_threshold: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::sample_rate(),
            channels: defaults::channels(),
            buffer_duration_ms: defaults::buffer_duration_ms(),
            speech_threshold: defaults::speech_threshold(),
        }
    }
}

/// Bounds for the two duplicate-suppression layers. These track the remote
/// endpoint's observed redelivery behavior and are deliberately not
/// re-derived here.
#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    /// Event-identity cache capacity before pruning.
    #[serde(default = "defaults::event_cache_max")]
    pub event_cache_max: usize,
    /// Number of most-recent keys kept after a prune.
    #[serde(default = "defaults::event_cache_keep")]
    pub event_cache_keep: usize,
    /// Recency window for content-level near-duplicate turns.
    #[serde(default = "defaults::near_dup_window_ms")]
    pub near_dup_window_ms: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            event_cache_max: defaults::event_cache_max(),
            event_cache_keep: defaults::event_cache_keep(),
            near_dup_window_ms: defaults::near_dup_window_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// End-of-session webhook URL. Notifications are skipped when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Minimum spacing between webhook dispatches.
    #[serde(default = "defaults::min_interval_ms")]
    pub min_interval_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            min_interval_ms: defaults::min_interval_ms(),
        }
    }
}

mod defaults {
    pub fn service_name() -> String {
        "frontdesk".to_string()
    }
    pub fn bind() -> String {
        "127.0.0.1".to_string()
    }
    pub fn port() -> u16 {
        3100
    }
    pub fn api_base() -> String {
        "https://api.openai.com/v1".to_string()
    }
    pub fn model() -> String {
        "gpt-4o-realtime-preview-2024-10-01".to_string()
    }
    pub fn voice() -> String {
        "shimmer".to_string()
    }
    pub fn vad_threshold() -> f32 {
        0.5
    }
    pub fn prefix_padding_ms() -> u32 {
        300
    }
    pub fn silence_duration_ms() -> u32 {
        200
    }
    pub fn sample_rate() -> u32 {
        24000
    }
    pub fn channels() -> u16 {
        1
    }
    pub fn buffer_duration_ms() -> u64 {
        100
    }
    pub fn speech_threshold() -> f32 {
        0.01
    }
    pub fn event_cache_max() -> usize {
        100
    }
    pub fn event_cache_keep() -> usize {
        50
    }
    pub fn near_dup_window_ms() -> u64 {
        5000
    }
    pub fn min_interval_ms() -> u64 {
        1000
    }
}

impl Config {
    /// Load configuration from a file, with FRONTDESK__* environment
    /// overrides layered on top (e.g. FRONTDESK__NOTIFY__WEBHOOK_URL).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("FRONTDESK").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
