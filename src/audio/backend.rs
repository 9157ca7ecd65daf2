use crate::error::FrontdeskError;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Audio capture backend trait
///
/// Implementations own the device handle; `start` hands back a channel that
/// delivers frames until `stop` releases the source. After `stop` no further
/// frames are produced.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio.
    ///
    /// Returns a channel receiver that will receive audio frames. Failure to
    /// acquire the source is terminal for the session attempt.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, FrontdeskError>;

    /// Stop capturing and release the source.
    async fn stop(&mut self) -> Result<(), FrontdeskError>;

    /// Check if the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
