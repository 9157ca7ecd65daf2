use super::backend::{AudioBackend, AudioFrame};
use crate::config::AudioConfig;
use crate::error::FrontdeskError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Microphone capture via cpal.
///
/// The cpal stream is not `Send`, so it lives on a dedicated thread; the
/// device callback converts samples to i16 and forwards frames over the
/// channel without blocking. Overflow drops the frame rather than stalling
/// the device callback.
pub struct MicBackend {
    config: AudioConfig,
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl MicBackend {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, FrontdeskError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(FrontdeskError::ResourceAcquisition(
                "microphone already capturing".to_string(),
            ));
        }

        let (frame_tx, frame_rx) = mpsc::channel::<AudioFrame>(64);
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();

        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);
        let poll_interval = Duration::from_millis(self.config.buffer_duration_ms.max(10));

        let thread = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                let stream = match open_input_stream(frame_tx) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    error!("Failed to start microphone stream: {}", e);
                    return;
                }

                // The stream delivers frames from its own callback; this
                // thread just keeps it alive until stop().
                while running.load(Ordering::SeqCst) {
                    std::thread::sleep(poll_interval);
                }
                drop(stream);
                info!("Microphone released");
            })
            .map_err(|e| FrontdeskError::ResourceAcquisition(e.to_string()))?;

        self.thread = Some(thread);

        match ready_rx.await {
            Ok(Ok(())) => Ok(frame_rx),
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                self.thread = None;
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                self.thread = None;
                Err(FrontdeskError::ResourceAcquisition(
                    "capture thread exited before the device opened".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), FrontdeskError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            // The capture thread sleeps up to one poll interval before it
            // sees the flag; join it off the runtime.
            match tokio::task::spawn_blocking(move || thread.join()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => warn!("Microphone capture thread panicked"),
                Err(e) => warn!("Microphone join task failed: {}", e),
            }
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

fn open_input_stream(frame_tx: mpsc::Sender<AudioFrame>) -> Result<cpal::Stream, FrontdeskError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or_else(|| {
        FrontdeskError::ResourceAcquisition("no default input device".to_string())
    })?;

    if let Ok(name) = device.name() {
        info!("Selected input device: {}", name);
    }

    let supported = device
        .default_input_config()
        .map_err(|e| FrontdeskError::ResourceAcquisition(e.to_string()))?;
    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels;
    let started = Instant::now();

    let err_fn = |err: cpal::StreamError| {
        error!("Microphone stream error: {}", err);
    };

    let make_forward = move |tx: mpsc::Sender<AudioFrame>| {
        move |samples: Vec<i16>| {
            let frame = AudioFrame {
                samples,
                sample_rate,
                channels,
                timestamp_ms: started.elapsed().as_millis() as u64,
            };
            // Consumer behind: dropping a level-metering frame beats
            // stalling the device callback.
            let _ = tx.try_send(frame);
        }
    };

    let stream = match sample_format {
        SampleFormat::I16 => {
            let forward = make_forward(frame_tx);
            device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &_| forward(data.to_vec()),
                    err_fn,
                    None,
                )
                .map_err(|e| FrontdeskError::ResourceAcquisition(e.to_string()))?
        }
        SampleFormat::F32 => {
            let forward = make_forward(frame_tx);
            device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &_| {
                        let converted: Vec<i16> = data
                            .iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
                            .collect();
                        forward(converted);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| FrontdeskError::ResourceAcquisition(e.to_string()))?
        }
        SampleFormat::U16 => {
            let forward = make_forward(frame_tx);
            device
                .build_input_stream(
                    &stream_config,
                    move |data: &[u16], _: &_| {
                        let converted: Vec<i16> =
                            data.iter().map(|&s| (s as i32 - 32768) as i16).collect();
                        forward(converted);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| FrontdeskError::ResourceAcquisition(e.to_string()))?
        }
        other => {
            return Err(FrontdeskError::ResourceAcquisition(format!(
                "unsupported sample format: {:?}",
                other
            )));
        }
    };

    Ok(stream)
}
