use super::backend::AudioFrame;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::info;

/// Continuously-updated view of the local audio source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityState {
    /// Normalized signal level in [0.0, 1.0].
    pub level: f32,
    /// Whether the level clears the speech threshold.
    pub speaking: bool,
}

impl ActivityState {
    pub const SILENT: ActivityState = ActivityState {
        level: 0.0,
        speaking: false,
    };
}

/// Single-task sampling loop over the capture channel.
///
/// Each cycle reads one frame, recomputes the RMS level, and publishes the
/// new state; it suspends only on the frame channel itself, never on
/// anything downstream. `MonitorHandle::stop` ends the loop irrevocably and
/// the final published state is silence.
pub struct LevelMonitor {
    threshold: f32,
}

pub struct MonitorHandle {
    pub state: watch::Receiver<ActivityState>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl LevelMonitor {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn spawn(self, mut frames: mpsc::Receiver<AudioFrame>) -> MonitorHandle {
        let (state_tx, state_rx) = watch::channel(ActivityState::SILENT);
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let threshold = self.threshold;

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    frame = frames.recv() => {
                        let Some(frame) = frame else { break };
                        let level = normalized_rms(&frame.samples);
                        let _ = state_tx.send(ActivityState {
                            level,
                            speaking: level > threshold,
                        });
                    }
                }
            }
            let _ = state_tx.send(ActivityState::SILENT);
            info!("Activity monitor stopped");
        });

        MonitorHandle {
            state: state_rx,
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }
}

impl MonitorHandle {
    /// Stop sampling. No further reads from the capture channel happen
    /// after this returns.
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn current(&self) -> ActivityState {
        *self.state.borrow()
    }
}

/// RMS of an i16 frame, normalized to [0.0, 1.0].
pub fn normalized_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: i64 = samples
        .iter()
        .map(|&sample| {
            let s = sample as i64;
            s * s
        })
        .sum();

    let mean_square = sum_squares as f64 / samples.len() as f64;
    (mean_square.sqrt() / 32768.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(amplitude: i16, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / 48.0;
                (phase.sin() * amplitude as f32) as i16
            })
            .collect()
    }

    fn frame(samples: Vec<i16>) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate: 24000,
            channels: 1,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn silence_has_zero_level() {
        assert_eq!(normalized_rms(&vec![0i16; 480]), 0.0);
        assert_eq!(normalized_rms(&[]), 0.0);
    }

    #[test]
    fn full_scale_is_near_one() {
        let level = normalized_rms(&vec![32767i16; 480]);
        assert!((level - 1.0).abs() < 0.001);
    }

    #[test]
    fn level_grows_with_energy() {
        let quiet = normalized_rms(&tone(300, 480));
        let loud = normalized_rms(&tone(16000, 480));
        assert!(loud > quiet);
    }

    #[tokio::test]
    async fn silent_input_reads_not_speaking() {
        let (tx, rx) = mpsc::channel(8);
        let mut handle = LevelMonitor::new(0.01).spawn(rx);

        tx.send(frame(vec![0i16; 480])).await.unwrap();
        handle.state.changed().await.unwrap();

        let state = handle.current();
        assert_eq!(state.level, 0.0);
        assert!(!state.speaking);

        handle.stop().await;
    }

    #[tokio::test]
    async fn sustained_tone_reads_speaking_within_one_cycle() {
        let (tx, rx) = mpsc::channel(8);
        let mut handle = LevelMonitor::new(0.01).spawn(rx);

        tx.send(frame(tone(8000, 480))).await.unwrap();
        handle.state.changed().await.unwrap();

        let state = handle.current();
        assert!(state.level > 0.01);
        assert!(state.speaking);

        handle.stop().await;
    }

    #[tokio::test]
    async fn stop_publishes_silence_and_ends_sampling() {
        let (tx, rx) = mpsc::channel(8);
        let mut handle = LevelMonitor::new(0.01).spawn(rx);

        tx.send(frame(tone(8000, 480))).await.unwrap();
        handle.state.changed().await.unwrap();
        assert!(handle.current().speaking);

        handle.stop().await;
        assert_eq!(handle.current(), ActivityState::SILENT);

        // The capture channel is gone; nothing can be read after release.
        assert!(tx.send(frame(tone(8000, 480))).await.is_err());
        assert_eq!(handle.current(), ActivityState::SILENT);
    }
}
