use super::gate::DispatchGate;
use super::message::NotificationMessage;
use crate::config::NotifyConfig;
use crate::error::FrontdeskError;
use std::time::Duration;
use tracing::{error, info, warn};

/// Webhook notifier with global rate limiting.
///
/// Non-2xx responses are classified: 429 backs off using the server's
/// retry hint and retries once; other 4xx are payload errors and final;
/// 5xx gets a single retry. Callers treat any returned error as
/// log-and-continue — a failed notification never blocks teardown.
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
    gate: DispatchGate,
}

impl Notifier {
    pub fn new(config: NotifyConfig) -> Self {
        if config.webhook_url.is_none() {
            warn!("Webhook URL not configured; end-of-session notifications will be skipped");
        }
        Self {
            client: reqwest::Client::new(),
            webhook_url: config.webhook_url,
            gate: DispatchGate::new(Duration::from_millis(config.min_interval_ms)),
        }
    }

    pub async fn dispatch(&self, message: &NotificationMessage) -> Result<(), FrontdeskError> {
        let Some(url) = self.webhook_url.as_deref() else {
            info!("Skipping notification: no webhook configured");
            return Ok(());
        };

        self.gate.acquire().await;

        match self.post(url, message).await {
            Ok(()) => Ok(()),
            Err(Retry::After(delay)) => {
                warn!("Notification throttled upstream; retrying once");
                tokio::time::sleep(delay).await;
                self.post(url, message).await.map_err(Retry::into_error)
            }
            Err(Retry::Never(err)) => Err(err),
        }
    }

    async fn post(&self, url: &str, message: &NotificationMessage) -> Result<(), Retry> {
        let response = self
            .client
            .post(url)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                Retry::Never(FrontdeskError::Upstream {
                    status: 0,
                    body: e.to_string(),
                })
            })?;

        let status = response.status();
        if status.is_success() {
            info!("Notification dispatched");
            return Ok(());
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        error!("Notification webhook failed: {} {}", status, body);

        let err = FrontdeskError::Upstream {
            status: status.as_u16(),
            body,
        };

        if status.as_u16() == 429 {
            Err(Retry::After(retry_after.unwrap_or(Duration::from_secs(1))))
        } else if status.is_server_error() {
            Err(Retry::After(Duration::from_millis(500)))
        } else {
            // Payload problem; retrying the same body cannot help.
            Err(Retry::Never(err))
        }
    }
}

enum Retry {
    After(Duration),
    Never(FrontdeskError),
}

impl Retry {
    fn into_error(self) -> FrontdeskError {
        match self {
            Retry::Never(err) => err,
            Retry::After(_) => FrontdeskError::Upstream {
                status: 503,
                body: "webhook unavailable after retry".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::message::session_summary;
    use crate::session::{Session, SessionRole};
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Instant;

    /// Records each delivery's arrival time and body; replies with the next
    /// scripted status (200 once the script runs out).
    #[derive(Clone)]
    struct Recorder {
        arrivals: Arc<StdMutex<Vec<(Instant, String)>>>,
        replies: Arc<StdMutex<VecDeque<u16>>>,
    }

    async fn hook(State(recorder): State<Recorder>, body: String) -> (StatusCode, HeaderMap) {
        recorder
            .arrivals
            .lock()
            .unwrap()
            .push((Instant::now(), body));

        let code = recorder.replies.lock().unwrap().pop_front().unwrap_or(200);
        let mut headers = HeaderMap::new();
        if code == 429 {
            headers.insert("Retry-After", "0".parse().unwrap());
        }
        (StatusCode::from_u16(code).unwrap(), headers)
    }

    async fn recording_webhook(replies: &[u16]) -> (String, Recorder) {
        let recorder = Recorder {
            arrivals: Arc::new(StdMutex::new(Vec::new())),
            replies: Arc::new(StdMutex::new(replies.iter().copied().collect())),
        };
        let app = Router::new()
            .route("/hook", post(hook))
            .with_state(recorder.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/hook", addr), recorder)
    }

    fn notifier_for(url: String, min_interval_ms: u64) -> Notifier {
        Notifier::new(NotifyConfig {
            webhook_url: Some(url),
            min_interval_ms,
        })
    }

    fn summary_for(session_id: &str) -> NotificationMessage {
        let session = Session::new(session_id, SessionRole::Visitor);
        session_summary(&session, chrono::Utc::now())
    }

    #[tokio::test]
    async fn unconfigured_webhook_is_a_silent_success() {
        let notifier = Notifier::new(NotifyConfig {
            webhook_url: None,
            min_interval_ms: 1000,
        });

        assert!(notifier.dispatch(&summary_for("s1")).await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_webhook_surfaces_an_error() {
        let notifier = notifier_for("http://127.0.0.1:1/hook".to_string(), 0);

        let err = notifier.dispatch(&summary_for("s1")).await.unwrap_err();
        assert!(matches!(err, FrontdeskError::Upstream { status: 0, .. }));
    }

    #[tokio::test]
    async fn receiver_observes_spacing_and_arrival_order() {
        let (url, recorder) = recording_webhook(&[]).await;
        let notifier = Arc::new(notifier_for(url, 1000));

        let first = {
            let notifier = Arc::clone(&notifier);
            tokio::spawn(async move {
                notifier.dispatch(&summary_for("order-a")).await.unwrap();
            })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = {
            let notifier = Arc::clone(&notifier);
            tokio::spawn(async move {
                notifier.dispatch(&summary_for("order-b")).await.unwrap();
            })
        };
        first.await.unwrap();
        second.await.unwrap();

        let arrivals = recorder.arrivals.lock().unwrap();
        assert_eq!(arrivals.len(), 2);
        assert!(arrivals[0].1.contains("order-a"));
        assert!(arrivals[1].1.contains("order-b"));
        // The gate spaces sends by 1000 ms; allow a few ms of local
        // delivery jitter on the receiving side.
        assert!(arrivals[1].0.duration_since(arrivals[0].0) >= Duration::from_millis(950));
    }

    #[tokio::test]
    async fn throttled_dispatch_is_retried_once_and_succeeds() {
        let (url, recorder) = recording_webhook(&[429]).await;
        let notifier = notifier_for(url, 0);

        notifier.dispatch(&summary_for("s1")).await.unwrap();
        assert_eq!(recorder.arrivals.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn server_error_is_retried_once_then_final() {
        let (url, recorder) = recording_webhook(&[500, 500]).await;
        let notifier = notifier_for(url, 0);

        let err = notifier.dispatch(&summary_for("s1")).await.unwrap_err();
        assert!(matches!(err, FrontdeskError::Upstream { .. }));
        assert_eq!(recorder.arrivals.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn payload_error_is_not_retried() {
        let (url, recorder) = recording_webhook(&[400]).await;
        let notifier = notifier_for(url, 0);

        let err = notifier.dispatch(&summary_for("s1")).await.unwrap_err();
        assert!(matches!(err, FrontdeskError::Upstream { status: 400, .. }));
        assert_eq!(recorder.arrivals.lock().unwrap().len(), 1);
    }
}
