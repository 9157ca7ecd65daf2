use super::events::{Envelope, OutboundCommand};
use crate::config::RealtimeConfig;
use crate::error::FrontdeskError;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

type WsSink = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<TcpStream>>,
    tungstenite::Message,
>;

/// The negotiated bidirectional channel to the speech endpoint.
///
/// One inbound queue of typed events consumed by a single classification
/// loop, one outbound direction for commands; ordering and backpressure are
/// explicit in the channels rather than implicit in callback firing order.
#[async_trait]
pub trait RealtimeTransport: Send {
    /// Take the inbound event receiver. Available exactly once.
    fn take_events(&mut self) -> Option<mpsc::Receiver<Envelope>>;

    /// Send a command toward the speech endpoint.
    async fn send(&mut self, command: OutboundCommand) -> Result<(), FrontdeskError>;

    /// Stop routing remote audio output.
    async fn detach_output(&mut self) -> Result<(), FrontdeskError>;

    /// Close the event channel (outbound direction).
    async fn close_channel(&mut self) -> Result<(), FrontdeskError>;

    /// Tear down the underlying connection.
    async fn close(&mut self) -> Result<(), FrontdeskError>;
}

/// WebSocket transport to the speech endpoint's realtime interface.
pub struct WsTransport {
    sink: Option<WsSink>,
    events: Option<mpsc::Receiver<Envelope>>,
    reader: Option<JoinHandle<()>>,
}

impl WsTransport {
    /// Open the realtime channel. The connection failing to establish is a
    /// terminal error for the session attempt.
    pub async fn connect(
        config: &RealtimeConfig,
        api_key: &str,
    ) -> Result<Self, FrontdeskError> {
        let ws_base = config
            .api_base
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        let url = format!("{}/realtime?model={}", ws_base, config.model);

        let request = tungstenite::http::Request::builder()
            .uri(&url)
            .header("Host", host_of(&url))
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Authorization", format!("Bearer {}", api_key))
            .header("OpenAI-Beta", "realtime=v1")
            .body(())
            .map_err(|e| FrontdeskError::Transport(format!("invalid request: {}", e)))?;

        let (stream, _) = connect_async(request)
            .await
            .map_err(|e| FrontdeskError::Transport(e.to_string()))?;

        info!("Realtime channel open (model={})", config.model);

        let (sink, mut source) = stream.split();
        let (events_tx, events_rx) = mpsc::channel(256);

        let reader = tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(tungstenite::Message::Text(text)) => match Envelope::parse(&text) {
                        Ok(envelope) => {
                            if events_tx.send(envelope).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse realtime event: {}", e);
                        }
                    },
                    Ok(tungstenite::Message::Close(_)) => {
                        info!("Realtime channel closed by remote");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Realtime channel error: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            sink: Some(sink),
            events: Some(events_rx),
            reader: Some(reader),
        })
    }
}

fn host_of(url: &str) -> String {
    url.split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl RealtimeTransport for WsTransport {
    fn take_events(&mut self) -> Option<mpsc::Receiver<Envelope>> {
        self.events.take()
    }

    async fn send(&mut self, command: OutboundCommand) -> Result<(), FrontdeskError> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| FrontdeskError::Transport("channel already closed".to_string()))?;

        match command {
            OutboundCommand::SessionUpdate(update) => sink
                .send(tungstenite::Message::Text(update.to_wire().to_string()))
                .await
                .map_err(|e| FrontdeskError::Transport(e.to_string())),
            OutboundCommand::Close => sink
                .send(tungstenite::Message::Close(None))
                .await
                .map_err(|e| FrontdeskError::Transport(e.to_string())),
        }
    }

    async fn detach_output(&mut self) -> Result<(), FrontdeskError> {
        // Remote audio arrives as events on this channel; there is no
        // separate sink to detach.
        Ok(())
    }

    async fn close_channel(&mut self) -> Result<(), FrontdeskError> {
        if let Some(mut sink) = self.sink.take() {
            // Best effort; the remote may already be gone.
            let _ = sink.send(tungstenite::Message::Close(None)).await;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), FrontdeskError> {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.sink = None;
        Ok(())
    }
}
