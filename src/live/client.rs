use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::Engine;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite};
use tracing::{debug, error, info, warn};

use super::messages::{
    self, ClientContent, ClientContentMessage, Content, FunctionResponse, MediaChunk, Part,
    RealtimeInput, RealtimeInputMessage, ServerMessage, SetupMessage, ToolResponse,
    ToolResponseMessage,
};
use super::{LiveConfig, LiveConnector, LiveEvent, LiveHandle, LiveSession, ToolCall};

type WsSink = futures::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    tungstenite::Message,
>;

const SETUP_TIMEOUT: Duration = Duration::from_secs(10);
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Live connector speaking the Gemini BidiGenerateContent websocket protocol.
pub struct GeminiLiveConnector;

#[async_trait::async_trait]
impl LiveConnector for GeminiLiveConnector {
    async fn connect(&self, config: &LiveConfig) -> Result<LiveHandle> {
        let url = format!("{}?key={}", config.endpoint, config.api_key);
        info!(endpoint = %config.endpoint, model = %config.model, "opening live session");

        let (ws_stream, _) = connect_async(&url)
            .await
            .context("websocket connect failed")?;

        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        let setup = SetupMessage::new(&config.model);
        ws_tx
            .send(tungstenite::Message::Text(serde_json::to_string(&setup)?))
            .await
            .context("failed to send setup message")?;

        // Media must not flow before the server acknowledges the setup.
        let ack = tokio::time::timeout(SETUP_TIMEOUT, async {
            loop {
                let msg = match ws_rx.next().await {
                    Some(msg) => msg.context("websocket error during setup")?,
                    None => bail!("connection closed during setup"),
                };
                match parse_server_message(msg)? {
                    Some(server) if server.setup_complete.is_some() => return Ok(()),
                    Some(_) | None => continue,
                }
            }
        })
        .await
        .context("timed out waiting for setup acknowledgment")?;
        ack?;

        info!("live session established");

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            while let Some(msg) = ws_rx.next().await {
                let msg = match msg {
                    Ok(msg) => msg,
                    Err(e) => {
                        error!("live websocket error: {e}");
                        let _ = event_tx.send(LiveEvent::Error(e.to_string())).await;
                        return;
                    }
                };

                if let tungstenite::Message::Close(frame) = &msg {
                    if let Some(frame) = frame {
                        info!("live session closed: {} {}", frame.code, frame.reason);
                    } else {
                        info!("live session closed");
                    }
                    let _ = event_tx.send(LiveEvent::Closed).await;
                    return;
                }

                let server = match parse_server_message(msg) {
                    Ok(Some(server)) => server,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("unparseable server message: {e}");
                        continue;
                    }
                };

                if let Some(tool_call) = server.tool_call {
                    for call in tool_call.function_calls {
                        debug!(name = %call.name, id = %call.id, "tool call received");
                        let event = LiveEvent::ToolCall(ToolCall {
                            id: call.id,
                            name: call.name,
                            args: call.args,
                        });
                        if event_tx.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            }
            let _ = event_tx.send(LiveEvent::Closed).await;
        });

        Ok(LiveHandle {
            session: Box::new(GeminiLiveSession { ws_tx }),
            events: event_rx,
        })
    }
}

/// Decode a websocket message into a [`ServerMessage`]. The Live API delivers
/// JSON as either text or binary frames; everything else is ignored.
fn parse_server_message(msg: tungstenite::Message) -> Result<Option<ServerMessage>> {
    let payload = match msg {
        tungstenite::Message::Text(text) => text.into_bytes(),
        tungstenite::Message::Binary(bytes) => bytes,
        _ => return Ok(None),
    };

    let server = serde_json::from_slice::<ServerMessage>(&payload)
        .context("invalid server message JSON")?;
    Ok(Some(server))
}

/// Outbound half of an open Gemini live session.
struct GeminiLiveSession {
    ws_tx: WsSink,
}

impl GeminiLiveSession {
    async fn send_json<T: serde::Serialize>(&mut self, message: &T) -> Result<()> {
        let payload = serde_json::to_string(message)?;
        self.ws_tx
            .send(tungstenite::Message::Text(payload))
            .await
            .context("websocket send failed")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl LiveSession for GeminiLiveSession {
    async fn send_audio(&mut self, base64_pcm: &str, sample_rate: u32) -> Result<()> {
        let message = RealtimeInputMessage {
            realtime_input: RealtimeInput {
                media_chunks: vec![MediaChunk {
                    mime_type: messages::audio_mime(sample_rate),
                    data: base64_pcm.to_string(),
                }],
            },
        };
        self.send_json(&message).await
    }

    async fn send_frame(&mut self, jpeg: &[u8]) -> Result<()> {
        let message = RealtimeInputMessage {
            realtime_input: RealtimeInput {
                media_chunks: vec![MediaChunk {
                    mime_type: messages::FRAME_MIME.to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(jpeg),
                }],
            },
        };
        self.send_json(&message).await
    }

    async fn send_text(&mut self, text: &str) -> Result<()> {
        let message = ClientContentMessage {
            client_content: ClientContent {
                turns: vec![Content {
                    role: Some("user".to_string()),
                    parts: vec![Part {
                        text: text.to_string(),
                    }],
                }],
                turn_complete: true,
            },
        };
        self.send_json(&message).await
    }

    async fn send_tool_ok(&mut self, call_id: &str, name: &str) -> Result<()> {
        let message = ToolResponseMessage {
            tool_response: ToolResponse {
                function_responses: vec![FunctionResponse {
                    id: call_id.to_string(),
                    name: name.to_string(),
                    response: serde_json::json!({ "result": "ok" }),
                }],
            },
        };
        self.send_json(&message).await
    }

    async fn close(&mut self) -> Result<()> {
        self.ws_tx.close().await.ok();
        Ok(())
    }
}
