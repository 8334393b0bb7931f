use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

use super::{errors::UpstreamError, transport::Transport};
use crate::types::{JsonRpcRequest, JsonRpcResponse};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Raw RPC transport over a persistent WebSocket connection.
///
/// The socket is opened on first use and shared by all calls on this endpoint; calls are
/// serialized by the connection mutex. Opening the socket is bounded by the response
/// timeout. Any failure drops the socket so the next call
/// reconnects.
pub struct WsTransport {
    url: Arc<str>,
    stream: Mutex<Option<WsStream>>,
    response_timeout: Duration,
}

impl WsTransport {
    #[must_use]
    pub fn new(url: Arc<str>, response_timeout: Duration) -> Self {
        Self { url, stream: Mutex::new(None), response_timeout }
    }

    /// Returns `true` if a socket is currently open.
    pub async fn is_connected(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    async fn connect(&self) -> Result<WsStream, UpstreamError> {
        tracing::debug!(endpoint = %self.url, "connecting to websocket");

        let handshake = tokio::time::timeout(
            self.response_timeout,
            tokio_tungstenite::connect_async(self.url.as_ref()),
        )
        .await
        .map_err(|_| {
            tracing::warn!(endpoint = %self.url, "websocket connection timed out");
            UpstreamError::Timeout
        })?;

        match handshake {
            Ok((ws_stream, response)) => {
                tracing::info!(
                    endpoint = %self.url,
                    status = response.status().as_u16(),
                    "websocket connected"
                );
                Ok(ws_stream)
            }
            Err(e) => {
                tracing::warn!(endpoint = %self.url, error = %e, "websocket connection failed");
                Err(UpstreamError::ConnectionFailed(format!("WebSocket connection failed: {e}")))
            }
        }
    }

    /// Writes one request and reads until the response carrying the same id arrives.
    async fn exchange(
        stream: &mut WsStream,
        payload: String,
        id: &serde_json::Value,
    ) -> Result<JsonRpcResponse, UpstreamError> {
        stream
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| UpstreamError::WebSocket(format!("send failed: {e}")))?;

        while let Some(message) = stream.next().await {
            match message.map_err(|e| UpstreamError::WebSocket(format!("receive failed: {e}")))? {
                Message::Text(text) => {
                    let response: JsonRpcResponse = serde_json::from_str(&text)
                        .map_err(|e| UpstreamError::InvalidResponse(format!("Invalid JSON: {e}")))?;
                    if response.id.as_ref() == id {
                        return Ok(response);
                    }
                    tracing::trace!(id = %response.id, "skipping unrelated websocket message");
                }
                Message::Close(_) => {
                    return Err(UpstreamError::ConnectionFailed(
                        "websocket closed by peer".to_string(),
                    ));
                }
                _ => {}
            }
        }

        Err(UpstreamError::ConnectionFailed("websocket stream ended".to_string()))
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, UpstreamError> {
        let payload = serde_json::to_string(request).map_err(|e| {
            UpstreamError::InvalidRequest(format!("Failed to serialize request: {e}"))
        })?;

        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(stream) = guard.as_mut() else {
            return Err(UpstreamError::WebSocket("connection unavailable".to_string()));
        };

        let result =
            tokio::time::timeout(self.response_timeout, Self::exchange(stream, payload, &request.id))
                .await
                .unwrap_or(Err(UpstreamError::Timeout));

        if let Err(e) = &result {
            tracing::debug!(endpoint = %self.url, error = %e, "dropping websocket connection");
            *guard = None;
        }

        result
    }
}
