//! Message stream abstraction over the persistent client connection
//!
//! The hub and the client only ever talk in whole [`Message`]s; this module
//! adapts the server-side axum websocket, the client-side tungstenite socket
//! and an in-memory pair used by tests to one trait.

use crate::error::{HubError, Result};
use crate::protocol::messages::Message;
use async_trait::async_trait;
use axum::extract::ws::{Message as AxumMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// A bidirectional stream of protocol messages
#[async_trait]
pub trait MessageStream: Send {
    /// Send one message
    async fn send(&mut self, message: &Message) -> Result<()>;

    /// Receive the next message, `None` once the peer has closed the stream
    async fn recv(&mut self) -> Result<Option<Message>>;

    /// Close the stream; closing twice is not an error
    async fn close(&mut self) -> Result<()>;
}

fn transport_error(action: &str, e: impl std::fmt::Display) -> anyhow::Error {
    HubError::Transport {
        message: format!("{}: {}", action, e),
    }
    .into()
}

/// Server side of a `/game` websocket
pub struct ServerSocket {
    socket: WebSocket,
}

impl ServerSocket {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl MessageStream for ServerSocket {
    async fn send(&mut self, message: &Message) -> Result<()> {
        let text = message.encode()?;
        self.socket
            .send(AxumMessage::Text(text.into()))
            .await
            .map_err(|e| transport_error("write json msg", e))
    }

    async fn recv(&mut self) -> Result<Option<Message>> {
        while let Some(frame) = self.socket.recv().await {
            let frame = frame.map_err(|e| transport_error("read json msg", e))?;
            match frame {
                AxumMessage::Text(text) => return Message::decode(text.as_str()).map(Some),
                AxumMessage::Binary(bytes) => {
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|e| transport_error("read binary msg", e))?;
                    return Message::decode(text).map(Some);
                }
                AxumMessage::Close(_) => return Ok(None),
                AxumMessage::Ping(_) | AxumMessage::Pong(_) => continue,
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.socket.send(AxumMessage::Close(None)).await {
            debug!("Ignoring close error on server socket: {}", e);
        }
        Ok(())
    }
}

/// Client side websocket connection to a hub server
pub struct ClientSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl ClientSocket {
    pub fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self { stream }
    }

    /// Dial a websocket URL such as `ws://localhost:8080/game`
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| transport_error("websocket dial", e))?;
        Ok(Self::new(stream))
    }
}

#[async_trait]
impl MessageStream for ClientSocket {
    async fn send(&mut self, message: &Message) -> Result<()> {
        let text = message.encode()?;
        self.stream
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| transport_error("write json msg", e))
    }

    async fn recv(&mut self) -> Result<Option<Message>> {
        while let Some(frame) = self.stream.next().await {
            let frame = frame.map_err(|e| transport_error("read json msg", e))?;
            match frame {
                WsMessage::Text(text) => return Message::decode(text.as_str()).map(Some),
                WsMessage::Binary(bytes) => {
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|e| transport_error("read binary msg", e))?;
                    return Message::decode(text).map(Some);
                }
                WsMessage::Close(_) => return Ok(None),
                _ => continue,
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.stream.close(None).await {
            debug!("Ignoring close error on client socket: {}", e);
        }
        Ok(())
    }
}

/// In-memory message stream, one end of a [`MemoryStream::pair`]
#[derive(Debug)]
pub struct MemoryStream {
    tx: Option<mpsc::UnboundedSender<Message>>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl MemoryStream {
    /// Two connected ends; what one sends the other receives
    pub fn pair() -> (MemoryStream, MemoryStream) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            MemoryStream {
                tx: Some(a_tx),
                rx: b_rx,
            },
            MemoryStream {
                tx: Some(b_tx),
                rx: a_rx,
            },
        )
    }
}

#[async_trait]
impl MessageStream for MemoryStream {
    async fn send(&mut self, message: &Message) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| transport_error("write json msg", "stream closed"))?;
        tx.send(message.clone())
            .map_err(|_| transport_error("write json msg", "peer disconnected"))
    }

    async fn recv(&mut self) -> Result<Option<Message>> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        self.rx.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameResult;

    #[tokio::test]
    async fn test_memory_pair_delivers_both_ways() {
        let (mut a, mut b) = MemoryStream::pair();

        a.send(&Message::request_move()).await.unwrap();
        assert_eq!(b.recv().await.unwrap(), Some(Message::request_move()));

        b.send(&Message::walkover(GameResult::Walkover)).await.unwrap();
        assert_eq!(
            a.recv().await.unwrap(),
            Some(Message::walkover(GameResult::Walkover))
        );
    }

    #[tokio::test]
    async fn test_memory_close_ends_peer_stream() {
        let (mut a, mut b) = MemoryStream::pair();
        a.close().await.unwrap();

        assert_eq!(b.recv().await.unwrap(), None);
        assert!(b.send(&Message::request_move()).await.is_err());
        assert!(a.send(&Message::request_move()).await.is_err());
    }
}
