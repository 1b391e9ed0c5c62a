//! The socket handed to WebSocket actions.
//!
//! The upgraded transport is boxed so the controller can own a single
//! concrete [`WebSocket`] type regardless of what I/O sits underneath.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, instrument};
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::protocol::{CloseFrame, Role};
use tungstenite::Message;

use crate::error::{WsError, WsResult};

/// Any transport a WebSocket can run over.
pub trait SocketIo: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> SocketIo for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

type BoxedIo = Box<dyn SocketIo>;
type Sink = SplitSink<WebSocketStream<BoxedIo>, Message>;

/// An established WebSocket connection.
///
/// Actions that declare a `WebSocket` argument receive the connection by
/// value; they typically move it into a spawned task that drives the
/// conversation.
///
/// # Example
///
/// ```ignore
/// use meridian_ws::{Message, WebSocket};
///
/// fn echo(ws: WebSocket) {
///     tokio::spawn(async move {
///         let mut ws = ws;
///         while let Some(Ok(msg)) = ws.recv().await {
///             if msg.is_text() {
///                 let _ = ws.send(msg).await;
///             }
///         }
///     });
/// }
/// ```
pub struct WebSocket {
    sender: Arc<Mutex<Sink>>,
    receiver: SplitStream<WebSocketStream<BoxedIo>>,
    connected_at: Instant,
    closed: bool,
}

impl WebSocket {
    /// Completes the server side of an upgrade over `io`.
    pub async fn accept<S: SocketIo>(io: S) -> Self {
        Self::from_raw(io, Role::Server).await
    }

    /// Wraps the client side of an already-upgraded stream.
    pub async fn client<S: SocketIo>(io: S) -> Self {
        Self::from_raw(io, Role::Client).await
    }

    async fn from_raw<S: SocketIo>(io: S, role: Role) -> Self {
        let boxed: BoxedIo = Box::new(io);
        let stream = WebSocketStream::from_raw_socket(boxed, role, None).await;
        let (sender, receiver) = stream.split();
        debug!(?role, "websocket established");
        Self {
            sender: Arc::new(Mutex::new(sender)),
            receiver,
            connected_at: Instant::now(),
            closed: false,
        }
    }

    /// When the connection was established.
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Check if the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Receive the next message.
    ///
    /// Returns `None` once the peer has gone away. A close frame is
    /// returned to the caller and marks the socket closed.
    #[instrument(skip(self))]
    pub async fn recv(&mut self) -> Option<WsResult<Message>> {
        if self.closed {
            return None;
        }

        match self.receiver.next().await {
            Some(Ok(msg)) => {
                if msg.is_close() {
                    debug!("received close frame");
                    self.closed = true;
                }
                Some(Ok(msg))
            }
            Some(Err(e)) => {
                self.closed = true;
                Some(Err(WsError::from(e)))
            }
            None => {
                self.closed = true;
                None
            }
        }
    }

    /// Send a message.
    pub async fn send(&self, msg: Message) -> WsResult<()> {
        if self.closed {
            return Err(WsError::ConnectionClosed);
        }
        self.sender.lock().await.send(msg).await?;
        Ok(())
    }

    /// Send a text message.
    pub async fn send_text(&self, text: impl Into<String>) -> WsResult<()> {
        self.send(Message::text(text.into())).await
    }

    /// Send a binary message.
    pub async fn send_binary(&self, data: impl Into<Vec<u8>>) -> WsResult<()> {
        self.send(Message::binary(data.into())).await
    }

    /// Send a normal close frame. Closing twice is a no-op.
    pub async fn close(&mut self, reason: impl Into<String>) -> WsResult<()> {
        if self.closed {
            return Ok(());
        }
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: reason.into().into(),
        };
        self.send(Message::Close(Some(frame))).await?;
        self.closed = true;
        Ok(())
    }

    /// A cloneable handle for sending from other tasks.
    pub fn sender(&self) -> WebSocketSender {
        WebSocketSender {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl fmt::Debug for WebSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocket")
            .field("connected_at", &self.connected_at)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// A handle for sending messages to a [`WebSocket`] from other tasks.
#[derive(Clone)]
pub struct WebSocketSender {
    sender: Arc<Mutex<Sink>>,
}

impl WebSocketSender {
    /// Send a message.
    pub async fn send(&self, msg: Message) -> WsResult<()> {
        self.sender.lock().await.send(msg).await?;
        Ok(())
    }

    /// Send a text message.
    pub async fn send_text(&self, text: impl Into<String>) -> WsResult<()> {
        self.send(Message::text(text.into())).await
    }
}

impl fmt::Debug for WebSocketSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketSender").finish_non_exhaustive()
    }
}
