// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! WebSocket transport to a Pit Boss appliance.

use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::ProtocolError;
use crate::protocol::{Inbound, RawFrame, parse_inbound};

/// Capacity of the inbound message channel.
const INBOUND_CHANNEL_CAPACITY: usize = 32;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Transport session bound to one appliance.
///
/// The connection spawns a background reader task that parses incoming
/// messages and forwards them to an internal channel. Text messages become
/// [`Inbound::Status`]/[`Inbound::Ack`]; binary messages are kept verbatim
/// as [`Inbound::Frame`].
///
/// The connection does not own its own lifecycle: the final
/// [`close`](Self::close) is issued through the API client's `stop`.
pub struct WebSocketConnection {
    device_id: String,
    sink: Mutex<WsSink>,
    inbound: Mutex<mpsc::Receiver<Inbound>>,
    reader: parking_lot::Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl WebSocketConnection {
    /// Connects to the appliance behind the given endpoint.
    ///
    /// The device id is appended to the endpoint as the final path segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the WebSocket handshake fails.
    pub async fn connect(
        device_id: impl Into<String>,
        endpoint: &str,
    ) -> Result<Self, ProtocolError> {
        let device_id = device_id.into();
        let url = format!("{}/{}", endpoint.trim_end_matches('/'), device_id);

        tracing::debug!(%device_id, url = %url, "Connecting to appliance");
        let (stream, _response) = connect_async(url.as_str()).await?;
        let (sink, source) = stream.split();

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let reader = tokio::spawn(read_messages(device_id.clone(), source, inbound_tx));

        Ok(Self {
            device_id,
            sink: Mutex::new(sink),
            inbound: Mutex::new(inbound_rx),
            reader: parking_lot::Mutex::new(Some(reader)),
            closed: AtomicBool::new(false),
        })
    }

    /// Returns the device id this connection is bound to.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns `true` once the connection has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Sends a text message to the appliance.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Closed`] after [`close`](Self::close), or a
    /// WebSocket error if the send fails.
    pub async fn send_text(&self, text: String) -> Result<(), ProtocolError> {
        if self.is_closed() {
            return Err(ProtocolError::Closed);
        }
        let mut sink = self.sink.lock().await;
        sink.send(Message::text(text)).await?;
        Ok(())
    }

    /// Receives the next inbound message.
    ///
    /// Returns `None` when the connection reader has stopped (peer close
    /// or read error).
    pub async fn next_inbound(&self) -> Option<Inbound> {
        let mut inbound = self.inbound.lock().await;
        inbound.recv().await
    }

    /// Closes the connection.
    ///
    /// Idempotent: closing an already-closed connection is a no-op.
    ///
    /// # Errors
    ///
    /// Currently infallible; close failures of a dying peer are logged and
    /// ignored.
    pub async fn close(&self) -> Result<(), ProtocolError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.close().await {
            tracing::debug!(device_id = %self.device_id, error = %e, "Close handshake failed");
        }
        drop(sink);

        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }

        tracing::debug!(device_id = %self.device_id, "Connection closed");
        Ok(())
    }
}

impl std::fmt::Debug for WebSocketConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketConnection")
            .field("device_id", &self.device_id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Reads and routes messages until the stream ends or the receiver is gone.
async fn read_messages(
    device_id: String,
    mut source: futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    inbound_tx: mpsc::Sender<Inbound>,
) {
    while let Some(message) = source.next().await {
        match message {
            Ok(Message::Text(text)) => match parse_inbound(&text) {
                Ok(inbound) => {
                    if inbound_tx.send(inbound).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(%device_id, error = %e, "Ignoring unparseable message");
                }
            },
            Ok(Message::Binary(data)) => {
                let frame = Inbound::Frame(RawFrame::new(data.to_vec()));
                if inbound_tx.send(frame).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(%device_id, "Appliance closed the connection");
                break;
            }
            // Ping/pong are handled by the WebSocket layer.
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(%device_id, error = %e, "Read error, stopping reader");
                break;
            }
        }
    }

    tracing::debug!(%device_id, "Reader task stopped");
}
