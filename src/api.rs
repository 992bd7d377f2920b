// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Appliance API client.
//!
//! [`GrillClient`] wraps a [`WebSocketConnection`] with the appliance's
//! command/response vocabulary. The [`ApplianceApi`] trait is the seam the
//! state coordinator consumes, so tests can substitute the whole client.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use uuid::Uuid;

use crate::error::{Error, ParseError, ProtocolError, Result};
use crate::protocol::command::{
    Command, SetGrillTemperature, SetLight, SetPrimer, SetProbeTemperature, StatusRequest, TurnOff,
};
use crate::protocol::{CommandEnvelope, Inbound, RawFrame, WebSocketConnection};
use crate::state::{RawStatus, Temperature};

/// Default timeout for one command round-trip.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Boundary consumed by the state coordinator.
///
/// Implementations fetch the current appliance status and release the
/// underlying connection on `stop`. Failures indicate connectivity or
/// protocol faults; the coordinator converts them into an availability
/// signal.
pub trait ApplianceApi: Send + Sync {
    /// Fetches the current appliance status.
    fn fetch_status(&self) -> impl Future<Output = Result<RawStatus>> + Send;

    /// Releases the underlying connection.
    ///
    /// Must be idempotent: stopping an already-stopped client is a no-op.
    fn stop(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Protocol-level client for one Pit Boss appliance.
///
/// The client serializes command round-trips: one command is in flight at
/// a time, and each waits for its matching acknowledgement (or a status
/// report, for status requests) within the configured timeout.
///
/// # Examples
///
/// ```no_run
/// use pitboss_lib::api::{ApplianceApi, GrillClient};
/// use pitboss_lib::config::DEFAULT_ENDPOINT;
/// use pitboss_lib::protocol::WebSocketConnection;
/// use pitboss_lib::state::Temperature;
///
/// # async fn example() -> pitboss_lib::error::Result<()> {
/// let conn = WebSocketConnection::connect("ABC123", DEFAULT_ENDPOINT).await?;
/// let client = GrillClient::new(conn, "PBV4PS2", "");
///
/// let status = client.fetch_status().await?;
/// println!("grill at {:?}", status.grill_temp);
///
/// client.set_grill_temperature(Temperature::new(225)?).await?;
/// client.stop().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GrillClient {
    conn: WebSocketConnection,
    model: String,
    password: String,
    timeout: Duration,
    command_lock: tokio::sync::Mutex<()>,
    last_frame: parking_lot::RwLock<Option<RawFrame>>,
    stopped: AtomicBool,
}

impl GrillClient {
    /// Creates a client over an established connection.
    ///
    /// # Arguments
    ///
    /// * `conn` - The transport session
    /// * `model` - The appliance model (e.g., `PBV4PS2`)
    /// * `password` - The appliance password (empty when unset)
    #[must_use]
    pub fn new(
        conn: WebSocketConnection,
        model: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            model: model.into(),
            password: password.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            command_lock: tokio::sync::Mutex::new(()),
            last_frame: parking_lot::RwLock::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    /// Sets the command round-trip timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the appliance model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the device id of the underlying connection.
    #[must_use]
    pub fn device_id(&self) -> &str {
        self.conn.device_id()
    }

    /// Returns the most recently received binary frame, if any.
    #[must_use]
    pub fn last_frame(&self) -> Option<RawFrame> {
        self.last_frame.read().clone()
    }

    /// Sets the grill chamber target temperature.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or the appliance rejects it.
    pub async fn set_grill_temperature(&self, target: Temperature) -> Result<()> {
        self.send_command(&SetGrillTemperature(target)).await
    }

    /// Sets the meat probe target temperature.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or the appliance rejects it.
    pub async fn set_probe_temperature(&self, target: Temperature) -> Result<()> {
        self.send_command(&SetProbeTemperature(target)).await
    }

    /// Turns the hopper light on or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or the appliance rejects it.
    pub async fn set_light(&self, on: bool) -> Result<()> {
        self.send_command(&SetLight(on)).await
    }

    /// Starts or stops the auger primer.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or the appliance rejects it.
    pub async fn set_primer(&self, on: bool) -> Result<()> {
        self.send_command(&SetPrimer(on)).await
    }

    /// Shuts the grill down.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or the appliance rejects it.
    pub async fn turn_off(&self) -> Result<()> {
        self.send_command(&TurnOff).await
    }

    /// Builds an outbound envelope for a command.
    fn envelope(&self, command: &impl Command) -> CommandEnvelope {
        CommandEnvelope {
            id: Uuid::new_v4().to_string(),
            data: command.frame(),
            auth: if self.password.is_empty() {
                None
            } else {
                Some(self.password.clone())
            },
        }
    }

    fn timeout_error(&self) -> Error {
        // Safe: timeout in practical use will never exceed u64::MAX milliseconds
        #[allow(clippy::cast_possible_truncation)]
        let millis = self.timeout.as_millis() as u64;
        Error::Protocol(ProtocolError::Timeout(millis))
    }

    fn ensure_running(&self) -> Result<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(Error::Stopped);
        }
        Ok(())
    }

    /// Sends a command and waits for its acknowledgement.
    async fn send_command(&self, command: &impl Command) -> Result<()> {
        self.ensure_running()?;
        let _guard = self.command_lock.lock().await;

        let envelope = self.envelope(command);
        let id = envelope.id.clone();
        let payload = serde_json::to_string(&envelope).map_err(ParseError::Json)?;

        tracing::debug!(device_id = %self.device_id(), data = %envelope.data, "Sending command");
        self.conn.send_text(payload).await.map_err(Error::Protocol)?;

        let wait = async {
            loop {
                let inbound = self.conn.next_inbound().await.ok_or_else(|| {
                    Error::Protocol(ProtocolError::ChannelClosed(
                        "connection reader stopped".to_string(),
                    ))
                })?;
                match inbound {
                    Inbound::Ack { id: ack_id, result } if ack_id == id => {
                        if result == Some(serde_json::Value::Bool(false)) {
                            return Err(Error::CommandRejected(envelope.data.clone()));
                        }
                        return Ok(());
                    }
                    Inbound::Frame(frame) => *self.last_frame.write() = Some(frame),
                    // Unrelated acks and status pushes are dropped here;
                    // the next scheduled refresh picks the state up again.
                    _ => {}
                }
            }
        };

        tokio::time::timeout(self.timeout, wait)
            .await
            .map_err(|_| self.timeout_error())?
    }
}

impl ApplianceApi for GrillClient {
    /// Requests a status report and waits for the response.
    async fn fetch_status(&self) -> Result<RawStatus> {
        self.ensure_running()?;
        let _guard = self.command_lock.lock().await;

        let envelope = self.envelope(&StatusRequest);
        let payload = serde_json::to_string(&envelope).map_err(ParseError::Json)?;

        tracing::debug!(device_id = %self.device_id(), "Requesting status");
        self.conn.send_text(payload).await.map_err(Error::Protocol)?;

        let wait = async {
            loop {
                let inbound = self.conn.next_inbound().await.ok_or_else(|| {
                    Error::Protocol(ProtocolError::ChannelClosed(
                        "connection reader stopped".to_string(),
                    ))
                })?;
                match inbound {
                    Inbound::Status(mut status) => {
                        status.raw = self.last_frame.read().clone();
                        return Ok(status);
                    }
                    Inbound::Frame(frame) => *self.last_frame.write() = Some(frame),
                    Inbound::Ack { .. } => {}
                }
            }
        };

        tokio::time::timeout(self.timeout, wait)
            .await
            .map_err(|_| self.timeout_error())?
    }

    /// Closes the underlying connection.
    async fn stop(&self) -> Result<()> {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!(device_id = %self.device_id(), "Stopping API client");
        self.conn.close().await.map_err(Error::Protocol)
    }
}
