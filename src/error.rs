// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `PitBoss` library.
//!
//! This module provides a comprehensive error hierarchy for handling failures
//! across the library: value validation, WebSocket communication, payload
//! parsing, and coordinator lifecycle misuse.

use thiserror::Error;

/// The main error type for this library.
///
/// This enum encompasses all possible errors that can occur when interacting
/// with Pit Boss appliances.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during protocol communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a payload.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The appliance acknowledged a command negatively.
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// The coordinator has not completed its first refresh.
    #[error("coordinator has not completed its first refresh")]
    NotReady,

    /// The coordinator already completed its first refresh.
    #[error("coordinator is already initialized")]
    AlreadyInitialized,

    /// The coordinator (or API client) has been stopped.
    #[error("coordinator is stopped")]
    Stopped,

    /// An entity platform failed to activate.
    #[error("platform error: {0}")]
    Platform(String),
}

/// Errors related to value validation and constraints.
///
/// These errors occur when attempting to create constrained types
/// with invalid values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },

    /// The configured device id is empty or malformed.
    #[error("invalid device id: {0:?}")]
    InvalidDeviceId(String),
}

/// Errors related to WebSocket communication with the appliance.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The WebSocket layer reported an error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection to the appliance failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The connection has been closed.
    #[error("connection is closed")]
    Closed,

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors related to parsing appliance payloads.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected payload format.
    #[error("unexpected payload format: {0}")]
    UnexpectedFormat(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
