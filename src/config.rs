// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Appliance configuration types.

use std::time::Duration;

use crate::error::ValueError;

/// Default WebSocket endpoint the appliances are reachable through.
///
/// The device id is appended as the final path segment.
pub const DEFAULT_ENDPOINT: &str = "wss://socket.dansonscorp.com/to";

/// Configuration for one Pit Boss appliance.
///
/// The configuration identifies exactly one physical appliance and its
/// communication credentials. It is immutable once handed to
/// [`Integration::setup`](crate::integration::Integration::setup).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use pitboss_lib::config::ApplianceConfig;
///
/// // Minimal configuration
/// let config = ApplianceConfig::new("ABC123", "PBV4PS2");
///
/// // With optional settings
/// let config = ApplianceConfig::new("ABC123", "PBV4PS2")
///     .with_password("secret")
///     .with_command_timeout(Duration::from_secs(3))
///     .with_poll_interval(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct ApplianceConfig {
    device_id: String,
    model: String,
    password: String,
    endpoint: String,
    command_timeout: Duration,
    poll_interval: Duration,
}

impl ApplianceConfig {
    /// Default timeout for a single command round-trip.
    pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default interval between scheduled state refreshes.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

    /// Creates a configuration for the given appliance.
    ///
    /// # Arguments
    ///
    /// * `device_id` - The appliance id printed on the control board
    /// * `model` - The appliance model (e.g., `PBV4PS2`)
    #[must_use]
    pub fn new(device_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            model: model.into(),
            password: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            command_timeout: Self::DEFAULT_COMMAND_TIMEOUT,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the appliance password.
    ///
    /// Appliances without a configured password use the empty default.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Overrides the WebSocket endpoint.
    ///
    /// Mostly useful for tests talking to a local stand-in server.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the timeout for a single command round-trip.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the interval between scheduled state refreshes.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Returns the device id.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the appliance model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the appliance password (empty when unset).
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns the WebSocket endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the command timeout.
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Returns the poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidDeviceId`] if the device id is empty or
    /// contains whitespace.
    pub fn validate(&self) -> Result<(), ValueError> {
        if self.device_id.is_empty() || self.device_id.contains(char::is_whitespace) {
            return Err(ValueError::InvalidDeviceId(self.device_id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = ApplianceConfig::new("ABC123", "PBV4PS2");

        assert_eq!(config.device_id(), "ABC123");
        assert_eq!(config.model(), "PBV4PS2");
        assert_eq!(config.password(), "");
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(
            config.command_timeout(),
            ApplianceConfig::DEFAULT_COMMAND_TIMEOUT
        );
        assert_eq!(config.poll_interval(), ApplianceConfig::DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn config_with_options() {
        let config = ApplianceConfig::new("ABC123", "PBV4PS2")
            .with_password("secret")
            .with_endpoint("ws://127.0.0.1:9000")
            .with_command_timeout(Duration::from_secs(3))
            .with_poll_interval(Duration::from_secs(60));

        assert_eq!(config.password(), "secret");
        assert_eq!(config.endpoint(), "ws://127.0.0.1:9000");
        assert_eq!(config.command_timeout(), Duration::from_secs(3));
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn validate_accepts_plain_id() {
        assert!(ApplianceConfig::new("ABC123", "PBV4PS2").validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_id() {
        let err = ApplianceConfig::new("", "PBV4PS2").validate().unwrap_err();
        assert!(matches!(err, ValueError::InvalidDeviceId(_)));
    }

    #[test]
    fn validate_rejects_whitespace_id() {
        let err = ApplianceConfig::new("AB C", "PBV4PS2").validate().unwrap_err();
        assert!(matches!(err, ValueError::InvalidDeviceId(_)));
    }
}
