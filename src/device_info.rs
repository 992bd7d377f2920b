// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static descriptive metadata for a configured appliance.

use serde::Serialize;

use crate::config::ApplianceConfig;

/// Manufacturer name reported for every appliance.
pub const MANUFACTURER: &str = "Pit Boss";

/// Static descriptive metadata derived from the appliance configuration.
///
/// The record is immutable for the life of an integration instance and is
/// shared with every entity presented to the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    identifier: String,
    name: String,
    model: String,
    manufacturer: &'static str,
}

impl DeviceInfo {
    /// Derives the device info record from an appliance configuration.
    #[must_use]
    pub fn from_config(config: &ApplianceConfig) -> Self {
        Self {
            identifier: config.device_id().to_string(),
            name: config.device_id().to_string(),
            model: config.model().to_string(),
            manufacturer: MANUFACTURER,
        }
    }

    /// Returns the unique appliance identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the appliance model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the manufacturer name.
    #[must_use]
    pub fn manufacturer(&self) -> &str {
        self.manufacturer
    }
}
