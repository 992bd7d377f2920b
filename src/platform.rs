// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity platform boundary.
//!
//! The host automation platform presents one appliance as a fixed set of
//! entity platforms. The integration activates them together after the
//! first refresh and deactivates them before releasing the connection; the
//! host supplies the actual entity construction behind the
//! [`EntityPlatforms`] trait.

use std::future::Future;

use crate::coordinator::CoordinatorHandle;
use crate::error::Result;

/// An entity platform kind exposed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Fault and status indicators.
    BinarySensor,
    /// Grill temperature control.
    Climate,
    /// Hopper light.
    Light,
    /// Temperatures and probe readings.
    Sensor,
    /// Power and primer switches.
    Switch,
}

impl Platform {
    /// Every platform the integration activates, in activation order.
    pub const ALL: [Platform; 5] = [
        Platform::BinarySensor,
        Platform::Climate,
        Platform::Light,
        Platform::Sensor,
        Platform::Switch,
    ];

    /// Returns the platform's canonical name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::BinarySensor => "binary_sensor",
            Platform::Climate => "climate",
            Platform::Light => "light",
            Platform::Sensor => "sensor",
            Platform::Switch => "switch",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host-side construction and teardown of entity platforms.
///
/// `setup` receives a [`CoordinatorHandle`] through which the platform's
/// entities read the shared snapshot, availability, and device info.
/// `unload` tears one platform down and reports whether it succeeded; a
/// `false` return keeps the integration (and its connection) alive.
pub trait EntityPlatforms: Send + Sync {
    /// Activates one entity platform.
    fn setup(
        &self,
        platform: Platform,
        handle: CoordinatorHandle,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Deactivates one entity platform, returning whether it succeeded.
    fn unload(&self, platform: Platform) -> impl Future<Output = bool> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_contains_every_platform_once() {
        assert_eq!(Platform::ALL.len(), 5);
        let mut seen = std::collections::HashSet::new();
        for platform in Platform::ALL {
            assert!(seen.insert(platform));
        }
    }

    #[test]
    fn platform_names() {
        assert_eq!(Platform::BinarySensor.as_str(), "binary_sensor");
        assert_eq!(Platform::Climate.to_string(), "climate");
        assert_eq!(Platform::Switch.to_string(), "switch");
    }
}
