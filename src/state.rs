// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Appliance state representation.
//!
//! The appliance reports its state as a partial JSON object ([`RawStatus`]).
//! The coordinator normalizes each report into an immutable
//! [`StateSnapshot`] that is shared by reference with every entity reading
//! it; a new snapshot atomically replaces the previous one on each
//! successful refresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::protocol::RawFrame;

/// A target temperature accepted by the appliance.
///
/// Pit Boss controllers accept set points between 150 and 500 degrees
/// Fahrenheit; the same bounds are applied to probe targets.
///
/// # Examples
///
/// ```
/// use pitboss_lib::state::Temperature;
///
/// let temp = Temperature::new(225)?;
/// assert_eq!(temp.value(), 225);
///
/// assert!(Temperature::new(900).is_err());
/// # Ok::<(), pitboss_lib::error::ValueError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Temperature(u16);

impl Temperature {
    /// Minimum accepted set point.
    pub const MIN: u16 = 150;
    /// Maximum accepted set point.
    pub const MAX: u16 = 500;

    /// Creates a new temperature set point.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::OutOfRange`] if the value is outside
    /// `[150, 500]`.
    pub fn new(value: u16) -> Result<Self, ValueError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ValueError::OutOfRange {
                min: Self::MIN,
                max: Self::MAX,
                actual: value,
            });
        }
        Ok(Self(value))
    }

    /// Returns the raw value.
    #[must_use]
    pub fn value(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for Temperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Temperature unit the appliance is reporting in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TemperatureUnit {
    /// Degrees Fahrenheit.
    Fahrenheit,
    /// Degrees Celsius.
    Celsius,
}

/// Raw status payload as reported by the appliance.
///
/// Every field is optional because the appliance sends partial updates:
/// a report carries only the values that the controller chose to include.
/// Field names follow the wire format.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawStatus {
    /// Current grill chamber temperature.
    pub grill_temp: Option<u16>,
    /// Grill chamber set point.
    pub grill_set_temp: Option<u16>,
    /// Meat probe 1 temperature.
    pub p1_temp: Option<u16>,
    /// Meat probe 2 temperature.
    pub p2_temp: Option<u16>,
    /// Meat probe 3 temperature.
    pub p3_temp: Option<u16>,
    /// Meat probe 4 temperature.
    pub p4_temp: Option<u16>,
    /// Meat probe 1 set point.
    pub p1_set_temp: Option<u16>,
    /// Whether the control module is powered on.
    pub module_is_on: Option<bool>,
    /// Whether the hopper light is on.
    pub light_state: Option<bool>,
    /// Whether the auger primer is running.
    pub prime_state: Option<bool>,
    /// Whether the combustion fan is running.
    pub fan_state: Option<bool>,
    /// Whether the igniter is hot.
    pub hot_state: Option<bool>,
    /// Whether the auger motor is running.
    pub motor_state: Option<bool>,
    /// Whether temperatures are reported in Fahrenheit.
    pub is_fahrenheit: Option<bool>,
    /// Pellet hopper is empty.
    pub no_pellets: Option<bool>,
    /// Combustion fan fault.
    pub fan_err: Option<bool>,
    /// Igniter fault.
    pub hot_err: Option<bool>,
    /// Auger motor fault.
    pub motor_err: Option<bool>,
    /// Chamber temperature exceeded the safe limit.
    pub high_temp_err: Option<bool>,
    /// Raw wire frame the report was received alongside, if any.
    #[serde(skip)]
    pub raw: Option<RawFrame>,
}

/// Fault flags reported by the appliance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GrillErrors {
    /// Pellet hopper is empty.
    pub no_pellets: bool,
    /// Combustion fan fault.
    pub fan: bool,
    /// Igniter fault.
    pub igniter: bool,
    /// Auger motor fault.
    pub motor: bool,
    /// Chamber temperature exceeded the safe limit.
    pub high_temp: bool,
}

impl GrillErrors {
    /// Returns `true` if any fault flag is set.
    #[must_use]
    pub fn any(&self) -> bool {
        self.no_pellets || self.fan || self.igniter || self.motor || self.high_temp
    }
}

/// Normalized view of the appliance state at one point in time.
///
/// Snapshots are immutable: the coordinator builds a fresh snapshot from
/// each successful status fetch and publishes it whole. Readers therefore
/// never observe a partially updated value.
///
/// # Examples
///
/// ```
/// use pitboss_lib::state::{RawStatus, StateSnapshot};
///
/// let status = RawStatus {
///     grill_temp: Some(210),
///     grill_set_temp: Some(225),
///     module_is_on: Some(true),
///     ..RawStatus::default()
/// };
/// let snapshot = StateSnapshot::from_status(&status);
///
/// assert_eq!(snapshot.grill_temp(), Some(210));
/// assert_eq!(snapshot.grill_target(), Some(225));
/// assert_eq!(snapshot.is_on(), Some(true));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    grill_temp: Option<u16>,
    grill_target: Option<u16>,
    probe_temps: [Option<u16>; 4],
    probe_target: Option<u16>,
    module_on: Option<bool>,
    light_on: Option<bool>,
    primer_on: Option<bool>,
    fan_on: Option<bool>,
    igniter_on: Option<bool>,
    auger_on: Option<bool>,
    errors: GrillErrors,
    unit: Option<TemperatureUnit>,
    fetched_at: DateTime<Utc>,
}

impl StateSnapshot {
    /// Normalizes a raw status report into a snapshot.
    ///
    /// Unreported boolean fields stay unknown (`None`); unreported fault
    /// flags are treated as clear.
    #[must_use]
    pub fn from_status(status: &RawStatus) -> Self {
        Self {
            grill_temp: status.grill_temp,
            grill_target: status.grill_set_temp,
            probe_temps: [
                status.p1_temp,
                status.p2_temp,
                status.p3_temp,
                status.p4_temp,
            ],
            probe_target: status.p1_set_temp,
            module_on: status.module_is_on,
            light_on: status.light_state,
            primer_on: status.prime_state,
            fan_on: status.fan_state,
            igniter_on: status.hot_state,
            auger_on: status.motor_state,
            errors: GrillErrors {
                no_pellets: status.no_pellets.unwrap_or(false),
                fan: status.fan_err.unwrap_or(false),
                igniter: status.hot_err.unwrap_or(false),
                motor: status.motor_err.unwrap_or(false),
                high_temp: status.high_temp_err.unwrap_or(false),
            },
            unit: status.is_fahrenheit.map(|f| {
                if f {
                    TemperatureUnit::Fahrenheit
                } else {
                    TemperatureUnit::Celsius
                }
            }),
            fetched_at: Utc::now(),
        }
    }

    /// Current grill chamber temperature.
    #[must_use]
    pub fn grill_temp(&self) -> Option<u16> {
        self.grill_temp
    }

    /// Grill chamber set point.
    #[must_use]
    pub fn grill_target(&self) -> Option<u16> {
        self.grill_target
    }

    /// Temperature of a meat probe.
    ///
    /// # Arguments
    ///
    /// * `index` - The probe index (1-4)
    ///
    /// # Returns
    ///
    /// Returns `None` if the index is out of range or the probe is
    /// disconnected.
    #[must_use]
    pub fn probe_temp(&self, index: u8) -> Option<u16> {
        if index == 0 || index > 4 {
            return None;
        }
        self.probe_temps[usize::from(index - 1)]
    }

    /// Meat probe 1 set point.
    #[must_use]
    pub fn probe_target(&self) -> Option<u16> {
        self.probe_target
    }

    /// Whether the control module is powered on.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        self.module_on
    }

    /// Whether the hopper light is on.
    #[must_use]
    pub fn light_on(&self) -> Option<bool> {
        self.light_on
    }

    /// Whether the auger primer is running.
    #[must_use]
    pub fn primer_on(&self) -> Option<bool> {
        self.primer_on
    }

    /// Whether the combustion fan is running.
    #[must_use]
    pub fn fan_on(&self) -> Option<bool> {
        self.fan_on
    }

    /// Whether the igniter is hot.
    #[must_use]
    pub fn igniter_on(&self) -> Option<bool> {
        self.igniter_on
    }

    /// Whether the auger motor is running.
    #[must_use]
    pub fn auger_on(&self) -> Option<bool> {
        self.auger_on
    }

    /// Fault flags.
    #[must_use]
    pub fn errors(&self) -> &GrillErrors {
        &self.errors
    }

    /// Temperature unit the appliance is reporting in.
    #[must_use]
    pub fn unit(&self) -> Option<TemperatureUnit> {
        self.unit
    }

    /// Time the snapshot was fetched.
    #[must_use]
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}
