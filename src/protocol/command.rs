// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Appliance command definitions.
//!
//! Commands are encoded as framed hex strings: a `FE` start byte, an
//! opcode, the argument bytes, and a `FF` end byte. Temperatures are
//! encoded one decimal digit per byte (hundreds, tens, ones), matching the
//! controller firmware.
//!
//! # Examples
//!
//! ```
//! use pitboss_lib::protocol::{Command, SetGrillTemperature, StatusRequest};
//! use pitboss_lib::state::Temperature;
//!
//! assert_eq!(StatusRequest.frame(), "FE0BFF");
//!
//! let cmd = SetGrillTemperature(Temperature::new(225)?);
//! assert_eq!(cmd.frame(), "FE05020205FF");
//! # Ok::<(), pitboss_lib::error::ValueError>(())
//! ```

use crate::state::Temperature;

/// A command that can be sent to a Pit Boss appliance.
pub trait Command {
    /// Returns the command opcode.
    fn opcode(&self) -> u8;

    /// Returns the encoded argument bytes.
    fn args(&self) -> Vec<u8>;

    /// Returns the framed command as an uppercase hex string.
    fn frame(&self) -> String {
        let mut bytes = vec![0xFE, self.opcode()];
        bytes.extend(self.args());
        bytes.push(0xFF);
        bytes.iter().map(|b| format!("{b:02X}")).collect()
    }
}

/// Encodes a temperature one decimal digit per byte.
#[allow(clippy::cast_possible_truncation)] // each digit is 0-9
fn temperature_digits(value: u16) -> Vec<u8> {
    vec![
        (value / 100) as u8,
        (value / 10 % 10) as u8,
        (value % 10) as u8,
    ]
}

/// Requests a full status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRequest;

impl Command for StatusRequest {
    fn opcode(&self) -> u8 {
        0x0B
    }

    fn args(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// Sets the grill chamber target temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetGrillTemperature(pub Temperature);

impl Command for SetGrillTemperature {
    fn opcode(&self) -> u8 {
        0x05
    }

    fn args(&self) -> Vec<u8> {
        temperature_digits(self.0.value())
    }
}

/// Sets the meat probe target temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetProbeTemperature(pub Temperature);

impl Command for SetProbeTemperature {
    fn opcode(&self) -> u8 {
        0x06
    }

    fn args(&self) -> Vec<u8> {
        temperature_digits(self.0.value())
    }
}

/// Turns the hopper light on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetLight(pub bool);

impl Command for SetLight {
    fn opcode(&self) -> u8 {
        0x02
    }

    fn args(&self) -> Vec<u8> {
        vec![u8::from(self.0)]
    }
}

/// Starts or stops the auger primer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetPrimer(pub bool);

impl Command for SetPrimer {
    fn opcode(&self) -> u8 {
        0x08
    }

    fn args(&self) -> Vec<u8> {
        vec![u8::from(self.0)]
    }
}

/// Shuts the grill down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnOff;

impl Command for TurnOff {
    fn opcode(&self) -> u8 {
        0x01
    }

    fn args(&self) -> Vec<u8> {
        Vec::new()
    }
}
