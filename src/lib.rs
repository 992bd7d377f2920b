// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `PitBoss` Lib - A Rust library to integrate Pit Boss grills and smokers
//! with home automation platforms.
//!
//! The library owns the WebSocket connection to one appliance, keeps a
//! normalized state snapshot fresh through a polling coordinator, and
//! sequences integration setup and teardown so entities are never active
//! against a dead connection.
//!
//! # Components
//!
//! - **Connection & API client**: WebSocket transport plus the appliance
//!   command vocabulary (status requests, temperature set points, light,
//!   primer, shutdown)
//! - **State coordinator**: single-flight state refresh with atomic
//!   snapshot publication and availability tracking
//! - **Integration lifecycle**: first refresh before entity platforms
//!   activate, platforms deactivated before the connection stops
//! - **Binary-tolerant encoding**: JSON export that renders raw wire
//!   frames as base64 text instead of failing
//!
//! # Quick Start
//!
//! ## Loading an integration
//!
//! ```no_run
//! use pitboss_lib::config::ApplianceConfig;
//! use pitboss_lib::coordinator::CoordinatorHandle;
//! use pitboss_lib::integration::Integration;
//! use pitboss_lib::platform::{EntityPlatforms, Platform};
//!
//! struct HostPlatforms;
//!
//! impl EntityPlatforms for HostPlatforms {
//!     async fn setup(
//!         &self,
//!         platform: Platform,
//!         handle: CoordinatorHandle,
//!     ) -> pitboss_lib::error::Result<()> {
//!         println!("activating {platform} for {}", handle.device_info().name());
//!         Ok(())
//!     }
//!
//!     async fn unload(&self, _platform: Platform) -> bool {
//!         true
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> pitboss_lib::error::Result<()> {
//!     let config = ApplianceConfig::new("ABC123", "PBV4PS2").with_password("secret");
//!     let mut integration = Integration::setup(&config, HostPlatforms).await?;
//!
//!     // Keep the state fresh on the configured schedule.
//!     let coordinator = std::sync::Arc::clone(integration.coordinator());
//!     let polling = coordinator.spawn_polling(config.poll_interval());
//!
//!     // ... run until the host unloads the entry ...
//!     integration.unload().await;
//!     polling.await.ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Driving the appliance directly
//!
//! ```no_run
//! use pitboss_lib::api::{ApplianceApi, GrillClient};
//! use pitboss_lib::config::DEFAULT_ENDPOINT;
//! use pitboss_lib::protocol::WebSocketConnection;
//! use pitboss_lib::state::Temperature;
//!
//! #[tokio::main]
//! async fn main() -> pitboss_lib::error::Result<()> {
//!     let conn = WebSocketConnection::connect("ABC123", DEFAULT_ENDPOINT).await?;
//!     let client = GrillClient::new(conn, "PBV4PS2", "");
//!
//!     let status = client.fetch_status().await?;
//!     println!("grill at {:?}, target {:?}", status.grill_temp, status.grill_set_temp);
//!
//!     client.set_grill_temperature(Temperature::new(225)?).await?;
//!     client.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Exporting diagnostics
//!
//! Appliance controllers occasionally emit raw binary frames; diagnostics
//! keep them verbatim, and [`encoding`] renders them as base64 text so the
//! export never fails on binary data:
//!
//! ```no_run
//! # use pitboss_lib::coordinator::StateCoordinator;
//! # use pitboss_lib::api::GrillClient;
//! # fn example(coordinator: &StateCoordinator<GrillClient>) -> serde_json::Result<()> {
//! let json = coordinator.diagnostics().to_json()?;
//! println!("{json}");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod coordinator;
pub mod device_info;
pub mod encoding;
pub mod error;
pub mod integration;
pub mod platform;
pub mod protocol;
pub mod state;
pub mod subscription;

pub use api::{ApplianceApi, GrillClient};
pub use config::{ApplianceConfig, DEFAULT_ENDPOINT};
pub use coordinator::{
    CoordinatorHandle, CoordinatorPhase, CoordinatorUpdate, Diagnostics, StateCoordinator,
};
pub use device_info::{DeviceInfo, MANUFACTURER};
pub use error::{Error, ParseError, ProtocolError, Result, ValueError};
pub use integration::Integration;
pub use platform::{EntityPlatforms, Platform};
pub use protocol::{RawFrame, WebSocketConnection};
pub use state::{GrillErrors, RawStatus, StateSnapshot, Temperature, TemperatureUnit};
pub use subscription::{CallbackRegistry, SubscriptionId};
