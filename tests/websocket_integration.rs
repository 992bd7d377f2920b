// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests driving the full stack against a fake appliance
//! served over a local WebSocket listener.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use pitboss_lib::api::{ApplianceApi, GrillClient};
use pitboss_lib::config::ApplianceConfig;
use pitboss_lib::coordinator::{CoordinatorHandle, StateCoordinator};
use pitboss_lib::device_info::DeviceInfo;
use pitboss_lib::error::Result;
use pitboss_lib::integration::Integration;
use pitboss_lib::platform::{EntityPlatforms, Platform};
use pitboss_lib::protocol::WebSocketConnection;
use pitboss_lib::state::Temperature;

// ============================================================================
// Fake appliance
// ============================================================================

/// Scripted behavior of the fake appliance.
#[derive(Clone, Default)]
struct Appliance {
    inner: Arc<ApplianceInner>,
}

#[derive(Default)]
struct ApplianceInner {
    /// Number of status requests answered so far.
    status_requests: AtomicUsize,
    /// Command frames received (everything except status requests).
    commands: parking_lot::Mutex<Vec<String>>,
    /// Stop answering status requests after this many responses.
    mute_after: parking_lot::Mutex<Option<usize>>,
    /// Emit a raw binary frame before each status response.
    send_binary_frame: parking_lot::Mutex<bool>,
}

impl Appliance {
    fn new() -> Self {
        Self::default()
    }

    fn mute_after(self, responses: usize) -> Self {
        *self.inner.mute_after.lock() = Some(responses);
        self
    }

    fn with_binary_frames(self) -> Self {
        *self.inner.send_binary_frame.lock() = true;
        self
    }

    fn commands(&self) -> Vec<String> {
        self.inner.commands.lock().clone()
    }

    /// Binds a listener and serves sessions until the test ends.
    ///
    /// Returns the endpoint to hand to [`WebSocketConnection::connect`].
    async fn serve(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("ws://{}", listener.local_addr().unwrap());

        let appliance = self.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(appliance.clone().session(stream));
            }
        });

        endpoint
    }

    async fn session(self, stream: TcpStream) {
        let mut ws = accept_async(stream).await.unwrap();

        while let Some(Ok(message)) = ws.next().await {
            let Message::Text(text) = message else {
                continue;
            };
            let envelope: serde_json::Value = serde_json::from_str(&text).unwrap();
            let id = envelope["id"].as_str().unwrap().to_string();
            let data = envelope["data"].as_str().unwrap().to_string();

            if data == "FE0BFF" {
                let n = self.inner.status_requests.load(Ordering::SeqCst);
                if let Some(limit) = *self.inner.mute_after.lock()
                    && n >= limit
                {
                    // Simulate an unreachable controller: swallow the request.
                    continue;
                }
                self.inner.status_requests.fetch_add(1, Ordering::SeqCst);

                if *self.inner.send_binary_frame.lock() {
                    ws.send(Message::binary(vec![0xFE, 0x0B, 0xFF])).await.unwrap();
                }

                let temp = 200 + n;
                let status = format!(
                    r#"{{"status":{{"grillTemp":{temp},"grillSetTemp":225,"moduleIsOn":true,"isFahrenheit":true}}}}"#
                );
                ws.send(Message::text(status)).await.unwrap();
            } else {
                self.inner.commands.lock().push(data);
                ws.send(Message::text(format!(r#"{{"id":"{id}","result":true}}"#)))
                    .await
                    .unwrap();
            }
        }
    }
}

async fn connect_client(appliance: &Appliance) -> GrillClient {
    let endpoint = appliance.serve().await;
    let conn = WebSocketConnection::connect("ABC123", &endpoint).await.unwrap();
    GrillClient::new(conn, "PBV4PS2", "").with_timeout(Duration::from_millis(500))
}

// ============================================================================
// Client round-trips
// ============================================================================

#[tokio::test]
async fn fetch_status_round_trip() {
    let appliance = Appliance::new();
    let client = connect_client(&appliance).await;

    let status = client.fetch_status().await.unwrap();

    assert_eq!(status.grill_temp, Some(200));
    assert_eq!(status.grill_set_temp, Some(225));
    assert_eq!(status.module_is_on, Some(true));
    assert_eq!(status.is_fahrenheit, Some(true));
}

#[tokio::test]
async fn commands_are_framed_and_acknowledged() {
    let appliance = Appliance::new();
    let client = connect_client(&appliance).await;

    client
        .set_grill_temperature(Temperature::new(225).unwrap())
        .await
        .unwrap();
    client.set_light(true).await.unwrap();
    client.turn_off().await.unwrap();

    assert_eq!(
        appliance.commands(),
        vec!["FE05020205FF", "FE0201FF", "FE01FF"]
    );
}

#[tokio::test]
async fn unanswered_request_times_out() {
    let appliance = Appliance::new().mute_after(0);
    let client = connect_client(&appliance).await;

    let err = client.fetch_status().await.unwrap_err();
    assert!(matches!(
        err,
        pitboss_lib::error::Error::Protocol(pitboss_lib::error::ProtocolError::Timeout(_))
    ));
}

#[tokio::test]
async fn client_stop_is_idempotent() {
    let appliance = Appliance::new();
    let client = connect_client(&appliance).await;

    client.stop().await.unwrap();
    client.stop().await.unwrap();

    // A stopped client refuses further commands.
    assert!(client.fetch_status().await.is_err());
}

// ============================================================================
// Coordinator over a live connection
// ============================================================================

#[tokio::test]
async fn coordinator_refresh_over_live_connection() {
    let appliance = Appliance::new();
    let client = connect_client(&appliance).await;
    let info = DeviceInfo::from_config(&ApplianceConfig::new("ABC123", "PBV4PS2"));
    let coordinator = StateCoordinator::new(client, info);

    coordinator.first_refresh().await.unwrap();
    assert!(coordinator.is_available());
    assert_eq!(coordinator.snapshot().unwrap().grill_temp(), Some(200));

    coordinator.refresh().await.unwrap();
    assert_eq!(coordinator.snapshot().unwrap().grill_temp(), Some(201));

    coordinator.stop().await.unwrap();
}

#[tokio::test]
async fn coordinator_marks_unavailable_on_timeout_and_retains_snapshot() {
    let appliance = Appliance::new().mute_after(1);
    let client = connect_client(&appliance).await;
    let info = DeviceInfo::from_config(&ApplianceConfig::new("ABC123", "PBV4PS2"));
    let coordinator = StateCoordinator::new(client, info);

    coordinator.first_refresh().await.unwrap();
    assert!(coordinator.is_available());

    // The controller stopped answering: the refresh times out, the
    // appliance goes unavailable, and the last snapshot is retained.
    coordinator.refresh().await.unwrap();
    assert!(!coordinator.is_available());
    assert_eq!(coordinator.snapshot().unwrap().grill_temp(), Some(200));

    coordinator.stop().await.unwrap();
}

#[tokio::test]
async fn diagnostics_capture_binary_frames() {
    let appliance = Appliance::new().with_binary_frames();
    let client = connect_client(&appliance).await;
    let info = DeviceInfo::from_config(&ApplianceConfig::new("ABC123", "PBV4PS2"));
    let coordinator = StateCoordinator::new(client, info);

    coordinator.first_refresh().await.unwrap();

    let json = coordinator.diagnostics().to_json().unwrap();
    // The raw FE0BFF frame is rendered as base64 text, not a byte array.
    assert!(json.contains("\"last_frame\":\"/gv/\""));

    coordinator.stop().await.unwrap();
}

// ============================================================================
// Full lifecycle
// ============================================================================

#[derive(Default)]
struct RecordingPlatforms {
    setups: parking_lot::Mutex<Vec<Platform>>,
    unloads: parking_lot::Mutex<Vec<Platform>>,
}

/// Shareable handle to [`RecordingPlatforms`].
///
/// The trait cannot be implemented directly for `Arc<RecordingPlatforms>`
/// from this external test crate (orphan rule), so a local newtype carries
/// the impl while the test retains its own clone of the inner `Arc`.
#[derive(Clone)]
struct SharedPlatforms(Arc<RecordingPlatforms>);

impl EntityPlatforms for SharedPlatforms {
    async fn setup(&self, platform: Platform, handle: CoordinatorHandle) -> Result<()> {
        assert!(handle.is_available());
        self.0.setups.lock().push(platform);
        Ok(())
    }

    async fn unload(&self, platform: Platform) -> bool {
        self.0.unloads.lock().push(platform);
        true
    }
}

#[tokio::test]
async fn full_lifecycle_against_fake_appliance() {
    let appliance = Appliance::new();
    let endpoint = appliance.serve().await;
    let config = ApplianceConfig::new("ABC123", "PBV4PS2")
        .with_endpoint(endpoint)
        .with_command_timeout(Duration::from_millis(500));

    let platforms = Arc::new(RecordingPlatforms::default());
    let mut integration = Integration::setup(&config, SharedPlatforms(Arc::clone(&platforms)))
        .await
        .unwrap();

    // First refresh happened before any platform was activated.
    assert_eq!(*platforms.setups.lock(), Platform::ALL.to_vec());
    assert_eq!(
        integration.coordinator().snapshot().unwrap().grill_temp(),
        Some(200)
    );

    // Entities can issue commands through the owned API client.
    integration
        .coordinator()
        .api()
        .set_probe_temperature(Temperature::new(165).unwrap())
        .await
        .unwrap();
    assert_eq!(appliance.commands(), vec!["FE06010605FF"]);

    // Teardown: platforms first, then the connection.
    assert!(integration.unload().await);
    assert_eq!(*platforms.unloads.lock(), Platform::ALL.to_vec());

    // The coordinator is terminal after unload.
    assert!(integration.coordinator().refresh().await.is_err());
}
