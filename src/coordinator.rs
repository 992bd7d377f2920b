// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State coordinator for one appliance.
//!
//! The coordinator owns the API client for the lifetime of one configured
//! appliance. It performs the first state fetch during setup, then fetches
//! on its own schedule, normalizes each report into a [`StateSnapshot`],
//! and publishes it to consumers.
//!
//! # Refresh semantics
//!
//! At most one refresh is in flight at any time. A [`refresh`] call that
//! arrives while another is in flight coalesces into it: it waits for the
//! in-flight fetch to complete and returns without starting a second one,
//! so snapshot writes are totally ordered and never torn.
//!
//! On fetch success the snapshot is replaced whole and the appliance is
//! marked available; on fetch failure (including timeouts) the previous
//! snapshot is retained, the appliance is marked unavailable, and the
//! error is logged rather than propagated.
//!
//! # Lifecycle
//!
//! The coordinator moves through explicit phases:
//!
//! ```text
//! Uninitialized --first_refresh--> Ready <--refresh--> Ready
//!       \                           |
//!        +---------stop-------------+--> Stopped (terminal)
//! ```
//!
//! Misordered calls are rejected with [`Error::NotReady`],
//! [`Error::AlreadyInitialized`], or [`Error::Stopped`] instead of racing.
//!
//! [`refresh`]: StateCoordinator::refresh

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::ApplianceApi;
use crate::device_info::DeviceInfo;
use crate::error::{Error, Result};
use crate::protocol::RawFrame;
use crate::state::{RawStatus, StateSnapshot};
use crate::subscription::{CallbackRegistry, SubscriptionId};

/// Lifecycle phase of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorPhase {
    /// Constructed, first refresh not yet completed.
    Uninitialized,
    /// First refresh succeeded; scheduled refreshes are running.
    Ready,
    /// Stopped; terminal.
    Stopped,
}

/// Value published to consumers on every coordinator update.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorUpdate {
    /// Most recently published snapshot, if any.
    pub snapshot: Option<Arc<StateSnapshot>>,
    /// Whether the appliance is currently reachable.
    pub available: bool,
}

/// Read-only handle entities use to observe one appliance.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    device_info: DeviceInfo,
    updates: watch::Receiver<CoordinatorUpdate>,
}

impl CoordinatorHandle {
    /// Returns the device info record.
    #[must_use]
    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    /// Returns the current snapshot, if one has been published.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<StateSnapshot>> {
        self.updates.borrow().snapshot.clone()
    }

    /// Returns whether the appliance is currently available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.updates.borrow().available
    }

    /// Returns a watch receiver for coordinator updates.
    #[must_use]
    pub fn updates(&self) -> watch::Receiver<CoordinatorUpdate> {
        self.updates.clone()
    }
}

/// Diagnostic export of one coordinator's state.
///
/// The record may contain raw wire frames; render it with
/// [`to_json`](Self::to_json), which uses the binary-tolerant encoder.
#[derive(Debug, Serialize)]
pub struct Diagnostics {
    device: DeviceInfo,
    available: bool,
    snapshot: Option<Arc<StateSnapshot>>,
    last_frame: Option<RawFrame>,
}

impl Diagnostics {
    /// Renders the diagnostics as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures unrelated to binary data; raw
    /// frames are encoded as base64 text.
    pub fn to_json(&self) -> serde_json::Result<String> {
        crate::encoding::to_string(self)
    }
}

/// Maintains a fresh state snapshot for exactly one appliance.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use pitboss_lib::api::GrillClient;
/// use pitboss_lib::config::{ApplianceConfig, DEFAULT_ENDPOINT};
/// use pitboss_lib::coordinator::StateCoordinator;
/// use pitboss_lib::device_info::DeviceInfo;
/// use pitboss_lib::protocol::WebSocketConnection;
///
/// # async fn example() -> pitboss_lib::error::Result<()> {
/// let config = ApplianceConfig::new("ABC123", "PBV4PS2");
/// let conn = WebSocketConnection::connect(config.device_id(), DEFAULT_ENDPOINT).await?;
/// let api = GrillClient::new(conn, config.model(), config.password());
///
/// let coordinator = Arc::new(StateCoordinator::new(api, DeviceInfo::from_config(&config)));
/// coordinator.first_refresh().await?;
///
/// let polling = Arc::clone(&coordinator).spawn_polling(Duration::from_secs(10));
///
/// if let Some(snapshot) = coordinator.snapshot() {
///     println!("grill at {:?}", snapshot.grill_temp());
/// }
///
/// coordinator.stop().await?;
/// polling.await.ok();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StateCoordinator<A: ApplianceApi> {
    api: A,
    device_info: DeviceInfo,
    phase: parking_lot::Mutex<CoordinatorPhase>,
    /// Serializes fetches; guarantees at most one refresh in flight.
    refresh_lock: tokio::sync::Mutex<()>,
    /// Bumped after every completed refresh (success or failure).
    refresh_seq: AtomicU64,
    update_tx: watch::Sender<CoordinatorUpdate>,
    listeners: CallbackRegistry,
    last_frame: parking_lot::RwLock<Option<RawFrame>>,
}

impl<A: ApplianceApi> StateCoordinator<A> {
    /// Creates a coordinator owning the given API client.
    #[must_use]
    pub fn new(api: A, device_info: DeviceInfo) -> Self {
        let (update_tx, _) = watch::channel(CoordinatorUpdate::default());
        Self {
            api,
            device_info,
            phase: parking_lot::Mutex::new(CoordinatorPhase::Uninitialized),
            refresh_lock: tokio::sync::Mutex::new(()),
            refresh_seq: AtomicU64::new(0),
            update_tx,
            listeners: CallbackRegistry::new(),
            last_frame: parking_lot::RwLock::new(None),
        }
    }

    /// Returns the current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> CoordinatorPhase {
        *self.phase.lock()
    }

    /// Returns the device info record.
    #[must_use]
    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    /// Returns the owned API client.
    ///
    /// Command-capable entities (climate, light, switch) use this to issue
    /// appliance commands.
    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Returns the current snapshot, if one has been published.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<StateSnapshot>> {
        self.update_tx.borrow().snapshot.clone()
    }

    /// Returns whether the appliance is currently available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.update_tx.borrow().available
    }

    /// Returns a watch receiver for coordinator updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorUpdate> {
        self.update_tx.subscribe()
    }

    /// Returns a read-only handle for entity consumers.
    #[must_use]
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            device_info: self.device_info.clone(),
            updates: self.update_tx.subscribe(),
        }
    }

    /// Registers a callback for published snapshots.
    pub fn on_snapshot<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<StateSnapshot>) + Send + Sync + 'static,
    {
        self.listeners.on_snapshot(callback)
    }

    /// Registers a callback for availability changes.
    pub fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.listeners.on_availability_changed(callback)
    }

    /// Unregisters a previously registered callback.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Returns a diagnostic export of the coordinator's state.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        let update = self.update_tx.borrow().clone();
        Diagnostics {
            device: self.device_info.clone(),
            available: update.available,
            snapshot: update.snapshot,
            last_frame: self.last_frame.read().clone(),
        }
    }

    /// Performs the first fetch-and-normalize cycle.
    ///
    /// Must complete before any [`refresh`](Self::refresh); the integration
    /// activates entity platforms only after it succeeds.
    ///
    /// # Errors
    ///
    /// Propagates the fetch error (setup of the whole integration must then
    /// fail). Returns [`Error::AlreadyInitialized`] if the first refresh
    /// already completed, or [`Error::Stopped`] after [`stop`](Self::stop).
    pub async fn first_refresh(&self) -> Result<()> {
        self.ensure_uninitialized()?;
        let _guard = self.refresh_lock.lock().await;
        // Re-check: a concurrent first_refresh may have won the lock.
        self.ensure_uninitialized()?;

        let status = self.api.fetch_status().await?;
        self.publish_success(&status);
        *self.phase.lock() = CoordinatorPhase::Ready;

        tracing::debug!(device_id = %self.device_info.identifier(), "First refresh complete");
        Ok(())
    }

    /// Performs one fetch-and-normalize cycle.
    ///
    /// Safe to invoke concurrently with itself: an overlapping call
    /// coalesces into the in-flight refresh. Fetch failures do not
    /// propagate; they mark the appliance unavailable and retain the
    /// previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] before [`first_refresh`](Self::first_refresh)
    /// has succeeded, or [`Error::Stopped`] after [`stop`](Self::stop).
    pub async fn refresh(&self) -> Result<()> {
        self.ensure_ready()?;
        let seq_before = self.refresh_seq.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;
        if self.refresh_seq.load(Ordering::Acquire) != seq_before {
            // A refresh completed while we waited for the lock; its result
            // is current enough.
            return Ok(());
        }
        self.ensure_ready()?;

        match self.api.fetch_status().await {
            Ok(status) => self.publish_success(&status),
            Err(e) => {
                tracing::warn!(
                    device_id = %self.device_info.identifier(),
                    error = %e,
                    "State refresh failed"
                );
                self.publish_failure();
            }
        }
        Ok(())
    }

    /// Stops the coordinator and releases the underlying connection.
    ///
    /// Idempotent: stopping an already-stopped coordinator is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates a close failure from the API client.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut phase = self.phase.lock();
            if *phase == CoordinatorPhase::Stopped {
                return Ok(());
            }
            *phase = CoordinatorPhase::Stopped;
        }
        tracing::debug!(device_id = %self.device_info.identifier(), "Stopping coordinator");
        self.api.stop().await
    }

    /// Spawns a background task that refreshes at the given interval.
    ///
    /// The task runs until the coordinator is stopped.
    pub fn spawn_polling(self: Arc<Self>, interval: Duration) -> JoinHandle<()>
    where
        A: 'static,
    {
        let coordinator = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial state was
            // already published by first_refresh.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if coordinator.refresh().await.is_err() {
                    break;
                }
            }
            tracing::debug!(
                device_id = %coordinator.device_info.identifier(),
                "Polling task stopped"
            );
        })
    }

    fn ensure_uninitialized(&self) -> Result<()> {
        match *self.phase.lock() {
            CoordinatorPhase::Uninitialized => Ok(()),
            CoordinatorPhase::Ready => Err(Error::AlreadyInitialized),
            CoordinatorPhase::Stopped => Err(Error::Stopped),
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        match *self.phase.lock() {
            CoordinatorPhase::Ready => Ok(()),
            CoordinatorPhase::Uninitialized => Err(Error::NotReady),
            CoordinatorPhase::Stopped => Err(Error::Stopped),
        }
    }

    /// Publishes a successful fetch. Synchronous: snapshot replacement and
    /// notification fan-out complete without yielding.
    fn publish_success(&self, status: &RawStatus) {
        let snapshot = Arc::new(StateSnapshot::from_status(status));
        if let Some(frame) = &status.raw {
            *self.last_frame.write() = Some(frame.clone());
        }
        self.refresh_seq.fetch_add(1, Ordering::AcqRel);

        let became_available = !self.update_tx.borrow().available;
        self.update_tx.send_modify(|update| {
            update.snapshot = Some(Arc::clone(&snapshot));
            update.available = true;
        });

        self.listeners.dispatch_snapshot(&snapshot);
        if became_available {
            self.listeners.dispatch_availability(true);
        }
    }

    /// Publishes a failed fetch. The previous snapshot is retained.
    fn publish_failure(&self) {
        self.refresh_seq.fetch_add(1, Ordering::AcqRel);

        let was_available = self.update_tx.borrow().available;
        if was_available {
            self.update_tx.send_modify(|update| update.available = false);
            self.listeners.dispatch_availability(false);
        }
    }
}
