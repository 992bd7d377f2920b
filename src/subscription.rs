// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for coordinator consumers.
//!
//! Entities register callbacks with the coordinator to be notified of new
//! snapshots and availability changes:
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Internal registry for storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::StateSnapshot;

/// Unique identifier for a subscription.
///
/// This ID is returned when registering a callback and can be used to
/// unsubscribe later. IDs are unique within a coordinator's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Type alias for snapshot callbacks.
type SnapshotCallback = Arc<dyn Fn(&Arc<StateSnapshot>) + Send + Sync>;

/// Type alias for availability callbacks.
type AvailabilityCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Registry for coordinator consumer callbacks.
///
/// Uses thread-safe interior mutability via `parking_lot::RwLock`;
/// callbacks are wrapped in `Arc` so they can be cloned cheaply. Dispatch
/// is synchronous, so notification fan-out completes without yielding.
pub struct CallbackRegistry {
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
    /// New-snapshot callbacks.
    snapshot_callbacks: RwLock<HashMap<SubscriptionId, SnapshotCallback>>,
    /// Availability-change callbacks.
    availability_callbacks: RwLock<HashMap<SubscriptionId, AvailabilityCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            snapshot_callbacks: RwLock::new(HashMap::new()),
            availability_callbacks: RwLock::new(HashMap::new()),
        }
    }

    /// Generates a new unique subscription ID.
    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a callback for published snapshots.
    pub fn on_snapshot<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<StateSnapshot>) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.snapshot_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for availability changes.
    ///
    /// The callback receives the new availability.
    pub fn on_availability_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.availability_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        if self.snapshot_callbacks.write().remove(&id).is_some() {
            return true;
        }
        if self.availability_callbacks.write().remove(&id).is_some() {
            return true;
        }
        false
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.snapshot_callbacks.write().clear();
        self.availability_callbacks.write().clear();
    }

    /// Dispatches a published snapshot to all snapshot callbacks.
    pub fn dispatch_snapshot(&self, snapshot: &Arc<StateSnapshot>) {
        let callbacks = self.snapshot_callbacks.read();
        for callback in callbacks.values() {
            callback(snapshot);
        }
    }

    /// Dispatches an availability change to all availability callbacks.
    pub fn dispatch_availability(&self, available: bool) {
        let callbacks = self.availability_callbacks.read();
        for callback in callbacks.values() {
            callback(available);
        }
    }

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.snapshot_callbacks.read().len() + self.availability_callbacks.read().len()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}
