// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration lifecycle manager.
//!
//! Sequences setup and teardown for one configured appliance so that no
//! entity is ever activated against a not-yet-ready coordinator, and no
//! connection is closed while entities are still active:
//!
//! - Setup: connection → API client → device info → coordinator →
//!   first refresh → entity platforms. A first-refresh failure aborts
//!   setup before any platform is activated.
//! - Teardown: entity platforms first; only if every platform deactivated
//!   successfully is the underlying connection stopped.

use std::sync::Arc;

use crate::api::{ApplianceApi, GrillClient};
use crate::config::ApplianceConfig;
use crate::coordinator::StateCoordinator;
use crate::device_info::DeviceInfo;
use crate::error::{Error, Result};
use crate::platform::{EntityPlatforms, Platform};
use crate::protocol::WebSocketConnection;

/// One loaded appliance integration.
///
/// Exclusively owns the state coordinator (and through it the device
/// connection) for one configured appliance. Multiple appliances run
/// independent `Integration` instances.
///
/// # Examples
///
/// ```no_run
/// use pitboss_lib::config::ApplianceConfig;
/// use pitboss_lib::coordinator::CoordinatorHandle;
/// use pitboss_lib::integration::Integration;
/// use pitboss_lib::platform::{EntityPlatforms, Platform};
///
/// struct HostPlatforms;
///
/// impl EntityPlatforms for HostPlatforms {
///     async fn setup(
///         &self,
///         platform: Platform,
///         handle: CoordinatorHandle,
///     ) -> pitboss_lib::error::Result<()> {
///         println!("activating {platform} for {}", handle.device_info().name());
///         Ok(())
///     }
///
///     async fn unload(&self, _platform: Platform) -> bool {
///         true
///     }
/// }
///
/// # async fn example() -> pitboss_lib::error::Result<()> {
/// let config = ApplianceConfig::new("ABC123", "PBV4PS2");
/// let mut integration = Integration::setup(&config, HostPlatforms).await?;
///
/// // ... later ...
/// let unloaded = integration.unload().await;
/// assert!(unloaded);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Integration<A: ApplianceApi, P: EntityPlatforms> {
    coordinator: Arc<StateCoordinator<A>>,
    platforms: P,
    active: Vec<Platform>,
}

impl<P: EntityPlatforms> Integration<GrillClient, P> {
    /// Sets up the integration from configuration.
    ///
    /// Constructs the device connection and API client, then proceeds as
    /// [`setup_with_api`](Self::setup_with_api).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the connection
    /// cannot be established, the first refresh fails, or a platform fails
    /// to activate. In every case no entities remain active.
    pub async fn setup(config: &ApplianceConfig, platforms: P) -> Result<Self> {
        config.validate()?;

        let conn = WebSocketConnection::connect(config.device_id(), config.endpoint())
            .await
            .map_err(Error::Protocol)?;
        let api = GrillClient::new(conn, config.model(), config.password())
            .with_timeout(config.command_timeout());
        let device_info = DeviceInfo::from_config(config);

        Self::setup_with_api(api, device_info, platforms).await
    }
}

impl<A: ApplianceApi, P: EntityPlatforms> Integration<A, P> {
    /// Sets up the integration over an existing API client.
    ///
    /// Performs the first refresh, then activates every entity platform.
    /// If a platform fails to activate, the already-activated platforms are
    /// unwound and the API client is stopped before the error is returned.
    ///
    /// # Errors
    ///
    /// Propagates the first-refresh or platform-setup failure.
    pub async fn setup_with_api(api: A, device_info: DeviceInfo, platforms: P) -> Result<Self> {
        let coordinator = Arc::new(StateCoordinator::new(api, device_info));

        if let Err(e) = coordinator.first_refresh().await {
            // Setup-fatal: release the connection, report the failure.
            if let Err(stop_err) = coordinator.stop().await {
                tracing::warn!(
                    device_id = %coordinator.device_info().identifier(),
                    error = %stop_err,
                    "Failed to stop API client after setup failure"
                );
            }
            return Err(e);
        }

        let mut active: Vec<Platform> = Vec::with_capacity(Platform::ALL.len());
        for platform in Platform::ALL {
            match platforms.setup(platform, coordinator.handle()).await {
                Ok(()) => active.push(platform),
                Err(e) => {
                    tracing::warn!(
                        device_id = %coordinator.device_info().identifier(),
                        %platform,
                        error = %e,
                        "Platform setup failed, unwinding"
                    );
                    for activated in active.into_iter().rev() {
                        if !platforms.unload(activated).await {
                            tracing::warn!(
                                device_id = %coordinator.device_info().identifier(),
                                platform = %activated,
                                "Platform unload failed during unwind"
                            );
                        }
                    }
                    if let Err(stop_err) = coordinator.stop().await {
                        tracing::warn!(
                            device_id = %coordinator.device_info().identifier(),
                            error = %stop_err,
                            "Failed to stop API client after setup failure"
                        );
                    }
                    return Err(e);
                }
            }
        }

        tracing::info!(
            device_id = %coordinator.device_info().identifier(),
            "Integration ready"
        );
        Ok(Self {
            coordinator,
            platforms,
            active,
        })
    }

    /// Returns the state coordinator.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<StateCoordinator<A>> {
        &self.coordinator
    }

    /// Returns the platforms that are currently active.
    #[must_use]
    pub fn active_platforms(&self) -> &[Platform] {
        &self.active
    }

    /// Unloads the integration.
    ///
    /// Deactivates entity platforms first. Only if every platform
    /// deactivated successfully is the coordinator stopped and the
    /// connection released; otherwise the integration stays running with
    /// the platforms that refused to unload, and `false` is returned.
    pub async fn unload(&mut self) -> bool {
        let mut remaining = Vec::new();
        for platform in std::mem::take(&mut self.active) {
            if !self.platforms.unload(platform).await {
                remaining.push(platform);
            }
        }

        if !remaining.is_empty() {
            tracing::warn!(
                device_id = %self.coordinator.device_info().identifier(),
                ?remaining,
                "Platform unload failed; leaving connection open"
            );
            self.active = remaining;
            return false;
        }

        if let Err(e) = self.coordinator.stop().await {
            tracing::warn!(
                device_id = %self.coordinator.device_info().identifier(),
                error = %e,
                "Failed to stop API client during unload"
            );
        }
        tracing::info!(
            device_id = %self.coordinator.device_info().identifier(),
            "Integration unloaded"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::coordinator::{CoordinatorHandle, CoordinatorPhase};
    use crate::error::ProtocolError;
    use crate::state::RawStatus;

    struct MockApi {
        statuses: parking_lot::Mutex<VecDeque<Result<RawStatus>>>,
        stop_count: AtomicUsize,
    }

    impl MockApi {
        fn ok() -> Self {
            Self::with(vec![Ok(RawStatus {
                grill_temp: Some(210),
                ..RawStatus::default()
            })])
        }

        fn failing() -> Self {
            Self::with(vec![Err(Error::Protocol(ProtocolError::ConnectionFailed(
                "mock failure".to_string(),
            )))])
        }

        fn with(statuses: Vec<Result<RawStatus>>) -> Self {
            Self {
                statuses: parking_lot::Mutex::new(statuses.into_iter().collect()),
                stop_count: AtomicUsize::new(0),
            }
        }

        fn stops(&self) -> usize {
            self.stop_count.load(Ordering::SeqCst)
        }
    }

    impl ApplianceApi for MockApi {
        async fn fetch_status(&self) -> Result<RawStatus> {
            self.statuses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(RawStatus::default()))
        }

        async fn stop(&self) -> Result<()> {
            self.stop_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct SpyPlatforms {
        setup_calls: parking_lot::Mutex<Vec<Platform>>,
        unload_calls: parking_lot::Mutex<Vec<Platform>>,
        fail_setup_on: Option<Platform>,
        fail_unload_on: parking_lot::Mutex<Option<Platform>>,
    }

    impl SpyPlatforms {
        fn failing_setup(platform: Platform) -> Self {
            Self {
                fail_setup_on: Some(platform),
                ..Self::default()
            }
        }

        fn failing_unload(platform: Platform) -> Self {
            Self {
                fail_unload_on: parking_lot::Mutex::new(Some(platform)),
                ..Self::default()
            }
        }
    }

    impl EntityPlatforms for &SpyPlatforms {
        async fn setup(&self, platform: Platform, handle: CoordinatorHandle) -> Result<()> {
            self.setup_calls.lock().push(platform);
            // A platform activating against a not-yet-ready coordinator
            // would observe no snapshot here.
            assert!(handle.snapshot().is_some());
            if self.fail_setup_on == Some(platform) {
                return Err(Error::Platform(format!("{platform} refused")));
            }
            Ok(())
        }

        async fn unload(&self, platform: Platform) -> bool {
            self.unload_calls.lock().push(platform);
            *self.fail_unload_on.lock() != Some(platform)
        }
    }

    fn device_info() -> DeviceInfo {
        DeviceInfo::from_config(&ApplianceConfig::new("ABC123", "PBV4PS2"))
    }

    #[tokio::test]
    async fn setup_activates_all_platforms_in_order() {
        let spy = SpyPlatforms::default();
        let integration = Integration::setup_with_api(MockApi::ok(), device_info(), &spy)
            .await
            .unwrap();

        assert_eq!(*spy.setup_calls.lock(), Platform::ALL.to_vec());
        assert_eq!(integration.active_platforms(), Platform::ALL);
        assert_eq!(
            integration.coordinator().phase(),
            CoordinatorPhase::Ready
        );
        assert!(integration.coordinator().is_available());
    }

    #[tokio::test]
    async fn setup_aborts_before_platforms_when_first_refresh_fails() {
        let spy = SpyPlatforms::default();
        let result = Integration::setup_with_api(MockApi::failing(), device_info(), &spy).await;

        assert!(matches!(result, Err(Error::Protocol(_))));
        assert!(spy.setup_calls.lock().is_empty());
    }

    #[tokio::test]
    async fn setup_unwinds_activated_platforms_on_failure() {
        let spy = SpyPlatforms::failing_setup(Platform::Light);
        let result = Integration::setup_with_api(MockApi::ok(), device_info(), &spy).await;

        assert!(matches!(result, Err(Error::Platform(_))));
        assert_eq!(
            *spy.setup_calls.lock(),
            vec![Platform::BinarySensor, Platform::Climate, Platform::Light]
        );
        // Unwound in reverse activation order; the failed platform was
        // never activated, so it is not unloaded.
        assert_eq!(
            *spy.unload_calls.lock(),
            vec![Platform::Climate, Platform::BinarySensor]
        );
    }

    #[tokio::test]
    async fn unload_deactivates_platforms_then_stops() {
        let spy = SpyPlatforms::default();
        let api = MockApi::ok();
        let mut integration = Integration::setup_with_api(api, device_info(), &spy)
            .await
            .unwrap();

        assert!(integration.unload().await);
        assert_eq!(*spy.unload_calls.lock(), Platform::ALL.to_vec());
        assert_eq!(integration.coordinator().api().stops(), 1);
        assert!(integration.active_platforms().is_empty());
    }

    #[tokio::test]
    async fn unload_failure_skips_stop() {
        let spy = SpyPlatforms::failing_unload(Platform::Sensor);
        let mut integration = Integration::setup_with_api(MockApi::ok(), device_info(), &spy)
            .await
            .unwrap();

        assert!(!integration.unload().await);

        // The connection must stay open while a platform is still active.
        assert_eq!(integration.coordinator().api().stops(), 0);
        assert_eq!(
            integration.coordinator().phase(),
            CoordinatorPhase::Ready
        );
        assert_eq!(integration.active_platforms(), [Platform::Sensor]);

        // Once the platform unloads, teardown completes.
        *spy.fail_unload_on.lock() = None;
        assert!(integration.unload().await);
        assert_eq!(integration.coordinator().api().stops(), 1);
    }

    #[tokio::test]
    async fn unload_twice_is_idempotent() {
        let spy = SpyPlatforms::default();
        let mut integration = Integration::setup_with_api(MockApi::ok(), device_info(), &spy)
            .await
            .unwrap();

        assert!(integration.unload().await);
        assert!(integration.unload().await);
        assert_eq!(integration.coordinator().api().stops(), 1);
    }

    #[tokio::test]
    async fn setup_rejects_invalid_config() {
        let config = ApplianceConfig::new("", "PBV4PS2");
        let spy = SpyPlatforms::default();
        let result = Integration::setup(&config, &spy).await;

        assert!(matches!(result, Err(Error::Value(_))));
        assert!(spy.setup_calls.lock().is_empty());
    }
}
