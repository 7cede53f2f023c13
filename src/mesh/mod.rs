//! Mesh facade
//!
//! [`RbcMesh`] is the public interface of a node. It owns the platform and
//! the time source and reaches the engine state through a
//! [`SharedState`], so the same instance can be driven from the arbiter
//! interrupt ([`RbcMesh::sd_irq_handler`]) and from the application.
//!
//! ```ignore
//! static MESH_STATE: EmbassyState<MeshShared> = EmbassyState::new(MeshShared::new());
//!
//! let mesh = RbcMesh::new(&MESH_STATE, platform, EmbassyTime, |event: &MeshEvent| {
//!     // react to NewVal / UpdateVal / ConflictingVal
//! });
//! mesh.init_from_build_env()?;
//! mesh.value_set(3, b"abc")?;
//! ```

mod adapters;

pub use adapters::{AttrMapping, GattLayout, HostEvent, MAX_FRAMES_PER_IRQ, MAX_SIGNALS_PER_IRQ};

use rbc_mesh_core::{
    EventHandler, MeshConfig, MeshCore, MeshError, MeshEvent, MeshStats, Result, ValueData,
    Version,
};

use crate::core::traits::{SharedState, TimeSource};
use crate::parameters::MeshParams;
use crate::platform::{HostStack, MeshPlatform};
use crate::{log_debug, log_error, log_info, log_warn};

/// Everything the interrupt and background contexts share
pub struct MeshShared {
    core: MeshCore,
    gatt: Option<GattLayout>,
}

impl MeshShared {
    /// Uninitialized state (const fn for static initialization)
    pub const fn new() -> Self {
        Self {
            core: MeshCore::new(),
            gatt: None,
        }
    }

    pub fn core(&self) -> &MeshCore {
        &self.core
    }

    /// Attribute layout registered with the host stack at init
    pub fn gatt(&self) -> Option<GattLayout> {
        self.gatt
    }
}

impl Default for MeshShared {
    fn default() -> Self {
        Self::new()
    }
}

/// One mesh node
pub struct RbcMesh<S, P, T, E> {
    state: S,
    platform: P,
    time: T,
    handler: E,
}

impl<S, P, T, E> RbcMesh<S, P, T, E>
where
    S: SharedState<MeshShared>,
    P: MeshPlatform,
    T: TimeSource,
    E: EventHandler,
{
    pub fn new(state: S, platform: P, time: T, handler: E) -> Self {
        Self {
            state,
            platform,
            time,
            handler,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn time(&self) -> &T {
        &self.time
    }

    pub fn handler(&self) -> &E {
        &self.handler
    }

    /// Bring the node onto the network described by `config`
    ///
    /// # Errors
    ///
    /// - `InvalidState` if already initialized
    /// - `InvalidParam` if `config` is out of range
    /// - `DependencyNotReady` if the host stack is disabled or refuses the
    ///   mesh service
    ///
    /// A failed call leaves the node uninitialized; retrying is safe.
    pub fn init(&self, config: MeshConfig) -> Result<()> {
        if self.state.with(|shared| shared.core.is_initialized()) {
            return Err(MeshError::InvalidState);
        }
        config.validate()?;

        let host = self.platform.host();
        if !host.is_enabled() {
            return Err(MeshError::DependencyNotReady);
        }
        let layout = host.register_service(config.handle_count).map_err(|_| {
            log_error!("mesh service registration failed");
            MeshError::DependencyNotReady
        })?;
        let address = host.device_address();

        self.state.with_mut(|shared| {
            shared.core.init(config, address, true)?;
            shared.gatt = Some(layout);
            Ok(())
        })?;

        log_info!(
            "mesh up: channel {} handles {} interval {} ms",
            config.channel,
            config.handle_count,
            config.adv_interval_ms
        );
        Ok(())
    }

    /// [`Self::init`] with the parameters compiled into the image
    pub fn init_from_build_env(&self) -> Result<()> {
        self.init(MeshParams::from_build_env().config()?)
    }

    /// Write a local value and schedule its broadcast
    ///
    /// Returns the new version. Fails with `InvalidAddr` or `InvalidLength`
    /// without side effects.
    pub fn value_set(&self, handle: u16, data: &[u8]) -> Result<Version> {
        let now_us = self.time.now_us();
        let (version, evicted) = self
            .state
            .with_mut(|shared| shared.core.value_set(handle, data, now_us))?;

        if evicted {
            log_warn!("event queue full, oldest event dropped");
        }
        log_debug!("handle {} set locally, version {}", handle, version);
        Ok(version)
    }

    /// Current bytes of `handle`; empty if never written
    pub fn value_get(&self, handle: u16) -> Result<ValueData> {
        self.state.with(|shared| shared.core.value_get(handle))
    }

    /// Broadcast a one-shot request for `handle`
    ///
    /// Holders of the value answer by rebroadcasting it; the answer arrives
    /// as a regular event. There is no delivery guarantee.
    pub fn value_req(&self, handle: u16) -> Result<()> {
        self.state.with_mut(|shared| shared.core.value_req(handle))
    }

    pub fn access_address_get(&self) -> Result<u32> {
        self.config().map(|c| c.access_address)
    }

    pub fn channel_get(&self) -> Result<u8> {
        self.config().map(|c| c.channel)
    }

    pub fn handle_count_get(&self) -> Result<u16> {
        self.config().map(|c| c.handle_count)
    }

    pub fn adv_interval_get(&self) -> Result<u32> {
        self.config().map(|c| c.adv_interval_ms)
    }

    /// Deliver queued events to the handler
    ///
    /// Each event is taken in its own critical section and handed to the
    /// handler with the lock released, so the handler may call back into
    /// the mesh. Returns the number of events delivered.
    pub fn poll_events(&self) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.next_event() {
            self.handler.handle_event(&event);
            delivered += 1;
        }
        delivered
    }

    /// Take one queued event without invoking the handler
    pub fn next_event(&self) -> Option<MeshEvent> {
        self.state.with_mut(|shared| shared.core.drain_event())
    }

    pub fn stats(&self) -> MeshStats {
        self.state.with(|shared| shared.core.stats())
    }

    /// Run `f` against the engine state
    pub fn with_core<R>(&self, f: impl FnOnce(&MeshCore) -> R) -> R {
        self.state.with(|shared| f(&shared.core))
    }

    fn config(&self) -> Result<MeshConfig> {
        self.state.with(|shared| shared.core.config())
    }
}
