//! Root platform trait

use super::{HostStack, RadioInterface, TimeslotArbiter};

/// Aggregates the services a mesh node needs
///
/// Associated types keep dispatch static; the facade is generic over one
/// implementation.
///
/// ```ignore
/// impl MeshPlatform for Nrf52Platform {
///     type Radio = Nrf52Radio;
///     type Arbiter = SocTimeslot;
///     type Host = SoftDevice;
///
///     fn radio(&self) -> &Self::Radio { &self.radio }
///     fn arbiter(&self) -> &Self::Arbiter { &self.timeslot }
///     fn host(&self) -> &Self::Host { &self.softdevice }
/// }
/// ```
pub trait MeshPlatform {
    type Radio: RadioInterface;
    type Arbiter: TimeslotArbiter;
    type Host: HostStack;

    fn radio(&self) -> &Self::Radio;

    fn arbiter(&self) -> &Self::Arbiter;

    fn host(&self) -> &Self::Host;
}
