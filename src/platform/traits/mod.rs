//! Platform abstraction traits

pub mod arbiter;
pub mod host;
pub mod platform;
pub mod radio;

pub use arbiter::TimeslotArbiter;
pub use host::HostStack;
pub use platform::MeshPlatform;
pub use radio::{RadioConfig, RadioInterface, RadioStatus};
