//! Mock platform for host tests
//!
//! Available under `cfg(test)` and with the `mock` feature.
//!
//! ```ignore
//! use rbc_mesh::platform::mock::MockPlatform;
//! use rbc_mesh::platform::{MeshPlatform, RadioInterface};
//!
//! let platform = MockPlatform::new();
//! platform.radio().inject_frame(&[1, 2, 3]);
//! let mut buf = [0u8; 8];
//! assert_eq!(platform.radio().read_frame(&mut buf), Some(3));
//! ```

#![cfg(any(test, feature = "mock"))]

mod arbiter;
mod host;
mod platform;
mod radio;

pub use arbiter::{MockArbiter, MOCK_MAX_WINDOW_US};
pub use host::{MockHostStack, MOCK_ATTR_STRIDE, MOCK_FIRST_VALUE_ATTR};
pub use platform::MockPlatform;
pub use radio::MockRadio;
