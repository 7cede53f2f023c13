//! Mock platform

use crate::platform::traits::MeshPlatform;
use rbc_mesh_core::NodeAddress;

use super::{MockArbiter, MockHostStack, MockRadio};

/// Mock radio, arbiter and host stack bundled for the facade
#[derive(Debug, Default)]
pub struct MockPlatform {
    radio: MockRadio,
    arbiter: MockArbiter,
    host: MockHostStack,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform whose host stack reports `address`
    pub fn with_address(address: NodeAddress) -> Self {
        Self {
            host: MockHostStack::new(address),
            ..Self::default()
        }
    }
}

impl MeshPlatform for MockPlatform {
    type Radio = MockRadio;
    type Arbiter = MockArbiter;
    type Host = MockHostStack;

    fn radio(&self) -> &MockRadio {
        &self.radio
    }

    fn arbiter(&self) -> &MockArbiter {
        &self.arbiter
    }

    fn host(&self) -> &MockHostStack {
        &self.host
    }
}
