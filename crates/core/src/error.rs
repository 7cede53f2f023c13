//! Mesh error types
//!
//! Every validation failure of the public interface maps to one of these
//! variants. Transient radio conditions never surface as errors.

/// Result type for mesh operations
pub type Result<T> = core::result::Result<T, MeshError>;

/// Errors returned synchronously by mesh operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshError {
    /// A configuration value is outside its allowed range
    InvalidParam,
    /// Operation used before `init`, or `init` called twice
    InvalidState,
    /// Handle outside the configured range, or not mapped to a value
    InvalidAddr,
    /// Payload longer than `MAX_VALUE_LEN`
    InvalidLength,
    /// The host wireless stack has not been enabled yet
    DependencyNotReady,
}

impl core::fmt::Display for MeshError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MeshError::InvalidParam => write!(f, "invalid mesh parameter"),
            MeshError::InvalidState => write!(f, "mesh in invalid state for operation"),
            MeshError::InvalidAddr => write!(f, "value handle out of range"),
            MeshError::InvalidLength => write!(f, "value length exceeds maximum"),
            MeshError::DependencyNotReady => write!(f, "host wireless stack not enabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;
    use std::format;

    #[test]
    fn test_display_messages() {
        assert_eq!(format!("{}", MeshError::InvalidAddr), "value handle out of range");
        assert_eq!(
            format!("{}", MeshError::DependencyNotReady),
            "host wireless stack not enabled"
        );
    }

    #[test]
    fn test_errors_are_comparable() {
        assert_eq!(MeshError::InvalidLength, MeshError::InvalidLength);
        assert_ne!(MeshError::InvalidParam, MeshError::InvalidState);
    }
}
