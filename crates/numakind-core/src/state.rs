//! Descriptor lifecycle states.

use std::fmt;

/// Lifecycle state of a kind descriptor.
///
/// ```text
/// Uninitialized --create ok--> Live --destroy--> Destroyed
///       ^             |                             |
///       +--create err-+                  destroy (no-op)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DescriptorState {
    /// Never created, or the last `create` failed and was rolled back.
    Uninitialized,
    /// Name and arena map are populated; allocation calls may route.
    Live,
    /// Resources released. Terminal.
    Destroyed,
}

impl fmt::Display for DescriptorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Live => write!(f, "live"),
            Self::Destroyed => write!(f, "destroyed"),
        }
    }
}
