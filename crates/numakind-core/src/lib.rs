//! Core types and traits for numakind arena routing.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the ids, error types, and collaborator traits shared by the routing
//! layer, its C bindings, and its test doubles.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod error;
pub mod id;
pub mod state;
pub mod traits;

pub use error::{EngineError, KindError};
pub use id::{ArenaId, Partition};
pub use state::DescriptorState;
pub use traits::{ArenaEngine, Topology};
