//! Public runtime API surface.
//!
//! Types handed to consumers of the runtime crate, kept apart from worker
//! and channel plumbing.

pub mod errors;
pub mod handle;

pub use errors::{Result, RuntimeError};
pub use handle::RuntimeHandle;
