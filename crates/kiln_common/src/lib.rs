//! Shared foundational types used across the kiln compile worker.
//!
//! This crate provides content fingerprints for cached artifacts, the
//! internal-error result type, and the method identity used to key the
//! backend artifact caches.

#![warn(missing_docs)]

pub mod hash;
pub mod method;
pub mod result;

pub use hash::ContentHash;
pub use method::MethodRef;
pub use result::{InternalError, KilnResult};
