//! In-memory artifact caches for incremental backend lowering.
//!
//! The backend compiler keeps two caches keyed by method identity: one for the
//! intermediate syntax tree produced before lowering, one for the final
//! lowered program. Both live for the lifetime of the worker process and are
//! only ever touched from inside the single active pipeline.

#![warn(missing_docs)]

pub mod artifact;
pub mod caches;
pub mod stats;
pub mod store;

pub use artifact::CachedArtifact;
pub use caches::{ArtifactCaches, AstCache, CachesSnapshot, ProgramCache};
pub use stats::CacheStats;
pub use store::MemoryStore;
