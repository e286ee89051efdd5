//! Object Core - Hierarchical reference-counted object infrastructure
//!
//! # Purpose
//! Gives arbitrary objects shared ownership, concurrent lifetime tracking,
//! parent/child ownership chains, and deterministic, kind-dispatched
//! teardown when the last owner releases its reference. The framework
//! never allocates or frees the embedding structure; it manages the count
//! and invokes a caller-supplied release callback at the count-to-zero
//! transition.
//!
//! # Integration Points
//! - Depends on: `core` atomics only
//! - Provides to: any component embedding [`Object`] inside a larger structure
//! - Consumes from collaborators: a [`Kind`] release callback (type-specific
//!   teardown) and, optionally, a [`Registry`] implementation that indexes
//!   live objects and maintains their registry flag
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Embedding Component              │
//! │  struct Device { object: Object, .. }   │
//! └──────────────┬──────────────────────────┘
//!                │ initialize / acquire / release
//! ┌──────────────▼──────────────────────────┐
//! │        Object Core (this crate)         │
//! │  • Atomic ownership count               │
//! │  • Parent chain (strong edges)          │
//! │  • Registry participation flag          │
//! └──────────────┬──────────────────────────┘
//!                │ count reaches zero
//! ┌──────────────▼──────────────────────────┐
//! │     Kind::release (caller-supplied)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Testing Strategy
//! - Unit tests: lifecycle transitions, flag discipline, contract panics
//! - Integration tests: multi-threaded acquire/release traffic, cascaded
//!   parent teardown, registry interplay

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod kind;
pub mod object;
pub mod registry;

pub use kind::{Kind, ReleaseFn};
pub use object::{Object, ObjectId, ObjectState};
pub use registry::Registry;

use thiserror::Error;

/// Error types for recoverable object-model operations
///
/// Contract violations (use before initialization, use after teardown,
/// refcount underflow) are not errors: they are fatal programming bugs and
/// terminate via assertion, matching the object-is-gone contract.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ObjectError {
    /// The object already holds a parent edge
    #[error("object is already linked to a parent")]
    ParentAlreadyLinked,

    /// The object is already indexed by a registry
    #[error("object is already registered")]
    AlreadyRegistered,

    /// The object is not indexed by this registry
    #[error("object is not registered here")]
    NotRegistered,

    /// The requested registry name is already taken
    #[error("name already present in registry")]
    DuplicateName,
}

pub type Result<T> = core::result::Result<T, ObjectError>;
