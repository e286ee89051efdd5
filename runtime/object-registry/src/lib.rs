//! Object Registry - Named sets of reference-counted objects
//!
//! # Purpose
//! Groups live objects under named, non-owning membership indexes. A set
//! remembers its members; it does not keep them alive. Sets are themselves
//! framework objects, so they are reference-counted, parent-linkable, and
//! torn down through their own kind like anything else built on
//! `object-core`.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Embedding Components             │
//! │   devices, endpoints, sessions, ...     │
//! └──────────────┬──────────────────────────┘
//!                │ add / remove
//! ┌──────────────▼──────────────────────────┐
//! │      Object Registry (this crate)       │
//! │  • ObjectSet: id → name index           │
//! │  • Registry trait implementation        │
//! │  • Set lifecycle via embedded Object    │
//! └──────────────┬──────────────────────────┘
//!                │ mark/clear registered
//! ┌──────────────▼──────────────────────────┐
//! │             object-core                 │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Testing Strategy
//! - Unit tests: index bookkeeping, duplicate rejection, flag discipline
//! - Integration tests: set-as-parent cascades, teardown of indexed members

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

extern crate alloc;

mod set;

pub use set::ObjectSet;
