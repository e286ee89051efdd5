//! Kind Descriptors
//!
//! A `Kind` describes a family of embeddable objects: every instance of an
//! embedding type shares one `Kind`, which carries the type-specific
//! teardown callback the framework invokes when an object's last reference
//! is dropped.
//!
//! ## Design
//!
//! Release dispatch is data-driven: a `Kind` is a plain descriptor holding
//! a function pointer, and objects store a `&'static Kind`. This keeps the
//! teardown behavior testable in isolation from any specific embedding
//! type - a test can install a kind whose release callback only flips a
//! flag. Kinds are created once, shared, and never destroyed.

use core::fmt;

use crate::object::Object;

/// Type-specific teardown callback.
///
/// Invoked exactly once per object, at the moment its count transitions
/// from one to zero, by whichever owner performed the final release. The
/// callback owns the rest of teardown: releasing the enclosing structure's
/// resources and, where the enclosing structure was heap-allocated,
/// returning its memory to the allocator that created it. A callback that
/// frees the enclosing allocation must know that the `Object` it receives
/// is a field of that allocation and that no other references remain - the
/// framework guarantees the latter.
///
/// Failures inside the callback are the callback's own responsibility;
/// the framework neither observes nor recovers from them.
pub type ReleaseFn = fn(&Object);

/// Shared, immutable descriptor of how a family of objects tears down.
#[derive(Debug, Clone, Copy)]
pub struct Kind {
    /// Diagnostic name of the object family, used in log output.
    pub name: &'static str,

    /// Teardown callback, run at the count-to-zero transition.
    ///
    /// `None` means the embedding type has nothing to tear down.
    pub release: Option<ReleaseFn>,
}

impl Kind {
    /// Create a kind with no teardown callback.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            release: None,
        }
    }

    /// Create a kind with a teardown callback.
    pub const fn with_release(name: &'static str, release: ReleaseFn) -> Self {
        Self {
            name,
            release: Some(release),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
