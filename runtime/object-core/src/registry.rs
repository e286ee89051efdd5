//! Registry Collaborator Interface
//!
//! A registry is an external index that holds a non-owning relation to
//! live objects - it remembers them without keeping them alive. The core
//! does not implement indexing; it only tracks, per object, whether some
//! registry currently does, so that teardown can clear the flag before
//! the kind's release callback runs.
//!
//! ## Flag Discipline
//!
//! Implementations set the flag with [`Object::mark_registered`] when they
//! index an object and clear it with [`Object::clear_registered`] when
//! they forget one. The framework clears the flag itself when an object
//! detaches, so an object torn down while still indexed never reaches its
//! release callback with the flag set. Purging the registry's own entry in
//! that case is the registering collaborator's duty; the kind's release
//! callback is the natural place.

use crate::object::Object;
use crate::Result;

/// Narrow interface a registry presents to object embedders.
pub trait Registry {
    /// Index `obj` and mark it registered.
    ///
    /// The entry must be non-owning: registering takes no reference on
    /// the object.
    fn register(&self, obj: &Object) -> Result<()>;

    /// Forget `obj` and clear its registry flag.
    fn unregister(&self, obj: &Object) -> Result<()>;
}
