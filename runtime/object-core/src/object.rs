//! Reference-Counted Object Implementation
//!
//! This module implements the unit of shared ownership: an intrusive
//! header a component embeds inside a larger structure to give it a
//! concurrent lifetime.
//!
//! ## Design
//!
//! Following the kernel object model:
//! - The ownership count is mutated only through atomic increment and
//!   atomic decrement-and-test, so any number of threads may acquire and
//!   release concurrently without locks
//! - Exactly one releaser observes the count reach zero and runs teardown
//! - The parent edge is a strong reference: linking acquires the parent,
//!   detaching releases it, so teardown cascades up the chain
//! - Teardown dispatches through the object's [`Kind`] descriptor
//!
//! ## Object Layout
//!
//! The header is 32 bytes on 64-bit targets:
//! ```text
//! struct Object {
//!     refcount: AtomicUsize    (8 bytes)
//!     kind: AtomicPtr<Kind>    (8 bytes)
//!     parent: AtomicPtr<Object>(8 bytes)
//!     state: AtomicU8          (1 byte + padding)
//! }
//! ```
//!
//! ## Embedding Contract
//!
//! The framework never allocates or frees the embedding structure. The
//! embedder owns the memory, keeps it at a stable address while any other
//! owner or parent edge refers to it, and supplies (through the kind) the
//! callback that reclaims it. Using an object before `initialize`, after
//! teardown, or releasing more owners than were granted is a fatal
//! programming error, not a recoverable one.

use core::fmt;
use core::ptr::{self, NonNull};
use core::sync::atomic::{fence, AtomicPtr, AtomicU8, AtomicUsize, Ordering};

use bitflags::bitflags;
use static_assertions::const_assert_eq;

use crate::kind::Kind;
use crate::{ObjectError, Result};

bitflags! {
    /// Lifecycle state flags, held in the object's atomic state byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ObjectState: u8 {
        /// `initialize` has run; every other operation requires this.
        const INITIALIZED = 1 << 0;

        /// The object is currently indexed by a registry collaborator.
        ///
        /// Set through [`Object::mark_registered`], cleared by the
        /// registry or by the framework when the object detaches.
        const IN_REGISTRY = 1 << 1;
    }
}

/// Address-derived object identity.
///
/// Stable for as long as the embedding structure stays in place, which the
/// embedding contract already requires. Registries use it as their index
/// key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Raw address value of the identity.
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// The unit of shared ownership.
///
/// Embed one of these as a field of the structure that needs a shared
/// lifetime, call [`initialize`](Object::initialize) once, hand out owners
/// with [`acquire`](Object::acquire), and have every owner call
/// [`release`](Object::release) exactly once. The final release detaches
/// the object from its parent and registry and runs the kind's teardown
/// callback.
pub struct Object {
    /// Shared ownership count. Zero only before initialization and after
    /// teardown.
    refcount: AtomicUsize,

    /// Kind descriptor, stored once by `initialize`, immutable after.
    kind: AtomicPtr<Kind>,

    /// Strong edge to the parent object; null while unlinked.
    parent: AtomicPtr<Object>,

    /// [`ObjectState`] bits.
    state: AtomicU8,
}

#[cfg(target_pointer_width = "64")]
const_assert_eq!(core::mem::size_of::<Object>(), 32);

impl Object {
    /// Create an object in the pre-initialization state: count zero, no
    /// kind, no parent, empty flags.
    ///
    /// This is the "freshly zeroed memory" an embedder owns before the
    /// lifecycle starts; [`initialize`](Object::initialize) must run
    /// before any other operation.
    pub const fn new() -> Self {
        Self {
            refcount: AtomicUsize::new(0),
            kind: AtomicPtr::new(ptr::null_mut()),
            parent: AtomicPtr::new(ptr::null_mut()),
            state: AtomicU8::new(0),
        }
    }

    /// Start the object's lifecycle: count becomes one (held by the
    /// caller), the kind is stored, and the object becomes usable.
    ///
    /// `kind` must outlive every reference ever taken on the object;
    /// `'static` enforces that. Initializing an object twice is a fatal
    /// contract violation.
    pub fn initialize(&self, kind: &'static Kind) {
        assert!(
            !self.is_initialized(),
            "object {} initialized twice",
            self.id()
        );
        self.refcount.store(1, Ordering::Relaxed);
        self.kind
            .store(kind as *const Kind as *mut Kind, Ordering::Release);
        self.parent.store(ptr::null_mut(), Ordering::Relaxed);
        self.state
            .fetch_or(ObjectState::INITIALIZED.bits(), Ordering::Release);
        log::trace!("object {} initialized as '{}'", self.id(), kind.name);
    }

    /// Take one additional owning reference and return the same object.
    ///
    /// Safe under arbitrary concurrency with other acquire/release calls.
    /// Callers must already hold a reference (or a lock that excludes
    /// teardown): acquiring through a path that may be mid-teardown is a
    /// contract violation this function cannot detect in general.
    pub fn acquire(&self) -> &Self {
        assert!(
            self.is_initialized(),
            "acquire on uninitialized object {}",
            self.id()
        );
        let prev = self.refcount.fetch_add(1, Ordering::Relaxed);
        debug_assert!(prev != 0, "acquire raced teardown of object {}", self.id());
        self
    }

    /// Give up one owning reference.
    ///
    /// Exactly one caller - the one whose decrement observes the count
    /// reach zero - runs teardown. The caller relinquishes the reference
    /// unconditionally and must not touch the object afterward. Releasing
    /// more times than references were granted is a fatal refcount
    /// underflow.
    pub fn release(&self) {
        assert!(
            self.is_initialized(),
            "release on uninitialized object {}",
            self.id()
        );
        // Single atomic decrement-and-test: each step's previous value is
        // observed by exactly one caller, so only one runs cleanup.
        let prev = self.refcount.fetch_sub(1, Ordering::Release);
        assert!(
            prev != 0,
            "refcount underflow: object {} released more times than acquired",
            self.id()
        );
        if prev == 1 {
            fence(Ordering::Acquire);
            self.cleanup();
        }
    }

    /// Defensive release through an optional reference; `None` is a no-op.
    pub fn release_opt(obj: Option<&Object>) {
        if let Some(obj) = obj {
            obj.release();
        }
    }

    /// One-time teardown, reached only from the zero transition of
    /// [`release`](Object::release).
    fn cleanup(&self) {
        // Unlink first: teardown must not leave a live registry flag or a
        // held parent reference behind. Detach is idempotent, so this is
        // harmless for objects that were never linked nor indexed.
        self.detach();

        log::debug!(
            "object {} ('{}') torn down",
            self.id(),
            self.kind_name().unwrap_or("?")
        );
        if let Some(kind) = self.kind_ref() {
            if let Some(release) = kind.release {
                release(self);
            }
        }
    }

    /// Unlink the object: clear its registry flag and drop its hold on the
    /// parent, if any.
    ///
    /// Idempotent with respect to the parent edge - the edge is taken
    /// before the parent is released, so a second detach observes no
    /// parent and releases nothing. Releasing the parent may cascade
    /// teardown up the ownership chain.
    pub fn detach(&self) {
        assert!(
            self.is_initialized(),
            "detach on uninitialized object {}",
            self.id()
        );
        self.clear_registered();
        let parent = self.parent.swap(ptr::null_mut(), Ordering::AcqRel);
        if let Some(parent) = NonNull::new(parent) {
            log::trace!(
                "object {} detached from parent {:#x}",
                self.id(),
                parent.as_ptr() as usize
            );
            // SAFETY: the edge held a strong reference on the parent since
            // `link_parent`, so the pointee is alive until this release.
            unsafe { parent.as_ref().release() };
        }
    }

    /// Defensive detach through an optional reference; `None` is a no-op.
    pub fn detach_opt(obj: Option<&Object>) {
        if let Some(obj) = obj {
            obj.detach();
        }
    }

    /// Install a strong edge to `parent`, incrementing its count.
    ///
    /// The edge is released exactly once when this object detaches. Fails
    /// with [`ObjectError::ParentAlreadyLinked`] if an edge already
    /// exists; the transient reference taken on `parent` is dropped again
    /// in that case.
    pub fn link_parent(&self, parent: &Object) -> Result<()> {
        assert!(
            self.is_initialized(),
            "link on uninitialized object {}",
            self.id()
        );
        let held = parent.acquire() as *const Object as *mut Object;
        match self.parent.compare_exchange(
            ptr::null_mut(),
            held,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                log::trace!("object {} linked under parent {}", self.id(), parent.id());
                Ok(())
            }
            Err(_) => {
                parent.release();
                Err(ObjectError::ParentAlreadyLinked)
            }
        }
    }

    /// Mark the object as indexed by a registry.
    ///
    /// For registry implementations; fails if the object is already
    /// indexed somewhere.
    pub fn mark_registered(&self) -> Result<()> {
        assert!(
            self.is_initialized(),
            "register on uninitialized object {}",
            self.id()
        );
        let prev = self
            .state
            .fetch_or(ObjectState::IN_REGISTRY.bits(), Ordering::AcqRel);
        if prev & ObjectState::IN_REGISTRY.bits() != 0 {
            return Err(ObjectError::AlreadyRegistered);
        }
        Ok(())
    }

    /// Clear the registry flag, returning whether it was set.
    ///
    /// For registry implementations; also run by the framework itself when
    /// the object detaches.
    pub fn clear_registered(&self) -> bool {
        let prev = self
            .state
            .fetch_and(!ObjectState::IN_REGISTRY.bits(), Ordering::AcqRel);
        prev & ObjectState::IN_REGISTRY.bits() != 0
    }

    /// Current ownership count.
    pub fn refcount(&self) -> usize {
        self.refcount.load(Ordering::Acquire)
    }

    /// Address-derived identity of this object.
    #[inline]
    pub fn id(&self) -> ObjectId {
        ObjectId(self as *const Object as usize)
    }

    /// Current state flags.
    pub fn state(&self) -> ObjectState {
        ObjectState::from_bits_truncate(self.state.load(Ordering::Acquire))
    }

    /// Whether `initialize` has run.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state().contains(ObjectState::INITIALIZED)
    }

    /// Whether a registry currently indexes this object.
    #[inline]
    pub fn is_registered(&self) -> bool {
        self.state().contains(ObjectState::IN_REGISTRY)
    }

    /// Whether a parent edge is installed.
    pub fn has_parent(&self) -> bool {
        !self.parent.load(Ordering::Acquire).is_null()
    }

    /// Identity of the linked parent, if any.
    pub fn parent_id(&self) -> Option<ObjectId> {
        NonNull::new(self.parent.load(Ordering::Acquire)).map(|p| ObjectId(p.as_ptr() as usize))
    }

    /// Name of the object's kind, once initialized.
    pub fn kind_name(&self) -> Option<&'static str> {
        self.kind_ref().map(|k| k.name)
    }

    fn kind_ref(&self) -> Option<&'static Kind> {
        // SAFETY: the pointer is null or a `&'static Kind` stored by
        // `initialize`.
        unsafe { self.kind.load(Ordering::Acquire).as_ref() }
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id())
            .field("kind", &self.kind_name().unwrap_or("?"))
            .field("refcount", &self.refcount())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    static NOOP_KIND: Kind = Kind::new("noop");

    // ========================================================================
    // Lifecycle Tests
    // ========================================================================

    #[test]
    fn test_initialize_grants_single_reference() {
        let obj = Object::new();
        assert!(!obj.is_initialized());
        assert_eq!(obj.refcount(), 0);

        obj.initialize(&NOOP_KIND);
        assert!(obj.is_initialized());
        assert_eq!(obj.refcount(), 1);
        assert_eq!(obj.kind_name(), Some("noop"));
        assert!(!obj.has_parent());
        assert!(!obj.is_registered());
    }

    #[test]
    fn test_acquire_returns_same_object() {
        let obj = Object::new();
        obj.initialize(&NOOP_KIND);

        let other = obj.acquire();
        assert_eq!(other.id(), obj.id());
        assert_eq!(obj.refcount(), 2);
        other.release();
        assert_eq!(obj.refcount(), 1);
    }

    #[test]
    fn test_last_release_runs_kind_release_once() {
        static TORN: AtomicUsize = AtomicUsize::new(0);
        fn on_release(_obj: &Object) {
            TORN.fetch_add(1, Ordering::SeqCst);
        }
        static KIND: Kind = Kind::with_release("flagged", on_release);

        let obj = Object::new();
        obj.initialize(&KIND);
        obj.acquire();
        assert_eq!(obj.refcount(), 2);

        obj.release();
        assert_eq!(TORN.load(Ordering::SeqCst), 0);

        obj.release();
        assert_eq!(TORN.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_opt_none_is_noop() {
        Object::release_opt(None);
        Object::detach_opt(None);

        let obj = Object::new();
        obj.initialize(&NOOP_KIND);
        obj.acquire();
        Object::release_opt(Some(&obj));
        assert_eq!(obj.refcount(), 1);
    }

    // ========================================================================
    // Parent Chain Tests
    // ========================================================================

    #[test]
    fn test_link_parent_holds_reference() {
        let parent = Object::new();
        parent.initialize(&NOOP_KIND);
        let child = Object::new();
        child.initialize(&NOOP_KIND);

        child.link_parent(&parent).unwrap();
        assert_eq!(parent.refcount(), 2);
        assert_eq!(child.parent_id(), Some(parent.id()));
    }

    #[test]
    fn test_link_parent_twice_fails_without_leak() {
        let parent = Object::new();
        parent.initialize(&NOOP_KIND);
        let other = Object::new();
        other.initialize(&NOOP_KIND);
        let child = Object::new();
        child.initialize(&NOOP_KIND);

        child.link_parent(&parent).unwrap();
        assert_eq!(
            child.link_parent(&other),
            Err(ObjectError::ParentAlreadyLinked)
        );
        // The rejected link must not leave a reference on either object.
        assert_eq!(other.refcount(), 1);
        assert_eq!(parent.refcount(), 2);
        assert_eq!(child.parent_id(), Some(parent.id()));
    }

    #[test]
    fn test_detach_is_idempotent() {
        let parent = Object::new();
        parent.initialize(&NOOP_KIND);
        let child = Object::new();
        child.initialize(&NOOP_KIND);
        child.link_parent(&parent).unwrap();

        child.detach();
        assert_eq!(parent.refcount(), 1);
        assert!(!child.has_parent());

        child.detach();
        assert_eq!(parent.refcount(), 1);
    }

    #[test]
    fn test_parent_survives_while_other_owner_holds() {
        static TORN: AtomicUsize = AtomicUsize::new(0);
        fn on_release(_obj: &Object) {
            TORN.fetch_add(1, Ordering::SeqCst);
        }
        static KIND: Kind = Kind::with_release("parent", on_release);

        let parent = Object::new();
        parent.initialize(&KIND);
        let child = Object::new();
        child.initialize(&NOOP_KIND);
        child.link_parent(&parent).unwrap();
        assert_eq!(parent.refcount(), 2);

        // The child's teardown releases the parent back to one owner.
        child.release();
        assert_eq!(parent.refcount(), 1);
        assert_eq!(TORN.load(Ordering::SeqCst), 0);

        parent.release();
        assert_eq!(TORN.load(Ordering::SeqCst), 1);
    }

    // ========================================================================
    // Registry Flag Tests
    // ========================================================================

    #[test]
    fn test_registry_flag_discipline() {
        let obj = Object::new();
        obj.initialize(&NOOP_KIND);

        obj.mark_registered().unwrap();
        assert!(obj.is_registered());
        assert_eq!(obj.mark_registered(), Err(ObjectError::AlreadyRegistered));

        assert!(obj.clear_registered());
        assert!(!obj.clear_registered());
        assert!(!obj.is_registered());
    }

    #[test]
    fn test_cleanup_clears_registry_flag() {
        let obj = Object::new();
        obj.initialize(&NOOP_KIND);
        obj.mark_registered().unwrap();

        obj.release();
        assert!(!obj.is_registered());
    }

    // ========================================================================
    // Contract Violation Tests
    // ========================================================================

    #[test]
    #[should_panic(expected = "uninitialized")]
    fn test_acquire_before_initialize_panics() {
        let obj = Object::new();
        obj.acquire();
    }

    #[test]
    #[should_panic(expected = "initialized twice")]
    fn test_double_initialize_panics() {
        let obj = Object::new();
        obj.initialize(&NOOP_KIND);
        obj.initialize(&NOOP_KIND);
    }

    #[test]
    #[should_panic(expected = "refcount underflow")]
    fn test_release_after_teardown_panics() {
        let obj = Object::new();
        obj.initialize(&NOOP_KIND);
        obj.release();
        // The object is gone; over-releasing dies loudly instead of
        // corrupting state silently.
        obj.release();
    }
}
