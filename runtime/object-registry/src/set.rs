//! Object Sets
//!
//! An `ObjectSet` collects related objects under a named, non-owning
//! index. The set embeds its own [`Object`], so set lifetimes follow the
//! same rules as everything else: the creator holds one reference,
//! further owners come from `acquire`, and the last release runs the set
//! kind's teardown.
//!
//! Membership is deliberately non-owning in both directions. An entry
//! records identity and name only, and adding a member takes no reference
//! on the set either - a consumer that needs the set kept alive holds the
//! set's object or links it as a parent explicitly.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use object_core::{Kind, Object, ObjectError, ObjectId, Registry, Result};
use spin::Mutex;

/// Kind shared by every set's embedded object.
static SET_KIND: Kind = Kind::with_release("object_set", release_set);

fn release_set(obj: &Object) {
    // Set storage belongs to the set's creator; nothing to reclaim here.
    log::debug!("object set {} torn down", obj.id());
}

/// Named, non-owning membership index for live objects.
///
/// Members stay wherever their embedders put them; the index holds their
/// [`ObjectId`] and a per-set name. The usual contract applies: the set
/// must stay at a stable address while other owners or parent edges refer
/// to its embedded object.
pub struct ObjectSet {
    /// The set's own lifecycle handle.
    object: Object,

    /// Diagnostic name of the set.
    name: &'static str,

    /// Member index keyed by object identity.
    members: Mutex<BTreeMap<ObjectId, String>>,
}

impl ObjectSet {
    /// Create a set; the creator holds its single reference.
    pub fn new(name: &'static str) -> Self {
        let set = Self {
            object: Object::new(),
            name,
            members: Mutex::new(BTreeMap::new()),
        };
        set.object.initialize(&SET_KIND);
        log::trace!("object set '{}' created", name);
        set
    }

    /// The set's embedded object, for acquire/release/link operations.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Name of the set.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Index `obj` under `name`. The entry is non-owning.
    ///
    /// # Arguments
    /// * `name` - Identifier for the member, unique within this set
    /// * `obj` - Initialized object to index
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(AlreadyRegistered)` if the object is indexed here or elsewhere
    /// * `Err(DuplicateName)` if the name is taken in this set
    pub fn add(&self, name: &str, obj: &Object) -> Result<()> {
        let mut members = self.members.lock();
        if members.contains_key(&obj.id()) {
            return Err(ObjectError::AlreadyRegistered);
        }
        if members.values().any(|taken| taken == name) {
            return Err(ObjectError::DuplicateName);
        }
        obj.mark_registered()?;
        members.insert(obj.id(), String::from(name));
        log::debug!("set '{}': added '{}' ({})", self.name, name, obj.id());
        Ok(())
    }

    /// Forget `obj` and clear its registry flag.
    ///
    /// Also valid for an entry whose object was torn down while indexed;
    /// the flag is already clear then and only the entry goes away.
    pub fn remove(&self, obj: &Object) -> Result<()> {
        match self.members.lock().remove(&obj.id()) {
            Some(name) => {
                obj.clear_registered();
                log::debug!("set '{}': removed '{}' ({})", self.name, name, obj.id());
                Ok(())
            }
            None => Err(ObjectError::NotRegistered),
        }
    }

    /// Purge an entry by identity alone.
    ///
    /// For stale entries left behind by an object torn down while still
    /// indexed, where no live reference exists to pass to
    /// [`remove`](ObjectSet::remove).
    pub fn remove_by_id(&self, id: ObjectId) -> Result<()> {
        match self.members.lock().remove(&id) {
            Some(name) => {
                log::debug!("set '{}': purged '{}' ({})", self.name, name, id);
                Ok(())
            }
            None => Err(ObjectError::NotRegistered),
        }
    }

    /// Whether `obj` is currently indexed here.
    pub fn contains(&self, obj: &Object) -> bool {
        self.members.lock().contains_key(&obj.id())
    }

    /// Name an object was indexed under, if present.
    pub fn member_name(&self, id: ObjectId) -> Option<String> {
        self.members.lock().get(&id).cloned()
    }

    /// All member names, in identity order.
    pub fn member_names(&self) -> Vec<String> {
        self.members.lock().values().cloned().collect()
    }

    /// Number of indexed members.
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }
}

impl Registry for ObjectSet {
    fn register(&self, obj: &Object) -> Result<()> {
        // Derive the index name from the member's kind and identity.
        let name = alloc::format!("{}:{}", obj.kind_name().unwrap_or("object"), obj.id());
        self.add(&name, obj)
    }

    fn unregister(&self, obj: &Object) -> Result<()> {
        self.remove(obj)
    }
}

impl Drop for ObjectSet {
    /// Releases the creator's reference. Any other owner of the set's
    /// object must be gone by now; members should have been removed,
    /// since their registered flags would otherwise stay set.
    fn drop(&mut self) {
        let leftover = self.members.get_mut().len();
        if leftover != 0 {
            log::warn!(
                "set '{}' dropped with {} members still indexed",
                self.name,
                leftover
            );
        }
        self.object.release();
    }
}
