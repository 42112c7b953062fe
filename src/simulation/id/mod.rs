use ahash::HashMap;
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed identifier with an interned external label and a dense internal index.
/// Cloning is cheap, as the external label is reference counted. Ids can be used
/// in hash maps/sets in combination with NoHashHasher, to achieve fast look ups
/// with no randomness involved.
pub struct Id<T> {
    internal: u64,
    external: Arc<str>,
    _type_marker: PhantomData<T>,
}

impl<T> Id<T> {
    /// Creates an id which is not attached to any id store. The intended way of
    /// creating ids is IdStore::create_id, which keeps internal indices dense.
    pub fn new(internal: u64, external: &str) -> Self {
        Id {
            internal,
            external: Arc::from(external),
            _type_marker: PhantomData,
        }
    }

    pub fn internal(&self) -> u64 {
        self.internal
    }

    pub fn external(&self) -> &str {
        &self.external
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Id {
            internal: self.internal,
            external: self.external.clone(),
            _type_marker: PhantomData,
        }
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Id({}/{})", self.internal, self.external)
    }
}

impl<T> Display for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.external())
    }
}

/// PartialEq, Eq, Hash, Ord all rely on the internal index only.
impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.internal == other.internal
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // write u64 directly, so that ids work with NoHashHasher
        state.write_u64(self.internal);
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.internal.cmp(&other.internal)
    }
}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> nohash_hasher::IsEnabled for Id<T> {}
impl<T> nohash_hasher::IsEnabled for &Id<T> {}

/// Per-run id store. Each run owns its stores (the network owns the stores for
/// nodes and links); there is no process wide state involved.
#[derive(Debug)]
pub struct IdStore<T> {
    ids: Vec<Id<T>>,
    mapping: HashMap<Arc<str>, u64>,
}

impl<T> Default for IdStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IdStore<T> {
    pub fn new() -> Self {
        IdStore {
            ids: Vec::new(),
            mapping: HashMap::default(),
        }
    }

    /// Returns the id for the external label, creating and interning it if necessary.
    pub fn create_id(&mut self, external: &str) -> Id<T> {
        if let Some(internal) = self.mapping.get(external) {
            return self.ids[*internal as usize].clone();
        }
        let id = Id::new(self.ids.len() as u64, external);
        self.mapping.insert(id.external.clone(), id.internal);
        self.ids.push(id.clone());
        id
    }

    pub fn get(&self, internal: u64) -> Id<T> {
        self.ids[internal as usize].clone()
    }

    pub fn try_get_from_ext(&self, external: &str) -> Option<Id<T>> {
        self.mapping
            .get(external)
            .map(|internal| self.ids[*internal as usize].clone())
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}
