//! Interned asset identifier.
//!
//! Grounded on the same insert-or-reuse singleton storage `fyrox-core`'s `ImmutableString`
//! uses for its hash-map keys, except identity here is the backing allocation itself: two
//! `AssetId`s naming the same string always point at the same `Arc`, so equality and hashing
//! are pointer comparisons, not string comparisons.

use fxhash::FxHashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

static INTERNER: Lazy<Mutex<FxHashMap<Box<str>, Arc<str>>>> =
    Lazy::new(|| Mutex::new(FxHashMap::default()));

/// Stable, hashable, totally-ordered name of an asset. Cheap to clone (an `Arc` bump) and
/// cheap to compare (a pointer compare), at the cost of a one-time lookup in a global table
/// the first time a given string is seen.
#[derive(Clone)]
pub struct AssetId(Arc<str>);

impl AssetId {
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let mut table = INTERNER.lock();
        if let Some(existing) = table.get(name) {
            return AssetId(existing.clone());
        }
        let arc: Arc<str> = Arc::from(name);
        table.insert(Box::from(name), arc.clone());
        AssetId(arc)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        AssetId::new(value)
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        AssetId::new(value)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({:?})", self.0)
    }
}

impl PartialEq for AssetId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for AssetId {}

impl Hash for AssetId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

impl PartialOrd for AssetId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AssetId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Pointer identity governs equality and hashing (see above), but a stable total order
        // still needs to be content-based so iteration order doesn't depend on intern history.
        self.0.as_ref().cmp(other.0.as_ref())
    }
}
