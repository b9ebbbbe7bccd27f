//! String interner for name deduplication.
//!
//! Names flow through every layer of the compiler, so we intern them once
//! into a shared pool and pass around u32 handles (`Atom`s). Comparisons
//! become integer comparisons, and the many repeated occurrences of names
//! like `apply`, `Any`, or `T` share one allocation.

use rustc_hash::{FxHashMap, FxHasher};
use serde::Serialize;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

/// An interned name.
///
/// Atoms are cheap to copy (just a u32) and compare with `==` in O(1).
/// To get the actual string back, use [`NameInterner::resolve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Default, PartialOrd, Ord)]
pub struct Atom(pub u32);

impl Atom {
    /// A sentinel value representing no name / the empty string.
    pub const NONE: Atom = Atom(0);

    /// Check if this is the empty/none atom.
    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Get the raw index value.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

const SHARD_BITS: u32 = 6;
const SHARD_COUNT: usize = 1 << SHARD_BITS;
const SHARD_MASK: u32 = (SHARD_COUNT as u32) - 1;

/// Names every compilation touches, pre-interned for cache locality.
const COMMON_NAMES: &[&str] = &[
    // Language keywords
    "abstract",
    "case",
    "class",
    "def",
    "extends",
    "final",
    "implicit",
    "import",
    "lazy",
    "match",
    "new",
    "object",
    "override",
    "package",
    "private",
    "protected",
    "sealed",
    "super",
    "this",
    "trait",
    "type",
    "val",
    "var",
    "with",
    "yield",
    // Well-known types and members
    "Any",
    "AnyRef",
    "AnyVal",
    "Nothing",
    "Null",
    "Singleton",
    "Unit",
    "Boolean",
    "Int",
    "Long",
    "Double",
    "String",
    "Option",
    "List",
    "Seq",
    "Map",
    "Function1",
    "Product",
    "Serializable",
    "apply",
    "unapply",
    "update",
    "equals",
    "hashCode",
    "toString",
    // Frequent one-letter type parameter names
    "A",
    "B",
    "T",
    "U",
    "V",
    "K",
    "R",
    "_root_",
    "<empty>",
];

#[derive(Default)]
struct ShardState {
    map: FxHashMap<Arc<str>, Atom>,
    names: Vec<Arc<str>>,
}

struct NameShard {
    state: RwLock<ShardState>,
}

impl NameShard {
    fn new() -> Self {
        NameShard {
            state: RwLock::new(ShardState::default()),
        }
    }
}

/// Sharded string interner.
///
/// Interning and resolution take `&self`; shards keep lock contention low
/// when several phases intern concurrently. The shard index lives in the
/// low bits of the atom, the per-shard index in the high bits, so resolve
/// is a direct two-level lookup.
pub struct NameInterner {
    shards: [NameShard; SHARD_COUNT],
}

impl NameInterner {
    /// Create a new interner with the empty string pre-interned at atom 0
    /// and the common-name pool populated.
    pub fn new() -> Self {
        let shards = std::array::from_fn(|_| NameShard::new());

        if let Ok(mut state) = shards[0].state.write() {
            let empty: Arc<str> = Arc::from("");
            state.names.push(empty.clone());
            state.map.insert(empty, Atom::NONE);
        }

        let interner = NameInterner { shards };
        for s in COMMON_NAMES {
            interner.intern(s);
        }
        interner
    }

    /// Intern a string, returning its Atom handle.
    /// If the string was already interned, returns the existing Atom.
    #[inline]
    pub fn intern(&self, s: &str) -> Atom {
        if s.is_empty() {
            return Atom::NONE;
        }

        let shard_idx = Self::shard_for(s);
        let shard = &self.shards[shard_idx];
        let mut state = shard.state.write().expect("name shard lock poisoned");

        if let Some(&atom) = state.map.get(s) {
            return atom;
        }

        let local_index = state.names.len() as u32;
        assert!(
            local_index <= (u32::MAX >> SHARD_BITS),
            "name interner shard overflow"
        );

        let atom = Self::make_atom(local_index, shard_idx as u32);
        let owned: Arc<str> = Arc::from(s);
        state.names.push(owned.clone());
        state.map.insert(owned, atom);
        atom
    }

    /// Resolve an Atom back to its string value.
    /// Returns the empty string for out-of-bounds atoms.
    #[inline]
    pub fn resolve(&self, atom: Atom) -> Arc<str> {
        self.try_resolve(atom).unwrap_or_else(|| Arc::from(""))
    }

    /// Try to resolve an Atom, returning None if it was never interned here.
    #[inline]
    pub fn try_resolve(&self, atom: Atom) -> Option<Arc<str>> {
        let (shard_idx, local_index) = Self::split_atom(atom);
        let shard = self.shards.get(shard_idx)?;
        let state = shard.state.read().ok()?;
        state.names.get(local_index).cloned()
    }

    /// Total number of interned names across all shards.
    #[inline]
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .state
                    .read()
                    .map(|state| state.names.len())
                    .unwrap_or(0)
            })
            .sum()
    }

    /// Check if the interner holds only the empty string.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    #[inline]
    fn shard_for(s: &str) -> usize {
        let mut hasher = FxHasher::default();
        s.hash(&mut hasher);
        (hasher.finish() as usize) & (SHARD_COUNT - 1)
    }

    #[inline]
    fn make_atom(local_index: u32, shard_idx: u32) -> Atom {
        Atom((local_index << SHARD_BITS) | (shard_idx & SHARD_MASK))
    }

    #[inline]
    fn split_atom(atom: Atom) -> (usize, usize) {
        if atom == Atom::NONE {
            return (0, 0);
        }
        let raw = atom.0;
        ((raw & SHARD_MASK) as usize, (raw >> SHARD_BITS) as usize)
    }
}

impl Default for NameInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../tests/interner_tests.rs"]
mod tests;
