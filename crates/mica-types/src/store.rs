//! Structural interning for types, trees, and their component lists.
//!
//! The store converts [`TypeData`]/[`TreeData`] values into dense id
//! handles. Benefits:
//!
//! - O(1) equality (compare ids)
//! - each unique structure stored once
//! - the rewriting engine's identity-on-no-change guarantee is an
//!   integer comparison away
//!
//! All interning takes `&self`; the store locks per table internally.

use crate::symbol::SymbolId;
use crate::tree::{TreeData, TreeId};
use crate::types::{
    AnnotListId, AnnotationInfo, ScopeId, SymbolListId, TreeListId, TypeData, TypeId, TypeListId,
};
use mica_common::limits::TYPE_LIST_INLINE;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

/// Bidirectional interner for small `Copy` keys.
struct KeyInterner<K> {
    map: FxHashMap<K, u32>,
    keys: Vec<K>,
}

impl<K> KeyInterner<K>
where
    K: Copy + Eq + Hash,
{
    fn new() -> Self {
        KeyInterner {
            map: FxHashMap::default(),
            keys: Vec::new(),
        }
    }

    fn intern(&mut self, key: K) -> u32 {
        if let Some(&id) = self.map.get(&key) {
            return id;
        }
        let id = self.keys.len() as u32;
        self.keys.push(key);
        self.map.insert(key, id);
        id
    }

    fn get(&self, id: u32) -> Option<K> {
        self.keys.get(id as usize).copied()
    }
}

/// Interner for slices; the empty slice is always id 0.
struct SliceInterner<T> {
    items: Vec<Arc<[T]>>,
    map: FxHashMap<Arc<[T]>, u32>,
}

impl<T> SliceInterner<T>
where
    T: Copy + Eq + Hash,
{
    fn new() -> Self {
        let empty: Arc<[T]> = Arc::from(Vec::new());
        let mut map = FxHashMap::default();
        map.insert(empty.clone(), 0);
        SliceInterner {
            items: vec![empty],
            map,
        }
    }

    fn intern(&mut self, items: &[T]) -> u32 {
        if items.is_empty() {
            return 0;
        }
        if let Some(&id) = self.map.get(items) {
            return id;
        }
        let arc: Arc<[T]> = Arc::from(items);
        let id = self.items.len() as u32;
        self.items.push(arc.clone());
        self.map.insert(arc, id);
        id
    }

    fn get(&self, id: u32) -> Option<Arc<[T]>> {
        self.items.get(id as usize).cloned()
    }

    fn empty(&self) -> Arc<[T]> {
        self.items[0].clone()
    }
}

/// Interning table for types, trees, and component lists.
pub struct TypeStore {
    types: RwLock<KeyInterner<TypeData>>,
    trees: RwLock<KeyInterner<TreeData>>,
    type_lists: RwLock<SliceInterner<TypeId>>,
    symbol_lists: RwLock<SliceInterner<SymbolId>>,
    scopes: RwLock<SliceInterner<SymbolId>>,
    tree_lists: RwLock<SliceInterner<TreeId>>,
    annot_lists: RwLock<SliceInterner<AnnotationInfo>>,
}

impl TypeStore {
    /// Create a store with the fixed types pre-interned at the ids
    /// declared on [`TypeId`]. The well-known class references use the
    /// fixed ids on [`crate::symbol::SymbolTable`].
    pub fn new() -> Self {
        use crate::symbol::SymbolTable;

        let store = TypeStore {
            types: RwLock::new(KeyInterner::new()),
            trees: RwLock::new(KeyInterner::new()),
            type_lists: RwLock::new(SliceInterner::new()),
            symbol_lists: RwLock::new(SliceInterner::new()),
            scopes: RwLock::new(SliceInterner::new()),
            tree_lists: RwLock::new(SliceInterner::new()),
            annot_lists: RwLock::new(SliceInterner::new()),
        };

        let fixed = [
            (TypeData::NoType, TypeId::NO_TYPE),
            (TypeData::Error, TypeId::ERROR),
            (TypeData::NoPrefix, TypeId::NO_PREFIX),
            (TypeData::Wildcard, TypeId::WILDCARD),
            (
                TypeData::TypeRef {
                    prefix: TypeId::NO_PREFIX,
                    sym: SymbolTable::ANY_CLASS,
                    args: TypeListId::EMPTY,
                },
                TypeId::ANY,
            ),
            (
                TypeData::TypeRef {
                    prefix: TypeId::NO_PREFIX,
                    sym: SymbolTable::ANY_REF_CLASS,
                    args: TypeListId::EMPTY,
                },
                TypeId::ANY_REF,
            ),
            (
                TypeData::TypeRef {
                    prefix: TypeId::NO_PREFIX,
                    sym: SymbolTable::NOTHING_CLASS,
                    args: TypeListId::EMPTY,
                },
                TypeId::NOTHING,
            ),
            (
                TypeData::TypeRef {
                    prefix: TypeId::NO_PREFIX,
                    sym: SymbolTable::SINGLETON_CLASS,
                    args: TypeListId::EMPTY,
                },
                TypeId::SINGLETON,
            ),
        ];
        for (data, expected) in fixed {
            let id = store.intern(data);
            debug_assert_eq!(id, expected, "fixed type interned out of order");
        }

        let empty = store.intern_tree(TreeData::Empty);
        debug_assert_eq!(empty, TreeId::EMPTY);

        store
    }

    // ----- types -----

    /// Intern a type, returning its id. Structurally equal inputs get
    /// equal ids.
    pub fn intern(&self, data: TypeData) -> TypeId {
        let mut types = self.types.write().expect("type table lock poisoned");
        TypeId(types.intern(data))
    }

    /// Look a type up by id. Panics on an unknown id; a dangling
    /// `TypeId` is a programming error, not a recoverable state.
    pub fn lookup(&self, id: TypeId) -> TypeData {
        self.try_lookup(id)
            .unwrap_or_else(|| panic!("unknown type id {id:?}"))
    }

    pub fn try_lookup(&self, id: TypeId) -> Option<TypeData> {
        self.types
            .read()
            .expect("type table lock poisoned")
            .get(id.0)
    }

    // ----- trees -----

    pub fn intern_tree(&self, data: TreeData) -> TreeId {
        let mut trees = self.trees.write().expect("tree table lock poisoned");
        TreeId(trees.intern(data))
    }

    pub fn lookup_tree(&self, id: TreeId) -> TreeData {
        self.trees
            .read()
            .expect("tree table lock poisoned")
            .get(id.0)
            .unwrap_or_else(|| panic!("unknown tree id {id:?}"))
    }

    // ----- lists -----

    pub fn intern_type_list(&self, items: &[TypeId]) -> TypeListId {
        let mut lists = self.type_lists.write().expect("type list lock poisoned");
        TypeListId(lists.intern(items))
    }

    pub fn type_list(&self, id: TypeListId) -> Arc<[TypeId]> {
        let lists = self.type_lists.read().expect("type list lock poisoned");
        lists.get(id.0).unwrap_or_else(|| lists.empty())
    }

    pub fn intern_symbol_list(&self, items: &[SymbolId]) -> SymbolListId {
        let mut lists = self
            .symbol_lists
            .write()
            .expect("symbol list lock poisoned");
        SymbolListId(lists.intern(items))
    }

    pub fn symbol_list(&self, id: SymbolListId) -> Arc<[SymbolId]> {
        let lists = self.symbol_lists.read().expect("symbol list lock poisoned");
        lists.get(id.0).unwrap_or_else(|| lists.empty())
    }

    /// Intern a member scope. Order is preserved; duplicates keep their
    /// first occurrence.
    pub fn intern_scope(&self, members: &[SymbolId]) -> ScopeId {
        let mut deduped: SmallVec<[SymbolId; TYPE_LIST_INLINE]> =
            SmallVec::with_capacity(members.len());
        for &sym in members {
            if !deduped.contains(&sym) {
                deduped.push(sym);
            }
        }
        let mut scopes = self.scopes.write().expect("scope lock poisoned");
        ScopeId(scopes.intern(&deduped))
    }

    pub fn scope_members(&self, id: ScopeId) -> Arc<[SymbolId]> {
        let scopes = self.scopes.read().expect("scope lock poisoned");
        scopes.get(id.0).unwrap_or_else(|| scopes.empty())
    }

    pub fn intern_tree_list(&self, items: &[TreeId]) -> TreeListId {
        let mut lists = self.tree_lists.write().expect("tree list lock poisoned");
        TreeListId(lists.intern(items))
    }

    pub fn tree_list(&self, id: TreeListId) -> Arc<[TreeId]> {
        let lists = self.tree_lists.read().expect("tree list lock poisoned");
        lists.get(id.0).unwrap_or_else(|| lists.empty())
    }

    pub fn intern_annot_list(&self, items: &[AnnotationInfo]) -> AnnotListId {
        let mut lists = self
            .annot_lists
            .write()
            .expect("annotation list lock poisoned");
        AnnotListId(lists.intern(items))
    }

    pub fn annot_list(&self, id: AnnotListId) -> Arc<[AnnotationInfo]> {
        let lists = self.annot_lists.read().expect("annotation list lock poisoned");
        lists.get(id.0).unwrap_or_else(|| lists.empty())
    }

    // ----- type constructors -----

    pub fn type_ref(&self, prefix: TypeId, sym: SymbolId, args: &[TypeId]) -> TypeId {
        let args = self.intern_type_list(args);
        self.type_ref_ids(prefix, sym, args)
    }

    pub fn type_ref_ids(&self, prefix: TypeId, sym: SymbolId, args: TypeListId) -> TypeId {
        self.intern(TypeData::TypeRef { prefix, sym, args })
    }

    pub fn single_type(&self, prefix: TypeId, sym: SymbolId) -> TypeId {
        self.intern(TypeData::SingleType { prefix, sym })
    }

    pub fn this_type(&self, sym: SymbolId) -> TypeId {
        self.intern(TypeData::ThisType { sym })
    }

    pub fn method_type(&self, params: SymbolListId, result: TypeId) -> TypeId {
        self.intern(TypeData::MethodType { params, result })
    }

    pub fn nullary_method(&self, result: TypeId) -> TypeId {
        self.intern(TypeData::NullaryMethod { result })
    }

    pub fn poly_type(&self, tparams: SymbolListId, result: TypeId) -> TypeId {
        self.intern(TypeData::PolyType { tparams, result })
    }

    pub fn existential(&self, quantified: SymbolListId, underlying: TypeId) -> TypeId {
        self.intern(TypeData::Existential {
            quantified,
            underlying,
        })
    }

    pub fn refined(&self, parents: &[TypeId], decls: ScopeId) -> TypeId {
        let parents = self.intern_type_list(parents);
        self.intern(TypeData::Refined { parents, decls })
    }

    pub fn annotated(&self, annots: AnnotListId, underlying: TypeId) -> TypeId {
        self.intern(TypeData::Annotated { annots, underlying })
    }

    pub fn bounded_wildcard(&self, lo: TypeId, hi: TypeId) -> TypeId {
        self.intern(TypeData::BoundedWildcard { lo, hi })
    }

    pub fn type_bounds(&self, lo: TypeId, hi: TypeId) -> TypeId {
        self.intern(TypeData::TypeBounds { lo, hi })
    }

    pub fn type_var(&self, origin: SymbolId) -> TypeId {
        self.intern(TypeData::TypeVar { origin })
    }
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../tests/store_tests.rs"]
mod tests;
