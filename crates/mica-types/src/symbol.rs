//! Symbols and the symbol table.
//!
//! A symbol is a named, owned entity with identity-based equality and a
//! mutable `info` type. Symbols are long-lived and owned by the table;
//! the rewriting engine reads them freely but mutates only through the
//! narrow surface here (info updates when cloning bound symbols).
//!
//! Ids are allocated from an atomic counter and are therefore globally
//! monotonic. Substitution uses them as an opaque ordering key for its
//! fast membership-range check, so the counter must never be reset while
//! types referencing old symbols are alive.

use crate::types::TypeId;
use crate::variance::Variance;
use bitflags::bitflags;
use dashmap::DashMap;
use mica_common::Atom;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::trace;

/// Identity of a symbol. Equality is identity; two symbols with equal
/// names and owners are still distinct entities.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    /// Sentinel for the absence of a symbol.
    pub const NONE: SymbolId = SymbolId(0);

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == Self::NONE.0
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != Self::NONE.0
    }
}

bitflags! {
    /// Classification flags, orthogonal to [`SymbolKind`].
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct SymbolFlags: u32 {
        /// A value or type parameter.
        const PARAM        = 1 << 0;
        /// An existentially bound quantifier.
        const EXISTENTIAL  = 1 << 1;
        /// A skolem standing in for a bound variable during checking.
        const SKOLEM       = 1 << 2;
        /// A term-level module (object).
        const MODULE       = 1 << 3;
        /// The class underlying a module.
        const MODULE_CLASS = 1 << 4;
        /// A package (always paired with MODULE_CLASS on the class side).
        const PACKAGE      = 1 << 5;
        /// Loaded from a classfile; generic references to it may be raw.
        const JAVA_DEFINED = 1 << 6;
        /// A type alias.
        const ALIAS        = 1 << 7;
        /// An abstract member.
        const DEFERRED     = 1 << 8;
        /// A stable value (val, module); its singleton type is meaningful.
        const STABLE       = 1 << 9;
        /// Carries an error from an earlier phase.
        const ERRONEOUS    = 1 << 10;
    }
}

/// Whether a symbol lives in the term or type namespace.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SymbolKind {
    /// Values, methods, modules, value parameters.
    Term,
    /// Abstract types, aliases, type parameters, existential quantifiers.
    Type,
    /// Classes, traits, module classes, packages.
    Class,
}

/// Stored data of one symbol. All fields are cheap handles; the struct
/// is copied out of the table on read.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SymbolData {
    pub name: Atom,
    pub kind: SymbolKind,
    pub flags: SymbolFlags,
    pub owner: SymbolId,
    /// Declared type; mutable through [`SymbolTable::set_info`].
    pub info: TypeId,
    /// Declared variance; meaningful for type parameters only.
    pub variance: Variance,
    /// For module classes: the term-level module they belong to.
    pub source_module: SymbolId,
}

impl SymbolData {
    pub fn new(name: Atom, kind: SymbolKind, owner: SymbolId) -> Self {
        SymbolData {
            name,
            kind,
            flags: SymbolFlags::empty(),
            owner,
            info: TypeId::NO_TYPE,
            variance: Variance::Invariant,
            source_module: SymbolId::NONE,
        }
    }

    pub fn term(name: Atom, owner: SymbolId) -> Self {
        Self::new(name, SymbolKind::Term, owner)
    }

    pub fn type_member(name: Atom, owner: SymbolId) -> Self {
        Self::new(name, SymbolKind::Type, owner)
    }

    pub fn class(name: Atom, owner: SymbolId) -> Self {
        Self::new(name, SymbolKind::Class, owner)
    }

    pub const fn with_flags(mut self, flags: SymbolFlags) -> Self {
        self.flags = flags;
        self
    }

    pub const fn with_info(mut self, info: TypeId) -> Self {
        self.info = info;
        self
    }

    pub const fn with_variance(mut self, variance: Variance) -> Self {
        self.variance = variance;
        self
    }
}

/// Table-owned storage for symbols.
///
/// Well-known symbols occupy fixed low ids so the rest of the compiler
/// can refer to them as constants; everything else is allocated from the
/// atomic counter.
pub struct SymbolTable {
    symbols: DashMap<SymbolId, SymbolData>,
    next_id: AtomicU32,
}

impl SymbolTable {
    /// The root package.
    pub const ROOT: SymbolId = SymbolId(1);
    /// The top class.
    pub const ANY_CLASS: SymbolId = SymbolId(2);
    /// The reference top class (classfile-interop `Object`).
    pub const ANY_REF_CLASS: SymbolId = SymbolId(3);
    /// The bottom class.
    pub const NOTHING_CLASS: SymbolId = SymbolId(4);
    /// The marker trait of singleton upper bounds.
    pub const SINGLETON_CLASS: SymbolId = SymbolId(5);

    const FIRST_FREE: u32 = 6;

    /// Create a table with the well-known symbols pre-registered.
    /// Their infos are wired by `TypeContext::new` once the type store
    /// exists.
    pub fn new(root_name: Atom, well_known_names: [Atom; 4]) -> Self {
        let table = SymbolTable {
            symbols: DashMap::new(),
            next_id: AtomicU32::new(Self::FIRST_FREE),
        };
        let [any, any_ref, nothing, singleton] = well_known_names;

        table.symbols.insert(
            Self::ROOT,
            SymbolData::class(root_name, SymbolId::NONE)
                .with_flags(SymbolFlags::PACKAGE | SymbolFlags::MODULE_CLASS),
        );
        table
            .symbols
            .insert(Self::ANY_CLASS, SymbolData::class(any, Self::ROOT));
        table
            .symbols
            .insert(Self::ANY_REF_CLASS, SymbolData::class(any_ref, Self::ROOT));
        table
            .symbols
            .insert(Self::NOTHING_CLASS, SymbolData::class(nothing, Self::ROOT));
        table.symbols.insert(
            Self::SINGLETON_CLASS,
            SymbolData::class(singleton, Self::ROOT),
        );
        table
    }

    /// Register a new symbol and return its id.
    pub fn register(&self, data: SymbolData) -> SymbolId {
        let id = SymbolId(self.next_id.fetch_add(1, Ordering::SeqCst));
        trace!(sym = id.0, name = data.name.0, "SymbolTable::register");
        self.symbols.insert(id, data);
        id
    }

    /// Copy a symbol's data out of the table. Panics on an unknown id;
    /// dangling symbol ids are a programming error.
    pub fn get(&self, id: SymbolId) -> SymbolData {
        *self
            .symbols
            .get(&id)
            .unwrap_or_else(|| panic!("unknown symbol id {id:?}"))
    }

    pub fn try_get(&self, id: SymbolId) -> Option<SymbolData> {
        self.symbols.get(&id).map(|r| *r)
    }

    /// Clone a symbol under a fresh id, keeping name, owner, flags, and
    /// info. The clone never shares identity with the original.
    pub fn clone_symbol(&self, id: SymbolId) -> SymbolId {
        self.register(self.get(id))
    }

    pub fn name(&self, id: SymbolId) -> Atom {
        self.get(id).name
    }

    pub fn owner(&self, id: SymbolId) -> SymbolId {
        self.get(id).owner
    }

    pub fn kind(&self, id: SymbolId) -> SymbolKind {
        self.get(id).kind
    }

    pub fn flags(&self, id: SymbolId) -> SymbolFlags {
        self.get(id).flags
    }

    pub fn info(&self, id: SymbolId) -> TypeId {
        self.get(id).info
    }

    pub fn variance(&self, id: SymbolId) -> Variance {
        self.get(id).variance
    }

    pub fn source_module(&self, id: SymbolId) -> SymbolId {
        self.get(id).source_module
    }

    /// Re-point a symbol's declared info. The only in-place mutation the
    /// rewriting engine performs.
    pub fn set_info(&self, id: SymbolId, info: TypeId) {
        if let Some(mut entry) = self.symbols.get_mut(&id) {
            entry.info = info;
        }
    }

    pub fn set_source_module(&self, id: SymbolId, module: SymbolId) {
        if let Some(mut entry) = self.symbols.get_mut(&id) {
            entry.source_module = module;
        }
    }

    /// Add classification flags to an existing symbol (classfile
    /// loading stamps `JAVA_DEFINED` after the fact, for example).
    pub fn add_flags(&self, id: SymbolId, flags: SymbolFlags) {
        if let Some(mut entry) = self.symbols.get_mut(&id) {
            entry.flags |= flags;
        }
    }

    // ----- classification helpers -----

    pub fn is_class(&self, id: SymbolId) -> bool {
        id.is_some() && self.kind(id) == SymbolKind::Class
    }

    pub fn is_type(&self, id: SymbolId) -> bool {
        id.is_some() && self.kind(id) == SymbolKind::Type
    }

    pub fn is_term(&self, id: SymbolId) -> bool {
        id.is_some() && self.kind(id) == SymbolKind::Term
    }

    pub fn is_alias_type(&self, id: SymbolId) -> bool {
        id.is_some() && self.flags(id).contains(SymbolFlags::ALIAS)
    }

    pub fn is_type_parameter(&self, id: SymbolId) -> bool {
        id.is_some()
            && self.kind(id) == SymbolKind::Type
            && self.flags(id).contains(SymbolFlags::PARAM)
    }

    pub fn is_value_parameter(&self, id: SymbolId) -> bool {
        id.is_some()
            && self.kind(id) == SymbolKind::Term
            && self.flags(id).contains(SymbolFlags::PARAM)
    }

    pub fn is_package_class(&self, id: SymbolId) -> bool {
        id.is_some() && self.flags(id).contains(SymbolFlags::PACKAGE)
    }

    pub fn is_module(&self, id: SymbolId) -> bool {
        id.is_some() && self.flags(id).contains(SymbolFlags::MODULE)
    }

    pub fn is_module_class(&self, id: SymbolId) -> bool {
        id.is_some() && self.flags(id).contains(SymbolFlags::MODULE_CLASS)
    }

    pub fn is_existential(&self, id: SymbolId) -> bool {
        id.is_some() && self.flags(id).contains(SymbolFlags::EXISTENTIAL)
    }

    pub fn is_existential_skolem(&self, id: SymbolId) -> bool {
        id.is_some()
            && self
                .flags(id)
                .contains(SymbolFlags::EXISTENTIAL | SymbolFlags::SKOLEM)
    }

    /// Stable symbols denote a single value; their singleton type can be
    /// substituted without approximation.
    pub fn is_stable_symbol(&self, id: SymbolId) -> bool {
        id.is_some()
            && self
                .flags(id)
                .intersects(SymbolFlags::STABLE | SymbolFlags::MODULE)
    }

    pub fn is_erroneous(&self, id: SymbolId) -> bool {
        id.is_some() && self.flags(id).contains(SymbolFlags::ERRONEOUS)
    }

    /// Owner chain from `id` (inclusive) up to and including the root.
    pub fn owner_chain(&self, id: SymbolId) -> Vec<SymbolId> {
        let mut chain = Vec::new();
        let mut cur = id;
        while cur.is_some() {
            chain.push(cur);
            if cur == Self::ROOT {
                break;
            }
            cur = self.owner(cur);
        }
        chain
    }

    /// Whether `outer` appears in the owner chain of `inner` (inclusive).
    pub fn is_nested_in(&self, inner: SymbolId, outer: SymbolId) -> bool {
        let mut cur = inner;
        while cur.is_some() {
            if cur == outer {
                return true;
            }
            if cur == Self::ROOT {
                return false;
            }
            cur = self.owner(cur);
        }
        false
    }

    /// Number of registered symbols, well-known ones included.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
#[path = "../tests/symbol_tests.rs"]
mod tests;
