//! The shared context handed to every rewriting pass.
//!
//! [`TypeContext`] bundles the name interner, the type/tree store, and
//! the symbol table, and exposes the narrow query surface the rewriting
//! engine needs from the surrounding compiler: widening, stability,
//! type-parameter lists, symbol-level subclassing, and member lookup by
//! name. Everything here is read-only over the stores except the
//! documented symbol constructors.

use crate::store::TypeStore;
use crate::symbol::{SymbolData, SymbolFlags, SymbolId, SymbolKind, SymbolTable};
use crate::types::{ScopeId, TypeData, TypeId};
use crate::variance::Variance;
use mica_common::interner::NameInterner;
use mica_common::limits::MAX_BASECLASS_DEPTH;
use mica_common::Atom;
use std::sync::Arc;

/// Name interner + type store + symbol table.
pub struct TypeContext {
    pub names: NameInterner,
    pub store: TypeStore,
    pub symbols: SymbolTable,
}

impl TypeContext {
    pub fn new() -> Self {
        let names = NameInterner::new();
        let root = names.intern("_root_");
        let well_known = [
            names.intern("Any"),
            names.intern("AnyRef"),
            names.intern("Nothing"),
            names.intern("Singleton"),
        ];
        let symbols = SymbolTable::new(root, well_known);
        let store = TypeStore::new();

        let ctx = TypeContext {
            names,
            store,
            symbols,
        };

        // Wire the well-known class infos now that both stores exist.
        let top_info = ctx.store.refined(&[], ScopeId::EMPTY);
        ctx.symbols.set_info(SymbolTable::ANY_CLASS, top_info);
        let sub_top = ctx.store.refined(&[TypeId::ANY], ScopeId::EMPTY);
        ctx.symbols.set_info(SymbolTable::ANY_REF_CLASS, sub_top);
        ctx.symbols.set_info(SymbolTable::NOTHING_CLASS, sub_top);
        ctx.symbols.set_info(SymbolTable::SINGLETON_CLASS, sub_top);

        ctx
    }

    pub fn intern_name(&self, s: &str) -> Atom {
        self.names.intern(s)
    }

    // ----- symbol constructors -----

    /// A fresh existential quantifier named `<base>.type`, used by the
    /// capture sites (prefix capture, dependent instantiation).
    pub fn fresh_existential(&self, owner: SymbolId, base: Atom, info: TypeId) -> SymbolId {
        let base_str = self.names.resolve(base);
        let name = self.names.intern(&format!("{base_str}.type"));
        self.symbols.register(
            SymbolData::type_member(name, owner)
                .with_flags(SymbolFlags::EXISTENTIAL)
                .with_info(info),
        )
    }

    /// A monomorphic class with the top class as its only parent.
    pub fn new_class(&self, name: Atom, owner: SymbolId) -> SymbolId {
        let info = self.store.refined(&[TypeId::ANY], ScopeId::EMPTY);
        self.symbols
            .register(SymbolData::class(name, owner).with_info(info))
    }

    /// A generic class; returns the class and its freshly created type
    /// parameters. The class info is the parameter binder wrapped around
    /// the class shape.
    pub fn new_generic_class(
        &self,
        name: Atom,
        owner: SymbolId,
        tparams: &[(Atom, Variance)],
    ) -> (SymbolId, Vec<SymbolId>) {
        let class = self.symbols.register(SymbolData::class(name, owner));
        let bounds = self.store.type_bounds(TypeId::NOTHING, TypeId::ANY);
        let params: Vec<SymbolId> = tparams
            .iter()
            .map(|&(pname, variance)| {
                self.symbols.register(
                    SymbolData::type_member(pname, class)
                        .with_flags(SymbolFlags::PARAM)
                        .with_info(bounds)
                        .with_variance(variance),
                )
            })
            .collect();
        let shape = self.store.refined(&[TypeId::ANY], ScopeId::EMPTY);
        let binder = self.store.intern_symbol_list(&params);
        let info = self.store.poly_type(binder, shape);
        self.symbols.set_info(class, info);
        (class, params)
    }

    /// Replace a class's parents, keeping its type-parameter binder and
    /// member scope.
    pub fn set_class_parents(&self, class: SymbolId, parents: &[TypeId]) {
        let decls = self.decls_of(class);
        let shape = self.store.refined(parents, decls);
        self.wrap_class_shape(class, shape);
    }

    /// Replace a class's member scope, keeping parents and binder.
    pub fn set_class_decls(&self, class: SymbolId, members: &[SymbolId]) {
        let parents = self.parents_of_class(class);
        let decls = self.store.intern_scope(members);
        let shape = self.store.refined(&parents, decls);
        self.wrap_class_shape(class, shape);
    }

    fn wrap_class_shape(&self, class: SymbolId, shape: TypeId) {
        let info = match self.store.lookup(self.symbols.info(class)) {
            TypeData::PolyType { tparams, .. } => self.store.poly_type(tparams, shape),
            _ => shape,
        };
        self.symbols.set_info(class, info);
    }

    /// A type alias `name = rhs`.
    pub fn new_type_alias(&self, name: Atom, owner: SymbolId, rhs: TypeId) -> SymbolId {
        self.symbols.register(
            SymbolData::type_member(name, owner)
                .with_flags(SymbolFlags::ALIAS)
                .with_info(rhs),
        )
    }

    /// A term member (val/def result shape decided by `info`).
    pub fn new_term(
        &self,
        name: Atom,
        owner: SymbolId,
        info: TypeId,
        flags: SymbolFlags,
    ) -> SymbolId {
        self.symbols
            .register(SymbolData::term(name, owner).with_flags(flags).with_info(info))
    }

    /// A value parameter of a method type.
    pub fn new_value_param(&self, name: Atom, owner: SymbolId, info: TypeId) -> SymbolId {
        self.new_term(name, owner, info, SymbolFlags::PARAM)
    }

    /// A module (object) and its underlying module class, cross-linked.
    pub fn new_module(&self, name: Atom, owner: SymbolId) -> (SymbolId, SymbolId) {
        let class_info = self.store.refined(&[TypeId::ANY], ScopeId::EMPTY);
        let mclass = self.symbols.register(
            SymbolData::class(name, owner)
                .with_flags(SymbolFlags::MODULE_CLASS)
                .with_info(class_info),
        );
        let mtpe = self.store.type_ref(TypeId::NO_PREFIX, mclass, &[]);
        let module = self.symbols.register(
            SymbolData::term(name, owner)
                .with_flags(SymbolFlags::MODULE | SymbolFlags::STABLE)
                .with_info(mtpe),
        );
        self.symbols.set_source_module(mclass, module);
        (module, mclass)
    }

    // ----- type queries -----

    /// The symbol a type is headed by, if any.
    pub fn type_symbol_of(&self, tp: TypeId) -> SymbolId {
        match self.store.lookup(tp) {
            TypeData::TypeRef { sym, .. }
            | TypeData::SingleType { sym, .. }
            | TypeData::ThisType { sym }
            | TypeData::TypeVar { origin: sym } => sym,
            TypeData::Existential { underlying, .. }
            | TypeData::Annotated { underlying, .. }
            | TypeData::NullaryMethod { result: underlying }
            | TypeData::PolyType {
                result: underlying, ..
            } => self.type_symbol_of(underlying),
            _ => SymbolId::NONE,
        }
    }

    /// The prefix of a reference type, `NO_TYPE` otherwise.
    pub fn prefix_of(&self, tp: TypeId) -> TypeId {
        match self.store.lookup(tp) {
            TypeData::TypeRef { prefix, .. } | TypeData::SingleType { prefix, .. } => prefix,
            _ => TypeId::NO_TYPE,
        }
    }

    /// Strip singleton-ness: a path type widens to the declared type of
    /// its endpoint, a `this`-type to its class's type.
    pub fn widen(&self, tp: TypeId) -> TypeId {
        match self.store.lookup(tp) {
            TypeData::SingleType { sym, .. } => self.widen(self.symbols.info(sym)),
            TypeData::ThisType { sym } => self.type_of_class(sym),
            TypeData::Annotated { underlying, .. } => self.widen(underlying),
            _ => tp,
        }
    }

    /// The self-type of a class: a reference applied to its own
    /// parameters.
    pub fn type_of_class(&self, class: SymbolId) -> TypeId {
        let tparams = self.type_params_of(class);
        let args: Vec<TypeId> = tparams.iter().map(|&p| self.type_param_ref(p)).collect();
        self.store.type_ref(TypeId::NO_PREFIX, class, &args)
    }

    /// A bare reference to a type parameter or abstract type.
    pub fn type_param_ref(&self, sym: SymbolId) -> TypeId {
        self.store.type_ref(TypeId::NO_PREFIX, sym, &[])
    }

    /// Whether a type denotes a single, deterministically identified
    /// value. Stable types can be substituted without approximation.
    pub fn is_stable_type(&self, tp: TypeId) -> bool {
        match self.store.lookup(tp) {
            TypeData::ThisType { .. } | TypeData::SingleType { .. } | TypeData::NoPrefix => true,
            TypeData::TypeRef { sym, args, .. } if args.is_empty() => {
                if self.symbols.is_module_class(sym) {
                    return true;
                }
                // Existential quantifiers with a singleton upper bound
                // stand in for stable prefixes.
                self.symbols.is_existential(sym) && self.has_singleton_bound(sym)
            }
            TypeData::Annotated { underlying, .. } => self.is_stable_type(underlying),
            _ => false,
        }
    }

    fn has_singleton_bound(&self, sym: SymbolId) -> bool {
        let (_, hi) = self.bounds_of(sym);
        match self.store.lookup(hi) {
            TypeData::Refined { parents, .. } => self
                .store
                .type_list(parents)
                .iter()
                .any(|&p| p == TypeId::SINGLETON),
            _ => hi == TypeId::SINGLETON,
        }
    }

    /// Declared type parameters of a symbol (empty unless its info is a
    /// parameter binder).
    pub fn type_params_of(&self, sym: SymbolId) -> Arc<[SymbolId]> {
        if sym.is_none() {
            return self.store.symbol_list(crate::types::SymbolListId::EMPTY);
        }
        match self.store.lookup(self.symbols.info(sym)) {
            TypeData::PolyType { tparams, .. } => self.store.symbol_list(tparams),
            _ => self.store.symbol_list(crate::types::SymbolListId::EMPTY),
        }
    }

    /// A class's info with any parameter binder stripped.
    pub fn class_info_of(&self, sym: SymbolId) -> TypeId {
        let info = self.symbols.info(sym);
        match self.store.lookup(info) {
            TypeData::PolyType { result, .. } => result,
            _ => info,
        }
    }

    /// Declared parents of a class, in declaration order.
    pub fn parents_of_class(&self, sym: SymbolId) -> Vec<TypeId> {
        match self.store.lookup(self.class_info_of(sym)) {
            TypeData::Refined { parents, .. } => self.store.type_list(parents).to_vec(),
            _ => Vec::new(),
        }
    }

    /// Declared member scope of a class.
    pub fn decls_of(&self, sym: SymbolId) -> ScopeId {
        match self.store.lookup(self.class_info_of(sym)) {
            TypeData::Refined { decls, .. } => decls,
            _ => ScopeId::EMPTY,
        }
    }

    /// Declared bounds of a symbol. Non-bounds infos collapse to
    /// `(info, info)`; a missing info is unconstrained. An `Error` info
    /// deliberately yields error bounds so callers can detect them.
    pub fn bounds_of(&self, sym: SymbolId) -> (TypeId, TypeId) {
        let info = self.symbols.info(sym);
        match self.store.lookup(info) {
            TypeData::TypeBounds { lo, hi } => (lo, hi),
            TypeData::NoType => (TypeId::NOTHING, TypeId::ANY),
            _ => (info, info),
        }
    }

    /// Symbol-level subclass test by parent walk. The top class is a
    /// superclass of everything.
    pub fn is_sub_class(&self, sub: SymbolId, sup: SymbolId) -> bool {
        if sup == SymbolTable::ANY_CLASS {
            return true;
        }
        self.base_classes(sub).contains(&sup)
    }

    /// Base classes of `class`, the class itself first, parents in
    /// depth-first order behind it.
    pub fn base_classes(&self, class: SymbolId) -> Vec<SymbolId> {
        let mut out = Vec::new();
        let mut work = vec![class];
        while let Some(c) = work.pop() {
            if c.is_none() || out.contains(&c) || out.len() > MAX_BASECLASS_DEPTH {
                continue;
            }
            out.push(c);
            for parent in self.parents_of_class(c) {
                let psym = self.type_symbol_of(parent);
                if psym.is_some() && self.symbols.is_class(psym) {
                    work.push(psym);
                }
            }
        }
        if class.is_some() && !out.contains(&SymbolTable::ANY_CLASS) {
            out.push(SymbolTable::ANY_CLASS);
        }
        out
    }

    /// Look a member up by name through the type's class and its base
    /// classes. Returns the first declaration found; `NONE` when absent.
    pub fn member(&self, tp: TypeId, name: Atom) -> SymbolId {
        let owner = self.type_symbol_of(self.widen(tp));
        if owner.is_none() {
            return SymbolId::NONE;
        }
        for class in self.base_classes(owner) {
            for &m in self.store.scope_members(self.decls_of(class)).iter() {
                if self.symbols.name(m) == name {
                    return m;
                }
            }
        }
        SymbolId::NONE
    }

    /// Like [`member`](Self::member), but restricted to stable terms and
    /// types — the shape cross-run rebinding may attach to a prefix.
    pub fn stable_member(&self, tp: TypeId, name: Atom) -> SymbolId {
        let owner = self.type_symbol_of(self.widen(tp));
        if owner.is_none() {
            return SymbolId::NONE;
        }
        for class in self.base_classes(owner) {
            for &m in self.store.scope_members(self.decls_of(class)).iter() {
                if self.symbols.name(m) != name {
                    continue;
                }
                if self.symbols.kind(m) != SymbolKind::Term || self.symbols.is_stable_symbol(m) {
                    return m;
                }
            }
        }
        SymbolId::NONE
    }

    /// Shallow erroneous-ness: the error type itself, or a head symbol
    /// already marked erroneous.
    pub fn is_erroneous(&self, tp: TypeId) -> bool {
        tp.is_error() || {
            let sym = self.type_symbol_of(tp);
            sym.is_some() && self.symbols.is_erroneous(sym)
        }
    }
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../tests/context_tests.rs"]
mod tests;
