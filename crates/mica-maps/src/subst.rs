//! The substitution family.
//!
//! All four substitutions share one base: two aligned lists, `from`
//! symbols and `to` replacements, a precomputed id range that lets most
//! membership tests fail without scanning, and lazy alpha-renaming —
//! when substitution would descend under a binder whose bound symbols
//! intersect `from`, the bound symbols are cloned fresh first so free
//! occurrences can never be captured.
//!
//! Tree rewriting rides along where the substitution has a tree-level
//! meaning: symbol-for-symbol substitution renames identifiers and
//! selections; symbol-for-type substitution rewrites an identifier only
//! when the replacement is stable and gives up otherwise.

use crate::hierarchy::qualifier_tree;
use crate::type_map::{TypeMap, Unmappable, map_tree_default};
use mica_types::{SymbolId, SymbolTable, TreeData, TreeId, TypeContext, TypeData, TypeId};
use tracing::warn;

/// How `from` symbols are matched against occurrences.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Reference identity; the default.
    Identity,
    /// Identity first, then name equality. Used where symbols are not
    /// stable across table generations.
    ByName,
}

/// Shared machinery of the substitution maps.
struct SubstBase<T> {
    from: Vec<SymbolId>,
    to: Vec<T>,
    from_min: u32,
    from_max: u32,
    policy: MatchPolicy,
}

impl<T: Copy> SubstBase<T> {
    /// Below this length a linear scan is cheaper than the range check.
    const SMALL: usize = 4;

    fn new(from: Vec<SymbolId>, to: Vec<T>, policy: MatchPolicy) -> Self {
        assert_eq!(
            from.len(),
            to.len(),
            "substitution lists must have equal length"
        );
        let mut from_min = u32::MAX;
        let mut from_max = 0;
        for sym in &from {
            from_min = from_min.min(sym.0);
            from_max = from_max.max(sym.0);
        }
        SubstBase {
            from,
            to,
            from_min,
            from_max,
            policy,
        }
    }

    fn from_syms(&self) -> &[SymbolId] {
        &self.from
    }

    fn matches(&self, symbols: &SymbolTable, candidate: SymbolId, elem: SymbolId) -> bool {
        candidate == elem
            || (self.policy == MatchPolicy::ByName
                && symbols.name(candidate) == symbols.name(elem))
    }

    fn lookup(&self, symbols: &SymbolTable, sym: SymbolId) -> Option<T> {
        if self.from.is_empty() {
            return None;
        }
        // Ids are allocated monotonically, so anything outside the
        // [from_min, from_max] window cannot be in `from`.
        if self.policy == MatchPolicy::Identity
            && self.from.len() > Self::SMALL
            && (sym.0 < self.from_min || sym.0 > self.from_max)
        {
            return None;
        }
        self.from
            .iter()
            .zip(self.to.iter())
            .find(|(f, _)| self.matches(symbols, sym, **f))
            .map(|(_, t)| *t)
    }
}

/// Bound symbols of a binder shape, or the empty list.
fn bound_symbols_of(ctx: &TypeContext, tp: TypeId) -> Option<mica_types::SymbolListId> {
    match ctx.store.lookup(tp) {
        TypeData::MethodType { params, .. } => Some(params),
        TypeData::PolyType { tparams, .. } => Some(tparams),
        TypeData::Existential { quantified, .. } => Some(quantified),
        _ => None,
    }
}

/// Alpha-rename a binder whose bound symbols intersect `from`. Clones
/// the bound symbols, re-points cross-references among their infos, and
/// substitutes the clones into the body; the caller's recursion then
/// substitutes into the renamed type without risk of capture. Types that
/// bind nothing relevant come back untouched.
fn rename_binder(ctx: &TypeContext, tp: TypeId, from: &[SymbolId]) -> TypeId {
    if from.is_empty() {
        return tp;
    }
    let Some(bound) = bound_symbols_of(ctx, tp) else {
        return tp;
    };
    let bound_syms = ctx.store.symbol_list(bound);
    if !bound_syms.iter().any(|b| from.contains(b)) {
        return tp;
    }

    let clones: Vec<SymbolId> = bound_syms
        .iter()
        .map(|&s| ctx.symbols.clone_symbol(s))
        .collect();
    for &clone in &clones {
        let fixed = substitute_symbols(ctx, &bound_syms, &clones, ctx.symbols.info(clone));
        ctx.symbols.set_info(clone, fixed);
    }
    let clones_id = ctx.store.intern_symbol_list(&clones);

    match ctx.store.lookup(tp) {
        TypeData::MethodType { result, .. } => {
            let result1 = substitute_symbols(ctx, &bound_syms, &clones, result);
            ctx.store.method_type(clones_id, result1)
        }
        TypeData::PolyType { result, .. } => {
            let result1 = substitute_symbols(ctx, &bound_syms, &clones, result);
            ctx.store.poly_type(clones_id, result1)
        }
        TypeData::Existential { underlying, .. } => {
            let underlying1 = substitute_symbols(ctx, &bound_syms, &clones, underlying);
            ctx.store.existential(clones_id, underlying1)
        }
        _ => tp,
    }
}

// ---------------------------------------------------------------------------
// Symbol-for-type substitution
// ---------------------------------------------------------------------------

/// Replaces occurrences of `from` symbols with concrete types.
pub struct SubstTypeMap<'a> {
    ctx: &'a TypeContext,
    base: SubstBase<TypeId>,
}

impl<'a> SubstTypeMap<'a> {
    pub fn new(ctx: &'a TypeContext, from: &[SymbolId], to: &[TypeId]) -> Self {
        SubstTypeMap {
            ctx,
            base: SubstBase::new(from.to_vec(), to.to_vec(), MatchPolicy::Identity),
        }
    }
}

impl<'a> TypeMap<'a> for SubstTypeMap<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        let tp1 = rename_binder(self.ctx, tp, self.base.from_syms());
        let tp2 = self.map_over(tp1);
        match self.ctx.store.lookup(tp2) {
            TypeData::TypeRef { sym, .. } | TypeData::SingleType { sym, .. } => self
                .base
                .lookup(&self.ctx.symbols, sym)
                .unwrap_or(tp2),
            _ => tp2,
        }
    }

    /// An identifier bound to a substituted symbol must be retargeted at
    /// a path for the replacement type; only stable replacements have
    /// one. Unstable replacements abort the tree rewrite rather than
    /// silently dropping type information.
    fn map_tree(&mut self, tree: TreeId) -> Result<TreeId, Unmappable> {
        if let TreeData::Ident { sym, .. } = self.ctx.store.lookup_tree(tree) {
            if let Some(repl) = self.base.lookup(&self.ctx.symbols, sym) {
                return if self.ctx.is_stable_type(repl) {
                    Ok(qualifier_tree(self.ctx, repl))
                } else {
                    Err(Unmappable)
                };
            }
        }
        map_tree_default(self, tree)
    }
}

// ---------------------------------------------------------------------------
// Symbol-for-symbol substitution
// ---------------------------------------------------------------------------

/// Replaces occurrences of `from` symbols with other symbols of the same
/// shape, in both types and trees.
pub struct SubstSymMap<'a> {
    ctx: &'a TypeContext,
    base: SubstBase<SymbolId>,
}

impl<'a> SubstSymMap<'a> {
    pub fn new(ctx: &'a TypeContext, from: &[SymbolId], to: &[SymbolId]) -> Self {
        SubstSymMap {
            ctx,
            base: SubstBase::new(from.to_vec(), to.to_vec(), MatchPolicy::Identity),
        }
    }

    /// Match `from` symbols by name as well as identity.
    pub fn with_name_matching(mut self) -> Self {
        self.base.policy = MatchPolicy::ByName;
        self
    }

    fn replacement(&self, sym: SymbolId) -> Option<SymbolId> {
        match self.base.lookup(&self.ctx.symbols, sym) {
            Some(new_sym) if new_sym != sym => Some(new_sym),
            _ => None,
        }
    }
}

impl<'a> TypeMap<'a> for SubstSymMap<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        let tp = rename_binder(self.ctx, tp, self.base.from_syms());
        let store = &self.ctx.store;
        match store.lookup(tp) {
            TypeData::TypeRef { prefix, sym, args } if prefix != TypeId::NO_PREFIX => {
                // Swap the head symbol first; recursion takes care of
                // the prefix and arguments.
                let tp1 = match self.replacement(sym) {
                    Some(new_sym) => store.type_ref_ids(prefix, new_sym, args),
                    None => tp,
                };
                self.map_over(tp1)
            }
            TypeData::SingleType { prefix, sym } if prefix != TypeId::NO_PREFIX => {
                let tp1 = match self.replacement(sym) {
                    Some(new_sym) => store.single_type(prefix, new_sym),
                    None => tp,
                };
                self.map_over(tp1)
            }
            _ => {
                let tp2 = self.map_over(tp);
                match store.lookup(tp2) {
                    TypeData::TypeRef { prefix, sym, args } => match self.replacement(sym) {
                        Some(new_sym) => store.type_ref_ids(prefix, new_sym, args),
                        None => tp2,
                    },
                    TypeData::SingleType { prefix, sym } => match self.replacement(sym) {
                        Some(new_sym) => store.single_type(prefix, new_sym),
                        None => tp2,
                    },
                    _ => tp2,
                }
            }
        }
    }

    /// Renames identifier and selection trees bound to substituted
    /// symbols: the tree is rebuilt (never mutated) with the new symbol
    /// and a retyped attribute.
    fn map_tree(&mut self, tree: TreeId) -> Result<TreeId, Unmappable> {
        let store = &self.ctx.store;
        match store.lookup_tree(tree) {
            TreeData::Ident { sym, tpe } => {
                if let Some(new_sym) = self.replacement(sym) {
                    let tpe1 = self.apply(tpe);
                    return Ok(store.intern_tree(TreeData::Ident {
                        sym: new_sym,
                        tpe: tpe1,
                    }));
                }
                map_tree_default(self, tree)
            }
            TreeData::Select { qual, sym, tpe } => {
                if let Some(new_sym) = self.replacement(sym) {
                    let qual1 = self.map_tree(qual)?;
                    let tpe1 = self.apply(tpe);
                    return Ok(store.intern_tree(TreeData::Select {
                        qual: qual1,
                        sym: new_sym,
                        tpe: tpe1,
                    }));
                }
                map_tree_default(self, tree)
            }
            _ => map_tree_default(self, tree),
        }
    }
}

// ---------------------------------------------------------------------------
// This-type substitution
// ---------------------------------------------------------------------------

/// Replaces the `this`-type of one class with a concrete prefix.
pub struct SubstThisMap<'a> {
    ctx: &'a TypeContext,
    from: SymbolId,
    to: TypeId,
}

impl<'a> SubstThisMap<'a> {
    pub fn new(ctx: &'a TypeContext, from: SymbolId, to: TypeId) -> Self {
        SubstThisMap { ctx, from, to }
    }
}

impl<'a> TypeMap<'a> for SubstThisMap<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        match self.ctx.store.lookup(tp) {
            TypeData::ThisType { sym } if sym == self.from => self.to,
            _ => self.map_over(tp),
        }
    }
}

// ---------------------------------------------------------------------------
// Wildcard substitution
// ---------------------------------------------------------------------------

/// Replaces references to any of `from` with a wildcard carrying that
/// symbol's declared bounds. Bounds that cannot be formed degrade to an
/// unconstrained wildcard instead of failing the rewrite.
pub struct SubstWildcardMap<'a> {
    ctx: &'a TypeContext,
    from: Vec<SymbolId>,
}

impl<'a> SubstWildcardMap<'a> {
    pub fn new(ctx: &'a TypeContext, from: &[SymbolId]) -> Self {
        SubstWildcardMap {
            ctx,
            from: from.to_vec(),
        }
    }
}

impl<'a> TypeMap<'a> for SubstWildcardMap<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        match self.ctx.store.lookup(tp) {
            TypeData::TypeRef { sym, .. } if self.from.contains(&sym) => {
                let (lo, hi) = self.ctx.bounds_of(sym);
                if lo.is_no_type() || hi.is_no_type() || lo.is_error() || hi.is_error() {
                    warn!(sym = sym.0, "malformed bounds; degrading to a bare wildcard");
                    TypeId::WILDCARD
                } else {
                    self.ctx.store.bounded_wildcard(lo, hi)
                }
            }
            _ => self.map_over(tp),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Substitute symbols for symbols in `tp`.
pub fn substitute_symbols(
    ctx: &TypeContext,
    from: &[SymbolId],
    to: &[SymbolId],
    tp: TypeId,
) -> TypeId {
    if from.is_empty() || from == to {
        return tp;
    }
    SubstSymMap::new(ctx, from, to).apply(tp)
}

/// Substitute types for symbols in `tp`.
pub fn substitute_types(ctx: &TypeContext, from: &[SymbolId], to: &[TypeId], tp: TypeId) -> TypeId {
    if from.is_empty() {
        return tp;
    }
    SubstTypeMap::new(ctx, from, to).apply(tp)
}

#[cfg(test)]
#[path = "../tests/subst_tests.rs"]
mod tests;
