//! Existential normalization.
//!
//! Two directions: extrapolation replaces a lone covariant or
//! contravariant occurrence of a bound existential variable with its
//! widened bound, letting the quantifier disappear; wildcard
//! extrapolation eliminates bounded wildcards where variance makes them
//! redundant. `existential_abstraction` packages both into the packer
//! every capture site uses.

use crate::collect::{ForEachTypeTraverser, type_contains};
use crate::folder::TypeFolder;
use crate::hierarchy::dealias;
use crate::type_map::{TypeMap, Unmappable, map_over_default, map_tree_default};
use mica_types::{
    ScopeId, SymbolId, SymbolTable, TreeData, TreeId, TypeContext, TypeData, TypeId, Variance,
};
use rustc_hash::FxHashMap;
use tracing::debug;

/// The bounds every capture site hangs on a fresh quantifier standing in
/// for a stable value: below everything, above the widened prefix
/// intersected with the singleton marker.
pub fn singleton_bounds(ctx: &TypeContext, tp: TypeId) -> TypeId {
    let widened = ctx.widen(tp);
    let hi = ctx
        .store
        .refined(&[widened, TypeId::SINGLETON], ScopeId::EMPTY);
    ctx.store.type_bounds(TypeId::NOTHING, hi)
}

// ---------------------------------------------------------------------------
// Singleton dropping
// ---------------------------------------------------------------------------

struct DropSingletonMap<'a> {
    ctx: &'a TypeContext,
}

impl<'a> TypeMap<'a> for DropSingletonMap<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        match self.ctx.store.lookup(tp) {
            TypeData::TypeRef { sym, .. } if sym == SymbolTable::SINGLETON_CLASS => TypeId::ANY,
            TypeData::Refined { parents, decls } if decls.is_empty() => {
                let items = self.ctx.store.type_list(parents);
                let kept: Vec<TypeId> = items
                    .iter()
                    .copied()
                    .filter(|&p| self.ctx.type_symbol_of(p) != SymbolTable::SINGLETON_CLASS)
                    .collect();
                match kept.len() {
                    0 => TypeId::ANY,
                    1 => self.apply(kept[0]),
                    _ if kept.len() == items.len() => self.map_over(tp),
                    _ => {
                        let mapped: Vec<TypeId> = kept.iter().map(|&p| self.apply(p)).collect();
                        self.ctx.store.refined(&mapped, decls)
                    }
                }
            }
            _ => self.map_over(tp),
        }
    }
}

/// Strip the singleton marker from a widened bound.
pub fn drop_singleton_type(ctx: &TypeContext, tp: TypeId) -> TypeId {
    DropSingletonMap { ctx }.apply(tp)
}

// ---------------------------------------------------------------------------
// Alias normalization
// ---------------------------------------------------------------------------

struct NormalizeAliasesMap<'a> {
    ctx: &'a TypeContext,
}

impl<'a> TypeMap<'a> for NormalizeAliasesMap<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        match self.ctx.store.lookup(tp) {
            TypeData::TypeRef { sym, .. } if self.ctx.symbols.is_alias_type(sym) => {
                let expanded = dealias(self.ctx, tp);
                self.map_over(expanded)
            }
            _ => self.map_over(tp),
        }
    }
}

/// Expand aliases everywhere in a type, including under binders.
pub fn normalize_aliases(ctx: &TypeContext, tp: TypeId) -> TypeId {
    NormalizeAliasesMap { ctx }.apply(tp)
}

// ---------------------------------------------------------------------------
// Existential extrapolation
// ---------------------------------------------------------------------------

/// Rewrites a lone, variance-visible occurrence of a bound existential
/// variable to its widened bound, eliminating the quantifier once the
/// caller garbage-collects unreferenced binders.
pub struct ExistentialExtrapolation<'a> {
    ctx: &'a TypeContext,
    tparams: Vec<SymbolId>,
    occur_count: FxHashMap<SymbolId, usize>,
    variance: Variance,
}

impl<'a> ExistentialExtrapolation<'a> {
    pub fn new(ctx: &'a TypeContext, tparams: &[SymbolId]) -> Self {
        ExistentialExtrapolation {
            ctx,
            tparams: tparams.to_vec(),
            occur_count: FxHashMap::default(),
            variance: Variance::Covariant,
        }
    }

    /// Count occurrences across the type and the bound variables' own
    /// declared bounds, then rewrite.
    pub fn extrapolate(&mut self, tp: TypeId) -> TypeId {
        for &t in &self.tparams {
            self.occur_count.insert(t, 0);
        }
        self.count_occurrences(tp);
        let infos: Vec<TypeId> = self
            .tparams
            .iter()
            .map(|&t| self.ctx.symbols.info(t))
            .collect();
        for info in infos {
            self.count_occurrences(info);
        }
        self.apply(tp)
    }

    fn count_occurrences(&mut self, tp: TypeId) {
        let ctx = self.ctx;
        let occur = &mut self.occur_count;
        let tparams = &self.tparams;
        let mut each = ForEachTypeTraverser::new(ctx, |t| {
            if let TypeData::TypeRef { sym, .. } = ctx.store.lookup(t) {
                if tparams.contains(&sym) {
                    *occur.entry(sym).or_insert(0) += 1;
                }
            }
        });
        each.fold(tp);
    }
}

impl<'a> TypeMap<'a> for ExistentialExtrapolation<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn tracks_variance(&self) -> bool {
        true
    }

    fn variance(&self) -> Variance {
        self.variance
    }

    fn set_variance(&mut self, v: Variance) {
        self.variance = v;
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        let tp1 = self.map_over(tp);
        if self.variance.is_invariant() {
            return tp1;
        }
        match self.ctx.store.lookup(tp1) {
            TypeData::TypeRef { sym, .. } if self.tparams.contains(&sym) => {
                let (lo, hi) = self.ctx.bounds_of(sym);
                let repl = if self.variance.is_positive() {
                    drop_singleton_type(self.ctx, hi)
                } else {
                    lo
                };
                let count = self.occur_count.get(&sym).copied().unwrap_or(0);
                let bound_mentions_param = self
                    .tparams
                    .iter()
                    .any(|&t| type_contains(self.ctx, repl, t));
                let repl_sym = self.ctx.type_symbol_of(repl);
                if count == 1
                    && !bound_mentions_param
                    && repl_sym != SymbolTable::NOTHING_CLASS
                {
                    debug!(sym = sym.0, "extrapolated lone existential occurrence");
                    repl
                } else {
                    tp1
                }
            }
            _ => tp1,
        }
    }

    /// Path types are rebuilt only when their rewritten prefix stays
    /// stable; otherwise the original stands.
    fn map_over(&mut self, tp: TypeId) -> TypeId {
        match self.ctx.store.lookup(tp) {
            TypeData::SingleType { prefix, sym } => {
                if self.ctx.symbols.is_package_class(sym) {
                    return tp;
                }
                let prefix1 = self.apply(prefix);
                if prefix1 == prefix || !self.ctx.is_stable_type(prefix1) {
                    tp
                } else {
                    self.ctx.store.single_type(prefix1, sym)
                }
            }
            _ => map_over_default(self, tp),
        }
    }

    /// An identifier whose type is a singleton stays verbatim; widening
    /// it would leave the identifier dangling under the quantifier.
    fn map_tree(&mut self, tree: TreeId) -> Result<TreeId, Unmappable> {
        if let TreeData::Ident { tpe, .. } = self.ctx.store.lookup_tree(tree) {
            if self.ctx.is_stable_type(tpe) {
                return Ok(tree);
            }
        }
        map_tree_default(self, tree)
    }
}

// ---------------------------------------------------------------------------
// Wildcard extrapolation
// ---------------------------------------------------------------------------

/// Eliminates bounded wildcards that variance makes redundant:
/// contravariant with a top upper bound collapses to its lower bound,
/// covariant with a bottom lower bound to its upper bound. Both keep the
/// result mutually sub- and super-type equivalent with the input.
pub struct WildcardExtrapolation<'a> {
    ctx: &'a TypeContext,
    variance: Variance,
}

impl<'a> WildcardExtrapolation<'a> {
    pub fn new(ctx: &'a TypeContext) -> Self {
        WildcardExtrapolation {
            ctx,
            variance: Variance::Covariant,
        }
    }
}

impl<'a> TypeMap<'a> for WildcardExtrapolation<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn tracks_variance(&self) -> bool {
        true
    }

    fn variance(&self) -> Variance {
        self.variance
    }

    fn set_variance(&mut self, v: Variance) {
        self.variance = v;
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        match self.ctx.store.lookup(tp) {
            TypeData::BoundedWildcard { lo, hi }
                if self.variance.is_negative()
                    && (hi == TypeId::ANY || hi == TypeId::ANY_REF) =>
            {
                lo
            }
            TypeData::BoundedWildcard { lo, hi }
                if self.variance.is_positive() && lo == TypeId::NOTHING =>
            {
                hi
            }
            _ => self.map_over(tp),
        }
    }
}

/// Entry point starting in covariant position.
pub fn wildcard_extrapolation(ctx: &TypeContext, tp: TypeId) -> TypeId {
    WildcardExtrapolation::new(ctx).apply(tp)
}

// ---------------------------------------------------------------------------
// Existential packing
// ---------------------------------------------------------------------------

/// Quantify `tp` over `tparams`: normalize aliases, extrapolate lone
/// occurrences to their bounds, then bind only the quantifiers that
/// still occur. Returns the underlying type unquantified when none
/// remain.
pub fn existential_abstraction(ctx: &TypeContext, tparams: &[SymbolId], tp: TypeId) -> TypeId {
    if tparams.is_empty() {
        return tp;
    }
    let normalized = normalize_aliases(ctx, tp);
    let extrapolated = ExistentialExtrapolation::new(ctx, tparams).extrapolate(normalized);
    let remaining: Vec<SymbolId> = tparams
        .iter()
        .copied()
        .filter(|&t| type_contains(ctx, extrapolated, t))
        .collect();
    if remaining.is_empty() {
        extrapolated
    } else {
        let quantified = ctx.store.intern_symbol_list(&remaining);
        ctx.store.existential(quantified, extrapolated)
    }
}

#[cfg(test)]
#[path = "../tests/existential_tests.rs"]
mod tests;
