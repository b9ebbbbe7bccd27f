//! The collector library.
//!
//! Read-only aggregations built on the fold engine: occurrence checks,
//! filtering, first-match search, partial collection, and unconditional
//! traversal. The short-circuiting collectors stop folding the moment
//! their stopping condition is met.

use crate::folder::{TypeCollector, TypeFolder, fold_over_default, fold_tree_default};
use crate::hierarchy::dealias;
use mica_types::{SymbolId, TreeId, TypeContext, TypeData, TypeId};
use rustc_hash::FxHashSet;

// ---------------------------------------------------------------------------
// Containment
// ---------------------------------------------------------------------------

/// True iff the target symbol occurs, by identity, anywhere in a type —
/// including behind aliases and inside annotation-argument trees. The
/// visited set bounds recursion through self-referential existential
/// bounds.
pub struct ContainsCollector<'a> {
    ctx: &'a TypeContext,
    sym: SymbolId,
    result: bool,
    seen: FxHashSet<TypeId>,
}

impl<'a> ContainsCollector<'a> {
    pub fn new(ctx: &'a TypeContext, sym: SymbolId) -> Self {
        ContainsCollector {
            ctx,
            sym,
            result: false,
            seen: FxHashSet::default(),
        }
    }
}

impl<'a> TypeFolder<'a> for ContainsCollector<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn fold(&mut self, tp: TypeId) {
        if self.result || !self.seen.insert(tp) {
            return;
        }
        match self.ctx.store.lookup(tp) {
            TypeData::TypeRef { sym, .. } => {
                if sym == self.sym {
                    self.result = true;
                    return;
                }
                if self.ctx.symbols.is_alias_type(sym) {
                    self.fold(dealias(self.ctx, tp));
                    if self.result {
                        return;
                    }
                }
                fold_over_default(self, tp);
            }
            TypeData::SingleType { sym, .. } | TypeData::ThisType { sym } => {
                if sym == self.sym {
                    self.result = true;
                    return;
                }
                fold_over_default(self, tp);
            }
            TypeData::TypeVar { origin } => {
                if origin == self.sym {
                    self.result = true;
                }
            }
            _ => fold_over_default(self, tp),
        }
    }

    /// Tree fallback: a reference can hide in a tree's resolved symbol
    /// even when its attached type never mentions the target.
    fn fold_tree(&mut self, tree: TreeId) {
        if self.result {
            return;
        }
        if self.ctx.store.lookup_tree(tree).symbol() == self.sym {
            self.result = true;
            return;
        }
        fold_tree_default(self, tree);
    }
}

impl<'a> TypeCollector<'a> for ContainsCollector<'a> {
    type Output = bool;

    fn initial(&self) -> bool {
        false
    }

    fn result_mut(&mut self) -> &mut bool {
        &mut self.result
    }

    fn collect(&mut self, tp: TypeId) -> bool {
        self.seen.clear();
        let saved = std::mem::replace(&mut self.result, false);
        self.fold(tp);
        std::mem::replace(&mut self.result, saved)
    }
}

/// Does `sym` occur anywhere in `tp`?
pub fn type_contains(ctx: &TypeContext, tp: TypeId, sym: SymbolId) -> bool {
    ContainsCollector::new(ctx, sym).collect(tp)
}

// ---------------------------------------------------------------------------
// Predicate collectors
// ---------------------------------------------------------------------------

/// Collects every subtype satisfying the predicate, in traversal order.
pub struct FilterTypeCollector<'a, F> {
    ctx: &'a TypeContext,
    pred: F,
    result: Vec<TypeId>,
}

impl<'a, F: FnMut(TypeId) -> bool> FilterTypeCollector<'a, F> {
    pub fn new(ctx: &'a TypeContext, pred: F) -> Self {
        FilterTypeCollector {
            ctx,
            pred,
            result: Vec::new(),
        }
    }
}

impl<'a, F: FnMut(TypeId) -> bool> TypeFolder<'a> for FilterTypeCollector<'a, F> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn fold(&mut self, tp: TypeId) {
        if (self.pred)(tp) {
            self.result.push(tp);
        }
        fold_over_default(self, tp);
    }
}

impl<'a, F: FnMut(TypeId) -> bool> TypeCollector<'a> for FilterTypeCollector<'a, F> {
    type Output = Vec<TypeId>;

    fn initial(&self) -> Vec<TypeId> {
        Vec::new()
    }

    fn result_mut(&mut self) -> &mut Vec<TypeId> {
        &mut self.result
    }
}

/// Stops at the first subtype satisfying the predicate.
pub struct FindTypeCollector<'a, F> {
    ctx: &'a TypeContext,
    pred: F,
    result: Option<TypeId>,
}

impl<'a, F: FnMut(TypeId) -> bool> FindTypeCollector<'a, F> {
    pub fn new(ctx: &'a TypeContext, pred: F) -> Self {
        FindTypeCollector {
            ctx,
            pred,
            result: None,
        }
    }
}

impl<'a, F: FnMut(TypeId) -> bool> TypeFolder<'a> for FindTypeCollector<'a, F> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn fold(&mut self, tp: TypeId) {
        if self.result.is_some() {
            return;
        }
        if (self.pred)(tp) {
            self.result = Some(tp);
            return;
        }
        fold_over_default(self, tp);
    }
}

impl<'a, F: FnMut(TypeId) -> bool> TypeCollector<'a> for FindTypeCollector<'a, F> {
    type Output = Option<TypeId>;

    fn initial(&self) -> Option<TypeId> {
        None
    }

    fn result_mut(&mut self) -> &mut Option<TypeId> {
        &mut self.result
    }
}

/// Applies a partial function at every subtype, collecting the hits.
pub struct CollectTypeCollector<'a, T, F> {
    ctx: &'a TypeContext,
    partial: F,
    result: Vec<T>,
}

impl<'a, T: Clone, F: FnMut(TypeId) -> Option<T>> CollectTypeCollector<'a, T, F> {
    pub fn new(ctx: &'a TypeContext, partial: F) -> Self {
        CollectTypeCollector {
            ctx,
            partial,
            result: Vec::new(),
        }
    }
}

impl<'a, T: Clone, F: FnMut(TypeId) -> Option<T>> TypeFolder<'a>
    for CollectTypeCollector<'a, T, F>
{
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn fold(&mut self, tp: TypeId) {
        if let Some(value) = (self.partial)(tp) {
            self.result.push(value);
        }
        fold_over_default(self, tp);
    }
}

impl<'a, T: Clone, F: FnMut(TypeId) -> Option<T>> TypeCollector<'a>
    for CollectTypeCollector<'a, T, F>
{
    type Output = Vec<T>;

    fn initial(&self) -> Vec<T> {
        Vec::new()
    }

    fn result_mut(&mut self) -> &mut Vec<T> {
        &mut self.result
    }
}

/// Short-circuiting existence check.
pub struct ExistsTypeCollector<'a, F> {
    ctx: &'a TypeContext,
    pred: F,
    result: bool,
}

impl<'a, F: FnMut(TypeId) -> bool> ExistsTypeCollector<'a, F> {
    pub fn new(ctx: &'a TypeContext, pred: F) -> Self {
        ExistsTypeCollector {
            ctx,
            pred,
            result: false,
        }
    }
}

impl<'a, F: FnMut(TypeId) -> bool> TypeFolder<'a> for ExistsTypeCollector<'a, F> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn fold(&mut self, tp: TypeId) {
        if self.result {
            return;
        }
        if (self.pred)(tp) {
            self.result = true;
            return;
        }
        fold_over_default(self, tp);
    }
}

impl<'a, F: FnMut(TypeId) -> bool> TypeCollector<'a> for ExistsTypeCollector<'a, F> {
    type Output = bool;

    fn initial(&self) -> bool {
        false
    }

    fn result_mut(&mut self) -> &mut bool {
        &mut self.result
    }
}

/// Unconditional full traversal.
pub struct ForEachTypeTraverser<'a, F> {
    ctx: &'a TypeContext,
    each: F,
}

impl<'a, F: FnMut(TypeId)> ForEachTypeTraverser<'a, F> {
    pub fn new(ctx: &'a TypeContext, each: F) -> Self {
        ForEachTypeTraverser { ctx, each }
    }
}

impl<'a, F: FnMut(TypeId)> TypeFolder<'a> for ForEachTypeTraverser<'a, F> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn fold(&mut self, tp: TypeId) {
        (self.each)(tp);
        fold_over_default(self, tp);
    }
}

/// True iff the error type occurs anywhere in a type.
pub struct ErroneousCollector<'a> {
    ctx: &'a TypeContext,
    result: bool,
}

impl<'a> ErroneousCollector<'a> {
    pub fn new(ctx: &'a TypeContext) -> Self {
        ErroneousCollector { ctx, result: false }
    }
}

impl<'a> TypeFolder<'a> for ErroneousCollector<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn fold(&mut self, tp: TypeId) {
        if self.result {
            return;
        }
        if tp.is_error() || self.ctx.is_erroneous(tp) {
            self.result = true;
            return;
        }
        fold_over_default(self, tp);
    }
}

impl<'a> TypeCollector<'a> for ErroneousCollector<'a> {
    type Output = bool;

    fn initial(&self) -> bool {
        false
    }

    fn result_mut(&mut self) -> &mut bool {
        &mut self.result
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

pub fn exists_type(ctx: &TypeContext, tp: TypeId, pred: impl FnMut(TypeId) -> bool) -> bool {
    ExistsTypeCollector::new(ctx, pred).collect(tp)
}

pub fn find_type(
    ctx: &TypeContext,
    tp: TypeId,
    pred: impl FnMut(TypeId) -> bool,
) -> Option<TypeId> {
    FindTypeCollector::new(ctx, pred).collect(tp)
}

pub fn filter_type(
    ctx: &TypeContext,
    tp: TypeId,
    pred: impl FnMut(TypeId) -> bool,
) -> Vec<TypeId> {
    FilterTypeCollector::new(ctx, pred).collect(tp)
}

pub fn collect_type<T: Clone>(
    ctx: &TypeContext,
    tp: TypeId,
    partial: impl FnMut(TypeId) -> Option<T>,
) -> Vec<T> {
    CollectTypeCollector::new(ctx, partial).collect(tp)
}

pub fn foreach_type(ctx: &TypeContext, tp: TypeId, each: impl FnMut(TypeId)) {
    ForEachTypeTraverser::new(ctx, each).fold(tp);
}

#[cfg(test)]
#[path = "../tests/collect_tests.rs"]
mod tests;
