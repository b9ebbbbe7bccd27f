//! The read-only dual of the rewrite engine.
//!
//! A [`TypeFolder`] visits a type's components without rebuilding them;
//! `fold_over` provides the default recursion. A [`TypeCollector`] wraps
//! a folder around an accumulator with save/reset/restore semantics, so
//! one collector instance can be re-entered from inside its own
//! traversal without corrupting the outer call's state — member-info
//! folding routinely triggers exactly that.

use mica_types::{TreeData, TreeId, TypeContext, TypeData, TypeId};

/// A side-effecting visit over interned types.
pub trait TypeFolder<'a>: Sized {
    fn ctx(&self) -> &'a TypeContext;

    /// The visit itself. Implementations delegate to
    /// [`fold_over`](Self::fold_over) for the shapes they do not handle.
    fn fold(&mut self, tp: TypeId);

    /// Default recursion into a type's components.
    fn fold_over(&mut self, tp: TypeId) {
        fold_over_default(self, tp)
    }

    /// Default recursion into a tree: the attached type of every node,
    /// then the children.
    fn fold_tree(&mut self, tree: TreeId) {
        fold_tree_default(self, tree)
    }
}

/// The default `fold_over` body, callable from overrides.
pub fn fold_over_default<'a, F: TypeFolder<'a>>(folder: &mut F, tp: TypeId) {
    let ctx = folder.ctx();
    let store = &ctx.store;
    match store.lookup(tp) {
        TypeData::NoType
        | TypeData::Error
        | TypeData::NoPrefix
        | TypeData::Wildcard
        | TypeData::ThisType { .. }
        | TypeData::TypeVar { .. } => {}

        TypeData::TypeRef { prefix, sym: _, args } => {
            if prefix != TypeId::NO_PREFIX {
                folder.fold(prefix);
            }
            for &arg in store.type_list(args).iter() {
                folder.fold(arg);
            }
        }

        TypeData::SingleType { prefix, .. } => folder.fold(prefix),

        TypeData::MethodType { params, result } => {
            for &p in store.symbol_list(params).iter() {
                folder.fold(ctx.symbols.info(p));
            }
            folder.fold(result);
        }

        TypeData::NullaryMethod { result } => folder.fold(result),

        TypeData::PolyType { tparams, result } => {
            for &p in store.symbol_list(tparams).iter() {
                folder.fold(ctx.symbols.info(p));
            }
            folder.fold(result);
        }

        TypeData::Existential {
            quantified,
            underlying,
        } => {
            for &q in store.symbol_list(quantified).iter() {
                folder.fold(ctx.symbols.info(q));
            }
            folder.fold(underlying);
        }

        TypeData::Refined { parents, decls } => {
            for &p in store.type_list(parents).iter() {
                folder.fold(p);
            }
            for &m in store.scope_members(decls).iter() {
                folder.fold(ctx.symbols.info(m));
            }
        }

        TypeData::Annotated { annots, underlying } => {
            for &ann in store.annot_list(annots).iter() {
                folder.fold(ann.atp);
                for &arg in store.tree_list(ann.args).iter() {
                    folder.fold_tree(arg);
                }
            }
            folder.fold(underlying);
        }

        TypeData::BoundedWildcard { lo, hi } | TypeData::TypeBounds { lo, hi } => {
            folder.fold(lo);
            folder.fold(hi);
        }
    }
}

/// The default `fold_tree` body.
pub fn fold_tree_default<'a, F: TypeFolder<'a>>(folder: &mut F, tree: TreeId) {
    let ctx = folder.ctx();
    let data = ctx.store.lookup_tree(tree);
    let tpe = data.tpe();
    if !tpe.is_no_type() {
        folder.fold(tpe);
    }
    match data {
        TreeData::Select { qual, .. } => folder.fold_tree(qual),
        TreeData::Apply { fun, args, .. } | TreeData::TypeApply { fun, args, .. } => {
            folder.fold_tree(fun);
            for &arg in ctx.store.tree_list(args).iter() {
                folder.fold_tree(arg);
            }
        }
        _ => {}
    }
}

/// A folder that accumulates a result, safely reentrant.
///
/// `collect` saves the current accumulator, resets it to the initial
/// value, traverses, and restores the saved accumulator on the way out —
/// so a nested `collect` during traversal leaves the outer collection
/// intact.
pub trait TypeCollector<'a>: TypeFolder<'a> {
    type Output: Clone;

    /// The accumulator value a fresh collection starts from.
    fn initial(&self) -> Self::Output;

    /// The live accumulator.
    fn result_mut(&mut self) -> &mut Self::Output;

    /// Run a collection over `tp` and return its result.
    fn collect(&mut self, tp: TypeId) -> Self::Output {
        let initial = self.initial();
        let saved = std::mem::replace(self.result_mut(), initial);
        self.fold(tp);
        std::mem::replace(self.result_mut(), saved)
    }
}
