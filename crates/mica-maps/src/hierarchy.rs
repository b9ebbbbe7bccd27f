//! Type-level hierarchy walks shared by the rewriting passes.
//!
//! These sit above plain symbol queries because they need substitution:
//! viewing a parent through a generic child means instantiating the
//! parent's occurrence of the child's type parameters with the child's
//! arguments.

use crate::subst::substitute_types;
use mica_common::limits::MAX_BASECLASS_DEPTH;
use mica_types::{SymbolId, TreeData, TreeId, TypeContext, TypeData, TypeId};
use rustc_hash::FxHashSet;

/// The view of `tp` as an instance of `clazz`: the unique parent type of
/// `tp` headed by `clazz`, with type arguments instantiated along the
/// inheritance path. `NO_TYPE` when `clazz` is not a base of `tp`.
pub fn base_type(ctx: &TypeContext, tp: TypeId, clazz: SymbolId) -> TypeId {
    base_type_guarded(ctx, tp, clazz, 0)
}

fn base_type_guarded(ctx: &TypeContext, tp: TypeId, clazz: SymbolId, depth: usize) -> TypeId {
    if depth > MAX_BASECLASS_DEPTH {
        return TypeId::NO_TYPE;
    }
    match ctx.store.lookup(tp) {
        TypeData::Error => TypeId::ERROR,
        TypeData::TypeRef { sym, args, .. } => {
            if sym == clazz {
                return tp;
            }
            if ctx.symbols.is_alias_type(sym) {
                return base_type_guarded(ctx, dealias(ctx, tp), clazz, depth + 1);
            }
            let tparams = ctx.type_params_of(sym);
            let arg_items = ctx.store.type_list(args);
            for parent in ctx.parents_of_class(sym) {
                let seen = if tparams.len() == arg_items.len() && !tparams.is_empty() {
                    substitute_types(ctx, &tparams, &arg_items, parent)
                } else {
                    parent
                };
                let bt = base_type_guarded(ctx, seen, clazz, depth + 1);
                if !bt.is_no_type() {
                    return bt;
                }
            }
            TypeId::NO_TYPE
        }
        TypeData::SingleType { .. } | TypeData::ThisType { .. } => {
            base_type_guarded(ctx, ctx.widen(tp), clazz, depth + 1)
        }
        TypeData::Refined { parents, .. } => {
            for &parent in ctx.store.type_list(parents).iter() {
                let bt = base_type_guarded(ctx, parent, clazz, depth + 1);
                if !bt.is_no_type() {
                    return bt;
                }
            }
            TypeId::NO_TYPE
        }
        TypeData::Existential { underlying, .. }
        | TypeData::Annotated { underlying, .. }
        | TypeData::NullaryMethod { result: underlying }
        | TypeData::PolyType {
            result: underlying, ..
        } => base_type_guarded(ctx, underlying, clazz, depth + 1),
        _ => TypeId::NO_TYPE,
    }
}

/// Expand alias references until a non-alias head appears. Generic
/// aliases instantiate their right-hand side with the reference's
/// arguments; a cycle (illegal, but reachable on bad input) stops the
/// expansion instead of hanging.
pub fn dealias(ctx: &TypeContext, tp: TypeId) -> TypeId {
    let mut seen: FxHashSet<SymbolId> = FxHashSet::default();
    let mut current = tp;
    loop {
        let TypeData::TypeRef { sym, args, .. } = ctx.store.lookup(current) else {
            return current;
        };
        if !ctx.symbols.is_alias_type(sym) || !seen.insert(sym) {
            return current;
        }
        let rhs = ctx.class_info_of(sym);
        let tparams = ctx.type_params_of(sym);
        let arg_items = ctx.store.type_list(args);
        current = if tparams.len() == arg_items.len() && !tparams.is_empty() {
            substitute_types(ctx, &tparams, &arg_items, rhs)
        } else {
            rhs
        };
    }
}

/// Build a qualifier tree denoting a stable type: an identifier for a
/// top-level path, selections along a compound path, a `this` node for a
/// this-type. Non-path stable types fall back to a bare type position.
pub fn qualifier_tree(ctx: &TypeContext, tp: TypeId) -> TreeId {
    match ctx.store.lookup(tp) {
        TypeData::SingleType { prefix, sym } => {
            if prefix == TypeId::NO_PREFIX {
                ctx.store.intern_tree(TreeData::Ident { sym, tpe: tp })
            } else {
                let qual = qualifier_tree(ctx, prefix);
                ctx.store.intern_tree(TreeData::Select {
                    qual,
                    sym,
                    tpe: tp,
                })
            }
        }
        TypeData::ThisType { sym } => ctx.store.intern_tree(TreeData::This { sym, tpe: tp }),
        TypeData::TypeRef { sym, .. } if ctx.symbols.is_module_class(sym) => {
            let module = ctx.symbols.source_module(sym);
            if module.is_some() {
                ctx.store.intern_tree(TreeData::Ident {
                    sym: module,
                    tpe: tp,
                })
            } else {
                ctx.store.intern_tree(TreeData::TypeTree { tpe: tp })
            }
        }
        _ => ctx.store.intern_tree(TreeData::TypeTree { tpe: tp }),
    }
}

#[cfg(test)]
#[path = "../tests/hierarchy_tests.rs"]
mod tests;
