//! The generic rewrite engine.
//!
//! A [`TypeMap`] is a function from types to types. Concrete maps define
//! `apply`; the provided `map_over` gives structural recursion into every
//! compound shape, conserving the input id whenever no component changed.
//! That conservation is not an optimization: downstream invariants assume
//! a no-op rewrite is the *same* type, list, scope, and tree, so every
//! rebuild site below checks its pieces before touching the interner.
//!
//! Maps that track variance override the three variance hooks; the
//! scoped combinators `with_variance`/`flipped` then maintain the
//! register across recursion, and `map_over_args` composes the ambient
//! variance with each parameter's declared variance.

use mica_common::limits::TYPE_LIST_INLINE;
use mica_types::{
    AnnotListId, AnnotationInfo, ScopeId, SymbolId, SymbolListId, TreeData, TreeId, TreeListId,
    TypeContext, TypeData, TypeId, TypeListId, Variance,
};
use smallvec::SmallVec;
use thiserror::Error;

/// A tree (and therefore its enclosing annotation) cannot be rewritten
/// under the current map. Consumed by annotation mapping, which drops
/// the annotation rather than keeping a half-rewritten one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("tree cannot be rewritten under this map")]
pub struct Unmappable;

/// A rewriting function over interned types.
pub trait TypeMap<'a>: Sized {
    /// The shared context the map rewrites against.
    fn ctx(&self) -> &'a TypeContext;

    /// The rewriting function itself. Implementations delegate to
    /// [`map_over`](Self::map_over) for the shapes they do not handle.
    fn apply(&mut self, tp: TypeId) -> TypeId;

    // ----- variance hooks -----

    /// Whether this map maintains a live variance register. Plain maps
    /// recurse into type arguments without composing variances.
    fn tracks_variance(&self) -> bool {
        false
    }

    /// Current variance register. Only meaningful when
    /// [`tracks_variance`](Self::tracks_variance) is true.
    fn variance(&self) -> Variance {
        Variance::Invariant
    }

    /// Update the variance register. A no-op for plain maps.
    fn set_variance(&mut self, _v: Variance) {}

    /// Run `body` with the register temporarily set to `v`, restoring
    /// the prior value afterwards.
    fn with_variance<R>(&mut self, v: Variance, body: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.variance();
        self.set_variance(v);
        let out = body(self);
        self.set_variance(saved);
        out
    }

    /// Run `body` with the register flipped.
    fn flipped<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        let flipped = self.variance().flip();
        self.with_variance(flipped, body)
    }

    // ----- default recursion -----

    /// Structural recursion into every compound shape, conserving ids.
    fn map_over(&mut self, tp: TypeId) -> TypeId {
        map_over_default(self, tp)
    }

    /// Rewrite a type-argument list under the variance each parameter
    /// declares. Without a variance register (or on a length mismatch,
    /// as with raw references) the arguments map at face value.
    fn map_over_args(&mut self, args: TypeListId, tparams: &[SymbolId]) -> TypeListId {
        let ctx = self.ctx();
        let items = ctx.store.type_list(args);
        let mapped = if self.tracks_variance() && items.len() == tparams.len() {
            let ambient = self.variance();
            map_conserve(&items, |i, arg| {
                let v = ambient * self.ctx().symbols.variance(tparams[i]);
                self.with_variance(v, |m| m.apply(arg))
            })
        } else {
            map_conserve(&items, |_, arg| self.apply(arg))
        };
        match mapped {
            None => args,
            Some(new_items) => ctx.store.intern_type_list(&new_items),
        }
    }

    /// Rewrite a symbol's declared info. Alias right-hand sides are not
    /// variance-polymorphic, so under a non-invariant register they map
    /// at forced invariance.
    fn apply_to_symbol_info(&mut self, sym: SymbolId, info: TypeId) -> TypeId {
        if self.tracks_variance()
            && !self.variance().is_invariant()
            && self.ctx().symbols.is_alias_type(sym)
        {
            self.with_variance(Variance::Invariant, |m| m.apply(info))
        } else {
            self.apply(info)
        }
    }

    /// Rewrite a binder's symbol list with rename-on-first-change: scan
    /// for the first symbol whose info the map alters; if none, the
    /// input list comes back untouched. Otherwise every symbol from that
    /// point onward is cloned and re-pointed, so unaffected leading
    /// symbols keep their identity.
    fn map_over_symbols(&mut self, syms: SymbolListId) -> SymbolListId {
        let ctx = self.ctx();
        let originals = ctx.store.symbol_list(syms);
        match self.map_symbol_slice(&originals) {
            None => syms,
            Some(renamed) => ctx.store.intern_symbol_list(&renamed),
        }
    }

    /// Rewrite a member scope. Rebuilt only if mapping changed some
    /// member, preserving membership order.
    fn map_over_scope(&mut self, scope: ScopeId) -> ScopeId {
        let ctx = self.ctx();
        let members = ctx.store.scope_members(scope);
        match self.map_symbol_slice(&members) {
            None => scope,
            Some(renamed) => ctx.store.intern_scope(&renamed),
        }
    }

    /// Shared body of the two symbol-collection hooks. `None` means no
    /// info changed and the caller must keep the original collection.
    fn map_symbol_slice(&mut self, originals: &[SymbolId]) -> Option<Vec<SymbolId>> {
        let ctx = self.ctx();
        let mut mapped_infos = Vec::with_capacity(originals.len());
        let mut first_change = None;
        for (i, &sym) in originals.iter().enumerate() {
            let info = ctx.symbols.info(sym);
            let info1 = self.apply_to_symbol_info(sym, info);
            if first_change.is_none() && info1 != info {
                first_change = Some(i);
            }
            mapped_infos.push(info1);
        }
        let start = first_change?;

        let mut result: Vec<SymbolId> = originals[..start].to_vec();
        let mut clones = Vec::with_capacity(originals.len() - start);
        for (i, &sym) in originals.iter().enumerate().skip(start) {
            let clone = ctx.symbols.clone_symbol(sym);
            ctx.symbols.set_info(clone, mapped_infos[i]);
            clones.push(clone);
            result.push(clone);
        }
        // Infos of later binder symbols may reference earlier ones;
        // re-point those references at the clones.
        let renamed = &originals[start..];
        for &clone in &clones {
            let fixed =
                crate::subst::substitute_symbols(ctx, renamed, &clones, ctx.symbols.info(clone));
            ctx.symbols.set_info(clone, fixed);
        }
        Some(result)
    }

    /// Rewrite an annotation list. An annotation whose argument cannot
    /// be rewritten is dropped whole rather than kept half-rewritten.
    fn map_annotations(&mut self, annots: AnnotListId) -> AnnotListId {
        let ctx = self.ctx();
        let list = ctx.store.annot_list(annots);
        let mut out = Vec::with_capacity(list.len());
        let mut changed = false;
        for &ann in list.iter() {
            match self.map_annotation(ann) {
                Some(mapped) => {
                    changed |= mapped != ann;
                    out.push(mapped);
                }
                None => changed = true,
            }
        }
        if changed {
            ctx.store.intern_annot_list(&out)
        } else {
            annots
        }
    }

    /// Rewrite one annotation; `None` means drop it.
    fn map_annotation(&mut self, ann: AnnotationInfo) -> Option<AnnotationInfo> {
        let ctx = self.ctx();
        let atp = self.apply(ann.atp);
        let args = ctx.store.tree_list(ann.args);
        let mut mapped_args = None;
        for (i, &arg) in args.iter().enumerate() {
            match self.map_tree(arg) {
                Ok(t1) => {
                    if t1 != arg && mapped_args.is_none() {
                        mapped_args = Some(args[..i].to_vec());
                    }
                    if let Some(acc) = mapped_args.as_mut() {
                        acc.push(t1);
                    }
                }
                Err(Unmappable) => return None,
            }
        }
        let args1 = match mapped_args {
            None => ann.args,
            Some(items) => ctx.store.intern_tree_list(&items),
        };
        Some(AnnotationInfo { atp, args: args1 })
    }

    /// Rewrite a tree. The default rewrites only the attached type of
    /// each subtree, preserving tree identity when neither shape nor
    /// type changed. Maps that must rename identifiers or selections
    /// override this; give-up travels through the `Err` channel.
    fn map_tree(&mut self, tree: TreeId) -> Result<TreeId, Unmappable> {
        map_tree_default(self, tree)
    }
}

/// Conserving list map: `None` when every element mapped to itself, the
/// rebuilt list otherwise. The scan copies only from the first changed
/// index onward.
pub(crate) fn map_conserve<T: Copy + PartialEq>(
    items: &[T],
    mut f: impl FnMut(usize, T) -> T,
) -> Option<SmallVec<[T; TYPE_LIST_INLINE]>> {
    let mut out: Option<SmallVec<[T; TYPE_LIST_INLINE]>> = None;
    for (i, &item) in items.iter().enumerate() {
        let mapped = f(i, item);
        if mapped != item && out.is_none() {
            out = Some(SmallVec::from_slice(&items[..i]));
        }
        if let Some(acc) = out.as_mut() {
            acc.push(mapped);
        }
    }
    out
}

/// The default `map_over` body, callable from overrides for the shapes
/// they do not special-case.
pub fn map_over_default<'a, M: TypeMap<'a>>(map: &mut M, tp: TypeId) -> TypeId {
    let ctx = map.ctx();
    let store = &ctx.store;
    match store.lookup(tp) {
        TypeData::NoType
        | TypeData::Error
        | TypeData::NoPrefix
        | TypeData::Wildcard
        | TypeData::ThisType { .. }
        | TypeData::TypeVar { .. } => tp,

        TypeData::TypeRef { prefix, sym, args } => {
            let prefix1 = if prefix == TypeId::NO_PREFIX {
                prefix
            } else {
                map.apply(prefix)
            };
            let tparams = ctx.type_params_of(sym);
            let args1 = map.map_over_args(args, &tparams);
            if prefix1 == prefix && args1 == args {
                tp
            } else {
                store.type_ref_ids(prefix1, sym, args1)
            }
        }

        TypeData::SingleType { prefix, sym } => {
            if ctx.symbols.is_package_class(sym) {
                return tp;
            }
            let prefix1 = map.apply(prefix);
            if prefix1 == prefix {
                tp
            } else {
                store.single_type(prefix1, sym)
            }
        }

        TypeData::MethodType { params, result } => {
            let params1 = map.flipped(|m| m.map_over_symbols(params));
            let result1 = map.apply(result);
            if params1 == params && result1 == result {
                tp
            } else {
                // Dependent references in the result must follow the
                // renamed parameters.
                let result2 = rebind_result(ctx, params, params1, result1);
                store.method_type(params1, result2)
            }
        }

        TypeData::NullaryMethod { result } => {
            let result1 = map.apply(result);
            if result1 == result {
                tp
            } else {
                store.nullary_method(result1)
            }
        }

        TypeData::PolyType { tparams, result } => {
            let tparams1 = map.flipped(|m| m.map_over_symbols(tparams));
            let result1 = map.apply(result);
            if tparams1 == tparams && result1 == result {
                tp
            } else {
                let result2 = rebind_result(ctx, tparams, tparams1, result1);
                store.poly_type(tparams1, result2)
            }
        }

        TypeData::Existential {
            quantified,
            underlying,
        } => {
            let quantified1 = map.map_over_symbols(quantified);
            let underlying1 = map.apply(underlying);
            if quantified1 == quantified && underlying1 == underlying {
                tp
            } else {
                let underlying2 = rebind_result(ctx, quantified, quantified1, underlying1);
                store.existential(quantified1, underlying2)
            }
        }

        TypeData::Refined { parents, decls } => {
            let items = store.type_list(parents);
            let parents1 = match map_conserve(&items, |_, p| map.apply(p)) {
                None => parents,
                Some(new_items) => store.intern_type_list(&new_items),
            };
            let decls1 = map.map_over_scope(decls);
            if parents1 == parents && decls1 == decls {
                tp
            } else {
                store.intern(TypeData::Refined {
                    parents: parents1,
                    decls: decls1,
                })
            }
        }

        TypeData::Annotated { annots, underlying } => {
            let annots1 = map.map_annotations(annots);
            let underlying1 = map.apply(underlying);
            if annots1 == annots && underlying1 == underlying {
                tp
            } else if annots1.is_empty() {
                underlying1
            } else {
                store.annotated(annots1, underlying1)
            }
        }

        TypeData::BoundedWildcard { lo, hi } => {
            let lo1 = map.flipped(|m| m.apply(lo));
            let hi1 = map.apply(hi);
            if lo1 == lo && hi1 == hi {
                tp
            } else {
                store.bounded_wildcard(lo1, hi1)
            }
        }

        TypeData::TypeBounds { lo, hi } => {
            let lo1 = map.flipped(|m| m.apply(lo));
            let hi1 = map.apply(hi);
            if lo1 == lo && hi1 == hi {
                tp
            } else {
                store.type_bounds(lo1, hi1)
            }
        }
    }
}

fn rebind_result(
    ctx: &TypeContext,
    old: SymbolListId,
    new: SymbolListId,
    result: TypeId,
) -> TypeId {
    if old == new {
        return result;
    }
    let old_syms = ctx.store.symbol_list(old);
    let new_syms = ctx.store.symbol_list(new);
    crate::subst::substitute_symbols(ctx, &old_syms, &new_syms, result)
}

/// The default tree rewrite: types only, shape preserved, identity
/// conserved. Recursion goes through `map.map_tree` so an override sees
/// every nested node.
pub fn map_tree_default<'a, M: TypeMap<'a>>(
    map: &mut M,
    tree: TreeId,
) -> Result<TreeId, Unmappable> {
    let ctx = map.ctx();
    let store = &ctx.store;
    let data = store.lookup_tree(tree);
    let mapped = match data {
        TreeData::Empty => return Ok(tree),
        TreeData::Ident { sym, tpe } => TreeData::Ident {
            sym,
            tpe: map.apply(tpe),
        },
        TreeData::Select { qual, sym, tpe } => TreeData::Select {
            qual: map.map_tree(qual)?,
            sym,
            tpe: map.apply(tpe),
        },
        TreeData::This { sym, tpe } => TreeData::This {
            sym,
            tpe: map.apply(tpe),
        },
        TreeData::Apply { fun, args, tpe } => TreeData::Apply {
            fun: map.map_tree(fun)?,
            args: map_tree_list(map, args)?,
            tpe: map.apply(tpe),
        },
        TreeData::TypeApply { fun, args, tpe } => TreeData::TypeApply {
            fun: map.map_tree(fun)?,
            args: map_tree_list(map, args)?,
            tpe: map.apply(tpe),
        },
        TreeData::Literal { value, tpe } => TreeData::Literal {
            value,
            tpe: map.apply(tpe),
        },
        TreeData::TypeTree { tpe } => TreeData::TypeTree {
            tpe: map.apply(tpe),
        },
    };
    if mapped == data {
        Ok(tree)
    } else {
        Ok(store.intern_tree(mapped))
    }
}

fn map_tree_list<'a, M: TypeMap<'a>>(
    map: &mut M,
    list: TreeListId,
) -> Result<TreeListId, Unmappable> {
    let ctx = map.ctx();
    let items = ctx.store.tree_list(list);
    let mut out: Option<Vec<TreeId>> = None;
    for (i, &item) in items.iter().enumerate() {
        let mapped = map.map_tree(item)?;
        if mapped != item && out.is_none() {
            out = Some(items[..i].to_vec());
        }
        if let Some(acc) = out.as_mut() {
            acc.push(mapped);
        }
    }
    Ok(match out {
        None => list,
        Some(items) => ctx.store.intern_tree_list(&items),
    })
}

/// Replaces every inference placeholder with a reference to its origin
/// symbol; post-inference cleanup before types escape the solver.
pub struct TypeVarToOriginMap<'a> {
    ctx: &'a TypeContext,
}

impl<'a> TypeVarToOriginMap<'a> {
    pub fn new(ctx: &'a TypeContext) -> Self {
        TypeVarToOriginMap { ctx }
    }
}

impl<'a> TypeMap<'a> for TypeVarToOriginMap<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        match self.ctx.store.lookup(tp) {
            TypeData::TypeVar { origin } => self.ctx.type_param_ref(origin),
            _ => self.map_over(tp),
        }
    }
}

#[cfg(test)]
#[path = "../tests/type_map_tests.rs"]
mod tests;
