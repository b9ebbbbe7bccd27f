//! Prefix-relative type computation.
//!
//! `AsSeenFromMap::new(ctx, pre, clazz)` rewrites a member's declared
//! type into how it looks when reached through the prefix `pre`: `this`
//! types of enclosing classes resolve to the concrete prefix at their
//! level, and class type parameters resolve to the corresponding type
//! argument of the base type at their level.
//!
//! Unstable prefixes cannot be named by a path, so resolving a `this`
//! against one *captures* it: a fresh existential quantifier with a
//! singleton upper bound stands in for the prefix, memoized per owner
//! class so repeated captures share a binder. The caller existentially
//! binds `captured_params`/`captured_skolems` around the result.

use crate::existential::singleton_bounds;
use crate::hierarchy::{base_type, qualifier_tree};
use crate::type_map::{TypeMap, Unmappable};
use mica_types::{SymbolId, TreeData, TreeId, TypeContext, TypeData, TypeId};
use tracing::debug;

/// Computes how a type looks from the vantage point of a concrete
/// prefix. One instance per member-type computation; captures accumulate
/// on the instance and are read off after `apply`.
pub struct AsSeenFromMap<'a> {
    ctx: &'a TypeContext,
    seen_from_prefix: TypeId,
    seen_from_class: SymbolId,
    stable_prefix: bool,
    captured_params: Vec<SymbolId>,
    captured_skolems: Vec<SymbolId>,
    wrote_annotation: bool,
}

impl<'a> AsSeenFromMap<'a> {
    pub fn new(ctx: &'a TypeContext, pre: TypeId, clazz: SymbolId) -> Self {
        AsSeenFromMap {
            ctx,
            seen_from_prefix: pre,
            seen_from_class: clazz,
            stable_prefix: ctx.is_stable_type(pre),
            captured_params: Vec::new(),
            captured_skolems: Vec::new(),
            wrote_annotation: false,
        }
    }

    /// Existential quantifiers created for unstable prefixes; the caller
    /// binds them around the result.
    pub fn captured_params(&self) -> &[SymbolId] {
        &self.captured_params
    }

    /// Skolems referenced from annotation arguments that escaped their
    /// scope; the caller binds them alongside the captured parameters.
    pub fn captured_skolems(&self) -> &[SymbolId] {
        &self.captured_skolems
    }

    fn is_type_param_of_enclosing_class(&self, sym: SymbolId) -> bool {
        self.ctx.symbols.is_type_parameter(sym)
            && self.ctx.symbols.is_class(self.ctx.symbols.owner(sym))
    }

    /// Does the `(pre, clazz)` level correspond to `candidate`? True
    /// when the walk has reached the candidate's own class and the
    /// prefix actually is an instance of it. A placeholder prefix falls
    /// back to its origin symbol.
    fn matches_prefix_and_class(&self, pre: TypeId, clazz: SymbolId, candidate: SymbolId) -> bool {
        if clazz != candidate {
            return false;
        }
        let pre1 = match self.ctx.store.lookup(pre) {
            TypeData::TypeVar { origin } => self.ctx.type_param_ref(origin),
            _ => pre,
        };
        let pre_sym = self.ctx.type_symbol_of(self.ctx.widen(pre1));
        pre_sym.is_some()
            && pre_sym != mica_types::SymbolTable::NOTHING_CLASS
            && self.ctx.is_sub_class(pre_sym, clazz)
    }

    fn prefix_exhausted(&self, pre: TypeId, clazz: SymbolId) -> bool {
        pre.is_no_type() || pre == TypeId::NO_PREFIX || !self.ctx.symbols.is_class(clazz)
    }

    fn this_type_as_seen(&mut self, tp: TypeId, this_sym: SymbolId) -> TypeId {
        let mut pre = self.seen_from_prefix;
        let mut clazz = self.seen_from_class;
        loop {
            if self.prefix_exhausted(pre, clazz) {
                return self.map_over(tp);
            }
            if !self.matches_prefix_and_class(pre, clazz, this_sym) {
                pre = self.ctx.prefix_of(base_type(self.ctx, pre, clazz));
                clazz = self.ctx.symbols.owner(clazz);
                continue;
            }
            return if self.ctx.is_stable_type(pre) {
                pre
            } else {
                self.capture_this(pre, clazz)
            };
        }
    }

    /// One fresh quantifier per owner class: repeated captures for the
    /// same class share a binder.
    fn capture_this(&mut self, pre: TypeId, clazz: SymbolId) -> TypeId {
        if let Some(&existing) = self
            .captured_params
            .iter()
            .find(|&&q| self.ctx.symbols.owner(q) == clazz)
        {
            return self.ctx.type_param_ref(existing);
        }
        let bounds = singleton_bounds(self.ctx, pre);
        let qvar = self
            .ctx
            .fresh_existential(clazz, self.ctx.symbols.name(clazz), bounds);
        debug!(
            class = clazz.0,
            qvar = qvar.0,
            "captured unstable prefix as existential"
        );
        self.captured_params.push(qvar);
        self.ctx.type_param_ref(qvar)
    }

    fn class_parameter_as_seen(&mut self, tp: TypeId, tparam: SymbolId) -> TypeId {
        let tparam_owner = self.ctx.symbols.owner(tparam);
        let mut pre = self.seen_from_prefix;
        let mut clazz = self.seen_from_class;
        loop {
            if self.prefix_exhausted(pre, clazz) {
                return self.map_over(tp);
            }
            if !self.matches_prefix_and_class(pre, clazz, tparam_owner) {
                pre = self.ctx.prefix_of(base_type(self.ctx, pre, clazz));
                clazz = self.ctx.symbols.owner(clazz);
                continue;
            }
            return self.corresponding_type_argument(tparam, pre);
        }
    }

    /// Extract the type argument standing for `tparam` in the base type
    /// of `pre` at the parameter's owner. Position is found by identity
    /// first; name matching is a deliberate fallback for parameters
    /// whose owner disagrees with the declared parameter list.
    fn corresponding_type_argument(&mut self, tparam: SymbolId, pre: TypeId) -> TypeId {
        let owner = self.ctx.symbols.owner(tparam);
        let base = base_type(self.ctx, pre, owner);
        let args = match self.ctx.store.lookup(base) {
            TypeData::TypeRef { args, .. } => self.ctx.store.type_list(args),
            _ => self.ctx.store.type_list(mica_types::TypeListId::EMPTY),
        };
        let tparams = self.ctx.type_params_of(owner);

        let index = tparams.iter().position(|&p| p == tparam).or_else(|| {
            let by_name = tparams
                .iter()
                .position(|&p| self.ctx.symbols.name(p) == self.ctx.symbols.name(tparam));
            if by_name.is_some() {
                debug!(
                    tparam = tparam.0,
                    owner = owner.0,
                    "type parameter located by name, not identity"
                );
            }
            by_name
        });

        if let Some(i) = index {
            if i < args.len() {
                return args[i];
            }
        }

        // A base type whose parents have all collapsed to errors cannot
        // supply arguments; degrade instead of aborting.
        let base_sym = self.ctx.type_symbol_of(base);
        let parents = self.ctx.parents_of_class(base_sym);
        let erroneous = base.is_error()
            || (!parents.is_empty() && parents.iter().all(|&p| self.ctx.is_erroneous(p)));
        if erroneous {
            return TypeId::ERROR;
        }
        panic!(
            "no type argument for parameter {:?} of {:?} in well-formed base {:?}; \
             owner chain is inconsistent",
            tparam, owner, base
        );
    }

    /// Rewrite annotation-argument trees, replacing `this`-references to
    /// the visible class chain with a qualifier for the new prefix, and
    /// capturing escaped existential skolems.
    fn transform_tree(&mut self, tree: TreeId, rewrite_this: bool) -> Result<TreeId, Unmappable> {
        let store = &self.ctx.store;
        let data = store.lookup_tree(tree);
        match data {
            TreeData::This { sym, .. }
                if rewrite_this && self.ctx.is_sub_class(self.seen_from_class, sym) =>
            {
                self.wrote_annotation = true;
                Ok(qualifier_tree(self.ctx, self.seen_from_prefix))
            }
            TreeData::Ident { sym, tpe } => {
                if self.ctx.symbols.is_existential_skolem(sym)
                    && !self.captured_skolems.contains(&sym)
                {
                    debug!(skolem = sym.0, "captured out-of-scope skolem");
                    self.captured_skolems.push(sym);
                }
                let tpe1 = self.apply(tpe);
                Ok(if tpe1 == tpe {
                    tree
                } else {
                    store.intern_tree(TreeData::Ident { sym, tpe: tpe1 })
                })
            }
            TreeData::Select { qual, sym, tpe } => {
                let qual1 = self.transform_tree(qual, rewrite_this)?;
                let tpe1 = self.apply(tpe);
                Ok(if qual1 == qual && tpe1 == tpe {
                    tree
                } else {
                    store.intern_tree(TreeData::Select {
                        qual: qual1,
                        sym,
                        tpe: tpe1,
                    })
                })
            }
            TreeData::Apply { fun, args, tpe } | TreeData::TypeApply { fun, args, tpe } => {
                let fun1 = self.transform_tree(fun, rewrite_this)?;
                let items = store.tree_list(args);
                let mut changed_args: Option<Vec<TreeId>> = None;
                for (i, &arg) in items.iter().enumerate() {
                    let arg1 = self.transform_tree(arg, rewrite_this)?;
                    if arg1 != arg && changed_args.is_none() {
                        changed_args = Some(items[..i].to_vec());
                    }
                    if let Some(acc) = changed_args.as_mut() {
                        acc.push(arg1);
                    }
                }
                let tpe1 = self.apply(tpe);
                if fun1 == fun && changed_args.is_none() && tpe1 == tpe {
                    return Ok(tree);
                }
                let args1 = match changed_args {
                    None => args,
                    Some(items) => store.intern_tree_list(&items),
                };
                let rebuilt = match data {
                    TreeData::Apply { .. } => TreeData::Apply {
                        fun: fun1,
                        args: args1,
                        tpe: tpe1,
                    },
                    _ => TreeData::TypeApply {
                        fun: fun1,
                        args: args1,
                        tpe: tpe1,
                    },
                };
                Ok(store.intern_tree(rebuilt))
            }
            _ => crate::type_map::map_tree_default(self, tree),
        }
    }
}

impl<'a> TypeMap<'a> for AsSeenFromMap<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        match self.ctx.store.lookup(tp) {
            TypeData::ThisType { sym } => self.this_type_as_seen(tp, sym),
            // Prefixes cannot meaningfully relativize into a package.
            TypeData::SingleType { sym, .. } if self.ctx.symbols.is_package_class(sym) => tp,
            TypeData::TypeRef { sym, .. } if self.is_type_param_of_enclosing_class(sym) => {
                self.class_parameter_as_seen(tp, sym)
            }
            _ => self.map_over(tp),
        }
    }

    /// When the prefix is stable, `this`-references in annotation
    /// arguments stay valid and only types are rewritten (fast path).
    /// Against an unstable prefix, the rewrite is attempted and a
    /// per-call flag records whether any `this` was actually touched —
    /// only then does the annotation give up, so the common no-rewrite
    /// case costs nothing.
    fn map_tree(&mut self, tree: TreeId) -> Result<TreeId, Unmappable> {
        if self.stable_prefix {
            return self.transform_tree(tree, false);
        }
        let saved = self.wrote_annotation;
        self.wrote_annotation = false;
        let result = self.transform_tree(tree, true);
        let wrote = self.wrote_annotation;
        self.wrote_annotation = saved;
        match result {
            Ok(_) if wrote => Err(Unmappable),
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "../tests/as_seen_from_tests.rs"]
mod tests;
