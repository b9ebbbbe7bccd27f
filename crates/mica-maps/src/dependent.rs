//! Dependent method-type instantiation.
//!
//! A method result may reference its own parameters through singleton
//! types. At a call site those references are replaced by the actual
//! arguments' types: directly when the actual is stable, through a
//! lazily created existential quantifier with a singleton bound when it
//! is not. The quantifiers are cached per parameter position, and the
//! caller wraps the result in an existential binding whatever
//! `existentials_needed` reports.

use crate::existential::singleton_bounds;
use crate::folder::{TypeCollector, TypeFolder, fold_over_default};
use crate::hierarchy::qualifier_tree;
use crate::type_map::{TypeMap, Unmappable, map_tree_default};
use mica_types::{SymbolId, SymbolTable, TreeData, TreeId, TypeContext, TypeData, TypeId};
use tracing::debug;

/// Instantiates references to method parameters with the types of the
/// actual arguments.
pub struct InstantiateDependentMap<'a> {
    ctx: &'a TypeContext,
    params: Vec<SymbolId>,
    actuals: Vec<TypeId>,
    existentials: Vec<Option<SymbolId>>,
}

impl<'a> InstantiateDependentMap<'a> {
    pub fn new(ctx: &'a TypeContext, params: &[SymbolId], actuals: &[TypeId]) -> Self {
        assert_eq!(
            params.len(),
            actuals.len(),
            "formals and actuals must align"
        );
        InstantiateDependentMap {
            ctx,
            params: params.to_vec(),
            actuals: actuals.to_vec(),
            existentials: vec![None; params.len()],
        }
    }

    /// Quantifiers created for unstable actuals, in creation order; the
    /// caller binds them existentially around the instantiated type.
    pub fn existentials_needed(&self) -> Vec<SymbolId> {
        self.existentials.iter().flatten().copied().collect()
    }

    fn param_index(&self, sym: SymbolId) -> Option<usize> {
        self.params.iter().position(|&p| p == sym)
    }

    /// The actual's type when it can be substituted verbatim.
    fn stable_actual(&self, index: usize) -> Option<TypeId> {
        let actual = self.actuals[index];
        let head = self.ctx.type_symbol_of(actual);
        if self.ctx.is_stable_type(actual) && head != SymbolTable::NOTHING_CLASS {
            Some(actual)
        } else {
            None
        }
    }

    /// One quantifier per parameter position, created on first use.
    fn existential_for(&mut self, index: usize) -> SymbolId {
        if let Some(existing) = self.existentials[index] {
            return existing;
        }
        let param = self.params[index];
        let bounds = singleton_bounds(self.ctx, self.actuals[index]);
        let qvar = self.ctx.fresh_existential(
            self.ctx.symbols.owner(param),
            self.ctx.symbols.name(param),
            bounds,
        );
        debug!(
            param = param.0,
            qvar = qvar.0,
            "approximated unstable argument with existential"
        );
        self.existentials[index] = Some(qvar);
        qvar
    }
}

impl<'a> TypeMap<'a> for InstantiateDependentMap<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        let tp1 = self.map_over(tp);
        match self.ctx.store.lookup(tp1) {
            TypeData::SingleType { prefix, sym } if prefix == TypeId::NO_PREFIX => {
                match self.param_index(sym) {
                    Some(i) => match self.stable_actual(i) {
                        Some(stable) => stable,
                        None => {
                            let qvar = self.existential_for(i);
                            self.ctx.type_param_ref(qvar)
                        }
                    },
                    None => tp1,
                }
            }
            _ => tp1,
        }
    }

    /// Mirrors the type rewrite on identifier trees: a stable actual
    /// becomes a qualifier for its path, an unstable one an identifier
    /// for the synthesized quantifier, retyped accordingly.
    fn map_tree(&mut self, tree: TreeId) -> Result<TreeId, Unmappable> {
        if let TreeData::Ident { sym, .. } = self.ctx.store.lookup_tree(tree) {
            if let Some(i) = self.param_index(sym) {
                return Ok(match self.stable_actual(i) {
                    Some(stable) => qualifier_tree(self.ctx, stable),
                    None => {
                        let qvar = self.existential_for(i);
                        self.ctx.store.intern_tree(TreeData::Ident {
                            sym: qvar,
                            tpe: self.ctx.type_param_ref(qvar),
                        })
                    }
                });
            }
        }
        map_tree_default(self, tree)
    }
}

/// Rewrites every dependent parameter reference to an unconstrained
/// wildcard; the cheap approximation used when the caller does not need
/// the full instantiation.
pub struct ApproximateDependentMap<'a> {
    ctx: &'a TypeContext,
}

impl<'a> ApproximateDependentMap<'a> {
    pub fn new(ctx: &'a TypeContext) -> Self {
        ApproximateDependentMap { ctx }
    }
}

impl<'a> TypeMap<'a> for ApproximateDependentMap<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        if is_immediately_dependent(self.ctx, tp) {
            TypeId::WILDCARD
        } else {
            self.map_over(tp)
        }
    }
}

fn is_immediately_dependent(ctx: &TypeContext, tp: TypeId) -> bool {
    match ctx.store.lookup(tp) {
        TypeData::SingleType { prefix, sym } => {
            prefix == TypeId::NO_PREFIX && ctx.symbols.is_value_parameter(sym)
        }
        _ => false,
    }
}

/// True iff a type mentions any of the given method parameters; decides
/// whether dependent instantiation is needed at all.
pub struct IsDependentCollector<'a> {
    ctx: &'a TypeContext,
    params: Vec<SymbolId>,
    result: bool,
}

impl<'a> IsDependentCollector<'a> {
    pub fn new(ctx: &'a TypeContext, params: &[SymbolId]) -> Self {
        IsDependentCollector {
            ctx,
            params: params.to_vec(),
            result: false,
        }
    }
}

impl<'a> TypeFolder<'a> for IsDependentCollector<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn fold(&mut self, tp: TypeId) {
        if self.result {
            return;
        }
        if let TypeData::SingleType { prefix, sym } = self.ctx.store.lookup(tp) {
            if prefix == TypeId::NO_PREFIX && self.params.contains(&sym) {
                self.result = true;
                return;
            }
        }
        fold_over_default(self, tp);
    }
}

impl<'a> TypeCollector<'a> for IsDependentCollector<'a> {
    type Output = bool;

    fn initial(&self) -> bool {
        false
    }

    fn result_mut(&mut self) -> &mut bool {
        &mut self.result
    }
}

#[cfg(test)]
#[path = "../tests/dependent_tests.rs"]
mod tests;
