//! Cross-run symbol rebinding.
//!
//! Symbols are not stable across compilation runs: a type captured by an
//! earlier run references symbols the current run's table may have
//! replaced. Rebinding re-resolves each reference against the current
//! member tables by name, with graceful degradation — a miss raises a
//! distinguished recoverable error, and the convenience entry point
//! falls back to the stale type instead of crashing the incremental
//! session.

use crate::type_map::{TypeMap, map_over_default};
use mica_types::{SymbolId, TypeContext, TypeData, TypeId};
use thiserror::Error;
use tracing::debug;

/// Why a symbol could not be rebound. Alias misses are distinguished so
/// callers can retry with a dealiased form.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RebindError {
    #[error("no alias named `{name}` in the current run")]
    MissingAlias { name: String },
    #[error("no member named `{name}` in the current run")]
    MissingType { name: String },
}

/// Re-resolves symbols captured in a previous run against the current
/// symbol table. The first failure is recorded and the offending
/// reference left untouched; the entry points surface it.
pub struct AdaptToNewRunMap<'a> {
    ctx: &'a TypeContext,
    failure: Option<RebindError>,
}

impl<'a> AdaptToNewRunMap<'a> {
    pub fn new(ctx: &'a TypeContext) -> Self {
        AdaptToNewRunMap { ctx, failure: None }
    }

    pub fn failure(&self) -> Option<&RebindError> {
        self.failure.as_ref()
    }

    fn adapt(&mut self, pre: TypeId, sym: SymbolId) -> SymbolId {
        match self.try_adapt(pre, sym) {
            Ok(rebound) => rebound,
            Err(err) => {
                if self.failure.is_none() {
                    self.failure = Some(err);
                }
                sym
            }
        }
    }

    fn try_adapt(&self, pre: TypeId, sym: SymbolId) -> Result<SymbolId, RebindError> {
        let symbols = &self.ctx.symbols;
        if sym.is_none()
            || symbols.is_package_class(sym)
            || pre == TypeId::NO_PREFIX
            || pre.is_no_type()
        {
            return Ok(sym);
        }
        if symbols.is_module_class(sym) {
            // Module classes rebind through their term-level module.
            let module = symbols.source_module(sym);
            if module.is_none() {
                return Ok(sym);
            }
            let module1 = self.try_adapt(pre, module)?;
            if module1 == module {
                return Ok(sym);
            }
            let mclass = self.ctx.type_symbol_of(symbols.info(module1));
            return if mclass.is_some() {
                Ok(mclass)
            } else {
                Err(self.miss(sym))
            };
        }

        let rebound = self.ctx.stable_member(pre, symbols.name(sym));
        if rebound.is_none() {
            return Err(self.miss(sym));
        }
        if self.owner_names_match(sym, rebound) {
            return Ok(rebound);
        }
        // Owner chains disagree by name. Search the prefix's base
        // classes for a declaration whose owner chain corresponds;
        // symbols are not stable across runs, so names are all we have.
        debug!(
            sym = sym.0,
            rebound = rebound.0,
            "owner chains disagree; searching base classes"
        );
        let owner = self.ctx.type_symbol_of(self.ctx.widen(pre));
        for class in self.ctx.base_classes(owner) {
            for &member in self
                .ctx
                .store
                .scope_members(self.ctx.decls_of(class))
                .iter()
            {
                if symbols.name(member) == symbols.name(sym)
                    && self.owner_names_match(sym, member)
                {
                    return Ok(member);
                }
            }
        }
        Err(self.miss(sym))
    }

    fn miss(&self, sym: SymbolId) -> RebindError {
        let name = self
            .ctx
            .names
            .resolve(self.ctx.symbols.name(sym))
            .to_string();
        if self.ctx.symbols.is_alias_type(sym) {
            RebindError::MissingAlias { name }
        } else {
            RebindError::MissingType { name }
        }
    }

    /// Compare owner chains by name; ids differ across runs.
    fn owner_names_match(&self, a: SymbolId, b: SymbolId) -> bool {
        let symbols = &self.ctx.symbols;
        let names = |start: SymbolId| {
            symbols
                .owner_chain(start)
                .into_iter()
                .skip(1)
                .map(|s| symbols.name(s))
                .collect::<Vec<_>>()
        };
        names(a) == names(b)
    }
}

impl<'a> TypeMap<'a> for AdaptToNewRunMap<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        if self.failure.is_some() {
            return tp;
        }
        let store = &self.ctx.store;
        match store.lookup(tp) {
            TypeData::ThisType { sym } if self.ctx.symbols.is_module_class(sym) => {
                let pre = store.this_type(self.ctx.symbols.owner(sym));
                let sym1 = self.adapt(pre, sym);
                if sym1 == sym {
                    tp
                } else {
                    store.this_type(sym1)
                }
            }
            TypeData::SingleType { prefix, sym } if self.ctx.symbols.is_module(sym) => {
                let prefix1 = self.apply(prefix);
                let sym1 = self.adapt(prefix1, sym);
                if prefix1 == prefix && sym1 == sym {
                    tp
                } else {
                    store.single_type(prefix1, sym1)
                }
            }
            TypeData::TypeRef { prefix, sym, args } if !self.ctx.symbols.is_package_class(sym) => {
                let prefix1 = self.apply(prefix);
                let sym1 = if prefix == TypeId::NO_PREFIX {
                    sym
                } else {
                    self.adapt(prefix1, sym)
                };
                let tparams = self.ctx.type_params_of(sym1);
                let args1 = self.map_over_args(args, &tparams);
                if prefix1 == prefix && sym1 == sym && args1 == args {
                    tp
                } else {
                    store.type_ref_ids(prefix1, sym1, args1)
                }
            }
            _ => map_over_default(self, tp),
        }
    }
}

/// Rebind `tp` against the current run, or report why it cannot be.
pub fn adapt_to_new_run(ctx: &TypeContext, tp: TypeId) -> Result<TypeId, RebindError> {
    let mut map = AdaptToNewRunMap::new(ctx);
    let rebound = map.apply(tp);
    match map.failure {
        Some(err) => Err(err),
        None => Ok(rebound),
    }
}

/// Rebind `tp`, keeping the stale type when rebinding misses — the
/// incremental-session fallback.
pub fn adapt_or_keep(ctx: &TypeContext, tp: TypeId) -> TypeId {
    match adapt_to_new_run(ctx, tp) {
        Ok(rebound) => rebound,
        Err(err) => {
            debug!(%err, "rebinding failed; keeping stale reference");
            tp
        }
    }
}

#[cfg(test)]
#[path = "../tests/rebind_tests.rs"]
mod tests;
