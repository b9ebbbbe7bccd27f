//! Raw-type elaboration.
//!
//! A classfile-loaded generic class referenced without type arguments (a
//! raw type) is not well-formed in the checker's algebra. Elaboration
//! abstracts the reference over fresh existential parameters standing in
//! for the class's declared type parameters. A class whose bounds
//! raw-reference the class itself (directly or mutually) would expand
//! forever; the visited set cuts that off with a plain reference-top.

use crate::existential::existential_abstraction;
use crate::type_map::TypeMap;
use mica_common::limits::MAX_RAW_EXPANSIONS;
use mica_types::{SymbolData, SymbolFlags, SymbolId, TypeContext, TypeData, TypeId};
use rustc_hash::FxHashSet;
use tracing::warn;

/// Converts raw references into existential types.
pub struct RawToExistentialMap<'a> {
    ctx: &'a TypeContext,
    expanding: FxHashSet<SymbolId>,
}

impl<'a> RawToExistentialMap<'a> {
    pub fn new(ctx: &'a TypeContext) -> Self {
        RawToExistentialMap {
            ctx,
            expanding: FxHashSet::default(),
        }
    }

    /// A zero-argument reference to this symbol is raw: a classfile
    /// class with declared type parameters.
    fn is_raw_if_without_args(&self, sym: SymbolId) -> bool {
        self.ctx.symbols.is_class(sym)
            && self.ctx.symbols.flags(sym).contains(SymbolFlags::JAVA_DEFINED)
            && !self.ctx.type_params_of(sym).is_empty()
    }

    /// Fresh existential stand-ins for a class's type parameters, with
    /// the parameters' own bounds (elaborated in turn, so raw references
    /// inside bounds expand too).
    fn type_params_to_existentials(&mut self, sym: SymbolId) -> Vec<SymbolId> {
        let tparams = self.ctx.type_params_of(sym);
        let eparams: Vec<SymbolId> = tparams
            .iter()
            .map(|&p| {
                self.ctx.symbols.register(
                    SymbolData::type_member(self.ctx.symbols.name(p), sym)
                        .with_flags(SymbolFlags::EXISTENTIAL | SymbolFlags::PARAM)
                        .with_info(self.ctx.symbols.info(p)),
                )
            })
            .collect();
        for &e in &eparams {
            let elaborated = self.apply(self.ctx.symbols.info(e));
            self.ctx.symbols.set_info(e, elaborated);
        }
        eparams
    }
}

impl<'a> TypeMap<'a> for RawToExistentialMap<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        match self.ctx.store.lookup(tp) {
            TypeData::TypeRef { prefix, sym, args }
                if args.is_empty() && self.is_raw_if_without_args(sym) =>
            {
                if self.expanding.contains(&sym) {
                    return TypeId::ANY_REF;
                }
                if self.expanding.len() >= MAX_RAW_EXPANSIONS {
                    warn!(sym = sym.0, "raw expansion limit reached; degrading");
                    return TypeId::ANY_REF;
                }
                self.expanding.insert(sym);
                let eparams = self.type_params_to_existentials(sym);
                let prefix1 = self.apply(prefix);
                let eargs: Vec<TypeId> =
                    eparams.iter().map(|&e| self.ctx.type_param_ref(e)).collect();
                let applied = self.ctx.store.type_ref(prefix1, sym, &eargs);
                let result = existential_abstraction(self.ctx, &eparams, applied);
                self.expanding.remove(&sym);
                result
            }
            _ => self.map_over(tp),
        }
    }
}

/// Elaborate every raw reference inside `tp`.
pub fn raw_to_existential(ctx: &TypeContext, tp: TypeId) -> TypeId {
    RawToExistentialMap::new(ctx).apply(tp)
}

#[cfg(test)]
#[path = "../tests/raw_tests.rs"]
mod tests;
