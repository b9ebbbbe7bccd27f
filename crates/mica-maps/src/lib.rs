//! The type rewriting and traversal engine of the mica compiler.
//!
//! Everything the checker does to a type after construction flows through
//! this crate: substitution, prefix-relative member typing ("as seen
//! from"), existential normalization, dependent-method instantiation,
//! raw-type elaboration, cross-run rebinding, and the read-only
//! collectors.
//!
//! Two abstractions carry all of it:
//!
//! - [`TypeMap`]: a `TypeId -> TypeId` function with default structural
//!   recursion (`map_over`) that preserves identity wherever nothing
//!   changed. Concrete passes override `apply` and, rarely, the tree or
//!   list hooks.
//! - [`TypeFolder`]/[`TypeCollector`]: the read-only dual, aggregating a
//!   result without rebuilding, reentrancy-safe via save/restore of the
//!   accumulator.
//!
//! The identity guarantee is the load-bearing invariant: a rewrite that
//! changes nothing returns the input id without touching the interner,
//! recursively through argument lists, binder symbol lists, scopes, and
//! annotation trees.

pub mod as_seen_from;
pub mod collect;
pub mod dependent;
pub mod existential;
pub mod folder;
pub mod hierarchy;
pub mod raw;
pub mod rebind;
pub mod subst;
pub mod type_map;

pub use as_seen_from::AsSeenFromMap;
pub use collect::{
    CollectTypeCollector, ContainsCollector, ErroneousCollector, ExistsTypeCollector,
    FilterTypeCollector, FindTypeCollector, ForEachTypeTraverser, collect_type, exists_type,
    filter_type, find_type, foreach_type, type_contains,
};
pub use dependent::{ApproximateDependentMap, InstantiateDependentMap, IsDependentCollector};
pub use existential::{
    ExistentialExtrapolation, WildcardExtrapolation, drop_singleton_type, existential_abstraction,
    normalize_aliases, singleton_bounds, wildcard_extrapolation,
};
pub use folder::{TypeCollector, TypeFolder};
pub use hierarchy::{base_type, dealias, qualifier_tree};
pub use raw::{RawToExistentialMap, raw_to_existential};
pub use rebind::{AdaptToNewRunMap, RebindError, adapt_or_keep, adapt_to_new_run};
pub use subst::{
    MatchPolicy, SubstSymMap, SubstThisMap, SubstTypeMap, SubstWildcardMap, substitute_symbols,
    substitute_types,
};
pub use type_map::{TypeMap, TypeVarToOriginMap, Unmappable};
