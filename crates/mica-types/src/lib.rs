//! Core data model for the mica type checker.
//!
//! This crate owns the representations every later phase rewrites and
//! inspects:
//!
//! - **Types**: structurally interned `TypeData` values addressed by
//!   `TypeId`. Interning makes type equality an integer comparison and
//!   gives the rewriting engine its structural-sharing guarantee.
//! - **Symbols**: table-owned named entities with identity semantics, a
//!   mutable `info` type, and owner-chain navigation.
//! - **Scopes**: ordered, duplicate-free member lists.
//! - **Trees**: interned syntax fragments carrying symbol and type
//!   attributes, used by annotation arguments.
//! - **Variance**: the closed four-point algebra with `flip` and
//!   composition.
//!
//! The rewriting passes themselves live in `mica-maps`; this crate only
//! defines the shapes and the narrow query surface over them.

pub mod context;
pub mod store;
pub mod symbol;
pub mod tree;
pub mod types;
pub mod variance;

pub use context::TypeContext;
pub use store::TypeStore;
pub use symbol::{SymbolData, SymbolFlags, SymbolId, SymbolKind, SymbolTable};
pub use tree::{LiteralValue, TreeData, TreeId};
pub use types::{
    AnnotListId, AnnotationInfo, ScopeId, SymbolListId, TreeListId, TypeData, TypeId, TypeListId,
};
pub use variance::Variance;
