//! Interned type representation.
//!
//! Every type the checker manipulates is a [`TypeData`] value interned
//! into the [`crate::store::TypeStore`], addressed by a dense [`TypeId`].
//! Component lists (type arguments, bound symbols, scopes, annotation
//! lists, tree lists) are interned separately and referenced by their own
//! id newtypes, so `TypeData` itself stays `Copy` and hashable.
//!
//! Structural sharing is load-bearing here: the rewriting engine promises
//! that a no-op rewrite returns the *same* `TypeId`, and interning makes
//! that promise checkable with an integer comparison.

use crate::symbol::SymbolId;
use serde::Serialize;

/// Interned type handle. Equal ids mean structurally equal types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    /// The absence of a type (failed lookups, uninitialized infos).
    pub const NO_TYPE: TypeId = TypeId(0);
    /// The error type; absorbs further errors silently.
    pub const ERROR: TypeId = TypeId(1);
    /// The empty prefix of top-level references.
    pub const NO_PREFIX: TypeId = TypeId(2);
    /// An unconstrained wildcard.
    pub const WILDCARD: TypeId = TypeId(3);
    /// The top type.
    pub const ANY: TypeId = TypeId(4);
    /// The reference top type (the classfile-interop `Object` bound).
    pub const ANY_REF: TypeId = TypeId(5);
    /// The bottom type.
    pub const NOTHING: TypeId = TypeId(6);
    /// The marker parent of singleton upper bounds.
    pub const SINGLETON: TypeId = TypeId(7);

    #[inline]
    pub const fn is_no_type(self) -> bool {
        self.0 == Self::NO_TYPE.0
    }

    #[inline]
    pub const fn is_error(self) -> bool {
        self.0 == Self::ERROR.0
    }
}

/// Interned list of types. Id 0 is the empty list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TypeListId(pub u32);

impl TypeListId {
    pub const EMPTY: TypeListId = TypeListId(0);

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Interned list of symbols (binder parameter lists). Id 0 is empty.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolListId(pub u32);

impl SymbolListId {
    pub const EMPTY: SymbolListId = SymbolListId(0);

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Interned member scope: ordered by insertion, duplicate-free. Id 0 is
/// the empty scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const EMPTY: ScopeId = ScopeId(0);

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Interned list of trees (annotation arguments). Id 0 is empty.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TreeListId(pub u32);

impl TreeListId {
    pub const EMPTY: TreeListId = TreeListId(0);

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Interned list of annotations. Id 0 is empty.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct AnnotListId(pub u32);

impl AnnotListId {
    pub const EMPTY: AnnotListId = AnnotListId(0);

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// An annotation: the annotation class type plus its argument trees.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct AnnotationInfo {
    /// Type of the annotation class.
    pub atp: TypeId,
    /// Argument expression trees.
    pub args: TreeListId,
}

/// The closed set of type shapes.
///
/// Fixed points (`NoType`, `Error`, `NoPrefix`, `Wildcard`) are
/// pre-interned at the ids on [`TypeId`]; everything else is built
/// through the store's constructors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TypeData {
    /// The absence of a type.
    NoType,
    /// The error type.
    Error,
    /// The empty prefix.
    NoPrefix,
    /// An unconstrained wildcard.
    Wildcard,
    /// A reference `prefix.sym[args]` to a class, alias, abstract type,
    /// or type parameter.
    TypeRef {
        prefix: TypeId,
        sym: SymbolId,
        args: TypeListId,
    },
    /// A path-dependent singleton `prefix.sym.type`.
    SingleType { prefix: TypeId, sym: SymbolId },
    /// The self-reference `sym.this.type` of an enclosing class.
    ThisType { sym: SymbolId },
    /// A method signature with term-symbol parameters. The result may
    /// depend on the parameters through singleton references.
    MethodType {
        params: SymbolListId,
        result: TypeId,
    },
    /// A parameterless-method signature.
    NullaryMethod { result: TypeId },
    /// A polymorphic signature binding type parameters; also wraps the
    /// infos of generic classes.
    PolyType {
        tparams: SymbolListId,
        result: TypeId,
    },
    /// An existential type: `underlying forSome { quantified }`.
    Existential {
        quantified: SymbolListId,
        underlying: TypeId,
    },
    /// An intersection of parents plus a member scope.
    Refined { parents: TypeListId, decls: ScopeId },
    /// A type carrying annotations.
    Annotated {
        annots: AnnotListId,
        underlying: TypeId,
    },
    /// A wildcard constrained by bounds.
    BoundedWildcard { lo: TypeId, hi: TypeId },
    /// Declared bounds of an abstract type or quantifier.
    TypeBounds { lo: TypeId, hi: TypeId },
    /// An inference placeholder standing in for its origin symbol.
    TypeVar { origin: SymbolId },
}
