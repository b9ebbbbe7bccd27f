//! Interned syntax trees.
//!
//! The rewriting engine sees trees almost exclusively inside annotation
//! arguments. They are opaque structural containers except for the few
//! shapes the engine must understand: identifiers, selections,
//! `this`-references, and type applications. Every node carries a type
//! attribute and (where meaningful) a resolved symbol.
//!
//! Trees are interned like types; tree identity is `TreeId` equality and
//! an unchanged rewrite returns the input id without touching the store.

use crate::symbol::SymbolId;
use crate::types::{TreeListId, TypeId};
use mica_common::Atom;
use serde::Serialize;

/// Interned tree handle. Id 0 is the empty tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TreeId(pub u32);

impl TreeId {
    pub const EMPTY: TreeId = TreeId(0);

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Literal constants appearing in annotation arguments.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Str(Atom),
}

/// The closed set of tree shapes the engine distinguishes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TreeData {
    /// The empty tree.
    Empty,
    /// A reference to a symbol by name.
    Ident { sym: SymbolId, tpe: TypeId },
    /// A member selection `qual.sym`.
    Select {
        qual: TreeId,
        sym: SymbolId,
        tpe: TypeId,
    },
    /// A `this`-reference to an enclosing class.
    This { sym: SymbolId, tpe: TypeId },
    /// A function application; opaque beyond its children.
    Apply {
        fun: TreeId,
        args: TreeListId,
        tpe: TypeId,
    },
    /// A type application `fun[args]`.
    TypeApply {
        fun: TreeId,
        args: TreeListId,
        tpe: TypeId,
    },
    /// A literal constant.
    Literal { value: LiteralValue, tpe: TypeId },
    /// A type position with no term structure.
    TypeTree { tpe: TypeId },
}

impl TreeData {
    /// The type attribute of this node.
    pub fn tpe(&self) -> TypeId {
        match *self {
            TreeData::Empty => TypeId::NO_TYPE,
            TreeData::Ident { tpe, .. }
            | TreeData::Select { tpe, .. }
            | TreeData::This { tpe, .. }
            | TreeData::Apply { tpe, .. }
            | TreeData::TypeApply { tpe, .. }
            | TreeData::Literal { tpe, .. }
            | TreeData::TypeTree { tpe } => tpe,
        }
    }

    /// The resolved symbol of this node, if it has one.
    pub fn symbol(&self) -> SymbolId {
        match *self {
            TreeData::Ident { sym, .. }
            | TreeData::Select { sym, .. }
            | TreeData::This { sym, .. } => sym,
            _ => SymbolId::NONE,
        }
    }
}
