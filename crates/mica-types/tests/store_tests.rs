use super::*;
use crate::symbol::SymbolTable;

#[test]
fn fixed_types_occupy_their_declared_ids() {
    let store = TypeStore::new();
    assert_eq!(store.lookup(TypeId::NO_TYPE), TypeData::NoType);
    assert_eq!(store.lookup(TypeId::ERROR), TypeData::Error);
    assert_eq!(store.lookup(TypeId::NO_PREFIX), TypeData::NoPrefix);
    assert_eq!(store.lookup(TypeId::WILDCARD), TypeData::Wildcard);
    match store.lookup(TypeId::ANY) {
        TypeData::TypeRef { sym, .. } => assert_eq!(sym, SymbolTable::ANY_CLASS),
        other => panic!("expected a class reference, got {other:?}"),
    }
}

#[test]
fn interning_is_structural() {
    let store = TypeStore::new();
    let sym = SymbolId(42);
    let a = store.type_ref(TypeId::NO_PREFIX, sym, &[TypeId::ANY]);
    let b = store.type_ref(TypeId::NO_PREFIX, sym, &[TypeId::ANY]);
    assert_eq!(a, b, "structurally equal types intern to the same id");

    let c = store.type_ref(TypeId::NO_PREFIX, sym, &[TypeId::NOTHING]);
    assert_ne!(a, c);
}

#[test]
fn empty_lists_are_id_zero() {
    let store = TypeStore::new();
    assert_eq!(store.intern_type_list(&[]), TypeListId::EMPTY);
    assert_eq!(store.intern_symbol_list(&[]), SymbolListId::EMPTY);
    assert_eq!(store.intern_tree_list(&[]), TreeListId::EMPTY);
    assert!(store.type_list(TypeListId::EMPTY).is_empty());
}

#[test]
fn scopes_preserve_order_and_drop_duplicates() {
    let store = TypeStore::new();
    let (a, b, c) = (SymbolId(10), SymbolId(11), SymbolId(12));
    let scope = store.intern_scope(&[a, b, a, c, b]);
    let members = store.scope_members(scope);
    assert_eq!(members.as_ref(), &[a, b, c]);
}

#[test]
fn trees_intern_structurally() {
    let store = TypeStore::new();
    let t1 = store.intern_tree(TreeData::Ident {
        sym: SymbolId(7),
        tpe: TypeId::ANY,
    });
    let t2 = store.intern_tree(TreeData::Ident {
        sym: SymbolId(7),
        tpe: TypeId::ANY,
    });
    assert_eq!(t1, t2);
    assert_eq!(store.lookup_tree(t1).tpe(), TypeId::ANY);
}

#[test]
fn bounds_and_wildcards_are_distinct_shapes() {
    let store = TypeStore::new();
    let bounds = store.type_bounds(TypeId::NOTHING, TypeId::ANY);
    let wild = store.bounded_wildcard(TypeId::NOTHING, TypeId::ANY);
    assert_ne!(bounds, wild);
}
