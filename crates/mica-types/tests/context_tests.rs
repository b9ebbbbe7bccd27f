use super::*;
use crate::variance::Variance;

#[test]
fn generic_class_carries_its_binder() {
    let ctx = TypeContext::new();
    let (list, tparams) = ctx.new_generic_class(
        ctx.intern_name("List"),
        SymbolTable::ROOT,
        &[(ctx.intern_name("T"), Variance::Covariant)],
    );
    assert_eq!(tparams.len(), 1);
    assert_eq!(ctx.type_params_of(list).as_ref(), tparams.as_slice());
    assert!(ctx.symbols.is_type_parameter(tparams[0]));
    assert_eq!(ctx.symbols.variance(tparams[0]), Variance::Covariant);
}

#[test]
fn widen_strips_singletons() {
    let ctx = TypeContext::new();
    let cls = ctx.new_class(ctx.intern_name("C"), SymbolTable::ROOT);
    let ctpe = ctx.store.type_ref(TypeId::NO_PREFIX, cls, &[]);
    let v = ctx.new_term(
        ctx.intern_name("v"),
        SymbolTable::ROOT,
        ctpe,
        SymbolFlags::STABLE,
    );
    let vtpe = ctx.store.single_type(TypeId::NO_PREFIX, v);
    assert!(ctx.is_stable_type(vtpe));
    assert_eq!(ctx.widen(vtpe), ctpe);
}

#[test]
fn this_types_are_stable() {
    let ctx = TypeContext::new();
    let cls = ctx.new_class(ctx.intern_name("C"), SymbolTable::ROOT);
    assert!(ctx.is_stable_type(ctx.store.this_type(cls)));
}

#[test]
fn subclassing_follows_declared_parents() {
    let ctx = TypeContext::new();
    let animal = ctx.new_class(ctx.intern_name("Animal"), SymbolTable::ROOT);
    let dog = ctx.new_class(ctx.intern_name("Dog"), SymbolTable::ROOT);
    ctx.set_class_parents(dog, &[ctx.store.type_ref(TypeId::NO_PREFIX, animal, &[])]);

    assert!(ctx.is_sub_class(dog, animal));
    assert!(!ctx.is_sub_class(animal, dog));
    assert!(ctx.is_sub_class(dog, SymbolTable::ANY_CLASS));
}

#[test]
fn member_lookup_searches_base_classes() {
    let ctx = TypeContext::new();
    let base = ctx.new_class(ctx.intern_name("Base"), SymbolTable::ROOT);
    let size = ctx.new_term(
        ctx.intern_name("size"),
        base,
        TypeId::ANY,
        SymbolFlags::STABLE,
    );
    ctx.set_class_decls(base, &[size]);

    let sub = ctx.new_class(ctx.intern_name("Sub"), SymbolTable::ROOT);
    ctx.set_class_parents(sub, &[ctx.store.type_ref(TypeId::NO_PREFIX, base, &[])]);

    let sub_tpe = ctx.store.type_ref(TypeId::NO_PREFIX, sub, &[]);
    assert_eq!(ctx.member(sub_tpe, ctx.intern_name("size")), size);
    assert_eq!(
        ctx.member(sub_tpe, ctx.intern_name("missing")),
        SymbolId::NONE
    );
}

#[test]
fn fresh_existential_is_marked_and_named() {
    let ctx = TypeContext::new();
    let owner = ctx.new_class(ctx.intern_name("C"), SymbolTable::ROOT);
    let bounds = ctx.store.type_bounds(TypeId::NOTHING, TypeId::ANY);
    let q = ctx.fresh_existential(owner, ctx.intern_name("x"), bounds);
    assert!(ctx.symbols.is_existential(q));
    assert_eq!(ctx.names.resolve(ctx.symbols.name(q)).as_ref(), "x.type");
}
