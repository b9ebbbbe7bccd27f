use super::*;
use mica_types::{
    ScopeId, SymbolData, SymbolFlags, SymbolId, SymbolTable, TreeData, TypeContext, TypeData,
    TypeId, Variance,
};

fn quantifier(ctx: &TypeContext, name: &str, lo: TypeId, hi: TypeId) -> SymbolId {
    ctx.symbols.register(
        SymbolData::type_member(ctx.intern_name(name), SymbolTable::ROOT)
            .with_flags(SymbolFlags::EXISTENTIAL)
            .with_info(ctx.store.type_bounds(lo, hi)),
    )
}

fn class_ref(ctx: &TypeContext, name: &str) -> TypeId {
    let cls = ctx.new_class(ctx.intern_name(name), SymbolTable::ROOT);
    ctx.store.type_ref(TypeId::NO_PREFIX, cls, &[])
}

#[test]
fn lone_covariant_occurrence_widens_to_its_upper_bound() {
    let ctx = TypeContext::new();
    let upper = class_ref(&ctx, "C");
    let q = quantifier(&ctx, "Q", TypeId::NOTHING, upper);

    let mut extra = ExistentialExtrapolation::new(&ctx, &[q]);
    assert_eq!(extra.extrapolate(ctx.type_param_ref(q)), upper);
}

#[test]
fn lone_contravariant_occurrence_narrows_to_its_lower_bound() {
    let ctx = TypeContext::new();
    let lower = class_ref(&ctx, "L");
    let q = quantifier(&ctx, "Q", lower, TypeId::ANY);
    let (sink, _) = ctx.new_generic_class(
        ctx.intern_name("Sink"),
        SymbolTable::ROOT,
        &[(ctx.intern_name("T"), Variance::Contravariant)],
    );
    let tp = ctx
        .store
        .type_ref(TypeId::NO_PREFIX, sink, &[ctx.type_param_ref(q)]);

    let mut extra = ExistentialExtrapolation::new(&ctx, &[q]);
    let expected = ctx.store.type_ref(TypeId::NO_PREFIX, sink, &[lower]);
    assert_eq!(extra.extrapolate(tp), expected);
}

#[test]
fn repeated_occurrences_are_never_extrapolated() {
    let ctx = TypeContext::new();
    let upper = class_ref(&ctx, "C");
    let q = quantifier(&ctx, "Q", TypeId::NOTHING, upper);
    let tp = ctx.store.refined(
        &[ctx.type_param_ref(q), ctx.type_param_ref(q)],
        ScopeId::EMPTY,
    );

    let mut extra = ExistentialExtrapolation::new(&ctx, &[q]);
    assert_eq!(extra.extrapolate(tp), tp, "two occurrences must survive");
}

#[test]
fn invariant_positions_are_never_extrapolated() {
    let ctx = TypeContext::new();
    let upper = class_ref(&ctx, "C");
    let q = quantifier(&ctx, "Q", TypeId::NOTHING, upper);
    let (cell, _) = ctx.new_generic_class(
        ctx.intern_name("Cell"),
        SymbolTable::ROOT,
        &[(ctx.intern_name("T"), Variance::Invariant)],
    );
    let tp = ctx
        .store
        .type_ref(TypeId::NO_PREFIX, cell, &[ctx.type_param_ref(q)]);

    let mut extra = ExistentialExtrapolation::new(&ctx, &[q]);
    assert_eq!(extra.extrapolate(tp), tp);
}

#[test]
fn bounds_mentioning_another_quantifier_block_extrapolation() {
    let ctx = TypeContext::new();
    let q2 = quantifier(&ctx, "Q2", TypeId::NOTHING, TypeId::ANY);
    let q1 = quantifier(&ctx, "Q1", TypeId::NOTHING, ctx.type_param_ref(q2));
    let tp = ctx.type_param_ref(q1);

    let mut extra = ExistentialExtrapolation::new(&ctx, &[q1, q2]);
    assert_eq!(extra.extrapolate(tp), tp);
}

#[test]
fn singleton_identifier_trees_survive_extrapolation() {
    let ctx = TypeContext::new();
    let c = ctx.new_class(ctx.intern_name("C"), SymbolTable::ROOT);
    let v = ctx.new_term(
        ctx.intern_name("v"),
        SymbolTable::ROOT,
        ctx.store.type_ref(TypeId::NO_PREFIX, c, &[]),
        SymbolFlags::STABLE,
    );
    let vtpe = ctx.store.single_type(TypeId::NO_PREFIX, v);
    let ident = ctx.store.intern_tree(TreeData::Ident { sym: v, tpe: vtpe });

    let q = quantifier(&ctx, "Q", TypeId::NOTHING, TypeId::ANY_REF);
    let mut extra = ExistentialExtrapolation::new(&ctx, &[q]);
    assert_eq!(extra.map_tree(ident), Ok(ident));
}

#[test]
fn drop_singleton_strips_the_marker() {
    let ctx = TypeContext::new();
    let c = class_ref(&ctx, "C");
    let with_marker = ctx.store.refined(&[c, TypeId::SINGLETON], ScopeId::EMPTY);
    assert_eq!(drop_singleton_type(&ctx, with_marker), c);
    assert_eq!(drop_singleton_type(&ctx, TypeId::SINGLETON), TypeId::ANY);
    assert_eq!(drop_singleton_type(&ctx, c), c);
}

#[test]
fn singleton_bounds_shape() {
    let ctx = TypeContext::new();
    let c = class_ref(&ctx, "C");
    let v = ctx.new_term(ctx.intern_name("v"), SymbolTable::ROOT, c, SymbolFlags::STABLE);
    let path = ctx.store.single_type(TypeId::NO_PREFIX, v);

    let bounds = singleton_bounds(&ctx, path);
    let TypeData::TypeBounds { lo, hi } = ctx.store.lookup(bounds) else {
        panic!("expected bounds");
    };
    assert_eq!(lo, TypeId::NOTHING);
    assert_eq!(hi, ctx.store.refined(&[c, TypeId::SINGLETON], ScopeId::EMPTY));
}

#[test]
fn wildcard_extrapolation_covariant_bottom_lower_bound() {
    let ctx = TypeContext::new();
    let c = class_ref(&ctx, "C");
    let w = ctx.store.bounded_wildcard(TypeId::NOTHING, c);
    assert_eq!(wildcard_extrapolation(&ctx, w), c);
}

#[test]
fn wildcard_extrapolation_contravariant_top_upper_bound() {
    let ctx = TypeContext::new();
    let l = class_ref(&ctx, "L");
    let (sink, _) = ctx.new_generic_class(
        ctx.intern_name("Sink"),
        SymbolTable::ROOT,
        &[(ctx.intern_name("T"), Variance::Contravariant)],
    );
    for top in [TypeId::ANY, TypeId::ANY_REF] {
        let w = ctx.store.bounded_wildcard(l, top);
        let tp = ctx.store.type_ref(TypeId::NO_PREFIX, sink, &[w]);
        let expected = ctx.store.type_ref(TypeId::NO_PREFIX, sink, &[l]);
        assert_eq!(wildcard_extrapolation(&ctx, tp), expected);
    }
}

#[test]
fn wildcard_extrapolation_keeps_informative_bounds() {
    let ctx = TypeContext::new();
    let l = class_ref(&ctx, "L");
    let u = class_ref(&ctx, "U");
    // Covariant position but a nontrivial lower bound: nothing to elide.
    let w = ctx.store.bounded_wildcard(l, u);
    assert_eq!(wildcard_extrapolation(&ctx, w), w);
}

#[test]
fn abstraction_packs_only_surviving_quantifiers() {
    let ctx = TypeContext::new();
    let upper = class_ref(&ctx, "C");
    let q = quantifier(&ctx, "Q", TypeId::NOTHING, upper);

    // A lone covariant occurrence extrapolates away entirely.
    assert_eq!(
        existential_abstraction(&ctx, &[q], ctx.type_param_ref(q)),
        upper
    );

    // An invariant occurrence survives and gets quantified.
    let (cell, _) = ctx.new_generic_class(
        ctx.intern_name("Cell"),
        SymbolTable::ROOT,
        &[(ctx.intern_name("T"), Variance::Invariant)],
    );
    let body = ctx
        .store
        .type_ref(TypeId::NO_PREFIX, cell, &[ctx.type_param_ref(q)]);
    let packed = existential_abstraction(&ctx, &[q], body);
    match ctx.store.lookup(packed) {
        TypeData::Existential {
            quantified,
            underlying,
        } => {
            assert_eq!(ctx.store.symbol_list(quantified).as_ref(), &[q]);
            assert_eq!(underlying, body);
        }
        other => panic!("expected an existential, got {other:?}"),
    }
}

#[test]
fn abstraction_expands_aliases_before_packing() {
    let ctx = TypeContext::new();
    let q = quantifier(&ctx, "Q", TypeId::NOTHING, TypeId::ANY_REF);
    let alias = ctx.new_type_alias(
        ctx.intern_name("Alias"),
        SymbolTable::ROOT,
        ctx.type_param_ref(q),
    );
    let alias_ref = ctx.store.type_ref(TypeId::NO_PREFIX, alias, &[]);

    // Through the alias there is exactly one covariant occurrence.
    assert_eq!(
        existential_abstraction(&ctx, &[q], alias_ref),
        TypeId::ANY_REF
    );
}
