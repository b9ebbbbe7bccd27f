use super::*;
use crate::collect::type_contains;
use mica_types::{
    AnnotationInfo, SymbolData, SymbolFlags, SymbolId, SymbolTable, TreeData, TypeContext,
    TypeData, TypeId, Variance,
};

fn list_class(ctx: &TypeContext) -> (SymbolId, Vec<SymbolId>) {
    ctx.new_generic_class(
        ctx.intern_name("List"),
        SymbolTable::ROOT,
        &[(ctx.intern_name("T"), Variance::Covariant)],
    )
}

fn abstract_type(ctx: &TypeContext, name: &str) -> SymbolId {
    ctx.symbols.register(
        SymbolData::type_member(ctx.intern_name(name), SymbolTable::ROOT)
            .with_flags(SymbolFlags::DEFERRED),
    )
}

#[test]
fn substitutes_a_type_for_a_symbol() {
    let ctx = TypeContext::new();
    let (list, _) = list_class(&ctx);
    let x = abstract_type(&ctx, "X");
    let int_cls = ctx.new_class(ctx.intern_name("Int"), SymbolTable::ROOT);
    let int_tpe = ctx.store.type_ref(TypeId::NO_PREFIX, int_cls, &[]);

    let list_x = ctx
        .store
        .type_ref(TypeId::NO_PREFIX, list, &[ctx.type_param_ref(x)]);
    let result = SubstTypeMap::new(&ctx, &[x], &[int_tpe]).apply(list_x);
    let expected = ctx.store.type_ref(TypeId::NO_PREFIX, list, &[int_tpe]);
    assert_eq!(result, expected);
}

#[test]
fn no_occurrence_means_no_change() {
    let ctx = TypeContext::new();
    let (list, _) = list_class(&ctx);
    let x = abstract_type(&ctx, "X");
    let y = abstract_type(&ctx, "Y");

    let list_y = ctx
        .store
        .type_ref(TypeId::NO_PREFIX, list, &[ctx.type_param_ref(y)]);
    let result = SubstTypeMap::new(&ctx, &[x], &[TypeId::ANY_REF]).apply(list_y);
    assert_eq!(result, list_y, "untouched types keep their identity");
}

#[test]
fn substitution_composes() {
    let ctx = TypeContext::new();
    let (list, _) = list_class(&ctx);
    let a = abstract_type(&ctx, "A");
    let b = abstract_type(&ctx, "B");
    let c = abstract_type(&ctx, "C");
    let (ta, tb, tc) = (
        ctx.type_param_ref(a),
        ctx.type_param_ref(b),
        ctx.type_param_ref(c),
    );

    let list_a = ctx.store.type_ref(TypeId::NO_PREFIX, list, &[ta]);
    let via_b = SubstTypeMap::new(&ctx, &[b], &[tc])
        .apply(SubstTypeMap::new(&ctx, &[a], &[tb]).apply(list_a));
    let direct = SubstTypeMap::new(&ctx, &[a], &[tc]).apply(list_a);
    assert_eq!(via_b, direct);
}

#[test]
fn bound_symbols_are_renamed_before_substituting() {
    let ctx = TypeContext::new();
    let (list, _) = list_class(&ctx);
    let t = ctx.symbols.register(
        SymbolData::type_member(ctx.intern_name("T"), SymbolTable::ROOT)
            .with_flags(SymbolFlags::PARAM)
            .with_info(ctx.store.type_bounds(TypeId::NOTHING, TypeId::ANY)),
    );
    let body = ctx
        .store
        .type_ref(TypeId::NO_PREFIX, list, &[ctx.type_param_ref(t)]);
    let binder = ctx
        .store
        .poly_type(ctx.store.intern_symbol_list(&[t]), body);

    let int_cls = ctx.new_class(ctx.intern_name("Int"), SymbolTable::ROOT);
    let int_tpe = ctx.store.type_ref(TypeId::NO_PREFIX, int_cls, &[]);
    let result = SubstTypeMap::new(&ctx, &[t], &[int_tpe]).apply(binder);

    let TypeData::PolyType { tparams, result: body1 } = ctx.store.lookup(result) else {
        panic!("expected a polymorphic type");
    };
    let tparams = ctx.store.symbol_list(tparams);
    assert_eq!(tparams.len(), 1);
    let renamed = tparams[0];
    assert_ne!(renamed, t, "the bound symbol must be alpha-renamed");
    // The bound occurrence follows the renamed binder, not the
    // substitution.
    let expected_body = ctx
        .store
        .type_ref(TypeId::NO_PREFIX, list, &[ctx.type_param_ref(renamed)]);
    assert_eq!(body1, expected_body);
    assert!(!type_contains(&ctx, result, t));
}

#[test]
fn free_occurrences_in_renamed_bounds_are_still_substituted() {
    let ctx = TypeContext::new();
    let u = abstract_type(&ctx, "U");
    // method [T <: U](x: T): T with T also in `from` — T is renamed, U
    // inside the renamed bound is still replaced.
    let t = ctx.symbols.register(
        SymbolData::type_member(ctx.intern_name("T"), SymbolTable::ROOT)
            .with_flags(SymbolFlags::PARAM)
            .with_info(
                ctx.store
                    .type_bounds(TypeId::NOTHING, ctx.type_param_ref(u)),
            ),
    );
    let binder = ctx
        .store
        .poly_type(ctx.store.intern_symbol_list(&[t]), ctx.type_param_ref(t));

    let result =
        SubstTypeMap::new(&ctx, &[t, u], &[TypeId::ANY_REF, TypeId::ANY]).apply(binder);
    let TypeData::PolyType { tparams, .. } = ctx.store.lookup(result) else {
        panic!("expected a polymorphic type");
    };
    let renamed = ctx.store.symbol_list(tparams)[0];
    assert_ne!(renamed, t);
    let (_, hi) = ctx.bounds_of(renamed);
    assert_eq!(hi, TypeId::ANY, "U must be substituted inside the bound");
}

#[test]
fn symbol_for_symbol_substitution_rewrites_types_and_trees() {
    let ctx = TypeContext::new();
    let (list, _) = list_class(&ctx);
    let a = abstract_type(&ctx, "A");
    let b = abstract_type(&ctx, "B");

    let list_a = ctx
        .store
        .type_ref(TypeId::NO_PREFIX, list, &[ctx.type_param_ref(a)]);
    let mut map = SubstSymMap::new(&ctx, &[a], &[b]);
    let expected = ctx
        .store
        .type_ref(TypeId::NO_PREFIX, list, &[ctx.type_param_ref(b)]);
    assert_eq!(map.apply(list_a), expected);

    let ident = ctx.store.intern_tree(TreeData::Ident {
        sym: a,
        tpe: ctx.type_param_ref(a),
    });
    let renamed = map.map_tree(ident).expect("tree rewrite succeeds");
    match ctx.store.lookup_tree(renamed) {
        TreeData::Ident { sym, tpe } => {
            assert_eq!(sym, b);
            assert_eq!(tpe, ctx.type_param_ref(b));
        }
        other => panic!("expected an identifier, got {other:?}"),
    }
    // The original tree is untouched.
    assert_eq!(ctx.store.lookup_tree(ident).symbol(), a);
}

#[test]
fn this_type_substitution() {
    let ctx = TypeContext::new();
    let cls = ctx.new_class(ctx.intern_name("C"), SymbolTable::ROOT);
    let v = ctx.new_term(
        ctx.intern_name("v"),
        SymbolTable::ROOT,
        ctx.store.type_ref(TypeId::NO_PREFIX, cls, &[]),
        SymbolFlags::STABLE,
    );
    let pre = ctx.store.single_type(TypeId::NO_PREFIX, v);

    let this_tpe = ctx.store.this_type(cls);
    let inner = ctx.store.single_type(
        this_tpe,
        ctx.new_term(
            ctx.intern_name("field"),
            cls,
            TypeId::ANY_REF,
            SymbolFlags::STABLE,
        ),
    );
    let mut map = SubstThisMap::new(&ctx, cls, pre);
    assert_eq!(map.apply(this_tpe), pre);
    match ctx.store.lookup(map.apply(inner)) {
        TypeData::SingleType { prefix, .. } => assert_eq!(prefix, pre),
        other => panic!("expected a path type, got {other:?}"),
    }
}

#[test]
fn wildcard_substitution_uses_declared_bounds() {
    let ctx = TypeContext::new();
    let (list, _) = list_class(&ctx);
    let upper = ctx.store.type_ref(TypeId::NO_PREFIX, list, &[TypeId::ANY]);
    let t = ctx.symbols.register(
        SymbolData::type_member(ctx.intern_name("T"), SymbolTable::ROOT)
            .with_flags(SymbolFlags::PARAM)
            .with_info(ctx.store.type_bounds(TypeId::NOTHING, upper)),
    );

    let result = SubstWildcardMap::new(&ctx, &[t]).apply(ctx.type_param_ref(t));
    assert_eq!(result, ctx.store.bounded_wildcard(TypeId::NOTHING, upper));
}

#[test]
fn malformed_bounds_degrade_to_a_bare_wildcard() {
    let ctx = TypeContext::new();
    let t = ctx.symbols.register(
        SymbolData::type_member(ctx.intern_name("T"), SymbolTable::ROOT)
            .with_flags(SymbolFlags::PARAM)
            .with_info(TypeId::ERROR),
    );
    let result = SubstWildcardMap::new(&ctx, &[t]).apply(ctx.type_param_ref(t));
    assert_eq!(result, TypeId::WILDCARD);
}

#[test]
fn unstable_replacement_gives_up_on_trees_and_drops_the_annotation() {
    let ctx = TypeContext::new();
    let cls = ctx.new_class(ctx.intern_name("C"), SymbolTable::ROOT);
    let ctpe = ctx.store.type_ref(TypeId::NO_PREFIX, cls, &[]);
    let x = ctx.new_term(
        ctx.intern_name("x"),
        SymbolTable::ROOT,
        ctpe,
        SymbolFlags::PARAM,
    );

    let arg = ctx.store.intern_tree(TreeData::Ident {
        sym: x,
        tpe: ctx.store.single_type(TypeId::NO_PREFIX, x),
    });
    let ann = AnnotationInfo {
        atp: ctpe,
        args: ctx.store.intern_tree_list(&[arg]),
    };
    let annotated = ctx
        .store
        .annotated(ctx.store.intern_annot_list(&[ann]), TypeId::ANY_REF);

    // `ctpe` is not a stable type, so the identifier cannot be retyped.
    let mut map = SubstTypeMap::new(&ctx, &[x], &[ctpe]);
    assert_eq!(map.map_tree(arg), Err(Unmappable));
    assert_eq!(map.apply(annotated), TypeId::ANY_REF);
}

#[test]
fn stable_replacement_rewrites_the_identifier_to_a_qualifier() {
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
    let x = ctx.new_term(
        ctx.intern_name("x"),
        SymbolTable::ROOT,
        ctpe,
        SymbolFlags::PARAM,
    );

    let arg = ctx.store.intern_tree(TreeData::Ident {
        sym: x,
        tpe: ctx.store.single_type(TypeId::NO_PREFIX, x),
    });
    let mut map = SubstTypeMap::new(&ctx, &[x], &[vtpe]);
    let rewritten = map.map_tree(arg).expect("stable replacement");
    match ctx.store.lookup_tree(rewritten) {
        TreeData::Ident { sym, tpe } => {
            assert_eq!(sym, v);
            assert_eq!(tpe, vtpe);
        }
        other => panic!("expected a qualifier identifier, got {other:?}"),
    }
}
