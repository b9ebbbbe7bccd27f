use super::*;
use mica_types::{
    AnnotationInfo, ScopeId, SymbolFlags, SymbolId, SymbolTable, TreeData, TypeContext, TypeData,
    TypeId, Variance,
};

/// A map that changes nothing: `apply` is plain recursion.
struct IdentityMap<'a> {
    ctx: &'a TypeContext,
}

impl<'a> TypeMap<'a> for IdentityMap<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        self.map_over(tp)
    }
}

/// Rewrites the top type to the bottom type, nothing else.
struct AnyToNothing<'a> {
    ctx: &'a TypeContext,
}

impl<'a> TypeMap<'a> for AnyToNothing<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }

    fn apply(&mut self, tp: TypeId) -> TypeId {
        if tp == TypeId::ANY {
            TypeId::NOTHING
        } else {
            self.map_over(tp)
        }
    }
}

fn method_over(ctx: &TypeContext, infos: &[TypeId]) -> (TypeId, Vec<SymbolId>) {
    let params: Vec<SymbolId> = infos
        .iter()
        .enumerate()
        .map(|(i, &info)| {
            ctx.new_value_param(ctx.intern_name(&format!("p{i}")), SymbolTable::ROOT, info)
        })
        .collect();
    let list = ctx.store.intern_symbol_list(&params);
    (ctx.store.method_type(list, TypeId::ANY_REF), params)
}

#[test]
fn identity_map_conserves_every_id() {
    let ctx = TypeContext::new();
    let (list, tps) = ctx.new_generic_class(
        ctx.intern_name("List"),
        SymbolTable::ROOT,
        &[(ctx.intern_name("T"), Variance::Covariant)],
    );
    let elem = ctx.type_param_ref(tps[0]);
    let applied = ctx.store.type_ref(TypeId::NO_PREFIX, list, &[elem]);
    let nested = ctx.store.refined(&[applied, TypeId::ANY_REF], ScopeId::EMPTY);

    let mut map = IdentityMap { ctx: &ctx };
    assert_eq!(map.apply(applied), applied);
    assert_eq!(map.apply(nested), nested);
}

#[test]
fn identity_map_conserves_binders_without_cloning() {
    let ctx = TypeContext::new();
    let before = ctx.symbols.len();
    let (mt, params) = method_over(&ctx, &[TypeId::ANY_REF, TypeId::ANY_REF]);

    let mut map = IdentityMap { ctx: &ctx };
    assert_eq!(map.apply(mt), mt);
    // No clones were allocated for an unchanged parameter list.
    assert_eq!(ctx.symbols.len(), before + params.len());
}

#[test]
fn changed_suffix_is_cloned_leading_symbols_keep_identity() {
    let ctx = TypeContext::new();
    let cls = ctx.new_class(ctx.intern_name("C"), SymbolTable::ROOT);
    let ctpe = ctx.store.type_ref(TypeId::NO_PREFIX, cls, &[]);
    let (mt, params) = method_over(&ctx, &[ctpe, TypeId::ANY, ctpe]);

    let mut map = AnyToNothing { ctx: &ctx };
    let mapped = map.apply(mt);
    assert_ne!(mapped, mt);

    let TypeData::MethodType { params: mapped_params, .. } = ctx.store.lookup(mapped) else {
        panic!("mapped type is not a method type");
    };
    let mapped_params = ctx.store.symbol_list(mapped_params);
    assert_eq!(mapped_params.len(), 3);
    // First param untouched by the map keeps its identity.
    assert_eq!(mapped_params[0], params[0]);
    // The change point and everything after it are fresh clones.
    assert_ne!(mapped_params[1], params[1]);
    assert_ne!(mapped_params[2], params[2]);
    assert_eq!(ctx.symbols.info(mapped_params[1]), TypeId::NOTHING);
    assert_eq!(ctx.symbols.info(mapped_params[2]), ctpe);
}

#[test]
fn scope_rebuilds_only_on_member_change() {
    let ctx = TypeContext::new();
    let a = ctx.new_term(
        ctx.intern_name("a"),
        SymbolTable::ROOT,
        TypeId::ANY_REF,
        SymbolFlags::empty(),
    );
    let b = ctx.new_term(
        ctx.intern_name("b"),
        SymbolTable::ROOT,
        TypeId::ANY,
        SymbolFlags::empty(),
    );
    let scope = ctx.store.intern_scope(&[a, b]);

    let mut identity = IdentityMap { ctx: &ctx };
    assert_eq!(identity.map_over_scope(scope), scope);

    let mut map = AnyToNothing { ctx: &ctx };
    let mapped = map.map_over_scope(scope);
    assert_ne!(mapped, scope);
    let members = ctx.store.scope_members(mapped);
    assert_eq!(members[0], a);
    assert_eq!(ctx.symbols.info(members[1]), TypeId::NOTHING);
}

#[test]
fn unrewritable_annotation_is_dropped_whole() {
    struct RefusesTrees<'a> {
        ctx: &'a TypeContext,
    }
    impl<'a> TypeMap<'a> for RefusesTrees<'a> {
        fn ctx(&self) -> &'a TypeContext {
            self.ctx
        }
        fn apply(&mut self, tp: TypeId) -> TypeId {
            self.map_over(tp)
        }
        fn map_tree(&mut self, _tree: mica_types::TreeId) -> Result<mica_types::TreeId, Unmappable> {
            Err(Unmappable)
        }
    }

    let ctx = TypeContext::new();
    let cls = ctx.new_class(ctx.intern_name("ann"), SymbolTable::ROOT);
    let atp = ctx.store.type_ref(TypeId::NO_PREFIX, cls, &[]);
    let arg = ctx.store.intern_tree(TreeData::Ident {
        sym: cls,
        tpe: atp,
    });
    let args = ctx.store.intern_tree_list(&[arg]);
    let annots = ctx
        .store
        .intern_annot_list(&[AnnotationInfo { atp, args }]);
    let annotated = ctx.store.annotated(annots, TypeId::ANY_REF);

    let mut map = RefusesTrees { ctx: &ctx };
    // The annotation cannot be rewritten, so the whole annotated layer
    // collapses to the underlying type.
    assert_eq!(map.apply(annotated), TypeId::ANY_REF);
}

#[test]
fn type_var_to_origin() {
    let ctx = TypeContext::new();
    let origin = ctx.symbols.register(
        mica_types::SymbolData::type_member(ctx.intern_name("T"), SymbolTable::ROOT)
            .with_flags(SymbolFlags::PARAM),
    );
    let tv = ctx.store.type_var(origin);
    let (list, _) = ctx.new_generic_class(
        ctx.intern_name("List"),
        SymbolTable::ROOT,
        &[(ctx.intern_name("A"), Variance::Covariant)],
    );
    let applied = ctx.store.type_ref(TypeId::NO_PREFIX, list, &[tv]);

    let mut map = TypeVarToOriginMap::new(&ctx);
    let mapped = map.apply(applied);
    let expected = ctx
        .store
        .type_ref(TypeId::NO_PREFIX, list, &[ctx.type_param_ref(origin)]);
    assert_eq!(mapped, expected);
}

/// Records the variance register at every leaf it visits.
struct VarianceProbe<'a> {
    ctx: &'a TypeContext,
    variance: Variance,
    seen: Vec<(TypeId, Variance)>,
}

impl<'a> TypeMap<'a> for VarianceProbe<'a> {
    fn ctx(&self) -> &'a TypeContext {
        self.ctx
    }
    fn tracks_variance(&self) -> bool {
        true
    }
    fn variance(&self) -> Variance {
        self.variance
    }
    fn set_variance(&mut self, v: Variance) {
        self.variance = v;
    }
    fn apply(&mut self, tp: TypeId) -> TypeId {
        if let TypeData::TypeRef { sym, args, .. } = self.ctx.store.lookup(tp) {
            if args.is_empty() && !self.ctx.symbols.is_class(sym) {
                self.seen.push((tp, self.variance));
            }
        }
        self.map_over(tp)
    }
}

#[test]
fn map_over_args_composes_ambient_and_declared_variance() {
    let ctx = TypeContext::new();
    let (pair, _) = ctx.new_generic_class(
        ctx.intern_name("Pair"),
        SymbolTable::ROOT,
        &[
            (ctx.intern_name("A"), Variance::Covariant),
            (ctx.intern_name("B"), Variance::Contravariant),
        ],
    );
    let leaf = ctx.symbols.register(mica_types::SymbolData::type_member(
        ctx.intern_name("X"),
        SymbolTable::ROOT,
    ));
    let x = ctx.type_param_ref(leaf);

    let inner = ctx.store.type_ref(TypeId::NO_PREFIX, pair, &[x, x]);
    let outer = ctx.store.type_ref(TypeId::NO_PREFIX, pair, &[inner, inner]);

    let mut probe = VarianceProbe {
        ctx: &ctx,
        variance: Variance::Covariant,
        seen: Vec::new(),
    };
    probe.apply(outer);

    // outer arg0 (+): inner under +; its leaves under +*+ and +*-.
    // outer arg1 (-): inner under -; its leaves under -*+ and -*-.
    let variances: Vec<Variance> = probe.seen.iter().map(|&(_, v)| v).collect();
    assert_eq!(
        variances,
        vec![
            Variance::Covariant,
            Variance::Contravariant,
            Variance::Contravariant,
            Variance::Covariant,
        ]
    );
}

#[test]
fn with_variance_restores_the_register() {
    let ctx = TypeContext::new();
    let mut probe = VarianceProbe {
        ctx: &ctx,
        variance: Variance::Covariant,
        seen: Vec::new(),
    };
    probe.with_variance(Variance::Invariant, |p| {
        assert!(p.variance().is_invariant());
        p.flipped(|q| assert!(q.variance().is_invariant()));
    });
    assert!(probe.variance().is_positive());
    probe.flipped(|p| assert!(p.variance().is_negative()));
    assert!(probe.variance().is_positive());
}
