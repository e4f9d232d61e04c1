/// Property-based tests for call-site analysis
///
/// These tests check the analyzer against a direct recursive definition of
/// the size and lock rules, on randomly shaped plans.

use ferrous_callsite::{
    AnalysisResult, CallSite, CallSiteAnalyzer, CallSiteKind, EmitCostTable, analyze, key_of_type,
};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug)]
struct Svc;

fn leaf() -> impl Strategy<Value = CallSite> {
    prop_oneof![
        any::<u32>().prop_map(CallSite::constant_value),
        Just(CallSite::create_instance(key_of_type::<Svc>(), "Svc")),
        Just(CallSite::service_provider(key_of_type::<Svc>())),
        Just(CallSite::service_scope_factory(key_of_type::<Svc>())),
        Just(CallSite::factory(key_of_type::<Svc>(), || Arc::new(Svc))),
    ]
}

fn plan() -> impl Strategy<Value = CallSite> {
    leaf().prop_recursive(6, 96, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|c| CallSite::transient(key_of_type::<Svc>(), c)),
            inner.clone().prop_map(|c| CallSite::singleton(key_of_type::<Svc>(), c)),
            inner.clone().prop_map(|c| CallSite::scoped(key_of_type::<Svc>(), c)),
            prop::collection::vec(inner.clone(), 0..4)
                .prop_map(|params| CallSite::constructor(key_of_type::<Svc>(), "Svc", params)),
            prop::collection::vec(inner, 0..4).prop_map(|elements| {
                CallSite::enumerable(key_of_type::<Vec<Svc>>(), key_of_type::<Svc>(), elements)
            }),
        ]
    })
}

/// Direct restatement of the rules: base cost plus children, lock iff scoped anywhere.
fn expected(site: &CallSite, costs: &EmitCostTable) -> AnalysisResult {
    let own = AnalysisResult::new(costs.base_cost(site.kind()), site.kind() == CallSiteKind::Scoped);
    site.children()
        .iter()
        .fold(own, |acc, child| acc.add(expected(child, costs)))
}

fn contains_scoped(site: &CallSite) -> bool {
    site.kind() == CallSiteKind::Scoped || site.children().iter().any(contains_scoped)
}

fn cost_table() -> impl Strategy<Value = EmitCostTable> {
    (0usize..200, 0usize..200, 0usize..200, 0usize..200, 0usize..200).prop_map(
        |(constructor, scoped, constant, service_provider, factory)| EmitCostTable {
            constructor,
            scoped,
            constant,
            service_provider,
            factory,
        },
    )
}

// Property: the analyzer agrees with the recursive definition
proptest! {
    #[test]
    fn analysis_matches_definition(site in plan()) {
        prop_assert_eq!(analyze(&site), expected(&site, &EmitCostTable::DEFAULT));
    }
}

// Property: the lock flag is set exactly when a scoped call site is present
proptest! {
    #[test]
    fn lock_iff_scoped_present(site in plan()) {
        prop_assert_eq!(analyze(&site).requires_scope_lock, contains_scoped(&site));
    }
}

// Property: analysis is pure
proptest! {
    #[test]
    fn analysis_is_idempotent(site in plan()) {
        let analyzer = CallSiteAnalyzer::INSTANCE;
        prop_assert_eq!(analyzer.analyze(&site), analyzer.analyze(&site));
    }
}

// Property: child order does not matter for constructors and enumerables
proptest! {
    #[test]
    fn child_order_is_irrelevant(
        children in prop::collection::vec(plan(), 0..6),
        rotation in 0usize..6,
    ) {
        let mut permuted = children.clone();
        permuted.reverse();
        if !permuted.is_empty() {
            let by = rotation % permuted.len();
            permuted.rotate_left(by);
        }

        let ctor = CallSite::constructor(key_of_type::<Svc>(), "Svc", children.clone());
        let ctor_permuted = CallSite::constructor(key_of_type::<Svc>(), "Svc", permuted.clone());
        prop_assert_eq!(analyze(&ctor), analyze(&ctor_permuted));

        let list = CallSite::enumerable(key_of_type::<Vec<Svc>>(), key_of_type::<Svc>(), children);
        let list_permuted = CallSite::enumerable(key_of_type::<Vec<Svc>>(), key_of_type::<Svc>(), permuted);
        prop_assert_eq!(analyze(&list), analyze(&list_permuted));
    }
}

// Property: a scoped node under any stack of other call sites forces the lock
proptest! {
    #[test]
    fn scoped_propagates_to_root(
        payload in plan(),
        wrappers in prop::collection::vec((0u8..4, prop::collection::vec(plan(), 0..3)), 0..8),
    ) {
        let mut site = CallSite::scoped(key_of_type::<Svc>(), payload);
        for (wrapper, siblings) in wrappers {
            site = match wrapper {
                0 => CallSite::transient(key_of_type::<Svc>(), site),
                1 => CallSite::singleton(key_of_type::<Svc>(), site),
                2 => {
                    let mut params = siblings;
                    params.push(site);
                    CallSite::constructor(key_of_type::<Svc>(), "Svc", params)
                }
                _ => {
                    let mut elements = siblings;
                    elements.insert(0, site);
                    CallSite::enumerable(key_of_type::<Vec<Svc>>(), key_of_type::<Svc>(), elements)
                }
            };
        }

        prop_assert!(analyze(&site).requires_scope_lock);
    }
}

// Property: recalibration changes sizes, never the lock decision
proptest! {
    #[test]
    fn custom_costs_follow_definition(site in plan(), costs in cost_table()) {
        let tuned = CallSiteAnalyzer::with_costs(costs).analyze(&site);
        prop_assert_eq!(tuned, expected(&site, &costs));
        prop_assert_eq!(tuned.requires_scope_lock, analyze(&site).requires_scope_lock);
    }
}

// Property: the result monoid is commutative and associative with ZERO as identity
proptest! {
    #[test]
    fn result_monoid_laws(
        a in (0usize..1_000_000, any::<bool>()),
        b in (0usize..1_000_000, any::<bool>()),
        c in (0usize..1_000_000, any::<bool>()),
    ) {
        let a = AnalysisResult::new(a.0, a.1);
        let b = AnalysisResult::new(b.0, b.1);
        let c = AnalysisResult::new(c.0, c.1);

        prop_assert_eq!(a + b, b + a);
        prop_assert_eq!((a + b) + c, a + (b + c));
        prop_assert_eq!(a + AnalysisResult::ZERO, a);
        prop_assert_eq!([a, b, c].iter().sum::<AnalysisResult>(), a + b + c);
    }
}
