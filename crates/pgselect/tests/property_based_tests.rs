mod common;

use common::{film_schema, placeholders};
use pgselect::{Fragment, Predicate, QuerySet, Selector, Value};
use proptest::prelude::*;

fn leaf_predicate() -> impl Strategy<Value = Predicate> {
    prop_oneof![
        any::<i32>().prop_map(|v| Predicate::eq("release_year", v)),
        (any::<i32>(), any::<i32>()).prop_map(|(a, b)| Predicate::between("release_year", a, b)),
        "[a-z%_]{0,8}".prop_map(|s| Predicate::ilike("title", s)),
        prop::collection::vec("[a-z]{1,4}", 0..5).prop_map(|v| Predicate::in_list("rating", v)),
        any::<bool>().prop_map(|b| Predicate::eq("active", b)),
        Just(Predicate::is_null("language.name")),
        "[a-z ]{1,12}".prop_map(|s| Predicate::search("title", s)),
        (0i32..5).prop_map(|l| Predicate::gt("category_level", l)),
        "[a-z]{1,6}".prop_map(|s| Predicate::eq("store.manager", s)),
    ]
}

fn predicate_tree() -> impl Strategy<Value = Predicate> {
    leaf_predicate().prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Predicate::And),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Predicate::Or),
            inner.prop_map(Predicate::not),
        ]
    })
}

fn select_item() -> impl Strategy<Value = Selector> {
    prop_oneof![
        Just(Selector::field("title")),
        Just(Selector::field("region_depth")),
        any::<i64>().prop_map(|v| Selector::lit(v)),
        "[a-z]{0,5}".prop_map(|s| Selector::coalesce([Selector::field("rating"), Selector::lit(s)])),
        leaf_predicate().prop_map(|p| Selector::case([(p, Selector::lit(1))], Some(Selector::lit(0)))),
    ]
}

fn query_set() -> impl Strategy<Value = QuerySet> {
    (
        prop::collection::vec(select_item(), 0..4),
        prop::collection::vec(predicate_tree(), 0..4),
        proptest::option::of(0i64..1000),
    )
        .prop_map(|(select, filters, limit)| {
            let q = QuerySet::new().select(select).filter(filters);
            match limit {
                Some(l) => q.limit(l),
                None => q,
            }
        })
}

proptest! {
    /// Property: placeholders appear as $1..$n in order and match the parameter list length
    #[test]
    fn placeholders_are_sequential(q in query_set()) {
        let c = film_schema().compile(&q).unwrap();
        let found = placeholders(&c.sql);
        let expected: Vec<usize> = (1..=c.params.len()).collect();
        prop_assert_eq!(found, expected, "sql: {}", c.sql);
    }

    /// Property: compiling the same query set twice is byte-identical
    #[test]
    fn compilation_is_deterministic(q in query_set()) {
        let schema = film_schema();
        let a = schema.compile(&q).unwrap();
        let b = schema.compile(&q).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Property: an equality-only conjunction binds its values in source order
    #[test]
    fn values_follow_source_order(years in prop::collection::vec(any::<i32>(), 1..8)) {
        let q = QuerySet::new().filter(years.iter().map(|y| Predicate::eq("release_year", *y)));
        let c = film_schema().compile(&q).unwrap();
        let expected: Vec<Value> = years.iter().map(|y| Value::Int(i64::from(*y))).collect();
        prop_assert_eq!(c.params, expected);
    }

    /// Property: fragment concatenation is associative
    #[test]
    fn concatenation_is_associative(
        a in prop::collection::vec(any::<i16>(), 0..4),
        b in prop::collection::vec(any::<i16>(), 0..4),
        c in prop::collection::vec(any::<i16>(), 0..4),
    ) {
        fn frag(vals: &[i16]) -> Fragment {
            let mut f = Fragment::new("f(");
            for v in vals {
                f.push_bind(*v).push(",");
            }
            f.push(")");
            f
        }

        let mut left = frag(&a);
        left.push_fragment(frag(&b));
        left.push_fragment(frag(&c));

        let mut tail = frag(&b);
        tail.push_fragment(frag(&c));
        let mut right = frag(&a);
        right.push_fragment(tail);

        prop_assert_eq!(left.finalize(), right.finalize());
    }

    /// Property: ids outside [A-Za-z0-9_] never pass the identifier guard
    #[test]
    fn guard_rejects_non_word_characters(name in "[a-z]{0,4}[^A-Za-z0-9_][a-z]{0,4}") {
        prop_assert!(pgselect::guard(&name).is_err());
    }
}
