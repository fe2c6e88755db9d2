mod common;

use common::{film_schema, placeholders};
use pgselect::{
    DomainConfig, JoinConfig, JoinKindConfig, Predicate, QuerySet, Schema, SqlType, Value,
};

#[test]
fn adjacency_list_recursion_is_capped_by_a_parameter() {
    let q = QuerySet::new().select(["title", "category.name", "category_level"]);
    let c = film_schema().compile(&q).unwrap();
    assert_eq!(
        c.sql,
        "WITH RECURSIVE category_hierarchy AS (\
         SELECT \"id\", \"name\", \"parent_id\", 0 AS level, CAST(\"id\" AS TEXT) AS path, ARRAY[\"id\"] AS path_array \
         FROM \"category\" WHERE \"parent_id\" IS NULL \
         UNION ALL \
         SELECT c.\"id\", c.\"name\", c.\"parent_id\", h.level + 1, h.path || '/' || CAST(c.\"id\" AS TEXT), h.path_array || c.\"id\" \
         FROM \"category\" c JOIN category_hierarchy h ON c.\"parent_id\" = h.\"id\" WHERE h.level < $1) \
         SELECT root.\"title\", category.\"name\", category.\"level\" FROM \"film\" root \
         LEFT JOIN category_hierarchy category ON root.\"category_id\" = category.\"id\""
    );
    // level starts at 0 and the recursive term only extends rows with
    // level < 3, so no emitted row exceeds level 3
    assert_eq!(c.params, vec![Value::Int(3)]);
}

#[test]
fn materialized_path_filters_by_root_prefix() {
    let q = QuerySet::new().select(["region_depth", "region_path_array"]);
    let c = film_schema().compile(&q).unwrap();
    assert_eq!(
        c.sql,
        "WITH region_mpath AS (\
         SELECT t.*, (length(t.\"path\") - length(replace(t.\"path\", '.', ''))) / length('.') AS depth, \
         string_to_array(t.\"path\", '.') AS path_array FROM \"region\" t WHERE t.\"path\" LIKE $1) \
         SELECT region.\"depth\", region.\"path_array\" FROM \"film\" root \
         LEFT JOIN region_mpath region ON root.\"region_id\" = region.\"id\""
    );
    assert_eq!(c.params, vec![Value::Text("emea.%".into())]);
}

#[test]
fn materialized_path_without_root_selects_everything() {
    let schema = Schema::from_config(
        DomainConfig::new("film").join(
            "region",
            JoinConfig::new(JoinKindConfig::materialized_path(None), "region")
                .keys("region_id", "id"),
        ),
    )
    .unwrap();
    let c = schema
        .compile(&QuerySet::new().select(["region_depth"]))
        .unwrap();
    assert!(c.sql.contains("FROM \"region\" t) SELECT"));
    assert!(c.params.is_empty());
}

#[test]
fn root_path_wildcards_are_escaped() {
    let schema = Schema::from_config(
        DomainConfig::new("film").join(
            "region",
            JoinConfig::new(
                JoinKindConfig::materialized_path(Some("a_b%".into())),
                "region",
            ),
        ),
    )
    .unwrap();
    let c = schema
        .compile(&QuerySet::new().select(["region_depth"]))
        .unwrap();
    assert_eq!(c.params, vec![Value::Text("a\\_b\\%/%".into())]);
}

#[test]
fn closure_table_without_root_pairs_each_node_with_itself() {
    let q = QuerySet::new().select(["org_depth", "org_descendant_count"]);
    let c = film_schema().compile(&q).unwrap();
    assert_eq!(
        c.sql,
        "WITH org_closure AS (\
         SELECT t.*, c.\"depth\" AS depth, \
         (SELECT count(*) FROM \"org_unit_paths\" d WHERE d.\"ancestor_id\" = t.\"id\" AND d.\"descendant_id\" <> t.\"id\") AS descendant_count \
         FROM \"org_unit\" t JOIN \"org_unit_paths\" c ON c.\"descendant_id\" = t.\"id\" \
         WHERE c.\"ancestor_id\" = c.\"descendant_id\") \
         SELECT org.\"depth\", org.\"descendant_count\" FROM \"film\" root \
         LEFT JOIN org_closure org ON root.\"org_id\" = org.\"id\""
    );
    assert!(c.params.is_empty());
}

#[test]
fn cte_parameters_come_before_main_query_parameters() {
    let q = QuerySet::new()
        .select(["title", "region_depth", "category_level"])
        .filter([
            Predicate::eq("active", true),
            Predicate::gte("category_level", 1),
        ])
        .limit(25);
    let c = film_schema().compile(&q).unwrap();

    assert!(c.sql.starts_with("WITH RECURSIVE region_mpath AS ("));
    let region = c.sql.find("region_mpath AS (").unwrap();
    let category = c.sql.find("category_hierarchy AS (").unwrap();
    assert!(region < category);

    assert_eq!(
        c.params,
        vec![
            Value::Text("emea.%".into()),
            Value::Int(3),
            Value::Bool(true),
            Value::Int(1),
            Value::Int(25),
        ]
    );
    assert_eq!(placeholders(&c.sql), vec![1, 2, 3, 4, 5]);
}

#[test]
fn same_table_twice_gets_distinct_cte_names() {
    let schema = Schema::from_config(
        DomainConfig::new("product")
            .column("name", SqlType::Text)
            .join(
                "category",
                JoinConfig::new(JoinKindConfig::adjacency_list(3), "category")
                    .keys("category_id", "id"),
            )
            .join(
                "brand_category",
                JoinConfig::new(JoinKindConfig::adjacency_list(7), "category")
                    .keys("brand_category_id", "id"),
            ),
    )
    .unwrap();

    let q = QuerySet::new().select(["category_path", "brand_category_path"]);
    let c = schema.compile(&q).unwrap();

    assert!(c.sql.contains("category_hierarchy AS ("));
    assert!(c.sql.contains("brand_category_hierarchy AS ("));
    assert!(c.sql.contains("LEFT JOIN category_hierarchy category ON"));
    assert!(c.sql.contains("LEFT JOIN brand_category_hierarchy brand_category ON"));
    assert_eq!(c.params, vec![Value::Int(3), Value::Int(7)]);
}

#[test]
fn hierarchy_under_a_parent_join() {
    let schema = Schema::from_config(
        DomainConfig::new("sale").join(
            "product",
            JoinConfig::plain("product").keys("product_id", "id").join(
                "category",
                JoinConfig::new(JoinKindConfig::adjacency_list(2), "category")
                    .keys("category_id", "id"),
            ),
        ),
    )
    .unwrap();

    let c = schema
        .compile(&QuerySet::new().select(["category_path"]))
        .unwrap();
    assert!(c.sql.ends_with(
        "FROM \"sale\" root \
         LEFT JOIN \"product\" product ON root.\"product_id\" = product.\"id\" \
         LEFT JOIN category_hierarchy category ON product.\"category_id\" = category.\"id\""
    ));
}
