use super::*;
use crate::expr::{Predicate, Selector};
use crate::query::{Direction, OrderItem};
use crate::schema::{
    ColumnConfig, DomainConfig, JoinConfig, JoinKindConfig, NormalizationConfig,
};
use crate::value::SqlType;

fn film() -> Schema {
    let config = DomainConfig::new("film")
        .primary_key("film_id")
        .column("title", SqlType::Text)
        .column("rental_rate", SqlType::Float)
        .column("release_year", SqlType::Integer)
        .column("active", SqlType::Boolean)
        .column_with(
            "lang_name",
            ColumnConfig::new(SqlType::Text)
                .sql("upper(language.\"name\")")
                .requires_join("language"),
        )
        .join(
            "language",
            JoinConfig::new(
                JoinKindConfig::Dimension {
                    display_field: Some("name".into()),
                },
                "language",
            )
            .keys("language_id", "language_id"),
        )
        .join(
            "actors",
            JoinConfig::new(
                JoinKindConfig::Tagging {
                    through_table: "film_actor".into(),
                    main_foreign_key: "film_id".into(),
                    tag_foreign_key: "actor_id".into(),
                    tag_field: "last_name".into(),
                },
                "actor",
            )
            .keys("film_id", "actor_id"),
        )
        .join(
            "store",
            JoinConfig::plain("store").keys("store_id", "store_id").join(
                "address",
                JoinConfig::plain("address")
                    .keys("address_id", "address_id")
                    .column("district", SqlType::Text)
                    .join(
                        "city",
                        JoinConfig::plain("city")
                            .keys("city_id", "city_id")
                            .column("name", SqlType::Text),
                    ),
            ),
        )
        .join(
            "category",
            JoinConfig::new(JoinKindConfig::adjacency_list(3), "category")
                .keys("category_id", "id")
                .column("slug", SqlType::Text),
        )
        .join(
            "region",
            JoinConfig::new(JoinKindConfig::materialized_path(Some("eu".into())), "region")
                .keys("region_id", "id"),
        )
        .join(
            "org",
            JoinConfig::new(
                JoinKindConfig::ClosureTable {
                    closure_table: "org_paths".into(),
                    ancestor_field: "ancestor_id".into(),
                    descendant_field: "descendant_id".into(),
                    depth_field: "depth".into(),
                    root_id: Some(serde_json::json!(1)),
                },
                "org",
            )
            .keys("org_id", "id"),
        )
        .join(
            "product",
            JoinConfig::new(
                JoinKindConfig::Snowflake {
                    normalization: vec![
                        NormalizationConfig {
                            alias: "cat".into(),
                            table: "product_category".into(),
                            local_key: "category_id".into(),
                            foreign_key: "id".into(),
                            columns: [("name".to_string(), ColumnConfig::new(SqlType::Text))]
                                .into_iter()
                                .collect(),
                        },
                        NormalizationConfig {
                            alias: "dept".into(),
                            table: "department".into(),
                            local_key: "department_id".into(),
                            foreign_key: "id".into(),
                            columns: [("name".to_string(), ColumnConfig::new(SqlType::Text))]
                                .into_iter()
                                .collect(),
                        },
                    ],
                },
                "product",
            )
            .keys("product_id", "id"),
        );
    Schema::from_config(config).unwrap()
}

const CATEGORY_CTE: &str = "category_hierarchy AS (SELECT \"id\", \"name\", \"parent_id\", \"slug\", 0 AS level, CAST(\"id\" AS TEXT) AS path, ARRAY[\"id\"] AS path_array FROM \"category\" WHERE \"parent_id\" IS NULL UNION ALL SELECT c.\"id\", c.\"name\", c.\"parent_id\", c.\"slug\", h.level + 1, h.path || '/' || CAST(c.\"id\" AS TEXT), h.path_array || c.\"id\" FROM \"category\" c JOIN category_hierarchy h ON c.\"parent_id\" = h.\"id\" WHERE h.level < $1)";

const REGION_CTE_AFTER_CATEGORY: &str = "region_mpath AS (SELECT t.*, (length(t.\"path\") - length(replace(t.\"path\", '/', ''))) / length('/') AS depth, string_to_array(t.\"path\", '/') AS path_array FROM \"region\" t WHERE t.\"path\" LIKE $2)";

fn compile(q: QuerySet) -> Compiled {
    film().compile(&q).unwrap()
}

#[test]
fn root_only_select_with_filter() {
    let c = compile(QuerySet::new().select(["title"]).filter([("active", true)]));
    assert_eq!(
        c.sql,
        "SELECT root.\"title\" FROM \"film\" root WHERE root.\"active\" = $1"
    );
    assert_eq!(c.params, vec![Value::Bool(true)]);
}

#[test]
fn empty_select_is_star() {
    let c = compile(QuerySet::new());
    assert_eq!(c.sql, "SELECT * FROM \"film\" root");
    assert!(c.params.is_empty());
}

#[test]
fn empty_filters_emit_no_where() {
    let c = compile(QuerySet::new().select(["title"]).filter(Vec::<Predicate>::new()));
    assert_eq!(c.sql, "SELECT root.\"title\" FROM \"film\" root");

    let c = compile(
        QuerySet::new()
            .select(["title"])
            .filter([Predicate::and([]), Predicate::or([])]),
    );
    assert_eq!(c.sql, "SELECT root.\"title\" FROM \"film\" root");
}

#[test]
fn several_filters_are_parenthesized() {
    let c = compile(
        QuerySet::new()
            .select(["title"])
            .filter([Predicate::eq("active", true), Predicate::gt("rental_rate", 2)]),
    );
    assert_eq!(
        c.sql,
        "SELECT root.\"title\" FROM \"film\" root WHERE (root.\"active\" = $1) AND (root.\"rental_rate\" > $2)"
    );
    assert_eq!(c.params, vec![Value::Bool(true), Value::Float(2.0)]);
}

#[test]
fn dimension_join() {
    let c = compile(QuerySet::new().select(["title", "language.name"]));
    assert_eq!(
        c.sql,
        "SELECT root.\"title\", language.\"name\" FROM \"film\" root LEFT JOIN \"language\" language ON root.\"language_id\" = language.\"language_id\""
    );
}

#[test]
fn nested_joins_follow_dependencies() {
    let c = compile(QuerySet::new().select(["city.name"]));
    assert_eq!(
        c.sql,
        "SELECT city.\"name\" FROM \"film\" root \
         LEFT JOIN \"store\" store ON root.\"store_id\" = store.\"store_id\" \
         LEFT JOIN \"address\" address ON store.\"address_id\" = address.\"address_id\" \
         LEFT JOIN \"city\" city ON address.\"city_id\" = city.\"city_id\""
    );
}

#[test]
fn joins_keep_first_reference_order() {
    let c = compile(
        QuerySet::new()
            .select(["language.name"])
            .filter([Predicate::eq("address.district", "North")]),
    );
    let lang = c.sql.find("LEFT JOIN \"language\"").unwrap();
    let store = c.sql.find("LEFT JOIN \"store\"").unwrap();
    let address = c.sql.find("LEFT JOIN \"address\"").unwrap();
    assert!(lang < store && store < address);
    assert!(!c.sql.contains("\"city\""));
}

#[test]
fn only_referenced_joins_are_emitted() {
    let c = compile(
        QuerySet::new()
            .select(["title"])
            .filter([Predicate::ilike("language.name", "en%")]),
    );
    assert_eq!(c.sql.matches("LEFT JOIN").count(), 1);
    assert!(!c.sql.contains("store"));
    assert!(!c.sql.contains("WITH"));
}

#[test]
fn order_by_pulls_in_joins() {
    let c = compile(
        QuerySet::new()
            .select(["title"])
            .order_by([OrderItem::desc("language.name")]),
    );
    assert_eq!(
        c.sql,
        "SELECT root.\"title\" FROM \"film\" root LEFT JOIN \"language\" language ON root.\"language_id\" = language.\"language_id\" ORDER BY language.\"name\" desc"
    );
}

#[test]
fn computed_root_column_pulls_in_its_join() {
    let c = compile(QuerySet::new().select(["lang_name"]));
    assert_eq!(
        c.sql,
        "SELECT upper(language.\"name\") FROM \"film\" root LEFT JOIN \"language\" language ON root.\"language_id\" = language.\"language_id\""
    );
}

#[test]
fn tagging_join_and_aggregate() {
    let c = compile(
        QuerySet::new()
            .select(["title", "actors_list", "actors_count"])
            .group_by(["title"]),
    );
    assert_eq!(
        c.sql,
        "SELECT root.\"title\", string_agg(DISTINCT actors.\"last_name\", ', '), count(DISTINCT actors.\"actor_id\") \
         FROM \"film\" root \
         LEFT JOIN \"film_actor\" actors_join ON root.\"film_id\" = actors_join.\"film_id\" \
         LEFT JOIN \"actor\" actors ON actors_join.\"actor_id\" = actors.\"actor_id\" \
         GROUP BY root.\"title\""
    );
}

#[test]
fn snowflake_chain() {
    let c = compile(QuerySet::new().select(["product.dept.name"]));
    assert_eq!(
        c.sql,
        "SELECT product_dept.\"name\" FROM \"film\" root \
         LEFT JOIN \"product\" product ON root.\"product_id\" = product.\"id\" \
         LEFT JOIN \"product_category\" product_cat ON product.\"category_id\" = product_cat.\"id\" \
         LEFT JOIN \"department\" product_dept ON product_cat.\"department_id\" = product_dept.\"id\""
    );
}

#[test]
fn adjacency_list_cte() {
    let c = compile(
        QuerySet::new()
            .select(["title", "category_level"])
            .filter([("title", "Alien")])
            .limit(5),
    );
    assert_eq!(
        c.sql,
        format!(
            "WITH RECURSIVE {CATEGORY_CTE} SELECT root.\"title\", category.\"level\" FROM \"film\" root \
             LEFT JOIN category_hierarchy category ON root.\"category_id\" = category.\"id\" \
             WHERE root.\"title\" = $2 LIMIT $3"
        )
    );
    assert_eq!(
        c.params,
        vec![Value::Int(3), Value::Text("Alien".into()), Value::Int(5)]
    );
}

#[test]
fn materialized_path_cte() {
    let c = compile(QuerySet::new().select(["region_depth"]));
    assert_eq!(
        c.sql,
        "WITH region_mpath AS (SELECT t.*, (length(t.\"path\") - length(replace(t.\"path\", '/', ''))) / length('/') AS depth, string_to_array(t.\"path\", '/') AS path_array FROM \"region\" t WHERE t.\"path\" LIKE $1) \
         SELECT region.\"depth\" FROM \"film\" root LEFT JOIN region_mpath region ON root.\"region_id\" = region.\"id\""
    );
    assert_eq!(c.params, vec![Value::Text("eu/%".into())]);
}

#[test]
fn closure_table_cte() {
    let c = compile(QuerySet::new().select(["org_descendant_count"]));
    assert_eq!(
        c.sql,
        "WITH org_closure AS (SELECT t.*, c.\"depth\" AS depth, (SELECT count(*) FROM \"org_paths\" d WHERE d.\"ancestor_id\" = t.\"id\" AND d.\"descendant_id\" <> t.\"id\") AS descendant_count \
         FROM \"org\" t JOIN \"org_paths\" c ON c.\"descendant_id\" = t.\"id\" WHERE c.\"ancestor_id\" = $1) \
         SELECT org.\"descendant_count\" FROM \"film\" root LEFT JOIN org_closure org ON root.\"org_id\" = org.\"id\""
    );
    assert_eq!(c.params, vec![Value::Int(1)]);
}

#[test]
fn several_ctes_are_comma_joined() {
    let c = compile(QuerySet::new().select(["category_path", "region_path_array"]));
    assert!(c.sql.starts_with(&format!(
        "WITH RECURSIVE {CATEGORY_CTE}, {REGION_CTE_AFTER_CATEGORY} SELECT "
    )));
    assert_eq!(c.params, vec![Value::Int(3), Value::Text("eu/%".into())]);
}

#[test]
fn rollup_order_limit_offset() {
    let c = compile(
        QuerySet::new()
            .select([Selector::field("release_year"), Selector::count_all().alias("n")])
            .group_by_rollup(["release_year"])
            .order_by([("release_year", Direction::Desc)])
            .limit(10)
            .offset(20),
    );
    assert_eq!(
        c.sql,
        "SELECT root.\"release_year\", count(*) AS \"n\" FROM \"film\" root \
         GROUP BY ROLLUP(root.\"release_year\") ORDER BY root.\"release_year\" desc LIMIT $1 OFFSET $2"
    );
    assert_eq!(c.params, vec![Value::Int(10), Value::Int(20)]);
}

#[test]
fn default_order_direction() {
    let c = compile(QuerySet::new().select(["title"]).order_by(["title"]));
    assert!(c.sql.ends_with("ORDER BY root.\"title\" asc nulls first"));
}

#[test]
fn compile_errors_return_no_sql() {
    let schema = film();

    let err = schema
        .compile(&QuerySet::new().select(["title", "nope"]))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownField { .. }));
    assert!(err.is_compile_error());

    let err = schema
        .compile(&QuerySet::new().group_by([Selector::field("title").alias("t")]))
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedSelector(_)));

    let err = schema.compile(&QuerySet::new().limit(-1)).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));
}

#[test]
fn compiling_twice_is_identical() {
    let q = QuerySet::new()
        .select(["title", "category_path", "actors_list"])
        .filter([
            Predicate::between("release_year", 2000, 2010),
            Predicate::in_list("language.name", ["English", "French"]),
        ])
        .group_by(["title", "category_path"])
        .order_by(["title"]);
    let schema = film();
    assert_eq!(schema.compile(&q).unwrap(), schema.compile(&q).unwrap());
}

#[test]
fn params_ref_matches_params() {
    let c = compile(
        QuerySet::new()
            .filter([("active", true)])
            .filter([("release_year", 2001)]),
    );
    assert_eq!(c.params_ref().len(), c.params.len());
}
