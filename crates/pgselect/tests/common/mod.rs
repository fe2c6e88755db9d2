#![allow(dead_code)]

use std::sync::OnceLock;

use pgselect::Schema;
use regex::Regex;

/// A film-rental domain exercising every join archetype.
pub const FILM_SCHEMA: &str = r#"
table = "film"
primary_key = "film_id"

[columns.title]
type = "text"

[columns.rating]
type = "text"

[columns.release_year]
type = "integer"

[columns.rental_rate]
type = "float"

[columns.active]
type = "boolean"

[columns.last_update]
type = "timestamp"

[joins.language]
kind = "dimension"
table = "language"
owner_key = "language_id"
my_key = "language_id"
display_field = "name"

[joins.actors]
kind = "tagging"
table = "actor"
owner_key = "film_id"
my_key = "actor_id"
through_table = "film_actor"
main_foreign_key = "film_id"
tag_foreign_key = "actor_id"
tag_field = "last_name"

[joins.inventory]
kind = "plain"
table = "inventory"
owner_key = "film_id"
my_key = "film_id"

[joins.inventory.joins.store]
kind = "plain"
table = "store"
owner_key = "store_id"
my_key = "store_id"

[joins.inventory.joins.store.columns.manager]
type = "text"
field = "manager_name"

[joins.category]
kind = "adjacency_list"
table = "category"
owner_key = "category_id"
my_key = "id"
depth_limit = 3

[joins.region]
kind = "materialized_path"
table = "region"
owner_key = "region_id"
my_key = "id"
separator = "."
root_path = "emea"

[joins.org]
kind = "closure_table"
table = "org_unit"
owner_key = "org_id"
my_key = "id"
closure_table = "org_unit_paths"
"#;

pub fn film_schema() -> Schema {
    Schema::from_toml_str(FILM_SCHEMA).expect("fixture schema is valid")
}

/// A root-only schema: `t(name text, active boolean, age integer, tag text)`.
pub fn root_only_schema() -> Schema {
    Schema::from_json_str(
        r#"{
            "table": "t",
            "columns": {
                "name": { "type": "text" },
                "active": { "type": "boolean" },
                "age": { "type": "integer" },
                "tag": { "type": "text" }
            }
        }"#,
    )
    .expect("fixture schema is valid")
}

/// `$n` indices in order of appearance.
pub fn placeholders(sql: &str) -> Vec<usize> {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\$(\d+)").expect("valid placeholder regex"));
    re.captures_iter(sql)
        .map(|c| c[1].parse().expect("digits"))
        .collect()
}
