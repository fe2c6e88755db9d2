//! # pgselect
//!
//! A declarative SELECT compiler for PostgreSQL.
//!
//! Describe a schema once (source table, columns, a graph of joins) and build
//! queries as data: selectors, predicates, grouping and ordering. Compiling a
//! query yields SQL with `$1, $2, ...` placeholders and the values to bind, in
//! matching order.
//!
//! ## Features
//!
//! - **Injection-safe**: every value is a bound parameter; every identifier
//!   passes a strict whitelist before it reaches SQL text
//! - **Minimal joins**: only joins referenced by the query are emitted, each
//!   after the joins it depends on
//! - **Join archetypes**: plain, dimension lookups, many-to-many tagging,
//!   star/snowflake dimensions and hierarchies (adjacency list, materialized
//!   path, closure table) compiled to CTEs
//! - **Deterministic**: the same schema and query always compile to the same
//!   SQL and parameters
//!
//! ## Example
//!
//! ```ignore
//! use pgselect::{Predicate, QuerySet, Schema};
//!
//! let schema = Schema::from_toml_str(r#"
//!     table = "film"
//!
//!     [columns.title]
//!     type = "text"
//!
//!     [columns.release_year]
//!     type = "integer"
//!
//!     [joins.language]
//!     kind = "dimension"
//!     table = "language"
//!     owner_key = "language_id"
//!     my_key = "language_id"
//!     display_field = "name"
//! "#)?;
//!
//! let q = QuerySet::new()
//!     .select(["title", "language.name"])
//!     .filter([Predicate::between("release_year", 2000, 2010)]);
//!
//! let compiled = schema.compile(&q)?;
//! // SELECT root."title", language."name" FROM "film" root
//! //   LEFT JOIN "language" language ON root."language_id" = language."language_id"
//! //   WHERE root."release_year" between $1 and $2
//! let rows = compiled.fetch_all(&client).await?;
//! ```

pub mod compile;
pub mod error;
pub mod exec;
pub mod expr;
pub mod fragment;
pub mod ident;
pub mod query;
pub mod schema;
pub mod value;

pub use compile::{Compiled, Cte, compile};
pub use error::{ConfigError, Error, Result};
pub use exec::GenericClient;
pub use expr::{CompareOp, Evaluated, Predicate, Quantifier, Selector, Subquery};
pub use fragment::{Fragment, Part};
pub use ident::{Ident, guard, guard_alias, guard_label, guard_path, quote_literal};
pub use query::{Direction, OrderItem, QuerySet};
pub use schema::{
    Column, ColumnConfig, DomainConfig, JoinConfig, JoinKindConfig, JoinRef, NormalizationConfig,
    Schema,
};
pub use value::{SqlType, Value};
