//! Query compiler.
//!
//! Compilation evaluates every clause of a [`QuerySet`] in one [`Scope`],
//! resolves the referenced joins into dependency order, emits FROM/JOIN
//! (registering hierarchy CTEs on the way), prefixes the collected CTEs and
//! finalizes the whole tree in a single pass.

mod clause;
mod cte;
mod joins;

#[cfg(test)]
mod tests;

pub use cte::Cte;

use tokio_postgres::types::ToSql;

use crate::error::{Error, Result};
use crate::expr::Scope;
use crate::fragment::Fragment;
use crate::query::QuerySet;
use crate::schema::{ROOT_ALIAS, Schema};
use crate::value::Value;

/// Finalized SQL with its parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub sql: String,
    /// `params[i]` is bound to `$(i + 1)`.
    pub params: Vec<Value>,
}

impl Compiled {
    /// Parameters as `tokio-postgres` expects them.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
    }
}

struct Assembled {
    fragment: Fragment,
    joins: usize,
    ctes: usize,
}

fn assemble(schema: &Schema, query: &QuerySet) -> Result<Assembled> {
    let mut scope = Scope::new(schema);
    let select = clause::select_list(&mut scope, query.selected())?;
    let filter = clause::where_clause(&mut scope, query.filters())?;
    let group = clause::group_by(&mut scope, query.grouping(), query.is_rollup())?;
    let order = clause::order_by(&mut scope, query.ordering())?;

    let resolved = schema.joins().resolve(scope.joins())?;
    let mut with = cte::WithClause::new();

    let mut body = Fragment::new("SELECT ");
    body.push_fragment(select)
        .push(" FROM ")
        .push_ident(schema.table())
        .push(" ")
        .push(ROOT_ALIAS);
    for join in &resolved {
        body.push(" ").push_fragment(joins::emit(join, &mut with)?);
    }
    if !filter.is_empty() {
        body.push(" WHERE ").push_fragment(filter);
    }
    if !group.is_empty() {
        body.push(" GROUP BY ").push_fragment(group);
    }
    if !order.is_empty() {
        body.push(" ORDER BY ").push_fragment(order);
    }
    if let Some(limit) = query.limit_value() {
        if limit < 0 {
            return Err(Error::invalid_value("limit", "must not be negative"));
        }
        body.push(" LIMIT ").push_bind(limit);
    }
    if let Some(offset) = query.offset_value() {
        if offset < 0 {
            return Err(Error::invalid_value("offset", "must not be negative"));
        }
        body.push(" OFFSET ").push_bind(offset);
    }

    let ctes = with.len();
    Ok(Assembled {
        fragment: with.finish(body),
        joins: resolved.len(),
        ctes,
    })
}

/// Build the unfinalized fragment tree for `query` (used for subqueries).
pub(crate) fn build(schema: &Schema, query: &QuerySet) -> Result<Fragment> {
    assemble(schema, query).map(|a| a.fragment)
}

/// Compile `query` against `schema`.
pub fn compile(schema: &Schema, query: &QuerySet) -> Result<Compiled> {
    let assembled = assemble(schema, query)?;
    let (sql, params) = assembled.fragment.finalize();

    tracing::debug!(
        target: "pgselect.compile",
        table = %schema.table(),
        joins = assembled.joins,
        ctes = assembled.ctes,
        params = params.len(),
        "compiled query"
    );
    tracing::trace!(target: "pgselect.compile", sql = %sql);

    Ok(Compiled { sql, params })
}

impl Schema {
    /// Compile `query` against this schema.
    pub fn compile(&self, query: &QuerySet) -> Result<Compiled> {
        compile(self, query)
    }
}
