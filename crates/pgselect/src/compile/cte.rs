//! CTE generation for hierarchical joins.
//!
//! Each hierarchical join produces one [`Cte`]. The compiler collects them in
//! join order into a [`WithClause`], which is spliced ahead of the main query
//! so that CTE parameters are numbered before the main query's.

use crate::error::Result;
use crate::fragment::Fragment;
use crate::ident::{guard, quote_literal};
use crate::schema::{Hierarchy, JoinDescriptor};
use crate::value::Value;

/// One `name AS (...)` definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    name: String,
    query: Fragment,
    /// The recursive term, joined to `query` with `UNION ALL`.
    recursive_query: Option<Fragment>,
}

impl Cte {
    pub(crate) fn new(name: &str, query: Fragment) -> Result<Self> {
        Ok(Self {
            name: guard(name)?.to_string(),
            query,
            recursive_query: None,
        })
    }

    pub(crate) fn recursive(name: &str, base: Fragment, recursive: Fragment) -> Result<Self> {
        Ok(Self {
            name: guard(name)?.to_string(),
            query: base,
            recursive_query: Some(recursive),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive_query.is_some()
    }

    /// This CTE's own parameters, in order.
    pub fn params(&self) -> Vec<&Value> {
        let mut out = self.query.params();
        if let Some(r) = &self.recursive_query {
            out.extend(r.params());
        }
        out
    }

    fn into_fragment(self) -> Fragment {
        let mut out = Fragment::new(self.name);
        out.push(" AS (").push_fragment(self.query);
        if let Some(recursive) = self.recursive_query {
            out.push(" UNION ALL ").push_fragment(recursive);
        }
        out.push(")");
        out
    }
}

/// Collected CTEs for one compilation.
#[derive(Debug, Default)]
pub(crate) struct WithClause {
    ctes: Vec<Cte>,
}

impl WithClause {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, cte: Cte) {
        self.ctes.push(cte);
    }

    pub(crate) fn len(&self) -> usize {
        self.ctes.len()
    }

    /// Prefix `main` with `WITH [RECURSIVE] a AS (...), b AS (...) `.
    pub(crate) fn finish(self, main: Fragment) -> Fragment {
        if self.ctes.is_empty() {
            return main;
        }

        let mut out = if self.ctes.iter().any(Cte::is_recursive) {
            Fragment::new("WITH RECURSIVE ")
        } else {
            Fragment::new("WITH ")
        };
        let defs = self.ctes.into_iter().map(Cte::into_fragment);
        out.push_fragment(Fragment::join(defs, ", "));
        out.push(" ").push_fragment(main);
        out
    }
}

/// Build the CTE for a hierarchical join.
pub(crate) fn hierarchy(join: &JoinDescriptor, hierarchy: &Hierarchy) -> Result<Cte> {
    let name = format!("{}_{}", join.id, hierarchy.cte_suffix());
    match hierarchy {
        Hierarchy::AdjacencyList {
            depth_limit,
            id_field,
            name_field,
            parent_field,
            extra_fields,
        } => {
            let fields: Vec<&str> = [id_field, name_field, parent_field]
                .into_iter()
                .chain(extra_fields)
                .map(String::as_str)
                .collect();

            let mut base = Fragment::new("SELECT ");
            for field in &fields {
                base.push_quoted(field).push(", ");
            }
            base.push("0 AS level, CAST(")
                .push_quoted(id_field)
                .push(" AS TEXT) AS path, ARRAY[")
                .push_quoted(id_field)
                .push("] AS path_array FROM ")
                .push_ident(&join.table)
                .push(" WHERE ")
                .push_quoted(parent_field)
                .push(" IS NULL");

            let mut rec = Fragment::new("SELECT ");
            for field in &fields {
                rec.push_column("c", field).push(", ");
            }
            rec.push("h.level + 1, h.path || '/' || CAST(")
                .push_column("c", id_field)
                .push(" AS TEXT), h.path_array || ")
                .push_column("c", id_field)
                .push(" FROM ")
                .push_ident(&join.table)
                .push(" c JOIN ")
                .push(&name)
                .push(" h ON ")
                .push_column("c", parent_field)
                .push(" = ")
                .push_column("h", id_field)
                .push(" WHERE h.level < ")
                .push_bind(i64::from(*depth_limit));

            Cte::recursive(&name, base, rec)
        }

        Hierarchy::MaterializedPath {
            path_field,
            separator,
            root_path,
        } => {
            let sep = quote_literal(separator);
            let mut q = Fragment::new("SELECT t.*, (length(");
            q.push_column("t", path_field)
                .push(") - length(replace(")
                .push_column("t", path_field)
                .push(&format!(", {sep}, ''))) / length({sep}) AS depth, string_to_array("))
                .push_column("t", path_field)
                .push(&format!(", {sep}) AS path_array FROM "))
                .push_ident(&join.table)
                .push(" t");
            if let Some(root) = root_path {
                let pattern = format!("{}%", escape_like(&format!("{root}{separator}")));
                q.push(" WHERE ")
                    .push_column("t", path_field)
                    .push(" LIKE ")
                    .push_bind(pattern);
            }
            Cte::new(&name, q)
        }

        Hierarchy::ClosureTable {
            closure,
            ancestor_field,
            descendant_field,
            depth_field,
            root_id,
        } => {
            let mut q = Fragment::new("SELECT t.*, ");
            q.push_column("c", depth_field)
                .push(" AS depth, (SELECT count(*) FROM ")
                .push_ident(closure)
                .push(" d WHERE ")
                .push_column("d", ancestor_field)
                .push(" = ")
                .push_column("t", &join.my_key)
                .push(" AND ")
                .push_column("d", descendant_field)
                .push(" <> ")
                .push_column("t", &join.my_key)
                .push(") AS descendant_count FROM ")
                .push_ident(&join.table)
                .push(" t JOIN ")
                .push_ident(closure)
                .push(" c ON ")
                .push_column("c", descendant_field)
                .push(" = ")
                .push_column("t", &join.my_key)
                .push(" WHERE ")
                .push_column("c", ancestor_field)
                .push(" = ");
            match root_id {
                Some(id) => q.push_bind(id.clone()),
                None => q.push_column("c", descendant_field),
            };
            Cte::new(&name, q)
        }
    }
}

/// Escape `%`, `_` and `\` for a LIKE pattern.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
