//! SELECT / WHERE / GROUP BY / ORDER BY list assembly.

use crate::error::Result;
use crate::expr::{Predicate, Scope, Selector};
use crate::fragment::Fragment;
use crate::query::OrderItem;

/// Comma-joined select list; `*` when empty.
pub(crate) fn select_list(scope: &mut Scope<'_>, items: &[Selector]) -> Result<Fragment> {
    if items.is_empty() {
        return Ok(Fragment::new("*"));
    }
    let parts = items
        .iter()
        .map(|s| scope.select_item(s))
        .collect::<Result<Vec<_>>>()?;
    Ok(Fragment::join(parts, ", "))
}

/// WHERE body. A single predicate is emitted bare; several are AND-ed with
/// each one parenthesized. Empty predicates are dropped.
pub(crate) fn where_clause(scope: &mut Scope<'_>, filters: &[Predicate]) -> Result<Fragment> {
    let mut parts = Vec::with_capacity(filters.len());
    for p in filters {
        let f = scope.predicate(p)?;
        if !f.is_empty() {
            parts.push(f);
        }
    }
    if parts.len() == 1 {
        return Ok(parts.remove(0));
    }
    Ok(Fragment::join(parts.into_iter().map(|f| f.wrap("(", ")")), " AND "))
}

pub(crate) fn group_by(scope: &mut Scope<'_>, items: &[Selector], rollup: bool) -> Result<Fragment> {
    let parts = items
        .iter()
        .map(|s| scope.selector(s))
        .collect::<Result<Vec<_>>>()?;
    let list = Fragment::join(parts, ", ");
    if rollup && !list.is_empty() {
        return Ok(list.wrap("ROLLUP(", ")"));
    }
    Ok(list)
}

pub(crate) fn order_by(scope: &mut Scope<'_>, items: &[OrderItem]) -> Result<Fragment> {
    let parts = items
        .iter()
        .map(|item| {
            let mut f = scope.selector(&item.selector)?;
            f.push(" ").push(item.direction.as_sql());
            Ok(f)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Fragment::join(parts, ", "))
}
