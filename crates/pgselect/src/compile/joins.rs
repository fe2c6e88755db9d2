//! JOIN emission per archetype.

use crate::compile::cte::{self, WithClause};
use crate::error::Result;
use crate::fragment::Fragment;
use crate::ident::Ident;
use crate::schema::{Hierarchy, JoinDescriptor, JoinKind, Olap, Tagging};

/// `LEFT JOIN <relation> <alias> ON <left_alias>."<left_key>" = <alias>."<right_key>"`
fn left_join(
    relation: Fragment,
    alias: &str,
    left_alias: &str,
    left_key: &str,
    right_key: &str,
) -> Fragment {
    let mut out = Fragment::new("LEFT JOIN ");
    out.push_fragment(relation)
        .push(" ")
        .push(alias)
        .push(" ON ")
        .push_column(left_alias, left_key)
        .push(" = ")
        .push_column(alias, right_key);
    out
}

fn table(ident: &Ident) -> Fragment {
    let mut out = Fragment::empty();
    out.push_ident(ident);
    out
}

/// Emit the JOIN clause(s) for `join`. Hierarchical joins register their CTE
/// in `with` and join against it instead of the raw table.
pub(crate) fn emit(join: &JoinDescriptor, with: &mut WithClause) -> Result<Fragment> {
    let id = join.id.as_str();
    let parent = join.parent.alias();

    let out = match &join.kind {
        JoinKind::Plain | JoinKind::Dimension { .. } | JoinKind::Olap(Olap::Star { .. }) => {
            left_join(table(&join.table), id, parent, &join.owner_key, &join.my_key)
        }

        JoinKind::Tagging(tagging) => {
            let through = Tagging::through_alias(id);
            let mut out = left_join(
                table(&tagging.through),
                &through,
                parent,
                &join.owner_key,
                &tagging.main_foreign_key,
            );
            out.push(" ").push_fragment(left_join(
                table(&join.table),
                id,
                &through,
                &tagging.tag_foreign_key,
                &join.my_key,
            ));
            out
        }

        JoinKind::Olap(Olap::Snowflake { steps }) => {
            let mut out = left_join(table(&join.table), id, parent, &join.owner_key, &join.my_key);
            let mut previous = id.to_string();
            for step in steps {
                let alias = step.sql_alias(id);
                out.push(" ").push_fragment(left_join(
                    table(&step.table),
                    &alias,
                    &previous,
                    &step.local_key,
                    &step.foreign_key,
                ));
                previous = alias;
            }
            out
        }

        JoinKind::Hierarchy(hierarchy) => {
            let cte = cte::hierarchy(join, hierarchy)?;
            let key = match hierarchy {
                Hierarchy::AdjacencyList { id_field, .. } => id_field.as_str(),
                _ => join.my_key.as_str(),
            };
            let relation = Fragment::new(cte.name());
            with.push(cte);
            left_join(
                relation,
                id,
                parent,
                &join.owner_key,
                key,
            )
        }
    };
    Ok(out)
}
