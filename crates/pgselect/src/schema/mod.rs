//! Schema descriptor.
//!
//! A [`Schema`] is built once from a [`DomainConfig`] and is immutable
//! afterwards; it can be shared between threads and compiled against
//! concurrently.
//!
//! Column naming:
//! - root columns use their configured name (`"title"`)
//! - join columns are `"<join>.<name>"` (`"language.name"`)
//! - snowflake step columns are `"<join>.<step>.<name>"`
//! - archetype-derived columns are `"<join>_<name>"` (`"tags_list"`, `"category_level"`)

pub mod config;
pub mod graph;
pub mod join;


use std::collections::{BTreeMap, HashSet};

use crate::error::{ConfigError, Error, Result};
use crate::ident::{Ident, guard, guard_alias, guard_path};
use crate::value::{SqlType, Value};

pub use config::{ColumnConfig, DomainConfig, JoinConfig, JoinKindConfig, NormalizationConfig};
pub use graph::JoinGraph;
pub use join::{
    Hierarchy, JoinDescriptor, JoinKind, JoinRef, NormalizationStep, Olap, ROOT_ALIAS, Tagging,
};

/// A column the compiler can reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Logical name used by selectors and predicates.
    pub name: String,
    /// Underlying field name.
    pub field: String,
    pub sql_type: SqlType,
    /// Join that must be in FROM/JOIN for this column to be referenceable.
    pub join: JoinRef,
    /// Relation alias the field is qualified with.
    pub alias: String,
    /// Literal SQL emitted instead of `alias."field"`.
    pub custom_sql: Option<String>,
}

/// Immutable schema descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    table: Ident,
    primary_key: String,
    columns: BTreeMap<String, Column>,
    graph: JoinGraph,
}

struct FlatJoin {
    id: String,
    parent: JoinRef,
    config: JoinConfig,
}

impl Schema {
    /// Build and validate a schema.
    pub fn from_config(config: DomainConfig) -> Result<Self> {
        let table = Ident::parse(&config.table)?;
        let primary_key = guard(&config.primary_key)?.to_string();

        let mut flat = Vec::new();
        flatten_joins(config.joins, &JoinRef::Root, &mut HashSet::new(), &mut flat)?;

        let mut descriptors = BTreeMap::new();
        let mut columns = BTreeMap::new();
        let mut pending_columns = Vec::new();

        for FlatJoin { id, parent, config: join_config } in flat {
            let descriptor = build_join(&id, parent, &join_config)?;
            pending_columns.push((descriptor.clone(), join_config));
            descriptors.insert(id, descriptor);
        }

        let graph = JoinGraph::new(descriptors)?;
        check_aliases(&table, &graph)?;

        for (name, column) in config.columns {
            let requirement = join_requirement(&graph, &name, column.join.as_deref(), JoinRef::Root)?;
            insert_column(&mut columns, name, column, requirement)?;
        }
        if !columns.contains_key(&primary_key) {
            columns.insert(
                primary_key.clone(),
                Column {
                    name: primary_key.clone(),
                    field: primary_key.clone(),
                    sql_type: SqlType::Integer,
                    join: JoinRef::Root,
                    alias: ROOT_ALIAS.to_string(),
                    custom_sql: None,
                },
            );
        }

        for (descriptor, config) in pending_columns {
            add_join_columns(&mut columns, &graph, &descriptor, config)?;
        }

        tracing::debug!(
            target: "pgselect.schema",
            table = %table,
            joins = graph.len(),
            columns = columns.len(),
            "schema built"
        );

        Ok(Self {
            table,
            primary_key,
            columns,
            graph,
        })
    }

    /// Build a schema from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: DomainConfig =
            toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_config(config)
    }

    /// Build a schema from a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: DomainConfig =
            serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_config(config)
    }

    /// The source table.
    pub fn table(&self) -> &Ident {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Look up a column by logical name.
    ///
    /// A name outside the identifier whitelist is [`Error::InvalidIdentifier`]
    /// rather than [`Error::UnknownField`].
    pub fn column(&self, name: &str) -> Result<&Column> {
        guard_path(name)?;
        self.columns
            .get(name)
            .ok_or_else(|| Error::unknown_field(name, self.columns.keys().cloned()))
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn joins(&self) -> &JoinGraph {
        &self.graph
    }

    pub fn join(&self, id: &str) -> Option<&JoinDescriptor> {
        self.graph.get(id)
    }
}

fn flatten_joins(
    joins: BTreeMap<String, JoinConfig>,
    implicit_parent: &JoinRef,
    seen: &mut HashSet<String>,
    out: &mut Vec<FlatJoin>,
) -> Result<()> {
    for (id, mut config) in joins {
        if id.eq_ignore_ascii_case(ROOT_ALIAS) {
            return Err(ConfigError::ReservedAlias(id).into());
        }
        guard_alias(&id)?;
        if !seen.insert(id.clone()) {
            return Err(ConfigError::DuplicateJoin(id).into());
        }

        let children = std::mem::take(&mut config.joins);
        let parent = match config.parent.as_deref() {
            Some(p) if p == ROOT_ALIAS => JoinRef::Root,
            Some(p) => JoinRef::Join(p.to_string()),
            None => implicit_parent.clone(),
        };
        out.push(FlatJoin {
            id: id.clone(),
            parent,
            config,
        });
        flatten_joins(children, &JoinRef::Join(id), seen, out)?;
    }
    Ok(())
}

fn guarded(name: &str) -> Result<String> {
    guard(name).map(str::to_string)
}

fn build_join(id: &str, parent: JoinRef, config: &JoinConfig) -> Result<JoinDescriptor> {
    let kind = match &config.kind {
        JoinKindConfig::Plain => JoinKind::Plain,
        JoinKindConfig::Dimension { display_field } => JoinKind::Dimension {
            display_field: display_field.as_deref().map(guarded).transpose()?,
        },
        JoinKindConfig::Tagging {
            through_table,
            main_foreign_key,
            tag_foreign_key,
            tag_field,
        } => JoinKind::Tagging(Tagging {
            through: Ident::parse(through_table)?,
            main_foreign_key: guarded(main_foreign_key)?,
            tag_foreign_key: guarded(tag_foreign_key)?,
            tag_field: guarded(tag_field)?,
        }),
        JoinKindConfig::AdjacencyList {
            depth_limit,
            id_field,
            name_field,
            parent_field,
        } => {
            let fixed = [id_field, name_field, parent_field];
            let mut extra_fields = Vec::new();
            for (name, column) in &config.columns {
                let field = column.field.as_deref().unwrap_or(name);
                if column.sql.is_none()
                    && !fixed.iter().any(|f| f.as_str() == field)
                    && !extra_fields.iter().any(|f: &String| f == field)
                {
                    extra_fields.push(guarded(field)?);
                }
            }
            JoinKind::Hierarchy(Hierarchy::AdjacencyList {
                depth_limit: *depth_limit,
                id_field: guarded(id_field)?,
                name_field: guarded(name_field)?,
                parent_field: guarded(parent_field)?,
                extra_fields,
            })
        }
        JoinKindConfig::MaterializedPath {
            path_field,
            separator,
            root_path,
        } => {
            if separator.is_empty() {
                return Err(Error::invalid_value(
                    format!("{id}.separator"),
                    "path separator must not be empty",
                ));
            }
            JoinKind::Hierarchy(Hierarchy::MaterializedPath {
                path_field: guarded(path_field)?,
                separator: separator.clone(),
                root_path: root_path.clone(),
            })
        }
        JoinKindConfig::ClosureTable {
            closure_table,
            ancestor_field,
            descendant_field,
            depth_field,
            root_id,
        } => JoinKind::Hierarchy(Hierarchy::ClosureTable {
            closure: Ident::parse(closure_table)?,
            ancestor_field: guarded(ancestor_field)?,
            descendant_field: guarded(descendant_field)?,
            depth_field: guarded(depth_field)?,
            root_id: root_id.clone().map(Value::from_json),
        }),
        JoinKindConfig::Star { display_field } => JoinKind::Olap(Olap::Star {
            display_field: display_field.as_deref().map(guarded).transpose()?,
        }),
        JoinKindConfig::Snowflake { normalization } => {
            let steps = normalization
                .iter()
                .map(|step| {
                    Ok(NormalizationStep {
                        alias: guard_alias(&step.alias)?.to_string(),
                        table: Ident::parse(&step.table)?,
                        local_key: guarded(&step.local_key)?,
                        foreign_key: guarded(&step.foreign_key)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            JoinKind::Olap(Olap::Snowflake { steps })
        }
    };

    Ok(JoinDescriptor {
        id: id.to_string(),
        parent,
        table: Ident::parse(&config.table)?,
        owner_key: guarded(&config.owner_key)?,
        my_key: guarded(&config.my_key)?,
        kind,
    })
}

/// Every alias a compiled query may introduce must be unique.
fn check_aliases(table: &Ident, graph: &JoinGraph) -> Result<()> {
    let mut aliases: HashSet<String> = graph.iter().map(|j| j.id.clone()).collect();
    aliases.insert(ROOT_ALIAS.to_string());

    for join in graph.iter() {
        let mut extra = Vec::new();
        match &join.kind {
            JoinKind::Tagging(_) => extra.push(Tagging::through_alias(&join.id)),
            JoinKind::Olap(Olap::Snowflake { steps }) => {
                extra.extend(steps.iter().map(|s| s.sql_alias(&join.id)));
            }
            _ => {}
        }
        for alias in extra {
            if !aliases.insert(alias.clone()) {
                return Err(ConfigError::DuplicateAlias(alias).into());
            }
        }
    }

    let mut tables: HashSet<&str> = HashSet::from([table.name()]);
    for join in graph.iter() {
        tables.insert(join.table.name());
        match &join.kind {
            JoinKind::Tagging(tagging) => {
                tables.insert(tagging.through.name());
            }
            JoinKind::Hierarchy(Hierarchy::ClosureTable { closure, .. }) => {
                tables.insert(closure.name());
            }
            JoinKind::Olap(Olap::Snowflake { steps }) => {
                tables.extend(steps.iter().map(|s| s.table.name()));
            }
            _ => {}
        }
    }
    for join in graph.iter() {
        if let Some(name) = join.cte_name() {
            if !aliases.insert(name.clone()) || tables.contains(name.as_str()) {
                return Err(ConfigError::DuplicateCte(name).into());
            }
        }
    }
    Ok(())
}

fn join_requirement(
    graph: &JoinGraph,
    column: &str,
    declared: Option<&str>,
    default: JoinRef,
) -> Result<JoinRef> {
    match declared {
        None => Ok(default),
        Some(j) if j == ROOT_ALIAS => Ok(JoinRef::Root),
        Some(j) if graph.contains(j) => Ok(JoinRef::Join(j.to_string())),
        Some(j) => Err(ConfigError::UnknownJoin {
            column: column.to_string(),
            join: j.to_string(),
        }
        .into()),
    }
}

fn insert_column(
    columns: &mut BTreeMap<String, Column>,
    name: String,
    config: ColumnConfig,
    join: JoinRef,
) -> Result<()> {
    guard_path(&name)?;
    let field = guarded(config.field.as_deref().unwrap_or(&name))?;
    let alias = join.alias().to_string();
    columns.insert(
        name.clone(),
        Column {
            name,
            field,
            sql_type: config.sql_type,
            join,
            alias,
            custom_sql: config.sql,
        },
    );
    Ok(())
}

fn add_join_columns(
    columns: &mut BTreeMap<String, Column>,
    graph: &JoinGraph,
    join: &JoinDescriptor,
    config: JoinConfig,
) -> Result<()> {
    let this = JoinRef::Join(join.id.clone());

    for (name, column) in config.columns {
        let logical = format!("{}.{name}", join.id);
        let requirement = join_requirement(graph, &logical, column.join.as_deref(), this.clone())?;
        insert_column(columns, logical, column, requirement)?;
    }

    let mut add = |name: String, field: &str, sql_type: SqlType, alias: &str, sql: Option<String>| {
        columns.entry(name.clone()).or_insert_with(|| Column {
            name,
            field: field.to_string(),
            sql_type,
            join: this.clone(),
            alias: alias.to_string(),
            custom_sql: sql,
        });
    };

    let id = join.id.as_str();
    match &join.kind {
        JoinKind::Plain => {}
        JoinKind::Dimension { display_field } | JoinKind::Olap(Olap::Star { display_field }) => {
            if let Some(f) = display_field {
                add(format!("{id}.{f}"), f, SqlType::Text, id, None);
            }
        }
        JoinKind::Tagging(tagging) => {
            add(
                format!("{id}_list"),
                &tagging.tag_field,
                SqlType::Text,
                id,
                Some(format!(
                    "string_agg(DISTINCT {id}.\"{}\", ', ')",
                    tagging.tag_field
                )),
            );
            add(
                format!("{id}_count"),
                &join.my_key,
                SqlType::Integer,
                id,
                Some(format!("count(DISTINCT {id}.\"{}\")", join.my_key)),
            );
        }
        JoinKind::Hierarchy(Hierarchy::AdjacencyList {
            id_field,
            name_field,
            parent_field,
            ..
        }) => {
            add(format!("{id}.{id_field}"), id_field, SqlType::Integer, id, None);
            add(format!("{id}.{name_field}"), name_field, SqlType::Text, id, None);
            add(format!("{id}.{parent_field}"), parent_field, SqlType::Integer, id, None);
            add(format!("{id}_level"), "level", SqlType::Integer, id, None);
            add(format!("{id}_path"), "path", SqlType::Text, id, None);
            add(
                format!("{id}_path_array"),
                "path_array",
                SqlType::Array(Box::new(SqlType::Integer)),
                id,
                None,
            );
        }
        JoinKind::Hierarchy(Hierarchy::MaterializedPath { path_field, .. }) => {
            add(format!("{id}.{path_field}"), path_field, SqlType::Text, id, None);
            add(format!("{id}_depth"), "depth", SqlType::Integer, id, None);
            add(
                format!("{id}_path_array"),
                "path_array",
                SqlType::Array(Box::new(SqlType::Text)),
                id,
                None,
            );
        }
        JoinKind::Hierarchy(Hierarchy::ClosureTable { .. }) => {
            add(format!("{id}_depth"), "depth", SqlType::Integer, id, None);
            add(
                format!("{id}_descendant_count"),
                "descendant_count",
                SqlType::Integer,
                id,
                None,
            );
        }
        JoinKind::Olap(Olap::Snowflake { steps }) => {
            let configs = match &config.kind {
                JoinKindConfig::Snowflake { normalization } => normalization.as_slice(),
                _ => &[],
            };
            for (step, step_config) in steps.iter().zip(configs) {
                let alias = step.sql_alias(id);
                for (name, column) in &step_config.columns {
                    guard(name)?;
                    let field = guarded(column.field.as_deref().unwrap_or(name))?;
                    add(
                        format!("{id}.{}.{name}", step.alias),
                        &field,
                        column.sql_type.clone(),
                        &alias,
                        column.sql.clone(),
                    );
                }
            }
        }
    }
    Ok(())
}
