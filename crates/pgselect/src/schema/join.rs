//! Validated join descriptors.

use std::fmt;

use crate::ident::Ident;
use crate::value::Value;

/// Alias of the source table in every compiled query.
pub const ROOT_ALIAS: &str = "root";

/// A node of the join-dependency graph: the root (source table) or a join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JoinRef {
    Root,
    Join(String),
}

impl JoinRef {
    /// The SQL alias of this node.
    pub fn alias(&self) -> &str {
        match self {
            JoinRef::Root => ROOT_ALIAS,
            JoinRef::Join(id) => id,
        }
    }

    pub fn join_id(&self) -> Option<&str> {
        match self {
            JoinRef::Root => None,
            JoinRef::Join(id) => Some(id),
        }
    }
}

impl fmt::Display for JoinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

/// A join in the schema's join graph.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinDescriptor {
    /// Unique join id; also the join's SQL alias.
    pub id: String,
    pub parent: JoinRef,
    pub table: Ident,
    /// Key on the parent side.
    pub owner_key: String,
    /// Key on this join's side.
    pub my_key: String,
    pub kind: JoinKind,
}

impl JoinDescriptor {
    /// Name of the CTE generated for this join, if it is hierarchical.
    pub fn cte_name(&self) -> Option<String> {
        match &self.kind {
            JoinKind::Hierarchy(h) => Some(format!("{}_{}", self.id, h.cte_suffix())),
            _ => None,
        }
    }
}

/// Join archetype.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinKind {
    /// One-to-one / one-to-many.
    Plain,
    /// Lookup table.
    Dimension { display_field: Option<String> },
    /// Many-to-many through an intermediate table.
    Tagging(Tagging),
    Hierarchy(Hierarchy),
    Olap(Olap),
}

/// Many-to-many tagging parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagging {
    pub through: Ident,
    /// Column of the intermediate table pointing at the parent.
    pub main_foreign_key: String,
    /// Column of the intermediate table pointing at the tag table.
    pub tag_foreign_key: String,
    /// Tag column aggregated into the `<join>_list` column.
    pub tag_field: String,
}

impl Tagging {
    /// Alias of the intermediate table.
    pub fn through_alias(join_id: &str) -> String {
        format!("{join_id}_join")
    }
}

/// Hierarchy representations.
#[derive(Debug, Clone, PartialEq)]
pub enum Hierarchy {
    AdjacencyList {
        /// Hard cap on recursion; the only termination guarantee for cyclic data.
        depth_limit: u32,
        id_field: String,
        name_field: String,
        parent_field: String,
        /// Additional configured fields projected through the CTE.
        extra_fields: Vec<String>,
    },
    MaterializedPath {
        path_field: String,
        separator: String,
        root_path: Option<String>,
    },
    ClosureTable {
        closure: Ident,
        ancestor_field: String,
        descendant_field: String,
        depth_field: String,
        root_id: Option<Value>,
    },
}

impl Hierarchy {
    pub fn cte_suffix(&self) -> &'static str {
        match self {
            Hierarchy::AdjacencyList { .. } => "hierarchy",
            Hierarchy::MaterializedPath { .. } => "mpath",
            Hierarchy::ClosureTable { .. } => "closure",
        }
    }

    pub fn is_recursive(&self) -> bool {
        matches!(self, Hierarchy::AdjacencyList { .. })
    }
}

/// OLAP dimensions.
#[derive(Debug, Clone, PartialEq)]
pub enum Olap {
    Star { display_field: Option<String> },
    Snowflake { steps: Vec<NormalizationStep> },
}

/// One normalization join of a snowflake dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationStep {
    pub alias: String,
    pub table: Ident,
    pub local_key: String,
    pub foreign_key: String,
}

impl NormalizationStep {
    pub fn sql_alias(&self, join_id: &str) -> String {
        format!("{join_id}_{}", self.alias)
    }
}
