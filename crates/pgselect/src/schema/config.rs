//! Schema configuration input.
//!
//! This is the document a domain loader hands to [`Schema::from_config`]. It
//! can be written by hand in TOML or JSON, or built in code.
//!
//! ```toml
//! table = "film"
//! primary_key = "film_id"
//!
//! [columns.title]
//! type = "text"
//!
//! [joins.language]
//! kind = "dimension"
//! table = "language"
//! owner_key = "language_id"
//! my_key = "language_id"
//! display_field = "name"
//! ```
//!
//! [`Schema::from_config`]: crate::Schema::from_config

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value::SqlType;

fn default_id() -> String {
    "id".to_string()
}

fn default_name() -> String {
    "name".to_string()
}

fn default_parent_field() -> String {
    "parent_id".to_string()
}

fn default_depth_limit() -> u32 {
    10
}

fn default_path_field() -> String {
    "path".to_string()
}

fn default_separator() -> String {
    "/".to_string()
}

fn default_ancestor_field() -> String {
    "ancestor_id".to_string()
}

fn default_descendant_field() -> String {
    "descendant_id".to_string()
}

fn default_depth_field() -> String {
    "depth".to_string()
}

/// Top-level domain description: the source table, its columns and its joins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub table: String,
    #[serde(default = "default_id")]
    pub primary_key: String,
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnConfig>,
    #[serde(default)]
    pub joins: BTreeMap<String, JoinConfig>,
}

impl DomainConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: default_id(),
            columns: BTreeMap::new(),
            joins: BTreeMap::new(),
        }
    }

    pub fn primary_key(mut self, pk: impl Into<String>) -> Self {
        self.primary_key = pk.into();
        self
    }

    pub fn column(mut self, name: impl Into<String>, sql_type: SqlType) -> Self {
        self.columns.insert(name.into(), ColumnConfig::new(sql_type));
        self
    }

    pub fn column_with(mut self, name: impl Into<String>, column: ColumnConfig) -> Self {
        self.columns.insert(name.into(), column);
        self
    }

    pub fn join(mut self, id: impl Into<String>, join: JoinConfig) -> Self {
        self.joins.insert(id.into(), join);
        self
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(rename = "type")]
    pub sql_type: SqlType,
    /// Underlying field name; defaults to the column's key.
    #[serde(default)]
    pub field: Option<String>,
    /// Literal SQL emitted verbatim instead of `alias."field"`.
    #[serde(default)]
    pub sql: Option<String>,
    /// Join that must be present for this column (root-level computed columns).
    #[serde(default)]
    pub join: Option<String>,
}

impl ColumnConfig {
    pub fn new(sql_type: SqlType) -> Self {
        Self {
            sql_type,
            field: None,
            sql: None,
            join: None,
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn requires_join(mut self, join: impl Into<String>) -> Self {
        self.join = Some(join.into());
        self
    }
}

/// A join definition. Child joins nest under `joins`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinConfig {
    pub table: String,
    /// Explicit parent join id; defaults to the enclosing join (or the root).
    #[serde(default)]
    pub parent: Option<String>,
    /// Key on the parent side of the join condition.
    #[serde(default = "default_id")]
    pub owner_key: String,
    /// Key on this join's side of the join condition.
    #[serde(default = "default_id")]
    pub my_key: String,
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnConfig>,
    #[serde(default)]
    pub joins: BTreeMap<String, JoinConfig>,
    #[serde(flatten)]
    pub kind: JoinKindConfig,
}

impl JoinConfig {
    pub fn new(kind: JoinKindConfig, table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            parent: None,
            owner_key: default_id(),
            my_key: default_id(),
            columns: BTreeMap::new(),
            joins: BTreeMap::new(),
            kind,
        }
    }

    /// A plain one-to-one / one-to-many join.
    pub fn plain(table: impl Into<String>) -> Self {
        Self::new(JoinKindConfig::Plain, table)
    }

    pub fn keys(mut self, owner_key: impl Into<String>, my_key: impl Into<String>) -> Self {
        self.owner_key = owner_key.into();
        self.my_key = my_key.into();
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn column(mut self, name: impl Into<String>, sql_type: SqlType) -> Self {
        self.columns.insert(name.into(), ColumnConfig::new(sql_type));
        self
    }

    pub fn column_with(mut self, name: impl Into<String>, column: ColumnConfig) -> Self {
        self.columns.insert(name.into(), column);
        self
    }

    pub fn join(mut self, id: impl Into<String>, join: JoinConfig) -> Self {
        self.joins.insert(id.into(), join);
        self
    }
}

/// Join archetype and its archetype-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JoinKindConfig {
    Plain,
    Dimension {
        #[serde(default)]
        display_field: Option<String>,
    },
    Tagging {
        through_table: String,
        main_foreign_key: String,
        tag_foreign_key: String,
        #[serde(default = "default_name")]
        tag_field: String,
    },
    AdjacencyList {
        #[serde(default = "default_depth_limit")]
        depth_limit: u32,
        #[serde(default = "default_id")]
        id_field: String,
        #[serde(default = "default_name")]
        name_field: String,
        #[serde(default = "default_parent_field")]
        parent_field: String,
    },
    MaterializedPath {
        #[serde(default = "default_path_field")]
        path_field: String,
        #[serde(default = "default_separator")]
        separator: String,
        #[serde(default)]
        root_path: Option<String>,
    },
    ClosureTable {
        closure_table: String,
        #[serde(default = "default_ancestor_field")]
        ancestor_field: String,
        #[serde(default = "default_descendant_field")]
        descendant_field: String,
        #[serde(default = "default_depth_field")]
        depth_field: String,
        #[serde(default)]
        root_id: Option<serde_json::Value>,
    },
    Star {
        #[serde(default)]
        display_field: Option<String>,
    },
    Snowflake {
        #[serde(default)]
        normalization: Vec<NormalizationConfig>,
    },
}

impl JoinKindConfig {
    pub fn adjacency_list(depth_limit: u32) -> Self {
        JoinKindConfig::AdjacencyList {
            depth_limit,
            id_field: default_id(),
            name_field: default_name(),
            parent_field: default_parent_field(),
        }
    }

    pub fn materialized_path(root_path: Option<String>) -> Self {
        JoinKindConfig::MaterializedPath {
            path_field: default_path_field(),
            separator: default_separator(),
            root_path,
        }
    }

    pub fn closure_table(closure_table: impl Into<String>) -> Self {
        JoinKindConfig::ClosureTable {
            closure_table: closure_table.into(),
            ancestor_field: default_ancestor_field(),
            descendant_field: default_descendant_field(),
            depth_field: default_depth_field(),
            root_id: None,
        }
    }
}

/// One step of a snowflake dimension's normalization chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationConfig {
    /// Short alias; the step's table is aliased `<join>_<alias>`.
    pub alias: String,
    pub table: String,
    /// Key on the previous table in the chain.
    pub local_key: String,
    /// Key on this step's table.
    #[serde(default = "default_id")]
    pub foreign_key: String,
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnConfig>,
}
