//! Join-dependency graph.
//!
//! Every join points at its parent (another join or [`JoinRef::Root`]). The
//! graph is validated once when the schema is built; resolving a requested set
//! of joins at query time then only walks known, acyclic parent chains.

use std::collections::{BTreeMap, HashSet};

use crate::error::{ConfigError, Error, Result};
use crate::schema::join::{JoinDescriptor, JoinRef};

/// The flattened join map of a schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinGraph {
    joins: BTreeMap<String, JoinDescriptor>,
}

impl JoinGraph {
    /// Validate parents and reject cycles.
    pub(crate) fn new(joins: BTreeMap<String, JoinDescriptor>) -> std::result::Result<Self, ConfigError> {
        for (id, join) in &joins {
            let mut visited = HashSet::from([id.as_str()]);
            let mut path = vec![id.clone()];
            let mut parent = &join.parent;

            while let JoinRef::Join(p) = parent {
                let Some(next) = joins.get(p) else {
                    return Err(ConfigError::UnknownParent {
                        join: path.last().cloned().unwrap_or_default(),
                        parent: p.clone(),
                    });
                };
                path.push(p.clone());
                if !visited.insert(p.as_str()) {
                    return Err(ConfigError::CyclicJoinDependency {
                        join: id.clone(),
                        path,
                    });
                }
                parent = &next.parent;
            }
        }
        Ok(Self { joins })
    }

    pub fn get(&self, id: &str) -> Option<&JoinDescriptor> {
        self.joins.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.joins.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &JoinDescriptor> {
        self.joins.values()
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Order the requested joins so every join follows its dependencies.
    ///
    /// Requested ids are processed in request order. Each one contributes its
    /// not-yet-emitted ancestors (outermost first) and then itself. Joins that
    /// are not transitively requested are omitted, and the root is never
    /// emitted.
    pub fn resolve<'a, I>(&self, requested: I) -> Result<Vec<&JoinDescriptor>>
    where
        I: IntoIterator<Item = &'a JoinRef>,
    {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut ordered = Vec::new();

        for join_ref in requested {
            let JoinRef::Join(id) = join_ref else {
                continue;
            };
            if seen.contains(id.as_str()) {
                continue;
            }

            let mut chain = Vec::new();
            let mut cursor = Some(id.as_str());
            while let Some(current) = cursor {
                if seen.contains(current) {
                    break;
                }
                let join = self
                    .joins
                    .get(current)
                    .ok_or_else(|| Error::UnknownJoin(current.to_string()))?;
                chain.push(join);
                cursor = join.parent.join_id();
            }

            for join in chain.into_iter().rev() {
                if seen.insert(join.id.as_str()) {
                    ordered.push(join);
                }
            }
        }

        tracing::trace!(
            target: "pgselect.joins",
            joins = ?ordered.iter().map(|j| j.id.as_str()).collect::<Vec<_>>(),
            "resolved join order"
        );
        Ok(ordered)
    }
}
