//! Selector and predicate expressions.
//!
//! Both grammars evaluate against a [`Schema`] into a [`Fragment`] plus the
//! joins the fragment references. Evaluation threads a single [`Scope`]
//! through the recursion; joins are recorded in first-reference order, which
//! is the order the join resolver later honours.

pub mod predicate;
pub mod selector;

pub use predicate::{CompareOp, Predicate, Quantifier, Subquery};
pub use selector::Selector;

use crate::error::Result;
use crate::fragment::Fragment;
use crate::schema::{Column, JoinRef, Schema};

/// An evaluated expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub fragment: Fragment,
    /// Joins referenced by the fragment, in first-reference order. Never
    /// contains [`JoinRef::Root`].
    pub joins: Vec<JoinRef>,
}

/// Evaluation accumulator.
pub(crate) struct Scope<'s> {
    schema: &'s Schema,
    joins: Vec<JoinRef>,
}

impl<'s> Scope<'s> {
    pub(crate) fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            joins: Vec::new(),
        }
    }

    pub(crate) fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Look up `name` and record the join it needs.
    pub(crate) fn column(&mut self, name: &str) -> Result<&'s Column> {
        let column = self.schema.column(name)?;
        self.require(&column.join);
        Ok(column)
    }

    pub(crate) fn require(&mut self, join: &JoinRef) {
        if matches!(join, JoinRef::Join(_)) && !self.joins.contains(join) {
            self.joins.push(join.clone());
        }
    }

    pub(crate) fn joins(&self) -> &[JoinRef] {
        &self.joins
    }

    pub(crate) fn finish(self, fragment: Fragment) -> Evaluated {
        Evaluated {
            fragment,
            joins: self.joins,
        }
    }
}
