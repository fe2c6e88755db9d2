//! Query sets: the per-query, append-only description handed to the compiler.
//!
//! ```ignore
//! use pgselect::{Direction, OrderItem, Predicate, QuerySet, Selector};
//!
//! let q = QuerySet::new()
//!     .select(["title", "language.name"])
//!     .filter([Predicate::gte("rental_rate", 2.99)])
//!     .order_by([OrderItem::desc("rental_rate")])
//!     .limit(20);
//! let compiled = schema.compile(&q)?;
//! ```

use std::fmt;

use crate::error::Result;
use crate::expr::{Predicate, Selector};
use crate::schema::Schema;

/// ORDER BY direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    Asc,
    Desc,
    #[default]
    AscNullsFirst,
    AscNullsLast,
    DescNullsFirst,
    DescNullsLast,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
            Direction::AscNullsFirst => "asc nulls first",
            Direction::AscNullsLast => "asc nulls last",
            Direction::DescNullsFirst => "desc nulls first",
            Direction::DescNullsLast => "desc nulls last",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub selector: Selector,
    pub direction: Direction,
}

impl OrderItem {
    pub fn new(selector: impl Into<Selector>, direction: Direction) -> Self {
        Self {
            selector: selector.into(),
            direction,
        }
    }

    pub fn asc(selector: impl Into<Selector>) -> Self {
        Self::new(selector, Direction::Asc)
    }

    pub fn desc(selector: impl Into<Selector>) -> Self {
        Self::new(selector, Direction::Desc)
    }
}

impl From<&str> for OrderItem {
    fn from(name: &str) -> Self {
        Self::new(name, Direction::default())
    }
}

impl From<Selector> for OrderItem {
    fn from(selector: Selector) -> Self {
        Self::new(selector, Direction::default())
    }
}

impl<S: Into<Selector>> From<(S, Direction)> for OrderItem {
    fn from((selector, direction): (S, Direction)) -> Self {
        Self::new(selector, direction)
    }
}

/// Selected items, predicates, grouping and ordering for one query.
///
/// Every mutator appends; nothing already added is ever rewritten.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySet {
    select: Vec<Selector>,
    filters: Vec<Predicate>,
    group_by: Vec<Selector>,
    rollup: bool,
    order_by: Vec<OrderItem>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl QuerySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append select-list items. An empty select list compiles to `*`.
    pub fn select<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        self.select.extend(items.into_iter().map(Into::into));
        self
    }

    /// Append predicates; top-level predicates are AND-ed.
    pub fn filter<I, P>(mut self, predicates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Predicate>,
    {
        self.filters.extend(predicates.into_iter().map(Into::into));
        self
    }

    /// Append a predicate only if present.
    pub fn filter_opt(self, predicate: Option<Predicate>) -> Self {
        match predicate {
            Some(p) => self.filter([p]),
            None => self,
        }
    }

    pub fn group_by<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        self.group_by.extend(items.into_iter().map(Into::into));
        self
    }

    /// Append group-by items and wrap the whole GROUP BY list in `ROLLUP(...)`.
    pub fn group_by_rollup<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        self.rollup = true;
        self.group_by(items)
    }

    pub fn order_by<I, O>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<OrderItem>,
    {
        self.order_by.extend(items.into_iter().map(Into::into));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Compile against `schema`. Same as [`Schema::compile`].
    pub fn compile(&self, schema: &Schema) -> Result<crate::Compiled> {
        schema.compile(self)
    }

    pub fn selected(&self) -> &[Selector] {
        &self.select
    }

    pub fn filters(&self) -> &[Predicate] {
        &self.filters
    }

    pub fn grouping(&self) -> &[Selector] {
        &self.group_by
    }

    pub fn is_rollup(&self) -> bool {
        self.rollup
    }

    pub fn ordering(&self) -> &[OrderItem] {
        &self.order_by
    }

    pub fn limit_value(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<i64> {
        self.offset
    }
}
