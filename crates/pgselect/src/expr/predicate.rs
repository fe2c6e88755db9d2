//! Predicate expressions for WHERE and FILTER positions.
//!
//! Values compared against a schema column are coerced to that column's
//! type before they are bound. Composite predicates parenthesize every child,
//! and an empty `And`/`Or` evaluates to an empty fragment so the enclosing
//! clause can be dropped.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::expr::{Evaluated, Scope, Selector};
use crate::fragment::Fragment;
use crate::query::QuerySet;
use crate::schema::{Column, Schema};
use crate::value::{Value, coerce, coerce_list};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompareOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
        }
    }
}

/// `ANY` / `ALL` quantifier for subquery comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    Any,
    All,
}

impl Quantifier {
    pub fn as_sql(self) -> &'static str {
        match self {
            Quantifier::Any => "ANY",
            Quantifier::All => "ALL",
        }
    }
}

/// The body of a subquery predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Subquery {
    /// A pre-built fragment tree.
    Fragment(Fragment),
    /// SQL with `?` markers bound to `values` in order.
    Template { sql: String, values: Vec<Value> },
    /// A query set compiled against the enclosing schema.
    Query(Box<QuerySet>),
    /// A query set compiled against another schema.
    QueryOn(Arc<Schema>, Box<QuerySet>),
}

impl Subquery {
    pub fn template(sql: impl Into<String>, values: Vec<Value>) -> Self {
        Subquery::Template {
            sql: sql.into(),
            values,
        }
    }

    pub fn query(query: QuerySet) -> Self {
        Subquery::Query(Box::new(query))
    }

    pub fn query_on(schema: Arc<Schema>, query: QuerySet) -> Self {
        Subquery::QueryOn(schema, Box::new(query))
    }

    fn build(&self, schema: &Schema) -> Result<Fragment> {
        let body = match self {
            Subquery::Fragment(f) => f.clone(),
            Subquery::Template { sql, values } => Fragment::template(sql, values.clone())?,
            Subquery::Query(query) => crate::compile::build(schema, query)?,
            Subquery::QueryOn(other, query) => crate::compile::build(other, query)?,
        };
        if body.is_empty() {
            return Err(Error::UnsupportedPredicate("subquery body is empty".into()));
        }
        let mut out = Fragment::new("(");
        out.push_nested(body).push(")");
        Ok(out)
    }
}

impl From<Fragment> for Subquery {
    fn from(f: Fragment) -> Self {
        Subquery::Fragment(f)
    }
}

impl From<QuerySet> for Subquery {
    fn from(q: QuerySet) -> Self {
        Subquery::query(q)
    }
}

/// A declarative boolean condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `lhs <op> $n`
    Compare {
        lhs: Selector,
        op: CompareOp,
        value: Value,
    },
    /// `lhs <op> rhs`, both sides selectors.
    CompareExpr {
        lhs: Selector,
        op: CompareOp,
        rhs: Selector,
    },
    /// `lhs [NOT] LIKE|ILIKE $n`
    Like {
        lhs: Selector,
        pattern: Value,
        case_insensitive: bool,
        negated: bool,
    },
    /// `lhs [NOT] between $n and $m`
    Between {
        lhs: Selector,
        low: Value,
        high: Value,
        negated: bool,
    },
    /// `lhs = ANY($n)` or `lhs != ALL($n)`, the list bound as one array.
    InList {
        lhs: Selector,
        values: Vec<Value>,
        negated: bool,
    },
    /// `lhs IS [NOT] NULL`
    IsNull { lhs: Selector, negated: bool },
    /// `lhs @@ websearch_to_tsquery($n)`
    TextSearch { lhs: Selector, query: Value },
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    /// `lhs [NOT] IN (subquery)`
    InSubquery {
        lhs: Selector,
        subquery: Subquery,
        negated: bool,
    },
    /// `lhs <op> ANY|ALL (subquery)`
    CompareSubquery {
        lhs: Selector,
        op: CompareOp,
        quantifier: Quantifier,
        subquery: Subquery,
    },
    /// `[NOT] EXISTS (subquery)`
    Exists { subquery: Subquery, negated: bool },
}

macro_rules! compare_ctor {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            pub fn $name(lhs: impl Into<Selector>, value: impl Into<Value>) -> Self {
                Predicate::Compare {
                    lhs: lhs.into(),
                    op: CompareOp::$op,
                    value: value.into(),
                }
            }
        )*
    };
}

impl Predicate {
    compare_ctor! {
        eq => Eq,
        ne => Ne,
        lt => Lt,
        gt => Gt,
        lte => Le,
        gte => Ge,
    }

    /// Shorthand for `(field, value)` filters: a list becomes membership, a
    /// null becomes `IS NULL`, anything else is equality.
    pub fn matches(lhs: impl Into<Selector>, value: impl Into<Value>) -> Self {
        let lhs = lhs.into();
        match value.into() {
            Value::Null => Predicate::IsNull {
                lhs,
                negated: false,
            },
            Value::Array(values) => Predicate::InList {
                lhs,
                values,
                negated: false,
            },
            value => Predicate::Compare {
                lhs,
                op: CompareOp::Eq,
                value,
            },
        }
    }

    pub fn compare(lhs: impl Into<Selector>, op: CompareOp, rhs: impl Into<Selector>) -> Self {
        Predicate::CompareExpr {
            lhs: lhs.into(),
            op,
            rhs: rhs.into(),
        }
    }

    pub fn like(lhs: impl Into<Selector>, pattern: impl Into<String>) -> Self {
        Self::like_impl(lhs, pattern, false, false)
    }

    pub fn ilike(lhs: impl Into<Selector>, pattern: impl Into<String>) -> Self {
        Self::like_impl(lhs, pattern, true, false)
    }

    pub fn not_like(lhs: impl Into<Selector>, pattern: impl Into<String>) -> Self {
        Self::like_impl(lhs, pattern, false, true)
    }

    pub fn not_ilike(lhs: impl Into<Selector>, pattern: impl Into<String>) -> Self {
        Self::like_impl(lhs, pattern, true, true)
    }

    fn like_impl(
        lhs: impl Into<Selector>,
        pattern: impl Into<String>,
        case_insensitive: bool,
        negated: bool,
    ) -> Self {
        Predicate::Like {
            lhs: lhs.into(),
            pattern: Value::Text(pattern.into()),
            case_insensitive,
            negated,
        }
    }

    pub fn between(
        lhs: impl Into<Selector>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Predicate::Between {
            lhs: lhs.into(),
            low: low.into(),
            high: high.into(),
            negated: false,
        }
    }

    pub fn not_between(
        lhs: impl Into<Selector>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Predicate::Between {
            lhs: lhs.into(),
            low: low.into(),
            high: high.into(),
            negated: true,
        }
    }

    pub fn in_list<I, V>(lhs: impl Into<Selector>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::InList {
            lhs: lhs.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn not_in_list<I, V>(lhs: impl Into<Selector>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::InList {
            lhs: lhs.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    pub fn is_null(lhs: impl Into<Selector>) -> Self {
        Predicate::IsNull {
            lhs: lhs.into(),
            negated: false,
        }
    }

    pub fn is_not_null(lhs: impl Into<Selector>) -> Self {
        Predicate::IsNull {
            lhs: lhs.into(),
            negated: true,
        }
    }

    /// Full-text search with `websearch_to_tsquery`.
    pub fn search(lhs: impl Into<Selector>, query: impl Into<String>) -> Self {
        Predicate::TextSearch {
            lhs: lhs.into(),
            query: Value::Text(query.into()),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Predicate) -> Self {
        Predicate::Not(Box::new(inner))
    }

    pub fn and<I: IntoIterator<Item = Predicate>>(items: I) -> Self {
        Predicate::And(items.into_iter().collect())
    }

    pub fn or<I: IntoIterator<Item = Predicate>>(items: I) -> Self {
        Predicate::Or(items.into_iter().collect())
    }

    pub fn in_subquery(lhs: impl Into<Selector>, subquery: impl Into<Subquery>) -> Self {
        Predicate::InSubquery {
            lhs: lhs.into(),
            subquery: subquery.into(),
            negated: false,
        }
    }

    pub fn not_in_subquery(lhs: impl Into<Selector>, subquery: impl Into<Subquery>) -> Self {
        Predicate::InSubquery {
            lhs: lhs.into(),
            subquery: subquery.into(),
            negated: true,
        }
    }

    pub fn compare_subquery(
        lhs: impl Into<Selector>,
        op: CompareOp,
        quantifier: Quantifier,
        subquery: impl Into<Subquery>,
    ) -> Self {
        Predicate::CompareSubquery {
            lhs: lhs.into(),
            op,
            quantifier,
            subquery: subquery.into(),
        }
    }

    pub fn exists(subquery: impl Into<Subquery>) -> Self {
        Predicate::Exists {
            subquery: subquery.into(),
            negated: false,
        }
    }

    pub fn not_exists(subquery: impl Into<Subquery>) -> Self {
        Predicate::Exists {
            subquery: subquery.into(),
            negated: true,
        }
    }

    /// Evaluate this predicate against `schema`.
    pub fn build(&self, schema: &Schema) -> Result<Evaluated> {
        let mut scope = Scope::new(schema);
        let fragment = scope.predicate(self)?;
        Ok(scope.finish(fragment))
    }
}

impl<S: Into<Selector>, V: Into<Value>> From<(S, V)> for Predicate {
    fn from((lhs, value): (S, V)) -> Self {
        Predicate::matches(lhs, value)
    }
}

/// Bind `value`, coerced to the column type when the left side is a column.
fn bind(column: Option<&Column>, value: &Value) -> Result<Value> {
    match column {
        Some(c) => coerce(&c.name, value.clone(), &c.sql_type),
        None => Ok(value.clone()),
    }
}

fn require_text(what: &str, value: &Value) -> Result<()> {
    match value {
        Value::Text(_) => Ok(()),
        other => Err(Error::UnsupportedPredicate(format!(
            "{what} must be text, got {}",
            other.kind_name()
        ))),
    }
}

impl<'s> Scope<'s> {
    /// Evaluate the left side of a comparison, returning its column if it is one.
    fn operand(&mut self, lhs: &Selector) -> Result<(Fragment, Option<&'s Column>)> {
        let column = match lhs {
            Selector::Field(name) => Some(self.schema().column(name)?),
            _ => None,
        };
        Ok((self.selector(lhs)?, column))
    }

    pub(crate) fn predicate(&mut self, predicate: &Predicate) -> Result<Fragment> {
        match predicate {
            Predicate::Compare { lhs, op, value } => {
                let (mut out, column) = self.operand(lhs)?;
                if value.is_null() {
                    return match op {
                        CompareOp::Eq => Ok(out.wrap("", " IS NULL")),
                        CompareOp::Ne => Ok(out.wrap("", " IS NOT NULL")),
                        _ => Err(Error::UnsupportedPredicate(format!(
                            "cannot compare with NULL using '{}'",
                            op.as_sql()
                        ))),
                    };
                }
                out.push(" ").push(op.as_sql()).push(" ");
                out.push_bind(bind(column, value)?);
                Ok(out)
            }

            Predicate::CompareExpr { lhs, op, rhs } => {
                let mut out = self.selector(lhs)?;
                out.push(" ").push(op.as_sql()).push(" ");
                out.push_fragment(self.selector(rhs)?);
                Ok(out)
            }

            Predicate::Like {
                lhs,
                pattern,
                case_insensitive,
                negated,
            } => {
                require_text("LIKE pattern", pattern)?;
                let mut out = self.selector(lhs)?;
                out.push(match (*negated, *case_insensitive) {
                    (false, false) => " LIKE ",
                    (false, true) => " ILIKE ",
                    (true, false) => " NOT LIKE ",
                    (true, true) => " NOT ILIKE ",
                });
                out.push_bind(pattern.clone());
                Ok(out)
            }

            Predicate::Between {
                lhs,
                low,
                high,
                negated,
            } => {
                if low.is_null() || high.is_null() {
                    return Err(Error::UnsupportedPredicate(
                        "between bounds must not be NULL".into(),
                    ));
                }
                let (mut out, column) = self.operand(lhs)?;
                let low = bind(column, low)?;
                let high = bind(column, high)?;
                out.push(if *negated { " NOT between " } else { " between " });
                out.push_bind(low).push(" and ").push_bind(high);
                Ok(out)
            }

            Predicate::InList {
                lhs,
                values,
                negated,
            } => {
                let (mut out, column) = self.operand(lhs)?;
                let list = match column {
                    Some(c) => coerce_list(&c.name, values.clone(), &c.sql_type)?,
                    None => Value::Array(values.clone()),
                };
                out.push(if *negated { " != ALL(" } else { " = ANY(" });
                out.push_bind(list).push(")");
                Ok(out)
            }

            Predicate::IsNull { lhs, negated } => {
                let out = self.selector(lhs)?;
                Ok(out.wrap("", if *negated { " IS NOT NULL" } else { " IS NULL" }))
            }

            Predicate::TextSearch { lhs, query } => {
                require_text("search query", query)?;
                let mut out = self.selector(lhs)?;
                out.push(" @@ websearch_to_tsquery(")
                    .push_bind(query.clone())
                    .push(")");
                Ok(out)
            }

            Predicate::Not(inner) => {
                let inner = self.predicate(inner)?;
                if inner.is_empty() {
                    return Ok(inner);
                }
                Ok(inner.wrap("NOT (", ")"))
            }

            Predicate::And(items) => self.compose(items, " AND "),
            Predicate::Or(items) => self.compose(items, " OR "),

            Predicate::InSubquery {
                lhs,
                subquery,
                negated,
            } => {
                let mut out = self.selector(lhs)?;
                out.push(if *negated { " NOT IN " } else { " IN " });
                out.push_fragment(subquery.build(self.schema())?);
                Ok(out)
            }

            Predicate::CompareSubquery {
                lhs,
                op,
                quantifier,
                subquery,
            } => {
                let mut out = self.selector(lhs)?;
                out.push(" ")
                    .push(op.as_sql())
                    .push(" ")
                    .push(quantifier.as_sql())
                    .push(" ");
                out.push_fragment(subquery.build(self.schema())?);
                Ok(out)
            }

            Predicate::Exists { subquery, negated } => {
                let mut out = Fragment::new(if *negated { "NOT EXISTS " } else { "EXISTS " });
                out.push_fragment(subquery.build(self.schema())?);
                Ok(out)
            }
        }
    }

    fn compose(&mut self, items: &[Predicate], sep: &str) -> Result<Fragment> {
        let children = items
            .iter()
            .map(|p| self.predicate(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Fragment::join(
            children
                .into_iter()
                .filter(|f| !f.is_empty())
                .map(|f| f.wrap("(", ")")),
            sep,
        ))
    }
}
