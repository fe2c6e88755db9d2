//! Selector expressions: values computed in SELECT, GROUP BY and ORDER BY
//! positions.

use crate::error::{Error, Result};
use crate::expr::{Evaluated, Predicate, Scope};
use crate::fragment::Fragment;
use crate::ident::{guard, guard_label, quote_literal};
use crate::schema::Schema;
use crate::value::Value;

/// A declarative value expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// A schema column by logical name.
    Field(String),
    /// A bound value.
    Literal(Value),
    /// `name(arg, ...)`.
    Func { name: String, args: Vec<Selector> },
    /// `extract(unit from expr)`.
    Extract { unit: String, expr: Box<Selector> },
    /// `func(expr) FILTER (WHERE filter)`; `expr: None` renders `func(*)`.
    FilteredAggregate {
        func: String,
        expr: Option<Box<Selector>>,
        filter: Box<Predicate>,
    },
    /// `CASE WHEN p THEN s ... [ELSE e] END`.
    Case {
        branches: Vec<(Predicate, Selector)>,
        otherwise: Option<Box<Selector>>,
    },
    /// `to_char(expr, 'format')`.
    ToChar { expr: Box<Selector>, format: String },
    /// `expr AS "alias"`; only valid at the top level of a select list.
    Aliased { expr: Box<Selector>, alias: String },
    /// `count(*)`.
    CountAll,
}

impl Selector {
    pub fn field(name: impl Into<String>) -> Self {
        Selector::Field(name.into())
    }

    pub fn lit(value: impl Into<Value>) -> Self {
        Selector::Literal(value.into())
    }

    pub fn func<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        Selector::Func {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn count(expr: impl Into<Selector>) -> Self {
        Self::func("count", [expr])
    }

    pub fn sum(expr: impl Into<Selector>) -> Self {
        Self::func("sum", [expr])
    }

    pub fn avg(expr: impl Into<Selector>) -> Self {
        Self::func("avg", [expr])
    }

    pub fn min(expr: impl Into<Selector>) -> Self {
        Self::func("min", [expr])
    }

    pub fn max(expr: impl Into<Selector>) -> Self {
        Self::func("max", [expr])
    }

    pub fn concat<I: IntoIterator<Item = Selector>>(args: I) -> Self {
        Self::func("concat", args)
    }

    pub fn coalesce<I: IntoIterator<Item = Selector>>(args: I) -> Self {
        Self::func("coalesce", args)
    }

    pub fn greatest<I: IntoIterator<Item = Selector>>(args: I) -> Self {
        Self::func("greatest", args)
    }

    pub fn least<I: IntoIterator<Item = Selector>>(args: I) -> Self {
        Self::func("least", args)
    }

    pub fn nullif(a: impl Into<Selector>, b: impl Into<Selector>) -> Self {
        Self::func("nullif", [a.into(), b.into()])
    }

    pub fn extract(unit: impl Into<String>, expr: impl Into<Selector>) -> Self {
        Selector::Extract {
            unit: unit.into(),
            expr: Box::new(expr.into()),
        }
    }

    /// `func(expr) FILTER (WHERE filter)`.
    pub fn filtered(func: impl Into<String>, expr: impl Into<Selector>, filter: Predicate) -> Self {
        Selector::FilteredAggregate {
            func: func.into(),
            expr: Some(Box::new(expr.into())),
            filter: Box::new(filter),
        }
    }

    /// `count(*) FILTER (WHERE filter)`.
    pub fn count_where(filter: Predicate) -> Self {
        Selector::FilteredAggregate {
            func: "count".into(),
            expr: None,
            filter: Box::new(filter),
        }
    }

    pub fn case<I>(branches: I, otherwise: Option<Selector>) -> Self
    where
        I: IntoIterator<Item = (Predicate, Selector)>,
    {
        Selector::Case {
            branches: branches.into_iter().collect(),
            otherwise: otherwise.map(Box::new),
        }
    }

    pub fn to_char(expr: impl Into<Selector>, format: impl Into<String>) -> Self {
        Selector::ToChar {
            expr: Box::new(expr.into()),
            format: format.into(),
        }
    }

    pub fn count_all() -> Self {
        Selector::CountAll
    }

    /// Label this selector in the output (`expr AS "alias"`).
    pub fn alias(self, alias: impl Into<String>) -> Self {
        Selector::Aliased {
            expr: Box::new(self),
            alias: alias.into(),
        }
    }

    /// Evaluate this selector as a select-list item.
    pub fn evaluate(&self, schema: &Schema) -> Result<Evaluated> {
        let mut scope = Scope::new(schema);
        let fragment = scope.select_item(self)?;
        Ok(scope.finish(fragment))
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::Field(name.to_string())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::Field(name)
    }
}

impl From<Value> for Selector {
    fn from(value: Value) -> Self {
        Selector::Literal(value)
    }
}

impl Scope<'_> {
    /// Evaluate a top-level select-list item, where aliases are allowed.
    pub(crate) fn select_item(&mut self, selector: &Selector) -> Result<Fragment> {
        match selector {
            Selector::Aliased { expr, alias } => {
                let alias = guard_label(alias)?;
                let mut out = self.selector(expr)?;
                out.push(" AS ").push_quoted(alias);
                Ok(out)
            }
            other => self.selector(other),
        }
    }

    pub(crate) fn selector(&mut self, selector: &Selector) -> Result<Fragment> {
        match selector {
            Selector::Field(name) => {
                let column = self.column(name)?;
                let mut out = Fragment::empty();
                match &column.custom_sql {
                    Some(sql) => out.push(sql),
                    None => out.push_column(&column.alias, &column.field),
                };
                Ok(out)
            }

            Selector::Literal(value) => Ok(Fragment::param(value.clone())),

            Selector::Func { name, args } => {
                let name = guard(name)?;
                let args = args
                    .iter()
                    .map(|a| self.selector(a))
                    .collect::<Result<Vec<_>>>()?;
                let mut out = Fragment::new(name);
                out.push_fragment(Fragment::join(args, ", ").wrap("(", ")"));
                Ok(out)
            }

            Selector::Extract { unit, expr } => {
                let unit = guard(unit)?;
                let inner = self.selector(expr)?;
                Ok(inner.wrap(&format!("extract({unit} from "), ")"))
            }

            Selector::FilteredAggregate { func, expr, filter } => {
                let func = guard(func)?;
                let mut out = Fragment::new(func);
                match expr {
                    Some(expr) => {
                        out.push_fragment(self.selector(expr)?.wrap("(", ")"));
                    }
                    None => {
                        out.push("(*)");
                    }
                }
                let filter = self.predicate(filter)?;
                if !filter.is_empty() {
                    out.push_fragment(filter.wrap(" FILTER (WHERE ", ")"));
                }
                Ok(out)
            }

            Selector::Case {
                branches,
                otherwise,
            } => {
                if branches.is_empty() {
                    return Err(Error::UnsupportedSelector(
                        "CASE needs at least one WHEN branch".into(),
                    ));
                }
                let mut out = Fragment::new("CASE");
                for (when, then) in branches {
                    let when = self.predicate(when)?;
                    if when.is_empty() {
                        return Err(Error::UnsupportedSelector(
                            "CASE branch condition is empty".into(),
                        ));
                    }
                    out.push(" WHEN ").push_fragment(when);
                    out.push(" THEN ").push_fragment(self.selector(then)?);
                }
                if let Some(otherwise) = otherwise {
                    out.push(" ELSE ").push_fragment(self.selector(otherwise)?);
                }
                out.push(" END");
                Ok(out)
            }

            Selector::ToChar { expr, format } => {
                let inner = self.selector(expr)?;
                Ok(inner.wrap("to_char(", &format!(", {})", quote_literal(format))))
            }

            Selector::Aliased { alias, .. } => Err(Error::UnsupportedSelector(format!(
                "alias {alias:?} is only allowed at the top level of a select list"
            ))),

            Selector::CountAll => Ok(Fragment::new("count(*)")),
        }
    }
}
