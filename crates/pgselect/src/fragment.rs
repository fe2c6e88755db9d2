//! SQL fragment tree and parameter finalizer.
//!
//! A [`Fragment`] is an ordered sequence of raw SQL text, parameter markers
//! (each holding its [`Value`]) and nested fragments. Fragments are only ever
//! appended to one another; nothing is decoded to a flat string until
//! [`Fragment::finalize`] numbers the markers `$1, $2, ...` in a single
//! depth-first, left-to-right walk and emits the values in the same order.
//!
//! # Example
//!
//! ```ignore
//! use pgselect::Fragment;
//!
//! let mut where_clause = Fragment::new("root.\"age\" between ");
//! where_clause.push_bind(18).push(" and ").push_bind(65);
//!
//! let mut q = Fragment::new("SELECT * FROM \"t\" root WHERE ");
//! q.push_fragment(where_clause);
//!
//! let (sql, params) = q.finalize();
//! assert_eq!(sql, "SELECT * FROM \"t\" root WHERE root.\"age\" between $1 and $2");
//! assert_eq!(params.len(), 2);
//! ```

use std::fmt::Write;

use crate::error::{Error, Result};
use crate::ident::{Ident, write_quoted};
use crate::value::Value;

/// One element of a [`Fragment`].
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Raw(String),
    Param(Value),
    Nested(Fragment),
}

/// A parameter-safe SQL fragment tree.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    parts: Vec<Part>,
}

impl Fragment {
    /// Create a fragment with initial raw SQL.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        let sql = initial_sql.into();
        if sql.is_empty() {
            return Self::empty();
        }
        Self {
            parts: vec![Part::Raw(sql)],
        }
    }

    /// Create an empty fragment.
    pub fn empty() -> Self {
        Self { parts: Vec::new() }
    }

    /// A fragment holding a single parameter marker.
    pub fn param(value: impl Into<Value>) -> Self {
        Self {
            parts: vec![Part::Param(value.into())],
        }
    }

    /// Build a fragment from SQL with `?` markers, binding `values` in order.
    ///
    /// The number of markers must equal the number of values. Every `?` is a
    /// marker; templates cannot contain a literal `?`.
    pub fn template(sql: &str, values: Vec<Value>) -> Result<Self> {
        let markers = sql.matches('?').count();
        if markers != values.len() {
            return Err(Error::UnsupportedPredicate(format!(
                "template has {markers} '?' markers but {} values",
                values.len()
            )));
        }
        let mut out = Fragment::empty();
        let mut values = values.into_iter();
        for (i, chunk) in sql.split('?').enumerate() {
            if i > 0 {
                if let Some(v) = values.next() {
                    out.push_bind(v);
                }
            }
            out.push(chunk);
        }
        Ok(out)
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }
        match self.parts.last_mut() {
            Some(Part::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(Part::Raw(sql.to_string())),
        }
        self
    }

    /// Append a parameter marker holding `value`.
    pub fn push_bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.parts.push(Part::Param(value.into()));
        self
    }

    /// Append another fragment's elements, consuming it.
    ///
    /// Concatenation is associative: `(a + b) + c` and `a + (b + c)` finalize
    /// to the same SQL and parameter order.
    pub fn push_fragment(&mut self, other: Fragment) -> &mut Self {
        for part in other.parts {
            match part {
                Part::Raw(s) => {
                    self.push(&s);
                }
                part => self.parts.push(part),
            }
        }
        self
    }

    /// Append another fragment as a nested subtree (e.g. a subquery body).
    pub fn push_nested(&mut self, other: Fragment) -> &mut Self {
        if !other.is_empty() {
            self.parts.push(Part::Nested(other));
        }
        self
    }

    /// Append a guarded relation name.
    pub fn push_ident(&mut self, ident: &Ident) -> &mut Self {
        let mut s = String::new();
        ident.write_sql(&mut s);
        self.push(&s)
    }

    /// Append `"name"`. The caller has already guarded `name`.
    pub(crate) fn push_quoted(&mut self, name: &str) -> &mut Self {
        let mut s = String::with_capacity(name.len() + 2);
        write_quoted(&mut s, name);
        self.push(&s)
    }

    /// Append `alias."field"`. Both parts have already been guarded.
    pub(crate) fn push_column(&mut self, alias: &str, field: &str) -> &mut Self {
        self.push(alias).push(".").push_quoted(field)
    }

    /// Join fragments with a separator, skipping empty ones.
    pub fn join(fragments: impl IntoIterator<Item = Fragment>, sep: &str) -> Fragment {
        let mut out = Fragment::empty();
        let mut first = true;
        for f in fragments {
            if f.is_empty() {
                continue;
            }
            if !first {
                out.push(sep);
            }
            first = false;
            out.push_fragment(f);
        }
        out
    }

    /// Surround this fragment with `prefix` and `suffix`.
    pub fn wrap(self, prefix: &str, suffix: &str) -> Fragment {
        let mut out = Fragment::new(prefix);
        out.push_fragment(self).push(suffix);
        out
    }

    /// `true` if the fragment renders to nothing.
    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|p| match p {
            Part::Raw(s) => s.is_empty(),
            Part::Param(_) => false,
            Part::Nested(f) => f.is_empty(),
        })
    }

    /// The elements of this fragment.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Number of parameter markers, including nested ones.
    pub fn param_count(&self) -> usize {
        self.parts
            .iter()
            .map(|p| match p {
                Part::Raw(_) => 0,
                Part::Param(_) => 1,
                Part::Nested(f) => f.param_count(),
            })
            .sum()
    }

    /// Parameter values in finalization order.
    pub fn params(&self) -> Vec<&Value> {
        fn walk<'a>(f: &'a Fragment, out: &mut Vec<&'a Value>) {
            for p in &f.parts {
                match p {
                    Part::Raw(_) => {}
                    Part::Param(v) => out.push(v),
                    Part::Nested(inner) => walk(inner, out),
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    /// Render SQL with `$1, $2, ...` placeholders without consuming the tree.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        let mut idx = 0usize;
        render(self, &mut out, &mut idx, &mut None);
        out
    }

    /// Number every parameter marker depth-first, left to right.
    ///
    /// Returns the SQL text and the values in placeholder order: the value at
    /// position `i` of the list is the one bound to `$(i + 1)`.
    pub fn finalize(self) -> (String, Vec<Value>) {
        let mut out = String::new();
        let mut idx = 0usize;
        let mut params = Some(Vec::with_capacity(self.param_count()));
        render_owned(self, &mut out, &mut idx, &mut params);
        (out, params.unwrap_or_default())
    }
}

fn push_placeholder(out: &mut String, idx: &mut usize) {
    *idx += 1;
    let _ = write!(out, "${}", idx);
}

fn render(f: &Fragment, out: &mut String, idx: &mut usize, params: &mut Option<Vec<Value>>) {
    for part in &f.parts {
        match part {
            Part::Raw(s) => out.push_str(s),
            Part::Param(v) => {
                push_placeholder(out, idx);
                if let Some(params) = params {
                    params.push(v.clone());
                }
            }
            Part::Nested(inner) => render(inner, out, idx, params),
        }
    }
}

fn render_owned(f: Fragment, out: &mut String, idx: &mut usize, params: &mut Option<Vec<Value>>) {
    for part in f.parts {
        match part {
            Part::Raw(s) => out.push_str(&s),
            Part::Param(v) => {
                push_placeholder(out, idx);
                if let Some(params) = params {
                    params.push(v);
                }
            }
            Part::Nested(inner) => render_owned(inner, out, idx, params),
        }
    }
}

impl From<Value> for Fragment {
    fn from(v: Value) -> Self {
        Fragment::param(v)
    }
}
