//! Identifier guard.
//!
//! Identifiers cannot be bound as parameters, so every dynamic name that ends
//! up in SQL text (tables, join aliases, CTE names, function names, extract
//! units, column labels) passes through one of the guards here first.
//!
//! - [`guard`]: `[A-Za-z0-9_]+`
//! - [`guard_alias`]: [`guard`] plus a non-digit first character and not a
//!   reserved keyword, for names emitted unquoted
//! - [`guard_label`]: `[A-Za-z0-9_ :&-]+`, for quoted output labels
//! - [`guard_path`]: dotted [`guard`] segments, for logical column names
//!
//! # Example
//! ```ignore
//! use pgselect::ident::{guard, Ident};
//!
//! assert!(guard("film_id").is_ok());
//! assert!(guard("id\"; drop table film; --").is_err());
//!
//! let t = Ident::parse("public.film")?;
//! assert_eq!(t.to_sql(), r#""public"."film""#);
//! # Ok::<(), pgselect::Error>(())
//! ```

use crate::error::{Error, Result};

/// Keywords that cannot appear as bare (unquoted) aliases.
const RESERVED: &[&str] = &[
    "all", "and", "any", "as", "asc", "between", "by", "case", "cross", "desc", "distinct",
    "else", "end", "except", "exists", "false", "fetch", "filter", "from", "full", "group",
    "having", "ilike", "in", "inner", "intersect", "is", "join", "lateral", "left", "like",
    "limit", "natural", "not", "null", "offset", "on", "or", "order", "outer", "right",
    "select", "table", "then", "true", "union", "using", "when", "where", "window", "with",
];

fn is_strict(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

fn is_label(c: char) -> bool {
    is_strict(c) || matches!(c, ' ' | ':' | '&' | '-')
}

/// Accept `name` only if it consists of `[A-Za-z0-9_]`.
pub fn guard(name: &str) -> Result<&str> {
    if name.is_empty() || !name.chars().all(is_strict) {
        return Err(Error::invalid_identifier(name));
    }
    Ok(name)
}

/// Accept `name` for unquoted use: strict charset, no leading digit, not a keyword.
pub fn guard_alias(name: &str) -> Result<&str> {
    let name = guard(name)?;
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(Error::invalid_identifier(name));
    }
    if RESERVED.contains(&name.to_ascii_lowercase().as_str()) {
        return Err(Error::invalid_identifier(name));
    }
    Ok(name)
}

/// Accept `name` as a quoted output label (`[A-Za-z0-9_ :&-]`).
pub fn guard_label(name: &str) -> Result<&str> {
    if name.trim().is_empty() || !name.chars().all(is_label) {
        return Err(Error::invalid_identifier(name));
    }
    Ok(name)
}

/// Accept a logical column name: one or more [`guard`]ed segments joined by `.`.
pub fn guard_path(name: &str) -> Result<&str> {
    if name.split('.').all(|segment| guard(segment).is_ok()) {
        Ok(name)
    } else {
        Err(Error::invalid_identifier(name))
    }
}

/// Append `"name"` to `out`. `name` must already be guarded.
pub(crate) fn write_quoted(out: &mut String, name: &str) {
    out.push('"');
    out.push_str(name);
    out.push('"');
}

/// Render a single-quoted SQL string literal, doubling embedded quotes.
///
/// Used only where Postgres wants a literal rather than a parameter
/// (`to_char` formats, path separators).
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

/// A guarded relation name, optionally schema-qualified (`schema.table`).
///
/// Every part is validated with [`guard`] and rendered double-quoted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    parts: Vec<String>,
}

impl Ident {
    /// Parse a dotted relation name, guarding each part.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::invalid_identifier(s));
        }
        let mut parts = Vec::new();
        for part in s.split('.') {
            if guard(part).is_err() {
                return Err(Error::invalid_identifier(s));
            }
            parts.push(part.to_string());
        }
        Ok(Self { parts })
    }

    /// The unqualified (last) part.
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            write_quoted(out, part);
        }
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql())
    }
}
