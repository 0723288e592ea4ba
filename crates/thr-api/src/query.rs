// PostgREST query-string builder.
//
// Produces `(key, value)` pairs ready for `reqwest::RequestBuilder::query`:
//   select=*,Tech!inner(...)   tech_id=eq.X   or=(id.ilike."*x*",...)
//   order=ranking.asc.nullslast,id.asc   limit=50

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sort direction for an `order=` clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn flip(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("asc"),
            Self::Desc => f.write_str("desc"),
        }
    }
}

/// Where NULLs land in an ordered column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nulls {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OrderTerm {
    column: String,
    direction: Direction,
    nulls: Option<Nulls>,
}

impl fmt::Display for OrderTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.column, self.direction)?;
        match self.nulls {
            Some(Nulls::First) => f.write_str(".nullsfirst"),
            Some(Nulls::Last) => f.write_str(".nullslast"),
            None => Ok(()),
        }
    }
}

/// A read query against one store resource.
///
/// Filters are ANDed; at most one `or=(...)` group is carried (the last
/// call to [`Query::any_ilike`] wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    select: Option<String>,
    filters: Vec<(String, String)>,
    or_group: Option<String>,
    order: Vec<OrderTerm>,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column list / embedding expression, e.g. `*,Tech!inner(id,title)`.
    #[must_use]
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    /// `column=eq.value`. Column may be an embedded path like `Tech.tech_family_id`.
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.filters
            .push((column.into(), format!("eq.{}", value.as_ref())));
        self
    }

    /// Case-insensitive substring match of `term` against any of `columns`.
    #[must_use]
    pub fn any_ilike(mut self, columns: &[&str], term: &str) -> Self {
        let pattern = quote(&format!("*{}*", escape_like(term)));
        let clauses: Vec<String> = columns
            .iter()
            .map(|col| format!("{col}.ilike.{pattern}"))
            .collect();
        self.or_group = Some(format!("({})", clauses.join(",")));
        self
    }

    #[must_use]
    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push(OrderTerm {
            column: column.into(),
            direction,
            nulls: None,
        });
        self
    }

    #[must_use]
    pub fn order_nulls(
        mut self,
        column: impl Into<String>,
        direction: Direction,
        nulls: Nulls,
    ) -> Self {
        self.order.push(OrderTerm {
            column: column.into(),
            direction,
            nulls: Some(nulls),
        });
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render to query-string pairs. Values are not URL-encoded here.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(self.filters.len() + 5);
        if let Some(ref select) = self.select {
            out.push(("select".into(), select.clone()));
        }
        out.extend(self.filters.iter().cloned());
        if let Some(ref group) = self.or_group {
            out.push(("or".into(), group.clone()));
        }
        if !self.order.is_empty() {
            let terms: Vec<String> = self.order.iter().map(ToString::to_string).collect();
            out.push(("order".into(), terms.join(",")));
        }
        if let Some(limit) = self.limit {
            out.push(("limit".into(), limit.to_string()));
        }
        out
    }
}

/// Escape SQL LIKE metacharacters so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Double-quote a value inside a PostgREST logic tree so `,` `.` `(` `)`
/// in user input can't break the expression.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if matches!(ch, '\\' | '"') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}
