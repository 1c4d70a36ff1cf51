//! Pure query-construction and parameter-binding functions.
//!
//! Everything here is stateless and side-effect free: entity metadata plus a
//! structured descriptor (field projection, predicate fragment, parameters,
//! sort order, pagination window) in, query text plus an ordered bind list
//! out. Execution belongs to the [`Session`](crate::session::Session).
//!
//! Predicate fragments are free-form boolean conditions. Generated text
//! always carries a tautological `WHERE 1=1` base so additional fragments can
//! be `AND`-appended without knowing whether a predicate already exists.

use crate::entity::{Entity, EntityExt};
use crate::error::DataError;
use crate::value::Value;
use std::str::FromStr;

/// Alias every generated statement binds the entity relation to.
const ALIAS: &str = "o";

/// Storage-relation name for `T`, validated once per call site.
///
/// Invalid or empty declared names are a configuration error
/// (`UnmappedType`), surfaced at first use.
pub fn entity_name<T: Entity>() -> Result<&'static str, DataError> {
    let name = T::table_name();
    if !is_valid_identifier(name) {
        return Err(DataError::UnmappedType {
            entity: std::any::type_name::<T>(),
        });
    }
    Ok(name)
}

/// Qualified primary-key reference for `T`, e.g. `o.id`.
pub fn pk_field<T: Entity>(alias: &str) -> Result<String, DataError> {
    if !is_valid_identifier(alias) {
        return Err(DataError::InvalidIdentifier {
            kind: "alias",
            ident: alias.to_string(),
        });
    }
    let column = T::id_column();
    if !is_valid_identifier(column) {
        return Err(DataError::UnmappedType {
            entity: std::any::type_name::<T>(),
        });
    }
    Ok(format!("{alias}.{column}"))
}

/// Comma-joined qualified projection list.
///
/// `None` or an empty list selects every attribute in declaration order. An
/// explicit list is kept in the caller's exact order — callers rebuild
/// entities positionally from it — and each field must be declared on `T`.
pub fn select_clause<T: Entity>(
    alias: &str,
    fields: Option<&[&str]>,
) -> Result<String, DataError> {
    let all = T::attribute_names();
    let chosen: Vec<&str> = match fields {
        None => all,
        Some([]) => all,
        Some(explicit) => {
            for field in explicit {
                if !is_valid_identifier(field) {
                    return Err(DataError::InvalidIdentifier {
                        kind: "column",
                        ident: field.to_string(),
                    });
                }
                if !all.iter().any(|a| a == field) {
                    return Err(DataError::UnknownAttribute {
                        entity: T::table_name(),
                        attribute: field.to_string(),
                    });
                }
            }
            explicit.to_vec()
        }
    };
    let cols: Vec<String> = chosen.iter().map(|f| format!("{alias}.{f}")).collect();
    Ok(format!("SELECT {}", cols.join(", ")))
}

/// `WHERE 1=1` base, with the predicate fragment `AND`-appended when present.
pub fn where_clause(predicate: &str) -> String {
    let predicate = predicate.trim();
    if predicate.is_empty() {
        " WHERE 1=1".to_string()
    } else {
        format!(" WHERE 1=1 AND {predicate}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    fn as_sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

impl FromStr for SortDir {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, DataError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDir::Asc),
            "desc" => Ok(SortDir::Desc),
            other => Err(DataError::InvalidSortDirection(other.to_string())),
        }
    }
}

/// Insertion-ordered field → direction mapping.
#[derive(Debug, Clone, Default)]
pub struct OrderBy {
    entries: Vec<(String, SortDir)>,
}

impl OrderBy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(mut self, field: &str) -> Self {
        self.entries.push((field.to_string(), SortDir::Asc));
        self
    }

    pub fn desc(mut self, field: &str) -> Self {
        self.entries.push((field.to_string(), SortDir::Desc));
        self
    }

    /// Append an entry with a textual direction (`"asc"` / `"desc"`,
    /// case-insensitive).
    pub fn add(&mut self, field: &str, direction: &str) -> Result<(), DataError> {
        let dir = direction.parse()?;
        self.entries.push((field.to_string(), dir));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(String, SortDir)] {
        &self.entries
    }
}

/// `ORDER BY` fragment in insertion order; empty input yields an empty
/// fragment.
pub fn order_by_clause(order: &OrderBy) -> Result<String, DataError> {
    if order.is_empty() {
        return Ok(String::new());
    }
    let mut clauses = Vec::with_capacity(order.entries().len());
    for (field, dir) in order.entries() {
        if !is_valid_identifier(field) {
            return Err(DataError::InvalidIdentifier {
                kind: "column",
                ident: field.clone(),
            });
        }
        clauses.push(format!("{field} {}", dir.as_sql()));
    }
    Ok(format!(" ORDER BY {}", clauses.join(", ")))
}

/// Pagination window over a result-producing query.
///
/// `-1` on either bound disables that bound; bounds apply independently, so
/// offset-only and limit-only windows are both valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub first: i64,
    pub max: i64,
}

impl Window {
    /// The unbounded window `(-1, -1)`.
    pub const ALL: Window = Window { first: -1, max: -1 };

    pub fn new(first: i64, max: i64) -> Self {
        Window { first, max }
    }

    pub fn offset(&self) -> Option<u64> {
        (self.first >= 0).then_some(self.first as u64)
    }

    pub fn limit(&self) -> Option<u64> {
        (self.max >= 0).then_some(self.max as u64)
    }

    pub fn is_unbounded(&self) -> bool {
        self.first < 0 && self.max < 0
    }
}

/// Parameter source for a predicate fragment. The shapes are mutually
/// exclusive; each normalizes to an ordered positional bind list.
#[derive(Debug, Clone, Default)]
pub enum Params {
    #[default]
    None,
    /// Bound by 1-based position, in array order, to `?` placeholders.
    Positional(Vec<Value>),
    /// Bound by key to `:name` placeholders; insertion order is preserved
    /// only in the caller's list, binding order follows the query text.
    Named(Vec<(String, Value)>),
    /// Bound by explicit 1-based index to `?` placeholders.
    Indexed(Vec<(usize, Value)>),
}

impl Params {
    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Params::Positional(values.into_iter().collect())
    }
}

#[derive(Debug, PartialEq)]
enum Placeholder {
    Positional,
    Named(String),
}

/// Scan `sql` for placeholders, skipping single-quoted string literals.
fn scan_placeholders(sql: &str) -> Vec<Placeholder> {
    let mut out = Vec::new();
    let mut chars = sql.chars().peekable();
    let mut in_literal = false;
    while let Some(c) = chars.next() {
        match c {
            '\'' => in_literal = !in_literal,
            '?' if !in_literal => out.push(Placeholder::Positional),
            ':' if !in_literal => {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if !name.is_empty() {
                    out.push(Placeholder::Named(name));
                }
            }
            _ => {}
        }
    }
    out
}

/// Rewrite `:name` placeholders to `?`, skipping single-quoted literals.
fn rewrite_named(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut in_literal = false;
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_literal = !in_literal;
                out.push(c);
            }
            ':' if !in_literal && chars.peek().is_some_and(|n| n.is_ascii_alphanumeric() || *n == '_') => {
                while chars
                    .peek()
                    .is_some_and(|n| n.is_ascii_alphanumeric() || *n == '_')
                {
                    chars.next();
                }
                out.push('?');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Normalize a parameter source against the query text, producing the final
/// statement and its ordered bind list.
///
/// Positional-placeholder queries fail with `ParameterCountMismatch` when the
/// placeholder count and the parameter count disagree; named queries fail
/// when a placeholder has no value or a value no placeholder; indexed
/// parameters must cover `1..=n` exactly.
pub fn bind_params(sql: &str, params: &Params) -> Result<(String, Vec<Value>), DataError> {
    let placeholders = scan_placeholders(sql);
    let positional = placeholders
        .iter()
        .filter(|p| **p == Placeholder::Positional)
        .count();
    let named: Vec<&String> = placeholders
        .iter()
        .filter_map(|p| match p {
            Placeholder::Named(name) => Some(name),
            Placeholder::Positional => None,
        })
        .collect();

    match params {
        Params::None => {
            if positional != 0 || !named.is_empty() {
                return Err(DataError::ParameterCountMismatch {
                    expected: positional + named.len(),
                    actual: 0,
                });
            }
            Ok((sql.to_string(), Vec::new()))
        }
        Params::Positional(values) => {
            if !named.is_empty() || positional != values.len() {
                return Err(DataError::ParameterCountMismatch {
                    expected: positional + named.len(),
                    actual: values.len(),
                });
            }
            Ok((sql.to_string(), values.clone()))
        }
        Params::Named(pairs) => {
            if positional != 0 {
                return Err(DataError::ParameterCountMismatch {
                    expected: positional + named.len(),
                    actual: pairs.len(),
                });
            }
            let mut binds = Vec::with_capacity(named.len());
            for name in &named {
                let value = pairs
                    .iter()
                    .find(|(key, _)| key == *name)
                    .map(|(_, v)| v.clone())
                    .ok_or(DataError::ParameterCountMismatch {
                        expected: named.len(),
                        actual: pairs.len(),
                    })?;
                binds.push(value);
            }
            for (key, _) in pairs {
                if !named.iter().any(|n| *n == key) {
                    return Err(DataError::ParameterCountMismatch {
                        expected: named.len(),
                        actual: pairs.len(),
                    });
                }
            }
            Ok((rewrite_named(sql), binds))
        }
        Params::Indexed(pairs) => {
            if !named.is_empty() {
                return Err(DataError::ParameterCountMismatch {
                    expected: positional + named.len(),
                    actual: pairs.len(),
                });
            }
            let mut slots: Vec<Option<Value>> = vec![None; positional];
            for (index, value) in pairs {
                let slot = index
                    .checked_sub(1)
                    .and_then(|i| slots.get_mut(i))
                    .ok_or(DataError::ParameterCountMismatch {
                        expected: positional,
                        actual: pairs.len(),
                    })?;
                if slot.is_some() {
                    return Err(DataError::ParameterCountMismatch {
                        expected: positional,
                        actual: pairs.len(),
                    });
                }
                *slot = Some(value.clone());
            }
            let binds: Option<Vec<Value>> = slots.into_iter().collect();
            match binds {
                Some(binds) => Ok((sql.to_string(), binds)),
                None => Err(DataError::ParameterCountMismatch {
                    expected: positional,
                    actual: pairs.len(),
                }),
            }
        }
    }
}

/// Full `SELECT` statement for `T`: projection, relation, tautological
/// where-base plus predicate, optional order-by.
pub fn select_sql<T: Entity>(
    fields: Option<&[&str]>,
    predicate: &str,
    order: &OrderBy,
) -> Result<String, DataError> {
    let name = entity_name::<T>()?;
    Ok(format!(
        "{} FROM {name} {ALIAS}{}{}",
        select_clause::<T>(ALIAS, fields)?,
        where_clause(predicate),
        order_by_clause(order)?,
    ))
}

/// `SELECT COUNT(pk)` statement over the same predicate, never windowed.
pub fn count_sql<T: Entity>(predicate: &str) -> Result<String, DataError> {
    let name = entity_name::<T>()?;
    Ok(format!(
        "SELECT COUNT({}) FROM {name} {ALIAS}{}",
        pk_field::<T>(ALIAS)?,
        where_clause(predicate),
    ))
}

/// Bulk `DELETE` statement over a predicate.
pub fn delete_sql<T: Entity>(predicate: &str) -> Result<String, DataError> {
    let name = entity_name::<T>()?;
    Ok(format!("DELETE FROM {name}{}", where_clause(predicate)))
}

fn is_valid_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
