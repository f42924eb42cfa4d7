//! Named placeholder compilation.
//!
//! Rendered statements use `:name` placeholders. PostgreSQL only understands `$n`, so
//! before execution the text is rewritten: each distinct name gets the next position in
//! order of first appearance and repeated names reuse their position. String literals,
//! quoted identifiers, comments, dollar-quoted bodies and `::` casts are copied verbatim.
//!
//! A colon inside an array slice (`arr[1:2]`) reads as a placeholder; put spaces around it.

use crate::error::{OrmError, OrmResult};
use crate::sql::Params;
use crate::value::Value;
use std::collections::HashMap;
use tokio_postgres::types::ToSql;

/// Positional form of a named statement.
#[derive(Debug, Clone)]
pub struct CompiledSql<'a> {
    pub sql: String,
    /// Placeholder names in position order (`names[0]` is `$1`).
    pub names: Vec<String>,
    values: Vec<&'a Value>,
}

impl<'a> CompiledSql<'a> {
    /// Parameters in position order, ready for the driver.
    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.values
            .iter()
            .map(|v| *v as &(dyn ToSql + Sync))
            .collect()
    }

    pub fn param_count(&self) -> usize {
        self.values.len()
    }
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// End (exclusive) of a quoted run starting at `start`; doubled quotes are escapes.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn find_from(sql: &str, from: usize, needle: &str) -> Option<usize> {
    sql[from..].find(needle).map(|pos| from + pos)
}

/// End (exclusive) of a dollar-quoted body starting at `start`, if `start` opens one.
fn skip_dollar_quoted(sql: &str, start: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if bytes.get(i) != Some(&b'$') {
        return None;
    }
    let tag = &sql[start..=i];
    // `$1` style positional parameters are not tags.
    if tag.len() > 2 && bytes[start + 1].is_ascii_digit() {
        return None;
    }
    let body = i + 1;
    Some(find_from(sql, body, tag).map_or(bytes.len(), |end| end + tag.len()))
}

/// Rewrite `:name` placeholders to `$n`, collecting values from `params`.
///
/// Fails with [`OrmError::Validation`] when a placeholder has no value.
pub fn compile<'a>(sql: &str, params: &'a Params) -> OrmResult<CompiledSql<'a>> {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut names: Vec<String> = Vec::new();
    let mut values: Vec<&'a Value> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        let next = bytes.get(i + 1).copied();
        let skip_to = match bytes[i] {
            b'\'' | b'"' => Some(skip_quoted(bytes, i, bytes[i])),
            b'-' if next == Some(b'-') => {
                Some(find_from(sql, i, "\n").map_or(bytes.len(), |p| p + 1))
            }
            b'/' if next == Some(b'*') => {
                Some(find_from(sql, i + 2, "*/").map_or(bytes.len(), |p| p + 2))
            }
            b'$' => skip_dollar_quoted(sql, i),
            b':' if next == Some(b':') => Some(i + 2),
            b':' if next.is_some_and(is_name_start) => {
                out.push_str(&sql[copied..i]);
                let start = i + 1;
                let mut end = start + 1;
                while end < bytes.len() && is_name_char(bytes[end]) {
                    end += 1;
                }
                let name = &sql[start..end];
                let position = match positions.get(name) {
                    Some(&p) => p,
                    None => {
                        let value = params.get(name).ok_or_else(|| {
                            OrmError::validation(format!("missing value for placeholder :{name}"))
                        })?;
                        values.push(value);
                        names.push(name.to_string());
                        positions.insert(name, values.len());
                        values.len()
                    }
                };
                out.push('$');
                out.push_str(&position.to_string());
                copied = end;
                i = end;
                continue;
            }
            _ => None,
        };
        i = skip_to.unwrap_or(i + 1);
    }
    out.push_str(&sql[copied..]);

    Ok(CompiledSql { sql: out, names, values })
}
