//! SQL identifier checks and quoting.
//!
//! DDL interpolates table and column names unquoted, and placeholder names are built from
//! column names, so both only accept plain identifiers: `[A-Za-z_][A-Za-z0-9_$]*`.
//! Statement rendering additionally double-quotes names with [`quote_ident`].

use crate::error::{OrmError, OrmResult};

/// Maximum identifier length accepted by PostgreSQL (NAMEDATALEN - 1).
pub const MAX_IDENT_LEN: usize = 63;

/// Whether `s` is a plain, unquoted SQL identifier.
pub fn is_plain_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    s.len() <= MAX_IDENT_LEN && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Validate a plain identifier, naming what it is in the error.
pub fn check_ident(s: &str, what: &str) -> OrmResult<()> {
    if s.is_empty() {
        return Err(OrmError::validation(format!("{what} cannot be empty")));
    }
    if !is_plain_ident(s) {
        return Err(OrmError::validation(format!(
            "invalid {what} '{s}' (expected [A-Za-z_][A-Za-z0-9_$]*, at most {MAX_IDENT_LEN} bytes)"
        )));
    }
    Ok(())
}

/// Double-quote an identifier, escaping embedded quotes as `""`.
pub fn quote_ident(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}
