//! Statement logging through `tracing`.
//!
//! Events go to the `pgquent.sql` target:
//!
//! ```text
//! RUST_LOG=pgquent.sql=debug
//! ```

use tracing::Level;

/// Tracing target for statement events.
pub const TARGET: &str = "pgquent.sql";

/// Kind of statement, recorded on every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Aggregate,
    Insert,
    Update,
    Delete,
    Raw,
    Ddl,
    Transaction,
}

/// Emits one event per executed statement.
#[derive(Debug, Clone)]
pub struct SqlLogger {
    /// Event level.
    pub level: Level,
    /// Truncate SQL longer than this many bytes. `None` logs it whole.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogger {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl SqlLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    fn shorten<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)).into(),
            _ => sql.into(),
        }
    }

    /// Log a statement about to be executed.
    pub fn statement(&self, kind: StatementKind, sql: &str, param_count: usize) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.shorten(sql);
        emit_at_level!(
            self.level,
            target: TARGET,
            kind = ?kind,
            param_count,
            sql = %sql,
            "executing statement"
        );
    }

    /// Log a failed statement.
    pub fn failure(&self, kind: StatementKind, sql: &str, error: &crate::OrmError) {
        let sql = self.shorten(sql);
        tracing::warn!(target: TARGET, kind = ?kind, sql = %sql, error = %error, "statement failed");
    }
}

/// Cut `sql` to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
