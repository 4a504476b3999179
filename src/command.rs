//! Transaction-control statement text (part of C7's data model).
use std::fmt::Write;

/// `BEGIN TRANSACTION [ISOLATION LEVEL ...] [READ ONLY|READ WRITE]
/// [DEFERRABLE]` mode flags (spec.md §4.7). Default is read-committed,
/// read-write, non-deferrable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionMode {
    pub isolation: Option<IsolationLevel>,
    pub read_only: bool,
    pub deferrable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    fn as_sql(self) -> &'static str {
        match self {
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl TransactionMode {
    pub fn read_only() -> Self {
        Self { read_only: true, ..Self::default() }
    }

    /// Renders the `BEGIN` statement text for this mode.
    pub fn begin_sql(&self) -> String {
        let mut sql = String::from("BEGIN");
        if let Some(level) = self.isolation {
            write!(sql, " ISOLATION LEVEL {}", level.as_sql()).unwrap();
        }
        sql.push_str(if self.read_only { " READ ONLY" } else { " READ WRITE" });
        if self.deferrable {
            sql.push_str(" DEFERRABLE");
        }
        sql
    }
}

/// A quoted identifier, for statement/savepoint names interpolated into SQL
/// text. PostgreSQL identifiers double an embedded `"` to escape it.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_mode_is_read_write_read_committed() {
        assert_eq!(TransactionMode::default().begin_sql(), "BEGIN READ WRITE");
    }

    #[test]
    fn read_only_serializable_deferrable() {
        let mode = TransactionMode {
            isolation: Some(IsolationLevel::Serializable),
            read_only: true,
            deferrable: true,
        };
        assert_eq!(mode.begin_sql(), "BEGIN ISOLATION LEVEL SERIALIZABLE READ ONLY DEFERRABLE");
    }

    #[test]
    fn quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("weird\"name"), "\"weird\"\"name\"");
    }
}
