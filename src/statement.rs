//! Prepared-statement cache (C5): name → (SQL text, OIDs) registry, with the
//! duplicate-name invariant from spec.md §3.
//!
//! Named statements are destroyed only by explicit deallocation or
//! connection teardown (spec.md §3's lifecycle rule) — this registry never
//! evicts, so it's a plain map rather than an LRU. `Connection::execute_inline`
//! (spec.md §3's `ExecuteInline`) bypasses this registry entirely, running
//! each call through the unnamed statement with no client-side caching.
use std::collections::HashMap;

use crate::postgres::Oid;
use crate::row::RowDescription;

#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    #[error("prepared statement {name:?} already exists with different SQL text")]
    DuplicateStatement { name: String },
    #[error("no prepared statement named {name:?}")]
    UnknownStatement { name: String },
}

/// A prepared statement as tracked client-side.
#[derive(Debug, Clone)]
pub struct CachedStatement {
    pub sql: String,
    pub param_oids: Vec<Oid>,
    pub description: Option<RowDescription>,
}

/// Connection-scoped registry of named prepared statements (spec.md §4.5).
///
/// The empty name is reserved for anonymous, uncached statements and is
/// never inserted here.
#[derive(Default)]
pub struct PreparedStatementCache {
    entries: HashMap<String, CachedStatement>,
}

impl PreparedStatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&CachedStatement> {
        self.entries.get(name)
    }

    /// Registers a new prepared statement. Fails with `DuplicateStatement`
    /// if `name` is already registered for different SQL text; re-preparing
    /// the same text under the same name is a no-op success (idempotent).
    pub fn insert(&mut self, name: &str, sql: &str, param_oids: Vec<Oid>) -> Result<(), StatementError> {
        if name.is_empty() {
            return Ok(());
        }
        if let Some(existing) = self.entries.get(name) {
            if existing.sql != sql {
                return Err(StatementError::DuplicateStatement { name: name.to_owned() });
            }
            return Ok(());
        }
        self.entries.insert(name.to_owned(), CachedStatement { sql: sql.to_owned(), param_oids, description: None });
        Ok(())
    }

    pub fn set_description(&mut self, name: &str, description: RowDescription) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.description = Some(description);
        }
    }

    /// Forgets a statement, e.g. after a `DEALLOCATE`. Returns whether it
    /// was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_duplicate_name_different_text() {
        let mut cache = PreparedStatementCache::default();
        cache.insert("s", "select 1", vec![]).unwrap();
        let err = cache.insert("s", "select 2", vec![]).unwrap_err();
        assert!(matches!(err, StatementError::DuplicateStatement { .. }));
    }

    #[test]
    fn reinsert_same_text_is_idempotent() {
        let mut cache = PreparedStatementCache::default();
        cache.insert("s", "select 1", vec![]).unwrap();
        cache.insert("s", "select 1", vec![]).unwrap();
        assert!(cache.contains("s"));
    }

    #[test]
    fn anonymous_statements_are_never_cached() {
        let mut cache = PreparedStatementCache::default();
        cache.insert("", "select 1", vec![]).unwrap();
        assert!(!cache.contains(""));
    }

    #[test]
    fn never_evicts_named_statements_regardless_of_count() {
        let mut cache = PreparedStatementCache::default();
        for i in 0..200 {
            cache.insert(&format!("s{i}"), "select 1", vec![]).unwrap();
        }
        assert!(cache.contains("s0"));
        assert!(cache.contains("s199"));
    }
}
