//! Transaction and savepoint guards (C7): nesting is expressed as Rust
//! ownership rather than a node-arena — a `Transaction` borrows the
//! `Connection` for its lifetime, a `Savepoint` borrows the `Transaction`,
//! and the borrow checker alone guarantees only the innermost, deepest
//! guard is ever live at once (spec.md §4.7, §8 property 8).
//!
//! This also carries the tree's per-node bookkeeping: the `done: bool` on
//! each guard is that node's `Pending|Active → Committing|RollingBack|Done`
//! state collapsed to "resolved or not" (there's no wire-visible `Pending`
//! state here — `Transaction`/`Savepoint` only exist after their opening
//! statement has already been acknowledged); the single in-flight command
//! at any time is enforced by `&mut Connection` exclusivity rather than a
//! driver loop; and the per-node FIFO queue doesn't need a data structure at
//! all, since the caller's own sequential `.await` calls against the guard
//! already are that queue. The one piece that doesn't fall out for free is
//! `result_flag` propagation on error: see [`Connection::abandon`] for how
//! an uncommitted guard's `Drop` still produces exactly one rollback
//! statement when several nested guards unwind from a single failure.
use crate::Error;
use crate::command::quote_ident;
use crate::connection::Connection;
use crate::row::Row;

/// A transaction opened with [`Connection::begin`]. Commits explicitly via
/// [`commit`](Self::commit); otherwise rolls back when dropped.
///
/// Async `Drop` doesn't exist in Rust, so a dropped, uncommitted
/// transaction can't await the server's response to its `ROLLBACK`. It
/// records the rollback via [`Connection::abandon`] instead — the next real
/// operation on the connection flushes and absorbs it before issuing its
/// own command.
pub struct Transaction<'a> {
    conn: &'a mut Connection,
    done: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(conn: &'a mut Connection) -> Self {
        Self { conn, done: false }
    }

    /// Opens a savepoint nested inside this transaction (spec.md §4.7).
    pub async fn savepoint(&mut self, name: &str) -> Result<Savepoint<'_>, Error> {
        self.conn.simple_execute(&format!("SAVEPOINT {}", quote_ident(name))).await?;
        Ok(Savepoint::new(self.conn, name.to_owned()))
    }

    pub async fn commit(mut self) -> Result<(), Error> {
        self.conn.simple_execute("COMMIT").await?;
        self.done = true;
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), Error> {
        self.conn.simple_execute("ROLLBACK").await?;
        self.done = true;
        Ok(())
    }

    pub async fn query(&mut self, name: &str, params: impl crate::encode::Param) -> Result<Vec<Row>, Error> {
        self.conn.execute(name, params).await
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.conn.abandon("ROLLBACK".to_owned());
        }
    }
}

/// A savepoint opened with [`Transaction::savepoint`] or nested inside
/// another `Savepoint`. Attempting to open one outside an active
/// transaction is rejected by the type system: there's no `savepoint`
/// constructor that doesn't start from a `Transaction` or `Savepoint`
/// borrow, so the "savepoints require an active transaction" invariant
/// (spec.md §4.7) never needs a runtime check.
pub struct Savepoint<'a> {
    conn: &'a mut Connection,
    name: String,
    done: bool,
}

impl<'a> Savepoint<'a> {
    fn new(conn: &'a mut Connection, name: String) -> Self {
        Self { conn, name, done: false }
    }

    pub async fn savepoint(&mut self, name: &str) -> Result<Savepoint<'_>, Error> {
        self.conn.simple_execute(&format!("SAVEPOINT {}", quote_ident(name))).await?;
        Ok(Savepoint::new(self.conn, name.to_owned()))
    }

    pub async fn release(mut self) -> Result<(), Error> {
        self.conn.simple_execute(&format!("RELEASE SAVEPOINT {}", quote_ident(&self.name))).await?;
        self.done = true;
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), Error> {
        self.conn.simple_execute(&format!("ROLLBACK TO SAVEPOINT {}", quote_ident(&self.name))).await?;
        self.done = true;
        Ok(())
    }

    pub async fn query(&mut self, name: &str, params: impl crate::encode::Param) -> Result<Vec<Row>, Error> {
        self.conn.execute(name, params).await
    }
}

impl Drop for Savepoint<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.conn.abandon(format!("ROLLBACK TO SAVEPOINT {}", quote_ident(&self.name)));
        }
    }
}
