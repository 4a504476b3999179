//! Public query API (spec.md §4.8): thin `FromRow` convenience layered over
//! [`Connection::execute`]/[`Connection::simple_query`]. Not a query
//! builder — callers still write their own SQL and name their own
//! statements (spec.md §1 excludes ORMs/query builders as a non-goal).
use crate::Error;
use crate::connection::Connection;
use crate::encode::Param;
use crate::row::{FromRow, Row, RowError};

/// Executes `name` with `params` and decodes every row as `T`.
pub async fn fetch_all<T: FromRow>(conn: &mut Connection, name: &str, params: impl Param) -> Result<Vec<T>, Error> {
    let rows = conn.execute(name, params).await?;
    decode_rows(&rows)
}

/// Like [`fetch_all`], but runs `sql` inline via
/// [`Connection::execute_inline`] instead of a named, previously-`prepare`d
/// statement.
pub async fn fetch_all_inline<T: FromRow>(conn: &mut Connection, sql: &str, params: impl Param) -> Result<Vec<T>, Error> {
    let rows = conn.execute_inline(sql, params).await?;
    decode_rows(&rows)
}

/// Like [`fetch_all`], but expects exactly zero or one row.
pub async fn fetch_optional<T: FromRow>(
    conn: &mut Connection,
    name: &str,
    params: impl Param,
) -> Result<Option<T>, Error> {
    let rows = conn.execute(name, params).await?;
    match rows.as_slice() {
        [] => Ok(None),
        [row] => Ok(Some(T::from_row(row)?)),
        _ => Err(RowError::TooManyRows { found: rows.len() }.into()),
    }
}

/// Like [`fetch_all`], but expects exactly one row.
pub async fn fetch_one<T: FromRow>(conn: &mut Connection, name: &str, params: impl Param) -> Result<T, Error> {
    fetch_optional(conn, name, params).await?.ok_or(RowError::NoRows.into())
}

fn decode_rows<T: FromRow>(rows: &[Row]) -> Result<Vec<T>, Error> {
    rows.iter().map(T::from_row).collect::<Result<_, _>>().map_err(Error::from)
}
