//! Result assembler (C8): RowDescription + DataRow accumulation and field
//! extraction.
use std::sync::Arc;

use bytes::{Buf, Bytes};

use crate::common::ByteStr;
use crate::ext::BytesExt;
use crate::postgres::{Oid, PgFormat, ProtocolError};
use crate::types::{BinaryDecode, TypeError};

/// One column's static description, decoded from `RowDescription`.
///
/// <https://www.postgresql.org/docs/current/protocol-message-formats.html>
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: ByteStr,
    pub table_oid: Oid,
    pub attr_number: i16,
    pub type_oid: Oid,
    pub type_size: i16,
    pub type_mod: i32,
    pub format: PgFormat,
}

/// Immutable once observed for a result (spec.md §3).
#[derive(Debug, Clone)]
pub struct RowDescription {
    pub columns: Arc<[ColumnInfo]>,
}

impl RowDescription {
    pub fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        if body.remaining() < 2 {
            return Err(ProtocolError::malformed("RowDescription too short"));
        }
        let count = body.get_u16();
        let mut columns = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = body.get_nul_bytestr().map_err(ProtocolError::malformed)?;
            if body.remaining() < 18 {
                return Err(ProtocolError::malformed("RowDescription field truncated"));
            }
            columns.push(ColumnInfo {
                name,
                table_oid: body.get_u32(),
                attr_number: body.get_i16(),
                type_oid: body.get_u32(),
                type_size: body.get_i16(),
                type_mod: body.get_i32(),
                format: PgFormat::from_code(body.get_u16())
                    .ok_or_else(|| ProtocolError::malformed("unknown format code"))?,
            });
        }
        Ok(Self { columns: columns.into() })
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name.as_ref() == name)
    }
}

/// A decoded `DataRow`: a description shared with every other row of the
/// same result, plus this row's field bytes.
pub struct Row {
    description: RowDescription,
    fields: Vec<Option<Bytes>>,
}

impl Row {
    pub fn decode(description: RowDescription, mut body: Bytes) -> Result<Self, ProtocolError> {
        if body.remaining() < 2 {
            return Err(ProtocolError::malformed("DataRow too short"));
        }
        let count = body.get_u16() as usize;
        let mut fields = Vec::with_capacity(count);
        for _ in 0..count {
            if body.remaining() < 4 {
                return Err(ProtocolError::malformed("DataRow field length truncated"));
            }
            let len = body.get_i32();
            if len < 0 {
                fields.push(None);
                continue;
            }
            let len = len as usize;
            if body.remaining() < len {
                return Err(ProtocolError::malformed("DataRow field truncated"));
            }
            fields.push(Some(body.split_to(len)));
        }
        Ok(Self { description, fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// O(1): a field's presence is known from its stored length alone.
    pub fn is_null(&self, index: impl ColumnIndex) -> Result<bool, RowError> {
        let idx = index.resolve(&self.description)?;
        Ok(self.fields[idx].is_none())
    }

    /// Consults the column's format code and OID, then dispatches to the
    /// type registry (C2).
    pub fn try_get<'a, T>(&'a self, index: impl ColumnIndex) -> Result<T, RowError>
    where
        T: BinaryDecode<'a>,
    {
        let idx = index.resolve(&self.description)?;
        let field = self.fields[idx].as_ref().ok_or(RowError::FieldIsNull { index: idx })?;
        let column = &self.description.columns[idx];
        if column.format != PgFormat::Binary {
            return Err(RowError::UnsupportedFormat { index: idx });
        }
        T::decode_binary(field).map_err(|source| RowError::Type { index: idx, source })
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Row").field("fields", &self.fields.len()).finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("no column named {name:?}")]
    ColumnNotFound { name: String },
    #[error("column index {index} out of bounds")]
    IndexOutOfBounds { index: usize },
    #[error("column {index} is NULL")]
    FieldIsNull { index: usize },
    #[error("column {index} is not in binary format")]
    UnsupportedFormat { index: usize },
    #[error("column {index}: {source}")]
    Type { index: usize, #[source] source: TypeError },
    #[error("expected exactly one row, found {found}")]
    TooManyRows { found: usize },
    #[error("expected exactly one row, found none")]
    NoRows,
}

/// Positional or named column lookup against a [`RowDescription`].
pub trait ColumnIndex {
    fn resolve(self, description: &RowDescription) -> Result<usize, RowError>;
}

impl ColumnIndex for usize {
    fn resolve(self, description: &RowDescription) -> Result<usize, RowError> {
        if self < description.columns.len() {
            Ok(self)
        } else {
            Err(RowError::IndexOutOfBounds { index: self })
        }
    }
}

impl ColumnIndex for &str {
    fn resolve(self, description: &RowDescription) -> Result<usize, RowError> {
        description.index_of(self).ok_or_else(|| RowError::ColumnNotFound { name: self.to_owned() })
    }
}

/// Decodes an entire row into an application type.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, RowError>;
}

macro_rules! from_row_tuple {
    ($($idx:tt : $name:ident),+) => {
        impl<$($name),+> FromRow for ($($name,)+)
        where
            $(for<'a> $name: BinaryDecode<'a>),+
        {
            fn from_row(row: &Row) -> Result<Self, RowError> {
                Ok(($(row.try_get::<$name>($idx)?,)+))
            }
        }
    };
}

from_row_tuple!(0: A);
from_row_tuple!(0: A, 1: B);
from_row_tuple!(0: A, 1: B, 2: C);
from_row_tuple!(0: A, 1: B, 2: C, 3: D);

#[cfg(test)]
mod test {
    use super::*;
    use bytes::{BufMut, BytesMut};

    fn description(names: &[&str]) -> RowDescription {
        let mut buf = BytesMut::new();
        buf.put_u16(names.len() as u16);
        for name in names {
            buf.put_slice(name.as_bytes());
            buf.put_u8(0);
            buf.put_u32(0);
            buf.put_i16(0);
            buf.put_u32(23);
            buf.put_i16(4);
            buf.put_i32(-1);
            buf.put_u16(1);
        }
        RowDescription::decode(buf.freeze()).unwrap()
    }

    fn data_row(values: &[Option<i32>]) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u16(values.len() as u16);
        for value in values {
            match value {
                Some(v) => {
                    buf.put_i32(4);
                    buf.put_i32(*v);
                }
                None => buf.put_i32(-1),
            }
        }
        buf.freeze()
    }

    #[test]
    fn reads_by_name_and_index() {
        let desc = description(&["a", "b"]);
        let row = Row::decode(desc, data_row(&[Some(1), Some(2)])).unwrap();
        assert_eq!(row.try_get::<i32>(0).unwrap(), 1);
        assert_eq!(row.try_get::<i32>("b").unwrap(), 2);
    }

    #[test]
    fn null_field_is_null_not_type_error() {
        let desc = description(&["a"]);
        let row = Row::decode(desc, data_row(&[None])).unwrap();
        assert!(row.is_null(0).unwrap());
        assert!(matches!(row.try_get::<i32>(0), Err(RowError::FieldIsNull { .. })));
    }

    #[test]
    fn unknown_column_name_errors() {
        let desc = description(&["a"]);
        let row = Row::decode(desc, data_row(&[Some(1)])).unwrap();
        assert!(matches!(row.try_get::<i32>("missing"), Err(RowError::ColumnNotFound { .. })));
    }
}
