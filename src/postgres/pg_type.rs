//! Fixed table of built-in OIDs (spec.md §4.2 — C2 type registry).

/// PostgreSQL Object Identifier.
pub type Oid = u32;

/// Maps a Rust type to the PostgreSQL OID it is sent/received as.
pub trait PgType {
    const OID: Oid;

    /// OID of the 1-D array type whose element is `Self`, when one exists.
    const ARRAY_OID: Oid = 0;
}

impl PgType for bool {
    const OID: Oid = 16;
    const ARRAY_OID: Oid = 1000;
}

impl PgType for i16 {
    const OID: Oid = 21;
    const ARRAY_OID: Oid = 1005;
}

impl PgType for i32 {
    const OID: Oid = 23;
    const ARRAY_OID: Oid = 1007;
}

impl PgType for i64 {
    const OID: Oid = 20;
    const ARRAY_OID: Oid = 1016;
}

impl PgType for f32 {
    const OID: Oid = 700;
    const ARRAY_OID: Oid = 1021;
}

impl PgType for f64 {
    const OID: Oid = 701;
    const ARRAY_OID: Oid = 1022;
}

impl PgType for str {
    const OID: Oid = 25;
    const ARRAY_OID: Oid = 1009;
}

impl PgType for String {
    const OID: Oid = 25;
    const ARRAY_OID: Oid = 1009;
}

impl PgType for [u8] {
    const OID: Oid = 17;
    const ARRAY_OID: Oid = 1001;
}

impl PgType for Vec<u8> {
    const OID: Oid = 17;
    const ARRAY_OID: Oid = 1001;
}

/// varchar, distinct OID from `text` but same wire representation.
pub struct Varchar;

impl PgType for Varchar {
    const OID: Oid = 1043;
    const ARRAY_OID: Oid = 1015;
}

#[cfg(feature = "uuid")]
impl PgType for uuid::Uuid {
    const OID: Oid = 2950;
    const ARRAY_OID: Oid = 2951;
}

#[cfg(feature = "time")]
impl PgType for time::PrimitiveDateTime {
    /// timestamp without time zone
    const OID: Oid = 1114;
    const ARRAY_OID: Oid = 1115;
}

#[cfg(feature = "time")]
impl PgType for time::OffsetDateTime {
    /// timestamp with time zone
    const OID: Oid = 1184;
    const ARRAY_OID: Oid = 1185;
}

#[cfg(feature = "json")]
pub struct Jsonb;

#[cfg(feature = "json")]
impl PgType for Jsonb {
    const OID: Oid = 3802;
    const ARRAY_OID: Oid = 3807;
}
