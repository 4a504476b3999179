/// Postgres data transmission format.
///
/// For specific information, see the variant documentation.
///
/// This library uses [`Binary`][Self::Binary] for every parameter and every
/// returned column, except the `Vec<String>` batch-insert expansion (see
/// [`crate::encode`]), which uses [`Text`][Self::Text] per element.
///
/// <https://www.postgresql.org/docs/current/protocol-overview.html#PROTOCOL-FORMAT-CODES>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgFormat {
    /// Text has format code zero.
    ///
    /// There is no trailing nul character in the transmitted representation;
    /// the frontend must add one if it wants to process the value as a C
    /// string. The text format does not allow embedded nuls.
    Text,
    /// Binary has format code one.
    ///
    /// Binary representations for integers use network byte order (most
    /// significant byte first). Binary representations for complex types
    /// might change across server versions.
    Binary,
}

impl PgFormat {
    /// Returns the wire format code for this format.
    pub const fn format_code(self) -> u16 {
        match self {
            PgFormat::Text => 0,
            PgFormat::Binary => 1,
        }
    }

    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(PgFormat::Text),
            1 => Some(PgFormat::Binary),
            _ => None,
        }
    }
}
