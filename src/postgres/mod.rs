//! The postgres wire protocol itself: message framing, type OIDs, and the
//! error taxonomy derived from `ErrorResponse` (C1, C2, C9).
pub mod backend;
mod error;
pub mod frontend;
mod pg_format;
mod pg_type;

pub use backend::{Authentication, BackendMessage, BackendProtocol};
pub use error::{DatabaseError, ErrorKind, ProtocolError};
pub use frontend::{FrontendProtocol, Startup};
pub use pg_format::PgFormat;
pub use pg_type::{Oid, PgType, Varchar};

#[cfg(feature = "json")]
pub use pg_type::Jsonb;
