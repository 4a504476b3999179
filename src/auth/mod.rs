//! Authentication state machine (C4): cleartext, MD5, and SCRAM-SHA-256.
pub mod md5;
pub mod scram;

pub use scram::{ScramError, ScramSha256};
