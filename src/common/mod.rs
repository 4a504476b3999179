//! Supporting utility types.
mod bytestr;
mod url;

pub use bytestr::ByteStr;
pub use url::{ParseError, Scheme, Url};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

macro_rules! trace {
    ($($tt:tt)*) => {
        #[cfg(feature = "log-verbose")] log::trace!($($tt)*);
        #[cfg(feature = "verbose")] tracing::trace!($($tt)*);
    };
}

pub(crate) use trace;

macro_rules! warn_log {
    ($($tt:tt)*) => {
        {
            #[cfg(feature = "log-verbose")] log::warn!($($tt)*);
            #[cfg(feature = "verbose")] tracing::warn!($($tt)*);
            #[cfg(not(any(feature = "log-verbose", feature = "verbose")))]
            let _ = std::format_args!($($tt)*);
        }
    };
}

pub(crate) use warn_log;

macro_rules! general {
    ($($tt:tt)*) => {
        crate::common::GeneralError::new(format!($($tt)*))
    };
}

pub(crate) use general;

use std::borrow::Cow;

/// An error which only contains a string message.
///
/// Meant to be displayed, not pattern-matched on by callers.
pub struct GeneralError(Cow<'static, str>);

impl GeneralError {
    pub fn new(message: impl Into<Cow<'static, str>>) -> GeneralError {
        Self(message.into())
    }
}

impl std::error::Error for GeneralError {}

impl std::fmt::Display for GeneralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::fmt::Debug for GeneralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
