//! Connection options (spec.md §3, §6).
use crate::common::{Scheme, Url};

#[derive(Debug, Clone)]
pub struct PgOptions {
    /// Optional short identifier from a leading `alias=NAME=` prefix
    /// (spec.md §6); carries no connection semantics of its own, useful for
    /// a host distinguishing connections in logs.
    pub alias: Option<String>,
    pub host: String,
    pub port: u16,
    pub socket_path: Option<String>,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl PgOptions {
    pub fn parse(url: &str) -> Result<Self, crate::common::ParseError> {
        let url = Url::parse(url.to_owned())?;
        let alias = url.alias.as_ref().map(ToString::to_string);
        Ok(match url.scheme {
            Scheme::Socket => Self {
                alias,
                host: String::new(),
                port: url.port,
                socket_path: Some(url.host.to_string()),
                user: url.user.to_string(),
                password: url.pass.to_string(),
                database: url.dbname.to_string(),
            },
            Scheme::Tcp | Scheme::Ssl => Self {
                alias,
                host: url.host.to_string(),
                port: url.port,
                socket_path: None,
                user: url.user.to_string(),
                password: url.pass.to_string(),
                database: url.dbname.to_string(),
            },
        })
    }
}
