//! The connection: transport + authentication + statement cache + query
//! dispatch, wired together (C3–C9).
mod config;

use std::collections::HashMap;

use bytes::Bytes;

pub use config::PgOptions;

use crate::Error;
use crate::auth::{ScramSha256, md5};
use crate::encode::{self, Param};
use crate::io::{Framed, PgTransport};
use crate::net::Socket;
use crate::postgres::backend::{
    Authentication, BackendKeyData, BackendMessage, CommandComplete, ParameterStatus, ReadyForQuery,
};
use crate::postgres::frontend::{
    Bind, Describe, Execute, PasswordMessage, Parse, Query, SaslInitialResponse, SaslResponse, Startup,
    Sync as SyncMsg,
};
use crate::postgres::{PgFormat, ProtocolError};
use crate::row::{Row, RowDescription};
use crate::statement::PreparedStatementCache;
use crate::transaction::Transaction;

/// A single PostgreSQL connection, driving exactly one command at a time
/// (spec.md §5 scheduling model).
pub struct Connection {
    stream: Framed<Socket>,
    user: String,
    process_id: i32,
    secret_key: i32,
    parameters: HashMap<String, String>,
    stmts: PreparedStatementCache,
    tx_status: u8,
    /// The one rollback statement owed to the server because a transaction
    /// or savepoint guard was dropped without an explicit commit/release,
    /// queued (but not awaited, since async `Drop` doesn't exist) until the
    /// next real operation. A new abandonment always overwrites rather than
    /// accumulates: per spec.md §4.7/§8 property 8, a single failure walking
    /// up through several nested, simultaneously-abandoned guards must still
    /// produce exactly one wire-level rollback, at the shallowest ancestor —
    /// the outermost guard to abandon in one unwind always subsumes any
    /// inner rollback already pending, since rolling back further out undoes
    /// the inner work too.
    pending_rollback: Option<String>,
}

impl Connection {
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let options = PgOptions::parse(url).map_err(|e| Error::Configuration(Box::new(e)))?;
        Self::connect_with(options).await
    }

    pub async fn connect_with(options: PgOptions) -> Result<Self, Error> {
        let socket = match &options.socket_path {
            Some(path) => Socket::connect_unix(path).await?,
            None => Socket::connect_tcp(&options.host, options.port).await?,
        };
        let mut stream = Framed::new(socket);

        stream.queue_startup(Startup { user: &options.user, database: &options.database, replication: None });
        stream.flush().await?;

        authenticate(&mut stream, &options.user, &options.password).await?;

        let mut parameters = HashMap::new();
        let (process_id, secret_key) = collect_startup_responses(&mut stream, &mut parameters).await?;

        Ok(Self {
            stream,
            user: options.user,
            process_id,
            secret_key,
            parameters,
            stmts: PreparedStatementCache::new(),
            tx_status: b'I',
            pending_rollback: None,
        })
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn backend_key_data(&self) -> (i32, i32) {
        (self.process_id, self.secret_key)
    }

    pub fn is_idle(&self) -> bool {
        self.tx_status == b'I'
    }

    /// Records that `sql` is owed to the server because a transaction or
    /// savepoint guard was dropped without an explicit commit/release.
    /// Overwrites any rollback already pending rather than queuing a second
    /// one: called from the innermost abandoned guard outward during a
    /// single unwind, so the last (outermost) call always wins, matching
    /// spec.md §8 property 8's "exactly one rollback per failure". Used by
    /// [`Transaction`] and [`crate::transaction::Savepoint`]'s `Drop`, which
    /// can't await (see [`drain_pending`](Self::drain_pending)).
    pub(crate) fn abandon(&mut self, sql: String) {
        self.pending_rollback = Some(sql);
    }

    /// Flushes and absorbs the result of any rollback recorded by
    /// [`abandon`](Self::abandon), before this connection is used for
    /// anything else.
    async fn drain_pending(&mut self) -> Result<(), Error> {
        let Some(sql) = self.pending_rollback.take() else {
            return Ok(());
        };
        self.stream.send(Query { sql: &sql }).await?;
        self.drain_query_results().await?;
        Ok(())
    }

    /// Runs `sql` through the simple query protocol, collecting every row
    /// of (at most) its one result set.
    pub async fn simple_query(&mut self, sql: &str) -> Result<Vec<Row>, Error> {
        self.drain_pending().await?;
        self.stream.send(Query { sql }).await?;
        self.drain_query_results().await
    }

    /// `execute` without a result set (e.g. DDL, DML without `RETURNING`).
    pub async fn simple_execute(&mut self, sql: &str) -> Result<(), Error> {
        self.simple_query(sql).await?;
        Ok(())
    }

    /// Registers `name` for `sql` (spec.md §4.5). Fails without touching the
    /// wire if `name` is already registered for different text.
    pub async fn prepare(&mut self, name: &str, sql: &str, oids: &[u32]) -> Result<(), Error> {
        self.drain_pending().await?;
        if self.stmts.contains(name) {
            self.stmts.insert(name, sql, oids.to_vec())?;
            return Ok(());
        }

        self.stream.queue(Parse { prepare_name: name, sql, oids_len: oids.len() as u16, oids: oids.iter().copied() });
        self.stream.queue(Describe { kind: b'S', name });
        self.stream.queue(SyncMsg);
        self.stream.flush().await?;

        self.stream.expect::<crate::postgres::backend::ParseComplete>().await?;
        let description = self.read_statement_description().await?;
        self.stream.ready_request().await?;

        self.stmts.insert(name, sql, oids.to_vec())?;
        if let Some(description) = description {
            self.stmts.set_description(name, description);
        }
        Ok(())
    }

    async fn read_statement_description(&mut self) -> Result<Option<RowDescription>, Error> {
        loop {
            match self.stream.recv_message().await? {
                BackendMessage::ParameterDescription(_) => continue,
                BackendMessage::RowDescription(raw) => return Ok(Some(RowDescription::decode(raw.body)?)),
                BackendMessage::NoData(_) => return Ok(None),
                BackendMessage::ReadyForQuery(rfq) => {
                    self.tx_status = rfq.tx_status;
                    return Ok(None);
                }
                _ => continue,
            }
        }
    }

    /// Binds the unnamed portal to the already-`prepare`d statement `name`
    /// with `params`, executes it to completion, and returns its rows
    /// (spec.md §3's `Execute(name, params)` command, §4.5). `name` must
    /// already be registered via [`prepare`](Self::prepare) — for one-shot
    /// SQL that was never separately prepared, use
    /// [`execute_inline`](Self::execute_inline) instead.
    pub async fn execute<P: Param>(&mut self, name: &str, params: P) -> Result<Vec<Row>, Error> {
        self.drain_pending().await?;
        if !self.stmts.contains(name) {
            return Err(crate::statement::StatementError::UnknownStatement { name: name.to_owned() }.into());
        }

        let (formats, values, _oids) = encode::marshal(params);

        self.stream.queue(Bind {
            portal_name: "",
            stmt_name: name,
            param_formats_len: formats.len() as u16,
            param_formats: formats,
            params_len: values.len() as u16,
            params_size_hint: values.iter().map(bytes::Buf::remaining).sum(),
            params: values,
            result_formats_len: 1,
            result_formats: [PgFormat::Binary],
        });
        self.stream.queue(Describe { kind: b'P', name: "" });
        self.stream.queue(Execute { portal_name: "", max_row: 0 });
        self.stream.queue(SyncMsg);
        self.stream.flush().await?;

        self.stream.expect::<crate::postgres::backend::BindComplete>().await?;

        let description = self.stmts.get(name).and_then(|s| s.description.clone());
        self.drain_bound_results(description).await
    }

    /// Parses, binds, and executes `sql` through the unnamed statement and
    /// portal in a single round trip, without registering anything in the
    /// prepared-statement cache (spec.md §3's `ExecuteInline(text, params)`
    /// command — the one-shot counterpart to `prepare` + `execute` for
    /// callers that don't want to name and cache a statement for SQL run
    /// only once or a few times).
    pub async fn execute_inline<P: Param>(&mut self, sql: &str, params: P) -> Result<Vec<Row>, Error> {
        self.drain_pending().await?;

        let (formats, values, oids) = encode::marshal(params);

        self.stream.queue(Parse { prepare_name: "", sql, oids_len: oids.len() as u16, oids: oids.iter().copied() });
        self.stream.queue(Bind {
            portal_name: "",
            stmt_name: "",
            param_formats_len: formats.len() as u16,
            param_formats: formats,
            params_len: values.len() as u16,
            params_size_hint: values.iter().map(bytes::Buf::remaining).sum(),
            params: values,
            result_formats_len: 1,
            result_formats: [PgFormat::Binary],
        });
        self.stream.queue(Describe { kind: b'P', name: "" });
        self.stream.queue(Execute { portal_name: "", max_row: 0 });
        self.stream.queue(SyncMsg);
        self.stream.flush().await?;

        self.stream.expect::<crate::postgres::backend::ParseComplete>().await?;
        self.stream.expect::<crate::postgres::backend::BindComplete>().await?;

        self.drain_bound_results(None).await
    }

    async fn drain_query_results(&mut self) -> Result<Vec<Row>, Error> {
        let mut description = None;
        let mut rows = Vec::new();
        loop {
            match self.stream.recv_message().await? {
                BackendMessage::RowDescription(raw) => description = Some(RowDescription::decode(raw.body)?),
                BackendMessage::DataRow(raw) => {
                    let description = description.clone().ok_or_else(|| ProtocolError::unexpected_phase(b'D', "simple query"))?;
                    rows.push(Row::decode(description, raw.body)?);
                }
                BackendMessage::CommandComplete(CommandComplete { .. }) => {}
                BackendMessage::EmptyQueryResponse(_) => {}
                BackendMessage::ReadyForQuery(rfq) => {
                    self.tx_status = rfq.tx_status;
                    return Ok(rows);
                }
                _ => {}
            }
        }
    }

    async fn drain_bound_results(&mut self, mut description: Option<RowDescription>) -> Result<Vec<Row>, Error> {
        let mut rows = Vec::new();
        loop {
            match self.stream.recv_message().await? {
                BackendMessage::RowDescription(raw) => description = Some(RowDescription::decode(raw.body)?),
                BackendMessage::DataRow(raw) => {
                    let description = description.clone().ok_or_else(|| ProtocolError::unexpected_phase(b'D', "extended query"))?;
                    rows.push(Row::decode(description, raw.body)?);
                }
                BackendMessage::CommandComplete(_) | BackendMessage::PortalSuspended(_) | BackendMessage::NoData(_) => {}
                BackendMessage::ReadyForQuery(rfq) => {
                    self.tx_status = rfq.tx_status;
                    return Ok(rows);
                }
                _ => {}
            }
        }
    }

    /// Issues `DEALLOCATE name` and forgets the statement (spec.md §4.5).
    pub async fn deallocate(&mut self, name: &str) -> Result<(), Error> {
        self.simple_execute(&format!("DEALLOCATE {}", crate::command::quote_ident(name))).await?;
        self.stmts.remove(name);
        Ok(())
    }

    /// Begins a nested transaction, returning an RAII guard that commits on
    /// [`Transaction::commit`] or rolls back on drop (spec.md §4.7, §9).
    pub async fn begin(&mut self) -> Result<Transaction<'_>, Error> {
        self.begin_with(crate::command::TransactionMode::default()).await
    }

    pub async fn begin_with(&mut self, mode: crate::command::TransactionMode) -> Result<Transaction<'_>, Error> {
        self.simple_execute(&mode.begin_sql()).await?;
        Ok(Transaction::new(self))
    }
}

impl PgTransport for Connection {
    async fn recv_message(&mut self) -> Result<BackendMessage, Error> {
        let msg = self.stream.recv_message().await?;
        if let BackendMessage::ReadyForQuery(rfq) = &msg {
            self.tx_status = rfq.tx_status;
        }
        Ok(msg)
    }

    async fn expect<B: crate::postgres::BackendProtocol>(&mut self) -> Result<B, Error> {
        self.stream.expect::<B>().await
    }

    fn queue<F: crate::postgres::FrontendProtocol>(&mut self, msg: F) {
        self.stream.queue(msg);
    }

    async fn flush(&mut self) -> Result<(), Error> {
        self.stream.flush().await
    }
}

async fn collect_startup_responses(
    stream: &mut Framed<Socket>,
    parameters: &mut HashMap<String, String>,
) -> Result<(i32, i32), Error> {
    let mut backend_key = (0, 0);
    loop {
        match stream.recv_message().await? {
            BackendMessage::ParameterStatus(ParameterStatus { name, value }) => {
                parameters.insert(name.to_string(), value.to_string());
            }
            BackendMessage::BackendKeyData(BackendKeyData { process_id, secret_key }) => {
                backend_key = (process_id, secret_key);
            }
            BackendMessage::ReadyForQuery(ReadyForQuery { .. }) => return Ok(backend_key),
            _ => {}
        }
    }
}

async fn authenticate(stream: &mut Framed<Socket>, user: &str, password: &str) -> Result<(), Error> {
    loop {
        match stream.expect::<Authentication>().await? {
            Authentication::Ok => return Ok(()),
            Authentication::CleartextPassword => {
                stream.send(PasswordMessage { password }).await?;
            }
            Authentication::MD5Password { salt } => {
                let hashed = md5::encode(user, password, salt);
                stream.send(PasswordMessage { password: &hashed }).await?;
            }
            Authentication::SASL { mechanisms } => {
                if !mechanisms.iter().any(|m| m == ScramSha256::MECHANISM) {
                    return Err(Error::InvalidState("server does not offer SCRAM-SHA-256".to_owned()));
                }
                let mut scram = ScramSha256::new(user, password);
                let first = scram.client_first_message();
                stream
                    .send(SaslInitialResponse { mechanism: ScramSha256::MECHANISM, data: first.as_bytes() })
                    .await?;
                run_scram(stream, &mut scram).await?;
            }
            Authentication::SASLContinue { .. } | Authentication::SASLFinal { .. } => {
                return Err(ProtocolError::unexpected_phase(b'R', "authentication").into());
            }
        }
    }
}

async fn run_scram(stream: &mut Framed<Socket>, scram: &mut ScramSha256) -> Result<(), Error> {
    let server_first = match stream.expect::<Authentication>().await? {
        Authentication::SASLContinue { data } => decode_sasl(data)?,
        _ => return Err(ProtocolError::unexpected_phase(b'R', "SCRAM continue").into()),
    };
    let client_final = scram
        .handle_server_first(&server_first)
        .map_err(|e| Error::InvalidState(e.to_string()))?;
    stream.send(SaslResponse { data: client_final.as_bytes() }).await?;

    let server_final = match stream.expect::<Authentication>().await? {
        Authentication::SASLFinal { data } => decode_sasl(data)?,
        _ => return Err(ProtocolError::unexpected_phase(b'R', "SCRAM final").into()),
    };
    scram
        .handle_server_final(&server_final)
        .map_err(|_| Error::InvalidState("SCRAM server signature mismatch".to_owned()))
}

fn decode_sasl(data: Bytes) -> Result<String, Error> {
    String::from_utf8(data.to_vec()).map_err(|e| ProtocolError::malformed(e).into())
}
