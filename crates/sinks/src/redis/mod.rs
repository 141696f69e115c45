//! Redis Sink - RPUSH batches onto a list
//!
//! Each batch becomes a single `RPUSH <key> <event>...` command, so a
//! batch is appended atomically and in order.
//!
//! # Connection handling
//!
//! - Connects lazily on the first batch, bounded by `connection_timeout`
//! - Sends `AUTH` when a password is configured and `SELECT` for a
//!   non-zero database
//! - Each write and reply is bounded by `socket_timeout`
//! - Any I/O or protocol failure drops the connection; the next batch
//!   reconnects, so a failure never poisons the sink
//! - An error reply (`-ERR ...`) is returned as `SinkError::Rejected`
//!   and keeps the connection
//!
//! # Example
//!
//! ```ignore
//! let sink = RedisSink::new("orders", RedisConfig::with_key("orders-logs"));
//! sink.push_batch(&[Bytes::from_static(b"hello")]).await?;
//! sink.disconnect().await;
//! ```

pub mod resp;

use std::io::ErrorKind;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use redlog_config::RedisConfig;
use redlog_metrics::SinkMetrics;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::{Event, Sink, SinkError, SinkMetricsHandle};
use resp::{Reply, encode_command, read_reply};

type Connection = BufReader<TcpStream>;

/// Redis list sink
pub struct RedisSink {
    name: String,
    config: RedisConfig,
    address: String,
    connection: Mutex<Option<Connection>>,
    metrics: Arc<SinkMetrics>,
}

impl RedisSink {
    /// Create a sink; no connection is made until the first batch
    pub fn new(name: impl Into<String>, config: RedisConfig) -> Self {
        let address = config.address();
        Self {
            name: name.into(),
            config,
            address,
            connection: Mutex::new(None),
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    /// Destination key
    pub fn key(&self) -> &str {
        self.config.key_str()
    }

    /// Get reference to metrics
    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    /// Get a metrics handle that outlives the sink
    pub fn metrics_handle(&self) -> SinkMetricsHandle {
        SinkMetricsHandle::new(self.name.clone(), Arc::clone(&self.metrics))
    }

    /// Whether a connection is currently open
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// Close the connection, if any
    ///
    /// The next batch reconnects.
    pub async fn disconnect(&self) {
        let mut conn = self.connection.lock().await;
        if let Some(mut stream) = conn.take() {
            if let Err(e) = stream.get_mut().shutdown().await {
                tracing::debug!(sink = %self.name, error = %e, "error closing redis connection");
            }
            tracing::debug!(sink = %self.name, address = %self.address, "disconnected from redis");
        }
    }

    async fn connect(&self) -> Result<Connection, SinkError> {
        let stream = match timeout(
            self.config.connection_timeout,
            TcpStream::connect(&self.address),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(SinkError::Connection {
                    target: self.address.clone(),
                    source: e,
                });
            }
            Err(_) => {
                return Err(SinkError::Connection {
                    target: self.address.clone(),
                    source: std::io::Error::new(ErrorKind::TimedOut, "connection timed out"),
                });
            }
        };

        // Non-fatal, batches are written in one go anyway
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(sink = %self.name, error = %e, "failed to set TCP_NODELAY");
        }

        let mut conn = BufReader::new(stream);

        if let Some(password) = &self.config.password {
            self.expect_ok(&mut conn, &[&b"AUTH"[..], password.as_bytes()], "AUTH")
                .await?;
        }

        if self.config.database != 0 {
            let db = self.config.database.to_string();
            self.expect_ok(&mut conn, &[&b"SELECT"[..], db.as_bytes()], "SELECT")
                .await?;
        }

        self.metrics.record_connect();
        tracing::debug!(
            sink = %self.name,
            address = %self.address,
            database = self.config.database,
            "connected to redis"
        );

        Ok(conn)
    }

    async fn expect_ok(
        &self,
        conn: &mut Connection,
        args: &[&[u8]],
        operation: &'static str,
    ) -> Result<(), SinkError> {
        match self.round_trip(conn, args, operation).await? {
            Reply::Simple(_) => Ok(()),
            Reply::Error(msg) => Err(SinkError::Rejected(format!("{operation}: {msg}"))),
            other => Err(SinkError::protocol(format!(
                "unexpected {operation} reply: {other:?}"
            ))),
        }
    }

    async fn round_trip<A: AsRef<[u8]>>(
        &self,
        conn: &mut Connection,
        args: &[A],
        operation: &'static str,
    ) -> Result<Reply, SinkError> {
        let mut buf = BytesMut::new();
        encode_command(args, &mut buf);

        let socket_timeout = self.config.socket_timeout;

        timeout(socket_timeout, async {
            let stream = conn.get_mut();
            stream.write_all(&buf).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| SinkError::timeout(operation))??;

        timeout(socket_timeout, read_reply(conn))
            .await
            .map_err(|_| SinkError::timeout(operation))?
    }

    async fn rpush(&self, conn: &mut Connection, events: &[Event]) -> Result<i64, SinkError> {
        let mut args: Vec<&[u8]> = Vec::with_capacity(events.len() + 2);
        args.push(b"RPUSH");
        args.push(self.key().as_bytes());
        args.extend(events.iter().map(|e| &e[..]));

        match self.round_trip(conn, &args, "RPUSH").await? {
            Reply::Integer(len) => Ok(len),
            Reply::Error(msg) => Err(SinkError::Rejected(msg)),
            other => Err(SinkError::protocol(format!(
                "unexpected RPUSH reply: {other:?}"
            ))),
        }
    }
}

#[async_trait]
impl Sink for RedisSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push_batch(&self, events: &[Event]) -> Result<(), SinkError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut guard = self.connection.lock().await;

        let connection = match guard.take() {
            Some(conn) => Ok(conn),
            None => self.connect().await,
        };

        let result = match connection {
            Ok(mut conn) => {
                let result = self.rpush(&mut conn, events).await;
                // Unknown stream state after a connection error, start over
                // on the next batch
                let healthy = match &result {
                    Ok(_) => true,
                    Err(e) => !e.is_connection_error(),
                };
                if healthy {
                    *guard = Some(conn);
                }
                result
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(list_len) => {
                let bytes: usize = events.iter().map(|e| e.len()).sum();
                self.metrics.record_sent(events.len() as u64, bytes as u64);
                tracing::trace!(
                    sink = %self.name,
                    events = events.len(),
                    list_len,
                    "batch pushed"
                );
                Ok(())
            }
            Err(e) => {
                self.metrics.record_failed();
                Err(e)
            }
        }
    }

    async fn close(&self) {
        self.disconnect().await;
    }
}
