//! Redis-backed transport
//!
//! `push` is `RPUSH`; `pop_rotate` is `BRPOPLPUSH queue queue timeout`.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Transport, effective_timeout};
use crate::config::RedisConfig;
use crate::error::TransportError;

/// Transport talking to a Redis server
///
/// The connection is opened lazily on first use. Pushes share one
/// multiplexed connection; each blocking pop gets its own so it cannot stall
/// other callers. A failed or unanswered push discards the shared connection
/// so the next call reconnects.
///
/// Every reply is bounded on the client side too: a push waits at most the
/// connect timeout, a bounded pop at most its own timeout plus the connect
/// timeout. An unresponsive server surfaces as [`TransportError::ReplyTimeout`].
pub struct RedisTransport {
    client: redis::Client,
    addr: String,
    connect_timeout: Duration,
    shared: Mutex<Option<MultiplexedConnection>>,
}

impl RedisTransport {
    /// Create a transport from connection settings (does not connect yet)
    pub fn new(config: &RedisConfig) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", config.host, config.port);
        debug!(%addr, db = config.db, "RedisTransport::new: called");

        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                db: config.db,
                password: config.password.clone().filter(|p| !p.is_empty()),
                ..Default::default()
            },
        };
        let client = redis::Client::open(info).map_err(|source| TransportError::Connect {
            addr: addr.clone(),
            source,
        })?;

        Ok(Self {
            client,
            addr,
            connect_timeout: config.connect_timeout(),
            shared: Mutex::new(None),
        })
    }

    /// Server address this transport talks to
    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> Result<MultiplexedConnection, TransportError> {
        debug!(addr = %self.addr, "RedisTransport::connect: called");
        match tokio::time::timeout(self.connect_timeout, self.client.get_multiplexed_async_connection()).await {
            Ok(Ok(conn)) => {
                debug!(addr = %self.addr, "RedisTransport::connect: connected");
                Ok(conn)
            }
            Ok(Err(source)) => Err(TransportError::Connect {
                addr: self.addr.clone(),
                source,
            }),
            Err(_) => Err(TransportError::ConnectTimeout {
                addr: self.addr.clone(),
                timeout: self.connect_timeout,
            }),
        }
    }

    async fn shared_connection(&self) -> Result<MultiplexedConnection, TransportError> {
        let mut shared = self.shared.lock().await;
        if let Some(conn) = shared.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.connect().await?;
        *shared = Some(conn.clone());
        Ok(conn)
    }

    async fn discard_shared(&self) {
        if self.shared.lock().await.take().is_some() {
            debug!(addr = %self.addr, "RedisTransport::discard_shared: dropped connection");
        }
    }

    fn reply_timeout(&self, command: &'static str, timeout: Duration) -> TransportError {
        TransportError::ReplyTimeout {
            addr: self.addr.clone(),
            command,
            timeout,
        }
    }
}

#[async_trait]
impl Transport for RedisTransport {
    async fn push(&self, queue: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        debug!(%queue, bytes = payload.len(), "RedisTransport::push: called");
        let mut conn = self.shared_connection().await?;

        let reply: Result<Result<i64, RedisError>, _> =
            tokio::time::timeout(self.connect_timeout, conn.rpush(queue, payload)).await;
        match reply {
            Ok(Ok(len)) => {
                debug!(%queue, %len, "RedisTransport::push: queued");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(addr = %self.addr, %queue, error = %e, "RedisTransport::push: failed");
                self.discard_shared().await;
                Err(e.into())
            }
            Err(_) => {
                warn!(addr = %self.addr, %queue, "RedisTransport::push: no reply");
                self.discard_shared().await;
                Err(self.reply_timeout("RPUSH", self.connect_timeout))
            }
        }
    }

    async fn pop_rotate(&self, queue: &str, timeout: Option<Duration>) -> Result<Option<Vec<u8>>, TransportError> {
        debug!(%queue, ?timeout, "RedisTransport::pop_rotate: called");
        let timeout = effective_timeout(timeout);
        // Redis reads a timeout of 0 as "block forever"
        let secs = timeout.map(|t| t.as_secs_f64()).unwrap_or(0.0);

        let mut conn = self.connect().await?;
        let mut cmd = redis::cmd("BRPOPLPUSH");
        cmd.arg(queue).arg(queue).arg(secs);
        let query = async {
            let value: Option<Vec<u8>> = cmd.query_async(&mut conn).await?;
            Ok::<_, RedisError>(value)
        };

        let value = match timeout {
            Some(t) => {
                let limit = t + self.connect_timeout;
                match tokio::time::timeout(limit, query).await {
                    Ok(reply) => reply?,
                    Err(_) => {
                        warn!(addr = %self.addr, %queue, ?limit, "RedisTransport::pop_rotate: no reply");
                        return Err(self.reply_timeout("BRPOPLPUSH", limit));
                    }
                }
            }
            None => query.await?,
        };

        if value.is_none() {
            debug!(%queue, "RedisTransport::pop_rotate: timed out");
        }
        Ok(value)
    }

    async fn close(&self) {
        debug!(addr = %self.addr, "RedisTransport::close: called");
        self.discard_shared().await;
    }
}
