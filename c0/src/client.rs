//! Command dispatch: the `Dispatch` capability and the direct `Client`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::bridge::BridgeManager;
use crate::config::Config;
use crate::container::ContainerManager;
use crate::envelope::{Arguments, Command, arguments_from};
use crate::error::ClientError;
use crate::handle::ResultHandle;
use crate::id::CorrelationId;
use crate::info::InfoManager;
use crate::transport::{RedisTransport, Transport};

/// Anything that can submit a command and hand back a result handle
///
/// Implemented by [`Client`] (pushes straight onto the executor inbox) and by
/// [`ContainerClient`](crate::container::ContainerClient) (routes through an
/// intermediary executor).
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Submit `command` with `arguments`; does not wait for execution
    async fn raw(&self, command: &str, arguments: Arguments) -> Result<ResultHandle, ClientError>;

    /// Build a handle for an ID this dispatcher did not necessarily submit
    fn response_for(&self, id: CorrelationId) -> ResultHandle;

    /// Run a process on the executor (`core.system`)
    ///
    /// `cmdline` is split with shell quoting rules; the first word is the
    /// program. Empty or unparseable input fails before anything is queued.
    async fn system(&self, cmdline: &str, options: SystemOptions) -> Result<ResultHandle, ClientError> {
        debug!(%cmdline, "Dispatch::system: called");
        let arguments = SystemArguments::parse(cmdline, options)?;
        self.raw("core.system", arguments_from(&arguments)?).await
    }

    /// Run a bash script on the executor (`bash`)
    async fn bash(&self, script: &str) -> Result<ResultHandle, ClientError> {
        debug!(script_len = script.len(), "Dispatch::bash: called");
        let mut arguments = Arguments::new();
        arguments.insert("stdin".to_string(), script.into());
        self.raw("bash", arguments).await
    }

    /// Host information queries
    fn info(&self) -> InfoManager<'_, Self>
    where
        Self: Sized,
    {
        InfoManager::new(self)
    }
}

/// Optional settings for [`Dispatch::system`]
#[derive(Debug, Clone, Default)]
pub struct SystemOptions {
    /// Working directory (empty for the executor's default)
    pub dir: String,

    /// Data written to the process's stdin
    pub stdin: String,

    /// Environment variables; `None` inherits the executor's environment
    pub env: Option<HashMap<String, String>>,
}

/// Wire arguments of `core.system`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemArguments {
    pub name: String,
    pub args: Vec<String>,
    pub dir: String,
    pub stdin: String,
    pub env: Option<HashMap<String, String>>,
}

impl SystemArguments {
    /// Split a command line into program and arguments
    pub fn parse(cmdline: &str, options: SystemOptions) -> Result<Self, ClientError> {
        let parts = shlex::split(cmdline)
            .ok_or_else(|| ClientError::InvalidArgument(format!("unparseable command: {}", cmdline)))?;
        let mut parts = parts.into_iter();
        let name = parts
            .next()
            .ok_or_else(|| ClientError::InvalidArgument("invalid command".to_string()))?;

        Ok(Self {
            name,
            args: parts.collect(),
            dir: options.dir,
            stdin: options.stdin,
            env: options.env,
        })
    }
}

/// Direct client: pushes command envelopes onto the executor's input queue
///
/// Cloning is cheap and shares the transport connection.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    input_queue: String,
    result_prefix: String,
    default_timeout: Duration,
}

impl Client {
    /// Create a client talking to the Redis server named in `config`
    ///
    /// The connection is opened on first use.
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        debug!(host = %config.redis.host, port = config.redis.port, "Client::new: called");
        let transport = RedisTransport::new(&config.redis)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Create a client over an explicit transport
    pub fn with_transport(transport: Arc<dyn Transport>, config: &Config) -> Self {
        debug!(input = %config.queue.input, "Client::with_transport: called");
        Self {
            transport,
            input_queue: config.queue.input.clone(),
            result_prefix: config.queue.result_prefix.clone(),
            default_timeout: config.timeouts.default_timeout(),
        }
    }

    /// Name of the executor inbox
    pub fn input_queue(&self) -> &str {
        &self.input_queue
    }

    /// Timeout handed to every new result handle
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Container management
    pub fn container(&self) -> ContainerManager<'_> {
        ContainerManager::new(self)
    }

    /// Bridge management
    pub fn bridge(&self) -> BridgeManager<'_> {
        BridgeManager::new(self)
    }

    /// Shut the client down, releasing the transport's shared connection
    ///
    /// Clones and outstanding handles share the transport; if they are used
    /// afterwards they open a fresh connection.
    pub async fn close(self) {
        info!(input = %self.input_queue, "Client::close: called");
        self.transport.close().await;
    }
}

#[async_trait]
impl Dispatch for Client {
    async fn raw(&self, command: &str, arguments: Arguments) -> Result<ResultHandle, ClientError> {
        debug!(%command, "Client::raw: called");
        if command.trim().is_empty() {
            return Err(ClientError::InvalidArgument("command must not be empty".to_string()));
        }

        let id = CorrelationId::new();
        let envelope = Command::new(id.clone(), command, arguments);
        self.transport.push(&self.input_queue, envelope.encode()?).await?;

        debug!(%id, %command, queue = %self.input_queue, "Client::raw: submitted");
        Ok(self.response_for(id))
    }

    fn response_for(&self, id: CorrelationId) -> ResultHandle {
        ResultHandle::new(self.transport.clone(), id, &self.result_prefix, self.default_timeout)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("input_queue", &self.input_queue)
            .field("result_prefix", &self.result_prefix)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}
