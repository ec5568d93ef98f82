//! Containers (`corex.*`) and nested dispatch into a container
//!
//! Dispatching into a container takes two hops:
//! 1. `corex.dispatch` asks the host executor to schedule the inner command
//!    inside the container; its result `data` is the JSON-encoded
//!    correlation ID the container assigned.
//! 2. The caller waits on that second ID like any other result.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{Client, Dispatch};
use crate::envelope::{Arguments, arguments_from};
use crate::error::{ClientError, DecodeError};
use crate::handle::ResultHandle;
use crate::id::CorrelationId;

/// Identifies the intermediary executor a nested command is routed through
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    /// Numeric container ID as assigned by `corex.create`
    Id(u16),
    Name(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Id(id) => write!(f, "{}", id),
            Target::Name(name) => f.write_str(name),
        }
    }
}

impl From<u16> for Target {
    fn from(id: u16) -> Self {
        Target::Id(id)
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Target::Name(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Target::Name(name)
    }
}

#[derive(Serialize)]
struct InnerCommand<'a> {
    command: &'a str,
    arguments: &'a Arguments,
}

#[derive(Serialize)]
struct DispatchArguments<'a> {
    container: &'a Target,
    command: InnerCommand<'a>,
}

/// Dispatcher that runs commands inside a container
///
/// Wraps any other dispatcher, so containers can be nested.
#[derive(Debug, Clone)]
pub struct ContainerClient<D: Dispatch = Client> {
    inner: D,
    target: Target,
    timeout: Option<Duration>,
}

impl<D: Dispatch> ContainerClient<D> {
    pub fn new(inner: D, target: impl Into<Target>) -> Self {
        let target = target.into();
        debug!(container = %target, "ContainerClient::new: called");
        Self {
            inner,
            target,
            timeout: None,
        }
    }

    /// Wait this long for the dispatch hop instead of the inner default
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The dispatcher the outer `corex.dispatch` goes through
    pub fn inner(&self) -> &D {
        &self.inner
    }
}

#[async_trait]
impl<D: Dispatch> Dispatch for ContainerClient<D> {
    async fn raw(&self, command: &str, arguments: Arguments) -> Result<ResultHandle, ClientError> {
        debug!(container = %self.target, %command, "ContainerClient::raw: called");
        let outer_arguments = arguments_from(&DispatchArguments {
            container: &self.target,
            command: InnerCommand {
                command,
                arguments: &arguments,
            },
        })?;

        let mut outer = self.inner.raw("corex.dispatch", outer_arguments).await?;
        if let Some(timeout) = self.timeout {
            outer = outer.with_default_timeout(timeout);
        }

        let result = outer.require(&format!("dispatch command to container {}", self.target)).await?;
        if !result.is_success() {
            warn!(container = %self.target, state = %result.state(), "ContainerClient::raw: dispatch refused");
            return Err(ClientError::Dispatch {
                target: self.target.to_string(),
                message: result.data().unwrap_or_default().to_string(),
            });
        }

        let inner_id: CorrelationId = result.json().map_err(|source| DecodeError {
            channel: outer.channel().to_string(),
            source,
        })?;
        debug!(container = %self.target, %inner_id, "ContainerClient::raw: dispatched");
        Ok(self.inner.response_for(inner_id))
    }

    fn response_for(&self, id: CorrelationId) -> ResultHandle {
        self.inner.response_for(id)
    }
}

/// Network settings of a new container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Network {
    /// ZeroTier network to join
    pub zerotier: Option<String>,

    /// Bridges to attach to
    pub bridge: Vec<String>,
}

/// Wire arguments of `corex.create`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerCreateArguments {
    /// URL of the container's root filesystem plist
    pub plist: String,

    /// Host path -> container path
    pub mount: HashMap<String, String>,

    pub network: Network,
}

impl ContainerCreateArguments {
    pub fn new(plist: impl Into<String>) -> Self {
        Self {
            plist: plist.into(),
            ..Default::default()
        }
    }
}

/// A running container as reported by `corex.list`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerInfo {
    pub arguments: ContainerCreateArguments,
    pub root: String,
    pub pid: i64,
}

/// Container lifecycle on the host executor
pub struct ContainerManager<'a> {
    client: &'a Client,
}

impl<'a> ContainerManager<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Create a container, returning its ID
    pub async fn create(&self, arguments: &ContainerCreateArguments) -> Result<u16, ClientError> {
        debug!(plist = %arguments.plist, "ContainerManager::create: called");
        let handle = self.client.raw("corex.create", arguments_from(arguments)?).await?;
        handle.expect_json("create container").await
    }

    /// List running containers keyed by ID
    pub async fn list(&self) -> Result<HashMap<u16, ContainerInfo>, ClientError> {
        debug!("ContainerManager::list: called");
        let handle = self.client.raw("corex.list", Arguments::new()).await?;
        let containers: Option<HashMap<u16, ContainerInfo>> = handle.expect_json("list containers").await?;
        Ok(containers.unwrap_or_default())
    }

    pub async fn terminate(&self, container: u16) -> Result<(), ClientError> {
        debug!(%container, "ContainerManager::terminate: called");
        let mut arguments = Arguments::new();
        arguments.insert("container".to_string(), container.into());
        let handle = self.client.raw("corex.terminate", arguments).await?;
        handle.expect_success("terminate container").await?;
        Ok(())
    }

    /// Dispatcher that runs commands inside `container`
    pub fn client(&self, container: impl Into<Target>) -> ContainerClient<Client> {
        ContainerClient::new(self.client.clone(), container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::envelope::State;
    use crate::mock::answer_next;
    use crate::transport::MemoryTransport;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn client(transport: &MemoryTransport) -> Client {
        Client::with_transport(Arc::new(transport.clone()), &Config::default())
    }

    #[test]
    fn test_target_serializes_untagged() {
        assert_eq!(serde_json::to_value(Target::from(3u16)).unwrap(), json!(3));
        assert_eq!(serde_json::to_value(Target::from("c1")).unwrap(), json!("c1"));
        assert_eq!(Target::from(3u16).to_string(), "3");
    }

    #[tokio::test]
    async fn test_nested_dispatch_returns_inner_handle() {
        let transport = MemoryTransport::new();
        let client = client(&transport);
        let executor = tokio::spawn(answer_next(transport.clone(), State::Success, Some(r#""inner-id-123""#)));

        let nested = client.container().client("container-1");
        let handle = nested.raw("info.os", Arguments::new()).await.unwrap();
        let outer = executor.await.unwrap();

        assert_eq!(handle.id().as_str(), "inner-id-123");
        assert_eq!(handle.channel(), "result:inner-id-123");
        assert_eq!(outer.command, "corex.dispatch");
        assert_eq!(
            Value::Object(outer.arguments),
            json!({"container": "container-1", "command": {"command": "info.os", "arguments": {}}})
        );
    }

    #[tokio::test]
    async fn test_nested_dispatch_refused() {
        let transport = MemoryTransport::new();
        let client = client(&transport);
        let executor = tokio::spawn(answer_next(transport.clone(), State::Error, Some("container not found")));

        let err = client.container().client(9u16).bash("ls").await.unwrap_err();
        executor.await.unwrap();

        assert!(matches!(err, ClientError::Dispatch { .. }));
        assert!(err.to_string().contains("container not found"));
    }

    #[tokio::test]
    async fn test_nested_dispatch_undecodable_id() {
        let transport = MemoryTransport::new();
        let client = client(&transport);
        let executor = tokio::spawn(answer_next(transport.clone(), State::Success, Some("not-json")));

        let err = client.container().client(1u16).bash("ls").await.unwrap_err();
        executor.await.unwrap();

        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn test_nested_dispatch_timeout() {
        let transport = MemoryTransport::new();
        let client = client(&transport);

        let nested = client.container().client(1u16).with_timeout(Duration::from_millis(50));
        let err = nested.bash("ls").await.unwrap_err();

        assert!(matches!(err, ClientError::NoResult { .. }));
    }

    #[tokio::test]
    async fn test_create_sends_plist_and_network() {
        let transport = MemoryTransport::new();
        let client = client(&transport);
        let executor = tokio::spawn(answer_next(transport.clone(), State::Success, Some("5")));

        let mut arguments = ContainerCreateArguments::new("https://hub/ubuntu.flist");
        arguments.mount.insert("/opt".to_string(), "/opt".to_string());
        arguments.network.bridge.push("br0".to_string());

        let id = client.container().create(&arguments).await.unwrap();
        let cmd = executor.await.unwrap();

        assert_eq!(id, 5);
        assert_eq!(cmd.command, "corex.create");
        assert_eq!(
            Value::Object(cmd.arguments),
            json!({
                "plist": "https://hub/ubuntu.flist",
                "mount": {"/opt": "/opt"},
                "network": {"zerotier": null, "bridge": ["br0"]}
            })
        );
    }

    #[tokio::test]
    async fn test_create_failure_echoes_diagnostic() {
        let transport = MemoryTransport::new();
        let client = client(&transport);
        let executor = tokio::spawn(answer_next(transport.clone(), State::Error, Some("disk full")));

        let err = client
            .container()
            .create(&ContainerCreateArguments::new("https://hub/x.flist"))
            .await
            .unwrap_err();
        executor.await.unwrap();

        assert!(err.to_string().contains("create container"));
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn test_list_decodes_containers() {
        let transport = MemoryTransport::new();
        let client = client(&transport);
        let executor = tokio::spawn(answer_next(
            transport.clone(),
            State::Success,
            Some(r#"{"1": {"arguments": {"plist": "p"}, "root": "/mnt/1", "pid": 42}}"#),
        ));

        let containers = client.container().list().await.unwrap();
        executor.await.unwrap();

        assert_eq!(containers.len(), 1);
        assert_eq!(containers[&1u16].pid, 42);
        assert_eq!(containers[&1u16].arguments.plist, "p");
    }

    #[tokio::test]
    async fn test_list_with_null_data_is_empty() {
        let transport = MemoryTransport::new();
        let client = client(&transport);
        let executor = tokio::spawn(answer_next(transport.clone(), State::Success, None));

        let containers = client.container().list().await.unwrap();
        executor.await.unwrap();

        assert!(containers.is_empty());
    }

    #[tokio::test]
    async fn test_terminate() {
        let transport = MemoryTransport::new();
        let client = client(&transport);
        let executor = tokio::spawn(answer_next(transport.clone(), State::Success, None));

        client.container().terminate(4).await.unwrap();
        let cmd = executor.await.unwrap();

        assert_eq!(cmd.command, "corex.terminate");
        assert_eq!(cmd.arguments["container"], 4);
    }
}
