//! Network bridges on the host executor (`bridge.*`)

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::client::{Client, Dispatch};
use crate::envelope::{Arguments, arguments_from};
use crate::error::ClientError;

/// Wire arguments of `bridge.create`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeCreateArguments {
    pub name: String,
    /// MAC address; `None` lets the executor pick one
    pub hwaddr: Option<String>,
}

pub struct BridgeManager<'a> {
    client: &'a Client,
}

impl<'a> BridgeManager<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Create a bridge; returns whatever the executor reports for it
    pub async fn create(&self, name: &str, hwaddr: Option<&str>) -> Result<Value, ClientError> {
        debug!(%name, ?hwaddr, "BridgeManager::create: called");
        let arguments = BridgeCreateArguments {
            name: name.to_string(),
            hwaddr: hwaddr.map(str::to_string),
        };
        let handle = self.client.raw("bridge.create", arguments_from(&arguments)?).await?;
        handle.expect_json("create bridge").await
    }

    pub async fn list(&self) -> Result<Value, ClientError> {
        debug!("BridgeManager::list: called");
        let handle = self.client.raw("bridge.list", Arguments::new()).await?;
        handle.expect_json("list bridges").await
    }

    pub async fn delete(&self, name: &str) -> Result<(), ClientError> {
        debug!(%name, "BridgeManager::delete: called");
        let mut arguments = Arguments::new();
        arguments.insert("name".to_string(), name.into());
        let handle = self.client.raw("bridge.delete", arguments).await?;
        handle.expect_success("delete bridge").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::envelope::State;
    use crate::mock::answer_next;
    use crate::transport::MemoryTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn client(transport: &MemoryTransport) -> Client {
        Client::with_transport(Arc::new(transport.clone()), &Config::default())
    }

    #[tokio::test]
    async fn test_create_sends_name_and_hwaddr() {
        let transport = MemoryTransport::new();
        let client = client(&transport);
        let executor = tokio::spawn(answer_next(transport.clone(), State::Success, Some("null")));

        let created = client.bridge().create("br0", None).await.unwrap();
        let cmd = executor.await.unwrap();

        assert_eq!(created, Value::Null);
        assert_eq!(cmd.command, "bridge.create");
        assert_eq!(Value::Object(cmd.arguments), json!({"name": "br0", "hwaddr": null}));
    }

    #[tokio::test]
    async fn test_list_returns_executor_json() {
        let transport = MemoryTransport::new();
        let client = client(&transport);
        let executor = tokio::spawn(answer_next(transport.clone(), State::Success, Some(r#"["br0", "br1"]"#)));

        let bridges = client.bridge().list().await.unwrap();
        executor.await.unwrap();

        assert_eq!(bridges, json!(["br0", "br1"]));
    }

    #[tokio::test]
    async fn test_delete_failure() {
        let transport = MemoryTransport::new();
        let client = client(&transport);
        let executor = tokio::spawn(answer_next(transport.clone(), State::Error, Some("bridge busy")));

        let err = client.bridge().delete("br0").await.unwrap_err();
        let cmd = executor.await.unwrap();

        assert_eq!(cmd.arguments["name"], "br0");
        assert!(err.to_string().contains("delete bridge"));
        assert!(err.to_string().contains("bridge busy"));
    }
}
