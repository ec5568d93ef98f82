//! Host information queries (`info.*`)

use serde_json::Value;
use tracing::debug;

use crate::client::Dispatch;
use crate::envelope::Arguments;
use crate::error::ClientError;

/// Queries the executor's host for hardware and OS facts
///
/// Each query waits for the result and returns the executor's JSON as-is.
pub struct InfoManager<'a, D: Dispatch + ?Sized> {
    client: &'a D,
}

impl<'a, D: Dispatch + ?Sized> InfoManager<'a, D> {
    pub fn new(client: &'a D) -> Self {
        Self { client }
    }

    pub async fn cpu(&self) -> Result<Value, ClientError> {
        self.query("info.cpu", "get cpu info").await
    }

    pub async fn nic(&self) -> Result<Value, ClientError> {
        self.query("info.nic", "get nic info").await
    }

    pub async fn mem(&self) -> Result<Value, ClientError> {
        self.query("info.mem", "get memory info").await
    }

    pub async fn disk(&self) -> Result<Value, ClientError> {
        self.query("info.disk", "get disk info").await
    }

    pub async fn os(&self) -> Result<Value, ClientError> {
        self.query("info.os", "get os info").await
    }

    async fn query(&self, command: &str, operation: &str) -> Result<Value, ClientError> {
        debug!(%command, "InfoManager::query: called");
        let handle = self.client.raw(command, Arguments::new()).await?;
        handle.expect_json(operation).await
    }
}
