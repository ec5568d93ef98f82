//! ResultHandle - one outstanding correlation ID

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::envelope::ResultEnvelope;
use crate::error::{ClientError, DecodeError};
use crate::id::{CorrelationId, channel_for};
use crate::result::CommandResult;
use crate::transport::Transport;

/// Handle for retrieving the result of a submitted command
///
/// The handle holds nothing but the transport, the ID and the channel name
/// derived from it. Waiting is a rotate-on-read: calling [`wait`] again after
/// a result arrived returns the same result again.
///
/// [`wait`]: ResultHandle::wait
#[derive(Clone)]
pub struct ResultHandle {
    transport: Arc<dyn Transport>,
    id: CorrelationId,
    channel: String,
    default_timeout: Duration,
}

impl ResultHandle {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        id: CorrelationId,
        result_prefix: &str,
        default_timeout: Duration,
    ) -> Self {
        let channel = channel_for(result_prefix, id.as_str());
        debug!(%id, %channel, "ResultHandle::new: called");
        Self {
            transport,
            id,
            channel,
            default_timeout,
        }
    }

    /// The correlation ID this handle is bound to
    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    /// The result channel name
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Timeout used by [`ResultHandle::get`]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Override the timeout used by [`ResultHandle::get`]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Wait for the result using the default timeout
    pub async fn get(&self) -> Result<Option<CommandResult>, ClientError> {
        self.wait(Some(self.default_timeout)).await
    }

    /// Wait for the result
    ///
    /// `None` or a zero duration waits forever. Returns `Ok(None)` when the
    /// timeout elapses before the executor published anything.
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<Option<CommandResult>, ClientError> {
        debug!(id = %self.id, ?timeout, "ResultHandle::wait: called");
        let Some(bytes) = self.transport.pop_rotate(&self.channel, timeout).await? else {
            debug!(id = %self.id, "ResultHandle::wait: no result yet");
            return Ok(None);
        };

        let payload = ResultEnvelope::decode(&self.channel, &bytes)?;
        debug!(id = %self.id, state = %payload.state, "ResultHandle::wait: received result");
        Ok(Some(CommandResult::new(payload)))
    }

    /// Wait for the result, treating a timeout as an error for `operation`
    pub(crate) async fn require(&self, operation: &str) -> Result<CommandResult, ClientError> {
        self.get().await?.ok_or_else(|| ClientError::NoResult {
            operation: operation.to_string(),
            timeout: self.default_timeout,
        })
    }

    /// Wait for a SUCCESS result, failing with the executor's diagnostic otherwise
    pub(crate) async fn expect_success(&self, operation: &str) -> Result<CommandResult, ClientError> {
        let result = self.require(operation).await?;
        if !result.is_success() {
            warn!(id = %self.id, state = %result.state(), %operation, "ResultHandle::expect_success: executor reported failure");
            return Err(ClientError::operation(operation, result.data()));
        }
        Ok(result)
    }

    /// Wait for a SUCCESS result and decode its `data` as JSON
    pub(crate) async fn expect_json<T: DeserializeOwned>(&self, operation: &str) -> Result<T, ClientError> {
        let result = self.expect_success(operation).await?;
        let value = result.json().map_err(|source| DecodeError {
            channel: self.channel.clone(),
            source,
        })?;
        Ok(value)
    }
}

impl std::fmt::Debug for ResultHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}
