//! Simulated executor for unit tests

use std::time::Duration;

use crate::envelope::{Command, ResultEnvelope, State};
use crate::transport::{MemoryTransport, Transport};

/// Wait for the next command on the default inbox and answer it
///
/// Returns the command that was answered so tests can inspect what went on
/// the wire.
pub async fn answer_next(transport: MemoryTransport, state: State, data: Option<&'static str>) -> Command {
    loop {
        if let Some(bytes) = transport.take("core:default") {
            let cmd = Command::decode("core:default", &bytes).unwrap();
            let result = ResultEnvelope {
                id: cmd.id.clone(),
                state,
                data: data.map(str::to_string),
                level: Some(20),
                time: 1,
                starttime: 0,
                streams: None,
            };
            transport
                .push(&cmd.id.result_channel(), result.encode().unwrap())
                .await
                .unwrap();
            return cmd;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
