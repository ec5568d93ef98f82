//! core0 - correlation-based remote command dispatch
//!
//! A caller pushes a command envelope onto the executor's input queue and
//! gets back a [`ResultHandle`] bound to a fresh correlation ID. The executor
//! (an external process) runs the command and publishes exactly one result
//! envelope on `result:{id}`. The handle waits on that channel with a timeout.
//!
//! # Core Concepts
//!
//! - **Correlation IDs**: random v4 UUIDs; the result channel name is a pure
//!   function of the ID, so no registry is kept
//! - **Rotate-on-read**: waiting moves the result to the other end of its own
//!   channel instead of removing it, so repeated or concurrent waits all see it
//! - **Absence is not failure**: a timed-out wait returns `Ok(None)`
//! - **Nested dispatch**: [`ContainerClient`] routes a command through an
//!   intermediary executor and hands back a handle for the second-level ID
//!
//! # Modules
//!
//! - [`id`] - correlation ID generation and channel naming
//! - [`envelope`] - command/result wire envelopes
//! - [`transport`] - queue transports (Redis, in-memory)
//! - [`client`] - the [`Dispatch`] capability and the direct [`Client`]
//! - [`handle`] - waiting on a single result
//! - [`result`] - read-only view over a result
//! - [`container`], [`bridge`], [`info`] - typed operations over the protocol
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//!
//! # Example
//!
//! ```ignore
//! use core0::{Client, Config, Dispatch, SystemOptions};
//!
//! let client = Client::new(&Config::default())?;
//! let handle = client.system("echo hi", SystemOptions::default()).await?;
//! match handle.get().await? {
//!     Some(result) => println!("{}", result.stdout()),
//!     None => println!("no result yet for {}", handle.id()),
//! }
//! ```

pub mod bridge;
pub mod cli;
pub mod client;
pub mod config;
pub mod container;
pub mod envelope;
pub mod error;
pub mod handle;
pub mod id;
pub mod info;
pub mod result;
pub mod transport;

#[cfg(test)]
mod mock;

// Re-export commonly used types
pub use bridge::{BridgeCreateArguments, BridgeManager};
pub use client::{Client, Dispatch, SystemArguments, SystemOptions};
pub use config::{Config, QueueConfig, RedisConfig, TimeoutConfig};
pub use container::{ContainerClient, ContainerCreateArguments, ContainerInfo, ContainerManager, Network, Target};
pub use envelope::{Arguments, Command, ResultEnvelope, State, arguments_from};
pub use error::{ClientError, DecodeError, TransportError};
pub use handle::ResultHandle;
pub use id::{CorrelationId, generate_id};
pub use info::InfoManager;
pub use result::CommandResult;
pub use transport::{MemoryTransport, RedisTransport, Transport};
