pub mod error;
pub mod http;
pub mod websocket;

pub use error::*;
pub use http::*;
pub use websocket::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{Frequency, ProcessCommand, RunningStatus, SignalsResponse, Tick};

/// Acknowledgment body of `/start_fetch` and `/stop_fetch`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommandAck {
    #[serde(default)]
    pub message: serde_json::Value,
}

impl CommandAck {
    /// Running flag after `command` was acknowledged. A boolean `message` is
    /// authoritative; any other successful ack means the command took effect.
    pub fn running_after(&self, command: ProcessCommand) -> bool {
        match self.message {
            serde_json::Value::Bool(running) => running,
            _ => command.target_running(),
        }
    }

    pub fn describe(&self) -> String {
        match &self.message {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => "ok".to_string(),
            other => other.to_string(),
        }
    }
}

/// Remote prediction service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalBackend: Send + Sync {
    async fn is_running(&self, frequency: Frequency) -> Result<RunningStatus, ClientError>;
    async fn send_command(
        &self,
        command: ProcessCommand,
        frequency: Frequency,
    ) -> Result<CommandAck, ClientError>;
    async fn signals(&self) -> Result<SignalsResponse, ClientError>;
}

/// External market price feed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TickSource: Send + Sync {
    async fn second_ticks(&self) -> Result<Tick, ClientError>;
}
