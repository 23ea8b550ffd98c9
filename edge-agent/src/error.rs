//! Error taxonomy shared by every entry point of the agent.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Empty command line or too few arguments for the verb.
    #[error("invalid command")]
    InvalidCommand,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("no such service: {0}")]
    NoSuchService(String),

    #[error("failed to encode payload: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("failed to decode file content: {0}")]
    Decoding(#[from] base64::DecodeError),

    #[error("failed to spawn command: {0}")]
    Spawn(#[source] std::io::Error),

    /// The process ran but exited unsuccessfully.
    #[error("command '{program}' exited with status {status:?}: {output}")]
    Execution {
        program: String,
        status: Option<i32>,
        output: String,
    },

    #[error("device client error: {0}")]
    Device(String),

    #[error("failed to publish: {0}")]
    Publish(String),

    #[error("failed to subscribe to {0}")]
    Subscribe(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("failed to persist configuration: {0}")]
    Persistence(String),

    #[error("invalid agent configuration: {0}")]
    Config(String),
}

impl AgentError {
    /// True for errors caused by the caller's input rather than by a collaborator.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AgentError::InvalidCommand
                | AgentError::UnknownCommand(_)
                | AgentError::NoSuchService(_)
                | AgentError::Decoding(_)
        )
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        AgentError::Device(e.to_string())
    }
}
