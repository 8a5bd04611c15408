use thiserror::Error as ThisError;

/// Failures talking to the relay actor.
#[derive(Debug, ThisError)]
pub enum RelayError {
    #[error("Relay actor spawn failed: {0}")]
    Spawn(String),

    #[error("Relay RPC failed: {0}")]
    Rpc(String),
}
