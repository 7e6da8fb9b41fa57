use thiserror::Error;

use crate::state::InterceptState;

#[derive(Error, Debug)]
pub enum InterceptError {
    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition {
        from: InterceptState,
        to: InterceptState,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Message channel closed")]
    ChannelClosed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InterceptError>;
