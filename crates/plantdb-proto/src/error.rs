use crate::transfer::TransferError;
use plantdb_core::error::{Error, FormatError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("{frame} write of {len} bytes has no matching layout")]
    InvalidLength { frame: &'static str, len: usize },

    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),

    #[error(transparent)]
    Malformed(#[from] FormatError),

    #[error("streaming requested with no subscriber")]
    NoSubscriber,

    #[error("plant stream aborted after {retries} busy retries")]
    StreamAborted { retries: usize },

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Store(#[from] Error),
}
