//! Byte-level protocol adapter over the plant store.
//!
//! Frames are fixed little-endian layouts sized for small transport MTUs:
//! plant list pages, storage stats, operation results, pack listings and a
//! chunked pack transfer. [`PlantService`] owns the per-connection state and
//! turns writes and reads into store calls.

pub mod error;
pub mod frames;
pub mod notify;
pub mod service;
pub mod transfer;

pub use error::ProtoError;
pub use frames::{ListRequest, OpResult, Operation, PackListOp, PackListRequest};
pub use notify::{Channel, Notifier, NotifyError};
pub use service::{PlantService, PlantWrite, DEFAULT_BACKOFF};
pub use transfer::{PackTransfer, StartRequest, TransferError, TransferState, TransferStatus};
