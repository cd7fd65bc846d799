//! Multi-part pack transfer: START, in-order DATA chunks, then COMMIT.
//!
//! The whole pack is buffered before anything touches the store; COMMIT
//! checks the CRC32 of the buffer and hands the plants to
//! [`PackStore::install_pack`].

use plantdb_core::error::{Error, FormatError};
use plantdb_core::result::ResultCode;
use plantdb_core::types::PackRecord;
use plantdb_format::bytes::{
    put_str, put_u16, put_u32, put_u8, read_str, read_u16, read_u32, read_u8,
};
use plantdb_format::{crc32, decode_plant_payload, PLANT_PAYLOAD_LEN};
use plantdb_store::{PackInstallReport, PackStore};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const MAX_TRANSFER_PLANTS: u16 = 64;
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(120);

pub const START_LEN: usize = 47;
pub const DATA_HEADER_LEN: usize = 7;
pub const STATUS_LEN: usize = 16;
const START_NAME_LEN: usize = 32;

pub mod opcode {
    pub const START: u8 = 0x01;
    pub const DATA: u8 = 0x02;
    pub const COMMIT: u8 = 0x03;
    pub const ABORT: u8 = 0x04;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TransferState {
    #[default]
    Idle = 0,
    Receiving = 1,
    Complete = 2,
    Error = 3,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("no transfer in progress")]
    NotReceiving,

    #[error("plant count {0} outside 1..={MAX_TRANSFER_PLANTS}")]
    InvalidPlantCount(u16),

    #[error("total size {declared} does not match {expected} for the plant count")]
    InvalidTotalSize { declared: u32, expected: u32 },

    #[error("chunk at offset {got}, expected {expected}")]
    OffsetMismatch { expected: u32, got: u32 },

    #[error("chunk declares {declared} bytes but carries {actual}")]
    LengthMismatch { declared: u16, actual: usize },

    #[error("chunk would grow the transfer past {total} bytes")]
    Overflow { total: u32 },

    #[error("transfer idle for more than {}s", TRANSFER_TIMEOUT.as_secs())]
    TimedOut,

    #[error("transfer incomplete: {received} of {expected} bytes")]
    Incomplete { received: u32, expected: u32 },

    #[error("transfer crc32 mismatch: expected 0x{expected:08X}, computed 0x{computed:08X}")]
    CrcMismatch { expected: u32, computed: u32 },

    #[error(transparent)]
    Malformed(#[from] FormatError),

    #[error(transparent)]
    Store(#[from] Error),
}

impl TransferError {
    pub fn code(&self) -> ResultCode {
        match self {
            Self::TimedOut => ResultCode::IoError,
            Self::CrcMismatch { .. } => ResultCode::CrcMismatch,
            Self::Malformed(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::NotReceiving
            | Self::InvalidPlantCount(_)
            | Self::InvalidTotalSize { .. }
            | Self::OffsetMismatch { .. }
            | Self::LengthMismatch { .. }
            | Self::Overflow { .. }
            | Self::Incomplete { .. } => ResultCode::InvalidData,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub pack_id: u16,
    pub version: u16,
    pub plant_count: u16,
    pub total_size: u32,
    pub crc32: u32,
    pub name: String,
}

impl StartRequest {
    /// Decodes a full START frame, opcode byte included.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() != START_LEN {
            return Err(FormatError::SizeMismatch {
                expected: START_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            pack_id: read_u16(bytes, 1)?,
            version: read_u16(bytes, 3)?,
            plant_count: read_u16(bytes, 5)?,
            total_size: read_u32(bytes, 7)?,
            crc32: read_u32(bytes, 11)?,
            name: read_str(bytes, 15, START_NAME_LEN, "name")?,
        })
    }

    pub fn encode(&self) -> [u8; START_LEN] {
        let mut buf = [0u8; START_LEN];
        put_u8(&mut buf, 0, opcode::START);
        put_u16(&mut buf, 1, self.pack_id);
        put_u16(&mut buf, 3, self.version);
        put_u16(&mut buf, 5, self.plant_count);
        put_u32(&mut buf, 7, self.total_size);
        put_u32(&mut buf, 11, self.crc32);
        put_str(&mut buf, 15, START_NAME_LEN, &self.name);
        buf
    }
}

/// A DATA frame: opcode, offset, declared length, then the bytes.
pub fn encode_data_chunk(offset: u32, data: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; DATA_HEADER_LEN];
    put_u8(&mut buf, 0, opcode::DATA);
    put_u32(&mut buf, 1, offset);
    put_u16(&mut buf, 5, u16::try_from(data.len()).unwrap_or(u16::MAX));
    buf.extend_from_slice(data);
    buf
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferStatus {
    pub state: TransferState,
    pub progress_pct: u8,
    pub pack_id: u16,
    pub received: u32,
    pub expected: u32,
    pub last_error: Option<ResultCode>,
}

impl TransferStatus {
    pub fn encode(&self) -> [u8; STATUS_LEN] {
        let mut buf = [0u8; STATUS_LEN];
        put_u8(&mut buf, 0, self.state as u8);
        put_u8(&mut buf, 1, self.progress_pct);
        put_u16(&mut buf, 2, self.pack_id);
        put_u32(&mut buf, 4, self.received);
        put_u32(&mut buf, 8, self.expected);
        put_u8(
            &mut buf,
            12,
            self.last_error.unwrap_or(ResultCode::Success).as_u8(),
        );
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let state = match read_u8(bytes, 0)? {
            0 => TransferState::Idle,
            1 => TransferState::Receiving,
            2 => TransferState::Complete,
            3 => TransferState::Error,
            _ => {
                return Err(FormatError::InvalidValue {
                    field: "state",
                    reason: "unknown transfer state",
                })
            }
        };
        let last_error = ResultCode::from_u8(read_u8(bytes, 12)?)
            .filter(|code| *code != ResultCode::Success);
        Ok(Self {
            state,
            progress_pct: read_u8(bytes, 1)?,
            pack_id: read_u16(bytes, 2)?,
            received: read_u32(bytes, 4)?,
            expected: read_u32(bytes, 8)?,
            last_error,
        })
    }
}

/// Receive buffer and progress of the one transfer a service runs at a time.
#[derive(Debug, Default)]
pub struct PackTransfer {
    state: TransferState,
    start: Option<StartRequest>,
    buffer: Vec<u8>,
    last_activity: Option<Instant>,
    last_error: Option<ResultCode>,
}

impl PackTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn state(&self) -> TransferState {
        self.state
    }

    pub fn status(&self) -> TransferStatus {
        let expected = self.start.as_ref().map_or(0, |s| s.total_size);
        let received = u32::try_from(self.buffer.len()).unwrap_or(u32::MAX);
        let progress_pct = if expected == 0 {
            0
        } else {
            u8::try_from(u64::from(received) * 100 / u64::from(expected)).unwrap_or(100)
        };
        TransferStatus {
            state: self.state,
            progress_pct,
            pack_id: self.start.as_ref().map_or(0, |s| s.pack_id),
            received,
            expected,
            last_error: self.last_error,
        }
    }

    /// Begins a transfer, discarding any unfinished one.
    pub fn start(&mut self, request: StartRequest, now: Instant) -> Result<(), TransferError> {
        if self.state == TransferState::Receiving {
            warn!(
                pack_id = self.start.as_ref().map_or(0, |s| s.pack_id),
                "transfer already in progress; discarding it"
            );
        }
        self.reset();

        if request.plant_count == 0 || request.plant_count > MAX_TRANSFER_PLANTS {
            return self.reject(TransferError::InvalidPlantCount(request.plant_count));
        }
        let expected = u32::from(request.plant_count) * PLANT_PAYLOAD_LEN as u32;
        if request.total_size != expected {
            return self.reject(TransferError::InvalidTotalSize {
                declared: request.total_size,
                expected,
            });
        }

        info!(
            pack_id = request.pack_id,
            version = request.version,
            plants = request.plant_count,
            bytes = request.total_size,
            "pack transfer started"
        );
        self.buffer.reserve(request.total_size as usize);
        self.start = Some(request);
        self.state = TransferState::Receiving;
        self.last_activity = Some(now);
        Ok(())
    }

    /// Appends one chunk. Chunks must arrive in order and exactly fill the
    /// declared size.
    pub fn data(
        &mut self,
        offset: u32,
        declared: u16,
        payload: &[u8],
        now: Instant,
    ) -> Result<(), TransferError> {
        if self.state != TransferState::Receiving {
            return Err(TransferError::NotReceiving);
        }
        let idle = self
            .last_activity
            .map_or(Duration::ZERO, |t| now.saturating_duration_since(t));
        if idle > TRANSFER_TIMEOUT {
            self.state = TransferState::Error;
            return self.reject(TransferError::TimedOut);
        }

        let received = self.status().received;
        if offset != received {
            return self.reject(TransferError::OffsetMismatch {
                expected: received,
                got: offset,
            });
        }
        if usize::from(declared) != payload.len() {
            return self.reject(TransferError::LengthMismatch {
                declared,
                actual: payload.len(),
            });
        }
        let total = self.start.as_ref().map_or(0, |s| s.total_size);
        if self.buffer.len() + payload.len() > total as usize {
            return self.reject(TransferError::Overflow { total });
        }

        self.buffer.extend_from_slice(payload);
        self.last_activity = Some(now);
        debug!(
            offset,
            len = payload.len(),
            received = self.buffer.len(),
            total,
            "pack transfer chunk"
        );
        Ok(())
    }

    /// Verifies the buffer and installs the pack with its plants.
    pub fn commit(&mut self, store: &PackStore) -> Result<PackInstallReport, TransferError> {
        if self.state != TransferState::Receiving {
            return Err(TransferError::NotReceiving);
        }
        match self.install(store) {
            Ok(report) => {
                self.state = TransferState::Complete;
                self.last_error = None;
                Ok(report)
            }
            Err(e) => {
                self.state = TransferState::Error;
                self.reject(e)
            }
        }
    }

    pub fn abort(&mut self) {
        if self.state == TransferState::Receiving {
            info!(
                pack_id = self.start.as_ref().map_or(0, |s| s.pack_id),
                "pack transfer aborted"
            );
        }
        self.reset();
    }

    fn install(&self, store: &PackStore) -> Result<PackInstallReport, TransferError> {
        let Some(start) = self.start.as_ref() else {
            return Err(TransferError::NotReceiving);
        };
        let received = self.status().received;
        if received != start.total_size {
            return Err(TransferError::Incomplete {
                received,
                expected: start.total_size,
            });
        }
        let computed = crc32(&self.buffer);
        if computed != start.crc32 {
            return Err(TransferError::CrcMismatch {
                expected: start.crc32,
                computed,
            });
        }

        let plants = self
            .buffer
            .chunks_exact(PLANT_PAYLOAD_LEN)
            .map(decode_plant_payload)
            .collect::<Result<Vec<_>, _>>()?;
        let pack = PackRecord {
            pack_id: start.pack_id,
            version: start.version,
            name: start.name.clone(),
            plant_ids: plants.iter().map(|p| p.plant_id).collect(),
        };
        let report = store.install_pack(&pack, &plants)?;
        info!(pack_id = pack.pack_id, ?report, "pack transfer committed");
        Ok(report)
    }

    fn reject<T>(&mut self, error: TransferError) -> Result<T, TransferError> {
        warn!(error = %error, "pack transfer rejected");
        self.last_error = Some(error.code());
        Err(error)
    }

    fn reset(&mut self) {
        self.state = TransferState::Idle;
        self.start = None;
        self.buffer.clear();
        self.last_activity = None;
        self.last_error = None;
    }
}
