use crate::result::ResultCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{kind} 0x{id:04X} not found")]
    NotFound { kind: &'static str, id: u16 },

    #[error("record store is not mounted")]
    NotReady,

    #[error("verification of {path:?} failed: {reason}")]
    Verification { path: PathBuf, reason: String },
}

impl Error {
    /// Coarse numeric outcome reported across the wire boundary.
    pub fn code(&self) -> ResultCode {
        match self {
            Self::Io(e) if e.kind() == std::io::ErrorKind::StorageFull => ResultCode::StorageFull,
            Self::Io(_) | Self::NotReady => ResultCode::IoError,
            Self::Format(e) => e.code(),
            Self::Validation(_) | Self::Verification { .. } => ResultCode::InvalidData,
            Self::NotFound { .. } => ResultCode::NotFound,
        }
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("truncated input at byte {at}, need {needed} bytes")]
    Truncated { at: usize, needed: usize },

    #[error("bad magic: expected 0x{expected:08x}, got 0x{actual:08x}")]
    BadMagic { expected: u32, actual: u32 },

    #[error("unsupported schema version {found} (supported up to {supported})")]
    UnsupportedVersion { found: u8, supported: u8 },

    #[error("payload size mismatch: expected {expected} bytes, found {actual} bytes")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("checksum mismatch: stored 0x{stored:08x}, computed 0x{computed:08x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },

    #[error("invalid utf-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("too many entries in {field}: {count} (max {max})")]
    TooManyEntries {
        field: &'static str,
        count: usize,
        max: usize,
    },
}

impl FormatError {
    pub const fn code(&self) -> ResultCode {
        match self {
            Self::UnsupportedVersion { .. } => ResultCode::InvalidVersion,
            Self::ChecksumMismatch { .. } => ResultCode::CrcMismatch,
            Self::Truncated { .. }
            | Self::BadMagic { .. }
            | Self::SizeMismatch { .. }
            | Self::InvalidValue { .. }
            | Self::InvalidUtf8 { .. }
            | Self::TooManyEntries { .. } => ResultCode::InvalidData,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("plant id 0x{0:04X} is reserved")]
    ReservedPlantId(u16),

    #[error("no plant selected (plant id 0)")]
    NoPlantSelected,

    #[error("plant id {plant_id} claims the built-in pack but is outside 1..={builtin_count}")]
    OutsideBuiltinRange { plant_id: u16, builtin_count: u16 },

    #[error("common name is empty")]
    EmptyCommonName,

    #[error("kc_{stage} {value} exceeds 2.000")]
    KcTooHigh { stage: &'static str, value: f32 },

    #[error("root depth min {min} m exceeds max {max} m")]
    RootDepthInverted { min: f32, max: f32 },

    #[error("root depth max {0} m exceeds 5 m")]
    RootDepthTooDeep(f32),

    #[error("pack id 0x{0:04X} cannot be stored")]
    ReservedPackId(u16),

    #[error("pack name is empty")]
    EmptyPackName,

    #[error("pack lists {0} plants (max 256)")]
    TooManyPlants(usize),

    #[error("pack member id 0x{0:04X} is reserved")]
    ReservedMemberId(u16),

    #[error("plant {plant_id} belongs to pack {found}, not {expected}")]
    PackMismatch {
        plant_id: u16,
        expected: u16,
        found: u16,
    },
}
