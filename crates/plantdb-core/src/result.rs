#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Numeric outcome codes carried in protocol frames.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResultCode {
    Success = 0,
    Updated = 1,
    AlreadyCurrent = 2,
    InvalidData = 3,
    InvalidVersion = 4,
    StorageFull = 5,
    IoError = 6,
    NotFound = 7,
    CrcMismatch = 8,
}

impl ResultCode {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Success,
            1 => Self::Updated,
            2 => Self::AlreadyCurrent,
            3 => Self::InvalidData,
            4 => Self::InvalidVersion,
            5 => Self::StorageFull,
            6 => Self::IoError,
            7 => Self::NotFound,
            8 => Self::CrcMismatch,
            _ => return None,
        })
    }

    /// `AlreadyCurrent` counts as success: the requested state is already on disk.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::Updated | Self::AlreadyCurrent)
    }
}

/// What an install did to the store.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallOutcome {
    /// No readable record existed before.
    Installed,
    /// A lower version was replaced.
    Updated,
    /// The stored version is equal or newer; nothing was written.
    AlreadyCurrent,
}

impl InstallOutcome {
    pub const fn code(self) -> ResultCode {
        match self {
            Self::Installed => ResultCode::Success,
            Self::Updated => ResultCode::Updated,
            Self::AlreadyCurrent => ResultCode::AlreadyCurrent,
        }
    }

    pub const fn changed(self) -> bool {
        !matches!(self, Self::AlreadyCurrent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip_through_u8() {
        for v in 0..=8u8 {
            let code = ResultCode::from_u8(v).unwrap();
            assert_eq!(code.as_u8(), v);
        }
        assert_eq!(ResultCode::from_u8(9), None);
    }

    #[test]
    fn already_current_is_not_a_change() {
        assert!(InstallOutcome::AlreadyCurrent.code().is_success());
        assert!(!InstallOutcome::AlreadyCurrent.changed());
        assert!(InstallOutcome::Updated.changed());
        assert_eq!(InstallOutcome::Installed.code(), ResultCode::Success);
    }
}
