//! Status words returned by the device
//!
//! Every response ends in a big-endian 16-bit status word. [SW_OK] signals
//! success, anything else is mapped to a [TransportStatusError].

/// Success status word
pub const SW_OK: u16 = 0x9000;

/// Failure status word taxonomy.
///
/// Mapping from raw words is total: documented words map to their specific
/// variant, the `0x6Fxx` range to [TransportStatusError::InternalError], and
/// everything else to [TransportStatusError::Unknown].
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportStatusError {
    /// Request payload length did not match the instruction
    #[error("incorrect length")]
    IncorrectLength,

    /// Required parameter missing from the request
    #[error("missing critical parameter")]
    MissingCriticalParameter,

    /// Security conditions not satisfied (app / PIN state)
    #[error("security status not satisfied")]
    SecurityNotSatisfied,

    /// Operation rejected by the user on-device
    #[error("denied by the user")]
    DeniedByUser,

    /// Request data could not be parsed by the device
    #[error("invalid data")]
    InvalidData,

    /// Unsupported `P1` / `P2` combination
    #[error("incorrect p1 or p2")]
    IncorrectP1P2,

    /// Invalid request parameter
    #[error("invalid parameter")]
    InvalidParameter,

    /// Instruction not supported by the running app
    #[error("instruction not supported")]
    InsNotSupported,

    /// Class not supported by the running app
    #[error("class not supported")]
    ClaNotSupported,

    /// Device is locked (PIN required)
    #[error("device locked")]
    LockedDevice,

    /// Device reported an internal error
    #[error("internal error (0x{0:04x})")]
    InternalError(u16),

    /// Undocumented status word
    #[error("unknown error (0x{0:04x})")]
    Unknown(u16),
}

impl TransportStatusError {
    /// Raw status word for this error
    pub fn code(&self) -> u16 {
        match self {
            Self::IncorrectLength => 0x6700,
            Self::MissingCriticalParameter => 0x6800,
            Self::SecurityNotSatisfied => 0x6982,
            Self::DeniedByUser => 0x6985,
            Self::InvalidData => 0x6a80,
            Self::IncorrectP1P2 => 0x6a86,
            Self::InvalidParameter => 0x6b00,
            Self::InsNotSupported => 0x6d00,
            Self::ClaNotSupported => 0x6e00,
            Self::LockedDevice => 0x5515,
            Self::InternalError(c) => *c,
            Self::Unknown(c) => *c,
        }
    }

    /// Expected user-driven outcomes (cancelled / locked) as opposed to
    /// device or protocol failures
    pub fn is_user_action(&self) -> bool {
        matches!(self, Self::DeniedByUser | Self::LockedDevice)
    }
}

impl From<u16> for TransportStatusError {
    fn from(code: u16) -> Self {
        match code {
            0x6700 => Self::IncorrectLength,
            0x6800 => Self::MissingCriticalParameter,
            0x6982 => Self::SecurityNotSatisfied,
            0x6985 => Self::DeniedByUser,
            0x6a80 => Self::InvalidData,
            0x6a86 => Self::IncorrectP1P2,
            0x6b00 => Self::InvalidParameter,
            0x6d00 => Self::InsNotSupported,
            0x6e00 => Self::ClaNotSupported,
            0x5515 => Self::LockedDevice,
            0x6f00..=0x6fff => Self::InternalError(code),
            _ => Self::Unknown(code),
        }
    }
}

/// Check a status word against the accepted set
pub fn check_status(code: u16, accepted: &[u16]) -> Result<(), TransportStatusError> {
    match accepted.contains(&code) {
        true => Ok(()),
        false => Err(TransportStatusError::from(code)),
    }
}
