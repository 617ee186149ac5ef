use ledger_ton_apdu::prelude::{ApduError, TransportStatusError};
use tokio::time::error::Elapsed;

/// Ledger TON API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Device rejected the request with a status word
    #[error("Device returned status: {0}")]
    Status(#[from] TransportStatusError),

    /// Underlying link failure
    #[error("Transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),

    /// HID Init Error
    #[cfg(feature = "transport_hid")]
    #[error("could not create HidApi instance")]
    HidInit,

    /// Unexpected APDU response
    #[error("Unexpected APDU response")]
    UnexpectedResponse,

    /// Response length does not match the expected layout
    #[error("Invalid response length (expected: {expected}, actual: {actual})")]
    InvalidLength { expected: usize, actual: usize },

    /// Device hash does not match the locally computed hash
    #[error("Hash mismatch (expected: {expected}, actual: {actual})")]
    HashMismatch { expected: String, actual: String },

    /// Signature failed to verify against the account public key
    #[error("Invalid signature")]
    InvalidSignature,

    /// Invalid key in response
    #[error("Invalid key object")]
    InvalidKey,

    /// Dashboard was running, the TON app has been requested
    #[error("TON app not open (open requested)")]
    AppNotOpen,

    /// Unexpected application running on the device
    #[error("Unexpected app running: {0}")]
    WrongApp(String),

    /// Request exceeds the maximum APDU payload
    #[error("Request payload too long ({0} bytes)")]
    PayloadTooLong(usize),

    /// Transfer / payload encoding failed
    #[error("Encoding error: {0}")]
    Encoding(#[from] ledger_ton_core::Error),

    /// Background worker dropped before completion
    #[error("Operation cancelled")]
    Cancelled,

    /// Timeout waiting for user
    #[error("Timeout waiting for user interaction")]
    UserTimeout,

    /// Request timeout
    #[error("Timeout waiting for device response")]
    RequestTimeout,
}

impl Error {
    /// Check whether this error is an expected user outcome (denied on device
    /// or device locked) rather than a failure
    pub fn is_user_action(&self) -> bool {
        matches!(self, Self::Status(s) if s.is_user_action())
    }

    /// Fetch the device status error, where the device rejected the request
    pub fn status(&self) -> Option<TransportStatusError> {
        match self {
            Self::Status(s) => Some(*s),
            _ => None,
        }
    }
}

impl From<ApduError> for Error {
    fn from(e: ApduError) -> Self {
        match e {
            ApduError::InvalidLength { expected, actual } => {
                Error::InvalidLength { expected, actual }
            }
            _ => Error::UnexpectedResponse,
        }
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(_: tokio::task::JoinError) -> Self {
        Error::Cancelled
    }
}

#[cfg(feature = "transport_hid")]
impl From<ledger_transport_hid::LedgerHIDError> for Error {
    fn from(e: ledger_transport_hid::LedgerHIDError) -> Self {
        Error::Transport(Box::new(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Transport(Box::new(e))
    }
}
