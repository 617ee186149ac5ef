//! Protocol / APDU definitions for TON app communication
//!
//! This module provides the wire-level description of the TON Ledger application:
//! instruction codes, status words, derivation path encoding, and the response
//! layouts returned by the device.
//!
//! Requests use the classic short APDU framing:
//!
//! ```text
//! +-------+-------+-------+-------+-------+------------------+
//! |  CLA  |  INS  |  P1   |  P2   |  LEN  |   DATA (<= 255)  |
//! +-------+-------+-------+-------+-------+------------------+
//! ```
//!
//! Responses carry a payload followed by a big-endian 2-byte status word.
//! Unlike the Ledger dashboard APDUs, multi-byte integers in TON app payloads
//! are big-endian.

use num_enum::TryFromPrimitive;
use strum::Display;

pub mod app_info;
pub mod path;
pub mod prelude;
pub mod sign;
pub mod status;

/// TON APDU Class
pub const TON_APDU_CLA: u8 = 0xe0;

/// Ledger dashboard / OS APDU class
pub const BOLOS_APDU_CLA: u8 = 0xb0;

/// Fetch current application name and version (under [BOLOS_APDU_CLA])
pub const GET_APP_AND_VERSION_INS: u8 = 0x01;

/// Request the dashboard to open an application (under [TON_APDU_CLA])
pub const OPEN_APP_INS: u8 = 0xd8;

/// Name reported by the Ledger dashboard
pub const DASHBOARD_APP_NAME: &str = "BOLOS";

/// Name reported by the TON application
pub const TON_APP_NAME: &str = "TON";

/// Maximum payload carried by a single APDU frame
pub const CHUNK_SIZE: usize = 255;

/// TON APDU instruction codes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum Instruction {
    /// Fetch application version
    Version = 0x03,

    /// Fetch (and optionally display) the public key for a path
    Address = 0x05,

    /// Sign a chunked transfer package
    SignTx = 0x06,

    /// Sign a TON Connect address proof
    Proof = 0x08,

    /// Sign a chunked off-chain data package
    SignData = 0x09,
}

/// `P2` values used by chunked instructions ([Instruction::SignTx], [Instruction::SignData])
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum ChunkP2 {
    /// Final chunk, device produces the signature
    Last = 0x00,

    /// Intermediate chunk, more data follows
    More = 0x02,

    /// Priming request carrying the derivation path
    Start = 0x03,
}

bitflags::bitflags! {
    /// Address display flags, sent as `P2` with [Instruction::Address]
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct AddressFlags: u8 {
        /// Display the bounceable form of the address
        const BOUNCEABLE = 1 << 0;

        /// Display the testnet-only form of the address
        const TEST_ONLY = 1 << 1;
    }
}

/// APDU encode / decode errors
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApduError {
    /// Buffer length does not match the expected layout
    #[error("invalid length (expected {expected}, actual {actual})")]
    InvalidLength { expected: usize, actual: usize },

    /// Field value outside of the expected encoding
    #[error("invalid encoding")]
    InvalidEncoding,

    /// String field is not valid UTF-8
    #[error("invalid utf8")]
    Utf8,
}

/// Split a package into frames for a chunked instruction.
///
/// Every frame but the last is tagged [ChunkP2::More], the last is tagged
/// [ChunkP2::Last]. An empty package yields no frames.
pub fn chunk_frames(package: &[u8]) -> Vec<(ChunkP2, &[u8])> {
    let n = package.len().div_ceil(CHUNK_SIZE);

    package
        .chunks(CHUNK_SIZE)
        .enumerate()
        .map(|(i, c)| match i + 1 == n {
            true => (ChunkP2::Last, c),
            false => (ChunkP2::More, c),
        })
        .collect()
}
