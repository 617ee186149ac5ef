//! TON hardware wallet transfer engine
//!
//! This provides the host-side encodings required to sign TON transfers
//! with the Ledger TON application, see [ledger_ton_apdu] for APDU objects
//! and wire encodings.
//!
//! ## Operations
//!
//! ### Signing a transfer
//!
//! 1. Construct a [`Transaction`][transfer::Transaction], optionally with a
//!    [`TonPayloadFormat`][payload::TonPayloadFormat] message body
//! 2. Call [`build_transfer`][transfer::build_transfer] to produce a
//!    [`LedgerTransfer`][transfer::LedgerTransfer] containing the wallet
//!    signing message and the device package
//! 3. Send the package to the device in [CHUNK_SIZE][ledger_ton_apdu::CHUNK_SIZE]
//!    frames, the final response contains the signature and the device-computed hash
//! 4. Check the device hash equals [`LedgerTransfer::hash`][transfer::LedgerTransfer::hash]
//!    and verify the signature under the account public key
//!
//! See `lib/src/handle.rs` for a complete implementation.
//!
//! ### Decoding message bodies
//!
//! [`TonPayloadFormat::decode`][payload::TonPayloadFormat::decode] maps any
//! message body cell to a known operation, or to
//! [`TonPayloadFormat::Unsafe`][payload::TonPayloadFormat::Unsafe] where the
//! body is unrecognised or malformed. Decoding never fails.
//!
//! ### Cells
//!
//! Cells, addresses and bags-of-cells are [tlb_ton] types. [`CellBuilder`]
//! and [`CellParserExt`] add the checked field encodings used by message
//! bodies, and [`CellExt`] the memoized representation hash and BOC helpers.

pub mod cell;
pub mod payload;
pub mod proof;
pub mod sign_data;
pub mod transfer;
pub mod wallet;
pub mod wire;

mod error;
pub use error::Error;

pub use cell::{BagOfCells, Cell, CellBuilder, CellDigest, CellExt, CellParserExt, MsgAddress};
pub use payload::TonPayloadFormat;
pub use transfer::{build_transfer, LedgerTransfer, StateInit, Transaction};
