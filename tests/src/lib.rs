//! Tests for TON hardware wallet integration.
//!
//! Scenarios are generic over [ledger_transport::Exchange] for reuse against
//! the [emulator::Emulator], speculos, or physical devices.
//!

pub mod emulator;

pub mod account;

pub mod transfer;

pub mod proof;

pub mod sign_data;
