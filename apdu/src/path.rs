//! Account derivation paths
//!
//! TON accounts are derived under `m/44'/607'/network'/chain'/index'/0'`,
//! with every element hardened.
//!
//! ## Encoding
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  N_ELEMENTS   |         ELEMENT_0 (u32 BE | 0x80000000)       /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                            ...                                /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use std::fmt::Display;

use byteorder::{BigEndian, ByteOrder};

use crate::ApduError;

/// Hardened derivation flag
pub const HARDENED: u32 = 0x8000_0000;

/// BIP-0044 purpose
pub const PURPOSE: u32 = 44;

/// SLIP-0044 coin type for TON
pub const COIN_TYPE: u32 = 607;

/// Number of path elements
pub const PATH_LEN: usize = 6;

/// Encoded path length (length byte + elements)
pub const PATH_ENCODED_LEN: usize = 1 + PATH_LEN * 4;

/// Logical account path
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AccountPath {
    /// Account index
    pub index: u32,
    /// Derive testnet keys
    pub testnet: bool,
    /// Target workchain (`-1` for masterchain, `0` for basechain)
    pub workchain: i8,
}

impl AccountPath {
    /// Create a new account path
    pub fn new(index: u32, testnet: bool, workchain: i8) -> Self {
        Self {
            index,
            testnet,
            workchain,
        }
    }

    /// Chain selector, `255` for the masterchain and `0` for anything else
    pub fn chain(&self) -> u32 {
        match self.workchain as u8 {
            0xff => 255,
            _ => 0,
        }
    }

    /// Network selector
    pub fn network(&self) -> u32 {
        match self.testnet {
            true => 1,
            false => 0,
        }
    }

    /// Path elements (without the hardened flag)
    pub fn elements(&self) -> [u32; PATH_LEN] {
        [
            PURPOSE,
            COIN_TYPE,
            self.network(),
            self.chain(),
            self.index,
            0,
        ]
    }

    /// Encode path for transmission to the device
    pub fn encode(&self) -> [u8; PATH_ENCODED_LEN] {
        let mut buff = [0u8; PATH_ENCODED_LEN];

        buff[0] = PATH_LEN as u8;
        for (i, e) in self.elements().iter().enumerate() {
            BigEndian::write_u32(&mut buff[1 + i * 4..], e | HARDENED);
        }

        buff
    }

    /// Decode an encoded path
    pub fn decode(buff: &[u8]) -> Result<Self, ApduError> {
        if buff.len() < PATH_ENCODED_LEN {
            return Err(ApduError::InvalidLength {
                expected: PATH_ENCODED_LEN,
                actual: buff.len(),
            });
        }

        if buff[0] as usize != PATH_LEN {
            return Err(ApduError::InvalidEncoding);
        }

        let mut e = [0u32; PATH_LEN];
        for (i, v) in e.iter_mut().enumerate() {
            let raw = BigEndian::read_u32(&buff[1 + i * 4..]);
            if raw & HARDENED == 0 {
                return Err(ApduError::InvalidEncoding);
            }
            *v = raw & !HARDENED;
        }

        if e[0] != PURPOSE || e[1] != COIN_TYPE || e[2] > 1 || e[5] != 0 {
            return Err(ApduError::InvalidEncoding);
        }

        let workchain = match e[3] {
            255 => -1,
            0 => 0,
            _ => return Err(ApduError::InvalidEncoding),
        };

        Ok(Self {
            index: e[4],
            testnet: e[2] == 1,
            workchain,
        })
    }
}

/// Derive the encoded path for an account
pub fn derive(index: u32, testnet: bool, workchain: i8) -> [u8; PATH_ENCODED_LEN] {
    AccountPath::new(index, testnet, workchain).encode()
}

impl Display for AccountPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m")?;
        for e in self.elements() {
            write!(f, "/{e}'")?;
        }
        Ok(())
    }
}
