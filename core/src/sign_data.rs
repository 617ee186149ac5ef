//! Off-chain data signing packages
//!
//! ```text
//! +-------------+----------------+-----------------+
//! | SCHEMA u32  | TIMESTAMP u64  |   FIELDS ...    |
//! +-------------+----------------+-----------------+
//! ```
//!
//! - plaintext: the raw text
//! - app data: `[1][ADDRESS:33] | [0]`, `[1][LEN][DOMAIN] | [0]`, `[DEPTH:2][HASH:32]` of the data cell

use crate::{
    cell::{Cell, MsgAddress},
    payload::check_printable,
    wire::PackageWriter,
    Error,
};

/// Plaintext schema id
pub const SCHEMA_PLAINTEXT: u32 = 0x754b_f91b;

/// Application data schema id
pub const SCHEMA_APP_DATA: u32 = 0x54b5_8535;

/// Off-chain data to be signed
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SignDataRequest {
    /// Printable ASCII text
    Plaintext { text: String },

    /// Application data, bound to a contract address and / or domain
    AppData {
        address: Option<MsgAddress>,
        domain: Option<String>,
        data: Cell,
    },
}

impl SignDataRequest {
    /// Schema id for this request
    pub fn schema(&self) -> u32 {
        match self {
            Self::Plaintext { .. } => SCHEMA_PLAINTEXT,
            Self::AppData { .. } => SCHEMA_APP_DATA,
        }
    }

    /// Encode the device package for this request
    pub fn package(&self, timestamp: u64) -> Result<Vec<u8>, Error> {
        let mut buff = vec![];
        buff.put_u32(self.schema());
        buff.put_u64(timestamp);

        match self {
            Self::Plaintext { text } => {
                check_printable(text.as_bytes())?;
                buff.put_bytes(text.as_bytes());
            }
            Self::AppData {
                address,
                domain,
                data,
            } => {
                if address.is_none() && domain.is_none() {
                    return Err(Error::MissingAppDataTarget);
                }

                match address {
                    Some(a) => {
                        buff.put_u8(1);
                        buff.put_address(a)?;
                    }
                    None => buff.put_u8(0),
                }

                match domain {
                    Some(d) => {
                        let d = check_printable(d.as_bytes())?;
                        let n = u8::try_from(d.len()).map_err(|_| Error::InvalidLength {
                            expected: u8::MAX as usize,
                            actual: d.len(),
                        })?;
                        buff.put_u8(1);
                        buff.put_u8(n);
                        buff.put_bytes(d.as_bytes());
                    }
                    None => buff.put_u8(0),
                }

                buff.put_cell_ref(data);
            }
        }

        Ok(buff)
    }
}
