//! TON DNS record payloads

use sha2::{Digest, Sha256};

use crate::{
    cell::{Cell, CellBuilder, CellParser, CellParserExt, MsgAddress},
    wire::PackageWriter,
    Error,
};

/// `dns_smc_address#9fd3` record tag
const DNS_SMC_ADDRESS: u16 = 0x9fd3;

/// `cap_is_wallet#2177` capability tag
const CAP_IS_WALLET: u16 = 0x2177;

/// Record key selecting the wallet record (`sha256("wallet")`)
pub fn dns_wallet_key() -> [u8; 32] {
    Sha256::digest(b"wallet").into()
}

/// DNS record carried by a change record request
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum DnsRecord {
    /// Wallet record, `None` deletes the record
    Wallet(Option<DnsWalletRecord>),

    /// Any other record, passed through opaquely
    Unknown { key: [u8; 32], value: Option<Cell> },
}

/// Wallet record value
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DnsWalletRecord {
    pub address: MsgAddress,
    pub capabilities: Option<DnsCapabilities>,
}

/// Smart contract capabilities
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct DnsCapabilities {
    pub is_wallet: bool,
}

impl DnsRecord {
    /// Load `key:bits256` and the optional value reference
    pub(crate) fn load(s: &mut CellParser) -> Result<Self, Error> {
        let key = s.load_array::<32>()?;
        let value = match s.remaining_refs() > 0 {
            true => Some(s.load_ref()?),
            false => None,
        };

        if key != dns_wallet_key() {
            return Ok(Self::Unknown { key, value });
        }

        let value = match value {
            Some(v) => Some(DnsWalletRecord::decode(&v)?),
            None => None,
        };

        Ok(Self::Wallet(value))
    }

    /// Record key
    pub fn key(&self) -> [u8; 32] {
        match self {
            Self::Wallet(_) => dns_wallet_key(),
            Self::Unknown { key, .. } => *key,
        }
    }

    /// Record value cell
    pub fn value(&self) -> Result<Option<Cell>, Error> {
        match self {
            Self::Wallet(Some(w)) => w.encode().map(Some),
            Self::Wallet(None) => Ok(None),
            Self::Unknown { value, .. } => Ok(value.clone()),
        }
    }

    /// Write record hints
    ///
    /// ```text
    /// wallet:  [HAS_VALUE][0x00] ([ADDRESS:33][HAS_CAPS] [IS_WALLET]?)?
    /// unknown: [HAS_VALUE][0x01][KEY:32] [DEPTH:2][HASH:32]?
    /// ```
    pub(crate) fn put_hints(&self, d: &mut Vec<u8>) -> Result<(), Error> {
        let value = self.value()?;
        d.put_bool(value.is_some());

        match self {
            Self::Wallet(w) => {
                d.put_u8(0x00);
                if let Some(w) = w {
                    d.put_address(&w.address)?;
                    d.put_bool(w.capabilities.is_some());
                    if let Some(c) = &w.capabilities {
                        d.put_bool(c.is_wallet);
                    }
                }
            }
            Self::Unknown { key, value } => {
                d.put_u8(0x01);
                d.put_bytes(key);
                if let Some(v) = value {
                    d.put_cell_ref(v);
                }
            }
        }

        Ok(())
    }
}

impl DnsWalletRecord {
    /// Decode `dns_smc_address#9fd3 smc_addr:MsgAddressInt flags:(## 8) { flags <= 1 } cap_list:flags . 0?SmcCapList`
    pub fn decode(cell: &Cell) -> Result<Self, Error> {
        let mut s = cell.parser();

        let tag = s.load_u16()?;
        if tag != DNS_SMC_ADDRESS {
            return Err(Error::InvalidTag(tag));
        }

        let address = s.load_address()?;

        let flags = s.load_u8()?;
        if flags > 1 {
            return Err(Error::InvalidFlags(flags));
        }

        let capabilities = match flags & 1 {
            0 => None,
            _ => {
                let mut caps = DnsCapabilities::default();
                while s.load_bit()? {
                    match s.load_u16()? {
                        CAP_IS_WALLET => caps.is_wallet = true,
                        c => return Err(Error::UnknownCapability(c)),
                    }
                }
                Some(caps)
            }
        };

        s.end_parse()?;

        Ok(Self {
            address,
            capabilities,
        })
    }

    /// Encode record value cell
    pub fn encode(&self) -> Result<Cell, Error> {
        let mut b = CellBuilder::new();

        b.store_uint(DNS_SMC_ADDRESS as u128, 16)?
            .store_address(Some(&self.address))?;

        match &self.capabilities {
            None => {
                b.store_uint(0, 8)?;
            }
            Some(c) => {
                b.store_uint(1, 8)?;
                if c.is_wallet {
                    b.store_bit(true)?.store_uint(CAP_IS_WALLET as u128, 16)?;
                }
                b.store_bit(false)?;
            }
        }

        Ok(b.build())
    }
}
