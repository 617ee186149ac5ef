//! Wallet contract descriptors
//!
//! Accounts managed by the TON application use the v4R2 wallet contract.
//! Contract code is the published v4R2 code cell from [ton_contracts], the
//! descriptor provides the initial data and derived address.

use ledger_ton_apdu::path::AccountPath;
use ton_contracts::wallet::{v4r2::V4R2, WalletVersion};

use crate::{
    cell::{Cell, CellBuilder, CellExt, MsgAddress},
    transfer::{StateInit, DEFAULT_WALLET_ID},
    Error,
};

/// Supported wallet revisions
#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::Display)]
pub enum WalletRevision {
    #[strum(serialize = "v4R2")]
    V4R2,
}

impl WalletRevision {
    /// Contract code cell
    pub fn code(&self) -> Cell {
        match self {
            Self::V4R2 => Cell::clone(&V4R2::code()),
        }
    }
}

/// Wallet contract descriptor for a public key
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct WalletDescriptor {
    pub revision: WalletRevision,
    pub workchain: i8,
    pub wallet_id: u32,
    pub public_key: [u8; 32],
}

impl WalletDescriptor {
    /// v4R2 wallet, `wallet_id = 698983191 + workchain`
    pub fn v4r2(workchain: i8, public_key: [u8; 32]) -> Self {
        Self {
            revision: WalletRevision::V4R2,
            workchain,
            wallet_id: DEFAULT_WALLET_ID.wrapping_add(workchain as i32 as u32),
            public_key,
        }
    }

    /// Initial contract data: `seqno:uint32 wallet_id:uint32 public_key:bits256 plugins:(HashmapE 256)`
    pub fn data(&self) -> Result<Cell, Error> {
        let mut b = CellBuilder::new();

        b.store_uint(0, 32)?
            .store_uint(self.wallet_id as u128, 32)?
            .store_bytes(&self.public_key)?
            .store_bit(false)?;

        Ok(b.build())
    }

    /// Contract state init, attach to the first outgoing transfer to deploy
    pub fn state_init(&self) -> Result<StateInit, Error> {
        Ok(StateInit {
            code: Some(self.revision.code()),
            data: Some(self.data()?),
        })
    }

    /// Contract address
    pub fn address(&self) -> Result<MsgAddress, Error> {
        let init = self.state_init()?.to_cell()?;

        Ok(MsgAddress {
            workchain_id: self.workchain as i32,
            address: init.digest().hash,
        })
    }
}

/// Default wallet contract for a public key derived under `path`
pub fn contract(path: &AccountPath, public_key: [u8; 32]) -> WalletDescriptor {
    WalletDescriptor::v4r2(path.workchain, public_key)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cell::CellParserExt;

    fn key() -> [u8; 32] {
        core::array::from_fn(|i| i as u8)
    }

    #[test]
    fn wallet_ids() {
        assert_eq!(WalletDescriptor::v4r2(0, [0; 32]).wallet_id, 698_983_191);
        assert_eq!(WalletDescriptor::v4r2(-1, [0; 32]).wallet_id, 698_983_190);
        assert_eq!(WalletRevision::V4R2.to_string(), "v4R2");
    }

    #[test]
    fn code_hash() {
        let d = WalletRevision::V4R2.code().digest();
        assert_eq!(
            hex::encode(d.hash),
            "feb5ff6820e2ff0d9483e7e0d62c817d846789fb4ae580c878866d959dabd5c0"
        );
        assert_eq!(d.depth, 7);
    }

    #[test]
    fn data_layout() {
        let w = WalletDescriptor::v4r2(0, [0xab; 32]);
        let d = w.data().unwrap();

        assert_eq!(d.data.len(), 32 + 32 + 256 + 1);

        let mut s = d.parser();
        assert_eq!(s.load_u32().unwrap(), 0);
        assert_eq!(s.load_u32().unwrap(), w.wallet_id);
        assert_eq!(s.load_array::<32>().unwrap(), [0xab; 32]);
        assert!(!s.load_bit().unwrap());
        s.end_parse().unwrap();
    }

    #[test]
    fn basechain_address() {
        let a = WalletDescriptor::v4r2(0, key()).address().unwrap();

        assert_eq!(
            a.to_hex(),
            "0:7c380f242a59749f692f522934c3dd60ff1def38555349861702bb1ca9258623"
        );
        assert_eq!(
            a.to_base64_url_flags(false, false),
            "EQB8OA8kKll0n2kvUik0w91g_x3vOFVTSYYXArscqSWGI573"
        );
        assert_eq!(
            a.to_base64_url_flags(true, false),
            "UQB8OA8kKll0n2kvUik0w91g_x3vOFVTSYYXArscqSWGI8My"
        );

        let k = hex::decode("82a0b2543d06fec0aac952e9ec738be56ab1b6027fc0c1aa817ae14b4d1ed2fb")
            .unwrap();
        let a = WalletDescriptor::v4r2(0, k.try_into().unwrap())
            .address()
            .unwrap();
        assert_eq!(
            a.to_base64_url_flags(false, false),
            "EQAsu2SdmUYikMZkYnY7w-KRolOst-U2wLoydbwM4LWznMCm"
        );
    }

    #[test]
    fn masterchain_address() {
        let path = AccountPath::new(0, false, -1);
        let w = contract(&path, key());
        assert_eq!(w.wallet_id, 0x29a9_a316);

        let a = w.address().unwrap();
        assert_eq!(
            a.to_hex(),
            "-1:33a0e3ed4e9c1327fb8b395583b89858fbd549e61ee0c153930e5fe33213c008"
        );
    }

    #[test]
    fn matches_contract_state_init() {
        for (workchain, k) in [(0, key()), (-1, [0x42; 32])] {
            let w = WalletDescriptor::v4r2(workchain, k);
            let expected =
                MsgAddress::derive(workchain as i32, V4R2::state_init(w.wallet_id, k)).unwrap();

            assert_eq!(w.address().unwrap(), expected);
        }
    }
}
