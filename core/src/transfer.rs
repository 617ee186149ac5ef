//! Transfer builder
//!
//! Produces the wallet signing message and the matching device package
//! for a [Transaction]. The device rebuilds the signing message from the
//! package and returns its hash alongside the signature, which must equal
//! [LedgerTransfer::hash].
//!
//! ## Package
//!
//! ```text
//! +------+-----------+------------+----------+-------------+---------+--------+
//! | 0x00 | SEQNO u32 | TIMEOUT u32| AMOUNT   | DEST (1+32) | BOUNCE  | MODE   |
//! +------+-----------+------------+----------+-------------+---------+--------+
//! | HAS_INIT [DEPTH u16 | HASH 32] | HAS_PAYLOAD [DEPTH u16 | HASH 32 | HINTS] |
//! +----------------------------------+------------------------------------------+
//! ```
//!
//! Without a payload the package ends in `[0][0]`.

use log::debug;
use ton_contracts::wallet::{v4r2::V4R2, WalletVersion};

use crate::{
    cell::{Cell, CellBuilder, CellExt, MsgAddress},
    payload::TonPayloadFormat,
    wire::PackageWriter,
    Error,
};

/// Default wallet id (v3 / v4 wallets on the basechain)
pub const DEFAULT_WALLET_ID: u32 = V4R2::DEFAULT_WALLET_ID;

/// Timeout used where none is specified (no expiry)
pub const NO_TIMEOUT: u32 = u32::MAX;

/// Contract state init
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct StateInit {
    pub code: Option<Cell>,
    pub data: Option<Cell>,
}

impl StateInit {
    /// Build `split_depth:(Maybe) special:(Maybe) code:(Maybe ^Cell) data:(Maybe ^Cell) library:(Maybe ^Cell)`
    pub fn to_cell(&self) -> Result<Cell, Error> {
        let mut b = CellBuilder::new();

        b.store_bit(false)?
            .store_bit(false)?
            .store_maybe_ref(self.code.as_ref())?
            .store_maybe_ref(self.data.as_ref())?
            .store_bit(false)?;

        Ok(b.build())
    }
}

/// Transfer request
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Transaction {
    pub destination: MsgAddress,
    pub send_mode: u8,
    pub seqno: u32,
    /// Expiry (unix seconds), [NO_TIMEOUT] where unset
    pub timeout: Option<u32>,
    pub bounceable: bool,
    /// Amount in nanotons
    pub coins: u128,
    pub state_init: Option<StateInit>,
    pub payload: Option<TonPayloadFormat>,
}

impl Transaction {
    /// Create a simple transfer with default send mode
    pub fn new(destination: MsgAddress, coins: u128, seqno: u32) -> Self {
        Self {
            destination,
            send_mode: 3,
            seqno,
            timeout: None,
            bounceable: true,
            coins,
            state_init: None,
            payload: None,
        }
    }
}

/// Built transfer, consumed by the signing flow
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LedgerTransfer {
    /// Wallet signing message
    pub signing_message: Cell,
    /// Device package
    pub package: Vec<u8>,
    /// State init cell, where provided
    pub state_init: Option<Cell>,
    /// Payload body cell, where provided
    pub payload: Option<Cell>,
    /// Payload hints as written to the package
    pub hints: Vec<u8>,
}

impl LedgerTransfer {
    /// Hash signed by the device
    pub fn hash(&self) -> [u8; 32] {
        self.signing_message.digest().hash
    }

    /// Signed wallet message body (`signature ‖ signing message`)
    pub fn signed_body(&self, signature: &[u8; 64]) -> Result<Cell, Error> {
        let mut b = CellBuilder::new();
        b.store_bytes(signature)?.store_cell(&self.signing_message)?;
        Ok(b.build())
    }
}

/// Build the signing message and device package for a transaction
pub fn build_transfer(tx: &Transaction) -> Result<LedgerTransfer, Error> {
    let timeout = tx.timeout.unwrap_or(NO_TIMEOUT);

    // Header
    let mut package = vec![];
    package.put_u8(0x00);
    package.put_u32(tx.seqno);
    package.put_u32(timeout);
    package.put_var_uint(tx.coins);
    package.put_address(&tx.destination)?;
    package.put_bool(tx.bounceable);
    package.put_u8(tx.send_mode);

    // State init
    let state_init = match &tx.state_init {
        Some(s) => {
            let c = s.to_cell()?;
            package.put_u8(1);
            package.put_cell_ref(&c);
            Some(c)
        }
        None => {
            package.put_u8(0);
            None
        }
    };

    // Payload and hints
    let (payload, hints) = match &tx.payload {
        Some(p) => {
            let e = p.encode()?;
            let hints = e.package_hints();

            package.put_u8(1);
            package.put_cell_ref(&e.cell);
            package.put_bytes(&hints);

            (Some(e.cell), hints)
        }
        None => {
            package.put_u8(0);
            package.put_u8(0);
            (None, vec![])
        }
    };

    // Internal message
    let mut order = CellBuilder::new();
    order
        .store_bit(false)? // int_msg_info$0
        .store_bit(true)? // ihr_disabled
        .store_bit(tx.bounceable)?
        .store_bit(false)? // bounced
        .store_address(None)? // src
        .store_address(Some(&tx.destination))?
        .store_coins(tx.coins)?
        .store_bit(false)? // extra currencies
        .store_coins(0)? // ihr_fee
        .store_coins(0)? // fwd_fee
        .store_uint(0, 64)? // created_lt
        .store_uint(0, 32)?; // created_at

    match &state_init {
        Some(s) => {
            order.store_bit(true)?.store_bit(true)?.store_ref(s.clone())?;
        }
        None => {
            order.store_bit(false)?;
        }
    }

    match &payload {
        Some(p) => {
            order.store_bit(true)?.store_ref(p.clone())?;
        }
        None => {
            order.store_bit(false)?;
        }
    }

    // Wallet signing message
    let mut msg = CellBuilder::new();
    msg.store_uint(DEFAULT_WALLET_ID as u128, 32)?
        .store_uint(timeout as u128, 32)?
        .store_uint(tx.seqno as u128, 32)?
        .store_uint(0, 8)? // simple send
        .store_uint(tx.send_mode as u128, 8)?
        .store_ref(order.build())?;

    let signing_message = msg.build();

    debug!(
        "built transfer (seqno: {}, package: {} bytes, hash: {})",
        tx.seqno,
        package.len(),
        hex::encode(signing_message.digest().hash)
    );

    Ok(LedgerTransfer {
        signing_message,
        package,
        state_init,
        payload,
        hints,
    })
}
