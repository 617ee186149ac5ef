//! Payload encoding
//!
//! Each field is written to the body cell and the hints buffer together,
//! so the two encodings cannot drift apart. Hints are framed as:
//!
//! ```text
//! +---------+--------------+------------+----------------+
//! | PRESENT | KIND (u32BE) | LEN (u16BE)|   FIELDS ...   |
//! +---------+--------------+------------+----------------+
//! ```
//!
//! with fields encoded as:
//!
//! - query id: `[1][u64 BE]`, or `[0]` when absent
//! - amounts: device varuint (`[n][bytes]`)
//! - addresses: `[workchain][hash:32]`
//! - vote expiration: `uint48` as 6 bytes BE
//! - optional cells: `[1][depth:u16 BE][hash:32]`, or `[0]`
//!
//! Payloads without hints ([TonPayloadFormat::Unsafe]) are sent as a single `[0]`.

use crate::{
    cell::{Cell, CellBuilder, MsgAddress},
    wire::PackageWriter,
    Error,
};

use super::{check_comment, HintKind, PayloadOp, TonPayloadFormat};

/// Encoded message body with matching device hints
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EncodedPayload {
    /// Message body cell
    pub cell: Cell,
    /// Framed hints, `None` for blind payloads
    pub hints: Option<Vec<u8>>,
}

impl EncodedPayload {
    /// Hints as written to the device package
    pub fn package_hints(&self) -> Vec<u8> {
        match &self.hints {
            Some(h) => h.clone(),
            None => vec![0],
        }
    }
}

/// Lockstep cell / hints writer
struct PayloadEncoder {
    kind: HintKind,
    b: CellBuilder,
    d: Vec<u8>,
}

impl PayloadEncoder {
    fn new(op: PayloadOp) -> Result<Self, Error> {
        let mut b = CellBuilder::new();
        b.store_uint(u32::from(op) as u128, 32)?;

        Ok(Self {
            kind: HintKind::from(op),
            b,
            d: vec![],
        })
    }

    fn query_id(&mut self, query_id: Option<u64>) -> Result<&mut Self, Error> {
        self.b.store_uint(query_id.unwrap_or(0) as u128, 64)?;

        match query_id {
            Some(q) => {
                self.d.put_u8(1);
                self.d.put_u64(q);
            }
            None => self.d.put_u8(0),
        }

        Ok(self)
    }

    fn coins(&mut self, v: u128) -> Result<&mut Self, Error> {
        self.b.store_coins(v)?;
        self.d.put_var_uint(v);
        Ok(self)
    }

    fn address(&mut self, a: &MsgAddress) -> Result<&mut Self, Error> {
        self.b.store_address(Some(a))?;
        self.d.put_address(a)?;
        Ok(self)
    }

    fn maybe_ref(&mut self, c: Option<&Cell>) -> Result<&mut Self, Error> {
        self.b.store_maybe_ref(c)?;

        match c {
            Some(c) => {
                self.d.put_u8(1);
                self.d.put_cell_ref(c);
            }
            None => self.d.put_u8(0),
        }

        Ok(self)
    }

    fn finish(self) -> Result<EncodedPayload, Error> {
        let len = u16::try_from(self.d.len()).map_err(|_| Error::InvalidLength {
            expected: u16::MAX as usize,
            actual: self.d.len(),
        })?;

        let mut hints = Vec::with_capacity(self.d.len() + 7);
        hints.put_u8(1);
        hints.put_u32(self.kind.into());
        hints.put_u16(len);
        hints.put_bytes(&self.d);

        Ok(EncodedPayload {
            cell: self.b.build(),
            hints: Some(hints),
        })
    }
}

impl TonPayloadFormat {
    /// Encode payload body cell and device hints
    pub fn encode(&self) -> Result<EncodedPayload, Error> {
        let op = match self {
            Self::Unsafe { message } => {
                return Ok(EncodedPayload {
                    cell: message.clone(),
                    hints: None,
                })
            }
            _ => self.op().ok_or(Error::InvalidOp(0))?,
        };

        let mut e = PayloadEncoder::new(op)?;

        match self {
            Self::Comment { text } => {
                let text = check_comment(text.as_bytes())?;
                e.b.store_bytes(text.as_bytes())?;
                e.d.put_bytes(text.as_bytes());
            }
            Self::JettonTransfer(t) => {
                e.query_id(t.query_id)?
                    .coins(t.amount)?
                    .address(&t.destination)?
                    .address(&t.response_destination)?
                    .maybe_ref(t.custom_payload.as_ref())?
                    .coins(t.forward_amount)?
                    .maybe_ref(t.forward_payload.as_ref())?;
            }
            Self::NftTransfer(t) => {
                e.query_id(t.query_id)?
                    .address(&t.new_owner)?
                    .address(&t.response_destination)?
                    .maybe_ref(t.custom_payload.as_ref())?
                    .coins(t.forward_amount)?
                    .maybe_ref(t.forward_payload.as_ref())?;
            }
            Self::JettonBurn(t) => {
                e.query_id(t.query_id)?
                    .coins(t.amount)?
                    .address(&t.response_destination)?
                    .maybe_ref(t.custom_payload.as_ref())?;
            }
            Self::AddWhitelist { query_id, address }
            | Self::SingleNominatorChangeValidator { query_id, address } => {
                e.query_id(*query_id)?.address(address)?;
            }
            Self::SingleNominatorWithdraw { query_id, amount } => {
                e.query_id(*query_id)?.coins(*amount)?;
            }
            Self::TonstakersDeposit { query_id, app_id } => {
                e.query_id(*query_id)?;
                match app_id {
                    Some(a) => {
                        e.b.store_uint(*a as u128, 64)?;
                        e.d.put_u8(1);
                        e.d.put_u64(*a);
                    }
                    None => e.d.put_u8(0),
                }
            }
            Self::VoteForProposal(v) => {
                e.query_id(v.query_id)?.address(&v.voting_address)?;

                e.b.store_uint(v.expiration_date as u128, 48)?
                    .store_bit(v.vote)?
                    .store_bit(v.need_confirmation)?;
                e.d.put_bytes(&v.expiration_date.to_be_bytes()[2..]);
                e.d.put_bool(v.vote);
                e.d.put_bool(v.need_confirmation);
            }
            Self::ChangeDnsRecord { query_id, record } => {
                e.query_id(*query_id)?;

                e.b.store_bytes(&record.key())?;
                if let Some(v) = record.value()? {
                    e.b.store_ref(v)?;
                }
                record.put_hints(&mut e.d)?;
            }
            Self::TokenBridgePaySwap { query_id, swap_id } => {
                e.query_id(*query_id)?;
                e.b.store_bytes(swap_id)?;
                e.d.put_bytes(swap_id);
            }
            Self::Unsafe { .. } => (),
        }

        e.finish()
    }

    /// Encode the payload body cell
    pub fn to_cell(&self) -> Result<Cell, Error> {
        self.encode().map(|p| p.cell)
    }
}
