//! Message body (payload) codec
//!
//! [TonPayloadFormat] maps between message body cells and the well-known
//! operations rendered by the TON application. Decoding is total: any cell
//! that does not exactly match a known layout decodes to
//! [TonPayloadFormat::Unsafe] carrying the original cell.
//!
//! Encoding produces both the body cell and the device hints for the same
//! payload, see [encode] for the hints layout.

use log::debug;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::Display;

use crate::{
    cell::{Cell, CellParser, CellParserExt, MsgAddress},
    Error,
};

mod dns;
pub use dns::{dns_wallet_key, DnsCapabilities, DnsRecord, DnsWalletRecord};

pub mod encode;
pub use encode::EncodedPayload;

/// Maximum comment length displayable on-device
pub const MAX_COMMENT_LEN: usize = 120;

/// Message body operation selectors
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum PayloadOp {
    Comment = 0x0000_0000,
    JettonTransfer = 0x0f8a_7ea5,
    NftTransfer = 0x5fcc_3d14,
    JettonBurn = 0x595f_07bc,
    AddWhitelist = 0x7258_a69b,
    SingleNominatorWithdraw = 0x0000_1000,
    SingleNominatorChangeValidator = 0x0000_1001,
    TonstakersDeposit = 0x47d5_4391,
    VoteForProposal = 0x69fb_306c,
    ChangeDnsRecord = 0x4eb1_f0f9,
    TokenBridgePaySwap = 0x0000_0008,
}

/// Hint type codes sent to the device
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum HintKind {
    Comment = 0x00,
    JettonTransfer = 0x01,
    NftTransfer = 0x02,
    JettonBurn = 0x03,
    AddWhitelist = 0x04,
    SingleNominatorWithdraw = 0x05,
    SingleNominatorChangeValidator = 0x06,
    TonstakersDeposit = 0x07,
    VoteForProposal = 0x08,
    ChangeDnsRecord = 0x09,
    TokenBridgePaySwap = 0x0a,
}

/// Jetton transfer (`transfer#0f8a7ea5`)
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct JettonTransfer {
    pub query_id: Option<u64>,
    pub amount: u128,
    pub destination: MsgAddress,
    pub response_destination: MsgAddress,
    pub custom_payload: Option<Cell>,
    pub forward_amount: u128,
    pub forward_payload: Option<Cell>,
}

/// NFT transfer (`transfer#5fcc3d14`)
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NftTransfer {
    pub query_id: Option<u64>,
    pub new_owner: MsgAddress,
    pub response_destination: MsgAddress,
    pub custom_payload: Option<Cell>,
    pub forward_amount: u128,
    pub forward_payload: Option<Cell>,
}

/// Jetton burn (`burn#595f07bc`)
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct JettonBurn {
    pub query_id: Option<u64>,
    pub amount: u128,
    pub response_destination: MsgAddress,
    pub custom_payload: Option<Cell>,
}

/// Vesting / governance vote (`vote#69fb306c`)
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct VoteForProposal {
    pub query_id: Option<u64>,
    pub voting_address: MsgAddress,
    /// Unix time, `uint48` on the wire
    pub expiration_date: u64,
    pub vote: bool,
    pub need_confirmation: bool,
}

/// Known message body payloads
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TonPayloadFormat {
    /// Text comment, at most [MAX_COMMENT_LEN] printable ASCII characters
    Comment { text: String },

    JettonTransfer(JettonTransfer),

    NftTransfer(NftTransfer),

    JettonBurn(JettonBurn),

    /// Vesting wallet whitelist addition
    AddWhitelist {
        query_id: Option<u64>,
        address: MsgAddress,
    },

    /// Single nominator pool withdrawal
    SingleNominatorWithdraw { query_id: Option<u64>, amount: u128 },

    /// Single nominator pool validator change
    SingleNominatorChangeValidator {
        query_id: Option<u64>,
        address: MsgAddress,
    },

    /// Tonstakers pool deposit
    TonstakersDeposit {
        query_id: Option<u64>,
        app_id: Option<u64>,
    },

    VoteForProposal(VoteForProposal),

    /// TON DNS record update
    ChangeDnsRecord {
        query_id: Option<u64>,
        record: DnsRecord,
    },

    /// Token bridge swap payment
    TokenBridgePaySwap {
        query_id: Option<u64>,
        swap_id: [u8; 32],
    },

    /// Unrecognised or malformed payload, signed blind
    Unsafe { message: Cell },
}

impl TonPayloadFormat {
    /// Decode a message body, falling back to [TonPayloadFormat::Unsafe]
    /// on any failure
    pub fn decode(cell: &Cell) -> Self {
        match Self::try_decode(cell) {
            Ok(p) => p,
            Err(e) => {
                debug!("payload decode failed ({e}), using unsafe payload");
                Self::Unsafe {
                    message: cell.clone(),
                }
            }
        }
    }

    /// Strictly decode a message body as a known operation
    pub fn try_decode(cell: &Cell) -> Result<Self, Error> {
        let mut s = cell.parser();

        let op = s.load_u32()?;
        let op = PayloadOp::try_from(op).map_err(|_| Error::InvalidOp(op))?;

        let p = match op {
            PayloadOp::Comment => {
                let text = s.load_snake_bytes()?;
                Self::Comment {
                    text: check_comment(&text)?.to_string(),
                }
            }
            PayloadOp::JettonTransfer => Self::JettonTransfer(JettonTransfer {
                query_id: load_query_id(&mut s)?,
                amount: s.load_coins()?,
                destination: s.load_address()?,
                response_destination: s.load_address()?,
                custom_payload: s.load_maybe_ref()?,
                forward_amount: s.load_coins()?,
                forward_payload: load_forward_payload(&mut s)?,
            }),
            PayloadOp::NftTransfer => Self::NftTransfer(NftTransfer {
                query_id: load_query_id(&mut s)?,
                new_owner: s.load_address()?,
                response_destination: s.load_address()?,
                custom_payload: s.load_maybe_ref()?,
                forward_amount: s.load_coins()?,
                forward_payload: load_forward_payload(&mut s)?,
            }),
            PayloadOp::JettonBurn => Self::JettonBurn(JettonBurn {
                query_id: load_query_id(&mut s)?,
                amount: s.load_coins()?,
                response_destination: s.load_address()?,
                custom_payload: s.load_maybe_ref()?,
            }),
            PayloadOp::AddWhitelist => Self::AddWhitelist {
                query_id: load_query_id(&mut s)?,
                address: s.load_address()?,
            },
            PayloadOp::SingleNominatorWithdraw => Self::SingleNominatorWithdraw {
                query_id: load_query_id(&mut s)?,
                amount: s.load_coins()?,
            },
            PayloadOp::SingleNominatorChangeValidator => Self::SingleNominatorChangeValidator {
                query_id: load_query_id(&mut s)?,
                address: s.load_address()?,
            },
            PayloadOp::TonstakersDeposit => {
                let query_id = load_query_id(&mut s)?;
                let app_id = match s.remaining_bits() > 0 {
                    true => Some(s.load_u64()?),
                    false => None,
                };
                Self::TonstakersDeposit { query_id, app_id }
            }
            PayloadOp::VoteForProposal => {
                let query_id = load_query_id(&mut s)?;
                let voting_address = s.load_address()?;
                let expiration_date = s.load_uint(48)? as u64;

                Self::VoteForProposal(VoteForProposal {
                    query_id,
                    voting_address,
                    expiration_date,
                    vote: s.load_bit()?,
                    need_confirmation: s.load_bit()?,
                })
            }
            PayloadOp::ChangeDnsRecord => Self::ChangeDnsRecord {
                query_id: load_query_id(&mut s)?,
                record: DnsRecord::load(&mut s)?,
            },
            PayloadOp::TokenBridgePaySwap => Self::TokenBridgePaySwap {
                query_id: load_query_id(&mut s)?,
                swap_id: s.load_array::<32>()?,
            },
        };

        s.end_parse()?;

        Ok(p)
    }

    /// Operation selector for known payloads
    pub fn op(&self) -> Option<PayloadOp> {
        let op = match self {
            Self::Comment { .. } => PayloadOp::Comment,
            Self::JettonTransfer(_) => PayloadOp::JettonTransfer,
            Self::NftTransfer(_) => PayloadOp::NftTransfer,
            Self::JettonBurn(_) => PayloadOp::JettonBurn,
            Self::AddWhitelist { .. } => PayloadOp::AddWhitelist,
            Self::SingleNominatorWithdraw { .. } => PayloadOp::SingleNominatorWithdraw,
            Self::SingleNominatorChangeValidator { .. } => {
                PayloadOp::SingleNominatorChangeValidator
            }
            Self::TonstakersDeposit { .. } => PayloadOp::TonstakersDeposit,
            Self::VoteForProposal(_) => PayloadOp::VoteForProposal,
            Self::ChangeDnsRecord { .. } => PayloadOp::ChangeDnsRecord,
            Self::TokenBridgePaySwap { .. } => PayloadOp::TokenBridgePaySwap,
            Self::Unsafe { .. } => return None,
        };
        Some(op)
    }

    /// Hint type for known payloads
    pub fn hint_kind(&self) -> Option<HintKind> {
        self.op().map(HintKind::from)
    }

    /// Check whether this payload will be signed blind
    pub fn is_unsafe(&self) -> bool {
        matches!(self, Self::Unsafe { .. })
    }
}

impl From<PayloadOp> for HintKind {
    fn from(op: PayloadOp) -> Self {
        match op {
            PayloadOp::Comment => HintKind::Comment,
            PayloadOp::JettonTransfer => HintKind::JettonTransfer,
            PayloadOp::NftTransfer => HintKind::NftTransfer,
            PayloadOp::JettonBurn => HintKind::JettonBurn,
            PayloadOp::AddWhitelist => HintKind::AddWhitelist,
            PayloadOp::SingleNominatorWithdraw => HintKind::SingleNominatorWithdraw,
            PayloadOp::SingleNominatorChangeValidator => HintKind::SingleNominatorChangeValidator,
            PayloadOp::TonstakersDeposit => HintKind::TonstakersDeposit,
            PayloadOp::VoteForProposal => HintKind::VoteForProposal,
            PayloadOp::ChangeDnsRecord => HintKind::ChangeDnsRecord,
            PayloadOp::TokenBridgePaySwap => HintKind::TokenBridgePaySwap,
        }
    }
}

/// Validate comment text, at most [MAX_COMMENT_LEN] printable ASCII bytes
pub(crate) fn check_comment(text: &[u8]) -> Result<&str, Error> {
    if text.len() > MAX_COMMENT_LEN {
        return Err(Error::CommentTooLong(text.len()));
    }
    check_printable(text)
}

/// Validate printable ASCII (`0x20..0x7f`) text
pub(crate) fn check_printable(text: &[u8]) -> Result<&str, Error> {
    if !text.iter().all(|c| (0x20..0x7f).contains(c)) {
        return Err(Error::NotPrintable);
    }
    std::str::from_utf8(text).map_err(|_| Error::NotPrintable)
}

/// Query ids of `0` are treated as absent
fn load_query_id(s: &mut CellParser) -> Result<Option<u64>, Error> {
    match s.load_u64()? {
        0 => Ok(None),
        v => Ok(Some(v)),
    }
}

/// `Either Cell ^Cell`, an empty inline remainder is no payload
fn load_forward_payload(s: &mut CellParser) -> Result<Option<Cell>, Error> {
    if s.load_bit()? {
        return Ok(Some(s.load_ref()?));
    }

    let c = s.load_remainder()?;
    match c.is_empty() {
        true => Ok(None),
        false => Ok(Some(c)),
    }
}
