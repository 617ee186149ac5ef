/// Cell / payload codec errors
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum Error {
    /// Cell capacity exceeded (1023 bits, 4 refs)
    #[error("cell overflow")]
    CellOverflow,

    /// Attempted to read past the end of a cell
    #[error("cell underflow")]
    CellUnderflow,

    /// Value does not fit the requested bit width
    #[error("value does not fit in {0} bits")]
    IntOverflow(usize),

    /// Unconsumed bits or refs remained at the end of parsing
    #[error("trailing data ({bits} bits, {refs} refs)")]
    TrailingData { bits: usize, refs: usize },

    /// Address tag was `addr_none` where an address is required
    #[error("missing address")]
    AddressNone,

    /// Unsupported address tag (extern / var / anycast)
    #[error("unsupported address")]
    UnsupportedAddress,

    /// Invalid address string
    #[error("invalid address string")]
    InvalidAddress,

    /// Unexpected operation selector
    #[error("unexpected op 0x{0:08x}")]
    InvalidOp(u32),

    /// Unexpected record / schema tag
    #[error("unexpected tag 0x{0:04x}")]
    InvalidTag(u16),

    /// DNS wallet record flags must be 0 or 1
    #[error("invalid DNS record flags ({0})")]
    InvalidFlags(u8),

    /// Unknown DNS wallet capability
    #[error("unknown DNS capability 0x{0:04x}")]
    UnknownCapability(u16),

    /// Comment longer than the device can display
    #[error("comment too long ({0} bytes)")]
    CommentTooLong(usize),

    /// Text contains characters outside printable ASCII
    #[error("text contains non-printable characters")]
    NotPrintable,

    /// Byte-aligned data expected
    #[error("unaligned data")]
    Unaligned,

    /// Field length invalid for the wire format
    #[error("invalid length (expected {expected}, actual {actual})")]
    InvalidLength { expected: usize, actual: usize },

    /// Malformed bag-of-cells
    #[error("invalid BOC: {0}")]
    InvalidBoc(String),

    /// Exotic (pruned / library / merkle) cells are not supported
    #[error("exotic cells unsupported")]
    ExoticCell,

    /// Sign data request needs an address or a domain
    #[error("app data requires an address or domain")]
    MissingAppDataTarget,
}
