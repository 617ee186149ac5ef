//! TON cells
//!
//! [Cell], [BagOfCells] and [MsgAddress] come from [tlb_ton]. This module
//! adds a checked [CellBuilder] and [CellParserExt] helpers for the fixed
//! layouts used by payloads and transfers, and a representation hash
//! ([CellExt::digest]) that visits each shared subtree once.
//!
//! ```
//! use ledger_ton_core::cell::{CellBuilder, CellParserExt};
//!
//! let mut b = CellBuilder::new();
//! b.store_uint(0x0f8a7ea5, 32)?.store_bit(true)?;
//! let c = b.build();
//!
//! let mut s = c.parser();
//! assert_eq!(s.load_u32()?, 0x0f8a7ea5);
//! assert!(s.load_bit()?);
//! s.end_parse()?;
//! # Ok::<(), ledger_ton_core::Error>(())
//! ```

use std::{collections::HashMap, sync::Arc};

use sha2::{Digest, Sha256};
use tlb_ton::{
    bits::{
        de::BitReaderExt,
        r#as::{AsBytes, VarNBits},
        ser::{BitWriter, BitWriterExt},
    },
    r#as::Ref,
    BagOfCellsArgs,
};

pub use tlb_ton::{de::CellParser, BagOfCells, Cell, MsgAddress};

use crate::{wire::PackageReader, Error};

/// Maximum data bits per cell
pub const MAX_BITS: usize = 1023;

/// Maximum references per cell
pub const MAX_REFS: usize = 4;

/// Maximum byte length of a `VarUInteger 16` (coins) value
const COINS_MAX_LEN: usize = 15;

/// `serialized_boc#b5ee9c72`
const BOC_MAGIC: u32 = 0xb5ee_9c72;

fn overflow<E>(_e: E) -> Error {
    Error::CellOverflow
}

fn underflow<E>(_e: E) -> Error {
    Error::CellUnderflow
}

/// Depth and representation hash of a cell
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct CellDigest {
    pub depth: u16,
    pub hash: [u8; 32],
}

impl CellDigest {
    /// Depth of a cell holding references with these digests
    pub fn parent_depth(refs: &[CellDigest]) -> u16 {
        refs.iter().map(|r| r.depth + 1).max().unwrap_or(0)
    }
}

/// Hashing and bag-of-cells helpers for [Cell]
pub trait CellExt {
    /// Depth and representation hash, computed once per distinct child
    fn digest(&self) -> CellDigest;

    /// Representation hash of this cell's data, with `refs` in place of
    /// the cell's own references.
    ///
    /// Allows hashing a cell where only the digests of its children are
    /// known, as is the case when rebuilding a message from a device package.
    fn hash_with(&self, refs: &[CellDigest]) -> [u8; 32];

    /// Decode a single-root bag of cells holding ordinary cells
    fn from_boc(bytes: &[u8]) -> Result<Self, Error>
    where
        Self: Sized;

    /// Encode as a bag of cells with CRC32C
    fn to_boc(&self) -> Result<Vec<u8>, Error>;
}

impl CellExt for Cell {
    fn digest(&self) -> CellDigest {
        digest_with(self, &mut HashMap::new())
    }

    fn hash_with(&self, refs: &[CellDigest]) -> [u8; 32] {
        let bits = self.data.len();

        // Data with the completion tag set for a trailing partial byte
        let mut data = vec![0u8; bits.div_ceil(8)];
        for i in (0..bits).filter(|i| self.data[*i]) {
            data[i / 8] |= 0x80 >> (i % 8);
        }
        if bits % 8 != 0 {
            data[bits / 8] |= 0x80 >> (bits % 8);
        }

        let mut h = Sha256::new();

        // Descriptors: d1 = refs (ordinary, level 0), d2 = floor(b/8) + ceil(b/8)
        h.update([refs.len() as u8, (bits / 8 + bits.div_ceil(8)) as u8]);
        h.update(&data);

        for r in refs {
            h.update(r.depth.to_be_bytes());
        }
        for r in refs {
            h.update(r.hash);
        }

        h.finalize().into()
    }

    fn from_boc(bytes: &[u8]) -> Result<Self, Error> {
        check_boc(bytes)?;

        let root = BagOfCells::deserialize(bytes)
            .map_err(|e| Error::InvalidBoc(e.to_string()))?
            .into_single_root()
            .ok_or_else(|| Error::InvalidBoc("expected a single root".to_string()))?;

        Ok(Arc::unwrap_or_clone(root))
    }

    fn to_boc(&self) -> Result<Vec<u8>, Error> {
        BagOfCells::from_root(self.clone())
            .serialize(BagOfCellsArgs {
                has_idx: false,
                has_crc32c: true,
            })
            .map_err(|e| Error::InvalidBoc(e.to_string()))
    }
}

/// Digest a cell, memoising children by allocation so shared subtrees
/// cost one visit
fn digest_with(cell: &Cell, seen: &mut HashMap<*const Cell, CellDigest>) -> CellDigest {
    let mut refs = Vec::with_capacity(cell.references.len());

    for r in &cell.references {
        let key = Arc::as_ptr(r);
        let d = match seen.get(&key) {
            Some(d) => *d,
            None => {
                let d = digest_with(r, seen);
                seen.insert(key, d);
                d
            }
        };
        refs.push(d);
    }

    CellDigest {
        depth: CellDigest::parent_depth(&refs),
        hash: cell.hash_with(&refs),
    }
}

/// Structural checks ahead of [BagOfCells::deserialize]: a single root,
/// ordinary level 0 cells without stored hashes, and references that only
/// point forward within the bag.
fn check_boc(bytes: &[u8]) -> Result<(), Error> {
    let invalid = |m: &str| Error::InvalidBoc(m.to_string());

    let mut r = PackageReader::new(bytes);
    if r.get_u32()? != BOC_MAGIC {
        return Err(invalid("unsupported magic"));
    }

    // has_idx:1 has_crc32c:1 has_cache_bits:1 flags:2 size:3
    let flags = r.get_u8()?;
    let has_idx = flags & 0x80 != 0;
    let size = (flags & 0x07) as usize;
    let off_bytes = r.get_u8()? as usize;
    if !(1..=4).contains(&size) || !(1..=8).contains(&off_bytes) {
        return Err(invalid("invalid size fields"));
    }

    let cells = r.get_uint(size)?;
    let roots = r.get_uint(size)?;
    let _absent = r.get_uint(size)?;
    let _tot_cells_size = r.get_uint(off_bytes)?;
    if roots != 1 {
        return Err(invalid("expected a single root"));
    }
    if r.get_uint(size)? >= cells {
        return Err(invalid("root index out of range"));
    }

    if has_idx {
        let n = usize::try_from(cells)
            .ok()
            .and_then(|c| c.checked_mul(off_bytes))
            .ok_or_else(|| invalid("index too large"))?;
        r.get_bytes(n)?;
    }

    for i in 0..cells {
        let d1 = r.get_u8()?;
        let d2 = r.get_u8()?;

        // refs:3 exotic:1 has_hashes:1 level:3
        if d1 & 0x08 != 0 || d1 >> 5 != 0 {
            return Err(Error::ExoticCell);
        }
        if d1 & 0x10 != 0 {
            return Err(invalid("stored hashes unsupported"));
        }
        let refs = d1 & 0x07;
        if refs as usize > MAX_REFS {
            return Err(invalid("too many references"));
        }

        r.get_bytes((d2 as usize).div_ceil(2))?;

        for _ in 0..refs {
            let idx = r.get_uint(size)?;
            if idx <= i || idx >= cells {
                return Err(invalid("reference index out of range"));
            }
        }
    }

    Ok(())
}

/// Builder for [Cell]s, writes are checked against cell capacity
///
/// Data bits go through the [tlb_ton] builder. References are attached as
/// shared [Arc]s so existing subtrees are never copied.
pub struct CellBuilder {
    bits: tlb_ton::ser::CellBuilder,
    refs: Vec<Arc<Cell>>,
}

impl Default for CellBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CellBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellBuilder")
            .field("refs", &self.refs.len())
            .finish_non_exhaustive()
    }
}

impl CellBuilder {
    /// Create a new empty builder
    pub fn new() -> Self {
        Self {
            bits: Cell::builder(),
            refs: Vec::new(),
        }
    }

    /// Remaining data capacity in bits
    pub fn bits_left(&self) -> usize {
        self.bits.capacity_left()
    }

    /// Remaining reference capacity
    pub fn refs_left(&self) -> usize {
        MAX_REFS - self.refs.len()
    }

    fn reserve(&self, bits: usize) -> Result<(), Error> {
        match bits <= self.bits_left() {
            true => Ok(()),
            false => Err(Error::CellOverflow),
        }
    }

    /// Store a single bit
    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, Error> {
        self.bits.pack(bit).map_err(overflow)?;
        Ok(self)
    }

    /// Store an unsigned integer in `bits` bits (big-endian)
    pub fn store_uint(&mut self, value: u128, bits: usize) -> Result<&mut Self, Error> {
        if bits > 128 || (bits < 128 && value >> bits != 0) {
            return Err(Error::IntOverflow(bits));
        }
        self.reserve(bits)?;

        self.bits
            .pack_as_with::<_, VarNBits>(value, bits as u32)
            .map_err(overflow)?;
        Ok(self)
    }

    /// Store a signed (two's complement) integer in `bits` bits
    pub fn store_int(&mut self, value: i64, bits: usize) -> Result<&mut Self, Error> {
        if bits == 0 || bits > 64 {
            return Err(Error::IntOverflow(bits));
        }

        let min = -(1i128 << (bits - 1));
        let max = (1i128 << (bits - 1)) - 1;
        if (value as i128) < min || (value as i128) > max {
            return Err(Error::IntOverflow(bits));
        }

        let mask = match bits {
            64 => u64::MAX,
            _ => (1u64 << bits) - 1,
        };
        self.store_uint((value as u64 & mask) as u128, bits)
    }

    /// Store raw bytes
    pub fn store_bytes(&mut self, b: &[u8]) -> Result<&mut Self, Error> {
        self.reserve(b.len() * 8)?;
        self.bits.pack_as::<_, AsBytes>(b).map_err(overflow)?;
        Ok(self)
    }

    /// Store a `VarUInteger 16` coin amount (4-bit length + bytes)
    pub fn store_coins(&mut self, value: u128) -> Result<&mut Self, Error> {
        let len = (128 - value.leading_zeros() as usize).div_ceil(8);
        if len > COINS_MAX_LEN {
            return Err(Error::IntOverflow(COINS_MAX_LEN * 8));
        }

        self.reserve(4 + len * 8)?;
        self.store_uint(len as u128, 4)?;
        self.store_uint(value, len * 8)
    }

    /// Store an internal address, `None` is written as `addr_none`
    ///
    /// `addr_std` is written field by field: the packed form of
    /// [MsgAddress] maps the all-zero basechain address to `addr_none`.
    pub fn store_address(&mut self, addr: Option<&MsgAddress>) -> Result<&mut Self, Error> {
        match addr {
            // addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256
            Some(a) => {
                let workchain =
                    i8::try_from(a.workchain_id).map_err(|_| Error::UnsupportedAddress)?;

                self.reserve(2 + 1 + 8 + 256)?;
                self.store_uint(0b10, 2)?.store_bit(false)?;
                self.bits
                    .pack(workchain)
                    .and_then(|b| b.pack(a.address))
                    .map_err(overflow)?;
                Ok(self)
            }
            // addr_none$00
            None => self.store_uint(0b00, 2),
        }
    }

    /// Store a child reference
    pub fn store_ref(&mut self, cell: impl Into<Arc<Cell>>) -> Result<&mut Self, Error> {
        if self.refs_left() == 0 {
            return Err(Error::CellOverflow);
        }
        self.refs.push(cell.into());
        Ok(self)
    }

    /// Store `Maybe ^Cell`
    pub fn store_maybe_ref(&mut self, cell: Option<&Cell>) -> Result<&mut Self, Error> {
        match cell {
            Some(c) => {
                if self.refs_left() == 0 {
                    return Err(Error::CellOverflow);
                }
                self.store_bit(true)?.store_ref(c.clone())
            }
            None => self.store_bit(false),
        }
    }

    /// Append all bits and refs of an existing cell
    pub fn store_cell(&mut self, cell: &Cell) -> Result<&mut Self, Error> {
        if cell.data.len() > self.bits_left() || cell.references.len() > self.refs_left() {
            return Err(Error::CellOverflow);
        }

        self.bits.write_bitslice(&cell.data).map_err(overflow)?;
        self.refs.extend(cell.references.iter().cloned());
        Ok(self)
    }

    /// Finalise the cell
    pub fn build(self) -> Cell {
        let mut c = self.bits.into_cell();
        c.references = self.refs;
        c
    }
}

/// Checked reads over a [CellParser]
pub trait CellParserExt {
    /// Unread data bits
    fn remaining_bits(&self) -> usize;

    /// Unread references
    fn remaining_refs(&self) -> usize;

    /// Read a single bit
    fn load_bit(&mut self) -> Result<bool, Error>;

    /// Read an unsigned integer of `bits` bits
    fn load_uint(&mut self, bits: usize) -> Result<u128, Error>;

    /// Read a signed (two's complement) integer of `bits` bits
    fn load_int(&mut self, bits: usize) -> Result<i64, Error>;

    fn load_u8(&mut self) -> Result<u8, Error> {
        self.load_uint(8).map(|v| v as u8)
    }

    fn load_u16(&mut self) -> Result<u16, Error> {
        self.load_uint(16).map(|v| v as u16)
    }

    fn load_u32(&mut self) -> Result<u32, Error> {
        self.load_uint(32).map(|v| v as u32)
    }

    fn load_u64(&mut self) -> Result<u64, Error> {
        self.load_uint(64).map(|v| v as u64)
    }

    /// Read `n` bytes
    fn load_bytes(&mut self, n: usize) -> Result<Vec<u8>, Error>;

    /// Read a fixed size byte array
    fn load_array<const N: usize>(&mut self) -> Result<[u8; N], Error>;

    /// Read a `VarUInteger 16` coin amount
    fn load_coins(&mut self) -> Result<u128, Error> {
        let len = self.load_uint(4)? as usize;
        self.load_uint(len * 8)
    }

    /// Read an address that may be `addr_none`, anycast and non-standard
    /// addresses are rejected
    fn load_maybe_address(&mut self) -> Result<Option<MsgAddress>, Error> {
        match self.load_uint(2)? {
            0b00 => Ok(None),
            0b10 => {
                if self.load_bit()? {
                    return Err(Error::UnsupportedAddress);
                }
                let workchain_id = self.load_int(8)? as i32;
                let address = self.load_array::<32>()?;
                Ok(Some(MsgAddress {
                    workchain_id,
                    address,
                }))
            }
            _ => Err(Error::UnsupportedAddress),
        }
    }

    /// Read a standard internal address
    fn load_address(&mut self) -> Result<MsgAddress, Error> {
        self.load_maybe_address()?.ok_or(Error::AddressNone)
    }

    /// Read the next child reference
    fn load_ref(&mut self) -> Result<Cell, Error>;

    /// Read `Maybe ^Cell`
    fn load_maybe_ref(&mut self) -> Result<Option<Cell>, Error> {
        match self.load_bit()? {
            true => self.load_ref().map(Some),
            false => Ok(None),
        }
    }

    /// Read a snake-encoded byte string (remaining bytes, continued through
    /// a chain of single child references)
    fn load_snake_bytes(&mut self) -> Result<Vec<u8>, Error>;

    /// Consume the unread remainder, returning it as a new cell
    fn load_remainder(&mut self) -> Result<Cell, Error>;

    /// Assert the parser was fully consumed
    fn end_parse(&self) -> Result<(), Error> {
        match (self.remaining_bits(), self.remaining_refs()) {
            (0, 0) => Ok(()),
            (bits, refs) => Err(Error::TrailingData { bits, refs }),
        }
    }
}

impl CellParserExt for CellParser<'_> {
    fn remaining_bits(&self) -> usize {
        self.bits_left()
    }

    fn remaining_refs(&self) -> usize {
        self.references_left()
    }

    fn load_bit(&mut self) -> Result<bool, Error> {
        self.unpack::<bool>().map_err(underflow)
    }

    fn load_uint(&mut self, bits: usize) -> Result<u128, Error> {
        if bits > 128 {
            return Err(Error::IntOverflow(bits));
        }
        if bits > self.remaining_bits() {
            return Err(Error::CellUnderflow);
        }

        self.unpack_as_with::<u128, VarNBits>(bits as u32)
            .map_err(underflow)
    }

    fn load_int(&mut self, bits: usize) -> Result<i64, Error> {
        if bits == 0 || bits > 64 {
            return Err(Error::IntOverflow(bits));
        }

        let v = self.load_uint(bits)? as u64;
        let shift = 64 - bits;
        Ok(((v << shift) as i64) >> shift)
    }

    fn load_bytes(&mut self, n: usize) -> Result<Vec<u8>, Error> {
        if n.checked_mul(8).map_or(true, |b| b > self.remaining_bits()) {
            return Err(Error::CellUnderflow);
        }
        (0..n).map(|_| self.unpack::<u8>().map_err(underflow)).collect()
    }

    fn load_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        self.read_bytes_array::<N>().map_err(underflow)
    }

    fn load_ref(&mut self) -> Result<Cell, Error> {
        self.parse_as::<Cell, Ref>().map_err(underflow)
    }

    fn load_snake_bytes(&mut self) -> Result<Vec<u8>, Error> {
        fn aligned(p: &mut CellParser) -> Result<Vec<u8>, Error> {
            if p.remaining_bits() % 8 != 0 {
                return Err(Error::Unaligned);
            }
            p.load_bytes(p.remaining_bits() / 8)
        }

        fn next(p: &mut CellParser) -> Result<Option<Cell>, Error> {
            match p.remaining_refs() {
                0 => Ok(None),
                1 => p.load_ref().map(Some),
                refs => Err(Error::TrailingData { bits: 0, refs }),
            }
        }

        let mut out = aligned(self)?;
        let mut tail = next(self)?;

        while let Some(cell) = tail.take() {
            let mut p = cell.parser();
            out.extend(aligned(&mut p)?);
            tail = next(&mut p)?;
        }

        Ok(out)
    }

    fn load_remainder(&mut self) -> Result<Cell, Error> {
        let mut c = self.parse::<Cell>().map_err(underflow)?;
        // Remainders start mid-byte, realign so raw data is MSB first
        c.data.force_align();
        Ok(c)
    }
}
