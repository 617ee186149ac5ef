//! Device package field encodings
//!
//! These are the fixed-width / length-prefixed layouts parsed by the TON
//! application, distinct from the native cell encodings in [crate::cell].

use crate::{
    cell::{Cell, CellDigest, CellExt, MsgAddress},
    Error,
};

/// Writer for device package fields
pub trait PackageWriter {
    /// `[u8]`
    fn put_u8(&mut self, v: u8);

    /// `[u16 BE]`
    fn put_u16(&mut self, v: u16);

    /// `[u32 BE]`
    fn put_u32(&mut self, v: u32);

    /// `[u64 BE]`
    fn put_u64(&mut self, v: u64);

    /// `[presence:u8]` followed by the flag value
    fn put_bool(&mut self, v: bool) {
        self.put_u8(v as u8)
    }

    /// Device varuint: `[byte_count][big-endian bytes]`, zero encodes as `[0]`
    fn put_var_uint(&mut self, v: u128);

    /// `[workchain byte][hash:32]`, workchains outside `int8` are rejected
    fn put_address(&mut self, a: &MsgAddress) -> Result<(), Error>;

    /// `[depth:u16 BE][hash:32]`
    fn put_cell_ref(&mut self, c: &Cell);

    /// Raw bytes
    fn put_bytes(&mut self, b: &[u8]);
}

impl PackageWriter for Vec<u8> {
    fn put_u8(&mut self, v: u8) {
        self.push(v);
    }

    fn put_u16(&mut self, v: u16) {
        self.extend_from_slice(&v.to_be_bytes());
    }

    fn put_u32(&mut self, v: u32) {
        self.extend_from_slice(&v.to_be_bytes());
    }

    fn put_u64(&mut self, v: u64) {
        self.extend_from_slice(&v.to_be_bytes());
    }

    fn put_var_uint(&mut self, v: u128) {
        let b = v.to_be_bytes();
        let n = (128 - v.leading_zeros() as usize).div_ceil(8);

        self.push(n as u8);
        self.extend_from_slice(&b[b.len() - n..]);
    }

    fn put_address(&mut self, a: &MsgAddress) -> Result<(), Error> {
        self.push(workchain_byte(a)?);
        self.extend_from_slice(&a.address);
        Ok(())
    }

    fn put_cell_ref(&mut self, c: &Cell) {
        let d = c.digest();
        self.put_u16(d.depth);
        self.extend_from_slice(&d.hash);
    }

    fn put_bytes(&mut self, b: &[u8]) {
        self.extend_from_slice(b);
    }
}

/// Two's complement workchain byte, as carried in device packages
pub fn workchain_byte(a: &MsgAddress) -> Result<u8, Error> {
    i8::try_from(a.workchain_id)
        .map(|wc| wc as u8)
        .map_err(|_| Error::UnsupportedAddress)
}

/// Reader for device package fields, the inverse of [PackageWriter]
#[derive(Clone, Debug)]
pub struct PackageReader<'a> {
    buff: &'a [u8],
    index: usize,
}

impl<'a> PackageReader<'a> {
    /// Create a reader over a package buffer
    pub fn new(buff: &'a [u8]) -> Self {
        Self { buff, index: 0 }
    }

    /// Bytes remaining in the package
    pub fn remaining(&self) -> usize {
        self.buff.len() - self.index
    }

    /// Read `n` raw bytes
    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = match self.index.checked_add(n) {
            Some(end) if end <= self.buff.len() => end,
            _ => {
                return Err(Error::InvalidLength {
                    expected: self.index.saturating_add(n),
                    actual: self.buff.len(),
                })
            }
        };

        let b = &self.buff[self.index..end];
        self.index = end;
        Ok(b)
    }

    fn get_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut a = [0u8; N];
        a.copy_from_slice(self.get_bytes(N)?);
        Ok(a)
    }

    pub fn get_u8(&mut self) -> Result<u8, Error> {
        self.get_array::<1>().map(|b| b[0])
    }

    pub fn get_u16(&mut self) -> Result<u16, Error> {
        self.get_array().map(u16::from_be_bytes)
    }

    pub fn get_u32(&mut self) -> Result<u32, Error> {
        self.get_array().map(u32::from_be_bytes)
    }

    pub fn get_u64(&mut self) -> Result<u64, Error> {
        self.get_array().map(u64::from_be_bytes)
    }

    /// Big-endian unsigned integer of `n` bytes (at most 8)
    pub fn get_uint(&mut self, n: usize) -> Result<u64, Error> {
        if n > 8 {
            return Err(Error::IntOverflow(n * 8));
        }

        let v = self
            .get_bytes(n)?
            .iter()
            .fold(0u64, |a, b| (a << 8) | *b as u64);

        Ok(v)
    }

    /// Flag byte, only `0` and `1` are accepted
    pub fn get_bool(&mut self) -> Result<bool, Error> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(Error::InvalidFlags(v)),
        }
    }

    /// Device varuint, at most 16 value bytes
    pub fn get_var_uint(&mut self) -> Result<u128, Error> {
        let n = self.get_u8()? as usize;
        if n > 16 {
            return Err(Error::IntOverflow(n * 8));
        }

        let v = self
            .get_bytes(n)?
            .iter()
            .fold(0u128, |a, b| (a << 8) | *b as u128);

        Ok(v)
    }

    pub fn get_address(&mut self) -> Result<MsgAddress, Error> {
        let workchain_id = self.get_u8()? as i8 as i32;
        let address = self.get_array()?;
        Ok(MsgAddress {
            workchain_id,
            address,
        })
    }

    pub fn get_cell_ref(&mut self) -> Result<CellDigest, Error> {
        let depth = self.get_u16()?;
        let hash = self.get_array()?;
        Ok(CellDigest { depth, hash })
    }
}
