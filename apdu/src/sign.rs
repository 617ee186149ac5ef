//! Key and signature APDUs

use byteorder::{BigEndian, WriteBytesExt};

use crate::{path::AccountPath, ApduError, CHUNK_SIZE};

/// Ed25519 public key length
pub const PUBLIC_KEY_LEN: usize = 32;

/// Ed25519 signature length
pub const SIGNATURE_LEN: usize = 64;

/// Hash length
pub const HASH_LEN: usize = 32;

/// Public key response, exactly 32 bytes
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PublicKeyResp {
    pub public_key: [u8; PUBLIC_KEY_LEN],
}

impl PublicKeyResp {
    /// Decode a public key response
    pub fn decode(buff: &[u8]) -> Result<Self, ApduError> {
        let public_key = <[u8; PUBLIC_KEY_LEN]>::try_from(buff).map_err(|_| {
            ApduError::InvalidLength {
                expected: PUBLIC_KEY_LEN,
                actual: buff.len(),
            }
        })?;

        Ok(Self { public_key })
    }
}

/// Signature response, returned for final chunks and proof requests
///
/// ## Encoding
/// ```text
/// +--------+------------------+--------+-------------+
/// | SIG_LEN| SIGNATURE (64)   |HASH_LEN|  HASH (32)  |
/// +--------+------------------+--------+-------------+
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SignatureResp {
    /// Ed25519 signature over `hash`
    pub signature: [u8; SIGNATURE_LEN],
    /// Hash computed on-device
    pub hash: [u8; HASH_LEN],
}

impl SignatureResp {
    /// Minimum encoded length
    pub const LEN: usize = 2 + SIGNATURE_LEN + HASH_LEN;

    /// Create a new signature response
    pub fn new(signature: [u8; SIGNATURE_LEN], hash: [u8; HASH_LEN]) -> Self {
        Self { signature, hash }
    }

    /// Decode signature response (bytes `1..65` signature, `66..98` hash)
    pub fn decode(buff: &[u8]) -> Result<Self, ApduError> {
        if buff.len() < Self::LEN {
            return Err(ApduError::InvalidLength {
                expected: Self::LEN,
                actual: buff.len(),
            });
        }

        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(&buff[1..][..SIGNATURE_LEN]);

        let mut hash = [0u8; HASH_LEN];
        hash.copy_from_slice(&buff[2 + SIGNATURE_LEN..][..HASH_LEN]);

        Ok(Self { signature, hash })
    }

    /// Encode signature response
    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut buff = [0u8; Self::LEN];

        buff[0] = SIGNATURE_LEN as u8;
        buff[1..][..SIGNATURE_LEN].copy_from_slice(&self.signature);
        buff[1 + SIGNATURE_LEN] = HASH_LEN as u8;
        buff[2 + SIGNATURE_LEN..].copy_from_slice(&self.hash);

        buff
    }
}

/// Address proof request, sent as a single frame with [Instruction::Proof][crate::Instruction::Proof]
///
/// ## Encoding
/// ```text
/// +-----------+---------+------------+---------------+-------------+
/// | PATH (25) | DOM_LEN | DOMAIN ... | TIMESTAMP (8) | PAYLOAD ... |
/// +-----------+---------+------------+---------------+-------------+
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ProofReq<'a> {
    pub path: AccountPath,
    pub domain: &'a str,
    pub timestamp: u64,
    pub payload: &'a [u8],
}

impl<'a> ProofReq<'a> {
    /// Create a new proof request
    pub fn new(path: AccountPath, domain: &'a str, timestamp: u64, payload: &'a [u8]) -> Self {
        Self {
            path,
            domain,
            timestamp,
            payload,
        }
    }

    /// Encode proof request, failing where the request exceeds a single frame
    pub fn encode(&self) -> Result<Vec<u8>, ApduError> {
        let domain = self.domain.as_bytes();
        let n = self.path.encode().len() + 1 + domain.len() + 8 + self.payload.len();

        if domain.len() > u8::MAX as usize || n > CHUNK_SIZE {
            return Err(ApduError::InvalidLength {
                expected: CHUNK_SIZE,
                actual: n,
            });
        }

        let mut buff = Vec::with_capacity(n);
        buff.extend_from_slice(&self.path.encode());
        buff.push(domain.len() as u8);
        buff.extend_from_slice(domain);
        // Writes to a Vec are infallible
        let _ = buff.write_u64::<BigEndian>(self.timestamp);
        buff.extend_from_slice(self.payload);

        Ok(buff)
    }

    /// Decode proof request
    pub fn decode(buff: &'a [u8]) -> Result<Self, ApduError> {
        let path = AccountPath::decode(buff)?;
        let mut index = crate::path::PATH_ENCODED_LEN;

        let short = |expected: usize| ApduError::InvalidLength {
            expected,
            actual: buff.len(),
        };

        let n = *buff.get(index).ok_or(short(index + 1))? as usize;
        index += 1;

        let domain = buff.get(index..index + n).ok_or(short(index + n))?;
        let domain = std::str::from_utf8(domain).map_err(|_| ApduError::Utf8)?;
        index += n;

        let ts = buff.get(index..index + 8).ok_or(short(index + 8))?;
        let mut t = [0u8; 8];
        t.copy_from_slice(ts);
        index += 8;

        Ok(Self {
            path,
            domain,
            timestamp: u64::from_be_bytes(t),
            payload: &buff[index..],
        })
    }
}
