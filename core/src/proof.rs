//! TON Connect address proofs
//!
//! The device signs `sha256(0xffff ‖ "ton-connect" ‖ sha256(message))` with
//!
//! ```text
//! message = "ton-proof-item-v2/" ‖ WORKCHAIN i32 BE ‖ HASH 32
//!         ‖ DOMAIN_LEN u32 LE ‖ DOMAIN ‖ TIMESTAMP u64 LE ‖ PAYLOAD
//! ```
//!
//! where the address is the account's wallet contract.

use sha2::{Digest, Sha256};

use crate::cell::MsgAddress;

const PROOF_ITEM_PREFIX: &[u8] = b"ton-proof-item-v2/";

const CONNECT_PREFIX: &[u8] = b"ton-connect";

/// Proof message for an address, domain, timestamp and payload
pub fn proof_message(address: &MsgAddress, domain: &str, timestamp: u64, payload: &[u8]) -> Vec<u8> {
    let mut m = Vec::with_capacity(PROOF_ITEM_PREFIX.len() + 48 + domain.len() + payload.len());

    m.extend_from_slice(PROOF_ITEM_PREFIX);
    m.extend_from_slice(&address.workchain_id.to_be_bytes());
    m.extend_from_slice(&address.address);
    m.extend_from_slice(&(domain.len() as u32).to_le_bytes());
    m.extend_from_slice(domain.as_bytes());
    m.extend_from_slice(&timestamp.to_le_bytes());
    m.extend_from_slice(payload);

    m
}

/// Hash signed for an address proof
pub fn proof_hash(address: &MsgAddress, domain: &str, timestamp: u64, payload: &[u8]) -> [u8; 32] {
    let message = Sha256::digest(proof_message(address, domain, timestamp, payload));

    let mut h = Sha256::new();
    h.update([0xff, 0xff]);
    h.update(CONNECT_PREFIX);
    h.update(message);

    h.finalize().into()
}
