//! Address proof tests

use ed25519_dalek::{Signature, Verifier};
use ledger_transport::Exchange;
use log::info;

use ledger_ton::{apdu::path::AccountPath, ton_core::proof::proof_hash, DeviceHandle};

/// Sign an address proof, checking the signature under the account key
/// over the proof hash for the account's wallet address
pub async fn test<T, E>(
    d: &DeviceHandle<T>,
    path: &AccountPath,
    domain: &str,
    timestamp: u64,
    payload: &[u8],
) -> anyhow::Result<[u8; 64]>
where
    T: Exchange<Error = E> + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let a = d.get_account(path).await?;

    info!("requesting proof for '{}' at {}", domain, timestamp);

    let signature = d
        .sign_address_proof(path, domain, timestamp, payload)
        .await?;

    info!("proof signature: {}", hex::encode(signature));

    let hash = proof_hash(&a.address, domain, timestamp, payload);
    a.verifying_key()?
        .verify(&hash, &Signature::from_bytes(&signature))?;

    Ok(signature)
}
