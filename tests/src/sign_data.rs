//! Off-chain data signing tests

use ed25519_dalek::{Signature, Verifier};
use ledger_transport::Exchange;
use log::info;

use ledger_ton::{
    apdu::path::AccountPath,
    ton_core::{sign_data::SignDataRequest, CellBuilder, MsgAddress},
    DeviceHandle,
};

/// Plain text and application data requests, the first spanning several frames
pub fn requests() -> anyhow::Result<Vec<SignDataRequest>> {
    let mut data = CellBuilder::new();
    data.store_uint(0xc0ffee, 24)?;

    Ok(vec![
        SignDataRequest::Plaintext {
            text: "The quick brown fox jumps over the lazy dog. ".repeat(12),
        },
        SignDataRequest::Plaintext {
            text: "hello".to_string(),
        },
        SignDataRequest::AppData {
            address: Some(MsgAddress {
                workchain_id: 0,
                address: [0x77; 32],
            }),
            domain: Some("example.com".to_string()),
            data: data.build(),
        },
    ])
}

/// Sign each request, checking signatures under the account key
pub async fn test<T, E>(
    d: &DeviceHandle<T>,
    path: &AccountPath,
    reqs: &[SignDataRequest],
    timestamp: u64,
) -> anyhow::Result<()>
where
    T: Exchange<Error = E> + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let key = d.get_account(path).await?.verifying_key()?;

    for r in reqs {
        info!("signing data (schema: {:08x})", r.schema());

        let s = d.sign_data(path, r, timestamp).await?;

        key.verify(&s.hash, &Signature::from_bytes(&s.signature))?;
    }

    Ok(())
}
