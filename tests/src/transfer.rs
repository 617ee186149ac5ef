//! Transfer signing tests

use ed25519_dalek::{Signature, Verifier};
use ledger_transport::Exchange;
use log::{debug, info};

use ledger_ton::{
    apdu::path::AccountPath,
    ton_core::{
        build_transfer,
        payload::{JettonTransfer, NftTransfer},
        CellBuilder, MsgAddress, StateInit, TonPayloadFormat, Transaction,
    },
    DeviceHandle,
};

/// Destination used by test transfers
pub const DESTINATION: MsgAddress = addr(0, 0x5a);

const fn addr(workchain_id: i32, v: u8) -> MsgAddress {
    MsgAddress {
        workchain_id,
        address: [v; 32],
    }
}

fn cell(v: u32) -> anyhow::Result<ledger_ton::ton_core::Cell> {
    let mut b = CellBuilder::new();
    b.store_uint(v as u128, 32)?;
    Ok(b.build())
}

/// Transfers covering simple, commented, token, state init and blind
/// payloads. The final entry is large enough to span multiple frames.
pub fn transactions() -> anyhow::Result<Vec<Transaction>> {
    let mut txs = vec![];

    // Plain transfer
    txs.push(Transaction::new(DESTINATION, 1_000_000_000, 1));

    // Comment with expiry
    let mut tx = Transaction::new(DESTINATION, 250_000_000, 2);
    tx.timeout = Some(1_900_000_000);
    tx.bounceable = false;
    tx.payload = Some(TonPayloadFormat::Comment {
        text: "test transfer".to_string(),
    });
    txs.push(tx);

    // Jetton transfer
    let mut tx = Transaction::new(addr(0, 0x11), 50_000_000, 3);
    tx.payload = Some(TonPayloadFormat::JettonTransfer(JettonTransfer {
        query_id: Some(0x1234),
        amount: 1_000_000,
        destination: addr(0, 0x22),
        response_destination: addr(0, 0x33),
        custom_payload: None,
        forward_amount: 1,
        forward_payload: None,
    }));
    txs.push(tx);

    // Blind payload
    let mut tx = Transaction::new(DESTINATION, 1, 4);
    tx.payload = Some(TonPayloadFormat::Unsafe {
        message: cell(0xdeadbeef)?,
    });
    txs.push(tx);

    // NFT transfer with state init, spans two frames
    let mut tx = Transaction::new(addr(-1, 0x44), 100_000_000, 5);
    tx.send_mode = 1;
    tx.state_init = Some(StateInit {
        code: Some(cell(1)?),
        data: Some(cell(2)?),
    });
    tx.payload = Some(TonPayloadFormat::NftTransfer(NftTransfer {
        query_id: Some(u64::MAX),
        new_owner: addr(0, 0x55),
        response_destination: addr(0, 0x66),
        custom_payload: Some(cell(3)?),
        forward_amount: u64::MAX as u128,
        forward_payload: Some(cell(4)?),
    }));
    txs.push(tx);

    Ok(txs)
}

/// Sign each transfer, checking signatures verify under the account key
/// over the locally built signing message hash
pub async fn test<T, E>(
    d: &DeviceHandle<T>,
    path: &AccountPath,
    txs: &[Transaction],
) -> anyhow::Result<()>
where
    T: Exchange<Error = E> + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let a = d.get_account(path).await?;
    let key = a.verifying_key()?;

    for (i, tx) in txs.iter().enumerate() {
        let t = build_transfer(tx)?;
        let hash = t.hash();

        info!(
            "signing transfer {} ({} byte package, hash: {})",
            i,
            t.package.len(),
            hex::encode(hash)
        );

        let signature = d.sign_transfer(path, t.clone()).await?;
        debug!("signature: {}", hex::encode(signature));

        key.verify(&hash, &Signature::from_bytes(&signature))?;

        // Signed body prefixes the signing message with the signature
        let body = t.signed_body(&signature)?;
        assert_eq!(&body.data.as_raw_slice()[..64], &signature[..]);
        assert_eq!(body.references.len(), 1);
    }

    Ok(())
}
