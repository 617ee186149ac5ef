//! Account key tests

use ledger_transport::Exchange;
use log::info;

use ledger_ton::{
    apdu::{path::AccountPath, AddressFlags},
    ton_core::wallet::WalletDescriptor,
    DeviceHandle,
};

/// Paths exercised by account tests
pub const PATHS: &[(u32, bool, i8)] = &[(0, false, 0), (1, false, 0), (0, true, 0), (7, false, -1)];

/// Fetch accounts for each path, checking keys are stable, distinct per
/// path, and match `expected` where provided
pub async fn test<T, E>(
    d: &DeviceHandle<T>,
    expected: impl Fn(&AccountPath) -> Option<[u8; 32]>,
) -> anyhow::Result<()>
where
    T: Exchange<Error = E> + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut keys = vec![];

    for (index, testnet, workchain) in PATHS {
        let path = AccountPath::new(*index, *testnet, *workchain);

        let a = d.get_account(&path).await?;
        info!("account {:?}: {}", path.elements(), hex::encode(a.public_key));

        // Keys are deterministic
        let b = d.get_account(&path).await?;
        assert_eq!(a, b);

        assert_eq!(a.path, path);
        assert_eq!(a.contract, WalletDescriptor::v4r2(*workchain, a.public_key));
        assert_eq!(a.address, a.contract.address()?);
        assert_eq!(a.address.workchain_id, *workchain as i32);
        info!("address: {}", a.friendly_address(true));

        if let Some(k) = expected(&path) {
            assert_eq!(a.public_key, k, "public key mismatch for {path:?}");
        }

        assert!(!keys.contains(&a.public_key), "duplicate key for {path:?}");
        keys.push(a.public_key);
    }

    Ok(())
}

/// Display and validate an address on the device
pub async fn validate<T, E>(d: &DeviceHandle<T>, path: &AccountPath) -> anyhow::Result<()>
where
    T: Exchange<Error = E> + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let a = d.get_account(path).await?;

    let flags = match path.testnet {
        true => AddressFlags::BOUNCEABLE | AddressFlags::TEST_ONLY,
        false => AddressFlags::BOUNCEABLE,
    };

    info!("validating address for {:?} ({:?})", path.elements(), flags);

    let v = d.validate_address(path, flags).await?;
    assert_eq!(v, a);

    Ok(())
}
