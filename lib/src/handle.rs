//! Handle for connected ledger devices
//!
//! This provides methods for interacting with the TON application
//! and is generic over [Exchange] transports.
//!
//! Every operation runs as a single sequence with exclusive access to the
//! device, so frames from concurrent callers can never interleave. Sequences
//! are driven by a spawned task: dropping the caller future lets an
//! in-flight sequence run to completion, with the result discarded.
//!
//! Host timeouts bound single requests and the requests ahead of a chunked
//! sequence. From the priming frame onwards every chunk is sent, bounded
//! only by the transport's own timeouts.

use std::{future::Future, sync::Arc, time::Duration};

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use ledger_transport::Exchange;
use log::{debug, info, warn};
use tokio::sync::{Mutex, OwnedMutexGuard};

use ledger_ton_apdu::prelude::*;
use ledger_ton_core::{
    build_transfer, proof::proof_hash, sign_data::SignDataRequest, LedgerTransfer, Transaction,
};

use crate::{account::LedgerAccount, transport::ExchangeExt, Error};

/// Default timeout for APDU requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for requests awaiting user approval
pub const DEFAULT_USER_TIMEOUT: Duration = Duration::from_secs(120);

/// TON handle for a connected ledger device.
///
/// This is generic over [Exchange] types to support different
/// underlying transports / providers
pub struct DeviceHandle<T> {
    /// Device handle for communication
    t: Arc<Mutex<T>>,
    /// Timeout for user acknowledgements
    user_timeout: Duration,
    /// Timeout for APDU requests
    request_timeout: Duration,
}

impl<T> Clone for DeviceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            t: self.t.clone(),
            user_timeout: self.user_timeout,
            request_timeout: self.request_timeout,
        }
    }
}

/// Create a [DeviceHandle] wrapper from a type implementing [Exchange]
impl<T: Exchange> From<T> for DeviceHandle<T> {
    fn from(t: T) -> Self {
        Self {
            t: Arc::new(Mutex::new(t)),
            user_timeout: DEFAULT_USER_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl<T> DeviceHandle<T>
where
    T: Exchange + Send + Sync + 'static,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    /// Set the timeout for APDU requests
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the timeout for requests awaiting user approval
    pub fn with_user_timeout(mut self, timeout: Duration) -> Self {
        self.user_timeout = timeout;
        self
    }

    /// Fetch the running application name and version (dashboard APDU)
    pub async fn app_info(&self) -> Result<AppInfo, Error> {
        self.sequence(|s| async move { s.app_info().await }).await
    }

    /// Check the TON app is running.
    ///
    /// Where the dashboard is running this requests the TON app be opened
    /// and returns `false`, any other app fails with [Error::WrongApp].
    pub async fn is_app_open(&self) -> Result<bool, Error> {
        self.sequence(|s| async move { s.is_app_open().await })
            .await
    }

    /// Fetch the TON app version
    pub async fn get_version(&self) -> Result<AppVersion, Error> {
        self.sequence(|s| async move {
            let r = s
                .request(Instruction::Version, 0x00, 0x00, &[], Wait::Device)
                .await?;
            Ok(AppVersion::decode(&r)?)
        })
        .await
    }

    /// Fetch the account (public key and wallet contract) for a path
    pub async fn get_account(&self, path: &AccountPath) -> Result<LedgerAccount, Error> {
        let path = *path;

        debug!("Requesting account for path: {:?}", path);

        let public_key = self
            .sequence(move |s| async move { s.public_key(&path).await })
            .await?;

        LedgerAccount::new(path, public_key)
    }

    /// Display the account address on the device for user validation
    pub async fn validate_address(
        &self,
        path: &AccountPath,
        flags: AddressFlags,
    ) -> Result<LedgerAccount, Error> {
        let path = *path;

        debug!("Validating address for path: {:?} ({:?})", path, flags);

        let public_key = self
            .sequence(move |s| async move {
                let expected = s.public_key(&path).await?;

                let r = s
                    .request(
                        Instruction::Address,
                        0x01,
                        flags.bits(),
                        &path.encode(),
                        Wait::User,
                    )
                    .await?;
                let displayed = PublicKeyResp::decode(&r)?.public_key;

                match displayed == expected {
                    true => Ok(displayed),
                    false => Err(Error::InvalidKey),
                }
            })
            .await?;

        LedgerAccount::new(path, public_key)
    }

    /// Sign a transaction, returning the verified signature over the
    /// wallet signing message
    pub async fn sign_transaction(
        &self,
        path: &AccountPath,
        tx: &Transaction,
    ) -> Result<[u8; 64], Error> {
        let transfer = build_transfer(tx)?;
        self.sign_transfer(path, transfer).await
    }

    /// Sign a pre-built transfer
    pub async fn sign_transfer(
        &self,
        path: &AccountPath,
        transfer: LedgerTransfer,
    ) -> Result<[u8; 64], Error> {
        let path = *path;

        debug!(
            "Signing transfer for path: {:?} ({} byte package)",
            path,
            transfer.package.len()
        );

        self.sequence(move |s| async move {
            s.ensure_app().await?;

            let public_key = s.public_key(&path).await?;

            let resp = s
                .chunked(Instruction::SignTx, &path, &transfer.package)
                .await?;

            verify(&public_key, &resp, Some(&transfer.hash()))?;

            Ok(resp.signature)
        })
        .await
    }

    /// Sign a TON Connect address proof for the account's wallet address,
    /// returning the verified signature over the proof hash
    pub async fn sign_address_proof(
        &self,
        path: &AccountPath,
        domain: &str,
        timestamp: u64,
        payload: &[u8],
    ) -> Result<[u8; 64], Error> {
        let req = ProofReq::new(*path, domain, timestamp, payload).encode()?;
        let (path, domain, payload) = (*path, domain.to_string(), payload.to_vec());

        debug!("Signing address proof for path: {:?} (domain: {})", path, domain);

        self.sequence(move |s| async move {
            s.ensure_app().await?;

            let public_key = s.public_key(&path).await?;
            let account = LedgerAccount::new(path, public_key)?;
            let expected = proof_hash(&account.address, &domain, timestamp, &payload);

            let r = s
                .request(Instruction::Proof, 0x01, 0x00, &req, Wait::User)
                .await?;
            let resp = SignatureResp::decode(&r)?;

            verify(&public_key, &resp, Some(&expected))?;

            Ok(resp.signature)
        })
        .await
    }

    /// Sign off-chain data
    pub async fn sign_data(
        &self,
        path: &AccountPath,
        req: &SignDataRequest,
        timestamp: u64,
    ) -> Result<SignatureResp, Error> {
        let package = req.package(timestamp)?;
        let path = *path;

        debug!(
            "Signing data for path: {:?} (schema: {:08x})",
            path,
            req.schema()
        );

        self.sequence(move |s| async move {
            s.ensure_app().await?;

            let public_key = s.public_key(&path).await?;

            let resp = s.chunked(Instruction::SignData, &path, &package).await?;

            verify(&public_key, &resp, None)?;

            Ok(resp)
        })
        .await
    }

    /// Run a sequence with exclusive access to the device
    async fn sequence<R, F, Fut>(&self, f: F) -> Result<R, Error>
    where
        R: Send + 'static,
        F: FnOnce(Session<T>) -> Fut,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
    {
        let t = self.t.clone().lock_owned().await;

        let s = Session {
            t,
            user_timeout: self.user_timeout,
            request_timeout: self.request_timeout,
        };

        tokio::spawn(f(s)).await?
    }
}

/// Response wait class, selects the applied timeout
#[derive(Copy, Clone, Debug, PartialEq)]
enum Wait {
    /// Device responds without user interaction
    Device,
    /// Response requires user approval
    User,
    /// Frame within a started chunk sequence, no host timeout
    Sequence,
}

/// Exclusive device session, held for the duration of a sequence
struct Session<T> {
    t: OwnedMutexGuard<T>,
    user_timeout: Duration,
    request_timeout: Duration,
}

impl<T> Session<T>
where
    T: Exchange + Send + Sync + 'static,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    /// Issue a TON app request
    async fn request(
        &self,
        ins: Instruction,
        p1: u8,
        p2: u8,
        data: &[u8],
        wait: Wait,
    ) -> Result<Vec<u8>, Error> {
        self.raw(TON_APDU_CLA, ins as u8, p1, p2, data, wait).await
    }

    /// Issue a request with the timeout for the provided wait class
    async fn raw(
        &self,
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: &[u8],
        wait: Wait,
    ) -> Result<Vec<u8>, Error> {
        let (timeout, e) = match wait {
            Wait::Device => (self.request_timeout, Error::RequestTimeout),
            Wait::User => (self.user_timeout, Error::UserTimeout),
            Wait::Sequence => return self.t.send(cla, ins, p1, p2, data, &[SW_OK]).await,
        };

        let f = self.t.send(cla, ins, p1, p2, data, &[SW_OK]);

        match tokio::time::timeout(timeout, f).await {
            Ok(r) => r,
            Err(_) => Err(e),
        }
    }

    async fn app_info(&self) -> Result<AppInfo, Error> {
        let r = self
            .raw(
                BOLOS_APDU_CLA,
                GET_APP_AND_VERSION_INS,
                0x00,
                0x00,
                &[],
                Wait::Device,
            )
            .await?;

        Ok(AppInfo::decode(&r)?)
    }

    async fn is_app_open(&self) -> Result<bool, Error> {
        let info = self.app_info().await?;

        debug!("Running app: {} {}", info.name, info.version);

        match info.name.as_str() {
            TON_APP_NAME => Ok(true),
            DASHBOARD_APP_NAME => {
                info!("Dashboard running, requesting TON app");

                self.raw(
                    TON_APDU_CLA,
                    OPEN_APP_INS,
                    0x00,
                    0x00,
                    TON_APP_NAME.as_bytes(),
                    Wait::User,
                )
                .await?;

                Ok(false)
            }
            name => Err(Error::WrongApp(name.to_string())),
        }
    }

    /// Check the TON app is running, failing with [Error::AppNotOpen] where
    /// an open was requested
    async fn ensure_app(&self) -> Result<(), Error> {
        match self.is_app_open().await? {
            true => Ok(()),
            false => Err(Error::AppNotOpen),
        }
    }

    /// Fetch the public key for a path without display
    async fn public_key(&self, path: &AccountPath) -> Result<[u8; 32], Error> {
        let r = self
            .request(Instruction::Address, 0x00, 0x00, &path.encode(), Wait::Device)
            .await?;

        Ok(PublicKeyResp::decode(&r)?.public_key)
    }

    /// Send a package to a chunked instruction, returning the final response
    async fn chunked(
        &self,
        ins: Instruction,
        path: &AccountPath,
        package: &[u8],
    ) -> Result<SignatureResp, Error> {
        let frames = chunk_frames(package);
        let n = frames.len();

        // Prime with the signing path
        self.request(ins, 0x00, ChunkP2::Start as u8, &path.encode(), Wait::Sequence)
            .await?;

        let mut last = None;
        for (i, (p2, c)) in frames.into_iter().enumerate() {
            debug!("Sending chunk {}/{} ({} bytes)", i + 1, n, c.len());

            let r = self
                .request(ins, 0x00, p2 as u8, c, Wait::Sequence)
                .await?;

            if p2 == ChunkP2::Last {
                last = Some(r);
            }
        }

        let r = last.ok_or(Error::InvalidLength {
            expected: 1,
            actual: 0,
        })?;

        Ok(SignatureResp::decode(&r)?)
    }
}

/// Check a signature response against the account key and, where known,
/// the locally computed hash
fn verify(
    public_key: &[u8; 32],
    resp: &SignatureResp,
    expected: Option<&[u8; 32]>,
) -> Result<(), Error> {
    if let Some(expected) = expected {
        if &resp.hash != expected {
            let (expected, actual) = (hex::encode(expected), hex::encode(resp.hash));
            warn!("Hash mismatch (expected: {}, actual: {})", expected, actual);
            return Err(Error::HashMismatch { expected, actual });
        }
    }

    let key = VerifyingKey::from_bytes(public_key).map_err(|_| Error::InvalidKey)?;
    let sig = Signature::from_bytes(&resp.signature);

    key.verify(&resp.hash, &sig).map_err(|_| {
        warn!("Signature verification failed for hash: {}", hex::encode(resp.hash));
        Error::InvalidSignature
    })
}
