//! Emulated TON application for host-side tests
//!
//! [Emulator] implements [Exchange] and answers APDUs the way the device
//! application does, rebuilding signing hashes from the received package
//! rather than trusting the host. Every received APDU is recorded for
//! later inspection, and [Fault]s may be injected to exercise host error
//! handling.

use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use ledger_transport::{APDUAnswer, APDUCommand, Exchange};
use log::{debug, trace};
use sha2::{Digest, Sha256};

use ledger_ton_apdu::prelude::*;
use ledger_ton_core::{
    proof::proof_hash,
    transfer::DEFAULT_WALLET_ID,
    wallet,
    wire::PackageReader,
    CellBuilder, CellDigest, CellExt,
};

/// Version reported by the emulated application
pub const EMULATOR_VERSION: AppVersion = AppVersion {
    major: 2,
    minor: 7,
    patch: 0,
};

/// Faults injected into emulator responses
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Fault {
    /// Sign a hash other than the one derived from the package
    WrongHash,
    /// Return a corrupted signature over the correct hash
    BadSignature,
    /// Fail every TON app request with the provided status word
    Status(u16),
    /// Return a truncated public key
    ShortKey,
}

/// Response delay for matching frames, standing in for a slow link or device
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Delay {
    pub ins: Instruction,
    pub p2: u8,
    pub duration: Duration,
}

/// APDU received by the emulator
#[derive(Clone, Debug, PartialEq)]
pub struct Apdu {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

/// Emulator errors, only raised for malformed host requests
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EmulatorError {
    #[error("emulator response encoding failed")]
    Answer,
}

/// In-progress chunked request
#[derive(Clone, Debug)]
struct Pending {
    ins: Instruction,
    path: AccountPath,
    data: Vec<u8>,
}

#[derive(Debug)]
struct State {
    app: String,
    fault: Option<Fault>,
    delay: Option<Delay>,
    log: Vec<Apdu>,
    pending: Option<Pending>,
}

/// Emulated TON application
pub struct Emulator {
    seed: [u8; 32],
    state: Mutex<State>,
}

type Resp = (Vec<u8>, u16);

fn status(e: TransportStatusError) -> Resp {
    (vec![], e.code())
}

impl Emulator {
    /// Create an emulator with the TON app running
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            seed,
            state: Mutex::new(State {
                app: TON_APP_NAME.to_string(),
                fault: None,
                delay: None,
                log: vec![],
                pending: None,
            }),
        }
    }

    /// Create an emulator with a random seed
    pub fn random() -> Self {
        Self::new(rand::random())
    }

    /// Set the running application name
    pub fn with_app(self, name: &str) -> Self {
        self.set_app(name);
        self
    }

    /// Inject a fault
    pub fn with_fault(self, fault: Fault) -> Self {
        self.set_fault(Some(fault));
        self
    }

    pub fn set_app(&self, name: &str) {
        self.lock().app = name.to_string();
    }

    pub fn set_fault(&self, fault: Option<Fault>) {
        self.lock().fault = fault;
    }

    /// Delay responses to matching TON app frames
    pub fn with_delay(self, delay: Delay) -> Self {
        self.lock().delay = Some(delay);
        self
    }

    /// Name of the running application
    pub fn app(&self) -> String {
        self.lock().app.clone()
    }

    /// APDUs received so far
    pub fn log(&self) -> Vec<Apdu> {
        self.lock().log.clone()
    }

    pub fn clear_log(&self) {
        self.lock().log.clear();
    }

    /// Signing key for a derivation path
    pub fn signing_key(&self, path: &AccountPath) -> SigningKey {
        let mut h = Sha256::new();
        h.update(self.seed);
        h.update(path.encode());

        SigningKey::from_bytes(&h.finalize().into())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // Poisoning only follows a panicking test
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Handle a single APDU, returning response data and status word
    fn handle(&self, apdu: Apdu) -> Resp {
        let mut s = self.lock();
        s.log.push(apdu.clone());

        // Dashboard requests are always served
        if apdu.cla == BOLOS_APDU_CLA && apdu.ins == GET_APP_AND_VERSION_INS {
            let version = match s.app.as_str() {
                TON_APP_NAME => format!(
                    "{}.{}.{}",
                    EMULATOR_VERSION.major, EMULATOR_VERSION.minor, EMULATOR_VERSION.patch
                ),
                _ => "1.0.0".to_string(),
            };
            return (AppInfo::new(&s.app, &version, &[0x02]).encode(), SW_OK);
        }

        if apdu.cla != TON_APDU_CLA {
            return status(TransportStatusError::ClaNotSupported);
        }

        if apdu.ins == OPEN_APP_INS {
            let app = s.app.clone();
            return match app.as_str() {
                // User accepts the open request
                DASHBOARD_APP_NAME if apdu.data == TON_APP_NAME.as_bytes() => {
                    s.app = TON_APP_NAME.to_string();
                    (vec![], SW_OK)
                }
                DASHBOARD_APP_NAME => (vec![], 0x6807),
                _ => status(TransportStatusError::InsNotSupported),
            };
        }

        if s.app != TON_APP_NAME {
            return status(TransportStatusError::ClaNotSupported);
        }

        if let Some(Fault::Status(code)) = s.fault {
            return (vec![], code);
        }

        let ins = match Instruction::try_from(apdu.ins) {
            Ok(i) => i,
            Err(_) => return status(TransportStatusError::InsNotSupported),
        };

        let fault = s.fault;

        match ins {
            Instruction::Version => (EMULATOR_VERSION.encode().to_vec(), SW_OK),
            Instruction::Address => {
                if apdu.p1 > 0x01 || AddressFlags::from_bits(apdu.p2).is_none() {
                    return status(TransportStatusError::IncorrectP1P2);
                }

                let path = match AccountPath::decode(&apdu.data) {
                    Ok(p) => p,
                    Err(_) => return status(TransportStatusError::InvalidData),
                };

                let key = self.signing_key(&path).verifying_key().to_bytes();

                match fault {
                    Some(Fault::ShortKey) => (key[..16].to_vec(), SW_OK),
                    _ => (key.to_vec(), SW_OK),
                }
            }
            Instruction::Proof => {
                let req = match ProofReq::decode(&apdu.data) {
                    Ok(r) => r,
                    Err(_) => return status(TransportStatusError::InvalidData),
                };

                // Proofs bind the account's wallet address
                let key = self.signing_key(&req.path).verifying_key().to_bytes();
                let address = match wallet::contract(&req.path, key).address() {
                    Ok(a) => a,
                    Err(_) => return status(TransportStatusError::InvalidData),
                };

                let hash = proof_hash(&address, req.domain, req.timestamp, req.payload);
                self.sign(&req.path, hash, fault)
            }
            Instruction::SignTx | Instruction::SignData => {
                let p2 = match ChunkP2::try_from(apdu.p2) {
                    Ok(v) => v,
                    Err(_) => return status(TransportStatusError::IncorrectP1P2),
                };

                match p2 {
                    ChunkP2::Start => {
                        let path = match AccountPath::decode(&apdu.data) {
                            Ok(p) => p,
                            Err(_) => return status(TransportStatusError::InvalidData),
                        };

                        s.pending = Some(Pending {
                            ins,
                            path,
                            data: vec![],
                        });

                        (vec![], SW_OK)
                    }
                    ChunkP2::More | ChunkP2::Last => {
                        let p = match s.pending.as_mut() {
                            Some(p) if p.ins == ins => p,
                            _ => return status(TransportStatusError::SecurityNotSatisfied),
                        };

                        p.data.extend_from_slice(&apdu.data);

                        if p2 == ChunkP2::More {
                            return (vec![], SW_OK);
                        }

                        let Some(p) = s.pending.take() else {
                            return status(TransportStatusError::SecurityNotSatisfied);
                        };

                        let hash = match ins {
                            Instruction::SignTx => match transfer_hash(&p.data) {
                                Some(h) => h,
                                None => return status(TransportStatusError::InvalidData),
                            },
                            _ => Sha256::digest(&p.data).into(),
                        };

                        self.sign(&p.path, hash, fault)
                    }
                }
            }
        }
    }

    /// Sign a hash, applying any injected faults
    fn sign(&self, path: &AccountPath, hash: [u8; 32], fault: Option<Fault>) -> Resp {
        let key = self.signing_key(path);

        let resp = match fault {
            Some(Fault::WrongHash) => {
                let wrong: [u8; 32] = Sha256::digest(hash).into();
                SignatureResp::new(key.sign(&wrong).to_bytes(), wrong)
            }
            Some(Fault::BadSignature) => {
                let mut signature = key.sign(&hash).to_bytes();
                signature[0] ^= 0x01;
                SignatureResp::new(signature, hash)
            }
            _ => SignatureResp::new(key.sign(&hash).to_bytes(), hash),
        };

        (resp.encode().to_vec(), SW_OK)
    }
}

/// Rebuild the wallet signing message hash from a transfer package
fn transfer_hash(package: &[u8]) -> Option<[u8; 32]> {
    transfer_hash_inner(package)
        .map_err(|e| debug!("invalid transfer package: {e}"))
        .ok()
}

fn transfer_hash_inner(package: &[u8]) -> Result<[u8; 32], ledger_ton_core::Error> {
    let mut r = PackageReader::new(package);

    match r.get_u8()? {
        0x00 => (),
        v => return Err(ledger_ton_core::Error::InvalidFlags(v)),
    }

    let seqno = r.get_u32()?;
    let timeout = r.get_u32()?;
    let coins = r.get_var_uint()?;
    let destination = r.get_address()?;
    let bounceable = r.get_bool()?;
    let send_mode = r.get_u8()?;

    let state_init = match r.get_bool()? {
        true => Some(r.get_cell_ref()?),
        false => None,
    };

    let payload = match r.get_bool()? {
        true => Some(r.get_cell_ref()?),
        false => None,
    };

    // Hints drive display only
    trace!("package hints: {}", hex::encode(r.get_bytes(r.remaining())?));

    let mut order = CellBuilder::new();
    order
        .store_bit(false)?
        .store_bit(true)?
        .store_bit(bounceable)?
        .store_bit(false)?
        .store_address(None)?
        .store_address(Some(&destination))?
        .store_coins(coins)?
        .store_bit(false)?
        .store_coins(0)?
        .store_coins(0)?
        .store_uint(0, 64)?
        .store_uint(0, 32)?;

    let mut refs = vec![];

    match state_init {
        Some(d) => {
            order.store_bit(true)?.store_bit(true)?;
            refs.push(d);
        }
        None => {
            order.store_bit(false)?;
        }
    }

    order.store_bit(payload.is_some())?;
    refs.extend(payload);

    let order = CellDigest {
        depth: CellDigest::parent_depth(&refs),
        hash: order.build().hash_with(&refs),
    };

    let mut msg = CellBuilder::new();
    msg.store_uint(DEFAULT_WALLET_ID as u128, 32)?
        .store_uint(timeout as u128, 32)?
        .store_uint(seqno as u128, 32)?
        .store_uint(0, 8)?
        .store_uint(send_mode as u128, 8)?;

    Ok(msg.build().hash_with(&[order]))
}

#[async_trait]
impl Exchange for Emulator {
    type Error = EmulatorError;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(
        &self,
        command: &APDUCommand<I>,
    ) -> Result<APDUAnswer<Self::AnswerType>, Self::Error>
    where
        I: std::ops::Deref<Target = [u8]> + Send + Sync,
    {
        let apdu = Apdu {
            cla: command.cla,
            ins: command.ins,
            p1: command.p1,
            p2: command.p2,
            data: command.data.to_vec(),
        };

        let delay = self.lock().delay.filter(|d| {
            apdu.cla == TON_APDU_CLA && apdu.ins == d.ins as u8 && apdu.p2 == d.p2
        });
        if let Some(d) = delay {
            trace!("delaying response by {:?}", d.duration);
            tokio::time::sleep(d.duration).await;
        }

        let (mut data, code) = self.handle(apdu);

        debug!("emulator response: {} bytes (status: {:04x})", data.len(), code);

        data.extend_from_slice(&code.to_be_bytes());

        APDUAnswer::from_answer(data).map_err(|_| EmulatorError::Answer)
    }
}

#[cfg(test)]
mod test {
    use ledger_ton_core::{build_transfer, MsgAddress, TonPayloadFormat, Transaction};

    use super::*;

    fn addr(workchain_id: i32, v: u8) -> MsgAddress {
        MsgAddress {
            workchain_id,
            address: [v; 32],
        }
    }

    #[test]
    fn rebuilds_transfer_hash() {
        let mut tx = Transaction::new(addr(-1, 0x33), 12_345, 9);
        tx.timeout = Some(1_700_000_000);
        tx.payload = Some(TonPayloadFormat::Comment {
            text: "emulated".to_string(),
        });

        let t = build_transfer(&tx).unwrap();

        assert_eq!(transfer_hash(&t.package), Some(t.hash()));
    }

    #[test]
    fn rejects_short_package() {
        let tx = Transaction::new(addr(0, 0x11), 1, 1);
        let t = build_transfer(&tx).unwrap();

        assert_eq!(transfer_hash(&t.package[..10]), None);
    }

    #[test]
    fn chunk_state() {
        let e = Emulator::new([1; 32]);
        let path = AccountPath::new(0, false, 0);

        // Chunks without priming are rejected
        let (_, sw) = e.handle(Apdu {
            cla: TON_APDU_CLA,
            ins: Instruction::SignTx as u8,
            p1: 0,
            p2: ChunkP2::Last as u8,
            data: vec![0x00],
        });
        assert_eq!(sw, 0x6982);

        let (_, sw) = e.handle(Apdu {
            cla: TON_APDU_CLA,
            ins: Instruction::SignTx as u8,
            p1: 0,
            p2: ChunkP2::Start as u8,
            data: path.encode().to_vec(),
        });
        assert_eq!(sw, SW_OK);
        assert_eq!(e.log().len(), 2);
    }
}
