//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    app_info::{AppInfo, AppVersion},
    chunk_frames,
    path::AccountPath,
    sign::{ProofReq, PublicKeyResp, SignatureResp},
    status::{check_status, TransportStatusError, SW_OK},
    AddressFlags, ApduError, ChunkP2, Instruction, BOLOS_APDU_CLA, CHUNK_SIZE,
    DASHBOARD_APP_NAME, GET_APP_AND_VERSION_INS, OPEN_APP_INS, TON_APDU_CLA, TON_APP_NAME,
};
