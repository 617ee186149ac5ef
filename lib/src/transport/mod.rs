//! Transports and the APDU exchange adapter
//!
//! [ExchangeExt::send] is the single request / response primitive used by
//! [DeviceHandle][crate::DeviceHandle], framing a request for any
//! [Exchange] implementation and mapping the response status word.
//! [GenericTransport] hides the concrete transport type.

use async_trait::async_trait;
use ledger_transport::{APDUAnswer, APDUCommand, Exchange};
use log::{debug, trace};
use strum::Display;

#[cfg(feature = "transport_hid")]
pub use ledger_transport_hid::{LedgerHIDError, TransportNativeHID};

#[cfg(feature = "transport_tcp")]
mod tcp;
#[cfg(feature = "transport_tcp")]
pub use tcp::{TcpOptions, TransportTcp};

use ledger_ton_apdu::prelude::{check_status, CHUNK_SIZE};

use crate::Error;

/// APDU exchange adapter, implemented for all [Exchange] transports
#[async_trait]
pub trait ExchangeExt {
    /// Send a request frame `[cla][ins][p1][p2][len][data]` and return the
    /// response payload with the status word stripped.
    ///
    /// Status words outside of `accepted` fail with [Error::Status].
    /// Chunking is the caller's responsibility, requests larger than
    /// [CHUNK_SIZE] are rejected.
    async fn send(
        &self,
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: &[u8],
        accepted: &[u16],
    ) -> Result<Vec<u8>, Error>;
}

#[async_trait]
impl<T> ExchangeExt for T
where
    T: Exchange + Send + Sync,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    async fn send(
        &self,
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: &[u8],
        accepted: &[u16],
    ) -> Result<Vec<u8>, Error> {
        if data.len() > CHUNK_SIZE {
            return Err(Error::PayloadTooLong(data.len()));
        }

        debug!(
            "TX cla: {:02x} ins: {:02x} p1: {:02x} p2: {:02x} len: {}",
            cla,
            ins,
            p1,
            p2,
            data.len()
        );
        trace!("TX data: {}", hex::encode(data));

        let cmd = APDUCommand {
            cla,
            ins,
            p1,
            p2,
            data,
        };

        let resp = self
            .exchange(&cmd)
            .await
            .map_err(|e| Error::Transport(Box::new(e)))?;

        let code = resp.retcode();
        debug!("RX status: {:04x} len: {}", code, resp.data().len());
        trace!("RX data: {}", hex::encode(resp.data()));

        check_status(code, accepted)?;

        Ok(resp.data().to_vec())
    }
}

/// Transport errors for [GenericTransport]
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("TCP: {0}")]
    Tcp(#[from] std::io::Error),

    #[cfg(feature = "transport_hid")]
    #[error("HID: {0}")]
    Hid(#[from] LedgerHIDError),
}

/// Generic ledger device (abstract over transport types)
#[derive(Display)]
#[non_exhaustive]
pub enum GenericTransport {
    #[cfg(feature = "transport_hid")]
    Hid(TransportNativeHID),
    #[cfg(feature = "transport_tcp")]
    Tcp(TransportTcp),
}

/// Convert a HID transport into a generic transport
#[cfg(feature = "transport_hid")]
impl From<TransportNativeHID> for GenericTransport {
    fn from(t: TransportNativeHID) -> Self {
        Self::Hid(t)
    }
}

/// Convert a TCP transport into a generic transport
#[cfg(feature = "transport_tcp")]
impl From<TransportTcp> for GenericTransport {
    fn from(t: TransportTcp) -> Self {
        Self::Tcp(t)
    }
}

/// Implementation of [Exchange] for [GenericTransport], hiding transport types
#[async_trait]
impl Exchange for GenericTransport {
    type Error = TransportError;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(
        &self,
        command: &APDUCommand<I>,
    ) -> Result<APDUAnswer<Self::AnswerType>, Self::Error>
    where
        I: std::ops::Deref<Target = [u8]> + Send + Sync,
    {
        let r = match *self {
            #[cfg(feature = "transport_hid")]
            Self::Hid(ref t) => Exchange::exchange(t, command).await?,
            #[cfg(feature = "transport_tcp")]
            Self::Tcp(ref t) => Exchange::exchange(t, command).await?,
        };

        Ok(r)
    }
}
