//! Speculos TCP transport

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use ledger_transport::{APDUAnswer, APDUCommand, Exchange};
use log::debug;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::Mutex,
};

/// Speculos APDU socket options
#[derive(Clone, Debug, PartialEq, clap::Args)]
pub struct TcpOptions {
    /// Speculos APDU server address
    #[clap(long = "tcp-addr", default_value = "127.0.0.1", env = "SPECULOS_ADDR")]
    pub addr: IpAddr,

    /// Speculos APDU server port
    #[clap(long = "tcp-port", default_value = "9999", env = "SPECULOS_APDU_PORT")]
    pub port: u16,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 9999,
        }
    }
}

impl TcpOptions {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }
}

/// TCP transport for the speculos emulator APDU socket
///
/// Requests are framed as `[len:u32 BE][apdu]`, responses as
/// `[len:u32 BE][data:len][status:2]`.
pub struct TransportTcp {
    s: Mutex<TcpStream>,
}

impl TransportTcp {
    /// Connect to a speculos APDU socket
    pub async fn new(opts: TcpOptions) -> Result<Self, std::io::Error> {
        debug!("Connecting to speculos at {}", opts.socket_addr());

        let s = TcpStream::connect(opts.socket_addr()).await?;

        Ok(Self { s: Mutex::new(s) })
    }
}

#[async_trait]
impl Exchange for TransportTcp {
    type Error = std::io::Error;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(
        &self,
        command: &APDUCommand<I>,
    ) -> Result<APDUAnswer<Self::AnswerType>, Self::Error>
    where
        I: std::ops::Deref<Target = [u8]> + Send + Sync,
    {
        let apdu = command.serialize();
        let mut s = self.s.lock().await;

        let mut req = Vec::with_capacity(apdu.len() + 4);
        req.extend_from_slice(&(apdu.len() as u32).to_be_bytes());
        req.extend_from_slice(&apdu);
        s.write_all(&req).await?;

        let mut len = [0u8; 4];
        s.read_exact(&mut len).await?;
        let n = u32::from_be_bytes(len) as usize;

        let mut resp = vec![0u8; n + 2];
        s.read_exact(&mut resp).await?;

        APDUAnswer::from_answer(resp).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, "short APDU answer")
        })
    }
}
