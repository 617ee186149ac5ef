//! Ledger TON API Library (and CLI)
//!
//! [DeviceHandle] drives the TON application over any [Exchange] transport,
//! with [LedgerProvider] for device discovery and connection.
//!
//! ```no_run
//! # async fn f() -> Result<(), ledger_ton::Error> {
//! use ledger_ton::{
//!     apdu::path::AccountPath,
//!     ton_core::{MsgAddress, Transaction},
//!     transport::GenericTransport,
//!     Connect, Filter, LedgerProvider,
//! };
//!
//! let p = LedgerProvider::new()?;
//! let devices = p.list_devices(Filter::Any).await;
//!
//! let d = Connect::<GenericTransport>::connect(&p, &devices[0]).await?;
//!
//! let path = AccountPath::new(0, false, 0);
//! let account = d.get_account(&path).await?;
//! println!("wallet address: {}", account.friendly_address(false));
//!
//! let to = MsgAddress {
//!     workchain_id: 0,
//!     address: [0u8; 32],
//! };
//! let tx = Transaction::new(to, 1_000_000_000, 1);
//! let signature = d.sign_transaction(&path, &tx).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt::Debug;

pub use ledger_transport::Exchange;

use async_trait::async_trait;

#[cfg(feature = "transport_hid")]
use ledger_transport_hid::hidapi::HidApi;

/// Re-export transports for consumer use
pub mod transport;
use transport::*;

/// Re-export `ledger-ton-apdu` for consumers
pub use ledger_ton_apdu::{self as apdu};

/// Re-export `ledger-ton-core` for consumers
pub use ledger_ton_core::{self as ton_core};

mod handle;
pub use handle::{DeviceHandle, DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_TIMEOUT};

mod account;
pub use account::LedgerAccount;

pub mod devices;

mod error;
pub use error::Error;

/// Ledger provider manages ledger devices and connections
pub struct LedgerProvider {
    #[cfg(feature = "transport_hid")]
    hid_api: HidApi,
}

/// Device discovery filter
#[derive(Copy, Clone, Debug, PartialEq, clap::ValueEnum, strum::Display)]
#[non_exhaustive]
pub enum Filter {
    /// List all devices available using supported transport
    Any,
    /// List only HID devices
    Hid,
    /// List only TCP devices
    Tcp,
}

/// Ledger device information for listing, used by connect
#[derive(Debug)]
pub enum LedgerInfo {
    #[cfg(feature = "transport_hid")]
    Hid(ledger_transport_hid::hidapi::DeviceInfo),
    #[cfg(feature = "transport_tcp")]
    Tcp(TcpOptions),
}

impl LedgerProvider {
    /// Create a new ledger provider
    /// NOTE: only one provider may exist at a time (workaround for global HID context errors on macos/m1)
    pub fn new() -> Result<Self, Error> {
        #[cfg(feature = "transport_hid")]
        return Ok(Self {
            hid_api: HidApi::new().map_err(|_| Error::HidInit)?,
        });

        #[cfg(not(feature = "transport_hid"))]
        return Ok(Self {});
    }

    /// List available ledger devices
    pub async fn list_devices(&self, filter: Filter) -> Vec<LedgerInfo> {
        let mut devices = vec![];

        #[cfg(feature = "transport_hid")]
        if filter == Filter::Any || filter == Filter::Hid {
            TransportNativeHID::list_ledgers(&self.hid_api)
                .cloned()
                .for_each(|d| {
                    devices.push(LedgerInfo::Hid(d));
                });
        }

        #[cfg(feature = "transport_tcp")]
        if filter == Filter::Any || filter == Filter::Tcp {
            // Try connecting to default speculos port
            let o = TcpOptions::default();
            if let Ok(_t) = tokio::net::TcpStream::connect(o.socket_addr()).await {
                // Return default port if connection succeeded
                devices.push(LedgerInfo::Tcp(o));
            };
        }

        log::debug!("Found {} devices: {:?}", devices.len(), devices);

        devices
    }
}

/// Generic ledger device handle (abstract over transport types)
pub type GenericHandle = DeviceHandle<GenericTransport>;

impl GenericHandle {
    /// Create a new generic device handle
    pub fn new(d: impl Into<GenericTransport>) -> Self {
        Self::from(d.into())
    }
}

impl std::fmt::Display for LedgerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            #[cfg(feature = "transport_hid")]
            LedgerInfo::Hid(ref hid_info) => {
                let model = devices::by_usb_product_id(hid_info.product_id())
                    .map(|m| m.product_name)
                    .or(hid_info.product_string())
                    .unwrap_or("UNKNOWN");

                write!(
                    f,
                    "{:16} (USB, {:04x}:{:04x}, {})",
                    model,
                    hid_info.vendor_id(),
                    hid_info.product_id(),
                    hid_info.serial_number().unwrap_or("UNKNOWN"),
                )
            }
            #[cfg(feature = "transport_tcp")]
            LedgerInfo::Tcp(ref tcp_info) => {
                write!(
                    f,
                    "{:16} (TCP, {}:{})",
                    "Speculos", tcp_info.addr, tcp_info.port
                )
            }
        }
    }
}

/// Connect trait for supported transports
#[async_trait]
pub trait Connect<T: Exchange> {
    type Options: Debug;

    /// Connect to the specified device
    async fn connect(&self, opts: &Self::Options) -> Result<DeviceHandle<T>, Error>;
}

/// Generic connect implementation
#[cfg(any(feature = "transport_hid", feature = "transport_tcp"))]
#[async_trait]
impl Connect<GenericTransport> for LedgerProvider {
    type Options = LedgerInfo;

    async fn connect(&self, opts: &Self::Options) -> Result<DeviceHandle<GenericTransport>, Error> {
        let t = match *opts {
            #[cfg(feature = "transport_hid")]
            LedgerInfo::Hid(ref hid_info) => {
                // Connect to device
                let t = TransportNativeHID::open_device(&self.hid_api, hid_info)?;

                GenericTransport::Hid(t)
            }
            #[cfg(feature = "transport_tcp")]
            LedgerInfo::Tcp(ref tcp_info) => {
                // Connect to device
                let t = TransportTcp::new(tcp_info.clone()).await?;

                GenericTransport::Tcp(t)
            }
        };

        Ok(DeviceHandle::from(t))
    }
}

/// Connect implementation for HID devices
#[cfg(feature = "transport_hid")]
#[async_trait]
impl Connect<TransportNativeHID> for LedgerProvider {
    type Options = ledger_transport_hid::hidapi::DeviceInfo;

    async fn connect(
        &self,
        opts: &Self::Options,
    ) -> Result<DeviceHandle<TransportNativeHID>, Error> {
        // Connect to device
        let t = TransportNativeHID::open_device(&self.hid_api, opts)?;

        // Create handle
        let d = DeviceHandle::from(t);

        Ok(d)
    }
}

/// Connect implementation for TCP devices
#[cfg(feature = "transport_tcp")]
#[async_trait]
impl Connect<TransportTcp> for LedgerProvider {
    type Options = TcpOptions;

    async fn connect(&self, opts: &Self::Options) -> Result<DeviceHandle<TransportTcp>, Error> {
        // Connect to device
        let t = TransportTcp::new(opts.clone()).await?;

        // Create handle
        let d = DeviceHandle::from(t);

        Ok(d)
    }
}
