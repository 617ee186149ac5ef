//! Command line utility for interacting with the Ledger TON application

use std::error::Error;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use clap::Parser;
use ledger_transport::Exchange;
use log::{debug, error, info, LevelFilter};

use ledger_ton::{
    apdu::{path::AccountPath, AddressFlags},
    ton_core::{
        payload::JettonTransfer, sign_data::SignDataRequest, transfer::StateInit, CellExt,
        CellParserExt, MsgAddress, TonPayloadFormat, Transaction,
    },
    transport::{GenericTransport, TcpOptions},
    Connect, DeviceHandle, Filter, LedgerInfo, LedgerProvider,
};

mod helpers;
use helpers::*;

/// Ledger TON command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Supported transports for ledger discovery
    #[clap(long, value_enum, default_value = "any")]
    target: Filter,

    /// Device index (where more than one device is available)
    #[clap(long, default_value = "0")]
    device_index: usize,

    /// Speculos connection, used with `--target tcp`
    #[clap(flatten)]
    tcp: TcpOptions,

    /// Timeout for user approval in seconds
    #[clap(long, default_value = "120")]
    user_timeout: u64,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

/// Account selection, shared by account operations
#[derive(Clone, PartialEq, Debug, clap::Args)]
struct AccountArgs {
    /// Account index for SLIP-0010 derivation
    #[clap(long, default_value = "0")]
    account: u32,

    /// Use testnet derivation
    #[clap(long)]
    testnet: bool,

    /// Workchain id
    #[clap(long, default_value = "0", allow_hyphen_values = true)]
    workchain: i8,
}

impl AccountArgs {
    fn path(&self) -> AccountPath {
        AccountPath::new(self.account, self.testnet, self.workchain)
    }
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// List available devices
    List,

    /// Fetch running application info
    AppInfo,

    /// Fetch TON application version
    Version,

    /// Fetch account public key and v4R2 wallet address
    Address {
        #[clap(flatten)]
        account: AccountArgs,

        /// Display bounceable friendly address
        #[clap(long)]
        bounceable: bool,
    },

    /// Display account address on the device for validation
    ValidateAddress {
        #[clap(flatten)]
        account: AccountArgs,

        /// Display bounceable form
        #[clap(long)]
        bounceable: bool,

        /// Display testnet-only form
        #[clap(long)]
        test_only: bool,
    },

    /// Sign a transfer
    Sign {
        #[clap(flatten)]
        account: AccountArgs,

        /// Destination address (raw or user-friendly)
        #[clap(long)]
        to: MsgAddress,

        /// Amount in TON (`1.5`)
        #[clap(long, value_parser = parse_tons)]
        amount: u128,

        /// Wallet sequence number
        #[clap(long)]
        seqno: u32,

        /// Message expiry (unix seconds)
        #[clap(long)]
        timeout: Option<u32>,

        /// Wallet send mode
        #[clap(long, default_value = "3")]
        send_mode: u8,

        /// Send as a bounceable message
        #[clap(long)]
        bounceable: bool,

        /// Text comment payload
        #[clap(long, conflicts_with_all = ["payload", "jetton_amount"])]
        comment: Option<String>,

        /// Base64 encoded message body BOC
        #[clap(long, conflicts_with = "jetton_amount")]
        payload: Option<BocData>,

        /// Base64 encoded state init BOC
        #[clap(long)]
        state_init: Option<BocData>,

        /// Jetton amount (in jetton base units), builds a jetton transfer to
        /// `--jetton-to` via the wallet at `--to`
        #[clap(long, requires_all = ["jetton_to", "jetton_response"])]
        jetton_amount: Option<u128>,

        /// Jetton recipient
        #[clap(long)]
        jetton_to: Option<MsgAddress>,

        /// Jetton excess response address
        #[clap(long)]
        jetton_response: Option<MsgAddress>,
    },

    /// Sign a TON Connect address proof
    Proof {
        #[clap(flatten)]
        account: AccountArgs,

        /// Requesting domain
        #[clap(long)]
        domain: String,

        /// Proof timestamp (unix seconds), defaults to now
        #[clap(long)]
        timestamp: Option<u64>,

        /// Proof payload
        #[clap(long, default_value = "")]
        payload: String,
    },

    /// Sign off-chain data
    SignData {
        #[clap(flatten)]
        account: AccountArgs,

        /// Plain text to sign
        #[clap(long, conflicts_with = "cell", required_unless_present = "cell")]
        text: Option<String>,

        /// Base64 encoded application data BOC
        #[clap(long)]
        cell: Option<BocData>,

        /// Application domain (application data only)
        #[clap(long)]
        domain: Option<String>,

        /// Contract address (application data only)
        #[clap(long)]
        address: Option<MsgAddress>,

        /// Timestamp (unix seconds), defaults to now
        #[clap(long)]
        timestamp: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    // Connect to ledger device
    let p = LedgerProvider::new()?;

    debug!("Using transport: {:?}", args.target);

    // Explicit TCP targets connect to the provided speculos instance
    let devices = match args.target {
        Filter::Tcp => vec![LedgerInfo::Tcp(args.tcp.clone())],
        _ => p.list_devices(args.target).await,
    };
    if devices.is_empty() {
        return Err(anyhow::anyhow!("No devices found"));
    }

    // Handle list command
    if args.cmd == Actions::List {
        info!("Devices:");
        for (i, d) in devices.iter().enumerate() {
            info!("  {}: {}", i, d);
        }

        return Ok(());
    }

    // Select device by index
    if args.device_index >= devices.len() {
        return Err(anyhow::anyhow!(
            "Invalid device index: {} (max: {})",
            args.device_index,
            devices.len() - 1
        ));
    }

    debug!(
        "Using device {}: {}",
        args.device_index, devices[args.device_index]
    );

    // Connect to device
    let t = match Connect::<GenericTransport>::connect(&p, &devices[args.device_index]).await {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to connect to device: {}", devices[args.device_index]);
            return Err(e.into());
        }
    };

    let t = t.with_user_timeout(std::time::Duration::from_secs(args.user_timeout));

    // Execute command
    execute(t, args.cmd).await?;

    Ok(())
}

/// Execute a command with the provided transport
async fn execute<T, E>(t: DeviceHandle<T>, cmd: Actions) -> anyhow::Result<()>
where
    T: Exchange<Error = E> + Sync + Send + 'static,
    E: Error + Sync + Send + 'static,
{
    debug!("Executing command: {:?}", cmd);

    match cmd {
        Actions::AppInfo => {
            let i = t.app_info().await?;

            info!("app info: {:#?}", i);
        }
        Actions::Version => {
            let v = t.get_version().await?;

            info!("TON app version: {}.{}.{}", v.major, v.minor, v.patch);
        }
        Actions::Address {
            account,
            bounceable,
        } => {
            let path = account.path();
            info!("requesting account for path: {:?}", path.elements());

            let a = t.get_account(&path).await?;

            info!("public key: {}", hex::encode(a.public_key));
            info!("raw address: {}", a.address.to_hex());
            info!("friendly address: {}", a.friendly_address(bounceable));
        }
        Actions::ValidateAddress {
            account,
            bounceable,
            test_only,
        } => {
            let mut flags = AddressFlags::empty();
            flags.set(AddressFlags::BOUNCEABLE, bounceable);
            flags.set(AddressFlags::TEST_ONLY, test_only);

            info!("confirm the address on the device");

            let a = t.validate_address(&account.path(), flags).await?;

            info!("address validated for key: {}", hex::encode(a.public_key));
        }
        Actions::Sign {
            account,
            to,
            amount,
            seqno,
            timeout,
            send_mode,
            bounceable,
            comment,
            payload,
            state_init,
            jetton_amount,
            jetton_to,
            jetton_response,
        } => {
            let payload = match (comment, payload, jetton_amount, jetton_to, jetton_response) {
                (Some(text), ..) => Some(TonPayloadFormat::Comment { text }),
                (_, Some(BocData(c)), ..) => Some(TonPayloadFormat::decode(&c)),
                (_, _, Some(amount), Some(destination), Some(response_destination)) => {
                    Some(TonPayloadFormat::JettonTransfer(JettonTransfer {
                        query_id: None,
                        amount,
                        destination,
                        response_destination,
                        custom_payload: None,
                        forward_amount: 1,
                        forward_payload: None,
                    }))
                }
                _ => None,
            };

            if let Some(p) = payload.as_ref().filter(|p| p.is_unsafe()) {
                info!("payload not recognised, device will request blind signing: {:?}", p);
            }

            let state_init = state_init.map(|BocData(c)| decode_state_init(&c)).transpose()?;

            let tx = Transaction {
                destination: to,
                send_mode,
                seqno,
                timeout,
                bounceable,
                coins: amount,
                state_init,
                payload,
            };

            let transfer = ledger_ton::ton_core::build_transfer(&tx)?;
            let body = transfer.clone();

            info!("confirm the transfer on the device");

            let signature = t.sign_transfer(&account.path(), transfer).await?;
            let signed = body.signed_body(&signature)?;

            info!("hash: {}", hex::encode(body.hash()));
            info!("signature: {}", hex::encode(signature));
            info!("signed body: {}", BASE64_STANDARD.encode(signed.to_boc()?));
        }
        Actions::Proof {
            account,
            domain,
            timestamp,
            payload,
        } => {
            let timestamp = timestamp.unwrap_or_else(now);

            info!("confirm the proof on the device");

            let signature = t
                .sign_address_proof(&account.path(), &domain, timestamp, payload.as_bytes())
                .await?;

            info!("timestamp: {}", timestamp);
            info!("signature: {}", BASE64_STANDARD.encode(signature));
        }
        Actions::SignData {
            account,
            text,
            cell,
            domain,
            address,
            timestamp,
        } => {
            let req = match (text, cell) {
                (Some(text), _) => SignDataRequest::Plaintext { text },
                (None, Some(BocData(data))) => SignDataRequest::AppData {
                    address,
                    domain,
                    data,
                },
                (None, None) => return Err(anyhow::anyhow!("--text or --cell required")),
            };
            let timestamp = timestamp.unwrap_or_else(now);

            info!("confirm the data on the device");

            let r = t.sign_data(&account.path(), &req, timestamp).await?;

            info!("timestamp: {}", timestamp);
            info!("hash: {}", hex::encode(r.hash));
            info!("signature: {}", BASE64_STANDARD.encode(r.signature));
        }
        Actions::List => unreachable!(),
    }

    Ok(())
}

/// Split a state init cell into code and data
fn decode_state_init(c: &ledger_ton::ton_core::Cell) -> anyhow::Result<StateInit> {
    let mut s = c.parser();

    // split_depth and special are unsupported
    if s.load_bit()? || s.load_bit()? {
        return Err(anyhow::anyhow!("unsupported state init fields"));
    }

    let code = s.load_maybe_ref()?;
    let data = s.load_maybe_ref()?;

    if s.load_bit()? {
        return Err(anyhow::anyhow!("state init libraries are unsupported"));
    }
    s.end_parse()?;

    Ok(StateInit { code, data })
}
