//! Test runner for speculos or emulated targets

use clap::Parser;
use log::{debug, info, LevelFilter};

use ledger_transport::Exchange;

use ledger_ton::{
    apdu::path::AccountPath,
    transport::{TcpOptions, TransportTcp},
    DeviceHandle,
};
use ledger_ton_tests::emulator::Emulator;

/// Test CLI arguments
#[derive(Clone, Debug, Parser)]
pub struct Opts {
    #[clap(subcommand)]
    pub test: Tests,

    /// Target for test execution
    #[clap(long, value_enum, default_value = "tcp", env)]
    pub target: Target,

    #[clap(flatten)]
    pub tcp: TcpOptions,

    /// Account index used for signing tests
    #[clap(long, default_value = "0")]
    pub account: u32,

    /// Log level
    #[clap(long, default_value = "debug", env)]
    pub log_level: LevelFilter,

    /// Enable logging for transports
    #[clap(long)]
    pub log_transports: bool,
}

/// Test modes
#[derive(Clone, PartialEq, Debug, Parser)]
pub enum Tests {
    /// Test account key derivation
    Accounts,
    /// Test address validation
    ValidateAddress,
    /// Test transfer signing
    Transfer,
    /// Test address proof signing
    Proof,
    /// Test off-chain data signing
    SignData,
    /// Run all tests
    All,
}

/// Test target connection
#[derive(Clone, Copy, PartialEq, Debug, clap::ValueEnum)]
pub enum Target {
    /// TCP connection for speculos simulator
    Tcp,
    /// In-process emulator
    Emulator,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load command line options
    let opts = Opts::parse();

    // Setup logging
    let mut c = simplelog::ConfigBuilder::new();
    if !opts.log_transports {
        c.add_filter_ignore_str("ledger_ton::transport");
    }

    let _ = simplelog::SimpleLogger::init(opts.log_level, c.build());

    debug!("options: {:?}", opts);

    info!("Running test '{:?}' via {:?}", opts.test, opts.target);

    // Connect to target and execute test
    match opts.target {
        Target::Tcp => {
            let t = TransportTcp::new(opts.tcp.clone()).await?;

            execute(t, opts).await?;
        }
        Target::Emulator => {
            execute(Emulator::random(), opts).await?;
        }
    };

    info!("Test OK!");

    Ok(())
}

/// Execute a test with the provided transport
async fn execute<T, E>(target: T, opts: Opts) -> anyhow::Result<()>
where
    T: Exchange<Error = E> + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    use ledger_ton_tests::*;

    let d = DeviceHandle::from(target);
    let path = AccountPath::new(opts.account, false, 0);

    let v = d.get_version().await?;
    info!("TON app version: {}.{}.{}", v.major, v.minor, v.patch);

    let run = |t: Tests| opts.test == Tests::All || opts.test == t;

    if run(Tests::Accounts) {
        account::test(&d, |_| None).await?;
    }

    if run(Tests::ValidateAddress) {
        account::validate(&d, &path).await?;
    }

    if run(Tests::Transfer) {
        transfer::test(&d, &path, &transfer::transactions()?).await?;
    }

    if run(Tests::Proof) {
        proof::test(&d, &path, "example.com", 1_700_000_000, b"proof-payload").await?;
    }

    if run(Tests::SignData) {
        sign_data::test(&d, &path, &sign_data::requests()?, 1_700_000_000).await?;
    }

    Ok(())
}
