use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use log::LevelFilter;
use simplelog::TestLogger;

use ledger_ton::{apdu::path::AccountPath, DeviceHandle, Exchange};
use ledger_ton_tests::emulator::{Emulator, EmulatorError};

/// Shared emulator, allowing tests to inspect state while a handle owns the transport
#[derive(Clone)]
pub struct Shared(pub Arc<Emulator>);

#[async_trait]
impl Exchange for Shared {
    type Error = EmulatorError;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(
        &self,
        command: &ledger_transport::APDUCommand<I>,
    ) -> Result<ledger_transport::APDUAnswer<Self::AnswerType>, Self::Error>
    where
        I: std::ops::Deref<Target = [u8]> + Send + Sync,
    {
        self.0.exchange(command).await
    }
}

/// Setup logging, with the level from `LOG_LEVEL`
pub fn init_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = TestLogger::init(log_level, simplelog::Config::default());
}

/// Setup an emulator and device handle
pub fn setup(e: Emulator) -> (Arc<Emulator>, DeviceHandle<Shared>) {
    init_logging();

    let e = Arc::new(e);
    let d = DeviceHandle::from(Shared(e.clone()));

    (e, d)
}

#[allow(unused)]
pub fn path() -> AccountPath {
    AccountPath::new(0, false, 0)
}
