use base64::prelude::{Engine as _, BASE64_STANDARD, BASE64_URL_SAFE};

use ledger_ton::ton_core::{Cell, CellExt};

/// Variable-length base64 argument, standard or url-safe alphabet
#[derive(Clone, PartialEq, Debug)]
pub struct B64Data(pub Vec<u8>);

impl std::str::FromStr for B64Data {
    type Err = base64::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BASE64_STANDARD
            .decode(s)
            .or_else(|_| BASE64_URL_SAFE.decode(s))
            .map(B64Data)
    }
}

impl AsRef<[u8]> for B64Data {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Base64 encoded bag-of-cells argument
#[derive(Clone, PartialEq, Debug)]
pub struct BocData(pub Cell);

impl std::str::FromStr for BocData {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let b = B64Data::from_str(s)?;
        let c = Cell::from_boc(b.as_ref())?;
        Ok(BocData(c))
    }
}

/// Current unix time in seconds
pub fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Parse a TON amount in whole or fractional tons (`1.5`) to nanotons
pub fn parse_tons(s: &str) -> Result<u128, anyhow::Error> {
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if frac.len() > 9 {
        return Err(anyhow::anyhow!("at most 9 decimal places are supported"));
    }

    let whole: u128 = match whole.is_empty() {
        true => 0,
        false => whole.parse()?,
    };
    let frac: u128 = match frac.is_empty() {
        true => 0,
        false => format!("{frac:0<9}").parse()?,
    };

    whole
        .checked_mul(1_000_000_000)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(|| anyhow::anyhow!("amount overflow"))
}
