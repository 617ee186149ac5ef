//! Application information APDUs

use std::fmt::Display;

use crate::ApduError;

/// Running application info, returned by the dashboard `GET_APP_AND_VERSION` request
///
/// ## Encoding
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    FORMAT     |   NAME_LEN    |            NAME...            /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  VERSION_LEN  |                   VERSION...                  /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   FLAGS_LEN   |                    FLAGS...                   /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AppInfo {
    /// Application name
    pub name: String,
    /// Application version
    pub version: String,
    /// Raw application flags
    pub flags: Vec<u8>,
}

/// Only known format byte
const APP_INFO_FORMAT: u8 = 0x01;

impl AppInfo {
    /// Create a new [AppInfo] object
    pub fn new(name: &str, version: &str, flags: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            flags: flags.to_vec(),
        }
    }

    /// Encode app info response payload
    pub fn encode(&self) -> Vec<u8> {
        let mut buff = vec![APP_INFO_FORMAT];

        for field in [self.name.as_bytes(), self.version.as_bytes(), &self.flags] {
            buff.push(field.len() as u8);
            buff.extend_from_slice(field);
        }

        buff
    }

    /// Decode app info response payload
    pub fn decode(buff: &[u8]) -> Result<Self, ApduError> {
        if buff.first() != Some(&APP_INFO_FORMAT) {
            return Err(ApduError::InvalidEncoding);
        }

        let mut index = 1;
        let mut fields = [&[][..]; 3];

        for f in fields.iter_mut() {
            let n = *buff.get(index).ok_or(ApduError::InvalidLength {
                expected: index + 1,
                actual: buff.len(),
            })? as usize;
            index += 1;

            *f = buff.get(index..index + n).ok_or(ApduError::InvalidLength {
                expected: index + n,
                actual: buff.len(),
            })?;
            index += n;
        }

        let name = std::str::from_utf8(fields[0]).map_err(|_| ApduError::Utf8)?;
        let version = std::str::from_utf8(fields[1]).map_err(|_| ApduError::Utf8)?;

        Ok(Self::new(name, version, fields[2]))
    }
}

/// TON application version, returned by [Instruction::Version][crate::Instruction::Version]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct AppVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl AppVersion {
    /// Encoded length
    pub const LEN: usize = 3;

    /// Decode version response, exactly three bytes
    pub fn decode(buff: &[u8]) -> Result<Self, ApduError> {
        match buff {
            [major, minor, patch] => Ok(Self {
                major: *major,
                minor: *minor,
                patch: *patch,
            }),
            _ => Err(ApduError::InvalidLength {
                expected: Self::LEN,
                actual: buff.len(),
            }),
        }
    }

    /// Encode version response
    pub fn encode(&self) -> [u8; Self::LEN] {
        [self.major, self.minor, self.patch]
    }
}

impl Display for AppVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
