//! TON account addresses
//!
//! Accepts the raw form (`0:4f1c...`) and the 48-character user-friendly
//! form in either base64 alphabet. User-friendly layout (36 bytes):
//!
//! ```text
//! flags:u8 | workchain:i8 | hash:[u8; 32] | crc16-xmodem(first 34 bytes):u16 BE
//! ```
//!
//! Flags: `0x11` bounceable, `0x51` non-bounceable, `| 0x80` testnet-only.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use crc::{Crc, CRC_16_XMODEM};
use pizzabox_core::CellError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

const FLAG_BOUNCEABLE: u8 = 0x11;
const FLAG_NON_BOUNCEABLE: u8 = 0x51;
const FLAG_TEST_ONLY: u8 = 0x80;

/// Internal (`addr_std`) account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TonAddress {
    pub workchain: i32,
    pub hash_part: [u8; 32],
}

impl TonAddress {
    pub const fn new(workchain: i32, hash_part: [u8; 32]) -> Self {
        Self {
            workchain,
            hash_part,
        }
    }

    /// Parse `workchain:hex64`
    pub fn from_raw(s: &str) -> Result<Self, CellError> {
        let (wc, hash) = s
            .split_once(':')
            .ok_or_else(|| CellError::InvalidAddress(format!("missing ':' in {}", s)))?;
        let workchain: i32 = wc
            .parse()
            .map_err(|_| CellError::InvalidAddress(format!("invalid workchain in {}", s)))?;
        let bytes = hex::decode(hash)
            .map_err(|_| CellError::InvalidAddress(format!("invalid hex hash in {}", s)))?;
        let hash_part: [u8; 32] = bytes.try_into().map_err(|_| {
            CellError::InvalidAddress(format!("hash part of {} is not 32 bytes", s))
        })?;
        Ok(Self::new(workchain, hash_part))
    }

    /// Parse the user-friendly base64 / base64url form, verifying the checksum
    pub fn from_base64(s: &str) -> Result<Self, CellError> {
        if s.len() != 48 {
            return Err(CellError::InvalidAddress(format!(
                "user-friendly address must be 48 characters, got {}",
                s.len()
            )));
        }
        let bytes = if s.contains(['-', '_']) {
            URL_SAFE.decode(s)
        } else {
            STANDARD.decode(s)
        }
        .map_err(|e| CellError::InvalidAddress(format!("invalid base64 in {}: {}", s, e)))?;

        if bytes.len() != 36 {
            return Err(CellError::InvalidAddress(format!(
                "decoded address is {} bytes, expected 36",
                bytes.len()
            )));
        }

        let flags = bytes[0] & !FLAG_TEST_ONLY;
        if flags != FLAG_BOUNCEABLE && flags != FLAG_NON_BOUNCEABLE {
            return Err(CellError::InvalidAddress(format!(
                "unknown address tag 0x{:02x}",
                bytes[0]
            )));
        }

        let expected = CRC16.checksum(&bytes[..34]);
        let found = u16::from_be_bytes([bytes[34], bytes[35]]);
        if expected != found {
            return Err(CellError::InvalidAddress(format!(
                "checksum mismatch in {}",
                s
            )));
        }

        let mut hash_part = [0u8; 32];
        hash_part.copy_from_slice(&bytes[2..34]);
        Ok(Self::new(bytes[1] as i8 as i32, hash_part))
    }

    /// `workchain:hex64`
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash_part))
    }

    fn user_friendly_bytes(&self, non_bounceable: bool, testnet: bool) -> [u8; 36] {
        let mut bytes = [0u8; 36];
        let mut flags = if non_bounceable {
            FLAG_NON_BOUNCEABLE
        } else {
            FLAG_BOUNCEABLE
        };
        if testnet {
            flags |= FLAG_TEST_ONLY;
        }
        bytes[0] = flags;
        bytes[1] = self.workchain as i8 as u8;
        bytes[2..34].copy_from_slice(&self.hash_part);
        let crc = CRC16.checksum(&bytes[..34]);
        bytes[34..].copy_from_slice(&crc.to_be_bytes());
        bytes
    }

    /// User-friendly form in the url-safe alphabet
    pub fn to_base64_url_flags(&self, non_bounceable: bool, testnet: bool) -> String {
        URL_SAFE.encode(self.user_friendly_bytes(non_bounceable, testnet))
    }

    /// Bounceable mainnet url-safe form (`EQ...` / `Ef...`)
    pub fn to_base64_url(&self) -> String {
        self.to_base64_url_flags(false, false)
    }
}

impl FromStr for TonAddress {
    type Err = CellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(':') {
            Self::from_raw(s)
        } else {
            Self::from_base64(s)
        }
    }
}

impl fmt::Display for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64_url())
    }
}

impl fmt::Debug for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TonAddress({})", self.to_raw())
    }
}

impl Serialize for TonAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64_url())
    }
}

impl<'de> Deserialize<'de> for TonAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
