//! PizzaBox output and state types

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use num_bigint::BigUint;
use pizzabox_core::{biguint_string, NanoTon};
use serde::{Deserialize, Serialize};
use ton_cell::{Cell, TonAddress};

/// Everything a wallet needs to send one outgoing internal message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxParams {
    pub destination: TonAddress,
    /// Attached TON in nanoton
    pub amount: NanoTon,
    /// BOC of the message body
    #[serde(with = "payload_base64")]
    pub payload: Vec<u8>,
}

impl TxParams {
    /// Body BOC in standard base64, the form TON Connect expects
    pub fn payload_base64(&self) -> String {
        STANDARD.encode(&self.payload)
    }

    pub fn payload_cell(&self) -> Result<Cell, pizzabox_core::CellError> {
        Cell::from_boc(&self.payload)
    }
}

mod payload_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

/// Decoded storage of a lock record contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LockRecordState {
    #[serde(rename_all = "camelCase")]
    Inited {
        factory_address: TonAddress,
        #[serde(with = "biguint_string")]
        index: BigUint,
        owner_address: TonAddress,
        jetton_minter_address: TonAddress,
        jetton_wallet_address: Option<TonAddress>,
        /// On-chain metadata content cell
        content: Option<Cell>,
        factory_jetton_wallet: TonAddress,
        #[serde(with = "biguint_string")]
        locked_jettons: BigUint,
        jettons_locked: bool,
        claimed_times: u64,
        #[serde(with = "biguint_string")]
        claimed_jettons: BigUint,
        /// Unix seconds
        first_unlock_time: u64,
        first_unlock_size: u64,
        /// Seconds between vesting unlocks
        cycle_length: u64,
        cycles_number: u64,
    },
    #[serde(rename_all = "camelCase")]
    Uninit {
        factory_address: TonAddress,
        #[serde(with = "biguint_string")]
        index: BigUint,
    },
}

impl LockRecordState {
    pub fn factory_address(&self) -> &TonAddress {
        match self {
            LockRecordState::Inited {
                factory_address, ..
            }
            | LockRecordState::Uninit {
                factory_address, ..
            } => factory_address,
        }
    }

    pub fn index(&self) -> &BigUint {
        match self {
            LockRecordState::Inited { index, .. } | LockRecordState::Uninit { index, .. } => index,
        }
    }

    pub fn is_inited(&self) -> bool {
        matches!(self, LockRecordState::Inited { .. })
    }
}
