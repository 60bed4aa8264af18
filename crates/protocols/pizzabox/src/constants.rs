//! PizzaBox locker constants and gas parameters

use pizzabox_core::NanoTon;

/// Locker factory contract (receives the jetton transfer)
pub const LOCKER_FACTORY: &str = "EQA2apWqdiZiyJhnYDc-kjEWlMprUurkqqRfDQ3Sx-gdcImu";

/// TEP-74 jetton transfer
pub const OP_JETTON_TRANSFER: u32 = 0x0f8a7ea5;

/// Claim unlocked jettons from a lock record
pub const OP_CLAIM: u32 = 0xa769de27;

/// TON attached to the jetton transfer (0.75 TON)
pub const LOCK_GAS_AMOUNT: NanoTon = 750_000_000;

/// TON forwarded to the factory with the transfer notification (0.645 TON)
pub const LOCK_FORWARD_AMOUNT: NanoTon = 645_000_000;

/// TON attached to the claim message (0.05 TON)
pub const UNLOCK_GAS_AMOUNT: NanoTon = 50_000_000;

/// `first_unlock_percent` is stored as a fixed-point uint32 with this scale
pub const PERCENT_SCALE: f64 = 1_000_000.0;

/// Lock record get-method returning the full storage
pub const GET_STORAGE_DATA: &str = "get_storage_data";

pub const VESTING_IMAGE_URL: &str = "https://api.pizzaton.me/launchpad/vesting/img/";
pub const VESTING_META_URL: &str = "https://api.pizzaton.me/launchpad/vesting/meta/";
