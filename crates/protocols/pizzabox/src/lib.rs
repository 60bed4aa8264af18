//! PizzaBox Jetton Locker
//!
//! PizzaBox locks jettons in a per-user lock record deployed by the locker
//! factory. A lock releases `first_unlock_percent` at `lock_until`, then the
//! rest in equal vesting cycles. This crate builds the wallet messages for
//! locking and claiming, and reads a lock record's storage.

pub mod constants;
pub mod fetch;
pub mod metadata;
pub mod state;
pub mod tx_builder;

use pizzabox_core::{ApiConfig, Result};
use ton_cell::TonAddress;
use tonapi_client::TonApiClient;

pub use constants::{LOCKER_FACTORY, LOCK_GAS_AMOUNT, UNLOCK_GAS_AMOUNT};
pub use fetch::{decode_storage_stack, fetch_lock_details};
pub use metadata::{build_onchain_metadata, metadata_key, MetadataValue};
pub use state::{LockRecordState, TxParams};
pub use tx_builder::{
    build_lock_tx, build_unlock_tx, validate_schedule, LockRequest, LockSchedule, Vesting,
    VestingParams,
};

/// Entry point holding the TonAPI client used for metadata and state reads
#[derive(Debug, Clone, Default)]
pub struct PizzaBox {
    client: TonApiClient,
}

impl PizzaBox {
    pub fn new(config: ApiConfig) -> Result<Self> {
        Ok(Self {
            client: TonApiClient::new(config)?,
        })
    }

    pub fn with_client(client: TonApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &TonApiClient {
        &self.client
    }

    /// Params for the jetton transfer that creates a lock
    pub async fn lock_tx_params(&self, req: &LockRequest) -> Result<TxParams> {
        build_lock_tx(&self.client, req).await
    }

    /// Params for claiming unlocked jettons from a lock record
    pub fn unlock_tx_params(lock_record: &TonAddress) -> Result<TxParams> {
        build_unlock_tx(lock_record)
    }

    pub async fn lock_details(&self, lock_record: &TonAddress) -> Result<LockRecordState> {
        fetch_lock_details(&self.client, lock_record).await
    }
}
