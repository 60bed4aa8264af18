//! Lock record state via the `get_storage_data` get-method

use pizzabox_core::{ProtocolError, Result};
use ton_cell::TonAddress;
use tonapi_client::{StackError, StackReader, TonApiClient, TvmStackRecord};

use crate::constants::GET_STORAGE_DATA;
use crate::state::LockRecordState;

/// Fetch and decode the storage of a lock record.
pub async fn fetch_lock_details(
    client: &TonApiClient,
    lock_record: &TonAddress,
) -> Result<LockRecordState> {
    let result = client.exec_get_method(lock_record, GET_STORAGE_DATA).await?;
    let state = decode_storage_stack(result.stack)?;

    tracing::debug!(
        lock_record = %lock_record,
        inited = state.is_inited(),
        "Fetched lock record state"
    );
    Ok(state)
}

/// Decode the `get_storage_data` stack. An uninitialized record only carries
/// its factory and index; anything after those is ignored.
pub fn decode_storage_stack(
    stack: Vec<TvmStackRecord>,
) -> std::result::Result<LockRecordState, ProtocolError> {
    let mut reader = StackReader::new(stack);
    decode_state(&mut reader).map_err(|e| ProtocolError::StackDecode {
        message: e.to_string(),
    })
}

fn decode_state(r: &mut StackReader) -> std::result::Result<LockRecordState, StackError> {
    if !r.read_bool()? {
        return Ok(LockRecordState::Uninit {
            factory_address: r.read_address()?,
            index: r.read_big_uint()?,
        });
    }

    Ok(LockRecordState::Inited {
        factory_address: r.read_address()?,
        index: r.read_big_uint()?,
        owner_address: r.read_address()?,
        jetton_minter_address: r.read_address()?,
        jetton_wallet_address: r.read_address_opt()?,
        content: r.read_cell_opt()?,
        factory_jetton_wallet: r.read_address()?,
        locked_jettons: r.read_big_uint()?,
        jettons_locked: r.read_bool()?,
        claimed_times: r.read_u64()?,
        claimed_jettons: r.read_big_uint()?,
        first_unlock_time: r.read_u64()?,
        first_unlock_size: r.read_u64()?,
        cycle_length: r.read_u64()?,
        cycles_number: r.read_u64()?,
    })
}
