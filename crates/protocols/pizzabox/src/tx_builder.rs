//! PizzaBox transaction builders
//!
//! Two message types:
//! 1. Lock   - jetton transfer to the locker factory carrying a deploy-vesting payload
//! 2. Unlock - claim message sent to an existing lock record

use std::sync::Arc;

use num_bigint::BigUint;
use pizzabox_core::constants::SECONDS_PER_DAY;
use pizzabox_core::{CellError, ProtocolError, Result};
use serde::{Deserialize, Serialize};
use ton_cell::{Cell, CellBuilder, TonAddress};
use tonapi_client::TonApiClient;

use crate::constants::{
    LOCKER_FACTORY, LOCK_FORWARD_AMOUNT, LOCK_GAS_AMOUNT, OP_CLAIM, OP_JETTON_TRANSFER,
    PERCENT_SCALE, UNLOCK_GAS_AMOUNT, VESTING_IMAGE_URL, VESTING_META_URL,
};
use crate::metadata::{build_onchain_metadata, MetadataValue};
use crate::state::TxParams;

// =============================================================================
// Lock Transaction
// =============================================================================

/// Linear vesting after the first unlock
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vesting {
    pub cycle_number: u32,
    /// Cycle length in days; fractional values are rounded up to whole days
    pub cycle_length_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSchedule {
    /// Unix seconds (UTC) of the first unlock
    pub lock_until: u32,
    /// Share released at `lock_until`, 0 to 100
    pub first_unlock_percent: f64,
    #[serde(default)]
    pub vesting: Option<Vesting>,
    #[serde(default)]
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRequest {
    /// Jetton master (minter) of the token being locked
    pub jetton_master: TonAddress,
    /// Amount in jetton base units
    #[serde(with = "pizzabox_core::biguint_string")]
    pub amount: BigUint,
    /// The user's jetton wallet for `jetton_master`
    pub user_jetton_wallet: TonAddress,
    /// The user's wallet, owner of the resulting lock record
    pub user_wallet: TonAddress,
    pub schedule: LockSchedule,
}

/// Schedule fields as stored in the deploy-vesting payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VestingParams {
    /// `first_unlock_percent` scaled by 1_000_000
    pub first_unlock_percent: u32,
    /// Seconds between unlocks after the first one
    pub cycles_length: u32,
    pub cycles_number: u32,
}

/// Check the schedule and derive the on-chain vesting fields
pub fn validate_schedule(schedule: &LockSchedule) -> std::result::Result<VestingParams, ProtocolError> {
    let percent = schedule.first_unlock_percent;
    if !(0.0..=100.0).contains(&percent) {
        return Err(ProtocolError::InvalidPercent { value: percent });
    }

    let (cycles_length, cycles_number) = if percent == 100.0 {
        (0, 0)
    } else {
        let vesting = schedule.vesting.ok_or(ProtocolError::MissingVesting)?;
        let days = vesting.cycle_length_days.ceil();
        if !days.is_finite() || days < 0.0 {
            return Err(ProtocolError::InvalidSchedule {
                message: format!(
                    "cycle length of {} days is not a valid duration",
                    vesting.cycle_length_days
                ),
            });
        }
        let seconds = days * SECONDS_PER_DAY as f64;
        if seconds > u32::MAX as f64 {
            return Err(ProtocolError::InvalidSchedule {
                message: format!("cycle length of {} days overflows uint32 seconds", days),
            });
        }
        (seconds as u32, vesting.cycle_number)
    };

    Ok(VestingParams {
        first_unlock_percent: (percent * PERCENT_SCALE).floor() as u32,
        cycles_length,
        cycles_number,
    })
}

/// Build the payload the factory uses to deploy the lock record
pub fn build_vesting_payload(
    req: &LockRequest,
    params: &VestingParams,
    content: Cell,
) -> std::result::Result<Cell, CellError> {
    let content = Arc::new(content);
    let mut b = CellBuilder::new();
    b.store_address(&req.jetton_master)?
        .store_address(&req.user_wallet)?
        .store_u32(32, req.schedule.lock_until)?
        .store_u32(32, params.first_unlock_percent)?
        .store_u32(32, params.cycles_length)?
        .store_u32(32, params.cycles_number)?
        .store_maybe_cell_ref(Some(&content))?;
    b.build()
}

/// Build the TEP-74 transfer moving the jettons to the locker factory
pub fn build_transfer_body(
    req: &LockRequest,
    factory: &TonAddress,
    vesting_payload: Cell,
) -> std::result::Result<Cell, CellError> {
    let vesting_payload = Arc::new(vesting_payload);
    let mut b = CellBuilder::new();
    b.store_u32(32, OP_JETTON_TRANSFER)?
        .store_u64(64, 0)?
        .store_coins(&req.amount)?
        .store_address(factory)?
        .store_address(&req.user_wallet)?
        .store_maybe_cell_ref(None)?
        .store_coins(&BigUint::from(LOCK_FORWARD_AMOUNT))?
        .store_maybe_cell_ref(Some(&vesting_payload))?;
    b.build()
}

/// Build the lock message: validates the schedule, fetches the jetton's
/// metadata, then assembles the transfer to the user's jetton wallet.
pub async fn build_lock_tx(client: &TonApiClient, req: &LockRequest) -> Result<TxParams> {
    let params = validate_schedule(&req.schedule)?;
    let factory: TonAddress = LOCKER_FACTORY.parse()?;

    let info = client.get_jetton_info(&req.jetton_master).await?;
    let decimals = info
        .metadata
        .decimals_u8()
        .ok_or_else(|| ProtocolError::InvalidMetadata {
            message: format!("decimals {:?} does not fit uint8", info.metadata.decimals),
        })?;

    let content = build_onchain_metadata([
        (
            "purpose",
            req.schedule.purpose.clone().map(MetadataValue::Text),
        ),
        ("decimals", Some(MetadataValue::Number(decimals))),
        ("symbol", Some(MetadataValue::Text(info.metadata.symbol.clone()))),
        ("image", Some(MetadataValue::from(VESTING_IMAGE_URL))),
        ("uri", Some(MetadataValue::from(VESTING_META_URL))),
    ])?;

    let vesting_payload = build_vesting_payload(req, &params, content)?;
    let body = build_transfer_body(req, &factory, vesting_payload)?;

    tracing::info!(
        jetton_master = %req.jetton_master,
        amount = %req.amount,
        lock_until = req.schedule.lock_until,
        cycles_number = params.cycles_number,
        cycles_length = params.cycles_length,
        "Built lock transaction"
    );

    Ok(TxParams {
        destination: req.user_jetton_wallet,
        amount: LOCK_GAS_AMOUNT,
        payload: body.to_boc()?,
    })
}

// =============================================================================
// Unlock Transaction
// =============================================================================

/// Build the claim message for a lock record. No network access.
pub fn build_unlock_tx(lock_record: &TonAddress) -> Result<TxParams> {
    let mut b = CellBuilder::new();
    b.store_u32(32, OP_CLAIM)?.store_u64(64, 0)?;
    let body = b.build()?;

    Ok(TxParams {
        destination: *lock_record,
        amount: UNLOCK_GAS_AMOUNT,
        payload: body.to_boc()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pizzabox_core::{ApiConfig, Error};

    fn addr(byte: u8) -> TonAddress {
        TonAddress::new(0, [byte; 32])
    }

    fn schedule(percent: f64, vesting: Option<Vesting>) -> LockSchedule {
        LockSchedule {
            lock_until: 1_735_689_600,
            first_unlock_percent: percent,
            vesting,
            purpose: Some("Team tokens".to_string()),
        }
    }

    fn request(schedule: LockSchedule) -> LockRequest {
        LockRequest {
            jetton_master: addr(1),
            amount: BigUint::from(1_000_000_000_000u64),
            user_jetton_wallet: addr(2),
            user_wallet: addr(3),
            schedule,
        }
    }

    /// Transfer body for `request(schedule(100.0, None))` of a 9-decimal PZZ jetton
    const TRANSFER_BODY_HASH: &str =
        "efaf450ee934c6cff2f4a0dbda79d734b7bf9dd4ad5373304f470692df205dec";
    const TRANSFER_BODY_BOC: &str = "te6cckECEQEAAfoAAbIPin6lAAAAAAAAAABejUpRAAgAbNUrVOxMxZEwzsBufSRiLSmU1qXVyVVIvhobpY/QOuEAAMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDITOPWgQEBpYAAICAgICAgICAgICAgICAgICAgICAgICAgICAgICAgIDAADAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDA2d0hYAF9eEAAAAAAAAAAADAgEDAMADAgEgBAkCAW4FBwFBvwQXWzHavQAMl6U1YjOURvlv9u3O0N9xR7KQ5F9ekPj2BgBeAGh0dHBzOi8vYXBpLnBpenphdG9uLm1lL2xhdW5jaHBhZC92ZXN0aW5nL2ltZy8BQb8Dl17aimzkvhQdv4Vyi8gU8VsIzhyjE4zyejdse6CfMggAYABodHRwczovL2FwaS5waXp6YXRvbi5tZS9sYXVuY2hwYWQvdmVzdGluZy9tZXRhLwIBIAoPAgEgCw0BQb9DYNvoYHzLA9/Z9FBhfu2GFTplR8kSXVhfyHbpD6dcXwwAGABUZWFtIHRva2VucwFBv27U+UKnhIziywZrd6ESjGof+MQ/Q4otziRhK6n/q4sDDgAIAFBaWgFCv66A/S8eA0gOIoI2NZbudS17sn9Qd2uVCGoCeRiWdZI+EAAEAAkig7y9";

    fn jetton_info_body() -> &'static str {
        r#"{"mintable": false, "total_supply": "1000000000000000000",
            "metadata": {"address": "0:0101010101010101010101010101010101010101010101010101010101010101",
                         "name": "Pizza", "symbol": "PZZ", "decimals": "9"}}"#
    }

    #[test]
    fn test_percent_out_of_range() {
        for p in [-0.1, 100.5, f64::NAN] {
            let err = validate_schedule(&schedule(p, None)).unwrap_err();
            assert_eq!(err.error_code(), "invalid_percent");
        }
    }

    #[test]
    fn test_missing_vesting() {
        let err = validate_schedule(&schedule(50.0, None)).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingVesting));
    }

    #[test]
    fn test_full_unlock_ignores_vesting() {
        let vesting = Vesting {
            cycle_number: 12,
            cycle_length_days: 30.0,
        };
        let params = validate_schedule(&schedule(100.0, Some(vesting))).unwrap();
        assert_eq!(params.cycles_length, 0);
        assert_eq!(params.cycles_number, 0);
        assert_eq!(params.first_unlock_percent, 100_000_000);
    }

    #[test]
    fn test_fractional_days_round_up() {
        let vesting = Vesting {
            cycle_number: 4,
            cycle_length_days: 2.5,
        };
        let params = validate_schedule(&schedule(37.5, Some(vesting))).unwrap();
        assert_eq!(params.cycles_length, 259_200);
        assert_eq!(params.cycles_number, 4);
        assert_eq!(params.first_unlock_percent, 37_500_000);
    }

    #[test]
    fn test_cycle_length_overflow() {
        let vesting = Vesting {
            cycle_number: 1,
            cycle_length_days: 60_000.0,
        };
        let err = validate_schedule(&schedule(0.0, Some(vesting))).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidSchedule { .. }));
    }

    #[test]
    fn test_vesting_payload_layout() {
        let req = request(schedule(
            37.5,
            Some(Vesting {
                cycle_number: 4,
                cycle_length_days: 2.5,
            }),
        ));
        let params = validate_schedule(&req.schedule).unwrap();
        let payload = build_vesting_payload(&req, &params, Cell::empty()).unwrap();

        let mut s = payload.parser();
        assert_eq!(s.load_address().unwrap(), req.jetton_master);
        assert_eq!(s.load_address().unwrap(), req.user_wallet);
        assert_eq!(s.load_u32(32).unwrap(), 1_735_689_600);
        assert_eq!(s.load_u32(32).unwrap(), 37_500_000);
        assert_eq!(s.load_u32(32).unwrap(), 259_200);
        assert_eq!(s.load_u32(32).unwrap(), 4);
        assert!(s.load_maybe_cell_ref().unwrap().is_some());
        assert_eq!(s.remaining_bits(), 0);
    }

    #[test]
    fn test_transfer_body_hash() {
        let req = request(schedule(100.0, None));
        let params = validate_schedule(&req.schedule).unwrap();
        let content = build_onchain_metadata([
            ("purpose", Some("Team tokens".into())),
            ("decimals", Some(MetadataValue::Number(9))),
            ("symbol", Some("PZZ".into())),
            ("image", Some(VESTING_IMAGE_URL.into())),
            ("uri", Some(VESTING_META_URL.into())),
        ])
        .unwrap();
        let factory: TonAddress = LOCKER_FACTORY.parse().unwrap();

        let payload = build_vesting_payload(&req, &params, content).unwrap();
        let body = build_transfer_body(&req, &factory, payload).unwrap();
        assert_eq!(body.hash_hex(), TRANSFER_BODY_HASH);
        assert_eq!(body.to_boc_base64().unwrap(), TRANSFER_BODY_BOC);
    }

    #[tokio::test]
    async fn test_validation_runs_before_fetch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(jetton_info_body())
            .expect(0)
            .create_async()
            .await;
        let client = TonApiClient::new(ApiConfig::new(server.url())).unwrap();

        for req in [request(schedule(101.0, None)), request(schedule(20.0, None))] {
            match build_lock_tx(&client, &req).await.unwrap_err() {
                Error::Protocol(err) => assert!(err.is_validation(), "{err}"),
                other => panic!("expected a protocol error, got {other:?}"),
            }
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_build_lock_tx() {
        let mut server = mockito::Server::new_async().await;
        let path = format!("/v2/jettons/{}", addr(1).to_raw());
        let mock = server
            .mock("GET", path.as_str())
            .with_status(200)
            .with_body(jetton_info_body())
            .expect(1)
            .create_async()
            .await;
        let client = TonApiClient::new(ApiConfig::new(server.url())).unwrap();

        let req = request(schedule(100.0, None));
        let tx = build_lock_tx(&client, &req).await.unwrap();
        mock.assert_async().await;

        assert_eq!(tx.destination, req.user_jetton_wallet);
        assert_eq!(tx.amount, 750_000_000);

        assert_eq!(tx.payload_base64(), TRANSFER_BODY_BOC);

        let body = tx.payload_cell().unwrap();
        let mut s = body.parser();
        assert_eq!(s.load_u32(32).unwrap(), 0x0f8a7ea5);
        assert_eq!(s.load_u64(64).unwrap(), 0);
        assert_eq!(s.load_coins().unwrap(), req.amount);
        assert_eq!(s.load_address().unwrap().to_string(), LOCKER_FACTORY);
        assert_eq!(s.load_address().unwrap(), req.user_wallet);
        assert!(s.load_maybe_cell_ref().unwrap().is_none());
        assert_eq!(s.load_coins().unwrap(), BigUint::from(645_000_000u64));
        let payload = s.load_maybe_cell_ref().unwrap().unwrap();
        assert_eq!(s.remaining_bits(), 0);

        let mut p = payload.parser();
        p.skip_bits(267 * 2 + 32).unwrap();
        assert_eq!(p.load_u32(32).unwrap(), 100_000_000);
        assert_eq!(p.load_u32(32).unwrap(), 0);
        assert_eq!(p.load_u32(32).unwrap(), 0);
        let content = p.load_maybe_cell_ref().unwrap().unwrap();
        assert_eq!(
            crate::metadata::read_text_attribute(&content, "symbol")
                .unwrap()
                .as_deref(),
            Some("PZZ")
        );
        assert_eq!(
            crate::metadata::read_text_attribute(&content, "purpose")
                .unwrap()
                .as_deref(),
            Some("Team tokens")
        );
    }

    #[tokio::test]
    async fn test_purpose_too_deep_for_a_cell() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(jetton_info_body())
            .create_async()
            .await;
        let client = TonApiClient::new(ApiConfig::new(server.url())).unwrap();

        let mut s = schedule(100.0, None);
        s.purpose = Some("x".repeat(130_000));
        let err = build_lock_tx(&client, &request(s)).await.unwrap_err();
        assert!(matches!(err, Error::Cell(CellError::DepthOverflow { .. })));
    }

    #[tokio::test]
    async fn test_bad_decimals_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"metadata": {"address": "0:01", "symbol": "PZZ", "decimals": "512"}}"#)
            .create_async()
            .await;
        let client = TonApiClient::new(ApiConfig::new(server.url())).unwrap();

        let err = build_lock_tx(&client, &request(schedule(100.0, None)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::InvalidMetadata { .. })
        ));
    }

    #[tokio::test]
    async fn test_api_failure_propagates() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
        let client = TonApiClient::new(ApiConfig::new(server.url())).unwrap();

        let err = build_lock_tx(&client, &request(schedule(100.0, None)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Api(pizzabox_core::ApiError::Status { status: 500, .. })
        ));
    }

    #[test]
    fn test_build_unlock_tx() {
        let a = build_unlock_tx(&addr(5)).unwrap();
        let b = build_unlock_tx(&addr(6)).unwrap();
        assert_eq!(a.destination, addr(5));
        assert_eq!(a.amount, 50_000_000);
        assert_eq!(a.payload, b.payload);
        assert_eq!(a.amount, b.amount);

        let body = a.payload_cell().unwrap();
        assert_eq!(body.bit_len(), 96);
        assert_eq!(hex::encode(body.data()), "a769de270000000000000000");
        assert!(body.references().is_empty());
    }
}
