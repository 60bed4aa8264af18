//! TonAPI response DTOs

use serde::{Deserialize, Deserializer, Serialize};

/// Response of `GET /v2/jettons/{account_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JettonInfo {
    #[serde(default)]
    pub mintable: bool,
    #[serde(default)]
    pub total_supply: String,
    pub metadata: JettonMetadata,
    #[serde(default)]
    pub verification: Option<String>,
    #[serde(default)]
    pub holders_count: Option<u64>,
}

/// Jetton metadata as indexed by TonAPI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JettonMetadata {
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    /// TonAPI reports decimals as a string ("9"); some indexers use a number
    #[serde(default = "default_decimals", deserialize_with = "string_or_number")]
    pub decimals: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl JettonMetadata {
    /// Decimals as a byte, `None` when the reported value is not a valid u8
    pub fn decimals_u8(&self) -> Option<u8> {
        self.decimals.trim().parse().ok()
    }
}

fn default_decimals() -> String {
    "9".to_string()
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Response of `GET /v2/blockchain/accounts/{account_id}/methods/{method_name}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodExecutionResult {
    pub success: bool,
    pub exit_code: i32,
    #[serde(default)]
    pub stack: Vec<TvmStackRecord>,
    #[serde(default)]
    pub decoded: Option<serde_json::Value>,
}

/// One TVM stack entry. Cells and slices carry a hex-encoded BOC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TvmStackRecord {
    Cell { cell: String },
    Slice { slice: String },
    Num { num: String },
    Nan,
    Null,
    Tuple { tuple: Vec<TvmStackRecord> },
}

impl TvmStackRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            TvmStackRecord::Cell { .. } => "cell",
            TvmStackRecord::Slice { .. } => "slice",
            TvmStackRecord::Num { .. } => "num",
            TvmStackRecord::Nan => "nan",
            TvmStackRecord::Null => "null",
            TvmStackRecord::Tuple { .. } => "tuple",
        }
    }
}
