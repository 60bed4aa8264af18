//! On-chain (TEP-64) metadata for lock record content
//!
//! Content cell layout: `int8 0x00` followed by `HashmapE 256 ^Cell`, where
//! keys are SHA-256 of the attribute name and each value cell starts with a
//! zero tag byte.

use std::collections::BTreeMap;
use std::sync::Arc;

use num_bigint::BigUint;
use pizzabox_core::CellError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ton_cell::{load_dict, Cell, CellBuilder};

/// Layout marker for on-chain content
const ONCHAIN_CONTENT_PREFIX: i64 = 0x00;

/// Tag byte in front of every value
const VALUE_TAG: u8 = 0x00;

/// A single metadata attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Number(u8),
    Text(String),
}

impl From<u8> for MetadataValue {
    fn from(value: u8) -> Self {
        MetadataValue::Number(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

/// Dictionary key for an attribute name
pub fn metadata_key(name: &str) -> BigUint {
    BigUint::from_bytes_be(&Sha256::digest(name.as_bytes()))
}

fn value_cell(value: &MetadataValue) -> Result<Cell, CellError> {
    let mut b = CellBuilder::new();
    b.store_u8(8, VALUE_TAG)?;
    match value {
        MetadataValue::Number(n) => b.store_u8(8, *n)?,
        MetadataValue::Text(s) => b.store_string_tail(s)?,
    };
    b.build()
}

/// Build the content cell from `(name, value)` pairs. `None` values are
/// left out of the dictionary.
pub fn build_onchain_metadata<'a, I>(attributes: I) -> Result<Cell, CellError>
where
    I: IntoIterator<Item = (&'a str, Option<MetadataValue>)>,
{
    let mut dict = BTreeMap::new();
    for (name, value) in attributes {
        if let Some(value) = value {
            dict.insert(metadata_key(name), Arc::new(value_cell(&value)?));
        }
    }

    let mut content = CellBuilder::new();
    content
        .store_i64(8, ONCHAIN_CONTENT_PREFIX)?
        .store_dict(256, &dict)?;
    content.build()
}

/// Read a text attribute back out of an on-chain content cell
pub fn read_text_attribute(content: &Cell, name: &str) -> Result<Option<String>, CellError> {
    let mut slice = content.parser();
    if slice.load_u8(8)? != ONCHAIN_CONTENT_PREFIX as u8 {
        return Err(CellError::InvalidDict(
            "content is not in on-chain layout".to_string(),
        ));
    }
    let dict = load_dict(&mut slice, 256)?;
    match dict.get(&metadata_key(name)) {
        Some(value) => {
            let mut v = value.parser();
            v.load_u8(8)?;
            Ok(Some(v.load_string_tail()?))
        }
        None => Ok(None),
    }
}
