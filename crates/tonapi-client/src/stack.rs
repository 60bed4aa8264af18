//! Sequential reader over a get-method result stack

use std::collections::VecDeque;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};
use pizzabox_core::CellError;
use thiserror::Error;
use ton_cell::{Cell, TonAddress};

use crate::types::TvmStackRecord;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StackError {
    #[error("End of stack reached")]
    EndOfStack,

    #[error("Expected {expected} stack item, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid number literal {0:?}")]
    InvalidNumber(String),

    #[error("Number {value} out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    #[error("Invalid cell in stack: {0}")]
    Cell(#[from] CellError),
}

/// Parse a TonAPI number literal: `0x1f`, `-0x1` or plain decimal
pub fn parse_num(literal: &str) -> Result<BigInt, StackError> {
    let s = literal.trim();
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(hex) => BigUint::parse_bytes(hex.as_bytes(), 16),
        None => BigUint::parse_bytes(body.as_bytes(), 10),
    }
    .ok_or_else(|| StackError::InvalidNumber(literal.to_string()))?;

    let sign = if negative && !magnitude.is_zero() {
        Sign::Minus
    } else {
        Sign::Plus
    };
    Ok(BigInt::from_biguint(sign, magnitude))
}

/// Reads stack items front to back, in the order the get-method returned them
#[derive(Debug, Clone)]
pub struct StackReader {
    items: VecDeque<TvmStackRecord>,
}

impl StackReader {
    pub fn new(items: Vec<TvmStackRecord>) -> Self {
        Self {
            items: items.into(),
        }
    }

    /// Items not yet read
    pub fn remaining(&self) -> usize {
        self.items.len()
    }

    fn pop(&mut self) -> Result<TvmStackRecord, StackError> {
        self.items.pop_front().ok_or(StackError::EndOfStack)
    }

    pub fn read_big_number(&mut self) -> Result<BigInt, StackError> {
        match self.pop()? {
            TvmStackRecord::Num { num } => parse_num(&num),
            other => Err(StackError::UnexpectedType {
                expected: "num",
                found: other.kind(),
            }),
        }
    }

    pub fn read_big_uint(&mut self) -> Result<BigUint, StackError> {
        let value = self.read_big_number()?;
        value.to_biguint().ok_or_else(|| StackError::OutOfRange {
            value: value.to_string(),
            target: "unsigned integer",
        })
    }

    pub fn read_u64(&mut self) -> Result<u64, StackError> {
        let value = self.read_big_number()?;
        value.to_u64().ok_or_else(|| StackError::OutOfRange {
            value: value.to_string(),
            target: "u64",
        })
    }

    /// Any non-zero number is `true`
    pub fn read_bool(&mut self) -> Result<bool, StackError> {
        Ok(!self.read_big_number()?.is_zero())
    }

    /// Accepts both `cell` and `slice` items
    pub fn read_cell(&mut self) -> Result<Cell, StackError> {
        match self.pop()? {
            TvmStackRecord::Cell { cell: boc } | TvmStackRecord::Slice { slice: boc } => {
                Ok(Cell::from_boc_hex(&boc)?)
            }
            other => Err(StackError::UnexpectedType {
                expected: "cell",
                found: other.kind(),
            }),
        }
    }

    pub fn read_cell_opt(&mut self) -> Result<Option<Cell>, StackError> {
        if matches!(self.items.front(), Some(TvmStackRecord::Null)) {
            self.items.pop_front();
            return Ok(None);
        }
        self.read_cell().map(Some)
    }

    pub fn read_address(&mut self) -> Result<TonAddress, StackError> {
        let cell = self.read_cell()?;
        let address = cell.parser().load_address()?;
        Ok(address)
    }

    /// `null` or `addr_none` both read as `None`
    pub fn read_address_opt(&mut self) -> Result<Option<TonAddress>, StackError> {
        match self.read_cell_opt()? {
            Some(cell) => Ok(cell.parser().load_maybe_address()?),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ton_cell::CellBuilder;

    fn num(s: &str) -> TvmStackRecord {
        TvmStackRecord::Num { num: s.to_string() }
    }

    fn address_cell(addr: Option<&TonAddress>) -> TvmStackRecord {
        let mut b = CellBuilder::new();
        b.store_maybe_address(addr).unwrap();
        TvmStackRecord::Slice {
            slice: b.build().unwrap().to_boc_hex().unwrap(),
        }
    }

    #[test]
    fn test_parse_num() {
        assert_eq!(parse_num("0x1f").unwrap(), BigInt::from(31));
        assert_eq!(parse_num("-0x1").unwrap(), BigInt::from(-1));
        assert_eq!(parse_num("12345").unwrap(), BigInt::from(12345));
        assert_eq!(parse_num("-0x0").unwrap(), BigInt::zero());
        assert!(parse_num("0xzz").is_err());
        assert!(parse_num("").is_err());
    }

    #[test]
    fn test_read_in_order() {
        let addr = TonAddress::new(0, [7u8; 32]);
        let mut reader = StackReader::new(vec![
            num("-0x1"),
            num("0x3b9aca00"),
            address_cell(Some(&addr)),
            address_cell(None),
            TvmStackRecord::Null,
            TvmStackRecord::Null,
        ]);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_u64().unwrap(), 1_000_000_000);
        assert_eq!(reader.read_address().unwrap(), addr);
        assert_eq!(reader.read_address_opt().unwrap(), None);
        assert_eq!(reader.read_address_opt().unwrap(), None);
        assert!(reader.read_cell_opt().unwrap().is_none());
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.read_bool(), Err(StackError::EndOfStack));
    }

    #[test]
    fn test_type_mismatch() {
        let mut reader = StackReader::new(vec![TvmStackRecord::Null, num("1")]);
        assert_eq!(
            reader.read_big_number(),
            Err(StackError::UnexpectedType {
                expected: "num",
                found: "null"
            })
        );
        assert!(matches!(
            reader.read_cell(),
            Err(StackError::UnexpectedType { expected: "cell", .. })
        ));
    }

    #[test]
    fn test_negative_rejected_for_unsigned() {
        let mut reader = StackReader::new(vec![num("-5"), num("-5")]);
        assert!(matches!(
            reader.read_big_uint(),
            Err(StackError::OutOfRange { .. })
        ));
        assert_eq!(reader.read_big_number().unwrap(), BigInt::from(-5));
    }
}
