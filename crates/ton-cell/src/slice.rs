//! Sequential reader over a cell's bits and references

use num_bigint::BigUint;
use num_traits::Zero;
use pizzabox_core::CellError;

use crate::address::TonAddress;
use crate::cell::{ArcCell, Cell};

/// Read cursor over a [`Cell`]
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> CellSlice<'a> {
    pub fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.references().len() - self.ref_pos
    }

    fn ensure_bits(&self, n: usize) -> Result<(), CellError> {
        if n > self.remaining_bits() {
            return Err(CellError::NotEnoughBits {
                requested: n,
                remaining: self.remaining_bits(),
            });
        }
        Ok(())
    }

    pub fn load_bit(&mut self) -> Result<bool, CellError> {
        self.ensure_bits(1)?;
        let byte = self.cell.data()[self.bit_pos / 8];
        let bit = (byte >> (7 - self.bit_pos % 8)) & 1 == 1;
        self.bit_pos += 1;
        Ok(bit)
    }

    pub fn skip_bits(&mut self, n: usize) -> Result<(), CellError> {
        self.ensure_bits(n)?;
        self.bit_pos += n;
        Ok(())
    }

    /// Load an unsigned integer of up to 64 bits
    pub fn load_u64(&mut self, bit_len: usize) -> Result<u64, CellError> {
        if bit_len > 64 {
            return Err(CellError::ValueTooLarge { bits: 64 });
        }
        self.ensure_bits(bit_len)?;
        let mut value = 0u64;
        for _ in 0..bit_len {
            value = (value << 1) | self.load_bit()? as u64;
        }
        Ok(value)
    }

    pub fn load_u32(&mut self, bit_len: usize) -> Result<u32, CellError> {
        if bit_len > 32 {
            return Err(CellError::ValueTooLarge { bits: 32 });
        }
        Ok(self.load_u64(bit_len)? as u32)
    }

    pub fn load_u8(&mut self, bit_len: usize) -> Result<u8, CellError> {
        if bit_len > 8 {
            return Err(CellError::ValueTooLarge { bits: 8 });
        }
        Ok(self.load_u64(bit_len)? as u8)
    }

    /// Load a two's complement signed integer of up to 64 bits
    pub fn load_i64(&mut self, bit_len: usize) -> Result<i64, CellError> {
        if bit_len == 0 {
            return Ok(0);
        }
        let raw = self.load_u64(bit_len)?;
        if bit_len == 64 {
            return Ok(raw as i64);
        }
        let sign = 1u64 << (bit_len - 1);
        Ok(if raw & sign != 0 {
            (raw as i64).wrapping_sub(1i64.wrapping_shl(bit_len as u32))
        } else {
            raw as i64
        })
    }

    /// Load an arbitrary width unsigned integer
    pub fn load_uint(&mut self, bit_len: usize) -> Result<BigUint, CellError> {
        self.ensure_bits(bit_len)?;
        let mut value = BigUint::zero();
        for _ in 0..bit_len {
            value <<= 1u32;
            if self.load_bit()? {
                value += 1u32;
            }
        }
        Ok(value)
    }

    /// Load whole bytes
    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>, CellError> {
        self.ensure_bits(len * 8)?;
        (0..len).map(|_| self.load_u8(8)).collect()
    }

    /// Load `VarUInteger 16` (coins)
    pub fn load_coins(&mut self) -> Result<BigUint, CellError> {
        let len = self.load_u8(4)? as usize;
        self.load_uint(len * 8)
    }

    /// Load `MsgAddress`, returning `None` for `addr_none`
    pub fn load_maybe_address(&mut self) -> Result<Option<TonAddress>, CellError> {
        match self.load_u8(2)? {
            0b00 => Ok(None),
            0b10 => {
                if self.load_bit()? {
                    return Err(CellError::InvalidAddress(
                        "anycast addresses are not supported".to_string(),
                    ));
                }
                let workchain = self.load_i64(8)? as i32;
                let hash = self.load_bytes(32)?;
                let mut hash_part = [0u8; 32];
                hash_part.copy_from_slice(&hash);
                Ok(Some(TonAddress::new(workchain, hash_part)))
            }
            0b01 => Err(CellError::InvalidAddress(
                "external addresses are not supported".to_string(),
            )),
            _ => Err(CellError::InvalidAddress(
                "addr_var is not supported".to_string(),
            )),
        }
    }

    /// Load `MsgAddressInt` (`addr_none` is rejected)
    pub fn load_address(&mut self) -> Result<TonAddress, CellError> {
        self.load_maybe_address()?
            .ok_or_else(|| CellError::InvalidAddress("unexpected addr_none".to_string()))
    }

    pub fn load_reference(&mut self) -> Result<&'a ArcCell, CellError> {
        let cell: &'a Cell = self.cell;
        let r = cell.reference(self.ref_pos)?;
        self.ref_pos += 1;
        Ok(r)
    }

    /// Load `Maybe ^Cell`
    pub fn load_maybe_cell_ref(&mut self) -> Result<Option<ArcCell>, CellError> {
        if self.load_bit()? {
            Ok(Some(self.load_reference()?.clone()))
        } else {
            Ok(None)
        }
    }

    /// Load the rest of a snake-encoded byte string, following the first
    /// reference of each cell in the chain
    pub fn load_snake_bytes(&mut self) -> Result<Vec<u8>, CellError> {
        let mut bytes = Vec::new();
        let mut next = self.load_snake_link(&mut bytes)?;
        while let Some(cell) = next {
            next = cell.parser().load_snake_link(&mut bytes)?;
        }
        Ok(bytes)
    }

    /// Append this cell's remaining bytes and return the next link, if any
    fn load_snake_link(&mut self, out: &mut Vec<u8>) -> Result<Option<&'a ArcCell>, CellError> {
        if self.remaining_bits() % 8 != 0 {
            return Err(CellError::InvalidBoc(format!(
                "snake data is not byte aligned ({} bits)",
                self.remaining_bits()
            )));
        }
        out.extend(self.load_bytes(self.remaining_bits() / 8)?);
        if self.remaining_refs() > 0 {
            return self.load_reference().map(Some);
        }
        Ok(None)
    }

    pub fn load_string_tail(&mut self) -> Result<String, CellError> {
        let bytes = self.load_snake_bytes()?;
        String::from_utf8(bytes).map_err(|e| CellError::InvalidBoc(format!("invalid UTF-8: {}", e)))
    }
}
