//! Cell builder
//!
//! Mirrors the `beginCell()...endCell()` flow: every `store_*` call appends to
//! the pending cell and returns `&mut Self`, so calls chain with `?`.

use std::collections::BTreeMap;
use std::sync::Arc;

use num_bigint::BigUint;
use num_traits::Zero;
use pizzabox_core::CellError;

use crate::address::TonAddress;
use crate::cell::{ArcCell, Cell, MAX_CELL_BITS, MAX_CELL_REFS};
use crate::dict;

#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    references: Vec<ArcCell>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn available_bits(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    pub fn available_refs(&self) -> usize {
        MAX_CELL_REFS - self.references.len()
    }

    fn ensure_bits(&self, n: usize) -> Result<(), CellError> {
        if n > self.available_bits() {
            return Err(CellError::BitOverflow {
                needed: n,
                available: self.available_bits(),
            });
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let idx = self.bit_len / 8;
            self.data[idx] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CellError> {
        self.ensure_bits(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Store a sequence of bits, most significant first
    pub fn store_bits(&mut self, bits: &[bool]) -> Result<&mut Self, CellError> {
        self.ensure_bits(bits.len())?;
        for &bit in bits {
            self.push_bit(bit);
        }
        Ok(self)
    }

    /// Store an unsigned integer of up to 64 bits
    pub fn store_u64(&mut self, bit_len: usize, value: u64) -> Result<&mut Self, CellError> {
        if bit_len > 64 || (bit_len < 64 && value >> bit_len != 0) {
            return Err(CellError::ValueTooLarge { bits: bit_len });
        }
        self.ensure_bits(bit_len)?;
        for i in (0..bit_len).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    pub fn store_u32(&mut self, bit_len: usize, value: u32) -> Result<&mut Self, CellError> {
        self.store_u64(bit_len, value as u64)
    }

    pub fn store_u8(&mut self, bit_len: usize, value: u8) -> Result<&mut Self, CellError> {
        self.store_u64(bit_len, value as u64)
    }

    /// Store a two's complement signed integer of up to 64 bits
    pub fn store_i64(&mut self, bit_len: usize, value: i64) -> Result<&mut Self, CellError> {
        if bit_len == 0 || bit_len > 64 {
            return Err(CellError::ValueTooLarge { bits: bit_len });
        }
        if bit_len < 64 {
            let bound = 1i64 << (bit_len - 1);
            if value < -bound || value >= bound {
                return Err(CellError::ValueTooLarge { bits: bit_len });
            }
        }
        let raw = if bit_len == 64 {
            value as u64
        } else {
            (value as u64) & ((1u64 << bit_len) - 1)
        };
        self.store_u64(bit_len, raw)
    }

    /// Store an arbitrary width unsigned integer
    pub fn store_uint(&mut self, bit_len: usize, value: &BigUint) -> Result<&mut Self, CellError> {
        if value.bits() as usize > bit_len {
            return Err(CellError::ValueTooLarge { bits: bit_len });
        }
        self.ensure_bits(bit_len)?;
        let bytes = value.to_bytes_be();
        let total = bytes.len() * 8;
        for _ in total..bit_len {
            self.push_bit(false);
        }
        for i in total.saturating_sub(bit_len)..total {
            self.push_bit((bytes[i / 8] >> (7 - i % 8)) & 1 == 1);
        }
        Ok(self)
    }

    /// Store whole bytes
    pub fn store_slice(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        self.ensure_bits(bytes.len() * 8)?;
        for &b in bytes {
            for i in (0..8).rev() {
                self.push_bit((b >> i) & 1 == 1);
            }
        }
        Ok(self)
    }

    /// Store `VarUInteger 16` (coins): a 4-bit byte length followed by the value
    pub fn store_coins(&mut self, value: &BigUint) -> Result<&mut Self, CellError> {
        if value.is_zero() {
            return self.store_u8(4, 0);
        }
        let byte_len = (value.bits() as usize).div_ceil(8);
        if byte_len > 15 {
            return Err(CellError::ValueTooLarge { bits: 120 });
        }
        self.store_u8(4, byte_len as u8)?;
        self.store_uint(byte_len * 8, value)
    }

    /// Store `addr_std$10 anycast:nothing workchain_id:int8 address:bits256`
    pub fn store_address(&mut self, address: &TonAddress) -> Result<&mut Self, CellError> {
        let workchain = i8::try_from(address.workchain).map_err(|_| {
            CellError::InvalidAddress(format!(
                "workchain {} does not fit addr_std",
                address.workchain
            ))
        })?;
        self.ensure_bits(2 + 1 + 8 + 256)?;
        self.store_u8(2, 0b10)?;
        self.store_bit(false)?;
        self.store_i64(8, workchain as i64)?;
        self.store_slice(&address.hash_part)
    }

    /// Store `MsgAddress`, writing `addr_none$00` for `None`
    pub fn store_maybe_address(
        &mut self,
        address: Option<&TonAddress>,
    ) -> Result<&mut Self, CellError> {
        match address {
            Some(address) => self.store_address(address),
            None => self.store_u8(2, 0b00),
        }
    }

    pub fn store_reference(&mut self, cell: &ArcCell) -> Result<&mut Self, CellError> {
        if self.available_refs() == 0 {
            return Err(CellError::RefOverflow);
        }
        self.references.push(cell.clone());
        Ok(self)
    }

    pub fn store_child(&mut self, cell: Cell) -> Result<&mut Self, CellError> {
        self.store_reference(&Arc::new(cell))
    }

    /// Store `Maybe ^Cell`
    pub fn store_maybe_cell_ref(&mut self, cell: Option<&ArcCell>) -> Result<&mut Self, CellError> {
        match cell {
            Some(cell) => {
                if self.available_refs() == 0 {
                    return Err(CellError::RefOverflow);
                }
                self.store_bit(true)?;
                self.store_reference(cell)
            }
            None => self.store_bit(false),
        }
    }

    /// Store bytes as a snake chain: fill this cell's remaining whole bytes,
    /// then continue in a child cell referenced from here.
    /// The chain is built tail-first and may not exceed the cell depth limit.
    pub fn store_snake_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        let fits = self.available_bits() / 8;
        if bytes.len() <= fits {
            return self.store_slice(bytes);
        }
        if self.available_refs() == 0 {
            return Err(CellError::RefOverflow);
        }

        let (head, tail) = bytes.split_at(fits);
        let mut next: Option<ArcCell> = None;
        for chunk in tail.chunks(MAX_CELL_BITS / 8).rev() {
            let mut link = CellBuilder::new();
            link.store_slice(chunk)?;
            if let Some(cell) = next.take() {
                link.store_reference(&cell)?;
            }
            next = Some(Arc::new(link.build()?));
        }

        self.store_slice(head)?;
        match next {
            Some(cell) => self.store_reference(&cell),
            None => Ok(self),
        }
    }

    pub fn store_string_tail(&mut self, value: &str) -> Result<&mut Self, CellError> {
        self.store_snake_bytes(value.as_bytes())
    }

    /// Store `HashmapE key_len ^Cell`: a `0` bit for an empty map, otherwise a
    /// `1` bit and a reference to the serialized `Hashmap` root.
    pub fn store_dict(
        &mut self,
        key_len: usize,
        entries: &BTreeMap<BigUint, ArcCell>,
    ) -> Result<&mut Self, CellError> {
        if entries.is_empty() {
            return self.store_bit(false);
        }
        let root = dict::serialize_hashmap(key_len, entries)?;
        if self.available_refs() == 0 {
            return Err(CellError::RefOverflow);
        }
        self.store_bit(true)?;
        self.store_child(root)
    }

    pub fn build(&self) -> Result<Cell, CellError> {
        Cell::new(self.data.clone(), self.bit_len, self.references.clone())
    }
}
