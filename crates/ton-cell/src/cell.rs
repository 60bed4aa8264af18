//! Ordinary TON cells
//!
//! A cell holds up to 1023 data bits and up to 4 references to other cells.
//! Only ordinary (non-exotic, level 0) cells are supported, which is all that
//! message bodies and get-method results ever contain.

use std::fmt;
use std::sync::Arc;

use pizzabox_core::CellError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::boc;
use crate::slice::CellSlice;

pub const MAX_CELL_BITS: usize = 1023;
pub const MAX_CELL_REFS: usize = 4;
/// Deepest reference chain the chain accepts in a message
pub const MAX_CELL_DEPTH: u16 = 1024;

/// Shared handle to an immutable cell
pub type ArcCell = Arc<Cell>;

/// An immutable ordinary cell with its representation hash precomputed
#[derive(Clone, PartialEq, Eq)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    references: Vec<ArcCell>,
    hash: [u8; 32],
    depth: u16,
}

impl Cell {
    /// Create a cell from packed data bits (MSB first) and child references.
    ///
    /// Bits past `bit_len` in the last byte are cleared.
    pub fn new(
        mut data: Vec<u8>,
        bit_len: usize,
        references: Vec<ArcCell>,
    ) -> Result<Self, CellError> {
        if bit_len > MAX_CELL_BITS {
            return Err(CellError::BitOverflow {
                needed: bit_len,
                available: MAX_CELL_BITS,
            });
        }
        if references.len() > MAX_CELL_REFS {
            return Err(CellError::RefOverflow);
        }
        let byte_len = bit_len.div_ceil(8);
        if data.len() < byte_len {
            return Err(CellError::NotEnoughBits {
                requested: bit_len,
                remaining: data.len() * 8,
            });
        }
        data.truncate(byte_len);
        if bit_len % 8 != 0 {
            let keep = 0xffu8 << (8 - bit_len % 8);
            if let Some(last) = data.last_mut() {
                *last &= keep;
            }
        }

        let depth = references
            .iter()
            .map(|r| r.depth.saturating_add(1))
            .max()
            .unwrap_or(0);
        if depth > MAX_CELL_DEPTH {
            return Err(CellError::DepthOverflow {
                depth,
                max: MAX_CELL_DEPTH,
            });
        }

        Ok(Self {
            data,
            bit_len,
            references,
            hash: [0u8; 32],
            depth,
        }
        .with_hash())
    }

    /// The empty cell (no bits, no references)
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            bit_len: 0,
            references: Vec::new(),
            hash: [0u8; 32],
            depth: 0,
        }
        .with_hash()
    }

    fn with_hash(mut self) -> Self {
        self.hash = Sha256::digest(self.representation()).into();
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn references(&self) -> &[ArcCell] {
        &self.references
    }

    pub fn reference(&self, idx: usize) -> Result<&ArcCell, CellError> {
        self.references.get(idx).ok_or(CellError::NotEnoughRefs)
    }

    /// Maximum distance to a leaf cell
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Representation hash
    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Start reading the cell from its first bit
    pub fn parser(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }

    /// Refs descriptor: reference count (ordinary cell, level 0)
    pub(crate) fn refs_descriptor(&self) -> u8 {
        self.references.len() as u8
    }

    /// Bits descriptor: floor(bits / 8) + ceil(bits / 8)
    pub(crate) fn bits_descriptor(&self) -> u8 {
        (self.bit_len / 8 + self.bit_len.div_ceil(8)) as u8
    }

    /// Data bytes with the completion tag appended when the length is not byte aligned
    pub(crate) fn padded_data(&self) -> Vec<u8> {
        let mut data = self.data.clone();
        if self.bit_len % 8 != 0 {
            if let Some(last) = data.last_mut() {
                *last |= 0x80 >> (self.bit_len % 8);
            }
        }
        data
    }

    fn representation(&self) -> Vec<u8> {
        let mut repr = Vec::with_capacity(2 + self.data.len() + self.references.len() * 34);
        repr.push(self.refs_descriptor());
        repr.push(self.bits_descriptor());
        repr.extend_from_slice(&self.padded_data());
        for r in &self.references {
            repr.extend_from_slice(&r.depth.to_be_bytes());
        }
        for r in &self.references {
            repr.extend_from_slice(&r.hash);
        }
        repr
    }

    /// Serialize as a single-root BOC (CRC32C, no index)
    pub fn to_boc(&self) -> Result<Vec<u8>, CellError> {
        boc::serialize_boc(self, true)
    }

    pub fn to_boc_hex(&self) -> Result<String, CellError> {
        self.to_boc().map(hex::encode)
    }

    pub fn to_boc_base64(&self) -> Result<String, CellError> {
        use base64::Engine;
        self.to_boc()
            .map(|b| base64::engine::general_purpose::STANDARD.encode(b))
    }

    /// Parse a single-root BOC
    pub fn from_boc(bytes: &[u8]) -> Result<Self, CellError> {
        boc::deserialize_single_root(bytes)
    }

    pub fn from_boc_hex(hex_str: &str) -> Result<Self, CellError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| CellError::InvalidBoc(format!("invalid hex: {}", e)))?;
        Self::from_boc(&bytes)
    }

    pub fn from_boc_base64(b64: &str) -> Result<Self, CellError> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|e| CellError::InvalidBoc(format!("invalid base64: {}", e)))?;
        Self::from_boc(&bytes)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cell{{bits: {}, data: {}", self.bit_len, hex::encode(&self.data))?;
        if !self.references.is_empty() {
            write!(f, ", refs: {:?}", self.references)?;
        }
        write!(f, "}}")
    }
}

/// Cells travel through JSON as hex-encoded BOCs
impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let boc = self.to_boc_hex().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&boc)
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Cell::from_boc_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell_hash() {
        // Well-known representation hash of the empty ordinary cell
        assert_eq!(
            Cell::empty().hash_hex(),
            "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7"
        );
        assert_eq!(Cell::empty().depth(), 0);
    }

    #[test]
    fn test_trailing_bits_are_cleared() {
        let cell = Cell::new(vec![0xff], 3, vec![]).unwrap();
        assert_eq!(cell.data(), &[0xe0]);
        assert_eq!(cell.padded_data(), vec![0xf0]);
        assert_eq!(cell.bits_descriptor(), 1);
    }

    #[test]
    fn test_depth_follows_references() {
        let leaf = Arc::new(Cell::empty());
        let mid = Arc::new(Cell::new(vec![], 0, vec![leaf.clone()]).unwrap());
        let root = Cell::new(vec![], 0, vec![mid, leaf]).unwrap();
        assert_eq!(root.depth(), 2);
    }

    #[test]
    fn test_depth_limit() {
        let mut cell = Arc::new(Cell::empty());
        for _ in 0..MAX_CELL_DEPTH {
            cell = Arc::new(Cell::new(vec![], 0, vec![cell]).unwrap());
        }
        assert_eq!(cell.depth(), MAX_CELL_DEPTH);
        assert_eq!(
            Cell::new(vec![], 0, vec![cell]),
            Err(CellError::DepthOverflow {
                depth: MAX_CELL_DEPTH + 1,
                max: MAX_CELL_DEPTH,
            })
        );
    }

    #[test]
    fn test_limits() {
        assert!(matches!(
            Cell::new(vec![0; 128], 1024, vec![]),
            Err(CellError::BitOverflow { .. })
        ));
        let leaf = Arc::new(Cell::empty());
        assert_eq!(
            Cell::new(vec![], 0, vec![leaf; 5]),
            Err(CellError::RefOverflow)
        );
    }
}
