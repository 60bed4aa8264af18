//! Bag-of-cells serialization
//!
//! Layout of the generic format (`serialized_boc#b5ee9c72`):
//!
//! ```text
//! magic:u32 | has_idx:1 has_crc32c:1 has_cache_bits:1 flags:2 size:3
//! off_bytes:u8 | cells:size | roots:size | absent:size | tot_cells_size:off_bytes
//! root_list:[size] | index:[off_bytes]? | cell_data | crc32c:u32 LE?
//! ```
//!
//! Cells are written root first. The ordering is the reverse of a post-order
//! walk that visits references last-to-first, deduplicated by hash, which is
//! the order `@ton/core` produces.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crc::{Crc, CRC_32_ISCSI};
use pizzabox_core::CellError;

use crate::cell::{ArcCell, Cell};

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];
const CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// Minimum number of bytes able to hold `value` (at least one)
fn bytes_for(value: usize) -> usize {
    let bits = (usize::BITS - value.leading_zeros()) as usize;
    bits.div_ceil(8).max(1)
}

fn write_uint(out: &mut Vec<u8>, value: usize, bytes: usize) {
    let be = (value as u64).to_be_bytes();
    out.extend_from_slice(&be[8 - bytes..]);
}

fn topological_order(root: &Cell) -> Vec<&Cell> {
    fn visit<'a>(cell: &'a Cell, seen: &mut HashSet<[u8; 32]>, sorted: &mut Vec<&'a Cell>) {
        if seen.contains(&cell.hash()) {
            return;
        }
        for r in cell.references().iter().rev() {
            visit(r, seen, sorted);
        }
        seen.insert(cell.hash());
        sorted.push(cell);
    }

    let mut seen = HashSet::new();
    let mut sorted = Vec::new();
    visit(root, &mut seen, &mut sorted);
    sorted.reverse();
    sorted
}

/// Serialize a single-root BOC without an index
pub fn serialize_boc(root: &Cell, has_crc32c: bool) -> Result<Vec<u8>, CellError> {
    let cells = topological_order(root);
    let index: HashMap<[u8; 32], usize> = cells
        .iter()
        .enumerate()
        .map(|(i, c)| (c.hash(), i))
        .collect();

    let size_bytes = bytes_for(cells.len());
    if size_bytes > 4 {
        return Err(CellError::InvalidBoc("too many cells".to_string()));
    }

    let mut cell_data = Vec::new();
    for cell in &cells {
        cell_data.push(cell.refs_descriptor());
        cell_data.push(cell.bits_descriptor());
        cell_data.extend_from_slice(&cell.padded_data());
        for r in cell.references() {
            let idx = index
                .get(&r.hash())
                .copied()
                .ok_or_else(|| CellError::InvalidBoc("dangling reference".to_string()))?;
            write_uint(&mut cell_data, idx, size_bytes);
        }
    }
    let off_bytes = bytes_for(cell_data.len());

    let mut out = Vec::with_capacity(4 + 2 + 4 * size_bytes + off_bytes + cell_data.len() + 4);
    out.extend_from_slice(&BOC_MAGIC);
    let mut flags = size_bytes as u8;
    if has_crc32c {
        flags |= 0x40;
    }
    out.push(flags);
    out.push(off_bytes as u8);
    write_uint(&mut out, cells.len(), size_bytes);
    write_uint(&mut out, 1, size_bytes); // roots
    write_uint(&mut out, 0, size_bytes); // absent
    write_uint(&mut out, cell_data.len(), off_bytes);
    write_uint(&mut out, 0, size_bytes); // root index
    out.extend_from_slice(&cell_data);

    if has_crc32c {
        let crc = CRC32C.checksum(&out);
        out.extend_from_slice(&crc.to_le_bytes());
    }
    Ok(out)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CellError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| CellError::InvalidBoc("unexpected end of data".to_string()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn uint(&mut self, n: usize) -> Result<usize, CellError> {
        Ok(self
            .take(n)?
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize))
    }

    fn byte(&mut self) -> Result<u8, CellError> {
        Ok(self.take(1)?[0])
    }
}

struct RawCell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<usize>,
}

/// Deserialize a BOC, returning its root cells
pub fn deserialize_boc(bytes: &[u8]) -> Result<Vec<ArcCell>, CellError> {
    let mut r = Reader { bytes, pos: 0 };
    if r.take(4)? != BOC_MAGIC {
        return Err(CellError::InvalidBoc("unknown magic prefix".to_string()));
    }

    let flags = r.byte()?;
    let has_idx = flags & 0x80 != 0;
    let has_crc32c = flags & 0x40 != 0;
    let has_cache_bits = flags & 0x20 != 0;
    let size_bytes = (flags & 0x07) as usize;
    if size_bytes == 0 || size_bytes > 4 {
        return Err(CellError::InvalidBoc(format!("invalid size field {}", size_bytes)));
    }
    if has_cache_bits && !has_idx {
        return Err(CellError::InvalidBoc("cache bits without index".to_string()));
    }

    let off_bytes = r.byte()? as usize;
    if off_bytes == 0 || off_bytes > 8 {
        return Err(CellError::InvalidBoc(format!("invalid offset size {}", off_bytes)));
    }

    let cells_num = r.uint(size_bytes)?;
    let roots_num = r.uint(size_bytes)?;
    let _absent = r.uint(size_bytes)?;
    let tot_cells_size = r.uint(off_bytes)?;
    if roots_num == 0 || roots_num > cells_num {
        return Err(CellError::InvalidBoc("invalid root count".to_string()));
    }

    let roots = (0..roots_num)
        .map(|_| r.uint(size_bytes))
        .collect::<Result<Vec<_>, _>>()?;
    if has_idx {
        r.take(cells_num.saturating_mul(off_bytes))?;
    }

    let data_start = r.pos;
    let mut raw = Vec::with_capacity(cells_num.min(bytes.len()));
    for i in 0..cells_num {
        let d1 = r.byte()?;
        let d2 = r.byte()?;
        let refs_num = (d1 & 0x07) as usize;
        if d1 & 0x08 != 0 {
            return Err(CellError::InvalidBoc("exotic cells are not supported".to_string()));
        }
        if d1 & 0x10 != 0 || d1 >> 5 != 0 {
            return Err(CellError::InvalidBoc(
                "cells with stored hashes or levels are not supported".to_string(),
            ));
        }
        if refs_num > 4 {
            return Err(CellError::InvalidBoc("too many references".to_string()));
        }

        let data_len = (d2 as usize).div_ceil(2);
        let mut data = r.take(data_len)?.to_vec();
        let bit_len = if d2 % 2 == 0 {
            data_len * 8
        } else {
            let last = data
                .last()
                .copied()
                .filter(|&b| b != 0)
                .ok_or_else(|| CellError::InvalidBoc("missing completion tag".to_string()))?;
            let tag_pos = last.trailing_zeros() as usize;
            if let Some(b) = data.last_mut() {
                *b &= !(1u8 << tag_pos);
            }
            data_len * 8 - tag_pos - 1
        };

        let refs = (0..refs_num)
            .map(|_| r.uint(size_bytes))
            .collect::<Result<Vec<_>, _>>()?;
        if refs.iter().any(|&idx| idx <= i || idx >= cells_num) {
            return Err(CellError::InvalidBoc(format!(
                "cell {} has an out-of-order reference",
                i
            )));
        }
        raw.push(RawCell {
            data,
            bit_len,
            refs,
        });
    }
    if r.pos - data_start != tot_cells_size {
        return Err(CellError::InvalidBoc("cell data size mismatch".to_string()));
    }

    if has_crc32c {
        let body_end = r.pos;
        let stored = r.take(4)?;
        let expected = CRC32C.checksum(&bytes[..body_end]).to_le_bytes();
        if stored != expected {
            return Err(CellError::InvalidBoc("crc32c mismatch".to_string()));
        }
    }

    let mut built: Vec<Option<ArcCell>> = vec![None; cells_num];
    for i in (0..cells_num).rev() {
        let raw_cell = &raw[i];
        let refs = raw_cell
            .refs
            .iter()
            .map(|&idx| {
                built[idx]
                    .clone()
                    .ok_or_else(|| CellError::InvalidBoc("unresolved reference".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        built[i] = Some(Arc::new(Cell::new(
            raw_cell.data.clone(),
            raw_cell.bit_len,
            refs,
        )?));
    }

    roots
        .into_iter()
        .map(|idx| {
            built
                .get(idx)
                .cloned()
                .flatten()
                .ok_or_else(|| CellError::InvalidBoc(format!("root index {} out of range", idx)))
        })
        .collect()
}

/// Deserialize a BOC that must contain exactly one root
pub fn deserialize_single_root(bytes: &[u8]) -> Result<Cell, CellError> {
    let mut roots = deserialize_boc(bytes)?;
    if roots.len() != 1 {
        return Err(CellError::InvalidBoc(format!(
            "expected a single root, found {}",
            roots.len()
        )));
    }
    let root = roots.remove(0);
    Ok(Arc::try_unwrap(root).unwrap_or_else(|shared| (*shared).clone()))
}
