//! `Hashmap n ^Cell` dictionaries (TL-B `Hashmap`/`HashmapE`)
//!
//! Serialization builds the binary Patricia tree over fixed-length keys and
//! picks the shortest edge label encoding (`hml_short`, `hml_long`,
//! `hml_same`), preferring short, then long, then same on ties. Values are
//! stored as references.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use num_traits::Zero;
use pizzabox_core::CellError;

use crate::builder::CellBuilder;
use crate::cell::{ArcCell, Cell};
use crate::slice::CellSlice;

/// Serialize a non-empty map into the root cell of a `Hashmap key_len ^Cell`
pub fn serialize_hashmap(
    key_len: usize,
    entries: &BTreeMap<BigUint, ArcCell>,
) -> Result<Cell, CellError> {
    if entries.is_empty() {
        return Err(CellError::InvalidDict("cannot serialize an empty Hashmap".into()));
    }

    let keyed: Vec<(Vec<bool>, &ArcCell)> = entries
        .iter()
        .map(|(k, v)| key_to_bits(k, key_len).map(|bits| (bits, v)))
        .collect::<Result<_, _>>()?;
    let edges: Vec<(&[bool], &ArcCell)> = keyed.iter().map(|(k, v)| (k.as_slice(), *v)).collect();

    let mut root = CellBuilder::new();
    write_edge(&edges, key_len, &mut root)?;
    root.build()
}

/// Parse the root cell of a `Hashmap key_len ^Cell`
pub fn parse_hashmap(root: &Cell, key_len: usize) -> Result<BTreeMap<BigUint, ArcCell>, CellError> {
    let mut out = BTreeMap::new();
    let mut prefix = Vec::with_capacity(key_len);
    parse_edge(&mut root.parser(), key_len, &mut prefix, &mut out)?;
    Ok(out)
}

/// Load `HashmapE key_len ^Cell` from a slice
pub fn load_dict(
    slice: &mut CellSlice<'_>,
    key_len: usize,
) -> Result<BTreeMap<BigUint, ArcCell>, CellError> {
    match slice.load_maybe_cell_ref()? {
        Some(root) => parse_hashmap(&root, key_len),
        None => Ok(BTreeMap::new()),
    }
}

fn key_to_bits(key: &BigUint, key_len: usize) -> Result<Vec<bool>, CellError> {
    if key.bits() as usize > key_len {
        return Err(CellError::InvalidDict(format!(
            "key does not fit {} bits",
            key_len
        )));
    }
    let bytes = key.to_bytes_be();
    let total = bytes.len() * 8;
    let mut bits = vec![false; key_len.saturating_sub(total)];
    for i in total.saturating_sub(key_len)..total {
        bits.push((bytes[i / 8] >> (7 - i % 8)) & 1 == 1);
    }
    Ok(bits)
}

fn bits_to_key(bits: &[bool]) -> BigUint {
    let mut key = BigUint::zero();
    for &bit in bits {
        key <<= 1u32;
        if bit {
            key += 1u32;
        }
    }
    key
}

/// Bits needed to encode a label length in `0..=max`
fn length_bits(max: usize) -> usize {
    (usize::BITS - max.leading_zeros()) as usize
}

fn common_prefix_len(edges: &[(&[bool], &ArcCell)]) -> usize {
    let first = edges[0].0;
    let mut len = first.len();
    for (key, _) in &edges[1..] {
        len = len.min(first.iter().zip(key.iter()).take_while(|(a, b)| a == b).count());
    }
    len
}

fn write_edge(
    edges: &[(&[bool], &ArcCell)],
    key_len: usize,
    to: &mut CellBuilder,
) -> Result<(), CellError> {
    let prefix = common_prefix_len(edges);
    write_label(&edges[0].0[..prefix], key_len, to)?;

    let rest: Vec<(&[bool], &ArcCell)> = edges.iter().map(|(k, v)| (&k[prefix..], *v)).collect();
    write_node(&rest, key_len - prefix, to)
}

fn write_node(
    edges: &[(&[bool], &ArcCell)],
    key_len: usize,
    to: &mut CellBuilder,
) -> Result<(), CellError> {
    if edges.len() == 1 {
        to.store_reference(edges[0].1)?;
        return Ok(());
    }

    let (left, right): (Vec<_>, Vec<_>) = edges.iter().partition(|(k, _)| !k[0]);
    if left.is_empty() || right.is_empty() {
        return Err(CellError::InvalidDict("duplicate keys in fork".into()));
    }

    let mut left_cell = CellBuilder::new();
    let left: Vec<_> = left.iter().map(|(k, v)| (&k[1..], *v)).collect();
    write_edge(&left, key_len - 1, &mut left_cell)?;

    let mut right_cell = CellBuilder::new();
    let right: Vec<_> = right.iter().map(|(k, v)| (&k[1..], *v)).collect();
    write_edge(&right, key_len - 1, &mut right_cell)?;

    to.store_child(left_cell.build()?)?;
    to.store_child(right_cell.build()?)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelKind {
    Short,
    Long,
    Same,
}

fn detect_label_kind(label: &[bool], key_len: usize) -> LabelKind {
    let len_bits = length_bits(key_len);
    let mut kind = LabelKind::Short;
    let mut best = 1 + label.len() + 1 + label.len();

    let long = 2 + len_bits + label.len();
    if long < best {
        kind = LabelKind::Long;
        best = long;
    }

    let same_bits = label.windows(2).all(|w| w[0] == w[1]);
    if same_bits {
        let same = 3 + len_bits;
        if same < best {
            kind = LabelKind::Same;
        }
    }
    kind
}

fn write_label(label: &[bool], key_len: usize, to: &mut CellBuilder) -> Result<(), CellError> {
    let len_bits = length_bits(key_len);
    match detect_label_kind(label, key_len) {
        LabelKind::Short => {
            to.store_bit(false)?;
            for _ in 0..label.len() {
                to.store_bit(true)?;
            }
            to.store_bit(false)?;
            to.store_bits(label)?;
        }
        LabelKind::Long => {
            to.store_bit(true)?.store_bit(false)?;
            to.store_u64(len_bits, label.len() as u64)?;
            to.store_bits(label)?;
        }
        LabelKind::Same => {
            to.store_bit(true)?.store_bit(true)?;
            to.store_bit(label[0])?;
            to.store_u64(len_bits, label.len() as u64)?;
        }
    }
    Ok(())
}

fn read_label(slice: &mut CellSlice<'_>, key_len: usize) -> Result<Vec<bool>, CellError> {
    let len_bits = length_bits(key_len);
    let label = if !slice.load_bit()? {
        let mut n = 0;
        while slice.load_bit()? {
            n += 1;
        }
        (0..n).map(|_| slice.load_bit()).collect::<Result<Vec<_>, _>>()?
    } else if !slice.load_bit()? {
        let n = slice.load_u64(len_bits)? as usize;
        (0..n).map(|_| slice.load_bit()).collect::<Result<Vec<_>, _>>()?
    } else {
        let bit = slice.load_bit()?;
        let n = slice.load_u64(len_bits)? as usize;
        vec![bit; n]
    };

    if label.len() > key_len {
        return Err(CellError::InvalidDict(format!(
            "label of {} bits exceeds remaining key length {}",
            label.len(),
            key_len
        )));
    }
    Ok(label)
}

fn parse_edge(
    slice: &mut CellSlice<'_>,
    key_len: usize,
    prefix: &mut Vec<bool>,
    out: &mut BTreeMap<BigUint, ArcCell>,
) -> Result<(), CellError> {
    let label = read_label(slice, key_len)?;
    let base = prefix.len();
    prefix.extend_from_slice(&label);
    let remaining = key_len - label.len();

    if remaining == 0 {
        let value = slice.load_reference()?.clone();
        out.insert(bits_to_key(prefix), value);
    } else {
        let left = slice.load_reference()?;
        let right = slice.load_reference()?;
        prefix.push(false);
        parse_edge(&mut left.parser(), remaining - 1, prefix, out)?;
        prefix.pop();
        prefix.push(true);
        parse_edge(&mut right.parser(), remaining - 1, prefix, out)?;
        prefix.pop();
    }

    prefix.truncate(base);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn value(byte: u8) -> ArcCell {
        let mut b = CellBuilder::new();
        b.store_u8(8, byte).unwrap();
        Arc::new(b.build().unwrap())
    }

    #[test]
    fn test_length_bits() {
        assert_eq!(length_bits(256), 9);
        assert_eq!(length_bits(255), 8);
        assert_eq!(length_bits(1), 1);
        assert_eq!(length_bits(0), 0);
    }

    #[test]
    fn test_label_kinds() {
        // Empty label: short (2 bits) beats everything
        assert_eq!(detect_label_kind(&[], 256), LabelKind::Short);
        // Long run of equal bits: same
        assert_eq!(detect_label_kind(&[true; 200], 256), LabelKind::Same);
        // Long mixed label: long
        let mixed: Vec<bool> = (0..100).map(|i| i % 3 == 0).collect();
        assert_eq!(detect_label_kind(&mixed, 256), LabelKind::Long);
        // Short mixed label fits best as short
        assert_eq!(detect_label_kind(&[true, false], 8), LabelKind::Short);
    }

    #[test]
    fn test_single_entry_layout() {
        let mut map = BTreeMap::new();
        map.insert(BigUint::from(0b1010_0000u32), value(7));
        let root = serialize_hashmap(8, &map).unwrap();

        // hml_long$10 n:(#<= 8) = 4 bits of length, then the 8 key bits
        let mut s = root.parser();
        assert!(s.load_bit().unwrap());
        assert!(!s.load_bit().unwrap());
        assert_eq!(s.load_u64(4).unwrap(), 8);
        assert_eq!(s.load_u64(8).unwrap(), 0b1010_0000);
        assert_eq!(s.remaining_bits(), 0);
        assert_eq!(root.references().len(), 1);
    }

    #[test]
    fn test_fork_layout_hash() {
        let mut map = BTreeMap::new();
        for (i, k) in [3u32, 17, 200, 201, 255].iter().enumerate() {
            map.insert(BigUint::from(*k), value(i as u8));
        }
        let root = serialize_hashmap(8, &map).unwrap();
        assert_eq!(
            root.hash_hex(),
            "a0f7710132d75299c236f08916a9b09b321a061951d4e563d0aee93ef98dea32"
        );
        assert_eq!(
            root.to_boc_base64().unwrap(),
            "te6cckEBDgEAOgACASABBgIBYgIEAQOhwAMAAgABA6DABQACAQIBWAcMAgOiQAgKAQEgCQACAgEBIAsAAgMBAfYNAAIEDdJlhg=="
        );
    }

    #[test]
    fn test_same_label_layout() {
        let mut map = BTreeMap::new();
        map.insert(BigUint::zero(), value(7));
        let root = serialize_hashmap(256, &map).unwrap();

        // hml_same$11 v:0 n:(#<= 256) = 2 + 1 + 9 bits
        assert_eq!(root.bit_len(), 12);
        assert_eq!(
            root.hash_hex(),
            "b29ff60b79ab1852897403a34d4ee82c04c63169d8f6037b89fc657bea84a87a"
        );
    }

    #[test]
    fn test_serialize_then_parse() {
        let mut map = BTreeMap::new();
        for (i, k) in [3u32, 17, 200, 201, 255].iter().enumerate() {
            map.insert(BigUint::from(*k), value(i as u8));
        }
        let root = serialize_hashmap(8, &map).unwrap();
        let parsed = parse_hashmap(&root, 8).unwrap();
        assert_eq!(parsed, map);
    }

    #[test]
    fn test_key_too_wide() {
        let mut map = BTreeMap::new();
        map.insert(BigUint::from(256u32), value(0));
        assert!(matches!(
            serialize_hashmap(8, &map),
            Err(CellError::InvalidDict(_))
        ));
    }

    #[test]
    fn test_hashmap_e() {
        let mut b = CellBuilder::new();
        b.store_dict(256, &BTreeMap::new()).unwrap();
        let empty = b.build().unwrap();
        assert_eq!(empty.bit_len(), 1);
        assert!(load_dict(&mut empty.parser(), 256).unwrap().is_empty());

        let mut map = BTreeMap::new();
        map.insert(BigUint::from(42u32), value(1));
        let mut b = CellBuilder::new();
        b.store_dict(256, &map).unwrap();
        let cell = b.build().unwrap();
        assert_eq!(load_dict(&mut cell.parser(), 256).unwrap(), map);
    }
}
