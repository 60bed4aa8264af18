//! ton-cell: cell, address and bag-of-cells encoding for TON messages
//!
//! Covers the subset of the TON data model needed to build jetton transfer
//! payloads and decode get-method results: ordinary cells, `addr_std`
//! addresses, `HashmapE` dictionaries and the generic BOC container.

pub mod address;
pub mod boc;
pub mod builder;
pub mod cell;
pub mod dict;
pub mod slice;

pub use address::TonAddress;
pub use boc::{deserialize_boc, serialize_boc};
pub use builder::CellBuilder;
pub use cell::{ArcCell, Cell, MAX_CELL_BITS, MAX_CELL_DEPTH, MAX_CELL_REFS};
pub use dict::{load_dict, parse_hashmap, serialize_hashmap};
pub use slice::CellSlice;
