//! `htdivchn`: a batched, multi-reader/multi-writer in-memory hash table
//! using the division method for hashing with chained collision resolution,
//! and staged, single-writer growth.
//!
//! The design is split across the modules listed below, one per component of
//! the original specification (see SPEC_FULL.md §0 for the full
//! cross-reference):
//!
//! - `chain` — the bucket chain (C1): a singly-linked list of records
//!   hashing to the same slot.
//! - `primes` — the prime ladder (C2): slot counts a table grows through.
//! - `reduce` — the hash function (C3): [`Reduce`] plus the default
//!   byte-accumulation reducer.
//! - `table` — the slot array, lock array, and the public operation surface
//!   ([`HtDivChn`]) tying every other module together.
//! - `gate` — the gate (C6): the synchronization object that lets growth run
//!   single-threaded without blocking reads.
//! - `mutator` — the mutator engine (C7): batched insert/remove/delete.
//! - `growth` — the growth engine (C8): parallel rehashing during growth.
//! - `config` — construction-time configuration ([`HtConfig`]), new ambient
//!   surface per SPEC_FULL.md §1.3.
//! - `error` — [`HtError`] and [`HtResult`].
//!
//! # Example
//!
//! ```
//! use htdivchn::HtConfig;
//!
//! let table = HtConfig::new()
//!     .with_alpha(1, 1)
//!     .build::<u64, u64>()
//!     .expect("capacity hint fits the prime ladder");
//!
//! table.insert_batch(&[1, 2, 3], &[10, 20, 30]);
//! assert_eq!(table.search(&2), Some(&20));
//!
//! let mut out = [None, None];
//! table.remove_batch(&[1, 3], &mut out);
//! assert_eq!(out, [Some(10), Some(30)]);
//! assert_eq!(table.len(), 1);
//! ```
//!
//! # Concurrency contract
//!
//! [`HtDivChn::insert_batch`], [`HtDivChn::remove_batch`], and
//! [`HtDivChn::delete_batch`] may be called concurrently from any number of
//! threads holding only a shared `&HtDivChn` (wrap it in an `Arc` to share
//! it). [`HtDivChn::search`] is lock-free and must only be called when no
//! mutator batch is in flight on the same table — see spec.md §4.8 and the
//! open question recorded in DESIGN.md.

mod chain;
mod gate;
mod growth;
mod mutator;

pub mod config;
pub mod error;
pub mod primes;
pub mod reduce;
pub mod table;

pub use config::HtConfig;
pub use error::{HtError, HtResult};
pub use reduce::{DefaultReducer, Reduce};
pub use table::{HtDivChn, MergeFn};

/// An [`HtDivChn`] keyed by raw byte blocks, for callers building dynamic
/// keys (e.g. a graph-algorithm layer concatenating node ids) who would
/// otherwise need to define a newtype just to get `Reduce`/`Eq`. Per
/// SPEC_FULL.md §2, this is the "opaque-bytes front" the original spec's
/// DESIGN NOTES call out as worth offering alongside the generic-typed one.
pub type ByteTable<V> = HtDivChn<Vec<u8>, V>;
