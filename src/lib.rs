//! # bitvector
//!
//! Bit-array data structures with a uniform contract: a dense
//! single-threaded vector, a dense lock-free concurrent vector, and a
//! sparse two-level roaring-style vector.
//!
//! All three variants address bits by a 64-bit absolute index and expose
//! the same operation set: `set`, `unset`, `get`, `xor`, population
//! counting, symmetric difference, union merge, and a versioned binary
//! dump/load format. The [`BitVector`] trait carries that contract across
//! variants; cross-variant set operations are rejected with
//! [`Error::WrongType`].
//!
//! ## Quick Start
//!
//! ```
//! use bitvector::{BitVector, RoaringVector, Vector};
//!
//! let mut dense = Vector::new(64).unwrap();
//! dense.set(3);
//! dense.set(40);
//! assert_eq!(dense.popcount(), 2);
//!
//! let mut sparse = RoaringVector::new();
//! sparse.set(1 << 40);
//! assert_eq!(sparse.get(1 << 40), 1);
//!
//! // Cross-variant operations fail with a structured error
//! assert!(BitVector::difference(&dense, &sparse).is_err());
//! ```
//!
//! ## Variants
//!
//! - [`Vector`]: flat byte buffer, single writer, fixed capacity.
//! - [`ConcurrentVector`]: flat `AtomicU32` buffer; every bit mutation is
//!   a bounded-retry CAS loop, so simultaneous readers and writers are
//!   safe. Per-bit linearizable; multi-bit observers see torn snapshots.
//! - [`RoaringVector`]: sorted key array over sorted-array leaf bitmaps
//!   with copy-on-write leaf sharing, for sparse 64-bit key spaces.
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` on the plain-data building blocks
//!   ([`BitSlice`], [`Bitmap`]). Independent of the binary dump format.

mod bitmap;
mod bitslice;
mod concurrent;
mod dense;
mod error;
mod io;
mod popcount;
mod roaring;

use std::any::Any;
use std::io::{Read, Write};

pub use bitmap::{Bitmap, MAX_ENTRIES};
pub use bitslice::BitSlice;
pub use concurrent::ConcurrentVector;
pub use dense::Vector;
pub use error::Error;
pub use popcount::{hamming_bytes, popcount_bytes, popcount_words};
pub use roaring::RoaringVector;

/// The uniform operation set shared by every vector variant.
///
/// The trait is object-safe so heterogeneous vectors can be handed to
/// [`difference`](BitVector::difference) and [`merge`](BitVector::merge);
/// implementations downcast the peer and return [`Error::WrongType`] when
/// the variants differ.
///
/// Mutators report success as a boolean: `false` means the index fell
/// outside the buffer or, for the concurrent variant, that the CAS retry
/// budget ran out. [`get`](BitVector::get) never fails; out-of-range
/// positions read as zero.
pub trait BitVector: Any {
    /// Make bit `i` one.
    fn set(&mut self, i: u64) -> bool;

    /// Make bit `i` zero.
    fn unset(&mut self, i: u64) -> bool;

    /// Toggle bit `i`.
    fn xor(&mut self, i: u64) -> bool;

    /// Read bit `i` as 0 or 1.
    fn get(&self, i: u64) -> u8;

    /// Logical element count: the running one-count for the dense
    /// variants, the total population across leaves for the roaring one.
    fn size(&self) -> u64;

    /// Declared capacity in bits (dense) or allocated key-slot count times
    /// 2³² (roaring).
    fn capacity(&self) -> u64;

    /// Cardinality, recomputed from the backing store.
    fn popcount(&self) -> u64;

    /// Cardinality of the symmetric difference against `other`.
    ///
    /// Fails with [`Error::WrongType`] on a different variant and
    /// [`Error::NotEqualSize`] on a dense peer of different capacity.
    fn difference(&self, other: &dyn BitVector) -> Result<u64, Error>;

    /// Bitwise union of `other` into `self`. Same error taxonomy as
    /// [`difference`](BitVector::difference).
    fn merge(&mut self, other: &dyn BitVector) -> Result<(), Error>;

    /// Zero all bits, retaining allocated buffers.
    fn reset(&mut self);

    /// Independent boxed copy.
    fn clone_vector(&self) -> Box<dyn BitVector>;

    /// Dump the vector into `w`; returns the number of bytes written.
    fn write_to(&self, w: &mut dyn Write) -> Result<u64, Error>;

    /// Load the vector from `r`; returns the number of bytes read.
    fn read_from(&mut self, r: &mut dyn Read) -> Result<u64, Error>;

    /// Upcast for peer type checks in cross-variant operations.
    fn as_any(&self) -> &dyn Any;
}
