//! Two-level sparse bit vector for 64-bit keys.
//!
//! A 64-bit input splits into a 32-bit high half selecting a leaf and a
//! 32-bit low half addressed inside the leaf. Leaves are sorted-array
//! [`Bitmap`]s held behind `Rc`, with a parallel [`BitSlice`] of
//! copy-on-write flags: a set flag means "this leaf is shared with another
//! vector; clone it before writing".
//!
//! `merge` and `filter` build their result in a staging copy and replace
//! the receiver only on success, so a failed operation leaves the receiver
//! untouched.
//!
//! Not thread-safe: single writer, any number of readers when no writer is
//! active.

use std::any::Any;
use std::cmp::Ordering;
use std::io::{Read, Write};
use std::rc::Rc;

use crate::bitmap::Bitmap;
use crate::bitslice::BitSlice;
use crate::error::Error;
use crate::io;
use crate::BitVector;

/// Dump signature of the roaring container.
pub const SIGNATURE: u64 = 0x9CF8_14F5_923A_C3BF;

/// Sparse 64-bit-addressed bit set.
///
/// # Invariants
///
/// - `keys` strictly ascending, `|leaves| == |keys| == |cow|`.
/// - Every leaf is non-empty; a leaf emptied by [`unset`](RoaringVector::unset)
///   is spliced out together with its key and flag.
///
/// # Example
///
/// ```
/// use bitvector::RoaringVector;
///
/// let mut vec = RoaringVector::new();
/// vec.set(0);
/// vec.set(1 << 32);
/// vec.set((1 << 32) + 7);
///
/// assert_eq!(vec.popcount(), 3);
/// assert_eq!(vec.get((1 << 32) + 7), 1);
/// assert_eq!(vec.get(42), 0);
/// ```
#[derive(Debug, Default)]
pub struct RoaringVector {
    /// Strictly ascending high halves
    keys: Vec<u32>,
    /// Leaf per key, shared across vectors until a write detaches it
    leaves: Vec<Rc<Bitmap>>,
    /// One copy-on-write flag per key slot
    cow: BitSlice,
}

impl RoaringVector {
    /// Create an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make bit `x` one. Returns `false` when the target leaf is at its
    /// entry cap; see [`try_set`](RoaringVector::try_set) for the
    /// structured error.
    pub fn set(&mut self, x: u64) -> bool {
        self.try_set(x).is_ok()
    }

    /// Make bit `x` one, surfacing [`Error::LeafFull`] when the target
    /// leaf is at its entry cap. `Ok(true)` means the bit was clear before.
    pub fn try_set(&mut self, x: u64) -> Result<bool, Error> {
        let (hb, lb) = split(x);
        match self.index_hb(hb) {
            Err(ins) => {
                self.keys.insert(ins, hb);
                self.leaves.insert(ins, Rc::new(Bitmap::with_entry(lb)));
                self.cow.insert(ins, false);
                Ok(true)
            }
            Ok(i) => {
                self.detach(i);
                Rc::make_mut(&mut self.leaves[i]).add(lb)
            }
        }
    }

    /// Make bit `x` zero. Returns `false` when the bit was already clear.
    ///
    /// A leaf emptied by the removal is spliced out of all three parallel
    /// arrays.
    pub fn unset(&mut self, x: u64) -> bool {
        let (hb, lb) = split(x);
        let Ok(i) = self.index_hb(hb) else {
            return false;
        };
        if !self.leaves[i].contains(lb) {
            return false;
        }
        if self.leaves[i].len() == 1 {
            // Last entry: drop the whole slot without detaching the
            // (possibly shared) leaf first.
            self.keys.remove(i);
            self.leaves.remove(i);
            self.cow.remove(i);
            return true;
        }
        self.detach(i);
        Rc::make_mut(&mut self.leaves[i]).remove(lb);
        true
    }

    /// Toggle bit `x`.
    pub fn xor(&mut self, x: u64) -> bool {
        if self.get(x) == 1 {
            self.unset(x)
        } else {
            self.set(x)
        }
    }

    /// Read bit `x`; absent keys and entries read as zero.
    pub fn get(&self, x: u64) -> u8 {
        let (hb, lb) = split(x);
        match self.index_hb(hb) {
            Ok(i) if self.leaves[i].contains(lb) => 1,
            _ => 0,
        }
    }

    /// Total population across leaves.
    #[inline]
    pub fn size(&self) -> u64 {
        self.popcount()
    }

    /// Allocated key-slot count times the 2³² leaf width.
    #[inline]
    pub fn capacity(&self) -> u64 {
        (self.keys.capacity() as u64) << 32
    }

    /// Cardinality: sum of leaf sizes.
    pub fn popcount(&self) -> u64 {
        self.leaves.iter().map(|leaf| leaf.len() as u64).sum()
    }

    /// Cardinality of the symmetric difference against `other`.
    ///
    /// Walks both sorted key arrays once; shared keys are resolved with a
    /// two-pointer merge over the sorted leaf entries.
    pub fn difference(&self, other: &RoaringVector) -> u64 {
        let mut total = 0u64;
        let (mut i, mut j) = (0, 0);
        while i < self.keys.len() && j < other.keys.len() {
            match self.keys[i].cmp(&other.keys[j]) {
                Ordering::Less => {
                    total += self.leaves[i].len() as u64;
                    i += 1;
                }
                Ordering::Greater => {
                    total += other.leaves[j].len() as u64;
                    j += 1;
                }
                Ordering::Equal => {
                    total += symmetric_count(self.leaves[i].entries(), other.leaves[j].entries());
                    i += 1;
                    j += 1;
                }
            }
        }
        for k in i..self.keys.len() {
            total += self.leaves[k].len() as u64;
        }
        for k in j..other.keys.len() {
            total += other.leaves[k].len() as u64;
        }
        total
    }

    /// Bitwise union of `other` into `self`.
    ///
    /// The union is built in a staging copy that shares this vector's
    /// leaves through the COW mechanism; on [`Error::LeafFull`] the
    /// staging copy is dropped and the receiver is left untouched.
    pub fn merge(&mut self, other: &RoaringVector) -> Result<(), Error> {
        let mut staging = self.share();
        for (idx, &key) in other.keys.iter().enumerate() {
            let base = (key as u64) << 32;
            for &lb in other.leaves[idx].entries() {
                staging.try_set(base | lb as u64)?;
            }
        }
        *self = staging;
        Ok(())
    }

    /// Intersection of `self` with `other`, replacing the receiver.
    ///
    /// Returns [`Error::WrongType`] when `other` is not a roaring vector.
    /// Keys present on only one side contribute nothing; shared keys are
    /// intersected entry-wise, and empty intersections produce no slot.
    pub fn filter(&mut self, other: &dyn BitVector) -> Result<(), Error> {
        let other: &RoaringVector = other.as_any().downcast_ref().ok_or(Error::WrongType)?;

        let mut staging = RoaringVector::new();
        let (mut i, mut j) = (0, 0);
        while i < self.keys.len() && j < other.keys.len() {
            match self.keys[i].cmp(&other.keys[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    let common =
                        intersect(self.leaves[i].entries(), other.leaves[j].entries());
                    if !common.is_empty() {
                        let mut leaf = Bitmap::from_sorted(common);
                        leaf.set_unique_tag(self.leaves[i].unique_tag());
                        staging.keys.push(self.keys[i]);
                        staging.leaves.push(Rc::new(leaf));
                        staging.cow.push(false);
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        *self = staging;
        Ok(())
    }

    /// Lazy clone: shares every leaf with `self` and marks all COW flags
    /// on both sides, so the first write on either side detaches.
    pub fn share(&mut self) -> RoaringVector {
        for i in 0..self.cow.len() {
            self.cow.set(i, true);
        }
        RoaringVector {
            keys: self.keys.clone(),
            leaves: self.leaves.clone(),
            cow: self.cow.clone(),
        }
    }

    /// Drop all keys and leaves, retaining allocations.
    pub fn reset(&mut self) {
        self.keys.clear();
        self.leaves.clear();
        self.cow.reset();
    }

    /// The high halves currently holding a leaf, ascending.
    #[inline]
    pub fn keys(&self) -> &[u32] {
        &self.keys
    }

    /// The leaf at slot `idx`, if any.
    pub fn leaf(&self, idx: usize) -> Option<&Bitmap> {
        self.leaves.get(idx).map(Rc::as_ref)
    }

    /// Dump the vector: 24-byte header (signature, version, key count),
    /// the key array, the leaf count, each leaf in sequence, then the COW
    /// flag slice. Returns the number of bytes written.
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<u64, Error> {
        let mut n = io::write_preamble(w, SIGNATURE)?;
        n += io::write_u64(w, self.keys.len() as u64)?;
        n += io::write_blocks(w, io::u32s_as_bytes(&self.keys))?;
        n += io::write_u64(w, self.leaves.len() as u64)?;
        for leaf in &self.leaves {
            n += leaf.write_to(w)?;
        }
        n += self.cow.write_to(w)?;
        Ok(n)
    }

    /// Load the vector from a dump produced by
    /// [`write_to`](RoaringVector::write_to). Returns the number of bytes
    /// read.
    pub fn read_from<R: Read + ?Sized>(&mut self, r: &mut R) -> Result<u64, Error> {
        let mut n = io::read_preamble(r, SIGNATURE)?;

        let key_count = io::read_u64(r)? as usize;
        n += 8;
        let mut bytes = vec![0u8; key_count * 4];
        n += io::read_blocks(r, &mut bytes)?;
        let keys = io::bytes_to_u32s(&bytes);

        let leaf_count = io::read_u64(r)? as usize;
        n += 8;
        if leaf_count != key_count {
            return Err(invalid_data("leaf count does not match key count"));
        }
        let mut leaves = Vec::with_capacity(leaf_count);
        for _ in 0..leaf_count {
            let mut leaf = Bitmap::new();
            n += leaf.read_from(r)?;
            leaves.push(Rc::new(leaf));
        }

        let mut cow = BitSlice::new();
        n += cow.read_from(r)?;
        if cow.len() != key_count {
            return Err(invalid_data("flag slice length does not match key count"));
        }

        self.keys = keys;
        self.leaves = leaves;
        self.cow = cow;
        Ok(n)
    }

    /// Clone the leaf at slot `i` and clear its COW flag, so the caller
    /// can write without touching the shared copy.
    fn detach(&mut self, i: usize) {
        if self.cow.get(i) {
            let copy = Bitmap::clone(&self.leaves[i]);
            self.leaves[i] = Rc::new(copy);
            self.cow.set(i, false);
        }
    }

    /// Locate the slot of high half `hb`: `Ok(index)` on a hit,
    /// `Err(insertion_point)` on a miss. The last key is checked first as
    /// a fast path for ascending inserts.
    fn index_hb(&self, hb: u32) -> Result<usize, usize> {
        let n = self.keys.len();
        if n == 0 {
            return Err(0);
        }
        if hb == self.keys[n - 1] {
            return Ok(n - 1);
        }
        self.keys.binary_search(&hb)
    }
}

impl Clone for RoaringVector {
    /// Eager deep copy: every leaf is duplicated, so the copy is
    /// independent without any COW bookkeeping against `self`.
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            leaves: self
                .leaves
                .iter()
                .map(|leaf| Rc::new(Bitmap::clone(leaf)))
                .collect(),
            cow: self.cow.clone(),
        }
    }
}

impl BitVector for RoaringVector {
    fn set(&mut self, i: u64) -> bool {
        RoaringVector::set(self, i)
    }

    fn unset(&mut self, i: u64) -> bool {
        RoaringVector::unset(self, i)
    }

    fn xor(&mut self, i: u64) -> bool {
        RoaringVector::xor(self, i)
    }

    fn get(&self, i: u64) -> u8 {
        RoaringVector::get(self, i)
    }

    fn size(&self) -> u64 {
        RoaringVector::size(self)
    }

    fn capacity(&self) -> u64 {
        RoaringVector::capacity(self)
    }

    fn popcount(&self) -> u64 {
        RoaringVector::popcount(self)
    }

    fn difference(&self, other: &dyn BitVector) -> Result<u64, Error> {
        let other = other.as_any().downcast_ref().ok_or(Error::WrongType)?;
        Ok(RoaringVector::difference(self, other))
    }

    fn merge(&mut self, other: &dyn BitVector) -> Result<(), Error> {
        let other = other.as_any().downcast_ref().ok_or(Error::WrongType)?;
        RoaringVector::merge(self, other)
    }

    fn reset(&mut self) {
        RoaringVector::reset(self)
    }

    fn clone_vector(&self) -> Box<dyn BitVector> {
        Box::new(self.clone())
    }

    fn write_to(&self, w: &mut dyn Write) -> Result<u64, Error> {
        RoaringVector::write_to(self, w)
    }

    fn read_from(&mut self, r: &mut dyn Read) -> Result<u64, Error> {
        RoaringVector::read_from(self, r)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[inline]
fn split(x: u64) -> (u32, u32) {
    ((x >> 32) as u32, x as u32)
}

/// Count entries present in exactly one of two sorted arrays.
fn symmetric_count(a: &[u32], b: &[u32]) -> u64 {
    let (mut i, mut j) = (0, 0);
    let mut n = 0u64;
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                n += 1;
                i += 1;
            }
            Ordering::Greater => {
                n += 1;
                j += 1;
            }
        }
    }
    n + (a.len() - i) as u64 + (b.len() - j) as u64
}

/// Entries present in both sorted arrays, ascending.
fn intersect(a: &[u32], b: &[u32]) -> Vec<u32> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::new();
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    out
}

fn invalid_data(msg: &'static str) -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        msg,
    ))
}
