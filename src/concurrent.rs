//! Lock-free concurrent dense bit vector.
//!
//! A flat buffer of `AtomicU32` words. Every mutation is a bounded-retry
//! CAS loop against exactly one word, so individual bit operations are
//! linearizable while multi-bit observers (`popcount`, `difference`,
//! `write_to`) see a torn snapshot of some interleaving. That is documented
//! behavior, not a bug.

use std::any::Any;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::error::Error;
use crate::io;
use crate::BitVector;

/// Dump signature of the concurrent dense container.
pub const SIGNATURE: u64 = 0xE1AA_38D7_F1FE_3CD9;

/// Multi-reader, multi-writer dense bit vector.
///
/// Mutators take `&self`; the configured retry limit bounds every CAS loop
/// at `retry_limit + 1` attempts, and an exhausted budget surfaces as
/// `false` under extreme contention.
///
/// # Example
///
/// ```
/// use bitvector::ConcurrentVector;
///
/// let vec = ConcurrentVector::new(64, 3).unwrap();
/// assert!(vec.set(10));
/// assert_eq!(vec.get(10), 1);
/// assert_eq!(vec.size(), 1);
/// ```
#[derive(Debug)]
pub struct ConcurrentVector {
    /// Raw bit storage
    buf: Vec<AtomicU32>,
    /// Declared capacity in bits
    capacity: u64,
    /// CAS attempts per mutation are `retry_limit + 1`
    retry_limit: u64,
    /// Running one-count, adjusted inside the CAS critical section
    size: AtomicU64,
}

impl ConcurrentVector {
    /// Create a vector with the given capacity in bits and CAS retry limit.
    ///
    /// Returns [`Error::ZeroSize`] when `capacity` is zero.
    pub fn new(capacity: u64, retry_limit: u64) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::ZeroSize);
        }
        let words = capacity as usize / 32 + 1;
        let mut buf = Vec::with_capacity(words);
        buf.resize_with(words, || AtomicU32::new(0));
        Ok(Self {
            buf,
            capacity,
            retry_limit,
            size: AtomicU64::new(0),
        })
    }

    /// Make bit `i` one.
    ///
    /// Returns `false` when `i` falls outside the buffer or the CAS retry
    /// budget is exhausted.
    pub fn set(&self, i: u64) -> bool {
        let w = i as usize / 32;
        if w >= self.buf.len() {
            return false;
        }
        let mask = 1u32 << (i % 32);
        for _ in 0..=self.retry_limit {
            let old = self.buf[w].load(Ordering::Acquire);
            let new = old | mask;
            if new == old {
                // Bit already set; the counter must not move.
                return true;
            }
            if self.buf[w]
                .compare_exchange(old, new, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                self.size.fetch_add(1, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    /// Make bit `i` zero. Same result semantics as [`set`](ConcurrentVector::set).
    pub fn unset(&self, i: u64) -> bool {
        let w = i as usize / 32;
        if w >= self.buf.len() {
            return false;
        }
        let mask = 1u32 << (i % 32);
        for _ in 0..=self.retry_limit {
            let old = self.buf[w].load(Ordering::Acquire);
            let new = old & !mask;
            if new == old {
                return true;
            }
            if self.buf[w]
                .compare_exchange(old, new, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                self.size.fetch_sub(1, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    /// Toggle bit `i`. Same result semantics as [`set`](ConcurrentVector::set).
    pub fn xor(&self, i: u64) -> bool {
        let w = i as usize / 32;
        if w >= self.buf.len() {
            return false;
        }
        let mask = 1u32 << (i % 32);
        for _ in 0..=self.retry_limit {
            let old = self.buf[w].load(Ordering::Acquire);
            let new = old ^ mask;
            if self.buf[w]
                .compare_exchange(old, new, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                if new & mask != 0 {
                    self.size.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.size.fetch_sub(1, Ordering::Relaxed);
                }
                return true;
            }
        }
        false
    }

    /// Read bit `i`; out-of-range positions read as zero.
    #[inline]
    pub fn get(&self, i: u64) -> u8 {
        let w = i as usize / 32;
        if w >= self.buf.len() {
            return 0;
        }
        ((self.buf[w].load(Ordering::Acquire) >> (i % 32)) & 1) as u8
    }

    /// Running one-count.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }

    /// Declared capacity in bits.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// CAS retry limit configured at construction.
    #[inline]
    pub fn retry_limit(&self) -> u64 {
        self.retry_limit
    }

    /// Cardinality, recomputed word by word with atomic loads.
    pub fn popcount(&self) -> u64 {
        self.buf
            .iter()
            .map(|w| w.load(Ordering::Acquire).count_ones() as u64)
            .sum()
    }

    /// Cardinality of the symmetric difference against `other`.
    ///
    /// Returns [`Error::NotEqualSize`] when the declared capacities differ.
    pub fn difference(&self, other: &ConcurrentVector) -> Result<u64, Error> {
        self.check_peer(other)?;
        let mut total = 0u64;
        for (a, b) in self.buf.iter().zip(other.buf.iter()) {
            let x = a.load(Ordering::Acquire) ^ b.load(Ordering::Acquire);
            total += x.count_ones() as u64;
        }
        Ok(total)
    }

    /// Bitwise union of `other` into `self`, one `fetch_or` per word.
    ///
    /// Returns [`Error::NotEqualSize`] when the declared capacities differ.
    pub fn merge(&self, other: &ConcurrentVector) -> Result<(), Error> {
        self.check_peer(other)?;
        for (dst, src) in self.buf.iter().zip(other.buf.iter()) {
            let m = src.load(Ordering::Acquire);
            if m == 0 {
                continue;
            }
            let prev = dst.fetch_or(m, Ordering::AcqRel);
            let added = (m & !prev).count_ones() as u64;
            if added > 0 {
                self.size.fetch_add(added, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Zero all bits and the running counter, retaining the buffer.
    pub fn reset(&self) {
        for w in &self.buf {
            w.store(0, Ordering::Release);
        }
        self.size.store(0, Ordering::Relaxed);
    }

    /// Dump the vector: 40-byte header (signature, version, capacity,
    /// popcount, retry limit) followed by the word buffer in 4096-byte
    /// blocks, each block snapshotted with atomic loads. Returns the
    /// number of bytes written.
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<u64, Error> {
        let mut n = io::write_preamble(w, SIGNATURE)?;
        n += io::write_u64(w, self.capacity)?;
        n += io::write_u64(w, self.size())?;
        n += io::write_u64(w, self.retry_limit)?;

        const WORDS_PER_BLOCK: usize = io::BLOCK_SIZE / 4;
        let mut scratch = Vec::with_capacity(WORDS_PER_BLOCK);
        for chunk in self.buf.chunks(WORDS_PER_BLOCK) {
            scratch.clear();
            scratch.extend(chunk.iter().map(|w| w.load(Ordering::Acquire)));
            n += io::write_blocks(w, io::u32s_as_bytes(&scratch))?;
        }
        Ok(n)
    }

    /// Load the vector from a dump produced by
    /// [`write_to`](ConcurrentVector::write_to).
    ///
    /// Grows the buffer when the stored capacity exceeds the current
    /// allocation and adopts the stored capacity, retry limit and count.
    /// Returns the number of bytes read.
    pub fn read_from<R: Read + ?Sized>(&mut self, r: &mut R) -> Result<u64, Error> {
        let mut n = io::read_preamble(r, SIGNATURE)?;
        let capacity = io::read_u64(r)?;
        let size = io::read_u64(r)?;
        let retry_limit = io::read_u64(r)?;
        n += 24;

        let stored = capacity as usize / 32 + 1;
        if stored > self.buf.len() {
            self.buf.resize_with(stored, || AtomicU32::new(0));
        }

        let mut bytes = vec![0u8; stored * 4];
        n += io::read_blocks(r, &mut bytes)?;
        let words = io::bytes_to_u32s(&bytes);
        for (dst, &src) in self.buf.iter_mut().zip(words.iter()) {
            *dst.get_mut() = src;
        }
        for dst in self.buf.iter_mut().skip(words.len()) {
            *dst.get_mut() = 0;
        }

        self.capacity = capacity;
        self.retry_limit = retry_limit;
        self.size.store(size, Ordering::Relaxed);
        Ok(n)
    }

    /// Raw snapshot of word `idx`.
    #[inline]
    pub fn word(&self, idx: usize) -> u32 {
        self.buf[idx].load(Ordering::Acquire)
    }

    fn check_peer(&self, other: &ConcurrentVector) -> Result<(), Error> {
        if self.capacity != other.capacity {
            return Err(Error::NotEqualSize {
                left: self.capacity,
                right: other.capacity,
            });
        }
        Ok(())
    }
}

impl Clone for ConcurrentVector {
    /// Snapshot copy: each word is atomically loaded and stored into the
    /// fresh buffer. Like every multi-word observer, the result is a torn
    /// snapshot under concurrent mutation.
    fn clone(&self) -> Self {
        let mut buf = Vec::with_capacity(self.buf.len());
        buf.extend(
            self.buf
                .iter()
                .map(|w| AtomicU32::new(w.load(Ordering::Acquire))),
        );
        Self {
            buf,
            capacity: self.capacity,
            retry_limit: self.retry_limit,
            size: AtomicU64::new(self.size()),
        }
    }
}

impl BitVector for ConcurrentVector {
    fn set(&mut self, i: u64) -> bool {
        ConcurrentVector::set(self, i)
    }

    fn unset(&mut self, i: u64) -> bool {
        ConcurrentVector::unset(self, i)
    }

    fn xor(&mut self, i: u64) -> bool {
        ConcurrentVector::xor(self, i)
    }

    fn get(&self, i: u64) -> u8 {
        ConcurrentVector::get(self, i)
    }

    fn size(&self) -> u64 {
        ConcurrentVector::size(self)
    }

    fn capacity(&self) -> u64 {
        ConcurrentVector::capacity(self)
    }

    fn popcount(&self) -> u64 {
        ConcurrentVector::popcount(self)
    }

    fn difference(&self, other: &dyn BitVector) -> Result<u64, Error> {
        let other = other.as_any().downcast_ref().ok_or(Error::WrongType)?;
        ConcurrentVector::difference(self, other)
    }

    fn merge(&mut self, other: &dyn BitVector) -> Result<(), Error> {
        let other = other.as_any().downcast_ref().ok_or(Error::WrongType)?;
        ConcurrentVector::merge(self, other)
    }

    fn reset(&mut self) {
        ConcurrentVector::reset(self)
    }

    fn clone_vector(&self) -> Box<dyn BitVector> {
        Box::new(self.clone())
    }

    fn write_to(&self, w: &mut dyn Write) -> Result<u64, Error> {
        ConcurrentVector::write_to(self, w)
    }

    fn read_from(&mut self, r: &mut dyn Read) -> Result<u64, Error> {
        ConcurrentVector::read_from(self, r)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
