//! Binary container helpers shared by the dump/load paths.
//!
//! Every variant writes a self-describing container: an 8-byte signature,
//! the format version as the bits of an IEEE-754 f64, a handful of u64
//! header fields, then the payload. All integers are little-endian. Bulk
//! payloads move through `bytemuck` slice casts in blocks of
//! [`BLOCK_SIZE`] bytes.

use std::io::{Read, Write};

use crate::error::Error;

/// Format version shared by every container; stored as `f64::to_bits`.
pub(crate) const VERSION: f64 = 1.0;

/// Payloads are written in blocks of this many bytes.
pub(crate) const BLOCK_SIZE: usize = 4096;

#[inline]
pub(crate) fn write_u64<W: Write + ?Sized>(w: &mut W, v: u64) -> Result<u64, Error> {
    w.write_all(&v.to_le_bytes())?;
    Ok(8)
}

#[inline]
pub(crate) fn read_u64<R: Read + ?Sized>(r: &mut R) -> Result<u64, Error> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Write the signature + version preamble common to every container.
pub(crate) fn write_preamble<W: Write + ?Sized>(w: &mut W, signature: u64) -> Result<u64, Error> {
    let mut n = write_u64(w, signature)?;
    n += write_u64(w, VERSION.to_bits())?;
    Ok(n)
}

/// Read and validate the signature + version preamble.
pub(crate) fn read_preamble<R: Read + ?Sized>(r: &mut R, signature: u64) -> Result<u64, Error> {
    let found = read_u64(r)?;
    if found != signature {
        return Err(Error::InvalidSignature {
            expected: signature,
            found,
        });
    }
    let version = f64::from_bits(read_u64(r)?);
    if version != VERSION {
        return Err(Error::VersionMismatch {
            expected: VERSION,
            found: version,
        });
    }
    Ok(16)
}

/// Write a payload in [`BLOCK_SIZE`]-byte blocks.
pub(crate) fn write_blocks<W: Write + ?Sized>(w: &mut W, bytes: &[u8]) -> Result<u64, Error> {
    for block in bytes.chunks(BLOCK_SIZE) {
        w.write_all(block)?;
    }
    Ok(bytes.len() as u64)
}

/// Read exactly `bytes.len()` payload bytes.
///
/// End-of-stream after the last declared byte is clean EOF; a short read
/// inside the payload surfaces as `Error::Io(UnexpectedEof)`.
pub(crate) fn read_blocks<R: Read + ?Sized>(r: &mut R, bytes: &mut [u8]) -> Result<u64, Error> {
    r.read_exact(bytes)?;
    Ok(bytes.len() as u64)
}

/// View a u32 word buffer as raw bytes.
#[inline]
pub(crate) fn u32s_as_bytes(words: &[u32]) -> &[u8] {
    bytemuck::cast_slice(words)
}

/// View a u64 word buffer as raw bytes.
#[inline]
pub(crate) fn u64s_as_bytes(words: &[u64]) -> &[u8] {
    bytemuck::cast_slice(words)
}

/// Rebuild a u32 word buffer from raw bytes, alignment-safe.
#[inline]
pub(crate) fn bytes_to_u32s(bytes: &[u8]) -> Vec<u32> {
    bytemuck::pod_collect_to_vec(bytes)
}

/// Rebuild a u64 word buffer from raw bytes, alignment-safe.
#[inline]
pub(crate) fn bytes_to_u64s(bytes: &[u8]) -> Vec<u64> {
    bytemuck::pod_collect_to_vec(bytes)
}
