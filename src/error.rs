//! Error values shared by all vector variants.
//!
//! Structural errors carry enough context to diagnose a bad dump or a
//! mismatched peer; stream errors from `std::io` bubble up verbatim inside
//! [`Error::Io`].

use core::fmt;
use std::io;

/// Errors returned by constructors, set-algebraic operations and the binary
/// dump/load paths.
///
/// Operations that signal failure through their boolean return value
/// (out-of-range `set`, exhausted CAS budget, absent `remove`) never produce
/// an `Error`; the boolean is the whole signal.
#[derive(Debug)]
pub enum Error {
    /// Constructor called with a capacity of zero bits.
    ZeroSize,

    /// Header magic did not match the expected variant signature.
    InvalidSignature {
        /// Signature the variant writes
        expected: u64,
        /// Signature found in the stream
        found: u64,
    },

    /// Header version did not match the supported format version.
    VersionMismatch {
        /// Version the variant supports
        expected: f64,
        /// Version found in the stream
        found: f64,
    },

    /// `difference`/`merge` across vectors of different declared capacity.
    NotEqualSize {
        /// Receiver capacity in bits
        left: u64,
        /// Peer capacity in bits
        right: u64,
    },

    /// `difference`/`merge`/`filter` across different vector variants.
    WrongType,

    /// A sorted-array leaf reached its hard entry cap.
    LeafFull,

    /// Stream error from the underlying reader/writer.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ZeroSize => {
                write!(f, "size must be greater than zero")
            }
            Error::InvalidSignature { expected, found } => {
                write!(
                    f,
                    "invalid vector signature: expected {:#018x}, found {:#018x}",
                    expected, found
                )
            }
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "vector version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::NotEqualSize { left, right } => {
                write!(
                    f,
                    "vectors must have equal size: {} vs {}",
                    left, right
                )
            }
            Error::WrongType => {
                write!(f, "wrong type provided")
            }
            Error::LeafFull => {
                write!(f, "leaf bitmap is full")
            }
            Error::Io(err) => {
                write!(f, "i/o error: {}", err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
