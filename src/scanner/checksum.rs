//! Cheap 64-bit file signature.
//!
//! A [`Signature`] is a rolling CRC-like register plus a rotating additive sum,
//! computed over at most [`SIGNATURE_BYTES`] of a file and then salted with
//! the file size. Equal signatures only suggest equal content; the action
//! engine always compares full contents before touching anything.

use std::fmt;
use std::path::Path;

use crate::platform::{FileId, FileSystem};

use super::{read_full, ScanError};

/// Number of leading bytes that feed the signature.
pub const SIGNATURE_BYTES: usize = 32768;

/// Two-word signature, ordered register first then sum.
///
/// The derived ordering matches a byte-wise comparison of the two words laid
/// out big-endian, which is the order of the duplicate index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signature {
    /// Rolling register.
    pub crc: u32,
    /// Rotating additive sum.
    pub sum: u32,
}

impl Signature {
    /// Build a signature from raw words.
    #[must_use]
    pub const fn new(crc: u32, sum: u32) -> Self {
        Self { crc, sum }
    }

    /// Reinterpret a file identity as a signature (high word, low word).
    #[must_use]
    pub const fn from_identity(id: &FileId) -> Self {
        Self {
            crc: id.high(),
            sum: id.low(),
        }
    }

    /// Feed bytes into the accumulator.
    pub fn update(&mut self, data: &[u8]) {
        let mut reg = self.crc;
        let mut sum = self.sum;
        for &byte in data {
            let b = u32::from(byte);
            reg ^= b;
            sum = sum.wrapping_add(b);
            reg = (reg >> 8) ^ ((reg & 0xff) << 24) ^ ((reg & 0xff) << 9);
            sum = sum.rotate_left(1);
        }
        self.crc = reg;
        self.sum = sum;
    }

    /// Salt the sum with the total file size.
    #[must_use]
    pub fn with_size(self, size: u64) -> Self {
        Self {
            crc: self.crc,
            sum: self.sum.wrapping_add(size as u32),
        }
    }

    /// Signature of an in-memory buffer, as if it were a whole file.
    #[must_use]
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut sig = Self::default();
        sig.update(&data[..data.len().min(SIGNATURE_BYTES)]);
        sig.with_size(data.len() as u64)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}{:08x}", self.crc, self.sum)
    }
}

/// Compute the signature of a file whose size is already known.
///
/// Reads at most [`SIGNATURE_BYTES`]. A zero-length file is never opened.
///
/// # Errors
///
/// Returns [`ScanError`] if the file cannot be opened or yields fewer bytes
/// than its size promised.
pub fn file_signature<F: FileSystem>(
    fs: &F,
    path: &Path,
    size: u64,
) -> Result<Signature, ScanError> {
    if size == 0 {
        return Ok(Signature::default());
    }

    let expected = usize::try_from(size).map_or(SIGNATURE_BYTES, |s| s.min(SIGNATURE_BYTES));
    let mut reader = fs.open(path).map_err(|e| ScanError::from_io(path, e))?;
    let mut buffer = vec![0u8; expected];
    let read = read_full(&mut reader, &mut buffer).map_err(|e| ScanError::from_io(path, e))?;
    if read != expected {
        return Err(ScanError::ShortRead {
            path: path.to_path_buf(),
            expected: expected as u64,
            actual: read as u64,
        });
    }

    let mut signature = Signature::default();
    signature.update(&buffer);
    log::trace!("Signature {} for {}", signature, path.display());
    Ok(signature.with_size(size))
}
