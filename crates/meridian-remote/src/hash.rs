//! Two-level SHA-256 content hashing
//!
//! The remote verifies file integrity with a hash computed by splitting
//! content into 4 MiB blocks, taking the SHA-256 of each block, concatenating
//! the block digests in order, and taking the SHA-256 of that concatenation.
//! The result is rendered as 64 lowercase hex characters.

use std::io::{self, Write};

use meridian_core::domain::ContentHash;
use sha2::{Digest, Sha256};

/// Size of each block hashed independently before the final digest.
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Computes the two-level hash of an in-memory byte slice.
pub struct ContentHasher;

impl ContentHasher {
    /// Hashes `data` in 4 MiB blocks and returns the resulting [`ContentHash`].
    pub fn hash(data: &[u8]) -> ContentHash {
        let mut overall = Sha256::new();
        for block in data.chunks(BLOCK_SIZE) {
            let block_digest = Sha256::digest(block);
            overall.update(block_digest);
        }
        let digest = overall.finalize();
        let hex = hex_encode(&digest);
        ContentHash::new(hex).expect("sha256 hex digest is always well-formed")
    }
}

/// Computes the two-level hash incrementally while also forwarding bytes to
/// an inner writer, so a download can be hashed as it streams to disk
/// without buffering the whole file in memory.
pub struct StreamHasher<W> {
    inner: W,
    overall: Sha256,
    block: Sha256,
    block_filled: usize,
}

impl<W: Write> StreamHasher<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            overall: Sha256::new(),
            block: Sha256::new(),
            block_filled: 0,
        }
    }

    /// Finishes hashing, flushing any partial final block, and returns the
    /// inner writer along with the computed [`ContentHash`].
    pub fn finish(mut self) -> io::Result<(W, ContentHash)> {
        if self.block_filled > 0 {
            let digest = std::mem::replace(&mut self.block, Sha256::new()).finalize();
            self.overall.update(digest);
        }
        self.inner.flush()?;
        let digest = self.overall.finalize();
        let hex = hex_encode(&digest);
        let hash = ContentHash::new(hex).expect("sha256 hex digest is always well-formed");
        Ok((self.inner, hash))
    }
}

impl<W: Write> Write for StreamHasher<W> {
    fn write(&mut self, mut buf: &[u8]) -> io::Result<usize> {
        let total = buf.len();
        while !buf.is_empty() {
            let remaining_in_block = BLOCK_SIZE - self.block_filled;
            let take = remaining_in_block.min(buf.len());
            let (chunk, rest) = buf.split_at(take);

            self.block.update(chunk);
            self.block_filled += take;
            self.inner.write_all(chunk)?;

            if self.block_filled == BLOCK_SIZE {
                let digest = std::mem::replace(&mut self.block, Sha256::new()).finalize();
                self.overall.update(digest);
                self.block_filled = 0;
            }

            buf = rest;
        }
        Ok(total)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}
