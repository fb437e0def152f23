// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Encoded page buffers — moved to a single consumer, or shared read-only when
// a large buffer has several readers (the worker and the digest).

use bytes::Bytes;
use sha2::{Digest, Sha256};

/// Encoded bytes of one page on their way to a worker.
#[derive(Debug, Clone)]
pub enum PageBuffer {
    /// Sole ownership; moving the buffer moves the allocation.
    Owned(Vec<u8>),
    /// Reference-counted; clones share one allocation.
    Shared(Bytes),
}

impl PageBuffer {
    /// Share when the buffer has at least two readers and is at least
    /// `threshold` bytes; otherwise keep it owned.
    pub fn prepare(bytes: Vec<u8>, consumers: usize, threshold: usize) -> Self {
        if consumers >= 2 && bytes.len() >= threshold {
            Self::Shared(Bytes::from(bytes))
        } else {
            Self::Owned(bytes)
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Owned(v) => v,
            Self::Shared(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }

    /// Another handle onto a shared buffer. `None` for owned buffers, which
    /// are never duplicated implicitly.
    pub fn share(&self) -> Option<Self> {
        match self {
            Self::Shared(b) => Some(Self::Shared(b.clone())),
            Self::Owned(_) => None,
        }
    }
}

impl AsRef<[u8]> for PageBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// SHA-256 of `data` as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
