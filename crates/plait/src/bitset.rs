//! Fixed-capacity bitset over operation ids.
//!
//! The checker memoizes on the exact set of linearized ids, so bitsets are
//! stored in full and compared elementwise on cache lookup; the hash is only
//! used to pick a bucket. A fingerprint-only representation would conflate
//! distinct accepted sets on hash collision.

use std::hash::Hasher;

use smallvec::{smallvec, SmallVec};

const WORD_BITS: usize = 64;

/// Set of operation ids in `[0, n)`, `n` fixed at construction.
///
/// Histories with up to 256 operations per partition fit in the inline
/// buffer; larger partitions spill to the heap.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Bitset {
    words: SmallVec<[u64; 4]>,
}

impl Bitset {
    /// Create an empty set with capacity for `bits` ids.
    pub fn new(bits: usize) -> Self {
        Self {
            words: smallvec![0u64; bits.div_ceil(WORD_BITS)],
        }
    }

    #[inline]
    fn index(pos: usize) -> (usize, usize) {
        (pos / WORD_BITS, pos % WORD_BITS)
    }

    /// Add `pos` to the set. `pos` must be below the construction capacity.
    #[inline]
    pub fn set(&mut self, pos: usize) {
        let (major, minor) = Self::index(pos);
        self.words[major] |= 1 << minor;
    }

    /// Remove `pos` from the set.
    #[inline]
    pub fn clear(&mut self, pos: usize) {
        let (major, minor) = Self::index(pos);
        self.words[major] &= !(1 << minor);
    }

    /// Test membership of `pos`.
    #[inline]
    pub fn get(&self, pos: usize) -> bool {
        let (major, minor) = Self::index(pos);
        self.words[major] & (1 << minor) != 0
    }

    /// Stable 64-bit hash of the word array. Agrees with `Eq`: equal sets
    /// hash equally. Deterministic within a process, which is all the
    /// memoization cache needs.
    pub fn hash(&self) -> u64 {
        let mut hasher = ahash::AHasher::default();
        for &word in &self.words {
            hasher.write_u64(word);
        }
        hasher.finish()
    }
}

impl std::fmt::Debug for Bitset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bitset{{")?;
        let mut first = true;
        for pos in 0..self.words.len() * WORD_BITS {
            if self.get(pos) {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}", pos)?;
                first = false;
            }
        }
        write!(f, "}}")
    }
}
