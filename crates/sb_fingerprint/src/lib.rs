//! MinHash content fingerprints.
//!
//! A signature is a fixed-length vector of 32-bit hashes computed over the
//! character n-grams ("shingles") of a piece of text. Two signatures'
//! Jaccard similarity is estimated by the fraction of positions at which
//! they agree -- the standard MinHash estimator.

use std::fmt;

/// Number of character n-grams ("shingles") a window spans. Trigrams are a
/// reasonable default for natural-language and source-code text: long
/// enough to be discriminating, short enough that short inputs still
/// produce several shingles.
pub const SHINGLE_SIZE: usize = 3;

/// Number of independent hash permutations in a signature. Longer
/// signatures estimate Jaccard similarity more precisely at the cost of
/// more storage; 64 is a common middle ground.
pub const NUM_HASHES: usize = 64;

/// Bytes per signature: one `u32` (4 bytes) per hash.
pub const SIGNATURE_BYTES: usize = NUM_HASHES * 4;

#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("signature must be exactly {SIGNATURE_BYTES} bytes, got {0}")]
    WrongLength(usize),
}

/// A MinHash signature over a piece of text's character n-grams.
#[derive(Clone, PartialEq, Eq)]
pub struct MinHashSignature {
    hashes: [u32; NUM_HASHES],
}

impl fmt::Debug for MinHashSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinHashSignature")
            .field("hashes", &&self.hashes[..4])
            .field("len", &NUM_HASHES)
            .finish()
    }
}

impl MinHashSignature {
    /// Compute the signature of `text`.
    ///
    /// Shingles are overlapping windows of [`SHINGLE_SIZE`] characters. A
    /// string shorter than the shingle size is treated as a single shingle
    /// (itself), so even very short inputs fingerprint deterministically
    /// rather than producing an empty signature.
    pub fn from_text(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let shingles = shingles(&chars);

        let mut hashes = [u32::MAX; NUM_HASHES];
        for shingle in &shingles {
            let base = base_hash(shingle);
            for (i, slot) in hashes.iter_mut().enumerate() {
                let permuted = permute(base, i as u64);
                if permuted < *slot {
                    *slot = permuted;
                }
            }
        }

        Self { hashes }
    }

    /// Estimate the Jaccard similarity between two signatures as the
    /// fraction of positions at which their minimum hashes agree. Result is
    /// always in `[0, 1]`.
    pub fn estimate_jaccard_similarity(&self, other: &Self) -> f64 {
        let agree = self
            .hashes
            .iter()
            .zip(other.hashes.iter())
            .filter(|(a, b)| a == b)
            .count();
        agree as f64 / NUM_HASHES as f64
    }

    /// Serialize to a fixed-length big-endian byte string.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SIGNATURE_BYTES);
        for h in &self.hashes {
            out.extend_from_slice(&h.to_be_bytes());
        }
        out
    }

    /// Deserialize from a byte string previously produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FingerprintError> {
        if bytes.len() != SIGNATURE_BYTES {
            return Err(FingerprintError::WrongLength(bytes.len()));
        }
        let mut hashes = [0u32; NUM_HASHES];
        for (i, chunk) in bytes.chunks_exact(4).enumerate() {
            hashes[i] = u32::from_be_bytes(chunk.try_into().unwrap());
        }
        Ok(Self { hashes })
    }
}

fn shingles(chars: &[char]) -> Vec<String> {
    if chars.len() <= SHINGLE_SIZE {
        return vec![chars.iter().collect()];
    }
    chars
        .windows(SHINGLE_SIZE)
        .map(|w| w.iter().collect())
        .collect()
}

/// Base 32-bit hash of a shingle, derived from a cryptographic hash so
/// distinct shingles are (for practical purposes) collision-free.
fn base_hash(shingle: &str) -> u32 {
    let digest = blake3::hash(shingle.as_bytes());
    let bytes = digest.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Permute `base` with the `i`-th independent linear hash function
/// (`a_i * base + b_i mod 2^32`), approximating `i` independent random
/// hash functions from a single base hash -- the standard MinHash trick
/// for avoiding `NUM_HASHES` separate digest computations per shingle.
fn permute(base: u32, i: u64) -> u32 {
    let a = (2 * i + 1).wrapping_mul(2654435761) as u32 | 1;
    let b = (i.wrapping_mul(40503) as u32).wrapping_add(12345);
    a.wrapping_mul(base).wrapping_add(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_has_similarity_one() {
        let a = MinHashSignature::from_text("the quick brown fox jumps over the lazy dog");
        let b = MinHashSignature::from_text("the quick brown fox jumps over the lazy dog");
        assert_eq!(a, b);
        assert_eq!(a.estimate_jaccard_similarity(&b), 1.0);
    }

    #[test]
    fn unrelated_text_has_low_similarity() {
        let a = MinHashSignature::from_text("async rust patterns for worker pools");
        let b = MinHashSignature::from_text("xkcd quokka banana spreadsheet formula 42");
        assert!(a.estimate_jaccard_similarity(&b) < 0.5);
    }

    #[test]
    fn near_duplicate_scores_higher_than_unrelated() {
        let original = MinHashSignature::from_text("the quick brown fox jumps over the lazy dog");
        let near_dup =
            MinHashSignature::from_text("the quick brown fox jumps over the lazy dog!");
        let unrelated = MinHashSignature::from_text("a completely different sentence entirely");

        let near_sim = original.estimate_jaccard_similarity(&near_dup);
        let far_sim = original.estimate_jaccard_similarity(&unrelated);
        assert!(near_sim > far_sim);
        assert!(near_sim > 0.8);
    }

    #[test]
    fn byte_round_trip() {
        let sig = MinHashSignature::from_text("round trip me");
        let bytes = sig.to_bytes();
        assert_eq!(bytes.len(), SIGNATURE_BYTES);
        let restored = MinHashSignature::from_bytes(&bytes).unwrap();
        assert_eq!(sig, restored);
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        let err = MinHashSignature::from_bytes(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, FingerprintError::WrongLength(4)));
    }

    #[test]
    fn short_strings_do_not_panic() {
        let a = MinHashSignature::from_text("");
        let b = MinHashSignature::from_text("hi");
        let _ = a.estimate_jaccard_similarity(&b);
    }
}
