//! Embedding generation for semantic matching
//!
//! The service embeds exercise names, not documents, so the deterministic
//! hash-based embedder below is the default profile. It produces stable,
//! normalized 384-dimensional vectors from word-level hashes: identical
//! names always embed identically, which the resolution idempotence
//! guarantee depends on. A networked sentence-embedding service can slot in
//! behind the same trait without touching the cascade.

use anyhow::Result;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::constants::EMBEDDING_DIM;

/// Trait for embedding generation
pub trait Embedder: Send + Sync {
    /// Generate embedding for text
    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;
}

/// Deterministic hash-based embedder
///
/// Each word contributes a bit pattern derived from its hash; the summed
/// vector is L2-normalized. Word overlap between two names translates into
/// cosine similarity, which is the signal the semantic stage needs.
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIM)
    }
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Embedder for HashEmbedder {
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimension];

        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let hash = hasher.finish();

            // Spread the 64 hash bits across the vector as signed values so
            // distinct words come out near-orthogonal; a second rotated pass
            // decorrelates words that share low bits.
            for j in 0..self.dimension {
                let bit = (hash >> (j % 64)) & 1;
                let rot = (hash.rotate_left((j % 63) as u32 + 1)) & 1;
                let sign = if bit == 1 { 1.0 } else { -1.0 };
                embedding[j] += sign * (0.1 + rot as f32 * 0.05);
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut embedding {
                *val /= norm;
            }
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[test]
    fn test_embedding_is_deterministic() {
        let embedder = HashEmbedder::default();
        let a = embedder.encode("barbell back squat").unwrap();
        let b = embedder.encode("barbell back squat").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_embedding_is_normalized() {
        let embedder = HashEmbedder::default();
        let v = embedder.encode("overhead press").unwrap();
        assert_eq!(v.len(), EMBEDDING_DIM);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_word_overlap_raises_similarity() {
        let embedder = HashEmbedder::default();
        let a = embedder.encode("dumbbell bench press").unwrap();
        let b = embedder.encode("barbell bench press").unwrap();
        let c = embedder.encode("kettlebell swing").unwrap();

        let close = cosine_similarity(&a, &b);
        let far = cosine_similarity(&a, &c);
        assert!(close > far);
    }

    #[test]
    fn test_disjoint_names_are_near_orthogonal() {
        let embedder = HashEmbedder::default();
        let a = embedder.encode("cable chest flye").unwrap();
        let b = embedder.encode("dumbbell flye").unwrap();
        // One shared word out of three and two; far from the accept range
        assert!(cosine_similarity(&a, &b) < 0.6);

        let c = embedder.encode("barbell row").unwrap();
        let d = embedder.encode("walking lunge").unwrap();
        assert!(cosine_similarity(&c, &d).abs() < 0.3);
    }

    #[test]
    fn test_empty_text_embeds_to_zero_vector() {
        let embedder = HashEmbedder::default();
        let v = embedder.encode("").unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }
}
