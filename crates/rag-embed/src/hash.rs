use std::hash::{Hash, Hasher};

use rag_core::traits::Embedder;
use twox_hash::XxHash64;

pub const HASH_DIM: usize = 384;

/// Deterministic bag-of-tokens embedder for tests and offline runs.
///
/// Each whitespace token is hashed into one of `dim` buckets. Texts sharing
/// tokens land close together, which is enough to exercise retrieval
/// without model weights.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
    normalize: bool,
    model_id: String,
}

impl Default for HashEmbedder {
    fn default() -> Self { Self::new(HASH_DIM, true) }
}

impl HashEmbedder {
    pub fn new(dim: usize, normalize: bool) -> Self {
        let dim = dim.max(1);
        Self { dim, normalize, model_id: format!("hash:d{dim}") }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += val + (i % 3) as f32 * 0.01;
        }
        if self.normalize {
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 { v.iter().map(|x| x * x).sum::<f32>().sqrt() }

    #[test]
    fn deterministic_and_unit_length() {
        let e = HashEmbedder::default();
        let a = e.embed_query("solar panel wiring").expect("embed");
        let b = e.embed_query("solar panel wiring").expect("embed");
        assert_eq!(a.len(), HASH_DIM);
        assert_eq!(a, b);
        assert!((norm(&a) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = HashEmbedder::default().embed_query("   ").expect("embed");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn unnormalized_keeps_raw_weights() {
        let raw = HashEmbedder::new(16, false);
        let unit = HashEmbedder::new(16, true);
        let text = "a a a a a a a a b";
        let v = raw.embed_query(text).expect("embed");
        let u = unit.embed_query(text).expect("embed");
        let n = norm(&v);
        assert!((n - 1.0).abs() > 1e-3, "raw vector should not be unit length");
        for (x, y) in v.iter().zip(&u) {
            assert!((x / n - y).abs() < 1e-5);
        }
        assert_eq!(raw.model_id(), "hash:d16");
    }
}
