/// Maps text to fixed-dimensionality vectors.
///
/// Implementations that normalize their output return unit-length vectors, so
/// cosine similarity and dot product agree downstream.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the underlying model, e.g. `hash:d384`.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for query"))
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn model_id(&self) -> &str { (**self).model_id() }
    fn dim(&self) -> usize { (**self).dim() }
    fn max_len(&self) -> usize { (**self).max_len() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> { (**self).embed_batch(texts) }
}

impl<E: Embedder + ?Sized> Embedder for std::sync::Arc<E> {
    fn model_id(&self) -> &str { (**self).model_id() }
    fn dim(&self) -> usize { (**self).dim() }
    fn max_len(&self) -> usize { (**self).max_len() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> { (**self).embed_batch(texts) }
}
