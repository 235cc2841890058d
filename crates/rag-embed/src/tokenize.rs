use anyhow::{anyhow, bail, Result};
use candle_core::{Device, Tensor};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Configure `tokenizer` to pad each batch to its longest member and to cut
/// inputs at `max_len` tokens.
pub fn configure(tokenizer: &mut Tokenizer, max_len: usize) -> Result<()> {
    let pad_token = "[PAD]".to_string();
    let pad_id = tokenizer.token_to_id(&pad_token).unwrap_or(0);
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        pad_id,
        pad_token,
        ..PaddingParams::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: max_len, ..TruncationParams::default() }))
        .map_err(|e| anyhow!("failed to configure truncation: {e}"))?;
    Ok(())
}

/// Encode `texts` into `(input_ids, attention_mask)`, both `[B, T]` `u32`.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], device: &Device) -> Result<(Tensor, Tensor)> {
    if texts.is_empty() {
        bail!("cannot tokenize an empty batch");
    }
    let encodings = tokenizer
        .encode_batch(texts.iter().map(String::as_str).collect::<Vec<_>>(), true)
        .map_err(|e| anyhow!("tokenization failed: {e}"))?;

    let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());
    let mut ids = Vec::with_capacity(texts.len() * seq_len);
    let mut mask = Vec::with_capacity(texts.len() * seq_len);
    for (i, enc) in encodings.iter().enumerate() {
        if enc.get_ids().len() != seq_len {
            bail!("sequence {i} has length {}, expected {seq_len}", enc.get_ids().len());
        }
        ids.extend_from_slice(enc.get_ids());
        mask.extend_from_slice(enc.get_attention_mask());
    }
    let input_ids = Tensor::from_vec(ids, (texts.len(), seq_len), device)?;
    let attention_mask = Tensor::from_vec(mask, (texts.len(), seq_len), device)?;
    Ok((input_ids, attention_mask))
}
