use anyhow::{bail, Result};
use candle_core::{DType, Tensor};

/// Mean of `hidden` (`[B, T, H]`) over the positions where `attention_mask`
/// (`[B, T]`) is non-zero, optionally L2-normalized. Returns `[B, H]`.
pub fn masked_mean(hidden: &Tensor, attention_mask: &Tensor, normalize: bool) -> Result<Tensor> {
    let (batch, _tokens, hidden_dim) = match hidden.dims() {
        &[b, t, h] => (b, t, h),
        dims => bail!("hidden states must be [B, T, H], got {dims:?}"),
    };

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_3d = mask.unsqueeze(2)?.broadcast_as(hidden.shape())?;
    let sum = (hidden * &mask_3d)?.sum(1)?;
    let lengths = mask.sum(1)?.unsqueeze(1)?.clamp(1e-9f32, f32::MAX)?.to_dtype(sum.dtype())?;
    let mean = sum.broadcast_div(&lengths)?;
    let pooled = if normalize { l2_normalize(&mean)? } else { mean };

    if pooled.dims() != [batch, hidden_dim] {
        bail!("pooled shape {:?}, expected [{batch}, {hidden_dim}]", pooled.dims());
    }
    Ok(pooled)
}

/// Row-wise L2 normalization of a `[B, H]` tensor.
pub fn l2_normalize(x: &Tensor) -> Result<Tensor> {
    let eps_val = match x.dtype() { DType::F16 | DType::BF16 => 1e-6f32, _ => 1e-12f32 };
    let eps = Tensor::new(&[eps_val], x.device())?.to_dtype(x.dtype())?.unsqueeze(0)?;
    let norm = x.sqr()?.sum_keepdim(1)?.sqrt()?.broadcast_add(&eps)?;
    Ok(x.broadcast_div(&norm)?)
}
