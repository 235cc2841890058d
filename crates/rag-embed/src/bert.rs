use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

use rag_core::traits::Embedder;

use crate::device::{select_device, DeviceSpec};
use crate::pool::masked_mean;
use crate::tokenize::{configure, tokenize_batch};
use crate::EmbeddingConfig;

/// Longest input fed to the encoder, in tokens.
pub const MAX_SEQ_LEN: usize = 256;
/// Texts per forward pass.
pub const BATCH_SIZE: usize = 32;

/// Paths of the files a BERT sentence encoder needs.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    /// Use a local model directory.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let weights = ["model.safetensors", "pytorch_model.bin"]
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
            .ok_or_else(|| anyhow!("no model.safetensors or pytorch_model.bin in {}", dir.display()))?;
        Ok(Self { config: dir.join("config.json"), tokenizer: dir.join("tokenizer.json"), weights })
    }

    /// Fetch from the HuggingFace hub, or reuse the local hub cache.
    pub fn from_hub(repo_id: &str, cache_folder: Option<&Path>) -> Result<Self> {
        let mut builder = hf_hub::api::sync::ApiBuilder::new().with_progress(false);
        if let Some(dir) = cache_folder {
            builder = builder.with_cache_dir(dir.to_path_buf());
        }
        let api = builder.build().context("failed to initialize HuggingFace API")?;
        let repo = api.model(repo_id.to_string());
        let config = repo.get("config.json").with_context(|| format!("failed to fetch config.json for {repo_id}"))?;
        let tokenizer = repo
            .get("tokenizer.json")
            .with_context(|| format!("failed to fetch tokenizer.json for {repo_id}"))?;
        let weights = match repo.get("model.safetensors") {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!("model.safetensors unavailable for {repo_id} ({e}); trying pytorch_model.bin");
                repo.get("pytorch_model.bin").with_context(|| format!("failed to fetch weights for {repo_id}"))?
            }
        };
        Ok(Self { config, tokenizer, weights })
    }
}

/// Sentence encoder: BERT forward pass plus masked mean pooling.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
    normalize: bool,
}

impl BertEmbedder {
    pub fn load(cfg: &EmbeddingConfig) -> Result<Self> {
        let device = select_device(DeviceSpec::parse(&cfg.device)?)?;
        let local = Path::new(&cfg.model_name);
        let files = if local.is_dir() {
            ModelFiles::from_dir(local)?
        } else {
            ModelFiles::from_hub(&cfg.model_name, cfg.cache_folder.as_deref())?
        };
        tracing::info!(model = %cfg.model_name, device = ?device, "loading sentence encoder");
        Self::from_files(&cfg.model_name, &files, device, cfg.normalize_embeddings)
    }

    pub fn from_files(model_id: &str, files: &ModelFiles, device: Device, normalize: bool) -> Result<Self> {
        let config_text = std::fs::read_to_string(&files.config)
            .with_context(|| format!("failed to read {}", files.config.display()))?;
        let config: Config = serde_json::from_str(&config_text).context("failed to parse config.json")?;

        let max_len = config.max_position_embeddings.min(MAX_SEQ_LEN);
        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", files.tokenizer.display()))?;
        configure(&mut tokenizer, max_len)?;

        let weights = load_weights(&files.weights, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config).context("failed to build BERT model from weights")?;
        tracing::info!(dim = config.hidden_size, layers = config.num_hidden_layers, max_len, "sentence encoder ready");

        Ok(Self {
            model,
            tokenizer,
            device,
            model_id: model_id.to_string(),
            dim: config.hidden_size,
            max_len,
            normalize,
        })
    }

    pub fn device(&self) -> &Device { &self.device }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .context("BERT forward pass failed")?;
        let pooled = masked_mean(&hidden, &attention_mask, self.normalize)?;
        Ok(pooled.to_dtype(DType::F32)?.to_device(&Device::Cpu)?.to_vec2::<f32>()?)
    }
}

fn load_weights(path: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let is_safetensors = path.extension().is_some_and(|ext| ext == "safetensors");
    if is_safetensors {
        return candle_core::safetensors::load(path, device)
            .with_context(|| format!("failed to load {}", path.display()));
    }
    let tensors = candle_core::pickle::read_all(path).with_context(|| format!("failed to load {}", path.display()))?;
    tensors
        .into_iter()
        .map(|(name, t)| -> Result<(String, Tensor)> { Ok((name, t.to_device(device)?)) })
        .collect()
}

impl Embedder for BertEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            out.extend(self.embed_chunk(chunk)?);
        }
        Ok(out)
    }
}
