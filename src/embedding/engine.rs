// Embedding engine - local sentence embeddings via all-MiniLM-L6-v2
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::errors::ClinicalError;
use crate::providers::EmbeddingProvider;

pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

const MAX_SEQUENCE_LEN: usize = 256;

#[derive(serde::Deserialize)]
struct HiddenSize {
    hidden_size: usize,
}

/// BERT sentence embedder running on Candle.
///
/// Loaded once per process and shared behind an `Arc`; nothing is mutated
/// after construction, so concurrent `embed` calls are safe.
pub struct EmbeddingEngine {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl EmbeddingEngine {
    /// Load the model, downloading it from the HuggingFace Hub on first use
    pub fn new(model_id: &str) -> Result<Self> {
        let device = Device::Cpu;
        info!(model = model_id, "loading embedding model");

        let api = Api::new().context("Failed to create HuggingFace API client")?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo.get("config.json")
            .context("Failed to download model config")?;
        let tokenizer_path = repo.get("tokenizer.json")
            .context("Failed to download tokenizer")?;
        let weights_path = repo.get("model.safetensors")
            .context("Failed to download model weights")?;

        let config_contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;
        let config: Config = serde_json::from_str(&config_contents)
            .context("Failed to parse model config")?;
        let HiddenSize { hidden_size } = serde_json::from_str(&config_contents)
            .context("Model config has no hidden_size")?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .context("Failed to load model weights")?
        };

        let model = BertModel::load(vb, &config)
            .context("Failed to create BERT model")?;

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension: hidden_size,
        })
    }

    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self.tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
        let batch_size = texts.len();

        let mut flat_ids = vec![0u32; batch_size * max_len];
        let mut flat_mask = vec![0u32; batch_size * max_len];

        for (row, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let offset = row * max_len;
            flat_ids[offset..offset + ids.len()].copy_from_slice(ids);
            flat_mask[offset..offset + mask.len()].copy_from_slice(mask);
        }

        let token_ids = Tensor::from_vec(flat_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(flat_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids = token_ids.zeros_like()?;

        let hidden = self.model.forward(&token_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = Self::mean_pool(&hidden, &attention_mask)?;
        let normalized = Self::l2_normalize(&pooled)?;

        debug!(batch_size, max_len, "encoded batch");
        Ok(normalized.to_vec2::<f32>()?)
    }

    /// Mean pooling with attention mask
    fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let mask_expanded = attention_mask
            .unsqueeze(2)?
            .expand(embeddings.shape())?
            .to_dtype(embeddings.dtype())?;

        let sum_embeddings = (embeddings * &mask_expanded)?.sum(1)?;
        let sum_mask = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;

        Ok(sum_embeddings.broadcast_div(&sum_mask)?)
    }

    fn l2_normalize(embeddings: &Tensor) -> Result<Tensor> {
        let norms = embeddings.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
        Ok(embeddings.broadcast_div(&norms)?)
    }
}

impl EmbeddingProvider for EmbeddingEngine {
    fn embed(&self, text: &str) -> crate::errors::Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| ClinicalError::embedding("model returned no embedding"))
    }

    fn embed_batch(&self, texts: &[&str]) -> crate::errors::Result<Vec<Vec<f32>>> {
        self.encode(texts)
            .map_err(|e| ClinicalError::embedding(format!("{:#}", e)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_embedding_dimension() {
        let engine = EmbeddingEngine::new(DEFAULT_MODEL_ID).expect("Failed to create engine");
        assert_eq!(engine.dimension(), DEFAULT_EMBEDDING_DIM);
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_embed_is_unit_length() {
        let engine = EmbeddingEngine::new(DEFAULT_MODEL_ID).expect("Failed to create engine");
        let embedding = engine.embed("chest pain radiating to the jaw").expect("Failed to embed");
        assert_eq!(embedding.len(), DEFAULT_EMBEDDING_DIM);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_embed_is_deterministic() {
        let engine = EmbeddingEngine::new(DEFAULT_MODEL_ID).expect("Failed to create engine");
        let a = engine.embed("dysuria in pregnancy").unwrap();
        let b = engine.embed("dysuria in pregnancy").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_embed_empty_batch() {
        let engine = EmbeddingEngine::new(DEFAULT_MODEL_ID).expect("Failed to create engine");
        let embeddings = engine.embed_batch(&[]).expect("Failed to embed empty batch");
        assert!(embeddings.is_empty());
    }
}
