//! # Sentence embeddings
//!
//! Text → vector, using a BERT sentence-transformer (all-MiniLM-L6-v2 by default)
//! run on the CPU with Candle. Weights, tokenizer and config come from the Hugging
//! Face Hub cache and are downloaded on first use.
//!
//! Loading the model is the most expensive thing docvec does, so callers go through
//! [`LazyEmbedder`], which loads it the first time a vector is actually requested
//! and never for actions that only read or write the store.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use once_cell::unsync::OnceCell;
use std::error::Error;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

/// Longest input, in tokens, the model sees; the rest is truncated.
pub const MAX_SEQUENCE_TOKENS: usize = 256;

/// Anything that can turn text into a vector.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error>>;
}

/// Sentence embeddings model using Candle (pure Rust)
pub struct SentenceEmbeddingsModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl SentenceEmbeddingsModel {
    /// Load `model_id` at `revision` from the Hugging Face Hub.
    pub fn load(model_id: &str, revision: &str) -> Result<Self, Box<dyn Error>> {
        let device = Device::Cpu;
        info!("Loading embedding model {}@{}", model_id, revision);

        let repo = Repo::with_revision(model_id.to_string(), RepoType::Model, revision.to_string());
        let api = Api::new()?;
        let api_repo = api.repo(repo);

        let config_filename = api_repo.get("config.json")?;
        let tokenizer_filename = api_repo.get("tokenizer.json")?;
        let weights_filename = api_repo.get("model.safetensors")?;

        let config = std::fs::read_to_string(config_filename)?;
        let config: Config = serde_json::from_str(&config)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| format!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_padding(None)
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| format!("Failed to configure tokenizer: {}", e))?;

        // SAFETY: the safetensors file lives in the hub cache and is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_filename], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;
        debug!("Embedding model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    /// Encode text into a unit-length embedding.
    pub fn encode(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error>> {
        let tokens = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| format!("Tokenization error: {}", e))?;

        let token_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(tokens.get_type_ids(), &self.device)?.unsqueeze(0)?;

        let output = self.model.forward(&token_ids, &token_type_ids, None)?;
        let embedding = self.mean_pooling(&output, tokens.get_attention_mask())?;
        let embedding = self.normalize(&embedding)?;

        Ok(embedding.to_vec1::<f32>()?)
    }

    /// Mean pooling over token embeddings, considering attention mask
    fn mean_pooling(
        &self,
        embeddings: &Tensor,
        attention_mask: &[u32],
    ) -> Result<Tensor, Box<dyn Error>> {
        // embeddings: [1, seq_len, hidden]; mask becomes [1, seq_len, 1] to broadcast.
        let mask = Tensor::new(attention_mask, &self.device)?
            .to_dtype(DType::F32)?
            .unsqueeze(0)?
            .unsqueeze(2)?;

        let sum = embeddings.broadcast_mul(&mask)?.sum(1)?;
        let count = mask.sum(1)?.clamp(1f32, f32::INFINITY)?;

        Ok(sum.broadcast_div(&count)?.squeeze(0)?)
    }

    /// L2 normalize the embedding vector
    fn normalize(&self, tensor: &Tensor) -> Result<Tensor, Box<dyn Error>> {
        let norm = tensor
            .sqr()?
            .sum_all()?
            .sqrt()?
            .clamp(f32::EPSILON, f32::INFINITY)?;
        Ok(tensor.broadcast_div(&norm)?)
    }
}

impl Embedder for SentenceEmbeddingsModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error>> {
        self.encode(text)
    }
}

/// An [`Embedder`] that loads its model on first use.
pub struct LazyEmbedder {
    model_id: String,
    revision: String,
    model: OnceCell<SentenceEmbeddingsModel>,
}

impl LazyEmbedder {
    pub fn new(model_id: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            revision: revision.into(),
            model: OnceCell::new(),
        }
    }

    /// Whether the model has been loaded yet.
    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }
}

impl Embedder for LazyEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error>> {
        let model = self
            .model
            .get_or_try_init(|| SentenceEmbeddingsModel::load(&self.model_id, &self.revision))?;
        model.encode(text)
    }
}
