//! # Embedder BERT — Representações Vetoriais de Mensagens
//!
//! O [`BertEmbedder`] carrega um sentence-transformer com arquitetura BERT
//! (padrão: `sentence-transformers/all-MiniLM-L6-v2`, 384 dimensões) e
//! implementa [`TextEmbedder`] para o resto do pipeline.
//!
//! ```text
//! "I can't sleep at night"   → [0.04, -0.11, 0.09, ...]
//! "insomnia keeps me awake"  → [0.05, -0.10, 0.08, ...]  (próximo)
//! "my boss yelled at me"     → [-0.07, 0.13, -0.02, ...] (distante)
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! Texto → Tokenizer (trunc. 256) → BERT Forward → Mean Pooling → L2 Normalize
//! ```
//!
//! ## Carregamento
//!
//! | Componente | Preferido | Fallback |
//! |-----------|-----------|----------|
//! | Tokenizer | `tokenizer.json` | `vocab.txt` (WordPiece, uncased) |
//! | Pesos | `model.safetensors` | `pytorch_model.bin` |
//! | Device | CPU | — |
//!
//! Os arquivos ficam no cache do HuggingFace (`~/.cache/huggingface/`).

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert;
use hf_hub::api::sync::{Api, ApiRepo};
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::processors::bert::BertProcessing;
use tokenizers::{Tokenizer, TruncationParams};

use super::models::{OracleError, TextEmbedder};

/// Repositório padrão no HuggingFace Hub.
pub const DEFAULT_MODEL_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Mensagens de chat são curtas; acima disso o texto é truncado.
const MAX_TOKENS: usize = 256;

pub struct BertEmbedder {
    model: bert::BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

/// Lote tokenizado e alinhado ao maior item, pronto para o forward.
struct PaddedBatch {
    input_ids: Tensor,
    token_type_ids: Tensor,
    attention_mask: Tensor,
}

fn fetch(repo: &ApiRepo, file: &str) -> Result<PathBuf> {
    repo.get(file)
        .with_context(|| format!("{file} indisponível no repositório"))
}

fn tokenizer_error(e: impl std::fmt::Display) -> anyhow::Error {
    anyhow!("tokenizer: {e}")
}

impl BertEmbedder {
    /// Baixa (ou lê do cache) e instancia o modelo.
    ///
    /// I/O pesado, chamado dentro de `spawn_blocking` no `main.rs`.
    pub fn load(repo_id: &str) -> Result<Self> {
        let device = Device::Cpu;
        tracing::info!(repo = %repo_id, "Carregando embedder do HuggingFace Hub...");

        let repo = Api::new()
            .context("cliente do HuggingFace Hub")?
            .model(repo_id.to_string());

        let config: bert::Config = serde_json::from_str(&std::fs::read_to_string(fetch(
            &repo,
            "config.json",
        )?)?)
        .context("config.json do modelo inválido")?;

        let tokenizer = load_tokenizer(&repo)?;
        let weights = load_weights(&repo, &device)?;
        let model = bert::BertModel::load(weights, &config).context("pesos incompatíveis com BERT")?;

        tracing::info!(repo = %repo_id, device = ?device, "Embedder pronto");
        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    fn pad(&self, texts: &[String]) -> Result<PaddedBatch> {
        let encodings = texts
            .iter()
            .map(|t| self.tokenizer.encode(t.as_str(), true).map_err(tokenizer_error))
            .collect::<Result<Vec<_>>>()?;

        let width = encodings
            .iter()
            .map(|e| e.len())
            .max()
            .unwrap_or(0)
            .max(1);
        let shape = (encodings.len(), width);

        let mut ids = Vec::with_capacity(shape.0 * width);
        let mut mask = Vec::with_capacity(shape.0 * width);
        for enc in &encodings {
            let fill = width - enc.len();
            ids.extend(enc.get_ids().iter().copied().chain(std::iter::repeat(0).take(fill)));
            mask.extend(
                enc.get_attention_mask()
                    .iter()
                    .copied()
                    .chain(std::iter::repeat(0).take(fill)),
            );
        }

        Ok(PaddedBatch {
            input_ids: Tensor::from_vec(ids, shape, &self.device)?,
            token_type_ids: Tensor::zeros(shape, DType::U32, &self.device)?,
            attention_mask: Tensor::from_vec(mask, shape, &self.device)?,
        })
    }

    /// Forward em lote, mean pooling sobre os tokens reais e normalização L2.
    fn forward_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let batch = self.pad(texts)?;

        // [lote, tokens, hidden]
        let hidden = self.model.forward(
            &batch.input_ids,
            &batch.token_type_ids,
            Some(&batch.attention_mask),
        )?;

        let weights = batch
            .attention_mask
            .to_dtype(DType::F32)?
            .unsqueeze(2)?
            .broadcast_as(hidden.shape())?;
        let token_count = weights.sum(1)?.clamp(1e-9, f64::MAX)?;
        let mean = (hidden.mul(&weights)?.sum(1)? / token_count)?;

        let length = mean.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
        let unit = mean.broadcast_div(&length)?;

        Ok(unit.to_vec2()?)
    }
}

/// `tokenizer.json` quando existe; senão WordPiece uncased a partir de `vocab.txt`.
fn load_tokenizer(repo: &ApiRepo) -> Result<Tokenizer> {
    let mut tokenizer = match repo.get("tokenizer.json") {
        Ok(path) => Tokenizer::from_file(&path).map_err(tokenizer_error)?,
        Err(_) => {
            tracing::info!("tokenizer.json indisponível, montando WordPiece de vocab.txt");
            wordpiece_from_vocab(&fetch(repo, "vocab.txt")?)?
        }
    };
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_TOKENS,
            ..Default::default()
        }))
        .map_err(tokenizer_error)?;
    // o lote é alinhado em `pad`
    tokenizer.with_padding(None);
    Ok(tokenizer)
}

fn wordpiece_from_vocab(vocab: &Path) -> Result<Tokenizer> {
    let vocab = vocab
        .to_str()
        .ok_or_else(|| anyhow!("caminho de vocab.txt não é UTF-8"))?;
    let model = WordPiece::from_file(vocab)
        .unk_token("[UNK]".into())
        .build()
        .map_err(tokenizer_error)?;

    let mut tokenizer = Tokenizer::new(model);
    tokenizer
        .with_normalizer(Some(BertNormalizer::new(true, true, None, true)))
        .with_pre_tokenizer(Some(BertPreTokenizer))
        .with_post_processor(Some(BertProcessing::new(
            ("[SEP]".into(), 102),
            ("[CLS]".into(), 101),
        )));
    Ok(tokenizer)
}

/// Safetensors mapeado em memória; `pytorch_model.bin` como alternativa.
fn load_weights(repo: &ApiRepo, device: &Device) -> Result<VarBuilder<'static>> {
    if let Ok(path) = repo.get("model.safetensors") {
        // SAFETY: o arquivo do cache não é alterado enquanto o mmap vive.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device)? };
        return Ok(vb);
    }
    tracing::info!("Sem safetensors, usando pytorch_model.bin");
    Ok(VarBuilder::from_pth(fetch(repo, "pytorch_model.bin")?, DType::F32, device)?)
}

impl TextEmbedder for BertEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, OracleError> {
        let mut batch = self.forward_batch(&[text.to_string()])?;
        batch
            .pop()
            .ok_or_else(|| OracleError::Model("embedding vazio".into()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OracleError> {
        Ok(self.forward_batch(texts)?)
    }
}
