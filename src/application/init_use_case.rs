// ============================================================
// Layer 2 — InitUseCase
// ============================================================
// Produces a loadable starting point for the model:
//
//   Step 1: Resolve HgnConfig   (JSON file, or CLI flags)
//   Step 2: Build the model     (Layer 5 - ml)
//   Step 3: Save config + checkpoint 0   (Layer 6 - infra)
//
// `predict` can run against the result straight away; a
// training run elsewhere would overwrite it with later epochs.

use anyhow::{Context, Result};
use burn::prelude::*;

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::encoder::EncoderConfig;
use crate::ml::inferencer::InferBackend;
use crate::ml::model::{HgnConfig, HgnModel};

#[derive(Debug, Clone)]
pub struct InitConfig {
    pub checkpoint_dir:    String,
    /// An existing hgn_config.json; overrides every flag below
    pub config_path:       Option<String>,
    pub vocab_size:        usize,
    pub max_seq_len:       usize,
    pub d_model:           usize,
    pub num_heads:         usize,
    pub num_layers:        usize,
    pub d_ff:              usize,
    pub dropout:           f64,
    pub feat_drop:         f64,
    pub attn_drop:         f64,
    pub residual:          bool,
    pub classifier_hidden: usize,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir:    "checkpoints".to_string(),
            config_path:       None,
            vocab_size:        30522,
            max_seq_len:       512,
            d_model:           768,
            num_heads:         12,
            num_layers:        12,
            d_ff:              3072,
            dropout:           0.1,
            feat_drop:         0.1,
            attn_drop:         0.1,
            residual:          true,
            classifier_hidden: 768,
        }
    }
}

impl InitConfig {
    pub fn model_config(&self) -> Result<HgnConfig> {
        if let Some(path) = &self.config_path {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read model config '{path}'"))?;
            return serde_json::from_str(&json)
                .with_context(|| format!("Malformed model config '{path}'"));
        }

        anyhow::ensure!(
            self.d_model % self.num_heads == 0,
            "d_model ({}) must be divisible by num_heads ({})",
            self.d_model,
            self.num_heads
        );

        let encoder = EncoderConfig::new()
            .with_vocab_size(self.vocab_size)
            .with_max_seq_len(self.max_seq_len)
            .with_d_model(self.d_model)
            .with_num_heads(self.num_heads)
            .with_num_layers(self.num_layers)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout);
        Ok(HgnConfig::new(encoder)
            .with_feat_drop(self.feat_drop)
            .with_attn_drop(self.attn_drop)
            .with_residual(self.residual)
            .with_classifier_hidden(self.classifier_hidden))
    }
}

pub struct InitUseCase {
    config: InitConfig,
}

impl InitUseCase {
    pub fn new(config: InitConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<HgnConfig> {
        self.execute_on::<InferBackend>(&Default::default())
    }

    pub fn execute_on<B: Backend>(&self, device: &B::Device) -> Result<HgnConfig> {
        let model_cfg = self.config.model_config()?;
        tracing::info!(
            "Initialising HGN: d_model={} layers={} heads={}",
            model_cfg.encoder.d_model,
            model_cfg.encoder.num_layers,
            model_cfg.encoder.num_heads
        );

        let model: HgnModel<B> = model_cfg.init(device);

        let ckpt_manager = CheckpointManager::new(self.config.checkpoint_dir.clone());
        ckpt_manager.save_config(&model_cfg)?;
        ckpt_manager.save_model(&model, 0)?;

        tracing::info!("Saved initial checkpoint to '{}'", self.config.checkpoint_dir);
        Ok(model_cfg)
    }
}
