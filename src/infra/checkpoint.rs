// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores HGN weights using Burn's CompactRecorder.
//
// What gets saved per checkpoint:
//   1. Model weights (.mpk.gz file) — all learned parameters
//   2. latest_epoch.json            — which epoch was last saved
//   3. hgn_config.json              — encoder and graph config
//
// The config is needed to rebuild the exact architecture
// (encoder width, layer count, classifier width) before the
// weights can be loaded into it.
//
// File naming convention:
//   checkpoints/
//     model_epoch_0.mpk.gz   ← freshly initialised weights
//     model_epoch_1.mpk.gz
//     ...
//     latest_epoch.json
//     hgn_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::ml::model::{HgnConfig, HgnModel};

const CONFIG_FILE: &str = "hgn_config.json";
const LATEST_FILE: &str = "latest_epoch.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<String>) -> Self {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Write `{dir}/model_epoch_{epoch}.mpk.gz` and point `latest_epoch.json` at it.
    pub fn save_model<B: Backend>(&self, model: &HgnModel<B>, epoch: usize) -> Result<()> {
        // recorder adds the extension
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        fs::write(self.dir.join(LATEST_FILE), serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write {LATEST_FILE}"))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the latest checkpoint into `model`, which must have the saved architecture.
    pub fn load_model<B: Backend>(&self, model: HgnModel<B>, device: &B::Device) -> Result<HgnModel<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you run 'init' first?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &HgnConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<HgnConfig> {
        let path = self.dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'init' before 'predict'.",
                path.display()
            )
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed model config in '{}'", path.display()))
    }

    /// Returns an error if no checkpoint has been saved yet.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_FILE);

        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{LATEST_FILE}'. Have you run 'init' first?"))?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
