// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Runs the inference driver over a file of graph samples:
//
//   Step 1: Load GraphSamples          (Layer 4 - data)
//   Step 2: Load tokenizer, if given   (Layer 6 - infra)
//   Step 3: Rebuild model from ckpt    (Layer 5 - ml)
//   Step 4: Predict every sample       (Layer 5 - ml)
//   Step 5: Write the JSON report      {"answer": ..., "sp": ...}
//
// Any failing sample stops the run: a malformed graph or a
// NaN in the forward pass is not something to paper over.

use anyhow::{Context, Result};
use burn::{data::dataset::Dataset, prelude::*};

use crate::data::{dataset::GraphDataset, loader::JsonlLoader};
use crate::domain::prediction::PredictionReport;
use crate::domain::traits::{SampleSource, SupportPredictor};
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::inferencer::{InferBackend, Inferencer};

#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub checkpoint_dir: String,
    pub samples:        String,
    pub tokenizer:      Option<String>,
    pub output:         String,
}

pub struct PredictUseCase {
    config: PredictConfig,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PredictionReport> {
        self.execute_on::<InferBackend>(Default::default())
    }

    pub fn execute_on<B: Backend>(&self, device: B::Device) -> Result<PredictionReport> {
        let cfg = &self.config;

        let dataset = GraphDataset::new(JsonlLoader::new(&cfg.samples).load_all()?);
        tracing::info!(
            "Predicting {} samples ({} with gold answers)",
            dataset.len(),
            dataset.answerable_count()
        );

        let tokenizer = match &cfg.tokenizer {
            Some(path) => Some(TokenizerStore::new(path).load()?),
            None => {
                tracing::warn!("No tokenizer given — answers are reported as token ids");
                None
            }
        };

        let ckpt_manager = CheckpointManager::new(cfg.checkpoint_dir.clone());
        let inferencer = Inferencer::<B>::from_checkpoint(&ckpt_manager, tokenizer, device)?;

        let mut report = PredictionReport::default();
        for sample in dataset.iter() {
            report.push(inferencer.predict(&sample)?);
        }

        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&cfg.output, json)
            .with_context(|| format!("Cannot write predictions to '{}'", cfg.output))?;

        tracing::info!("Wrote {} predictions to '{}'", report.len(), cfg.output);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use burn::backend::NdArray;

    use crate::application::init_use_case::{InitConfig, InitUseCase};
    use crate::domain::graph::{NodeType, RawGraph};
    use crate::domain::sample::{GraphSample, SentenceRef};

    type TestBackend = NdArray;

    #[test]
    fn test_init_then_predict() {
        let dir = std::env::temp_dir().join(format!("hgn-qa-predict-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        let ckpt = dir.join("ckpt").to_string_lossy().into_owned();

        InitUseCase::new(InitConfig {
            checkpoint_dir:    ckpt.clone(),
            vocab_size:        64,
            max_seq_len:       16,
            d_model:           4,
            num_heads:         1,
            num_layers:        1,
            d_ff:              8,
            classifier_hidden: 4,
            ..Default::default()
        })
        .execute_on::<TestBackend>(&Default::default())
        .unwrap();

        let sample = GraphSample {
            id:             "q1".into(),
            input_ids:      vec![2, 10, 3, 20, 21, 3],
            attention_mask: vec![1; 6],
            token_type_ids: vec![0, 0, 0, 1, 1, 1],
            graph: RawGraph::new(6)
                .with_token_nodes()
                .with_nodes(NodeType::Sent, vec![(3, 5), (5, 6)], None)
                .with_edges(NodeType::Sent, "sent2sent", NodeType::Sent, &[(0, 1), (1, 0)]),
            start_position: None,
            end_position:   None,
            sentence_refs:  vec![
                SentenceRef { doc_title: "T".into(), sent_idx: 0 },
                SentenceRef { doc_title: "T".into(), sent_idx: 1 },
            ],
        };
        let samples = dir.join("samples.jsonl");
        fs::write(&samples, serde_json::to_string(&sample).unwrap()).unwrap();
        let output = dir.join("pred.json");

        let report = PredictUseCase::new(PredictConfig {
            checkpoint_dir: ckpt,
            samples:        samples.to_string_lossy().into_owned(),
            tokenizer:      None,
            output:         output.to_string_lossy().into_owned(),
        })
        .execute_on::<TestBackend>(Default::default())
        .unwrap();

        assert_eq!(report.len(), 1);
        let written: PredictionReport =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written, report);
        assert!(written.sp.contains_key("q1"));
        fs::remove_dir_all(dir).ok();
    }
}
