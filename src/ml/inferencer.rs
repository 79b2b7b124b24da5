// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the model from a checkpoint and turns a forward
// pass in eval mode into a Prediction:
//
//   answer span   argmax(start_logits), argmax(end_logits);
//                 the answer is input_ids[start..end] decoded,
//                 empty when end <= start
//   support       every node whose support probability beats
//                 its non-support probability
//   facts         supporting sentence nodes mapped to
//                 (doc_title, sent_idx) via the sample's refs
use anyhow::{Context, Result};
use burn::prelude::*;
use tokenizers::Tokenizer;

use crate::data::batcher::GraphBatcher;
use crate::domain::graph::NodeType;
use crate::domain::prediction::Prediction;
use crate::domain::sample::GraphSample;
use crate::domain::traits::SupportPredictor;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{ForwardMode, HgnModel, HgnOutput};
use crate::ml::ops::to_host;

pub type InferBackend = burn::backend::Wgpu;

pub struct Inferencer<B: Backend> {
    model:     HgnModel<B>,
    batcher:   GraphBatcher<B>,
    tokenizer: Option<Tokenizer>,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: HgnModel<B>, tokenizer: Option<Tokenizer>, device: B::Device) -> Self {
        let batcher = GraphBatcher::new(device, model.encoder.input_limits());
        Self { model, batcher, tokenizer }
    }

    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        tokenizer:    Option<Tokenizer>,
        device:       B::Device,
    ) -> Result<Self> {
        let cfg = ckpt_manager.load_config()?;
        let model: HgnModel<B> = cfg.init(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint (d_model={})", cfg.encoder.d_model);
        Ok(Self::new(model, tokenizer, device))
    }
}

impl<B: Backend> SupportPredictor for Inferencer<B> {
    fn predict(&self, sample: &GraphSample) -> Result<Prediction> {
        let batch = self
            .batcher
            .batch(sample)
            .with_context(|| format!("Sample '{}' cannot be batched", sample.id))?;
        let output = self
            .model
            .forward(&batch, ForwardMode::Eval)
            .with_context(|| format!("Forward pass failed on sample '{}'", sample.id))?;
        decode_prediction(sample, &output, self.tokenizer.as_ref())
    }
}

pub fn decode_prediction<B: Backend>(
    sample:    &GraphSample,
    output:    &HgnOutput<B>,
    tokenizer: Option<&Tokenizer>,
) -> Result<Prediction> {
    let start = argmax(&to_host(output.span.start_logits.clone())?);
    let end   = argmax(&to_host(output.span.end_logits.clone())?);

    let answer = if end > start {
        let ids = sample.input_ids.get(start..end).unwrap_or_default();
        match tokenizer {
            Some(tokenizer) => tokenizer
                .decode(ids, true)
                .map_err(|e| anyhow::anyhow!("Decode: {e}"))?,
            None => ids.iter().map(u32::to_string).collect::<Vec<_>>().join(" "),
        }
    } else {
        String::new()
    };

    let supporting = |node_type: NodeType| -> Result<Vec<usize>> {
        let Some(task) = output.nodes.get(&node_type) else {
            return Ok(Vec::new());
        };
        let probs = to_host(task.probs.clone())?;
        Ok(task
            .indices
            .iter()
            .zip(probs.chunks(2))
            .filter(|(_, p)| p[1] > p[0])
            .map(|(&i, _)| i)
            .collect())
    };

    let supporting_sentences = supporting(NodeType::Sent)?;
    let supporting_facts = supporting_sentences
        .iter()
        .filter_map(|&i| sample.sentence_refs.get(i))
        .map(|r| (r.doc_title.clone(), r.sent_idx))
        .collect();

    tracing::debug!(
        "Sample '{}': span [{}, {}) answer='{}' {} supporting sentence(s)",
        sample.id, start, end, answer, supporting_sentences.len()
    );

    Ok(Prediction {
        id: sample.id.clone(),
        answer,
        answer_span: (start, end),
        supporting_entities: supporting(NodeType::Ent)?,
        supporting_srl: supporting(NodeType::Srl)?,
        supporting_sentences,
        supporting_facts,
    })
}

/// Index of the first maximum.
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
