// ============================================================
// Layer 4 — Graph Batcher
// ============================================================
// Converts one GraphSample into device tensors plus its
// validated graph.
//
// Batch size is always one: every sample carries its own
// graph, and graph sizes differ from sample to sample, so
// there is nothing to stack across samples.
//
//   input_ids / attention_mask / token_type_ids   [1, seq_len]
//   graph                                         HeteroGraph
//   start_position / end_position                 Option<i64>
//
// Gold positions stay on the host: the span predictor only
// needs them to decide whether a loss exists and to build a
// one-element target.
//
// Every sample is checked against the encoder's embedding
// tables (InputLimits) here, while the ids are still on the
// host. An id past a table is an error, not a device panic.
//
// Reference: Burn Book §4 (Batcher)

use burn::prelude::*;

use crate::domain::error::HgnError;
use crate::domain::graph::HeteroGraph;
use crate::domain::sample::GraphSample;

#[derive(Debug, Clone)]
pub struct GraphBatch<B: Backend> {
    /// Shape: [1, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// Shape: [1, seq_len], 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,

    /// Shape: [1, seq_len]
    pub token_type_ids: Tensor<B, 2, Int>,

    pub graph: HeteroGraph,

    pub start_position: Option<i64>,
    pub end_position:   Option<i64>,
}

/// Sizes of the encoder's embedding tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputLimits {
    pub max_seq_len:     usize,
    pub vocab_size:      usize,
    pub type_vocab_size: usize,
}

#[derive(Clone, Debug)]
pub struct GraphBatcher<B: Backend> {
    pub device: B::Device,
    pub limits: InputLimits,
}

impl<B: Backend> GraphBatcher<B> {
    pub fn new(device: B::Device, limits: InputLimits) -> Self {
        Self { device, limits }
    }

    pub fn batch(&self, sample: &GraphSample) -> Result<GraphBatch<B>, HgnError> {
        let graph   = sample.build_graph()?;
        let seq_len = graph.seq_len();

        check_len("input_ids", sample.input_ids.len(), seq_len)?;
        check_len("attention_mask", sample.attention_mask.len(), seq_len)?;
        // empty means "all segment 0"
        if !sample.token_type_ids.is_empty() {
            check_len("token_type_ids", sample.token_type_ids.len(), seq_len)?;
        }

        if seq_len > self.limits.max_seq_len {
            return Err(HgnError::SequenceTooLong { len: seq_len, max: self.limits.max_seq_len });
        }
        check_ids("input_ids", &sample.input_ids, self.limits.vocab_size)?;
        check_ids("token_type_ids", &sample.token_type_ids, self.limits.type_vocab_size)?;

        Ok(GraphBatch {
            input_ids:      self.row(&sample.input_ids),
            attention_mask: self.row(&sample.attention_mask),
            token_type_ids: self.row(&sample.token_types()),
            graph,
            start_position: sample.start_position,
            end_position:   sample.end_position,
        })
    }

    fn row(&self, values: &[u32]) -> Tensor<B, 2, Int> {
        // Burn uses i32 for Int tensor data
        let flat: Vec<i32> = values.iter().map(|&x| x as i32).collect();
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape([1, values.len()])
    }
}

fn check_len(field: &'static str, len: usize, expected: usize) -> Result<(), HgnError> {
    if len != expected {
        return Err(HgnError::InputShape { field, len, expected });
    }
    Ok(())
}

fn check_ids(field: &'static str, ids: &[u32], limit: usize) -> Result<(), HgnError> {
    match ids.iter().position(|&id| id as usize >= limit) {
        Some(position) => Err(HgnError::IdOutOfRange { field, position, id: ids[position], limit }),
        None => Ok(()),
    }
}
