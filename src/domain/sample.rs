// ============================================================
// Layer 3 — GraphSample Domain Type
// ============================================================
// One question/context pair as handed over by the upstream
// pipeline: the packed encoder inputs for a single sequence
// plus the document graph built over that sequence.
//
//   input_ids       [CLS] question [SEP] context [SEP]
//   attention_mask  1 = real token, 0 = padding
//   token_type_ids  0 = question segment, 1 = context segment
//   graph           nodes/edges indexing into the same sequence
//
// Gold answer positions use -1 for "no answer". A sample
// without positions can still be run; it just produces no
// span loss.
//
// Reference: Devlin et al. (2019) BERT
//            Fang et al. (2020) Hierarchical Graph Network

use serde::{Deserialize, Serialize};

use crate::domain::error::GraphError;
use crate::domain::graph::{HeteroGraph, RawGraph};

/// Sentinel used by the data pipeline for unanswerable examples.
pub const NO_ANSWER: i64 = -1;

/// Points a sentence node back at its source document, so
/// predicted support can be reported as (title, sentence index).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceRef {
    pub doc_title: String,
    pub sent_idx:  usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSample {
    /// Example identifier carried through to the prediction file
    pub id: String,

    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    #[serde(default)]
    pub token_type_ids: Vec<u32>,

    pub graph: RawGraph,

    #[serde(default)]
    pub start_position: Option<i64>,
    #[serde(default)]
    pub end_position: Option<i64>,

    /// One entry per sentence node, in node order
    #[serde(default)]
    pub sentence_refs: Vec<SentenceRef>,
}

impl GraphSample {
    pub fn seq_len(&self) -> usize {
        self.input_ids.len()
    }

    /// Token types default to segment 0 when the pipeline omits them.
    pub fn token_types(&self) -> Vec<u32> {
        if self.token_type_ids.is_empty() {
            vec![0; self.input_ids.len()]
        } else {
            self.token_type_ids.clone()
        }
    }

    /// Validate and freeze the graph part of the sample.
    pub fn build_graph(&self) -> Result<HeteroGraph, GraphError> {
        HeteroGraph::try_from(self.graph.clone())
    }

    /// True when both gold positions are given and neither is the sentinel.
    pub fn has_answer(&self) -> bool {
        matches!(
            (self.start_position, self.end_position),
            (Some(s), Some(e)) if s != NO_ANSWER && e != NO_ANSWER
        )
    }
}
