// ============================================================
// Layer 3 — Error Types
// ============================================================
// Two families of failure exist in the core:
//
//   GraphError — the heterogeneous graph handed to us by the
//                upstream pipeline is malformed. Raised once,
//                at construction time, never mid-forward.
//
//   HgnError   — something went wrong during a forward pass.
//                NumericalInstability is the fail-fast fault:
//                a NaN reached a component output and there is
//                no recovery inside the model.
//
// Missing node types and empty sample sets are NOT errors —
// they simply skip the corresponding task.

use thiserror::Error;

use crate::domain::graph::NodeType;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("graph has {tokens} token nodes but a sequence length of {seq_len}")]
    TokenCount { tokens: usize, seq_len: usize },

    #[error("{node_type} node {index} has empty or inverted span [{start}, {end})")]
    EmptySpan { node_type: NodeType, index: usize, start: usize, end: usize },

    #[error("span [{start}, {end}) of {owner} exceeds sequence length {seq_len}")]
    SpanOutOfBounds { owner: String, start: usize, end: usize, seq_len: usize },

    #[error("{node_type} has {labels} labels for {nodes} nodes")]
    LabelCount { node_type: NodeType, labels: usize, nodes: usize },

    #[error("{node_type} node {index} has label {label}; support labels are 0 or 1")]
    InvalidLabel { node_type: NodeType, index: usize, label: u8 },

    #[error("relation '{relation}' lists {src} sources but {dst} destinations")]
    EdgeLengthMismatch { relation: String, src: usize, dst: usize },

    #[error("relation '{relation}' references {node_type} node {index} but only {count} exist")]
    EdgeEndpoint { relation: String, node_type: NodeType, index: usize, count: usize },

    #[error("relation '{relation}' needs span_idx and rel_type for each of its {edges} edges")]
    MissingRelationFeatures { relation: String, edges: usize },

    #[error("relation '{relation}' updates tokens but points at {dst} nodes")]
    TokenRelationTarget { relation: String, dst: NodeType },

    #[error("relation '{relation}' from {src} to {dst} appears twice")]
    DuplicateRelation { relation: String, src: NodeType, dst: NodeType },
}

#[derive(Debug, Error)]
pub enum HgnError {
    #[error("numerical instability: NaN detected in {stage}")]
    NumericalInstability { stage: String },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("encoder produced {encoded} positions but the graph expects {expected}")]
    SequenceLength { encoded: usize, expected: usize },

    #[error("no {node_type} features were supplied to the relational layer")]
    MissingFeatures { node_type: NodeType },

    #[error("{field} has {len} entries but the sequence has {expected}")]
    InputShape { field: &'static str, len: usize, expected: usize },

    #[error("sequence of {len} tokens exceeds the encoder's {max} positions")]
    SequenceTooLong { len: usize, max: usize },

    #[error("{field}[{position}] = {id} is outside the encoder's table of {limit}")]
    IdOutOfRange { field: &'static str, position: usize, id: u32, limit: usize },

    #[error("{node_type} nodes have no support classifier")]
    NoClassifier { node_type: NodeType },

    #[error("training forward needs support labels on {node_type} nodes")]
    MissingLabels { node_type: NodeType },

    #[error("answer position {position} lies outside a sequence of length {seq_len}")]
    PositionOutOfRange { position: i64, seq_len: usize },

    #[error("cannot read tensor data back to the host: {0}")]
    Readback(String),
}
