// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor code lives here.
//
//   encoder.rs     — SequenceEncoder seam + BERT-shaped encoder
//   embedder.rs    — token spans → initial node embeddings
//   relational.rs  — one heterogeneous message-passing layer
//   gnn.rs         — two layers + layer-level token GRU
//   heads.rs       — support classifiers, span predictor, losses
//   model.rs       — HgnModel, the full forward pass
//   inferencer.rs  — checkpoint → Prediction
//   guard.rs       — NaN checks (fail fast)
//   ops.rs         — index / segment-sum / recurrent-cell helpers
//
// Reference: Burn Book §3 (Building Blocks)
//            Fang et al. (2020) Hierarchical Graph Network

/// Contextual token encoder
pub mod encoder;

/// Initial node embeddings from token spans
pub mod embedder;

/// Heterogeneous relational graph layer
pub mod relational;

/// Two-layer graph network
pub mod gnn;

/// Node classifiers and span predictor
pub mod heads;

/// Full hierarchical graph network
pub mod model;

/// Inference engine — loads checkpoint and predicts
pub mod inferencer;

/// Numerical validation boundary
pub mod guard;

/// Shared tensor helpers
pub mod ops;
