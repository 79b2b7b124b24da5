// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the JSON written by the upstream graph
// builder and the tensors the model consumes:
//
//   samples.jsonl
//       │
//       ▼
//   JsonlLoader       → GraphSample per line
//       │
//       ▼
//   GraphDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   GraphBatcher      → validated HeteroGraph + [1, L] tensors
//
// BalancedSampler lives here too: it decides which labelled
// nodes a training forward pass scores.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads GraphSamples from JSON-lines / JSON files
pub mod loader;

/// Implements Burn's Dataset trait for graph samples
pub mod dataset;

/// Turns one sample into device tensors plus its graph
pub mod batcher;

/// Seeded positive/negative node sampling
pub mod sampler;
