// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits describing the problem:
// the heterogeneous document graph, the samples that carry it,
// the predictions we hand back, and the error taxonomy.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain data and validation
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

/// Node/edge types, spans and the validated graph
pub mod graph;

/// A sample: encoder inputs + graph + optional gold span
pub mod sample;

/// Per-sample predictions and the aggregate report
pub mod prediction;

/// Graph and forward-pass error types
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
