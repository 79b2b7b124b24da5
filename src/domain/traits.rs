// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to these traits, not to the
// concrete loaders and drivers behind them.
//
//   SampleSource    — anything that yields GraphSamples
//                     (JsonlLoader today)
//   SupportPredictor — anything that turns a GraphSample into
//                     a Prediction (Inferencer today)

use anyhow::Result;

use crate::domain::prediction::Prediction;
use crate::domain::sample::GraphSample;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can load pre-built graph samples.
pub trait SampleSource {
    fn load_all(&self) -> Result<Vec<GraphSample>>;
}

// ─── SupportPredictor ─────────────────────────────────────────────────────────
/// Any component that predicts an answer span and supporting
/// evidence for one sample.
pub trait SupportPredictor {
    fn predict(&self, sample: &GraphSample) -> Result<Prediction>;
}
