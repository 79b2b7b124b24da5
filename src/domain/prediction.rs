// ============================================================
// Layer 3 — Prediction Domain Types
// ============================================================
// What the inference driver produces for one sample, and the
// aggregate report written at the end of a run.
//
// The report mirrors the HotpotQA evaluation layout:
//   { "answer": { id: "text" },
//     "sp":     { id: [[doc_title, sent_idx], ...] } }

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub answer: String,
    /// Half-open token span `[start, end)` chosen by argmax
    pub answer_span: (usize, usize),
    pub supporting_sentences: Vec<usize>,
    pub supporting_entities:  Vec<usize>,
    pub supporting_srl:       Vec<usize>,
    pub supporting_facts:     Vec<(String, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub answer: BTreeMap<String, String>,
    pub sp:     BTreeMap<String, Vec<(String, usize)>>,
}

impl PredictionReport {
    pub fn push(&mut self, prediction: Prediction) {
        self.answer.insert(prediction.id.clone(), prediction.answer);
        self.sp.insert(prediction.id, prediction.supporting_facts);
    }

    pub fn len(&self) -> usize {
        self.answer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answer.is_empty()
    }
}
