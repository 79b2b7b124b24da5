// ============================================================
// Layer 5 — Task Heads
// ============================================================
//   NodeClassifier    [post-graph ‖ pre-graph] → FFN → 2 logits
//                     (support / not support), one per node type
//   SpanPredictor     final token states → start / end logits
//   LabelSmoothingLoss  node-task loss
//
// Class index 1 is "supporting", 0 is "not supporting".

use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{log_softmax, relu},
};

use crate::domain::error::HgnError;
use crate::domain::sample::NO_ANSWER;

pub const NUM_CLASSES: usize = 2;

// ─── Node classifier ──────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct NodeClassifierConfig {
    pub d_model: usize,
    pub hidden:  usize,
}

impl NodeClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> NodeClassifier<B> {
        NodeClassifier {
            hidden: LinearConfig::new(2 * self.d_model, self.hidden).init(device),
            output: LinearConfig::new(self.hidden, NUM_CLASSES).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct NodeClassifier<B: Backend> {
    pub hidden: Linear<B>,
    pub output: Linear<B>,
}

impl<B: Backend> NodeClassifier<B> {
    /// `updated`, `initial`: `[n, d]` → logits `[n, 2]`.
    pub fn forward(&self, updated: Tensor<B, 2>, initial: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = Tensor::cat(vec![updated, initial], 1);
        self.output.forward(relu(self.hidden.forward(x)))
    }
}

// ─── Span predictor ───────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SpanOutput<B: Backend> {
    /// `[1, seq_len]`
    pub start_logits: Tensor<B, 2>,
    /// `[1, seq_len]`
    pub end_logits:   Tensor<B, 2>,
    /// Present only when both gold positions are known.
    pub loss:         Option<Tensor<B, 1>>,
}

#[derive(Config, Debug)]
pub struct SpanPredictorConfig {
    pub d_model: usize,
}

impl SpanPredictorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SpanPredictor<B> {
        SpanPredictor {
            qa_outputs: LinearConfig::new(self.d_model, 2).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct SpanPredictor<B: Backend> {
    pub qa_outputs: Linear<B>,
}

impl<B: Backend> SpanPredictor<B> {
    /// `tokens`: `[seq_len, d]`. Positions of `None` or `-1` mean "no answer".
    pub fn forward(
        &self,
        tokens:         Tensor<B, 2>,
        start_position: Option<i64>,
        end_position:   Option<i64>,
    ) -> Result<SpanOutput<B>, HgnError> {
        let [seq_len, _] = tokens.dims();
        let logits = self.qa_outputs.forward(tokens);
        let start_logits = logits.clone().slice([0..seq_len, 0..1]).reshape([1, seq_len]);
        let end_logits   = logits.slice([0..seq_len, 1..2]).reshape([1, seq_len]);

        let loss = match (start_position, end_position) {
            (Some(start), Some(end)) if start != NO_ANSWER && end != NO_ANSWER => {
                let device = start_logits.device();
                let ce = CrossEntropyLossConfig::new().init(&device);
                let start_loss = ce.forward(start_logits.clone(), position_target(start, seq_len, &device)?);
                let end_loss   = ce.forward(end_logits.clone(), position_target(end, seq_len, &device)?);
                Some((start_loss + end_loss).div_scalar(2.0))
            }
            _ => None,
        };

        Ok(SpanOutput { start_logits, end_logits, loss })
    }
}

fn position_target<B: Backend>(
    position: i64,
    seq_len:  usize,
    device:   &B::Device,
) -> Result<Tensor<B, 1, Int>, HgnError> {
    if position < 0 || position as usize >= seq_len {
        return Err(HgnError::PositionOutOfRange { position, seq_len });
    }
    Ok(Tensor::<B, 1, Int>::from_ints([position as i32], device))
}

// ─── Label smoothing ──────────────────────────────────────────────────────────
/// Cross-entropy against a smoothed target: the gold class gets
/// `1 - smoothing`, every other class `smoothing / (classes - 1)`.
#[derive(Debug, Clone)]
pub struct LabelSmoothingLoss {
    pub classes:   usize,
    pub smoothing: f64,
}

impl LabelSmoothingLoss {
    pub fn new(classes: usize, smoothing: f64) -> Self {
        Self { classes, smoothing }
    }

    /// `logits`: `[n, classes]`, `labels`: gold class per row → scalar mean loss.
    pub fn forward<B: Backend>(&self, logits: Tensor<B, 2>, labels: &[u8]) -> Tensor<B, 1> {
        let device = logits.device();
        let off = (self.smoothing / (self.classes - 1) as f64) as f32;
        let on  = (1.0 - self.smoothing) as f32;

        let mut target = vec![off; labels.len() * self.classes];
        for (row, &label) in labels.iter().enumerate() {
            target[row * self.classes + label as usize] = on;
        }
        let target = Tensor::<B, 1>::from_floats(target.as_slice(), &device)
            .reshape([labels.len(), self.classes]);

        (target.neg() * log_softmax(logits, 1)).sum_dim(1).mean()
    }
}
