// ============================================================
// Layer 5 — Tensor Helpers
// ============================================================
// Small building blocks shared by the graph modules. The graph
// structure lives on the host as index lists; these helpers
// turn it into device tensors.
//
//   index_tensor   [E] Int     — gather indices for select()
//   segment_sum    [E, D] → [N, D] — sums edge rows per
//                                     destination node
//   recurrent_cell GRU with orthogonal weights, N(0, 1) biases
//   last_step      [N, S, D] → [N, D] — final GRU output step
//   to_host        Tensor → Vec<f32>

use burn::{
    nn::{
        gru::{Gru, GruConfig},
        Initializer, Linear,
    },
    prelude::*,
    tensor::IndexingUpdateOp,
};

use crate::domain::error::HgnError;

/// Torch's default leaky-ReLU slope.
pub const LEAKY_SLOPE: f64 = 0.01;

pub fn index_tensor<B: Backend>(indices: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let flat: Vec<i32> = indices.iter().map(|&i| i as i32).collect();
    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device)
}

/// Row `n` of the result is the sum of every `values` row `e` with `dst[e] == n`.
/// Destinations without edges get zeros.
pub fn segment_sum<B: Backend>(values: Tensor<B, 2>, dst: &[usize], num_dst: usize) -> Tensor<B, 2> {
    let [_, width] = values.dims();
    let device = values.device();
    Tensor::zeros([num_dst, width], &device).select_assign(
        0,
        index_tensor::<B>(dst, &device),
        values,
        IndexingUpdateOp::Add,
    )
}

/// Square GRU whose weight matrices are orthogonal and whose biases are
/// drawn from a standard normal.
pub fn recurrent_cell<B: Backend>(d_model: usize, device: &B::Device) -> Gru<B> {
    let mut gru = GruConfig::new(d_model, d_model, true).init(device);
    for gate in [&mut gru.update_gate, &mut gru.reset_gate, &mut gru.new_gate] {
        reinit_recurrent(&mut gate.input_transform, device);
        reinit_recurrent(&mut gate.hidden_transform, device);
    }
    gru
}

fn reinit_recurrent<B: Backend>(linear: &mut Linear<B>, device: &B::Device) {
    let [d_input, d_output] = linear.weight.dims();
    linear.weight = Initializer::Orthogonal { gain: 1.0 }.init([d_input, d_output], device);
    if linear.bias.is_some() {
        linear.bias = Some(Initializer::Normal { mean: 0.0, std: 1.0 }.init([d_output], device));
    }
}

/// Output of the last recurrent step: `[N, S, D] → [N, D]`.
pub fn last_step<B: Backend>(sequence: Tensor<B, 3>) -> Tensor<B, 2> {
    let [n, steps, width] = sequence.dims();
    sequence
        .slice([0..n, steps - 1..steps, 0..width])
        .reshape([n, width])
}

pub fn to_host<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>, HgnError> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| HgnError::Readback(format!("{e:?}")))
}
