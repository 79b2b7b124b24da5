// ============================================================
// Layer 5 — Initial Node Embedder
// ============================================================
// Every graph node summarises a contiguous token span. One
// bidirectional GRU pass over the whole encoder output gives,
// for each node [st, end):
//
//   left→right state at end - 1   (has read the whole span)
//   right→left state at st        (has read the whole span
//                                  from the other side)
//
// The two halves are concatenated and fused back to d_model
// by a single shared Linear(2d → d).
//
// Burn has no bidirectional GRU, so the backward direction is
// a second Gru run over the reversed sequence and reversed
// back afterwards.

use std::collections::BTreeMap;

use burn::{
    nn::{
        gru::{Gru, GruConfig},
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::domain::graph::HeteroGraph;
use crate::ml::ops::index_tensor;
use crate::ml::relational::NodeFeatures;

#[derive(Config, Debug)]
pub struct NodeEmbedderConfig {
    pub d_model: usize,
}

impl NodeEmbedderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> InitialNodeEmbedder<B> {
        InitialNodeEmbedder {
            forward_gru:  GruConfig::new(self.d_model, self.d_model, true).init(device),
            backward_gru: GruConfig::new(self.d_model, self.d_model, true).init(device),
            fusion:       LinearConfig::new(2 * self.d_model, self.d_model).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct InitialNodeEmbedder<B: Backend> {
    pub forward_gru:  Gru<B>,
    pub backward_gru: Gru<B>,
    pub fusion:       Linear<B>,
}

impl<B: Backend> InitialNodeEmbedder<B> {
    /// `sequence`: `[1, seq_len, d]` encoder output → one `[n, d]` tensor
    /// per node type present in the graph.
    pub fn forward(&self, graph: &HeteroGraph, sequence: Tensor<B, 3>) -> NodeFeatures<B> {
        let [_, seq_len, width] = sequence.dims();
        let device = sequence.device();

        let reversed: Vec<usize> = (0..seq_len).rev().collect();
        let reversed = index_tensor::<B>(&reversed, &device);

        let left_to_right = self
            .forward_gru
            .forward(sequence.clone(), None)
            .reshape([seq_len, width]);
        let right_to_left = self
            .backward_gru
            .forward(sequence.select(1, reversed.clone()), None)
            .select(1, reversed)
            .reshape([seq_len, width]);

        let mut features = BTreeMap::new();
        for (node_type, nodes) in graph.node_sets() {
            let ends:   Vec<usize> = nodes.spans().iter().map(|s| s.end - 1).collect();
            let starts: Vec<usize> = nodes.spans().iter().map(|s| s.start).collect();

            let forward_half  = left_to_right.clone().select(0, index_tensor::<B>(&ends, &device));
            let backward_half = right_to_left.clone().select(0, index_tensor::<B>(&starts, &device));

            let both = Tensor::cat(vec![forward_half, backward_half], 1);
            features.insert(node_type, self.fusion.forward(both));
        }
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    use crate::domain::graph::{NodeType, RawGraph};
    use crate::ml::ops::to_host;

    type TestBackend = NdArray;

    #[test]
    fn test_one_vector_per_node() {
        let device = Default::default();
        let embedder: InitialNodeEmbedder<TestBackend> = NodeEmbedderConfig::new(4).init(&device);
        let graph = HeteroGraph::try_from(
            RawGraph::new(5)
                .with_token_nodes()
                .with_nodes(NodeType::Sent, vec![(0, 2), (2, 5)], None)
                .with_nodes(NodeType::Srl, Vec::new(), None),
        )
        .unwrap();

        let sequence = Tensor::<TestBackend, 3>::random([1, 5, 4], Distribution::Normal(0.0, 1.0), &device);
        let features = embedder.forward(&graph, sequence);

        assert_eq!(features[&NodeType::Tok].dims(), [5, 4]);
        assert_eq!(features[&NodeType::Sent].dims(), [2, 4]);
        // zero-instance types are skipped
        assert!(!features.contains_key(&NodeType::Srl));
    }

    #[test]
    fn test_identical_spans_share_embedding() {
        let device = Default::default();
        let embedder: InitialNodeEmbedder<TestBackend> = NodeEmbedderConfig::new(4).init(&device);
        let graph = HeteroGraph::try_from(
            RawGraph::new(4)
                .with_token_nodes()
                .with_nodes(NodeType::Ent, vec![(1, 3), (1, 3)], None),
        )
        .unwrap();

        let sequence = Tensor::<TestBackend, 3>::random([1, 4, 4], Distribution::Normal(0.0, 1.0), &device);
        let values = to_host(embedder.forward(&graph, sequence)[&NodeType::Ent].clone()).unwrap();
        assert_eq!(values[..4], values[4..]);
    }
}
