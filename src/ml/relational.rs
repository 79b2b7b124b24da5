// ============================================================
// Layer 5 — Heterogeneous Relational Layer
// ============================================================
// One round of typed message passing over the document graph.
//
//   1. Dispatch   — every edge partition produces a mailbox
//                   {message, attention logit} according to its
//                   RelationKind:
//                     TokenUpdate    deferred to step 3
//                     Suppressed     nothing
//                     EntityRelation relation-phrase message
//                     AnswerType     attention, AT projections
//                     Attention      attention, node projections
//   2. Aggregate  — per destination node, softmax the logits of
//                   its in-edges (per feature), dropout, weighted
//                   sum of messages. Partitions that share a
//                   destination type are summed.
//   3. Tokens     — srl→tok and ent→tok messages come from a GRU
//                   cell (input = source, hidden = token). Their
//                   per-token sums drive one more GRU step:
//                     input sequence  [ent summary?, token]
//                     initial hidden  srl summary, else token
//   4. Residual   — output = updated + input, when enabled.
//   5. Cleanup    — the scratch context comes back empty.
//
// All working buffers live in a LayerScratch that the caller
// hands in by value and gets back cleared. The graph itself is
// only ever borrowed immutably.
//
// Reference: Schlichtkrull et al. (2018) R-GCN
//            Veličković et al. (2018) Graph Attention Networks

use std::collections::BTreeMap;

use burn::{
    nn::{
        gru::Gru,
        Dropout, DropoutConfig,
        Initializer,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::leaky_relu,
};

use crate::domain::error::{GraphError, HgnError};
use crate::domain::graph::{EdgeSet, EdgeType, HeteroGraph, NodeType, RelationKind, RelationPhrases};
use crate::ml::guard::{ensure_features_no_nan, ensure_no_nan};
use crate::ml::ops::{index_tensor, last_step, recurrent_cell, segment_sum, to_host, LEAKY_SLOPE};

/// One `[num_nodes, d_model]` embedding per node type.
pub type NodeFeatures<B> = BTreeMap<NodeType, Tensor<B, 2>>;

#[derive(Config, Debug)]
pub struct HeteroLayerConfig {
    pub d_model: usize,
    #[config(default = 0.0)]
    pub feat_drop: f64,
    #[config(default = 0.0)]
    pub attn_drop: f64,
    #[config(default = false)]
    pub residual: bool,
}

impl HeteroLayerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> HeteroRgcnLayer<B> {
        let d = self.d_model;
        // Xavier-normal with the ReLU gain on the attention path
        let relu_gain = Initializer::XavierNormal { gain: 2.0_f64.sqrt() };

        HeteroRgcnLayer {
            node_trans: LinearConfig::new(d, d)
                .with_initializer(relu_gain.clone())
                .init(device),
            node_att: LinearConfig::new(2 * d, d)
                .with_initializer(relu_gain)
                .init(device),
            rel_trans:          LinearConfig::new(2 * d, d).init(device),
            common_space_trans: LinearConfig::new(d, d).init(device),
            at_trans:           LinearConfig::new(d, d).init(device),
            at_att:             LinearConfig::new(2 * d, d).init(device),
            gru_node2tok:       recurrent_cell(d, device),
            feat_drop:          DropoutConfig::new(self.feat_drop).init(),
            attn_drop:          DropoutConfig::new(self.attn_drop).init(),
            residual:           self.residual,
        }
    }
}

#[derive(Module, Debug)]
pub struct HeteroRgcnLayer<B: Backend> {
    pub node_trans:         Linear<B>,
    pub node_att:           Linear<B>,
    pub rel_trans:          Linear<B>,
    pub common_space_trans: Linear<B>,
    pub at_trans:           Linear<B>,
    pub at_att:             Linear<B>,
    pub gru_node2tok:       Gru<B>,
    pub feat_drop:          Dropout,
    pub attn_drop:          Dropout,
    pub residual:           bool,
}

// ─── Scratch context ──────────────────────────────────────────────────────────
#[derive(Debug)]
struct Mailbox<B: Backend> {
    /// `[E, d]` message per edge
    messages: Tensor<B, 2>,
    /// `[E, d]` unnormalised attention per edge and feature
    logits:   Tensor<B, 2>,
}

/// Working buffers of one relational-layer call.
#[derive(Debug)]
pub struct LayerScratch<B: Backend> {
    hidden:       NodeFeatures<B>,
    residual:     NodeFeatures<B>,
    mailboxes:    BTreeMap<EdgeType, Mailbox<B>>,
    token_signal: BTreeMap<NodeType, Tensor<B, 2>>,
}

impl<B: Backend> Default for LayerScratch<B> {
    fn default() -> Self {
        Self {
            hidden:       BTreeMap::new(),
            residual:     BTreeMap::new(),
            mailboxes:    BTreeMap::new(),
            token_signal: BTreeMap::new(),
        }
    }
}

impl<B: Backend> LayerScratch<B> {
    /// True when no node or edge buffer is held.
    pub fn is_clean(&self) -> bool {
        self.hidden.is_empty()
            && self.residual.is_empty()
            && self.mailboxes.is_empty()
            && self.token_signal.is_empty()
    }

    fn clear(&mut self) {
        self.hidden.clear();
        self.residual.clear();
        self.mailboxes.clear();
        self.token_signal.clear();
    }

    fn hidden(&self, node_type: NodeType) -> Result<Tensor<B, 2>, HgnError> {
        self.hidden
            .get(&node_type)
            .cloned()
            .ok_or(HgnError::MissingFeatures { node_type })
    }
}

// ─── Forward ──────────────────────────────────────────────────────────────────
impl<B: Backend> HeteroRgcnLayer<B> {
    /// `features`: input embedding per node type.
    /// `token_emb`: `[seq_len, d]` encoder output, used for relation phrases.
    pub fn forward(
        &self,
        graph:     &HeteroGraph,
        features:  NodeFeatures<B>,
        token_emb: Tensor<B, 2>,
    ) -> Result<NodeFeatures<B>, HgnError> {
        let (out, _scratch) = self.forward_with_scratch(graph, features, token_emb, LayerScratch::default())?;
        Ok(out)
    }

    /// Same as `forward`, but the working buffers are passed in and handed
    /// back (cleared), so callers can reuse the allocation or inspect it.
    pub fn forward_with_scratch(
        &self,
        graph:       &HeteroGraph,
        features:    NodeFeatures<B>,
        token_emb:   Tensor<B, 2>,
        mut scratch: LayerScratch<B>,
    ) -> Result<(NodeFeatures<B>, LayerScratch<B>), HgnError> {
        let [encoded, _] = token_emb.dims();
        if encoded != graph.seq_len() {
            return Err(HgnError::SequenceLength { encoded, expected: graph.seq_len() });
        }

        for (node_type, input) in features {
            if self.residual {
                scratch.residual.insert(node_type, input.clone());
            }
            scratch.hidden.insert(node_type, self.feat_drop.forward(input));
        }

        // ── Step 1: per-relation messages ─────────────────────────────────────
        for edges in graph.edge_sets() {
            let mailbox = match edges.kind() {
                RelationKind::TokenUpdate | RelationKind::Suppressed => continue,
                RelationKind::EntityRelation => self.relation_message(edges, &scratch, &token_emb)?,
                RelationKind::AnswerType => {
                    self.attention_message(edges, &scratch, &self.at_trans, &self.at_att)?
                }
                RelationKind::Attention => {
                    self.attention_message(edges, &scratch, &self.node_trans, &self.node_att)?
                }
            };
            tracing::trace!("Message for {} over {} edges", edges.etype(), edges.len());
            scratch.mailboxes.insert(edges.etype().clone(), mailbox);
        }

        // ── Step 2: attention-weighted aggregation ────────────────────────────
        let mut updated: NodeFeatures<B> = BTreeMap::new();
        for edges in graph.edge_sets() {
            let Some(mailbox) = scratch.mailboxes.remove(edges.etype()) else {
                continue;
            };
            let dst_type = edges.etype().dst;
            let reduced = self.aggregate(mailbox, edges.dst(), graph.num_nodes(dst_type))?;
            let summed = match updated.remove(&dst_type) {
                Some(acc) => acc + reduced,
                None      => reduced,
            };
            updated.insert(dst_type, summed);
        }
        scratch.hidden.extend(updated);

        // ── Step 3: recurrent token update ────────────────────────────────────
        self.update_tokens(graph, &mut scratch)?;

        // ── Step 4: residual merge ────────────────────────────────────────────
        let hidden   = std::mem::take(&mut scratch.hidden);
        let residual = std::mem::take(&mut scratch.residual);
        let out = merge_residual(hidden, &residual);
        ensure_features_no_nan("relational layer output", &out)?;

        // ── Step 5: cleanup ───────────────────────────────────────────────────
        scratch.clear();
        Ok((out, scratch))
    }

    /// `m = W h_src`, `e = LeakyReLU(A [W h_src ‖ W h_dst])`.
    fn attention_message(
        &self,
        edges:   &EdgeSet,
        scratch: &LayerScratch<B>,
        trans:   &Linear<B>,
        att:     &Linear<B>,
    ) -> Result<Mailbox<B>, HgnError> {
        let src = scratch.hidden(edges.etype().src)?;
        let dst = scratch.hidden(edges.etype().dst)?;
        let device = src.device();

        let src_proj = trans.forward(src.select(0, index_tensor::<B>(edges.src(), &device)));
        let dst_proj = trans.forward(dst.select(0, index_tensor::<B>(edges.dst(), &device)));
        let logits = leaky_relu(
            att.forward(Tensor::cat(vec![src_proj.clone(), dst_proj], 1)),
            LEAKY_SLOPE,
        );
        Ok(Mailbox { messages: src_proj, logits })
    }

    /// `rel = rel_type · mean(tokens[span])`,
    /// `m = C R [h_src ‖ rel]`, `e = LeakyReLU(A [m ‖ W h_dst])`.
    fn relation_message(
        &self,
        edges:     &EdgeSet,
        scratch:   &LayerScratch<B>,
        token_emb: &Tensor<B, 2>,
    ) -> Result<Mailbox<B>, HgnError> {
        let phrases = edges.phrases().ok_or_else(|| GraphError::MissingRelationFeatures {
            relation: edges.etype().relation.clone(),
            edges:    edges.len(),
        })?;
        let src = scratch.hidden(edges.etype().src)?;
        let dst = scratch.hidden(edges.etype().dst)?;
        let device = src.device();

        let [seq_len, _] = token_emb.dims();
        let rel_emb = phrase_pooling::<B>(phrases, seq_len, &device).matmul(token_emb.clone());
        ensure_no_nan("relation phrase embedding", &rel_emb)?;

        let src = src.select(0, index_tensor::<B>(edges.src(), &device));
        let messages = self
            .common_space_trans
            .forward(self.rel_trans.forward(Tensor::cat(vec![src, rel_emb], 1)));
        let dst_proj = self
            .node_trans
            .forward(dst.select(0, index_tensor::<B>(edges.dst(), &device)));
        let logits = leaky_relu(
            self.node_att.forward(Tensor::cat(vec![messages.clone(), dst_proj], 1)),
            LEAKY_SLOPE,
        );
        Ok(Mailbox { messages, logits })
    }

    /// Edge softmax grouped by destination, then weighted sum.
    ///
    /// The per-destination maximum is subtracted before `exp`; it is a
    /// constant shift per group, so the softmax is unchanged and every
    /// group's largest term is exactly `exp(0) = 1`.
    fn aggregate(
        &self,
        mailbox: Mailbox<B>,
        dst:     &[usize],
        num_dst: usize,
    ) -> Result<Tensor<B, 2>, HgnError> {
        let Mailbox { messages, logits } = mailbox;
        let device = logits.device();
        let [num_edges, width] = logits.dims();

        let values = to_host(logits.clone())?;
        let mut peak = vec![f32::NEG_INFINITY; num_dst * width];
        for (edge, &node) in dst.iter().enumerate() {
            let row = &values[edge * width..(edge + 1) * width];
            for (slot, &v) in peak[node * width..(node + 1) * width].iter_mut().zip(row) {
                if v > *slot {
                    *slot = v;
                }
            }
        }
        let shift: Vec<f32> = dst
            .iter()
            .flat_map(|&node| peak[node * width..(node + 1) * width].iter().copied())
            .collect();
        let shift = Tensor::<B, 1>::from_floats(shift.as_slice(), &device).reshape([num_edges, width]);

        let weights = (logits - shift).exp();
        let totals  = segment_sum(weights.clone(), dst, num_dst)
            .select(0, index_tensor::<B>(dst, &device));
        let alpha = self.attn_drop.forward(weights / totals);

        Ok(segment_sum(alpha * messages, dst, num_dst))
    }

    fn update_tokens(&self, graph: &HeteroGraph, scratch: &mut LayerScratch<B>) -> Result<(), HgnError> {
        let tokens = scratch.hidden(NodeType::Tok)?;
        let [num_tokens, width] = tokens.dims();
        let device = tokens.device();

        for source in [NodeType::Srl, NodeType::Ent] {
            let Some(edges) = graph.token_update_from(source) else {
                continue;
            };
            let src = scratch
                .hidden(source)?
                .select(0, index_tensor::<B>(edges.src(), &device))
                .reshape([edges.len(), 1, width]);
            let dst = tokens.clone().select(0, index_tensor::<B>(edges.dst(), &device));

            // one GRU step per edge: input = source node, hidden = token
            let messages = self
                .gru_node2tok
                .forward(src, Some(dst))
                .reshape([edges.len(), width]);
            let summed = segment_sum(messages, edges.dst(), num_tokens);
            scratch.token_signal.insert(source, summed);
        }

        let initial = scratch
            .token_signal
            .remove(&NodeType::Srl)
            .unwrap_or_else(|| tokens.clone());
        let sequence = match scratch.token_signal.remove(&NodeType::Ent) {
            Some(ent) => Tensor::stack::<3>(vec![ent, tokens], 1),
            None      => tokens.reshape([num_tokens, 1, width]),
        };

        let updated = last_step(self.gru_node2tok.forward(sequence, Some(initial)));
        scratch.hidden.insert(NodeType::Tok, updated);
        Ok(())
    }
}

/// `updated + input` for every type that has a residual; `updated` otherwise.
pub fn merge_residual<B: Backend>(updated: NodeFeatures<B>, residual: &NodeFeatures<B>) -> NodeFeatures<B> {
    updated
        .into_iter()
        .map(|(node_type, h)| match residual.get(&node_type) {
            Some(input) => (node_type, h + input.clone()),
            None        => (node_type, h),
        })
        .collect()
}

/// `[E, seq_len]` matrix whose row `i` averages the tokens of phrase `i`,
/// scaled by its signed relation type.
fn phrase_pooling<B: Backend>(phrases: &RelationPhrases, seq_len: usize, device: &B::Device) -> Tensor<B, 2> {
    let num_edges = phrases.spans.len();
    let mut weights = vec![0.0f32; num_edges * seq_len];
    for (edge, (span, &sign)) in phrases.spans.iter().zip(&phrases.rel_types).enumerate() {
        let w = sign / span.len() as f32;
        for token in span.start..span.end {
            weights[edge * seq_len + token] = w;
        }
    }
    Tensor::<B, 1>::from_floats(weights.as_slice(), device).reshape([num_edges, seq_len])
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;
    use burn::tensor::Distribution;

    use crate::domain::graph::{RawGraph, Span};

    type TestBackend = NdArray;

    const D: usize = 6;

    fn layer(residual: bool) -> HeteroRgcnLayer<TestBackend> {
        HeteroLayerConfig::new(D)
            .with_residual(residual)
            .init(&Default::default())
    }

    fn full_graph() -> HeteroGraph {
        HeteroGraph::try_from(
            RawGraph::new(8)
                .with_token_nodes()
                .with_nodes(NodeType::Sent, vec![(0, 4), (4, 8)], Some(vec![1, 0]))
                .with_nodes(NodeType::Srl, vec![(0, 2), (4, 6), (6, 8)], Some(vec![0, 1, 0]))
                .with_nodes(NodeType::Ent, vec![(1, 2), (5, 7)], Some(vec![1, 0]))
                .with_edges(NodeType::Sent, "sent2sent", NodeType::Sent, &[(0, 1), (1, 0)])
                .with_edges(NodeType::Srl, "srl2sent", NodeType::Sent, &[(0, 0), (1, 1), (2, 1)])
                .with_edges(NodeType::Srl, "srl2srl", NodeType::Srl, &[(1, 2)])
                .with_edges(NodeType::Ent, "ent2srl", NodeType::Srl, &[(0, 0), (1, 2)])
                .with_edges(NodeType::Srl, "srl2tok", NodeType::Tok, &[(0, 0), (0, 1), (1, 4), (2, 6)])
                .with_edges(NodeType::Ent, "ent2tok", NodeType::Tok, &[(0, 1), (1, 5), (1, 6)])
                .with_edges(NodeType::Tok, "tok2sent", NodeType::Sent, &[(0, 0), (7, 1)])
                .with_relation_edges("ent2ent_rel", &[(0, 1), (1, 0)], vec![(2, 4), (2, 4)], vec![1.0, -1.0]),
        )
        .unwrap()
    }

    fn random_features(graph: &HeteroGraph) -> NodeFeatures<TestBackend> {
        let device = Default::default();
        graph
            .node_sets()
            .map(|(t, set)| {
                (t, Tensor::<TestBackend, 2>::random([set.len(), D], Distribution::Normal(0.0, 1.0), &device))
            })
            .collect()
    }

    fn token_emb(graph: &HeteroGraph) -> Tensor<TestBackend, 2> {
        Tensor::random([graph.seq_len(), D], Distribution::Normal(0.0, 1.0), &Default::default())
    }

    #[test]
    fn test_output_shapes_per_type() {
        let graph = full_graph();
        let out = layer(true)
            .forward(&graph, random_features(&graph), token_emb(&graph))
            .unwrap();
        assert_eq!(out[&NodeType::Tok].dims(), [8, D]);
        assert_eq!(out[&NodeType::Sent].dims(), [2, D]);
        assert_eq!(out[&NodeType::Srl].dims(), [3, D]);
        assert_eq!(out[&NodeType::Ent].dims(), [2, D]);
    }

    #[test]
    fn test_scratch_is_clean_after_call() {
        let graph = full_graph();
        let (_, scratch) = layer(true)
            .forward_with_scratch(&graph, random_features(&graph), token_emb(&graph), LayerScratch::default())
            .unwrap();
        assert!(scratch.is_clean());
    }

    #[test]
    fn test_deterministic_without_dropout() {
        // NdArray has no autodiff, so dropout is inactive
        let graph = full_graph();
        let layer = layer(true);
        let features = random_features(&graph);
        let tokens = token_emb(&graph);

        let first  = layer.forward(&graph, features.clone(), tokens.clone()).unwrap();
        let second = layer.forward(&graph, features, tokens).unwrap();
        for (node_type, a) in &first {
            let a = to_host(a.clone()).unwrap();
            let b = to_host(second[node_type].clone()).unwrap();
            assert_eq!(a, b, "{node_type} differs between runs");
        }
    }

    #[test]
    fn test_residual_identity_with_zero_update() {
        let device = Default::default();
        let input: NodeFeatures<TestBackend> = [(
            NodeType::Sent,
            Tensor::<TestBackend, 2>::random([3, D], Distribution::Normal(0.0, 1.0), &device),
        )]
        .into_iter()
        .collect();
        let zero_update: NodeFeatures<TestBackend> =
            [(NodeType::Sent, Tensor::<TestBackend, 2>::zeros([3, D], &device))].into_iter().collect();

        let out = merge_residual(zero_update, &input);
        assert_eq!(
            to_host(out[&NodeType::Sent].clone()).unwrap(),
            to_host(input[&NodeType::Sent].clone()).unwrap(),
        );
    }

    #[test]
    fn test_residual_adds_input() {
        let graph = full_graph();
        let features = random_features(&graph);
        let tokens = token_emb(&graph);

        // same weights, residual toggled
        let with_residual = layer(true);
        let mut without_residual = with_residual.clone();
        without_residual.residual = false;

        let plain = without_residual.forward(&graph, features.clone(), tokens.clone()).unwrap();
        let merged = with_residual.forward(&graph, features.clone(), tokens).unwrap();

        for (node_type, input) in &features {
            let expected = to_host(plain[node_type].clone() + input.clone()).unwrap();
            let actual = to_host(merged[node_type].clone()).unwrap();
            for (e, a) in expected.iter().zip(&actual) {
                assert!((e - a).abs() < 1e-5, "{node_type}: {e} vs {a}");
            }
        }
    }

    #[test]
    fn test_graph_without_srl_or_entities() {
        let graph = HeteroGraph::try_from(
            RawGraph::new(4)
                .with_token_nodes()
                .with_nodes(NodeType::Sent, vec![(0, 2), (2, 4)], None)
                .with_edges(NodeType::Sent, "sent2sent", NodeType::Sent, &[(0, 1)]),
        )
        .unwrap();
        let out = layer(false)
            .forward(&graph, random_features(&graph), token_emb(&graph))
            .unwrap();
        assert_eq!(out[&NodeType::Tok].dims(), [4, D]);
        // sentence 0 has no in-edges: its aggregated state is zero
        let sent = to_host(out[&NodeType::Sent].clone()).unwrap();
        assert!(sent[..D].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_single_in_edge_passes_message_through() {
        // with one in-edge per node, softmax weight is exactly 1
        let graph = HeteroGraph::try_from(
            RawGraph::new(2)
                .with_token_nodes()
                .with_nodes(NodeType::Sent, vec![(0, 1), (1, 2)], None)
                .with_edges(NodeType::Sent, "sent2sent", NodeType::Sent, &[(0, 1), (1, 0)]),
        )
        .unwrap();
        let layer = layer(false);
        let features = random_features(&graph);
        let expected = layer.node_trans.forward(features[&NodeType::Sent].clone());

        let out = layer.forward(&graph, features, token_emb(&graph)).unwrap();
        let expected = to_host(expected).unwrap();
        let actual = to_host(out[&NodeType::Sent].clone()).unwrap();
        // node 0 receives node 1's projection and vice versa
        for f in 0..D {
            assert!((actual[f] - expected[D + f]).abs() < 1e-5);
            assert!((actual[D + f] - expected[f]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_answer_type_uses_its_own_projection() {
        let graph = HeteroGraph::try_from(
            RawGraph::new(3)
                .with_token_nodes()
                .with_nodes(NodeType::Sent, vec![(0, 3)], None)
                .with_nodes(NodeType::AnswerType, vec![(0, 1)], None)
                .with_edges(NodeType::Sent, "sent2at", NodeType::AnswerType, &[(0, 0)]),
        )
        .unwrap();
        let layer = layer(false);
        let features = random_features(&graph);
        let expected = to_host(layer.at_trans.forward(features[&NodeType::Sent].clone())).unwrap();

        let out = layer.forward(&graph, features, token_emb(&graph)).unwrap();
        let actual = to_host(out[&NodeType::AnswerType].clone()).unwrap();
        for (e, a) in expected.iter().zip(&actual) {
            assert!((e - a).abs() < 1e-5);
        }
    }

    #[test]
    fn test_large_logits_stay_finite() {
        let graph = full_graph();
        let device = Default::default();
        let features: NodeFeatures<TestBackend> = graph
            .node_sets()
            .map(|(t, set)| (t, Tensor::<TestBackend, 2>::ones([set.len(), D], &device).mul_scalar(1.0e4)))
            .collect();
        assert!(layer(false).forward(&graph, features, token_emb(&graph)).is_ok());
    }

    #[test]
    fn test_nan_input_is_fatal() {
        let graph = full_graph();
        let mut features = random_features(&graph);
        let device = Default::default();
        features.insert(NodeType::Sent, Tensor::<TestBackend, 2>::full([2, D], f32::NAN, &device));
        let err = layer(false)
            .forward(&graph, features, token_emb(&graph))
            .unwrap_err();
        assert!(matches!(err, HgnError::NumericalInstability { .. }));
    }

    #[test]
    fn test_missing_features_reported() {
        let graph = full_graph();
        let mut features = random_features(&graph);
        features.remove(&NodeType::Srl);
        let err = layer(false)
            .forward(&graph, features, token_emb(&graph))
            .unwrap_err();
        assert!(matches!(err, HgnError::MissingFeatures { node_type: NodeType::Srl }));
    }

    #[test]
    fn test_attention_dropout_only_in_training() {
        type TrainBackend = Autodiff<NdArray>;
        let device = Default::default();
        let graph = full_graph();

        let dropping: HeteroRgcnLayer<TrainBackend> =
            HeteroLayerConfig::new(D).with_attn_drop(0.5).init(&device);
        let mut keeping = dropping.clone();
        keeping.attn_drop = DropoutConfig::new(0.0).init();

        let features: NodeFeatures<TrainBackend> = graph
            .node_sets()
            .map(|(t, set)| {
                (t, Tensor::<TrainBackend, 2>::random([set.len(), D], Distribution::Normal(0.0, 1.0), &device))
            })
            .collect();
        let tokens = Tensor::<TrainBackend, 2>::random([graph.seq_len(), D], Distribution::Normal(0.0, 1.0), &device);

        let dropped = dropping.forward(&graph, features.clone(), tokens.clone()).unwrap();
        let kept = keeping.forward(&graph, features.clone(), tokens.clone()).unwrap();
        assert_ne!(
            to_host(dropped[&NodeType::Sent].clone()).unwrap(),
            to_host(kept[&NodeType::Sent].clone()).unwrap(),
        );

        // without autodiff the same weights ignore the dropout rate
        let inner: NodeFeatures<TestBackend> = features.into_iter().map(|(t, f)| (t, f.inner())).collect();
        let dropped = dropping.valid().forward(&graph, inner.clone(), tokens.clone().inner()).unwrap();
        let kept = keeping.valid().forward(&graph, inner, tokens.inner()).unwrap();
        assert_eq!(
            to_host(dropped[&NodeType::Sent].clone()).unwrap(),
            to_host(kept[&NodeType::Sent].clone()).unwrap(),
        );
    }

    #[test]
    fn test_phrase_pooling_signed_mean() {
        let device = Default::default();
        let phrases = RelationPhrases { spans: vec![Span::new(1, 3)], rel_types: vec![-1.0] };
        let tokens = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0, 4.0, 8.0], &device).reshape([4, 1]);
        let pooled = phrase_pooling::<TestBackend>(&phrases, 4, &device).matmul(tokens);
        assert_eq!(to_host(pooled).unwrap(), vec![-3.0]);
    }
}
