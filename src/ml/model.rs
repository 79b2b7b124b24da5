// ============================================================
// Layer 5 — Hierarchical Graph Network
// ============================================================
// Full forward pass for one sample:
//
//   ids ──▶ encoder ──▶ [1, L, d]
//                           │
//              ┌────────────┤
//              ▼            │
//   InitialNodeEmbedder     │ (token states, also used for
//              │            │  relation phrases)
//      (training: sample nodes per type, sent → srl → ent)
//              ▼            ▼
//         HeteroRgcn ◀──────┘
//              │
//   ┌──────────┼───────────────┐
//   ▼          ▼               ▼
//  node     classifiers      final token states
//  types    on [post ‖ pre]  └──▶ SpanPredictor
//
// Training mode draws balanced node subsets from the caller's
// BalancedSampler and attaches a weighted loss per task.
// Eval mode classifies every node and attaches no node loss.
// Node types absent from the graph, or with an empty sample,
// are simply missing from the output.
//
// Reference: Fang et al. (2020) Hierarchical Graph Network
//            for Multi-hop Question Answering

use std::collections::BTreeMap;

use burn::{prelude::*, tensor::activation::softmax};

use crate::data::batcher::GraphBatch;
use crate::data::sampler::BalancedSampler;
use crate::domain::error::HgnError;
use crate::domain::graph::{HeteroGraph, NodeType};
use crate::ml::embedder::{InitialNodeEmbedder, NodeEmbedderConfig};
use crate::ml::encoder::{EncoderConfig, SequenceEncoder, TransformerEncoder};
use crate::ml::gnn::{HeteroRgcn, HeteroRgcnConfig};
use crate::ml::guard::{ensure_features_no_nan, ensure_no_nan};
use crate::ml::heads::{
    LabelSmoothingLoss, NodeClassifier, NodeClassifierConfig, SpanOutput, SpanPredictor,
    SpanPredictorConfig, NUM_CLASSES,
};
use crate::ml::ops::index_tensor;
use crate::ml::relational::NodeFeatures;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct HgnConfig {
    pub encoder: EncoderConfig,
    #[config(default = 0.1)]
    pub feat_drop: f64,
    #[config(default = 0.1)]
    pub attn_drop: f64,
    #[config(default = true)]
    pub residual: bool,
    #[config(default = 768)]
    pub classifier_hidden: usize,
    #[config(default = 1.0)]
    pub weight_sent_loss: f64,
    #[config(default = 1.0)]
    pub weight_srl_loss: f64,
    #[config(default = 1.0)]
    pub weight_ent_loss: f64,
    #[config(default = 2.0)]
    pub weight_span_loss: f64,
    #[config(default = 0.1)]
    pub label_smoothing: f64,
}

impl HgnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> HgnModel<B> {
        let d = self.encoder.d_model;
        let classifier = NodeClassifierConfig::new(d, self.classifier_hidden);
        HgnModel {
            encoder:  self.encoder.init(device),
            embedder: NodeEmbedderConfig::new(d).init(device),
            rgcn: HeteroRgcnConfig::new(d)
                .with_feat_drop(self.feat_drop)
                .with_attn_drop(self.attn_drop)
                .with_residual(self.residual)
                .init(device),
            sent_classifier: classifier.init(device),
            srl_classifier:  classifier.init(device),
            ent_classifier:  classifier.init(device),
            span:            SpanPredictorConfig::new(d).init(device),
            weight_sent_loss: self.weight_sent_loss,
            weight_srl_loss:  self.weight_srl_loss,
            weight_ent_loss:  self.weight_ent_loss,
            weight_span_loss: self.weight_span_loss,
            label_smoothing:  self.label_smoothing,
        }
    }
}

#[derive(Module, Debug)]
pub struct HgnModel<B: Backend> {
    pub encoder:         TransformerEncoder<B>,
    pub embedder:        InitialNodeEmbedder<B>,
    pub rgcn:            HeteroRgcn<B>,
    pub sent_classifier: NodeClassifier<B>,
    pub srl_classifier:  NodeClassifier<B>,
    pub ent_classifier:  NodeClassifier<B>,
    pub span:            SpanPredictor<B>,
    pub weight_sent_loss: f64,
    pub weight_srl_loss:  f64,
    pub weight_ent_loss:  f64,
    pub weight_span_loss: f64,
    pub label_smoothing:  f64,
}

/// Whether a forward call samples and scores nodes against their labels.
pub enum ForwardMode<'a> {
    Train(&'a mut BalancedSampler),
    Eval,
}

impl ForwardMode<'_> {
    pub fn is_train(&self) -> bool {
        matches!(self, ForwardMode::Train(_))
    }
}

/// Classifier result for one node type.
#[derive(Debug, Clone)]
pub struct NodeTaskOutput<B: Backend> {
    /// Node indices that were classified, ascending
    pub indices: Vec<usize>,
    /// `[indices.len(), 2]`
    pub logits:  Tensor<B, 2>,
    /// Softmax of `logits`; column 1 is the support probability
    pub probs:   Tensor<B, 2>,
    /// Weighted label-smoothing loss, training mode only
    pub loss:    Option<Tensor<B, 1>>,
}

#[derive(Debug, Clone)]
pub struct HgnOutput<B: Backend> {
    pub nodes: BTreeMap<NodeType, NodeTaskOutput<B>>,
    pub span:  SpanOutput<B>,
    /// Weighted sum of every loss that could be computed
    pub loss:  Option<Tensor<B, 1>>,
}

impl<B: Backend> HgnModel<B> {
    pub fn forward(&self, batch: &GraphBatch<B>, mode: ForwardMode<'_>) -> Result<HgnOutput<B>, HgnError> {
        let sequence = self.encoder.encode(
            batch.input_ids.clone(),
            batch.attention_mask.clone(),
            batch.token_type_ids.clone(),
        );
        self.forward_encoded(&batch.graph, sequence, batch.start_position, batch.end_position, mode)
    }

    /// Runs everything after the encoder on a precomputed `[1, L, d]` sequence.
    pub fn forward_encoded(
        &self,
        graph:          &HeteroGraph,
        sequence:       Tensor<B, 3>,
        start_position: Option<i64>,
        end_position:   Option<i64>,
        mode:           ForwardMode<'_>,
    ) -> Result<HgnOutput<B>, HgnError> {
        let [_, encoded, _] = sequence.dims();
        if encoded != graph.seq_len() {
            return Err(HgnError::SequenceLength { encoded, expected: graph.seq_len() });
        }
        ensure_no_nan("encoder output", &sequence)?;

        let (nodes, tokens) = self.graph_forward(graph, sequence, mode)?;

        let span = self.span.forward(tokens, start_position, end_position)?;
        ensure_no_nan("start logits", &span.start_logits)?;
        ensure_no_nan("end logits", &span.end_logits)?;

        let loss = nodes
            .values()
            .filter_map(|task| task.loss.clone())
            .chain(span.loss.clone().map(|l| l.mul_scalar(self.weight_span_loss)))
            .reduce(|acc, l| acc + l);

        Ok(HgnOutput { nodes, span, loss })
    }

    /// Node classification over the graph; also returns the final `[L, d]` token states.
    pub fn graph_forward(
        &self,
        graph:    &HeteroGraph,
        sequence: Tensor<B, 3>,
        mut mode: ForwardMode<'_>,
    ) -> Result<(BTreeMap<NodeType, NodeTaskOutput<B>>, Tensor<B, 2>), HgnError> {
        let [_, seq_len, width] = sequence.dims();

        let initial = self.embedder.forward(graph, sequence.clone());
        ensure_features_no_nan("initial node embedding", &initial)?;

        // sampling happens before message passing, in a fixed type order
        let mut selections: Vec<(NodeType, Vec<usize>)> = Vec::new();
        for node_type in NodeType::CLASSIFIED {
            let Some(nodes) = graph.node_set(node_type) else {
                continue;
            };
            let picked = match &mut mode {
                ForwardMode::Train(sampler) => {
                    let labels = nodes.labels().ok_or(HgnError::MissingLabels { node_type })?;
                    sampler.sample(labels)
                }
                ForwardMode::Eval => (0..nodes.len()).collect(),
            };
            if picked.is_empty() {
                tracing::debug!("No {} nodes selected, skipping task", node_type);
                continue;
            }
            selections.push((node_type, picked));
        }

        let updated = self
            .rgcn
            .forward(graph, initial.clone(), sequence.reshape([seq_len, width]))?;

        let mut tasks = BTreeMap::new();
        for (node_type, indices) in selections {
            let task = self.classify(graph, node_type, indices, &updated, &initial, mode.is_train())?;
            tasks.insert(node_type, task);
        }

        let tokens = updated
            .get(&NodeType::Tok)
            .cloned()
            .ok_or(HgnError::MissingFeatures { node_type: NodeType::Tok })?;
        Ok((tasks, tokens))
    }

    fn classify(
        &self,
        graph:     &HeteroGraph,
        node_type: NodeType,
        indices:   Vec<usize>,
        updated:   &NodeFeatures<B>,
        initial:   &NodeFeatures<B>,
        train:     bool,
    ) -> Result<NodeTaskOutput<B>, HgnError> {
        let (classifier, weight) = match node_type {
            NodeType::Sent => (&self.sent_classifier, self.weight_sent_loss),
            NodeType::Srl  => (&self.srl_classifier, self.weight_srl_loss),
            NodeType::Ent  => (&self.ent_classifier, self.weight_ent_loss),
            NodeType::Tok | NodeType::AnswerType | NodeType::Query => return Err(HgnError::NoClassifier { node_type }),
        };
        let post = updated.get(&node_type).cloned().ok_or(HgnError::MissingFeatures { node_type })?;
        let pre  = initial.get(&node_type).cloned().ok_or(HgnError::MissingFeatures { node_type })?;
        let rows = index_tensor::<B>(&indices, &post.device());

        let logits = classifier.forward(post.select(0, rows.clone()), pre.select(0, rows));
        ensure_no_nan(&format!("{node_type} logits"), &logits)?;
        let probs = softmax(logits.clone(), 1);

        let loss = if train {
            let labels = graph
                .node_set(node_type)
                .and_then(|nodes| nodes.labels())
                .ok_or(HgnError::MissingLabels { node_type })?;
            let picked: Vec<u8> = indices.iter().map(|&i| labels[i]).collect();
            let loss = LabelSmoothingLoss::new(NUM_CLASSES, self.label_smoothing)
                .forward(logits.clone(), &picked)
                .mul_scalar(weight);
            Some(loss)
        } else {
            None
        };

        Ok(NodeTaskOutput { indices, logits, probs, loss })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::Distribution;

    use crate::data::batcher::GraphBatcher;
    use crate::domain::graph::RawGraph;
    use crate::domain::sample::GraphSample;
    use crate::ml::ops::to_host;

    type TestBackend = NdArray;

    const D: usize = 8;

    fn tiny_config() -> HgnConfig {
        HgnConfig::new(
            EncoderConfig::new()
                .with_vocab_size(64)
                .with_max_seq_len(32)
                .with_d_model(D)
                .with_num_heads(2)
                .with_num_layers(1)
                .with_d_ff(16),
        )
        .with_classifier_hidden(16)
    }

    fn model() -> HgnModel<TestBackend> {
        tiny_config().init(&Default::default())
    }

    /// 3 sentences labelled [1, 0, 0], 2 entities labelled [0, 1], no SRL.
    fn question_graph() -> RawGraph {
        RawGraph::new(10)
            .with_token_nodes()
            .with_nodes(NodeType::Sent, vec![(0, 3), (3, 6), (6, 10)], Some(vec![1, 0, 0]))
            .with_nodes(NodeType::Ent, vec![(1, 2), (7, 9)], Some(vec![0, 1]))
            .with_edges(NodeType::Sent, "sent2sent", NodeType::Sent, &[(0, 1), (1, 2), (2, 0)])
            .with_edges(NodeType::Ent, "ent2sent", NodeType::Sent, &[(0, 0), (1, 2)])
            .with_edges(NodeType::Ent, "ent2tok", NodeType::Tok, &[(0, 1), (1, 7), (1, 8)])
            .with_relation_edges("ent2ent_rel", &[(0, 1)], vec![(3, 5)], vec![1.0])
    }

    fn encoded() -> Tensor<TestBackend, 3> {
        Tensor::random([1, 10, D], Distribution::Normal(0.0, 1.0), &Default::default())
    }

    fn assert_finite(t: Tensor<TestBackend, 2>) {
        assert!(to_host(t).unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_training_forward_samples_balanced_nodes() {
        let graph = HeteroGraph::try_from(question_graph()).unwrap();
        let mut sampler = BalancedSampler::from_seed(11);
        let out = model()
            .forward_encoded(&graph, encoded(), Some(4), Some(5), ForwardMode::Train(&mut sampler))
            .unwrap();

        let sent = &out.nodes[&NodeType::Sent];
        assert_eq!(sent.indices.len(), 2);
        assert!(sent.indices.contains(&0));
        assert_eq!(sent.probs.dims(), [2, 2]);

        let ent = &out.nodes[&NodeType::Ent];
        assert_eq!(ent.indices, vec![0, 1]);

        assert!(!out.nodes.contains_key(&NodeType::Srl));
        assert!(sent.loss.is_some() && ent.loss.is_some());

        assert_finite(sent.probs.clone());
        assert_finite(ent.probs.clone());
        assert_finite(out.span.start_logits.clone());
        assert_finite(out.span.end_logits.clone());
        let loss = to_host(out.loss.unwrap()).unwrap();
        assert!(loss[0].is_finite() && loss[0] > 0.0);
    }

    #[test]
    fn test_eval_classifies_every_node() {
        let graph = HeteroGraph::try_from(question_graph()).unwrap();
        let out = model()
            .forward_encoded(&graph, encoded(), None, None, ForwardMode::Eval)
            .unwrap();

        assert_eq!(out.nodes[&NodeType::Sent].indices, vec![0, 1, 2]);
        assert_eq!(out.nodes[&NodeType::Ent].indices, vec![0, 1]);
        assert!(out.nodes.values().all(|task| task.loss.is_none()));
        assert!(out.span.loss.is_none());
        assert!(out.loss.is_none());
        assert_eq!(out.span.start_logits.dims(), [1, 10]);

        // probabilities sum to one per node
        let probs = to_host(out.nodes[&NodeType::Sent].probs.clone()).unwrap();
        for row in probs.chunks(2) {
            assert!((row[0] + row[1] - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_no_positive_labels_skips_task() {
        let raw = RawGraph::new(4)
            .with_token_nodes()
            .with_nodes(NodeType::Sent, vec![(0, 2), (2, 4)], Some(vec![1, 0]))
            .with_nodes(NodeType::Srl, vec![(0, 1), (1, 3)], Some(vec![0, 0]));
        let graph = HeteroGraph::try_from(raw).unwrap();
        let sequence = Tensor::random([1, 4, D], Distribution::Normal(0.0, 1.0), &Default::default());

        let mut sampler = BalancedSampler::from_seed(5);
        let out = model()
            .forward_encoded(&graph, sequence, Some(-1), Some(-1), ForwardMode::Train(&mut sampler))
            .unwrap();
        assert!(out.nodes.contains_key(&NodeType::Sent));
        assert!(!out.nodes.contains_key(&NodeType::Srl));
        assert!(out.span.loss.is_none());
    }

    #[test]
    fn test_training_needs_labels() {
        let raw = RawGraph::new(3)
            .with_token_nodes()
            .with_nodes(NodeType::Sent, vec![(0, 3)], None);
        let graph = HeteroGraph::try_from(raw).unwrap();
        let sequence = Tensor::random([1, 3, D], Distribution::Normal(0.0, 1.0), &Default::default());

        let mut sampler = BalancedSampler::from_seed(5);
        let err = model()
            .forward_encoded(&graph, sequence, None, None, ForwardMode::Train(&mut sampler))
            .unwrap_err();
        assert!(matches!(err, HgnError::MissingLabels { node_type: NodeType::Sent }));
    }

    #[test]
    fn test_sequence_must_match_graph() {
        let graph = HeteroGraph::try_from(question_graph()).unwrap();
        let short = Tensor::random([1, 7, D], Distribution::Normal(0.0, 1.0), &Default::default());
        let err = model()
            .forward_encoded(&graph, short, None, None, ForwardMode::Eval)
            .unwrap_err();
        assert!(matches!(err, HgnError::SequenceLength { encoded: 7, expected: 10 }));
    }

    #[test]
    fn test_nan_encoder_output_is_fatal() {
        let graph = HeteroGraph::try_from(question_graph()).unwrap();
        let poisoned = Tensor::full([1, 10, D], f32::NAN, &Default::default());
        let err = model()
            .forward_encoded(&graph, poisoned, None, None, ForwardMode::Eval)
            .unwrap_err();
        assert!(matches!(err, HgnError::NumericalInstability { .. }));
    }

    #[test]
    fn test_full_forward_from_token_ids() {
        let sample = GraphSample {
            id:             "q".into(),
            input_ids:      vec![2, 11, 12, 3, 20, 21, 22, 23, 24, 3],
            attention_mask: vec![1; 10],
            token_type_ids: vec![0, 0, 0, 0, 1, 1, 1, 1, 1, 1],
            graph:          question_graph(),
            start_position: Some(5),
            end_position:   Some(6),
            sentence_refs:  Vec::new(),
        };
        let model = model();
        let batch = GraphBatcher::<TestBackend>::new(Default::default(), model.encoder.input_limits())
            .batch(&sample)
            .unwrap();
        let out = model.forward(&batch, ForwardMode::Eval).unwrap();
        assert_eq!(out.span.end_logits.dims(), [1, 10]);
        assert!(out.span.loss.is_some());
        assert_eq!(out.nodes[&NodeType::Sent].probs.dims(), [3, 2]);
    }

    #[test]
    fn test_same_seed_same_selection() {
        let graph = HeteroGraph::try_from(question_graph()).unwrap();
        let model = model();
        let sequence = encoded();

        let mut a = BalancedSampler::from_seed(99);
        let mut b = BalancedSampler::from_seed(99);
        let first = model
            .forward_encoded(&graph, sequence.clone(), None, None, ForwardMode::Train(&mut a))
            .unwrap();
        let second = model
            .forward_encoded(&graph, sequence, None, None, ForwardMode::Train(&mut b))
            .unwrap();
        assert_eq!(first.nodes[&NodeType::Sent].indices, second.nodes[&NodeType::Sent].indices);
    }

    #[test]
    fn test_training_loss_reaches_attention_weights() {
        type TrainBackend = Autodiff<NdArray>;
        let device = Default::default();
        let model: HgnModel<TrainBackend> = tiny_config().init(&device);
        let graph = HeteroGraph::try_from(question_graph()).unwrap();
        let sequence = Tensor::<TrainBackend, 3>::random([1, 10, D], Distribution::Normal(0.0, 1.0), &device);

        let mut sampler = BalancedSampler::from_seed(3);
        let out = model
            .forward_encoded(&graph, sequence, Some(4), Some(5), ForwardMode::Train(&mut sampler))
            .unwrap();
        let loss = out.loss.unwrap();
        assert!(to_host(loss.clone()).unwrap()[0].is_finite());

        let grads = loss.backward();
        let grad = model.rgcn.layer1.node_att.weight.grad(&grads).unwrap();
        assert!(to_host(grad.abs()).unwrap().iter().any(|&g| g > 0.0));
    }

    #[test]
    fn test_tokens_have_no_node_classifier() {
        let graph = HeteroGraph::try_from(question_graph()).unwrap();
        let features: NodeFeatures<TestBackend> =
            [(NodeType::Tok, Tensor::<TestBackend, 2>::zeros([10, D], &Default::default()))].into_iter().collect();
        let err = model()
            .classify(&graph, NodeType::Tok, vec![0, 1], &features, &features, false)
            .unwrap_err();
        assert!(matches!(err, HgnError::NoClassifier { node_type: NodeType::Tok }));
    }
}
