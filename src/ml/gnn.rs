// ============================================================
// Layer 5 — Two-Layer Graph Network
// ============================================================
//   features₀ ──layer1──▶ features₁ ──LeakyReLU──▶ layer2 ──▶ features₂
//
// Tokens get one more recurrent pass across the layer outputs:
//   sequence [tok₁, tok₂] (tok₁ taken before the activation),
//   initial state tok₀, keep the last step.

use burn::{
    nn::gru::Gru,
    prelude::*,
    tensor::activation::leaky_relu,
};

use crate::domain::error::HgnError;
use crate::domain::graph::{HeteroGraph, NodeType};
use crate::ml::guard::{ensure_features_no_nan, ensure_no_nan};
use crate::ml::ops::{last_step, recurrent_cell, LEAKY_SLOPE};
use crate::ml::relational::{HeteroLayerConfig, HeteroRgcnLayer, NodeFeatures};

#[derive(Config, Debug)]
pub struct HeteroRgcnConfig {
    pub d_model: usize,
    #[config(default = 0.0)]
    pub feat_drop: f64,
    #[config(default = 0.0)]
    pub attn_drop: f64,
    #[config(default = false)]
    pub residual: bool,
}

impl HeteroRgcnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> HeteroRgcn<B> {
        let layer = HeteroLayerConfig::new(self.d_model)
            .with_feat_drop(self.feat_drop)
            .with_attn_drop(self.attn_drop)
            .with_residual(self.residual);
        HeteroRgcn {
            layer1:        layer.init(device),
            layer2:        layer.init(device),
            gru_layer_lvl: recurrent_cell(self.d_model, device),
        }
    }
}

#[derive(Module, Debug)]
pub struct HeteroRgcn<B: Backend> {
    pub layer1:        HeteroRgcnLayer<B>,
    pub layer2:        HeteroRgcnLayer<B>,
    pub gru_layer_lvl: Gru<B>,
}

impl<B: Backend> HeteroRgcn<B> {
    pub fn forward(
        &self,
        graph:     &HeteroGraph,
        features:  NodeFeatures<B>,
        token_emb: Tensor<B, 2>,
    ) -> Result<NodeFeatures<B>, HgnError> {
        let tok0 = features
            .get(&NodeType::Tok)
            .cloned()
            .ok_or(HgnError::MissingFeatures { node_type: NodeType::Tok })?;

        let hidden = self.layer1.forward(graph, features, token_emb.clone())?;
        let tok1 = hidden
            .get(&NodeType::Tok)
            .cloned()
            .ok_or(HgnError::MissingFeatures { node_type: NodeType::Tok })?;
        let hidden: NodeFeatures<B> = hidden
            .into_iter()
            .map(|(t, h)| (t, leaky_relu(h, LEAKY_SLOPE)))
            .collect();

        let mut out = self.layer2.forward(graph, hidden, token_emb)?;
        let tok2 = out
            .remove(&NodeType::Tok)
            .ok_or(HgnError::MissingFeatures { node_type: NodeType::Tok })?;

        let levels = Tensor::stack::<3>(vec![tok1, tok2], 1);
        let tokens = last_step(self.gru_layer_lvl.forward(levels, Some(tok0)));
        ensure_no_nan("layer-level token GRU", &tokens)?;
        out.insert(NodeType::Tok, tokens);

        ensure_features_no_nan("graph network output", &out)?;
        Ok(out)
    }
}
