// ============================================================
// Layer 5 — Encoder Adapter
// ============================================================
// The graph network only needs "one contextual vector per
// token". Anything that provides that implements
// SequenceEncoder; the graph side never looks inside.
//
// TransformerEncoder is the built-in implementation, shaped
// like BERT:
//   • token + position + token-type embeddings
//   • N encoder blocks (self-attention + GELU FFN, post-norm)
//   • padding positions masked out of attention
//
// Its width (d_model) fixes the width of the whole graph
// network — 768 for base-sized encoders, 1024 for large.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::data::batcher::InputLimits;

/// Anything that turns packed token ids into contextual embeddings.
pub trait SequenceEncoder<B: Backend> {
    /// Embedding width of every output position.
    fn width(&self) -> usize;

    /// `[batch, seq_len]` ids, mask and segment ids → `[batch, seq_len, width]`.
    fn encode(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        token_type_ids: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3>;
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct EncoderConfig {
    #[config(default = 30522)]
    pub vocab_size:      usize,
    #[config(default = 2)]
    pub type_vocab_size: usize,
    #[config(default = 512)]
    pub max_seq_len:     usize,
    #[config(default = 768)]
    pub d_model:         usize,
    #[config(default = 12)]
    pub num_heads:       usize,
    #[config(default = 12)]
    pub num_layers:      usize,
    #[config(default = 3072)]
    pub d_ff:            usize,
    #[config(default = 0.1)]
    pub dropout:         f64,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerEncoder<B> {
        let token_embedding      = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding   = EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device);
        let token_type_embedding = EmbeddingConfig::new(self.type_vocab_size, self.d_model).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        TransformerEncoder {
            token_embedding, position_embedding, token_type_embedding,
            layers, final_norm, dropout,
            d_model: self.d_model,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask` is true at padding positions.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_input  = MhaInput::self_attn(x.clone()).mask_pad(pad_mask);
        let attn_output = self.self_attn.forward(attn_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct TransformerEncoder<B: Backend> {
    pub token_embedding:      Embedding<B>,
    pub position_embedding:   Embedding<B>,
    pub token_type_embedding: Embedding<B>,
    pub layers:               Vec<EncoderBlock<B>>,
    pub final_norm:           LayerNorm<B>,
    pub dropout:              Dropout,
    pub d_model:              usize,
}

impl<B: Backend> TransformerEncoder<B> {
    /// Table sizes read off the embedding weights, so they always match
    /// the loaded checkpoint.
    pub fn input_limits(&self) -> InputLimits {
        let [max_seq_len, _]     = self.position_embedding.weight.dims();
        let [vocab_size, _]      = self.token_embedding.weight.dims();
        let [type_vocab_size, _] = self.token_type_embedding.weight.dims();
        InputLimits { max_seq_len, vocab_size, type_vocab_size }
    }

    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        token_type_ids: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();

        let tok_emb  = self.token_embedding.forward(input_ids);
        let type_emb = self.token_type_embedding.forward(token_type_ids);

        // Self-attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let pad_mask = attention_mask.equal_elem(0);

        let mut x = self.dropout.forward(tok_emb + pos_emb + type_emb);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        self.final_norm.forward(x)
    }
}

impl<B: Backend> SequenceEncoder<B> for TransformerEncoder<B> {
    fn width(&self) -> usize {
        self.d_model
    }

    fn encode(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        token_type_ids: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        self.forward(input_ids, attention_mask, token_type_ids)
    }
}
