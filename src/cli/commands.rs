// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `init` and `predict`, and
// all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::init_use_case::InitConfig;
use crate::application::predict_use_case::PredictConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a freshly initialised model and save it as checkpoint 0
    Init(InitArgs),

    /// Predict answers and supporting facts for pre-built graph samples
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to save the config and checkpoint into
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Use this hgn_config.json instead of the flags below
    #[arg(long)]
    pub config: Option<String>,

    /// Total number of unique tokens the encoder can embed
    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    /// Longest packed sequence the encoder accepts
    #[arg(long, default_value_t = 512)]
    pub max_seq_len: usize,

    /// Width of every token and node embedding
    #[arg(long, default_value_t = 768)]
    pub d_model: usize,

    /// Attention heads per encoder block; must divide d_model
    #[arg(long, default_value_t = 12)]
    pub num_heads: usize,

    /// Stacked encoder blocks
    #[arg(long, default_value_t = 12)]
    pub num_layers: usize,

    /// Inner width of the encoder feed-forward network
    #[arg(long, default_value_t = 3072)]
    pub d_ff: usize,

    /// Encoder dropout probability
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Dropout on node features entering each graph layer
    #[arg(long, default_value_t = 0.1)]
    pub feat_drop: f64,

    /// Dropout on edge attention weights
    #[arg(long, default_value_t = 0.1)]
    pub attn_drop: f64,

    /// Disable the residual connection around each graph layer
    #[arg(long)]
    pub no_residual: bool,

    /// Hidden width of the support classifiers
    #[arg(long, default_value_t = 768)]
    pub classifier_hidden: usize,
}

impl From<InitArgs> for InitConfig {
    fn from(a: InitArgs) -> Self {
        InitConfig {
            checkpoint_dir:    a.checkpoint_dir,
            config_path:       a.config,
            vocab_size:        a.vocab_size,
            max_seq_len:       a.max_seq_len,
            d_model:           a.d_model,
            num_heads:         a.num_heads,
            num_layers:        a.num_layers,
            d_ff:              a.d_ff,
            dropout:           a.dropout,
            feat_drop:         a.feat_drop,
            attn_drop:         a.attn_drop,
            residual:          !a.no_residual,
            classifier_hidden: a.classifier_hidden,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// JSON-lines file (or directory) of graph samples
    #[arg(long)]
    pub samples: String,

    /// Directory holding hgn_config.json and the checkpoints
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// tokenizer.json used to decode answer spans
    #[arg(long)]
    pub tokenizer: Option<String>,

    /// Where to write the prediction report
    #[arg(long, default_value = "predictions.json")]
    pub output: String,
}

impl From<PredictArgs> for PredictConfig {
    fn from(a: PredictArgs) -> Self {
        PredictConfig {
            checkpoint_dir: a.checkpoint_dir,
            samples:        a.samples,
            tokenizer:      a.tokenizer,
            output:         a.output,
        }
    }
}
