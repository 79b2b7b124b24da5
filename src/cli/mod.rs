// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses command line arguments with `clap` and delegates all
// work to Layer 2 (application).
//
//   1. `init`    — build a model from a config, save checkpoint 0
//   2. `predict` — run a checkpoint over pre-built graph samples
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InitArgs, PredictArgs};

#[derive(Parser, Debug)]
#[command(
    name = "hgn-qa",
    version = "0.1.0",
    about = "Hierarchical graph network for multi-hop question answering."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Init(args)    => run_init(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    use crate::application::init_use_case::InitUseCase;

    let checkpoint_dir = args.checkpoint_dir.clone();
    let cfg = InitUseCase::new(args.into()).execute()?;

    println!(
        "Initialised model (d_model={}, {} encoder layers). Checkpoint saved to '{}'.",
        cfg.encoder.d_model, cfg.encoder.num_layers, checkpoint_dir
    );
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    tracing::info!("Predicting samples from: {}", args.samples);

    let output = args.output.clone();
    let report = PredictUseCase::new(args.into()).execute()?;

    println!("Wrote {} predictions to '{}'.", report.len(), output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_predict() {
        let cli = Cli::try_parse_from([
            "hgn-qa", "predict", "--samples", "dev.jsonl", "--tokenizer", "tok.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Predict(args) => {
                assert_eq!(args.samples, "dev.jsonl");
                assert_eq!(args.tokenizer.as_deref(), Some("tok.json"));
                assert_eq!(args.checkpoint_dir, "checkpoints");
            }
            other => panic!("expected predict, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_init_flags() {
        let cli = Cli::try_parse_from(["hgn-qa", "init", "--d-model", "256", "--no-residual"]).unwrap();
        let Commands::Init(args) = cli.command else {
            panic!("expected init");
        };
        let cfg: crate::application::init_use_case::InitConfig = args.into();
        assert_eq!(cfg.d_model, 256);
        assert!(!cfg.residual);
    }
}
