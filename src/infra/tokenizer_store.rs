// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads the HuggingFace tokenizer.json that matches the
// encoder vocabulary. It is only used to turn predicted
// answer spans back into text; the samples themselves arrive
// already tokenised.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

pub struct TokenizerStore {
    path: PathBuf,
}

impl TokenizerStore {
    /// `path` may be a tokenizer.json file or a directory containing one.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let path = if path.is_dir() { path.join("tokenizer.json") } else { path.to_path_buf() };
        Self { path }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        tracing::info!("Loading tokenizer from '{}'", self.path.display());
        Tokenizer::from_file(&self.path).map_err(|e| {
            anyhow::anyhow!("Cannot load tokenizer from '{}': {}", self.path.display(), e)
        })
    }
}
