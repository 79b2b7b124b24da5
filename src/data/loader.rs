// ============================================================
// Layer 4 — Sample Loader
// ============================================================
// Reads pre-built GraphSamples from disk. The upstream pipeline
// (tokenisation, SRL parsing, entity linking, graph building)
// writes one JSON object per sample.
//
// Accepted layouts:
//   samples.jsonl   one GraphSample per line, blank lines ignored
//   samples.json    a JSON array of GraphSamples
//   a directory     every *.jsonl / *.json file inside it,
//                   in file-name order
//
// A malformed line is logged and skipped; the rest of the
// file still loads.
//
// Reference: serde_json documentation (StreamDeserializer)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::sample::GraphSample;
use crate::domain::traits::SampleSource;

pub struct JsonlLoader {
    path: PathBuf,
}

impl JsonlLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl SampleSource for JsonlLoader {
    fn load_all(&self) -> Result<Vec<GraphSample>> {
        if !self.path.exists() {
            tracing::warn!(
                "Sample path '{}' does not exist — returning no samples",
                self.path.display()
            );
            return Ok(Vec::new());
        }

        let files = if self.path.is_dir() {
            let mut files: Vec<PathBuf> = fs::read_dir(&self.path)
                .with_context(|| format!("Cannot read directory '{}'", self.path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("jsonl" | "json")))
                .collect();
            files.sort();
            files
        } else {
            vec![self.path.clone()]
        };

        let mut samples = Vec::new();
        for file in &files {
            let loaded = load_file(file)?;
            tracing::debug!("Loaded {} samples from '{}'", loaded.len(), file.display());
            samples.extend(loaded);
        }

        tracing::info!("Successfully loaded {} samples", samples.len());
        Ok(samples)
    }
}

fn load_file(path: &Path) -> Result<Vec<GraphSample>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    if text.trim_start().starts_with('[') {
        return serde_json::from_str(&text)
            .with_context(|| format!("Malformed sample array in '{}'", path.display()));
    }

    let mut samples = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<GraphSample>(line) {
            Ok(sample) => samples.push(sample),
            Err(e) => tracing::warn!("Skipping {}:{}: {}", path.display(), line_no + 1, e),
        }
    }
    Ok(samples)
}
