// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by several layers:
//
//   checkpoint.rs      — model weights via Burn's CompactRecorder,
//                        plus HgnConfig as JSON so inference can
//                        rebuild the architecture
//
//   tokenizer_store.rs — loads the tokenizer.json used to turn
//                        answer spans back into text
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer loading
pub mod tokenizer_store;
