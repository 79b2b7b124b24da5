// ============================================================
// Layer 5 — Numerical Guard
// ============================================================
// The single validation boundary for the fail-fast contract:
// every component output passes through one of these checks
// before the next component sees it.
//
// A NaN anywhere means the upstream state is already broken,
// so there is no repair path — the forward pass stops with
// HgnError::NumericalInstability naming the stage.
//
// The check reduces on device and syncs a single integer.

use burn::prelude::*;

use crate::domain::error::HgnError;
use crate::ml::relational::NodeFeatures;

/// Fail if `tensor` holds any NaN.
pub fn ensure_no_nan<B: Backend, const D: usize>(
    stage:  &str,
    tensor: &Tensor<B, D>,
) -> Result<(), HgnError> {
    let nan_count: i64 = tensor
        .clone()
        .is_nan()
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();

    if nan_count > 0 {
        tracing::error!("{} NaN value(s) in {}", nan_count, stage);
        return Err(HgnError::NumericalInstability { stage: stage.to_string() });
    }
    Ok(())
}

/// Fail if any node type's embedding holds a NaN.
pub fn ensure_features_no_nan<B: Backend>(
    stage:    &str,
    features: &NodeFeatures<B>,
) -> Result<(), HgnError> {
    for (node_type, tensor) in features {
        ensure_no_nan(&format!("{stage} [{node_type}]"), tensor)?;
    }
    Ok(())
}
