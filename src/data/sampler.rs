// ============================================================
// Layer 4 — Balanced Node Sampler
// ============================================================
// Supporting nodes are rare: a paragraph has dozens of
// sentences and typically two of them are evidence. Training
// the node classifiers on every node would teach them to say
// "not supporting" to everything.
//
// So during training, per node type:
//   - every positive (label 1) is kept
//   - negatives are drawn without replacement, as many as
//     there are positives (or all of them if fewer exist)
//   - the union is returned sorted ascending
//
// No positives means no negatives either: the sample is empty
// and the node task is skipped for that graph.
//
// The RNG is owned by the caller and passed into the forward
// call, so a fixed seed reproduces the exact same selections.
// Node types are always sampled in the order sent, srl, ent.
//
// Reference: rand crate documentation (SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

/// Positive indices plus an equal-sized random draw of negatives, sorted.
pub fn sample_balanced<R: Rng + ?Sized>(labels: &[u8], rng: &mut R) -> Vec<usize> {
    let (positives, negatives): (Vec<usize>, Vec<usize>) =
        (0..labels.len()).partition(|&i| labels[i] == 1);

    let take = positives.len().min(negatives.len());
    let mut sampled: Vec<usize> = negatives.choose_multiple(rng, take).copied().collect();
    sampled.extend(positives);
    sampled.sort_unstable();
    sampled
}

/// Seeded source of training-time node selections.
#[derive(Debug, Clone)]
pub struct BalancedSampler {
    rng: StdRng,
}

impl BalancedSampler {
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    pub fn sample(&mut self, labels: &[u8]) -> Vec<usize> {
        let picked = sample_balanced(labels, &mut self.rng);
        tracing::trace!("Sampled {} of {} nodes", picked.len(), labels.len());
        picked
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negatives_match_positives() {
        let labels = [0, 1, 0, 0, 1, 0, 0, 0];
        let mut sampler = BalancedSampler::from_seed(7);
        let picked = sampler.sample(&labels);
        assert_eq!(picked.len(), 4);
        assert!(picked.contains(&1) && picked.contains(&4));
        assert_eq!(picked.iter().filter(|&&i| labels[i] == 0).count(), 2);
    }

    #[test]
    fn test_strictly_ascending() {
        let labels = [1, 0, 1, 0, 0, 1, 0, 0, 0, 1, 0];
        let picked = BalancedSampler::from_seed(3).sample(&labels);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_few_negatives_all_taken() {
        let labels = [1, 1, 1, 0];
        let picked = BalancedSampler::from_seed(1).sample(&labels);
        assert_eq!(picked, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_no_positives_gives_empty_sample() {
        let picked = BalancedSampler::from_seed(1).sample(&[0, 0, 0]);
        assert!(picked.is_empty());
    }

    #[test]
    fn test_empty_labels() {
        assert!(BalancedSampler::from_seed(1).sample(&[]).is_empty());
    }

    #[test]
    fn test_same_seed_same_selection() {
        let labels: Vec<u8> = (0..40).map(|i| u8::from(i % 7 == 0)).collect();
        let a = BalancedSampler::from_seed(42).sample(&labels);
        let b = BalancedSampler::from_seed(42).sample(&labels);
        assert_eq!(a, b);
    }
}
