use burn::data::dataset::Dataset;

use crate::domain::sample::GraphSample;

pub struct GraphDataset {
    samples: Vec<GraphSample>,
}

impl GraphDataset {
    pub fn new(samples: Vec<GraphSample>) -> Self { Self { samples } }

    /// Samples whose gold span is known.
    pub fn answerable_count(&self) -> usize {
        self.samples.iter().filter(|s| s.has_answer()).count()
    }
}

impl Dataset<GraphSample> for GraphDataset {
    fn get(&self, index: usize) -> Option<GraphSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
