//! Class balancing for binary targets.
//!
//! smartcore's classifiers take no per-sample weights, so balanced training is
//! approximated by resampling: minority rows are drawn with replacement until
//! both classes have the same count.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::dataset::Dataset;
use crate::error::Result;

/// Counts of negative (0) and positive (1) labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassCounts {
    pub negative: usize,
    pub positive: usize,
}

impl ClassCounts {
    pub fn from_labels(labels: &[i32]) -> Self {
        let positive = labels.iter().filter(|&&l| l == 1).count();
        Self {
            negative: labels.len() - positive,
            positive,
        }
    }

    /// `negatives / positives`, or 1.0 when there are no positives.
    pub fn scale_pos_weight(&self) -> f64 {
        if self.positive == 0 {
            1.0
        } else {
            self.negative as f64 / self.positive as f64
        }
    }
}

/// Oversample the minority class of `data` to parity.
///
/// The result is shuffled with the same seed. A dataset with a single class
/// is returned unchanged.
pub fn oversample_minority(data: &Dataset, seed: u64) -> Result<Dataset> {
    let labels = data.class_labels()?;
    let (positives, negatives): (Vec<usize>, Vec<usize>) =
        (0..labels.len()).partition(|&i| labels[i] == 1);

    let (minority, majority) = if positives.len() <= negatives.len() {
        (positives, negatives)
    } else {
        (negatives, positives)
    };
    if minority.is_empty() || minority.len() == majority.len() {
        return Ok(data.clone());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let extra = majority.len() - minority.len();
    let mut rows: Vec<usize> = Vec::with_capacity(majority.len() * 2);
    rows.extend_from_slice(&majority);
    rows.extend_from_slice(&minority);
    for _ in 0..extra {
        rows.push(minority[rng.gen_range(0..minority.len())]);
    }
    rows.shuffle(&mut rng);

    Ok(data.select_rows(&rows))
}
