//! Seeded train/test splitting.

use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};

/// Features and target, partitioned into train and test rows.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: DataFrame,
    pub x_test: DataFrame,
    pub y_train: Series,
    pub y_test: Series,
}

/// Row counts of a split, for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSizes {
    pub train: usize,
    pub test: usize,
}

impl TrainTestSplit {
    pub fn sizes(&self) -> SplitSizes {
        SplitSizes {
            train: self.x_train.height(),
            test: self.x_test.height(),
        }
    }
}

/// Shuffle rows with `seed` and hold out `ceil(n * test_size)` of them.
pub fn split_data(x: &DataFrame, y: &Series, test_size: f64, seed: u64) -> Result<TrainTestSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ProcessingError::InvalidSplit(format!(
            "test_size must be strictly between 0 and 1, got {}",
            test_size
        )));
    }

    let n = x.height();
    if y.len() != n {
        return Err(ProcessingError::InvalidSplit(format!(
            "features have {} rows but target has {}",
            n,
            y.len()
        )));
    }

    let n_test = (n as f64 * test_size).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(ProcessingError::InvalidSplit(format!(
            "{} rows with test_size {} leaves an empty partition",
            n, test_size
        )));
    }

    let mut indices: Vec<IdxSize> = (0..n as IdxSize).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_idx = IdxCa::from_vec("idx".into(), indices[..n_test].to_vec());
    let train_idx = IdxCa::from_vec("idx".into(), indices[n_test..].to_vec());

    Ok(TrainTestSplit {
        x_train: x.take(&train_idx)?,
        x_test: x.take(&test_idx)?,
        y_train: y.take(&train_idx)?,
        y_test: y.take(&test_idx)?,
    })
}
