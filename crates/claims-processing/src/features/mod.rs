//! Feature engineering, imputation, encoding and splitting.

pub mod builder;
pub mod columns;
pub mod encoding;
pub mod engineering;
pub mod imputation;
pub mod split;

pub use builder::DataBuilder;
pub use columns::{ColumnPreprocessor, FeatureColumns};
pub use encoding::{EncoderMap, LabelEncoder, encode_categoricals};
pub use engineering::FeatureEngineer;
pub use imputation::{ImputationStrategy, ImputationSummary, MissingValueImputer};
pub use split::{SplitSizes, TrainTestSplit, split_data};
