//! Error type shared by every fallible operation in the crate.
//!
//! Shape problems are caught up front, before any neuron is touched, so a
//! failed call never leaves the network half-updated. Failing to converge is
//! *not* an error; see [`TrainReport`](crate::TrainReport).

use thiserror::Error;

/// Errors produced while building, training, running or restoring an autoencoder.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested layer widths cannot form a network.
    #[error("invalid topology: {num_input} inputs at compression rate {compression_rate}")]
    InvalidTopology {
        num_input: usize,
        compression_rate: f64,
    },

    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A dataset with no samples was supplied.
    #[error("dataset is empty")]
    EmptyDataset,

    /// Clean and noisy datasets hold a different number of samples.
    #[error("dataset length mismatch: {clean} clean samples, {noisy} noisy samples")]
    DatasetLengthMismatch { clean: usize, noisy: usize },

    /// A sample does not have the width of the input layer.
    #[error("sample {index} has width {found}, expected {expected}")]
    SampleWidthMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    /// The worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Reading or writing a checkpoint file failed.
    #[error("checkpoint i/o: {0}")]
    Io(#[from] std::io::Error),

    /// A checkpoint could not be encoded or decoded.
    #[error("checkpoint encoding: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A checkpoint decoded fine but describes an inconsistent network.
    #[error("corrupt checkpoint: {0}")]
    CorruptCheckpoint(String),
}

/// Shorthand for results carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
