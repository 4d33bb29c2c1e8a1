//! Saving and loading trained autoencoders.
//!
//! # Checkpoint format
//!
//! A checkpoint is a single JSON document:
//!
//! ```text
//! {
//!   "magic": "dae-checkpoint",
//!   "version": 1,
//!   "input_neuron_num": N,
//!   "middle_neuron_num": M,
//!   "middle": [NeuronState; M],   // each with N weights
//!   "output": [NeuronState; N]    // each with M weights
//! }
//! ```
//!
//! Every neuron stores its weights, both Adam moments, the iteration count,
//! bias, activation and dropout rate, so training can resume exactly where it
//! stopped. Hyperparameters and the RNG seed are not stored; they come from
//! the [`Config`] passed to [`load_model`].
//!
//! # Example
//!
//! ```rust
//! use dae::{Config, DenoisingAutoencoder};
//! use dae::modelio::{save_model, load_model};
//!
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("model.json");
//!
//! let ae = DenoisingAutoencoder::new(6, 0.5)?;
//! save_model(&path, &ae)?;
//!
//! let restored = load_model(&path, Config::default())?;
//! assert_eq!(restored.current_middle_neuron_num(), 3);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::autoencoder::DenoisingAutoencoder;
use crate::error::{Error, Result};
use crate::neuron::{Neuron, NeuronState};
use crate::Config;

/// Identifies a checkpoint file.
pub const CHECKPOINT_MAGIC: &str = "dae-checkpoint";

/// Current checkpoint layout.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable snapshot of both layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub magic: String,
    pub version: u32,
    pub input_neuron_num: usize,
    pub middle_neuron_num: usize,
    pub middle: Vec<NeuronState>,
    pub output: Vec<NeuronState>,
}

impl Checkpoint {
    /// Captures the parameters of every neuron.
    #[must_use]
    pub fn capture(ae: &DenoisingAutoencoder) -> Self {
        Self {
            magic: CHECKPOINT_MAGIC.to_owned(),
            version: CHECKPOINT_VERSION,
            input_neuron_num: ae.input_neuron_num(),
            middle_neuron_num: ae.current_middle_neuron_num(),
            middle: ae.middle_neurons().iter().map(Neuron::state).collect(),
            output: ae.output_neurons().iter().map(Neuron::state).collect(),
        }
    }

    /// Rebuilds the autoencoder described by this checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptCheckpoint`] if the header is unknown or the
    /// recorded widths disagree with the stored neurons.
    pub fn restore(self, config: Config) -> Result<DenoisingAutoencoder> {
        if self.magic != CHECKPOINT_MAGIC {
            return Err(Error::CorruptCheckpoint(format!("invalid magic {:?}", self.magic)));
        }
        if self.version != CHECKPOINT_VERSION {
            return Err(Error::CorruptCheckpoint(format!(
                "unsupported version {}",
                self.version
            )));
        }
        if self.middle.len() != self.middle_neuron_num || self.output.len() != self.input_neuron_num {
            return Err(Error::CorruptCheckpoint(format!(
                "header declares {}x{} neurons, found {}x{}",
                self.middle_neuron_num,
                self.input_neuron_num,
                self.middle.len(),
                self.output.len()
            )));
        }

        let adam = config.adam;
        let middle = self
            .middle
            .into_iter()
            .map(|state| Neuron::from_state(state, adam))
            .collect::<Result<Vec<_>>>()?;
        let output = self
            .output
            .into_iter()
            .map(|state| Neuron::from_state(state, adam))
            .collect::<Result<Vec<_>>>()?;

        DenoisingAutoencoder::from_parts(config, middle, output)
    }
}

/// Writes a checkpoint of `ae` to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_model(path: impl AsRef<Path>, ae: &DenoisingAutoencoder) -> Result<()> {
    let path = path.as_ref();
    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut file, &Checkpoint::capture(ae))?;
    file.flush()?;

    debug!(path = %path.display(), "checkpoint saved");
    Ok(())
}

/// Reads a checkpoint from `path` and rebuilds the autoencoder with `config`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid JSON, or
/// describes an inconsistent network.
pub fn load_model(path: impl AsRef<Path>, config: Config) -> Result<DenoisingAutoencoder> {
    let path = path.as_ref();
    let file = BufReader::new(File::open(path)?);
    let checkpoint: Checkpoint = serde_json::from_reader(file)?;

    debug!(path = %path.display(), "checkpoint loaded");
    checkpoint.restore(config)
}
