//! The denoising autoencoder and its training loop.
//!
//! # Phases
//!
//! Each training sample runs four strictly ordered phases:
//!
//! 1. middle forward: `h = learn_output(noisy)` for every middle neuron
//! 2. output forward: `o = learn_output(h)` for every output neuron
//! 3. output learn: `delta_k = (o_k - t_k) * f'(o_k)`, learning on `h`
//! 4. middle learn: `delta_j = f'(h_j) * Σ_k delta_k * w_kj`, learning on `noisy`
//!
//! Within a phase every worker owns a disjoint range of neurons and the
//! matching slots of the output buffer. A phase is one `rayon` scope, so all
//! workers have finished before the next phase reads `h` or `o`.
//!
//! # Convergence
//!
//! After each pass over the dataset every noisy sample is reconstructed in
//! inference mode. Training stops once the largest absolute difference from
//! the clean sample is within `max_gap`, or after `max_trial` passes.

use core::fmt;
use core::ops::Range;
use std::num::NonZeroUsize;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::neuron::Neuron;
use crate::partition::{ranges, split_mut};
use crate::Config;

/// Outcome of [`DenoisingAutoencoder::learn`].
///
/// Its `Display` output is the human-readable training status.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// Whether the reconstruction gap reached `max_gap`.
    pub success: bool,
    /// Number of completed passes over the dataset.
    pub trials: usize,
    /// Mean squared error of the training forward passes, per pass.
    pub mse: Vec<f64>,
    /// Largest absolute inference reconstruction error, per pass.
    pub gaps: Vec<f64>,
}

impl TrainReport {
    /// Gap after the last completed pass, or infinity if none ran.
    #[must_use]
    pub fn final_gap(&self) -> f64 {
        self.gaps.last().copied().unwrap_or(f64::INFINITY)
    }
}

impl fmt::Display for TrainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            write!(
                f,
                "converged after {} trials (max gap {:.6})",
                self.trials,
                self.final_gap()
            )
        } else {
            write!(
                f,
                "failed to converge within {} trials (max gap {:.6})",
                self.trials,
                self.final_gap()
            )
        }
    }
}

/// Two-layer denoising autoencoder.
#[derive(Debug)]
pub struct DenoisingAutoencoder {
    config: Config,

    input_neuron_num: usize,
    middle_neuron_num: usize,
    output_neuron_num: usize,

    middle_neurons: Vec<Neuron>,
    output_neurons: Vec<Neuron>,

    h: Vec<f64>,
    o: Vec<f64>,
    learned_h: Vec<f64>,
    learned_o: Vec<f64>,

    success: bool,

    num_thread: usize,
    middle_ranges: Vec<Range<usize>>,
    output_ranges: Vec<Range<usize>>,
    pool: ThreadPool,
    rng: StdRng,
}

impl DenoisingAutoencoder {
    /// Builds an autoencoder with the default [`Config`].
    ///
    /// # Errors
    ///
    /// See [`DenoisingAutoencoder::with_config`].
    pub fn new(num_input: usize, compression_rate: f64) -> Result<Self> {
        Self::with_config(num_input, compression_rate, Config::default())
    }

    /// Builds an autoencoder whose middle layer has
    /// `round(num_input * compression_rate)` neurons.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidTopology`] if the middle layer would be empty.
    /// - [`Error::InvalidConfig`] if `config` fails validation.
    /// - [`Error::ThreadPool`] if the worker pool cannot be started.
    pub fn with_config(num_input: usize, compression_rate: f64, config: Config) -> Result<Self> {
        config.validate()?;
        let middle = middle_width(num_input, compression_rate)?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let middle_neurons = (0..middle)
            .map(|_| {
                Neuron::new(
                    num_input,
                    config.middle_activation,
                    config.middle_dropout_rate,
                    config.adam,
                    &mut rng,
                )
            })
            .collect();
        let output_neurons = (0..num_input)
            .map(|_| {
                Neuron::new(
                    middle,
                    config.output_activation,
                    config.output_dropout_rate,
                    config.adam,
                    &mut rng,
                )
            })
            .collect();

        Self::assemble(config, middle_neurons, output_neurons, rng)
    }

    /// Rebuilds an autoencoder from existing neurons, e.g. restored from a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptCheckpoint`] if a layer is empty or the
    /// connection counts do not line up.
    pub fn from_parts(
        config: Config,
        middle_neurons: Vec<Neuron>,
        output_neurons: Vec<Neuron>,
    ) -> Result<Self> {
        config.validate()?;

        if middle_neurons.is_empty() || output_neurons.is_empty() {
            return Err(Error::CorruptCheckpoint("empty layer".into()));
        }
        let input = output_neurons.len();
        let middle = middle_neurons.len();
        if let Some(bad) = middle_neurons.iter().position(|n| n.num_input() != input) {
            return Err(Error::CorruptCheckpoint(format!(
                "middle neuron {bad} has {} inputs, expected {input}",
                middle_neurons[bad].num_input()
            )));
        }
        if let Some(bad) = output_neurons.iter().position(|n| n.num_input() != middle) {
            return Err(Error::CorruptCheckpoint(format!(
                "output neuron {bad} has {} inputs, expected {middle}",
                output_neurons[bad].num_input()
            )));
        }

        let rng = StdRng::seed_from_u64(config.seed);
        Self::assemble(config, middle_neurons, output_neurons, rng)
    }

    fn assemble(
        config: Config,
        middle_neurons: Vec<Neuron>,
        output_neurons: Vec<Neuron>,
        rng: StdRng,
    ) -> Result<Self> {
        let input_neuron_num = output_neurons.len();
        let middle_neuron_num = middle_neurons.len();
        let output_neuron_num = output_neurons.len();

        let num_thread = config
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, NonZeroUsize::get));
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_thread)
            .thread_name(|i| format!("dae-worker-{i}"))
            .build()?;

        debug!(
            input = input_neuron_num,
            middle = middle_neuron_num,
            threads = num_thread,
            "autoencoder constructed"
        );

        Ok(Self {
            input_neuron_num,
            middle_neuron_num,
            output_neuron_num,
            h: vec![0.0; middle_neuron_num],
            o: vec![0.0; output_neuron_num],
            learned_h: Vec::new(),
            learned_o: Vec::new(),
            success: false,
            middle_ranges: ranges(middle_neuron_num, num_thread),
            output_ranges: ranges(output_neuron_num, num_thread),
            middle_neurons,
            output_neurons,
            num_thread,
            pool,
            rng,
            config,
        })
    }

    /// Trains on paired clean/noisy samples until the reconstruction gap is
    /// within `max_gap` or `max_trial` passes have run.
    ///
    /// Failing to converge is reported through [`TrainReport::success`]; the
    /// partially trained weights are kept.
    ///
    /// # Errors
    ///
    /// Returns a shape error, before any neuron is touched, if the datasets
    /// are empty, differ in length, or contain a sample whose width is not
    /// the input width.
    pub fn learn(&mut self, input: &[Vec<f64>], noisy_input: &[Vec<f64>]) -> Result<TrainReport> {
        if input.len() != noisy_input.len() {
            return Err(Error::DatasetLengthMismatch {
                clean: input.len(),
                noisy: noisy_input.len(),
            });
        }
        check_samples(input, self.input_neuron_num)?;
        check_samples(noisy_input, self.input_neuron_num)?;

        self.success = false;
        let mut report = TrainReport {
            success: false,
            trials: 0,
            mse: Vec::new(),
            gaps: Vec::new(),
        };

        for trial in 1..=self.config.max_trial {
            let mut error = 0.0;
            for (clean, noisy) in input.iter().zip(noisy_input) {
                error += self.train_sample(clean, noisy);
            }
            let mse = error / input.len() as f64;
            let gap = self.reconstruction_gap(input, noisy_input);

            report.trials = trial;
            report.mse.push(mse);
            report.gaps.push(gap);
            debug!(trial, mse, gap, "training pass finished");

            if gap <= self.config.max_gap {
                self.success = true;
                report.success = true;
                break;
            }
        }

        if report.trials > 0 {
            self.learned_h.clone_from(&self.h);
            self.learned_o.clone_from(&self.o);
        }

        if report.success {
            info!(trials = report.trials, gap = report.final_gap(), "training converged");
        } else {
            warn!(
                trials = report.trials,
                gap = report.final_gap(),
                "training did not converge"
            );
        }

        Ok(report)
    }

    /// Runs one sample through the four phases and returns its mean squared error.
    fn train_sample(&mut self, clean: &[f64], noisy: &[f64]) -> f64 {
        for neuron in self.middle_neurons.iter_mut().chain(self.output_neurons.iter_mut()) {
            neuron.dropout(self.rng.random::<f64>());
        }

        forward_phase(
            &self.pool,
            &self.middle_ranges,
            &self.middle_neurons,
            noisy,
            &mut self.h,
            Neuron::learn_output,
        );
        forward_phase(
            &self.pool,
            &self.output_ranges,
            &self.output_neurons,
            &self.h,
            &mut self.o,
            Neuron::learn_output,
        );

        output_learn_phase(
            &self.pool,
            &self.output_ranges,
            &mut self.output_neurons,
            &self.o,
            clean,
            &self.h,
        );
        middle_learn_phase(
            &self.pool,
            &self.middle_ranges,
            &mut self.middle_neurons,
            &self.output_neurons,
            &self.h,
            noisy,
        );

        let error: f64 = self
            .o
            .iter()
            .zip(clean)
            .map(|(&y, &t)| mean_squared_error(y, t))
            .sum();
        error / self.output_neuron_num as f64
    }

    /// Largest absolute difference between a clean sample and the inference
    /// reconstruction of its noisy copy.
    fn reconstruction_gap(&self, input: &[Vec<f64>], noisy_input: &[Vec<f64>]) -> f64 {
        input
            .iter()
            .zip(noisy_input)
            .flat_map(|(clean, noisy)| {
                let (_, o) = self.infer(noisy);
                clean
                    .iter()
                    .zip(o)
                    .map(|(t, y)| {
                        // a diverged network must never look converged
                        let gap = (y - t).abs();
                        if gap.is_nan() { f64::INFINITY } else { gap }
                    })
                    .collect::<Vec<_>>()
            })
            .fold(0.0, f64::max)
    }

    /// Inference pass returning `(h, o)`. Dropout masks are ignored.
    fn infer(&self, input: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mut h = vec![0.0; self.middle_neuron_num];
        let mut o = vec![0.0; self.output_neuron_num];
        forward_phase(
            &self.pool,
            &self.middle_ranges,
            &self.middle_neurons,
            input,
            &mut h,
            Neuron::output,
        );
        forward_phase(
            &self.pool,
            &self.output_ranges,
            &self.output_neurons,
            &h,
            &mut o,
            Neuron::output,
        );
        (h, o)
    }

    /// Reconstructs `input` without dropout or learning.
    ///
    /// With `show_result` the hidden and output activations are logged at
    /// info level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SampleWidthMismatch`] if `input` is not the input width.
    pub fn out(&self, input: &[f64], show_result: bool) -> Result<Vec<f64>> {
        if input.len() != self.input_neuron_num {
            return Err(Error::SampleWidthMismatch {
                index: 0,
                expected: self.input_neuron_num,
                found: input.len(),
            });
        }

        let (h, o) = self.infer(input);
        if show_result {
            info!(?input, "input");
            info!(hidden = ?h, "middle layer output");
            info!(output = ?o, "reconstruction");
        }
        Ok(o)
    }

    /// Middle-layer activations (inference mode) for every sample.
    ///
    /// This is the compressed representation fed to the next autoencoder
    /// when stacking.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SampleWidthMismatch`] if a sample has the wrong
    /// width. An empty dataset yields an empty result.
    pub fn middle_output(&self, noisy_input: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if noisy_input.is_empty() {
            return Ok(Vec::new());
        }
        check_samples(noisy_input, self.input_neuron_num)?;

        Ok(noisy_input
            .iter()
            .map(|sample| {
                let mut h = vec![0.0; self.middle_neuron_num];
                forward_phase(
                    &self.pool,
                    &self.middle_ranges,
                    &self.middle_neurons,
                    sample,
                    &mut h,
                    Neuron::output,
                );
                h
            })
            .collect())
    }

    #[must_use]
    pub fn current_middle_neuron_num(&self) -> usize {
        self.middle_neuron_num
    }

    #[must_use]
    pub fn input_neuron_num(&self) -> usize {
        self.input_neuron_num
    }

    #[must_use]
    pub fn output_neuron_num(&self) -> usize {
        self.output_neuron_num
    }

    /// Worker threads used per phase.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.num_thread
    }

    /// Whether the last call to [`learn`](Self::learn) converged.
    #[must_use]
    pub fn success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub fn middle_neurons(&self) -> &[Neuron] {
        &self.middle_neurons
    }

    #[must_use]
    pub fn output_neurons(&self) -> &[Neuron] {
        &self.output_neurons
    }

    /// Hidden activations of the last training sample; empty before training.
    #[must_use]
    pub fn learned_middle_output(&self) -> &[f64] {
        &self.learned_h
    }

    /// Output activations of the last training sample; empty before training.
    #[must_use]
    pub fn learned_output(&self) -> &[f64] {
        &self.learned_o
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn middle_width(num_input: usize, compression_rate: f64) -> Result<usize> {
    let invalid = Error::InvalidTopology {
        num_input,
        compression_rate,
    };
    if num_input == 0 || !compression_rate.is_finite() || compression_rate <= 0.0 {
        return Err(invalid);
    }

    let width = (num_input as f64 * compression_rate).round() as usize;
    if width == 0 {
        return Err(invalid);
    }
    Ok(width)
}

fn check_samples(samples: &[Vec<f64>], width: usize) -> Result<()> {
    if samples.is_empty() {
        return Err(Error::EmptyDataset);
    }
    if let Some((index, sample)) = samples.iter().enumerate().find(|(_, s)| s.len() != width) {
        return Err(Error::SampleWidthMismatch {
            index,
            expected: width,
            found: sample.len(),
        });
    }
    Ok(())
}

fn mean_squared_error(output: f64, answer: f64) -> f64 {
    0.5 * (output - answer) * (output - answer)
}

/// Writes `f(neuron, inputs)` into `out` for every neuron, one task per range.
fn forward_phase<F>(
    pool: &ThreadPool,
    ranges: &[Range<usize>],
    neurons: &[Neuron],
    inputs: &[f64],
    out: &mut [f64],
    f: F,
) where
    F: Fn(&Neuron, &[f64]) -> f64 + Sync,
{
    let f = &f;
    pool.scope(|s| {
        for (range, slots) in ranges.iter().zip(split_mut(out, ranges)) {
            let neurons = &neurons[range.clone()];
            s.spawn(move |_| {
                for (neuron, slot) in neurons.iter().zip(slots.iter_mut()) {
                    *slot = f(neuron, inputs);
                }
            });
        }
    });
}

fn output_learn_phase(
    pool: &ThreadPool,
    ranges: &[Range<usize>],
    neurons: &mut [Neuron],
    o: &[f64],
    target: &[f64],
    h: &[f64],
) {
    pool.scope(|s| {
        for (range, part) in ranges.iter().zip(split_mut(neurons, ranges)) {
            let o = &o[range.clone()];
            let target = &target[range.clone()];
            s.spawn(move |_| {
                for ((neuron, &y), &t) in part.iter_mut().zip(o).zip(target) {
                    let delta = (y - t) * neuron.activation().derivative(y);
                    neuron.learn(delta, h);
                }
            });
        }
    });
}

fn middle_learn_phase(
    pool: &ThreadPool,
    ranges: &[Range<usize>],
    neurons: &mut [Neuron],
    downstream: &[Neuron],
    h: &[f64],
    inputs: &[f64],
) {
    pool.scope(|s| {
        for (range, part) in ranges.iter().zip(split_mut(neurons, ranges)) {
            let start = range.start;
            s.spawn(move |_| {
                for (j, neuron) in (start..).zip(part.iter_mut()) {
                    // dropped output neurons pass nothing back
                    let back: f64 = downstream
                        .iter()
                        .map(|k| k.delta() * k.weight(j) * k.dropout_mask())
                        .sum();
                    let delta = back * neuron.activation().derivative(h[j]);
                    neuron.learn(delta, inputs);
                }
            });
        }
    });
}
