//! Gradient-based training of a `Network` over a `PatternSource`.
//!
//! `Propagation` computes gradients and applies them; the `WeightUpdate` rule
//! it is built with decides how a gradient becomes a weight change.
//!
//! In batch mode the source is split into one sub-source per worker thread.
//! Each worker runs forward and backward passes over its patterns into private
//! gradients and a private error. Once every worker has finished, both are
//! summed in sub-source order and only then are the weights changed. Online mode updates the weights after every
//! pattern on the calling thread.

use crate::error::Result;
use crate::iteration_error::IterationError;
use crate::learning::LearningMethod;
use crate::network::{Gradients, Network};
use crate::pattern::{Pattern, PatternSource};

use rayon::prelude::*;

/// Turns gradients into weight changes.
pub trait WeightUpdate {
    /// Sizes any per-weight state for `network`.
    fn init(&mut self, network: &Network) -> Result<()>;

    /// Receives the error of the current iteration before its weights are
    /// updated.
    fn begin_update(&mut self, _current_error: f64) {}

    /// Returns the change to apply to the weight from input neuron `input`
    /// to output neuron `out` of weighted layer `layer`.
    ///
    /// The rule is free to update any state it keeps for that weight.
    fn weight_change(
        &mut self,
        layer: usize,
        gradients: &Gradients,
        out: usize,
        input: usize,
    ) -> f64;

    /// Receives the final error of an iteration once it has completed.
    fn end_iteration(&mut self, _error: f64) {}
}

/// When weights are updated.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Mode {
    /// Accumulate gradients over the whole source, in parallel, then update.
    Batch,
    /// Update after every pattern.
    Online,
}

/// Trains `network` on `training` with the update rule `R`.
#[derive(Debug)]
pub struct Propagation<S, R> {
    network: Network,
    training: S,
    rule: R,
    mode: Mode,
    threads: usize,
    error: IterationError,
}

impl<S, R> Propagation<S, R>
where
    S: PatternSource,
    R: WeightUpdate,
{
    /// Creates a batch-mode propagation using one batch per rayon worker.
    pub fn new(network: Network, training: S, mut rule: R) -> Result<Self> {
        rule.init(&network)?;
        log::debug!(
            "training a {:?} network on {} patterns",
            network.layer_sizes(),
            training.len()
        );
        Ok(Propagation {
            network,
            training,
            rule,
            mode: Mode::Batch,
            threads: rayon::current_num_threads(),
            error: IterationError::new(),
        })
    }

    /// Sets the `Mode` to use for training.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets how many sub-sources batch mode splits the training data into.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        log::debug!("batch mode splits patterns into {} sub-sources", self.threads);
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }

    pub fn rule_mut(&mut self) -> &mut R {
        &mut self.rule
    }

    fn batch_iteration(&mut self) -> Result<()> {
        let network = &self.network;
        let batches = self.training.batches(self.threads);
        log::trace!(
            "computing gradients for {} patterns in {} batches",
            self.training.len(),
            batches.len()
        );

        let partials = batches
            .par_iter()
            .map(|batch| -> Result<(Gradients, IterationError)> {
                let mut gradients = network.empty_gradients();
                let error = IterationError::new();
                for pattern in batch.iter() {
                    accumulate(network, pattern, &error, &mut gradients)?;
                }
                Ok((gradients, error))
            })
            .collect::<Result<Vec<_>>>()?;

        // Reduce in batch order.
        let mut gradients = self.network.empty_gradients();
        for (partial, error) in &partials {
            gradients += partial;
            self.error.merge(error);
        }
        self.rule.begin_update(self.error.total_error());
        apply(&mut self.network, &mut self.rule, &gradients);
        Ok(())
    }

    fn online_iteration(&mut self) -> Result<()> {
        for index in 0..self.training.len() {
            let mut gradients = self.network.empty_gradients();
            accumulate(
                &self.network,
                self.training.pattern(index),
                &self.error,
                &mut gradients,
            )?;
            self.rule.begin_update(self.error.total_error());
            apply(&mut self.network, &mut self.rule, &gradients);
        }
        Ok(())
    }
}

impl<S, R> LearningMethod for Propagation<S, R>
where
    S: PatternSource,
    R: WeightUpdate,
{
    fn perform_iteration(&mut self) -> Result<()> {
        self.error.reset();
        match self.mode {
            Mode::Batch => self.batch_iteration(),
            Mode::Online => self.online_iteration(),
        }
    }

    fn error(&self) -> f64 {
        self.error.total_error()
    }

    fn training_size(&self) -> usize {
        self.training.len()
    }

    fn after_iteration(&mut self) {
        self.rule.end_iteration(self.error.total_error());
    }
}

/// Runs one pattern forward and backward, recording its error and adding its
/// gradients onto `gradients`.
fn accumulate<P: Pattern>(
    network: &Network,
    pattern: &P,
    error: &IterationError,
    gradients: &mut Gradients,
) -> Result<()> {
    let forward = network.forward(pattern.inputs())?;
    let errors = pattern.errors(forward.outputs())?;
    network.backward_into(&forward, &errors, gradients)?;
    error.add_errors(&errors);
    Ok(())
}

/// Adds the rule's change to every weight of the network.
fn apply<R: WeightUpdate>(network: &mut Network, rule: &mut R, gradients: &Gradients) {
    for (l, layer) in network.layers_mut().iter_mut().enumerate() {
        let weights = layer.weights_mut();
        for out in 0..weights.rows() {
            for input in 0..weights.cols() {
                weights[(out, input)] += rule.weight_change(l, gradients, out, input);
            }
        }
    }
}
