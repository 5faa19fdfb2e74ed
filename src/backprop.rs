//! Gradient descent with momentum.

use crate::error::{Error, Result};
use crate::matrix::Mat;
use crate::network::{Gradients, Network};
use crate::pattern::PatternSource;
use crate::propagation::{Propagation, WeightUpdate};

/// Backpropagation: propagation with the `Momentum` update rule.
pub type Backpropagation<S> = Propagation<S, Momentum>;

/// Methods whose step size can be tuned between iterations.
pub trait LearningRate {
    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, rate: f64);
}

/// Methods with a tunable momentum term.
pub trait LearningMomentum {
    fn momentum(&self) -> f64;

    fn set_momentum(&mut self, momentum: f64);
}

/// The update `dw = gradient * rate + last_dw * momentum`.
#[derive(Clone, Debug, PartialEq)]
pub struct Momentum {
    learning_rate: f64,
    momentum: f64,
    last_changes: Vec<Mat>,
}

impl Momentum {
    pub fn new(learning_rate: f64, momentum: f64) -> Self {
        Momentum {
            learning_rate,
            momentum,
            last_changes: Vec::new(),
        }
    }

    /// The weight changes applied by the most recent update.
    pub fn last_changes(&self) -> &[Mat] {
        &self.last_changes
    }
}

impl WeightUpdate for Momentum {
    fn init(&mut self, network: &Network) -> Result<()> {
        if !self.learning_rate.is_finite() || !self.momentum.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "learning rate {} and momentum {} must be finite",
                self.learning_rate, self.momentum
            )));
        }
        self.last_changes = network
            .layers()
            .iter()
            .map(|layer| Mat::zeros(layer.output_len(), layer.input_len()))
            .collect();
        Ok(())
    }

    fn weight_change(
        &mut self,
        layer: usize,
        gradients: &Gradients,
        out: usize,
        input: usize,
    ) -> f64 {
        let last = &mut self.last_changes[layer][(out, input)];
        let change = gradients.layer(layer)[(out, input)] * self.learning_rate
            + *last * self.momentum;
        *last = change;
        change
    }
}

impl LearningRate for Momentum {
    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, rate: f64) {
        self.learning_rate = rate;
    }
}

impl LearningMomentum for Momentum {
    fn momentum(&self) -> f64 {
        self.momentum
    }

    fn set_momentum(&mut self, momentum: f64) {
        self.momentum = momentum;
    }
}

impl<S, R> LearningRate for Propagation<S, R>
where
    S: PatternSource,
    R: WeightUpdate + LearningRate,
{
    fn learning_rate(&self) -> f64 {
        self.rule().learning_rate()
    }

    fn set_learning_rate(&mut self, rate: f64) {
        self.rule_mut().set_learning_rate(rate);
    }
}

impl<S, R> LearningMomentum for Propagation<S, R>
where
    S: PatternSource,
    R: WeightUpdate + LearningMomentum,
{
    fn momentum(&self) -> f64 {
        self.rule().momentum()
    }

    fn set_momentum(&mut self, momentum: f64) {
        self.rule_mut().set_momentum(momentum);
    }
}
