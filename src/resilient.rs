//! Resilient backpropagation: RPROP+ and iRPROP+.
//!
//! Every weight carries its own step size. The step grows while the gradient
//! keeps its sign and shrinks when the sign flips, at which point the last
//! weight change may be taken back. Only the sign of the gradient is used,
//! never its magnitude.

use crate::error::{Error, Result};
use crate::iteration_error::WORST_ERROR;
use crate::matrix::Mat;
use crate::network::{Gradients, Network};
use crate::pattern::PatternSource;
use crate::propagation::{Propagation, WeightUpdate};
use crate::utils::signum;

use std::fmt;
use std::str::FromStr;

/// Resilient propagation: propagation with the `Resilient` update rule.
pub type ResilientPropagation<S> = Propagation<S, Resilient>;

/// Step growth factor while the gradient keeps its sign.
pub const POSITIVE_ETA: f64 = 1.2;
/// Step shrink factor after the gradient changes sign.
pub const NEGATIVE_ETA: f64 = 0.5;
/// The smallest step a weight can take.
pub const DELTA_MIN: f64 = 1e-6;
pub const DEFAULT_MAX_STEP: f64 = 50.0;
pub const DEFAULT_INITIAL_UPDATE: f64 = 0.1;

/// Which rprop variant to run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpropType {
    /// Always undoes the previous change when the gradient changes sign.
    #[serde(rename = "RPROPp")]
    RpropPlus,
    /// Undoes the previous change on a sign flip only if the error got worse.
    #[serde(rename = "iRPROPp")]
    IRpropPlus,
}

impl fmt::Display for RpropType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RpropType::RpropPlus => write!(f, "RPROP+"),
            RpropType::IRpropPlus => write!(f, "iRPROP+"),
        }
    }
}

impl FromStr for RpropType {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "rprop+" | "rpropp" | "rprop-plus" => Ok(RpropType::RpropPlus),
            "irprop+" | "irpropp" | "irprop-plus" => Ok(RpropType::IRpropPlus),
            _ => Err(Error::UnknownRpropType(name.to_owned())),
        }
    }
}

/// The per-weight history of a `Resilient` rule.
///
/// Each field holds one weight-shaped matrix per weighted layer. The recorded
/// `kind` is informational; restoring state never changes a rule's variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpropState {
    kind: RpropType,
    last_gradients: Vec<Mat>,
    last_changes: Vec<Mat>,
    last_deltas: Vec<Mat>,
}

impl RpropState {
    /// Fresh state for `network`: zero history and every step at
    /// `initial_update`.
    pub fn new(network: &Network, kind: RpropType, initial_update: f64) -> Self {
        let shaped = |value: f64| -> Vec<Mat> {
            network
                .layers()
                .iter()
                .map(|layer| Mat::filled(layer.output_len(), layer.input_len(), value))
                .collect()
        };
        RpropState {
            kind,
            last_gradients: shaped(0.0),
            last_changes: shaped(0.0),
            last_deltas: shaped(initial_update),
        }
    }

    /// History for no layers, until the rule is attached to a network.
    fn empty(kind: RpropType) -> Self {
        RpropState::from_parts(kind, Vec::new(), Vec::new(), Vec::new())
    }

    /// Assembles state from one matrix per weighted layer for each part of
    /// the history.
    pub fn from_parts(
        kind: RpropType,
        last_gradients: Vec<Mat>,
        last_changes: Vec<Mat>,
        last_deltas: Vec<Mat>,
    ) -> Self {
        RpropState {
            kind,
            last_gradients,
            last_changes,
            last_deltas,
        }
    }

    pub fn kind(&self) -> RpropType {
        self.kind
    }

    pub fn last_gradients(&self) -> &[Mat] {
        &self.last_gradients
    }

    pub fn last_changes(&self) -> &[Mat] {
        &self.last_changes
    }

    pub fn last_deltas(&self) -> &[Mat] {
        &self.last_deltas
    }

    /// Checks that every matrix matches the corresponding weights.
    fn check(&self, network: &Network) -> Result<()> {
        let layers = network.layers();
        for (name, matrices) in &[
            ("last gradients", &self.last_gradients),
            ("last changes", &self.last_changes),
            ("last deltas", &self.last_deltas),
        ] {
            if matrices.len() != layers.len() {
                return Err(Error::StateShape(format!(
                    "{} cover {} layers, but the network has {}",
                    name,
                    matrices.len(),
                    layers.len()
                )));
            }
            for (l, (matrix, layer)) in matrices.iter().zip(layers).enumerate() {
                if !matrix.same_shape(layer.weights()) {
                    return Err(Error::StateShape(format!(
                        "{} for layer {} are {}x{}, but the weights are {}x{}",
                        name,
                        l + 1,
                        matrix.rows(),
                        matrix.cols(),
                        layer.output_len(),
                        layer.input_len()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The RPROP+/iRPROP+ update rule.
#[derive(Clone, Debug, PartialEq)]
pub struct Resilient {
    kind: RpropType,
    initial_update: f64,
    max_step: f64,
    state: RpropState,
    restored: bool,
    current_error: f64,
    last_error: f64,
}

impl Resilient {
    pub fn new(kind: RpropType) -> Self {
        Resilient {
            kind,
            initial_update: DEFAULT_INITIAL_UPDATE,
            max_step: DEFAULT_MAX_STEP,
            state: RpropState::empty(kind),
            restored: false,
            current_error: WORST_ERROR,
            last_error: WORST_ERROR,
        }
    }

    /// Continues from previously saved per-weight state. The variant is
    /// always `kind`, whatever the state records.
    pub fn with_state(kind: RpropType, state: RpropState) -> Self {
        Resilient {
            state: RpropState { kind, ..state },
            restored: true,
            ..Resilient::new(kind)
        }
    }

    /// Sets the step every weight starts with.
    pub fn initial_update(mut self, initial_update: f64) -> Self {
        self.initial_update = initial_update;
        self
    }

    /// Sets the largest step a weight can take.
    pub fn max_step(mut self, max_step: f64) -> Self {
        self.max_step = max_step;
        self
    }

    pub fn kind(&self) -> RpropType {
        self.kind
    }

    /// The per-weight history. It covers no layers until the rule has been
    /// attached to a network.
    pub fn state(&self) -> &RpropState {
        &self.state
    }

    /// The error of the last completed iteration.
    pub fn last_error(&self) -> f64 {
        self.last_error
    }
}

impl WeightUpdate for Resilient {
    fn init(&mut self, network: &Network) -> Result<()> {
        if !(self.initial_update > 0.0 && self.max_step >= self.initial_update) {
            return Err(Error::InvalidConfig(format!(
                "need 0 < initial update ({}) <= max step ({})",
                self.initial_update, self.max_step
            )));
        }
        if self.restored {
            self.state.check(network)?;
        } else {
            self.state = RpropState::new(network, self.kind, self.initial_update);
        }
        Ok(())
    }

    fn begin_update(&mut self, current_error: f64) {
        self.current_error = current_error;
    }

    fn weight_change(
        &mut self,
        layer: usize,
        gradients: &Gradients,
        out: usize,
        input: usize,
    ) -> f64 {
        let kind = self.kind;
        let backtrack = self.current_error > self.last_error;
        let max_step = self.max_step;
        let state = &mut self.state;

        let index = (out, input);
        let gradient = gradients.layer(layer)[index];
        let last_gradient = &mut state.last_gradients[layer][index];
        let last_change = &mut state.last_changes[layer][index];
        let delta = &mut state.last_deltas[layer][index];

        let change = signum(gradient * *last_gradient);
        let weight_change = if change > 0.0 {
            *delta = (*delta * POSITIVE_ETA).min(max_step);
            *last_gradient = gradient;
            signum(gradient) * *delta
        } else if change < 0.0 {
            *delta = (*delta * NEGATIVE_ETA).max(DELTA_MIN);
            *last_gradient = 0.0;
            match kind {
                RpropType::RpropPlus => -*last_change,
                RpropType::IRpropPlus if backtrack => -*last_change,
                RpropType::IRpropPlus => 0.0,
            }
        } else {
            *last_gradient = gradient;
            signum(gradient) * *delta
        };
        *last_change = weight_change;
        weight_change
    }

    fn end_iteration(&mut self, error: f64) {
        self.last_error = error;
    }
}

impl<S> ResilientPropagation<S>
where
    S: PatternSource,
{
    /// The optimizer's per-weight history, for saving alongside the network.
    pub fn state(&self) -> &RpropState {
        self.rule().state()
    }
}
