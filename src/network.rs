//! A fully connected [Feedforward neural network]
//! (https://en.wikipedia.org/wiki/Feedforward_neural_network).
//!
//! Layer 0 is the input layer and carries no weights. Every later layer owns a
//! weight matrix of shape `(neurons[l], neurons[l - 1])`, a single bias that is
//! broadcast over its neurons, and an activation function.
//!
//! # Example
//!
//! ```
//! # use neuroprop::network::*;
//! # use neuroprop::activator::Activator;
//! let network = Network::new(&[2, 3, 1], Activator::Sigmoid).unwrap();
//! let output = network.run(&[0.0, 1.0]).unwrap();
//! assert_eq!(output.len(), 1);
//! assert!(output[0] > 0.0 && output[0] < 1.0);
//! ```

use crate::activator::{Activation, Activator};
use crate::error::{Error, Result};
use crate::matrix::Mat;
use crate::utils::{Back, Front, ZeroOut};

use itertools::multizip;
use rand::Rng;
use rand_distr::StandardNormal;
use std::convert::TryFrom;
use std::ops::AddAssign;

/// A single weighted layer of the network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// The activation function to be used for every neuron in the layer.
    activator: Activator,
    /// Added to the trigger of every neuron in the layer.
    bias: f64,
    /// The network weights, with each neuron's weights stored as a row.
    weights: Mat,
}

impl Layer {
    pub fn new(activator: Activator, weights: Mat, bias: f64) -> Self {
        Layer {
            activator,
            bias,
            weights,
        }
    }

    /// Initializes a new, untrained layer with normally distributed weights
    /// and a zero bias.
    ///
    /// Arguments:
    ///
    ///  * `activator` - the activation function to be used for this layer's
    ///                  output.
    ///  * `inputs` - the number of inputs to this layer.
    ///  * `outputs` - the number of outputs from this layer.
    pub fn random<R>(activator: Activator, inputs: usize, outputs: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Layer::new(activator, Mat::random(StandardNormal, outputs, inputs, &mut *rng), 0.0)
    }

    /// Returns the number of inputs to this layer.
    pub fn input_len(&self) -> usize {
        self.weights.cols()
    }

    /// Returns the number of outputs from this layer.
    pub fn output_len(&self) -> usize {
        self.weights.rows()
    }

    pub fn activator(&self) -> Activator {
        self.activator
    }

    pub fn weights(&self) -> &Mat {
        &self.weights
    }

    pub(crate) fn weights_mut(&mut self) -> &mut Mat {
        &mut self.weights
    }

    /// Feeds the provided `inputs` forward through the layer.
    fn forward(&self, inputs: &[f64], triggers: &mut [f64], outputs: &mut [f64]) {
        self.weights.mul_vec(inputs, triggers);
        for t in triggers.iter_mut() {
            *t += self.bias;
        }
        self.activator.activations(triggers, outputs);
    }
}

/// Everything computed while feeding one input through the network.
///
/// Index 0 is the input layer, whose triggers and outputs are both the raw
/// inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct Forward {
    triggers: Vec<Vec<f64>>,
    outputs: Vec<Vec<f64>>,
}

impl Forward {
    /// The activated values of the output layer.
    pub fn outputs(&self) -> &[f64] {
        self.outputs.back()
    }

    /// The activated values of layer `layer`.
    pub fn layer_outputs(&self, layer: usize) -> &[f64] {
        &self.outputs[layer]
    }

    /// The pre-activation values of layer `layer`.
    pub fn layer_triggers(&self, layer: usize) -> &[f64] {
        &self.triggers[layer]
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Weight-shaped gradient matrices, one per weighted layer.
///
/// `layer(0)` belongs to the first hidden layer (network layer 1).
#[derive(Clone, Debug, PartialEq)]
pub struct Gradients {
    layers: Vec<Mat>,
}

impl Gradients {
    /// Wraps one gradient matrix per weighted layer.
    pub fn new(layers: Vec<Mat>) -> Self {
        Gradients { layers }
    }

    pub fn layer(&self, layer: usize) -> &Mat {
        &self.layers[layer]
    }

    pub fn layers(&self) -> &[Mat] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl<'a> AddAssign<&'a Gradients> for Gradients {
    fn add_assign(&mut self, other: &Gradients) {
        for (l, r) in self.layers.iter_mut().zip(other.layers.iter()) {
            *l += r;
        }
    }
}

impl ZeroOut for Gradients {
    fn zero_out(&mut self) {
        self.layers.zero_out();
    }
}

/// A Feedforward neural network
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Layer>", into = "Vec<Layer>")]
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    /// Creates a new, untrained neural network using the thread-local rng.
    ///
    /// Arguments:
    ///  * `layer_sizes` - the number of neurons in each layer, input first.
    ///  * `activator` - the activation function to use for each neuron.
    pub fn new(layer_sizes: &[usize], activator: Activator) -> Result<Self> {
        Network::with_rng(layer_sizes, activator, &mut rand::thread_rng())
    }

    /// Creates a new, untrained neural network drawing weights from `rng`.
    pub fn with_rng<R>(layer_sizes: &[usize], activator: Activator, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        if layer_sizes.len() < 2 {
            return Err(Error::TooFewLayers(layer_sizes.len()));
        }
        if let Some(layer) = layer_sizes.iter().position(|&size| size == 0) {
            return Err(Error::EmptyLayer(layer));
        }
        let layers = layer_sizes
            .windows(2)
            .map(|sizes| Layer::random(activator, sizes[0], sizes[1], &mut *rng))
            .collect();
        Ok(Network { layers })
    }

    /// Assembles a network from explicit layers, checking that each weight
    /// matrix takes exactly as many inputs as the layer before it produces.
    pub fn from_layers(layers: Vec<Layer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::TooFewLayers(1));
        }
        for (i, layer) in layers.iter().enumerate() {
            if layer.input_len() == 0 {
                return Err(Error::EmptyLayer(i));
            }
            if layer.output_len() == 0 {
                return Err(Error::EmptyLayer(i + 1));
            }
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[1].input_len() != pair[0].output_len() {
                return Err(Error::Topology {
                    layer: i + 2,
                    expected: pair[1].input_len(),
                    got: pair[0].output_len(),
                });
            }
        }
        Ok(Network { layers })
    }

    /// The weighted layers; `layers()[0]` is network layer 1.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    /// The number of neurons in every layer, input layer first.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.layers.len() + 1);
        sizes.push(self.input_len());
        sizes.extend(self.layers.iter().map(Layer::output_len));
        sizes
    }

    /// Returns the size of the input layer to the network.
    pub fn input_len(&self) -> usize {
        self.layers.front().input_len()
    }

    /// Returns the size of the output layer from the network.
    pub fn output_len(&self) -> usize {
        self.layers.back().output_len()
    }

    /// Feeds the provided `input` through the network, returning the output
    /// layer.
    pub fn run(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        let mut forward = self.forward(inputs)?;
        Ok(forward.outputs.pop().unwrap_or_default())
    }

    /// Feeds the provided `inputs` through the network, returning the
    /// triggers and activated values of every layer.
    pub fn forward(&self, inputs: &[f64]) -> Result<Forward> {
        if inputs.is_empty() {
            return Err(Error::EmptyPattern);
        }
        if inputs.len() != self.input_len() {
            return Err(Error::InputSize {
                expected: self.input_len(),
                got: inputs.len(),
            });
        }

        let mut triggers = Vec::with_capacity(self.layers.len() + 1);
        let mut outputs = Vec::with_capacity(self.layers.len() + 1);
        triggers.push(inputs.to_vec());
        outputs.push(inputs.to_vec());
        for layer in &self.layers {
            let mut trigger = vec![0.0; layer.output_len()];
            let mut output = vec![0.0; layer.output_len()];
            layer.forward(outputs.back(), &mut trigger, &mut output);
            triggers.push(trigger);
            outputs.push(output);
        }
        Ok(Forward { triggers, outputs })
    }

    /// Returns a zeroed set of gradients shaped like this network's weights.
    pub fn empty_gradients(&self) -> Gradients {
        Gradients {
            layers: self
                .layers
                .iter()
                .map(|layer| Mat::zeros(layer.output_len(), layer.input_len()))
                .collect(),
        }
    }

    /// Backpropagates `errors` (one per output neuron) through the result of a
    /// forward pass, returning fresh gradients.
    pub fn backward(&self, forward: &Forward, errors: &[f64]) -> Result<Gradients> {
        let mut gradients = self.empty_gradients();
        self.backward_into(forward, errors, &mut gradients)?;
        Ok(gradients)
    }

    /// Backpropagates `errors` and adds the resulting weight gradients onto
    /// `gradients`.
    ///
    /// The gradient of the connection `(out, in)` is `delta[out] *
    /// output_prev[in]`, where the output layer delta is `errors[out] *
    /// f'(out)`.
    pub fn backward_into(
        &self,
        forward: &Forward,
        errors: &[f64],
        gradients: &mut Gradients,
    ) -> Result<()> {
        if errors.len() != self.output_len() {
            return Err(Error::ErrorSize {
                expected: self.output_len(),
                got: errors.len(),
            });
        }
        debug_assert_eq!(forward.len(), self.layers.len() + 1);
        debug_assert_eq!(gradients.len(), self.layers.len());

        let last = self.layers.len();
        let mut delta = vec![0.0; self.output_len()];
        self.layers.back().activator.derivatives(
            &forward.triggers[last],
            &forward.outputs[last],
            &mut delta,
        );
        for (d, e) in delta.iter_mut().zip(errors) {
            *d *= e;
        }

        for (i, layer) in self.layers.iter().enumerate().rev() {
            gradients.layers[i].add_outer(&delta, &forward.outputs[i]);
            if i == 0 {
                break;
            }

            let mut propagated = vec![0.0; layer.input_len()];
            layer.weights.mul_vec_transposed(&delta, &mut propagated);
            let mut derivative = vec![0.0; layer.input_len()];
            self.layers[i - 1].activator.derivatives(
                &forward.triggers[i],
                &forward.outputs[i],
                &mut derivative,
            );
            for (p, d) in multizip((propagated.iter_mut(), derivative.iter())) {
                *p *= d;
            }
            delta = propagated;
        }
        Ok(())
    }
}

impl TryFrom<Vec<Layer>> for Network {
    type Error = Error;

    fn try_from(layers: Vec<Layer>) -> Result<Self> {
        Network::from_layers(layers)
    }
}

impl From<Network> for Vec<Layer> {
    fn from(network: Network) -> Self {
        network.layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layer(activator: Activator, rows: Vec<Vec<f64>>, bias: f64) -> Layer {
        Layer::new(activator, Mat::from_rows(rows).unwrap(), bias)
    }

    fn small() -> Network {
        Network::from_layers(vec![
            layer(Activator::TanH, vec![vec![0.5, -0.4], vec![0.3, 0.8]], 0.1),
            layer(Activator::Sigmoid, vec![vec![1.2, -0.7]], -0.2),
        ])
        .unwrap()
    }

    #[test]
    fn too_few_layers() {
        assert_eq!(
            Network::new(&[1], Activator::ReLU),
            Err(Error::TooFewLayers(1))
        );
    }

    #[test]
    fn empty_layer() {
        assert_eq!(
            Network::new(&[1, 0, 1], Activator::ReLU),
            Err(Error::EmptyLayer(1))
        );
    }

    #[test]
    fn mismatched_topology() {
        let result = Network::from_layers(vec![
            layer(Activator::TanH, vec![vec![0.5, -0.4], vec![0.3, 0.8]], 0.0),
            layer(Activator::TanH, vec![vec![1.0, 1.0, 1.0]], 0.0),
        ]);
        assert_eq!(
            result,
            Err(Error::Topology {
                layer: 2,
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn layer_sizes() {
        let mut rng = StdRng::seed_from_u64(7);
        let network = Network::with_rng(&[4, 3, 2], Activator::TanH, &mut rng).unwrap();
        assert_eq!(network.layer_sizes(), vec![4, 3, 2]);
        assert_eq!(network.layers()[0].weights().rows(), 3);
        assert_eq!(network.layers()[0].weights().cols(), 4);
    }

    #[test]
    fn wrong_input_size() {
        let network = small();
        assert_eq!(
            network.forward(&[1.0]).err(),
            Some(Error::InputSize {
                expected: 2,
                got: 1
            })
        );
        assert_eq!(network.forward(&[]).err(), Some(Error::EmptyPattern));
    }

    #[test]
    fn forward_by_hand() {
        let network = small();
        let forward = network.forward(&[1.0, 2.0]).unwrap();
        let h0 = (0.5 - 0.8 + 0.1_f64).tanh();
        let h1 = (0.3 + 1.6 + 0.1_f64).tanh();
        let o = 1.0 / (1.0 + (-(1.2 * h0 - 0.7 * h1 - 0.2_f64)).exp());
        assert_eq!(forward.layer_outputs(0), &[1.0, 2.0]);
        assert_abs_diff_eq!(forward.layer_triggers(1)[0], 0.5 - 0.8 + 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(forward.layer_outputs(1)[1], h1, epsilon = 1e-12);
        assert_abs_diff_eq!(forward.outputs()[0], o, epsilon = 1e-12);
    }

    #[test]
    fn forward_is_deterministic() {
        let network = small();
        let a = network.forward(&[0.3, -0.9]).unwrap();
        let b = network.forward(&[0.3, -0.9]).unwrap();
        assert_eq!(a, b);
        for (x, y) in a.outputs().iter().zip(b.outputs()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn output_gradient_sign() {
        let network = small();
        let inputs = [1.0, -2.0];
        let forward = network.forward(&inputs).unwrap();
        let errors = [0.75];
        let gradients = network.backward(&forward, &errors).unwrap();

        let o = forward.outputs()[0];
        let delta = errors[0] * o * (1.0 - o);
        let hidden = forward.layer_outputs(1);
        for (i, h) in hidden.iter().enumerate() {
            let gradient = gradients.layer(1)[(0, i)];
            assert_abs_diff_eq!(gradient, delta * h, epsilon = 1e-12);
            assert_eq!(gradient.signum(), (delta * h).signum());
        }
    }

    #[test]
    fn hidden_gradients_match_finite_differences() {
        // With error = target - output, the gradient is -dE/dw for
        // E = (target - output)^2 / 2.
        let network = small();
        let inputs = [0.4, -0.6];
        let target = 0.9;
        let loss = |n: &Network| {
            let out = n.run(&inputs).unwrap()[0];
            0.5 * (target - out) * (target - out)
        };
        let forward = network.forward(&inputs).unwrap();
        let errors = [target - forward.outputs()[0]];
        let gradients = network.backward(&forward, &errors).unwrap();

        let h = 1e-6;
        for (row, col) in [(0, 0), (0, 1), (1, 0), (1, 1)].iter().cloned() {
            let mut plus = network.clone();
            plus.layers_mut()[0].weights_mut()[(row, col)] += h;
            let mut minus = network.clone();
            minus.layers_mut()[0].weights_mut()[(row, col)] -= h;
            let numeric = (loss(&plus) - loss(&minus)) / (2.0 * h);
            assert_abs_diff_eq!(gradients.layer(0)[(row, col)], -numeric, epsilon = 1e-7);
        }
    }

    #[test]
    fn backward_into_accumulates() {
        let network = small();
        let forward = network.forward(&[1.0, 1.0]).unwrap();
        let single = network.backward(&forward, &[0.5]).unwrap();
        let mut twice = network.empty_gradients();
        network.backward_into(&forward, &[0.5], &mut twice).unwrap();
        network.backward_into(&forward, &[0.5], &mut twice).unwrap();
        for (a, b) in single.layers().iter().zip(twice.layers()) {
            for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
                assert_abs_diff_eq!(2.0 * x, *y, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn wrong_error_size() {
        let network = small();
        let forward = network.forward(&[1.0, 1.0]).unwrap();
        assert_eq!(
            network.backward(&forward, &[0.1, 0.2]).err(),
            Some(Error::ErrorSize {
                expected: 1,
                got: 2
            })
        );
    }

    #[test]
    fn clone_is_deep() {
        let network = small();
        let mut copy = network.clone();
        copy.layers_mut()[1].weights_mut()[(0, 0)] = 42.0;
        assert_eq!(network.layers()[1].weights()[(0, 0)], 1.2);
    }
}
