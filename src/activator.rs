//! Activation function types.

use itertools::multizip;

/// The vector-level contract the network uses to activate a layer and to
/// differentiate it during backpropagation.
pub trait Activation {
    /// Fills `outputs` with the activated value of every trigger.
    fn activations(&self, triggers: &[f64], outputs: &mut [f64]);

    /// Fills `derivatives` with `f'(trigger)`.
    ///
    /// Both the trigger and the already activated output are provided so that
    /// each function can use whichever form is numerically stable.
    fn derivatives(&self, triggers: &[f64], outputs: &[f64], derivatives: &mut [f64]);
}

/// [Activation function](https://en.wikipedia.org/wiki/Activation_function)
/// types.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Activator {
    /// Logistic sigmoid, ranging over `(0, 1)`
    #[serde(rename = "sigmoid")]
    Sigmoid,
    /// Sigmoid stretched to range over `(-1, 1)`
    #[serde(rename = "bipolar_sigmoid")]
    BipolarSigmoid,
    /// Hyperbolic tan function
    #[serde(rename = "tanh")]
    TanH,
    /// Rectified Linear Unit
    #[serde(rename = "relu")]
    ReLU,
    /// Leaky Rectified Linear Unit
    ///
    /// Takes an `alpha` value to use for negative inputs.
    #[serde(rename = "leaky_relu")]
    LeakyReLU(f64),
}

impl Activator {
    /// Evaluates `f(x)` for the selected the activation function.
    pub fn f(&self, x: f64) -> f64 {
        match *self {
            Activator::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activator::BipolarSigmoid => 2.0 / (1.0 + (-x).exp()) - 1.0,
            Activator::TanH => x.tanh(),
            Activator::ReLU => if x > 0.0 { x } else { 0.0 },
            Activator::LeakyReLU(alpha) => if x > 0.0 { x } else { alpha * x },
        }
    }

    /// Evaluates the derivative `f'(x)` given the trigger `x` and the
    /// activated output `y = f(x)`.
    ///
    /// The squashing functions derive from `y`, so the exponentials are not
    /// recomputed; the rectifiers derive from `x`, since `y == 0` is ambiguous
    /// for them.
    pub fn fprime(&self, x: f64, y: f64) -> f64 {
        match *self {
            Activator::Sigmoid => y * (1.0 - y),
            Activator::BipolarSigmoid => (1.0 - y * y) / 2.0,
            Activator::TanH => 1.0 - y * y,
            Activator::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            Activator::LeakyReLU(alpha) => if x > 0.0 { 1.0 } else { alpha },
        }
    }
}

impl Activation for Activator {
    fn activations(&self, triggers: &[f64], outputs: &mut [f64]) {
        assert_eq!(triggers.len(), outputs.len());
        for (x, y) in triggers.iter().zip(outputs.iter_mut()) {
            *y = self.f(*x);
        }
    }

    fn derivatives(&self, triggers: &[f64], outputs: &[f64], derivatives: &mut [f64]) {
        assert_eq!(triggers.len(), outputs.len());
        assert_eq!(triggers.len(), derivatives.len());
        for (x, y, d) in multizip((triggers.iter(), outputs.iter(), derivatives.iter_mut())) {
            *d = self.fprime(*x, *y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn sigmoid() {
        let s = Activator::Sigmoid;
        assert_abs_diff_eq!(s.f(0.0), 0.5);
        assert_abs_diff_eq!(s.fprime(0.0, 0.5), 0.25);
    }

    #[test]
    fn bipolar_sigmoid_derivative_is_halved() {
        let s = Activator::BipolarSigmoid;
        let y = s.f(0.3);
        assert_abs_diff_eq!(y, (0.15_f64).tanh(), epsilon = 1e-12);
        assert_abs_diff_eq!(s.fprime(0.3, y), (1.0 - y * y) / 2.0);
        assert_abs_diff_eq!(s.fprime(0.0, 0.0), 0.5);
    }

    #[test]
    fn tanh() {
        let t = Activator::TanH;
        let y = t.f(0.7);
        assert_abs_diff_eq!(y, 0.7_f64.tanh());
        assert_abs_diff_eq!(t.fprime(0.7, y), 1.0 - y * y);
    }

    #[test]
    fn relu_uses_trigger() {
        let r = Activator::ReLU;
        assert_eq!(r.f(-1.0), 0.0);
        assert_eq!(r.f(2.0), 2.0);
        assert_eq!(r.fprime(-1.0, 0.0), 0.0);
        assert_eq!(r.fprime(1e-9, 1e-9), 1.0);
        assert_eq!(Activator::LeakyReLU(0.1).fprime(-3.0, -0.3), 0.1);
    }

    #[test]
    fn vector_transforms() {
        let triggers = [-1.0, 0.0, 2.0];
        let mut outputs = [0.0; 3];
        let mut derivatives = [0.0; 3];
        Activator::ReLU.activations(&triggers, &mut outputs);
        Activator::ReLU.derivatives(&triggers, &outputs, &mut derivatives);
        assert_eq!(outputs, [0.0, 0.0, 2.0]);
        assert_eq!(derivatives, [0.0, 0.0, 1.0]);
    }
}
