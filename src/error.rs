//! Error types shared across the crate.

use thiserror::Error;

/// Errors raised while building networks or running training iterations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A network needs at least an input and an output layer.
    #[error("network must have at least two layers, but got {0}")]
    TooFewLayers(usize),

    /// Layer widths of zero are not allowed.
    #[error("layer {0} has no neurons")]
    EmptyLayer(usize),

    /// A weight matrix does not line up with the layer feeding it.
    #[error("layer {layer} expects {expected} inputs, but the previous layer has {got} neurons")]
    Topology {
        layer: usize,
        expected: usize,
        got: usize,
    },

    /// A pattern with no inputs at all.
    #[error("pattern has no inputs")]
    EmptyPattern,

    /// Pattern inputs do not match the input layer.
    #[error("expected {expected} input(s), but got {got}")]
    InputSize { expected: usize, got: usize },

    /// A pattern's error vector does not match the output layer.
    #[error("expected {expected} error component(s), but got {got}")]
    ErrorSize { expected: usize, got: usize },

    /// A supervised pattern has no target to compare against.
    #[error("pattern has no target outputs")]
    MissingTarget,

    /// Restored optimizer state does not fit the network.
    #[error("optimizer state does not match the network: {0}")]
    StateShape(String),

    /// An rprop variant name that is not recognised.
    #[error("unknown rprop type {0:?}")]
    UnknownRpropType(String),

    /// A configuration value outside its valid range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
