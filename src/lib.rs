#[macro_use]
extern crate serde_derive;

pub mod activator;
pub mod backprop;
pub mod error;
pub mod iteration_error;
pub mod learning;
pub mod matrix;
pub mod network;
pub mod pattern;
pub mod propagation;
pub mod resilient;
pub mod strategy;
pub mod utils;

pub use crate::error::{Error, Result};
pub use crate::network::Network;
