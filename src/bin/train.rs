use clap::{Parser, ValueEnum};
use neuroprop::activator::Activator;
use neuroprop::backprop::{Backpropagation, Momentum};
use neuroprop::learning::{Logging, StopCondition, Trainer};
use neuroprop::pattern::{Pattern, PatternSet, SupervisedPattern};
use neuroprop::propagation::{Mode, Propagation};
use neuroprop::resilient::{Resilient, ResilientPropagation, RpropType};
use neuroprop::strategy::SmartLearningRate;
use neuroprop::Network;
use rand::distributions::Uniform;
use rand::Rng;
use rand_distr::StandardNormal;

use std::process;

#[derive(Copy, Clone, Debug, PartialEq, ValueEnum)]
enum Algorithm {
    /// Momentum gradient descent with a decaying learning rate
    Backprop,
    /// RPROP+
    Rprop,
    /// iRPROP+
    Irprop,
}

#[derive(Copy, Clone, Debug, PartialEq, ValueEnum)]
enum UpdateMode {
    Batch,
    Online,
}

impl From<UpdateMode> for Mode {
    fn from(mode: UpdateMode) -> Mode {
        match mode {
            UpdateMode::Batch => Mode::Batch,
            UpdateMode::Online => Mode::Online,
        }
    }
}

/// Trains a classifier that tells apart the quadrants of a noisy unit circle.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Optimizer to train with
    #[arg(long, value_enum, default_value_t = Algorithm::Irprop)]
    algorithm: Algorithm,

    /// When weights are updated
    #[arg(long, value_enum, default_value_t = UpdateMode::Batch)]
    mode: UpdateMode,

    /// Neurons per layer, inputs first and outputs last
    #[arg(long, value_delimiter = ',', default_value = "2,5,5,2")]
    layers: Vec<usize>,

    /// Number of training samples to generate
    #[arg(long, default_value_t = 10_000)]
    samples: usize,

    /// Stop after this many iterations
    #[arg(long, default_value_t = 500)]
    max_iterations: usize,

    /// Stop once the training error drops below this
    #[arg(long, default_value_t = 0.01)]
    target_error: f64,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,
}

fn generate_data<R: Rng>(num_samples: usize, rng: &mut R) -> PatternSet {
    let radians = Uniform::new(0.0, 2.0 * std::f64::consts::PI);

    (0..num_samples)
        .map(|_| {
            let theta = rng.sample(radians);
            let dx: f64 = rng.sample(StandardNormal);
            let dy: f64 = rng.sample(StandardNormal);
            let point = [theta.cos() + 0.1 * dx, theta.sin() + 0.1 * dy];
            let (class, label) = if point[0] * point[1] > 0.0 {
                ([1.0, 0.0], "same sign")
            } else {
                ([0.0, 1.0], "mixed sign")
            };
            SupervisedPattern::new(point, class).with_label(label)
        })
        .collect()
}

fn score(set_name: &str, network: &Network, data: &PatternSet) -> neuroprop::Result<()> {
    let mut num_correct = 0;
    for pattern in data.as_slice() {
        let output = network.run(pattern.inputs())?;
        let class = if output[0] > output[1] { 0 } else { 1 };
        if pattern.target().map_or(false, |target| target[class] == 1.0) {
            num_correct += 1;
        }
    }
    println!(
        "{} set results: {} of {} correct",
        set_name,
        num_correct,
        data.as_slice().len()
    );
    Ok(())
}

fn run(args: &Args) -> neuroprop::Result<()> {
    let mut rng = rand::thread_rng();
    let training_data = generate_data(args.samples, &mut rng);
    let network = Network::with_rng(&args.layers, Activator::Sigmoid, &mut rng)?;
    let stop = StopCondition::ErrorOrIterations(args.target_error, args.max_iterations);
    let logging = Logging::Iterations(50);

    let network = match args.algorithm {
        Algorithm::Backprop => {
            let method: Backpropagation<_> =
                Propagation::new(network, training_data.clone(), Momentum::new(0.7, 0.3))?
                    .mode(args.mode.into());
            Trainer::new(method)
                .strategy(SmartLearningRate::new())
                .logging(logging)
                .stop_condition(stop)
                .train()?
                .into_network()
        }
        Algorithm::Rprop | Algorithm::Irprop => {
            let kind = if args.algorithm == Algorithm::Rprop {
                RpropType::RpropPlus
            } else {
                RpropType::IRpropPlus
            };
            let method: ResilientPropagation<_> =
                Propagation::new(network, training_data.clone(), Resilient::new(kind))?
                    .mode(args.mode.into());
            Trainer::new(method)
                .logging(logging)
                .stop_condition(stop)
                .train()?
                .into_network()
        }
    };

    println!();
    score("Training", &network, &training_data)?;
    score("Test", &network, &generate_data(args.samples / 10, &mut rng))?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .parse_default_env()
        .init();

    if let Err(err) = run(&args) {
        log::error!("training failed: {}", err);
        process::exit(1);
    }
}
