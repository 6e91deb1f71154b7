use rand::distr::{Alphanumeric, SampleString};

pub mod item;

pub mod job;

pub mod single_step;

pub mod step;

/// Generates a random name consisting of alphanumeric characters.
fn build_name() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 8)
}
