//! Randomness used by the simulation, kept behind a small trait so tests can
//! replay exact draws.

use rand::prelude::*;
use rand_distr::Normal;
use std::collections::VecDeque;

/// Source of every random draw the simulation core consumes.
pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
    /// Uniform index in `[0, upper)`. `upper` must be non-zero.
    fn next_index(&mut self, upper: usize) -> usize;
    /// Sample from a normal distribution.
    fn next_normal(&mut self, dist: &Normal<f64>) -> f64;
}

/// Adapts any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R: Rng> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    /// Unseeded source drawing its state from the operating system.
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Reproducible source.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn next_index(&mut self, upper: usize) -> usize {
        self.rng.random_range(0..upper)
    }

    fn next_normal(&mut self, dist: &Normal<f64>) -> f64 {
        self.rng.sample(dist)
    }
}

/// Replays scripted draws in order. Panics when a queue runs dry, since a
/// test that consumes more draws than it scripted is a broken test.
#[derive(Debug, Clone, Default)]
pub struct SequenceSource {
    units: VecDeque<f64>,
    indices: VecDeque<usize>,
    normals: VecDeque<f64>,
}

impl SequenceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_units(mut self, units: impl IntoIterator<Item = f64>) -> Self {
        self.units.extend(units);
        self
    }

    pub fn with_indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.indices.extend(indices);
        self
    }

    pub fn with_normals(mut self, normals: impl IntoIterator<Item = f64>) -> Self {
        self.normals.extend(normals);
        self
    }

    /// Number of scripted draws not yet consumed, across all queues.
    pub fn remaining(&self) -> usize {
        self.units.len() + self.indices.len() + self.normals.len()
    }
}

impl RandomSource for SequenceSource {
    fn next_unit(&mut self) -> f64 {
        match self.units.pop_front() {
            Some(u) => u,
            None => panic!("SequenceSource: unit draws exhausted"),
        }
    }

    fn next_index(&mut self, upper: usize) -> usize {
        match self.indices.pop_front() {
            Some(i) if i < upper => i,
            Some(i) => panic!("SequenceSource: scripted index {} out of range 0..{}", i, upper),
            None => panic!("SequenceSource: index draws exhausted"),
        }
    }

    fn next_normal(&mut self, _dist: &Normal<f64>) -> f64 {
        match self.normals.pop_front() {
            Some(n) => n,
            None => panic!("SequenceSource: normal draws exhausted"),
        }
    }
}
