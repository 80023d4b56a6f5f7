//! Small models for tests, benchmarks and smoke tests of downstream code.

use anyhow::{ensure, Result};
use rand::Rng;
use thiserror::Error;

use crate::{init::unconstrained_names, model::LogpError, Model};

#[derive(Error, Debug)]
pub enum NormalLogpError {}

impl LogpError for NormalLogpError {
    fn is_recoverable(&self) -> bool {
        true
    }
}

/// Independent standard normals centered at `mu`, in a single block `x`.
#[derive(Debug, Clone)]
pub struct NormalModel {
    mu: Vec<f64>,
    pub blocks: Vec<(String, usize)>,
    /// Text reported every time the model writes constrained values.
    pub print_message: Option<String>,
    /// Number of log density evaluations so far.
    pub evaluations: u64,
}

impl NormalModel {
    pub fn new(mu: Vec<f64>) -> Self {
        let blocks = vec![("x".to_string(), mu.len())];
        Self {
            mu,
            blocks,
            print_message: None,
            evaluations: 0,
        }
    }
}

impl Model for NormalModel {
    type LogpError = NormalLogpError;

    fn dim(&self) -> usize {
        self.mu.len()
    }

    fn parameter_blocks(&self) -> Vec<(String, usize)> {
        self.blocks.clone()
    }

    fn parameter_names(&self) -> Vec<String> {
        unconstrained_names(&self.blocks)
    }

    fn log_density(&mut self, position: &[f64]) -> Result<f64, Self::LogpError> {
        self.evaluations += 1;
        let mut logp = 0f64;
        for (x, mu) in position.iter().zip(self.mu.iter()) {
            let diff = x - mu;
            logp -= diff * diff / 2.;
        }
        Ok(logp)
    }

    fn log_density_gradient(
        &mut self,
        position: &[f64],
        gradient: &mut [f64],
    ) -> Result<f64, Self::LogpError> {
        position
            .iter()
            .zip(self.mu.iter())
            .zip(gradient.iter_mut())
            .for_each(|((x, mu), grad)| *grad = mu - x);
        self.log_density(position)
    }

    fn write_constrained<R: Rng + ?Sized>(
        &self,
        _rng: &mut R,
        position: &[f64],
        values: &mut [f64],
        messages: &mut String,
    ) {
        values.copy_from_slice(position);
        if let Some(text) = &self.print_message {
            messages.push_str(text);
        }
    }
}

/// Normal likelihood for three observations around `center` with unknown
/// location `mu` and scale `sigma`. `sigma` is stored on the log scale.
#[derive(Debug, Clone)]
pub struct ScaleModel {
    data: [f64; 3],
}

impl ScaleModel {
    pub fn new(center: f64) -> Self {
        Self {
            data: [center - 1., center, center + 1.],
        }
    }
}

impl Model for ScaleModel {
    type LogpError = NormalLogpError;

    fn dim(&self) -> usize {
        2
    }

    fn parameter_blocks(&self) -> Vec<(String, usize)> {
        vec![("mu".to_string(), 1), ("sigma".to_string(), 1)]
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["mu".to_string(), "sigma".to_string()]
    }

    fn log_density(&mut self, position: &[f64]) -> Result<f64, Self::LogpError> {
        let (mu, log_sigma) = (position[0], position[1]);
        let inv_var = (-2. * log_sigma).exp();
        let sum_sq: f64 = self.data.iter().map(|y| (y - mu) * (y - mu)).sum();
        Ok(-(self.data.len() as f64) * log_sigma - 0.5 * sum_sq * inv_var)
    }

    fn write_constrained<R: Rng + ?Sized>(
        &self,
        _rng: &mut R,
        position: &[f64],
        values: &mut [f64],
        _messages: &mut String,
    ) {
        values[0] = position[0];
        values[1] = position[1].exp();
    }

    fn unconstrain(&self, name: &str, constrained: &[f64], unconstrained: &mut [f64]) -> Result<()> {
        ensure!(
            constrained.len() == 1,
            "expected a scalar for `{name}`, got {} values",
            constrained.len()
        );
        match name {
            "sigma" => {
                ensure!(constrained[0] > 0., "sigma must be positive, got {}", constrained[0]);
                unconstrained[0] = constrained[0].ln();
            }
            _ => unconstrained[0] = constrained[0],
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
#[error("{message}")]
pub struct DomainError {
    message: String,
    recoverable: bool,
}

impl DomainError {
    pub fn new(message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            message: message.into(),
            recoverable,
        }
    }
}

impl LogpError for DomainError {
    fn is_recoverable(&self) -> bool {
        self.recoverable
    }
}

/// A model whose log density fails everywhere.
#[derive(Debug, Clone)]
pub struct AlwaysFailing {
    dim: usize,
    recoverable: bool,
}

impl AlwaysFailing {
    pub fn new(dim: usize, recoverable: bool) -> Self {
        Self { dim, recoverable }
    }
}

impl Model for AlwaysFailing {
    type LogpError = DomainError;

    fn dim(&self) -> usize {
        self.dim
    }

    fn parameter_blocks(&self) -> Vec<(String, usize)> {
        vec![("x".to_string(), self.dim)]
    }

    fn parameter_names(&self) -> Vec<String> {
        unconstrained_names(&self.parameter_blocks())
    }

    fn log_density(&mut self, _position: &[f64]) -> Result<f64, Self::LogpError> {
        Err(DomainError::new(
            "covariance matrix is not positive definite",
            self.recoverable,
        ))
    }

    fn write_constrained<R: Rng + ?Sized>(
        &self,
        _rng: &mut R,
        position: &[f64],
        values: &mut [f64],
        _messages: &mut String,
    ) {
        values.copy_from_slice(position);
    }
}

/// A standard normal around `mu` that only accepts non-negative positions.
///
/// Negative coordinates are rejected with a recoverable error, so finite
/// differences taken on the boundary fail.
#[derive(Debug, Clone)]
pub struct NonNegativeNormal {
    mu: Vec<f64>,
}

impl NonNegativeNormal {
    pub fn new(mu: Vec<f64>) -> Self {
        Self { mu }
    }
}

impl Model for NonNegativeNormal {
    type LogpError = DomainError;

    fn dim(&self) -> usize {
        self.mu.len()
    }

    fn parameter_blocks(&self) -> Vec<(String, usize)> {
        vec![("x".to_string(), self.mu.len())]
    }

    fn parameter_names(&self) -> Vec<String> {
        unconstrained_names(&self.parameter_blocks())
    }

    fn log_density(&mut self, position: &[f64]) -> Result<f64, Self::LogpError> {
        if let Some(x) = position.iter().find(|&&x| x < 0.) {
            return Err(DomainError::new(format!("x must be non-negative, got {x}"), true));
        }
        Ok(position
            .iter()
            .zip(self.mu.iter())
            .map(|(x, mu)| -(x - mu) * (x - mu) / 2.)
            .sum())
    }

    fn log_density_gradient(
        &mut self,
        position: &[f64],
        gradient: &mut [f64],
    ) -> Result<f64, Self::LogpError> {
        let logp = self.log_density(position)?;
        position
            .iter()
            .zip(self.mu.iter())
            .zip(gradient.iter_mut())
            .for_each(|((x, mu), grad)| *grad = mu - x);
        Ok(logp)
    }

    fn write_constrained<R: Rng + ?Sized>(
        &self,
        _rng: &mut R,
        position: &[f64],
        values: &mut [f64],
        _messages: &mut String,
    ) {
        values.copy_from_slice(position);
    }
}
