//! Core abstractions for models that can be fitted.
//!
//! Provides the `Model` trait which defines what the optimizer needs from a
//! compiled model: the unnormalized log density on the unconstrained space,
//! the layout of the unconstrained parameters, and a way to map a position
//! back to constrained values for reporting.

use anyhow::{ensure, Result};
use rand::Rng;

use crate::math::central_gradient;

/// Errors that happen when we evaluate the log density.
pub trait LogpError: std::error::Error + Send + Sync + 'static {
    /// Recoverable errors are domain errors of the current parameters (for
    /// example an invalid covariance matrix). They reject the position but
    /// do not stop the fit. Unrecoverable errors abort it.
    fn is_recoverable(&self) -> bool;
}

/// A model with an unnormalized log density over an unconstrained parameter vector.
///
/// The optimizer borrows the model for the duration of one run and never
/// keeps it afterwards.
pub trait Model {
    type LogpError: LogpError;

    /// The number of unconstrained parameters.
    fn dim(&self) -> usize;

    /// Named blocks of the unconstrained vector in position order.
    ///
    /// The lengths must add up to [`Model::dim`]. Initial values are looked
    /// up by block name.
    fn parameter_blocks(&self) -> Vec<(String, usize)>;

    /// Names of the constrained values written by [`Model::write_constrained`],
    /// in the order they are written. Must be stable for a run.
    fn parameter_names(&self) -> Vec<String>;

    /// Compute the unnormalized log density at an unconstrained position.
    fn log_density(&mut self, position: &[f64]) -> Result<f64, Self::LogpError>;

    /// Compute the log density and its gradient.
    ///
    /// The default uses central finite differences of [`Model::log_density`].
    fn log_density_gradient(
        &mut self,
        position: &[f64],
        gradient: &mut [f64],
    ) -> Result<f64, Self::LogpError> {
        central_gradient(|x| self.log_density(x), position, gradient)
    }

    /// Map an unconstrained position to constrained values.
    ///
    /// `values` has one slot per entry of [`Model::parameter_names`]. Any
    /// diagnostic text the model produces on the way is appended to `messages`.
    fn write_constrained<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        position: &[f64],
        values: &mut [f64],
        messages: &mut String,
    );

    /// Map constrained initial values of one block to unconstrained coordinates.
    fn unconstrain(&self, name: &str, constrained: &[f64], unconstrained: &mut [f64]) -> Result<()> {
        ensure!(
            constrained.len() == unconstrained.len(),
            "expected {} values for `{}`, got {}",
            unconstrained.len(),
            name,
            constrained.len()
        );
        unconstrained.copy_from_slice(constrained);
        Ok(())
    }
}
