//! Newton's method for finding the mode of a log density.
//!
//! Each step computes the gradient and a finite difference Hessian at the
//! current position. The Hessian is eigendecomposed and every eigenvalue is
//! replaced by minus its absolute value, so the update always points uphill
//! even far from the mode where the log density is not concave. The update is
//! then shortened by halving until the log density does not decrease.

use faer::Mat;

use crate::{
    evaluate::reject,
    math::{all_finite, axpy_out, stencil_hessian},
    model::{LogpError, Model},
    step::Step,
    writer::Writer,
    FitError,
};

/// Log density assigned to trial points the model rejects.
const REJECTED_LOGP: f64 = -1e100;

/// Settings for [`NewtonStep`].
#[derive(Debug, Clone, Copy)]
pub struct NewtonSettings {
    /// Offset of the finite difference stencil for the Hessian.
    pub finite_diff_epsilon: f64,
    /// The line search gives up once the step size is smaller than this.
    pub min_step_size: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            finite_diff_epsilon: 1e-3,
            min_step_size: 1e-50,
        }
    }
}

/// Newton update with an eigenvalue corrected Hessian and backtracking.
#[derive(Debug, Clone, Default)]
pub struct NewtonStep {
    settings: NewtonSettings,
    gradient: Vec<f64>,
    hessian: Vec<f64>,
    direction: Vec<f64>,
    trial: Vec<f64>,
}

impl NewtonStep {
    pub fn new(settings: NewtonSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    fn resize(&mut self, dim: usize) {
        self.gradient.resize(dim, 0.);
        self.hessian.resize(dim * dim, 0.);
        self.direction.resize(dim, 0.);
        self.trial.resize(dim, 0.);
    }

    /// Compute the ascent direction `U |Λ|⁻¹ Uᵀ g` into `self.direction`.
    ///
    /// Returns false if the Hessian can not be used to compute a direction.
    fn solve_direction(&mut self, dim: usize) -> bool {
        if !all_finite(&self.hessian) {
            log::warn!("Hessian is not finite at the current position");
            return false;
        }
        let hessian = Mat::from_fn(dim, dim, |i, j| self.hessian[i * dim + j]);
        let eig = match hessian.self_adjoint_eigen(faer::Side::Lower) {
            Ok(eig) => eig,
            Err(err) => {
                log::warn!("eigendecomposition of the Hessian failed: {err:?}");
                return false;
            }
        };
        let vecs = eig.U();
        let vals = eig.S().column_vector().to_owned();

        self.direction.fill(0.);
        for (k, val) in vals.iter().enumerate() {
            let projection: f64 = (0..dim).map(|i| vecs[(i, k)] * self.gradient[i]).sum();
            let scaled = projection / val.abs();
            for (i, dir) in self.direction.iter_mut().enumerate() {
                *dir += vecs[(i, k)] * scaled;
            }
        }
        if !all_finite(&self.direction) {
            log::warn!("Hessian is singular at the current position");
            return false;
        }
        true
    }
}

impl<M: Model> Step<M> for NewtonStep {
    /// Take one Newton step.
    ///
    /// If the model rejects the current position the position is kept and
    /// negative infinity is returned. If the Hessian can not be evaluated or
    /// used, the position is kept and the current log density is returned.
    /// Model errors are reported like a rejected evaluation.
    fn step(
        &mut self,
        model: &mut M,
        position: &mut [f64],
        messages: &mut dyn Writer,
    ) -> Result<f64, FitError> {
        let dim = position.len();
        self.resize(dim);

        let current = match model.log_density_gradient(position, &mut self.gradient) {
            Ok(logp) => logp,
            Err(err) => {
                reject(err, messages)?;
                return Ok(f64::NEG_INFINITY);
            }
        };
        let hessian = stencil_hessian(
            |x, grad| model.log_density_gradient(x, grad),
            position,
            self.settings.finite_diff_epsilon,
            &mut self.hessian,
        );
        if let Err(err) = hessian {
            reject(err, messages)?;
            return Ok(current);
        }

        if !self.solve_direction(dim) {
            return Ok(current);
        }

        let mut step_size = 1.;
        loop {
            if step_size < self.settings.min_step_size {
                log::debug!("line search did not improve on {current}, keeping position");
                return Ok(current);
            }
            axpy_out(&self.direction, position, step_size, &mut self.trial);
            let trial_logp = match model.log_density(&self.trial) {
                Ok(logp) => logp,
                Err(err) if err.is_recoverable() => REJECTED_LOGP,
                Err(err) => return Err(FitError::LogpFailure(Box::new(err))),
            };
            if trial_logp >= current {
                position.copy_from_slice(&self.trial);
                return Ok(trial_logp);
            }
            step_size *= 0.5;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_models::{AlwaysFailing, NonNegativeNormal, NormalModel, ScaleModel},
        writer::{BufferWriter, NullWriter},
    };
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn quadratic_in_one_step() {
        let mut model = NormalModel::new(vec![1., -2., 3.]);
        let mut step = NewtonStep::default();
        let mut position = vec![0., 0., 0.];
        let logp = Step::step(&mut step, &mut model, &mut position, &mut NullWriter).unwrap();
        for (x, mu) in position.iter().zip([1., -2., 3.]) {
            assert_abs_diff_eq!(*x, mu, epsilon = 1e-5);
        }
        assert_abs_diff_eq!(logp, 0., epsilon = 1e-8);
    }

    #[test]
    fn never_decreases() {
        let mut model = ScaleModel::new(0.3);
        let mut step = NewtonStep::default();
        let mut position = vec![2., 1.5];
        let mut last = model.log_density(&position).unwrap();
        for _ in 0..20 {
            let logp = step.step(&mut model, &mut position, &mut NullWriter).unwrap();
            assert!(logp >= last);
            assert_abs_diff_eq!(logp, model.log_density(&position).unwrap(), epsilon = 1e-12);
            last = logp;
        }
        assert_abs_diff_eq!(position[0], 0.3, epsilon = 1e-4);
    }

    #[test]
    fn at_the_mode_position_is_kept() {
        let mut model = NormalModel::new(vec![0.5]);
        let mut step = NewtonStep::default();
        let mut position = vec![0.5];
        let logp = step.step(&mut model, &mut position, &mut NullWriter).unwrap();
        assert_eq!(position, vec![0.5]);
        assert_eq!(logp, 0.);
    }

    #[test]
    fn rejected_current_position() {
        let mut step = NewtonStep::default();
        let mut messages = BufferWriter::new();
        let mut position = vec![0.25, -0.5];

        let mut model = AlwaysFailing::new(2, true);
        let logp = step.step(&mut model, &mut position, &mut messages).unwrap();
        assert_eq!(logp, f64::NEG_INFINITY);
        assert_eq!(position, vec![0.25, -0.5]);
        let lines = messages.messages();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[2], "covariance matrix is not positive definite");

        let mut model = AlwaysFailing::new(2, false);
        let res = step.step(&mut model, &mut position, &mut messages);
        assert!(matches!(res, Err(FitError::LogpFailure(_))));
    }

    #[test]
    fn rejected_hessian_keeps_position() {
        let mut model = NonNegativeNormal::new(vec![1.]);
        let mut step = NewtonStep::default();
        let mut messages = BufferWriter::new();
        let mut position = vec![0.];
        let logp = step.step(&mut model, &mut position, &mut messages).unwrap();
        assert_eq!(position, vec![0.]);
        assert_eq!(logp, -0.5);
        assert!(messages.messages()[2].starts_with("x must be non-negative"));

        let mut position = vec![0.5];
        let logp = step.step(&mut model, &mut position, &mut messages).unwrap();
        assert_abs_diff_eq!(position[0], 1., epsilon = 1e-5);
        assert_abs_diff_eq!(logp, 0., epsilon = 1e-8);
    }

    struct NanGradient;

    impl Model for NanGradient {
        type LogpError = crate::test_models::NormalLogpError;

        fn dim(&self) -> usize {
            1
        }

        fn parameter_blocks(&self) -> Vec<(String, usize)> {
            vec![("x".to_string(), 1)]
        }

        fn parameter_names(&self) -> Vec<String> {
            vec!["x".to_string()]
        }

        fn log_density(&mut self, position: &[f64]) -> Result<f64, Self::LogpError> {
            Ok(-position[0].abs())
        }

        fn log_density_gradient(
            &mut self,
            position: &[f64],
            gradient: &mut [f64],
        ) -> Result<f64, Self::LogpError> {
            gradient.fill(f64::NAN);
            self.log_density(position)
        }

        fn write_constrained<R: rand::Rng + ?Sized>(
            &self,
            _rng: &mut R,
            position: &[f64],
            values: &mut [f64],
            _messages: &mut String,
        ) {
            values.copy_from_slice(position);
        }
    }

    #[test]
    fn unusable_hessian_keeps_position() {
        let mut step = NewtonStep::default();
        let mut messages = BufferWriter::new();
        let mut position = vec![3.];
        let logp = step.step(&mut NanGradient, &mut position, &mut messages).unwrap();
        assert_eq!(position, vec![3.]);
        assert_eq!(logp, -3.);
        assert!(messages.records().is_empty());
    }
}
