use std::marker::PhantomData;

use crate::{model::Model, writer::Writer, FitError};

/// One iteration of a fitting algorithm.
///
/// A step moves `position` in place to the next iterate and returns the log
/// density there. The optimizer does not know anything else about the
/// algorithm. Recoverable model errors should be absorbed by the step and
/// reported to `messages`, the way
/// [`safe_log_density`](crate::safe_log_density) does.
pub trait Step<M: Model> {
    fn step(
        &mut self,
        model: &mut M,
        position: &mut [f64],
        messages: &mut dyn Writer,
    ) -> Result<f64, FitError>;
}

impl<M: Model, S: Step<M> + ?Sized> Step<M> for &mut S {
    fn step(
        &mut self,
        model: &mut M,
        position: &mut [f64],
        messages: &mut dyn Writer,
    ) -> Result<f64, FitError> {
        (**self).step(model, position, messages)
    }
}

impl<M: Model, S: Step<M> + ?Sized> Step<M> for Box<S> {
    fn step(
        &mut self,
        model: &mut M,
        position: &mut [f64],
        messages: &mut dyn Writer,
    ) -> Result<f64, FitError> {
        (**self).step(model, position, messages)
    }
}

/// A step strategy defined by a closure, see [`step_fn`].
pub struct FnStep<M, F> {
    func: F,
    _model: PhantomData<fn(&mut M)>,
}

/// Use a closure as step strategy.
///
/// The closure does not see the message writer.
///
/// ```
/// use optimize_rs::{step_fn, test_models::NormalModel, NullWriter, Step};
///
/// let mut step = step_fn(|_model: &mut NormalModel, position: &mut [f64]| {
///     position.iter_mut().for_each(|x| *x *= 0.5);
///     Ok(-0.5 * position.iter().map(|x| x * x).sum::<f64>())
/// });
/// let mut model = NormalModel::new(vec![0.; 2]);
/// let mut position = vec![2., -2.];
/// let logp = step.step(&mut model, &mut position, &mut NullWriter).unwrap();
/// assert_eq!(position, vec![1., -1.]);
/// assert_eq!(logp, -1.);
/// ```
pub fn step_fn<M, F>(func: F) -> FnStep<M, F>
where
    M: Model,
    F: FnMut(&mut M, &mut [f64]) -> Result<f64, FitError>,
{
    FnStep {
        func,
        _model: PhantomData,
    }
}

impl<M, F> Step<M> for FnStep<M, F>
where
    M: Model,
    F: FnMut(&mut M, &mut [f64]) -> Result<f64, FitError>,
{
    fn step(
        &mut self,
        model: &mut M,
        position: &mut [f64],
        _messages: &mut dyn Writer,
    ) -> Result<f64, FitError> {
        (self.func)(model, position)
    }
}
