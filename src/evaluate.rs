//! Evaluation of the log density that survives domain errors.
//!
//! A model can fail to evaluate at a particular position, for example when
//! the current parameters imply a covariance matrix that is not positive
//! definite. Such a failure rejects the position instead of aborting the fit:
//! the log density is reported as negative infinity and a notice is written
//! to the message writer.

use anyhow::Result;

use crate::{
    model::{LogpError, Model},
    writer::Writer,
    FitError,
};

/// The outcome of evaluating the log density at one position.
#[derive(Debug)]
pub enum Evaluation<E> {
    /// The model returned a log density.
    Density(f64),
    /// The model rejected the position with a recoverable error.
    Rejected(E),
}

impl<E> Evaluation<E> {
    /// The log density, negative infinity for a rejected position.
    pub fn log_density(&self) -> f64 {
        match self {
            Evaluation::Density(logp) => *logp,
            Evaluation::Rejected(_) => f64::NEG_INFINITY,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Evaluation::Rejected(_))
    }
}

/// Evaluate the log density, separating recoverable from unrecoverable errors.
pub fn try_log_density<M: Model + ?Sized>(
    model: &mut M,
    position: &[f64],
) -> Result<Evaluation<M::LogpError>, FitError> {
    match model.log_density(position) {
        Ok(logp) => Ok(Evaluation::Density(logp)),
        Err(err) if err.is_recoverable() => Ok(Evaluation::Rejected(err)),
        Err(err) => Err(FitError::LogpFailure(Box::new(err))),
    }
}

/// Evaluate the log density and turn a domain error into negative infinity.
///
/// On a recoverable error the rejection notice is written to `messages`.
/// Only unrecoverable model errors and writer failures are returned as errors.
pub fn safe_log_density<M: Model + ?Sized>(
    model: &mut M,
    position: &[f64],
    messages: &mut dyn Writer,
) -> Result<f64, FitError> {
    match model.log_density(position) {
        Ok(logp) => Ok(logp),
        Err(err) => {
            reject(err, messages)?;
            Ok(f64::NEG_INFINITY)
        }
    }
}

/// Absorb a recoverable model error by writing the rejection notice.
///
/// Unrecoverable errors are returned as [`FitError::LogpFailure`].
pub(crate) fn reject<E: LogpError>(err: E, messages: &mut dyn Writer) -> Result<(), FitError> {
    if !err.is_recoverable() {
        return Err(FitError::LogpFailure(Box::new(err)));
    }
    log::warn!("log density evaluation rejected: {err}");
    write_rejection_notice(messages, &err.to_string())?;
    Ok(())
}

/// Write the informational notice for a rejected position.
pub fn write_rejection_notice(messages: &mut dyn Writer, detail: &str) -> Result<()> {
    messages.message("")?;
    messages.message(
        "Informational Message: The current proposal is about to be rejected \
         because of the following issue:",
    )?;
    messages.message(detail)?;
    messages.message(
        "If this warning occurs sporadically, such as for highly constrained \
         variable types like covariance matrices, then the optimizer is fine,",
    )?;
    messages.message(
        "but if this warning occurs often then your model may be either \
         severely ill-conditioned or misspecified.",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_models::{AlwaysFailing, NormalModel},
        writer::BufferWriter,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn finite_density_writes_nothing() {
        let mut model = NormalModel::new(vec![1., 2.]);
        let mut messages = BufferWriter::new();
        let logp = safe_log_density(&mut model, &[1., 2.], &mut messages).unwrap();
        assert_eq!(logp, 0.);
        assert!(messages.records().is_empty());
    }

    #[test]
    fn domain_error_becomes_neg_infinity() {
        let mut model = AlwaysFailing::new(2, true);
        let mut messages = BufferWriter::new();
        let logp = safe_log_density(&mut model, &[0., 0.], &mut messages).unwrap();
        assert_eq!(logp, f64::NEG_INFINITY);

        let lines = messages.messages();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "");
        assert!(lines[1].starts_with("Informational Message:"));
        assert_eq!(lines[2], "covariance matrix is not positive definite");
        assert!(lines[3].starts_with("If this warning occurs sporadically"));
        assert!(lines[4].contains("ill-conditioned or misspecified"));
    }

    #[test]
    fn unrecoverable_error_propagates() {
        let mut model = AlwaysFailing::new(1, false);
        let mut messages = BufferWriter::new();
        let res = safe_log_density(&mut model, &[0.], &mut messages);
        assert!(matches!(res, Err(FitError::LogpFailure(_))));
        assert!(messages.records().is_empty());
    }

    #[test]
    fn rejected_evaluation() {
        let mut model = AlwaysFailing::new(1, true);
        let evaluation = try_log_density(&mut model, &[0.]).unwrap();
        assert!(evaluation.is_rejected());
        assert_eq!(evaluation.log_density(), f64::NEG_INFINITY);
    }
}
