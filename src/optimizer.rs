use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    evaluate::safe_log_density,
    init::{initialize, InitSource},
    interrupt::Interrupt,
    model::Model,
    step::Step,
    writer::Writer,
    ConfigError, FitError, ReturnCode,
};

/// Settings for a single optimization run.
#[derive(Debug, Clone, Copy)]
pub struct FitSettings {
    /// Base seed shared by all chains.
    pub seed: u64,
    /// Chain id, selects an independent random stream for the same seed.
    pub chain: u64,
    /// Parameters without initial values are drawn uniformly from
    /// `[-init_radius, init_radius]` on the unconstrained scale.
    /// With a radius of zero they start at zero.
    pub init_radius: f64,
    /// The maximum number of steps.
    pub max_iterations: u64,
    /// Write every iterate to the parameter writer, not only the final one.
    pub save_iterations: bool,
    /// Stop once the absolute change of the log density is at most this.
    pub tolerance: f64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            chain: 0,
            init_radius: 2.,
            max_iterations: 2000,
            save_iterations: false,
            tolerance: 1e-8,
        }
    }
}

impl FitSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.init_radius.is_finite() || self.init_radius < 0. {
            return Err(ConfigError::InvalidRadius(self.init_radius));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0. {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }
}

/// The random number generator for one chain.
///
/// The same `(seed, chain)` always gives the same stream, different chains
/// with the same seed give independent streams.
pub fn chain_rng(seed: u64, chain: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(chain);
    rng
}

/// Why the iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    /// The log density changed by at most the tolerance.
    Converged,
    /// All iterations were used up.
    MaxIterationsReached,
    /// The interrupt asked to stop.
    Cancelled,
}

impl FitStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, FitStatus::Converged | FitStatus::MaxIterationsReached)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub status: FitStatus,
    pub log_density: f64,
    /// The final unconstrained position.
    pub position: Vec<f64>,
    /// The number of steps that were taken.
    pub iterations: u64,
}

impl FitOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn return_code(&self) -> ReturnCode {
        if self.is_success() {
            ReturnCode::Ok
        } else {
            ReturnCode::Software
        }
    }
}

/// Progress of one iteration, displayed as the progress message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    pub index: u64,
    pub log_density: f64,
    pub delta: f64,
}

impl fmt::Display for IterationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Iteration {:>2}. Log joint probability = {:>10}. Improved by {}.",
            self.index,
            format_general(self.log_density),
            self.delta
        )
    }
}

/// Format with six significant digits, switching to exponent notation for
/// very small or large magnitudes.
fn format_general(value: f64) -> String {
    if !value.is_finite() || value == 0. {
        return value.to_string();
    }
    let scientific = format!("{:.5e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => return scientific,
    };
    if !(-4..6).contains(&exponent) {
        return format!("{}e{}", trim_zeros(mantissa), exponent);
    }
    let decimals = (5 - exponent) as usize;
    trim_zeros(&format!("{:.*}", decimals, value)).to_string()
}

fn trim_zeros(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

/// The writers a run reports to. They are borrowed for the run only.
pub struct Writers<'a> {
    /// Free text messages and progress.
    pub message: &'a mut dyn Writer,
    /// The initial unconstrained position.
    pub init: &'a mut dyn Writer,
    /// `lp__` and the constrained parameter values.
    pub parameter: &'a mut dyn Writer,
}

/// Runs a step strategy against a model until it converges, runs out of
/// iterations or is interrupted.
pub struct Optimizer<'model, M, S, R = ChaCha8Rng>
where
    M: Model,
    S: Step<M>,
    R: Rng,
{
    model: &'model mut M,
    step: S,
    rng: R,
    settings: FitSettings,
}

impl<'model, M, S> Optimizer<'model, M, S, ChaCha8Rng>
where
    M: Model,
    S: Step<M>,
{
    /// Create an optimizer with the random stream for `settings.seed` and `settings.chain`.
    pub fn new(model: &'model mut M, step: S, settings: FitSettings) -> Self {
        let rng = chain_rng(settings.seed, settings.chain);
        Self::with_rng(model, step, settings, rng)
    }
}

impl<'model, M, S, R> Optimizer<'model, M, S, R>
where
    M: Model,
    S: Step<M>,
    R: Rng,
{
    pub fn with_rng(model: &'model mut M, step: S, settings: FitSettings, rng: R) -> Self {
        Self {
            model,
            step,
            rng,
            settings,
        }
    }

    pub fn settings(&self) -> &FitSettings {
        &self.settings
    }

    /// Run the fit.
    ///
    /// Configuration errors are returned before anything is written. Once
    /// the initial position exists, the final iterate is written exactly
    /// once, whether the run converged, ran out of iterations or was
    /// cancelled.
    pub fn run<I, N>(
        self,
        inits: &I,
        interrupt: &mut N,
        writers: Writers<'_>,
    ) -> Result<FitOutcome, FitError>
    where
        I: InitSource + ?Sized,
        N: Interrupt + ?Sized,
    {
        let Optimizer {
            model,
            mut step,
            mut rng,
            settings,
        } = self;
        let Writers {
            message,
            init,
            parameter,
        } = writers;

        settings.validate()?;

        let mut position = initialize(&*model, inits, &mut rng, settings.init_radius, init)?;
        let mut log_density = safe_log_density(model, &position, message)?;

        let mut names = vec!["lp__".to_string()];
        names.extend(model.parameter_names());
        parameter.header(&names)?;
        message.message(&format!(
            "Initial log joint probability = {}",
            format_general(log_density)
        ))?;
        log::debug!(
            "starting chain {} at log density {log_density} with {} parameters",
            settings.chain,
            position.len()
        );

        let mut status = FitStatus::MaxIterationsReached;
        let mut iterations = 0;
        for index in 1..=settings.max_iterations {
            if settings.save_iterations {
                write_draw(&*model, &mut rng, &position, log_density, names.len(), message, parameter)?;
            }
            if interrupt.is_interrupted() {
                log::info!("chain {} cancelled before iteration {index}", settings.chain);
                status = FitStatus::Cancelled;
                break;
            }

            let previous = log_density;
            log_density = match step.step(model, &mut position, message) {
                Ok(logp) => logp,
                Err(err) => {
                    log::error!("chain {} failed in iteration {index}: {err}", settings.chain);
                    let columns = names.len();
                    let mut writers = Writers {
                        message,
                        init,
                        parameter,
                    };
                    finalize(&*model, &mut rng, &position, previous, columns, &mut writers)?;
                    return Err(err);
                }
            };
            iterations = index;

            let record = IterationRecord {
                index,
                log_density,
                delta: log_density - previous,
            };
            message.message(&record.to_string())?;
            log::debug!("{record}");

            if record.delta.abs() <= settings.tolerance {
                status = FitStatus::Converged;
                break;
            }
        }

        let mut writers = Writers {
            message,
            init,
            parameter,
        };
        finalize(&*model, &mut rng, &position, log_density, names.len(), &mut writers)?;

        log::info!(
            "chain {} finished with {:?} after {iterations} iterations, log density {log_density}",
            settings.chain,
            status
        );
        Ok(FitOutcome {
            status,
            log_density,
            position,
            iterations,
        })
    }
}

/// Write the final row and flush all writers.
fn finalize<M: Model, R: Rng + ?Sized>(
    model: &M,
    rng: &mut R,
    position: &[f64],
    log_density: f64,
    columns: usize,
    writers: &mut Writers<'_>,
) -> Result<(), FitError> {
    write_draw(
        model,
        rng,
        position,
        log_density,
        columns,
        writers.message,
        writers.parameter,
    )?;
    writers.message.flush()?;
    writers.init.flush()?;
    writers.parameter.flush()?;
    Ok(())
}

/// Write `[log_density] ++ constrained values` as one row.
fn write_draw<M: Model, R: Rng + ?Sized>(
    model: &M,
    rng: &mut R,
    position: &[f64],
    log_density: f64,
    columns: usize,
    message: &mut dyn Writer,
    parameter: &mut dyn Writer,
) -> Result<(), FitError> {
    let mut row = vec![0f64; columns];
    row[0] = log_density;
    let mut text = String::new();
    model.write_constrained(rng, position, &mut row[1..], &mut text);
    if !text.is_empty() {
        message.message(&text)?;
    }
    parameter.row(&row)?;
    Ok(())
}
