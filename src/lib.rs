//! Drive mode-finding algorithms against unnormalized log densities.
//!
//! An [`Optimizer`] takes a [`Model`], a [`Step`] strategy and
//! [`FitSettings`], builds a reproducible initial position, and iterates the
//! step until the log density stops changing, the iteration budget is used
//! up, or an [`Interrupt`] asks it to stop. Progress goes to a message
//! [`Writer`], the final iterate (and optionally every iterate) to a
//! parameter writer.
//!
//! ```
//! use optimize_rs::{
//!     test_models::NormalModel, BufferWriter, FitSettings, FitStatus, NewtonStep, NoInits,
//!     NoInterrupt, Optimizer, Writers,
//! };
//!
//! let mut model = NormalModel::new(vec![1., -1.]);
//! let settings = FitSettings { seed: 42, ..Default::default() };
//!
//! let mut message = BufferWriter::new();
//! let mut init = BufferWriter::new();
//! let mut parameter = BufferWriter::new();
//! let writers = Writers {
//!     message: &mut message,
//!     init: &mut init,
//!     parameter: &mut parameter,
//! };
//!
//! let outcome = Optimizer::new(&mut model, NewtonStep::default(), settings)
//!     .run(&NoInits, &mut NoInterrupt, writers)
//!     .unwrap();
//! assert_eq!(outcome.status, FitStatus::Converged);
//! assert_eq!(parameter.rows().len(), 1);
//! ```

pub(crate) mod csv_writer;
pub(crate) mod error;
pub(crate) mod evaluate;
pub(crate) mod init;
pub(crate) mod interrupt;
pub(crate) mod math;
pub(crate) mod model;
pub(crate) mod newton;
pub(crate) mod optimizer;
pub(crate) mod step;
pub mod test_models;
pub(crate) mod writer;

pub use csv_writer::CsvWriter;
pub use error::{ConfigError, FitError, ReturnCode, WriterError};
pub use evaluate::{safe_log_density, try_log_density, write_rejection_notice, Evaluation};
pub use init::{initialize, unconstrained_names, InitSource, NoInits};
pub use interrupt::{CancelFlag, Deadline, Interrupt, NoInterrupt};
pub use model::{LogpError, Model};
pub use newton::{NewtonSettings, NewtonStep};
pub use optimizer::{
    chain_rng, FitOutcome, FitSettings, FitStatus, IterationRecord, Optimizer, Writers,
};
pub use step::{step_fn, FnStep, Step};
pub use writer::{BufferWriter, LogWriter, NullWriter, Record, Writer};
