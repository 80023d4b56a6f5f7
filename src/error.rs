use thiserror::Error;

/// Errors that abort a fit.
///
/// Domain errors raised while evaluating the log density never show up here,
/// they are absorbed by [`safe_log_density`](crate::safe_log_density).
#[derive(Error, Debug)]
pub enum FitError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Logp function returned unrecoverable error")]
    LogpFailure(Box<dyn std::error::Error + Send + Sync>),
    #[error("step strategy failed: {0}")]
    StepFailed(String),
    #[error(transparent)]
    Output(#[from] anyhow::Error),
}

impl FitError {
    pub fn return_code(&self) -> ReturnCode {
        match self {
            FitError::Config(ConfigError::NonFiniteInit { .. })
            | FitError::Config(ConfigError::InvalidInit { .. }) => ReturnCode::DataErr,
            FitError::Config(_) => ReturnCode::Config,
            FitError::LogpFailure(_) | FitError::StepFailed(_) | FitError::Output(_) => {
                ReturnCode::Software
            }
        }
    }
}

/// Invalid setup detected before the first write to any writer.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("init radius must be finite and non-negative, got {0}")]
    InvalidRadius(f64),
    #[error("convergence tolerance must be finite and non-negative, got {0}")]
    InvalidTolerance(f64),
    #[error("parameter blocks cover {found} unconstrained values, but the model has dimension {expected}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("parameter block `{0}` is declared more than once")]
    DuplicateBlock(String),
    #[error("initial value for `{name}` is not finite")]
    NonFiniteInit { name: String },
    #[error("initial value for `{name}` is invalid: {message}")]
    InvalidInit { name: String, message: String },
}

/// Violations of the header/row contract of a [`Writer`](crate::Writer).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WriterError {
    #[error("header was already written")]
    DuplicateHeader,
    #[error("row written before the header")]
    RowBeforeHeader,
    #[error("row has {found} values, but the header has {expected} columns")]
    ArityMismatch { expected: usize, found: usize },
}

/// Process exit codes shared with the command line front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ReturnCode {
    Ok = 0,
    Usage = 64,
    DataErr = 65,
    NoInput = 66,
    Software = 70,
    Config = 78,
}

impl From<ReturnCode> for i32 {
    fn from(code: ReturnCode) -> Self {
        code as i32
    }
}
