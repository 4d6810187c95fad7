use thiserror::Error;

/// Error taxonomy for the solver core (see spec §7).
///
/// `NumericalWarning` is deliberately not a variant here: per §7 it is
/// logged and the run proceeds, it never aborts a step.
#[derive(Error, Debug)]
pub enum NswingError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed boundary-condition file: {0}")]
    MalformedBc(String),

    #[error("non-finite value produced at level {level}, cell {cell}: {detail}")]
    Numerical {
        level: usize,
        cell: usize,
        detail: String,
    },
}

pub type Result<T> = std::result::Result<T, NswingError>;
