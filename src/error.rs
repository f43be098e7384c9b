use thiserror::Error;

/// Errors raised by the set algebra, the graph model, and the
/// readers. Malformed input is kept apart from domain mismatches so
/// callers can tell bad data from a programming error.
#[derive(Error, Debug)]
pub enum ArgError {
    #[error("Domain mismatch: {0}")]
    DomainMismatch(String),

    #[error("Coordinate {position} is not contained in {range}")]
    OutOfRange { position: usize, range: String },

    #[error("Invalid space: {0}")]
    InvalidSpace(String),

    #[error("Malformed input on line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },

    #[error("Unsatisfiable clip: {0}")]
    UnsatisfiableClip(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ArgError {
    #[inline]
    pub(crate) fn mismatch<S: Into<String>>(msg: S) -> Self {
        ArgError::DomainMismatch(msg.into())
    }

    #[inline]
    pub(crate) fn malformed<S: Into<String>>(line: usize, reason: S) -> Self {
        ArgError::MalformedInput {
            line,
            reason: reason.into(),
        }
    }

    /// Undecodable text encodings are reported without a line number.
    #[inline]
    pub(crate) fn undecodable(value: &str, what: &str) -> Self {
        ArgError::MalformedInput {
            line: 0,
            reason: format!("\"{}\" does not decode to a {}", value, what),
        }
    }

    /// Attaches a line number to malformed input reported without one.
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            ArgError::MalformedInput { line: 0, reason } => {
                ArgError::MalformedInput { line, reason }
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArgError>;
