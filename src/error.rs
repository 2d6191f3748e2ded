use std::fmt::Debug;
use thiserror::Error;

/// Error reported by an [`Evaluator`](crate::eval::Evaluator).
///
/// `kind` is the evaluator's own error class (e.g. `NameError`), `message` the
/// human readable part. Sessions write it to their output and keep going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct EvalError {
    pub kind: String,
    pub message: String,
}

impl EvalError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Generic runtime failure, used when nothing more specific is known.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new("RuntimeError", message)
    }
}

/// Payload of a `raise-up`: either an error that was observed in a session or
/// an arbitrary value produced by evaluating the command's argument.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RaisedError<V: Debug> {
    #[error("{0}")]
    Error(EvalError),
    #[error("{0:?}")]
    Value(V),
}

impl<V: Debug> From<EvalError> for RaisedError<V> {
    fn from(e: EvalError) -> Self {
        RaisedError::Error(e)
    }
}

/// Error returned to the caller of [`Engine::repl`](crate::engine::Engine::repl).
#[derive(Debug, Error)]
pub enum ReplError<V: Debug> {
    /// A raised error unwound every session without being caught.
    #[error("raised out of the session stack: {0}")]
    Raised(RaisedError<V>),
    /// Writing to the output sink failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl<V: Debug> ReplError<V> {
    /// The escaped payload, if this is a raised error.
    pub fn raised(&self) -> Option<&RaisedError<V>> {
        match self {
            ReplError::Raised(r) => Some(r),
            ReplError::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_error_display_has_kind_and_message() {
        let e = EvalError::new("NameError", "undefined name `x`");
        assert_eq!(e.to_string(), "NameError: undefined name `x`");
        assert_eq!(EvalError::runtime("boom").kind, "RuntimeError");
    }

    #[test]
    fn test_raised_value_displays_debug_form() {
        let r: RaisedError<String> = RaisedError::Value("farble".to_string());
        assert_eq!(r.to_string(), "\"farble\"");

        let err: ReplError<String> = ReplError::Raised(r.clone());
        assert_eq!(err.raised(), Some(&r));
    }
}
