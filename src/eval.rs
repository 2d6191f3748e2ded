use crate::error::{EvalError, RaisedError};
use std::fmt::Debug;

/// Outcome of a successful call to [`Evaluator::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated<V> {
    /// The code was a complete expression and produced a value.
    Value(V),
    /// The code is a prefix of a valid expression (unterminated block, string,
    /// trailing operator, ...). The session keeps buffering input.
    Incomplete,
}

impl<V> Evaluated<V> {
    /// Returns the value, or `None` for incomplete input.
    pub fn into_value(self) -> Option<V> {
        match self {
            Evaluated::Value(v) => Some(v),
            Evaluated::Incomplete => None,
        }
    }
}

/// The code evaluator the sessions surround.
///
/// The engine treats it as an opaque capability: it hands over source text and
/// the session's evaluation target, and gets back a value, an "incomplete input"
/// signal, or an error. Everything language specific lives behind this trait.
pub trait Evaluator: 'static {
    /// Evaluation context a session explores (an object, a scope, a binding).
    type Target: Debug + Clone + 'static;
    /// Result of evaluating code.
    type Value: Debug + Clone + 'static;

    /// Evaluate `code` against `target`.
    fn evaluate(
        &self,
        code: &str,
        target: &mut Self::Target,
    ) -> Result<Evaluated<Self::Value>, EvalError>;

    /// Turn a value into an evaluation context a nested session can be opened on.
    fn enter(&self, value: Self::Value) -> Result<Self::Target, EvalError>;

    /// Whether `target` handles `raised` when it propagates through its frame.
    ///
    /// Only consulted while a `raise-up!` unwinds intermediate frames.
    fn catches(&self, _raised: &RaisedError<Self::Value>, _target: &Self::Target) -> bool {
        false
    }
}
