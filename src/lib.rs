//! An embeddable, nestable REPL session engine.
//!
//! The crate reads lines from an input source, dispatches them to registered
//! commands or to a pluggable [`Evaluator`], prints results and keeps a stack of
//! nested sessions, each bound to its own evaluation target. Commands such as
//! `nest`, `exit`, `jump-to` and `raise-up` manipulate that stack.
//!
//! The main entry point is [`Engine`], built from an evaluator and a [`Defaults`]
//! handle. Per-engine overrides are given with [`SessionOptions`]; the modules
//! [`command`], [`hooks`], [`prompt`] and [`io_adapters`] expose the pieces a
//! session is configured with.

pub mod builtin;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod hooks;
pub mod io_adapters;
pub mod logger;
pub mod prompt;
pub mod session;

#[cfg(test)]
mod test_support;

pub use command::{Command, CommandPattern, CommandRegistry};
pub use config::{Config, Defaults, SessionOptions};
pub use engine::Engine;
pub use error::{EvalError, RaisedError, ReplError};
pub use eval::{Evaluated, Evaluator};
pub use hooks::{HookEvent, Hooks};
pub use prompt::Prompt;
pub use session::{Action, CommandContext, Session};
