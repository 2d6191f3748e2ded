use crate::command::{Captures, Command, SharedCommands};
use crate::config::Config;
use crate::error::{EvalError, RaisedError, ReplError};
use crate::eval::{Evaluated, Evaluator};
use crate::hooks::HookEvent;
use crate::io_adapters::SharedOutput;
use std::fmt::Debug;
use std::io::Write;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// What a session asks the engine to do after a read-eval-print step.
#[derive(Debug)]
pub enum Action<T, V: Debug> {
    /// Keep reading from the same session.
    None,
    /// Open a nested session on the given target.
    Push(T),
    /// End the current session, with an optional exit value.
    Terminate(Option<V>),
    /// End every session, with an optional exit value.
    TerminateAll(Option<V>),
    /// End sessions from the top until the given nesting level is on top.
    JumpTo(usize),
    /// End the current session and raise `error` in the enclosing one, or,
    /// with `through_nested`, in the first enclosing session that catches it.
    Raise {
        error: RaisedError<V>,
        through_nested: bool,
    },
}

/// [`Action`] for the target and value types of an evaluator.
pub type SessionAction<E> = Action<<E as Evaluator>::Target, <E as Evaluator>::Value>;

type Outcome<E> = Result<SessionAction<E>, ReplError<<E as Evaluator>::Value>>;

/// One REPL frame: an evaluation target, its nesting level and the
/// configuration it was constructed with.
pub struct Session<E: Evaluator> {
    target: E::Target,
    level: usize,
    config: Config<E>,
    evaluator: Rc<E>,
    buffer: String,
    last_error: Option<RaisedError<E::Value>>,
    pending: Option<RaisedError<E::Value>>,
    exhausted: bool,
}

impl<E: Evaluator> Session<E> {
    pub fn new(target: E::Target, level: usize, config: Config<E>, evaluator: Rc<E>) -> Self {
        Self {
            target,
            level,
            config,
            evaluator,
            buffer: String::new(),
            last_error: None,
            pending: None,
            exhausted: false,
        }
    }

    pub fn target(&self) -> &E::Target {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut E::Target {
        &mut self.target
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn config(&self) -> &Config<E> {
        &self.config
    }

    /// Code read so far that did not form a complete expression yet.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// The most recent error this session reported or had raised into it.
    pub fn last_error(&self) -> Option<&RaisedError<E::Value>> {
        self.last_error.as_ref()
    }

    /// Whether the input ran dry during the last step.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Prompt for the next line; the continuation form while buffering.
    pub fn prompt(&self) -> String {
        self.config.prompt.render(!self.buffer.is_empty(), self.level)
    }

    /// One read-eval-print step: read a line, run it as a command or feed it
    /// to the evaluator, print the outcome.
    ///
    /// Returns the action requested by a command, [`Action::None`] otherwise.
    pub fn rep(&mut self) -> Outcome<E> {
        self.step(&[])
    }

    pub(crate) fn step(&mut self, ancestors: &[Session<E>]) -> Outcome<E> {
        if let Some(raised) = self.pending.take() {
            debug!(level = self.level, error = %raised, "surfacing raised error");
            self.say(&format!("Error: {raised}"))?;
            self.last_error = Some(raised);
            return Ok(Action::None);
        }

        let prompt = self.prompt();
        let read = self.config.input.borrow_mut().read_line(&prompt);
        let line = match read {
            Ok(Some(line)) => line,
            Ok(None) => {
                trace!(level = self.level, "input exhausted");
                self.exhausted = true;
                return Ok(Action::None);
            }
            Err(e) => {
                warn!(level = self.level, error = %e, "reading input failed, treating it as exhausted");
                self.exhausted = true;
                return Ok(Action::None);
            }
        };

        let found = self.config.commands.borrow().find(&line);
        if let Some((command, captures)) = found {
            return self.run_command(&command, &captures, ancestors);
        }

        if self.buffer.is_empty() && line.trim().is_empty() {
            return Ok(Action::None);
        }
        self.buffer.push_str(&line);
        self.buffer.push('\n');

        let result = self.evaluator.evaluate(&self.buffer, &mut self.target);
        match result {
            Ok(Evaluated::Incomplete) => {
                trace!(level = self.level, "incomplete input, buffering");
            }
            Ok(Evaluated::Value(value)) => {
                self.buffer.clear();
                self.print(&value)?;
            }
            Err(e) => {
                self.buffer.clear();
                trace!(level = self.level, error = %e, "evaluation failed");
                self.say(&format!("Error: {e}"))?;
                self.last_error = Some(RaisedError::Error(e));
            }
        }
        Ok(Action::None)
    }

    fn run_command(
        &mut self,
        command: &Command<E>,
        captures: &Captures,
        ancestors: &[Session<E>],
    ) -> Outcome<E> {
        trace!(level = self.level, command = command.name(), ?captures, "running command");
        let mut ctx = CommandContext {
            session: self,
            ancestors,
            action: Action::None,
        };
        let result = command.run(captures, &mut ctx);
        let action = ctx.action;

        match result {
            Ok(()) => Ok(action),
            Err(e) => {
                debug!(command = command.name(), error = %e, "command failed");
                self.say(&format!("Error: {e:#}"))?;
                let error = match e.downcast::<EvalError>() {
                    Ok(eval_error) => eval_error,
                    Err(other) => EvalError::new("CommandError", format!("{other:#}")),
                };
                self.last_error = Some(RaisedError::Error(error));
                Ok(Action::None)
            }
        }
    }

    fn print(&self, value: &E::Value) -> Result<(), ReplError<E::Value>> {
        let print = self.config.print.clone();
        let mut out = self.config.output.borrow_mut();
        if let Err(e) = print(&mut *out, value) {
            warn!(error = %e, "print function failed");
            writeln!(out, "Error: could not print value: {e:#}")?;
        }
        Ok(())
    }

    fn say(&self, text: &str) -> Result<(), ReplError<E::Value>> {
        writeln!(self.config.output.borrow_mut(), "{text}")?;
        Ok(())
    }

    /// Run the hook registered for `event`; a failing hook is reported on the
    /// output and otherwise ignored.
    pub(crate) fn fire(&self, event: HookEvent) -> Result<(), ReplError<E::Value>> {
        // a snapshot, so a running hook may replace hooks in the shared registry
        let hooks = self.config.hooks.borrow().clone();
        let mut out = self.config.output.borrow_mut();
        if let Err(e) = hooks.fire(event, &mut *out, &self.target) {
            warn!(%event, error = %e, "hook failed");
            writeln!(out, "Error in {event} hook: {e:#}")?;
        }
        Ok(())
    }

    /// Make the next step report `raised` instead of reading input.
    pub(crate) fn raise_into(&mut self, raised: RaisedError<E::Value>) {
        self.pending = Some(raised);
    }

    pub(crate) fn inherit_last_error(&mut self, from: &Session<E>) {
        self.last_error = from.last_error.clone();
    }
}

/// What a command handler sees while it runs: the current session, the
/// sessions enclosing it, and the session action API.
///
/// Handlers request at most one action; a later request replaces an earlier one.
pub struct CommandContext<'a, E: Evaluator> {
    session: &'a mut Session<E>,
    ancestors: &'a [Session<E>],
    action: SessionAction<E>,
}

impl<E: Evaluator> CommandContext<'_, E> {
    pub fn target(&self) -> &E::Target {
        &self.session.target
    }

    pub fn target_mut(&mut self) -> &mut E::Target {
        &mut self.session.target
    }

    pub fn level(&self) -> usize {
        self.session.level
    }

    pub fn output(&self) -> SharedOutput {
        self.session.config.output.clone()
    }

    /// Write one line to the session output.
    pub fn say(&self, text: &str) -> std::io::Result<()> {
        writeln!(self.session.config.output.borrow_mut(), "{text}")
    }

    pub fn commands(&self) -> SharedCommands<E> {
        self.session.config.commands.clone()
    }

    pub fn evaluate(&mut self, code: &str) -> Result<Evaluated<E::Value>, EvalError> {
        self.session.evaluator.evaluate(code, &mut self.session.target)
    }

    /// Evaluate `code`, which must be a complete expression.
    pub fn evaluate_value(&mut self, code: &str) -> Result<E::Value, EvalError> {
        self.evaluate(code)?
            .into_value()
            .ok_or_else(|| EvalError::new("SyntaxError", format!("incomplete expression: {code}")))
    }

    /// Turn a value into a target a nested session can be opened on.
    pub fn enter(&self, value: E::Value) -> Result<E::Target, EvalError> {
        self.session.evaluator.enter(value)
    }

    pub fn last_error(&self) -> Option<&RaisedError<E::Value>> {
        self.session.last_error.as_ref()
    }

    pub fn buffer(&self) -> &str {
        &self.session.buffer
    }

    pub fn clear_buffer(&mut self) {
        self.session.buffer.clear();
    }

    /// Every active session from the root to the current one, with its level.
    pub fn nesting(&self) -> Vec<(usize, &E::Target)> {
        self.ancestors
            .iter()
            .chain(std::iter::once(&*self.session))
            .map(|s| (s.level, &s.target))
            .collect()
    }

    pub fn push_session(&mut self, target: E::Target) {
        self.action = Action::Push(target);
    }

    pub fn terminate_session(&mut self, value: Option<E::Value>) {
        self.action = Action::Terminate(value);
    }

    pub fn terminate_all(&mut self, value: Option<E::Value>) {
        self.action = Action::TerminateAll(value);
    }

    pub fn jump_to(&mut self, level: usize) {
        self.action = Action::JumpTo(level);
    }

    pub fn raise_up(&mut self, error: RaisedError<E::Value>, through_nested: bool) {
        self.action = Action::Raise {
            error,
            through_nested,
        };
    }
}
