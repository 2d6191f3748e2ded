use crate::config::{Config, Defaults, SessionOptions};
use crate::error::ReplError;
use crate::eval::Evaluator;
use crate::hooks::HookEvent;
use crate::session::{Action, Session, SessionAction};
use std::rc::Rc;
use tracing::{debug, trace};

/// The session stack.
///
/// An engine runs nested REPL sessions over one evaluator. Each session gets its
/// configuration when it is constructed: the engine's explicit
/// [`SessionOptions`], with everything else taken from the [`Defaults`] in effect
/// at that moment.
///
/// Example
/// ```no_run
/// # fn demo<E: session_repl::Evaluator>(evaluator: E, target: E::Target) {
/// use session_repl::{Defaults, Engine};
/// let defaults = Defaults::new();
/// let mut engine = Engine::new(evaluator, &defaults);
/// let exit_value = engine.repl(target);
/// # }
/// ```
pub struct Engine<E: Evaluator> {
    evaluator: Rc<E>,
    defaults: Defaults<E>,
    options: SessionOptions<E>,
    stack: Vec<Session<E>>,
}

impl<E: Evaluator> Engine<E> {
    pub fn new(evaluator: E, defaults: &Defaults<E>) -> Self {
        Self {
            evaluator: Rc::new(evaluator),
            defaults: defaults.clone(),
            options: SessionOptions::new(),
            stack: Vec::new(),
        }
    }

    /// Use `options` instead of the defaults for the fields they set.
    #[must_use]
    pub fn with_options(mut self, options: SessionOptions<E>) -> Self {
        self.options = options;
        self
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// The configuration a session constructed right now would get.
    pub fn config(&self) -> Config<E> {
        self.options.resolve(self.defaults.snapshot())
    }

    /// Build a session for `target` at nesting `level`.
    pub fn session(&self, target: E::Target, level: usize) -> Session<E> {
        Session::new(target, level, self.config(), self.evaluator.clone())
    }

    /// Number of sessions currently on the stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// A single read-eval-print on a fresh root session for `target`.
    ///
    /// Keeps reading while the input forms an incomplete expression. No hooks
    /// run and the returned action is not acted upon.
    pub fn rep(&mut self, target: E::Target) -> Result<SessionAction<E>, ReplError<E::Value>> {
        let mut session = self.session(target, 0);
        loop {
            let action = session.rep()?;
            let waiting = session.buffer().is_empty() || session.is_exhausted();
            if !matches!(action, Action::None) || waiting {
                return Ok(action);
            }
        }
    }

    /// Run a full REPL on `target` until every session has ended.
    ///
    /// Returns the exit value of the last session, or the raised error that
    /// unwound the whole stack.
    pub fn repl(&mut self, target: E::Target) -> Result<Option<E::Value>, ReplError<E::Value>> {
        let result = self.run(target);
        self.stack.clear();
        result
    }

    fn run(&mut self, target: E::Target) -> Result<Option<E::Value>, ReplError<E::Value>> {
        self.push(target)?;
        loop {
            let Some((top, below)) = self.stack.split_last_mut() else {
                return Ok(None);
            };
            let mut action = top.step(below)?;
            if matches!(action, Action::None) && top.is_exhausted() {
                trace!(level = top.level(), "input exhausted, ending session");
                action = Action::Terminate(None);
            }

            match action {
                Action::None => {}
                Action::Push(target) => self.push(target)?,
                Action::Terminate(value) => {
                    self.pop()?;
                    if self.stack.is_empty() {
                        return Ok(value);
                    }
                }
                Action::TerminateAll(value) => {
                    while self.pop()? {}
                    return Ok(value);
                }
                Action::JumpTo(level) => {
                    while self.stack.len() > level.saturating_add(1) {
                        self.pop()?;
                    }
                }
                Action::Raise {
                    error,
                    through_nested,
                } => {
                    debug!(%error, through_nested, "raising out of session");
                    self.pop()?;
                    loop {
                        let caught = match self.stack.last() {
                            None => return Err(ReplError::Raised(error)),
                            Some(frame) => {
                                !through_nested || self.evaluator.catches(&error, frame.target())
                            }
                        };
                        if caught {
                            if let Some(frame) = self.stack.last_mut() {
                                frame.raise_into(error);
                            }
                            break;
                        }
                        self.pop()?;
                    }
                }
            }
        }
    }

    fn push(&mut self, target: E::Target) -> Result<(), ReplError<E::Value>> {
        let level = self.stack.len();
        let mut session = self.session(target, level);
        if let Some(parent) = self.stack.last() {
            session.inherit_last_error(parent);
        }
        debug!(level, target = ?session.target(), "session started");
        session.fire(HookEvent::BeforeSession)?;
        self.stack.push(session);
        Ok(())
    }

    /// Pop the top session after running its `after_session` hook.
    /// Returns `false` when the stack was already empty.
    fn pop(&mut self) -> Result<bool, ReplError<E::Value>> {
        let Some(session) = self.stack.pop() else {
            return Ok(false);
        };
        session.fire(HookEvent::AfterSession)?;
        debug!(level = session.level(), target = ?session.target(), "session ended");
        Ok(true)
    }
}
