use crate::builtin;
use crate::command::{CommandRegistry, SharedCommands};
use crate::eval::Evaluator;
use crate::hooks::{Hooks, SharedHooks};
use crate::io_adapters::{ReaderInput, SharedInput, SharedOutput, stdout_output};
use crate::prompt::Prompt;
use std::cell::RefCell;
use std::fmt::Debug;
use std::io::Write;
use std::rc::Rc;

/// Formats an evaluated value and writes it to the session output.
///
/// Errors are reported on the output by the session, never propagated.
pub type PrintFn<V> = Rc<dyn Fn(&mut dyn Write, &V) -> anyhow::Result<()>>;

/// `=> value`, using the value's `Debug` form.
pub fn default_print<V: Debug + 'static>() -> PrintFn<V> {
    Rc::new(|out: &mut dyn Write, value: &V| {
        writeln!(out, "=> {value:?}")?;
        Ok(())
    })
}

/// Fully resolved configuration of one session.
///
/// Every field is a shared handle: nested sessions built from the same
/// configuration read the same input, write the same output and see the same
/// command and hook registries.
pub struct Config<E: Evaluator> {
    pub input: SharedInput,
    pub output: SharedOutput,
    pub commands: SharedCommands<E>,
    pub hooks: SharedHooks<E::Target>,
    pub prompt: Prompt,
    pub print: PrintFn<E::Value>,
}

impl<E: Evaluator> Config<E> {
    /// Factory configuration: standard input and output, the default command
    /// set, hooks announcing each session, default prompt and print.
    pub fn factory() -> Self {
        Self {
            input: Rc::new(RefCell::new(ReaderInput::stdin())),
            output: stdout_output(),
            commands: Rc::new(RefCell::new(builtin::default_commands())),
            hooks: Rc::new(RefCell::new(Hooks::with_defaults())),
            prompt: Prompt::default(),
            print: default_print(),
        }
    }
}

impl<E: Evaluator> Clone for Config<E> {
    fn clone(&self) -> Self {
        Self {
            input: self.input.clone(),
            output: self.output.clone(),
            commands: self.commands.clone(),
            hooks: self.hooks.clone(),
            prompt: self.prompt.clone(),
            print: self.print.clone(),
        }
    }
}

/// Per-engine overrides. Any field left unset falls back to the defaults in
/// effect when a session is constructed.
pub struct SessionOptions<E: Evaluator> {
    input: Option<SharedInput>,
    output: Option<SharedOutput>,
    commands: Option<SharedCommands<E>>,
    hooks: Option<SharedHooks<E::Target>>,
    prompt: Option<Prompt>,
    print: Option<PrintFn<E::Value>>,
}

impl<E: Evaluator> SessionOptions<E> {
    pub fn new() -> Self {
        Self {
            input: None,
            output: None,
            commands: None,
            hooks: None,
            prompt: None,
            print: None,
        }
    }

    #[must_use]
    pub fn input(mut self, input: SharedInput) -> Self {
        self.input = Some(input);
        self
    }

    #[must_use]
    pub fn output(mut self, output: SharedOutput) -> Self {
        self.output = Some(output);
        self
    }

    #[must_use]
    pub fn commands(mut self, commands: CommandRegistry<E>) -> Self {
        self.commands = Some(Rc::new(RefCell::new(commands)));
        self
    }

    #[must_use]
    pub fn hooks(mut self, hooks: Hooks<E::Target>) -> Self {
        self.hooks = Some(Rc::new(RefCell::new(hooks)));
        self
    }

    #[must_use]
    pub fn prompt(mut self, prompt: Prompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    #[must_use]
    pub fn print(
        mut self,
        print: impl Fn(&mut dyn Write, &E::Value) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.print = Some(Rc::new(print));
        self
    }

    /// Overlay these overrides onto `base`.
    pub fn resolve(&self, base: Config<E>) -> Config<E> {
        Config {
            input: self.input.clone().unwrap_or(base.input),
            output: self.output.clone().unwrap_or(base.output),
            commands: self.commands.clone().unwrap_or(base.commands),
            hooks: self.hooks.clone().unwrap_or(base.hooks),
            prompt: self.prompt.clone().unwrap_or(base.prompt),
            print: self.print.clone().unwrap_or(base.print),
        }
    }
}

impl<E: Evaluator> Default for SessionOptions<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Evaluator> Clone for SessionOptions<E> {
    fn clone(&self) -> Self {
        Self {
            input: self.input.clone(),
            output: self.output.clone(),
            commands: self.commands.clone(),
            hooks: self.hooks.clone(),
            prompt: self.prompt.clone(),
            print: self.print.clone(),
        }
    }
}

/// Process-wide default configuration with factory reset.
///
/// A `Defaults` value is a handle: clones share the same state. Engines read
/// it every time they construct a session, so changing a default affects
/// sessions created afterwards, never the ones already running.
pub struct Defaults<E: Evaluator> {
    current: Rc<RefCell<Config<E>>>,
    factory: fn() -> Config<E>,
}

impl<E: Evaluator> Defaults<E> {
    /// Defaults starting from [`Config::factory`].
    pub fn new() -> Self {
        Self::with_factory(Config::factory)
    }

    /// Defaults whose factory values (and reset target) come from `factory`.
    pub fn with_factory(factory: fn() -> Config<E>) -> Self {
        Self {
            current: Rc::new(RefCell::new(factory())),
            factory,
        }
    }

    /// The configuration in effect right now.
    pub fn snapshot(&self) -> Config<E> {
        self.current.borrow().clone()
    }

    /// Restore every default to its factory value.
    pub fn reset(&self) {
        tracing::debug!("restoring factory defaults");
        *self.current.borrow_mut() = (self.factory)();
    }

    pub fn input(&self) -> SharedInput {
        self.current.borrow().input.clone()
    }

    pub fn set_input(&self, input: SharedInput) {
        self.current.borrow_mut().input = input;
    }

    pub fn output(&self) -> SharedOutput {
        self.current.borrow().output.clone()
    }

    pub fn set_output(&self, output: SharedOutput) {
        self.current.borrow_mut().output = output;
    }

    pub fn commands(&self) -> SharedCommands<E> {
        self.current.borrow().commands.clone()
    }

    pub fn set_commands(&self, commands: CommandRegistry<E>) {
        self.current.borrow_mut().commands = Rc::new(RefCell::new(commands));
    }

    pub fn hooks(&self) -> SharedHooks<E::Target> {
        self.current.borrow().hooks.clone()
    }

    pub fn set_hooks(&self, hooks: Hooks<E::Target>) {
        self.current.borrow_mut().hooks = Rc::new(RefCell::new(hooks));
    }

    pub fn prompt(&self) -> Prompt {
        self.current.borrow().prompt.clone()
    }

    pub fn set_prompt(&self, prompt: Prompt) {
        self.current.borrow_mut().prompt = prompt;
    }

    pub fn print(&self) -> PrintFn<E::Value> {
        self.current.borrow().print.clone()
    }

    pub fn set_print(
        &self,
        print: impl Fn(&mut dyn Write, &E::Value) -> anyhow::Result<()> + 'static,
    ) {
        self.current.borrow_mut().print = Rc::new(print);
    }
}

impl<E: Evaluator> Default for Defaults<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Evaluator> Clone for Defaults<E> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
            factory: self.factory,
        }
    }
}
