use crate::eval::Evaluator;
use crate::session::CommandContext;
use anyhow::Result;
use indexmap::IndexMap;
use regex::Regex;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// What a literal command pattern accepts after the command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    /// The line must be exactly the command name.
    None,
    /// The name alone, or the name followed by whitespace and free text.
    /// The text is captured trimmed; no capture when it is empty.
    Args,
    /// The name followed by anything at all, captured verbatim.
    Raw,
}

/// Matcher deciding whether an input line invokes a command.
///
/// Patterns are built once, when the command is created, and always match the
/// whole line.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    Literal { name: String, tail: Tail },
    /// Free-form pattern for commands with their own grammar. Capture groups
    /// become the command's captures.
    Regex(Regex),
}

impl CommandPattern {
    pub fn exact(name: impl Into<String>) -> Self {
        CommandPattern::Literal {
            name: name.into(),
            tail: Tail::None,
        }
    }

    pub fn with_args(name: impl Into<String>) -> Self {
        CommandPattern::Literal {
            name: name.into(),
            tail: Tail::Args,
        }
    }

    pub fn raw(name: impl Into<String>) -> Self {
        CommandPattern::Literal {
            name: name.into(),
            tail: Tail::Raw,
        }
    }

    /// Compile `pattern`, anchored so that it has to cover the full line.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(CommandPattern::Regex(Regex::new(&format!("^(?:{pattern})$"))?))
    }

    /// Try to match the full `line`, returning the captured arguments on success.
    pub fn matches(&self, line: &str) -> Option<Captures> {
        match self {
            CommandPattern::Literal { name, tail } => {
                let rest = line.strip_prefix(name.as_str())?;
                match tail {
                    Tail::None => rest.is_empty().then(Captures::default),
                    Tail::Raw => Some(Captures(vec![rest.to_string()])),
                    Tail::Args if rest.is_empty() => Some(Captures::default()),
                    Tail::Args => {
                        if !rest.starts_with(char::is_whitespace) {
                            return None;
                        }
                        let args = rest.trim();
                        if args.is_empty() {
                            Some(Captures::default())
                        } else {
                            Some(Captures(vec![args.to_string()]))
                        }
                    }
                }
            }
            CommandPattern::Regex(re) => {
                let caps = re.captures(line)?;
                Some(Captures(
                    caps.iter()
                        .skip(1)
                        .map(|m| m.map_or(String::new(), |m| m.as_str().to_string()))
                        .collect(),
                ))
            }
        }
    }
}

/// Substrings captured by a command pattern, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures(pub Vec<String>);

impl Captures {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Command body. Requests session actions through the context; an error is
/// reported to the session's output and does not end the session.
pub type Handler<E> = Rc<dyn Fn(&Captures, &mut CommandContext<'_, E>) -> Result<()>>;

/// An immutable command definition.
pub struct Command<E: Evaluator> {
    name: String,
    pattern: CommandPattern,
    description: String,
    banner: Option<String>,
    handler: Handler<E>,
}

impl<E: Evaluator> Command<E> {
    pub fn new<F>(
        name: impl Into<String>,
        pattern: CommandPattern,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(&Captures, &mut CommandContext<'_, E>) -> Result<()> + 'static,
    {
        Self {
            name: name.into(),
            pattern,
            description: description.into(),
            banner: None,
            handler: Rc::new(handler),
        }
    }

    /// Attach the long help text shown by `help NAME`.
    #[must_use]
    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = Some(banner.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &CommandPattern {
        &self.pattern
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Description followed by the banner, if any.
    pub fn help(&self) -> String {
        match &self.banner {
            Some(banner) => format!("{}: {}\n\n{}", self.name, self.description, banner.trim_end()),
            None => format!("{}: {}", self.name, self.description),
        }
    }

    pub(crate) fn run(&self, captures: &Captures, ctx: &mut CommandContext<'_, E>) -> Result<()> {
        (self.handler)(captures, ctx)
    }
}

impl<E: Evaluator> Clone for Command<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            pattern: self.pattern.clone(),
            description: self.description.clone(),
            banner: self.banner.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<E: Evaluator> fmt::Debug for Command<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Ordered set of commands, keyed by name.
///
/// Lookup tries commands in registration order and the first match wins.
/// Registering a name that already exists replaces that command in place.
pub struct CommandRegistry<E: Evaluator> {
    commands: IndexMap<String, Command<E>>,
    strict: bool,
}

/// Registry shared by reference between a session and its nested sessions.
pub type SharedCommands<E> = Rc<RefCell<CommandRegistry<E>>>;

impl<E: Evaluator> CommandRegistry<E> {
    /// An empty, strict registry.
    pub fn new() -> Self {
        Self {
            commands: IndexMap::new(),
            strict: true,
        }
    }

    /// Strict registries match lines exactly as typed, so a line with leading
    /// whitespace is never a command. Relaxed ones ignore leading whitespace.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Add `command`, returning the command it replaced.
    pub fn register(&mut self, command: Command<E>) -> Option<Command<E>> {
        self.commands.insert(command.name.clone(), command)
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, command: Command<E>) -> Self {
        self.register(command);
        self
    }

    /// Install every command of `other`, replacing same-named ones.
    pub fn merge(&mut self, other: CommandRegistry<E>) {
        for (_, command) in other.commands {
            self.register(command);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Command<E>> {
        self.commands.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Command<E>> {
        self.commands.get(name)
    }

    /// Resolve an input line to the first matching command and its captures.
    pub fn find(&self, line: &str) -> Option<(Command<E>, Captures)> {
        let line = if self.strict { line } else { line.trim_start() };
        self.commands
            .values()
            .find_map(|c| c.pattern.matches(line).map(|caps| (c.clone(), caps)))
    }

    /// Full help of one command.
    pub fn help(&self, name: &str) -> Option<String> {
        self.get(name).map(Command::help)
    }

    /// One line per command, `name  description`, in registration order.
    pub fn list(&self) -> String {
        let width = self.commands.keys().map(String::len).max().unwrap_or(0);
        self.commands
            .values()
            .map(|c| format!("{:<width$}  {}\n", c.name, c.description))
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<E: Evaluator> Default for CommandRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Evaluator> Clone for CommandRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            strict: self.strict,
        }
    }
}
