use crate::command::{Captures, Command, CommandPattern, CommandRegistry};
use crate::error::{EvalError, RaisedError};
use crate::eval::{Evaluated, Evaluator};
use crate::session::CommandContext;
use anyhow::{Result, anyhow};
use argh::{EarlyExit, FromArgs};
use std::io::Write;

/// Built-in commands whose arguments are plain words.
///
/// They are parsed using the [`argh`] crate (`FromArgs`) from the text that
/// follows the command name, so `NAME --help` works for each of them.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "help" or "nesting".
    fn name() -> &'static str;

    /// One line summary shown by `help`.
    fn description() -> &'static str;

    /// Executes the command against the running session.
    fn execute<E: Evaluator>(self, ctx: &mut CommandContext<'_, E>) -> Result<()>;
}

/// Wrap a [`BuiltinCommand`] into a [`Command`]. Its argh usage text becomes the banner.
pub(crate) fn from_args<E: Evaluator, T: BuiltinCommand + 'static>() -> Command<E> {
    let command = Command::new(
        T::name(),
        CommandPattern::with_args(T::name()),
        T::description(),
        |captures: &Captures, ctx: &mut CommandContext<'_, E>| {
            let args: Vec<&str> = captures
                .get(0)
                .map(|tail| tail.split_whitespace().collect())
                .unwrap_or_default();
            match T::from_args(&[T::name()], &args) {
                Ok(cmd) => cmd.execute(ctx),
                Err(EarlyExit { output, .. }) => {
                    ctx.say(output.trim_end())?;
                    Ok(())
                }
            }
        },
    );
    match T::from_args(&[T::name()], &["--help"]) {
        Err(EarlyExit { output, .. }) => command.with_banner(output),
        Ok(_) => command,
    }
}

#[derive(FromArgs)]
/// Show all commands, or the help of a single command.
pub struct Help {
    #[argh(positional)]
    /// command to describe; lists every command when omitted.
    pub command: Option<String>,
}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn description() -> &'static str {
        "Show all commands, or the help of one command."
    }

    fn execute<E: Evaluator>(self, ctx: &mut CommandContext<'_, E>) -> Result<()> {
        let commands = ctx.commands();
        let text = match &self.command {
            Some(name) => commands
                .borrow()
                .help(name)
                .ok_or_else(|| anyhow!("no command named `{name}`"))?,
            None => format!("Commands:\n{}", commands.borrow().list()),
        };
        ctx.say(text.trim_end())?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// List the active sessions, from the root to the current one.
pub struct Nesting {}

impl BuiltinCommand for Nesting {
    fn name() -> &'static str {
        "nesting"
    }

    fn description() -> &'static str {
        "List the active sessions and their nesting levels."
    }

    fn execute<E: Evaluator>(self, ctx: &mut CommandContext<'_, E>) -> Result<()> {
        let out = ctx.output();
        let mut out = out.borrow_mut();
        writeln!(out, "Nesting status:")?;
        for (level, target) in ctx.nesting() {
            writeln!(out, "{level}. {target:?}")?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// End nested sessions until the given nesting level is the current one.
pub struct JumpTo {
    #[argh(positional)]
    /// nesting level to return to; must be below the current level.
    pub level: usize,
}

impl BuiltinCommand for JumpTo {
    fn name() -> &'static str {
        "jump-to"
    }

    fn description() -> &'static str {
        "End nested sessions down to the given nesting level."
    }

    fn execute<E: Evaluator>(self, ctx: &mut CommandContext<'_, E>) -> Result<()> {
        let current = ctx.level();
        if current == 0 {
            return Err(anyhow!("Invalid nest level. There are no nested sessions."));
        }
        if self.level >= current {
            return Err(anyhow!(
                "Invalid nest level. Must be between 0 and {}. Got {}.",
                current - 1,
                self.level
            ));
        }
        ctx.jump_to(self.level);
        Ok(())
    }
}

/// Evaluate the optional expression argument of a command.
fn optional_value<E: Evaluator>(
    captures: &Captures,
    ctx: &mut CommandContext<'_, E>,
) -> Result<Option<E::Value>, EvalError> {
    captures.get(0).map(|code| ctx.evaluate_value(code)).transpose()
}

fn exit<E: Evaluator>() -> Command<E> {
    Command::new(
        "exit",
        CommandPattern::with_args("exit"),
        "End the current session, optionally returning the value of EXPR.",
        |captures, ctx| {
            let value = optional_value(captures, ctx)?;
            ctx.terminate_session(value);
            Ok(())
        },
    )
    .with_banner("Usage: exit [EXPR]")
}

fn exit_all<E: Evaluator>() -> Command<E> {
    Command::new(
        "exit-all",
        CommandPattern::with_args("exit-all"),
        "End every session, optionally returning the value of EXPR.",
        |captures, ctx| {
            let value = optional_value(captures, ctx)?;
            ctx.terminate_all(value);
            Ok(())
        },
    )
    .with_banner("Usage: exit-all [EXPR]")
}

fn nest<E: Evaluator>() -> Command<E> {
    Command::new(
        "nest",
        CommandPattern::with_args("nest"),
        "Open a nested session on the value of EXPR, or on the current target.",
        |captures, ctx| {
            let target = match captures.get(0) {
                Some(code) => {
                    let value = ctx.evaluate_value(code)?;
                    ctx.enter(value)?
                }
                None => <E::Target as Clone>::clone(ctx.target()),
            };
            ctx.push_session(target);
            Ok(())
        },
    )
    .with_banner("Usage: nest [EXPR]")
}

fn clear_buffer<E: Evaluator>() -> Command<E> {
    Command::new(
        "!",
        CommandPattern::exact("!"),
        "Discard the expression typed so far.",
        |_, ctx| {
            ctx.clear_buffer();
            ctx.say("Input buffer cleared.")?;
            Ok(())
        },
    )
}

const RAISE_UP_BANNER: &str = "\
Usage: raise-up [EXPR]
       raise-up! [EXPR]

Leaves the current session like `exit`, but raises an error in the session
it returns to instead of returning a value. Without EXPR the most recent error
seen in this session is raised again; with EXPR its value is raised. When
EXPR itself fails, that error is reported here and nothing is raised.

`raise-up!` keeps going through every enclosing session until one catches the
error; when none does, it escapes the REPL altogether.";

fn raise_up<E: Evaluator>(through_nested: bool) -> Command<E> {
    let name = if through_nested { "raise-up!" } else { "raise-up" };
    let description = if through_nested {
        "Raise an error out of every nested session."
    } else {
        "Raise an error into the enclosing session."
    };
    Command::new(
        name,
        CommandPattern::with_args(name),
        description,
        move |captures, ctx| {
            let arg = captures.get(0);
            if arg.is_some_and(|a| a.split_whitespace().any(|w| w == "-h" || w == "--help")) {
                let help = ctx.commands().borrow().help(name);
                ctx.say(help.as_deref().unwrap_or(RAISE_UP_BANNER))?;
                return Ok(());
            }

            let error = match arg {
                Some(code) => match ctx.evaluate(code) {
                    Ok(Evaluated::Value(v)) => RaisedError::Value(v),
                    Ok(Evaluated::Incomplete) => RaisedError::Error(EvalError::new(
                        "SyntaxError",
                        format!("incomplete expression: {code}"),
                    )),
                    Err(e) => return Err(e.into()),
                },
                None => ctx
                    .last_error()
                    .cloned()
                    .unwrap_or_else(|| RaisedError::Error(EvalError::runtime("unhandled exception"))),
            };
            ctx.raise_up(error, through_nested);
            Ok(())
        },
    )
    .with_banner(RAISE_UP_BANNER)
}

/// The commands every session starts with, in lookup order.
pub fn default_commands<E: Evaluator>() -> CommandRegistry<E> {
    CommandRegistry::new()
        .with(from_args::<E, Help>())
        .with(from_args::<E, Nesting>())
        .with(nest())
        .with(from_args::<E, JumpTo>())
        .with(exit())
        .with(exit_all())
        .with(clear_buffer())
        .with(raise_up(false))
        .with(raise_up(true))
}
