use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

/// Lifecycle points at which hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// Right after a session is pushed, before it reads any input.
    BeforeSession,
    /// Right before a session is popped off the stack.
    AfterSession,
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookEvent::BeforeSession => write!(f, "before_session"),
            HookEvent::AfterSession => write!(f, "after_session"),
        }
    }
}

/// Hook callback: receives the session output and its evaluation target.
pub type HookFn<T> = Rc<dyn Fn(&mut dyn Write, &T) -> Result<()>>;

/// One callback per lifecycle event; registering again replaces it.
pub struct Hooks<T> {
    hooks: HashMap<HookEvent, HookFn<T>>,
}

/// Hooks shared by reference between a session and its nested sessions.
pub type SharedHooks<T> = Rc<RefCell<Hooks<T>>>;

impl<T> Hooks<T> {
    /// No hooks at all.
    pub fn new() -> Self {
        Self {
            hooks: HashMap::new(),
        }
    }

    /// Set the callback for `event`, returning the one it replaced.
    pub fn set<F>(&mut self, event: HookEvent, hook: F) -> Option<HookFn<T>>
    where
        F: Fn(&mut dyn Write, &T) -> Result<()> + 'static,
    {
        self.hooks.insert(event, Rc::new(hook))
    }

    #[must_use]
    pub fn with<F>(mut self, event: HookEvent, hook: F) -> Self
    where
        F: Fn(&mut dyn Write, &T) -> Result<()> + 'static,
    {
        self.set(event, hook);
        self
    }

    pub fn remove(&mut self, event: HookEvent) -> Option<HookFn<T>> {
        self.hooks.remove(&event)
    }

    pub fn get(&self, event: HookEvent) -> Option<HookFn<T>> {
        self.hooks.get(&event).cloned()
    }

    pub fn contains(&self, event: HookEvent) -> bool {
        self.hooks.contains_key(&event)
    }

    /// Run the callback for `event`. A missing hook is a no-op.
    pub fn fire(&self, event: HookEvent, out: &mut dyn Write, target: &T) -> Result<()> {
        match self.hooks.get(&event) {
            Some(hook) => hook(out, target),
            None => Ok(()),
        }
    }
}

impl<T: fmt::Debug + 'static> Hooks<T> {
    /// Announce the start and the end of every session.
    pub fn with_defaults() -> Self {
        Self::new()
            .with(HookEvent::BeforeSession, |out, target| {
                writeln!(out, "Beginning session for {target:?}")?;
                Ok(())
            })
            .with(HookEvent::AfterSession, |out, target| {
                writeln!(out, "Ending session for {target:?}")?;
                Ok(())
            })
    }
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Hooks<T> {
    fn clone(&self) -> Self {
        Self {
            hooks: self.hooks.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_hook_is_noop() {
        let hooks: Hooks<i32> = Hooks::new();
        let mut out = Vec::new();
        hooks.fire(HookEvent::BeforeSession, &mut out, &1).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut hooks: Hooks<i32> = Hooks::new();
        hooks.set(HookEvent::AfterSession, |out, _| Ok(writeln!(out, "first")?));
        let replaced = hooks.set(HookEvent::AfterSession, |out, t| Ok(writeln!(out, "second {t}")?));
        assert!(replaced.is_some());

        let mut out = Vec::new();
        hooks.fire(HookEvent::AfterSession, &mut out, &7).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "second 7\n");
    }

    #[test]
    fn test_default_hooks_name_the_target() {
        let hooks: Hooks<&str> = Hooks::with_defaults();
        let mut out = Vec::new();
        hooks.fire(HookEvent::BeforeSession, &mut out, &"main").unwrap();
        hooks.fire(HookEvent::AfterSession, &mut out, &"main").unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Beginning session for \"main\"\nEnding session for \"main\"\n"
        );
    }

    #[test]
    fn test_hook_errors_are_returned() {
        let hooks: Hooks<i32> =
            Hooks::new().with(HookEvent::BeforeSession, |_, _| Err(anyhow::anyhow!("nope")));
        let mut out = Vec::new();
        let err = hooks.fire(HookEvent::BeforeSession, &mut out, &0).unwrap_err();
        assert_eq!(err.to_string(), "nope");
        assert_eq!(HookEvent::BeforeSession.to_string(), "before_session");
    }
}
