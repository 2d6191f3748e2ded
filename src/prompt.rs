use std::fmt;
use std::rc::Rc;

/// Computes the prompt shown before each line is read.
///
/// Either a single function of `(continuation, nesting_level)`, or a pair of
/// functions of the nesting level: one for a fresh expression and one for the
/// continuation lines of an incomplete one.
#[derive(Clone)]
pub enum Prompt {
    Single(Rc<dyn Fn(bool, usize) -> String>),
    Pair(Rc<dyn Fn(usize) -> String>, Rc<dyn Fn(usize) -> String>),
}

impl Prompt {
    pub fn single(f: impl Fn(bool, usize) -> String + 'static) -> Self {
        Prompt::Single(Rc::new(f))
    }

    pub fn pair(
        normal: impl Fn(usize) -> String + 'static,
        continuation: impl Fn(usize) -> String + 'static,
    ) -> Self {
        Prompt::Pair(Rc::new(normal), Rc::new(continuation))
    }

    /// The same text regardless of level and continuation.
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Prompt::single(move |_, _| text.clone())
    }

    pub fn render(&self, continuation: bool, level: usize) -> String {
        match self {
            Prompt::Single(f) => f(continuation, level),
            Prompt::Pair(normal, _) if !continuation => normal(level),
            Prompt::Pair(_, cont) => cont(level),
        }
    }

    /// Whether both prompts share the same underlying functions.
    pub fn same_as(&self, other: &Prompt) -> bool {
        match (self, other) {
            (Prompt::Single(a), Prompt::Single(b)) => Rc::ptr_eq(a, b),
            (Prompt::Pair(a1, a2), Prompt::Pair(b1, b2)) => Rc::ptr_eq(a1, b1) && Rc::ptr_eq(a2, b2),
            _ => false,
        }
    }
}

fn default_text(level: usize, sigil: char) -> String {
    if level == 0 {
        format!("repl{sigil} ")
    } else {
        format!("repl:{level}{sigil} ")
    }
}

impl Default for Prompt {
    /// `repl> ` / `repl* `, with the nesting level once nested (`repl:2> `).
    fn default() -> Self {
        Prompt::pair(|level| default_text(level, '>'), |level| default_text(level, '*'))
    }
}

impl fmt::Debug for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::Single(_) => f.write_str("Prompt::Single(..)"),
            Prompt::Pair(..) => f.write_str("Prompt::Pair(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_prompt_ignores_continuation() {
        let prompt = Prompt::fixed("test prompt> ");
        assert_eq!(prompt.render(false, 0), "test prompt> ");
        assert_eq!(prompt.render(true, 0), "test prompt> ");
    }

    #[test]
    fn test_single_prompt_sees_both_inputs() {
        let prompt = Prompt::single(|cont, level| format!("{level}{}", if cont { '*' } else { '>' }));
        assert_eq!(prompt.render(false, 2), "2>");
        assert_eq!(prompt.render(true, 3), "3*");
    }

    #[test]
    fn test_pair_prompt_selects_by_continuation() {
        let prompt = Prompt::pair(|_| "A".to_string(), |_| "B".to_string());
        assert_eq!(prompt.render(false, 0), "A");
        assert_eq!(prompt.render(true, 0), "B");
        assert!(prompt.same_as(&prompt.clone()));
        assert!(!prompt.same_as(&Prompt::pair(|_| "A".to_string(), |_| "B".to_string())));
    }

    #[test]
    fn test_default_prompt_shows_nesting() {
        let prompt = Prompt::default();
        assert_eq!(prompt.render(false, 0), "repl> ");
        assert_eq!(prompt.render(true, 0), "repl* ");
        assert_eq!(prompt.render(false, 2), "repl:2> ");
        assert_eq!(prompt.render(true, 1), "repl:1* ");
    }
}
