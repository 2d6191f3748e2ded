//! A tiny evaluator for exercising the engine in tests.
//!
//! Statements are either `name = expr` or `expr`; expressions are sums of
//! integers, double-quoted strings, names, `self`, `new Name` (a fresh object)
//! and `fail expr` (an error). A trailing `+`/`=`/`new`/`fail` or an open
//! string is incomplete input. Objects with a `rescues` variable catch
//! propagating `raise-up!` errors.

use crate::error::{EvalError, RaisedError};
use crate::eval::{Evaluated, Evaluator};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Default)]
pub(crate) struct Object {
    pub name: String,
    pub vars: HashMap<String, Value>,
}

/// Shared handle to an object; cloning keeps pointing at the same object.
#[derive(Clone)]
pub(crate) struct ObjRef(pub Rc<RefCell<Object>>);

impl ObjRef {
    pub fn named(name: &str) -> Self {
        ObjRef(Rc::new(RefCell::new(Object {
            name: name.to_string(),
            vars: HashMap::new(),
        })))
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    pub fn get(&self, var: &str) -> Option<Value> {
        self.0.borrow().vars.get(var).cloned()
    }
}

impl PartialEq for ObjRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{}>", self.0.borrow().name)
    }
}

#[derive(Clone, PartialEq)]
pub(crate) enum Value {
    Nil,
    Int(i64),
    Str(String),
    Obj(ObjRef),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Obj(o) => write!(f, "{o:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Str(String),
    Ident(String),
    Plus,
    Assign,
}

/// Evaluator that records every complete piece of code it evaluated.
#[derive(Default)]
pub(crate) struct Calc {
    pub log: RefCell<Vec<String>>,
}

impl Calc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

fn incomplete() -> Result<Evaluated<Value>, EvalError> {
    Ok(Evaluated::Incomplete)
}

/// `None` means the input ends inside a string literal.
fn tokenize(code: &str) -> Result<Option<Vec<Token>>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = code.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Assign);
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(ch) => s.push(ch),
                        None => return Ok(None),
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                let n = digits
                    .parse()
                    .map_err(|_| EvalError::new("SyntaxError", "integer too large"))?;
                tokens.push(Token::Int(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if !(d.is_alphanumeric() || d == '_') {
                        break;
                    }
                    ident.push(d);
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(EvalError::new(
                    "SyntaxError",
                    format!("unexpected character `{other}`"),
                ));
            }
        }
    }
    Ok(Some(tokens))
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    target: &'a ObjRef,
}

/// `Ok(None)` from the parse functions means "ran out of tokens".
impl Parser<'_> {
    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn atom(&mut self) -> Result<Option<Value>, EvalError> {
        let Some(token) = self.next() else {
            return Ok(None);
        };
        match token {
            Token::Int(n) => Ok(Some(Value::Int(n))),
            Token::Str(s) => Ok(Some(Value::Str(s))),
            Token::Ident(id) if id == "self" => Ok(Some(Value::Obj(self.target.clone()))),
            Token::Ident(id) if id == "nil" => Ok(Some(Value::Nil)),
            Token::Ident(id) if id == "new" => match self.next() {
                Some(Token::Ident(name)) => Ok(Some(Value::Obj(ObjRef::named(&name)))),
                None => Ok(None),
                Some(_) => Err(EvalError::new("SyntaxError", "`new` expects a name")),
            },
            Token::Ident(id) if id == "fail" => match self.atom()? {
                Some(v) => Err(EvalError::runtime(v.to_string())),
                None => Ok(None),
            },
            Token::Ident(id) => self
                .target
                .get(&id)
                .map(Some)
                .ok_or_else(|| EvalError::new("NameError", format!("undefined name `{id}`"))),
            Token::Plus | Token::Assign => Err(EvalError::new("SyntaxError", "unexpected operator")),
        }
    }

    fn sum(&mut self) -> Result<Option<Value>, EvalError> {
        let Some(mut acc) = self.atom()? else {
            return Ok(None);
        };
        while self.tokens.get(self.pos) == Some(&Token::Plus) {
            self.pos += 1;
            let Some(rhs) = self.atom()? else {
                return Ok(None);
            };
            acc = match (acc, rhs) {
                (Value::Int(a), Value::Int(b)) => Value::Int(a + b),
                (Value::Str(a), Value::Str(b)) => Value::Str(a + &b),
                (a, b) => {
                    return Err(EvalError::new(
                        "TypeError",
                        format!("cannot add {a:?} and {b:?}"),
                    ));
                }
            };
        }
        Ok(Some(acc))
    }
}

impl Evaluator for Calc {
    type Target = ObjRef;
    type Value = Value;

    fn evaluate(&self, code: &str, target: &mut ObjRef) -> Result<Evaluated<Value>, EvalError> {
        let Some(tokens) = tokenize(code)? else {
            return incomplete();
        };
        if tokens.is_empty() {
            return Ok(Evaluated::Value(Value::Nil));
        }

        let (assign_to, rest) = match tokens.as_slice() {
            [Token::Ident(name), Token::Assign, rest @ ..] => (Some(name.clone()), rest),
            all => (None, all),
        };
        let mut parser = Parser {
            tokens: rest,
            pos: 0,
            target,
        };
        let value = parser.sum();
        if let Ok(None) = value {
            return incomplete();
        }

        self.log
            .borrow_mut()
            .push(code.split_whitespace().collect::<Vec<_>>().join(" "));

        let value = value?.unwrap_or(Value::Nil);
        if parser.pos < rest.len() {
            return Err(EvalError::new("SyntaxError", "unexpected trailing input"));
        }
        if let Some(name) = assign_to {
            target.0.borrow_mut().vars.insert(name, value.clone());
        }
        Ok(Evaluated::Value(value))
    }

    fn enter(&self, value: Value) -> Result<ObjRef, EvalError> {
        match value {
            Value::Obj(o) => Ok(o),
            other => Err(EvalError::new(
                "TypeError",
                format!("cannot open a session on {other:?}"),
            )),
        }
    }

    fn catches(&self, _raised: &RaisedError<Value>, target: &ObjRef) -> bool {
        target.get("rescues").is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_evaluates_assignment_and_sums() {
        let calc = Calc::new();
        let mut obj = ObjRef::named("main");
        assert_eq!(
            calc.evaluate("x = 1 + 4", &mut obj),
            Ok(Evaluated::Value(Value::Int(5)))
        );
        assert_eq!(obj.get("x"), Some(Value::Int(5)));
        assert_eq!(calc.evaluate("x = ", &mut obj), Ok(Evaluated::Incomplete));
        assert_eq!(calc.evaluate("\"open", &mut obj), Ok(Evaluated::Incomplete));
        assert_eq!(
            calc.evaluate("missing", &mut obj).unwrap_err().kind,
            "NameError"
        );
        assert_eq!(calc.evaluated(), vec!["x = 1 + 4", "missing"]);
    }
}
