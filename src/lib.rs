extern crate self as parlance;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

#[macro_use]
mod macros;
mod api;
mod engine;
mod expr;
mod sections;
mod types;

pub use api::{
    EventBlock, LoadOutcome, Options, ScriptNode, ScriptSlot, load_script, parse_pattern, resolve_condition,
    resolve_expression,
};
pub use engine::{
    Bucket, ChainRole, ErrorQuality, ExecState, FunctionDecl, InitCtx, LogEntry, MatchOutcome, NextRef, ParseContext,
    ParseFlags, ParseLog, PatternError, RegexCapture, Registry, Resolver, Script, SectionBody, SectionCtx, Severity,
    Trigger,
};
pub use expr::{ExprCondition, ExpressionList, LiteralList, SimpleLiteral};
pub use sections::register_builtins;
pub use types::{TypeId, TypeInfo};

// --- Core value model -------------------------------------------------------

/// A runtime value of the dialect.
///
/// The type registry decides which [`TypeId`]s a value satisfies; `Value`
/// itself only carries the representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Num(f64),
    Text(String),
    Span(chrono::Duration),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Num(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Text(s) => write!(f, "{s}"),
            Value::Span(d) => write!(f, "{} ms", d.num_milliseconds()),
        }
    }
}

/// An externally-delivered event. The host fills `values` with whatever the
/// event carries; expressions read them by name.
#[derive(Debug, Clone, Default)]
pub struct Event {
    pub name: String,
    pub values: HashMap<String, Value>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Event { name: name.into(), values: HashMap::new() }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// The variable store shared by all triggers of a script host.
#[derive(Debug, Default)]
pub struct Variables {
    map: HashMap<String, Value>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.map.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.map.insert(name.into(), value);
    }

    pub fn delete(&mut self, name: &str) -> Option<Value> {
        self.map.remove(name)
    }
}

/// Per-dispatch evaluation context handed to every `eval`/`execute`/`check`.
///
/// Holds the triggering event, the variable store, and the stack of values of
/// the loops currently being iterated (innermost last).
pub struct Run<'a> {
    pub event: &'a Event,
    pub vars: &'a mut Variables,
    pub(crate) loop_values: Vec<Value>,
}

impl<'a> Run<'a> {
    pub fn new(event: &'a Event, vars: &'a mut Variables) -> Self {
        Run { event, vars, loop_values: Vec::new() }
    }

    /// The value of the innermost enclosing loop, if any.
    pub fn current_loop_value(&self) -> Option<&Value> {
        self.loop_values.last()
    }
}

// --- Evaluation failures ----------------------------------------------------

/// A failure during trigger execution. Caught at the per-event dispatch
/// boundary; aborts only the trigger it occurred in.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error("{0}")]
    Eval(String),
    #[error("'{0}' is not present in this event")]
    MissingValue(String),
}

// --- Syntax element traits --------------------------------------------------

/// A typed value producer: the result of resolving an expression.
///
/// Implementations are immutable once constructed; `eval` may be called any
/// number of times against different events.
pub trait Expr {
    /// All values produced for the current run. A single expression returns a
    /// one-element vector.
    fn eval(&self, run: &mut Run<'_>) -> Result<Vec<Value>, RunError>;

    /// Whether this expression always produces at most one value.
    fn is_single(&self) -> bool;

    /// Declared return type, checked at placeholder sites.
    fn return_type(&self) -> TypeId;

    /// Whether this is a compile-time constant.
    fn is_literal(&self) -> bool {
        false
    }

    /// Constant values, for literal lists and registration-time checks.
    fn constant(&self) -> Option<Vec<Value>> {
        None
    }

    /// Conjunctive (`and`) or disjunctive (`or`) when multi-valued.
    fn and(&self) -> bool {
        true
    }

    /// The members, when this expression is a parsed list.
    fn items(&self) -> Option<&[Rc<dyn Expr>]> {
        None
    }

    /// A copy of this expression bound to the given time state (`-1` past,
    /// `1` future), or `None` if the expression has no distinct time states.
    fn with_time(&self, time: i8) -> Option<Rc<dyn Expr>> {
        let _ = time;
        None
    }

    fn describe(&self) -> String;
}

/// A statement that does something to the world.
pub trait Effect {
    /// Runs the effect. `Ok(false)` terminates the rest of the trigger
    /// (an explicit stop), `Ok(true)` continues with the next item.
    fn execute(&self, run: &mut Run<'_>) -> Result<bool, RunError>;

    fn describe(&self) -> String;
}

/// A boolean check. As a trigger item, a failing condition ends the walk of
/// the current trigger for this event.
pub trait Condition {
    fn check(&self, run: &mut Run<'_>) -> Result<bool, RunError>;

    fn describe(&self) -> String;
}

/// Decides which events a trigger reacts to. Produced by event producers from
/// the header line of a handler block.
pub trait EventSpec {
    fn matches(&self, event: &Event) -> bool;

    fn describe(&self) -> String;
}
