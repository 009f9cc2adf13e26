//! The public surface: loading pre-tokenized scripts into executable
//! [`Script`]s, the reload slot, and direct entry points into the resolver
//! for hosts that parse a single expression or command argument.

use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::{
    LogEntry, MatchOutcome, ParseContext, ParseFlags, ParseLog, Registry, Resolver, Script, load_trigger,
};
use crate::{Condition, Expr, TypeId};

/// Options that affect parsing/resolution behavior.
#[derive(Debug, Clone)]
pub struct Options {
    /// Silences the low-severity warning for lists written without an
    /// explicit 'and' or 'or'.
    pub suppress_missing_and_or_warnings: bool,
    /// Bails out of pathologically nested expressions instead of recursing
    /// without bound.
    pub max_recursion_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options { suppress_missing_and_or_warnings: false, max_recursion_depth: 100 }
    }
}

// --- Input structure --------------------------------------------------------

/// One pre-tokenized line of a script body. Line splitting and indentation
/// parsing happen upstream; the loader only sees this structure.
#[derive(Debug, Clone)]
pub enum ScriptNode {
    Statement { text: String, line: usize },
    Section { header: String, line: usize, body: Vec<ScriptNode> },
}

impl ScriptNode {
    pub fn statement(text: impl Into<String>, line: usize) -> Self {
        ScriptNode::Statement { text: text.into(), line }
    }

    pub fn section(header: impl Into<String>, line: usize, body: Vec<ScriptNode>) -> Self {
        ScriptNode::Section { header: header.into(), line, body }
    }
}

/// One event-handler block: the header line plus its pre-delimited body.
#[derive(Debug, Clone)]
pub struct EventBlock {
    pub header: String,
    pub line: usize,
    pub body: Vec<ScriptNode>,
}

/// What loading a script produced: the executable script plus everything the
/// parse log surfaced — at most one error per failed line, plus warnings.
pub struct LoadOutcome {
    pub script: Script,
    pub log: Vec<LogEntry>,
}

/// Compiles a script from its pre-tokenized blocks. A block whose header does
/// not resolve is skipped, as is any body line that fails; loading always
/// continues with the rest.
pub fn load_script(registry: &Registry, name: &str, blocks: &[EventBlock], options: &Options) -> LoadOutcome {
    let mut log = ParseLog::new();
    let mut script = Script::new(name);
    for block in blocks {
        if let Some(trigger) = load_trigger(registry, options, &block.header, block.line, &block.body, &mut log) {
            script.push(trigger);
        }
    }
    LoadOutcome { script, log: log.take_entries() }
}

// --- Reload slot ------------------------------------------------------------

/// Holder for the active script. Event dispatch reads `current()`; a reload
/// builds a complete new [`Script`] and swaps it in atomically, so in-flight
/// walks keep the tree they started with.
pub struct ScriptSlot {
    inner: RefCell<Rc<Script>>,
}

impl ScriptSlot {
    pub fn new(script: Script) -> Self {
        ScriptSlot { inner: RefCell::new(Rc::new(script)) }
    }

    pub fn current(&self) -> Rc<Script> {
        self.inner.borrow().clone()
    }

    /// Installs a new script, returning the one it replaced.
    pub fn swap(&self, script: Script) -> Rc<Script> {
        self.inner.replace(Rc::new(script))
    }
}

// --- Direct resolver entry points -------------------------------------------

/// Resolves one piece of text as an expression of the given target types.
/// Returns the expression (if any) and the log entries the attempt surfaced.
pub fn resolve_expression(
    registry: &Registry,
    text: &str,
    types: &[TypeId],
    options: &Options,
) -> (Option<Rc<dyn Expr>>, Vec<LogEntry>) {
    let mut log = ParseLog::new();
    let result = Resolver::new(registry, options, text).parse_expression(types, &mut log);
    (result, log.take_entries())
}

/// Resolves one piece of text as a condition.
pub fn resolve_condition(
    registry: &Registry,
    text: &str,
    options: &Options,
) -> (Option<Box<dyn Condition>>, Vec<LogEntry>) {
    let mut log = ParseLog::new();
    let result = Resolver::new(registry, options, text)
        .parse_condition(Some(&format!("can't understand this condition: '{}'", text.trim())), &mut log);
    (result, log.take_entries())
}

/// Matches `text` against a single pattern, command-argument style: literal
/// placeholders only, every character a token boundary.
pub fn parse_pattern(registry: &Registry, text: &str, pattern: &str, options: &Options) -> Option<MatchOutcome> {
    let mut log = ParseLog::new();
    Resolver::new(registry, options, text)
        .with_flags(ParseFlags::LITERALS)
        .with_context(ParseContext::Command)
        .match_direct(pattern, &mut log)
}
