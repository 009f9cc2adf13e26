//! The trigger tree and its executor.
//!
//! A [`Trigger`] is the executable form of one event-handler block: an arena
//! of nodes (statements, conditions, sections) linked by integer indices.
//! Built once when a script loads, never mutated afterwards; all per-run
//! state — loop cursors, the loop-value stack — lives in an [`ExecState`]
//! record threaded through the walk, so concurrent dispatches against the
//! same tree cannot observe each other.
//!
//! ```text
//! on strike:            Trigger.first ─▶ [0] effect
//!   note "hit"                              │ next
//!   if {armed} is set:                   [1] section ── first ─▶ [2] effect
//!     note "armed"                          │   \ body tail: EndSection(1)
//!   note "done"                             │ exit
//!                                        [3] effect ── next: End
//! ```
//!
//! Sections decide at `enter` whether to run their body; a finished body
//! reports back through [`NextRef::EndSection`], and the section's `resume`
//! either re-enters the body (a loop advancing its cursor) or falls through.
//! The links themselves stay acyclic — iteration is stateful re-entry, not a
//! back-edge.
//!
//! A failed line is skipped at load time and the rest of the block still
//! loads; a failed `walk` at run time aborts only that trigger for that
//! event, reported at the dispatch boundary.

use std::collections::HashMap;
use std::collections::VecDeque;

use tracing::error;

use super::diagnostics::{ErrorQuality, ParseLog};
use super::registry::Registry;
use super::resolver::{ParseContext, ParseFlags, Resolver, Statement};
use crate::api::{Options, ScriptNode};
use crate::{Condition, Effect, Event, EventSpec, Run, RunError, Value, Variables};

pub(crate) type NodeId = usize;

/// Where execution goes after a node: another item, the owning section's
/// continuation point, or the end of the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextRef {
    Item(NodeId),
    EndSection(NodeId),
    End,
}

/// How a section relates to its preceding sibling. An `if` opens a chain,
/// `else if` links into one, `else` closes one; anything else stands alone.
/// A taken branch resumes after the whole chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainRole {
    Standalone,
    Opener,
    Link,
    Tail,
}

/// The per-walk view of a section node.
#[derive(Debug, Clone, Copy)]
pub struct SectionCtx {
    id: NodeId,
    first: Option<NodeId>,
    next: NextRef,
    exit: NextRef,
}

impl SectionCtx {
    pub fn id(&self) -> usize {
        self.id
    }

    /// The first body item — or, for an empty body, straight to the exit.
    pub fn enter_body(&self) -> NextRef {
        self.first.map(NextRef::Item).unwrap_or(self.exit)
    }

    pub fn has_body(&self) -> bool {
        self.first.is_some()
    }

    /// The next sibling (an `if` falls through here to reach its `else`).
    pub fn next(&self) -> NextRef {
        self.next
    }

    /// The item after the whole chain this section belongs to.
    pub fn exit(&self) -> NextRef {
        self.exit
    }
}

/// Behavior of a section node. Implementations own no per-run state; loop
/// cursors and the like go through the [`ExecState`].
pub trait SectionBody {
    fn role(&self) -> ChainRole {
        ChainRole::Standalone
    }

    /// Called when the walk arrives at the section: enter the body or skip.
    fn enter(&self, sec: &SectionCtx, run: &mut Run<'_>, state: &mut ExecState) -> Result<NextRef, RunError>;

    /// Called when the body has finished one pass. Defaults to falling
    /// through; loops re-enter here.
    fn resume(&self, sec: &SectionCtx, run: &mut Run<'_>, state: &mut ExecState) -> Result<NextRef, RunError> {
        let _ = (run, state);
        Ok(sec.exit())
    }

    fn describe(&self) -> String;
}

/// Per-dispatch iteration state, keyed by section node id.
#[derive(Debug, Default)]
pub struct ExecState {
    cursors: HashMap<NodeId, VecDeque<Value>>,
}

impl ExecState {
    pub fn start_iteration(&mut self, id: usize, values: Vec<Value>) {
        self.cursors.insert(id, values.into());
    }

    pub fn next_iteration(&mut self, id: usize) -> Option<Value> {
        self.cursors.get_mut(&id)?.pop_front()
    }

    pub fn end_iteration(&mut self, id: usize) {
        self.cursors.remove(&id);
    }

    pub fn is_iterating(&self, id: usize) -> bool {
        self.cursors.contains_key(&id)
    }
}

// --- The arena --------------------------------------------------------------

pub(crate) struct SectionData {
    body: Box<dyn SectionBody>,
    first: Option<NodeId>,
    exit: NextRef,
    role: ChainRole,
}

pub(crate) enum NodeKind {
    Effect(Box<dyn Effect>),
    Condition(Box<dyn Condition>),
    Section(SectionData),
}

pub(crate) struct Node {
    kind: NodeKind,
    next: NextRef,
    source: String,
    line: usize,
}

/// One compiled event-handler block.
pub struct Trigger {
    name: String,
    line: usize,
    event: Box<dyn EventSpec>,
    nodes: Vec<Node>,
    first: NextRef,
}

impl Trigger {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event(&self) -> &dyn EventSpec {
        self.event.as_ref()
    }

    /// Walks the trigger once for the given event. An evaluation failure is
    /// caught here, logged, and aborts only this trigger; the return value
    /// reports whether the walk ran to completion.
    pub fn run(&self, event: &Event, vars: &mut Variables) -> bool {
        let mut run = Run::new(event, vars);
        let mut state = ExecState::default();
        let mut cur = self.first;
        loop {
            let stepped = match cur {
                NextRef::End => break,
                NextRef::Item(id) => self.walk(id, &mut run, &mut state),
                NextRef::EndSection(id) => self.resume(id, &mut run, &mut state),
            };
            match stepped {
                Ok(next) => cur = next,
                Err(e) => {
                    let (source, line) = match cur {
                        NextRef::Item(id) | NextRef::EndSection(id) => {
                            (self.nodes[id].source.as_str(), self.nodes[id].line)
                        }
                        NextRef::End => (self.name.as_str(), self.line),
                    };
                    error!(trigger = %self.name, item = source, line, error = %e, "trigger aborted");
                    return false;
                }
            }
        }
        true
    }

    fn walk(&self, id: NodeId, run: &mut Run<'_>, state: &mut ExecState) -> Result<NextRef, RunError> {
        let node = &self.nodes[id];
        match &node.kind {
            NodeKind::Effect(effect) => Ok(if effect.execute(run)? { node.next } else { NextRef::End }),
            NodeKind::Condition(cond) => Ok(if cond.check(run)? { node.next } else { NextRef::End }),
            NodeKind::Section(data) => data.body.enter(&self.section_ctx(id, data, node.next), run, state),
        }
    }

    fn resume(&self, id: NodeId, run: &mut Run<'_>, state: &mut ExecState) -> Result<NextRef, RunError> {
        let node = &self.nodes[id];
        match &node.kind {
            NodeKind::Section(data) => data.body.resume(&self.section_ctx(id, data, node.next), run, state),
            _ => Err(RunError::Eval(format!("'{}' is not a section", node.source))),
        }
    }

    fn section_ctx(&self, id: NodeId, data: &SectionData, next: NextRef) -> SectionCtx {
        SectionCtx { id, first: data.first, next, exit: data.exit }
    }
}

/// All triggers compiled from one script, swapped in wholesale on reload.
pub struct Script {
    name: String,
    triggers: Vec<Trigger>,
}

impl Script {
    pub fn new(name: impl Into<String>) -> Self {
        Script { name: name.into(), triggers: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn push(&mut self, trigger: Trigger) {
        self.triggers.push(trigger);
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Runs every trigger whose event spec matches. Returns how many ran.
    pub fn dispatch(&self, event: &Event, vars: &mut Variables) -> usize {
        let mut count = 0;
        for trigger in &self.triggers {
            if trigger.event.matches(event) {
                trigger.run(event, vars);
                count += 1;
            }
        }
        count
    }
}

// --- Loading ----------------------------------------------------------------

/// Compiles one event-handler block. `None` when the header line itself does
/// not resolve (the error is in the log); a failed body line is skipped and
/// the rest still loads.
pub(crate) fn load_trigger(
    registry: &Registry,
    options: &Options,
    header: &str,
    line: usize,
    body: &[ScriptNode],
    log: &mut ParseLog,
) -> Option<Trigger> {
    log.set_line(Some(line));
    let event = Resolver::sub(registry, options, header, ParseFlags::LITERALS, ParseContext::Event, 0)
        .parse_event(log)?;
    let mut nodes = Vec::new();
    let first = load_items(&mut nodes, body, NextRef::End, registry, options, log);
    Some(Trigger {
        name: header.trim().to_string(),
        line,
        event,
        nodes,
        first: first.map(NextRef::Item).unwrap_or(NextRef::End),
    })
}

/// Loads a sequence of sibling items into the arena, wiring `next` pointers,
/// section bodies, and conditional-chain exits. Returns the first item's id.
fn load_items(
    arena: &mut Vec<Node>,
    nodes: &[ScriptNode],
    tail: NextRef,
    registry: &Registry,
    options: &Options,
    log: &mut ParseLog,
) -> Option<NodeId> {
    let mut ids: Vec<NodeId> = Vec::new();
    for node in nodes {
        match node {
            ScriptNode::Statement { text, line } => {
                log.set_line(Some(*line));
                let resolver = Resolver::sub(registry, options, text, ParseFlags::all(), ParseContext::Default, 0);
                let Some(statement) = resolver.parse_statement(log) else { continue };
                let kind = match statement {
                    Statement::Effect(e) => NodeKind::Effect(e),
                    Statement::Condition(c) => NodeKind::Condition(c),
                };
                let id = arena.len();
                arena.push(Node { kind, next: tail, source: text.trim().to_string(), line: *line });
                ids.push(id);
            }
            ScriptNode::Section { header, line, body } => {
                log.set_line(Some(*line));
                let resolver = Resolver::sub(registry, options, header, ParseFlags::all(), ParseContext::Default, 0);
                let Some(section) = resolver.parse_section(log) else { continue };
                let role = section.role();
                if matches!(role, ChainRole::Link | ChainRole::Tail) {
                    let prev_ok = ids.last().is_some_and(|&prev| {
                        matches!(
                            &arena[prev].kind,
                            NodeKind::Section(data) if matches!(data.role, ChainRole::Opener | ChainRole::Link)
                        )
                    });
                    if !prev_ok {
                        log.error(
                            format!(
                                "'{}' has to be placed just after another 'if' or 'else if' section",
                                header.trim()
                            ),
                            ErrorQuality::Semantic,
                        );
                        continue;
                    }
                }
                let id = arena.len();
                arena.push(Node {
                    kind: NodeKind::Section(SectionData { body: section, first: None, exit: tail, role }),
                    next: tail,
                    source: header.trim().to_string(),
                    line: *line,
                });
                let first_child = load_items(arena, body, NextRef::EndSection(id), registry, options, log);
                if let NodeKind::Section(data) = &mut arena[id].kind {
                    data.first = first_child;
                }
                ids.push(id);
            }
        }
    }

    // Sibling wiring: each item's `next`, and each section's chain exit —
    // the item after any contiguous `else if`/`else` run that follows it.
    let roles: Vec<Option<ChainRole>> = ids
        .iter()
        .map(|&id| match &arena[id].kind {
            NodeKind::Section(data) => Some(data.role),
            _ => None,
        })
        .collect();
    for (k, &id) in ids.iter().enumerate() {
        let next = ids.get(k + 1).map(|&n| NextRef::Item(n)).unwrap_or(tail);
        arena[id].next = next;
        if let NodeKind::Section(data) = &mut arena[id].kind {
            let mut j = k + 1;
            while roles.get(j).copied().flatten() == Some(ChainRole::Link) {
                j += 1;
            }
            if roles.get(j).copied().flatten() == Some(ChainRole::Tail) {
                j += 1;
            }
            data.exit = ids.get(j).map(|&n| NextRef::Item(n)).unwrap_or(tail);
        }
    }
    ids.first().copied()
}
