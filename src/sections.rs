//! The built-in control-flow vocabulary: `if`/`else if`/`else` chains,
//! `loop %objects%`, the `stop` effect, and the `loop-value` expression.
//! Registered through the same interface the host's domain vocabulary uses.

use std::rc::Rc;

use crate::engine::{Bucket, ChainRole, ExecState, NextRef, Registry, SectionBody, SectionCtx};
use crate::{Condition, Effect, Expr, Run, RunError, TypeId, Value};

/// Registers the built-in sections and statements into `registry`.
pub fn register_builtins(registry: &mut Registry) {
    register_conditional(registry);
    register_loop(registry);
    register_stop(registry);
    register_loop_value(registry);
}

// --- if / else if / else ----------------------------------------------------

enum ConditionalMode {
    Else,
    ElseIf,
    If,
}

/// One branch of a conditional chain. Branch outcome needs no per-run state:
/// a taken branch's body is wired to resume after the whole chain, and the
/// false path falls through to the next sibling.
struct Conditional {
    mode: ConditionalMode,
    cond: Option<Box<dyn Condition>>,
}

impl SectionBody for Conditional {
    fn role(&self) -> ChainRole {
        match self.mode {
            ConditionalMode::If => ChainRole::Opener,
            ConditionalMode::ElseIf => ChainRole::Link,
            ConditionalMode::Else => ChainRole::Tail,
        }
    }

    fn enter(&self, sec: &SectionCtx, run: &mut Run<'_>, _state: &mut ExecState) -> Result<NextRef, RunError> {
        let taken = match &self.cond {
            None => true,
            Some(cond) => cond.check(run)?,
        };
        Ok(if taken { sec.enter_body() } else { sec.next() })
    }

    fn describe(&self) -> String {
        let cond = || self.cond.as_ref().map(|c| c.describe()).unwrap_or_default();
        match self.mode {
            ConditionalMode::If => format!("if {}", cond()),
            ConditionalMode::ElseIf => format!("else if {}", cond()),
            ConditionalMode::Else => "else".to_string(),
        }
    }
}

fn register_conditional(registry: &mut Registry) {
    registry.register_section(
        "conditional",
        patterns!["else", "else if <.+>", "[(1¦if)] <.+>"],
        |ctx| {
            if ctx.pattern_index == 0 {
                return Some(Box::new(Conditional { mode: ConditionalMode::Else, cond: None }));
            }
            let text = ctx.capture(0)?.whole().to_string();
            // Without an explicit `if` keyword, a failed condition should not
            // shadow other candidates with a default error.
            let default_error = (ctx.pattern_index == 1 || ctx.mark != 0)
                .then(|| format!("can't understand this condition: '{text}'"));
            let cond = ctx.parse_condition(&text, default_error.as_deref())?;
            let mode = if ctx.pattern_index == 1 { ConditionalMode::ElseIf } else { ConditionalMode::If };
            Some(Box::new(Conditional { mode, cond: Some(cond) }))
        },
    );
}

// --- loop -------------------------------------------------------------------

/// `loop %objects%`: the expression is evaluated once on entry; the cursor
/// lives in the [`ExecState`], keyed by this section's node id, and the body
/// is re-entered until the cursor runs dry.
struct LoopSection {
    expr: Rc<dyn Expr>,
}

impl SectionBody for LoopSection {
    fn enter(&self, sec: &SectionCtx, run: &mut Run<'_>, state: &mut ExecState) -> Result<NextRef, RunError> {
        let values = self.expr.eval(run)?;
        if values.is_empty() || !sec.has_body() {
            return Ok(sec.next());
        }
        state.start_iteration(sec.id(), values);
        match state.next_iteration(sec.id()) {
            Some(value) => {
                run.loop_values.push(value);
                Ok(sec.enter_body())
            }
            None => Ok(sec.next()),
        }
    }

    fn resume(&self, sec: &SectionCtx, run: &mut Run<'_>, state: &mut ExecState) -> Result<NextRef, RunError> {
        match state.next_iteration(sec.id()) {
            Some(value) => {
                if let Some(top) = run.loop_values.last_mut() {
                    *top = value;
                }
                Ok(sec.enter_body())
            }
            None => {
                state.end_iteration(sec.id());
                run.loop_values.pop();
                Ok(sec.exit())
            }
        }
    }

    fn describe(&self) -> String {
        format!("loop {}", self.expr.describe())
    }
}

fn register_loop(registry: &mut Registry) {
    registry.register_section("loop", patterns!["loop %objects%"], |ctx| {
        let expr = ctx.expr(0)?;
        Some(Box::new(LoopSection { expr }))
    });
}

// --- stop -------------------------------------------------------------------

struct StopEffect;

impl Effect for StopEffect {
    fn execute(&self, _run: &mut Run<'_>) -> Result<bool, RunError> {
        Ok(false)
    }

    fn describe(&self) -> String {
        "stop".to_string()
    }
}

fn register_stop(registry: &mut Registry) {
    registry.register_effect("stop", patterns!["stop [[the] [current] trigger]"], |_ctx| Some(Box::new(StopEffect)));
}

// --- loop-value -------------------------------------------------------------

struct LoopValue;

impl Expr for LoopValue {
    fn eval(&self, run: &mut Run<'_>) -> Result<Vec<Value>, RunError> {
        Ok(run.current_loop_value().cloned().into_iter().collect())
    }

    fn is_single(&self) -> bool {
        true
    }

    fn return_type(&self) -> TypeId {
        TypeId::OBJECT
    }

    fn describe(&self) -> String {
        "loop-value".to_string()
    }
}

fn register_loop_value(registry: &mut Registry) {
    registry.register_expression(
        "loop-value",
        TypeId::OBJECT,
        Bucket::Simple,
        patterns!["[the] loop-value", "[the] loop value"],
        |_ctx| Some(Rc::new(LoopValue)),
    );
}
