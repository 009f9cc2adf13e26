//! Pattern matching, syntax resolution, and trigger execution.
//!
//! This module is the engine proper; the public surface re-exports from here
//! through `crate::api`. The submodules live under `src/engine/`.
//!
//! ## How the parts work together
//!
//! Compiling one statement line is a pipeline:
//!
//! ```text
//! registry (producers,  ──┐
//!  types, functions)      │
//!                         v
//! line ── Resolver::parse ┼─ per producer, per pattern:
//!         (resolver.rs)   │
//!                         v
//!              match_pattern (matcher.rs)
//!                - recursive backtracking over (pattern pos, input pos)
//!                - at %placeholders%: try every token boundary, call
//!                  back into the resolver for the sub-expression
//!                         │
//!                         v
//!              MatchOutcome ── producer factory ── Effect / Condition /
//!                                                  Section / Expression
//! ```
//!
//! Every attempt runs inside a diagnostics scope (`diagnostics.rs`): failed
//! candidates keep only their best error, the winning candidate commits its
//! retained messages, and a line that never resolves surfaces exactly one
//! highest-quality error.
//!
//! Resolved statements are assembled into an arena-backed [`Trigger`]
//! (`trigger.rs`) and walked once per delivered event.
//!
//! ## Responsibilities by module
//!
//! - `matcher.rs`: the pattern mini-language — literals, `[optional]`,
//!   `(choice|groups)` with `N¦` marks, `<regex>`, `%type%` placeholders —
//!   plus registration-time pattern validation.
//! - `resolver.rs`: candidate iteration in priority-bucket order, placeholder
//!   resolution, comma/and/or list parsing, and the variable / function-call /
//!   quoted-string fast paths.
//! - `registry.rs`: the producer, type, and function tables. Owned by the
//!   hosting application and passed in explicitly; nothing here is a global.
//! - `diagnostics.rs`: the scoped parse log.
//! - `trigger.rs`: trigger arena, sections, and the per-event walk.

#[path = "engine/diagnostics.rs"]
mod diagnostics;
#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/registry.rs"]
pub(crate) mod registry;
#[path = "engine/resolver.rs"]
mod resolver;
#[path = "engine/trigger.rs"]
mod trigger;


pub use diagnostics::{ErrorQuality, LogEntry, ParseLog, Severity};
pub use matcher::{MatchOutcome, PatternError, RegexCapture};
pub use registry::{Bucket, FunctionDecl, InitCtx, Registry};
pub use resolver::{ParseContext, ParseFlags, Resolver};
pub use trigger::{ChainRole, ExecState, NextRef, Script, SectionBody, SectionCtx, Trigger};

pub(crate) use trigger::load_trigger;
