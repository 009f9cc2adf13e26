//! The syntax resolver.
//!
//! Where the matcher answers "does this line have the shape of this
//! pattern?", the resolver decides *which* producer owns a line and builds
//! the fully typed result. It iterates candidate producers in
//! priority-bucket-then-registration order, lets the matcher search
//! placeholder boundaries, recursively resolves every placeholder against its
//! accepted type set, and applies the list grammar
//! (`a, b and c` / `a or b` / `a nor b`) on top.
//!
//! First full success wins. Ambiguity between producers is settled purely by
//! registration order within buckets — there is no scoring, which keeps
//! resolution deterministic and producer authors in control.
//!
//! Fast paths tried before the general candidate search: a fully
//! parenthesized expression is unwrapped, `{variable}` references,
//! `name(args)` function calls, and quoted-string literals.

use std::rc::Rc;

use bitflags::bitflags;

use super::diagnostics::{ErrorQuality, LogEntry, ParseLog};
use super::matcher::{MatchCtx, MatchOutcome, PlaceholderInfo, SlotResolver, match_pattern, next_token_end};
use super::registry::{InitCtx, ProducerInfo, Registry};
use crate::api::Options;
use crate::expr::{ConvertedExpr, ExprCondition, ExpressionList, FunctionRef, LiteralList, SimpleLiteral, Variable};
use crate::{Condition, Effect, EventSpec, Expr, TypeId, Value};

bitflags! {
    /// What a resolution attempt is allowed to produce. Placeholder
    /// restriction masks (`%*text%`, `%~number%`) intersect with these.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ParseFlags: u8 {
        const EXPRESSIONS = 1;
        const LITERALS = 2;
    }
}

/// The mode a piece of text is being resolved in: an ordinary statement line,
/// an event header, or a command argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseContext {
    Default,
    Event,
    Command,
}

const MULTIPLE_AND_OR: &str =
    "List has multiple 'and' or 'or', will default to 'and'. Use brackets if you want to define multiple lists.";
const MISSING_AND_OR: &str = "List is missing 'and' or 'or', defaulting to 'and'";

/// A resolved statement line.
pub(crate) enum Statement {
    Condition(Box<dyn Condition>),
    Effect(Box<dyn Effect>),
}

/// One resolution attempt over one piece of text. Cheap to construct;
/// sub-expressions get their own `Resolver` with an incremented depth.
pub struct Resolver<'r> {
    registry: &'r Registry,
    options: &'r Options,
    text: String,
    flags: ParseFlags,
    context: ParseContext,
    depth: usize,
    suppress_and_or: bool,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r Registry, options: &'r Options, text: &str) -> Self {
        Self::sub(registry, options, text, ParseFlags::all(), ParseContext::Default, 0)
    }

    pub(crate) fn sub(
        registry: &'r Registry,
        options: &'r Options,
        text: &str,
        flags: ParseFlags,
        context: ParseContext,
        depth: usize,
    ) -> Self {
        Resolver {
            registry,
            options,
            text: text.trim().to_string(),
            flags,
            context,
            depth,
            suppress_and_or: false,
        }
    }

    pub(crate) fn with_context(mut self, context: ParseContext) -> Self {
        self.context = context;
        self
    }

    pub(crate) fn with_flags(mut self, flags: ParseFlags) -> Self {
        self.flags = flags;
        self
    }

    fn suppressing_and_or(mut self) -> Self {
        self.suppress_and_or = true;
        self
    }

    fn nested(&self, text: &str) -> Resolver<'r> {
        Resolver::sub(self.registry, self.options, text, self.flags, self.context, self.depth + 1)
    }

    // --- Producer iteration ---------------------------------------------

    /// Tries every producer's every pattern in order; the first structural
    /// match whose factory accepts wins.
    pub(crate) fn parse_with<'p, T: 'p>(
        &self,
        producers: impl IntoIterator<Item = &'p ProducerInfo<T>>,
        log: &mut ParseLog,
    ) -> Option<T> {
        log.open_scope();
        for info in producers {
            for (pattern_index, pattern) in info.patterns.iter().enumerate() {
                log.clear();
                let ctx = MatchCtx {
                    pattern,
                    input: &self.text,
                    parse_ctx: self.context,
                    registry: self.registry,
                    slots: self,
                };
                let Some(mut outcome) = match_pattern(&ctx, log) else { continue };
                if !self.fill_defaults(pattern, info.name.as_str(), &mut outcome, log) {
                    continue;
                }
                let produced = {
                    let mut init = InitCtx {
                        exprs: &outcome.exprs,
                        pattern_index,
                        mark: outcome.mark,
                        captures: &outcome.captures,
                        registry: self.registry,
                        log: &mut *log,
                        options: self.options,
                        parse_ctx: self.context,
                        depth: self.depth,
                    };
                    (info.factory)(&mut init)
                };
                if let Some(t) = produced {
                    log.commit();
                    return Some(t);
                }
            }
        }
        log.discard_error(None);
        None
    }

    /// Substitutes default values for placeholders the line omitted. Only
    /// `-`-marked placeholders may stay empty; everything else needs a
    /// default-value provider satisfying the slot's constraints — a missing
    /// or unsuitable provider is a bug in the registering collaborator.
    fn fill_defaults(&self, pattern: &str, producer: &str, outcome: &mut MatchOutcome, log: &mut ParseLog) -> bool {
        for (slot, token) in placeholder_tokens(pattern).into_iter().enumerate() {
            if outcome.exprs[slot].is_some() {
                continue;
            }
            let Ok(info) = PlaceholderInfo::parse(token, self.registry) else { return false };
            if info.optional {
                continue;
            }
            let (ty, plural) = info.types[0];
            let bug = |log: &mut ParseLog, msg: String| {
                tracing::warn!(producer, pattern, "{msg}");
                log.error(msg, ErrorQuality::Semantic);
                false
            };
            let Some(expr) = self.registry.default_value(ty) else {
                return bug(
                    log,
                    format!(
                        "the type '{}' does not provide a default value; allow omission with '%-{token}%' or make the value mandatory",
                        self.registry.type_name(ty)
                    ),
                );
            };
            if !expr.is_literal() && !info.flag_mask.contains(ParseFlags::EXPRESSIONS) {
                return bug(
                    log,
                    format!("the default value of '{}' is not a literal", self.registry.type_name(ty)),
                );
            }
            if expr.is_literal() && !info.flag_mask.contains(ParseFlags::LITERALS) {
                return bug(log, format!("the default value of '{}' is a literal", self.registry.type_name(ty)));
            }
            if !plural && !expr.is_single() {
                return bug(
                    log,
                    format!("the default value of '{}' is not a single value", self.registry.type_name(ty)),
                );
            }
            let expr = if info.time != 0 {
                match expr.with_time(info.time) {
                    Some(e) => e,
                    None => {
                        return bug(
                            log,
                            format!(
                                "the default value of '{}' does not have distinct time states",
                                self.registry.type_name(ty)
                            ),
                        );
                    }
                }
            } else {
                expr
            };
            outcome.exprs[slot] = Some(expr);
        }
        true
    }

    // --- Statements, sections, events ------------------------------------

    pub(crate) fn parse_statement(&self, log: &mut ParseLog) -> Option<Statement> {
        log.open_scope();
        if let Some(c) = self.parse_with(self.registry.conditions.iter(), log) {
            log.commit();
            return Some(Statement::Condition(c));
        }
        log.clear();
        if let Some(e) = self.parse_with(self.registry.effects.iter(), log) {
            log.commit();
            return Some(Statement::Effect(e));
        }
        log.discard_error(Some(LogEntry::error(
            format!("can't understand this condition/effect: '{}'", self.text),
            ErrorQuality::CannotUnderstand,
        )));
        None
    }

    pub(crate) fn parse_section(&self, log: &mut ParseLog) -> Option<Box<dyn super::trigger::SectionBody>> {
        log.open_scope();
        if let Some(s) = self.parse_with(self.registry.sections.iter(), log) {
            log.commit();
            return Some(s);
        }
        log.discard_error(Some(LogEntry::error(
            format!("can't understand this section: '{}'", self.text),
            ErrorQuality::CannotUnderstand,
        )));
        None
    }

    pub(crate) fn parse_event(&self, log: &mut ParseLog) -> Option<Box<dyn EventSpec>> {
        log.open_scope();
        if let Some(e) = self.parse_with(self.registry.events.iter(), log) {
            log.commit();
            return Some(e);
        }
        log.discard_error(Some(LogEntry::error(
            format!("can't understand this event: '{}'", self.text),
            ErrorQuality::CannotUnderstand,
        )));
        None
    }

    /// Parses a condition line: registered conditions first, then any
    /// boolean-typed expression, wrapped.
    pub(crate) fn parse_condition(&self, default_error: Option<&str>, log: &mut ParseLog) -> Option<Box<dyn Condition>> {
        let mut text = self.text.as_str();
        while text.starts_with('(')
            && text.ends_with(')')
            && next_token_end(text, 0, self.context) == Some(text.len())
        {
            text = text[1..text.len() - 1].trim();
        }
        let inner = self.nested(text);
        log.open_scope();
        if let Some(c) = inner.parse_with(self.registry.conditions.iter(), log) {
            log.commit();
            return Some(c);
        }
        log.clear();
        let boolean = self.registry.type_named("boolean").unwrap_or(TypeId::OBJECT);
        if let Some(e) = inner.parse_expression(&[boolean], log) {
            log.commit();
            return Some(Box::new(ExprCondition::new(e)));
        }
        log.discard_error(default_error.map(|m| LogEntry::error(m, ErrorQuality::CannotUnderstand)));
        None
    }

    // --- Expressions ------------------------------------------------------

    /// Parses the text as one expression of the given target types, applying
    /// the comma/and/or list grammar.
    pub fn parse_expression(&self, types: &[TypeId], log: &mut ParseLog) -> Option<Rc<dyn Expr>> {
        if self.text.is_empty() {
            return None;
        }
        if self.depth > self.options.max_recursion_depth {
            log.error("expression is nested too deeply", ErrorQuality::Semantic);
            return None;
        }
        let is_object = types.len() == 1 && types[0] == TypeId::OBJECT;

        log.open_scope();
        if let Some(r) = self.parse_single(false, None, types, log) {
            log.commit();
            return Some(r);
        }
        log.clear();

        // Split points reachable only outside quotes, braces, and brackets.
        let Some(pieces) = self.list_pieces() else {
            log.error(
                format!("invalid brackets/variables/text in '{}'", self.text),
                ErrorQuality::NotAnExpression,
            );
            log.discard_error(None);
            return None;
        };

        if pieces.len() == 1 {
            // Not a list, and the single expression failed above.
            if self.wrapped_in_parens(&self.text) {
                log.commit();
                return self.nested(&self.text[1..self.text.len() - 1]).parse_expression(types, log);
            }
            // A bare literal with no target type to guide it: parse it now
            // with whatever literal parser accepts it.
            if is_object && self.flags.contains(ParseFlags::LITERALS) {
                if let Some(lit) = self.parse_deferred_literal() {
                    log.commit();
                    return Some(lit);
                }
            }
            log.discard_error(None);
            return None;
        }

        let mut items: Vec<Rc<dyn Expr>> = Vec::new();
        let mut is_and: Option<bool> = None;
        let mut is_literal_list = true;

        // Longest contiguous runs first, so bracketed runs and
        // separator-containing phrases survive as single expressions.
        let mut b = 0;
        'outer: while b < pieces.len() {
            let mut a = pieces.len() - b;
            while a >= 1 {
                // The whole text was already tried as a single expression.
                if !(b == 0 && a == pieces.len()) {
                    let (x, _) = pieces[b];
                    let y = pieces[b + a - 1].1;
                    let sub_text = self.text[x..y].trim();
                    let prior = log.current_error().cloned();
                    let parsed = if self.wrapped_in_parens(sub_text) {
                        self.nested(sub_text).parse_expression(types, log)
                    } else {
                        self.nested(sub_text).parse_single(a == 1, prior, types, log)
                    };
                    if let Some(t) = parsed {
                        is_literal_list &= t.is_literal();
                        if b != 0 {
                            let sep = self.text[pieces[b - 1].1..x].trim();
                            if sep != "," {
                                let and = !sep.eq_ignore_ascii_case("or");
                                match is_and {
                                    None => is_and = Some(and),
                                    Some(current) if current != and => {
                                        log.warning(format!("{MULTIPLE_AND_OR} List: {}", self.text));
                                        is_and = Some(true);
                                    }
                                    _ => {}
                                }
                            }
                        }
                        items.push(t);
                        b += a;
                        continue 'outer;
                    }
                }
                a -= 1;
            }
            log.discard_error(None);
            return None;
        }
        log.commit();

        if items.len() == 1 {
            return items.pop();
        }
        if is_and.is_none() && !self.suppress_and_or && !self.options.suppress_missing_and_or_warnings {
            log.warning(format!("{MISSING_AND_OR}: {}", self.text));
        }
        let and = is_and.unwrap_or(true);
        let item_types: Vec<TypeId> = items.iter().map(|e| e.return_type()).collect();
        let common = self.registry.common_supertype(&item_types);
        if is_literal_list {
            Some(Rc::new(LiteralList::new(items, common, and)))
        } else {
            Some(Rc::new(ExpressionList::new(items, common, and)))
        }
    }

    /// Parses the text as a single (non-list) expression: parenthesis unwrap,
    /// variable / function / quoted-string fast paths, candidate search,
    /// then literal parsing.
    fn parse_single(
        &self,
        allow_deferred_literal: bool,
        prior_error: Option<LogEntry>,
        types: &[TypeId],
        log: &mut ParseLog,
    ) -> Option<Rc<dyn Expr>> {
        if self.text.is_empty() {
            return None;
        }
        if self.depth > self.options.max_recursion_depth {
            log.error("expression is nested too deeply", ErrorQuality::Semantic);
            return None;
        }
        if self.context != ParseContext::Command && self.wrapped_in_parens(&self.text) {
            return self
                .nested(&self.text[1..self.text.len() - 1])
                .parse_single(allow_deferred_literal, prior_error, types, log);
        }

        log.open_scope();

        if matches!(self.context, ParseContext::Default | ParseContext::Event) {
            if let Some(var) = self.parse_variable(log) {
                match var {
                    Ok(v) => {
                        log.commit();
                        return Some(v);
                    }
                    Err(()) => {
                        log.discard_error(None);
                        return None;
                    }
                }
            }
            if let Some(f) = self.parse_function(types, log) {
                log.commit();
                return Some(f);
            } else if log.has_error() {
                log.discard_error(None);
                return None;
            }
        }

        log.clear();
        if self.flags.contains(ParseFlags::EXPRESSIONS) {
            let found: Option<Rc<dyn Expr>> = if let Some(text) = self.quoted_text(types) {
                let ty = self.registry.type_named("text").unwrap_or(TypeId::OBJECT);
                Some(Rc::new(SimpleLiteral::single(Value::Text(text), ty)))
            } else {
                self.parse_with(self.registry.expressions_for(types), log)
            };
            if let Some(e) = found {
                for &t in types {
                    if t == TypeId::OBJECT || self.registry.is_assignable(e.return_type(), t) {
                        log.commit();
                        return Some(e);
                    }
                }
                for &t in types {
                    if self.registry.is_related(e.return_type(), t) {
                        log.commit();
                        return Some(Rc::new(ConvertedExpr::new(e, t, self.registry.checker(t))));
                    }
                }
                log.error(
                    format!("'{}' is {}", e.describe(), self.not_of_type(types)),
                    ErrorQuality::NotAnExpression,
                );
                log.discard_error(None);
                return None;
            }
            log.clear();
        }

        if !self.flags.contains(ParseFlags::LITERALS) {
            log.discard_error(None);
            return None;
        }

        if types[0] == TypeId::OBJECT {
            if !allow_deferred_literal {
                log.discard_error(None);
                return None;
            }
            if let Some(lit) = self.parse_deferred_literal() {
                log.commit();
                return Some(lit);
            }
            log.discard_error(prior_error);
            return None;
        }

        for &t in types {
            log.clear();
            if let Some(parser) = self.registry.literal_parser(t) {
                if let Some(v) = parser(&self.text, self.context) {
                    log.commit();
                    return Some(Rc::new(SimpleLiteral::single(v, t)));
                }
            }
        }
        log.discard_error(None);
        None
    }

    /// A bare literal with no target type to guide parsing: the first
    /// registered literal parser that accepts the text decides its type.
    fn parse_deferred_literal(&self) -> Option<Rc<dyn Expr>> {
        for ty in self.registry.all_type_ids() {
            if ty == TypeId::OBJECT {
                continue;
            }
            if let Some(parser) = self.registry.literal_parser(ty) {
                if let Some(v) = parser(&self.text, self.context) {
                    return Some(Rc::new(SimpleLiteral::single(v, ty)));
                }
            }
        }
        None
    }

    /// `{variable}` fast path. `Some(Err(()))` means the text is a variable
    /// but variables are not allowed here.
    fn parse_variable(&self, log: &mut ParseLog) -> Option<Result<Rc<dyn Expr>, ()>> {
        let var_pattern = regex!(r"(?i)^((the )?var(iable)? )?\{([^{}]|%\{|\}%)+\}$");
        if !var_pattern.is_match(&self.text) {
            return None;
        }
        if !self.flags.contains(ParseFlags::EXPRESSIONS) {
            log.error("Variables cannot be used here.", ErrorQuality::Semantic);
            return Some(Err(()));
        }
        let open = self.text.find('{')?;
        let close = self.text.rfind('}')?;
        Some(Ok(Rc::new(Variable::new(&self.text[open + 1..close]))))
    }

    /// `name(args)` fast path. Returns `None` both when the text is not a
    /// function call (no error recorded) and when it is an invalid one (error
    /// recorded in the enclosing scope).
    fn parse_function(&self, types: &[TypeId], log: &mut ParseLog) -> Option<Rc<dyn Expr>> {
        if !matches!(self.context, ParseContext::Default | ParseContext::Event) {
            return None;
        }
        let call_pattern = regex!(r"^(\p{Alphabetic}[\p{Alphabetic}0-9_]*)\((.*)\)$");
        log.open_scope();
        let Some(caps) = call_pattern.captures(&self.text) else {
            log.commit();
            return None;
        };
        if !self.flags.contains(ParseFlags::EXPRESSIONS) {
            log.error("Functions cannot be used here.", ErrorQuality::Semantic);
            log.discard_error(None);
            return None;
        }
        let name = caps.get(1).map_or("", |m| m.as_str());
        let args_text = caps.get(2).map_or("", |m| m.as_str());

        let args: Vec<Rc<dyn Expr>> = if args_text.is_empty() {
            Vec::new()
        } else {
            let parsed = Resolver::sub(
                self.registry,
                self.options,
                args_text,
                self.flags | ParseFlags::LITERALS,
                self.context,
                self.depth + 1,
            )
            .suppressing_and_or()
            .parse_expression(&[TypeId::OBJECT], log);
            let Some(parsed) = parsed else {
                log.discard_error(None);
                return None;
            };
            match parsed.items() {
                Some(items) => {
                    if !parsed.and() {
                        log.error(
                            "Function arguments must be separated by commas and optionally an 'and', but not an 'or'. \
                             Put the 'or' into a second set of parentheses if you want to make it a single argument, \
                             e.g. 'curse(victim, (sword or axe))'",
                            ErrorQuality::Semantic,
                        );
                        log.discard_error(None);
                        return None;
                    }
                    items.to_vec()
                }
                None => vec![parsed],
            }
        };

        let Some(decl) = self.registry.function(name) else {
            log.error(format!("the function '{name}' does not exist"), ErrorQuality::Semantic);
            log.discard_error(None);
            return None;
        };
        if args.len() != decl.params.len() {
            log.error(
                format!(
                    "the function '{}' requires {} argument{}, but {} {} given",
                    decl.name,
                    decl.params.len(),
                    if decl.params.len() == 1 { "" } else { "s" },
                    args.len(),
                    if args.len() == 1 { "was" } else { "were" },
                ),
                ErrorQuality::Semantic,
            );
            log.discard_error(None);
            return None;
        }
        for (arg, param) in args.iter().zip(&decl.params) {
            if arg.return_type() != TypeId::OBJECT && !self.registry.is_related(arg.return_type(), param.ty) {
                log.error(
                    format!(
                        "the argument '{}' of the function '{}' is {}",
                        param.name,
                        decl.name,
                        self.not_of_type(&[param.ty]),
                    ),
                    ErrorQuality::Semantic,
                );
                log.discard_error(None);
                return None;
            }
            if param.single && !arg.is_single() {
                log.error(
                    format!("the argument '{}' of the function '{}' accepts a single value, not more", param.name, decl.name),
                    ErrorQuality::Semantic,
                );
                log.discard_error(None);
                return None;
            }
        }
        if !types.is_empty()
            && !types.iter().any(|&t| t == TypeId::OBJECT || self.registry.is_related(decl.return_type, t))
        {
            log.error(
                format!(
                    "the function '{}' returns {}, which is {}",
                    decl.name,
                    self.registry.type_name(decl.return_type),
                    self.not_of_type(types),
                ),
                ErrorQuality::Semantic,
            );
            log.discard_error(None);
            return None;
        }
        log.commit();
        Some(Rc::new(FunctionRef::new(decl, args)))
    }

    // --- Direct pattern matching ------------------------------------------

    /// Matches the text against one pattern directly, command-argument style.
    pub(crate) fn match_direct(&self, pattern: &str, log: &mut ParseLog) -> Option<MatchOutcome> {
        log.open_scope();
        let ctx =
            MatchCtx { pattern, input: &self.text, parse_ctx: self.context, registry: self.registry, slots: self };
        let res = match_pattern(&ctx, log);
        if res.is_some() {
            log.commit();
        } else {
            log.discard_error(None);
        }
        res
    }

    // --- Helpers ----------------------------------------------------------

    /// The `(start, end)` spans of the comma/and/or separated runs, split
    /// only at positions reachable by [`next_token_end`]. `None` when the
    /// text contains unbalanced quotes, braces, or brackets.
    fn list_pieces(&self) -> Option<Vec<(usize, usize)>> {
        let text = self.text.as_str();
        let n = text.len();
        let mut pieces = Vec::new();
        let mut i = 0usize;
        let mut start = 0usize;
        loop {
            let sep_end = if i < n { separator_at(text, i) } else { None };
            if i == n || sep_end.is_some() {
                pieces.push((start, i));
                if i == n {
                    return Some(pieces);
                }
                let end = sep_end.unwrap_or(i);
                start = end;
                i = end;
            }
            match next_token_end(text, i, self.context) {
                Some(next) => i = next,
                None => return if i == n { Some(pieces) } else { None },
            }
        }
    }

    fn wrapped_in_parens(&self, text: &str) -> bool {
        text.starts_with('(')
            && text.ends_with(')')
            && next_token_end(text, 0, self.context) == Some(text.len())
    }

    /// A quoted-string literal when the target types allow text. `""` inside
    /// is an escaped quote.
    fn quoted_text(&self, types: &[TypeId]) -> Option<String> {
        if !(self.text.starts_with('"') && self.text.ends_with('"') && self.text.len() > 1) {
            return None;
        }
        let text_ty = self.registry.type_named("text");
        let ok = types.iter().any(|&t| t == TypeId::OBJECT || Some(t) == text_ty);
        if !ok {
            return None;
        }
        // The closing quote must actually close the opening one.
        if next_token_end(&self.text, 0, ParseContext::Default) != Some(self.text.len()) {
            return None;
        }
        Some(self.text[1..self.text.len() - 1].replace("\"\"", "\""))
    }

    /// `"not a number"` / `"neither a number, a text nor a boolean"`.
    fn not_of_type(&self, types: &[TypeId]) -> String {
        let article = |name: &str| {
            let an = name.starts_with(['a', 'e', 'i', 'o', 'u']);
            format!("{} {name}", if an { "an" } else { "a" })
        };
        if types.len() == 1 {
            format!("not {}", article(self.registry.type_name(types[0])))
        } else {
            let mut out = String::from("neither ");
            for (k, &t) in types.iter().enumerate() {
                if k > 0 {
                    out.push_str(if k == types.len() - 1 { " nor " } else { ", " });
                }
                out.push_str(&article(self.registry.type_name(t)));
            }
            out
        }
    }
}

/// The matcher's callback: resolve one placeholder's text against its
/// accepted types, enforcing the restriction mask, plurality, and time tags.
impl SlotResolver for Resolver<'_> {
    fn resolve_slot(
        &self,
        input: &str,
        start: usize,
        end: usize,
        info: &PlaceholderInfo,
        log: &mut ParseLog,
    ) -> Option<Rc<dyn Expr>> {
        log.open_scope();
        if (self.flags & info.flag_mask).is_empty() {
            log.discard_error(None);
            return None;
        }
        for &(ty, plural) in &info.types {
            log.clear();
            let sub = Resolver::sub(
                self.registry,
                self.options,
                &input[start..end],
                self.flags & info.flag_mask,
                self.context,
                self.depth + 1,
            );
            let Some(e) = sub.parse_expression(&[ty], log) else { continue };
            if !plural && !e.is_single() {
                let message = if self.context == ParseContext::Command {
                    format!("too many arguments: only a single {} is allowed", self.registry.type_name(ty))
                } else {
                    format!(
                        "'{}<...>{}' can only accept a single {}, not more",
                        &input[..start],
                        &input[end..],
                        self.registry.type_name(ty),
                    )
                };
                log.error(message, ErrorQuality::Semantic);
                log.discard_error(None);
                return None;
            }
            if info.time != 0 {
                if e.is_literal() {
                    log.discard_error(None);
                    return None;
                }
                match e.with_time(info.time) {
                    Some(timed) => {
                        log.commit();
                        return Some(timed);
                    }
                    None => {
                        log.error(
                            format!(
                                "'{}' does not have a {} state",
                                e.describe(),
                                if info.time < 0 { "past" } else { "future" },
                            ),
                            ErrorQuality::Semantic,
                        );
                        log.discard_error(None);
                        return None;
                    }
                }
            }
            log.commit();
            return Some(e);
        }
        log.discard_error(None);
        None
    }
}

/// End position of a list separator starting exactly at `i`, if any.
fn separator_at(text: &str, i: usize) -> Option<usize> {
    let m = regex!(r"(?i)\s*,?\s+(and|n?or)\s+|\s*,\s*").find_at(text, i)?;
    (m.start() == i).then(|| m.end())
}

/// The inner tokens of the unescaped `%...%` pairs of a pattern, in order.
fn placeholder_tokens(pattern: &str) -> Vec<&str> {
    let bytes = pattern.as_bytes();
    let mut out = Vec::new();
    let mut open: Option<usize> = None;
    let mut i = 0;
    while i < pattern.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == b'%' {
            match open {
                None => open = Some(i + 1),
                Some(s) => {
                    out.push(&pattern[s..i]);
                    open = None;
                }
            }
        }
        i += 1;
    }
    out
}
