//! The pattern mini-language and its recursive backtracking matcher.
//!
//! A pattern is a plain string: literal words, `[optional]` parts,
//! `(choice|groups)` whose alternatives may carry an `N¦` mark, inline
//! `<regex>` elements, and `%type%` placeholders. Patterns are not
//! precompiled; every attempt re-walks the string, recursing over
//! `(pattern position, input position)`.
//!
//! Matching never fails loudly: a branch that cannot match returns `None`,
//! recording what it learned through the [`ParseLog`] scope it ran in.
//! Malformed patterns are a registration-time concern ([`validate_pattern`]);
//! the matcher itself treats them as simple non-matches.
//!
//! Placeholder boundaries are unknown in advance, so the matcher tries every
//! reachable token boundary of the input — skipping quoted strings,
//! `{variable}` braces, and parenthesized groups as atomic units — and, once
//! the rest of the pattern matches, hands the placeholder text to the
//! resolver through the [`SlotResolver`] seam. That keeps this module
//! self-contained and testable with a stub.

use std::rc::Rc;

use regex::Regex;
use thiserror::Error;

use super::diagnostics::ParseLog;
use super::registry::Registry;
use super::resolver::{ParseContext, ParseFlags};
use crate::{Expr, TypeId};

// --- Pattern-definition faults ----------------------------------------------

/// A fault in a pattern string itself: a collaborator bug, detected when the
/// producer registers. The offending pattern is dropped; everything else
/// keeps loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("missing closing bracket '{0}'")]
    UnclosedGroup(char),
    #[error("unexpected closing bracket '{0}'")]
    UnexpectedClosing(char),
    #[error("the pipe character '|' may only be used inside a choice group; escape it to match a literal pipe")]
    PipeOutsideGroup,
    #[error("missing closing regex bracket '>'")]
    UnclosedRegex,
    #[error("invalid regex <{pattern}>: {message}")]
    InvalidRegex { pattern: String, message: String },
    #[error("odd number of '%': a placeholder is not closed")]
    UnclosedPlaceholder,
    #[error("a pattern must not end in an unescaped backslash")]
    TrailingBackslash,
    #[error("unknown type '{0}' in placeholder")]
    UnknownType(String),
    #[error("invalid time tag in placeholder '%{0}%'")]
    BadTimeTag(String),
}

// --- Match results ----------------------------------------------------------

/// Captured groups of one `<regex>` element, in pattern order. Group 0 is the
/// whole matched region.
#[derive(Debug, Clone)]
pub struct RegexCapture {
    groups: Vec<Option<String>>,
}

impl RegexCapture {
    fn from_captures(caps: &regex::Captures<'_>) -> Self {
        RegexCapture { groups: caps.iter().map(|m| m.map(|m| m.as_str().to_string())).collect() }
    }

    pub fn group(&self, i: usize) -> Option<&str> {
        self.groups.get(i).and_then(|g| g.as_deref())
    }

    /// The whole matched region.
    pub fn whole(&self) -> &str {
        self.group(0).unwrap_or("")
    }
}

/// One successful structural match: a slot per `%placeholder%` (`None` only
/// when an optional placeholder was omitted), the XOR-combined mark, and the
/// `<regex>` captures.
pub struct MatchOutcome {
    pub exprs: Vec<Option<Rc<dyn Expr>>>,
    pub mark: i32,
    pub captures: Vec<RegexCapture>,
}

impl MatchOutcome {
    fn with_slots(slots: usize) -> Self {
        MatchOutcome { exprs: vec![None; slots], mark: 0, captures: Vec::new() }
    }
}

// --- Placeholder metadata ---------------------------------------------------

/// Everything a `%...%` token declares: accepted types with plural flags, the
/// `-` optional marker, the `*`/`~` restriction mask, and the `@N` time tag.
#[derive(Debug, Clone)]
pub(crate) struct PlaceholderInfo {
    pub types: Vec<(TypeId, bool)>,
    pub optional: bool,
    pub flag_mask: ParseFlags,
    pub time: i8,
}

impl PlaceholderInfo {
    pub(crate) fn parse(token: &str, registry: &Registry) -> Result<Self, PatternError> {
        let mut s = token;
        let mut optional = false;
        let mut flag_mask = ParseFlags::all();
        if let Some(rest) = s.strip_prefix('-') {
            optional = true;
            s = rest;
        }
        if let Some(rest) = s.strip_prefix('*') {
            s = rest;
            flag_mask.remove(ParseFlags::EXPRESSIONS);
        } else if let Some(rest) = s.strip_prefix('~') {
            s = rest;
            flag_mask.remove(ParseFlags::LITERALS);
        }
        if !optional {
            if let Some(rest) = s.strip_prefix('-') {
                optional = true;
                s = rest;
            }
        }
        let mut time = 0i8;
        if let Some(at) = s.find('@') {
            time = s[at + 1..].parse().map_err(|_| PatternError::BadTimeTag(token.to_string()))?;
            s = &s[..at];
        }
        let mut types = Vec::new();
        for name in s.split('/') {
            match registry.type_by_user_name(name) {
                Some(found) => types.push(found),
                None => return Err(PatternError::UnknownType(name.to_string())),
            }
        }
        Ok(PlaceholderInfo { types, optional, flag_mask, time })
    }
}

// --- The resolver seam ------------------------------------------------------

/// Resolves the text of one placeholder into a typed expression. Implemented
/// by the syntax resolver; tests use a stub.
///
/// The implementation opens and closes its own log scope: on success it
/// commits, on failure it discards with its best error.
pub(crate) trait SlotResolver {
    fn resolve_slot(
        &self,
        input: &str,
        start: usize,
        end: usize,
        info: &PlaceholderInfo,
        log: &mut ParseLog,
    ) -> Option<Rc<dyn Expr>>;
}

pub(crate) struct MatchCtx<'a> {
    pub pattern: &'a str,
    pub input: &'a str,
    pub parse_ctx: ParseContext,
    pub registry: &'a Registry,
    pub slots: &'a dyn SlotResolver,
}

/// Matches `ctx.pattern` against the whole of `ctx.input`.
pub(crate) fn match_pattern(ctx: &MatchCtx<'_>, log: &mut ParseLog) -> Option<MatchOutcome> {
    match_from(ctx, 0, 0, log)
}

fn match_from(ctx: &MatchCtx<'_>, mut ppos: usize, mut spos: usize, log: &mut ParseLog) -> Option<MatchOutcome> {
    let pattern = ctx.pattern;
    let input = ctx.input;

    while ppos < pattern.len() {
        let c = char_at(pattern, ppos)?;
        match c {
            '[' => {
                // Greedy: first try with the optional part present.
                log.open_scope();
                if let Some(res) = match_from(ctx, ppos + 1, spos, log) {
                    log.commit();
                    return Some(res);
                }
                log.clear();
                let close = match next_bracket(pattern, ']', '[', ppos + 1) {
                    Ok(i) => i,
                    Err(_) => {
                        log.discard();
                        return None;
                    }
                };
                let res = match_from(ctx, close + 1, spos, log);
                if res.is_some() {
                    log.commit();
                } else {
                    log.discard_error(None);
                }
                return res;
            }
            '(' => {
                return match_choice(ctx, ppos, spos, log);
            }
            '%' => {
                return match_placeholder(ctx, ppos, spos, log);
            }
            '<' => {
                return match_regex(ctx, ppos, spos, log);
            }
            ']' | ')' => {
                ppos += 1;
            }
            '|' => {
                match next_bracket(pattern, ')', '(', ppos + 1) {
                    // Inside a group: this alternative matched up to the pipe,
                    // so continue after the group.
                    Ok(close) => ppos = close + 1,
                    // A pipe outside any group alternates the whole pattern.
                    Err(_) => {
                        if spos == input.len() {
                            ppos = pattern.len();
                        } else {
                            spos = 0;
                            ppos += 1;
                        }
                    }
                }
            }
            ' ' => {
                // A pattern space is already satisfied at the input edges and
                // right after a consumed space; otherwise it must consume
                // exactly one input space.
                if spos == 0 || spos == input.len() || input[..spos].ends_with(' ') {
                    ppos += 1;
                } else if !input[spos..].starts_with(' ') {
                    return None;
                } else {
                    spos += 1;
                    ppos += 1;
                }
            }
            '\\' => {
                ppos += 1;
                if ppos == pattern.len() {
                    return None;
                }
                let pc = char_at(pattern, ppos)?;
                let ic = char_at(input, spos)?;
                if !chars_eq_ignore_case(pc, ic) {
                    return None;
                }
                ppos += pc.len_utf8();
                spos += ic.len_utf8();
            }
            _ => {
                if spos == input.len() {
                    return None;
                }
                let ic = char_at(input, spos)?;
                if !chars_eq_ignore_case(c, ic) {
                    return None;
                }
                ppos += c.len_utf8();
                spos += ic.len_utf8();
            }
        }
    }

    if spos == input.len() {
        Some(MatchOutcome::with_slots(count_unescaped(pattern, '%', 0, pattern.len()) / 2))
    } else {
        None
    }
}

/// `(a|b|c)`: alternatives in order, each optionally prefixed `N¦`. The mark
/// of the alternative ultimately used is XORed into the result on unwind, so
/// nested groups combine by XOR. Failure downstream backtracks into the next
/// alternative.
fn match_choice(ctx: &MatchCtx<'_>, start: usize, spos: usize, log: &mut ParseLog) -> Option<MatchOutcome> {
    let pattern = ctx.pattern;
    log.open_scope();
    let mut i = start;
    while i < pattern.len() {
        let c = match char_at(pattern, i) {
            Some(c) => c,
            None => break,
        };
        if i == start || c == '|' {
            log.clear();
            let mut mark = 0i32;
            let mut body = i + c.len_utf8();
            if let Some(nc) = char_at(pattern, body) {
                if nc.is_ascii_digit() || nc == '-' {
                    if let Some(rel) = pattern[body..].find('¦') {
                        let bar = body + rel;
                        if let Ok(m) = pattern[body..bar].parse::<i32>() {
                            mark = m;
                            i = bar;
                            body = bar + '¦'.len_utf8();
                        }
                    }
                }
            }
            if let Some(mut res) = match_from(ctx, body, spos, log) {
                log.commit();
                res.mark ^= mark;
                return Some(res);
            }
        } else if c == '(' {
            // A nested group belongs to the current alternative; skip it while
            // scanning for the next pipe.
            i = match next_bracket(pattern, ')', '(', i + 1) {
                Ok(close) => close,
                Err(_) => break,
            };
        } else if c == ')' {
            break;
        } else if c == '\\' {
            i += 1;
        }
        i += char_at(pattern, i).map_or(1, char::len_utf8);
    }
    log.discard_error(None);
    None
}

/// `%type%`: try every reachable token boundary as the end of the
/// placeholder; for each, first require the rest of the pattern to match,
/// then resolve the placeholder text itself.
fn match_placeholder(ctx: &MatchCtx<'_>, ppos: usize, spos: usize, log: &mut ParseLog) -> Option<MatchOutcome> {
    let pattern = ctx.pattern;
    let input = ctx.input;
    if spos == input.len() {
        return None;
    }
    let close = ppos + 1 + pattern[ppos + 1..].find('%')?;
    let info = PlaceholderInfo::parse(&pattern[ppos + 1..close], ctx.registry).ok()?;
    let slot = count_unescaped(pattern, '%', 0, ppos) / 2;
    let rest = close + 1;

    log.open_scope();
    let mut boundary =
        if rest == pattern.len() { Some(input.len()) } else { next_token_end(input, spos, ctx.parse_ctx) };
    while let Some(b) = boundary {
        log.clear();
        if let Some(mut res) = match_from(ctx, rest, b, log) {
            return match ctx.slots.resolve_slot(input, spos, b, &info, log) {
                Some(expr) => {
                    log.commit();
                    res.exprs[slot] = Some(expr);
                    Some(res)
                }
                None => {
                    log.discard_error(None);
                    None
                }
            };
        }
        boundary = next_token_end(input, b, ctx.parse_ctx);
    }
    log.discard_error(None);
    None
}

/// `<regex>`: the inline expression must match the input region ending at
/// some reachable boundary, with the rest of the pattern matching from there.
fn match_regex(ctx: &MatchCtx<'_>, ppos: usize, spos: usize, log: &mut ParseLog) -> Option<MatchOutcome> {
    let pattern = ctx.pattern;
    let input = ctx.input;
    let close = ppos + 1 + pattern[ppos + 1..].find('>')?;
    // Anchored so the region must match entirely; group numbering is kept.
    let re = Regex::new(&format!("^(?:{})$", &pattern[ppos + 1..close])).ok()?;
    let rest = close + 1;

    log.open_scope();
    let mut boundary = next_token_end(input, spos, ctx.parse_ctx);
    while let Some(b) = boundary {
        log.clear();
        if let Some(caps) = re.captures(&input[spos..b]) {
            if let Some(mut res) = match_from(ctx, rest, b, log) {
                res.captures.insert(0, RegexCapture::from_captures(&caps));
                log.commit();
                return Some(res);
            }
        }
        boundary = next_token_end(input, b, ctx.parse_ctx);
    }
    log.discard_error(None);
    None
}

// --- Boundaries and scanning helpers ----------------------------------------

/// The next token boundary after `i`, skipping quoted strings, `{variable}`
/// braces, and parenthesized groups as atomic units. In command context every
/// character is a boundary. `None` on unbalanced input or at the end.
pub(crate) fn next_token_end(expr: &str, i: usize, ctx: ParseContext) -> Option<usize> {
    if i >= expr.len() {
        return None;
    }
    let c = char_at(expr, i)?;
    if ctx == ParseContext::Command {
        return Some(i + c.len_utf8());
    }
    match c {
        '"' => next_quote(expr, i + 1).map(|q| q + 1),
        '{' => next_var_bracket(expr, i + 1).map(|q| q + 1),
        '(' => {
            let mut j = i + 1;
            loop {
                if j >= expr.len() {
                    return None;
                }
                if expr[j..].starts_with(')') {
                    return Some(j + 1);
                }
                j = next_token_end(expr, j, ctx)?;
            }
        }
        _ => Some(i + c.len_utf8()),
    }
}

/// Index of the closing quote, starting after the opening one. `""` is an
/// escaped quote and does not close the string.
fn next_quote(s: &str, from: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = from;
    while i < s.len() {
        if bytes[i] == b'"' {
            if i == s.len() - 1 || bytes[i + 1] != b'"' {
                return Some(i);
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    None
}

/// Index of the `}` closing a variable opened just before `from`, allowing
/// nested braces.
fn next_var_bracket(s: &str, from: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = from;
    while i < s.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the unescaped `closing` bracket matching the group we are inside
/// of (so `start` must be past the opening bracket).
pub(crate) fn next_bracket(pattern: &str, closing: char, opening: char, start: usize) -> Result<usize, PatternError> {
    let bytes = pattern.as_bytes();
    let mut level = 0usize;
    let mut i = start;
    while i < pattern.len() {
        let b = bytes[i];
        if b == b'\\' {
            i += 1;
        } else if b == closing as u8 {
            if level == 0 {
                return Ok(i);
            }
            level -= 1;
        } else if b == opening as u8 {
            level += 1;
        }
        i += 1;
    }
    Err(PatternError::UnclosedGroup(closing))
}

/// Unescaped occurrences of the ASCII character `c` in `s[start..end]`.
pub(crate) fn count_unescaped(s: &str, c: char, start: usize, end: usize) -> usize {
    let bytes = s.as_bytes();
    let mut n = 0;
    let mut i = start;
    while i < end {
        if bytes[i] == b'\\' {
            i += 2;
        } else {
            if bytes[i] == c as u8 {
                n += 1;
            }
            i += 1;
        }
    }
    n
}

fn char_at(s: &str, i: usize) -> Option<char> {
    s.get(i..).and_then(|r| r.chars().next())
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

// --- Registration-time validation -------------------------------------------

/// Checks a pattern string for definition faults: unbalanced or misnested
/// brackets, a pipe outside a choice group, an invalid inline regex, an
/// unclosed placeholder, an unknown placeholder type, a trailing unescaped
/// backslash.
pub(crate) fn validate_pattern(pattern: &str, registry: &Registry) -> Result<(), PatternError> {
    let mut groups: Vec<char> = Vec::new();
    let mut i = 0;
    while i < pattern.len() {
        let c = char_at(pattern, i).ok_or(PatternError::TrailingBackslash)?;
        match c {
            '(' | '[' => groups.push(c),
            ')' => {
                if groups.pop() != Some('(') {
                    return Err(PatternError::UnexpectedClosing(')'));
                }
            }
            ']' => {
                if groups.pop() != Some('[') {
                    return Err(PatternError::UnexpectedClosing(']'));
                }
            }
            '|' => {
                if groups.last() != Some(&'(') {
                    return Err(PatternError::PipeOutsideGroup);
                }
            }
            '<' => {
                let close = pattern[i + 1..].find('>').ok_or(PatternError::UnclosedRegex)?;
                let inner = &pattern[i + 1..i + 1 + close];
                if let Err(e) = Regex::new(inner) {
                    return Err(PatternError::InvalidRegex { pattern: inner.to_string(), message: e.to_string() });
                }
                i += 1 + close;
            }
            '>' => return Err(PatternError::UnexpectedClosing('>')),
            '%' => {
                let close = pattern[i + 1..].find('%').ok_or(PatternError::UnclosedPlaceholder)?;
                PlaceholderInfo::parse(&pattern[i + 1..i + 1 + close], registry)?;
                i += 1 + close;
            }
            '\\' => {
                if i + 1 >= pattern.len() {
                    return Err(PatternError::TrailingBackslash);
                }
                i += 1;
            }
            _ => {}
        }
        i += char_at(pattern, i).map_or(1, char::len_utf8);
    }
    if let Some(open) = groups.pop() {
        return Err(PatternError::UnclosedGroup(if open == '(' { ')' } else { ']' }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::SimpleLiteral;
    use crate::{Value, engine::Registry};

    /// Stub resolver: accepts any placeholder text as a text literal.
    struct AcceptAll;

    impl SlotResolver for AcceptAll {
        fn resolve_slot(
            &self,
            input: &str,
            start: usize,
            end: usize,
            _info: &PlaceholderInfo,
            log: &mut ParseLog,
        ) -> Option<Rc<dyn Expr>> {
            log.open_scope();
            log.commit();
            Some(Rc::new(SimpleLiteral::single(Value::Text(input[start..end].to_string()), TypeId::OBJECT)))
        }
    }

    fn try_match(pattern: &str, input: &str) -> Option<MatchOutcome> {
        let registry = Registry::new();
        let mut log = ParseLog::new();
        let ctx =
            MatchCtx { pattern, input, parse_ctx: ParseContext::Default, registry: &registry, slots: &AcceptAll };
        let res = match_pattern(&ctx, &mut log);
        assert_eq!(log.depth(), 0, "unbalanced log scopes for pattern '{pattern}'");
        res
    }

    fn slot_texts(res: &MatchOutcome) -> Vec<String> {
        res.exprs.iter().map(|e| e.as_ref().map(|e| e.describe()).unwrap_or_default()).collect()
    }

    #[test]
    fn literal_matching_is_case_insensitive() {
        assert!(try_match("spawn the guardian", "Spawn THE Guardian").is_some());
        assert!(try_match("spawn the guardian", "spawn the warden").is_none());
    }

    #[test]
    fn optional_group() {
        assert!(try_match("a [b] c", "a c").is_some());
        assert!(try_match("a [b] c", "a b c").is_some());
        assert!(try_match("a [b] c", "a  b").is_none());
        assert!(try_match("a [b] c", "ac").is_none());
    }

    #[test]
    fn spaces_at_edges_and_doubles_are_elided() {
        assert!(try_match(" leading", "leading").is_some());
        assert!(try_match("trailing ", "trailing").is_some());
        assert!(try_match("a [b ]c", "a c").is_some());
        assert!(try_match("a [b ]c", "a b c").is_some());
    }

    #[test]
    fn choice_marks() {
        let res = try_match("(1¦x|2¦y)", "x").unwrap();
        assert_eq!(res.mark, 1);
        let res = try_match("(1¦x|2¦y)", "y").unwrap();
        assert_eq!(res.mark, 2);
        assert!(try_match("(1¦x|2¦y)", "z").is_none());
    }

    #[test]
    fn marks_combine_by_xor() {
        let res = try_match("(1¦a|b) (2¦c|d)", "a c").unwrap();
        assert_eq!(res.mark, 3);
        let res = try_match("(1¦a|b) (2¦c|d)", "b c").unwrap();
        assert_eq!(res.mark, 2);
        let res = try_match("(1¦a|b) (2¦c|d)", "a d").unwrap();
        assert_eq!(res.mark, 1);
    }

    #[test]
    fn negative_mark_is_accepted() {
        let res = try_match("(-1¦off|on)", "off").unwrap();
        assert_eq!(res.mark, -1);
    }

    #[test]
    fn choice_backtracks_on_downstream_failure() {
        // "a" matches first but the rest then fails; the matcher must retry
        // with the second alternative rather than give up.
        let res = try_match("(a|ab) c", "ab c");
        assert!(res.is_some());
    }

    #[test]
    fn unmarked_single_choice_group_is_plain_grouping() {
        let res = try_match("[(1¦if)] x", "if x").unwrap();
        assert_eq!(res.mark, 1);
        let res = try_match("[(1¦if)] x", "x").unwrap();
        assert_eq!(res.mark, 0);
    }

    #[test]
    fn regex_element_captures() {
        let res = try_match("wait <(\\d+)> rounds", "wait 15 rounds").unwrap();
        assert_eq!(res.captures.len(), 1);
        assert_eq!(res.captures[0].whole(), "15");
        assert_eq!(res.captures[0].group(1), Some("15"));
    }

    #[test]
    fn escapes_match_literally() {
        assert!(try_match("\\[tag\\]", "[tag]").is_some());
        assert!(try_match("100\\%", "100%").is_some());
        assert!(try_match("100\\%", "100").is_none());
    }

    #[test]
    fn placeholder_boundaries() {
        let res = try_match("give %object% to %object%", "give sword to player").unwrap();
        assert_eq!(slot_texts(&res), vec!["sword", "player"]);
    }

    #[test]
    fn placeholder_consumes_atomic_units() {
        let res = try_match("say %object% to %object%", "say \"x to y\" to crowd").unwrap();
        assert_eq!(slot_texts(&res), vec!["\"x to y\"", "crowd"]);
    }

    #[test]
    fn matching_is_deterministic() {
        for _ in 0..3 {
            let res = try_match("(1¦big|2¦small) %object% [really]", "big slime really").unwrap();
            assert_eq!(res.mark, 1);
            assert_eq!(slot_texts(&res), vec!["slime"]);
        }
    }

    #[test]
    fn token_boundaries_skip_atomic_units() {
        let ctx = ParseContext::Default;
        assert_eq!(next_token_end("\"a b\" c", 0, ctx), Some(5));
        assert_eq!(next_token_end("{var with spaces} x", 0, ctx), Some(17));
        assert_eq!(next_token_end("(1 and 2) x", 0, ctx), Some(9));
        assert_eq!(next_token_end("plain", 0, ctx), Some(1));
        assert_eq!(next_token_end("x", 1, ctx), None);
        // unbalanced input has no boundary
        assert_eq!(next_token_end("\"open", 0, ctx), None);
    }

    #[test]
    fn command_context_treats_every_char_as_boundary() {
        assert_eq!(next_token_end("\"a b\"", 0, ParseContext::Command), Some(1));
        assert_eq!(next_token_end("(x)", 0, ParseContext::Command), Some(1));
    }

    #[test]
    fn quote_escape_with_doubled_quotes() {
        assert_eq!(next_token_end("\"he said \"\"hi\"\"\" x", 0, ParseContext::Default), Some(16));
    }

    #[test]
    fn validation_accepts_registered_shapes() {
        let registry = Registry::new();
        let good = [
            "stop",
            "a [b] c",
            "(1¦if)",
            "else if <.+>",
            "loop %objects%",
            "wait %timespan%",
            "set {_x} to %object%",
            "100\\% done",
            "%-number% [of %*text%]",
        ];
        for pattern in good {
            assert!(validate_pattern(pattern, &registry).is_ok(), "rejected: {pattern}");
        }
    }

    #[test]
    fn validation_rejects_definition_faults() {
        let registry = Registry::new();
        let cases: Vec<(&str, PatternError)> = vec![
            ("a [b c", PatternError::UnclosedGroup(']')),
            ("a (b|c", PatternError::UnclosedGroup(')')),
            ("a b] c", PatternError::UnexpectedClosing(']')),
            ("a | b", PatternError::PipeOutsideGroup),
            ("[x | y]", PatternError::PipeOutsideGroup),
            ("a <(unclosed", PatternError::UnclosedRegex),
            ("a %number", PatternError::UnclosedPlaceholder),
            ("a %gizmo%", PatternError::UnknownType("gizmo".to_string())),
            ("a %number@x%", PatternError::BadTimeTag("number@x".to_string())),
            ("ends in\\", PatternError::TrailingBackslash),
        ];
        for (pattern, want) in cases {
            assert_eq!(validate_pattern(pattern, &registry), Err(want), "pattern: {pattern}");
        }
        assert!(matches!(
            validate_pattern("a <[bad> b", &registry),
            Err(PatternError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn placeholder_info_modifiers() {
        let registry = Registry::new();
        let info = PlaceholderInfo::parse("-numbers/text@-1", &registry).unwrap();
        assert!(info.optional);
        assert_eq!(info.time, -1);
        assert_eq!(info.types.len(), 2);
        assert!(info.types[0].1, "numbers should be plural");
        assert!(!info.types[1].1);
        assert_eq!(info.flag_mask, ParseFlags::all());

        let info = PlaceholderInfo::parse("*text", &registry).unwrap();
        assert_eq!(info.flag_mask, ParseFlags::LITERALS);
        let info = PlaceholderInfo::parse("~number", &registry).unwrap();
        assert_eq!(info.flag_mask, ParseFlags::EXPRESSIONS);
        let info = PlaceholderInfo::parse("*-text", &registry).unwrap();
        assert!(info.optional);
    }
}
