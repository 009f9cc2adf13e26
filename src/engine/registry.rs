//! The producer, type, and function registries.
//!
//! A registry is an explicit value owned by the hosting application, built
//! once per collaborator load and read-only afterwards; nothing in the engine
//! reaches for process-wide state. Producers are stored per kind (effects,
//! conditions, sections, events, expressions) and resolved in
//! priority-bucket-then-registration order — never by match quality.
//!
//! Registration validates every pattern string up front. A malformed pattern
//! is a collaborator bug: that one pattern is dropped with a warning and the
//! rest of the producer keeps loading.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::warn;

use super::diagnostics::{ErrorQuality, ParseLog};
use super::matcher::{RegexCapture, validate_pattern};
use super::resolver::{ParseContext, ParseFlags, Resolver};
use super::trigger::SectionBody;
use crate::api::Options;
use crate::types::{TypeInfo, core_types, strip_plural};
use crate::{Condition, Effect, EventSpec, Expr, Run, RunError, TypeId, Value};

// --- Priority buckets -------------------------------------------------------

/// Coarse candidate ordering. All producers of one bucket are tried, in
/// registration order, before any producer of a later bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bucket {
    /// A fixed phrase with little room for ambiguity.
    Simple,
    /// Combines other expressions and needs placeholder search.
    Combined,
    /// A `property of %owner%` shape.
    Property,
    /// Matches almost anything; tried last.
    CatchAll,
}

// --- Producer entries -------------------------------------------------------

type Factory<T> = Box<dyn Fn(&mut InitCtx<'_>) -> Option<T>>;

/// One registered producer: a display name, its ordered pattern array, the
/// declared return type (meaningful for expressions), a priority bucket, and
/// the factory invoked on a structural match.
pub(crate) struct ProducerInfo<T> {
    pub name: String,
    pub patterns: Vec<String>,
    pub return_type: TypeId,
    pub bucket: Bucket,
    pub factory: Factory<T>,
}

/// What a factory sees: the resolved sub-expressions (slot per placeholder),
/// which pattern of the producer matched, the XOR-combined mark, and the
/// inline regex captures. The factory may reject the match by returning
/// `None`; resolution then continues with the next candidate.
pub struct InitCtx<'a> {
    pub exprs: &'a [Option<Rc<dyn Expr>>],
    pub pattern_index: usize,
    pub mark: i32,
    pub captures: &'a [RegexCapture],
    pub(crate) registry: &'a Registry,
    pub(crate) log: &'a mut ParseLog,
    pub(crate) options: &'a Options,
    pub(crate) parse_ctx: ParseContext,
    pub(crate) depth: usize,
}

impl InitCtx<'_> {
    /// The resolved expression in the given slot, if present.
    pub fn expr(&self, slot: usize) -> Option<Rc<dyn Expr>> {
        self.exprs.get(slot).cloned().flatten()
    }

    pub fn capture(&self, i: usize) -> Option<&RegexCapture> {
        self.captures.get(i)
    }

    pub fn error(&mut self, message: impl Into<String>, quality: ErrorQuality) {
        self.log.error(message, quality);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.log.warning(message);
    }

    /// Parses `text` as a condition, for factories that receive raw condition
    /// text through a regex capture.
    pub fn parse_condition(&mut self, text: &str, default_error: Option<&str>) -> Option<Box<dyn Condition>> {
        Resolver::sub(self.registry, self.options, text, ParseFlags::all(), self.parse_ctx, self.depth + 1)
            .parse_condition(default_error, self.log)
    }

    /// Parses `text` as an expression of the given types.
    pub fn parse_expression(&mut self, text: &str, types: &[TypeId]) -> Option<Rc<dyn Expr>> {
        Resolver::sub(self.registry, self.options, text, ParseFlags::all(), self.parse_ctx, self.depth + 1)
            .parse_expression(types, self.log)
    }
}

// --- Functions --------------------------------------------------------------

pub struct ParamDecl {
    pub name: String,
    pub ty: TypeId,
    pub single: bool,
}

type FunctionBody = Box<dyn Fn(&[Vec<Value>], &mut Run<'_>) -> Result<Vec<Value>, RunError>>;

/// A callable `name(args)` declaration. Arity and parameter types are checked
/// when a call is resolved, not when it runs.
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub return_type: TypeId,
    pub single: bool,
    pub(crate) body: FunctionBody,
}

impl FunctionDecl {
    pub fn new(
        name: &str,
        params: Vec<(&str, TypeId, bool)>,
        return_type: TypeId,
        single: bool,
        body: impl Fn(&[Vec<Value>], &mut Run<'_>) -> Result<Vec<Value>, RunError> + 'static,
    ) -> Self {
        FunctionDecl {
            name: name.to_string(),
            params: params
                .into_iter()
                .map(|(n, ty, single)| ParamDecl { name: n.to_string(), ty, single })
                .collect(),
            return_type,
            single,
            body: Box::new(body),
        }
    }
}

// --- The registry -----------------------------------------------------------

pub struct Registry {
    types: Vec<TypeInfo>,
    pub(crate) effects: Vec<ProducerInfo<Box<dyn Effect>>>,
    pub(crate) conditions: Vec<ProducerInfo<Box<dyn Condition>>>,
    pub(crate) sections: Vec<ProducerInfo<Box<dyn SectionBody>>>,
    pub(crate) events: Vec<ProducerInfo<Box<dyn EventSpec>>>,
    pub(crate) expressions: Vec<ProducerInfo<Rc<dyn Expr>>>,
    functions: HashMap<String, Rc<FunctionDecl>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry holding the core types and nothing else.
    pub fn new() -> Self {
        Registry {
            types: core_types(),
            effects: Vec::new(),
            conditions: Vec::new(),
            sections: Vec::new(),
            events: Vec::new(),
            expressions: Vec::new(),
            functions: HashMap::new(),
        }
    }

    /// A registry with the built-in sections and statements registered.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        crate::sections::register_builtins(&mut registry);
        registry
    }

    // --- Types ---

    pub fn register_type(&mut self, info: TypeInfo) -> TypeId {
        self.types.push(info);
        TypeId(self.types.len() - 1)
    }

    /// Looks a user-entered type name up, in singular or plural form.
    pub fn type_by_user_name(&self, name: &str) -> Option<(TypeId, bool)> {
        let name = name.trim();
        if let Some(id) = self.find_type(name) {
            return Some((id, false));
        }
        let (singular, plural) = strip_plural(name);
        if plural {
            if let Some(id) = self.find_type(&singular) {
                return Some((id, true));
            }
        }
        None
    }

    /// Looks a type up by its internal name.
    pub fn type_named(&self, code_name: &str) -> Option<TypeId> {
        self.types.iter().position(|t| t.code_name == code_name).map(TypeId)
    }

    fn find_type(&self, name: &str) -> Option<TypeId> {
        self.types
            .iter()
            .position(|t| t.user_names.iter().any(|n| n.eq_ignore_ascii_case(name)))
            .map(TypeId)
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        &self.types[id.0].code_name
    }

    pub(crate) fn checker(&self, id: TypeId) -> fn(&Value) -> bool {
        self.types[id.0].checker
    }

    pub(crate) fn literal_parser(&self, id: TypeId) -> Option<&(dyn Fn(&str, ParseContext) -> Option<Value>)> {
        self.types[id.0].literal_parser.as_deref()
    }

    pub(crate) fn default_value(&self, id: TypeId) -> Option<Rc<dyn Expr>> {
        self.types[id.0].default_value.as_ref().map(|p| p())
    }

    pub(crate) fn all_type_ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.types.len()).map(TypeId)
    }

    /// Whether a value of type `sub` can stand where `sup` is expected.
    pub fn is_assignable(&self, sub: TypeId, sup: TypeId) -> bool {
        let mut cur = Some(sub);
        while let Some(id) = cur {
            if id == sup {
                return true;
            }
            cur = self.types[id.0].parent;
        }
        false
    }

    /// Whether the two types share a line of the hierarchy, i.e. a runtime
    /// narrowing from one to the other can ever succeed.
    pub(crate) fn is_related(&self, a: TypeId, b: TypeId) -> bool {
        self.is_assignable(a, b) || self.is_assignable(b, a)
    }

    /// The narrowest type every given type is assignable to.
    pub(crate) fn common_supertype(&self, ids: &[TypeId]) -> TypeId {
        let mut common = match ids.first() {
            Some(id) => *id,
            None => return TypeId::OBJECT,
        };
        for &id in &ids[1..] {
            while !self.is_assignable(id, common) {
                common = self.types[common.0].parent.unwrap_or(TypeId::OBJECT);
            }
        }
        common
    }

    // --- Producers ---

    pub fn register_effect(
        &mut self,
        name: &str,
        patterns: Vec<String>,
        factory: impl Fn(&mut InitCtx<'_>) -> Option<Box<dyn Effect>> + 'static,
    ) {
        if let Some(info) = self.producer(name, patterns, TypeId::OBJECT, Bucket::Simple, Box::new(factory)) {
            self.effects.push(info);
        }
    }

    pub fn register_condition(
        &mut self,
        name: &str,
        patterns: Vec<String>,
        factory: impl Fn(&mut InitCtx<'_>) -> Option<Box<dyn Condition>> + 'static,
    ) {
        if let Some(info) = self.producer(name, patterns, TypeId::OBJECT, Bucket::Simple, Box::new(factory)) {
            self.conditions.push(info);
        }
    }

    pub fn register_section(
        &mut self,
        name: &str,
        patterns: Vec<String>,
        factory: impl Fn(&mut InitCtx<'_>) -> Option<Box<dyn SectionBody>> + 'static,
    ) {
        if let Some(info) = self.producer(name, patterns, TypeId::OBJECT, Bucket::Simple, Box::new(factory)) {
            self.sections.push(info);
        }
    }

    pub fn register_event(
        &mut self,
        name: &str,
        patterns: Vec<String>,
        factory: impl Fn(&mut InitCtx<'_>) -> Option<Box<dyn EventSpec>> + 'static,
    ) {
        if let Some(info) = self.producer(name, patterns, TypeId::OBJECT, Bucket::Simple, Box::new(factory)) {
            self.events.push(info);
        }
    }

    pub fn register_expression(
        &mut self,
        name: &str,
        return_type: TypeId,
        bucket: Bucket,
        patterns: Vec<String>,
        factory: impl Fn(&mut InitCtx<'_>) -> Option<Rc<dyn Expr>> + 'static,
    ) {
        if let Some(info) = self.producer(name, patterns, return_type, bucket, Box::new(factory)) {
            self.expressions.push(info);
            // Stable: registration order is preserved within a bucket.
            self.expressions.sort_by_key(|p| p.bucket);
        }
    }

    /// Expression producers whose declared return type could satisfy one of
    /// the requested types, in bucket-then-registration order.
    pub(crate) fn expressions_for<'a>(
        &'a self,
        types: &'a [TypeId],
    ) -> impl Iterator<Item = &'a ProducerInfo<Rc<dyn Expr>>> + 'a {
        self.expressions.iter().filter(move |p| {
            types.iter().any(|&t| t == TypeId::OBJECT || self.is_related(p.return_type, t))
        })
    }

    fn producer<T>(
        &self,
        name: &str,
        patterns: Vec<String>,
        return_type: TypeId,
        bucket: Bucket,
        factory: Factory<T>,
    ) -> Option<ProducerInfo<T>> {
        let mut kept = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            match validate_pattern(&pattern, self) {
                Ok(()) => kept.push(pattern),
                Err(e) => warn!(producer = name, pattern = %pattern, error = %e, "dropping invalid pattern"),
            }
        }
        if kept.is_empty() {
            warn!(producer = name, "no valid patterns left; dropping producer");
            return None;
        }
        Some(ProducerInfo { name: name.to_string(), patterns: kept, return_type, bucket, factory })
    }

    // --- Functions ---

    pub fn register_function(&mut self, decl: FunctionDecl) {
        self.functions.insert(decl.name.to_ascii_lowercase(), Rc::new(decl));
    }

    pub(crate) fn function(&self, name: &str) -> Option<Rc<FunctionDecl>> {
        self.functions.get(&name.to_ascii_lowercase()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_lookup_handles_plurals() {
        let registry = Registry::new();
        let (number, plural) = registry.type_by_user_name("number").unwrap();
        assert!(!plural);
        let (also_number, plural) = registry.type_by_user_name("numbers").unwrap();
        assert!(plural);
        assert_eq!(number, also_number);
        assert!(registry.type_by_user_name("gadget").is_none());
    }

    #[test]
    fn assignability_follows_the_hierarchy() {
        let mut registry = Registry::new();
        let number = registry.type_named("number").unwrap();
        let text = registry.type_named("text").unwrap();
        let whole =
            registry.register_type(TypeInfo::new("whole number", &["whole number"], Some(number), |v| {
                matches!(v, Value::Num(n) if n.fract() == 0.0)
            }));

        assert!(registry.is_assignable(whole, number));
        assert!(registry.is_assignable(number, TypeId::OBJECT));
        assert!(!registry.is_assignable(number, whole));
        assert!(registry.is_related(number, whole));
        assert!(!registry.is_related(number, text));

        assert_eq!(registry.common_supertype(&[whole, number]), number);
        assert_eq!(registry.common_supertype(&[number, text]), TypeId::OBJECT);
        assert_eq!(registry.common_supertype(&[whole, whole]), whole);
    }

    #[test]
    fn invalid_patterns_are_dropped_not_fatal() {
        let mut registry = Registry::new();
        registry.register_effect("broken-and-fine", vec!["good %number%".into(), "bad [oops".into()], |_| None);
        assert_eq!(registry.effects.len(), 1);
        assert_eq!(registry.effects[0].patterns, vec!["good %number%".to_string()]);

        registry.register_effect("all-bad", vec!["][".into()], |_| None);
        assert_eq!(registry.effects.len(), 1, "a producer with no valid patterns is dropped");
    }

    #[test]
    fn expressions_keep_bucket_then_registration_order() {
        let mut registry = Registry::new();
        let number = registry.type_named("number").unwrap();
        registry.register_expression("late-simple", number, Bucket::Simple, vec!["beta".into()], |_| None);
        registry.register_expression("catch-all", number, Bucket::CatchAll, vec!["<.+>".into()], |_| None);
        registry.register_expression("early-simple", number, Bucket::Simple, vec!["alpha".into()], |_| None);

        let types = [number];
        let names: Vec<&str> =
            registry.expressions_for(&types).map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["late-simple", "early-simple", "catch-all"]);
    }
}
