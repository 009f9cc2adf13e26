//! User-facing types of the dialect.
//!
//! A [`TypeInfo`] is what a `%type%` placeholder names: it carries the
//! user-facing spellings (looked up in singular or plural form), an optional
//! parent type forming a single-inheritance hierarchy rooted at `object`, a
//! checker deciding whether a runtime [`Value`] belongs to the type, an
//! optional literal-text parser, and an optional default-value provider used
//! when an omitted optional placeholder needs a substitute.

use std::rc::Rc;

use chrono::Duration;

use crate::{Expr, ParseContext, Value};

/// Index into the registry's type table. The `object` root type is always
/// registered first and has id 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    pub const OBJECT: TypeId = TypeId(0);
}

type LiteralParser = Box<dyn Fn(&str, ParseContext) -> Option<Value>>;
type DefaultProvider = Box<dyn Fn() -> Rc<dyn Expr>>;

/// One entry of the type registry.
pub struct TypeInfo {
    /// Internal name, used in messages.
    pub code_name: String,
    /// User-facing singular spellings; plural forms are derived.
    pub user_names: Vec<String>,
    pub parent: Option<TypeId>,
    pub checker: fn(&Value) -> bool,
    pub literal_parser: Option<LiteralParser>,
    pub default_value: Option<DefaultProvider>,
}

impl TypeInfo {
    pub fn new(code_name: &str, user_names: &[&str], parent: Option<TypeId>, checker: fn(&Value) -> bool) -> Self {
        TypeInfo {
            code_name: code_name.to_string(),
            user_names: user_names.iter().map(|s| s.to_string()).collect(),
            parent,
            checker,
            literal_parser: None,
            default_value: None,
        }
    }

    pub fn with_parser(mut self, parser: impl Fn(&str, ParseContext) -> Option<Value> + 'static) -> Self {
        self.literal_parser = Some(Box::new(parser));
        self
    }

    pub fn with_default(mut self, provider: impl Fn() -> Rc<dyn Expr> + 'static) -> Self {
        self.default_value = Some(Box::new(provider));
        self
    }
}

// --- Plural handling --------------------------------------------------------

/// Irregular singular/plural spellings that the suffix rules below get wrong.
const PLURAL_PAIRS: &[(&str, &str)] = &[
    ("axe", "axes"),
    ("child", "children"),
    ("die", "dice"),
    ("foot", "feet"),
    ("life", "lives"),
    ("man", "men"),
    ("person", "people"),
    ("tooth", "teeth"),
    ("wolf", "wolves"),
];

/// Splits a user-entered type name into its singular form and a plural flag.
///
/// `"players"` becomes `("player", true)`; `"berries"` becomes
/// `("berry", true)`; a singular spelling passes through unchanged.
pub(crate) fn strip_plural(name: &str) -> (String, bool) {
    for (singular, plural) in PLURAL_PAIRS {
        if name.eq_ignore_ascii_case(plural) {
            return ((*singular).to_string(), true);
        }
        if name.eq_ignore_ascii_case(singular) {
            return ((*singular).to_string(), false);
        }
    }
    if let Some(stem) = name.strip_suffix("ies") {
        if !stem.is_empty() {
            return (format!("{stem}y"), true);
        }
    }
    if let Some(stem) = name.strip_suffix("es") {
        // "boxes" -> "box", but "times" must not become "tim".
        if stem.ends_with('x') || stem.ends_with("ch") || stem.ends_with("sh") || stem.ends_with('s') {
            return (stem.to_string(), true);
        }
    }
    if let Some(stem) = name.strip_suffix('s') {
        if !stem.is_empty() && !stem.ends_with('s') {
            return (stem.to_string(), true);
        }
    }
    (name.to_string(), false)
}

// --- Built-in types ---------------------------------------------------------

/// The core type set every registry starts with: `object` (the root),
/// `boolean`, `number`, `text`, `timespan`.
pub(crate) fn core_types() -> Vec<TypeInfo> {
    vec![
        TypeInfo::new("object", &["object"], None, |_| true),
        TypeInfo::new("boolean", &["boolean"], Some(TypeId::OBJECT), |v| matches!(v, Value::Bool(_)))
            .with_parser(|s, _| parse_boolean(s)),
        TypeInfo::new("number", &["number"], Some(TypeId::OBJECT), |v| matches!(v, Value::Num(_)))
            .with_parser(|s, _| s.parse::<f64>().ok().filter(|n| n.is_finite()).map(Value::Num)),
        TypeInfo::new("text", &["text", "string"], Some(TypeId::OBJECT), |v| matches!(v, Value::Text(_))),
        TypeInfo::new("timespan", &["timespan"], Some(TypeId::OBJECT), |v| matches!(v, Value::Span(_)))
            .with_parser(|s, _| parse_timespan(s)),
    ]
}

fn parse_boolean(s: &str) -> Option<Value> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Some(Value::Bool(true)),
        "false" | "no" | "off" => Some(Value::Bool(false)),
        _ => None,
    }
}

/// Parses `"5 seconds"`, `"1 minute"`, `"0.5 hours"` and the other duration
/// spellings into a [`chrono::Duration`].
fn parse_timespan(s: &str) -> Option<Value> {
    let caps = regex!(r"(?i)^(\d+(?:\.\d+)?)\s+(tick|second|minute|hour|day)s?$").captures(s.trim())?;
    let amount: f64 = caps[1].parse().ok()?;
    let millis_per_unit = match caps[2].to_ascii_lowercase().as_str() {
        "tick" => 50.0,
        "second" => 1_000.0,
        "minute" => 60_000.0,
        "hour" => 3_600_000.0,
        "day" => 86_400_000.0,
        _ => return None,
    };
    Some(Value::Span(Duration::milliseconds((amount * millis_per_unit) as i64)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plural_forms() {
        let cases: Vec<(&str, &str, bool)> = vec![
            ("player", "player", false),
            ("players", "player", true),
            ("berries", "berry", true),
            ("boxes", "box", true),
            ("wolves", "wolf", true),
            ("people", "person", true),
            ("glass", "glass", false),
            ("timespan", "timespan", false),
        ];
        for (input, singular, plural) in cases {
            let (s, p) = strip_plural(input);
            assert_eq!((s.as_str(), p), (singular, plural), "input: {input}");
        }
    }

    #[test]
    fn timespan_literals() {
        let cases: Vec<(&str, i64)> = vec![
            ("5 seconds", 5_000),
            ("1 second", 1_000),
            ("2 minutes", 120_000),
            ("0.5 hours", 1_800_000),
            ("3 ticks", 150),
            ("1 day", 86_400_000),
        ];
        for (input, millis) in cases {
            match parse_timespan(input) {
                Some(Value::Span(d)) => assert_eq!(d.num_milliseconds(), millis, "input: {input}"),
                other => panic!("'{input}' parsed to {other:?}"),
            }
        }
        assert_eq!(parse_timespan("five seconds"), None);
        assert_eq!(parse_timespan("5"), None);
    }

    #[test]
    fn boolean_literals() {
        assert_eq!(parse_boolean("yes"), Some(Value::Bool(true)));
        assert_eq!(parse_boolean("Off"), Some(Value::Bool(false)));
        assert_eq!(parse_boolean("maybe"), None);
    }
}
