//! The stock expression shapes the resolver assembles: plain literals,
//! comma/and/or lists, `{variable}` references, function calls, and the
//! runtime-converted wrapper used when a produced type only narrows to the
//! requested one at runtime.

use std::rc::Rc;

use crate::engine::registry::FunctionDecl;
use crate::{Condition, Expr, Run, RunError, TypeId, Value};

// --- Literals ---------------------------------------------------------------

/// A compile-time-constant expression.
pub struct SimpleLiteral {
    values: Vec<Value>,
    ty: TypeId,
    and: bool,
}

impl SimpleLiteral {
    pub fn single(value: Value, ty: TypeId) -> Self {
        SimpleLiteral { values: vec![value], ty, and: true }
    }

    pub fn many(values: Vec<Value>, ty: TypeId, and: bool) -> Self {
        SimpleLiteral { values, ty, and }
    }
}

impl Expr for SimpleLiteral {
    fn eval(&self, _run: &mut Run<'_>) -> Result<Vec<Value>, RunError> {
        Ok(self.values.clone())
    }

    fn is_single(&self) -> bool {
        self.values.len() <= 1
    }

    fn return_type(&self) -> TypeId {
        self.ty
    }

    fn is_literal(&self) -> bool {
        true
    }

    fn constant(&self) -> Option<Vec<Value>> {
        Some(self.values.clone())
    }

    fn and(&self) -> bool {
        self.and
    }

    fn describe(&self) -> String {
        self.values.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    }
}

/// A list of literals; itself a literal. Element type is the narrowest common
/// supertype of the members, computed by the resolver.
pub struct LiteralList {
    items: Vec<Rc<dyn Expr>>,
    ty: TypeId,
    and: bool,
}

impl LiteralList {
    pub fn new(items: Vec<Rc<dyn Expr>>, ty: TypeId, and: bool) -> Self {
        LiteralList { items, ty, and }
    }
}

impl Expr for LiteralList {
    fn eval(&self, run: &mut Run<'_>) -> Result<Vec<Value>, RunError> {
        let mut out = Vec::with_capacity(self.items.len());
        for item in &self.items {
            out.extend(item.eval(run)?);
        }
        Ok(out)
    }

    fn is_single(&self) -> bool {
        false
    }

    fn return_type(&self) -> TypeId {
        self.ty
    }

    fn is_literal(&self) -> bool {
        true
    }

    fn constant(&self) -> Option<Vec<Value>> {
        let mut out = Vec::with_capacity(self.items.len());
        for item in &self.items {
            out.extend(item.constant()?);
        }
        Some(out)
    }

    fn and(&self) -> bool {
        self.and
    }

    fn items(&self) -> Option<&[Rc<dyn Expr>]> {
        Some(&self.items)
    }

    fn describe(&self) -> String {
        describe_list(&self.items, self.and)
    }
}

/// A list with at least one non-literal member.
pub struct ExpressionList {
    items: Vec<Rc<dyn Expr>>,
    ty: TypeId,
    and: bool,
}

impl ExpressionList {
    pub fn new(items: Vec<Rc<dyn Expr>>, ty: TypeId, and: bool) -> Self {
        ExpressionList { items, ty, and }
    }
}

impl Expr for ExpressionList {
    fn eval(&self, run: &mut Run<'_>) -> Result<Vec<Value>, RunError> {
        let mut out = Vec::with_capacity(self.items.len());
        for item in &self.items {
            out.extend(item.eval(run)?);
        }
        Ok(out)
    }

    fn is_single(&self) -> bool {
        false
    }

    fn return_type(&self) -> TypeId {
        self.ty
    }

    fn and(&self) -> bool {
        self.and
    }

    fn items(&self) -> Option<&[Rc<dyn Expr>]> {
        Some(&self.items)
    }

    fn describe(&self) -> String {
        describe_list(&self.items, self.and)
    }
}

fn describe_list(items: &[Rc<dyn Expr>], and: bool) -> String {
    let sep = if and { " and " } else { " or " };
    items.iter().map(|e| e.describe()).collect::<Vec<_>>().join(sep)
}

// --- Variables --------------------------------------------------------------

/// A `{name}` reference into the variable store. Unset variables produce no
/// values, matching how optional data behaves everywhere else.
pub struct Variable {
    name: String,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Variable { name: name.into() }
    }
}

impl Expr for Variable {
    fn eval(&self, run: &mut Run<'_>) -> Result<Vec<Value>, RunError> {
        Ok(run.vars.get(&self.name).cloned().into_iter().collect())
    }

    fn is_single(&self) -> bool {
        true
    }

    fn return_type(&self) -> TypeId {
        TypeId::OBJECT
    }

    fn describe(&self) -> String {
        format!("{{{}}}", self.name)
    }
}

// --- Function calls ---------------------------------------------------------

/// A resolved `name(args)` call. The declaration is resolved and validated at
/// parse time; `eval` only evaluates arguments and invokes the body.
pub struct FunctionRef {
    func: Rc<FunctionDecl>,
    args: Vec<Rc<dyn Expr>>,
}

impl FunctionRef {
    pub(crate) fn new(func: Rc<FunctionDecl>, args: Vec<Rc<dyn Expr>>) -> Self {
        FunctionRef { func, args }
    }
}

impl Expr for FunctionRef {
    fn eval(&self, run: &mut Run<'_>) -> Result<Vec<Value>, RunError> {
        let mut evaluated = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            evaluated.push(arg.eval(run)?);
        }
        (self.func.body)(&evaluated, run)
    }

    fn is_single(&self) -> bool {
        self.func.single
    }

    fn return_type(&self) -> TypeId {
        self.func.return_type
    }

    fn describe(&self) -> String {
        format!("{}({})", self.func.name, self.args.iter().map(|a| a.describe()).collect::<Vec<_>>().join(", "))
    }
}

// --- Runtime conversion -----------------------------------------------------

/// Narrows another expression to a target type at runtime by dropping values
/// the target's checker rejects.
pub struct ConvertedExpr {
    inner: Rc<dyn Expr>,
    target: TypeId,
    checker: fn(&Value) -> bool,
}

impl ConvertedExpr {
    pub(crate) fn new(inner: Rc<dyn Expr>, target: TypeId, checker: fn(&Value) -> bool) -> Self {
        ConvertedExpr { inner, target, checker }
    }
}

impl Expr for ConvertedExpr {
    fn eval(&self, run: &mut Run<'_>) -> Result<Vec<Value>, RunError> {
        let mut values = self.inner.eval(run)?;
        values.retain(|v| (self.checker)(v));
        Ok(values)
    }

    fn is_single(&self) -> bool {
        self.inner.is_single()
    }

    fn return_type(&self) -> TypeId {
        self.target
    }

    fn is_literal(&self) -> bool {
        self.inner.is_literal()
    }

    fn constant(&self) -> Option<Vec<Value>> {
        let mut values = self.inner.constant()?;
        values.retain(|v| (self.checker)(v));
        Some(values)
    }

    fn and(&self) -> bool {
        self.inner.and()
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

// --- Boolean bridging -------------------------------------------------------

/// Wraps a boolean-typed expression as a [`Condition`]. A conjunctive
/// multi-valued expression must be all-true; a disjunctive one any-true.
/// No values at all counts as false.
pub struct ExprCondition {
    expr: Rc<dyn Expr>,
}

impl ExprCondition {
    pub fn new(expr: Rc<dyn Expr>) -> Self {
        ExprCondition { expr }
    }
}

impl Condition for ExprCondition {
    fn check(&self, run: &mut Run<'_>) -> Result<bool, RunError> {
        let values = self.expr.eval(run)?;
        if values.is_empty() {
            return Ok(false);
        }
        let truth = |v: &Value| matches!(v, Value::Bool(true));
        Ok(if self.expr.and() { values.iter().all(truth) } else { values.iter().any(truth) })
    }

    fn describe(&self) -> String {
        self.expr.describe()
    }
}
