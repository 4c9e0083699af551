//! Compiles expression trees into closures.
//!
//! Compilation walks the tree once and produces a closure per node. Parameters
//! are looked up by node identity in a chain of environment frames, so
//! shadowed or alpha-renamed parameters never collide.

use std::fmt;
use std::sync::Arc;

use crate::errors::{MapError, Result};
use crate::expr::{BinaryOp, Expr, ExprKind, Lambda, UnaryOp};
use crate::value::{Object, Value};

type Eval = Arc<dyn Fn(&Env) -> Result<Value> + Send + Sync>;

#[derive(Clone, Default)]
struct Env(Option<Arc<Frame>>);

struct Frame {
    bindings: Vec<(usize, Value)>,
    parent: Env,
}

impl Env {
    fn lookup(&self, id: usize) -> Option<&Value> {
        let mut current = self.0.as_deref();
        while let Some(frame) = current {
            if let Some((_, value)) = frame.bindings.iter().find(|(k, _)| *k == id) {
                return Some(value);
            }
            current = frame.parent.0.as_deref();
        }
        None
    }

    fn extend(&self, bindings: Vec<(usize, Value)>) -> Env {
        Env(Some(Arc::new(Frame {
            bindings,
            parent: self.clone(),
        })))
    }
}

#[derive(Clone)]
pub struct CompiledLambda {
    lambda: Lambda,
    parameter_ids: Arc<[usize]>,
    body: Eval,
}

impl CompiledLambda {
    pub fn new(lambda: &Lambda) -> Self {
        Self {
            lambda: lambda.clone(),
            parameter_ids: lambda.parameters().iter().map(Expr::node_id).collect(),
            body: compile_expr(lambda.body()),
        }
    }

    pub fn lambda(&self) -> &Lambda {
        &self.lambda
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        self.invoke_in(&Env::default(), args)
    }

    fn invoke_in(&self, env: &Env, args: &[Value]) -> Result<Value> {
        if args.len() != self.parameter_ids.len() {
            return Err(MapError::invalid_argument(
                "args",
                format!(
                    "expected {} arguments, {} given",
                    self.parameter_ids.len(),
                    args.len()
                ),
            ));
        }
        let bindings = self
            .parameter_ids
            .iter()
            .copied()
            .zip(args.iter().cloned())
            .collect();
        (self.body)(&env.extend(bindings))
    }
}

/// A lambda closed over the environment it was evaluated in.
#[derive(Clone)]
pub struct Function {
    compiled: CompiledLambda,
    env: Env,
    quoted: bool,
}

impl Function {
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        self.compiled.invoke_in(&self.env, args)
    }

    pub fn lambda(&self) -> &Lambda {
        self.compiled.lambda()
    }

    /// True when the function came from a quoted lambda.
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.compiled.body, &other.compiled.body)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.lambda())
    }
}

/// Evaluates a closed expression with no parameters in scope.
pub fn evaluate(expr: &Expr) -> Result<Value> {
    compile_expr(expr)(&Env::default())
}

fn compile_expr(expr: &Expr) -> Eval {
    match expr.kind() {
        ExprKind::Parameter(name) => {
            let id = expr.node_id();
            let name = name.to_string();
            Arc::new(move |env| {
                env.lookup(id)
                    .cloned()
                    .ok_or_else(|| MapError::UnboundParameter { name: name.clone() })
            })
        }
        ExprKind::Constant(value) => {
            let value = value.clone();
            Arc::new(move |_| Ok(value.clone()))
        }
        ExprKind::Default => {
            let value = Value::default_for(expr.ty());
            Arc::new(move |_| Ok(value.clone()))
        }
        ExprKind::Member { object, member } => {
            let object = compile_expr(object);
            let name = member.name().to_string();
            Arc::new(move |env| {
                let target = object(env)?;
                let value = target.field(&name)?.clone();
                Ok(value)
            })
        }
        ExprKind::Unary { op, operand } => {
            let operand = compile_expr(operand);
            let op = *op;
            Arc::new(move |env| match (op, operand(env)?) {
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnaryOp::Negate, Value::Int(i)) => Ok(Value::Int(-i)),
                (UnaryOp::Negate, Value::Float(x)) => Ok(Value::Float(-x)),
                (_, other) => Err(MapError::type_mismatch(
                    "unary operator",
                    "bool or number",
                    other.type_name(),
                )),
            })
        }
        ExprKind::Binary { op, left, right } => compile_binary(*op, left, right),
        ExprKind::Conditional {
            test,
            if_true,
            if_false,
        } => {
            let test = compile_expr(test);
            let if_true = compile_expr(if_true);
            let if_false = compile_expr(if_false);
            Arc::new(move |env| match test(env)? {
                Value::Bool(true) => if_true(env),
                Value::Bool(false) => if_false(env),
                other => Err(MapError::type_mismatch(
                    "conditional",
                    "bool",
                    other.type_name(),
                )),
            })
        }
        ExprKind::Call(call) => {
            let operation = call.operation.clone();
            let operands: Vec<Eval> = call
                .receiver
                .iter()
                .chain(call.arguments.iter())
                .map(compile_expr)
                .collect();
            Arc::new(move |env| {
                let values = operands
                    .iter()
                    .map(|operand| operand(env))
                    .collect::<Result<Vec<_>>>()?;
                operation.invoke(&values)
            })
        }
        ExprKind::Lambda(lambda) => compile_closure(lambda, false),
        ExprKind::Quote(lambda) => compile_closure(lambda, true),
        ExprKind::MemberInit(init) => {
            let type_name = init.constructor.ty.to_string();
            let fields: Vec<(String, Eval)> = init
                .constructor
                .arguments
                .iter()
                .chain(init.assignments.iter())
                .map(|a| (a.member.name().to_string(), compile_expr(&a.value)))
                .collect();
            Arc::new(move |env| {
                let mut object = Object::new(&type_name);
                for (name, value) in &fields {
                    object.set(name, value(env)?);
                }
                Ok(object.into_value())
            })
        }
        ExprKind::OriginalValue { .. } => Arc::new(|_| Err(MapError::OriginalValueOutsideMerge)),
    }
}

fn compile_closure(lambda: &Lambda, quoted: bool) -> Eval {
    let compiled = CompiledLambda::new(lambda);
    Arc::new(move |env| {
        Ok(Value::Function(Function {
            compiled: compiled.clone(),
            env: env.clone(),
            quoted,
        }))
    })
}

fn compile_binary(op: BinaryOp, left: &Expr, right: &Expr) -> Eval {
    let left = compile_expr(left);
    let right = compile_expr(right);
    match op {
        BinaryOp::AndAlso => Arc::new(move |env| match left(env)? {
            Value::Bool(false) => Ok(Value::Bool(false)),
            Value::Bool(true) => right(env),
            other => Err(MapError::type_mismatch("&&", "bool", other.type_name())),
        }),
        BinaryOp::OrElse => Arc::new(move |env| match left(env)? {
            Value::Bool(true) => Ok(Value::Bool(true)),
            Value::Bool(false) => right(env),
            other => Err(MapError::type_mismatch("||", "bool", other.type_name())),
        }),
        _ => Arc::new(move |env| apply_binary(op, left(env)?, right(env)?)),
    }
}

fn apply_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    use std::cmp::Ordering;

    let ordering = |l: &Value, r: &Value| -> Result<Ordering> {
        match (l, r) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a
                .partial_cmp(b)
                .ok_or_else(|| MapError::type_mismatch(op.symbol(), "comparable", "NaN")),
            (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            (a, _) => Err(MapError::type_mismatch(
                op.symbol(),
                "comparable",
                a.type_name(),
            )),
        }
    };

    match op {
        BinaryOp::Equal => Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
        BinaryOp::LessThan => Ok(Value::Bool(ordering(&left, &right)?.is_lt())),
        BinaryOp::LessThanOrEqual => Ok(Value::Bool(ordering(&left, &right)?.is_le())),
        BinaryOp::GreaterThan => Ok(Value::Bool(ordering(&left, &right)?.is_gt())),
        BinaryOp::GreaterThanOrEqual => Ok(Value::Bool(ordering(&left, &right)?.is_ge())),
        BinaryOp::Add => match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(b))),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (l @ Value::String(_), r) | (l, r @ Value::String(_)) => {
                Ok(Value::string(&format!("{}{}", concat_text(&l), concat_text(&r))))
            }
            (l, _) => Err(MapError::type_mismatch("+", "number or string", l.type_name())),
        },
        BinaryOp::Subtract => match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_sub(b))),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a - b)),
            (l, _) => Err(MapError::type_mismatch("-", "number", l.type_name())),
        },
        BinaryOp::Multiply => match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(b))),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a * b)),
            (l, _) => Err(MapError::type_mismatch("*", "number", l.type_name())),
        },
        BinaryOp::AndAlso | BinaryOp::OrElse => match (left, right) {
            (Value::Bool(a), Value::Bool(b)) if op == BinaryOp::AndAlso => Ok(Value::Bool(a && b)),
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a || b)),
            (l, _) => Err(MapError::type_mismatch(op.symbol(), "bool", l.type_name())),
        },
    }
}

/// Null concatenates as the empty string.
fn concat_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Member, Type};

    fn cat_name() -> Member {
        Member::new("Cat", "Name", Type::String)
    }

    #[test]
    fn test_member_access_and_concat() {
        let x = Expr::parameter("x", Type::object("Cat"));
        let body = Expr::binary(BinaryOp::Add, x.member(&cat_name()), Expr::string(" meow!"));
        let compiled = CompiledLambda::new(&Lambda::unary(x, body).unwrap());
        let cat = Object::new("Cat").with("Name", Value::string("Tom")).into_value();
        assert_eq!(compiled.invoke(&[cat]).unwrap(), Value::string("Tom meow!"));
    }

    #[test]
    fn test_member_access_on_null_fails() {
        let x = Expr::parameter("x", Type::object("Cat"));
        let compiled = CompiledLambda::new(&Lambda::unary(x.clone(), x.member(&cat_name())).unwrap());
        assert!(matches!(
            compiled.invoke(&[Value::Null]),
            Err(MapError::NullReference { .. })
        ));
    }

    #[test]
    fn test_conditional_short_circuits_null() {
        let x = Expr::parameter("x", Type::object("Cat"));
        let body = Expr::condition(
            Expr::equal(x.clone(), Expr::null(Type::object("Cat"))),
            Expr::null(Type::String),
            x.member(&cat_name()),
        );
        let compiled = CompiledLambda::new(&Lambda::unary(x, body).unwrap());
        assert_eq!(compiled.invoke(&[Value::Null]).unwrap(), Value::Null);
    }

    #[test]
    fn test_inner_lambda_captures_outer_parameter() {
        let x = Expr::parameter("x", Type::Int);
        let y = Expr::parameter("y", Type::Int);
        let inner = Lambda::unary(y.clone(), Expr::binary(BinaryOp::Add, x.clone(), y)).unwrap();
        let outer = CompiledLambda::new(&Lambda::unary(x, Expr::lambda(inner)).unwrap());
        let function = match outer.invoke(&[Value::Int(40)]).unwrap() {
            Value::Function(function) => function,
            other => panic!("expected function, got {}", other),
        };
        assert!(!function.is_quoted());
        assert_eq!(function.call(&[Value::Int(2)]).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_original_value_cannot_be_evaluated() {
        let result = evaluate(&Expr::original_value(Type::Int));
        assert!(matches!(result, Err(MapError::OriginalValueOutsideMerge)));
    }

    #[test]
    fn test_unbound_parameter() {
        let result = evaluate(&Expr::parameter("ghost", Type::Int));
        assert!(matches!(result, Err(MapError::UnboundParameter { .. })));
    }
}
