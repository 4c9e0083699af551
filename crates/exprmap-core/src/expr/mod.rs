//! Immutable expression trees.
//!
//! Nodes are reference counted and never mutated. Node identity is pointer
//! identity: the substitution utility and the evaluator key parameters by the
//! node they were created as, never by name.

mod display;
mod equality;
pub mod visit;

use std::fmt;
use std::sync::Arc;

use crate::errors::{MapError, Result};
use crate::mapper::{Mapper, MapperRef};
use crate::operations::Operation;
use crate::types::{FunctionType, Member, Type};
use crate::value::Value;

pub use visit::{walk, walk_lambda, ExprRewriter};

#[derive(Clone)]
pub struct Expr(Arc<ExprNode>);

struct ExprNode {
    kind: ExprKind,
    ty: Type,
}

#[derive(Clone)]
pub enum ExprKind {
    Parameter(Arc<str>),
    Constant(Value),
    /// The default value of the node's type
    Default,
    Member {
        object: Expr,
        member: Member,
    },
    Unary {
        op: UnaryOp,
        operand: Expr,
    },
    Binary {
        op: BinaryOp,
        left: Expr,
        right: Expr,
    },
    Conditional {
        test: Expr,
        if_true: Expr,
        if_false: Expr,
    },
    Call(Call),
    Lambda(Lambda),
    Quote(Lambda),
    MemberInit(MemberInit),
    /// Placeholder resolved by merge into the source assignment's value
    OriginalValue {
        fallback: Option<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Add,
    Subtract,
    Multiply,
    AndAlso,
    OrElse,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
        }
    }

    fn yields_bool(&self) -> bool {
        !matches!(
            self,
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply
        )
    }
}

#[derive(Clone)]
pub struct Call {
    pub operation: Operation,
    pub receiver: Option<Expr>,
    pub arguments: Vec<Expr>,
}

#[derive(Clone)]
pub struct Assignment {
    pub member: Member,
    pub value: Expr,
}

impl Assignment {
    pub fn new(member: Member, value: Expr) -> Self {
        Self { member, value }
    }
}

/// Constructor arguments are named after the members they initialize.
#[derive(Clone)]
pub struct Constructor {
    pub ty: Type,
    pub arguments: Vec<Assignment>,
}

#[derive(Clone)]
pub struct MemberInit {
    pub constructor: Constructor,
    pub assignments: Vec<Assignment>,
}

impl MemberInit {
    pub fn assignment(&self, member: &Member) -> Option<&Assignment> {
        self.assignments.iter().find(|a| &a.member == member)
    }

    fn validate(&self) -> Result<()> {
        if let Some(dup) = first_duplicate(&self.assignments) {
            return Err(MapError::invalid_argument(
                "assignments",
                format!("member `{}` is assigned more than once", dup),
            ));
        }
        if let Some(dup) = first_duplicate(&self.constructor.arguments) {
            return Err(MapError::invalid_argument(
                "constructor",
                format!("constructor argument `{}` is given more than once", dup),
            ));
        }
        Ok(())
    }
}

fn first_duplicate(assignments: &[Assignment]) -> Option<&Member> {
    assignments.iter().enumerate().find_map(|(i, a)| {
        assignments[..i]
            .iter()
            .any(|b| b.member == a.member)
            .then_some(&a.member)
    })
}

/// Builds a construction-with-member-initializers node.
pub struct MemberInitBuilder {
    constructor: Constructor,
    assignments: Vec<Assignment>,
}

impl MemberInitBuilder {
    pub fn arg(mut self, member: Member, value: Expr) -> Self {
        self.constructor.arguments.push(Assignment::new(member, value));
        self
    }

    pub fn assign(mut self, member: Member, value: Expr) -> Self {
        self.assignments.push(Assignment::new(member, value));
        self
    }

    pub fn build(self) -> Result<Expr> {
        Expr::member_init(MemberInit {
            constructor: self.constructor,
            assignments: self.assignments,
        })
    }
}

impl Expr {
    pub(crate) fn from_kind(kind: ExprKind, ty: Type) -> Expr {
        Expr(Arc::new(ExprNode { kind, ty }))
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    /// True when both handles point at the same node.
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn node_id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn parameter(name: &str, ty: Type) -> Expr {
        Expr::from_kind(ExprKind::Parameter(Arc::from(name)), ty)
    }

    pub fn constant(value: Value, ty: Type) -> Expr {
        Expr::from_kind(ExprKind::Constant(value), ty)
    }

    pub fn int(value: i64) -> Expr {
        Expr::constant(Value::Int(value), Type::Int)
    }

    pub fn float(value: f64) -> Expr {
        Expr::constant(Value::Float(value), Type::Float)
    }

    pub fn bool(value: bool) -> Expr {
        Expr::constant(Value::Bool(value), Type::Bool)
    }

    pub fn string(value: &str) -> Expr {
        Expr::constant(Value::String(Arc::from(value)), Type::String)
    }

    pub fn null(ty: Type) -> Expr {
        Expr::constant(Value::Null, ty)
    }

    /// `default(T)` for value types, a typed null otherwise.
    pub fn default_value(ty: &Type) -> Expr {
        if ty.is_value_type() {
            Expr::from_kind(ExprKind::Default, ty.clone())
        } else {
            Expr::null(ty.clone())
        }
    }

    pub fn mapper(mapper: &Mapper) -> Expr {
        Expr::constant(
            Value::Mapper(mapper.clone()),
            Type::mapper(mapper.input_type().clone(), mapper.output_type().clone()),
        )
    }

    pub fn mapper_ref(mapper: &MapperRef) -> Expr {
        Expr::constant(
            Value::MapperRef(mapper.clone()),
            Type::mapper(mapper.input_type().clone(), mapper.output_type().clone()),
        )
    }

    /// A constant holding an unevaluated lambda.
    pub fn expression_constant(lambda: &Lambda) -> Expr {
        Expr::constant(
            Value::Expression(lambda.clone()),
            Type::Quoted(lambda.fn_type().clone()),
        )
    }

    pub fn member(&self, member: &Member) -> Expr {
        Expr::from_kind(
            ExprKind::Member {
                object: self.clone(),
                member: member.clone(),
            },
            member.ty().clone(),
        )
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        let ty = match op {
            UnaryOp::Not => Type::Bool,
            UnaryOp::Negate => operand.ty().clone(),
        };
        Expr::from_kind(ExprKind::Unary { op, operand }, ty)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        let ty = if op.yields_bool() {
            Type::Bool
        } else if *left.ty() == Type::String || *right.ty() == Type::String {
            Type::String
        } else {
            left.ty().clone()
        };
        Expr::from_kind(ExprKind::Binary { op, left, right }, ty)
    }

    pub fn equal(left: Expr, right: Expr) -> Expr {
        Expr::binary(BinaryOp::Equal, left, right)
    }

    pub fn not_equal(left: Expr, right: Expr) -> Expr {
        Expr::binary(BinaryOp::NotEqual, left, right)
    }

    pub fn condition(test: Expr, if_true: Expr, if_false: Expr) -> Expr {
        let ty = if_true.ty().clone();
        Expr::from_kind(
            ExprKind::Conditional {
                test,
                if_true,
                if_false,
            },
            ty,
        )
    }

    /// Builds a call node. The argument count and the presence of a receiver
    /// must match the operation's key.
    pub fn call(
        operation: &Operation,
        receiver: Option<Expr>,
        arguments: Vec<Expr>,
        ty: Type,
    ) -> Result<Expr> {
        let key = operation.key();
        if key.arity != arguments.len() {
            return Err(MapError::invalid_argument(
                "arguments",
                format!(
                    "`{}` takes {} arguments, {} given",
                    key,
                    key.arity,
                    arguments.len()
                ),
            ));
        }
        if key.is_instance != receiver.is_some() {
            return Err(MapError::invalid_argument(
                "receiver",
                format!("receiver presence does not match `{}`", key),
            ));
        }
        Ok(Expr::from_kind(
            ExprKind::Call(Call {
                operation: operation.clone(),
                receiver,
                arguments,
            }),
            ty,
        ))
    }

    pub fn lambda(lambda: Lambda) -> Expr {
        let ty = Type::Function(lambda.fn_type().clone());
        Expr::from_kind(ExprKind::Lambda(lambda), ty)
    }

    pub fn quote(lambda: Lambda) -> Expr {
        let ty = Type::Quoted(lambda.fn_type().clone());
        Expr::from_kind(ExprKind::Quote(lambda), ty)
    }

    pub fn new_object(ty: Type) -> MemberInitBuilder {
        MemberInitBuilder {
            constructor: Constructor {
                ty,
                arguments: Vec::new(),
            },
            assignments: Vec::new(),
        }
    }

    pub fn member_init(init: MemberInit) -> Result<Expr> {
        init.validate()?;
        Ok(Expr::member_init_unchecked(init))
    }

    pub(crate) fn member_init_unchecked(init: MemberInit) -> Expr {
        let ty = init.constructor.ty.clone();
        Expr::from_kind(ExprKind::MemberInit(init), ty)
    }

    /// Refers to the value the merged member had in the source expression.
    pub fn original_value(ty: Type) -> Expr {
        Expr::from_kind(ExprKind::OriginalValue { fallback: None }, ty)
    }

    /// Like [`Expr::original_value`], using `fallback` when the source
    /// expression does not assign the member.
    pub fn original_value_or(fallback: Expr) -> Expr {
        let ty = fallback.ty().clone();
        Expr::from_kind(
            ExprKind::OriginalValue {
                fallback: Some(fallback),
            },
            ty,
        )
    }

    pub fn as_member_init(&self) -> Option<&MemberInit> {
        match self.kind() {
            ExprKind::MemberInit(init) => Some(init),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match self.kind() {
            ExprKind::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_lambda(&self) -> Option<&Lambda> {
        match self.kind() {
            ExprKind::Lambda(lambda) | ExprKind::Quote(lambda) => Some(lambda),
            _ => None,
        }
    }

    pub fn parameter_name(&self) -> Option<&str> {
        match self.kind() {
            ExprKind::Parameter(name) => Some(name),
            _ => None,
        }
    }

    /// Structural equality, treating lambda parameters as bound variables.
    pub fn structurally_eq(&self, other: &Expr) -> bool {
        equality::exprs_equal(self, other)
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({})", self)
    }
}

#[derive(Clone)]
pub struct Lambda(Arc<LambdaNode>);

struct LambdaNode {
    parameters: Vec<Expr>,
    body: Expr,
    ty: FunctionType,
}

impl Lambda {
    pub fn new(parameters: Vec<Expr>, body: Expr) -> Result<Lambda> {
        for (i, param) in parameters.iter().enumerate() {
            if param.parameter_name().is_none() {
                return Err(MapError::invalid_argument(
                    "parameters",
                    format!("`{}` is not a parameter", param),
                ));
            }
            if parameters[..i].iter().any(|p| p.ptr_eq(param)) {
                return Err(MapError::invalid_argument(
                    "parameters",
                    format!("parameter `{}` is declared twice", param),
                ));
            }
        }
        Ok(Lambda::from_parts(parameters, body))
    }

    pub fn unary(parameter: Expr, body: Expr) -> Result<Lambda> {
        Lambda::new(vec![parameter], body)
    }

    pub(crate) fn from_parts(parameters: Vec<Expr>, body: Expr) -> Lambda {
        let ty = FunctionType {
            params: parameters.iter().map(|p| p.ty().clone()).collect(),
            ret: Box::new(body.ty().clone()),
        };
        Lambda(Arc::new(LambdaNode {
            parameters,
            body,
            ty,
        }))
    }

    pub fn parameters(&self) -> &[Expr] {
        &self.0.parameters
    }

    pub fn parameter(&self, index: usize) -> Option<&Expr> {
        self.0.parameters.get(index)
    }

    pub fn body(&self) -> &Expr {
        &self.0.body
    }

    pub fn fn_type(&self) -> &FunctionType {
        &self.0.ty
    }

    pub fn return_type(&self) -> &Type {
        &self.0.ty.ret
    }

    pub fn ptr_eq(&self, other: &Lambda) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn structurally_eq(&self, other: &Lambda) -> bool {
        equality::lambdas_equal(self, other)
    }

    pub fn to_expr(&self) -> Expr {
        Expr::lambda(self.clone())
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lambda({})", self)
    }
}
