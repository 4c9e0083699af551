use std::fmt;

use super::{Assignment, Expr, ExprKind, Lambda, UnaryOp};

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Parameter(name) => write!(f, "{}", name),
            ExprKind::Constant(value) => write!(f, "{}", value),
            ExprKind::Default => write!(f, "default({})", self.ty()),
            ExprKind::Member { object, member } => write!(f, "{}.{}", object, member.name()),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "!{}", operand),
                UnaryOp::Negate => write!(f, "-{}", operand),
            },
            ExprKind::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            ExprKind::Conditional {
                test,
                if_true,
                if_false,
            } => write!(f, "({} ? {} : {})", test, if_true, if_false),
            ExprKind::Call(call) => {
                let key = call.operation.key();
                match &call.receiver {
                    Some(receiver) => write!(f, "{}.{}(", receiver, key.name)?,
                    None => write!(f, "{}.{}(", key.declaring_type, key.name)?,
                }
                write_list(f, &call.arguments)?;
                write!(f, ")")
            }
            ExprKind::Lambda(lambda) | ExprKind::Quote(lambda) => write!(f, "{}", lambda),
            ExprKind::MemberInit(init) => {
                write!(f, "new {}", init.constructor.ty)?;
                if !init.constructor.arguments.is_empty() {
                    write!(f, "(")?;
                    for (i, arg) in init.constructor.arguments.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}: {}", arg.member.name(), arg.value)?;
                    }
                    write!(f, ")")?;
                }
                write_assignments(f, &init.assignments)
            }
            ExprKind::OriginalValue { fallback } => match fallback {
                Some(fallback) => write!(f, "OriginalValue({})", fallback),
                None => write!(f, "OriginalValue<{}>()", self.ty()),
            },
        }
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parameters() {
            [single] => write!(f, "{}", single)?,
            params => {
                write!(f, "(")?;
                write_list(f, params)?;
                write!(f, ")")?;
            }
        }
        write!(f, " => {}", self.body())
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, exprs: &[Expr]) -> fmt::Result {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", expr)?;
    }
    Ok(())
}

fn write_assignments(f: &mut fmt::Formatter<'_>, assignments: &[Assignment]) -> fmt::Result {
    if assignments.is_empty() {
        return Ok(());
    }
    write!(f, " {{ ")?;
    for (i, assignment) in assignments.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{} = {}", assignment.member.name(), assignment.value)?;
    }
    write!(f, " }}")
}
