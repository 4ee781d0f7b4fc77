//! Tree-walking evaluator over JSON value trees
//!
//! Duck-typed where it helps condition authors (missing fields and absent
//! objects read as `null`), strict where silent coercion would hide bugs
//! (boolean operators, comparisons and arithmetic never coerce).

use serde_json::Value;

use super::parser::{BinaryOp, Expr, UnaryOp};
use super::ExprError;
use crate::env::Environment;

pub(crate) fn eval(expr: &Expr, env: &Environment) -> Result<Value, ExprError> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Number(n) => number(*n),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Ident(name) => match env.lookup(name) {
            Some(value) => Ok(value.clone()),
            None => Err(ExprError::Eval(format!("unknown binding `{name}`"))),
        },
        Expr::Member { object, field } => member(eval(object, env)?, field),
        Expr::Index { object, index } => {
            let object = eval(object, env)?;
            let index = eval(index, env)?;
            indexed(object, index)
        }
        Expr::Unary { op, operand } => unary(*op, eval(operand, env)?),
        Expr::Binary { op, left, right } => binary(*op, left, right, env),
    }
}

/// Human-readable type tag for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn member(object: Value, field: &str) -> Result<Value, ExprError> {
    match object {
        // Probing into absent structure reads as null instead of failing,
        // so conditions can test objects that do not exist yet.
        Value::Null => Ok(Value::Null),
        Value::Object(map) => Ok(map.get(field).cloned().unwrap_or(Value::Null)),
        other => Err(ExprError::Eval(format!(
            "cannot access field `{field}` on {}",
            value_kind(&other)
        ))),
    }
}

fn indexed(object: Value, index: Value) -> Result<Value, ExprError> {
    match (object, index) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::Object(map), Value::String(key)) => {
            Ok(map.get(&key).cloned().unwrap_or(Value::Null))
        }
        (Value::Array(items), Value::Number(n)) => {
            let idx = n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .ok_or_else(|| {
                    ExprError::Eval(format!("array index must be a non-negative integer, got {n}"))
                })?;
            Ok(items.get(idx as usize).cloned().unwrap_or(Value::Null))
        }
        (object, index) => Err(ExprError::Eval(format!(
            "cannot index {} with {}",
            value_kind(&object),
            value_kind(&index)
        ))),
    }
}

fn unary(op: UnaryOp, operand: Value) -> Result<Value, ExprError> {
    match (op, operand) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Not, other) => Err(ExprError::Eval(format!(
            "`!` requires a boolean, got {}",
            value_kind(&other)
        ))),
        (UnaryOp::Neg, Value::Number(n)) => {
            let f = n
                .as_f64()
                .ok_or_else(|| ExprError::Eval(format!("cannot negate {n}")))?;
            number(-f)
        }
        (UnaryOp::Neg, other) => Err(ExprError::Eval(format!(
            "`-` requires a number, got {}",
            value_kind(&other)
        ))),
    }
}

fn binary(op: BinaryOp, left: &Expr, right: &Expr, env: &Environment) -> Result<Value, ExprError> {
    // && and || short-circuit: the right operand is not evaluated when the
    // left already decides the result.
    if matches!(op, BinaryOp::And | BinaryOp::Or) {
        let left = require_bool(op, eval(left, env)?)?;
        match (op, left) {
            (BinaryOp::And, false) => return Ok(Value::Bool(false)),
            (BinaryOp::Or, true) => return Ok(Value::Bool(true)),
            _ => {}
        }
        let right = require_bool(op, eval(right, env)?)?;
        return Ok(Value::Bool(right));
    }

    let left = eval(left, env)?;
    let right = eval(right, env)?;

    match op {
        BinaryOp::Eq => Ok(Value::Bool(value_eq(&left, &right))),
        BinaryOp::Ne => Ok(Value::Bool(!value_eq(&left, &right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, left, right),
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            arithmetic(op, left, right)
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

fn require_bool(op: BinaryOp, value: Value) -> Result<bool, ExprError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => {
            let symbol = if op == BinaryOp::And { "&&" } else { "||" };
            Err(ExprError::Eval(format!(
                "`{symbol}` requires boolean operands, got {}",
                value_kind(&other)
            )))
        }
    }
}

/// Deep structural equality with numeric awareness (1 == 1.0). Values of
/// different types are unequal, never an error.
fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| value_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).map(|w| value_eq(v, w)).unwrap_or(false))
        }
        _ => a == b,
    }
}

fn compare(op: BinaryOp, left: Value, right: Value) -> Result<Value, ExprError> {
    let ordering = match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            return Err(ExprError::Eval(format!(
                "cannot compare {} with {}",
                value_kind(&left),
                value_kind(&right)
            )))
        }
    };
    let ordering = ordering.ok_or_else(|| ExprError::Eval("incomparable numbers".into()))?;
    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

fn add(left: Value, right: Value) -> Result<Value, ExprError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => number(a + b),
            _ => Err(ExprError::Eval("incomparable numbers".into())),
        },
        (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        (left, right) => Err(ExprError::Eval(format!(
            "cannot add {} and {}",
            value_kind(&left),
            value_kind(&right)
        ))),
    }
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Result<Value, ExprError> {
    let (a, b) = match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(ExprError::Eval("incomparable numbers".into())),
        },
        _ => {
            let symbol = match op {
                BinaryOp::Sub => "-",
                BinaryOp::Mul => "*",
                BinaryOp::Div => "/",
                _ => "%",
            };
            return Err(ExprError::Eval(format!(
                "`{symbol}` requires numbers, got {} and {}",
                value_kind(&left),
                value_kind(&right)
            )));
        }
    };
    match op {
        BinaryOp::Sub => number(a - b),
        BinaryOp::Mul => number(a * b),
        BinaryOp::Div if b == 0.0 => Err(ExprError::Eval("division by zero".into())),
        BinaryOp::Div => number(a / b),
        BinaryOp::Rem if b == 0.0 => Err(ExprError::Eval("remainder by zero".into())),
        BinaryOp::Rem => number(a % b),
        _ => unreachable!(),
    }
}

fn number(f: f64) -> Result<Value, ExprError> {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| ExprError::Eval("arithmetic produced a non-finite number".into()))
}
