//! Evaluation of assertion expression trees against a candidate value.

use std::cmp::Ordering;

use serde_json::Value;

use super::ast::{BinaryOp, Builtin, CompareOp, Expr, Function, LogicalOp};
use super::ExpressionError;
use crate::value::{compare, loose_eq, truthy, Num, ValueKind};

/// Evaluate `expr` with [`Expr::Param`] bound to `param`.
pub fn evaluate(expr: &Expr, param: &Value) -> Result<Value, ExpressionError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Param => Ok(param.clone()),
        Expr::List(items) => items
            .iter()
            .map(|item| evaluate(item, param))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Negate(operand) => negate(&evaluate(operand, param)?),
        Expr::Not(operand) => Ok(Value::Bool(!truthy(&evaluate(operand, param)?))),
        Expr::Logical { op, left, right } => {
            let left = evaluate(left, param)?;
            let decided = match op {
                LogicalOp::And => !truthy(&left),
                LogicalOp::Or => truthy(&left),
            };
            if decided {
                Ok(left)
            } else {
                evaluate(right, param)
            }
        }
        Expr::Binary { op, left, right } => {
            arithmetic(*op, &evaluate(left, param)?, &evaluate(right, param)?)
        }
        Expr::Compare { first, rest } => {
            let mut left = evaluate(first, param)?;
            for (op, right) in rest {
                let right = evaluate(right, param)?;
                if !compare_pair(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        Expr::Index { object, index } => index_into(&evaluate(object, param)?, &evaluate(index, param)?),
        Expr::Call { function, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, param))
                .collect::<Result<Vec<_>, _>>()?;
            call(function, &args)
        }
        Expr::Matches { subject, pattern } => match evaluate(subject, param)? {
            Value::String(s) => Ok(Value::Bool(pattern.is_match(&s))),
            other => Err(type_error("matches", "text", &other)),
        },
    }
}

fn type_error(context: &str, expected: &str, found: &Value) -> ExpressionError {
    ExpressionError::Type(format!(
        "{context} expects {expected}, found {}",
        ValueKind::of(found)
    ))
}

fn number(value: Num) -> Result<Value, ExpressionError> {
    value
        .into_value()
        .ok_or_else(|| ExpressionError::Type("arithmetic produced a non-finite number".to_string()))
}

fn negate(value: &Value) -> Result<Value, ExpressionError> {
    match Num::of(value) {
        Some(Num::Int(i)) => match i.checked_neg() {
            Some(n) => number(Num::Int(n)),
            None => number(Num::Float(-(i as f64))),
        },
        Some(Num::Float(f)) => number(Num::Float(-f)),
        None => Err(type_error("-", "a number", value)),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExpressionError> {
    if op == BinaryOp::Add {
        match (left, right) {
            (Value::String(a), Value::String(b)) => return Ok(Value::String(format!("{a}{b}"))),
            (Value::Array(a), Value::Array(b)) => {
                return Ok(Value::Array(a.iter().chain(b).cloned().collect()))
            }
            _ => {}
        }
    }

    let (Some(a), Some(b)) = (Num::of(left), Num::of(right)) else {
        return Err(ExpressionError::Type(format!(
            "unsupported operands for {}: {} and {}",
            op.symbol(),
            ValueKind::of(left),
            ValueKind::of(right)
        )));
    };

    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        if let Some(result) = integer_arithmetic(op, x, y)? {
            return number(Num::Int(result));
        }
    }

    let (x, y) = (a.as_f64(), b.as_f64());
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Subtract => x - y,
        BinaryOp::Multiply => x * y,
        BinaryOp::Divide | BinaryOp::FloorDivide | BinaryOp::Modulo if y == 0.0 => {
            return Err(ExpressionError::DivisionByZero)
        }
        BinaryOp::Divide => x / y,
        BinaryOp::FloorDivide => (x / y).floor(),
        BinaryOp::Modulo => {
            let r = x % y;
            if r != 0.0 && (r < 0.0) != (y < 0.0) {
                r + y
            } else {
                r
            }
        }
    };
    number(Num::Float(result))
}

/// Integer result of `x op y`, or `None` when the result needs a float
/// (true division, or overflow).
fn integer_arithmetic(op: BinaryOp, x: i64, y: i64) -> Result<Option<i64>, ExpressionError> {
    let result = match op {
        BinaryOp::Add => x.checked_add(y),
        BinaryOp::Subtract => x.checked_sub(y),
        BinaryOp::Multiply => x.checked_mul(y),
        BinaryOp::Divide => None,
        BinaryOp::FloorDivide | BinaryOp::Modulo if y == 0 => {
            return Err(ExpressionError::DivisionByZero)
        }
        BinaryOp::FloorDivide => x.checked_div(y).map(|q| {
            if x % y != 0 && ((x < 0) != (y < 0)) {
                q - 1
            } else {
                q
            }
        }),
        BinaryOp::Modulo => x.checked_rem(y).map(|r| {
            if r != 0 && ((r < 0) != (y < 0)) {
                r + y
            } else {
                r
            }
        }),
    };
    Ok(result)
}

fn compare_pair(op: CompareOp, left: &Value, right: &Value) -> Result<bool, ExpressionError> {
    let ordered = |accept: fn(Ordering) -> bool| {
        compare(left, right).map(accept).ok_or_else(|| {
            ExpressionError::Type(format!(
                "cannot compare {} {} {}",
                ValueKind::of(left),
                op.symbol(),
                ValueKind::of(right)
            ))
        })
    };

    match op {
        CompareOp::Equal => Ok(loose_eq(left, right)),
        CompareOp::NotEqual => Ok(!loose_eq(left, right)),
        CompareOp::Less => ordered(Ordering::is_lt),
        CompareOp::LessEqual => ordered(Ordering::is_le),
        CompareOp::Greater => ordered(Ordering::is_gt),
        CompareOp::GreaterEqual => ordered(Ordering::is_ge),
        CompareOp::In => contains(right, left),
        CompareOp::NotIn => contains(right, left).map(|found| !found),
    }
}

/// Membership: element of a sequence, substring of text, or key of a mapping.
fn contains(container: &Value, item: &Value) -> Result<bool, ExpressionError> {
    match (container, item) {
        (Value::Array(items), _) => Ok(items.iter().any(|candidate| loose_eq(candidate, item))),
        (Value::String(haystack), Value::String(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Object(map), Value::String(key)) => Ok(map.contains_key(key)),
        (Value::String(_), other) | (Value::Object(_), other) => {
            Err(type_error("membership test", "text", other))
        }
        (other, _) => Err(type_error("membership test", "a sequence, text or mapping", other)),
    }
}

fn index_into(object: &Value, index: &Value) -> Result<Value, ExpressionError> {
    match (object, index) {
        (Value::Object(map), Value::String(key)) => map
            .get(key)
            .cloned()
            .ok_or_else(|| ExpressionError::MissingKey(key.clone())),
        (Value::Array(items), _) => {
            let position = position(index, items.len())?;
            Ok(items[position].clone())
        }
        (Value::String(text), _) => {
            let chars: Vec<char> = text.chars().collect();
            let position = position(index, chars.len())?;
            Ok(Value::String(chars[position].to_string()))
        }
        (other, _) => Err(type_error("indexing", "a sequence, text or mapping", other)),
    }
}

/// Resolve a possibly negative index against `len`.
fn position(index: &Value, len: usize) -> Result<usize, ExpressionError> {
    let Some(Num::Int(i)) = Num::of(index) else {
        return Err(type_error("index", "an integer", index));
    };
    let resolved = if i < 0 { i + len as i64 } else { i };
    if resolved < 0 || resolved >= len as i64 {
        return Err(ExpressionError::IndexOutOfRange { index: i, len });
    }
    Ok(resolved as usize)
}

fn call(function: &Function, args: &[Value]) -> Result<Value, ExpressionError> {
    match function {
        Function::Registered { predicate, .. } => Ok(Value::Bool(predicate(&args[0]))),
        Function::Builtin(builtin) => call_builtin(*builtin, args),
    }
}

fn text_arg<'v>(builtin: Builtin, value: &'v Value) -> Result<&'v str, ExpressionError> {
    value
        .as_str()
        .ok_or_else(|| type_error(builtin.name(), "text", value))
}

fn call_builtin(builtin: Builtin, args: &[Value]) -> Result<Value, ExpressionError> {
    match builtin {
        Builtin::Len => {
            let len = match &args[0] {
                Value::String(s) => s.chars().count(),
                Value::Array(a) => a.len(),
                Value::Object(o) => o.len(),
                other => return Err(type_error("len", "text, sequence or mapping", other)),
            };
            Ok(Value::from(len))
        }
        Builtin::Abs => match Num::of(&args[0]) {
            Some(Num::Int(i)) => match i.checked_abs() {
                Some(n) => number(Num::Int(n)),
                None => number(Num::Float((i as f64).abs())),
            },
            Some(Num::Float(f)) => number(Num::Float(f.abs())),
            None => Err(type_error("abs", "a number", &args[0])),
        },
        Builtin::Min | Builtin::Max => {
            let candidates: &[Value] = match args {
                [Value::Array(items)] => items,
                _ => args,
            };
            let wanted = if builtin == Builtin::Min {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            let mut best = candidates.first().ok_or_else(|| {
                ExpressionError::Type(format!("{} of an empty sequence", builtin.name()))
            })?;
            for candidate in &candidates[1..] {
                let ordering = compare(candidate, best).ok_or_else(|| {
                    ExpressionError::Type(format!(
                        "{} cannot order {} and {}",
                        builtin.name(),
                        ValueKind::of(candidate),
                        ValueKind::of(best)
                    ))
                })?;
                if ordering == wanted {
                    best = candidate;
                }
            }
            Ok(best.clone())
        }
        Builtin::Lower => Ok(Value::String(text_arg(builtin, &args[0])?.to_lowercase())),
        Builtin::Upper => Ok(Value::String(text_arg(builtin, &args[0])?.to_uppercase())),
        Builtin::StartsWith => {
            let (text, prefix) = (text_arg(builtin, &args[0])?, text_arg(builtin, &args[1])?);
            Ok(Value::Bool(text.starts_with(prefix)))
        }
        Builtin::EndsWith => {
            let (text, suffix) = (text_arg(builtin, &args[0])?, text_arg(builtin, &args[1])?);
            Ok(Value::Bool(text.ends_with(suffix)))
        }
        Builtin::Contains => contains(&args[0], &args[1]).map(Value::Bool),
    }
}
