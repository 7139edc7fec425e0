//! Compiled logic fragments and their evaluation
//!
//! A [`Predicate`] is a compiled boolean expression; an [`UpdateProgram`] is
//! a compiled assignment list that mutates a record in place. Both run
//! against one record bound as `item` plus the worker's [`Environment`].
//!
//! Semantics are strict: no type coercion, boolean-only logic operators, and
//! ordering only between two numbers or two strings. Field access through a
//! missing key or null yields null so predicates tolerate heterogeneous
//! records.

use serde_json::{Number, Value};

use super::env::{kind_of, Binding, Environment, RECORD_BINDING};
use super::errors::{EvalError, EvalResult};
use super::parser::{
    parse_assignments, parse_expression, Assignment, BinaryOp, Expr, UnaryOp,
};

/// A compiled predicate fragment
#[derive(Debug, Clone)]
pub struct Predicate {
    expr: Expr,
}

impl Predicate {
    /// Compile predicate source text
    pub fn compile(source: &str) -> EvalResult<Self> {
        Ok(Self {
            expr: parse_expression(source)?,
        })
    }

    /// Evaluate against one record
    pub fn test(&self, record: &Value, env: &Environment) -> EvalResult<bool> {
        match eval_expr(&self.expr, record, env)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::evaluation(format!(
                "predicate produced {}, expected a boolean",
                kind_of(&other)
            ))),
        }
    }
}

/// A compiled update fragment
#[derive(Debug, Clone)]
pub struct UpdateProgram {
    assignments: Vec<Assignment>,
}

impl UpdateProgram {
    /// Compile update source text
    pub fn compile(source: &str) -> EvalResult<Self> {
        Ok(Self {
            assignments: parse_assignments(source)?,
        })
    }

    /// Apply all assignments to the record, in order.
    ///
    /// Each right-hand side sees the mutations of earlier assignments.
    pub fn apply(&self, record: &mut Value, env: &Environment) -> EvalResult<()> {
        for assignment in &self.assignments {
            let value = eval_expr(&assignment.value, record, env)?;
            assign_field(record, &assignment.target[1..], value)?;
        }
        Ok(())
    }
}

/// Write `value` at `path` below the record root.
///
/// Intermediate segments must traverse existing objects; the final segment
/// may create a new key.
fn assign_field(record: &mut Value, path: &[String], value: Value) -> EvalResult<()> {
    let mut current = record;
    for segment in &path[..path.len() - 1] {
        let map = current.as_object_mut().ok_or_else(|| {
            EvalError::evaluation(format!("cannot traverse into non-object at [{}]", segment))
        })?;
        current = map.get_mut(segment).ok_or_else(|| {
            EvalError::evaluation(format!("missing field [{}] on assignment path", segment))
        })?;
    }

    let last = &path[path.len() - 1];
    let map = current.as_object_mut().ok_or_else(|| {
        EvalError::evaluation(format!(
            "cannot assign field [{}] on a non-object record",
            last
        ))
    })?;
    map.insert(last.clone(), value);
    Ok(())
}

/// Evaluate an expression against one record and the environment
fn eval_expr(expr: &Expr, record: &Value, env: &Environment) -> EvalResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Path(segments) => eval_path(segments, record, env),
        Expr::Call { name, args } => {
            let builtin = match env.lookup(name) {
                Some(Binding::Builtin(builtin)) => *builtin,
                Some(Binding::Value(_)) => {
                    return Err(EvalError::evaluation(format!(
                        "[{}] is not a function",
                        name
                    )))
                }
                None => {
                    return Err(EvalError::evaluation(format!(
                        "unknown function [{}]",
                        name
                    )))
                }
            };
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(arg, record, env)?);
            }
            super::builtins::apply(builtin, &values)
        }
        Expr::Unary { op, operand } => {
            let value = eval_expr(operand, record, env)?;
            match op {
                UnaryOp::Not => match value {
                    Value::Bool(b) => Ok(Value::Bool(!b)),
                    other => Err(EvalError::evaluation(format!(
                        "'!' requires a boolean, got {}",
                        kind_of(&other)
                    ))),
                },
                UnaryOp::Neg => negate(value),
            }
        }
        Expr::Binary { op, left, right } => eval_binary(*op, left, right, record, env),
    }
}

fn eval_path(segments: &[String], record: &Value, env: &Environment) -> EvalResult<Value> {
    let root = &segments[0];
    let mut current = if root == RECORD_BINDING {
        record.clone()
    } else {
        match env.lookup(root) {
            Some(Binding::Value(value)) => value.clone(),
            Some(Binding::Builtin(_)) => {
                return Err(EvalError::evaluation(format!(
                    "[{}] is a function, not a value",
                    root
                )))
            }
            None => {
                return Err(EvalError::evaluation(format!("unknown name [{}]", root)))
            }
        }
    };

    for segment in &segments[1..] {
        current = current.get(segment).cloned().unwrap_or(Value::Null);
    }
    Ok(current)
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    record: &Value,
    env: &Environment,
) -> EvalResult<Value> {
    // Logic operators short-circuit before the right side is evaluated
    if matches!(op, BinaryOp::Or | BinaryOp::And) {
        let lhs = expect_bool(eval_expr(left, record, env)?, "logic operator")?;
        return match (op, lhs) {
            (BinaryOp::Or, true) => Ok(Value::Bool(true)),
            (BinaryOp::And, false) => Ok(Value::Bool(false)),
            _ => {
                let rhs = expect_bool(eval_expr(right, record, env)?, "logic operator")?;
                Ok(Value::Bool(rhs))
            }
        };
    }

    let lhs = eval_expr(left, record, env)?;
    let rhs = eval_expr(right, record, env)?;

    match op {
        BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::Ne => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Lt => compare(&lhs, &rhs).map(|o| Value::Bool(o == std::cmp::Ordering::Less)),
        BinaryOp::Le => compare(&lhs, &rhs).map(|o| Value::Bool(o != std::cmp::Ordering::Greater)),
        BinaryOp::Gt => compare(&lhs, &rhs).map(|o| Value::Bool(o == std::cmp::Ordering::Greater)),
        BinaryOp::Ge => compare(&lhs, &rhs).map(|o| Value::Bool(o != std::cmp::Ordering::Less)),
        BinaryOp::Add => add(lhs, rhs),
        BinaryOp::Sub => arithmetic(lhs, rhs, "-", i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => arithmetic(lhs, rhs, "*", i64::checked_mul, |a, b| a * b),
        BinaryOp::Div => divide(lhs, rhs),
        BinaryOp::Rem => remainder(lhs, rhs),
        BinaryOp::Or | BinaryOp::And => unreachable!("handled above"),
    }
}

fn expect_bool(value: Value, context: &str) -> EvalResult<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::evaluation(format!(
            "{} requires a boolean, got {}",
            context,
            kind_of(&other)
        ))),
    }
}

/// Three-way ordering: two numbers (as f64) or two strings, nothing else
fn compare(a: &Value, b: &Value) -> EvalResult<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let xf = x.as_f64().unwrap_or(0.0);
            let yf = y.as_f64().unwrap_or(0.0);
            xf.partial_cmp(&yf)
                .ok_or_else(|| EvalError::evaluation("numbers are not comparable"))
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (x, y) => Err(EvalError::evaluation(format!(
            "cannot order {} and {}",
            kind_of(x),
            kind_of(y)
        ))),
    }
}

/// Wrap a finite f64 as a JSON number
pub(crate) fn number_from_f64(value: f64) -> EvalResult<Value> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| EvalError::evaluation("arithmetic produced a non-finite number"))
}

fn add(lhs: Value, rhs: Value) -> EvalResult<Value> {
    match (&lhs, &rhs) {
        (Value::String(a), Value::String(b)) => {
            let mut joined = a.clone();
            joined.push_str(b);
            Ok(Value::String(joined))
        }
        _ => arithmetic(lhs, rhs, "+", i64::checked_add, |a, b| a + b),
    }
}

/// Integer arithmetic when both operands are integers, f64 otherwise
fn arithmetic(
    lhs: Value,
    rhs: Value,
    symbol: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult<Value> {
    let (a, b) = match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => (a, b),
        (a, b) => {
            return Err(EvalError::evaluation(format!(
                "'{}' requires numbers, got {} and {}",
                symbol,
                kind_of(a),
                kind_of(b)
            )))
        }
    };

    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        let result = int_op(x, y)
            .ok_or_else(|| EvalError::evaluation(format!("'{}' overflowed", symbol)))?;
        return Ok(Value::from(result));
    }

    let x = a.as_f64().unwrap_or(0.0);
    let y = b.as_f64().unwrap_or(0.0);
    number_from_f64(float_op(x, y))
}

fn divide(lhs: Value, rhs: Value) -> EvalResult<Value> {
    let (a, b) = match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => {
            (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0))
        }
        (a, b) => {
            return Err(EvalError::evaluation(format!(
                "'/' requires numbers, got {} and {}",
                kind_of(a),
                kind_of(b)
            )))
        }
    };
    if b == 0.0 {
        return Err(EvalError::evaluation("division by zero"));
    }
    number_from_f64(a / b)
}

fn remainder(lhs: Value, rhs: Value) -> EvalResult<Value> {
    match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                if y == 0 {
                    return Err(EvalError::evaluation("modulo by zero"));
                }
                return Ok(Value::from(x % y));
            }
            let x = a.as_f64().unwrap_or(0.0);
            let y = b.as_f64().unwrap_or(0.0);
            if y == 0.0 {
                return Err(EvalError::evaluation("modulo by zero"));
            }
            number_from_f64(x % y)
        }
        (a, b) => Err(EvalError::evaluation(format!(
            "'%' requires numbers, got {} and {}",
            kind_of(a),
            kind_of(b)
        ))),
    }
}

fn negate(value: Value) -> EvalResult<Value> {
    match value {
        Value::Number(n) => {
            if let Some(x) = n.as_i64() {
                let negated = x
                    .checked_neg()
                    .ok_or_else(|| EvalError::evaluation("'-' overflowed"))?;
                return Ok(Value::from(negated));
            }
            number_from_f64(-n.as_f64().unwrap_or(0.0))
        }
        other => Err(EvalError::evaluation(format!(
            "'-' requires a number, got {}",
            kind_of(&other)
        ))),
    }
}
