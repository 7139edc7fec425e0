//! Builtin function implementations
//!
//! Applied by the interpreter once call arguments are evaluated. Arity or
//! operand type mismatches fault the enclosing operation.

use serde_json::Value;

use super::env::{kind_of, Builtin};
use super::errors::{EvalError, EvalResult};
use super::program::number_from_f64;

/// Apply a builtin to evaluated arguments
pub(crate) fn apply(builtin: Builtin, args: &[Value]) -> EvalResult<Value> {
    match builtin {
        Builtin::Len => {
            let arg = one_arg("len", args)?;
            let length = match arg {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                other => {
                    return Err(EvalError::evaluation(format!(
                        "len() requires a string, array or object, got {}",
                        kind_of(other)
                    )))
                }
            };
            Ok(Value::from(length as i64))
        }
        Builtin::Contains => {
            let (haystack, needle) = two_args("contains", args)?;
            match haystack {
                Value::String(s) => match needle {
                    Value::String(sub) => Ok(Value::Bool(s.contains(sub.as_str()))),
                    other => Err(EvalError::evaluation(format!(
                        "contains() on a string requires a string needle, got {}",
                        kind_of(other)
                    ))),
                },
                Value::Array(items) => Ok(Value::Bool(items.contains(needle))),
                other => Err(EvalError::evaluation(format!(
                    "contains() requires a string or array, got {}",
                    kind_of(other)
                ))),
            }
        }
        Builtin::Lower => {
            let arg = string_arg("lower", args)?;
            Ok(Value::String(arg.to_lowercase()))
        }
        Builtin::Upper => {
            let arg = string_arg("upper", args)?;
            Ok(Value::String(arg.to_uppercase()))
        }
        Builtin::Abs => {
            let arg = one_arg("abs", args)?;
            match arg {
                Value::Number(n) => {
                    if let Some(x) = n.as_i64() {
                        let absolute = x
                            .checked_abs()
                            .ok_or_else(|| EvalError::evaluation("abs() overflowed"))?;
                        return Ok(Value::from(absolute));
                    }
                    number_from_f64(n.as_f64().unwrap_or(0.0).abs())
                }
                other => Err(EvalError::evaluation(format!(
                    "abs() requires a number, got {}",
                    kind_of(other)
                ))),
            }
        }
    }
}

fn one_arg<'a>(name: &str, args: &'a [Value]) -> EvalResult<&'a Value> {
    match args {
        [arg] => Ok(arg),
        _ => Err(EvalError::evaluation(format!(
            "{}() takes 1 argument, got {}",
            name,
            args.len()
        ))),
    }
}

fn two_args<'a>(name: &str, args: &'a [Value]) -> EvalResult<(&'a Value, &'a Value)> {
    match args {
        [first, second] => Ok((first, second)),
        _ => Err(EvalError::evaluation(format!(
            "{}() takes 2 arguments, got {}",
            name,
            args.len()
        ))),
    }
}

fn string_arg<'a>(name: &str, args: &'a [Value]) -> EvalResult<&'a str> {
    match one_arg(name, args)? {
        Value::String(s) => Ok(s),
        other => Err(EvalError::evaluation(format!(
            "{}() requires a string, got {}",
            name,
            kind_of(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_len() {
        assert_eq!(apply(Builtin::Len, &[json!("abc")]).unwrap(), json!(3));
        assert_eq!(apply(Builtin::Len, &[json!([1, 2])]).unwrap(), json!(2));
        assert_eq!(apply(Builtin::Len, &[json!({"a": 1})]).unwrap(), json!(1));
        assert!(apply(Builtin::Len, &[json!(5)]).is_err());
    }

    #[test]
    fn test_contains() {
        assert_eq!(
            apply(Builtin::Contains, &[json!("hello"), json!("ell")]).unwrap(),
            json!(true)
        );
        assert_eq!(
            apply(Builtin::Contains, &[json!([1, 2, 3]), json!(2)]).unwrap(),
            json!(true)
        );
        assert_eq!(
            apply(Builtin::Contains, &[json!([1, 2, 3]), json!("2")]).unwrap(),
            json!(false)
        );
    }

    #[test]
    fn test_case_mapping() {
        assert_eq!(apply(Builtin::Lower, &[json!("AbC")]).unwrap(), json!("abc"));
        assert_eq!(apply(Builtin::Upper, &[json!("AbC")]).unwrap(), json!("ABC"));
    }

    #[test]
    fn test_abs() {
        assert_eq!(apply(Builtin::Abs, &[json!(-4)]).unwrap(), json!(4));
        assert_eq!(apply(Builtin::Abs, &[json!(-1.5)]).unwrap(), json!(1.5));
    }

    #[test]
    fn test_arity_errors() {
        assert!(apply(Builtin::Len, &[]).is_err());
        assert!(apply(Builtin::Contains, &[json!("a")]).is_err());
    }
}
