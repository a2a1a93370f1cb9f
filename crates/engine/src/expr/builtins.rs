// Built-in functions callable from cell expressions

use std::cmp::Ordering;

use super::eval::binary;
use super::parser::BinOp;
use super::value::{EvalError, Number, Value};

/// Longest list or string a builtin or repetition may produce.
pub const MAX_SEQUENCE_LEN: usize = 10_000_000;

/// Check if a name refers to a builtin function.
pub fn is_builtin(name: &str) -> bool {
    matches!(
        name,
        "sum" | "len" | "min" | "max" | "abs" | "round" | "int" | "float" | "str" | "bool"
            | "range" | "list" | "sorted"
    )
}

/// Call builtin `name`. Unknown names are a NameError.
pub fn call(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    match name {
        "sum" => sum(&args),
        "len" => len(&args),
        "min" => extreme(name, &args, Ordering::Less),
        "max" => extreme(name, &args, Ordering::Greater),
        "abs" => abs(&args),
        "round" => round(&args),
        "int" => int(&args),
        "float" => float(&args),
        "str" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Str(args.first().map(Value::to_string).unwrap_or_default()))
        }
        "bool" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Bool(args.first().is_some_and(Value::truthy)))
        }
        "range" => range(&args),
        "list" => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                Some(value) => items_of(name, value).map(Value::List),
                None => Ok(Value::List(Vec::new())),
            }
        }
        "sorted" => sorted(&args),
        _ => Err(EvalError::name(name)),
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        format!("exactly {}", min)
    } else {
        format!("from {} to {}", min, max)
    };
    Err(EvalError::type_error(format!(
        "{}() takes {} arguments ({} given)",
        name,
        expected,
        args.len()
    )))
}

fn not_iterable(value: &Value) -> EvalError {
    EvalError::type_error(format!("'{}' object is not iterable", value.type_name()))
}

/// Elements of a list or characters of a string.
fn items_of(name: &str, value: &Value) -> Result<Vec<Value>, EvalError> {
    match value {
        Value::List(items) => Ok(items.clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        other => Err(EvalError::type_error(format!(
            "{}() argument '{}' object is not iterable",
            name,
            other.type_name()
        ))),
    }
}

/// Leaves of nested lists, skipping empty cells. Error values stop the walk.
fn leaves(value: &Value, out: &mut Vec<Value>) -> Result<(), EvalError> {
    match value {
        Value::List(items) => {
            for item in items {
                leaves(item, out)?;
            }
            Ok(())
        }
        Value::None => Ok(()),
        Value::Error(err) => Err(err.clone()),
        other => {
            out.push(other.clone());
            Ok(())
        }
    }
}

fn sum(args: &[Value]) -> Result<Value, EvalError> {
    arity("sum", args, 1, 2)?;
    let Value::List(_) = &args[0] else {
        return Err(not_iterable(&args[0]));
    };

    let mut values = Vec::new();
    leaves(&args[0], &mut values)?;

    let mut total = args.get(1).cloned().unwrap_or(Value::Int(0));
    for value in &values {
        total = binary(BinOp::Add, &total, value)?;
    }
    Ok(total)
}

fn len(args: &[Value]) -> Result<Value, EvalError> {
    arity("len", args, 1, 1)?;
    let n = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        other => {
            return Err(EvalError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(n as i64))
}

/// min() when `wanted` is Less, max() when Greater.
fn extreme(name: &str, args: &[Value], wanted: Ordering) -> Result<Value, EvalError> {
    let mut values = Vec::new();
    match args {
        [] => return Err(EvalError::type_error(format!("{}() expected 1 argument, got 0", name))),
        [single @ Value::List(_)] => leaves(single, &mut values)?,
        [single] => return Err(not_iterable(single)),
        many => {
            for value in many {
                leaves(value, &mut values)?;
            }
        }
    }

    let mut iter = values.into_iter();
    let Some(mut best) = iter.next() else {
        return Err(EvalError::value(format!("{}() arg is an empty sequence", name)));
    };
    for value in iter {
        match value.compare(&best) {
            Some(ord) if ord == wanted => best = value,
            Some(_) => {}
            None => {
                return Err(EvalError::type_error(format!(
                    "'{}' not supported between instances of '{}' and '{}'",
                    if wanted == Ordering::Less { "<" } else { ">" },
                    value.type_name(),
                    best.type_name()
                )))
            }
        }
    }
    Ok(best)
}

fn abs(args: &[Value]) -> Result<Value, EvalError> {
    arity("abs", args, 1, 1)?;
    match args[0].as_number() {
        Some(Number::Int(n)) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| EvalError::value("integer overflow")),
        Some(Number::Float(n)) => Ok(Value::Float(n.abs())),
        None => Err(EvalError::type_error(format!(
            "bad operand type for abs(): '{}'",
            args[0].type_name()
        ))),
    }
}

fn float_to_int(n: f64) -> Result<i64, EvalError> {
    if n.is_nan() {
        return Err(EvalError::value("cannot convert float NaN to integer"));
    }
    if n.is_infinite() || n < i64::MIN as f64 || n >= i64::MAX as f64 {
        return Err(EvalError::value("cannot convert float to integer: out of range"));
    }
    Ok(n as i64)
}

fn round(args: &[Value]) -> Result<Value, EvalError> {
    arity("round", args, 1, 2)?;
    let Some(number) = args[0].as_number() else {
        return Err(EvalError::type_error(format!(
            "type {} doesn't define __round__ method",
            args[0].type_name()
        )));
    };

    match args.get(1) {
        None | Some(Value::None) => match number {
            Number::Int(n) => Ok(Value::Int(n)),
            Number::Float(n) => float_to_int(n.round_ties_even()).map(Value::Int),
        },
        Some(digits) => {
            let Some(Number::Int(digits)) = digits.as_number() else {
                return Err(EvalError::type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    digits.type_name()
                )));
            };
            let digits = digits.clamp(-308, 308) as i32;
            let scale = 10f64.powi(digits);
            match number {
                Number::Int(n) if digits >= 0 => Ok(Value::Int(n)),
                Number::Int(n) => float_to_int((n as f64 * scale).round_ties_even() / scale).map(Value::Int),
                Number::Float(n) => Ok(Value::Float((n * scale).round_ties_even() / scale)),
            }
        }
    }
}

fn int(args: &[Value]) -> Result<Value, EvalError> {
    arity("int", args, 0, 1)?;
    let Some(value) = args.first() else {
        return Ok(Value::Int(0));
    };
    match value {
        Value::Str(s) => s
            .trim()
            .replace('_', "")
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| EvalError::value(format!("invalid literal for int() with base 10: '{}'", s))),
        other => match other.as_number() {
            Some(Number::Int(n)) => Ok(Value::Int(n)),
            Some(Number::Float(n)) => float_to_int(n.trunc()).map(Value::Int),
            None => Err(EvalError::type_error(format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ))),
        },
    }
}

fn float(args: &[Value]) -> Result<Value, EvalError> {
    arity("float", args, 0, 1)?;
    let Some(value) = args.first() else {
        return Ok(Value::Float(0.0));
    };
    match value {
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| EvalError::value(format!("could not convert string to float: '{}'", s))),
        other => other
            .as_number()
            .map(|n| Value::Float(n.as_f64()))
            .ok_or_else(|| {
                EvalError::type_error(format!(
                    "float() argument must be a string or a number, not '{}'",
                    other.type_name()
                ))
            }),
    }
}

fn range(args: &[Value]) -> Result<Value, EvalError> {
    arity("range", args, 1, 3)?;
    let mut ints = Vec::with_capacity(args.len());
    for arg in args {
        match arg.as_number() {
            Some(Number::Int(n)) => ints.push(n),
            _ => {
                return Err(EvalError::type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    arg.type_name()
                )))
            }
        }
    }

    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(EvalError::type_error("range expected at most 3 arguments")),
    };
    if step == 0 {
        return Err(EvalError::value("range() arg 3 must not be zero"));
    }

    let (start, stop, step) = (start as i128, stop as i128, step as i128);
    let count = if step > 0 && stop > start {
        (stop - start + step - 1) / step
    } else if step < 0 && start > stop {
        (start - stop - step - 1) / -step
    } else {
        0
    };
    if count > MAX_SEQUENCE_LEN as i128 {
        return Err(EvalError::value("range too large"));
    }

    Ok(Value::List(
        (0..count).map(|i| Value::Int((start + i * step) as i64)).collect(),
    ))
}

fn sorted(args: &[Value]) -> Result<Value, EvalError> {
    arity("sorted", args, 1, 1)?;
    let mut items = items_of("sorted", &args[0])?;
    if let Some(Value::Error(err)) = items.iter().find(|v| v.is_error()) {
        return Err(err.clone());
    }

    let mut mismatch = None;
    items.sort_by(|a, b| {
        a.compare(b).unwrap_or_else(|| {
            mismatch.get_or_insert((a.type_name(), b.type_name()));
            Ordering::Equal
        })
    });

    match mismatch {
        Some((a, b)) => Err(EvalError::type_error(format!(
            "'<' not supported between instances of '{}' and '{}'",
            a, b
        ))),
        None => Ok(Value::List(items)),
    }
}
