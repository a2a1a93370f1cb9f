// Expression evaluator - walks a parsed expression against an Environment

use cubesheet_core::{slice_range, AxisIndex, GridIndex};

use super::builtins;
use super::parser::{parse, BinOp, CmpOp, Expr, SubscriptItem, UnaryOp};
use super::value::{EvalError, Number, Value};

/// What an expression can see: bound names and the grid.
pub trait Environment {
    /// Value bound to `name`, or None if the name is unbound.
    fn lookup(&self, name: &str) -> Option<Value>;

    /// Read the grid through a full (row, col, table) subscript.
    fn grid_get(&self, index: &GridIndex) -> Result<Value, EvalError>;
}

/// Parse and evaluate `source`.
pub fn evaluate<E: Environment + ?Sized>(source: &str, env: &E) -> Result<Value, EvalError> {
    let expr = parse(source).map_err(EvalError::syntax)?;
    eval_expr(&expr, env)
}

/// Error values stop the expression they appear in.
fn checked(value: Value) -> Result<Value, EvalError> {
    match value {
        Value::Error(err) => Err(err),
        other => Ok(other),
    }
}

pub fn eval_expr<E: Environment + ?Sized>(expr: &Expr, env: &E) -> Result<Value, EvalError> {
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(n) => Ok(Value::Float(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::None => Ok(Value::None),
        Expr::Name(name) => env.lookup(name).ok_or_else(|| EvalError::name(name)),
        Expr::List(items) => items
            .iter()
            .map(|item| eval_expr(item, env))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Unary { op, operand } => {
            let operand = checked(eval_expr(operand, env)?)?;
            unary(*op, &operand)
        }
        Expr::Binary { op, left, right } => {
            let left = checked(eval_expr(left, env)?)?;
            let right = checked(eval_expr(right, env)?)?;
            binary(*op, &left, &right)
        }
        Expr::Compare { first, rest } => {
            let mut left = checked(eval_expr(first, env)?)?;
            for (op, right) in rest {
                let right = checked(eval_expr(right, env)?)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        Expr::And(left, right) => {
            let left = checked(eval_expr(left, env)?)?;
            if left.truthy() {
                eval_expr(right, env)
            } else {
                Ok(left)
            }
        }
        Expr::Or(left, right) => {
            let left = checked(eval_expr(left, env)?)?;
            if left.truthy() {
                Ok(left)
            } else {
                eval_expr(right, env)
            }
        }
        Expr::Not(operand) => {
            let operand = checked(eval_expr(operand, env)?)?;
            Ok(Value::Bool(!operand.truthy()))
        }
        Expr::IfElse { cond, then, otherwise } => {
            if checked(eval_expr(cond, env)?)?.truthy() {
                eval_expr(then, env)
            } else {
                eval_expr(otherwise, env)
            }
        }
        Expr::Call { name, args } => {
            let args = args
                .iter()
                .map(|arg| eval_expr(arg, env).and_then(checked))
                .collect::<Result<Vec<_>, _>>()?;
            builtins::call(name, args)
        }
        Expr::Subscript { target, items } => {
            let target = checked(eval_expr(target, env)?)?;
            subscript(&target, items, env)
        }
    }
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
        BinOp::Pow => "**",
    }
}

fn overflow() -> EvalError {
    EvalError::value("integer overflow")
}

fn unary(op: UnaryOp, operand: &Value) -> Result<Value, EvalError> {
    match (op, operand.as_number()) {
        (UnaryOp::Pos, Some(n)) => Ok(n.into()),
        (UnaryOp::Neg, Some(Number::Int(n))) => n.checked_neg().map(Value::Int).ok_or_else(overflow),
        (UnaryOp::Neg, Some(Number::Float(n))) => Ok(Value::Float(-n)),
        (UnaryOp::Pos, None) => Err(EvalError::type_error(format!(
            "bad operand type for unary +: '{}'",
            operand.type_name()
        ))),
        (UnaryOp::Neg, None) => Err(EvalError::type_error(format!(
            "bad operand type for unary -: '{}'",
            operand.type_name()
        ))),
    }
}

/// Floor division rounding toward negative infinity.
fn floor_div(x: i64, y: i64) -> Option<i64> {
    let q = x.checked_div(y)?;
    if x % y != 0 && (x < 0) != (y < 0) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

/// Remainder with the sign of the divisor.
fn floor_mod(x: i64, y: i64) -> Option<i64> {
    let r = x.checked_rem(y)?;
    if r != 0 && (r < 0) != (y < 0) {
        Some(r + y)
    } else {
        Some(r)
    }
}

fn arithmetic(op: BinOp, a: Number, b: Number) -> Result<Value, EvalError> {
    if let (Number::Int(x), Number::Int(y)) = (a, b) {
        let divides = matches!(op, BinOp::Div | BinOp::FloorDiv | BinOp::Mod);
        if divides && y == 0 {
            return Err(EvalError::zero_division());
        }
        let result = match op {
            BinOp::Add => x.checked_add(y),
            BinOp::Sub => x.checked_sub(y),
            BinOp::Mul => x.checked_mul(y),
            BinOp::Div => return Ok(Value::Float(x as f64 / y as f64)),
            BinOp::FloorDiv => floor_div(x, y),
            BinOp::Mod => floor_mod(x, y),
            BinOp::Pow if y < 0 => {
                if x == 0 {
                    return Err(EvalError::zero_division());
                }
                return Ok(Value::Float((x as f64).powf(y as f64)));
            }
            BinOp::Pow => u32::try_from(y).ok().and_then(|e| x.checked_pow(e)),
        };
        return result.map(Value::Int).ok_or_else(overflow);
    }

    let (x, y) = (a.as_f64(), b.as_f64());
    let result = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div | BinOp::FloorDiv | BinOp::Mod if y == 0.0 => {
            return Err(EvalError::zero_division());
        }
        BinOp::Div => x / y,
        BinOp::FloorDiv => (x / y).floor(),
        BinOp::Mod => {
            let r = x % y;
            if r != 0.0 && (r < 0.0) != (y < 0.0) {
                r + y
            } else {
                r
            }
        }
        BinOp::Pow if x == 0.0 && y < 0.0 => return Err(EvalError::zero_division()),
        BinOp::Pow => x.powf(y),
    };
    Ok(Value::Float(result))
}

/// `count` copies of `items`; a non-positive count gives an empty result.
fn repeat<T: Clone>(items: &[T], count: i64) -> Result<Vec<T>, EvalError> {
    let count = usize::try_from(count).unwrap_or(0);
    if items.len().saturating_mul(count) > builtins::MAX_SEQUENCE_LEN {
        return Err(EvalError::value("repeated sequence too large"));
    }
    let mut out = Vec::with_capacity(items.len() * count);
    for _ in 0..count {
        out.extend_from_slice(items);
    }
    Ok(out)
}

pub(crate) fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return arithmetic(op, a, b);
    }

    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) => match n.as_number() {
            Some(Number::Int(count)) => {
                let chars: Vec<char> = s.chars().collect();
                Ok(Value::Str(repeat(&chars, count)?.into_iter().collect()))
            }
            _ => Err(unsupported(op, left, right)),
        },
        (BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items)) => {
            match n.as_number() {
                Some(Number::Int(count)) => Ok(Value::List(repeat(items, count)?)),
                _ => Err(unsupported(op, left, right)),
            }
        }
        _ => Err(unsupported(op, left, right)),
    }
}

fn unsupported(op: BinOp, left: &Value, right: &Value) -> EvalError {
    EvalError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op_symbol(op),
        left.type_name(),
        right.type_name()
    ))
}

pub(crate) fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    let symbol = match op {
        CmpOp::Eq => return Ok(left.loose_eq(right)),
        CmpOp::NotEq => return Ok(!left.loose_eq(right)),
        CmpOp::Lt => "<",
        CmpOp::Gt => ">",
        CmpOp::LtEq => "<=",
        CmpOp::GtEq => ">=",
    };

    let Some(ordering) = left.compare(right) else {
        // NaN compares false against everything
        if left.as_number().is_some() && right.as_number().is_some() {
            return Ok(false);
        }
        return Err(EvalError::type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            symbol,
            left.type_name(),
            right.type_name()
        )));
    };

    Ok(match op {
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::LtEq => ordering.is_le(),
        _ => ordering.is_ge(),
    })
}

fn index_int(value: &Value) -> Result<i64, EvalError> {
    match value.as_number() {
        Some(Number::Int(n)) => Ok(n),
        _ => Err(EvalError::type_error(format!(
            "indices must be integers, not {}",
            value.type_name()
        ))),
    }
}

fn optional_int<E: Environment + ?Sized>(expr: &Option<Expr>, env: &E) -> Result<Option<i64>, EvalError> {
    match expr {
        Some(expr) => match checked(eval_expr(expr, env)?)? {
            Value::None => Ok(None),
            value => index_int(&value).map(Some),
        },
        None => Ok(None),
    }
}

fn axis_index<E: Environment + ?Sized>(item: &SubscriptItem, env: &E) -> Result<AxisIndex, EvalError> {
    match item {
        SubscriptItem::Index(expr) => {
            let value = checked(eval_expr(expr, env)?)?;
            index_int(&value).map(AxisIndex::At)
        }
        SubscriptItem::Slice { start, stop, step } => Ok(AxisIndex::Slice {
            start: optional_int(start, env)?,
            stop: optional_int(stop, env)?,
            step: optional_int(step, env)?,
        }),
    }
}

/// Positions picked out of a sequence of known length.
enum Picked {
    One(usize),
    Many(Vec<usize>),
}

fn pick(index: AxisIndex, len: usize, what: &str) -> Result<Picked, EvalError> {
    match index {
        AxisIndex::At(i) => {
            let resolved = if i < 0 { i + len as i64 } else { i };
            if (0..len as i64).contains(&resolved) {
                Ok(Picked::One(resolved as usize))
            } else {
                Err(EvalError::index(format!("{} index out of range", what)))
            }
        }
        AxisIndex::Slice { start, stop, step } => slice_range(start, stop, step, len)
            .map(|range| Picked::Many(range.collect()))
            .ok_or_else(|| EvalError::value("slice step cannot be zero")),
    }
}

fn subscript<E: Environment + ?Sized>(
    target: &Value,
    items: &[SubscriptItem],
    env: &E,
) -> Result<Value, EvalError> {
    match target {
        Value::Grid => {
            let [row, col, table] = items else {
                return Err(EvalError::type_error(format!(
                    "grid subscript needs 3 indices, got {}",
                    items.len()
                )));
            };
            let index = GridIndex::new(
                axis_index(row, env)?,
                axis_index(col, env)?,
                axis_index(table, env)?,
            );
            env.grid_get(&index)
        }
        Value::List(list) => {
            let [item] = items else {
                return Err(EvalError::type_error("list indices must be integers or slices"));
            };
            match pick(axis_index(item, env)?, list.len(), "list")? {
                Picked::One(i) => Ok(list[i].clone()),
                Picked::Many(ix) => Ok(Value::List(ix.into_iter().map(|i| list[i].clone()).collect())),
            }
        }
        Value::Str(s) => {
            let [item] = items else {
                return Err(EvalError::type_error("string indices must be integers or slices"));
            };
            let chars: Vec<char> = s.chars().collect();
            match pick(axis_index(item, env)?, chars.len(), "string")? {
                Picked::One(i) => Ok(Value::Str(chars[i].to_string())),
                Picked::Many(ix) => Ok(Value::Str(ix.into_iter().map(|i| chars[i]).collect())),
            }
        }
        other => Err(EvalError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}
