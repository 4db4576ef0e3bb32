//! Compiles a typed `$filter` tree into a row predicate.
//!
//! Evaluation is three-valued: a missing property or a null operand makes
//! the surrounding comparison unknown (`None`), and an unknown filter
//! outcome excludes the row. `eq null` and `ne null` are the exception
//! and test nullness itself.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use bigdecimal::RoundingMode;
use chrono::{Datelike, Timelike};
use odata_core::{FieldValue, Record, Value};

use crate::ast::{BinaryOp, Expr, ExprNode, Function, PropertyPath, UnaryOp};

pub type Predicate = Arc<dyn Fn(&dyn Record) -> bool + Send + Sync>;

/// The compiled `$filter`: the predicate plus the navigation properties
/// the expression touches, which execution must make reachable on each
/// candidate row.
#[derive(Clone)]
pub struct FilterInfo {
    pub predicate: Predicate,
    pub referenced_navigations: BTreeSet<String>,
}

impl std::fmt::Debug for FilterInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterInfo")
            .field("referenced_navigations", &self.referenced_navigations)
            .finish_non_exhaustive()
    }
}

#[must_use]
pub fn compile_filter(expr: Expr) -> FilterInfo {
    let mut referenced_navigations = BTreeSet::new();
    collect_navigations(&expr, &mut referenced_navigations);
    let expr = Arc::new(expr);
    let predicate: Predicate = Arc::new(move |row: &dyn Record| {
        matches!(eval(&expr, row), Some(Value::Boolean(true)))
    });
    FilterInfo {
        predicate,
        referenced_navigations,
    }
}

fn collect_navigations(expr: &Expr, out: &mut BTreeSet<String>) {
    match &expr.node {
        ExprNode::Property(path) => {
            for nav in path.navigations() {
                out.insert(nav.to_owned());
            }
        }
        ExprNode::Unary(_, operand) => collect_navigations(operand, out),
        ExprNode::Binary(_, left, right) => {
            collect_navigations(left, out);
            collect_navigations(right, out);
        }
        ExprNode::Function(_, args) => {
            for arg in args {
                collect_navigations(arg, out);
            }
        }
        ExprNode::Literal(_) | ExprNode::Null => {}
    }
}

/// Evaluate to a value, or `None` for the unknown outcome.
fn eval(expr: &Expr, row: &dyn Record) -> Option<Value> {
    match &expr.node {
        ExprNode::Literal(value) => Some(value.clone()),
        ExprNode::Null => None,
        ExprNode::Property(path) => eval_path(path, row),
        ExprNode::Unary(UnaryOp::Not, operand) => match eval(operand, row)? {
            Value::Boolean(b) => Some(Value::Boolean(!b)),
            _ => None,
        },
        ExprNode::Unary(UnaryOp::Negate, operand) => negate(eval(operand, row)?),
        ExprNode::Binary(BinaryOp::And, left, right) => {
            kleene_and(as_bool(eval(left, row)), || as_bool(eval(right, row)))
        }
        ExprNode::Binary(BinaryOp::Or, left, right) => {
            kleene_or(as_bool(eval(left, row)), || as_bool(eval(right, row)))
        }
        ExprNode::Binary(op, left, right) if op.is_comparison() => {
            compare(*op, eval(left, row), eval(right, row))
        }
        ExprNode::Binary(op, left, right) => {
            let l = eval(left, row)?;
            let r = eval(right, row)?;
            match op {
                BinaryOp::Add => l.checked_add(&r),
                BinaryOp::Sub => l.checked_sub(&r),
                BinaryOp::Mul => l.checked_mul(&r),
                BinaryOp::Div => l.checked_div(&r),
                BinaryOp::Mod => l.checked_rem(&r),
                _ => None,
            }
        }
        ExprNode::Function(function, args) => eval_function(*function, args, row),
    }
}

fn eval_path(path: &PropertyPath, row: &dyn Record) -> Option<Value> {
    let (last, init) = path.steps.split_last()?;
    let mut owner: Option<Arc<dyn Record>> = None;
    for step in init {
        let field = match &owner {
            Some(record) => record.field(&step.name),
            None => row.field(&step.name),
        };
        match field {
            FieldValue::Record(record) => owner = Some(record),
            _ => return None,
        }
    }
    let field = match &owner {
        Some(record) => record.field(&last.name),
        None => row.field(&last.name),
    };
    match field {
        FieldValue::Value(value) => Some(value),
        _ => None,
    }
}

fn as_bool(value: Option<Value>) -> Option<bool> {
    match value {
        Some(Value::Boolean(b)) => Some(b),
        _ => None,
    }
}

fn kleene_and(left: Option<bool>, right: impl FnOnce() -> Option<bool>) -> Option<Value> {
    if left == Some(false) {
        return Some(Value::Boolean(false));
    }
    match (left, right()) {
        (Some(true), Some(true)) => Some(Value::Boolean(true)),
        (_, Some(false)) => Some(Value::Boolean(false)),
        _ => None,
    }
}

fn kleene_or(left: Option<bool>, right: impl FnOnce() -> Option<bool>) -> Option<Value> {
    if left == Some(true) {
        return Some(Value::Boolean(true));
    }
    match (left, right()) {
        (Some(false), Some(false)) => Some(Value::Boolean(false)),
        (_, Some(true)) => Some(Value::Boolean(true)),
        _ => None,
    }
}

fn compare(op: BinaryOp, left: Option<Value>, right: Option<Value>) -> Option<Value> {
    match (left, right) {
        (Some(l), Some(r)) => {
            let ordering = l.compare(&r)?;
            let outcome = match op {
                BinaryOp::Eq => ordering == Ordering::Equal,
                BinaryOp::Ne => ordering != Ordering::Equal,
                BinaryOp::Gt => ordering == Ordering::Greater,
                BinaryOp::Ge => ordering != Ordering::Less,
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                _ => return None,
            };
            Some(Value::Boolean(outcome))
        }
        // Nullness tests; ordering against null is unknown.
        (l, r) => match op {
            BinaryOp::Eq => Some(Value::Boolean(l.is_none() && r.is_none())),
            BinaryOp::Ne => Some(Value::Boolean(l.is_some() || r.is_some())),
            _ => None,
        },
    }
}

fn negate(value: Value) -> Option<Value> {
    match value {
        Value::SByte(v) => v.checked_neg().map(Value::SByte),
        Value::Int16(v) => v.checked_neg().map(Value::Int16),
        Value::Int32(v) => v.checked_neg().map(Value::Int32),
        Value::Int64(v) => v.checked_neg().map(Value::Int64),
        Value::Single(v) => Some(Value::Single(-v)),
        Value::Double(v) => Some(Value::Double(-v)),
        Value::Decimal(d) => Some(Value::Decimal(-d)),
        _ => None,
    }
}

fn eval_function(function: Function, args: &[Expr], row: &dyn Record) -> Option<Value> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(eval(arg, row)?);
    }
    match function {
        Function::SubstringOf => {
            let needle = as_str(&values[0])?;
            let hay = as_str(&values[1])?;
            Some(Value::Boolean(hay.contains(needle)))
        }
        Function::EndsWith => {
            let hay = as_str(&values[0])?;
            let suffix = as_str(&values[1])?;
            Some(Value::Boolean(hay.ends_with(suffix)))
        }
        Function::StartsWith => {
            let hay = as_str(&values[0])?;
            let prefix = as_str(&values[1])?;
            Some(Value::Boolean(hay.starts_with(prefix)))
        }
        Function::Length => {
            let s = as_str(&values[0])?;
            Some(Value::Int32(i32::try_from(s.chars().count()).ok()?))
        }
        Function::IndexOf => {
            let hay = as_str(&values[0])?;
            let needle = as_str(&values[1])?;
            let index = match hay.find(needle) {
                Some(byte) => i32::try_from(hay[..byte].chars().count()).ok()?,
                None => -1,
            };
            Some(Value::Int32(index))
        }
        Function::Replace => {
            let s = as_str(&values[0])?;
            let from = as_str(&values[1])?;
            let to = as_str(&values[2])?;
            Some(Value::String(s.replace(from, to)))
        }
        Function::Substring => {
            let s = as_str(&values[0])?;
            let start = usize::try_from(as_i64(&values[1])?).ok()?;
            let tail: String = match values.get(2) {
                Some(len) => {
                    let len = usize::try_from(as_i64(len)?).ok()?;
                    s.chars().skip(start).take(len).collect()
                }
                None => s.chars().skip(start).collect(),
            };
            Some(Value::String(tail))
        }
        Function::ToLower => Some(Value::String(as_str(&values[0])?.to_lowercase())),
        Function::ToUpper => Some(Value::String(as_str(&values[0])?.to_uppercase())),
        Function::Trim => Some(Value::String(as_str(&values[0])?.trim().to_owned())),
        Function::Concat => {
            let mut s = as_str(&values[0])?.to_owned();
            s.push_str(as_str(&values[1])?);
            Some(Value::String(s))
        }
        Function::Year
        | Function::Month
        | Function::Day
        | Function::Hour
        | Function::Minute
        | Function::Second => {
            let dt = match &values[0] {
                Value::DateTime(dt) => dt,
                _ => return None,
            };
            let part = match function {
                Function::Year => dt.year(),
                Function::Month => i32::try_from(dt.month()).ok()?,
                Function::Day => i32::try_from(dt.day()).ok()?,
                Function::Hour => i32::try_from(dt.hour()).ok()?,
                Function::Minute => i32::try_from(dt.minute()).ok()?,
                _ => i32::try_from(dt.second()).ok()?,
            };
            Some(Value::Int32(part))
        }
        Function::Round => rounded(&values[0], f64::round, RoundingMode::HalfEven),
        Function::Floor => rounded(&values[0], f64::floor, RoundingMode::Floor),
        Function::Ceiling => rounded(&values[0], f64::ceil, RoundingMode::Ceiling),
    }
}

fn rounded(value: &Value, apply: fn(f64) -> f64, mode: RoundingMode) -> Option<Value> {
    match value {
        Value::Decimal(d) => Some(Value::Decimal(d.with_scale_round(0, mode))),
        Value::Double(v) => Some(Value::Double(apply(*v))),
        Value::Single(v) => Some(Value::Double(apply(f64::from(*v)))),
        Value::SByte(_) | Value::Byte(_) | Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => {
            let v = as_i64(value)?;
            #[allow(clippy::cast_precision_loss)]
            Some(Value::Double(v as f64))
        }
        _ => None,
    }
}

fn as_str(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::SByte(v) => Some(i64::from(*v)),
        Value::Byte(v) => Some(i64::from(*v)),
        Value::Int16(v) => Some(i64::from(*v)),
        Value::Int32(v) => Some(i64::from(*v)),
        Value::Int64(v) => Some(*v),
        _ => None,
    }
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
