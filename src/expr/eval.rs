//! Tree-walking interpreter for parsed expressions

use super::parser::{BinaryOp, Expr, UnaryOp};
use super::value::Value;
use super::ExprError;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub(crate) struct Interpreter<'a> {
    env: &'a BTreeMap<String, Value>,
    /// Macro loop variables, innermost last
    locals: Vec<(String, Value)>,
}

fn no_overload(function: &str, args: &[&Value]) -> ExprError {
    ExprError::NoOverload {
        function: function.to_string(),
        args: args.iter().map(|v| v.type_name()).collect::<Vec<_>>().join(", "),
    }
}

fn expect_bool(function: &str, value: Value) -> Result<bool, ExprError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(no_overload(function, &[&other])),
    }
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(env: &'a BTreeMap<String, Value>) -> Self {
        Self {
            env,
            locals: Vec::new(),
        }
    }

    pub(crate) fn eval(&mut self, expr: &Expr) -> Result<Value, ExprError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => self.lookup(name),
            Expr::Select { operand, field } => {
                let operand = self.eval(operand)?;
                select(operand, field)
            }
            Expr::Index { operand, index } => {
                let operand = self.eval(operand)?;
                let index = self.eval(index)?;
                index_value(operand, index)
            }
            Expr::Call { target, function, args } => self.call(target.as_deref(), function, args),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                unary(*op, value)
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, lhs, rhs)
            }
            Expr::And(lhs, rhs) => self.logical(lhs, rhs, false),
            Expr::Or(lhs, rhs) => self.logical(lhs, rhs, true),
            Expr::Conditional { condition, then, otherwise } => {
                let condition = self.eval(condition)?;
                if expect_bool("_?_:_", condition)? {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::List(items) => items.iter().map(|item| self.eval(item)).collect::<Result<_, _>>().map(Value::List),
            Expr::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    let key = match self.eval(key)? {
                        Value::String(key) => key,
                        other => return Err(no_overload("{_:_}", &[&other])),
                    };
                    let value = self.eval(value)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, ExprError> {
        if let Some((_, value)) = self.locals.iter().rev().find(|(local, _)| local == name) {
            return Ok(value.clone());
        }
        self.env
            .get(name)
            .cloned()
            .ok_or_else(|| ExprError::UnknownIdentifier(name.to_string()))
    }

    /// `&&` and `||` where a deciding operand wins over an error on the other side
    fn logical(&mut self, lhs: &Expr, rhs: &Expr, deciding: bool) -> Result<Value, ExprError> {
        let name = if deciding { "_||_" } else { "_&&_" };
        let lhs = self.eval(lhs).and_then(|v| expect_bool(name, v));
        if lhs == Ok(deciding) {
            return Ok(Value::Bool(deciding));
        }
        let rhs = self.eval(rhs).and_then(|v| expect_bool(name, v));
        if rhs == Ok(deciding) {
            return Ok(Value::Bool(deciding));
        }
        lhs?;
        rhs?;
        Ok(Value::Bool(!deciding))
    }

    fn call(&mut self, target: Option<&Expr>, function: &str, args: &[Expr]) -> Result<Value, ExprError> {
        match (target, function) {
            (None, "has") => return self.has(args),
            (Some(target), "all" | "exists" | "exists_one" | "map" | "filter") => {
                return self.comprehension(target, function, args)
            }
            _ => {}
        }

        let mut values = Vec::with_capacity(args.len() + 1);
        if let Some(target) = target {
            values.push(self.eval(target)?);
        }
        for arg in args {
            values.push(self.eval(arg)?);
        }
        call_function(function, values)
    }

    fn has(&mut self, args: &[Expr]) -> Result<Value, ExprError> {
        let [Expr::Select { operand, field }] = args else {
            return Err(ExprError::Invalid("has() requires a field selection argument".into()));
        };
        match self.eval(operand)? {
            Value::Map(map) => Ok(Value::Bool(map.contains_key(field))),
            other => Err(no_overload("has", &[&other])),
        }
    }

    fn comprehension(&mut self, target: &Expr, function: &str, args: &[Expr]) -> Result<Value, ExprError> {
        let (variable, rest) = match args {
            [Expr::Ident(variable), rest @ ..] if !rest.is_empty() && rest.len() <= 2 => (variable, rest),
            _ => {
                return Err(ExprError::Invalid(format!(
                    "{function}() requires a variable name and an expression"
                )))
            }
        };
        if rest.len() == 2 && function != "map" {
            return Err(ExprError::Invalid(format!("{function}() takes exactly two arguments")));
        }

        let items = match self.eval(target)? {
            Value::List(items) => items,
            Value::Map(map) => map.into_keys().map(Value::String).collect(),
            other => return Err(no_overload(function, &[&other])),
        };

        let mut matched = 0usize;
        let mut output = Vec::new();
        for item in items {
            self.locals.push((variable.clone(), item.clone()));
            let result = self.comprehension_step(function, rest, item);
            self.locals.pop();
            match result? {
                Step::Keep(value) => output.push(value),
                Step::Matched => matched += 1,
                Step::Skip => {}
                Step::Done(value) => return Ok(value),
            }
        }

        Ok(match function {
            "all" => Value::Bool(true),
            "exists" => Value::Bool(false),
            "exists_one" => Value::Bool(matched == 1),
            _ => Value::List(output),
        })
    }

    fn comprehension_step(&mut self, function: &str, rest: &[Expr], item: Value) -> Result<Step, ExprError> {
        match (function, rest) {
            ("all", [predicate]) => {
                let keep = expect_bool(function, self.eval(predicate)?)?;
                Ok(if keep { Step::Skip } else { Step::Done(Value::Bool(false)) })
            }
            ("exists", [predicate]) => {
                let found = expect_bool(function, self.eval(predicate)?)?;
                Ok(if found { Step::Done(Value::Bool(true)) } else { Step::Skip })
            }
            ("exists_one", [predicate]) => {
                let found = expect_bool(function, self.eval(predicate)?)?;
                Ok(if found { Step::Matched } else { Step::Skip })
            }
            ("filter", [predicate]) => {
                let keep = expect_bool(function, self.eval(predicate)?)?;
                Ok(if keep { Step::Keep(item) } else { Step::Skip })
            }
            ("map", [transform]) => Ok(Step::Keep(self.eval(transform)?)),
            ("map", [predicate, transform]) => {
                if expect_bool(function, self.eval(predicate)?)? {
                    Ok(Step::Keep(self.eval(transform)?))
                } else {
                    Ok(Step::Skip)
                }
            }
            _ => Err(ExprError::Invalid(format!("unsupported use of {function}()"))),
        }
    }
}

enum Step {
    Keep(Value),
    Matched,
    Skip,
    Done(Value),
}

fn select(operand: Value, field: &str) -> Result<Value, ExprError> {
    match operand {
        Value::Map(mut map) => map
            .remove(field)
            .ok_or_else(|| ExprError::NoSuchKey(field.to_string())),
        other => Err(ExprError::NoOverload {
            function: format!(".{field}"),
            args: other.type_name().to_string(),
        }),
    }
}

fn index_value(operand: Value, index: Value) -> Result<Value, ExprError> {
    match (operand, index) {
        (Value::List(mut items), Value::Int(i)) => {
            let size = items.len();
            usize::try_from(i)
                .ok()
                .filter(|&idx| idx < size)
                .map(|idx| items.swap_remove(idx))
                .ok_or(ExprError::IndexOutOfRange { index: i, size })
        }
        (Value::Map(mut map), Value::String(key)) => map.remove(&key).ok_or(ExprError::NoSuchKey(key)),
        (operand, index) => Err(no_overload("_[_]", &[&operand, &index])),
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, ExprError> {
    match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| ExprError::Overflow("-_".into())),
        (UnaryOp::Neg, Value::Double(d)) => Ok(Value::Double(-d)),
        (UnaryOp::Not, other) => Err(no_overload("!_", &[&other])),
        (UnaryOp::Neg, other) => Err(no_overload("-_", &[&other])),
    }
}

fn checked(op: BinaryOp, result: Option<i64>) -> Result<Value, ExprError> {
    result
        .map(Value::Int)
        .ok_or_else(|| ExprError::Overflow(op.symbol().to_string()))
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
        (Value::Double(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    use Value::*;

    match op {
        BinaryOp::Eq => return Ok(Bool(lhs.loose_eq(&rhs))),
        BinaryOp::Ne => return Ok(Bool(!lhs.loose_eq(&rhs))),
        BinaryOp::In => {
            return match (&lhs, &rhs) {
                (_, List(items)) => Ok(Bool(items.iter().any(|item| item.loose_eq(&lhs)))),
                (String(key), Map(map)) => Ok(Bool(map.contains_key(key))),
                _ => Err(no_overload("@in", &[&lhs, &rhs])),
            }
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let Some(ordering) = compare(&lhs, &rhs) else {
                // NaN compares false against everything
                if matches!((&lhs, &rhs), (Double(_) | Int(_), Double(_) | Int(_))) {
                    return Ok(Bool(false));
                }
                return Err(no_overload(op.symbol(), &[&lhs, &rhs]));
            };
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            return Ok(Bool(result));
        }
        _ => {}
    }

    match (op, lhs, rhs) {
        (BinaryOp::Add, Int(a), Int(b)) => checked(op, a.checked_add(b)),
        (BinaryOp::Sub, Int(a), Int(b)) => checked(op, a.checked_sub(b)),
        (BinaryOp::Mul, Int(a), Int(b)) => checked(op, a.checked_mul(b)),
        (BinaryOp::Div, Int(_), Int(0)) => Err(ExprError::DivisionByZero),
        (BinaryOp::Div, Int(a), Int(b)) => checked(op, a.checked_div(b)),
        (BinaryOp::Mod, Int(_), Int(0)) => Err(ExprError::ModulusByZero),
        (BinaryOp::Mod, Int(a), Int(b)) => checked(op, a.checked_rem(b)),
        (BinaryOp::Add, Double(a), Double(b)) => Ok(Double(a + b)),
        (BinaryOp::Sub, Double(a), Double(b)) => Ok(Double(a - b)),
        (BinaryOp::Mul, Double(a), Double(b)) => Ok(Double(a * b)),
        (BinaryOp::Div, Double(a), Double(b)) => Ok(Double(a / b)),
        (BinaryOp::Add, String(a), String(b)) => Ok(String(a + &b)),
        (BinaryOp::Add, List(mut a), List(b)) => {
            a.extend(b);
            Ok(List(a))
        }
        (op, lhs, rhs) => Err(no_overload(op.symbol(), &[&lhs, &rhs])),
    }
}

fn call_function(function: &str, args: Vec<Value>) -> Result<Value, ExprError> {
    let refs: Vec<&Value> = args.iter().collect();
    let fail = || no_overload(function, &refs);

    match (function, args.as_slice()) {
        ("size", [Value::String(s)]) => Ok(Value::Int(s.chars().count() as i64)),
        ("size", [Value::List(items)]) => Ok(Value::Int(items.len() as i64)),
        ("size", [Value::Map(map)]) => Ok(Value::Int(map.len() as i64)),

        ("int", [Value::Int(i)]) => Ok(Value::Int(*i)),
        ("int", [Value::Double(d)]) => double_to_int(*d),
        ("int", [Value::String(s)]) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| ExprError::Invalid(format!("cannot convert {s:?} to int: {e}"))),

        ("double", [Value::Double(d)]) => Ok(Value::Double(*d)),
        ("double", [Value::Int(i)]) => Ok(Value::Double(*i as f64)),
        ("double", [Value::String(s)]) => s
            .trim()
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|e| ExprError::Invalid(format!("cannot convert {s:?} to double: {e}"))),

        ("string", [Value::String(s)]) => Ok(Value::String(s.clone())),
        ("string", [Value::Int(i)]) => Ok(Value::String(i.to_string())),
        ("string", [Value::Double(d)]) => Ok(Value::String(d.to_string())),
        ("string", [Value::Bool(b)]) => Ok(Value::String(b.to_string())),

        ("bool", [Value::Bool(b)]) => Ok(Value::Bool(*b)),
        ("bool", [Value::String(s)]) => match s.as_str() {
            "true" | "True" | "TRUE" | "t" | "1" => Ok(Value::Bool(true)),
            "false" | "False" | "FALSE" | "f" | "0" => Ok(Value::Bool(false)),
            _ => Err(ExprError::Invalid(format!("cannot convert {s:?} to bool"))),
        },

        ("contains", [Value::String(s), Value::String(needle)]) => Ok(Value::Bool(s.contains(needle.as_str()))),
        ("startsWith", [Value::String(s), Value::String(prefix)]) => {
            Ok(Value::Bool(s.starts_with(prefix.as_str())))
        }
        ("endsWith", [Value::String(s), Value::String(suffix)]) => Ok(Value::Bool(s.ends_with(suffix.as_str()))),
        ("matches", [Value::String(s), Value::String(pattern)]) => {
            let re = Regex::new(pattern).map_err(|e| ExprError::InvalidRegex {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            Ok(Value::Bool(re.is_match(s)))
        }

        ("size" | "int" | "double" | "string" | "bool" | "contains" | "startsWith" | "endsWith" | "matches", _) => {
            Err(fail())
        }
        _ => Err(ExprError::UnknownFunction(function.to_string())),
    }
}

fn double_to_int(d: f64) -> Result<Value, ExprError> {
    // i64::MAX as f64 rounds up to 2^63
    if !d.is_finite() || d < i64::MIN as f64 || d >= i64::MAX as f64 {
        return Err(ExprError::Overflow("int".into()));
    }
    Ok(Value::Int(d.trunc() as i64))
}
