use crate::ast::{CompareOp, Expr, ExprKind, Literal};
use crate::filters;
use indexpages_types::{EvalError, Scope, Value};

/// Tree-walking evaluator
///
/// Local bindings shadow the scope's names. `list.filter(pred)` binds
/// `F` to each element while evaluating `pred`.
pub struct Evaluator<'a, 's> {
    scope: &'a Scope<'s>,
    locals: Vec<(String, Value)>,
}

impl<'a, 's> Evaluator<'a, 's> {
    pub fn new(scope: &'a Scope<'s>) -> Self {
        Self {
            scope,
            locals: Vec::new(),
        }
    }

    fn with_local(&self, name: &str, value: Value) -> Self {
        let mut locals = self.locals.clone();
        locals.push((name.to_string(), value));
        Self {
            scope: self.scope,
            locals,
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        if let Some((_, value)) = self.locals.iter().rev().find(|(n, _)| n == name) {
            return Ok(value.clone());
        }
        match name {
            "this" | "item" => Ok(self
                .scope
                .lookup(name)
                .unwrap_or_else(|| Value::undefined(format!("'{}' is not bound here", name)))),
            _ => self
                .scope
                .lookup(name)
                .ok_or_else(|| EvalError::UndefinedVariable(name.to_string())),
        }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(match lit {
                Literal::Int(i) => Value::Int(*i),
                Literal::Str(s) => Value::from(s.as_str()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::None => Value::Null,
            }),
            ExprKind::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            ExprKind::Name(name) => self.lookup(name),
            ExprKind::Attr { target, name } => {
                let target = self.eval(target)?;
                self.get_attr(target, name)
            }
            ExprKind::Index { target, index } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                self.get_item(target, index)
            }
            ExprKind::Method { target, name, args } => {
                let target = self.eval(target)?;
                self.call_method(target, name, args)
            }
            ExprKind::Filter { target, name, args } => {
                let target = self.eval(target)?;
                let args = self.eval_args(args)?;
                filters::apply(name, target, &args, self.scope.pad)
            }
            ExprKind::Concat(lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                Ok(Value::from(format!("{}{}", lhs.render(), rhs.render())))
            }
            ExprKind::Compare { op, lhs, rhs } => {
                let equal = self.eval(lhs)? == self.eval(rhs)?;
                Ok(Value::Bool(match op {
                    CompareOp::Eq => equal,
                    CompareOp::NotEq => !equal,
                }))
            }
            ExprKind::And(lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                if lhs.is_truthy() {
                    self.eval(rhs)
                } else {
                    Ok(lhs)
                }
            }
            ExprKind::Or(lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                if lhs.is_truthy() {
                    Ok(lhs)
                } else {
                    self.eval(rhs)
                }
            }
            ExprKind::Not(operand) => Ok(Value::Bool(!self.eval(operand)?.is_truthy())),
        }
    }

    fn eval_args(&self, args: &[Expr]) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn get_attr(&self, target: Value, name: &str) -> Result<Value, EvalError> {
        match target {
            Value::Undefined(_) => Ok(target),
            Value::Object(obj) => obj.attr(name, self.scope.pad),
            Value::Date(d) => {
                use chrono::Datelike;
                match name {
                    "year" => Ok(Value::Int(i64::from(d.year()))),
                    "month" => Ok(Value::Int(i64::from(d.month()))),
                    "day" => Ok(Value::Int(i64::from(d.day()))),
                    _ => Err(no_attribute(&target, name)),
                }
            }
            other => Err(no_attribute(&other, name)),
        }
    }

    fn get_item(&self, target: Value, index: Value) -> Result<Value, EvalError> {
        if target.is_undefined() {
            return Ok(target);
        }
        match (target, index) {
            (Value::List(items), Value::Int(i)) => {
                let len = items.len() as i64;
                let idx = if i < 0 { len + i } else { i };
                Ok(usize::try_from(idx)
                    .ok()
                    .and_then(|idx| items.get(idx))
                    .cloned()
                    .unwrap_or_else(|| Value::undefined(format!("index {} out of range", i))))
            }
            (target @ Value::Object(_), Value::Str(name)) => self.get_attr(target, &name),
            (target, index) => Err(EvalError::Type(format!(
                "cannot index {} with {}",
                target.type_name(),
                index.type_name()
            ))),
        }
    }

    fn call_method(&self, target: Value, name: &str, args: &[Expr]) -> Result<Value, EvalError> {
        match (name, &target) {
            ("filter", Value::List(items)) => {
                let [predicate] = args else {
                    return Err(EvalError::Type("filter() takes exactly one argument".to_string()));
                };
                let mut out = Vec::new();
                for item in items {
                    if self.with_local("F", item.clone()).eval(predicate)?.is_truthy() {
                        out.push(item.clone());
                    }
                }
                Ok(Value::List(out))
            }
            ("format", Value::Str(fmt)) => {
                let args = self.eval_args(args)?;
                filters::brace_format(fmt, &args).map(Value::from)
            }
            _ => {
                let args = self.eval_args(args)?;
                filters::apply(name, target, &args, self.scope.pad)
            }
        }
    }
}

fn no_attribute(target: &Value, name: &str) -> EvalError {
    EvalError::NoAttribute {
        type_name: target.type_name().to_string(),
        name: name.to_string(),
    }
}
