//! Built-in filters and string formatting helpers.
//!
//! Filters are applied with `value|name(args)`. Method calls such as
//! `value.upper()` dispatch here too, with the receiver as the value.

use chrono::NaiveDate;
use indexpages_types::{EvalError, Pad, Value};

pub(crate) fn apply(name: &str, value: Value, args: &[Value], pad: &dyn Pad) -> Result<Value, EvalError> {
    match name {
        "upper" => Ok(map_str(value, |s| s.to_uppercase())),
        "lower" => Ok(map_str(value, |s| s.to_lowercase())),
        "string" => Ok(if value.is_undefined() {
            value
        } else {
            Value::from(value.render())
        }),
        "int" => Ok(Value::Int(to_int(&value))),
        "length" | "count" => match &value {
            Value::List(items) => Ok(Value::Int(items.len() as i64)),
            Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
            Value::Undefined(_) => Ok(Value::Int(0)),
            other => Err(type_error(name, "a list or string", other)),
        },
        "first" => Ok(list_arg(name, &value)?
            .first()
            .cloned()
            .unwrap_or_else(|| Value::undefined("first of empty list"))),
        "last" => Ok(list_arg(name, &value)?
            .last()
            .cloned()
            .unwrap_or_else(|| Value::undefined("last of empty list"))),
        "join" => {
            let sep = args.first().map(Value::render).unwrap_or_default();
            let parts: Vec<String> = list_arg(name, &value)?.iter().map(Value::render).collect();
            Ok(Value::from(parts.join(&sep)))
        }
        "default" => {
            if value.is_undefined() || matches!(value, Value::Null) {
                Ok(args.first().cloned().unwrap_or_else(|| Value::from("")))
            } else {
                Ok(value)
            }
        }
        "dateformat" => {
            let fmt = args.first().map(Value::render).unwrap_or_else(|| "%Y-%m-%d".to_string());
            match value {
                Value::Undefined(_) | Value::Null => Ok(Value::undefined("no date to format")),
                Value::Date(d) => Ok(Value::from(d.format(&fmt).to_string())),
                Value::Str(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map(|d| Value::from(d.format(&fmt).to_string()))
                    .map_err(|e| EvalError::Filter {
                        filter: name.to_string(),
                        message: format!("'{}' is not a date: {}", s, e),
                    }),
                other => Err(type_error(name, "a date", &other)),
            }
        }
        "format" => match value {
            Value::Str(fmt) => printf_format(&fmt, args).map(Value::from),
            other => Err(type_error(name, "a format string", &other)),
        },
        "selectattr" | "rejectattr" => {
            let attr = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| EvalError::Filter {
                    filter: name.to_string(),
                    message: "attribute name required".to_string(),
                })?
                .to_string();
            let wanted = args.get(1);
            let select = name == "selectattr";
            let mut out = Vec::new();
            for item in list_arg(name, &value)? {
                let attr_value = match item {
                    Value::Object(obj) => obj.clone().attr(&attr, pad)?,
                    _ => Value::undefined("not an object"),
                };
                let hit = match wanted {
                    Some(wanted) => &attr_value == wanted,
                    None => attr_value.is_truthy(),
                };
                if hit == select {
                    out.push(item.clone());
                }
            }
            Ok(Value::List(out))
        }
        _ => Err(EvalError::UnknownFilter(name.to_string())),
    }
}

fn map_str(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::Undefined(_) => value,
        other => Value::from(f(&other.render())),
    }
}

fn to_int(value: &Value) -> i64 {
    match value {
        Value::Int(i) => *i,
        Value::Bool(b) => i64::from(*b),
        Value::Str(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn list_arg<'v>(filter: &str, value: &'v Value) -> Result<&'v [Value], EvalError> {
    match value {
        Value::List(items) => Ok(items),
        Value::Undefined(_) => Ok(&[]),
        other => Err(type_error(filter, "a list", other)),
    }
}

fn type_error(filter: &str, expected: &str, got: &Value) -> EvalError {
    EvalError::Filter {
        filter: filter.to_string(),
        message: format!("expected {}, got {}", expected, got.type_name()),
    }
}

/// `%s`, `%d`, `%0Nd` and `%%` substitution
pub(crate) fn printf_format(fmt: &str, args: &[Value]) -> Result<String, EvalError> {
    let mut out = String::with_capacity(fmt.len());
    let mut args = args.iter();
    let mut chars = fmt.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let mut spec = String::new();
        while let Some(&d) = chars.peek() {
            if d.is_ascii_digit() {
                spec.push(d);
                chars.next();
            } else {
                break;
            }
        }
        let conv = chars.next().ok_or_else(|| format_error("incomplete format"))?;
        let arg = args.next().ok_or_else(|| format_error("not enough arguments"))?;
        out.push_str(&apply_spec(&spec, conv, arg)?);
    }
    Ok(out)
}

/// `{}`, `{N}`, `{:0Nd}` and `{{`/`}}` substitution
pub(crate) fn brace_format(fmt: &str, args: &[Value]) -> Result<String, EvalError> {
    let mut out = String::with_capacity(fmt.len());
    let mut next_auto = 0usize;
    let mut chars = fmt.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => field.push(ch),
                        None => return Err(format_error("unterminated '{' in format string")),
                    }
                }
                let (index, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                let index = if index.is_empty() {
                    next_auto += 1;
                    next_auto - 1
                } else {
                    index
                        .parse::<usize>()
                        .map_err(|_| format_error("invalid field index"))?
                };
                let arg = args.get(index).ok_or_else(|| format_error("not enough arguments"))?;
                let (width, conv) = match spec.strip_suffix('d') {
                    Some(width) => (width, 'd'),
                    None => (spec, 's'),
                };
                out.push_str(&apply_spec(width, conv, arg)?);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn apply_spec(width: &str, conv: char, arg: &Value) -> Result<String, EvalError> {
    let zero_pad = width.starts_with('0');
    let width: usize = if width.is_empty() {
        0
    } else {
        width.parse().map_err(|_| format_error("invalid width"))?
    };
    let text = match conv {
        's' => arg.render(),
        'd' => match arg {
            Value::Int(i) => i.to_string(),
            other => return Err(format_error(&format!("%d requires an int, got {}", other.type_name()))),
        },
        other => return Err(format_error(&format!("unsupported conversion '{}'", other))),
    };
    Ok(if zero_pad {
        format!("{:0>width$}", text, width = width)
    } else {
        format!("{:>width$}", text, width = width)
    })
}

fn format_error(message: &str) -> EvalError {
    EvalError::Filter {
        filter: "format".to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printf_format() {
        let args = [Value::from("source-id")];
        assert_eq!(printf_format("custom slug/%s", &args).unwrap(), "custom slug/source-id");
        assert_eq!(printf_format("%03d%%", &[Value::Int(7)]).unwrap(), "007%");
        assert!(printf_format("%s %s", &args).is_err());
    }

    #[test]
    fn test_brace_format() {
        assert_eq!(brace_format("{:04d}", &[Value::Int(2020)]).unwrap(), "2020");
        assert_eq!(brace_format("{:02d}", &[Value::Int(3)]).unwrap(), "03");
        assert_eq!(
            brace_format("{1}-{0} {{x}}", &[Value::from("a"), Value::from("b")]).unwrap(),
            "b-a {x}"
        );
        assert!(brace_format("{:d}", &[Value::from("x")]).is_err());
    }
}
