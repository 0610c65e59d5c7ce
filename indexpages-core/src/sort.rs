//! Sort keys for index nodes.

use indexpages_types::Value;
use std::cmp::Ordering;

/// One component of a sort key: a field value and its direction
///
/// A missing value (`None`) sorts before any present value when ascending
/// and after every present value when descending, the same way records
/// sort on missing fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub value: Option<Value>,
    pub reverse: bool,
}

impl SortKey {
    pub fn new(value: Option<Value>, reverse: bool) -> Self {
        Self { value, reverse }
    }
}

/// Split a `-field` / `+field` / `field` specifier
pub fn parse_field_spec(spec: &str) -> (&str, bool) {
    if let Some(field) = spec.strip_prefix('-') {
        (field, true)
    } else if let Some(field) = spec.strip_prefix('+') {
        (field, false)
    } else {
        (spec, false)
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Undefined(_) | Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 2,
        Value::Date(_) => 3,
        Value::Str(_) => 4,
        Value::List(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Total order over values for sorting
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Date(a), Value::Date(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        (Value::List(a), Value::List(b)) => a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| compare_values(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        (Value::Object(a), Value::Object(b)) => a.identity().cmp(&b.identity()),
        _ => rank(a).cmp(&rank(b)),
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let ordering = match (&self.value, &other.value) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => compare_values(a, b),
        };
        Some(if self.reverse { ordering.reverse() } else { ordering })
    }
}

/// Compare two composite sort keys component by component
pub fn compare_sort_keys(a: &[SortKey], b: &[SortKey]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.partial_cmp(y).unwrap_or(Ordering::Equal))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_spec() {
        assert_eq!(parse_field_spec("-key"), ("key", true));
        assert_eq!(parse_field_spec("+key"), ("key", false));
        assert_eq!(parse_field_spec("key"), ("key", false));
    }

    #[test]
    fn test_missing_sorts_first() {
        let missing = SortKey::new(None, false);
        let present = SortKey::new(Some(Value::from("a")), false);
        assert!(missing < present);
    }

    #[test]
    fn test_reverse() {
        let a = SortKey::new(Some(Value::from("2019")), true);
        let b = SortKey::new(Some(Value::from("2020")), true);
        assert!(b < a);
        assert!(SortKey::new(None, true) > a);
    }

    #[test]
    fn test_sort_nodes_by_composite_key() {
        let mut keys = vec![
            vec![SortKey::new(Some(Value::from("2019")), true), SortKey::new(None, false)],
            vec![SortKey::new(Some(Value::from("2020")), true), SortKey::new(Some(Value::Int(2)), false)],
            vec![SortKey::new(Some(Value::from("2020")), true), SortKey::new(Some(Value::Int(1)), false)],
        ];
        keys.sort_by(|a, b| compare_sort_keys(a, b));
        let firsts: Vec<_> = keys
            .iter()
            .map(|k| (k[0].value.clone().unwrap().render(), k[1].value.clone().map(|v| v.render())))
            .collect();
        assert_eq!(
            firsts,
            vec![
                ("2020".to_string(), Some("1".to_string())),
                ("2020".to_string(), Some("2".to_string())),
                ("2019".to_string(), None),
            ]
        );
    }
}
