// Query filtering over JSON records

use serde_json::Value;
use std::cmp::Ordering;

/// Filter for querying records
#[derive(Debug, Clone)]
pub struct Filter {
    /// Field name to filter on
    pub field: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Value to compare against
    pub value: IndexValue,
}

/// Value types that can be compared in a filter
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    String(String),
    Int(i64),
    Bool(bool),
}

/// Comparison operators for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,       // ==
    Ne,       // !=
    Gt,       // >
    Lt,       // <
    Gte,      // >=
    Lte,      // <=
    Contains, // substring, or element of an array field
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<IndexValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// Check whether a record satisfies this filter
    ///
    /// A missing field only satisfies `Ne`.
    pub fn matches(&self, record: &Value) -> bool {
        let Some(field) = record.get(&self.field) else {
            return self.op == FilterOp::Ne;
        };

        match self.op {
            FilterOp::Contains => self.contains(field),
            op => match self.value.compare(field) {
                Some(ordering) => op.accepts(ordering),
                // Type mismatch: values are unequal and unordered
                None => op == FilterOp::Ne,
            },
        }
    }

    fn contains(&self, field: &Value) -> bool {
        match (field, &self.value) {
            (Value::String(s), IndexValue::String(needle)) => s.contains(needle.as_str()),
            (Value::Array(items), value) => items
                .iter()
                .any(|item| value.compare(item) == Some(Ordering::Equal)),
            _ => false,
        }
    }
}

/// Check whether a record satisfies every filter
pub fn matches_all(filters: &[Filter], record: &Value) -> bool {
    filters.iter().all(|filter| filter.matches(record))
}

impl IndexValue {
    /// Compare a record's field value against this one (field `op` self)
    fn compare(&self, field: &Value) -> Option<Ordering> {
        match (field, self) {
            (Value::String(s), IndexValue::String(v)) => Some(s.as_str().cmp(v.as_str())),
            (Value::Number(n), IndexValue::Int(v)) => n.as_i64().map(|n| n.cmp(v)),
            (Value::Bool(b), IndexValue::Bool(v)) => Some(b.cmp(v)),
            _ => None,
        }
    }
}

impl FilterOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Ne => ordering != Ordering::Equal,
            FilterOp::Gt => ordering == Ordering::Greater,
            FilterOp::Lt => ordering == Ordering::Less,
            FilterOp::Gte => ordering != Ordering::Less,
            FilterOp::Lte => ordering != Ordering::Greater,
            FilterOp::Contains => false,
        }
    }
}

impl From<&str> for IndexValue {
    fn from(value: &str) -> Self {
        IndexValue::String(value.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(value: String) -> Self {
        IndexValue::String(value)
    }
}

impl From<i64> for IndexValue {
    fn from(value: i64) -> Self {
        IndexValue::Int(value)
    }
}

impl From<bool> for IndexValue {
    fn from(value: bool) -> Self {
        IndexValue::Bool(value)
    }
}

impl std::fmt::Display for IndexValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexValue::String(s) => write!(f, "{}", s),
            IndexValue::Int(i) => write!(f, "{}", i),
            IndexValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterOp::Eq => write!(f, "="),
            FilterOp::Ne => write!(f, "!="),
            FilterOp::Gt => write!(f, ">"),
            FilterOp::Lt => write!(f, "<"),
            FilterOp::Gte => write!(f, ">="),
            FilterOp::Lte => write!(f, "<="),
            FilterOp::Contains => write!(f, "CONTAINS"),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}
