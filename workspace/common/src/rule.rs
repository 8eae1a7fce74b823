use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a threshold rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "=")]
    Eq,
}

impl Operator {
    /// All operators in the order the rule editor lists them.
    pub const ALL: [Operator; 5] = [
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
        Operator::Eq,
    ];

    /// Returns true if `value <op> threshold` holds.
    ///
    /// `=` is an exact floating point comparison. NaN never satisfies any operator.
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Lt => value < threshold,
            Operator::Le => value <= threshold,
            Operator::Gt => value > threshold,
            Operator::Ge => value >= threshold,
            Operator::Eq => value == threshold,
        }
    }

    /// Returns true for operators that bound the value from below (`>`, `>=`)
    /// or pin it (`=`).
    pub fn is_lower_bound(self) -> bool {
        matches!(self, Operator::Gt | Operator::Ge | Operator::Eq)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Eq => "=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Error returned when an operator symbol cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOperatorError(pub String);

impl fmt::Display for ParseOperatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operator '{}', expected one of <, <=, >, >=, =", self.0)
    }
}

impl std::error::Error for ParseOperatorError {}

impl FromStr for Operator {
    type Err = ParseOperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" | "lt" => Ok(Operator::Lt),
            "<=" | "le" => Ok(Operator::Le),
            ">" | "gt" => Ok(Operator::Gt),
            ">=" | "ge" => Ok(Operator::Ge),
            "=" | "==" | "eq" => Ok(Operator::Eq),
            other => Err(ParseOperatorError(other.to_string())),
        }
    }
}

/// A threshold rule mapping a measurement to a display color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRule {
    pub id: String,
    pub operator: Operator,
    pub value: f64,
    /// Hex color, e.g. `#22c55e`.
    pub color: String,
}

impl ColorRule {
    pub fn new(id: impl Into<String>, operator: Operator, value: f64, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            operator,
            value,
            color: color.into(),
        }
    }

    /// Returns true if this rule is satisfied by `value`.
    pub fn matches(&self, value: f64) -> bool {
        self.operator.holds(value, self.value)
    }
}
