//! Threshold rule evaluation.
//!
//! Rules are stored unordered; evaluation scans them in a priority order so
//! that the tightest satisfied bound wins:
//!
//! 1. Lower-bound rules (`=`, `>=`, `>`) by descending threshold.
//! 2. Upper-bound rules (`<=`, `<`) by ascending threshold.
//!
//! At equal thresholds `=` comes before `>=` before `>`, and `<=` before `<`.
//! Rules that are still tied keep their stored order.

use common::{ColorRule, NO_DATA_COLOR, Operator};
use std::cmp::Ordering;
use tracing::trace;

/// Rank of an operator among rules sharing a threshold; lower is checked first.
fn tie_rank(operator: Operator) -> u8 {
    match operator {
        Operator::Eq => 0,
        Operator::Ge => 1,
        Operator::Gt => 2,
        Operator::Le => 0,
        Operator::Lt => 1,
    }
}

fn priority(a: &ColorRule, b: &ColorRule) -> Ordering {
    match (a.operator.is_lower_bound(), b.operator.is_lower_bound()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => b
            .value
            .total_cmp(&a.value)
            .then_with(|| tie_rank(a.operator).cmp(&tie_rank(b.operator))),
        (false, false) => a
            .value
            .total_cmp(&b.value)
            .then_with(|| tie_rank(a.operator).cmp(&tie_rank(b.operator))),
    }
}

/// Returns the rules in the order they are checked.
pub fn priority_order(rules: &[ColorRule]) -> Vec<&ColorRule> {
    let mut ordered: Vec<&ColorRule> = rules.iter().collect();
    // stable: fully tied rules keep their stored order
    ordered.sort_by(|a, b| priority(a, b));
    ordered
}

/// Returns the first rule, in priority order, satisfied by `value`.
pub fn matching_rule(value: f64, rules: &[ColorRule]) -> Option<&ColorRule> {
    priority_order(rules).into_iter().find(|rule| rule.matches(value))
}

/// Returns the color of the rule that applies to `value`, or the no-data
/// gray if none does.
pub fn evaluate(value: f64, rules: &[ColorRule]) -> String {
    match matching_rule(value, rules) {
        Some(rule) => {
            trace!(value, rule = %rule.id, "Rule matched");
            rule.color.clone()
        }
        None => {
            trace!(value, "No rule matched");
            NO_DATA_COLOR.to_string()
        }
    }
}
