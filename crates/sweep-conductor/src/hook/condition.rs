//! Hook condition grammar.
//!
//! ```text
//! condition := "" | clause ( "&&" clause )*
//! clause    := variable op integer
//! op        := ">=" | "<=" | "==" | ">" | "<"
//! ```
//!
//! Evaluation is fail-closed: a clause that cannot be parsed or names an
//! unknown counter makes the whole condition `false`, so a hook with a
//! broken condition never fires.

use crate::error::ConditionError;
use crate::state::stats::RunStatistics;

/// Operators in the order they are searched for. Two-character operators
/// come first so `>=` is never split as `>` followed by `=5`.
const OPERATORS: [(&str, Op); 5] = [
    (">=", Op::Ge),
    ("<=", Op::Le),
    ("==", Op::Eq),
    (">", Op::Gt),
    ("<", Op::Lt),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Ge,
    Le,
    Eq,
    Gt,
    Lt,
}

impl Op {
    fn apply(self, lhs: i128, rhs: i128) -> bool {
        match self {
            Op::Ge => lhs >= rhs,
            Op::Le => lhs <= rhs,
            Op::Eq => lhs == rhs,
            Op::Gt => lhs > rhs,
            Op::Lt => lhs < rhs,
        }
    }
}

/// Evaluate `condition` against `stats`, reporting failures as a warning.
pub fn evaluate(condition: &str, stats: &RunStatistics) -> bool {
    match try_evaluate(condition, stats) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(condition, error = %e, "hook condition treated as false");
            false
        }
    }
}

/// Evaluate `condition`, surfacing the first parse error.
pub fn try_evaluate(condition: &str, stats: &RunStatistics) -> Result<bool, ConditionError> {
    if condition.trim().is_empty() {
        return Ok(true);
    }
    // Parse every clause before answering so a malformed trailing clause is
    // not hidden by an earlier false one.
    let mut result = true;
    for clause in condition.split("&&") {
        if !eval_clause(clause, stats)? {
            result = false;
        }
    }
    Ok(result)
}

fn eval_clause(clause: &str, stats: &RunStatistics) -> Result<bool, ConditionError> {
    let clause = clause.trim();
    if clause.is_empty() {
        return Err(ConditionError::EmptyClause);
    }

    let (op_str, op) = OPERATORS
        .iter()
        .find(|(s, _)| clause.contains(s))
        .copied()
        .ok_or_else(|| ConditionError::MissingOperator(clause.to_string()))?;

    let (lhs, rhs) = clause
        .split_once(op_str)
        .ok_or_else(|| ConditionError::MissingOperator(clause.to_string()))?;
    let variable = lhs.trim();
    let literal = rhs.trim();

    if variable.is_empty() {
        return Err(ConditionError::MissingVariable(clause.to_string()));
    }
    let value = stats
        .field(variable)
        .ok_or_else(|| ConditionError::UnknownVariable(variable.to_string()))?;
    let expected: i64 = literal
        .parse()
        .map_err(|_| ConditionError::NotAnInteger(literal.to_string()))?;

    Ok(op.apply(i128::from(value), i128::from(expected)))
}
