use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::super::domain::{ApplicationSnapshot, SubTypeCode};
use super::EligibilityEvaluator;

/// Condition attached to a scholarship type, optionally scoped to one sub-type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityRule {
    pub id: String,
    #[serde(default)]
    pub sub_type: Option<SubTypeCode>,
    pub condition_field: String,
    pub operator: RuleOperator,
    #[serde(default)]
    pub expected_value: Value,
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl EligibilityRule {
    /// Generic rules apply to every sub-type.
    pub fn applies_to(&self, sub_type: &SubTypeCode) -> bool {
        match &self.sub_type {
            Some(scoped) => scoped.matches(sub_type.as_str()),
            None => true,
        }
    }

    fn failure_reason(&self) -> String {
        if self.message.trim().is_empty() {
            format!(
                "{} {} {} not satisfied",
                self.condition_field,
                self.operator.symbol(),
                self.expected_value
            )
        } else {
            self.message.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    Exists,
}

impl RuleOperator {
    pub const fn symbol(self) -> &'static str {
        match self {
            RuleOperator::Eq => "==",
            RuleOperator::Ne => "!=",
            RuleOperator::Gt => ">",
            RuleOperator::Gte => ">=",
            RuleOperator::Lt => "<",
            RuleOperator::Lte => "<=",
            RuleOperator::In => "in",
            RuleOperator::NotIn => "not in",
            RuleOperator::Contains => "contains",
            RuleOperator::Exists => "exists",
        }
    }

    fn holds(self, actual: &Value, expected: &Value) -> bool {
        match self {
            RuleOperator::Eq => loosely_equal(actual, expected),
            RuleOperator::Ne => !loosely_equal(actual, expected),
            RuleOperator::Gt => compare(actual, expected).is_some_and(|ord| ord.is_gt()),
            RuleOperator::Gte => compare(actual, expected).is_some_and(|ord| ord.is_ge()),
            RuleOperator::Lt => compare(actual, expected).is_some_and(|ord| ord.is_lt()),
            RuleOperator::Lte => compare(actual, expected).is_some_and(|ord| ord.is_le()),
            RuleOperator::In => expected
                .as_array()
                .is_some_and(|options| options.iter().any(|option| loosely_equal(actual, option))),
            RuleOperator::NotIn => expected
                .as_array()
                .map_or(true, |options| !options.iter().any(|option| loosely_equal(actual, option))),
            RuleOperator::Contains => match actual {
                Value::Array(values) => values.iter().any(|value| loosely_equal(value, expected)),
                Value::String(text) => expected
                    .as_str()
                    .is_some_and(|needle| text.to_lowercase().contains(&needle.to_lowercase())),
                _ => false,
            },
            RuleOperator::Exists => !actual.is_null(),
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    if let (Some(left), Some(right)) = (as_number(actual), as_number(expected)) {
        return (left - right).abs() < f64::EPSILON;
    }
    match (actual, expected) {
        (Value::String(left), Value::String(right)) => left.trim().eq_ignore_ascii_case(right.trim()),
        _ => actual == expected,
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<std::cmp::Ordering> {
    let left = as_number(actual)?;
    let right = as_number(expected)?;
    left.partial_cmp(&right)
}

/// Evaluates rule conditions against the application's student data.
///
/// A field missing from the student data fails every operator except `ne` and `not_in`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StudentDataEvaluator;

impl EligibilityEvaluator for StudentDataEvaluator {
    fn evaluate(
        &self,
        application: &ApplicationSnapshot,
        rule: &EligibilityRule,
    ) -> Result<(), String> {
        let actual = application
            .student_data
            .get(&rule.condition_field)
            .unwrap_or(&Value::Null);

        let absent_allowed = matches!(rule.operator, RuleOperator::Ne | RuleOperator::NotIn);
        if actual.is_null() && !absent_allowed {
            return Err(rule.failure_reason());
        }

        if rule.operator.holds(actual, &rule.expected_value) {
            Ok(())
        } else {
            Err(rule.failure_reason())
        }
    }
}
