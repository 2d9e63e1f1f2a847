mod rules;

pub use rules::{EligibilityRule, RuleOperator, StudentDataEvaluator};

use serde::{Deserialize, Serialize};

use super::domain::{ApplicationSnapshot, SubTypeCode};

/// Outcome of the per-pool eligibility gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    pub is_eligible: bool,
    pub reason: String,
}

impl EligibilityVerdict {
    pub fn eligible() -> Self {
        Self {
            is_eligible: true,
            reason: "All rules passed".to_string(),
        }
    }

    pub fn ineligible(reason: impl Into<String>) -> Self {
        Self {
            is_eligible: false,
            reason: reason.into(),
        }
    }
}

/// Evaluates a single rule against an application.
///
/// Returns `Err` with a human readable reason when the rule fails.
pub trait EligibilityEvaluator: Send + Sync {
    fn evaluate(&self, application: &ApplicationSnapshot, rule: &EligibilityRule)
        -> Result<(), String>;
}

/// Lets every rule pass; the engine's default evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveEvaluator;

impl EligibilityEvaluator for PermissiveEvaluator {
    fn evaluate(
        &self,
        _application: &ApplicationSnapshot,
        _rule: &EligibilityRule,
    ) -> Result<(), String> {
        Ok(())
    }
}

/// Applies the active rules relevant to `sub_type` (or to every sub-type) in order;
/// the first failure decides.
pub fn check_eligibility(
    application: &ApplicationSnapshot,
    sub_type: &SubTypeCode,
    rules: &[EligibilityRule],
    evaluator: &dyn EligibilityEvaluator,
) -> EligibilityVerdict {
    let applicable = rules
        .iter()
        .filter(|rule| rule.is_active)
        .filter(|rule| rule.applies_to(sub_type));

    for rule in applicable {
        if let Err(reason) = evaluator.evaluate(application, rule) {
            return EligibilityVerdict::ineligible(reason);
        }
    }

    EligibilityVerdict::eligible()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::distribution::domain::ApplicationId;
    use serde_json::{json, Map, Value};

    fn application(student_data: Value) -> ApplicationSnapshot {
        let student_data = match student_data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        ApplicationSnapshot {
            id: ApplicationId::new("app-1"),
            status: "approved".to_string(),
            scholarship_subtype_list: vec![SubTypeCode::new("nstc")],
            student_data,
            scholarship_configuration_id: None,
        }
    }

    fn rule(sub_type: Option<&str>, field: &str, operator: RuleOperator, expected: Value) -> EligibilityRule {
        EligibilityRule {
            id: format!("rule-{field}"),
            sub_type: sub_type.map(SubTypeCode::new),
            condition_field: field.to_string(),
            operator,
            expected_value: expected,
            message: format!("{field} requirement not met"),
            is_active: true,
        }
    }

    #[test]
    fn permissive_evaluator_passes_failing_conditions() {
        let app = application(json!({ "gpa": 2.0 }));
        let rules = vec![rule(None, "gpa", RuleOperator::Gte, json!(3.5))];

        let verdict = check_eligibility(&app, &SubTypeCode::new("nstc"), &rules, &PermissiveEvaluator);

        assert_eq!(verdict, EligibilityVerdict::eligible());
        assert_eq!(verdict.reason, "All rules passed");
    }

    #[test]
    fn student_data_evaluator_reports_first_failure() {
        let app = application(json!({ "gpa": 2.0, "nationality": "TW" }));
        let rules = vec![
            rule(None, "nationality", RuleOperator::Eq, json!("TW")),
            rule(Some("nstc"), "gpa", RuleOperator::Gte, json!(3.5)),
        ];

        let verdict = check_eligibility(
            &app,
            &SubTypeCode::new("NSTC"),
            &rules,
            &StudentDataEvaluator,
        );

        assert!(!verdict.is_eligible);
        assert_eq!(verdict.reason, "gpa requirement not met");
    }

    #[test]
    fn rules_for_other_sub_types_and_inactive_rules_are_skipped() {
        let app = application(json!({ "gpa": 2.0 }));
        let mut inactive = rule(None, "gpa", RuleOperator::Gte, json!(3.0));
        inactive.is_active = false;
        let rules = vec![
            rule(Some("moe_1w"), "gpa", RuleOperator::Gte, json!(3.5)),
            inactive,
        ];

        let verdict = check_eligibility(
            &app,
            &SubTypeCode::new("nstc"),
            &rules,
            &StudentDataEvaluator,
        );

        assert!(verdict.is_eligible);
    }
}
