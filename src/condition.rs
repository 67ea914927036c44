//! Feed conditional logic: "process this feed if all/any of these rules match".
use crate::form::{Entry, FieldResolver, Form};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicType {
    #[default]
    All,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Is,
    #[serde(rename = "isnot")]
    IsNot,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionRule {
    pub field_id: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: String,
}

impl ConditionRule {
    fn matches(&self, actual: &str) -> bool {
        let expected = self.value.as_str();
        match self.operator {
            Operator::Is => actual.eq_ignore_ascii_case(expected),
            Operator::IsNot => !actual.eq_ignore_ascii_case(expected),
            Operator::Contains => actual.contains(expected),
            Operator::StartsWith => actual.starts_with(expected),
            Operator::EndsWith => actual.ends_with(expected),
            Operator::GreaterThan => compare_numbers(actual, expected, |a, b| a > b),
            Operator::LessThan => compare_numbers(actual, expected, |a, b| a < b),
        }
    }
}

fn compare_numbers(actual: &str, expected: &str, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => cmp(a, b),
        _ => false,
    }
}

/// Gate evaluated before a feed runs. Disabled or rule-less conditions always pass.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedCondition {
    pub enabled: bool,
    pub logic_type: LogicType,
    pub rules: Vec<ConditionRule>,
}

impl FeedCondition {
    pub fn is_met(&self, form: &Form, entry: &Entry, resolver: &dyn FieldResolver) -> bool {
        if !self.enabled || self.rules.is_empty() {
            return true;
        }

        let mut results = self
            .rules
            .iter()
            .map(|rule| rule.matches(&resolver.field_value(form, entry, &rule.field_id)));

        match self.logic_type {
            LogicType::All => results.all(|matched| matched),
            LogicType::Any => results.any(|matched| matched),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormFieldResolver;

    fn form() -> Form {
        serde_json::from_value(serde_json::json!({
            "id": 2,
            "fields": [
                { "id": 1, "type": "email" },
                { "id": 2, "type": "select" },
                { "id": 3, "type": "number" }
            ]
        }))
        .unwrap()
    }

    fn entry() -> Entry {
        Entry {
            id: 9,
            form_id: 2,
            values: [("1", "ada@example.com"), ("2", "Newsletter"), ("3", "42")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Entry::default()
        }
    }

    fn rule(field_id: &str, operator: Operator, value: &str) -> ConditionRule {
        ConditionRule {
            field_id: field_id.to_string(),
            operator,
            value: value.to_string(),
        }
    }

    fn condition(logic_type: LogicType, rules: Vec<ConditionRule>) -> FeedCondition {
        FeedCondition {
            enabled: true,
            logic_type,
            rules,
        }
    }

    #[test]
    fn test_disabled_condition_passes() {
        let cond = FeedCondition {
            enabled: false,
            logic_type: LogicType::All,
            rules: vec![rule("2", Operator::Is, "Other")],
        };
        assert!(cond.is_met(&form(), &entry(), &FormFieldResolver));
    }

    #[test]
    fn test_enabled_without_rules_passes() {
        let cond = condition(LogicType::All, vec![]);
        assert!(cond.is_met(&form(), &entry(), &FormFieldResolver));
    }

    #[test]
    fn test_is_is_case_insensitive() {
        let cond = condition(LogicType::All, vec![rule("2", Operator::Is, "newsletter")]);
        assert!(cond.is_met(&form(), &entry(), &FormFieldResolver));
    }

    #[test]
    fn test_all_requires_every_rule() {
        let cond = condition(
            LogicType::All,
            vec![
                rule("2", Operator::Is, "Newsletter"),
                rule("1", Operator::EndsWith, "@other.org"),
            ],
        );
        assert!(!cond.is_met(&form(), &entry(), &FormFieldResolver));
    }

    #[test]
    fn test_any_requires_one_rule() {
        let cond = condition(
            LogicType::Any,
            vec![
                rule("2", Operator::IsNot, "Newsletter"),
                rule("1", Operator::Contains, "@example"),
            ],
        );
        assert!(cond.is_met(&form(), &entry(), &FormFieldResolver));
    }

    #[test]
    fn test_numeric_comparisons() {
        let form = form();
        let entry = entry();
        assert!(condition(LogicType::All, vec![rule("3", Operator::GreaterThan, "10")])
            .is_met(&form, &entry, &FormFieldResolver));
        assert!(condition(LogicType::All, vec![rule("3", Operator::LessThan, "100.5")])
            .is_met(&form, &entry, &FormFieldResolver));
        assert!(!condition(LogicType::All, vec![rule("2", Operator::GreaterThan, "1")])
            .is_met(&form, &entry, &FormFieldResolver));
    }

    #[test]
    fn test_starts_with() {
        let cond = condition(LogicType::All, vec![rule("1", Operator::StartsWith, "ada")]);
        assert!(cond.is_met(&form(), &entry(), &FormFieldResolver));
    }

    #[test]
    fn test_deserialize_operators() {
        let cond: FeedCondition = serde_json::from_value(serde_json::json!({
            "enabled": true,
            "logic_type": "any",
            "rules": [
                { "field_id": "2", "operator": "isnot", "value": "x" },
                { "field_id": "3", "operator": "greater_than", "value": "1" }
            ]
        }))
        .unwrap();
        assert_eq!(cond.logic_type, LogicType::Any);
        assert_eq!(cond.rules[0].operator, Operator::IsNot);
        assert_eq!(cond.rules[1].operator, Operator::GreaterThan);
    }
}
