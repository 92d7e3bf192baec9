//! Field-level validation shared by single-record and batch paths
//!
//! Each record shape has one static rule set. Single records fail fast on
//! the first violation; batch rows are checked against every rule and all
//! violations are accumulated before any rejection decision is made.

use crate::error::ValidationError;
use crate::models::{fields, EmployeeRecord, FieldValue};

/// Literal values accepted for the overtime flag
pub const OVERTIME_VALUES: &[&str] = &["Yes", "No"];

/// Literal values accepted for gender
pub const GENDER_VALUES: &[&str] = &["Male", "Female"];

/// Closed range shared by every ordinal satisfaction/involvement scale
pub const ORDINAL_MIN: f64 = 1.0;
pub const ORDINAL_MAX: f64 = 5.0;

/// Condition a field value must satisfy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Predicate {
    /// Closed interval [min, max]
    Range { min: f64, max: f64 },
    /// Strictly greater than zero
    Positive,
    /// Zero or greater
    NonNegative,
    /// Exactly one of the listed literals
    OneOf(&'static [&'static str]),
}

/// Result of checking one value against one predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail,
    /// Value absent in a batch row; numeric rules do not judge it
    NotEvaluated,
}

impl Predicate {
    pub fn evaluate(&self, value: &FieldValue) -> Outcome {
        if let Predicate::OneOf(allowed) = self {
            return match value.as_text() {
                Some(text) if allowed.contains(&text) => Outcome::Pass,
                _ => Outcome::Fail,
            };
        }
        if value.is_missing() {
            return Outcome::NotEvaluated;
        }
        match value.as_number() {
            Some(n) if self.accepts(n) => Outcome::Pass,
            _ => Outcome::Fail,
        }
    }

    fn accepts(&self, n: f64) -> bool {
        match self {
            Predicate::Range { min, max } => n >= *min && n <= *max,
            Predicate::Positive => n > 0.0,
            Predicate::NonNegative => n >= 0.0,
            Predicate::OneOf(_) => false,
        }
    }
}

/// (field, predicate, message template); `{field}` in the template is
/// replaced with the field name
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationRule {
    pub field: &'static str,
    pub predicate: Predicate,
    pub template: &'static str,
}

impl ValidationRule {
    const fn ordinal(field: &'static str) -> Self {
        Self {
            field,
            predicate: Predicate::Range {
                min: ORDINAL_MIN,
                max: ORDINAL_MAX,
            },
            template: "{field} must be between 1 and 5.",
        }
    }

    const fn non_negative(field: &'static str) -> Self {
        Self {
            field,
            predicate: Predicate::NonNegative,
            template: "{field} cannot be negative.",
        }
    }

    pub fn message(&self) -> String {
        self.template.replace("{field}", self.field)
    }

    fn violation(&self) -> ValidationError {
        ValidationError::new(self.field, self.message())
    }
}

static EMPLOYEE_RULES: &[ValidationRule] = &[
    ValidationRule::ordinal(fields::JOB_SATISFACTION),
    ValidationRule::ordinal(fields::WORK_LIFE_BALANCE),
    ValidationRule::ordinal(fields::JOB_INVOLVEMENT),
    ValidationRule::ordinal(fields::ENVIRONMENT_SATISFACTION),
    ValidationRule::ordinal(fields::RELATIONSHIP_SATISFACTION),
    ValidationRule {
        field: fields::OVER_TIME,
        predicate: Predicate::OneOf(OVERTIME_VALUES),
        template: "{field} must be 'Yes' or 'No'.",
    },
    ValidationRule {
        field: fields::AGE,
        predicate: Predicate::Range {
            min: 18.0,
            max: 100.0,
        },
        template: "{field} must be between 18 and 100.",
    },
    ValidationRule {
        field: fields::MONTHLY_INCOME,
        predicate: Predicate::Positive,
        template: "{field} must be greater than 0.",
    },
    ValidationRule::non_negative(fields::YEARS_AT_COMPANY),
    ValidationRule::non_negative(fields::TOTAL_WORKING_YEARS),
    ValidationRule::non_negative(fields::TRAINING_TIMES_LAST_YEAR),
    ValidationRule {
        field: fields::GENDER,
        predicate: Predicate::OneOf(GENDER_VALUES),
        template: "{field} must be 'Male' or 'Female'.",
    },
];

static RETENTION_RULES: &[ValidationRule] = &[
    ValidationRule::ordinal(fields::JOB_SATISFACTION),
    ValidationRule::ordinal(fields::WORK_LIFE_BALANCE),
    ValidationRule::ordinal(fields::JOB_INVOLVEMENT),
    ValidationRule::ordinal(fields::PERFORMANCE_RATING),
    ValidationRule {
        field: fields::OVER_TIME,
        predicate: Predicate::OneOf(OVERTIME_VALUES),
        template: "{field} must be 'Yes' or 'No'.",
    },
    ValidationRule {
        field: fields::GENDER,
        predicate: Predicate::OneOf(GENDER_VALUES),
        template: "{field} must be 'Male' or 'Female'.",
    },
];

/// A named, ordered set of rules plus the fields a single record must carry
#[derive(Debug, Clone, Copy)]
pub struct RuleSet {
    name: &'static str,
    required: &'static [&'static str],
    rules: &'static [ValidationRule],
}

impl RuleSet {
    /// The 14-field employee shape used by attrition and performance
    pub fn employee() -> Self {
        Self {
            name: "employee",
            required: &fields::EMPLOYEE_FIELDS,
            rules: EMPLOYEE_RULES,
        }
    }

    /// The retention shape, including the chained performance rating
    pub fn retention() -> Self {
        Self {
            name: "retention",
            required: &fields::RETENTION_FIELDS,
            rules: RETENTION_RULES,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn required_fields(&self) -> &'static [&'static str] {
        self.required
    }

    pub fn rules(&self) -> &'static [ValidationRule] {
        self.rules
    }

    /// Fail-fast validation of one record: the first violation is returned
    pub fn validate_record(&self, record: &EmployeeRecord) -> Result<(), ValidationError> {
        if let Some(missing) = self
            .required
            .iter()
            .find(|field| record.get(field).is_missing())
        {
            return Err(ValidationError::new(
                *missing,
                format!("{} is required.", missing),
            ));
        }

        for rule in self.rules {
            if rule.predicate.evaluate(record.get(rule.field)) == Outcome::Fail {
                return Err(rule.violation());
            }
        }
        Ok(())
    }

    /// Check one batch row against every rule, appending all violations
    pub fn check_row(&self, row: usize, record: &EmployeeRecord, errors: &mut Vec<ValidationError>) {
        for rule in self.rules {
            if rule.predicate.evaluate(record.get(rule.field)) == Outcome::Fail {
                errors.push(rule.violation().at_row(row));
            }
        }
    }

    /// Accumulate every violation across a batch, in row then rule order
    pub fn validate_batch<'a, I>(&self, rows: I) -> Vec<ValidationError>
    where
        I: IntoIterator<Item = (usize, &'a EmployeeRecord)>,
    {
        let mut errors = Vec::new();
        for (row, record) in rows {
            self.check_row(row, record, &mut errors);
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::valid_employee;

    #[test]
    fn test_valid_record_passes() {
        assert!(RuleSet::employee().validate_record(&valid_employee()).is_ok());
    }

    #[test]
    fn test_ordinal_boundaries() {
        let rules = RuleSet::employee();
        let ordinals = [
            "JobSatisfaction",
            "WorkLifeBalance",
            "JobInvolvement",
            "EnvironmentSatisfaction",
            "RelationshipSatisfaction",
        ];
        for field in ordinals {
            for ok in [1.0, 5.0] {
                let record = valid_employee().with(field, ok);
                assert!(rules.validate_record(&record).is_ok(), "{field}={ok}");
            }
            for bad in [0.0, 6.0] {
                let record = valid_employee().with(field, bad);
                let err = rules.validate_record(&record).unwrap_err();
                assert_eq!(err.field, field);
                assert_eq!(err.message, format!("{field} must be between 1 and 5."));
            }
        }
    }

    #[test]
    fn test_retention_rating_is_ordinal() {
        let rules = RuleSet::retention();
        let base = EmployeeRecord::new()
            .with("JobSatisfaction", 3.0)
            .with("WorkLifeBalance", 3.0)
            .with("JobInvolvement", 3.0)
            .with("OverTime", "Yes")
            .with("Gender", "Female");
        assert!(rules.validate_record(&base.clone().with("PerformanceRating", 5.0)).is_ok());
        let err = rules
            .validate_record(&base.with("PerformanceRating", 6.0))
            .unwrap_err();
        assert_eq!(err.field, "PerformanceRating");
    }

    #[test]
    fn test_monthly_income_must_be_strictly_positive() {
        let rules = RuleSet::employee();
        let err = rules
            .validate_record(&valid_employee().with("MonthlyIncome", 0.0))
            .unwrap_err();
        assert_eq!(err.message, "MonthlyIncome must be greater than 0.");
        assert!(rules
            .validate_record(&valid_employee().with("MonthlyIncome", 0.01))
            .is_ok());
    }

    #[test]
    fn test_age_range() {
        let rules = RuleSet::employee();
        assert!(rules.validate_record(&valid_employee().with("Age", 18.0)).is_ok());
        assert!(rules.validate_record(&valid_employee().with("Age", 100.0)).is_ok());
        assert!(rules.validate_record(&valid_employee().with("Age", 17.0)).is_err());
        assert!(rules.validate_record(&valid_employee().with("Age", 101.0)).is_err());
    }

    #[test]
    fn test_non_negative_fields() {
        let rules = RuleSet::employee();
        for field in ["YearsAtCompany", "TotalWorkingYears", "TrainingTimesLastYear"] {
            assert!(rules.validate_record(&valid_employee().with(field, 0.0)).is_ok());
            let err = rules
                .validate_record(&valid_employee().with(field, -1.0))
                .unwrap_err();
            assert_eq!(err.message, format!("{field} cannot be negative."));
        }
    }

    #[test]
    fn test_category_literals() {
        let rules = RuleSet::employee();
        let err = rules
            .validate_record(&valid_employee().with("OverTime", "Maybe"))
            .unwrap_err();
        assert_eq!(err.message, "OverTime must be 'Yes' or 'No'.");
        let err = rules
            .validate_record(&valid_employee().with("Gender", "male"))
            .unwrap_err();
        assert_eq!(err.message, "Gender must be 'Male' or 'Female'.");
    }

    #[test]
    fn test_single_record_fails_fast() {
        let record = valid_employee()
            .with("JobSatisfaction", 9.0)
            .with("Gender", "Other");
        let err = RuleSet::employee().validate_record(&record).unwrap_err();
        assert_eq!(err.field, "JobSatisfaction");
        assert_eq!(err.row, None);
    }

    #[test]
    fn test_single_record_requires_every_field() {
        let record = valid_employee().with("Department", FieldValue::Missing);
        let err = RuleSet::employee().validate_record(&record).unwrap_err();
        assert_eq!(err.message, "Department is required.");
    }

    #[test]
    fn test_batch_accumulates_and_skips_missing_numbers() {
        let rows = vec![
            valid_employee().with("JobSatisfaction", FieldValue::Missing),
            valid_employee()
                .with("JobSatisfaction", 0.0)
                .with("Gender", "Other"),
            valid_employee().with("OverTime", FieldValue::Missing),
        ];
        let errors = RuleSet::employee().validate_batch(rows.iter().enumerate());
        assert_eq!(errors.len(), 3);
        assert_eq!((errors[0].row, errors[0].field.as_str()), (Some(1), "JobSatisfaction"));
        assert_eq!((errors[1].row, errors[1].field.as_str()), (Some(1), "Gender"));
        assert_eq!((errors[2].row, errors[2].field.as_str()), (Some(2), "OverTime"));
    }

    #[test]
    fn test_non_numeric_text_fails_numeric_rule() {
        assert_eq!(
            Predicate::NonNegative.evaluate(&FieldValue::Text("ten".into())),
            Outcome::Fail
        );
        assert_eq!(
            Predicate::Positive.evaluate(&FieldValue::Missing),
            Outcome::NotEvaluated
        );
    }
}
