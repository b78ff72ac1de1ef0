//! Validation Module - Field rules for incoming JSON payloads
//!
//! Every rule of every field is checked so a single response can report all
//! problems at once.

use serde::{Serialize, Deserialize};
use serde_json::Value;

/// Validation result
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { valid: true, errors: vec![] }
    }

    pub fn fail(errors: Vec<ValidationError>) -> Self {
        Self { valid: false, errors }
    }

    pub fn extend(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
            self.errors.extend(other.errors);
        }
    }

    /// Convert into a `Result`, keeping the collected errors on failure.
    pub fn into_result(self) -> Result<(), Vec<ValidationError>> {
        if self.valid {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Validation error
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, code: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// Validation rule
#[derive(Clone, Debug)]
pub enum ValidationRule {
    Required,
    String,
    Integer,
    Number,
    /// Exclusive lower bound
    GreaterThan(f64),
    /// Exclusive upper bound
    LessThan(f64),
    In(Vec<String>),
}

/// Field validator
pub struct FieldValidator {
    field: String,
    rules: Vec<ValidationRule>,
}

impl FieldValidator {
    pub fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            rules: vec![],
        }
    }

    pub fn required(mut self) -> Self {
        self.rules.push(ValidationRule::Required);
        self
    }

    pub fn string(mut self) -> Self {
        self.rules.push(ValidationRule::String);
        self
    }

    pub fn integer(mut self) -> Self {
        self.rules.push(ValidationRule::Integer);
        self
    }

    pub fn number(mut self) -> Self {
        self.rules.push(ValidationRule::Number);
        self
    }

    pub fn gt(mut self, val: f64) -> Self {
        self.rules.push(ValidationRule::GreaterThan(val));
        self
    }

    pub fn lt(mut self, val: f64) -> Self {
        self.rules.push(ValidationRule::LessThan(val));
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.rules.push(ValidationRule::In(values.iter().map(|s| s.to_string()).collect()));
        self
    }

    pub fn name(&self) -> &str {
        &self.field
    }

    fn is_required(&self) -> bool {
        self.rules.iter().any(|r| matches!(r, ValidationRule::Required))
    }

    /// Validate a field value; `None` means the key was absent.
    ///
    /// An absent optional field passes. A present `null` is checked like any
    /// other value and so fails the type rules.
    pub fn validate(&self, value: Option<&Value>) -> ValidationResult {
        let value = match value {
            Some(v) if !(v.is_null() && self.is_required()) => v,
            _ if self.is_required() => {
                return ValidationResult::fail(vec![self.error("required", "Field required")]);
            }
            _ => return ValidationResult::ok(),
        };

        let mut errors = Vec::new();
        for rule in &self.rules {
            if let Some(error) = self.check_rule(rule, value) {
                errors.push(error);
            }
        }

        if errors.is_empty() {
            ValidationResult::ok()
        } else {
            ValidationResult::fail(errors)
        }
    }

    fn check_rule(&self, rule: &ValidationRule, value: &Value) -> Option<ValidationError> {
        match rule {
            ValidationRule::Required => None,
            ValidationRule::String => {
                if value.is_string() {
                    None
                } else {
                    Some(self.error("string_type", "Input should be a valid string"))
                }
            }
            ValidationRule::Integer => {
                if value.as_f64().map_or(false, |n| n.fract() == 0.0) {
                    None
                } else {
                    Some(self.error("int_type", "Input should be a valid integer"))
                }
            }
            ValidationRule::Number => {
                if value.is_number() {
                    None
                } else {
                    Some(self.error("float_type", "Input should be a valid number"))
                }
            }
            ValidationRule::GreaterThan(min) => match value.as_f64() {
                Some(n) if n <= *min => {
                    Some(self.error("greater_than", &format!("Input should be greater than {}", min)))
                }
                _ => None,
            },
            ValidationRule::LessThan(max) => match value.as_f64() {
                Some(n) if n >= *max => {
                    Some(self.error("less_than", &format!("Input should be less than {}", max)))
                }
                _ => None,
            },
            ValidationRule::In(values) => match value.as_str() {
                Some(s) if !values.iter().any(|v| v == s) => Some(self.error(
                    "literal_error",
                    &format!("Input should be one of: {}", values.join(", ")),
                )),
                _ => None,
            },
        }
    }

    fn error(&self, code: &str, message: &str) -> ValidationError {
        ValidationError::new(&self.field, code, message)
    }
}

/// Object validator
pub struct ObjectValidator {
    validators: Vec<FieldValidator>,
}

impl ObjectValidator {
    pub fn new() -> Self {
        Self { validators: vec![] }
    }

    pub fn field(mut self, validator: FieldValidator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn validate(&self, obj: &Value) -> ValidationResult {
        let Some(map) = obj.as_object() else {
            return ValidationResult::fail(vec![ValidationError::new(
                "body",
                "model_type",
                "Input should be a JSON object",
            )]);
        };

        let mut result = ValidationResult::ok();
        for validator in &self.validators {
            result.extend(validator.validate(map.get(validator.name())));
        }
        result
    }
}

impl Default for ObjectValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required() {
        let validator = FieldValidator::new("name").required().string();

        assert!(validator.validate(Some(&json!("test"))).valid);
        assert!(!validator.validate(None).valid);

        let null = validator.validate(Some(&Value::Null));
        assert_eq!(null.errors.len(), 1);
        assert_eq!(null.errors[0].code, "required");
    }

    #[test]
    fn test_optional_absent_passes_but_null_fails() {
        let validator = FieldValidator::new("age").integer();

        assert!(validator.validate(None).valid);

        let null = validator.validate(Some(&Value::Null));
        assert!(!null.valid);
        assert_eq!(null.errors[0].code, "int_type");
    }

    #[test]
    fn test_exclusive_bounds() {
        let validator = FieldValidator::new("age").integer().gt(0.0).lt(120.0);

        assert!(validator.validate(Some(&json!(1))).valid);
        assert!(validator.validate(Some(&json!(119))).valid);
        assert!(!validator.validate(Some(&json!(0))).valid);
        assert!(!validator.validate(Some(&json!(120))).valid);
    }

    #[test]
    fn test_integer_rejects_fractional_float() {
        let validator = FieldValidator::new("age").integer();
        assert!(!validator.validate(Some(&json!(30.5))).valid);
        assert!(!validator.validate(Some(&json!("30"))).valid);
    }

    #[test]
    fn test_integer_accepts_integral_float() {
        let validator = FieldValidator::new("age").integer();
        assert!(validator.validate(Some(&json!(30.0))).valid);
        assert!(validator.validate(Some(&json!(30))).valid);
    }

    #[test]
    fn test_one_of() {
        let validator = FieldValidator::new("gender").string().one_of(&["Male", "Female"]);

        assert!(validator.validate(Some(&json!("Female"))).valid);
        let bad = validator.validate(Some(&json!("female")));
        assert_eq!(bad.errors[0].code, "literal_error");
    }

    #[test]
    fn test_object_collects_every_field() {
        let validator = ObjectValidator::new()
            .field(FieldValidator::new("name").required().string())
            .field(FieldValidator::new("height").required().number().gt(0.0));

        let result = validator.validate(&json!({"height": -1.0}));
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "height"]);
    }

    #[test]
    fn test_object_rejects_non_object() {
        let result = ObjectValidator::new().validate(&json!([1, 2]));
        assert!(!result.valid);
        assert_eq!(result.errors[0].field, "body");
    }
}
