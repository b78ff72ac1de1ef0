//! Patient record schema, partial updates and derived body-mass metrics

use serde::{Serialize, Deserialize};
use serde_json::{json, Value};

use crate::validation::{FieldValidator, ObjectValidator, ValidationError};

pub const GENDERS: [&str; 3] = ["Male", "Female", "Others"];

/// Age must lie strictly between these bounds
pub const MIN_AGE_EXCLUSIVE: f64 = 0.0;
pub const MAX_AGE_EXCLUSIVE: f64 = 120.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Others,
}

/// Weight class derived from the body-mass index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl Verdict {
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            Verdict::Underweight
        } else if bmi < 25.0 {
            Verdict::Normal
        } else if bmi < 30.0 {
            Verdict::Overweight
        } else {
            Verdict::Obese
        }
    }
}

/// Body-mass index rounded to two decimals, exact ties to even.
pub fn bmi(height_m: f64, weight_kg: f64) -> f64 {
    let raw = weight_kg / (height_m * height_m);
    // Formatting rounds the exact binary value, so 20.125 becomes 20.12
    format!("{:.2}", raw).parse().unwrap_or(raw)
}

/// Rewrite an integral float `age` (e.g. `30.0`) as a JSON integer.
fn normalize_age(value: &Value) -> Value {
    let mut value = value.clone();
    if let Some(age) = value.get_mut("age") {
        if age.is_f64() {
            if let Some(n) = age.as_f64().filter(|n| n.fract() == 0.0) {
                *age = Value::from(n as i64);
            }
        }
    }
    value
}

/// A stored patient record. The identifier lives outside, as the store key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub name: String,
    pub city: String,
    pub age: u32,
    pub gender: Gender,
    /// Meters
    pub height: f64,
    /// Kilograms
    pub weight: f64,
}

impl Patient {
    /// Rules for the six stored fields.
    fn schema() -> ObjectValidator {
        ObjectValidator::new()
            .field(FieldValidator::new("name").required().string())
            .field(FieldValidator::new("city").required().string())
            .field(
                FieldValidator::new("age")
                    .required()
                    .integer()
                    .gt(MIN_AGE_EXCLUSIVE)
                    .lt(MAX_AGE_EXCLUSIVE),
            )
            .field(FieldValidator::new("gender").required().string().one_of(&GENDERS))
            .field(FieldValidator::new("height").required().number().gt(0.0))
            .field(FieldValidator::new("weight").required().number().gt(0.0))
    }

    /// Validate a JSON object and build a record from it. Unknown keys are ignored.
    pub fn from_value(value: &Value) -> Result<Self, Vec<ValidationError>> {
        Self::schema().validate(value).into_result()?;
        serde_json::from_value(normalize_age(value)).map_err(body_error)
    }

    pub fn bmi(&self) -> f64 {
        bmi(self.height, self.weight)
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::from_bmi(self.bmi())
    }

    /// Output form with the derived fields computed from the current values.
    pub fn view(&self) -> PatientView<'_> {
        let bmi = self.bmi();
        PatientView {
            patient: self,
            bmi,
            verdict: Verdict::from_bmi(bmi),
        }
    }
}

/// Response representation of a patient: stored fields plus `bmi` and `verdict`.
#[derive(Debug, Serialize)]
pub struct PatientView<'a> {
    #[serde(flatten)]
    pub patient: &'a Patient,
    pub bmi: f64,
    pub verdict: Verdict,
}

/// Body of a create request: the caller-chosen id and the record.
#[derive(Clone, Debug, PartialEq)]
pub struct NewPatient {
    pub id: String,
    pub patient: Patient,
}

impl NewPatient {
    pub fn from_value(value: &Value) -> Result<Self, Vec<ValidationError>> {
        let id_rule = FieldValidator::new("id").required().string();
        let mut result = ObjectValidator::new().field(id_rule).validate(value);

        let patient = match Patient::from_value(value) {
            Ok(patient) => Some(patient),
            Err(errors) => {
                result.extend(crate::validation::ValidationResult::fail(errors));
                None
            }
        };
        result.into_result()?;

        match (value.get("id").and_then(Value::as_str), patient) {
            (Some(id), Some(patient)) => Ok(Self { id: id.to_string(), patient }),
            _ => Err(vec![ValidationError::new("body", "model_type", "Invalid patient")]),
        }
    }
}

/// Partial update: only the supplied fields replace the stored ones.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub city: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<Gender>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
}

impl PatientUpdate {
    /// Type checks only. Range checks run on the merged record in [`PatientUpdate::apply`].
    fn schema() -> ObjectValidator {
        ObjectValidator::new()
            .field(FieldValidator::new("name").string())
            .field(FieldValidator::new("city").string())
            .field(FieldValidator::new("age").integer())
            .field(FieldValidator::new("gender").string().one_of(&GENDERS))
            .field(FieldValidator::new("height").number())
            .field(FieldValidator::new("weight").number())
    }

    pub fn from_value(value: &Value) -> Result<Self, Vec<ValidationError>> {
        Self::schema().validate(value).into_result()?;
        serde_json::from_value(normalize_age(value)).map_err(body_error)
    }

    /// Merge onto `base` and re-validate the whole record.
    pub fn apply(&self, base: &Patient) -> Result<Patient, Vec<ValidationError>> {
        let merged = json!({
            "name": self.name.as_ref().unwrap_or(&base.name),
            "city": self.city.as_ref().unwrap_or(&base.city),
            "age": self.age.unwrap_or_else(|| i64::from(base.age)),
            "gender": self.gender.unwrap_or(base.gender),
            "height": self.height.unwrap_or(base.height),
            "weight": self.weight.unwrap_or(base.weight),
        });
        Patient::from_value(&merged)
    }
}

fn body_error(e: serde_json::Error) -> Vec<ValidationError> {
    vec![ValidationError::new("body", "parse", &e.to_string())]
}
