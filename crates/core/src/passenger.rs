//! Passenger request schema, validation, and feature assembly.
//!
//! Validation runs against the raw JSON value rather than through a serde
//! derive so every failing field can be reported at once. The result is a
//! tagged outcome: a fully populated [`PredictionRequest`] or the complete
//! list of [`FieldError`]s. Nothing is partially accepted.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/* --------------------------------------------------------------------------
Feature layout
-------------------------------------------------------------------------- */

/// Number of model input features.
pub const FEATURE_COUNT: usize = 6;

/// Column order the model was trained on. Rows must be assembled in exactly
/// this order.
pub const FEATURE_ORDER: [&str; FEATURE_COUNT] = ["Pclass", "Sex", "Age", "C", "Q", "S"];

/// One passenger as the model sees it, ordered per [`FEATURE_ORDER`].
pub type FeatureRow = [f64; FEATURE_COUNT];

/// Pseudo-field name used for errors that concern the body as a whole.
pub const BODY_FIELD: &str = "body";

/* --------------------------------------------------------------------------
Request
-------------------------------------------------------------------------- */

/// A validated prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Passenger class, nominally 1, 2 or 3 (not enforced).
    #[serde(rename = "Pclass")]
    pub pclass: i64,
    /// Encoded sex: 0 male, 1 female.
    #[serde(rename = "Sex")]
    pub sex: i64,
    #[serde(rename = "Age")]
    pub age: i64,
    /// Embarked at Cherbourg.
    #[serde(rename = "C")]
    pub embarked_c: i64,
    /// Embarked at Queenstown.
    #[serde(rename = "Q")]
    pub embarked_q: i64,
    /// Embarked at Southampton.
    #[serde(rename = "S")]
    pub embarked_s: i64,
}

impl PredictionRequest {
    fn from_ordered(values: [i64; FEATURE_COUNT]) -> Self {
        let [pclass, sex, age, embarked_c, embarked_q, embarked_s] = values;
        Self {
            pclass,
            sex,
            age,
            embarked_c,
            embarked_q,
            embarked_s,
        }
    }

    /// Assemble the single model input row in [`FEATURE_ORDER`].
    pub fn feature_row(&self) -> FeatureRow {
        [
            self.pclass as f64,
            self.sex as f64,
            self.age as f64,
            self.embarked_c as f64,
            self.embarked_q as f64,
            self.embarked_s as f64,
        ]
    }
}

/* --------------------------------------------------------------------------
Errors
-------------------------------------------------------------------------- */

/// Machine-readable failure codes attached to each [`FieldError`].
pub mod codes {
    pub const MISSING: &str = "missing";
    pub const INT_TYPE: &str = "int_type";
    pub const INT_PARSING: &str = "int_parsing";
    pub const INT_FROM_FLOAT: &str = "int_from_float";
    pub const INT_RANGE: &str = "int_range";
    pub const OBJECT_TYPE: &str = "object_type";
    pub const JSON_INVALID: &str = "json_invalid";
}

/// Why a single field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            code,
            message: message.into(),
        }
    }
}

/// Every field-level failure found in one request, in [`FEATURE_ORDER`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: &str, code: &'static str, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, code, message)])
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Names of the failing fields.
    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/* --------------------------------------------------------------------------
Validation
-------------------------------------------------------------------------- */

/// Parse and validate a raw request body.
///
/// Malformed JSON is reported as a body-level error rather than a transport
/// failure, so callers see the same 422 shape for every rejection.
pub fn parse_request(body: &[u8]) -> Result<PredictionRequest, ValidationErrors> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        ValidationErrors::single(
            BODY_FIELD,
            codes::JSON_INVALID,
            format!("Request body is not valid JSON: {e}"),
        )
    })?;
    validate_request(&value)
}

/// Validate a decoded JSON body against the six-field schema.
///
/// Unknown extra fields are ignored.
pub fn validate_request(body: &Value) -> Result<PredictionRequest, ValidationErrors> {
    let Some(object) = body.as_object() else {
        return Err(ValidationErrors::single(
            BODY_FIELD,
            codes::OBJECT_TYPE,
            format!(
                "Input should be a JSON object with fields {}",
                FEATURE_ORDER.join(", ")
            ),
        ));
    };

    let mut values = [0i64; FEATURE_COUNT];
    let mut errors = ValidationErrors::default();

    for (slot, field) in values.iter_mut().zip(FEATURE_ORDER) {
        match extract_int(object, field) {
            Ok(v) => *slot = v,
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(PredictionRequest::from_ordered(values))
    } else {
        Err(errors)
    }
}

fn extract_int(object: &Map<String, Value>, field: &str) -> Result<i64, FieldError> {
    let value = object
        .get(field)
        .ok_or_else(|| FieldError::new(field, codes::MISSING, "Field required"))?;
    coerce_int(value).map_err(|(code, message)| FieldError::new(field, code, message))
}

/// Coerce a JSON value to `i64`.
///
/// Accepts integers, floats with no fractional part, strings holding an
/// integer, and booleans (as 0 or 1). Null and containers are rejected.
fn coerce_int(value: &Value) -> Result<i64, (&'static str, &'static str)> {
    const NOT_INT: &str = "Input should be a valid integer";
    const OUT_OF_RANGE: &str = "Input should fit in a signed 64-bit integer";

    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            if n.is_u64() {
                return Err((codes::INT_RANGE, OUT_OF_RANGE));
            }
            let f = n.as_f64().unwrap_or(f64::NAN);
            if f.fract() != 0.0 {
                return Err((
                    codes::INT_FROM_FLOAT,
                    "Input should be a valid integer, got a number with a fractional part",
                ));
            }
            // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
            if f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Ok(f as i64)
            } else {
                Err((codes::INT_RANGE, OUT_OF_RANGE))
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            (
                codes::INT_PARSING,
                "Input should be a valid integer, unable to parse string as an integer",
            )
        }),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => Err((codes::INT_TYPE, NOT_INT)),
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
