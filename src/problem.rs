//! Records returned by the solving backend.
//!
//! The backend's output is assembled from OCR, a solver and an LLM, so any
//! field may be missing, `null`, or occasionally a number instead of a
//! string. We accept all of those and default to empty.

use schemars::JsonSchema;
use serde::{Deserializer, de::DeserializeOwned};

use crate::prelude::*;

/// A solved problem, as returned by the backend's `/analyze` endpoint.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SolvedProblem {
    /// Free-form problem statement.
    #[serde(deserialize_with = "lenient_text")]
    #[schemars(with = "String")]
    pub problem: String,

    /// Canonical formula for the problem, as LaTeX.
    #[serde(deserialize_with = "lenient_text")]
    #[schemars(with = "String")]
    pub latex: String,

    /// Free-form solution summary. May be a generic placeholder.
    #[serde(deserialize_with = "lenient_text")]
    #[schemars(with = "String")]
    pub solution: String,

    /// Explicit final result, if the backend computed one.
    #[serde(deserialize_with = "lenient_text")]
    #[schemars(with = "String")]
    pub result: String,

    /// Explicit final answer, if the backend computed one.
    #[serde(deserialize_with = "lenient_text")]
    #[schemars(with = "String")]
    pub answer: String,

    /// Solution steps, in order.
    #[serde(deserialize_with = "null_as_default")]
    #[schemars(with = "Vec<StepRecord>")]
    pub steps: Vec<StepRecord>,
}

impl SolvedProblem {
    /// The formula this problem was solved for, when we have nothing better.
    pub fn original_equation(&self) -> &str {
        [&self.latex, &self.problem]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }
}

/// One step of a solution.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct StepRecord {
    /// A short title.
    #[serde(deserialize_with = "lenient_text")]
    #[schemars(with = "String")]
    pub title: String,

    /// What happens in this step.
    #[serde(deserialize_with = "lenient_text")]
    #[schemars(with = "String")]
    pub description: String,

    /// A longer, teaching-oriented explanation.
    #[serde(deserialize_with = "lenient_text")]
    #[schemars(with = "String")]
    pub explanation: String,

    /// The formula for this step, as LaTeX.
    #[serde(deserialize_with = "lenient_text")]
    #[schemars(with = "String")]
    pub formula: String,

    /// The result of this step, if any.
    #[serde(deserialize_with = "lenient_text")]
    #[schemars(with = "String")]
    pub result: String,

    /// The answer reached in this step, if any.
    #[serde(deserialize_with = "lenient_text")]
    #[schemars(with = "String")]
    pub answer: String,
}

/// A formula extracted from an image, as returned by the backend's `/latex`
/// endpoint.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct FormulaResponse {
    /// The extracted formula, as LaTeX.
    #[serde(deserialize_with = "lenient_text")]
    #[schemars(with = "String")]
    pub latex: String,

    /// Plain-text OCR output. Some backends send this instead of `latex`.
    #[serde(deserialize_with = "lenient_text", skip_serializing_if = "String::is_empty")]
    #[schemars(with = "String")]
    pub text: String,

    /// Recognition confidence, between 0.0 and 1.0.
    #[serde(deserialize_with = "null_as_default")]
    #[schemars(with = "f64")]
    pub confidence: f64,
}

impl FormulaResponse {
    /// The best formula we have.
    pub fn formula(&self) -> &str {
        if self.latex.trim().is_empty() {
            self.text.trim()
        } else {
            self.latex.trim()
        }
    }
}

/// Deserialize a string, accepting `null` and bare scalars.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    })
}

/// Deserialize a value, treating `null` as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
