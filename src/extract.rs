//! Picking a final result out of a solved problem.
//!
//! Backend responses are inconsistent: sometimes there is a dedicated
//! `result` or `answer` field, sometimes the answer only appears in the last
//! step's formula, and sometimes only in a sentence like "le résultat est
//! environ 4.5528". We walk a fixed list of candidates in priority order and
//! return the first one that looks like a computed result rather than a
//! restatement of the original equation.

use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;

use crate::{
    prelude::*,
    problem::{SolvedProblem, StepRecord},
};

/// Solution strings which carry no information and must never be shown as a
/// final result.
pub const GENERIC_PLACEHOLDERS: &[&str] = &[
    "Résolution disponible",
    "Solution générée avec succès",
    "Solution disponible",
    "Non disponible",
];

/// Phrases which announce a numeric answer inside step prose. Group 1 is the
/// number. Tried in order.
static ANSWER_PHRASES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)r[ée]sultat[^=\n]*?=\s*(-?\d+(?:[.,]\d+)?)",
        r"(?i)r[ée]sultat\s+(?:final\s+)?(?:est|vaut|:)\s*(?:de\s+|égal\s+à\s+)?(?:environ\s+|approximativement\s+)?(-?\d+(?:[.,]\d+)?)",
        r"(?i)(?:environ|approximativement|≈)\s*(-?\d+(?:[.,]\d+)?)",
        r"=\s*(-?\d+(?:[.,]\d+)?)",
    ]
    .into_iter()
    .map(|re| Regex::new(re).expect("failed to compile regex"))
    .collect()
});

/// A run of digits, for comparing the shape of two formulas.
static DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("failed to compile regex"));

/// Cutoffs used to decide whether a candidate is a genuinely new result.
///
/// Both were tuned by hand on real backend output. Expect false positives and
/// negatives on formulas which differ but happen to look alike.
#[derive(Clone, Copy, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    /// Candidates more similar than this to the original equation (by
    /// position-wise character comparison) are rejected as restatements.
    pub similarity_threshold: f64,

    /// Candidates shorter than this fraction of the original equation are
    /// treated as reduced forms.
    pub shorter_ratio: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            shorter_ratio: 0.7,
        }
    }
}

impl ExtractorConfig {
    /// Check that our cutoffs make sense.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            bail!(
                "similarity_threshold must be between 0.0 and 1.0, got {}",
                self.similarity_threshold
            );
        }
        if !(self.shorter_ratio > 0.0 && self.shorter_ratio <= 1.0) {
            bail!(
                "shorter_ratio must be above 0.0 and at most 1.0, got {}",
                self.shorter_ratio
            );
        }
        Ok(())
    }

    /// Decide how `candidate` relates to `original`.
    pub fn classify(&self, candidate: &str, original: &str) -> Verdict {
        let candidate = normalize(candidate);
        let original = normalize(original);

        if candidate == original {
            return Verdict::Identical;
        }
        if structure(&candidate) == structure(&original) {
            return Verdict::SameStructure;
        }
        let similarity = positional_similarity(&candidate, &original);
        if similarity > self.similarity_threshold {
            return Verdict::NearDuplicate { similarity };
        }
        if is_pure_numeric(&candidate) {
            return Verdict::Numeric;
        }
        let candidate_len = candidate.chars().count() as f64;
        let original_len = original.chars().count() as f64;
        if candidate_len < self.shorter_ratio * original_len {
            return Verdict::Shorter;
        }
        Verdict::Distinct
    }

    /// Is `candidate` a calculated result, and not just `original` again?
    pub fn is_calculated_result(&self, candidate: &str, original: &str) -> bool {
        let verdict = self.classify(candidate, original);
        trace!(candidate, original, ?verdict, "Checked final result candidate");
        verdict.is_accepted()
    }
}

/// How a candidate compares to the original equation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Verdict {
    /// Same text, ignoring whitespace and case.
    Identical,
    /// Same text once every number is masked out.
    SameStructure,
    /// Too many characters in the same positions.
    NearDuplicate {
        /// Fraction of matching positions.
        similarity: f64,
    },
    /// Only numbers and arithmetic.
    Numeric,
    /// Much shorter than the original.
    Shorter,
    /// Different enough to count as a result.
    Distinct,
}

impl Verdict {
    /// Should the candidate be shown as a final result?
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Numeric | Verdict::Shorter | Verdict::Distinct)
    }
}

/// Where a candidate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandidateSource {
    /// `problem.result`
    Result,
    /// `problem.answer`
    Answer,
    /// `problem.solution`, if not a placeholder.
    Solution,
    /// The last step's formula, checked ahead of everything else in the steps.
    LastStepFormula,
    /// A field of the step with this index.
    Step(usize, StepField),
    /// A number announced in the last step's prose.
    Phrase(StepField),
}

/// A field of a [`StepRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepField {
    Result,
    Answer,
    Formula,
    Explanation,
    Description,
}

/// A possible final result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub source: CandidateSource,
    pub text: &'a str,
}

/// Extract the final result from `problem`, using the cutoffs in `config`.
///
/// Returns the first candidate, in priority order, which passes
/// [`ExtractorConfig::is_calculated_result`] against `original`. Pass
/// [`ExtractorConfig::default()`] for the standard cutoffs.
pub fn extract_final_result_with(
    config: &ExtractorConfig,
    problem: &SolvedProblem,
    original: &str,
) -> Option<String> {
    let found = candidates(problem)
        .find(|candidate| config.is_calculated_result(candidate.text, original));
    match found {
        Some(candidate) => {
            debug!(source = ?candidate.source, result = candidate.text, "Found final result");
            Some(candidate.text.to_owned())
        }
        None => {
            debug!("No final result found");
            None
        }
    }
}

/// All candidates in priority order, trimmed, with empty ones skipped.
pub fn candidates(problem: &SolvedProblem) -> impl Iterator<Item = Candidate<'_>> {
    let last_step = problem.steps.last();

    let top_level = [
        (CandidateSource::Result, problem.result.as_str()),
        (CandidateSource::Answer, problem.answer.as_str()),
        (CandidateSource::Solution, solution_text(&problem.solution)),
    ];

    let last_formula =
        last_step.map(|step| (CandidateSource::LastStepFormula, step.formula.as_str()));

    let step_fields = problem
        .steps
        .iter()
        .enumerate()
        .rev()
        .flat_map(|(idx, step)| step_result_fields(idx, step));

    let phrases = last_step.into_iter().flat_map(|step| {
        [
            (StepField::Explanation, step.explanation.as_str()),
            (StepField::Description, step.description.as_str()),
        ]
        .into_iter()
        .filter_map(|(field, text)| {
            find_announced_number(text).map(|number| (CandidateSource::Phrase(field), number))
        })
    });

    top_level
        .into_iter()
        .chain(last_formula)
        .chain(step_fields)
        .chain(phrases)
        .filter_map(|(source, text)| {
            let text = text.trim();
            (!text.is_empty()).then_some(Candidate { source, text })
        })
}

/// The solution, or nothing if it is a generic placeholder.
fn solution_text(solution: &str) -> &str {
    if is_generic_placeholder(solution) {
        ""
    } else {
        solution
    }
}

/// Does `text` contain one of our [`GENERIC_PLACEHOLDERS`]?
pub fn is_generic_placeholder(text: &str) -> bool {
    GENERIC_PLACEHOLDERS.iter().any(|p| text.contains(p))
}

/// A step's `result`, `answer`, and its formula if it contains a number.
fn step_result_fields(
    idx: usize,
    step: &StepRecord,
) -> impl Iterator<Item = (CandidateSource, &str)> {
    let formula = step.formula.as_str();
    let numeric_formula = formula
        .contains(|c: char| c.is_ascii_digit())
        .then_some((CandidateSource::Step(idx, StepField::Formula), formula));
    [
        (CandidateSource::Step(idx, StepField::Result), step.result.as_str()),
        (CandidateSource::Step(idx, StepField::Answer), step.answer.as_str()),
    ]
    .into_iter()
    .chain(numeric_formula)
}

/// Find the number announced by the first matching phrase in `text`.
fn find_announced_number(text: &str) -> Option<&str> {
    ANSWER_PHRASES.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    })
}

/// Remove all whitespace and lower-case.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Mask every run of digits, so `x+12` and `x+3` compare equal.
fn structure(normalized: &str) -> String {
    DIGITS_RE.replace_all(normalized, "#").into_owned()
}

/// The fraction of positions holding the same character, relative to the
/// longer string.
fn positional_similarity(a: &str, b: &str) -> f64 {
    let a = a.chars().collect::<Vec<_>>();
    let b = b.chars().collect::<Vec<_>>();
    let longer = a.len().max(b.len());
    if longer == 0 {
        return 1.0;
    }
    let matching = a.iter().zip(&b).filter(|(x, y)| x == y).count();
    matching as f64 / longer as f64
}

/// Only digits, a decimal point, and `+ - * / = ( )`, with at least one
/// digit.
fn is_pure_numeric(normalized: &str) -> bool {
    normalized.contains(|c: char| c.is_ascii_digit())
        && normalized
            .chars()
            .all(|c| c.is_ascii_digit() || "+-*/=().".contains(c))
}
