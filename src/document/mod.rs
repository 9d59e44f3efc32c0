//! Exporting a solved problem as a document.
//!
//! A [`Document`] is built once from a [`SolvedProblem`] and can then be
//! rendered as Markdown (with typeset math), plain text, or JSON.

use std::sync::LazyLock;

use clap::ValueEnum;
use handlebars::Handlebars;
use regex::Regex;

use crate::{
    extract::{ExtractorConfig, extract_final_result_with, is_generic_placeholder},
    markup::{FormulaView, NO_EQUATION_PLACEHOLDER, clean_markup, has_markup, to_readable_text},
    prelude::*,
    problem::SolvedProblem,
};

/// Title used for every exported document.
pub const DOCUMENT_TITLE: &str = "Math Solution";

/// Markdown document template.
static MARKDOWN_TEMPLATE: &str = include_str!("templates/document.md.hbs");

/// Plain text document template.
static TEXT_TEMPLATE: &str = include_str!("templates/document.txt.hbs");

/// Runs of blank lines left behind by skipped template sections.
static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("failed to compile regex"));

/// Output formats for [`Document::render`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum DocumentFormat {
    /// Markdown, with formulas as `$$` math blocks.
    #[default]
    Markdown,
    /// Plain text, with formulas converted to readable text.
    Text,
    /// JSON, with both the source and readable form of each formula.
    Json,
}

/// A formula, in both source and readable form.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Formula {
    /// The formula markup, cleaned up for typesetting.
    pub source: String,
    /// A plain-text approximation.
    pub readable: String,
}

impl Formula {
    /// Build a formula from raw markup, or `None` if nothing is left after
    /// cleaning.
    fn new(raw: &str) -> Option<Self> {
        let source = clean_markup(raw);
        if source.is_empty() {
            return None;
        }
        let readable = to_readable_text(&source);
        Some(Self { source, readable })
    }

    /// Markdown for this formula. Markup which would not typeset is replaced
    /// by its readable text.
    fn to_markdown(&self) -> String {
        match FormulaView::from_cleaned(self.source.clone()) {
            FormulaView::Missing => NO_EQUATION_PLACEHOLDER.to_owned(),
            FormulaView::Math(markup) if has_markup(&markup) => {
                format!("$$\n{markup}\n$$")
            }
            FormulaView::Math(text) => text,
            FormulaView::Invalid { source } => {
                warn!(%source, "Formula does not typeset, using readable text instead");
                self.readable.clone()
            }
        }
    }
}

/// One step of an exported solution.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DocumentStep {
    /// 1-based step number.
    pub number: usize,
    pub title: String,
    pub description: String,
    pub formula: Option<Formula>,
    pub explanation: String,
}

/// A solved problem, ready to export.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Document {
    pub title: String,
    /// The equation we detected, if any.
    pub equation: Option<Formula>,
    /// The backend's solution summary, unless it was a generic placeholder.
    pub solution: Option<String>,
    pub steps: Vec<DocumentStep>,
    /// The final result, if we could find a distinct one.
    pub final_result: Option<Formula>,
}

impl Document {
    /// Build a document from `problem`. `original` is the equation which was
    /// confirmed before solving, and may be empty.
    #[instrument(level = "debug", skip_all)]
    pub fn build(problem: &SolvedProblem, original: &str, config: &ExtractorConfig) -> Self {
        let original = original.trim();
        let equation_source = [problem.latex.trim(), original, problem.problem.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or_default();
        let extract_against = if original.is_empty() {
            problem.original_equation()
        } else {
            original
        };

        let solution = problem.solution.trim();
        let solution = (!solution.is_empty() && !is_generic_placeholder(solution))
            .then(|| solution.to_owned());

        let steps = problem
            .steps
            .iter()
            .enumerate()
            .map(|(idx, step)| DocumentStep {
                number: idx + 1,
                title: step.title.trim().to_owned(),
                description: step.description.trim().to_owned(),
                formula: Formula::new(&step.formula),
                explanation: step.explanation.trim().to_owned(),
            })
            .collect();

        let final_result = extract_final_result_with(config, problem, extract_against)
            .and_then(|result| Formula::new(&result));

        Self {
            title: DOCUMENT_TITLE.to_owned(),
            equation: Formula::new(equation_source),
            solution,
            steps,
            final_result,
        }
    }

    /// Render this document in the requested format.
    pub fn render(&self, format: DocumentFormat) -> Result<String> {
        match format {
            DocumentFormat::Markdown => {
                self.render_template(MARKDOWN_TEMPLATE, Formula::to_markdown)
            }
            DocumentFormat::Text => {
                self.render_template(TEXT_TEMPLATE, |f| f.readable.clone())
            }
            DocumentFormat::Json => {
                let mut json = serde_json::to_string_pretty(self)
                    .context("failed to serialize document")?;
                json.push('\n');
                Ok(json)
            }
        }
    }

    /// Render using a Handlebars template, formatting each formula with
    /// `show_formula`.
    fn render_template(
        &self,
        template: &str,
        show_formula: impl Fn(&Formula) -> String,
    ) -> Result<String> {
        let steps = self
            .steps
            .iter()
            .map(|step| {
                json!({
                    "number": step.number,
                    "title": step.title,
                    "description": step.description,
                    "formula": step.formula.as_ref().map(&show_formula),
                    "explanation": step.explanation,
                })
            })
            .collect::<Vec<_>>();
        let bindings = json!({
            "title": self.title,
            "underline": "=".repeat(self.title.chars().count()),
            "equation": self
                .equation
                .as_ref()
                .map(&show_formula)
                .unwrap_or_else(|| NO_EQUATION_PLACEHOLDER.to_owned()),
            "solution": self.solution,
            "steps": steps,
            "final_result": self.final_result.as_ref().map(&show_formula),
        });

        // We're writing Markdown and plain text, so HTML escaping would only
        // mangle formulas.
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        let rendered = handlebars
            .render_template(template, &bindings)
            .context("failed to render document template")?;
        let rendered = BLANK_LINES_RE.replace_all(&rendered, "\n\n");
        Ok(format!("{}\n", rendered.trim_end()))
    }
}
