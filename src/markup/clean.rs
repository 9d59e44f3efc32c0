//! Preparing formula markup for typesetting.

use std::fmt;

use super::{brackets::braces_balanced, readable::to_readable_text};

/// Shown instead of a formula when there is nothing to typeset.
pub const NO_EQUATION_PLACEHOLDER: &str = "No equation detected";

/// Outer math delimiters, stripped once if both ends are present. `$$` must be
/// tried before `$`.
const OUTER_DELIMITERS: &[(&str, &str)] =
    &[("$$", "$$"), ("\\[", "\\]"), ("\\(", "\\)"), ("$", "$")];

/// HTML entities which OCR and LLM backends sometimes leave in formulas.
/// `&amp;` comes last so that `&amp;lt;` decodes to `&lt;`, not `<`.
const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", " "),
    ("&amp;", "&"),
];

/// Clean up a formula before handing it to a typesetter: strip one pair of
/// outer math delimiters and decode HTML entities.
pub fn clean_markup(markup: &str) -> String {
    let mut inner = markup.trim();
    for (open, close) in OUTER_DELIMITERS {
        if inner.len() >= open.len() + close.len()
            && inner.starts_with(open)
            && inner.ends_with(close)
        {
            inner = inner[open.len()..inner.len() - close.len()].trim();
            break;
        }
    }

    let mut decoded = inner.to_owned();
    for (entity, replacement) in HTML_ENTITIES {
        decoded = decoded.replace(entity, replacement);
    }
    decoded.trim().to_owned()
}

/// Does this formula contain markup syntax, as opposed to plain text?
pub fn has_markup(formula: &str) -> bool {
    formula.contains(['\\', '^', '_', '{', '}'])
}

/// How a formula should be shown on screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormulaView {
    /// Nothing left after cleaning.
    Missing,

    /// Cleaned markup, ready to typeset.
    Math(String),

    /// Markup that a typesetter would reject. We show the raw source instead.
    Invalid {
        /// The formula as we received it.
        source: String,
    },
}

impl FormulaView {
    /// Classify a raw formula.
    pub fn new(raw: &str) -> Self {
        match Self::from_cleaned(clean_markup(raw)) {
            FormulaView::Invalid { .. } => FormulaView::Invalid {
                source: raw.trim().to_owned(),
            },
            view => view,
        }
    }

    /// Classify a formula which has already been through [`clean_markup`].
    /// Cleaning is not idempotent, so this must not clean it again.
    pub fn from_cleaned(cleaned: String) -> Self {
        if cleaned.is_empty() {
            FormulaView::Missing
        } else if !braces_balanced(&cleaned) {
            FormulaView::Invalid { source: cleaned }
        } else {
            FormulaView::Math(cleaned)
        }
    }
}

impl fmt::Display for FormulaView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaView::Missing => write!(f, "{NO_EQUATION_PLACEHOLDER}"),
            FormulaView::Math(markup) if has_markup(markup) => {
                write!(f, "{markup}\n  = {}", to_readable_text(markup))
            }
            FormulaView::Math(text) => write!(f, "{text}"),
            FormulaView::Invalid { source } => {
                write!(f, "LaTeX rendering error:\n    {source}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_one_pair_of_outer_delimiters() {
        assert_eq!(clean_markup("$x^2$"), "x^2");
        assert_eq!(clean_markup("$$ x^2 $$"), "x^2");
        assert_eq!(clean_markup(r"\[x\]"), "x");
        assert_eq!(clean_markup(r"\(x\)"), "x");
        assert_eq!(clean_markup("$$$x$$$"), "$x$");
    }

    #[test]
    fn leaves_unpaired_delimiters_alone() {
        assert_eq!(clean_markup("$x"), "$x");
        assert_eq!(clean_markup(r"\[x"), r"\[x");
        assert_eq!(clean_markup("x$"), "x$");
    }

    #[test]
    fn decodes_html_entities() {
        assert_eq!(clean_markup("a &lt; b &amp;&amp; c &gt; d"), "a < b && c > d");
        assert_eq!(clean_markup("&quot;x&quot; &#39;y&#39;"), "\"x\" 'y'");
        assert_eq!(clean_markup("a&nbsp;b"), "a b");
        assert_eq!(clean_markup("&amp;lt;"), "&lt;");
    }

    #[test]
    fn detects_markup() {
        assert!(has_markup(r"\frac{1}{2}"));
        assert!(has_markup("x^2"));
        assert!(has_markup("x_1"));
        assert!(!has_markup("x = 2"));
        assert!(!has_markup("4.5528"));
    }

    #[test]
    fn classifies_formulas_for_display() {
        assert_eq!(FormulaView::new(""), FormulaView::Missing);
        assert_eq!(FormulaView::new("  $$ $$ "), FormulaView::Missing);
        assert_eq!(
            FormulaView::new("$x^{2}$"),
            FormulaView::Math("x^{2}".to_owned())
        );
        assert_eq!(
            FormulaView::new(r"\frac{a}{b"),
            FormulaView::Invalid {
                source: r"\frac{a}{b".to_owned()
            }
        );
    }

    #[test]
    fn classifies_cleaned_formulas_without_cleaning_again() {
        assert_eq!(
            FormulaView::from_cleaned("$x$".to_owned()),
            FormulaView::Math("$x$".to_owned())
        );
        assert_eq!(
            FormulaView::from_cleaned("a &lt; b".to_owned()),
            FormulaView::Math("a &lt; b".to_owned())
        );
        assert_eq!(FormulaView::from_cleaned(String::new()), FormulaView::Missing);
        assert_eq!(
            FormulaView::from_cleaned(r"\sqrt{x".to_owned()),
            FormulaView::Invalid {
                source: r"\sqrt{x".to_owned()
            }
        );
    }

    #[test]
    fn displays_placeholder_and_error_block() {
        assert_eq!(FormulaView::Missing.to_string(), NO_EQUATION_PLACEHOLDER);
        let invalid = FormulaView::new(r"\sqrt{x").to_string();
        assert!(invalid.starts_with("LaTeX rendering error:"));
        assert!(invalid.contains(r"\sqrt{x"));
    }

    #[test]
    fn displays_markup_with_a_readable_line() {
        let shown = FormulaView::new(r"\frac{1}{2}").to_string();
        assert_eq!(shown, "\\frac{1}{2}\n  = 1/2");
        assert_eq!(FormulaView::new("x = 2").to_string(), "x = 2");
    }
}
