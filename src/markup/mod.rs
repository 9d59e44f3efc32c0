//! Formula markup (LaTeX) helpers.
//!
//! Nothing in here does I/O or fails. Malformed markup degrades to a
//! best-effort result instead.

pub mod brackets;
pub mod clean;
pub mod readable;

pub use self::{
    clean::{FormulaView, NO_EQUATION_PLACEHOLDER, clean_markup, has_markup},
    readable::to_readable_text,
};
