//! Linearizing formula markup into readable plain text.
//!
//! This is what we fall back to whenever a formula can't be typeset, most
//! notably in plain-text documents. Constructs are rewritten innermost-first
//! by recursing into each bracketed argument:
//!
//! | Markup                       | Text            |
//! |------------------------------|-----------------|
//! | `\sqrt{x}`                   | `sqrt(x)`       |
//! | `\sqrt[3]{x}`                | `sqrt[3](x)`    |
//! | `\frac{a+b}{2}`              | `(a+b)/2`       |
//! | `\frac12`                    | `1/2`           |
//! | `x^{n+1}`, `x_{i}`           | `x^(n+1)`, `x_i`|
//! | `\cdot`, `\pm`, `\leq`, ...  | `·`, `±`, `≤`   |
//!
//! Unbalanced markup is left where it is, minus its backslashes and braces.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::brackets::find_matching;

/// How deeply we recurse into nested constructs. Anything deeper only gets
/// symbol replacement and delimiter stripping.
const MAX_DEPTH: usize = 10;

/// How many occurrences of a single construct we rewrite per level.
/// Occurrences we leave untouched don't count.
const MAX_REWRITES: usize = 50;

/// Fraction commands, all rendered the same way.
const FRACTION_MARKERS: &[&str] = &["\\frac", "\\dfrac", "\\tfrac"];

/// A backslash command, or a backslash-escaped character.
static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\([A-Za-z]+|.)").expect("failed to compile regex")
});

/// Convert formula markup into a plain-text approximation.
pub fn to_readable_text(markup: &str) -> String {
    readable(markup, 0)
}

fn readable(markup: &str, depth: usize) -> String {
    let mut text = markup.to_owned();
    if depth < MAX_DEPTH {
        text = rewrite_radicals(&text, depth);
        for marker in FRACTION_MARKERS {
            text = rewrite_each(&text, marker, |s, args| fraction(s, args, depth));
        }
        text = rewrite_each(&text, "^", |s, args| script('^', s, args, depth));
        text = rewrite_each(&text, "_", |s, args| script('_', s, args, depth));
    }
    strip_delimiters(&replace_symbols(&text))
}

/// Find each `marker` in `text` and let `rewrite` replace it, along with its
/// arguments.
///
/// `rewrite` receives the text and the byte index just past the marker. It
/// returns the end of the arguments (exclusive) and the replacement, or
/// `None` to leave this occurrence untouched.
fn rewrite_each(
    text: &str,
    marker: &str,
    mut rewrite: impl FnMut(&str, usize) -> Option<(usize, String)>,
) -> String {
    let mut out = text.to_owned();
    let mut cursor = 0;
    let mut rewrites = 0;
    while rewrites < MAX_REWRITES {
        let Some(found) = out[cursor..].find(marker) else {
            break;
        };
        let start = cursor + found;
        let args = start + marker.len();
        match rewrite(&out, args) {
            Some((end, replacement)) => {
                out.replace_range(start..end, &replacement);
                cursor = start + replacement.len();
                rewrites += 1;
            }
            None => cursor = args,
        }
    }
    out
}

/// `\sqrt{x}` and `\sqrt[n]{x}`.
fn rewrite_radicals(text: &str, depth: usize) -> String {
    rewrite_each(text, "\\sqrt", |s, args| {
        if continues_command_name(s, args) {
            return None;
        }
        let (index, after_index) = match delimited_arg(s, args, '[') {
            Some((index, end)) => (Some(readable(index, depth + 1)), end),
            None => (None, args),
        };
        let (radicand, end) = delimited_arg(s, after_index, '{')?;
        let radicand = readable(radicand, depth + 1);
        let replacement = match index {
            Some(index) => format!("sqrt[{index}]({radicand})"),
            None => format!("sqrt({radicand})"),
        };
        Some((end, replacement))
    })
}

/// `\frac{num}{den}`, or the shorthand `\frac12`.
fn fraction(s: &str, args: usize, depth: usize) -> Option<(usize, String)> {
    if continues_command_name(s, args) {
        return None;
    }
    let (numerator, after_numerator) = fraction_arg(s, args)?;
    let (denominator, end) = fraction_arg(s, after_numerator)?;
    let numerator = readable(numerator, depth + 1);
    let denominator = readable(denominator, depth + 1);
    Some((
        end,
        format!("{}/{}", parenthesize(&numerator), parenthesize(&denominator)),
    ))
}

/// `^{...}` and `_{...}`. Unbraced single-character scripts never match.
fn script(op: char, s: &str, args: usize, depth: usize) -> Option<(usize, String)> {
    let (inner, end) = delimited_arg(s, args, '{')?;
    let inner = readable(inner, depth + 1);
    let replacement = if inner.chars().count() == 1 {
        format!("{op}{inner}")
    } else {
        format!("{op}({inner})")
    };
    Some((end, replacement))
}

/// Read an argument delimited by `open` and its partner, starting at `pos`
/// (after optional whitespace). Returns the argument's contents and the index
/// just past its closing delimiter.
fn delimited_arg(s: &str, pos: usize, open: char) -> Option<(&str, usize)> {
    let rest = s.get(pos..)?;
    let open_idx = pos + (rest.len() - rest.trim_start().len());
    if !s[open_idx..].starts_with(open) {
        return None;
    }
    let close_idx = find_matching(s, open_idx)?;
    Some((&s[open_idx + open.len_utf8()..close_idx], close_idx + 1))
}

/// A braced fraction argument, or a single letter or digit standing in for
/// one.
fn fraction_arg(s: &str, pos: usize) -> Option<(&str, usize)> {
    if let Some(arg) = delimited_arg(s, pos, '{') {
        return Some(arg);
    }
    let rest = s.get(pos..)?;
    let start = pos + (rest.len() - rest.trim_start().len());
    let token = s[start..].chars().next().filter(char::is_ascii_alphanumeric)?;
    let end = start + token.len_utf8();
    Some((&s[start..end], end))
}

/// Is the marker ending at `pos` really a prefix of a longer command name,
/// like `\sqrtx`?
fn continues_command_name(s: &str, pos: usize) -> bool {
    s[pos..].starts_with(|c: char| c.is_ascii_alphabetic())
}

/// Wrap one side of a fraction in parentheses unless it is a single atom.
fn parenthesize(side: &str) -> String {
    if is_atom(side) {
        side.to_owned()
    } else {
        format!("({side})")
    }
}

/// Bare alphanumerics, or a single call/group like `sqrt(x)` or `(a+b)`.
fn is_atom(side: &str) -> bool {
    if side.chars().all(|c| c.is_alphanumeric() || c == '.') {
        return true;
    }
    let Some(open) = side.find('(') else {
        return false;
    };
    side[..open]
        .chars()
        .all(|c| c.is_alphanumeric() || c == '[' || c == ']')
        && find_matching(side, open) == Some(side.len() - 1)
}

/// Replace backslash commands with the symbols they stand for. Unknown
/// commands keep their name (`\sin` becomes `sin`).
fn replace_symbols(text: &str) -> String {
    COMMAND_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            symbol_for(name).unwrap_or(name).to_owned()
        })
        .into_owned()
}

fn symbol_for(command: &str) -> Option<&'static str> {
    let symbol = match command {
        "cdot" => "·",
        "times" => "×",
        "div" => "÷",
        "pm" => "±",
        "mp" => "∓",
        "approx" => "≈",
        "leq" | "le" => "≤",
        "geq" | "ge" => "≥",
        "neq" | "ne" => "≠",
        "lt" => "<",
        "gt" => ">",
        "pi" => "π",
        "infty" => "∞",
        "to" | "rightarrow" => "→",
        // Bracket pairing and styling.
        "left" | "right" | "big" | "Big" | "text" | "mathrm" | "mathbf" | "mathit"
        | "operatorname" | "displaystyle" => "",
        // Spacing.
        "," | ";" | ":" | "!" | " " | "\\" | "quad" | "qquad" => " ",
        _ => return None,
    };
    Some(symbol)
}

/// Remove leftover grouping delimiters and escapes, and collapse whitespace.
fn strip_delimiters(text: &str) -> String {
    text.replace(['{', '}', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
