//! Sanitization of user-submitted CSS.
//!
//! This is deliberately not a CSS parser. Submissions go through four steps:
//!
//! 1. markup is stripped (`<script>`/`<style>` elements including their
//!    contents, then any remaining tag),
//! 2. `{` and `}` are counted and the submission rejected if they differ,
//! 3. known-dangerous [`Construct`]s are removed, case-insensitively,
//! 4. surrounding whitespace is trimmed.
//!
//! Step 3 repeats until no construct matches any more, so fragments like
//! `@im@importport` cannot reassemble into the thing that was removed.

use crate::error::ValidationError;
use derive_more::Display;
use regex::Regex;
use std::sync::LazyLock;
use tracing::instrument;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

regex!(SCRIPT_STYLE_REGEX, r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>");
// An unterminated tag swallows the rest of the input.
regex!(TAG_REGEX, r"(?s)<[^>]*(?:>|$)");
regex!(IMPORT_REGEX, r"(?i)@import");
regex!(SCRIPT_URI_REGEX, r"(?i)javascript:");
regex!(EXPRESSION_REGEX, r"(?i)expression\s*\(");
regex!(BEHAVIOR_REGEX, r"(?i)behavior\s*:");
regex!(BINDING_REGEX, r"(?i)-moz-binding");

/// A CSS construct that is removed from every submission.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Construct {
    #[display("@import directive")]
    Import,
    #[display("javascript: URI")]
    ScriptUri,
    #[display("expression() call")]
    Expression,
    #[display("behavior: declaration")]
    Behavior,
    #[display("-moz-binding directive")]
    Binding,
}
impl Construct {
    pub const ALL: [Construct; 5] = [Self::Import, Self::ScriptUri, Self::Expression, Self::Behavior, Self::Binding];

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Import => &IMPORT_REGEX,
            Self::ScriptUri => &SCRIPT_URI_REGEX,
            Self::Expression => &EXPRESSION_REGEX,
            Self::Behavior => &BEHAVIOR_REGEX,
            Self::Binding => &BINDING_REGEX,
        }
    }

    /// Returns `true` if `css` still contains this construct.
    pub fn is_present_in(self, css: &str) -> bool {
        self.pattern().is_match(css)
    }
}

/// CSS that passed sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    /// Sanitized, trimmed CSS. May be empty.
    pub css: String,
    /// Constructs that were found and removed, in order of first removal.
    pub removed: Vec<Construct>,
}

/// Remove markup tags from `input`.
pub fn strip_tags(input: &str) -> String {
    let without_blocks = SCRIPT_STYLE_REGEX.replace_all(input, "");
    TAG_REGEX.replace_all(&without_blocks, "").into_owned()
}

/// Sanitize a raw CSS submission.
///
/// # Errors
///
/// Returns [`ValidationError::UnbalancedBraces`] if, after stripping markup,
/// the number of `{` differs from the number of `}`.
///
/// # Examples
///
/// ```
/// use pagestyle_store::{Construct, sanitize};
///
/// let sanitized = sanitize("@import url(evil.css); body{color:red}").unwrap();
/// assert_eq!(sanitized.css, "url(evil.css); body{color:red}");
/// assert_eq!(sanitized.removed, vec![Construct::Import]);
///
/// assert!(sanitize("a{color:blue").is_err());
/// ```
#[instrument(level = "trace", skip(input), fields(input_size = input.len()))]
pub fn sanitize(input: &str) -> Result<Sanitized, ValidationError> {
    let mut css = strip_tags(input);

    let opening = css.matches('{').count();
    let closing = css.matches('}').count();
    if opening != closing {
        return Err(ValidationError::UnbalancedBraces { opening, closing });
    }

    let mut removed = Vec::new();
    loop {
        let mut changed = false;
        for construct in Construct::ALL {
            let pattern = construct.pattern();
            if pattern.is_match(&css) {
                css = pattern.replace_all(&css, "").into_owned();
                changed = true;
                if !removed.contains(&construct) {
                    removed.push(construct);
                }
            }
        }
        if !changed {
            break;
        }
    }

    Ok(Sanitized { css: css.trim().to_string(), removed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("body{color:red}", "body{color:red}")]
    #[case("  \n h1 { margin: 0 }\n\t", "h1 { margin: 0 }")]
    #[case("", "")]
    #[case("   ", "")]
    #[case("ul > li + li ~ li { color: red }", "ul > li + li ~ li { color: red }")]
    #[case("<b>a{}</b>", "a{}")]
    #[case("a{}<script>alert('}')</script>", "a{}")]
    #[case("a{}<STYLE type=\"text/css\">b{</style>", "a{}")]
    #[case("a{} <unterminated b{", "a{}")]
    fn test_clean_input(#[case] input: &str, #[case] expected: &str) {
        let sanitized = sanitize(input).unwrap();
        assert_eq!(sanitized.css, expected);
        assert!(sanitized.removed.is_empty());
    }

    #[rstest]
    #[case("a{color:blue", 1, 0)]
    #[case("}", 0, 1)]
    #[case("a{{}", 2, 1)]
    #[case("a{}<b>}</b>", 1, 2)]
    fn test_unbalanced(#[case] input: &str, #[case] opening: usize, #[case] closing: usize) {
        assert_eq!(sanitize(input), Err(ValidationError::UnbalancedBraces { opening, closing }));
    }

    #[test]
    fn test_tags_are_stripped_before_counting() {
        // The stray brace lives inside a script element and goes with it.
        assert_eq!(sanitize("a{}<script>{</script>").unwrap().css, "a{}");
    }

    #[rstest]
    #[case("@import url(evil.css); body{color:red}", "url(evil.css); body{color:red}", Construct::Import)]
    #[case("a{background:url(JavaScript:alert(1))}", "a{background:url(alert(1))}", Construct::ScriptUri)]
    #[case("a{width:expression (alert(1))}", "a{width:alert(1))}", Construct::Expression)]
    #[case("a{BEHAVIOR : url(x.htc)}", "a{ url(x.htc)}", Construct::Behavior)]
    #[case("a{-Moz-Binding:url(x.xml#y)}", "a{:url(x.xml#y)}", Construct::Binding)]
    fn test_removes_construct(#[case] input: &str, #[case] expected: &str, #[case] construct: Construct) {
        let sanitized = sanitize(input).unwrap();
        assert_eq!(sanitized.css, expected);
        assert_eq!(sanitized.removed, vec![construct]);
    }

    #[test]
    fn test_removal_is_silent_about_content() {
        let sanitized = sanitize("@import").unwrap();
        assert_eq!(sanitized.css, "");
        assert_eq!(sanitized.removed, vec![Construct::Import]);
    }

    #[rstest]
    #[case("@im@importport url(x); a{}")]
    #[case("a{b:url(javajavascript:script:x)}")]
    #[case("a{b:expresexpression(sion(1)}")]
    #[case("@imjavascript:port a{}")]
    #[case("a{-moz--moz-bindingbinding:x}")]
    fn test_removal_reaches_fixed_point(#[case] input: &str) {
        let sanitized = sanitize(input).unwrap();
        for construct in Construct::ALL {
            assert!(!construct.is_present_in(&sanitized.css), "{construct} survived in {:?}", sanitized.css);
        }
    }

    #[test]
    fn test_removed_lists_each_construct_once() {
        let sanitized = sanitize("@import a; @import b; a{behavior:x; behavior:y}").unwrap();
        assert_eq!(sanitized.removed, vec![Construct::Import, Construct::Behavior]);
    }
}
