//! Boilerplate stripping and with-form / without-form classification.
//!
//! Article pages on the feed's site render as:
//!
//! ```text
//! <headline, byline ...> 4 min read <article text ...> View Comments <footer ...>
//! ```
//!
//! The [`Classifier`] anchors on the read-time marker, keeps the text up to
//! the first comments marker *after* it, and records the minutes. Anything
//! that doesn't fit that shape is [`Classification::WithoutForm`].
//!
//! [`has_article_section`] is a coarser structural check kept separate from
//! the extraction; the batch runner can apply it as an extra filter.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::debug;

const READ_TIME_PATTERN: &str = r"(\d+)\s*min read";
const COMMENTS_MARKER: &str = "View Comments";

const SECTION_OPEN: &str = "In This Article:";
const SECTION_CLOSE: &str = "View Comments";

/// Result of classifying one article body. Every body maps to exactly one
/// variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Both markers found in order.
    WithForm { read_time: u32, cleaned_body: String },
    /// A marker is missing, out of order, or the minutes don't parse.
    WithoutForm,
}

impl Classification {
    pub fn is_with_form(&self) -> bool {
        matches!(self, Self::WithForm { .. })
    }
}

/// Case-sensitivity policy for each marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerPolicy {
    pub read_time_case_sensitive: bool,
    pub comments_case_sensitive: bool,
}

impl Default for MarkerPolicy {
    fn default() -> Self {
        Self {
            read_time_case_sensitive: true,
            comments_case_sensitive: false,
        }
    }
}

/// Compiled markers for a given [`MarkerPolicy`].
#[derive(Debug, Clone)]
pub struct Classifier {
    read_time: Regex,
    comments: Regex,
}

static DEFAULT_CLASSIFIER: Lazy<Classifier> =
    Lazy::new(|| Classifier::new(MarkerPolicy::default()));

impl Classifier {
    pub fn new(policy: MarkerPolicy) -> Self {
        Self {
            read_time: build(READ_TIME_PATTERN, !policy.read_time_case_sensitive),
            comments: build(&regex::escape(COMMENTS_MARKER), !policy.comments_case_sensitive),
        }
    }

    /// Strip the boilerplate around the article text, or reject the body.
    pub fn classify(&self, body: &str) -> Classification {
        let Some(caps) = self.read_time.captures(body) else {
            debug!("no read-time marker");
            return Classification::WithoutForm;
        };
        let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
            return Classification::WithoutForm;
        };
        let Some(read_time) = parse_decimal(digits.as_str()) else {
            debug!(digits = digits.as_str(), "read time out of range");
            return Classification::WithoutForm;
        };

        // Searching only the tail means a comments marker before the
        // read-time marker is never seen.
        let start = whole.end();
        let Some(marker) = self.comments.find(&body[start..]) else {
            debug!(read_time, "no comments marker after read time");
            return Classification::WithoutForm;
        };
        let end = start + marker.start();

        Classification::WithForm {
            read_time,
            cleaned_body: body[start..end].trim().to_string(),
        }
    }
}

/// Case-sensitive "min read", case-insensitive "view comments".
impl Default for Classifier {
    fn default() -> Self {
        DEFAULT_CLASSIFIER.clone()
    }
}

// Only ever called with the constants above.
fn build(pattern: &str, case_insensitive: bool) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .expect("built-in marker pattern")
}

static DECIMAL_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d$").expect("built-in digit pattern"));

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DECIMAL_DIGIT.is_match(c.encode_utf8(&mut buf))
}

/// Value of a Unicode decimal digit (`\d`), e.g. `'٥'` is 5.
///
/// Decimal digits are encoded as contiguous runs of complete 0..9 sets, so
/// the value is the offset from the start of the run, modulo 10.
fn digit_value(c: char) -> Option<u32> {
    if let Some(v) = c.to_digit(10) {
        return Some(v);
    }
    if !is_decimal_digit(c) {
        return None;
    }
    let mut first = c as u32;
    while let Some(prev) = first.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        first -= 1;
    }
    Some((c as u32 - first) % 10)
}

/// Parse a run of `\d` characters from any script. `None` on overflow.
fn parse_decimal(digits: &str) -> Option<u32> {
    digits.chars().try_fold(0u32, |acc, c| {
        acc.checked_mul(10)?.checked_add(digit_value(c)?)
    })
}

/// True when `body` contains `In This Article:` followed later by
/// `View Comments`. Both markers are matched literally.
pub fn has_article_section(body: &str) -> bool {
    match body.find(SECTION_OPEN) {
        Some(open) => body[open + SECTION_OPEN.len()..].contains(SECTION_CLOSE),
        None => false,
    }
}
