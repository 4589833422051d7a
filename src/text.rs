//! Text normalization and evidence matching.
//!
//! Answer aliases and document text must tokenize identically or grounding
//! silently fails: both sides are case-folded, hyphens become spaces, all
//! other ASCII punctuation is deleted, English articles are dropped as
//! whole tokens, and whitespace is collapsed. A fact is groundable in a
//! document when its normalized alias tokens occur as a contiguous run of
//! the normalized document tokens.
//!
//! # Example
//!
//! ```rust
//! use namesake::text::groundable;
//!
//! assert!(groundable("the Beatles", "members of the beatles were"));
//! assert!(!groundable("Beatles", "the beat les"));
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

static ARTICLES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(a|an|the)\b").unwrap());

/// Normalize text for evidence matching.
///
/// Lowercases, replaces hyphens with spaces, deletes all other ASCII
/// punctuation, removes English articles, and collapses whitespace.
#[must_use]
pub fn normalize(s: &str) -> String {
    let lowered = s.to_lowercase();

    let mut depunct = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        if ch == '-' {
            depunct.push(' ');
        } else if !ch.is_ascii_punctuation() {
            depunct.push(ch);
        }
    }

    let no_articles = ARTICLES.replace_all(&depunct, " ");
    no_articles.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized token sequence of a string.
#[must_use]
pub fn tokens(s: &str) -> Vec<String> {
    normalize(s).split_whitespace().map(str::to_owned).collect()
}

/// Test whether `answer`'s normalized tokens occur as a contiguous
/// subsequence of `doc`'s normalized tokens.
///
/// An empty answer never grounds.
#[must_use]
pub fn groundable(answer: &str, doc: &str) -> bool {
    groundable_tokens(&tokens(answer), &tokens(doc))
}

/// Contiguous-subsequence test over pre-tokenized text.
///
/// Lets callers tokenize a document once and probe it with many aliases.
#[must_use]
pub fn groundable_tokens(answer_tokens: &[String], doc_tokens: &[String]) -> bool {
    if answer_tokens.is_empty() {
        return false;
    }
    doc_tokens
        .windows(answer_tokens.len())
        .any(|window| window == answer_tokens)
}

/// Truncate text to its first `n` whitespace-delimited tokens.
///
/// Both grounding and generation read documents through the same leading
/// window so that evidence found here is still visible downstream.
#[must_use]
pub fn leading_window(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

const ONES: [&str; 20] = [
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [&str; 5] = ["", " thousand", " million", " billion", " trillion"];

/// Spell out a decimal integer string in English words.
///
/// Used to derive the loose textual alias of a quantity value ("2" →
/// "two"). Returns `None` for anything that is not a plain integer within
/// the supported scale range.
#[must_use]
pub fn spell_integer(digits: &str) -> Option<String> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = digits.parse().ok()?;
    if value < 1000 {
        return Some(spell_under_thousand(value as u16));
    }

    // Decompose into thousand-scale chunks, most significant first.
    let mut chunks = Vec::new();
    let mut rest = value;
    while rest > 0 {
        chunks.push((rest % 1000) as u16);
        rest /= 1000;
    }
    if chunks.len() > SCALES.len() {
        return None;
    }

    let mut parts = Vec::new();
    for (scale, chunk) in chunks.iter().enumerate().rev() {
        if *chunk > 0 {
            parts.push(format!("{}{}", spell_under_thousand(*chunk), SCALES[scale]));
        }
    }
    Some(parts.join(" "))
}

fn spell_under_thousand(value: u16) -> String {
    debug_assert!(value < 1000);
    if value < 20 {
        return ONES[value as usize].to_owned();
    }
    if value < 100 {
        let tens = TENS[(value / 10) as usize];
        return match value % 10 {
            0 => tens.to_owned(),
            ones => format!("{}-{}", tens, ONES[ones as usize]),
        };
    }
    let hundreds = format!("{} hundred", ONES[(value / 100) as usize]);
    match value % 100 {
        0 => hundreds,
        rem => format!("{} {}", hundreds, spell_under_thousand(rem)),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in ".{0,80}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_output_has_no_ascii_punctuation(s in ".{0,80}") {
            let out = normalize(&s);
            prop_assert!(!out.chars().any(|c| c.is_ascii_punctuation()));
        }

        #[test]
        fn text_grounds_in_itself(s in "[a-zA-Z][a-zA-Z ]{0,40}") {
            prop_assume!(!tokens(&s).is_empty());
            prop_assert!(groundable(&s, &s));
        }

        #[test]
        fn window_never_exceeds_n_tokens(s in ".{0,200}", n in 0usize..50) {
            let windowed = leading_window(&s, n);
            prop_assert!(windowed.split_whitespace().count() <= n);
        }
    }
}
