//! Self-reported demographic extraction ("M 25", "30f", "I'm 45 female", ...).
//!
//! Patterns are tried in a fixed priority order over the lower-cased text. The
//! first pattern that matches decides the outcome: if its age fails the range
//! check, the text yields no demographics and later patterns are not consulted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

/// Inclusive bounds for an accepted self-reported age.
pub const MIN_AGE: u8 = 16;
pub const MAX_AGE: u8 = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Map a captured token (`m`, `f`, `male`, `female`) to a gender.
    fn from_token(tok: &str) -> Option<Self> {
        match tok {
            "m" | "male" => Some(Gender::Male),
            "f" | "female" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            other => Err(format!("unknown gender {other:?}")),
        }
    }
}

/// A (gender, age) pair; both are always extracted together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Demographics {
    pub gender: Gender,
    pub age: u8,
}

/// Which capture group holds the gender token and which holds the age.
#[derive(Clone, Copy, Debug)]
enum Layout {
    GenderThenAge,
    AgeThenGender,
}

struct Pattern {
    re: Regex,
    layout: Layout,
    // skip hits whose "m" closes an "i?m" contraction ("i'm", "i m", "i‘m")
    skip_contraction: bool,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True when the letter at byte offset `at` is the "m" of `im` or `i<any char>m`
/// starting at a word boundary.
fn closes_contraction(text: &str, at: usize) -> bool {
    if !text[at..].starts_with('m') {
        return false;
    }
    let mut before = text[..at].chars().rev();
    let starts_word = |c: Option<char>| c.map_or(true, |c| !is_word_char(c));
    match before.next() {
        Some('i') => starts_word(before.next()),
        Some(_) => before.next() == Some('i') && starts_word(before.next()),
        None => false,
    }
}

fn patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let table: [(&str, Layout, bool); 4] = [
            // "m 25", "f,30"; the "m" of "i'm" is not a gender
            (r"\b([mf])[,\s]*(\d{2})\b", Layout::GenderThenAge, true),
            // "25 m", "30,f"
            (r"\b(\d{2})[,\s]*([mf])\b", Layout::AgeThenGender, false),
            // "i'm 25 male"
            (r"\bi.?m\s+(\d{2})\s+(male|female)\b", Layout::AgeThenGender, false),
            // "i'm a 25 year old male"
            (r"\bi.?m\s+a\s+(\d{2})\s+year\s+old\s+(male|female)\b", Layout::AgeThenGender, false),
        ];
        table
            .into_iter()
            .map(|(src, layout, skip_contraction)| Pattern {
                re: Regex::new(src).expect("static demographic pattern"),
                layout,
                skip_contraction,
            })
            .collect()
    })
}

/// Extract a self-reported (gender, age) pair from free text.
///
/// Returns `None` when no pattern matches, or when the first matching pattern
/// carries an age outside `MIN_AGE..=MAX_AGE`.
pub fn extract(text: &str) -> Option<Demographics> {
    if text.is_empty() {
        return None;
    }
    let lower = text.to_lowercase();

    let (pattern, caps) = patterns().iter().find_map(|p| {
        p.re
            .captures_iter(&lower)
            .find(|c| !(p.skip_contraction && c.get(1).map_or(false, |g| closes_contraction(&lower, g.start()))))
            .map(|c| (p, c))
    })?;

    let (gender_tok, age_tok) = match pattern.layout {
        Layout::GenderThenAge => (caps.get(1)?, caps.get(2)?),
        Layout::AgeThenGender => (caps.get(2)?, caps.get(1)?),
    };
    let gender = Gender::from_token(gender_tok.as_str())?;
    let age: u8 = age_tok.as_str().parse().ok()?;
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return None;
    }
    Some(Demographics { gender, age })
}

/// Split helper for record builders that store the two halves in separate columns.
pub fn extract_split(text: &str) -> (Option<Gender>, Option<u8>) {
    match extract(text) {
        Some(d) => (Some(d.gender), Some(d.age)),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(text: &str) -> Option<(Gender, u8)> {
        extract(text).map(|d| (d.gender, d.age))
    }

    #[test]
    fn documented_examples() {
        assert_eq!(pair("F,30 here"), Some((Gender::Female, 30)));
        assert_eq!(pair("30 m, need help"), Some((Gender::Male, 30)));
        assert_eq!(pair("I'm 45 female and broke"), Some((Gender::Female, 45)));
        assert_eq!(pair("I'm a 22 year old male"), Some((Gender::Male, 22)));
        assert_eq!(pair("no demographic info"), None);
        assert_eq!(pair("M 15"), None);
    }

    #[test]
    fn empty_text_is_no_match() {
        assert_eq!(extract(""), None);
        assert_eq!(extract_split(""), (None, None));
    }

    #[test]
    fn apostrophe_is_any_single_char_or_missing() {
        assert_eq!(pair("im 33 male"), Some((Gender::Male, 33)));
        assert_eq!(pair("i`m 33 female"), Some((Gender::Female, 33)));
        assert_eq!(pair("i’m 40 male"), Some((Gender::Male, 40)));
    }

    #[test]
    fn first_match_decides_even_when_out_of_range() {
        // Pattern 1 matches "m 99" first; the later valid "i'm 30 female" is not consulted.
        assert_eq!(pair("m 99 ... i'm 30 female"), None);
    }

    #[test]
    fn contraction_is_not_a_gender_letter() {
        assert_eq!(pair("i'm 45, f"), Some((Gender::Female, 45)));
        assert_eq!(pair("so i'm 27 and lost"), None);
    }

    #[test]
    fn contraction_with_any_separator_keeps_stated_gender() {
        for sep in ["'", "\u{2018}", "\u{2019}", "\u{00b4}", "\"", "`", " "] {
            let text = format!("I{sep}m 45 female");
            assert_eq!(pair(&text), Some((Gender::Female, 45)), "{text:?}");
        }
        // a later standalone letter still counts
        assert_eq!(pair("i\u{2018}m new here, m 31"), Some((Gender::Male, 31)));
        // "him 30" is not a contraction
        assert_eq!(pair("ask him 30 times"), None);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        assert_eq!(pair("f 16"), Some((Gender::Female, 16)));
        assert_eq!(pair("m 80"), Some((Gender::Male, 80)));
        assert_eq!(pair("m 81"), None);
    }

    #[test]
    fn three_digit_numbers_do_not_match() {
        assert_eq!(pair("m 250 dollars"), None);
    }

    #[test]
    fn extracted_values_respect_invariants() {
        let samples = [
            "", "m", "f 0", "m 10", "25m", "me 25", "i'm a 99 year old female",
            "Married, 34M and 32F", "My budget: 12 f 45",
        ];
        for s in samples {
            if let Some(d) = extract(s) {
                assert!((MIN_AGE..=MAX_AGE).contains(&d.age), "{s:?} -> {d:?}");
            }
        }
    }

    #[test]
    fn gender_round_trips_through_display() {
        for g in [Gender::Male, Gender::Female] {
            assert_eq!(g.to_string().parse::<Gender>().unwrap(), g);
        }
    }
}
