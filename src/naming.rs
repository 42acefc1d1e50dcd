//! Filename convention for macro menu entries
//!
//! - `name.py` → entry "name", sorted by its own name
//! - `[2] name.py` → entry "name", sort key "2"
//! - `[1] ---.py` → separator line, sort key "1"

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Characters dropped between a bracketed key and the name in `punctuation` mode
const KEY_PUNCTUATION: &[char] = &['-', '_', '.', ':', ')'];

/// How the text following a `[key]` token is separated from the display name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeySeparator {
    /// Any amount of leading whitespace
    #[default]
    Whitespace,
    /// At most one literal space
    SingleSpace,
    /// Leading whitespace plus `-_.:)` in any combination
    Punctuation,
}

impl KeySeparator {
    fn strip(self, rest: &str) -> &str {
        match self {
            KeySeparator::Whitespace => rest.trim_start(),
            KeySeparator::SingleSpace => rest.strip_prefix(' ').unwrap_or(rest),
            KeySeparator::Punctuation => rest
                .trim_start_matches(|c: char| c.is_whitespace() || KEY_PUNCTUATION.contains(&c)),
        }
    }
}

/// Rules used to turn file and directory names into menu entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingRules {
    /// Recognized script extensions, without the leading dot
    pub extensions: Vec<String>,
    pub key_separator: KeySeparator,
    /// Compare digit runs numerically so `[10]` sorts after `[9]`
    pub natural_sort: bool,
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            extensions: vec!["py".to_string()],
            key_separator: KeySeparator::default(),
            natural_sort: true,
        }
    }
}

impl NamingRules {
    /// Whether `extension` (no dot) is one of the recognized script types
    pub fn is_recognized(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(extension))
    }
}

/// Result of parsing one file stem or directory name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub sort_key: String,
    pub display_name: String,
    /// The key came from a `[token]` prefix rather than the name itself
    pub explicit_key: bool,
    pub is_separator: bool,
}

impl ParsedName {
    fn plain(name: &str) -> Self {
        Self {
            sort_key: name.to_string(),
            display_name: name.to_string(),
            explicit_key: false,
            is_separator: false,
        }
    }
}

/// Strip a recognized script extension from `file_name`
///
/// Returns `None` for files that are not macros (unknown extension, no
/// extension, or nothing left once the extension is removed).
pub fn strip_extension<'a>(file_name: &'a str, rules: &NamingRules) -> Option<&'a str> {
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() || !rules.is_recognized(extension) {
        return None;
    }
    Some(stem)
}

/// Split a name into sort key and display name
///
/// Malformed brackets (unclosed, or an empty `[]`) never fail: the whole
/// name becomes both the key and the display name.
pub fn parse_name(stem: &str, rules: &NamingRules) -> ParsedName {
    if let Some(inner) = stem.strip_prefix('[') {
        if let Some((token, rest)) = inner.split_once(']') {
            let token = token.trim();
            if !token.is_empty() {
                let display_name = rules.key_separator.strip(rest).trim_end();
                return ParsedName {
                    sort_key: token.to_string(),
                    display_name: display_name.to_string(),
                    explicit_key: true,
                    is_separator: display_name.chars().all(|c| c == '-'),
                };
            }
        }
        log::debug!("Malformed sort key in '{}', using the full name", stem);
    }

    ParsedName::plain(stem)
}

/// Case-insensitive comparison of two keys or titles
pub fn compare_names(a: &str, b: &str, natural: bool) -> Ordering {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if natural {
        natural_cmp(&a, &b)
    } else {
        a.cmp(&b)
    }
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let ord = compare_digit_runs(&take_digits(&mut a), &take_digits(&mut b));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

// Digit runs of any length: compare by value, then fewer leading zeros first
fn compare_digit_runs(x: &str, y: &str) -> Ordering {
    let x_value = x.trim_start_matches('0');
    let y_value = y.trim_start_matches('0');
    x_value
        .len()
        .cmp(&y_value.len())
        .then_with(|| x_value.cmp(y_value))
        .then_with(|| x.len().cmp(&y.len()))
}
