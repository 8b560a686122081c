use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How keys are compared inside one tree.
///
/// The ordering is fixed when the tree is built; every descent, leaf search and
/// invariant check goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyOrdering {
    /// Byte-wise `str` order, the same order `BTreeMap<String, _>` uses
    #[default]
    Lexicographic,
    /// Runs of ASCII digits compare by numeric value ("2" < "10")
    Natural,
}

impl KeyOrdering {
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            KeyOrdering::Lexicographic => a.cmp(b),
            KeyOrdering::Natural => natural_cmp(a, b),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyOrdering::Lexicographic => "lexicographic",
            KeyOrdering::Natural => "natural",
        }
    }
}

impl fmt::Display for KeyOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lexicographic" | "lex" => Ok(KeyOrdering::Lexicographic),
            "natural" | "nat" => Ok(KeyOrdering::Natural),
            other => Err(format!(
                "unknown key ordering {other:?} (expected lexicographic or natural)"
            )),
        }
    }
}

/// Compare two strings treating each maximal run of ASCII digits as one number.
///
/// Spellings that only differ in leading zeros ("01" and "1") fall back to byte
/// order, so two keys compare equal only when they are identical.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut x = a.as_bytes();
    let mut y = b.as_bytes();

    loop {
        match (x.first(), y.first()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(c), Some(d)) if c.is_ascii_digit() && d.is_ascii_digit() => {
                let (x_digits, x_rest) = split_digits(x);
                let (y_digits, y_rest) = split_digits(y);
                let x_num = trim_zeros(x_digits);
                let y_num = trim_zeros(y_digits);

                let ord = x_num
                    .len()
                    .cmp(&y_num.len())
                    .then_with(|| x_num.cmp(y_num));
                if ord != Ordering::Equal {
                    return ord;
                }

                x = x_rest;
                y = y_rest;
            }
            (Some(c), Some(d)) => {
                if c != d {
                    return c.cmp(d);
                }
                x = &x[1..];
                y = &y[1..];
            }
        }
    }

    a.cmp(b)
}

fn split_digits(bytes: &[u8]) -> (&[u8], &[u8]) {
    let end = bytes
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(bytes.len());
    bytes.split_at(end)
}

fn trim_zeros(digits: &[u8]) -> &[u8] {
    let start = digits
        .iter()
        .position(|&b| b != b'0')
        .unwrap_or(digits.len());
    &digits[start..]
}
