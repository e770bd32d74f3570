//! Segment-wise version ordering.
//!
//! Versions are split on `.`, `-`, `_` and `+` and wherever digits meet
//! letters. Numeric segments compare numerically, words compare
//! case-insensitively and a number outranks a word at the same position.
//! When one version runs out of segments, the longer one is newer if its next
//! non-zero segment is a number and older if it is a word, so
//! `1.10.0 > 1.10.0-SNAPSHOT > 1.2.0` and `1.0 == 1.0.0`.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone)]
enum Segment {
    /// Digits with leading zeros stripped.
    Number(String),
    Word(String),
}

impl Segment {
    fn is_zero(&self) -> bool {
        matches!(self, Self::Number(digits) if digits == "0")
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Self::Word(a), Self::Word(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (Self::Number(_), Self::Word(_)) => Ordering::Greater,
            (Self::Word(_), Self::Number(_)) => Ordering::Less,
        }
    }
}

/// A parsed version string.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

impl Version {
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut digits = false;

        let mut flush = |current: &mut String, digits: bool| {
            if current.is_empty() {
                return;
            }
            let text = std::mem::take(current);
            segments.push(if digits {
                let trimmed = text.trim_start_matches('0');
                Segment::Number(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() })
            } else {
                Segment::Word(text)
            });
        };

        for c in raw.trim().chars() {
            if matches!(c, '.' | '-' | '_' | '+') {
                flush(&mut current, digits);
                continue;
            }
            let is_digit = c.is_ascii_digit();
            if !current.is_empty() && is_digit != digits {
                flush(&mut current, digits);
            }
            digits = is_digit;
            current.push(c);
        }
        flush(&mut current, digits);

        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the version is a snapshot build.
    pub fn is_snapshot(&self) -> bool {
        self.raw.to_uppercase().contains("SNAPSHOT")
    }
}

/// Ordering of the unmatched tail of the longer version.
fn tail_order(tail: &[Segment]) -> Ordering {
    match tail.iter().find(|s| !s.is_zero()) {
        None => Ordering::Equal,
        Some(Segment::Number(_)) => Ordering::Greater,
        Some(Segment::Word(_)) => Ordering::Less,
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.segments, &other.segments);
        for (x, y) in a.iter().zip(b) {
            let ordering = x.compare(y);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        let common = a.len().min(b.len());
        match a.len().cmp(&b.len()) {
            Ordering::Equal => Ordering::Equal,
            Ordering::Greater => tail_order(&a[common..]),
            Ordering::Less => tail_order(&b[common..]).reverse(),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Compare two version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    Version::parse(a).cmp(&Version::parse(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_segments() {
        assert_eq!(compare_versions("1.10.0", "1.2.0"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "10.0"), Ordering::Less);
        assert_eq!(compare_versions("1.02", "1.2"), Ordering::Equal);
    }

    #[test]
    fn test_snapshot_below_release() {
        assert_eq!(compare_versions("1.10.0", "1.10.0-SNAPSHOT"), Ordering::Greater);
        assert_eq!(compare_versions("1.10.0-SNAPSHOT", "1.2.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.0-rc1", "1.0.0-RC2"), Ordering::Less);
    }

    #[test]
    fn test_trailing_segments() {
        assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.1", "1.0"), Ordering::Greater);
        assert_eq!(compare_versions("1", "1.0.0-beta"), Ordering::Greater);
    }

    #[test]
    fn test_digit_letter_boundary() {
        assert_eq!(compare_versions("1.0rc2", "1.0-rc-10"), Ordering::Less);
        assert_eq!(compare_versions("1.0b", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn test_sort_descending() {
        let mut versions: Vec<Version> = ["1.2.0", "1.10.0-SNAPSHOT", "1.10.0"]
            .into_iter()
            .map(Version::parse)
            .collect();
        versions.sort_by(|a, b| b.cmp(a));
        let order: Vec<_> = versions.iter().map(Version::as_str).collect();
        assert_eq!(order, vec!["1.10.0", "1.10.0-SNAPSHOT", "1.2.0"]);
    }

    #[test]
    fn test_snapshot_detection() {
        assert!(Version::parse("1.0.0-snapshot").is_snapshot());
        assert!(!Version::parse("1.0.0").is_snapshot());
        assert_eq!(Version::parse("1.0").to_string(), "1.0");
    }
}
