//! Ordered name → locator mappings
//!
//! Sites return titles, chapters and pages as ordered pairs. Position matters
//! (chapter selection is positional), so the mapping keeps insertion order:
//! re-inserting an existing name updates its locator but keeps its position.

use std::cmp::Ordering;

/// An ordered mapping of display names to locators
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    entries: Vec<(String, String)>,
}

impl Listing {
    /// Creates an empty listing
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a name, or updates the locator of an existing name in place
    pub fn insert(&mut self, name: impl Into<String>, locator: impl Into<String>) {
        let name = name.into();
        let locator = locator.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = locator,
            None => self.entries.push((name, locator)),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the locator of a name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, locator)| locator.as_str())
    }

    /// Returns the entry at a 0-based position
    pub fn get_index(&self, index: usize) -> Option<(&str, &str)> {
        self.entries
            .get(index)
            .map(|(name, locator)| (name.as_str(), locator.as_str()))
    }

    /// Iterates over `(name, locator)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, locator)| (name.as_str(), locator.as_str()))
    }

    /// Iterates over names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Sorts entries by the numeric part of their names
    ///
    /// Names without a number keep their relative order after every
    /// numbered name.
    pub fn sort_by_number(&mut self) {
        self.entries
            .sort_by(|(a, _), (b, _)| match (chapter_number(a), chapter_number(b)) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
    }
}

impl<N: Into<String>, L: Into<String>> FromIterator<(N, L)> for Listing {
    fn from_iter<I: IntoIterator<Item = (N, L)>>(iter: I) -> Self {
        let mut listing = Listing::new();
        for (name, locator) in iter {
            listing.insert(name, locator);
        }
        listing
    }
}

impl IntoIterator for Listing {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Extracts the first number in a chapter label
///
/// `"Chapter 10.5"` → `10.5`, `"Ch. 3 - The End"` → `3`, `"Prologue"` → `None`.
pub fn chapter_number(label: &str) -> Option<f64> {
    let start = label.find(|c: char| c.is_ascii_digit())?;
    let rest = &label[start..];

    let mut end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());

    // Include a decimal part only when a digit follows the dot
    if rest[end..].starts_with('.') {
        let fraction = &rest[end + 1..];
        let digits = fraction
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(fraction.len());
        if digits > 0 {
            end += 1 + digits;
        }
    }

    rest[..end].parse().ok()
}

/// Compares two names treating embedded digit runs as numbers
///
/// `"Page 2"` sorts before `"Page 10"`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_num = take_digits(&mut left);
                let r_num = take_digits(&mut right);
                let l_trim = l_num.trim_start_matches('0');
                let r_trim = r_num.trim_start_matches('0');
                let ordering = l_trim
                    .len()
                    .cmp(&r_trim.len())
                    .then_with(|| l_trim.cmp(r_trim))
                    .then_with(|| l_num.len().cmp(&r_num.len()));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                if l != r {
                    return l.cmp(&r);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}
